// ─── Process Supervisor ───
// Spawns the downloaded client, streams its stdout line-by-line, waits for
// exit and classifies the outcome.

use std::io::{BufRead, BufReader as StdBufReader};
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::events::{EventSink, LauncherEvent};

#[cfg(unix)]
const SIGSEGV: i32 = 11;

/// How a supervised launch ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitOutcome {
    /// The child ran and exited; any exit not matching a crash signature
    /// counts as normal, including nonzero codes and a user-requested stop.
    Normal { code: Option<i32> },
    /// The image is invalid for this machine or crashed on launch. The caller
    /// deletes the artifact and re-acquires it.
    CrashSignature { detail: String },
}

/// Error text patterns that mean "binary mismatch or segfault on launch".
/// Inherited from the launcher this one replaces; a heuristic, not an
/// exit-code check.
pub fn is_crash_signature(detail: &str) -> bool {
    detail.contains("valid Win32 application") || detail.contains("segmentation")
}

pub struct ProcessSupervisor {
    /// Pid of the currently running child, present only between spawn and
    /// exit. The stop handler reads it from here.
    running_pid: Arc<Mutex<Option<u32>>>,
}

impl ProcessSupervisor {
    pub fn new() -> Self {
        Self {
            running_pid: Arc::new(Mutex::new(None)),
        }
    }

    /// Make the artifact spawnable. Mandatory after any fresh download and
    /// applied unconditionally before every launch on non-Windows targets.
    pub fn fix_permissions(path: &Path) -> LauncherResult<()> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = std::fs::metadata(path)
                .map_err(|source| LauncherError::Io {
                    path: path.to_path_buf(),
                    source,
                })?
                .permissions();
            perms.set_mode(0o755);
            std::fs::set_permissions(path, perms).map_err(|source| LauncherError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        }
        #[cfg(not(unix))]
        {
            let _ = path;
        }
        Ok(())
    }

    /// Spawn `exe` and block the calling flow until it exits.
    ///
    /// Stdout is read line-by-line in process-output order; each line reaches
    /// the sink before the next is read. Spawn failures that match a crash
    /// signature are reported as [`ExitOutcome::CrashSignature`] so the caller
    /// can recover; any other spawn failure is a plain error.
    pub async fn launch(
        &self,
        exe: &Path,
        args: &[&str],
        work_dir: &Path,
        sink: Arc<dyn EventSink>,
    ) -> LauncherResult<ExitOutcome> {
        info!("Launching {:?} with args {:?}", exe, args);

        let mut child = match Command::new(exe)
            .args(args)
            .current_dir(work_dir)
            .stdout(Stdio::piped())
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                let detail = e.to_string();
                if is_crash_signature(&detail) {
                    return Ok(ExitOutcome::CrashSignature { detail });
                }
                return Err(LauncherError::Spawn(detail));
            }
        };

        let pid = child.id();
        *self.running_pid.lock().await = Some(pid);
        info!("Child process running (pid {pid})");

        if let Some(stdout) = child.stdout.take() {
            let sink = sink.clone();
            // Blocking ordered read loop; awaited so the attempt does not
            // advance past the child's output.
            tokio::task::spawn_blocking(move || {
                for line in StdBufReader::new(stdout).lines().map_while(Result::ok) {
                    info!("[child:{pid}] {line}");
                    sink.emit(LauncherEvent::log_line(line));
                }
            })
            .await
            .map_err(|e| LauncherError::Other(format!("stdout reader panicked: {e}")))?;
        }

        let wait_result = tokio::task::spawn_blocking(move || child.wait())
            .await
            .map_err(|e| LauncherError::Other(format!("wait task panicked: {e}")))?;
        *self.running_pid.lock().await = None;

        match wait_result {
            Ok(status) => {
                #[cfg(unix)]
                {
                    use std::os::unix::process::ExitStatusExt;
                    if status.signal() == Some(SIGSEGV) {
                        return Ok(ExitOutcome::CrashSignature {
                            detail: format!("segmentation fault (signal {SIGSEGV})"),
                        });
                    }
                }
                info!("Child exited with status {:?}", status);
                Ok(ExitOutcome::Normal {
                    code: status.code(),
                })
            }
            Err(e) => {
                let detail = e.to_string();
                if is_crash_signature(&detail) {
                    Ok(ExitOutcome::CrashSignature { detail })
                } else {
                    Err(LauncherError::Spawn(detail))
                }
            }
        }
    }

    /// Handle the external `stop` action: terminate the running child, if
    /// any. Never raises a fatal error notification.
    pub async fn stop(&self, sink: &Arc<dyn EventSink>) -> LauncherResult<()> {
        let Some(pid) = self.running_pid.lock().await.take() else {
            warn!("Stop requested but no child is running");
            sink.emit(LauncherEvent::status("ready to launch"));
            return Ok(());
        };

        kill_process(pid)?;
        info!("Stopped child process (pid {pid})");
        sink.emit(LauncherEvent::log_line("[Launcher] Stopped Lilith"));
        sink.emit(LauncherEvent::status("ready to launch"));
        Ok(())
    }
}

impl Default for ProcessSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

fn kill_process(pid: u32) -> LauncherResult<()> {
    #[cfg(target_os = "windows")]
    {
        let status = Command::new("taskkill")
            .args(["/PID", &pid.to_string(), "/T", "/F"])
            .status()
            .map_err(|e| LauncherError::Other(format!("Cannot terminate process {pid}: {e}")))?;

        if !status.success() {
            return Err(LauncherError::Other(format!(
                "taskkill for {pid} returned code {:?}",
                status.code()
            )));
        }

        Ok(())
    }

    #[cfg(not(target_os = "windows"))]
    {
        let graceful = Command::new("kill")
            .args(["-15", &pid.to_string()])
            .status()
            .map_err(|e| LauncherError::Other(format!("Cannot send SIGTERM to {pid}: {e}")))?;

        if graceful.success() {
            std::thread::sleep(std::time::Duration::from_millis(300));
            let check = Command::new("kill").args(["-0", &pid.to_string()]).status();
            if matches!(check, Ok(status) if !status.success()) {
                return Ok(());
            }
        }

        let forced = Command::new("kill")
            .args(["-9", &pid.to_string()])
            .status()
            .map_err(|e| LauncherError::Other(format!("Cannot send SIGKILL to {pid}: {e}")))?;

        if !forced.success() {
            return Err(LauncherError::Other(format!(
                "kill -9 for {pid} returned code {:?}",
                forced.code()
            )));
        }

        Ok(())
    }
}
