// ─── Launch Orchestrator ───
// Top-level state machine for one launch attempt:
//   LoadingPrefs → ResolvingVersion → CheckingCache → [Downloading]
//     → FixingPermissions → Supervising → { Completed | Recovering }

use std::path::{Path, PathBuf};
use std::sync::Arc;

use reqwest::Client;
use tracing::{debug, error, info};

use crate::core::cache;
use crate::core::downloader::Downloader;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::events::{EventSink, LauncherEvent};
use crate::core::prefs::LauncherPreferences;
use crate::core::supervisor::{ExitOutcome, ProcessSupervisor};
use crate::core::version::{self, VersionDescriptor};

const WORK_DIR_NAME: &str = "LilithLauncher";

/// Flag passed to our own executable when relaunching after crash recovery.
pub const HEADLESS_FLAG: &str = "--headless";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LaunchState {
    LoadingPrefs,
    ResolvingVersion,
    CheckingCache,
    Downloading,
    FixingPermissions,
    Supervising,
    Completed,
    Recovering,
}

impl LaunchState {
    fn describe(self) -> &'static str {
        match self {
            LaunchState::LoadingPrefs => "reading config",
            LaunchState::ResolvingVersion => "resolving version",
            LaunchState::CheckingCache => "checking cache",
            LaunchState::Downloading => "downloading",
            LaunchState::FixingPermissions => "preparing artifact",
            LaunchState::Supervising => "launching",
            LaunchState::Completed => "ready to launch",
            LaunchState::Recovering => "recovering",
        }
    }
}

/// Drives one launch attempt end to end. At most one attempt is active per
/// process lifetime; recovery happens in a fresh process.
pub struct LaunchOrchestrator {
    work_dir: PathBuf,
    http_client: Client,
    downloader: Downloader,
    supervisor: ProcessSupervisor,
    sink: Arc<dyn EventSink>,
}

impl LaunchOrchestrator {
    pub fn new(work_dir: PathBuf, http_client: Client, sink: Arc<dyn EventSink>) -> Self {
        let downloader = Downloader::new(http_client.clone(), sink.clone());
        Self {
            work_dir,
            http_client,
            downloader,
            supervisor: ProcessSupervisor::new(),
            sink,
        }
    }

    /// Default work dir: `<home>/LilithLauncher`.
    pub fn default_work_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(WORK_DIR_NAME)
    }

    /// Run one attempt, surfacing any fatal error to the event sink before
    /// returning it.
    pub async fn run(&self) -> LauncherResult<()> {
        match self.run_attempt().await {
            Ok(()) => Ok(()),
            Err(e) => {
                self.sink.emit(LauncherEvent::error(e.to_string()));
                Err(e)
            }
        }
    }

    async fn run_attempt(&self) -> LauncherResult<()> {
        cache::ensure_work_dir(&self.work_dir).await?;

        self.transition(LaunchState::LoadingPrefs);
        let prefs = LauncherPreferences::load(&self.work_dir).await;

        self.transition(LaunchState::ResolvingVersion);
        let descriptor = VersionDescriptor::fetch(&self.http_client, prefs.channel()).await?;
        let url = descriptor.download_url_for(std::env::consts::OS);
        let filename = version::artifact_filename(url)?.to_string();

        self.transition(LaunchState::CheckingCache);
        let artifact = match cache::resolve_path(&self.work_dir, &filename).await? {
            Some(path) => path,
            None => {
                self.transition(LaunchState::Downloading);
                self.emit_status(format!("Downloading lilith {}", descriptor.version));
                let dest = self.work_dir.join(&filename);
                self.downloader.fetch(url, &dest).await?;
                dest
            }
        };

        self.transition(LaunchState::FixingPermissions);
        ProcessSupervisor::fix_permissions(&artifact)?;

        self.transition(LaunchState::Supervising);
        self.emit_status(format!("Launching lilith {}", descriptor.version));
        if prefs.debug_mode {
            self.emit_status("Launching Lilith in debug mode");
        }
        self.emit_status("Lilith is now running");

        let outcome = self
            .supervisor
            .launch(&artifact, &prefs.child_args(), &self.work_dir, self.sink.clone())
            .await?;

        match outcome {
            ExitOutcome::Normal { code } => {
                self.transition(LaunchState::Completed);
                info!("Launch attempt completed (exit code {:?})", code);
                Ok(())
            }
            ExitOutcome::CrashSignature { detail } => {
                self.transition(LaunchState::Recovering);
                error!("Crash signature detected: {detail}");
                self.emit_status("Failed to launch Lilith, deleting...");
                self.recover(&artifact)
            }
        }
    }

    /// External `stop` action: terminate the running child and report ready.
    pub async fn stop(&self) -> LauncherResult<()> {
        self.supervisor.stop(&self.sink).await
    }

    /// Crash recovery: drop the bad artifact, then hand over to a fresh
    /// launcher process in headless mode. Does not return on unix.
    fn recover(&self, artifact: &Path) -> LauncherResult<()> {
        std::fs::remove_file(artifact).map_err(|source| LauncherError::Io {
            path: artifact.to_path_buf(),
            source,
        })?;
        info!("Deleted crashed artifact {:?}", artifact);

        let mut command = recovery_command()?;

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            // exec replaces this process image; reaching the line below
            // means it failed.
            let e = command.exec();
            Err(LauncherError::Spawn(e.to_string()))
        }
        #[cfg(not(unix))]
        {
            command
                .spawn()
                .map_err(|e| LauncherError::Spawn(e.to_string()))?;
            std::process::exit(0)
        }
    }

    // Transitions are observational: the status text never gates control flow.
    fn transition(&self, state: LaunchState) {
        debug!("Launch state -> {:?}", state);
        self.emit_status(state.describe());
    }

    fn emit_status(&self, message: impl Into<String>) {
        self.sink.emit(LauncherEvent::status(message));
    }
}

/// Command that re-invokes our own executable in recovery mode.
fn recovery_command() -> LauncherResult<std::process::Command> {
    let exe = std::env::current_exe().map_err(|source| LauncherError::Io {
        path: PathBuf::new(),
        source,
    })?;
    let mut command = std::process::Command::new(exe);
    command.arg(HEADLESS_FLAG);
    Ok(command)
}
