// ─── Launcher Events ───
// Typed notifications for the external shell. The core never waits for an
// acknowledgement; delivery is best-effort and one-way.

use serde::Serialize;
use tracing::{error, info};

/// A single notification emitted by the launch pipeline.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LauncherEvent {
    /// Free-text progress text shown during a launch attempt.
    StatusUpdate { message: String },
    /// One line of child process output.
    LogLine { message: String },
    /// Error text surfaced before the attempt aborts.
    ErrorRaised { message: String },
}

/// Where launcher notifications go. The graphical shell plugs in here; the
/// headless binary uses [`ConsoleSink`].
pub trait EventSink: Send + Sync {
    fn emit(&self, event: LauncherEvent);
}

/// Sink for headless runs: forwards everything to the log output.
pub struct ConsoleSink;

impl EventSink for ConsoleSink {
    fn emit(&self, event: LauncherEvent) {
        match event {
            LauncherEvent::StatusUpdate { message } => info!("{message}"),
            LauncherEvent::LogLine { message } => info!("[lilith] {message}"),
            LauncherEvent::ErrorRaised { message } => error!("{message}"),
        }
    }
}

impl LauncherEvent {
    pub fn status(message: impl Into<String>) -> Self {
        LauncherEvent::StatusUpdate {
            message: message.into(),
        }
    }

    pub fn log_line(message: impl Into<String>) -> Self {
        LauncherEvent::LogLine {
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        LauncherEvent::ErrorRaised {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_kind_tag() {
        let json = serde_json::to_string(&LauncherEvent::status("ready to launch")).unwrap();
        assert_eq!(
            json,
            r#"{"kind":"status_update","message":"ready to launch"}"#
        );

        let json = serde_json::to_string(&LauncherEvent::error("boom")).unwrap();
        assert!(json.contains(r#""kind":"error_raised""#));
    }
}
