use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::version::Channel;

/// Name of the optional preferences file inside the launcher work dir.
pub const PREFS_FILE: &str = "config.json";

/// Per-user launch preferences. Loaded once per launch attempt; an absent or
/// unreadable file is not an error, both toggles default to off.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LauncherPreferences {
    /// Follow the pre-release channel instead of stable.
    /// The on-disk field historically went by `alpha`.
    #[serde(default, alias = "alpha")]
    pub prerelease: bool,

    /// Launch the client with its developer flags. Accepted spellings:
    /// `debug_mode`, the wire form `debugMode`, and the historical `debug`.
    #[serde(default, alias = "debug", alias = "debugMode")]
    pub debug_mode: bool,
}

impl LauncherPreferences {
    /// Read `<work_dir>/config.json`, falling back to defaults when the file
    /// is missing or does not parse.
    pub async fn load(work_dir: &Path) -> Self {
        let path = work_dir.join(PREFS_FILE);
        match tokio::fs::read_to_string(&path).await {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                debug!("Ignoring unparseable preferences at {:?}: {}", path, e);
                Self::default()
            }),
            Err(e) => {
                debug!("No preferences at {:?} ({}), using defaults", path, e);
                Self::default()
            }
        }
    }

    pub fn channel(&self) -> Channel {
        if self.prerelease {
            Channel::Prerelease
        } else {
            Channel::Stable
        }
    }

    /// Argument set for the child process, selected by the debug toggle.
    pub fn child_args(&self) -> Vec<&'static str> {
        if self.debug_mode {
            vec!["--dev", "--iknowwhatimdoing"]
        } else {
            vec!["--iknowwhatimdoing"]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn absent_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let prefs = LauncherPreferences::load(dir.path()).await;
        assert_eq!(prefs, LauncherPreferences::default());
        assert!(!prefs.prerelease);
        assert!(!prefs.debug_mode);
    }

    #[tokio::test]
    async fn corrupt_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(PREFS_FILE), "{not json").unwrap();
        let prefs = LauncherPreferences::load(dir.path()).await;
        assert_eq!(prefs, LauncherPreferences::default());
    }

    #[tokio::test]
    async fn reads_wire_field_names() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(PREFS_FILE),
            r#"{"prerelease": true, "debugMode": true}"#,
        )
        .unwrap();
        let prefs = LauncherPreferences::load(dir.path()).await;
        assert!(prefs.prerelease);
        assert!(prefs.debug_mode);
    }

    #[tokio::test]
    async fn reads_both_current_and_legacy_field_names() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(PREFS_FILE),
            r#"{"alpha": true, "debug": true}"#,
        )
        .unwrap();
        let prefs = LauncherPreferences::load(dir.path()).await;
        assert!(prefs.prerelease);
        assert!(prefs.debug_mode);
        assert_eq!(prefs.channel(), Channel::Prerelease);
    }

    #[test]
    fn child_args_follow_debug_toggle() {
        let prefs = LauncherPreferences::default();
        assert_eq!(prefs.child_args(), vec!["--iknowwhatimdoing"]);

        let prefs = LauncherPreferences {
            debug_mode: true,
            ..Default::default()
        };
        assert_eq!(prefs.child_args(), vec!["--dev", "--iknowwhatimdoing"]);
    }
}
