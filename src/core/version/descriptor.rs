// ─── Version Descriptor ───
// Handles fetching and decoding the remote version feed.

use serde::Deserialize;
use tracing::info;

use crate::core::error::{LauncherError, LauncherResult};

const STABLE_ENDPOINT: &str = "https://api.lilithmod.xyz/versions/latest";
const PRERELEASE_ENDPOINT: &str = "https://api.lilithmod.xyz/versions/alpha";

/// Release track to follow. Selects which feed endpoint is queried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Stable,
    Prerelease,
}

impl Channel {
    pub fn endpoint(self) -> &'static str {
        match self {
            Channel::Stable => STABLE_ENDPOINT,
            Channel::Prerelease => PRERELEASE_ENDPOINT,
        }
    }
}

/// One release as described by the feed. Immutable once decoded.
#[derive(Debug, Clone, Deserialize)]
pub struct VersionDescriptor {
    pub version: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub changelog: Changelog,
    pub download: DownloadUrls,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Changelog {
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub fixes: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DownloadUrls {
    pub windows: String,
    pub linux: String,
    pub macos: String,
}

impl VersionDescriptor {
    /// Fetch the descriptor for the given channel.
    ///
    /// Transport failures and non-2xx statuses are fatal to the launch
    /// attempt, as is a payload that does not decode. There is no fallback
    /// channel and no retry.
    pub async fn fetch(client: &reqwest::Client, channel: Channel) -> LauncherResult<Self> {
        let url = channel.endpoint();
        info!("Fetching version descriptor from {url}");

        let response = client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LauncherError::DownloadFailed {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        // Decode from text rather than `.json()` so transport and decode
        // failures stay distinguishable error kinds.
        let body = response.text().await?;
        let descriptor: VersionDescriptor = serde_json::from_str(&body)?;

        info!("Resolved version {}", descriptor.version);
        Ok(descriptor)
    }

    /// Download URL for an OS name (`std::env::consts::OS`). Anything that is
    /// not windows or macos gets the linux build.
    pub fn download_url_for(&self, os: &str) -> &str {
        match os {
            "windows" => &self.download.windows,
            "macos" => &self.download.macos,
            _ => &self.download.linux,
        }
    }
}

/// Cache file name for a download URL: its final path segment.
pub fn artifact_filename(url: &str) -> LauncherResult<&str> {
    match url.rsplit('/').next() {
        Some(name) if !name.is_empty() => Ok(name),
        _ => Err(LauncherError::InvalidDownloadUrl(url.to_string())),
    }
}
