use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures_util::StreamExt;
use reqwest::Client;
use tokio::io::AsyncWriteExt;
use tokio::sync::oneshot;
use tracing::{debug, info};

use crate::core::downloader::progress;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::events::EventSink;

/// One transfer in flight: source, destination and the probed total size.
#[derive(Debug, Clone)]
pub struct DownloadTask {
    pub url: String,
    pub dest: PathBuf,
    pub expected_size: u64,
}

/// Streams a remote artifact to disk while a progress reporter watches the
/// destination file grow.
pub struct Downloader {
    client: Client,
    sink: Arc<dyn EventSink>,
}

impl Downloader {
    pub fn new(client: Client, sink: Arc<dyn EventSink>) -> Self {
        Self { client, sink }
    }

    /// Fetch `url` into `dest`.
    ///
    /// The parent directory of `dest` must already exist. On any error the
    /// destination may be left partially written; callers must treat every
    /// `Err` as "artifact unusable", never "artifact present". No retries.
    pub async fn fetch(&self, url: &str, dest: &Path) -> LauncherResult<()> {
        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|source| LauncherError::Io {
                path: dest.to_path_buf(),
                source,
            })?;

        // Probe failure aborts the whole download; the truncated destination
        // stays behind, which is why callers key off the error, not the file.
        let expected_size = self.probe_size(url).await?;
        let task = DownloadTask {
            url: url.to_string(),
            dest: dest.to_path_buf(),
            expected_size,
        };
        info!(
            "Downloading {} -> {:?} ({} bytes expected)",
            task.url, task.dest, task.expected_size
        );

        let (done_tx, done_rx) = oneshot::channel();
        let reporter = tokio::spawn(progress::report(
            task.dest.clone(),
            task.expected_size,
            done_rx,
            self.sink.clone(),
        ));

        let mut written: u64 = 0;
        let result = self.stream_body(&task, &mut file, &mut written).await;

        // The reporter stops only on this signal, success or not; on failure
        // the count carries the bytes written before the transfer broke.
        let _ = done_tx.send(written);
        let _ = reporter.await;

        result?;
        debug!("Downloaded {written} bytes to {:?}", task.dest);
        Ok(())
    }

    /// HEAD-equivalent metadata probe for the expected transfer size.
    /// Failure here aborts the whole download.
    async fn probe_size(&self, url: &str) -> LauncherResult<u64> {
        let response = self.client.head(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LauncherError::DownloadFailed {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        // Read the header directly: a HEAD response has no body, so the
        // body-derived `content_length()` accessor is not reliable here.
        response
            .headers()
            .get(reqwest::header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|len| *len > 0)
            .ok_or_else(|| LauncherError::MissingContentLength {
                url: url.to_string(),
            })
    }

    async fn stream_body(
        &self,
        task: &DownloadTask,
        file: &mut tokio::fs::File,
        written: &mut u64,
    ) -> LauncherResult<()> {
        let response = self.client.get(&task.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LauncherError::DownloadFailed {
                url: task.url.clone(),
                status: status.as_u16(),
            });
        }

        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk)
                .await
                .map_err(|source| LauncherError::Io {
                    path: task.dest.clone(),
                    source,
                })?;
            *written += chunk.len() as u64;
        }

        file.flush().await.map_err(|source| LauncherError::Io {
            path: task.dest.clone(),
            source,
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::events::LauncherEvent;
    use std::sync::Mutex;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    struct RecordingSink(Mutex<Vec<LauncherEvent>>);

    impl EventSink for RecordingSink {
        fn emit(&self, event: LauncherEvent) {
            self.0.lock().unwrap().push(event);
        }
    }

    /// Minimal HTTP responder: answers HEAD with the advertised length and
    /// GET with the body, optionally cut short to simulate a broken transfer.
    async fn serve_artifact(body: Vec<u8>, advertised_len: usize, deliver: usize) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let body = body.clone();
                tokio::spawn(async move {
                    let mut buf = vec![0u8; 1024];
                    let n = socket.read(&mut buf).await.unwrap_or(0);
                    let is_head = buf[..n].starts_with(b"HEAD");
                    let header = format!(
                        "HTTP/1.1 200 OK\r\nContent-Length: {advertised_len}\r\nConnection: close\r\n\r\n"
                    );
                    let _ = socket.write_all(header.as_bytes()).await;
                    if !is_head {
                        let _ = socket.write_all(&body[..deliver]).await;
                    }
                    let _ = socket.shutdown().await;
                });
            }
        });
        format!("http://{addr}/dist/app-v2.bin")
    }

    fn downloader() -> Downloader {
        let client = crate::core::http::build_http_client().unwrap();
        Downloader::new(client, Arc::new(RecordingSink(Mutex::new(Vec::new()))))
    }

    #[tokio::test]
    async fn completed_download_matches_probed_size() {
        let body: Vec<u8> = (0..70_000u32).map(|i| (i % 251) as u8).collect();
        let url = serve_artifact(body.clone(), body.len(), body.len()).await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("app-v2.bin");
        downloader().fetch(&url, &dest).await.unwrap();

        let on_disk = std::fs::read(&dest).unwrap();
        assert_eq!(on_disk.len(), body.len());
        assert_eq!(on_disk, body);
    }

    #[tokio::test]
    async fn truncated_transfer_errors_and_leaves_partial_file() {
        let body = vec![7u8; 1_000];
        let url = serve_artifact(body, 1_000, 100).await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("app-v2.bin");
        let result = downloader().fetch(&url, &dest).await;

        // Artifact unusable, not absent: the partial bytes stay behind.
        assert!(result.is_err());
        assert_eq!(std::fs::metadata(&dest).unwrap().len(), 100);
    }

    #[tokio::test]
    async fn missing_content_length_aborts_before_transfer() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = vec![0u8; 1024];
                let _ = socket.read(&mut buf).await;
                let _ = socket
                    .write_all(b"HTTP/1.1 200 OK\r\nConnection: close\r\n\r\n")
                    .await;
                let _ = socket.shutdown().await;
            }
        });

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("app-v2.bin");
        let result = downloader()
            .fetch(&format!("http://{addr}/app-v2.bin"), &dest)
            .await;

        assert!(matches!(
            result,
            Err(LauncherError::MissingContentLength { .. })
        ));
    }
}
