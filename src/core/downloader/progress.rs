// ─── Progress Reporter ───
// Polls growth of a partially written file against the expected total and
// emits percentage status events on a fixed cadence.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::error;

use crate::core::events::{EventSink, LauncherEvent};

const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Percentage of `total` covered by `observed` bytes.
///
/// A zero observed size counts as one byte so the ratio stays defined and
/// reads as roughly 0%. `total` is the probed size and is always > 0.
pub fn percent_complete(observed: u64, total: u64) -> f64 {
    let observed = observed.max(1);
    observed as f64 / total as f64 * 100.0
}

/// Watch `dest` until the completion signal fires, emitting one percentage
/// status per poll tick.
///
/// The owner must send on `done` even when the transfer finishes early; the
/// reporter never stops on file-size convergence alone. A stat failure on a
/// file that is expected to exist ends the reporter.
pub async fn report(
    dest: PathBuf,
    expected_size: u64,
    mut done: oneshot::Receiver<u64>,
    sink: Arc<dyn EventSink>,
) {
    let mut ticker = tokio::time::interval(POLL_INTERVAL);
    loop {
        tokio::select! {
            _ = &mut done => return,
            _ = ticker.tick() => {
                let observed = match tokio::fs::metadata(&dest).await {
                    Ok(meta) => meta.len(),
                    Err(e) => {
                        error!("Cannot stat {:?} while reporting progress: {}", dest, e);
                        return;
                    }
                };
                let percent = percent_complete(observed, expected_size);
                sink.emit(LauncherEvent::status(format!("{percent:.0}% downloaded")));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingSink(Mutex<Vec<LauncherEvent>>);

    impl EventSink for RecordingSink {
        fn emit(&self, event: LauncherEvent) {
            self.0.lock().unwrap().push(event);
        }
    }

    #[test]
    fn zero_observed_size_counts_as_one_byte() {
        let percent = percent_complete(0, 1_000_000);
        assert!(percent > 0.0);
        assert!(percent < 0.001);
    }

    #[test]
    fn percent_is_never_negative() {
        for observed in [0, 1, 512, 1024] {
            for total in [1, 512, 1024, u64::MAX] {
                assert!(percent_complete(observed, total) >= 0.0);
            }
        }
    }

    #[test]
    fn full_file_reads_one_hundred_percent() {
        assert_eq!(percent_complete(2048, 2048), 100.0);
    }

    #[tokio::test(start_paused = true)]
    async fn reporter_stops_on_completion_signal_only() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("artifact.bin");
        std::fs::write(&dest, vec![0u8; 50]).unwrap();

        let sink = Arc::new(RecordingSink(Mutex::new(Vec::new())));
        let (tx, rx) = oneshot::channel();
        let handle = tokio::spawn(report(dest, 100, rx, sink.clone()));

        // File reached its full size; the reporter must keep going until told.
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(!handle.is_finished());

        tx.send(100).unwrap();
        handle.await.unwrap();

        let events = sink.0.lock().unwrap();
        assert!(events
            .iter()
            .all(|e| matches!(e, LauncherEvent::StatusUpdate { message } if message.ends_with("% downloaded"))));
        assert!(!events.is_empty());
    }
}
