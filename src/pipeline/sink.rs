//! The sink: single sequential writer of fetched content.
//!
//! All fetchers share one content channel and the sink is its only reader,
//! so file system access needs no locking. Under high fetcher concurrency
//! the sink's write throughput bounds the pipeline.

use std::path::{Path, PathBuf};

use tokio::fs::OpenOptions;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use super::error::SinkError;
use super::model::FetchedContent;
use crate::naming::{sanitize_file_name, unique_destination};

/// Writes every item received on the content channel into `output_dir`.
#[derive(Debug, Clone)]
pub struct Sink {
    output_dir: PathBuf,
    cancel: CancellationToken,
}

impl Sink {
    /// Creates a sink writing into `output_dir`.
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>, cancel: CancellationToken) -> Self {
        Self {
            output_dir: output_dir.into(),
            cancel,
        }
    }

    /// Drains `content_rx` until it closes, writing each item.
    ///
    /// A failed item does not stop later items from being written. After
    /// cancellation, received items are discarded but the channel is still
    /// drained so no fetcher blocks on hand-off.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Cancelled`] if the run was cancelled, otherwise
    /// [`SinkError::WritesFailed`] if any item could not be written.
    #[instrument(skip(self, content_rx), fields(output_dir = %self.output_dir.display()))]
    pub async fn run(self, mut content_rx: mpsc::Receiver<FetchedContent>) -> Result<(), SinkError> {
        let mut received = 0usize;
        let mut written = 0usize;
        let mut discarded = 0usize;
        let mut failed = 0usize;
        let mut first_error: Option<SinkError> = None;

        while let Some(content) = content_rx.recv().await {
            received += 1;
            if self.cancel.is_cancelled() {
                discarded += 1;
                continue;
            }

            let outcome = tokio::select! {
                biased;
                () = self.cancel.cancelled() => None,
                result = write_content(&self.output_dir, content) => Some(result),
            };

            match outcome {
                None => discarded += 1,
                Some(Ok(path)) => {
                    written += 1;
                    debug!(path = %path.display(), "content written");
                }
                Some(Err(error)) => {
                    warn!(%error, "failed to write content");
                    failed += 1;
                    first_error.get_or_insert(error);
                }
            }
        }

        debug!(received, written, failed, discarded, "content channel drained");

        if self.cancel.is_cancelled() {
            return Err(SinkError::Cancelled { discarded });
        }
        match first_error {
            Some(first) => Err(SinkError::WritesFailed {
                failed,
                received,
                first: Box::new(first),
            }),
            None => Ok(()),
        }
    }
}

/// Writes one item to a collision-free path under `output_dir`.
///
/// The file is created with `create_new`, so an existing file is never
/// overwritten. A partially written file is removed on error.
pub(crate) async fn write_content(
    output_dir: &Path,
    content: FetchedContent,
) -> Result<PathBuf, SinkError> {
    let (name, body) = content.into_parts();
    let desired = output_dir.join(sanitize_file_name(&name));
    // Checking up to MAX_DISAMBIGUATORS candidates is blocking IO.
    let lookup = desired.clone();
    let path = tokio::task::spawn_blocking(move || unique_destination(&lookup))
        .await
        .map_err(|e| SinkError::io(desired, std::io::Error::other(e)))??;

    let file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .await
        .map_err(|e| SinkError::io(path.clone(), e))?;

    let mut writer = BufWriter::new(file);
    let result = async {
        writer.write_all(&body).await?;
        writer.flush().await
    }
    .await;

    if let Err(error) = result {
        debug!(path = %path.display(), "removing partial file after write error");
        let _ = tokio::fs::remove_file(&path).await;
        return Err(SinkError::io(path, error));
    }

    Ok(path)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::naming::NamingError;

    #[tokio::test]
    async fn test_write_content_preserves_bytes() {
        let temp_dir = TempDir::new().unwrap();
        let body = vec![0u8, 1, 2, 255, 254];
        let path = write_content(temp_dir.path(), FetchedContent::new("a.bin", body.clone()))
            .await
            .unwrap();

        assert_eq!(path, temp_dir.path().join("a.bin"));
        assert_eq!(std::fs::read(&path).unwrap(), body);
    }

    #[tokio::test]
    async fn test_write_content_does_not_clobber_existing() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("cat.png"), b"old").unwrap();

        let path = write_content(temp_dir.path(), FetchedContent::new("cat.png", b"new".to_vec()))
            .await
            .unwrap();

        assert_eq!(path, temp_dir.path().join("cat_0.png"));
        assert_eq!(std::fs::read(temp_dir.path().join("cat.png")).unwrap(), b"old");
        assert_eq!(std::fs::read(&path).unwrap(), b"new");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_write_content_skips_dangling_symlink() {
        let temp_dir = TempDir::new().unwrap();
        std::os::unix::fs::symlink(temp_dir.path().join("nowhere"), temp_dir.path().join("cat.png"))
            .unwrap();

        let path = write_content(temp_dir.path(), FetchedContent::new("cat.png", b"new".to_vec()))
            .await
            .unwrap();

        assert_eq!(path, temp_dir.path().join("cat_0.png"));
        assert_eq!(std::fs::read(&path).unwrap(), b"new");
    }

    #[tokio::test]
    async fn test_write_content_sanitizes_name() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_content(
            temp_dir.path(),
            FetchedContent::new("../escape.png", b"x".to_vec()),
        )
        .await
        .unwrap();

        assert!(path.starts_with(temp_dir.path()));
        assert_eq!(path.parent().unwrap(), temp_dir.path());
    }

    #[tokio::test]
    async fn test_write_content_missing_directory_is_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing");
        let result = write_content(&missing, FetchedContent::new("a.png", b"x".to_vec())).await;
        assert!(matches!(result, Err(SinkError::Io { .. })));
    }

    #[tokio::test]
    async fn test_sink_writes_all_items_in_order_received() {
        let temp_dir = TempDir::new().unwrap();
        let (tx, rx) = mpsc::channel(4);
        let sink = Sink::new(temp_dir.path(), CancellationToken::new());
        let task = tokio::spawn(sink.run(rx));

        for i in 0..3 {
            tx.send(FetchedContent::new("img.jpg", vec![i])).await.unwrap();
        }
        drop(tx);

        task.await.unwrap().unwrap();
        assert_eq!(std::fs::read(temp_dir.path().join("img.jpg")).unwrap(), [0u8]);
        assert_eq!(std::fs::read(temp_dir.path().join("img_0.jpg")).unwrap(), [1u8]);
        assert_eq!(std::fs::read(temp_dir.path().join("img_1.jpg")).unwrap(), [2u8]);
    }

    #[tokio::test]
    async fn test_sink_continues_after_failed_item() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("full.png"), b"p").unwrap();
        for i in 0..crate::naming::MAX_DISAMBIGUATORS {
            std::fs::write(temp_dir.path().join(format!("full_{i}.png")), b"s").unwrap();
        }

        let (tx, rx) = mpsc::channel(4);
        let task = tokio::spawn(Sink::new(temp_dir.path(), CancellationToken::new()).run(rx));
        tx.send(FetchedContent::new("full.png", b"a".to_vec()))
            .await
            .unwrap();
        tx.send(FetchedContent::new("ok.png", b"b".to_vec()))
            .await
            .unwrap();
        drop(tx);

        let error = task.await.unwrap().unwrap_err();
        match error {
            SinkError::WritesFailed {
                failed,
                received,
                first,
            } => {
                assert_eq!(failed, 1);
                assert_eq!(received, 2);
                assert!(matches!(
                    *first,
                    SinkError::Naming(NamingError::Exhausted { .. })
                ));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(std::fs::read(temp_dir.path().join("ok.png")).unwrap(), b"b");
    }

    #[tokio::test]
    async fn test_sink_discards_after_cancel_and_still_drains() {
        let temp_dir = TempDir::new().unwrap();
        let cancel = CancellationToken::new();
        let (tx, rx) = mpsc::channel(4);
        let task = tokio::spawn(Sink::new(temp_dir.path(), cancel.clone()).run(rx));

        cancel.cancel();
        tx.send(FetchedContent::new("late.png", b"x".to_vec()))
            .await
            .unwrap();
        drop(tx);

        let error = task.await.unwrap().unwrap_err();
        assert!(matches!(error, SinkError::Cancelled { discarded: 1 }));
        assert!(!temp_dir.path().join("late.png").exists());
    }

    #[tokio::test]
    async fn test_sink_empty_channel_succeeds() {
        let temp_dir = TempDir::new().unwrap();
        let (tx, rx) = mpsc::channel::<FetchedContent>(1);
        drop(tx);
        let sink = Sink::new(temp_dir.path(), CancellationToken::new());
        assert!(sink.run(rx).await.is_ok());
    }
}
