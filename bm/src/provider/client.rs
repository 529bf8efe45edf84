//! ProviderClient trait definition

use async_trait::async_trait;
use tokio::sync::mpsc;
#[allow(unused_imports)]
use tracing::debug;

use super::{GenerateRequest, ProviderError, StreamChunk};
use crate::session::CancelToken;

/// Streaming text generation client
///
/// Each call is one independent generation: fragments are delivered to
/// `chunk_tx` in arrival order, followed by exactly one terminal chunk.
/// Cancellation is cooperative - implementations must check `cancel` at
/// every chunk boundary and, once it reports cancelled, deliver nothing
/// further (no trailing error either). Implementations never retry; a
/// retry is a user-initiated new request.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Stream one generation, delivering chunks until done, error, or cancel
    async fn stream(
        &self,
        request: GenerateRequest,
        chunk_tx: mpsc::Sender<StreamChunk>,
        cancel: CancelToken,
    ) -> Result<(), ProviderError>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tracing::debug;

    /// Scripted provider for unit tests
    ///
    /// Each call consumes the next script in order and replays its chunks,
    /// honoring the cancellation token between chunks like a real client.
    pub struct MockProviderClient {
        scripts: Mutex<Vec<Vec<StreamChunk>>>,
        call_count: AtomicUsize,
    }

    impl MockProviderClient {
        pub fn new(scripts: Vec<Vec<StreamChunk>>) -> Self {
            debug!(script_count = %scripts.len(), "MockProviderClient::new: called");
            Self {
                scripts: Mutex::new(scripts),
                call_count: AtomicUsize::new(0),
            }
        }

        /// Convenience: one call that streams `text` in `pieces` fragments
        pub fn streaming_text(pieces: &[&str]) -> Self {
            let mut chunks: Vec<StreamChunk> = pieces.iter().map(|p| StreamChunk::TextDelta(p.to_string())).collect();
            chunks.push(StreamChunk::Done);
            Self::new(vec![chunks])
        }

        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ProviderClient for MockProviderClient {
        async fn stream(
            &self,
            _request: GenerateRequest,
            chunk_tx: mpsc::Sender<StreamChunk>,
            cancel: CancelToken,
        ) -> Result<(), ProviderError> {
            let idx = self.call_count.fetch_add(1, Ordering::SeqCst);
            debug!(%idx, "MockProviderClient::stream: called");

            let script = {
                let mut scripts = self.scripts.lock().unwrap();
                if scripts.is_empty() {
                    return Err(ProviderError::InvalidResponse("No more mock scripts".to_string()));
                }
                scripts.remove(0)
            };

            for chunk in script {
                if cancel.is_cancelled() {
                    debug!("MockProviderClient::stream: cancelled, going silent");
                    return Ok(());
                }
                let _ = chunk_tx.send(chunk).await;
            }

            Ok(())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::session::CancelSource;

        #[tokio::test]
        async fn test_mock_replays_chunks_in_order() {
            let client = MockProviderClient::streaming_text(&["Use ", "two ", "tablespoons."]);
            let source = CancelSource::new();
            let token = source.issue();

            let (tx, mut rx) = mpsc::channel(16);
            client
                .stream(GenerateRequest::text("sys", "prompt", 256), tx, token)
                .await
                .unwrap();

            let mut collected = String::new();
            let mut done = false;
            while let Some(chunk) = rx.recv().await {
                match chunk {
                    StreamChunk::TextDelta(t) => collected.push_str(&t),
                    StreamChunk::Done => done = true,
                    StreamChunk::Error(e) => panic!("unexpected error: {e}"),
                }
            }

            assert_eq!(collected, "Use two tablespoons.");
            assert!(done);
            assert_eq!(client.call_count(), 1);
        }

        #[tokio::test]
        async fn test_mock_goes_silent_when_cancelled() {
            let client = MockProviderClient::streaming_text(&["never ", "delivered"]);
            let source = CancelSource::new();
            let token = source.issue();

            // Issuing a newer token invalidates the one the stream holds
            let _newer = source.issue();

            let (tx, mut rx) = mpsc::channel(16);
            client
                .stream(GenerateRequest::text("sys", "prompt", 256), tx, token)
                .await
                .unwrap();

            assert_eq!(rx.recv().await, None);
        }

        #[tokio::test]
        async fn test_mock_errors_when_scripts_exhausted() {
            let client = MockProviderClient::new(vec![]);
            let source = CancelSource::new();

            let (tx, _rx) = mpsc::channel(16);
            let result = client
                .stream(GenerateRequest::text("sys", "prompt", 256), tx, source.issue())
                .await;
            assert!(result.is_err());
        }
    }
}
