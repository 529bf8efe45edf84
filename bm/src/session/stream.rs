//! Bridge between the provider stream and the session event queue
//!
//! Each in-flight request runs in its own task, tagged with the
//! generation of the token it was issued. The controller drops any event
//! whose generation is no longer current, so a superseded stream can
//! never touch the display - even for chunks already in flight.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;

use super::cancel::CancelToken;
use crate::provider::{GenerateRequest, ProviderClient, StreamChunk};

/// An event from an in-flight stream, tagged with its generation
#[derive(Debug)]
pub(crate) enum SessionEvent {
    Chunk { generation: u64, text: String },
    Done { generation: u64 },
    Error { generation: u64, message: String },
}

impl SessionEvent {
    pub(crate) fn generation(&self) -> u64 {
        match self {
            SessionEvent::Chunk { generation, .. }
            | SessionEvent::Done { generation }
            | SessionEvent::Error { generation, .. } => *generation,
        }
    }
}

/// Spawn the task driving one provider stream
///
/// Forwards token-checked chunks into the session event queue. A provider
/// that dies without a terminal chunk still produces exactly one error
/// event, so the controller always observes a terminal.
pub(crate) fn spawn_stream(
    provider: Arc<dyn ProviderClient>,
    request: GenerateRequest,
    token: CancelToken,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
) {
    let generation = token.generation();
    debug!(%generation, "spawn_stream: called");

    tokio::spawn(async move {
        let (chunk_tx, mut chunk_rx) = mpsc::channel::<StreamChunk>(32);

        let drive_token = token.clone();
        let driver = tokio::spawn(async move { provider.stream(request, chunk_tx, drive_token).await });

        let mut terminal_seen = false;
        while let Some(chunk) = chunk_rx.recv().await {
            // Check the token before acting on any delivered callback.
            if token.is_cancelled() {
                debug!(%generation, "spawn_stream: cancelled, dropping remaining chunks");
                break;
            }

            match chunk {
                StreamChunk::TextDelta(text) => {
                    let _ = events_tx.send(SessionEvent::Chunk { generation, text });
                }
                StreamChunk::Done => {
                    terminal_seen = true;
                    let _ = events_tx.send(SessionEvent::Done { generation });
                }
                StreamChunk::Error(message) => {
                    terminal_seen = true;
                    let _ = events_tx.send(SessionEvent::Error { generation, message });
                }
            }
        }

        if !terminal_seen && !token.is_cancelled() {
            let message = match driver.await {
                Ok(Err(e)) => e.to_string(),
                Ok(Ok(())) => "stream ended without completing".to_string(),
                Err(e) => e.to_string(),
            };
            debug!(%generation, %message, "spawn_stream: no terminal chunk, synthesizing error");
            let _ = events_tx.send(SessionEvent::Error { generation, message });
        }
    });
}
