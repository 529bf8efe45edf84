//! Epoch-based cooperative cancellation
//!
//! The session controller owns one [`CancelSource`]. Issuing a token bumps
//! the epoch, which invalidates every previously issued token - acquiring
//! a new token is the only sanctioned way to cancel the old stream, so at
//! most one token is ever valid.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

/// Issues tokens and tracks which generation is current
#[derive(Debug, Default)]
pub struct CancelSource {
    epoch: Arc<AtomicU64>,
}

impl CancelSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a fresh token, invalidating all previously issued tokens
    pub fn issue(&self) -> CancelToken {
        let generation = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(%generation, "CancelSource::issue: called");
        CancelToken {
            generation,
            epoch: Arc::clone(&self.epoch),
        }
    }

    /// Invalidate the currently valid token without issuing a new one
    pub fn cancel(&self) {
        let generation = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(%generation, "CancelSource::cancel: called");
    }

    /// The generation of the most recently issued or cancelled token
    pub fn current_generation(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }
}

/// A token handed to one in-flight stream
///
/// Cheap to clone; all clones share the same validity.
#[derive(Debug, Clone)]
pub struct CancelToken {
    generation: u64,
    epoch: Arc<AtomicU64>,
}

impl CancelToken {
    /// True once a newer token has been issued (or cancel was requested)
    pub fn is_cancelled(&self) -> bool {
        self.epoch.load(Ordering::SeqCst) != self.generation
    }

    /// The generation this token belongs to
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_token_is_valid() {
        let source = CancelSource::new();
        let token = source.issue();
        assert!(!token.is_cancelled());
    }

    #[test]
    fn test_issuing_invalidates_previous() {
        let source = CancelSource::new();
        let first = source.issue();
        let second = source.issue();

        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());
    }

    #[test]
    fn test_cancel_invalidates_without_issuing() {
        let source = CancelSource::new();
        let token = source.issue();

        source.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_clones_share_validity() {
        let source = CancelSource::new();
        let token = source.issue();
        let clone = token.clone();

        source.issue();
        assert!(token.is_cancelled());
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_generations_increase() {
        let source = CancelSource::new();
        let a = source.issue();
        let b = source.issue();
        assert!(b.generation() > a.generation());
        assert_eq!(source.current_generation(), b.generation());
    }
}
