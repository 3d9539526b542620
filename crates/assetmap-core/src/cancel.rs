//! Cancellation for deferred tracker work.
//!
//! A tracker with the auto-dismiss policy spawns a timer task after a
//! terminal status. Re-opening or closing the tracker cancels the timer's
//! token; the task wakes immediately and exits without touching the tracker.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

/// A shared one-way flag that deferred tasks can wait on.
///
/// Clones share state: cancelling any clone cancels them all.
///
/// ```
/// use assetmap_core::cancel::CancellationToken;
///
/// let token = CancellationToken::new();
/// let pending = token.clone();
/// token.cancel();
/// assert!(pending.is_cancelled());
/// ```
#[derive(Debug, Clone)]
pub struct CancellationToken {
    flag: Arc<watch::Sender<bool>>,
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancellationToken {
    pub fn new() -> Self {
        let (flag, _) = watch::channel(false);
        Self {
            flag: Arc::new(flag),
        }
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.flag.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.flag.borrow()
    }

    /// Resolve once the token is cancelled.
    pub async fn cancelled(&self) {
        let mut rx = self.flag.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }

    /// Sleep for `delay` unless cancelled first.
    ///
    /// Returns `true` when the full delay elapsed without cancellation.
    pub async fn sleep_unless_cancelled(&self, delay: Duration) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(delay) => !self.is_cancelled(),
            _ = self.cancelled() => false,
        }
    }
}
