//! Deadlines and cancellation for a write call.

use crate::error::{EngineError, EngineResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A shareable cancellation flag.
///
/// Cloning shares the flag: cancelling any clone cancels every context that
/// carries one.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Creates an un-cancelled token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Returns true once [`CancelToken::cancel`] was called on any clone.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Caller-supplied bounds for one write call.
///
/// Engines check the context at every call boundary. A cancelled or expired
/// context makes the call fail, which rolls the whole write back.
#[derive(Debug, Clone, Default)]
pub struct WriteContext {
    deadline: Option<Instant>,
    cancel: Option<CancelToken>,
}

impl WriteContext {
    /// A context with no deadline and no cancellation.
    #[must_use]
    pub fn background() -> Self {
        Self::default()
    }

    /// Sets an absolute deadline.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Sets a deadline `timeout` from now.
    ///
    /// A timeout too large to represent as an `Instant` leaves the context
    /// without a deadline.
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.with_deadline(deadline),
            None => self,
        }
    }

    /// Attaches a cancellation token.
    #[must_use]
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Returns true if the context carries a deadline or a cancellation token.
    #[must_use]
    pub fn is_bounded(&self) -> bool {
        self.deadline.is_some() || self.cancel.is_some()
    }

    /// Returns the deadline, if any.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Fails if the call was cancelled or its deadline has passed.
    pub fn check(&self) -> EngineResult<()> {
        if self.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
            return Err(EngineError::Cancelled);
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(EngineError::DeadlineExceeded);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn background_never_fails() {
        assert!(WriteContext::background().check().is_ok());
        assert!(!WriteContext::background().is_bounded());
        assert!(WriteContext::background()
            .with_cancel(CancelToken::new())
            .is_bounded());
    }

    #[test]
    fn cancel_is_shared_between_clones() {
        let token = CancelToken::new();
        let ctx = WriteContext::background().with_cancel(token.clone());
        assert!(ctx.check().is_ok());

        token.cancel();
        assert!(matches!(ctx.check(), Err(EngineError::Cancelled)));
    }

    #[test]
    fn expired_deadline_fails() {
        let ctx = WriteContext::background().with_deadline(Instant::now());
        assert!(matches!(ctx.check(), Err(EngineError::DeadlineExceeded)));

        let ctx = WriteContext::background().with_timeout(Duration::from_secs(3600));
        assert!(ctx.check().is_ok());
        assert!(ctx.deadline().is_some());
    }

    #[test]
    fn unrepresentable_timeout_means_no_deadline() {
        let ctx = WriteContext::background().with_timeout(Duration::MAX);
        assert!(ctx.deadline().is_none());
        assert!(ctx.check().is_ok());
    }
}
