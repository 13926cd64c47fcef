//! Cancellation and deadline handling for generator invocations

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Why an invocation was stopped before the generator exited on its own
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Cancelled,
    DeadlineExceeded,
}

/// Cancellation token plus an optional absolute deadline.
///
/// Contexts derived from a parent token are cancelled together with the parent,
/// but cancelling a derived context leaves the parent untouched.
#[derive(Debug, Clone, Default)]
pub struct InvocationContext {
    token: CancellationToken,
    deadline: Option<Instant>,
    timeout: Option<Duration>,
}

impl InvocationContext {
    /// A context with no parent and no deadline
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parent(parent: &CancellationToken) -> Self {
        Self {
            token: parent.child_token(),
            deadline: None,
            timeout: None,
        }
    }

    /// Set the deadline to `timeout` from now. A timeout too large to represent
    /// as an instant leaves the context without a deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Instant::now().checked_add(timeout);
        self.timeout = Some(timeout);
        self
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Non-blocking check. Cancellation wins over an expired deadline.
    pub fn stop_reason(&self) -> Option<StopReason> {
        if self.token.is_cancelled() {
            return Some(StopReason::Cancelled);
        }
        match self.deadline {
            Some(deadline) if deadline <= Instant::now() => Some(StopReason::DeadlineExceeded),
            _ => None,
        }
    }

    /// Resolves once the context is cancelled or its deadline passes
    pub async fn done(&self) -> StopReason {
        match self.deadline {
            Some(deadline) => tokio::select! {
                biased;
                _ = self.token.cancelled() => StopReason::Cancelled,
                _ = tokio::time::sleep_until(deadline) => StopReason::DeadlineExceeded,
            },
            None => {
                self.token.cancelled().await;
                StopReason::Cancelled
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_context_is_live() {
        let ctx = InvocationContext::new().with_timeout(Duration::from_secs(60));
        assert_eq!(ctx.stop_reason(), None);
        assert_eq!(ctx.timeout(), Some(Duration::from_secs(60)));
        assert!(ctx.deadline().is_some());
    }

    #[test]
    fn test_parent_cancellation_propagates() {
        let parent = CancellationToken::new();
        let ctx = InvocationContext::from_parent(&parent);

        parent.cancel();
        assert_eq!(ctx.stop_reason(), Some(StopReason::Cancelled));
    }

    #[test]
    fn test_child_cancellation_does_not_reach_parent() {
        let parent = CancellationToken::new();
        let ctx = InvocationContext::from_parent(&parent);

        ctx.cancel();
        assert_eq!(ctx.stop_reason(), Some(StopReason::Cancelled));
        assert!(!parent.is_cancelled());
    }

    #[test]
    fn test_zero_timeout_is_already_expired() {
        let ctx = InvocationContext::new().with_timeout(Duration::ZERO);
        assert_eq!(ctx.stop_reason(), Some(StopReason::DeadlineExceeded));
    }

    #[test]
    fn test_unrepresentable_timeout_has_no_deadline() {
        let ctx = InvocationContext::new().with_timeout(Duration::MAX);
        assert_eq!(ctx.deadline(), None);
        assert_eq!(ctx.timeout(), Some(Duration::MAX));
        assert_eq!(ctx.stop_reason(), None);

        let ctx = InvocationContext::new().with_timeout(Duration::from_secs(u64::MAX));
        assert_eq!(ctx.deadline(), None);
    }

    #[tokio::test]
    async fn test_done_reports_deadline() {
        let ctx = InvocationContext::new().with_timeout(Duration::from_millis(20));
        assert_eq!(ctx.done().await, StopReason::DeadlineExceeded);
    }

    #[tokio::test]
    async fn test_done_reports_cancellation() {
        let ctx = InvocationContext::new().with_timeout(Duration::from_secs(60));
        let handle = ctx.clone();
        tokio::spawn(async move { handle.cancel() });

        assert_eq!(ctx.done().await, StopReason::Cancelled);
    }
}
