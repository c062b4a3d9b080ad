//! Per-request time budget and cancellation

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::error::{EngineError, Result};

/// Deadline plus cancellation flag, checked at every traversal frontier.
#[derive(Debug, Clone)]
pub struct RequestBudget {
    started: Instant,
    deadline: Option<Instant>,
    cancelled: Arc<AtomicBool>,
}

/// Handle a collaborator keeps to abort a running request.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

impl RequestBudget {
    /// A budget that never expires unless cancelled.
    pub fn unbounded() -> Self {
        Self {
            started: Instant::now(),
            deadline: None,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Expire `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        let started = Instant::now();
        Self {
            started,
            deadline: Some(started + timeout),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn from_millis(timeout_ms: Option<u64>) -> Self {
        match timeout_ms {
            Some(ms) => Self::with_timeout(Duration::from_millis(ms)),
            None => Self::unbounded(),
        }
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            cancelled: Arc::clone(&self.cancelled),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Whether the deadline passed or the request was cancelled.
    pub fn is_exhausted(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
            || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Fail with [`EngineError::Timeout`] once the budget is spent.
    pub fn check(&self, stage: &'static str) -> Result<()> {
        if self.is_exhausted() {
            tracing::warn!("Request budget exhausted during {}", stage);
            return Err(EngineError::Timeout {
                stage,
                elapsed_ms: self.elapsed().as_millis(),
            });
        }
        Ok(())
    }
}

impl Default for RequestBudget {
    fn default() -> Self {
        Self::unbounded()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unbounded_budget_never_expires() {
        let budget = RequestBudget::unbounded();
        assert!(budget.check("walk").is_ok());
    }

    #[test]
    fn zero_timeout_expires_immediately() {
        let budget = RequestBudget::with_timeout(Duration::ZERO);
        let err = budget.check("walk").unwrap_err();
        assert!(matches!(err, EngineError::Timeout { stage: "walk", .. }));
    }

    #[test]
    fn cancel_handle_exhausts_clones() {
        let budget = RequestBudget::unbounded();
        let shared = budget.clone();
        budget.cancel_handle().cancel();
        assert!(shared.is_exhausted());
    }
}
