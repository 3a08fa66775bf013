//! Time and cancellation budget for one chat turn.
//!
//! Every awaitable step of a turn (embedding, searches, generation) runs through
//! [`TurnBudget::run`], which races the step against the turn deadline and the turn's
//! cancellation token.

use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Why a budgeted step did not complete.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetExceeded {
    #[error("deadline reached")]
    Timeout,
    #[error("cancelled")]
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct TurnBudget {
    total: Duration,
    deadline: Instant,
    cancel: CancellationToken,
}

impl TurnBudget {
    pub fn new(total: Duration, cancel: CancellationToken) -> Self {
        Self {
            total,
            deadline: Instant::now() + total,
            cancel,
        }
    }

    /// The whole turn budget this was created with.
    pub fn total(&self) -> Duration {
        self.total
    }

    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// A budget sharing this turn's cancellation token whose deadline is `fraction` of
    /// the time remaining now (never later than the turn deadline).
    pub fn share(&self, fraction: f64) -> TurnBudget {
        let slice = self.remaining().mul_f64(fraction.clamp(0.0, 1.0));
        TurnBudget {
            total: slice,
            deadline: Instant::now() + slice,
            cancel: self.cancel.clone(),
        }
    }

    /// Runs `fut` until it completes, the deadline passes or the token is cancelled.
    /// Cancellation is checked first, so an already-cancelled turn never starts a step.
    pub async fn run<F, T>(&self, fut: F) -> Result<T, BudgetExceeded>
    where
        F: Future<Output = T>,
    {
        if self.cancel.is_cancelled() {
            return Err(BudgetExceeded::Cancelled);
        }
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(BudgetExceeded::Cancelled),
            _ = tokio::time::sleep_until(self.deadline) => Err(BudgetExceeded::Timeout),
            out = fut => Ok(out),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn completes_within_budget() {
        let budget = TurnBudget::new(Duration::from_secs(5), CancellationToken::new());
        assert_eq!(budget.run(async { 42 }).await, Ok(42));
    }

    #[tokio::test]
    async fn times_out_slow_step() {
        let budget = TurnBudget::new(Duration::from_millis(20), CancellationToken::new());
        let result = budget
            .run(tokio::time::sleep(Duration::from_secs(5)))
            .await;
        assert_eq!(result, Err(BudgetExceeded::Timeout));
    }

    #[tokio::test]
    async fn cancelled_token_stops_step() {
        let token = CancellationToken::new();
        let budget = TurnBudget::new(Duration::from_secs(5), token.clone());

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            token.cancel();
        });
        let result = budget
            .run(tokio::time::sleep(Duration::from_secs(5)))
            .await;
        canceller.await.unwrap();

        assert_eq!(result, Err(BudgetExceeded::Cancelled));
        assert!(budget.is_cancelled());
    }

    #[tokio::test]
    async fn share_is_bounded_by_remaining_time() {
        let budget = TurnBudget::new(Duration::from_secs(10), CancellationToken::new());
        let half = budget.share(0.5);
        assert!(half.remaining() <= Duration::from_secs(5));
        assert!(half.remaining() > Duration::from_secs(4));
    }
}
