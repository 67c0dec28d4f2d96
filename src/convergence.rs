use crate::cluster::{QueryExecutor, Statement};
use crate::core::{HarnessError, Result};
use crate::routing::ConsistencyLevel;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, sleep};
use tracing::{Level, event};

/// A condition re-evaluated by [`ConvergenceWaiter::poll`].
///
/// Evaluation errors count as "not yet"; implementations decide what they log.
#[async_trait]
pub trait ConvergencePredicate: Send {
    async fn evaluate(&mut self) -> bool;

    fn describe(&self) -> String {
        "predicate".to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PollOutcome {
    Succeeded { attempts: u32, elapsed_ms: u64 },
    TimedOut { attempts: u32, elapsed_ms: u64 },
}

impl PollOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }

    pub fn attempts(&self) -> u32 {
        match self {
            Self::Succeeded { attempts, .. } | Self::TimedOut { attempts, .. } => *attempts,
        }
    }
}

/// Sleep-then-recheck wait with capped exponential backoff.
///
/// The predicate is never evaluated concurrently with itself, and `poll` returns no
/// later than `timeout` plus one evaluation of the predicate.
#[derive(Debug, Clone, Copy)]
pub struct ConvergenceWaiter {
    initial_interval: Duration,
    max_interval: Duration,
}

impl Default for ConvergenceWaiter {
    fn default() -> Self {
        Self::new(Duration::from_millis(25), Duration::from_millis(400))
    }
}

impl ConvergenceWaiter {
    pub fn new(initial_interval: Duration, max_interval: Duration) -> Self {
        let initial_interval = initial_interval.max(Duration::from_millis(1));
        Self {
            initial_interval,
            max_interval: max_interval.max(initial_interval),
        }
    }

    pub fn fixed(interval: Duration) -> Self {
        Self::new(interval, interval)
    }

    pub async fn poll<P>(&self, predicate: &mut P, timeout: Duration) -> PollOutcome
    where
        P: ConvergencePredicate + ?Sized,
    {
        let started = Instant::now();
        let deadline = started + timeout;
        let mut interval = self.initial_interval;
        let mut attempts = 0u32;

        loop {
            attempts = attempts.saturating_add(1);
            if predicate.evaluate().await {
                return PollOutcome::Succeeded {
                    attempts,
                    elapsed_ms: started.elapsed().as_millis() as u64,
                };
            }

            let now = Instant::now();
            if now >= deadline {
                return PollOutcome::TimedOut {
                    attempts,
                    elapsed_ms: started.elapsed().as_millis() as u64,
                };
            }
            // Never sleep past the deadline; the final evaluation happens right at it.
            sleep(interval.min(deadline - now)).await;
            interval = interval.saturating_mul(2).min(self.max_interval);
        }
    }

    /// Polls and turns a timeout into `HarnessError::ConvergenceTimeout`.
    pub async fn wait_until<P>(&self, predicate: &mut P, timeout: Duration) -> Result<PollOutcome>
    where
        P: ConvergencePredicate + ?Sized,
    {
        let outcome = self.poll(predicate, timeout).await;
        match outcome {
            PollOutcome::Succeeded { attempts, elapsed_ms } => {
                event!(Level::DEBUG, attempts, elapsed_ms, "converged");
                Ok(outcome)
            }
            PollOutcome::TimedOut { attempts, elapsed_ms } => {
                event!(Level::WARN, attempts, elapsed_ms, "convergence timed out");
                Err(HarnessError::ConvergenceTimeout(format!(
                    "{} not satisfied after {} attempts in {}ms (budget {}ms)",
                    predicate.describe(),
                    attempts,
                    elapsed_ms,
                    timeout.as_millis()
                )))
            }
        }
    }
}

/// Holds once a read at `level` returns `expected_rows`.
pub struct RowCountPredicate {
    executor: Arc<dyn QueryExecutor>,
    statement: Statement,
    level: ConsistencyLevel,
    expected_rows: usize,
}

impl RowCountPredicate {
    pub fn new(
        executor: Arc<dyn QueryExecutor>,
        table: &str,
        level: ConsistencyLevel,
        expected_rows: usize,
    ) -> Self {
        Self {
            executor,
            statement: Statement::select_all(table),
            level,
            expected_rows,
        }
    }
}

#[async_trait]
impl ConvergencePredicate for RowCountPredicate {
    async fn evaluate(&mut self) -> bool {
        match self.executor.execute(&self.statement, self.level).await {
            Ok(outcome) => outcome.row_count == self.expected_rows,
            Err(err) => {
                event!(Level::DEBUG, error = %err, level = %self.level, "row count probe failed");
                false
            }
        }
    }

    fn describe(&self) -> String {
        format!(
            "read of {} rows at {} from {}",
            self.expected_rows,
            self.level,
            self.statement.table()
        )
    }
}
