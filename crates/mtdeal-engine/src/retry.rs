//! Retry of transient dealer failures with exponential backoff.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{error, warn};

use mtdeal_broker::BrokerApi;
use mtdeal_core::{TradeRequest, TradeResult, TradeStatus};

/// Backoff schedule for transient dealer failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Executions allowed beyond the first attempt.
    pub max_retries: u32,
    /// Base backoff delay; attempt `n` waits `base * 2^(n-1)` before firing.
    pub retry_base_ms: u64,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, retry_base_ms: u64) -> Self {
        Self {
            max_retries,
            retry_base_ms,
        }
    }

    /// Total executions the budget allows.
    #[must_use]
    pub fn total_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    /// Delay before retry attempt `n` (1-based): 1x, 2x, 4x, ... the base.
    #[must_use]
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        // Doubling capped; retry budgets are small integers.
        let shift = attempt.saturating_sub(1).min(20);
        Duration::from_millis(self.retry_base_ms.saturating_mul(1 << shift))
    }
}

/// Drives a single request through up to `max_retries + 1` dealer calls.
///
/// Only `CONNECTION_ERROR` and `REJECTED` outcomes are attempted again;
/// every other status terminates the loop immediately. The backoff sleep
/// is the only suspension point after validation.
pub struct RetryExecutor {
    broker: Arc<dyn BrokerApi>,
    policy: RetryPolicy,
}

impl RetryExecutor {
    pub fn new(broker: Arc<dyn BrokerApi>, policy: RetryPolicy) -> Self {
        Self { broker, policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Execute with retry. The returned `retry_count` is the zero-based
    /// index of the last attempt performed; on an exhausted budget the
    /// status becomes `RETRY_EXHAUSTED` with the last underlying error
    /// preserved behind an attempt-count prefix.
    pub fn execute(&self, request: &TradeRequest) -> TradeResult {
        let mut result = self.attempt(request, 0);
        let mut attempt = 0;

        while result.is_retryable() && attempt < self.policy.max_retries {
            warn!(
                request_id = %request.request_id,
                status = %result.status,
                error = %result.error_message,
                "transient dealer failure"
            );

            attempt += 1;
            let delay = self.policy.backoff_delay(attempt);
            warn!(
                request_id = %request.request_id,
                attempt = attempt + 1,
                total = self.policy.total_attempts(),
                delay_ms = delay.as_millis() as u64,
                "retrying"
            );
            thread::sleep(delay);

            result = self.attempt(request, attempt);
        }

        if result.is_retryable() {
            result.error_message = format!(
                "All {} attempts failed. Last error: {}",
                self.policy.total_attempts(),
                result.error_message
            );
            result.status = TradeStatus::RetryExhausted;
        }

        result
    }

    /// One dealer call with the attempt index stamped on the outcome. A
    /// panicking broker is mapped to a retryable `CONNECTION_ERROR` so it
    /// falls under the same policy as any other transient failure.
    fn attempt(&self, request: &TradeRequest, attempt: u32) -> TradeResult {
        let mut result = catch_unwind(AssertUnwindSafe(|| self.broker.execute_trade(request)))
            .unwrap_or_else(|_| {
                error!(request_id = %request.request_id, "broker panicked during DealerSend");
                TradeResult::failure(
                    request,
                    TradeStatus::ConnectionError,
                    "Broker failure during DealerSend()",
                )
            });
        result.retry_count = attempt;
        result
    }
}
