/// Periodic task runner with circuit breaker
///
/// Runs one iteration of a background job every `interval`, retrying
/// failures with exponential backoff. A job that keeps failing is stopped
/// and reported to the caller rather than retried forever.

use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, warn};

/// Circuit breaker configuration for background tasks
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures after which the task is stopped
    pub max_consecutive_failures: u32,
    /// Initial delay between retries
    pub initial_retry_delay: Duration,
    /// Maximum delay between retries
    pub max_retry_delay: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            max_consecutive_failures: 10,
            initial_retry_delay: Duration::from_secs(5),
            max_retry_delay: Duration::from_secs(300),
        }
    }
}

/// Why a periodic task stopped
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
#[error("Task '{task_name}' stopped after {failures} consecutive failures, last error: {last_error}")]
pub struct TaskAborted {
    pub task_name: String,
    pub failures: u32,
    pub last_error: String,
}

/// Internal state for circuit breaker
#[derive(Debug)]
struct CircuitBreakerState {
    consecutive_failures: u32,
    current_retry_delay: Duration,
}

impl CircuitBreakerState {
    fn new(initial_delay: Duration) -> Self {
        Self {
            consecutive_failures: 0,
            current_retry_delay: initial_delay,
        }
    }

    /// Returns the delay to wait before the next attempt
    fn record_failure(&mut self, max_delay: Duration) -> Duration {
        self.consecutive_failures += 1;
        let delay = self.current_retry_delay;
        // Exponential backoff with cap
        self.current_retry_delay = std::cmp::min(self.current_retry_delay * 2, max_delay);
        delay
    }

    fn reset(&mut self, initial_delay: Duration) {
        self.consecutive_failures = 0;
        self.current_retry_delay = initial_delay;
    }
}

/// Run `task_fn` immediately and then once per `interval`.
///
/// A failed iteration is retried after the current backoff delay instead of
/// waiting the full interval. Only returns once the task has failed
/// `max_consecutive_failures` times in a row.
pub async fn run_periodically<F, Fut>(
    task_name: &str,
    interval: Duration,
    config: CircuitBreakerConfig,
    mut task_fn: F,
) -> Result<(), TaskAborted>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<(), String>>,
{
    let mut state = CircuitBreakerState::new(config.initial_retry_delay);

    loop {
        match task_fn().await {
            Ok(()) => {
                if state.consecutive_failures > 0 {
                    info!(
                        "Task '{}' recovered after {} failures",
                        task_name, state.consecutive_failures
                    );
                }
                state.reset(config.initial_retry_delay);
                sleep(interval).await;
            }
            Err(e) => {
                let delay = state.record_failure(config.max_retry_delay);
                error!(
                    "Task '{}' failed (attempt {}/{}): {}",
                    task_name, state.consecutive_failures, config.max_consecutive_failures, e
                );

                if state.consecutive_failures >= config.max_consecutive_failures {
                    return Err(TaskAborted {
                        task_name: task_name.to_string(),
                        failures: state.consecutive_failures,
                        last_error: e,
                    });
                }

                warn!("Task '{}' will retry in {:?}", task_name, delay);
                sleep(delay).await;
            }
        }
    }
}
