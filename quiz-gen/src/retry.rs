//! Attempt/backoff state machine for generation calls.
//!
//! One generation is a sequence of provider calls. After each call the
//! [`RetryPolicy`] maps the call's [`AttemptOutcome`] to the next
//! [`AttemptState`]; [`run_attempts`] drives the machine, sleeping through
//! backoff states, until it reaches `Succeeded` or `Failed`.
//!
//! | outcome | budget left | budget spent |
//! |---|---|---|
//! | parsed | `Succeeded` | `Succeeded` |
//! | insufficient context | `Failed` | `Failed` |
//! | malformed output | `BackoffShort` | `Failed` (invalid output) |
//! | rate limited | `BackoffRateLimited` | `BackoffRateLimited`, then `Failed` (upstream) |
//! | other provider error | `BackoffShort` | `Failed` (upstream) |

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::GeneratorConfig;
use crate::error::{GenerateError, LlmError, Result};

/// What one provider call produced.
#[derive(Debug)]
pub enum AttemptOutcome<T> {
    /// Usable output.
    Parsed(T),
    /// The response was not valid JSON.
    Malformed(String),
    /// The model said the context was not enough.
    InsufficientContext,
    /// The provider call itself failed.
    ProviderError(LlmError),
}

/// A state of the attempt loop.
#[derive(Debug)]
pub enum AttemptState<T> {
    /// About to make call number `attempt` (1-based).
    Attempting { attempt: u32 },
    /// Waiting the short delay before `next_attempt`.
    BackoffShort { next_attempt: u32, delay: Duration },
    /// Waiting the rate-limit delay before `next_attempt`.
    BackoffRateLimited { next_attempt: u32, delay: Duration },
    /// Done with a result.
    Succeeded(T),
    /// Done with a fatal error.
    Failed(GenerateError),
}

/// Attempt budget and backoff delays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total calls allowed, first call included.
    pub max_attempts: u32,
    /// Wait after malformed output or an ordinary provider error.
    pub retry_delay: Duration,
    /// Minimum wait after a rate-limit error; a longer `retry_after` wins.
    pub rate_limit_delay: Duration,
}

impl RetryPolicy {
    /// Take the policy fields from a generator config.
    pub fn from_config(config: &GeneratorConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            retry_delay: config.retry_delay,
            rate_limit_delay: config.rate_limit_delay,
        }
    }

    /// The state following call number `attempt` with `outcome`.
    pub fn next<T>(&self, attempt: u32, outcome: AttemptOutcome<T>) -> AttemptState<T> {
        let last = attempt >= self.max_attempts;
        match outcome {
            AttemptOutcome::Parsed(value) => AttemptState::Succeeded(value),
            AttemptOutcome::InsufficientContext => AttemptState::Failed(GenerateError::InsufficientContext),
            AttemptOutcome::Malformed(message) if last => {
                AttemptState::Failed(GenerateError::InvalidOutput { attempts: attempt, message })
            }
            AttemptOutcome::Malformed(_) => {
                AttemptState::BackoffShort { next_attempt: attempt + 1, delay: self.retry_delay }
            }
            AttemptOutcome::ProviderError(e) if e.is_rate_limited() => {
                let delay = match &e {
                    LlmError::RateLimited { retry_after: Some(hint) } => self.rate_limit_delay.max(*hint),
                    _ => self.rate_limit_delay,
                };
                AttemptState::BackoffRateLimited { next_attempt: attempt + 1, delay }
            }
            AttemptOutcome::ProviderError(source) if last => {
                AttemptState::Failed(GenerateError::Upstream { attempts: attempt, source })
            }
            AttemptOutcome::ProviderError(_) => {
                AttemptState::BackoffShort { next_attempt: attempt + 1, delay: self.retry_delay }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&GeneratorConfig::default())
    }
}

/// Drive `call` through the state machine until it succeeds or fails.
///
/// `call` receives the 1-based attempt number. A rate-limit error always
/// waits out its delay, even after the last attempt, before the call fails.
pub async fn run_attempts<T, F, Fut>(policy: &RetryPolicy, mut call: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = AttemptOutcome<T>>,
{
    let mut state = AttemptState::Attempting { attempt: 1 };
    let mut last_error: Option<LlmError> = None;

    loop {
        state = match state {
            AttemptState::Attempting { attempt } if attempt > policy.max_attempts => {
                let source = last_error
                    .take()
                    .unwrap_or_else(|| LlmError::Request("attempt budget exhausted".to_string()));
                AttemptState::Failed(GenerateError::Upstream { attempts: policy.max_attempts, source })
            }
            AttemptState::Attempting { attempt } => {
                debug!(attempt, max = policy.max_attempts, "calling provider");
                let outcome = call(attempt).await;
                match &outcome {
                    AttemptOutcome::Malformed(message) => {
                        warn!(attempt, max = policy.max_attempts, error = %message, "provider returned malformed output");
                    }
                    AttemptOutcome::ProviderError(e) => {
                        warn!(attempt, max = policy.max_attempts, error = %e, rate_limited = e.is_rate_limited(), "provider call failed");
                        last_error = Some(e.clone());
                    }
                    _ => {}
                }
                policy.next(attempt, outcome)
            }
            AttemptState::BackoffShort { next_attempt, delay }
            | AttemptState::BackoffRateLimited { next_attempt, delay } => {
                debug!(next_attempt, backoff_ms = delay.as_millis() as u64, "backing off");
                tokio::time::sleep(delay).await;
                AttemptState::Attempting { attempt: next_attempt }
            }
            AttemptState::Succeeded(value) => return Ok(value),
            AttemptState::Failed(error) => return Err(error),
        };
    }
}
