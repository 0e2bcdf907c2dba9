//! Configuration for generation and refinement.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{GenerateError, Result};

/// Retry, sampling and concurrency parameters shared by the generator and refiner.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Total provider calls allowed per generation, first call included.
    pub max_attempts: u32,
    /// Wait before retrying after malformed output or an ordinary provider error.
    #[serde(with = "duration_secs")]
    pub retry_delay: Duration,
    /// Wait before retrying after the provider rate-limited us.
    #[serde(with = "duration_secs")]
    pub rate_limit_delay: Duration,
    /// Sampling temperature for every call.
    pub temperature: f32,
    /// Refinements in flight at once during a batch.
    pub refine_concurrency: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay: Duration::from_secs(1),
            rate_limit_delay: Duration::from_secs(5),
            temperature: 0.2,
            refine_concurrency: 5,
        }
    }
}

impl GeneratorConfig {
    /// Create a new builder for constructing a [`GeneratorConfig`].
    pub fn builder() -> GeneratorConfigBuilder {
        GeneratorConfigBuilder::default()
    }

    /// Check the invariants the builder enforces.
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(GenerateError::Config("max_attempts must be at least 1".to_string()));
        }
        if self.refine_concurrency == 0 {
            return Err(GenerateError::Config(
                "refine_concurrency must be greater than zero".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(GenerateError::Config(format!(
                "temperature ({}) must be within 0.0..=2.0",
                self.temperature
            )));
        }
        Ok(())
    }
}

/// Builder for constructing a validated [`GeneratorConfig`].
#[derive(Debug, Clone, Default)]
pub struct GeneratorConfigBuilder {
    config: GeneratorConfig,
}

impl GeneratorConfigBuilder {
    /// Set the attempt budget.
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.config.max_attempts = attempts;
        self
    }

    /// Set the short backoff.
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.config.retry_delay = delay;
        self
    }

    /// Set the rate-limit backoff.
    pub fn rate_limit_delay(mut self, delay: Duration) -> Self {
        self.config.rate_limit_delay = delay;
        self
    }

    /// Set the sampling temperature.
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.config.temperature = temperature;
        self
    }

    /// Set the batch refinement pool size.
    pub fn refine_concurrency(mut self, workers: usize) -> Self {
        self.config.refine_concurrency = workers;
        self
    }

    /// Build the [`GeneratorConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`GenerateError::Config`] if:
    /// - `max_attempts == 0`
    /// - `refine_concurrency == 0`
    /// - `temperature` is outside `0.0..=2.0`
    pub fn build(self) -> Result<GeneratorConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

// ---------------------------------------------------------------------------
// Serde helper for `Duration`
// ---------------------------------------------------------------------------

/// `Duration` as a number of seconds, so `retry_delay = 1.5` reads naturally.
mod duration_secs {
    use std::time::Duration;

    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(duration.as_secs_f64())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_pipeline_constants() {
        let config = GeneratorConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.retry_delay, Duration::from_secs(1));
        assert_eq!(config.rate_limit_delay, Duration::from_secs(5));
        assert_eq!(config.refine_concurrency, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_attempts_rejected() {
        let err = GeneratorConfig::builder().max_attempts(0).build().unwrap_err();
        assert!(matches!(err, GenerateError::Config(_)));
    }

    #[test]
    fn zero_workers_rejected() {
        assert!(GeneratorConfig::builder().refine_concurrency(0).build().is_err());
    }

    #[test]
    fn out_of_range_temperature_rejected() {
        assert!(GeneratorConfig::builder().temperature(3.5).build().is_err());
        assert!(GeneratorConfig::builder().temperature(0.0).build().is_ok());
    }

    #[test]
    fn delays_are_seconds_on_the_wire() {
        let config: GeneratorConfig =
            serde_json::from_str(r#"{"retry_delay": 0.5, "rate_limit_delay": 10}"#).unwrap();
        assert_eq!(config.retry_delay, Duration::from_millis(500));
        assert_eq!(config.rate_limit_delay, Duration::from_secs(10));
        assert_eq!(config.max_attempts, 3);

        let value = serde_json::to_value(GeneratorConfig::default()).unwrap();
        assert_eq!(value["retry_delay"], 1.0);
        assert_eq!(value["rate_limit_delay"], 5.0);

        assert!(serde_json::from_str::<GeneratorConfig>(r#"{"retry_delay": -1}"#).is_err());
    }
}
