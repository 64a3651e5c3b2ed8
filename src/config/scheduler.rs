//! Scheduler configuration.

use serde::{Deserialize, Serialize};

use crate::core::SchedulerError;

/// Environment variable read by [`SchedulerConfig::from_env`].
pub const ENV_CONCURRENCY: &str = "TASK_THROTTLE_CONCURRENCY";

/// Immutable scheduler configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Maximum number of simultaneously executing tasks.
    pub concurrency: usize,
}

impl Default for SchedulerConfig {
    /// One slot per logical CPU.
    fn default() -> Self {
        Self {
            concurrency: num_cpus::get(),
        }
    }
}

impl SchedulerConfig {
    /// Configuration with the given concurrency.
    pub const fn new(concurrency: usize) -> Self {
        Self { concurrency }
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidConcurrency`] when `concurrency` is 0.
    pub fn validate(&self) -> Result<(), SchedulerError> {
        if self.concurrency == 0 {
            return Err(SchedulerError::InvalidConcurrency(self.concurrency));
        }
        Ok(())
    }

    /// Parse configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Fails on malformed JSON or an invalid concurrency.
    pub fn from_json_str(input: &str) -> Result<Self, SchedulerError> {
        let cfg: Self = serde_json::from_str(input)
            .map_err(|e| SchedulerError::InvalidConfig(format!("parse error: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load configuration from the environment, reading a `.env` file first if
    /// one exists. Falls back to [`SchedulerConfig::default`] when
    /// `TASK_THROTTLE_CONCURRENCY` is unset.
    ///
    /// # Errors
    ///
    /// Fails if the variable is set but is not a positive integer.
    pub fn from_env() -> Result<Self, SchedulerError> {
        let _ = dotenvy::dotenv();
        match std::env::var(ENV_CONCURRENCY) {
            Ok(raw) => Self::parse_concurrency(&raw),
            Err(std::env::VarError::NotPresent) => Ok(Self::default()),
            Err(e) => Err(SchedulerError::InvalidConfig(format!(
                "{ENV_CONCURRENCY}: {e}"
            ))),
        }
    }

    fn parse_concurrency(raw: &str) -> Result<Self, SchedulerError> {
        let concurrency = raw.trim().parse::<usize>().map_err(|e| {
            SchedulerError::InvalidConfig(format!("{ENV_CONCURRENCY}={raw:?}: {e}"))
        })?;
        let cfg = Self::new(concurrency);
        cfg.validate()?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_uses_cpu_count() {
        let cfg = SchedulerConfig::default();
        assert!(cfg.concurrency >= 1);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_parse_concurrency() {
        assert_eq!(SchedulerConfig::parse_concurrency(" 8 ").unwrap().concurrency, 8);
        assert!(matches!(
            SchedulerConfig::parse_concurrency("0"),
            Err(SchedulerError::InvalidConcurrency(0))
        ));
        assert!(matches!(
            SchedulerConfig::parse_concurrency("-3"),
            Err(SchedulerError::InvalidConfig(_))
        ));
    }
}
