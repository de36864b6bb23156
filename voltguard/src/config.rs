//! Engine configuration.
//!
//! All settings have defaults, so an empty JSON object is a valid
//! configuration. Files are plain JSON:
//!
//! ```json
//! {
//!   "scheduler": { "debounce_ms": 250, "chunk_size": 8 },
//!   "batch": { "max_concurrency": 2 },
//!   "defaults": { "insulation_class": "THHN", "ambient_temp_c": 35.0 }
//! }
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::compliance::voltage_drop::CalculatorConfig;
use crate::ucs::schema::InstallationDefaults;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Recalculation scheduler settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Quiet period before a pass starts
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Circuits evaluated concurrently within one chunk of a pass
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Buffer size of the broadcast event channel
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_debounce_ms() -> u64 {
    500
}

fn default_chunk_size() -> usize {
    5
}

fn default_event_capacity() -> usize {
    64
}

impl SchedulerConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            chunk_size: default_chunk_size(),
            event_capacity: default_event_capacity(),
        }
    }
}

/// Sweep/batch settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Maximum jobs in flight at once
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

fn default_max_concurrency() -> usize {
    4
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
        }
    }
}

/// Top-level engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub batch: BatchConfig,

    /// Installation defaults for records that leave overrides unset
    #[serde(default)]
    pub defaults: InstallationDefaults,

    #[serde(default)]
    pub calculator: CalculatorConfig,
}

impl EngineConfig {
    /// Load and validate a JSON config file
    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::load_str(&content)
    }

    /// Parse and validate a JSON config string
    pub fn load_str(json: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scheduler.chunk_size == 0 {
            return Err(ConfigError::Invalid("scheduler.chunk_size must be at least 1".into()));
        }
        if self.scheduler.event_capacity == 0 {
            return Err(ConfigError::Invalid("scheduler.event_capacity must be at least 1".into()));
        }
        if self.batch.max_concurrency == 0 {
            return Err(ConfigError::Invalid("batch.max_concurrency must be at least 1".into()));
        }
        if self.defaults.parallel_sets == 0 {
            return Err(ConfigError::Invalid("defaults.parallel_sets must be at least 1".into()));
        }
        if !(self.defaults.harmonic_factor >= 1.0) {
            return Err(ConfigError::Invalid(
                "defaults.harmonic_factor must be at least 1.0".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ucs::schema::{InsulationClass, TemperatureRating};
    use std::io::Write;

    #[test]
    fn test_empty_object_uses_defaults() {
        let config = EngineConfig::load_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.scheduler.debounce(), Duration::from_millis(500));
        assert_eq!(config.scheduler.chunk_size, 5);
        assert_eq!(config.batch.max_concurrency, 4);
        assert_eq!(config.defaults.insulation_class, InsulationClass::Thwn);
    }

    #[test]
    fn test_partial_override() {
        let config = EngineConfig::load_str(
            r#"{
                "scheduler": { "debounce_ms": 250 },
                "defaults": { "insulation_class": "THHN", "ambient_temp_c": 35.0 },
                "calculator": { "temperature_correction": { "75C": { "points": [
                    { "ambient_c": 20.0, "factor": 1.0 },
                    { "ambient_c": 50.0, "factor": 0.5 }
                ] } } }
            }"#,
        )
        .unwrap();

        assert_eq!(config.scheduler.debounce_ms, 250);
        assert_eq!(config.scheduler.chunk_size, 5);
        assert_eq!(config.defaults.insulation_class, InsulationClass::Thhn);
        assert_eq!(config.defaults.ambient_temp_c, 35.0);

        let tables = &config.calculator.temperature_correction;
        assert!((tables.factor(TemperatureRating::C75, 35.0) - 0.75).abs() < 1e-9);
        // Untouched ratings keep their defaults
        assert_eq!(tables.factor(TemperatureRating::C90, 30.0), 1.0);
    }

    #[test]
    fn test_rejects_zero_chunk_size() {
        let err = EngineConfig::load_str(r#"{ "scheduler": { "chunk_size": 0 } }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_load_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "batch": {{ "max_concurrency": 2 }} }}"#).unwrap();

        let config = EngineConfig::load_file(file.path()).unwrap();
        assert_eq!(config.batch.max_concurrency, 2);
    }

    #[test]
    fn test_load_missing_file() {
        let err = EngineConfig::load_file(Path::new("/nonexistent/voltguard.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
