//! Analysis configuration.
//!
//! `AnalysisConfig` is built once by the caller and handed by reference to every
//! operation of the crate. There is no global state: two analyses with different
//! configurations can run side by side.

use anyhow::Result;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Number of lines sampled to classify the timing of a record.
pub const DEFAULT_SAMPLE_SIZE: usize = 42;

/// Index of the value column when the first column holds the timestamps.
pub const DEFAULT_VALUE_COLUMN: usize = 1;

/// Conversion factors between the raw time column and seconds.
///
/// Cumulative records carry absolute time in seconds, periodic records carry the
/// interval since the previous sample in milliseconds.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeUnits {
    pub cumulative_ticks_per_second: f64,
    pub periodic_ticks_per_second: f64,
}

impl Default for TimeUnits {
    fn default() -> Self {
        Self {
            cumulative_ticks_per_second: 1.0,
            periodic_ticks_per_second: 1000.0,
        }
    }
}

/// Immutable settings shared by partitioning and multiscale construction.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    /// Column holding the heart rate values in multi-column records.
    pub value_column: usize,
    /// Number of lines sampled by the timing detector.
    pub sample_size: usize,
    pub time_units: TimeUnits,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            value_column: DEFAULT_VALUE_COLUMN,
            sample_size: DEFAULT_SAMPLE_SIZE,
            time_units: TimeUnits::default(),
        }
    }
}

impl AnalysisConfig {
    pub fn with_value_column(mut self, value_column: usize) -> Self {
        self.value_column = value_column;
        self
    }

    pub fn with_sample_size(mut self, sample_size: usize) -> Self {
        self.sample_size = sample_size;
        self
    }

    pub fn with_time_units(mut self, time_units: TimeUnits) -> Self {
        self.time_units = time_units;
        self
    }

    /// Checks the settings for values no operation can work with.
    ///
    /// # Errors
    ///
    /// Returns an error if the sample size is smaller than 2 or if one of the
    /// time unit factors is not a positive finite number.
    pub fn validate(&self) -> Result<()> {
        if self.sample_size < 2 {
            return Err(crate::Error::Config("sample size must be at least 2".to_string()).into());
        }
        let units = [
            self.time_units.cumulative_ticks_per_second,
            self.time_units.periodic_ticks_per_second,
        ];
        if units.iter().any(|u| !u.is_finite() || *u <= 0.0) {
            return Err(
                crate::Error::Config("time unit factors must be positive".to_string()).into(),
            );
        }
        Ok(())
    }

    /// Loads a configuration from a JSON file. Missing fields take their default value.
    #[cfg(feature = "serde")]
    pub fn from_json_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let path = path.as_ref();
        let text =
            std::fs::read_to_string(path).map_err(|e| crate::Error::io(path.to_path_buf(), e))?;
        let config: AnalysisConfig = serde_json::from_str(&text)
            .map_err(|e| crate::Error::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }
}
