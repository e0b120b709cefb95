//! Runtime settings for scan execution.
//!
//! Settings are assembled from built-in defaults, an optional TOML file and
//! `RUST_SCAN_*` environment variables, in that order of precedence. They
//! cover only ambient execution concerns — polling cadence, motion
//! timeouts, restore tolerance and history depth. Nothing here changes the
//! meaning of a scan command; the argument list alone does that.

use crate::error::AppResult;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunable parameters for scan execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Interval between axis busy polls, in milliseconds.
    pub poll_interval_ms: u64,
    /// Maximum time to wait for a single axis move to settle, in seconds.
    pub settle_timeout_s: f64,
    /// Tolerance used when verifying post-scan position restoration.
    pub position_tolerance: f64,
    /// Number of annotated command strings retained in the history.
    pub history_capacity: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 20,
            settle_timeout_s: 30.0,
            position_tolerance: 1e-4,
            history_capacity: 256,
        }
    }
}

impl Settings {
    /// Loads settings from defaults, an optional TOML file, and
    /// `RUST_SCAN_*` environment variable overrides.
    pub fn new(path: Option<&str>) -> AppResult<Self> {
        let defaults = Settings::default();
        let mut builder = Config::builder()
            .set_default("poll_interval_ms", defaults.poll_interval_ms as i64)?
            .set_default("settle_timeout_s", defaults.settle_timeout_s)?
            .set_default("position_tolerance", defaults.position_tolerance)?
            .set_default("history_capacity", defaults.history_capacity as i64)?;

        if let Some(path) = path {
            builder = builder.add_source(File::with_name(path));
        }

        let settings = builder
            .add_source(Environment::with_prefix("RUST_SCAN").try_parsing(true))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    /// Busy-poll interval as a [`Duration`].
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Per-move settle timeout as a [`Duration`].
    pub fn settle_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.settle_timeout_s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_without_file() {
        let settings = Settings::new(None).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_load_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "poll_interval_ms = 5\nsettle_timeout_s = 2.5").unwrap();

        let settings = Settings::new(file.path().to_str()).unwrap();
        assert_eq!(settings.poll_interval_ms, 5);
        assert_eq!(settings.settle_timeout_s, 2.5);
        // Untouched keys keep their defaults.
        assert_eq!(settings.history_capacity, 256);
    }

    #[test]
    fn test_duration_accessors() {
        let settings = Settings::default();
        assert_eq!(settings.poll_interval(), Duration::from_millis(20));
        assert_eq!(settings.settle_timeout(), Duration::from_secs(30));
    }
}
