use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Monitor configuration, fixed for the lifetime of one monitor instance.
///
/// `warning_timeout_ms` and `activity_threshold_ms` are advisory values
/// passed through to the host (warning banner auto-dismiss, idleness
/// decisions); the monitor itself never reads them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Violation count at which the synthetic cutoff marker fires.
    pub max_violations: u32,
    pub warning_timeout_ms: u64,
    pub activity_threshold_ms: u64,
    /// Gates the dev-tools geometry poll entirely.
    pub show_dev_tools_warning: bool,
    /// Period of the "user is present" heartbeat timer.
    pub heartbeat_interval_ms: u64,
    /// Period of the dev-tools geometry poll.
    pub dev_tools_poll_interval_ms: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        MonitorConfig {
            max_violations: 3,
            warning_timeout_ms: 5_000,
            activity_threshold_ms: 30_000,
            show_dev_tools_warning: true,
            heartbeat_interval_ms: 5_000,
            dev_tools_poll_interval_ms: 2_000,
        }
    }
}

impl MonitorConfig {
    /// Load configuration from an optional file plus `QUIZ_SENTINEL_*`
    /// environment overrides. Missing file and missing keys fall back to the
    /// defaults above.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config_path = if let Some(p) = path {
            p.to_path_buf()
        } else {
            std::env::var("QUIZ_SENTINEL_CONFIG")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("config/default.yaml"))
        };

        info!("Loading configuration from: {:?}", config_path);

        let required = path.is_some();
        let config = Config::builder()
            .add_source(File::from(config_path).required(required))
            .add_source(Environment::with_prefix("QUIZ_SENTINEL"))
            .build()?;

        let monitor_config: MonitorConfig = config.try_deserialize()?;

        debug!("Configuration loaded successfully");
        debug!("Max violations: {}", monitor_config.max_violations);

        Ok(monitor_config)
    }

    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.max_violations == 0 {
            errors.push("Max violations must be greater than 0".to_string());
        }

        if self.heartbeat_interval_ms == 0 {
            errors.push("Heartbeat interval must be greater than 0".to_string());
        }

        if self.show_dev_tools_warning && self.dev_tools_poll_interval_ms == 0 {
            errors.push("Dev tools poll interval must be greater than 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_monitor_config_default() {
        let config = MonitorConfig::default();
        assert_eq!(config.max_violations, 3);
        assert_eq!(config.warning_timeout_ms, 5_000);
        assert_eq!(config.activity_threshold_ms, 30_000);
        assert!(config.show_dev_tools_warning);
        assert_eq!(config.heartbeat_interval_ms, 5_000);
        assert_eq!(config.dev_tools_poll_interval_ms, 2_000);
    }

    #[test]
    fn test_monitor_config_load_from_file() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("test_config.yaml");
        let mut file = fs::File::create(&file_path).unwrap();
        writeln!(
            file,
            "max_violations: 5\nshow_dev_tools_warning: false\nheartbeat_interval_ms: 1000"
        )
        .unwrap();

        let config = MonitorConfig::load(Some(&file_path)).unwrap();
        assert_eq!(config.max_violations, 5);
        assert!(!config.show_dev_tools_warning);
        assert_eq!(config.heartbeat_interval_ms, 1_000);
        // Keys absent from the file keep their defaults.
        assert_eq!(config.warning_timeout_ms, 5_000);
        assert_eq!(config.dev_tools_poll_interval_ms, 2_000);
    }

    #[test]
    fn test_monitor_config_load_missing_explicit_file() {
        let dir = tempdir().unwrap();
        let result = MonitorConfig::load(Some(&dir.path().join("nope.yaml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_monitor_config_validate_success() {
        assert!(MonitorConfig::default().validate().is_ok());
    }

    #[test]
    fn test_monitor_config_validate_zero_max_violations() {
        let config = MonitorConfig {
            max_violations: 0,
            ..MonitorConfig::default()
        };
        let errors = config.validate().unwrap_err();
        assert!(errors.contains(&"Max violations must be greater than 0".to_string()));
    }

    #[test]
    fn test_monitor_config_validate_zero_timers() {
        let config = MonitorConfig {
            heartbeat_interval_ms: 0,
            dev_tools_poll_interval_ms: 0,
            ..MonitorConfig::default()
        };
        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_monitor_config_validate_poll_interval_ignored_when_gated_off() {
        let config = MonitorConfig {
            show_dev_tools_warning: false,
            dev_tools_poll_interval_ms: 0,
            ..MonitorConfig::default()
        };
        assert!(config.validate().is_ok());
    }
}
