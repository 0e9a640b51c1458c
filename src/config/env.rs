//! Environment variable handling and .env file management

use crate::error::{AppError, Result};
use crate::logging::LogFormat;
use std::path::Path;

/// Environment variable configuration manager
pub struct EnvManager;

impl EnvManager {
    /// Load .env file if it exists
    pub fn load_env_file(debug: bool) -> Result<()> {
        Self::load_env_file_from(Path::new(".env"), debug)
    }

    /// Load a specific env file if it exists; variables already set win
    pub fn load_env_file_from(path: &Path, debug: bool) -> Result<()> {
        if path.exists() {
            dotenv::from_path(path)
                .map_err(|e| AppError::config(format!("Failed to load {} file: {}", path.display(), e)))?;

            if debug {
                println!("Loaded configuration from {}", path.display());
            }
        } else if debug {
            println!("No {} file found, using defaults and CLI arguments", path.display());
        }

        Ok(())
    }

    /// Validate environment variable format before parsing
    pub fn validate_env_var(key: &str, value: &str) -> Result<()> {
        match key {
            "PROBE_COUNT" => {
                let count: u32 = value
                    .parse()
                    .map_err(|e| AppError::config(format!("Invalid PROBE_COUNT value '{}': {}", value, e)))?;
                if count == 0 {
                    return Err(AppError::config("PROBE_COUNT must be greater than 0"));
                }
            }
            "PROBE_TIMEOUT_SECONDS" => {
                let timeout: u64 = value.parse().map_err(|e| {
                    AppError::config(format!("Invalid PROBE_TIMEOUT_SECONDS value '{}': {}", value, e))
                })?;
                if timeout == 0 || timeout > 300 {
                    return Err(AppError::config(format!(
                        "PROBE_TIMEOUT_SECONDS must be between 1 and 300, got: {}",
                        timeout
                    )));
                }
            }
            "PROBE_INTERVAL_MS" => {
                value.parse::<u64>().map_err(|e| {
                    AppError::config(format!("Invalid PROBE_INTERVAL_MS value '{}': {}", value, e))
                })?;
            }
            "PROBE_MTU" => {
                let mtu: usize = value
                    .parse()
                    .map_err(|e| AppError::config(format!("Invalid PROBE_MTU value '{}': {}", value, e)))?;
                if !(crate::defaults::MIN_MTU..=crate::defaults::MAX_MTU).contains(&mtu) {
                    return Err(AppError::config(format!(
                        "PROBE_MTU must be between {} and {}, got: {}",
                        crate::defaults::MIN_MTU,
                        crate::defaults::MAX_MTU,
                        mtu
                    )));
                }
            }
            "ENABLE_COLOR" => {
                value
                    .parse::<bool>()
                    .map_err(|e| AppError::config(format!("Invalid ENABLE_COLOR value '{}': {}", value, e)))?;
            }
            "LOG_FORMAT" => {
                value.parse::<LogFormat>()?;
            }
            _ => {}
        }

        Ok(())
    }

    /// Get list of all supported environment variables with descriptions
    pub fn get_supported_env_vars() -> Vec<(&'static str, &'static str, &'static str)> {
        vec![
            ("PROBE_COUNT", "Number of probes per run", "5"),
            ("PROBE_TIMEOUT_SECONDS", "Per-probe timeout in seconds (1-300)", "2"),
            ("PROBE_INTERVAL_MS", "Pause before each probe in milliseconds", "1000"),
            ("PROBE_MTU", "Payload size in bytes (50-9000)", "1450"),
            ("PROBE_INTERFACE", "Interface / VRF to bind to", "eth0"),
            ("ENABLE_COLOR", "Enable colored output", "true"),
            ("LOG_FORMAT", "Log format: console, json or compact", "console"),
        ]
    }

    /// Check every set variable before any of them is merged
    pub fn validate_current_env() -> Result<()> {
        for (name, _, _) in Self::get_supported_env_vars() {
            if let Ok(value) = std::env::var(name) {
                Self::validate_env_var(name, &value)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_env_var() {
        assert!(EnvManager::validate_env_var("PROBE_COUNT", "5").is_ok());
        assert!(EnvManager::validate_env_var("PROBE_TIMEOUT_SECONDS", "2").is_ok());
        assert!(EnvManager::validate_env_var("PROBE_INTERVAL_MS", "0").is_ok());
        assert!(EnvManager::validate_env_var("PROBE_MTU", "1450").is_ok());
        assert!(EnvManager::validate_env_var("ENABLE_COLOR", "false").is_ok());
        assert!(EnvManager::validate_env_var("LOG_FORMAT", "json").is_ok());
        assert!(EnvManager::validate_env_var("UNRELATED", "anything").is_ok());

        assert!(EnvManager::validate_env_var("PROBE_COUNT", "0").is_err());
        assert!(EnvManager::validate_env_var("PROBE_TIMEOUT_SECONDS", "301").is_err());
        assert!(EnvManager::validate_env_var("PROBE_INTERVAL_MS", "-1").is_err());
        assert!(EnvManager::validate_env_var("PROBE_MTU", "49").is_err());
        assert!(EnvManager::validate_env_var("PROBE_MTU", "9001").is_err());
        assert!(EnvManager::validate_env_var("ENABLE_COLOR", "maybe").is_err());
        assert!(EnvManager::validate_env_var("LOG_FORMAT", "xml").is_err());
    }

    #[test]
    fn test_missing_env_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(EnvManager::load_env_file_from(&dir.path().join(".env"), false).is_ok());
    }
}
