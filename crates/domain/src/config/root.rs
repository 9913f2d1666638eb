use serde::{Deserialize, Serialize};

use super::errors::ConfigError;
use super::logging::LoggingConfig;
use super::negcache::NegCacheConfig;
use super::resolver::ResolverConfig;

/// Main configuration structure for Proxyscan
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// Asynchronous resolver limits and nameserver sources
    #[serde(default)]
    pub resolver: ResolverConfig,

    /// Negative (already-cleared) address cache
    #[serde(default)]
    pub negcache: NegCacheConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from file or use defaults
    ///
    /// Priority order:
    /// 1. Explicitly provided path
    /// 2. proxyscan.toml in current directory
    /// 3. /etc/proxyscan/config.toml
    /// 4. Default configuration
    pub fn load(path: Option<&str>, cli_overrides: CliOverrides) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = path {
            Self::from_file(path)?
        } else if std::path::Path::new("proxyscan.toml").exists() {
            Self::from_file("proxyscan.toml")?
        } else if std::path::Path::new("/etc/proxyscan/config.toml").exists() {
            Self::from_file("/etc/proxyscan/config.toml")?
        } else {
            Self::default()
        };

        config.apply_cli_overrides(cli_overrides);
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(path.to_string(), e.to_string()))?;
        toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    fn apply_cli_overrides(&mut self, overrides: CliOverrides) {
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
        if !overrides.nameservers.is_empty() {
            self.resolver.nameservers = overrides.nameservers;
        }
        if let Some(timeout) = overrides.timeout {
            self.resolver.timeout = timeout;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.resolver.fd_limit == 0 {
            return Err(ConfigError::Validation(
                "resolver.fd_limit cannot be 0".to_string(),
            ));
        }

        if self.resolver.timeout == 0 {
            return Err(ConfigError::Validation(
                "resolver.timeout cannot be 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Command-line overrides for configuration
#[derive(Debug, Default)]
pub struct CliOverrides {
    pub log_level: Option<String>,
    pub nameservers: Vec<String>,
    pub timeout: Option<u64>,
}
