#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use cli::CliConfig;

use crate::core::ConfigProvider;
use crate::utils::error::Result;
use crate::utils::validation::Validate;
use serde::{Deserialize, Serialize};
use toml_config::FileConfig;

/// Effective settings after the file and command line are merged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub listen: String,
    pub max_restarts: Option<u64>,
    pub backoff_ms: u64,
    pub log_level: Option<String>,
    pub log_json: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self::from(FileConfig::default())
    }
}

impl From<FileConfig> for Settings {
    fn from(file: FileConfig) -> Self {
        Self {
            listen: file.server.listen,
            max_restarts: file.supervisor.max_restarts,
            backoff_ms: file.supervisor.backoff_ms,
            log_level: file.logging.level,
            log_json: file.logging.json,
        }
    }
}

impl ConfigProvider for Settings {
    fn listen_addr(&self) -> &str {
        &self.listen
    }

    fn max_restarts(&self) -> Option<u64> {
        self.max_restarts
    }

    fn backoff_ms(&self) -> u64 {
        self.backoff_ms
    }
}

impl Validate for Settings {
    fn validate(&self) -> Result<()> {
        let mut file = FileConfig::default();
        file.server.listen = self.listen.clone();
        file.supervisor.max_restarts = self.max_restarts;
        file.supervisor.backoff_ms = self.backoff_ms;
        file.logging.level = self.log_level.clone();
        file.logging.json = self.log_json;
        file.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::toml_config::DEFAULT_LISTEN;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.listen_addr(), DEFAULT_LISTEN);
        assert_eq!(settings.max_restarts(), None);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_listen() {
        let settings = Settings {
            listen: "nowhere".to_string(),
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }
}
