use crate::core::ConfigProvider;
use crate::utils::error::{RecoverError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_LISTEN: &str = "127.0.0.1:8080";

/// Backoff above this is almost certainly a unit mistake (seconds written as ms).
const MAX_BACKOFF_MS: u64 = 60_000;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub server: ServerConfig,
    pub supervisor: SupervisorConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: DEFAULT_LISTEN.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorConfig {
    /// 省略時不限制重啟次數
    pub max_restarts: Option<u64>,
    pub backoff_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: Option<String>,
    pub json: bool,
}

impl FileConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;
        Ok(toml::from_str(&processed_content)?)
    }

    /// 替換環境變數 (例如 ${LISTEN_ADDR})，未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| RecoverError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }
}

impl ConfigProvider for FileConfig {
    fn listen_addr(&self) -> &str {
        &self.server.listen
    }

    fn max_restarts(&self) -> Option<u64> {
        self.supervisor.max_restarts
    }

    fn backoff_ms(&self) -> u64 {
        self.supervisor.backoff_ms
    }
}

impl Validate for FileConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_socket_addr("server.listen", &self.server.listen)?;
        validation::validate_range("supervisor.backoff_ms", self.supervisor.backoff_ms, 0, MAX_BACKOFF_MS)?;
        if let Some(level) = &self.logging.level {
            validation::validate_log_level("logging.level", level)?;
        }
        Ok(())
    }
}
