use crate::domain::model::Fault;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecoverError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("bad number: {0}")]
    BadNumber(i64),

    #[error("Recovered payload mismatch: expected {expected}, found {found}")]
    PayloadMismatch { expected: String, found: String },

    #[error("Recovered payload is not an error: {found}")]
    NotAnError { found: String },

    #[error("{0}")]
    Panicked(Fault),

    #[error("Task '{label}' was cancelled")]
    Cancelled { label: String },

    #[error("Handler error: {message}")]
    HandlerError { message: String },
}

impl RecoverError {
    pub fn handler(message: impl Into<String>) -> Self {
        Self::HandlerError {
            message: message.into(),
        }
    }

    /// Whether the error came out of a captured panic rather than a typed return.
    pub fn is_panic(&self) -> bool {
        matches!(
            self,
            Self::Panicked(_) | Self::PayloadMismatch { .. } | Self::NotAnError { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, RecoverError>;
