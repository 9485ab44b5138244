use crate::utils::error::RecoverError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;

/// What a panic carried, classified once it has been captured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Payload {
    Error(String),
    Text(String),
    Int(i64),
    Opaque(String),
}

impl Payload {
    pub fn from_any(payload: &(dyn Any + Send)) -> Self {
        if let Some(err) = payload.downcast_ref::<RecoverError>() {
            return Self::Error(err.to_string());
        }
        if let Some(message) = payload.downcast_ref::<&str>() {
            return Self::Text((*message).to_string());
        }
        if let Some(message) = payload.downcast_ref::<String>() {
            return Self::Text(message.clone());
        }
        if let Some(n) = downcast_int(payload) {
            return Self::Int(n);
        }
        // Only the type id survives type erasure.
        Self::Opaque(format!("non-string payload {:?}", (*payload).type_id()))
    }

    /// Short description used in mismatch errors, e.g. `integer 123`.
    pub fn describe(&self) -> String {
        match self {
            Self::Error(msg) => format!("error \"{}\"", msg),
            Self::Text(msg) => format!("text \"{}\"", msg),
            Self::Int(n) => format!("integer {}", n),
            Self::Opaque(hint) => hint.clone(),
        }
    }
}

fn downcast_int(payload: &(dyn Any + Send)) -> Option<i64> {
    macro_rules! try_int {
        ($($ty:ty),*) => {
            $(
                if let Some(v) = payload.downcast_ref::<$ty>() {
                    return i64::try_from(*v).ok();
                }
            )*
        };
    }
    try_int!(i64, i32, i16, i8, u64, u32, u16, u8, isize, usize);
    None
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error(msg) | Self::Text(msg) => f.write_str(msg),
            Self::Int(n) => write!(f, "{}", n),
            Self::Opaque(hint) => write!(f, "<{}>", hint),
        }
    }
}

/// A captured panic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fault {
    pub source: String,
    pub payload: Payload,
    pub occurred_at: DateTime<Utc>,
}

impl Fault {
    pub fn new(source: impl Into<String>, payload: Payload) -> Self {
        Self {
            source: source.into(),
            payload,
            occurred_at: Utc::now(),
        }
    }

    pub fn from_panic_payload(source: impl Into<String>, payload: &(dyn Any + Send)) -> Self {
        Self::new(source, Payload::from_any(payload))
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} panicked: {}", self.source, self.payload)
    }
}

/// How a guarded unit of work ended.
#[derive(Debug)]
pub enum Outcome<T> {
    Completed(T),
    Failed(RecoverError),
    Panicked(Fault),
}

impl<T> Outcome<T> {
    pub fn is_panicked(&self) -> bool {
        matches!(self, Self::Panicked(_))
    }

    /// Folds the outcome back into a plain `Result`, panics included.
    pub fn into_result(self) -> Result<T, RecoverError> {
        match self {
            Self::Completed(value) => Ok(value),
            Self::Failed(err) => Err(err),
            Self::Panicked(fault) => Err(RecoverError::Panicked(fault)),
        }
    }
}

impl<T> From<Result<T, RecoverError>> for Outcome<T> {
    fn from(result: Result<T, RecoverError>) -> Self {
        match result {
            Ok(value) => Self::Completed(value),
            Err(err) => Self::Failed(err),
        }
    }
}

/// Summary of one batch run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub mode: String,
    pub inputs: Vec<i64>,
    pub steps_run: usize,
    pub error: Option<String>,
}

impl BatchReport {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}
