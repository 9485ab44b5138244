use crate::core::guard;
use crate::domain::model::{BatchReport, Payload};
use crate::utils::error::{RecoverError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::panic;

/// Largest number a step accepts.
pub const MAX_NUMBER: i64 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "snake_case")]
pub enum BatchMode {
    /// Every step returns a `Result`, `?` stops at the first error.
    #[default]
    Checked,
    /// Every step panics on failure, one boundary captures the error.
    Panicking,
    /// Like `panicking`, but a payload that is not an error is dropped.
    Lenient,
}

impl fmt::Display for BatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Checked => "checked",
            Self::Panicking => "panicking",
            Self::Lenient => "lenient",
        };
        f.write_str(name)
    }
}

/// One step of the batch.
pub fn check_number(n: i64) -> Result<()> {
    if n > MAX_NUMBER {
        return Err(RecoverError::BadNumber(n));
    }
    tracing::debug!("step accepted {}", n);
    Ok(())
}

/// Runs every step, stopping at the first error.
pub fn run_steps(inputs: &[i64]) -> Result<()> {
    checked(inputs, &mut 0)
}

fn checked(inputs: &[i64], ran: &mut usize) -> Result<()> {
    for &n in inputs {
        *ran += 1;
        check_number(n)?;
    }
    Ok(())
}

/// Step variant that reports failure by panicking with the error as payload.
pub fn must_check_number(n: i64) {
    if let Err(e) = check_number(n) {
        panic::panic_any(e);
    }
}

/// Runs the panicking steps with no per-step checks and a single capture at the end.
pub fn run_steps_panicking(inputs: &[i64]) -> Result<()> {
    collect_error(|| unchecked(inputs, &mut 0))
}

/// [`run_steps_panicking`] with the silent fallback: a non-error payload yields `Ok(())`.
pub fn run_steps_lenient(inputs: &[i64]) -> Result<()> {
    collect_error_lenient(|| unchecked(inputs, &mut 0))
}

fn unchecked(inputs: &[i64], ran: &mut usize) {
    for &n in inputs {
        *ran += 1;
        must_check_number(n);
    }
}

/// Captures at most one panic from `f` and reinterprets it as an error.
///
/// A payload that is not a [`RecoverError`] is reported as
/// [`RecoverError::NotAnError`].
pub fn collect_error<F: FnOnce()>(f: F) -> Result<()> {
    match guard::catch_payload(f) {
        Ok(()) => Ok(()),
        Err(payload) => match payload.downcast::<RecoverError>() {
            Ok(e) => Err(*e),
            Err(other) => Err(RecoverError::NotAnError {
                found: Payload::from_any(other.as_ref()).describe(),
            }),
        },
    }
}

/// Like [`collect_error`], but a payload that is not an error is dropped with a warning.
pub fn collect_error_lenient<F: FnOnce()>(f: F) -> Result<()> {
    match collect_error(f) {
        Err(RecoverError::NotAnError { found }) => {
            tracing::warn!("⚠️ Discarding non-error payload: {}", found);
            Ok(())
        }
        other => other,
    }
}

/// Runs the batch in `mode` and summarizes it.
pub fn run_batch(mode: BatchMode, inputs: &[i64]) -> BatchReport {
    let mut ran = 0;
    let result = match mode {
        BatchMode::Checked => checked(inputs, &mut ran),
        BatchMode::Panicking => collect_error(|| unchecked(inputs, &mut ran)),
        BatchMode::Lenient => collect_error_lenient(|| unchecked(inputs, &mut ran)),
    };

    match &result {
        Ok(()) => tracing::info!(%mode, steps = ran, "✅ Batch finished"),
        Err(e) => tracing::warn!(%mode, steps = ran, "⚠️ Batch stopped: {}", e),
    }

    BatchReport {
        mode: mode.to_string(),
        inputs: inputs.to_vec(),
        steps_run: ran,
        error: result.err().map(|e| e.to_string()),
    }
}
