//! Leaving a nested call chain early with a value.
//!
//! [`resume`] is the way to do it: every level returns `Result<(), Escape<T>>`
//! and `?` carries the value up. [`recover_as`] does the same thing with a real
//! panic and a typed downcast at the boundary; it exists to show what that costs.

use crate::core::guard;
use crate::domain::model::Payload;
use crate::utils::error::{RecoverError, Result};
use std::any::{type_name, Any};
use std::panic;

/// A value on its way out of a nested call chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Escape<T>(pub T);

/// Runs `f`; an escape becomes the return value, a normal finish becomes `None`.
pub fn resume<T, F>(f: F) -> Option<T>
where
    F: FnOnce() -> std::result::Result<(), Escape<T>>,
{
    match f() {
        Ok(()) => None,
        Err(Escape(value)) => Some(value),
    }
}

/// Walks three levels deep and escapes with `value` at `exit_depth` (1 to 3).
/// Any other depth lets the chain run to completion.
pub fn search(exit_depth: usize, value: i64) -> Option<i64> {
    resume(|| level_one(exit_depth, value))
}

fn level_one(exit_depth: usize, value: i64) -> std::result::Result<(), Escape<i64>> {
    tracing::trace!("entering level 1");
    if exit_depth == 1 {
        return Err(Escape(value));
    }
    level_two(exit_depth, value)?;
    tracing::trace!("leaving level 1");
    Ok(())
}

fn level_two(exit_depth: usize, value: i64) -> std::result::Result<(), Escape<i64>> {
    tracing::trace!("entering level 2");
    if exit_depth == 2 {
        return Err(Escape(value));
    }
    level_three(exit_depth, value)?;
    tracing::trace!("leaving level 2");
    Ok(())
}

fn level_three(exit_depth: usize, value: i64) -> std::result::Result<(), Escape<i64>> {
    tracing::trace!("entering level 3");
    if exit_depth == 3 {
        return Err(Escape(value));
    }
    Ok(())
}

/// Unwinds the current call chain carrying `payload`.
pub fn unwind_with<P: Any + Send + 'static>(payload: P) -> ! {
    panic::panic_any(payload)
}

/// Walks three levels deep and unwinds with `payload` at `exit_depth` (1 to 3).
/// Any other depth returns normally and the payload is dropped.
pub fn unwind_from_depth<P: Any + Send + 'static>(exit_depth: usize, payload: P) {
    unwinding_one(exit_depth, payload)
}

/// Unwinds out of three nested calls with `payload`.
pub fn unwind_from_depth_three<P: Any + Send + 'static>(payload: P) {
    unwind_from_depth(3, payload)
}

fn unwinding_one<P: Any + Send + 'static>(exit_depth: usize, payload: P) {
    if exit_depth == 1 {
        unwind_with(payload)
    }
    unwinding_two(exit_depth, payload)
}

fn unwinding_two<P: Any + Send + 'static>(exit_depth: usize, payload: P) {
    if exit_depth == 2 {
        unwind_with(payload)
    }
    unwinding_three(exit_depth, payload)
}

fn unwinding_three<P: Any + Send + 'static>(exit_depth: usize, payload: P) {
    if exit_depth == 3 {
        unwind_with(payload)
    }
}

/// Runs `f` and takes a `T` out of any panic it raises.
///
/// `Ok(None)` means `f` finished normally. A payload of any other type is
/// reported as [`RecoverError::PayloadMismatch`] instead of being dropped.
pub fn recover_as<T, F>(f: F) -> Result<Option<T>>
where
    T: Any + Send + 'static,
    F: FnOnce(),
{
    match guard::catch_payload(f) {
        Ok(()) => Ok(None),
        Err(payload) => match payload.downcast::<T>() {
            Ok(value) => Ok(Some(*value)),
            Err(other) => Err(RecoverError::PayloadMismatch {
                expected: type_name::<T>().to_string(),
                found: Payload::from_any(other.as_ref()).describe(),
            }),
        },
    }
}

/// Like [`recover_as`], but a mismatched payload is discarded and `T::default()`
/// returned. The discard is logged.
pub fn recover_as_or_default<T, F>(f: F) -> T
where
    T: Any + Send + Default + 'static,
    F: FnOnce(),
{
    match recover_as::<T, F>(f) {
        Ok(value) => value.unwrap_or_default(),
        Err(e) => {
            tracing::warn!("⚠️ Discarding recovered value: {}", e);
            T::default()
        }
    }
}
