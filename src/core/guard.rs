//! Recovery boundaries.
//!
//! A boundary runs a unit of work and reports how it ended as an [`Outcome`]:
//! completed, failed with a typed error, or panicked. The boundary never logs;
//! the component that owns it decides what a fault means (log, relaunch, propagate).

use crate::domain::model::{Fault, Outcome};
use crate::utils::error::{RecoverError, Result};
use std::any::Any;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use tokio::task::{AbortHandle, JoinError, JoinHandle};

/// Raw panic payload as handed over by the runtime.
pub type PanicPayload = Box<dyn Any + Send + 'static>;

/// Runs `f`, capturing a panic as its raw payload.
pub fn catch_payload<T, F>(f: F) -> std::result::Result<T, PanicPayload>
where
    F: FnOnce() -> T,
{
    panic::catch_unwind(AssertUnwindSafe(f))
}

/// Runs an infallible closure, turning a panic into a [`Fault`].
pub fn catch_panic<T, F>(label: &str, f: F) -> std::result::Result<T, Fault>
where
    F: FnOnce() -> T,
{
    catch_payload(f).map_err(|payload| Fault::from_panic_payload(label, payload.as_ref()))
}

/// Runs a fallible closure and reports all three ways it can end.
pub fn catch<T, F>(label: &str, f: F) -> Outcome<T>
where
    F: FnOnce() -> Result<T>,
{
    match catch_payload(f) {
        Ok(result) => result.into(),
        Err(payload) => Outcome::Panicked(Fault::from_panic_payload(label, payload.as_ref())),
    }
}

/// A unit of work running as its own tokio task.
pub struct GuardedTask<T> {
    label: String,
    handle: JoinHandle<Result<T>>,
}

impl<T: Send + 'static> GuardedTask<T> {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn abort_handle(&self) -> AbortHandle {
        self.handle.abort_handle()
    }

    pub async fn join(self) -> Outcome<T> {
        observe(&self.label, self.handle.await)
    }
}

/// Spawns `fut` on the runtime. A panic inside it unwinds that task only and
/// is reported by [`GuardedTask::join`].
pub fn spawn_guarded<T, Fut>(label: impl Into<String>, fut: Fut) -> GuardedTask<T>
where
    T: Send + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
{
    GuardedTask {
        label: label.into(),
        handle: tokio::spawn(fut),
    }
}

/// Classifies the result of joining a task.
pub fn observe<T>(label: &str, joined: std::result::Result<Result<T>, JoinError>) -> Outcome<T> {
    match joined {
        Ok(result) => result.into(),
        Err(err) if err.is_panic() => {
            let payload = err.into_panic();
            Outcome::Panicked(Fault::from_panic_payload(label, payload.as_ref()))
        }
        Err(_) => Outcome::Failed(RecoverError::Cancelled {
            label: label.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Payload;

    #[test]
    fn test_catch_completed() {
        let outcome = catch("ok", || Ok(5));
        assert!(matches!(outcome, Outcome::Completed(5)));
    }

    #[test]
    fn test_catch_typed_failure() {
        let outcome: Outcome<()> = catch("fails", || Err(RecoverError::BadNumber(60)));
        assert!(matches!(outcome, Outcome::Failed(RecoverError::BadNumber(60))));
    }

    #[test]
    fn test_catch_panic_payload() {
        let outcome: Outcome<()> = catch("explodes", || panic!("boom"));
        match outcome {
            Outcome::Panicked(fault) => {
                assert_eq!(fault.source, "explodes");
                assert_eq!(fault.payload, Payload::Text("boom".to_string()));
            }
            other => panic!("expected a panic outcome, got {:?}", other),
        }
    }

    #[test]
    fn test_catch_panic_infallible() {
        assert_eq!(catch_panic("fine", || 3).unwrap(), 3);
        let fault = catch_panic("formatted", || -> u8 { panic!("value {}", 9) }).unwrap_err();
        assert_eq!(fault.payload, Payload::Text("value 9".to_string()));
    }

    async fn explode() -> Result<()> {
        std::panic::panic_any(42_u32)
    }

    #[tokio::test]
    async fn test_spawn_guarded_contains_panic() {
        let task = spawn_guarded("worker", explode());
        assert_eq!(task.label(), "worker");
        match task.join().await {
            Outcome::Panicked(fault) => assert_eq!(fault.payload, Payload::Int(42)),
            other => panic!("expected a panic outcome, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_spawn_guarded_aborted_is_cancelled() {
        let task = spawn_guarded("sleeper", async {
            tokio::time::sleep(std::time::Duration::from_secs(60)).await;
            Ok::<(), RecoverError>(())
        });
        task.abort_handle().abort();
        assert!(matches!(
            task.join().await,
            Outcome::Failed(RecoverError::Cancelled { .. })
        ));
    }
}
