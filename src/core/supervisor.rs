use crate::core::guard;
use crate::core::ConfigProvider;
use crate::domain::model::{Fault, Outcome};
use crate::domain::ports::Action;
use crate::utils::error::RecoverError;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{AbortHandle, JoinHandle};

/// When and how fast a panicked action is relaunched.
///
/// The default relaunches forever with no delay.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestartPolicy {
    pub max_restarts: Option<u64>,
    pub backoff: Duration,
}

impl RestartPolicy {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn from_config<C: ConfigProvider>(config: &C) -> Self {
        Self {
            max_restarts: config.max_restarts(),
            backoff: Duration::from_millis(config.backoff_ms()),
        }
    }
}

#[derive(Debug)]
pub enum SupervisionEnd {
    /// The action returned normally.
    Completed { restarts: u64 },
    /// The action returned a typed error; typed errors are not retried.
    Failed { restarts: u64, error: RecoverError },
    /// The restart ceiling was reached.
    GaveUp { restarts: u64, last: Fault },
    /// Supervision was aborted from outside.
    Aborted { restarts: u64 },
}

impl SupervisionEnd {
    pub fn restarts(&self) -> u64 {
        match self {
            Self::Completed { restarts }
            | Self::Failed { restarts, .. }
            | Self::GaveUp { restarts, .. }
            | Self::Aborted { restarts } => *restarts,
        }
    }
}

/// Runs an action and launches a fresh attempt every time it panics.
pub struct Supervisor {
    label: String,
    action: Arc<dyn Action>,
    policy: RestartPolicy,
}

impl Supervisor {
    pub fn new(label: impl Into<String>, action: impl Action) -> Self {
        Self {
            label: label.into(),
            action: Arc::new(action),
            policy: RestartPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: RestartPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Starts supervising in the background.
    pub fn spawn(self) -> SupervisedHandle {
        let restarts = Arc::new(AtomicU64::new(0));
        let label = self.label.clone();
        let handle = tokio::spawn(self.supervise(Arc::clone(&restarts)));

        SupervisedHandle {
            label,
            restarts,
            handle,
        }
    }

    /// Supervises on the calling task until supervision ends.
    ///
    /// Dropping the returned future also aborts the attempt in flight.
    pub async fn run(self) -> SupervisionEnd {
        self.supervise(Arc::new(AtomicU64::new(0))).await
    }

    async fn supervise(self, restarts: Arc<AtomicU64>) -> SupervisionEnd {
        tracing::info!(label = %self.label, "▶️ Supervising");

        loop {
            let attempt = restarts.load(Ordering::SeqCst) + 1;
            // The action is launched inside the attempt, so a panic while
            // building its future is caught like any other.
            let action = Arc::clone(&self.action);
            let task = guard::spawn_guarded(
                format!("{} (attempt {})", self.label, attempt),
                async move { action.launch().await },
            );
            let _in_flight = AbortOnDrop(task.abort_handle());

            match task.join().await {
                Outcome::Completed(()) => {
                    let restarts = restarts.load(Ordering::SeqCst);
                    tracing::info!(label = %self.label, restarts, "✅ Supervised action finished");
                    return SupervisionEnd::Completed { restarts };
                }
                Outcome::Failed(error) => {
                    let restarts = restarts.load(Ordering::SeqCst);
                    tracing::warn!(label = %self.label, restarts, "⚠️ Supervised action failed: {}", error);
                    return SupervisionEnd::Failed { restarts, error };
                }
                Outcome::Panicked(fault) => {
                    let done = restarts.load(Ordering::SeqCst);
                    if self.policy.max_restarts.is_some_and(|max| done >= max) {
                        tracing::error!(
                            label = %self.label,
                            restarts = done,
                            "❌ {} panicked, restart limit reached: {}",
                            self.label,
                            fault.payload
                        );
                        return SupervisionEnd::GaveUp {
                            restarts: done,
                            last: fault,
                        };
                    }

                    tracing::error!(
                        label = %self.label,
                        attempt,
                        "🔁 {} panicked, relaunching: {}",
                        self.label,
                        fault.payload
                    );
                    restarts.fetch_add(1, Ordering::SeqCst);

                    if !self.policy.backoff.is_zero() {
                        tokio::time::sleep(self.policy.backoff).await;
                    }
                }
            }
        }
    }
}

/// Aborts the attempt it watches when the supervision loop lets go of it,
/// including when the loop itself is cancelled mid-await.
struct AbortOnDrop(AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

pub struct SupervisedHandle {
    label: String,
    restarts: Arc<AtomicU64>,
    handle: JoinHandle<SupervisionEnd>,
}

impl SupervisedHandle {
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Relaunches performed so far.
    pub fn restarts(&self) -> u64 {
        self.restarts.load(Ordering::SeqCst)
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Stops supervision and the attempt currently running.
    pub fn abort(&self) {
        self.handle.abort();
    }

    /// Waits for supervision to end. A panic in the supervision loop itself
    /// is not an abort and is resumed on the caller.
    pub async fn join(self) -> SupervisionEnd {
        match self.handle.await {
            Ok(end) => end,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(_) => SupervisionEnd::Aborted {
                restarts: self.restarts.load(Ordering::SeqCst),
            },
        }
    }
}
