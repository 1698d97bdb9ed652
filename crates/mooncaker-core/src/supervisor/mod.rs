//! Background worker supervision on top of taskvisor.
//! - Owns a `Supervisor` instance with a controller.
//! - Submits worker tasks (crawler, bot, relays) with a restart/backoff policy.
use std::{sync::Arc, time::Duration};

use taskvisor::{
    AdmissionPolicy as ControllerAdmission, BackoffPolicy, ControllerSpec, JitterPolicy, RestartPolicy, Subscribe,
    Supervisor, TaskRef, TaskSpec,
};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

pub use taskvisor::{ControllerConfig, SupervisorConfig};

use crate::error::CoreError;

/// When a finished worker is started again.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Restart {
    /// Restart after failures only.
    OnFailure,
    /// Run once.
    Never,
}

/// Runtime policy applied to a worker task.
#[derive(Clone, Debug)]
pub struct WorkerPolicy {
    pub restart: Restart,
    /// Delay before the first retry.
    pub backoff_first: Duration,
    /// Upper bound for retry delays.
    pub backoff_max: Duration,
    /// Growth factor between consecutive retries.
    pub backoff_factor: f64,
}

impl Default for WorkerPolicy {
    fn default() -> Self {
        Self {
            restart: Restart::OnFailure,
            backoff_first: Duration::from_secs(1),
            backoff_max: Duration::from_secs(60),
            backoff_factor: 2.0,
        }
    }
}

impl WorkerPolicy {
    /// Validate the policy before it reaches the supervisor.
    ///
    /// Rules:
    /// - `backoff_factor` is at least `1.0`;
    /// - `backoff_first` does not exceed `backoff_max`.
    pub fn validate(&self) -> Result<(), CoreError> {
        if !(self.backoff_factor >= 1.0) {
            return Err(CoreError::InvalidPolicy(format!(
                "backoff factor must be >= 1.0, got {}",
                self.backoff_factor
            )));
        }
        if self.backoff_first > self.backoff_max {
            return Err(CoreError::InvalidPolicy(
                "backoff first delay exceeds max delay".into(),
            ));
        }
        Ok(())
    }

    fn restart_policy(&self) -> RestartPolicy {
        match self.restart {
            Restart::OnFailure => RestartPolicy::OnFailure,
            Restart::Never => RestartPolicy::Never,
        }
    }

    fn backoff_policy(&self) -> BackoffPolicy {
        BackoffPolicy {
            jitter: JitterPolicy::Equal,
            factor: self.backoff_factor,
            first: self.backoff_first,
            max: self.backoff_max,
        }
    }

    fn to_controller_spec(&self, task: TaskRef) -> ControllerSpec {
        ControllerSpec {
            admission: ControllerAdmission::Replace,
            task_spec: TaskSpec::new(task, self.restart_policy(), self.backoff_policy(), None),
        }
    }
}

/// Thin wrapper around taskvisor [`Supervisor`].
///
/// Workers are long-running: they get no timeout and stop on cancellation
/// (OS signal handled by the supervisor).
pub struct WorkerSupervisor {
    sup: Arc<Supervisor>,
    run: JoinHandle<()>,
}

impl WorkerSupervisor {
    /// Create a supervisor and start its run loop in background.
    pub async fn new(
        sup_cfg: SupervisorConfig,
        ctrl_cfg: ControllerConfig,
        subscribers: Vec<Arc<dyn Subscribe>>,
    ) -> Result<Self, CoreError> {
        let sup = Supervisor::builder(sup_cfg)
            .with_subscribers(subscribers)
            .with_controller(ctrl_cfg)
            .build();

        let runner = Arc::clone(&sup);
        let run = tokio::spawn(async move {
            match runner.run(Vec::new()).await {
                Ok(_) => info!("supervisor run loop finished"),
                Err(e) => error!(error = %e, "supervisor run loop exited with error"),
            }
        });
        sup.wait_ready().await;
        info!("supervisor is ready to accept workers");
        Ok(Self { sup, run })
    }

    /// Submit a pre-built worker task.
    #[instrument(level = "debug", skip_all)]
    pub async fn submit(&self, task: TaskRef, policy: &WorkerPolicy) -> Result<(), CoreError> {
        policy.validate()?;

        debug!(restart = ?policy.restart, "submitting worker via controller");
        self.sup
            .submit(policy.to_controller_spec(task))
            .await
            .map_err(|e| CoreError::Supervisor(e.to_string()))
    }

    /// Wait for the run loop to finish, at most `grace`.
    pub async fn join(self, grace: Duration) {
        if tokio::time::timeout(grace, self.run).await.is_err() {
            warn!(grace_ms = grace.as_millis() as u64, "supervisor did not stop within grace");
        }
    }
}
