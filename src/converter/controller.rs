//! # Job Controller
//!
//! Possiede il ciclo di vita di UNA conversione alla volta: avvia il worker
//! della pipeline e lo stimatore del progresso, li attende entrambi e
//! pubblica un unico esito. Stato e progresso sono esposti solo tramite
//! canali `watch`: chi osserva legge snapshot, non muta mai lo stato.

use crate::config::Config;
use crate::converter::estimator::{ProgressEstimator, ThroughputModel};
use crate::converter::pipeline::Pipeline;
use crate::error::{JobError, StartError};
use crate::file_manager::FileManager;
use crate::provisioner::ToolProvisioner;
use anyhow::Result;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;
use tokio::sync::{oneshot, watch};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Terminal result of a job
#[derive(Debug, Clone)]
pub enum JobOutcome {
    Succeeded { output: PathBuf },
    Cancelled,
    Failed(JobError),
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Lifecycle of the controller's current job
#[derive(Debug, Clone, Default)]
pub enum JobState {
    #[default]
    Idle,
    Running,
    Cancelling,
    Terminated(JobOutcome),
}

impl JobState {
    /// Running or cancelling
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Running | Self::Cancelling)
    }
}

/// The unit of work in flight
#[derive(Debug, Clone)]
pub struct ConversionJob {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub started_at: Instant,
}

/// Latest progress percentage, in [0, 100]
#[derive(Debug, Clone)]
pub struct ProgressFeed {
    rx: watch::Receiver<f64>,
}

impl ProgressFeed {
    pub fn current(&self) -> f64 {
        *self.rx.borrow()
    }

    /// Wait for the next published value; `None` once the controller is gone
    pub async fn changed(&mut self) -> Option<f64> {
        self.rx.changed().await.ok()?;
        Some(*self.rx.borrow_and_update())
    }
}

/// Resolves to the single outcome of a job
#[derive(Debug)]
pub struct ResultFuture {
    rx: oneshot::Receiver<JobOutcome>,
}

impl Future for ResultFuture {
    type Output = JobOutcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|received| {
            received.unwrap_or_else(|_| {
                JobOutcome::Failed(JobError::WorkerLost("result channel closed".to_string()))
            })
        })
    }
}

/// Cooperative cancellation of one job.
///
/// Synchronous and idempotent; a no-op once the job has finished.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    cancel: CancellationToken,
    finished: CancellationToken,
    state: Arc<watch::Sender<JobState>>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        if self.finished.is_cancelled() {
            return;
        }
        self.cancel.cancel();

        let finished = &self.finished;
        self.state.send_if_modified(|state| {
            if !finished.is_cancelled() && matches!(state, JobState::Running) {
                *state = JobState::Cancelling;
                true
            } else {
                false
            }
        });
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Caller-side view of a started job
#[derive(Debug)]
pub struct JobHandle {
    job: ConversionJob,
    progress: ProgressFeed,
    state: watch::Receiver<JobState>,
    result: ResultFuture,
    cancel: CancelHandle,
}

impl JobHandle {
    pub fn job(&self) -> &ConversionJob {
        &self.job
    }

    pub fn progress(&self) -> ProgressFeed {
        self.progress.clone()
    }

    /// Snapshot of the controller state
    pub fn state(&self) -> JobState {
        self.state.borrow().clone()
    }

    pub fn state_feed(&self) -> watch::Receiver<JobState> {
        self.state.clone()
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub async fn wait(self) -> JobOutcome {
        self.result.await
    }

    pub fn into_parts(self) -> (ProgressFeed, ResultFuture, CancelHandle) {
        (self.progress, self.result, self.cancel)
    }
}

/// Frees the controller when the job's supervisor is done with it
struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Runs at most one conversion at a time
pub struct JobController {
    config: Config,
    provisioner: ToolProvisioner,
    state: Arc<watch::Sender<JobState>>,
    progress: Arc<watch::Sender<f64>>,
    busy: Arc<AtomicBool>,
}

impl JobController {
    /// Crea un controller con il provisioner di default
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let (state, _) = watch::channel(JobState::Idle);
        let (progress, _) = watch::channel(0.0);

        Ok(Self {
            config,
            provisioner: ToolProvisioner::new(),
            state: Arc::new(state),
            progress: Arc::new(progress),
            busy: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn with_provisioner(mut self, provisioner: ToolProvisioner) -> Self {
        self.provisioner = provisioner;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> JobState {
        self.state.borrow().clone()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<JobState> {
        self.state.subscribe()
    }

    pub fn subscribe_progress(&self) -> ProgressFeed {
        ProgressFeed {
            rx: self.progress.subscribe(),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Start converting `input_path` to a sibling `.gif`.
    ///
    /// Must be called from within a tokio runtime. Fails only when another
    /// job is still running; every other problem is reported through the
    /// job's outcome.
    pub fn start(&self, input_path: impl Into<PathBuf>) -> Result<JobHandle, StartError> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(StartError::JobInFlight);
        }
        let guard = BusyGuard(self.busy.clone());

        let input_path = input_path.into();
        let job = ConversionJob {
            output_path: FileManager::output_path_for(&input_path),
            input_path,
            started_at: Instant::now(),
        };

        let cancel = CancellationToken::new();
        let finished = CancellationToken::new();
        let (result_tx, result_rx) = oneshot::channel();

        self.progress.send_replace(0.0);

        let handle = JobHandle {
            job: job.clone(),
            progress: self.subscribe_progress(),
            state: self.state.subscribe(),
            result: ResultFuture { rx: result_rx },
            cancel: CancelHandle {
                cancel: cancel.clone(),
                finished: finished.clone(),
                state: self.state.clone(),
            },
        };

        // Unsupported hosts fail before the job is ever Running
        if let Err(e) = self.provisioner.platform() {
            warn!("❌ Cannot convert {}: {}", job.input_path.display(), e);
            let outcome = JobOutcome::Failed(e.into());
            finished.cancel();
            self.state.send_replace(JobState::Terminated(outcome.clone()));
            drop(guard);
            let _ = result_tx.send(outcome);
            return Ok(handle);
        }

        info!(
            "🎬 Starting conversion: {} -> {}",
            job.input_path.display(),
            job.output_path.display()
        );
        self.state.send_replace(JobState::Running);

        let pipeline = Pipeline {
            input_path: job.input_path.clone(),
            output_path: job.output_path.clone(),
            work_dir: self.config.work_dir(),
            provisioner: self.provisioner.clone(),
            cancel: cancel.clone(),
        };
        let estimator = ProgressEstimator {
            input_path: job.input_path.clone(),
            started_at: job.started_at,
            interval: self.config.progress_interval(),
            model: ThroughputModel {
                reference_bytes: self.config.reference_bytes,
                reference_secs: self.config.reference_secs,
            },
        };
        let state = self.state.clone();
        let progress = self.progress.clone();

        tokio::spawn(async move {
            let worker = tokio::spawn(pipeline.run());
            let ticker = tokio::spawn(estimator.run(progress.clone(), cancel, finished.clone()));

            let outcome = match worker.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!("Conversion worker panicked: {}", e);
                    JobOutcome::Failed(JobError::WorkerLost(e.to_string()))
                }
            };

            finished.cancel();
            if let Err(e) = ticker.await {
                warn!("Progress estimator stopped abnormally: {}", e);
            }

            progress.send_replace(0.0);
            state.send_replace(JobState::Terminated(outcome.clone()));
            drop(guard);
            let _ = result_tx.send(outcome);
        });

        Ok(handle)
    }
}
