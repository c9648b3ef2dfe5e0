//! # Progress Estimator
//!
//! Stima del progresso puramente temporale: la durata attesa deriva dalla
//! dimensione dell'input e da una velocità fissa calibrata empiricamente.
//! Non legge l'output di ffmpeg, quindi è volutamente approssimativa.

use crate::file_manager::FileManager;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Linear throughput assumption: `reference_bytes` take `reference_secs`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThroughputModel {
    pub reference_bytes: u64,
    pub reference_secs: u64,
}

impl Default for ThroughputModel {
    fn default() -> Self {
        Self {
            reference_bytes: 22_000_000,
            reference_secs: 30,
        }
    }
}

impl ThroughputModel {
    /// Expected conversion time, truncated to whole seconds
    pub fn estimated_total(&self, input_size: u64) -> Duration {
        let secs = input_size.saturating_mul(self.reference_secs) / self.reference_bytes.max(1);
        Duration::from_secs(secs)
    }
}

/// `min(100, 100 * elapsed / estimated_total)`; a zero estimate is complete
pub fn estimate_percent(elapsed: Duration, estimated_total: Duration) -> f64 {
    if estimated_total.is_zero() {
        return 100.0;
    }
    (elapsed.as_secs_f64() / estimated_total.as_secs_f64() * 100.0).clamp(0.0, 100.0)
}

/// Periodic task publishing the estimated percentage
pub(crate) struct ProgressEstimator {
    pub input_path: PathBuf,
    pub started_at: Instant,
    pub interval: Duration,
    pub model: ThroughputModel,
}

impl ProgressEstimator {
    /// Tick until 100% is reached, the job is cancelled, or `finished` fires.
    ///
    /// Published values never decrease.
    pub async fn run(
        self,
        progress: Arc<watch::Sender<f64>>,
        cancel: CancellationToken,
        finished: CancellationToken,
    ) {
        let input_size = match FileManager::file_size(&self.input_path).await {
            Ok(size) => size,
            Err(e) => {
                warn!(
                    "Cannot estimate progress for {}: {}",
                    self.input_path.display(),
                    e
                );
                return;
            }
        };

        let estimated_total = self.model.estimated_total(input_size);
        debug!(
            "Estimated conversion time for {}: {:?}",
            FileManager::format_size(input_size),
            estimated_total
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = finished.cancelled() => break,
                _ = ticker.tick() => {
                    let percent = estimate_percent(self.started_at.elapsed(), estimated_total);
                    progress.send_if_modified(|current| {
                        if percent > *current {
                            *current = percent;
                            true
                        } else {
                            false
                        }
                    });

                    if percent >= 100.0 {
                        break;
                    }
                }
            }
        }
    }
}
