//! # Converter Module
//!
//! Modulo che separa le responsabilità della conversione in sottomoduli:
//! - `controller`: Ciclo di vita del job, cancellazione, stato osservabile
//! - `pipeline`: Worker a due passate su ffmpeg
//! - `estimator`: Stima temporale del progresso

pub mod controller;
pub mod estimator;
pub mod pipeline;

pub use controller::{
    CancelHandle, ConversionJob, JobController, JobHandle, JobOutcome, JobState, ProgressFeed,
    ResultFuture,
};
pub use estimator::{estimate_percent, ThroughputModel};
pub use pipeline::{encode_args, palette_args, Pass, BASE_FILTERS, PALETTE_GEN, PALETTE_USE};
