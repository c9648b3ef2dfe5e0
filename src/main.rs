//! # clip2gif - Main Entry Point
//!
//! Questo è il punto di ingresso principale dell'applicazione.
//!
//! ## Responsabilità:
//! - Parsing degli argomenti della command line con `clap`
//! - Inizializzazione del sistema di logging con `tracing` (su stderr)
//! - Validazione dell'input dell'utente
//! - Avvio del job e resa del progresso (progress bar o eventi JSON)
//! - Ctrl-C annulla la conversione in corso
//!
//! ## Exit code:
//! - `0`: GIF creata
//! - `130`: conversione annullata
//! - `1`: conversione fallita
//!
//! ## Esempio di utilizzo:
//! ```bash
//! clip2gif /path/to/clip.mov --work-dir /tmp/clip2gif --verbose
//! ```

use anyhow::{anyhow, Result};
use clap::Parser;
use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use clip2gif::file_manager::FileManager;
use clip2gif::json_output::{JsonConfig, JsonMessage};
use clip2gif::platform::Platform;
use clip2gif::progress::{ConversionSummary, ProgressManager};
use clip2gif::provisioner::EmbeddedPayloads;
use clip2gif::tool_resolver::ToolPathResolver;
use clip2gif::{Config, JobController, JobHandle, JobOutcome};

#[derive(Parser)]
#[command(name = "clip2gif")]
#[command(about = "Convert a short video clip to an animated GIF with ffmpeg")]
struct Args {
    /// Video to convert (MP4 or MOV); the GIF is written next to it
    #[arg(required_unless_present = "check_tools")]
    input: Option<PathBuf>,

    /// Directory for the intermediate palette (default: system temp dir)
    #[arg(long)]
    work_dir: Option<PathBuf>,

    /// Output progress and status as JSON lines on stdout
    #[arg(long)]
    json: bool,

    /// Progress sampling interval in milliseconds
    #[arg(long, default_value = "100")]
    progress_interval_ms: u64,

    /// Print where ffmpeg would be taken from and exit
    #[arg(long)]
    check_tools: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    // Initialize logging
    // RUST_LOG overrides the default level
    let level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    if args.check_tools {
        print_tool_report();
        return Ok(ExitCode::SUCCESS);
    }

    // Validate arguments
    let input = args
        .input
        .ok_or_else(|| anyhow!("An input video is required"))?;
    if !input.exists() {
        return Err(anyhow!("Input file does not exist: {}", input.display()));
    }
    if !input.is_file() {
        return Err(anyhow!("Input path is not a file: {}", input.display()));
    }
    if !FileManager::is_video(&input) {
        warn!(
            "{} is not an MP4/MOV file, trying anyway",
            input.display()
        );
    }
    let input = input.canonicalize()?;

    let config = Config {
        work_dir: args.work_dir,
        progress_interval_ms: args.progress_interval_ms,
        json_output: args.json,
        ..Default::default()
    };

    let controller = JobController::new(config)?;
    let handle = controller.start(&input)?;
    let outcome = run(handle, controller.config()).await;

    Ok(outcome)
}

/// Drive one job to completion, rendering progress and handling Ctrl-C
async fn run(handle: JobHandle, config: &Config) -> ExitCode {
    let job = handle.job().clone();
    let input_size = FileManager::file_size(&job.input_path).await.ok();

    let progress_bar = if config.json_output {
        JsonMessage::Start {
            input: job.input_path.clone(),
            output: job.output_path.clone(),
            input_size,
            config: JsonConfig::from(config),
        }
        .emit();
        None
    } else {
        let label = job
            .input_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Some(ProgressManager::new(&label))
    };

    let (mut progress, mut result, cancel) = handle.into_parts();
    // Armed once for the whole job, not per loop iteration
    let interrupt = tokio::spawn(cancel_on(tokio::signal::ctrl_c(), move || cancel.cancel()));
    let mut last_percent = 0.0;
    let outcome = loop {
        tokio::select! {
            outcome = &mut result => break outcome,
            Some(percent) = progress.changed() => {
                // The feed drops back to 0 once the job is over
                if percent <= last_percent {
                    continue;
                }
                last_percent = percent;
                match &progress_bar {
                    Some(bar) => bar.set_percent(percent),
                    None => JsonMessage::progress(percent).emit(),
                }
            }
        }
    };
    interrupt.abort();

    let duration = job.started_at.elapsed();
    match outcome {
        JobOutcome::Succeeded { output } => {
            let output_size = FileManager::file_size(&output).await.ok();
            let summary = ConversionSummary {
                input_size: input_size.unwrap_or(0),
                output_size: output_size.unwrap_or(0),
                duration,
            };
            match &progress_bar {
                Some(bar) => bar.finish(&summary.format_summary()),
                None => JsonMessage::Complete {
                    output: output.clone(),
                    input_size,
                    output_size,
                    duration_seconds: duration.as_secs_f64(),
                }
                .emit(),
            }
            info!("GIF written to {}", output.display());
            ExitCode::SUCCESS
        }
        JobOutcome::Cancelled => {
            match &progress_bar {
                Some(bar) => bar.abandon("cancelled"),
                None => JsonMessage::Cancelled {
                    input: job.input_path.clone(),
                    duration_seconds: duration.as_secs_f64(),
                }
                .emit(),
            }
            info!("Conversion of {} cancelled", job.input_path.display());
            ExitCode::from(130)
        }
        JobOutcome::Failed(err) => {
            match &progress_bar {
                Some(bar) => bar.abandon("failed"),
                None => JsonMessage::error(&err).emit(),
            }
            error!("Conversion failed: {}", err);
            ExitCode::FAILURE
        }
    }
}

/// Call `cancel` once `interrupt` fires
async fn cancel_on<F, C>(interrupt: F, cancel: C)
where
    F: Future<Output = io::Result<()>>,
    C: FnOnce(),
{
    match interrupt.await {
        Ok(()) => {
            warn!("Interrupt received, cancelling conversion...");
            cancel();
        }
        Err(e) => warn!("Cannot listen for Ctrl-C: {}", e),
    }
}

fn print_tool_report() {
    match Platform::current() {
        Ok(platform) => {
            let kind = platform.payload_kind();
            println!("Platform: {} (payload: {})", platform, kind);
            println!(
                "Embedded ffmpeg: {}",
                if EmbeddedPayloads::is_embedded(kind) { "yes" } else { "no" }
            );
        }
        Err(e) => println!("Platform: {}", e),
    }

    println!("{}", ToolPathResolver::new().report());
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_interrupt_cancels() {
        let (tx, rx) = oneshot::channel::<()>();
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = cancelled.clone();

        let listener = tokio::spawn(cancel_on(
            async move { rx.await.map_err(|_| io::Error::other("closed")) },
            move || flag.store(true, Ordering::SeqCst),
        ));
        // Nothing happens until the signal arrives
        tokio::task::yield_now().await;
        assert!(!cancelled.load(Ordering::SeqCst));

        tx.send(()).unwrap();
        listener.await.unwrap();
        assert!(cancelled.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_listener_error_does_not_cancel() {
        let cancelled = AtomicBool::new(false);
        cancel_on(
            async { Err(io::Error::other("no signal handler")) },
            || cancelled.store(true, Ordering::SeqCst),
        )
        .await;
        assert!(!cancelled.load(Ordering::SeqCst));
    }
}
