//! # Two-pass Pipeline
//!
//! Worker di una singola conversione: provisioning di ffmpeg, generazione
//! della palette, codifica vincolata alla palette e pulizia garantita di
//! palette, output parziale ed eseguibile temporaneo su ogni percorso.

use crate::args;
use crate::converter::controller::JobOutcome;
use crate::error::{JobError, ProvisionError};
use crate::file_manager::FileManager;
use crate::provisioner::{ToolHandle, ToolProvisioner};
use crate::utils::to_os_args;
use std::ffi::OsString;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tempfile::{NamedTempFile, TempPath};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Frame rate and scaling shared by both passes
pub const BASE_FILTERS: &str = "fps=15,scale=640:-1:flags=lanczos";
/// Palette generation tuned for frame-to-frame differences
pub const PALETTE_GEN: &str = "palettegen=stats_mode=diff";
/// Ordered dithering, rectangular diff mode
pub const PALETTE_USE: &str = "paletteuse=dither=bayer:bayer_scale=5:diff_mode=rectangle";

/// Bytes of ffmpeg stderr kept while draining the pipe
const STDERR_TAIL_BYTES: usize = 16 * 1024;
/// Lines of stderr reported in a failure
const STDERR_EXCERPT_LINES: usize = 10;
const SPAWN_RETRIES: u32 = 5;

/// One invocation of ffmpeg
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    Palette,
    Encode,
}

impl fmt::Display for Pass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Palette => f.write_str("palette"),
            Self::Encode => f.write_str("encode"),
        }
    }
}

fn common_args() -> Vec<OsString> {
    to_os_args(["-hide_banner", "-loglevel", "error"])
}

/// Arguments of the palette generation pass
pub fn palette_args(input: &Path, palette: &Path) -> Vec<OsString> {
    let mut cmd = common_args();
    cmd.extend(args![
        "-i",
        input,
        "-vf",
        format!("{},{}", BASE_FILTERS, PALETTE_GEN),
        "-y",
        palette,
    ]);
    cmd
}

/// Arguments of the palette-constrained encoding pass
pub fn encode_args(input: &Path, palette: &Path, output: &Path) -> Vec<OsString> {
    let mut cmd = common_args();
    cmd.extend(args![
        "-i",
        input,
        "-i",
        palette,
        "-lavfi",
        format!("{},{}", BASE_FILTERS, PALETTE_USE),
        "-y",
        output,
    ]);
    cmd
}

/// Why the pipeline stopped early
#[derive(Debug)]
enum Interrupt {
    Cancelled,
    Failed(JobError),
}

impl From<JobError> for Interrupt {
    fn from(err: JobError) -> Self {
        Self::Failed(err)
    }
}

impl From<ProvisionError> for Interrupt {
    fn from(err: ProvisionError) -> Self {
        Self::Failed(err.into())
    }
}

pub(crate) struct Pipeline {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub work_dir: PathBuf,
    pub provisioner: ToolProvisioner,
    pub cancel: CancellationToken,
}

impl Pipeline {
    /// Run both passes and map the result to the job outcome
    pub async fn run(self) -> JobOutcome {
        match self.execute().await {
            Ok(()) => {
                info!("✅ Conversion completed: {}", self.output_path.display());
                JobOutcome::Succeeded {
                    output: self.output_path,
                }
            }
            Err(Interrupt::Cancelled) => {
                info!("Conversion cancelled: {}", self.input_path.display());
                JobOutcome::Cancelled
            }
            // Killing the child on cancellation surfaces as a failure
            Err(Interrupt::Failed(e)) if self.cancel.is_cancelled() => {
                debug!("Failure after cancellation request: {}", e);
                JobOutcome::Cancelled
            }
            Err(Interrupt::Failed(e)) => {
                warn!("❌ Conversion failed: {}", e);
                JobOutcome::Failed(e)
            }
        }
    }

    async fn execute(&self) -> Result<(), Interrupt> {
        self.checkpoint()?;

        let provisioner = self.provisioner.clone();
        let tool = tokio::task::spawn_blocking(move || provisioner.provision())
            .await
            .map_err(|e| JobError::WorkerLost(e.to_string()))??;

        let result = self.run_passes(&tool).await;
        tool.release();
        result
    }

    async fn run_passes(&self, tool: &ToolHandle) -> Result<(), Interrupt> {
        let palette = self.create_palette_artifact()?;
        let mut encode_started = false;

        let result = self.two_passes(tool, &palette, &mut encode_started).await;

        if result.is_err() && encode_started {
            FileManager::remove_if_exists(&self.output_path).await;
        }
        remove_artifact(palette);

        result
    }

    async fn two_passes(
        &self,
        tool: &ToolHandle,
        palette: &Path,
        encode_started: &mut bool,
    ) -> Result<(), Interrupt> {
        let child = self
            .spawn_pass(tool, Pass::Palette, palette_args(&self.input_path, palette))
            .await?;
        self.await_pass(Pass::Palette, child).await?;

        let child = self
            .spawn_pass(
                tool,
                Pass::Encode,
                encode_args(&self.input_path, palette, &self.output_path),
            )
            .await?;
        *encode_started = true;
        self.await_pass(Pass::Encode, child).await
    }

    fn checkpoint(&self) -> Result<(), Interrupt> {
        if self.cancel.is_cancelled() {
            Err(Interrupt::Cancelled)
        } else {
            Ok(())
        }
    }

    fn create_palette_artifact(&self) -> Result<TempPath, Interrupt> {
        let palette = tempfile::Builder::new()
            .prefix("palette-")
            .suffix(".png")
            .tempfile_in(&self.work_dir)
            .map(NamedTempFile::into_temp_path)
            .map_err(ProvisionError::io("create palette artifact"))?;
        debug!("Palette artifact: {}", palette.display());
        Ok(palette)
    }

    async fn spawn_pass(
        &self,
        tool: &ToolHandle,
        pass: Pass,
        args: Vec<OsString>,
    ) -> Result<Child, Interrupt> {
        self.checkpoint()?;

        info!("🔄 Starting {} pass", pass);
        debug!("{} {:?}", tool.path().display(), args);

        let mut attempt = 0;
        loop {
            let mut cmd = Command::new(tool.path());
            cmd.args(&args)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::piped())
                .kill_on_drop(true);
            // Own group, so a cancel also reaches whatever ffmpeg forked
            #[cfg(unix)]
            cmd.process_group(0);

            match cmd.spawn() {
                Ok(child) => return Ok(child),
                Err(e) if is_text_file_busy(&e) && attempt < SPAWN_RETRIES => {
                    attempt += 1;
                    debug!("ffmpeg copy still busy, retrying spawn ({}/{})", attempt, SPAWN_RETRIES);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                }
                Err(e) => {
                    return Err(JobError::ProcessLaunchFailed {
                        pass,
                        source: Arc::new(e),
                    }
                    .into())
                }
            }
        }
    }

    async fn await_pass(&self, pass: Pass, mut child: Child) -> Result<(), Interrupt> {
        let stderr = tokio::spawn(read_stderr_excerpt(child.stderr.take()));

        let status = tokio::select! {
            status = child.wait() => Some(status),
            _ = self.cancel.cancelled() => None,
        };

        let Some(status) = status else {
            info!("Stopping ffmpeg ({} pass)", pass);
            if let Err(e) = kill_process_group(&mut child) {
                debug!("ffmpeg already exited: {}", e);
            }
            if let Err(e) = child.wait().await {
                warn!("Failed to reap ffmpeg after cancellation: {}", e);
            }
            stderr.abort();
            return Err(Interrupt::Cancelled);
        };

        let status = status.map_err(|e| JobError::ProcessLaunchFailed {
            pass,
            source: Arc::new(e),
        })?;
        let stderr = stderr.await.unwrap_or_default();

        if status.success() {
            info!("{} pass completed", pass);
            Ok(())
        } else {
            Err(JobError::ProcessExitedNonZero {
                pass,
                code: status.code(),
                stderr,
            }
            .into())
        }
    }
}

/// ETXTBSY: a concurrently forked process may still hold the fresh copy open
fn is_text_file_busy(err: &io::Error) -> bool {
    cfg!(unix) && err.raw_os_error() == Some(26)
}

/// SIGKILL the group led by the pass process
#[cfg(unix)]
fn kill_process_group(child: &mut Child) -> io::Result<()> {
    let Some(pid) = child.id() else {
        return Ok(());
    };
    // SAFETY: pid belongs to our unreaped child, leader of its own group.
    let ret = unsafe { libc::killpg(pid as libc::pid_t, libc::SIGKILL) };
    if ret == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn kill_process_group(child: &mut Child) -> io::Result<()> {
    child.start_kill()
}

fn remove_artifact(palette: TempPath) {
    let shown = palette.display().to_string();
    match palette.close() {
        Ok(()) => debug!("Removed palette artifact {}", shown),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove palette artifact {}: {}", shown, e),
    }
}

/// Drain a stream completely, keeping the last lines as a diagnostic excerpt
async fn read_stderr_excerpt<R: AsyncRead + Unpin>(handle: Option<R>) -> String {
    let Some(mut handle) = handle else {
        return String::new();
    };

    let mut tail = Vec::new();
    let mut chunk = [0u8; 8192];
    loop {
        match handle.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                tail.extend_from_slice(&chunk[..n]);
                if tail.len() > STDERR_TAIL_BYTES {
                    let excess = tail.len() - STDERR_TAIL_BYTES;
                    tail.drain(..excess);
                }
            }
        }
    }

    let text = String::from_utf8_lossy(&tail);
    let lines: Vec<&str> = text.lines().filter(|line| !line.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(STDERR_EXCERPT_LINES);
    lines[start..].join("\n")
}
