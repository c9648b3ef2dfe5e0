//! # Tool Provisioner
//!
//! Materializes a ready-to-execute copy of ffmpeg for the current operating
//! system. The bytes come from a [`PayloadSource`]; the copy lives in a
//! uniquely named temporary file owned by a [`ToolHandle`], which deletes it
//! when released or dropped.

use crate::error::ProvisionError;
use crate::platform::{PayloadKind, Platform};
use crate::tool_resolver::ToolPathResolver;
use std::borrow::Cow;
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempPath;
use tracing::{debug, warn};

mod embedded {
    include!(concat!(env!("OUT_DIR"), "/embedded_payloads.rs"));
}

/// Supplies the ffmpeg bytes for a payload kind
pub trait PayloadSource: Send + Sync {
    fn payload(&self, kind: PayloadKind) -> Result<Cow<'static, [u8]>, ProvisionError>;
}

/// Payloads embedded by `build.rs`, falling back to a bundled or system ffmpeg
#[derive(Default)]
pub struct EmbeddedPayloads {
    resolver: ToolPathResolver,
}

impl EmbeddedPayloads {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a payload for `kind` was compiled into the binary
    pub fn is_embedded(kind: PayloadKind) -> bool {
        Self::embedded(kind).is_some()
    }

    fn embedded(kind: PayloadKind) -> Option<&'static [u8]> {
        match kind {
            PayloadKind::Unix => embedded::UNIX_PAYLOAD,
            PayloadKind::Windows => embedded::WINDOWS_PAYLOAD,
        }
    }
}

impl PayloadSource for EmbeddedPayloads {
    fn payload(&self, kind: PayloadKind) -> Result<Cow<'static, [u8]>, ProvisionError> {
        if let Some(bytes) = Self::embedded(kind) {
            return Ok(Cow::Borrowed(bytes));
        }

        let path = self
            .resolver
            .resolve(kind)
            .ok_or(ProvisionError::MissingPayload(kind))?;
        debug!("Reading ffmpeg payload from {}", path.display());
        let bytes = std::fs::read(&path).map_err(ProvisionError::io("read bundled ffmpeg"))?;
        Ok(Cow::Owned(bytes))
    }
}

/// In-memory payload table
#[derive(Debug, Clone, Default)]
pub struct StaticPayloads {
    payloads: HashMap<PayloadKind, Arc<[u8]>>,
}

impl StaticPayloads {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, kind: PayloadKind, bytes: impl Into<Vec<u8>>) -> Self {
        self.payloads.insert(kind, Arc::from(bytes.into()));
        self
    }
}

impl PayloadSource for StaticPayloads {
    fn payload(&self, kind: PayloadKind) -> Result<Cow<'static, [u8]>, ProvisionError> {
        self.payloads
            .get(&kind)
            .map(|bytes| Cow::Owned(bytes.to_vec()))
            .ok_or(ProvisionError::MissingPayload(kind))
    }
}

/// Provisions temporary ffmpeg executables
#[derive(Clone)]
pub struct ToolProvisioner {
    os: String,
    source: Arc<dyn PayloadSource>,
    temp_dir: Option<PathBuf>,
}

impl ToolProvisioner {
    /// Provisioner for the running OS using the embedded payloads
    pub fn new() -> Self {
        Self::for_os(std::env::consts::OS, EmbeddedPayloads::new())
    }

    /// Provisioner for an explicit OS identifier and payload source
    pub fn for_os(os: impl Into<String>, source: impl PayloadSource + 'static) -> Self {
        Self {
            os: os.into(),
            source: Arc::new(source),
            temp_dir: None,
        }
    }

    /// Materialize executables in `dir` instead of the system temp dir
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    pub fn os(&self) -> &str {
        &self.os
    }

    /// Resolve the target platform without touching the filesystem
    pub fn platform(&self) -> Result<Platform, ProvisionError> {
        Platform::from_os(&self.os)
    }

    /// Write the payload for this OS to a fresh executable temp file
    pub fn provision(&self) -> Result<ToolHandle, ProvisionError> {
        let platform = self.platform()?;
        let payload = self.source.payload(platform.payload_kind())?;

        let mut builder = tempfile::Builder::new();
        builder.prefix("ffmpeg-").suffix(platform.executable_suffix());
        let created = match self.temp_dir {
            Some(ref dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        };

        // Dropping `file` on any error below removes the partial copy
        let mut file = created.map_err(ProvisionError::io("create temporary executable"))?;
        file.write_all(&payload)
            .map_err(ProvisionError::io("write payload"))?;
        file.flush().map_err(ProvisionError::io("flush payload"))?;
        make_executable(file.path()).map_err(ProvisionError::io("mark executable"))?;

        let path = file.into_temp_path();
        debug!(
            "Provisioned ffmpeg for {} at {} ({} bytes)",
            platform,
            path.display(),
            payload.len()
        );

        Ok(ToolHandle { path, platform })
    }
}

impl Default for ToolProvisioner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(unix)]
fn make_executable(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> io::Result<()> {
    Ok(())
}

/// Exclusive ownership of a temporary ffmpeg executable
#[derive(Debug)]
pub struct ToolHandle {
    path: TempPath,
    platform: Platform,
}

impl ToolHandle {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Delete the executable. Failures are logged, never escalated.
    pub fn release(self) {
        let shown = self.path.display().to_string();
        match self.path.close() {
            Ok(()) => debug!("Released ffmpeg copy {}", shown),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove ffmpeg copy {}: {}", shown, e),
        }
    }
}
