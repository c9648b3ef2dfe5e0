//! # File Management Module
//!
//! Questo modulo gestisce le operazioni sui file attorno a una conversione.
//!
//! ## Responsabilità:
//! - Derivazione del path di output (`clip.mov` -> `clip.gif`)
//! - Riconoscimento dei formati video attesi (MP4, MOV)
//! - Rimozione best-effort di file temporanei e output parziali
//! - Formattazione human-readable delle dimensioni
//!
//! ## Esempio:
//! ```rust,ignore
//! let output = FileManager::output_path_for(Path::new("/videos/clip.mov"));
//! assert_eq!(output, PathBuf::from("/videos/clip.gif"));
//! ```

use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

/// Extension of the produced animation
pub const OUTPUT_EXTENSION: &str = "gif";

/// Manages file operations around a conversion
pub struct FileManager;

impl FileManager {
    /// Input path with its extension replaced by `gif`
    pub fn output_path_for(input_path: &Path) -> PathBuf {
        input_path.with_extension(OUTPUT_EXTENSION)
    }

    /// Check if a file has one of the expected video extensions
    pub fn is_video(path: &Path) -> bool {
        if let Some(ext) = path.extension() {
            let ext_lower = ext.to_string_lossy().to_lowercase();
            matches!(ext_lower.as_str(), "mp4" | "mov")
        } else {
            false
        }
    }

    /// Size of a file in bytes
    pub async fn file_size(path: &Path) -> io::Result<u64> {
        Ok(fs::metadata(path).await?.len())
    }

    /// Remove a file, ignoring a missing one and logging other failures
    pub async fn remove_if_exists(path: &Path) {
        match fs::remove_file(path).await {
            Ok(()) => debug!("Removed {}", path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
        }
    }

    /// Get human-readable file size
    pub fn format_size(size: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = size as f64;
        let mut unit_index = 0;

        while size >= 1024.0 && unit_index < UNITS.len() - 1 {
            size /= 1024.0;
            unit_index += 1;
        }

        if unit_index == 0 {
            format!("{} {}", size as u64, UNITS[unit_index])
        } else {
            format!("{:.2} {}", size, UNITS[unit_index])
        }
    }
}
