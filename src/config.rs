//! # Configuration Management Module
//!
//! Questo modulo gestisce la configurazione del controller di conversione.
//!
//! ## Responsabilità:
//! - Definisce la struct `Config` con i parametri di runtime
//! - Fornisce validazione dei parametri di input
//! - Fornisce valori di default sensati per tutti i parametri
//!
//! ## Parametri di configurazione:
//! - `work_dir`: Directory per l'artefatto palette (default: None = temp di sistema)
//! - `progress_interval_ms`: Intervallo di campionamento del progresso (default: 100)
//! - `reference_bytes` / `reference_secs`: Calibrazione della stima
//!   (default: 22_000_000 byte ogni 30 secondi)
//! - `json_output`: Eventi JSON su stdout invece della progress bar (default: false)
//!
//! La catena di filtri di ffmpeg è fissa e volutamente NON configurabile.
//!
//! ## Esempio:
//! ```rust,ignore
//! let config = Config {
//!     work_dir: Some(PathBuf::from("/tmp/clip2gif")),
//!     ..Default::default()
//! };
//! config.validate()?;
//! ```

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the conversion controller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory for the intermediate palette (None = system temp dir)
    pub work_dir: Option<PathBuf>,
    /// Progress sampling interval in milliseconds
    pub progress_interval_ms: u64,
    /// Input size the estimator assumes is converted in `reference_secs`
    pub reference_bytes: u64,
    /// Seconds needed to convert `reference_bytes`
    pub reference_secs: u64,
    /// Output progress and status as JSON for programmatic use
    pub json_output: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            work_dir: None,
            progress_interval_ms: 100,
            reference_bytes: 22_000_000,
            reference_secs: 30,
            json_output: false,
        }
    }
}

impl Config {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.progress_interval_ms == 0 {
            return Err(anyhow::anyhow!("Progress interval must be greater than 0"));
        }

        if self.reference_bytes == 0 {
            return Err(anyhow::anyhow!("Estimator reference size must be greater than 0"));
        }

        if let Some(ref work_dir) = self.work_dir {
            if !work_dir.exists() {
                return Err(anyhow::anyhow!("Work directory does not exist: {}", work_dir.display()));
            }
            if !work_dir.is_dir() {
                return Err(anyhow::anyhow!("Work directory is not a directory: {}", work_dir.display()));
            }
        }

        Ok(())
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }

    /// Directory where palette artifacts are created
    pub fn work_dir(&self) -> PathBuf {
        self.work_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.progress_interval_ms = 0;
        assert!(config.validate().is_err());

        config.progress_interval_ms = 100;
        config.reference_bytes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.work_dir, None);
        assert_eq!(config.progress_interval(), Duration::from_millis(100));
        assert_eq!(config.reference_bytes, 22_000_000);
        assert_eq!(config.reference_secs, 30);
        assert!(!config.json_output);
        assert_eq!(config.work_dir(), std::env::temp_dir());
    }

    #[test]
    fn test_work_dir_must_be_directory() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("not-a-dir");
        std::fs::write(&file_path, b"").unwrap();

        let mut config = Config {
            work_dir: Some(temp_dir.path().join("missing")),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config.work_dir = Some(file_path);
        assert!(config.validate().is_err());

        config.work_dir = Some(temp_dir.path().to_path_buf());
        assert!(config.validate().is_ok());
        assert_eq!(config.work_dir(), temp_dir.path());
    }
}
