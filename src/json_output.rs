//! # JSON Output Module
//!
//! Questo modulo gestisce l'output strutturato in JSON per l'uso programmatico
//! (per esempio una GUI che lancia `clip2gif --json` come sottoprocesso).
//!
//! ## Tipi di messaggi:
//! - `start`: Inizio conversione (input, output, configurazione)
//! - `progress`: Percentuale stimata corrente
//! - `complete`: Conversione riuscita con dimensioni e durata
//! - `cancelled`: Conversione annullata dall'utente
//! - `error`: Conversione fallita, con categoria e dettagli

use crate::config::Config;
use crate::error::{ErrorKind, JobError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Tipo di messaggio JSON
#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub enum JsonMessage {
    /// Inizio della conversione
    #[serde(rename = "start")]
    Start {
        input: PathBuf,
        output: PathBuf,
        input_size: Option<u64>,
        config: JsonConfig,
    },

    /// Progresso stimato
    #[serde(rename = "progress")]
    Progress { percentage: f64 },

    /// Conversione completata
    #[serde(rename = "complete")]
    Complete {
        output: PathBuf,
        input_size: Option<u64>,
        output_size: Option<u64>,
        duration_seconds: f64,
    },

    /// Conversione annullata
    #[serde(rename = "cancelled")]
    Cancelled {
        input: PathBuf,
        duration_seconds: f64,
    },

    /// Errore
    #[serde(rename = "error")]
    Error {
        kind: ErrorKind,
        message: String,
        details: Option<String>,
    },
}

/// Configurazione per output JSON
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonConfig {
    pub work_dir: PathBuf,
    pub progress_interval_ms: u64,
}

impl JsonMessage {
    /// Emette il messaggio JSON su stdout
    pub fn emit(&self) {
        if let Ok(json) = serde_json::to_string(self) {
            println!("{}", json);
        }
    }

    pub fn progress(percentage: f64) -> Self {
        Self::Progress { percentage }
    }

    /// Crea un messaggio di errore dalla causa del fallimento
    pub fn error(err: &JobError) -> Self {
        let details = match err {
            JobError::ProcessExitedNonZero { stderr, .. } if !stderr.is_empty() => {
                Some(stderr.clone())
            }
            JobError::ProcessLaunchFailed { source, .. } => Some(source.to_string()),
            _ => None,
        };

        Self::Error {
            kind: err.kind(),
            message: err.to_string(),
            details,
        }
    }
}

/// Converti Config esistente in JsonConfig
impl From<&Config> for JsonConfig {
    fn from(config: &Config) -> Self {
        Self {
            work_dir: config.work_dir(),
            progress_interval_ms: config.progress_interval_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::Pass;
    use serde_json::json;

    #[test]
    fn test_progress_message() {
        let value = serde_json::to_value(JsonMessage::progress(42.5)).unwrap();
        assert_eq!(value, json!({"type": "progress", "percentage": 42.5}));
    }

    #[test]
    fn test_error_message_carries_stderr() {
        let err = JobError::ProcessExitedNonZero {
            pass: Pass::Palette,
            code: Some(1),
            stderr: "No such file or directory".into(),
        };
        let value = serde_json::to_value(JsonMessage::error(&err)).unwrap();

        assert_eq!(value["type"], "error");
        assert_eq!(value["kind"], "process_exited_non_zero");
        assert_eq!(value["details"], "No such file or directory");
    }

    #[test]
    fn test_start_message_includes_config() {
        let config = Config::default();
        let message = JsonMessage::Start {
            input: PathBuf::from("/v/clip.mov"),
            output: PathBuf::from("/v/clip.gif"),
            input_size: Some(5_000_000),
            config: JsonConfig::from(&config),
        };
        let value = serde_json::to_value(message).unwrap();

        assert_eq!(value["type"], "start");
        assert_eq!(value["output"], "/v/clip.gif");
        assert_eq!(value["config"]["progress_interval_ms"], 100);
    }
}
