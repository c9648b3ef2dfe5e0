//! # Error Types Module
//!
//! Questo modulo definisce tutti i tipi di errore custom della libreria.
//!
//! ## Responsabilità:
//! - `ProvisionError`: errori nella materializzazione del binario ffmpeg
//! - `JobError`: cause di fallimento di una conversione
//! - `StartError`: richieste di avvio rifiutate dal controller
//! - `ErrorKind`: tassonomia piatta da mostrare all'utente
//!
//! ## Note:
//! - La cancellazione NON è un errore: è un esito distinto (`JobOutcome::Cancelled`)
//! - Gli `std::io::Error` sono conservati in un `Arc` così che gli esiti
//!   siano `Clone` e pubblicabili su un canale `watch`
//!
//! ## Esempio:
//! ```rust,ignore
//! match outcome {
//!     JobOutcome::Failed(err) if err.kind() == ErrorKind::ProcessExitedNonZero => { /* ... */ }
//!     _ => {}
//! }
//! ```

use crate::converter::Pass;
use crate::platform::PayloadKind;
use serde::Serialize;
use std::io;
use std::sync::Arc;

/// Errors raised while materializing the ffmpeg executable
#[derive(thiserror::Error, Debug, Clone)]
pub enum ProvisionError {
    #[error("Unsupported operating system: {0}")]
    UnsupportedPlatform(String),

    #[error("No ffmpeg payload available for {0} targets")]
    MissingPayload(PayloadKind),

    #[error("Provisioning I/O error ({context}): {source}")]
    Io {
        context: &'static str,
        #[source]
        source: Arc<io::Error>,
    },
}

impl ProvisionError {
    pub(crate) fn io(context: &'static str) -> impl FnOnce(io::Error) -> Self {
        move |source| Self::Io {
            context,
            source: Arc::new(source),
        }
    }
}

/// Reasons a conversion job failed
#[derive(thiserror::Error, Debug, Clone)]
pub enum JobError {
    #[error(transparent)]
    Provision(#[from] ProvisionError),

    #[error("Failed to launch ffmpeg for the {pass} pass: {source}")]
    ProcessLaunchFailed {
        pass: Pass,
        #[source]
        source: Arc<io::Error>,
    },

    #[error("ffmpeg {} during the {pass} pass{}", describe_exit(.code), describe_stderr(.stderr))]
    ProcessExitedNonZero {
        pass: Pass,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Conversion worker stopped unexpectedly: {0}")]
    WorkerLost(String),
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exited with code {}", code),
        None => "was terminated by a signal".to_string(),
    }
}

fn describe_stderr(stderr: &str) -> String {
    if stderr.is_empty() {
        String::new()
    } else {
        format!(": {}", stderr)
    }
}

/// Flat error taxonomy surfaced to the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UnsupportedPlatform,
    ProvisioningIo,
    ProcessLaunchFailed,
    ProcessExitedNonZero,
    Internal,
}

impl JobError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Provision(ProvisionError::UnsupportedPlatform(_)) => ErrorKind::UnsupportedPlatform,
            Self::Provision(_) => ErrorKind::ProvisioningIo,
            Self::ProcessLaunchFailed { .. } => ErrorKind::ProcessLaunchFailed,
            Self::ProcessExitedNonZero { .. } => ErrorKind::ProcessExitedNonZero,
            Self::WorkerLost(_) => ErrorKind::Internal,
        }
    }
}

/// A start request the controller refused
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum StartError {
    #[error("A conversion is already running")]
    JobInFlight,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        let unsupported = JobError::from(ProvisionError::UnsupportedPlatform("plan9".into()));
        assert_eq!(unsupported.kind(), ErrorKind::UnsupportedPlatform);

        let missing = JobError::from(ProvisionError::MissingPayload(PayloadKind::Unix));
        assert_eq!(missing.kind(), ErrorKind::ProvisioningIo);

        let io_error = ProvisionError::io("write payload")(io::Error::other("disk full"));
        assert_eq!(JobError::from(io_error).kind(), ErrorKind::ProvisioningIo);

        let launch = JobError::ProcessLaunchFailed {
            pass: Pass::Palette,
            source: Arc::new(io::Error::from(io::ErrorKind::NotFound)),
        };
        assert_eq!(launch.kind(), ErrorKind::ProcessLaunchFailed);
    }

    #[test]
    fn test_exit_message() {
        let err = JobError::ProcessExitedNonZero {
            pass: Pass::Encode,
            code: Some(1),
            stderr: "Invalid data found when processing input".into(),
        };
        assert_eq!(
            err.to_string(),
            "ffmpeg exited with code 1 during the encode pass: Invalid data found when processing input"
        );

        let killed = JobError::ProcessExitedNonZero {
            pass: Pass::Palette,
            code: None,
            stderr: String::new(),
        };
        assert_eq!(killed.to_string(), "ffmpeg was terminated by a signal during the palette pass");
    }
}
