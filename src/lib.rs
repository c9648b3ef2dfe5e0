//! # clip2gif Library
//!
//! Questo è il modulo principale della libreria che espone tutte le API pubbliche.
//!
//! ## Responsabilità:
//! - Definisce la struttura modulare dell'applicazione
//! - Espone i tipi e le funzioni principali tramite re-exports
//! - Fornisce un'interfaccia pulita per il main.rs e per altri front end
//!
//! ## Architettura dei moduli:
//! - `config`: Parametri di runtime e validazione
//! - `error`: Tipi di errore custom e tassonomia
//! - `platform`: Sistemi operativi supportati e payload relativi
//! - `tool_resolver`: Ricerca di ffmpeg bundled o di sistema
//! - `provisioner`: Copia temporanea ed eseguibile di ffmpeg
//! - `converter`: Controller del job, pipeline a due passate, stima progresso
//! - `file_manager`: Path di output e pulizia file
//! - `progress` / `json_output`: Resa del progresso per il front end
//!
//! ## Utilizzo:
//! ```rust,ignore
//! use clip2gif::{Config, JobController, JobOutcome};
//!
//! let controller = JobController::new(Config::default())?;
//! let handle = controller.start("/videos/clip.mov")?;
//! match handle.wait().await {
//!     JobOutcome::Succeeded { output } => println!("{}", output.display()),
//!     JobOutcome::Cancelled => println!("cancelled"),
//!     JobOutcome::Failed(err) => eprintln!("{}", err),
//! }
//! ```

pub mod config;
pub mod converter;
pub mod error;
pub mod file_manager;
pub mod json_output;
pub mod platform;
pub mod progress;
pub mod provisioner;
pub mod tool_resolver;
pub mod utils;

pub use config::Config;
pub use converter::{CancelHandle, JobController, JobHandle, JobOutcome, JobState, ProgressFeed};
pub use error::{ErrorKind, JobError, ProvisionError, StartError};
pub use provisioner::{ToolHandle, ToolProvisioner};
