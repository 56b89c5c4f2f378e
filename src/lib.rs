//! # CMS Media Ingest Library
//!
//! Questo è il modulo principale della libreria che espone tutte le API pubbliche.
//!
//! ## Responsabilità:
//! - Definisce la struttura modulare dell'applicazione
//! - Espone i tipi e le funzioni principali tramite re-exports
//! - Fornisce un'interfaccia pulita per il main.rs e per altri consumatori
//!
//! ## Architettura dei moduli:
//! - `config`: Configurazione da ambiente, credenziale di upload, validazione
//! - `error`: Tipi di errore custom e `ErrorKind`
//! - `file_manager`: Discovery dei media, naming di output, MIME
//! - `image_processor`: Normalizzazione immagini (800x800 square / 1280x720 horizontal, JPEG q60)
//! - `audio_processor`: Transcodifica audio in MP3 64 kbps via ffmpeg
//! - `cms`: Client HTTP per upload asset e creazione entry
//! - `workflow`: Sessione a due step con batch pendenti e gate sulla password
//! - `progress` / `json_output`: Feedback incrementale (progress bar o JSON)
//!
//! ## Utilizzo:
//! ```ignore
//! use cms_media_ingest::{Config, IngestSession, NormalizeMode, MediaKind};
//!
//! let config = Config::from_env()?;
//! let mut session = IngestSession::new(&config)?;
//! session.process_images(files, NormalizeMode::Square).await?;
//! let report = session.commit(MediaKind::Image, &password).await?;
//! ```

pub mod audio_processor;
pub mod cms;
pub mod config;
pub mod error;
pub mod file_manager;
pub mod image_processor;
pub mod json_output;
pub mod platform;
pub mod progress;
pub mod workflow;

pub use audio_processor::{AudioProcessor, Channels};
pub use cms::{AssetRecord, CmsClient};
pub use config::{Config, Credential};
pub use error::{ErrorKind, IngestError};
pub use file_manager::{FileManager, MediaKind, RawMedia};
pub use image_processor::{ImageProcessor, NormalizeMode};
pub use progress::ProgressMode;
pub use workflow::{
    BatchState, ClearPolicy, CommitReport, IngestSession, ProcessReport, Role, TeamMemberForm,
};
