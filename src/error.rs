//! # Error Types Module
//!
//! Questo modulo definisce tutti i tipi di errore custom della pipeline di ingestione.
//!
//! ## Responsabilità:
//! - Definisce `IngestError` enum per categorizzare tutti gli errori possibili
//! - Espone `ErrorKind` per permettere ai chiamanti (e ai test) di distinguere
//!   il tipo di fallimento senza fare match sui messaggi
//! - Integra con `thiserror` per automatic error conversion
//!
//! ## Categorie di errori:
//! - `Decode`: Immagine o audio illeggibile/corrotto, estensione non supportata
//! - `Transcode`: ffmpeg terminato con exit code diverso da zero, timeout, output non valido
//! - `Network` / `Status` / `UnexpectedResponse`: Fallimenti verso il CMS
//! - `AuthMismatch`: Password di upload errata
//! - `Validation`: Campi obbligatori mancanti prima del processing
//! - `Io`: Errori di I/O (file temporanei, lettura input)
//! - `Config`: Configurazione mancante o non valida
//! - `MissingDependency`: Tool esterno mancante (ffmpeg)
//!
//! ## Politica di propagazione:
//! - Errori per singolo item (decode, transcode, upload): l'item viene escluso, il batch continua
//! - `AuthMismatch`: rifiuto pulito, nessun cambio di stato
//! - `Validation`: blocca l'ingresso nella pipeline prima di qualsiasi elaborazione
//!
//! ## Esempio:
//! ```ignore
//! match normalizer.normalize(&bytes, mode) {
//!     Err(e) if e.kind() == ErrorKind::Decode => skip_item(),
//!     other => other?,
//! }
//! ```

use std::fmt;

/// Custom error types for media ingestion
#[derive(thiserror::Error, Debug)]
pub enum IngestError {
    #[error("Decode error for '{name}': {reason}")]
    Decode { name: String, reason: String },

    #[error("Transcoder error for '{name}': {reason}")]
    Transcode { name: String, reason: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("CMS returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Unexpected CMS response: {0}")]
    UnexpectedResponse(String),

    #[error("Incorrect upload password")]
    AuthMismatch,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Dependency missing: {0}")]
    MissingDependency(String),
}

/// Coarse failure category, stable across message changes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Decode,
    Transcode,
    Network,
    AuthMismatch,
    Validation,
    Io,
    Config,
    MissingDependency,
}

impl IngestError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            IngestError::Decode { .. } => ErrorKind::Decode,
            IngestError::Transcode { .. } => ErrorKind::Transcode,
            IngestError::Network(_)
            | IngestError::Status { .. }
            | IngestError::UnexpectedResponse(_) => ErrorKind::Network,
            IngestError::AuthMismatch => ErrorKind::AuthMismatch,
            IngestError::Validation(_) => ErrorKind::Validation,
            IngestError::Io(_) => ErrorKind::Io,
            IngestError::Config(_) => ErrorKind::Config,
            IngestError::MissingDependency(_) => ErrorKind::MissingDependency,
        }
    }

    pub(crate) fn decode(name: &str, reason: impl fmt::Display) -> Self {
        IngestError::Decode {
            name: name.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn transcode(name: &str, reason: impl fmt::Display) -> Self {
        IngestError::Transcode {
            name: name.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ErrorKind::Decode => "decode",
            ErrorKind::Transcode => "transcode",
            ErrorKind::Network => "network",
            ErrorKind::AuthMismatch => "auth",
            ErrorKind::Validation => "validation",
            ErrorKind::Io => "io",
            ErrorKind::Config => "config",
            ErrorKind::MissingDependency => "dependency",
        };
        f.write_str(label)
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cms_failures_share_network_kind() {
        let status = IngestError::Status { status: 502, body: "bad gateway".to_string() };
        let shape = IngestError::UnexpectedResponse("{}".to_string());
        assert_eq!(status.kind(), ErrorKind::Network);
        assert_eq!(shape.kind(), ErrorKind::Network);
    }

    #[test]
    fn test_transcode_is_distinct_from_decode() {
        let decode = IngestError::decode("a.wav", "truncated header");
        let transcode = IngestError::transcode("a.wav", "ffmpeg exited with status 1");
        assert_ne!(decode.kind(), transcode.kind());
        assert!(transcode.to_string().contains("a.wav"));
    }
}
