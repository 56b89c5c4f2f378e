//! # JSON Output Module
//!
//! Questo modulo gestisce l'output strutturato in JSON per comunicazione con altri processi.
//!
//! ## Responsabilità:
//! - Emette messaggi JSON strutturati (uno per riga su stdout) per gli eventi del workflow
//! - Fornisce interfaccia standardizzata per comunicazione inter-processo
//!
//! ## Tipi di messaggi:
//! - `start`: Inizio di uno step (processing o upload) con numero di item
//! - `item_complete`: Fine elaborazione/upload di un item, con eventuale errore tipizzato
//! - `complete`: Fine dello step con conteggi finali
//! - `error`: Errore che blocca l'azione (password errata, validazione, config)

use crate::error::IngestError;
use crate::file_manager::MediaKind;
use crate::progress::Phase;
use serde::Serialize;

/// Tipo di messaggio JSON
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JsonMessage {
    Start {
        phase: Phase,
        kind: &'static str,
        total: usize,
    },

    ItemComplete {
        phase: Phase,
        current: usize,
        total: usize,
        percentage: f64,
        name: String,
        ok: bool,
        error_kind: Option<String>,
        error: Option<String>,
    },

    Complete {
        phase: Phase,
        succeeded: usize,
        failed: usize,
        summary: String,
    },

    Error {
        kind: String,
        message: String,
    },
}

impl JsonMessage {
    /// Emette il messaggio JSON su stdout
    pub fn emit(&self) {
        if let Ok(json) = serde_json::to_string(self) {
            println!("{}", json);
        }
    }

    pub fn start(phase: Phase, kind: MediaKind, total: usize) -> Self {
        Self::Start {
            phase,
            kind: kind.label(),
            total,
        }
    }

    pub fn item_complete(
        phase: Phase,
        current: usize,
        total: usize,
        name: &str,
        outcome: Result<(), &IngestError>,
    ) -> Self {
        let percentage = if total > 0 {
            (current as f64 / total as f64) * 100.0
        } else {
            0.0
        };

        Self::ItemComplete {
            phase,
            current,
            total,
            percentage,
            name: name.to_string(),
            ok: outcome.is_ok(),
            error_kind: outcome.err().map(|e| e.kind().to_string()),
            error: outcome.err().map(|e| e.to_string()),
        }
    }

    pub fn complete(phase: Phase, succeeded: usize, failed: usize, summary: &str) -> Self {
        Self::Complete {
            phase,
            succeeded,
            failed,
            summary: summary.to_string(),
        }
    }

    pub fn error(error: &IngestError) -> Self {
        Self::Error {
            kind: error.kind().to_string(),
            message: error.to_string(),
        }
    }
}
