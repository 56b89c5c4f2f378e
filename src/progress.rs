//! # Progress Tracking Module
//!
//! Questo modulo gestisce il feedback incrementale durante i due step del workflow.
//!
//! ## Responsabilità:
//! - Progress bar visuale con `indicatif` per lo step 1 (processing) e lo step 2 (upload)
//! - Eventi JSON line-delimited (`json_output`) per consumatori programmatici
//! - Modalità nascosta per test e uso da libreria
//! - Spinner per operazioni indeterminate (upload del team member)
//!
//! ## Garanzie:
//! - Il progresso è monotono: un `item_done` per item, nell'ordine di input
//! - Ogni item riporta esito positivo o il tipo di errore
//!
//! ## Visual feedback:
//! ```text
//! ⠋ [00:00:04] [========================>---------------] 3/5 (60%) [OK] beach_sq.jpg
//! ```

use crate::error::IngestError;
use crate::file_manager::MediaKind;
use crate::json_output::JsonMessage;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::time::Duration;

/// How progress is surfaced to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressMode {
    Bar,
    Json,
    Hidden,
}

/// Workflow step a progress report belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Process,
    Upload,
}

/// Manages progress reporting for one batch step
pub struct ProgressManager {
    bar: ProgressBar,
    mode: ProgressMode,
    phase: Phase,
    total: usize,
}

impl ProgressManager {
    pub fn new(mode: ProgressMode, phase: Phase, kind: MediaKind, total: usize) -> Self {
        let bar = match mode {
            ProgressMode::Bar => {
                let bar = ProgressBar::new(total as u64);
                bar.set_style(
                    ProgressStyle::default_bar()
                        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
                        .unwrap_or_else(|_| ProgressStyle::default_bar())
                        .progress_chars("=>-"),
                );
                bar.enable_steady_tick(Duration::from_millis(100));
                bar
            }
            ProgressMode::Json | ProgressMode::Hidden => ProgressBar::hidden(),
        };

        if mode == ProgressMode::Json {
            JsonMessage::start(phase, kind, total).emit();
        }

        Self { bar, mode, phase, total }
    }

    /// Report one finished item
    pub fn item_done(&self, name: &str, outcome: Result<(), &IngestError>) {
        self.bar.inc(1);
        let message = match outcome {
            Ok(()) => format!("[OK] {}", name),
            Err(e) => format!("[{}] {}", e.kind().to_string().to_uppercase(), name),
        };
        self.bar.set_message(message);

        if self.mode == ProgressMode::Json {
            JsonMessage::item_complete(self.phase, self.position(), self.total, name, outcome).emit();
        }
    }

    /// Items reported so far
    pub fn position(&self) -> usize {
        self.bar.position() as usize
    }

    pub fn finish(&self, succeeded: usize, failed: usize, summary: &str) {
        self.bar.finish_with_message(summary.to_string());
        if self.mode == ProgressMode::Json {
            JsonMessage::complete(self.phase, succeeded, failed, summary).emit();
        }
    }

    /// Create a spinner for indeterminate progress
    pub fn spinner(message: &str) -> ProgressBar {
        let spinner = ProgressBar::new_spinner();

        spinner.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );

        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(100));

        spinner
    }
}
