//! # Configuration Management Module
//!
//! Questo modulo gestisce tutta la configurazione dell'applicazione.
//!
//! ## Responsabilità:
//! - Definisce la struct `Config` con endpoint CMS, token, password di upload e parametri del batch
//! - Carica i valori obbligatori dall'ambiente (con supporto `.env.local` via `dotenvy`)
//! - Fornisce validazione dei parametri
//! - Fornisce valori di default sensati per i parametri opzionali
//!
//! ## Parametri obbligatori (ambiente):
//! - `COCKPIT_URL`: URL base del CMS
//! - `API_TOKEN`: Token inviato nell'header `api-key`
//! - `UPLOAD_PASSWORD`: Password che sblocca lo step di upload
//!
//! ## Parametri opzionali:
//! - `workers`: Item elaborati in parallelo durante lo step 1 (default: 4, env `INGEST_WORKERS`)
//! - `upload_timeout_secs` / `entry_timeout_secs`: 60 / 30 secondi
//! - `transcode_timeout_secs`: 600 secondi per ogni invocazione di ffmpeg
//! - `image_clear_policy` / `audio_clear_policy`: Cosa fare del batch dopo il commit
//! - `json_output`: Eventi JSON su stdout invece della progress bar
//!
//! ## Esempio:
//! ```ignore
//! let config = Config::from_env()?;
//! config.validate()?;
//! ```

use crate::error::{IngestError, Result};
use crate::workflow::ClearPolicy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

pub const ENV_API_URL: &str = "COCKPIT_URL";
pub const ENV_API_TOKEN: &str = "API_TOKEN";
pub const ENV_UPLOAD_PASSWORD: &str = "UPLOAD_PASSWORD";
pub const ENV_WORKERS: &str = "INGEST_WORKERS";

/// Shared upload secret. Compared by exact string equality.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Case-sensitive, no trimming.
    pub fn matches(&self, attempt: &str) -> bool {
        !self.0.is_empty() && self.0 == attempt
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Configuration for the ingestion pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// CMS base URL, without trailing slash
    pub api_url: String,
    /// Token sent as `api-key`
    pub api_token: String,
    /// Password gating the upload step
    pub upload_password: Credential,
    /// Number of items processed concurrently in step 1
    pub workers: usize,
    pub upload_timeout_secs: u64,
    pub entry_timeout_secs: u64,
    pub transcode_timeout_secs: u64,
    pub image_clear_policy: ClearPolicy,
    pub audio_clear_policy: ClearPolicy,
    /// Output progress and status as JSON for programmatic use
    pub json_output: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: String::new(),
            api_token: String::new(),
            upload_password: Credential::default(),
            workers: 4,
            upload_timeout_secs: 60,
            entry_timeout_secs: 30,
            transcode_timeout_secs: 600,
            image_clear_policy: ClearPolicy::RequireAllSucceeded,
            audio_clear_policy: ClearPolicy::AlwaysClear,
            json_output: false,
        }
    }
}

impl Config {
    /// Build a config from the process environment.
    ///
    /// `.env.local` is loaded first, then `.env`; variables already set in the
    /// environment win over both files.
    pub fn from_env() -> Result<Self> {
        for file in [".env.local", ".env"] {
            if Path::new(file).exists() {
                dotenvy::from_filename(file)
                    .map_err(|e| IngestError::Config(format!("Failed to load {}: {}", file, e)))?;
                debug!("Loaded environment from {}", file);
            }
        }

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> Result<String> {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| IngestError::Config(format!("Missing configuration value: {}", key)))
        };

        let mut config = Self {
            api_url: required(ENV_API_URL)?.trim_end_matches('/').to_string(),
            api_token: required(ENV_API_TOKEN)?,
            upload_password: Credential::new(required(ENV_UPLOAD_PASSWORD)?),
            ..Default::default()
        };

        if let Some(workers) = lookup(ENV_WORKERS) {
            config.workers = workers
                .trim()
                .parse()
                .map_err(|_| IngestError::Config(format!("{} must be a positive integer", ENV_WORKERS)))?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.api_url.is_empty() || self.api_token.is_empty() || self.upload_password.is_empty() {
            return Err(IngestError::Config(
                "API URL, API token and upload password are all required".to_string(),
            ));
        }

        if !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://")) {
            return Err(IngestError::Config(format!(
                "API URL must start with http:// or https://: {}",
                self.api_url
            )));
        }

        if self.workers == 0 {
            return Err(IngestError::Config("Number of workers must be greater than 0".to_string()));
        }

        if self.upload_timeout_secs == 0 || self.entry_timeout_secs == 0 || self.transcode_timeout_secs == 0 {
            return Err(IngestError::Config("Timeouts must be greater than 0".to_string()));
        }

        Ok(())
    }

    pub fn upload_timeout(&self) -> Duration {
        Duration::from_secs(self.upload_timeout_secs)
    }

    pub fn entry_timeout(&self) -> Duration {
        Duration::from_secs(self.entry_timeout_secs)
    }

    pub fn transcode_timeout(&self) -> Duration {
        Duration::from_secs(self.transcode_timeout_secs)
    }
}
