//! # CMS Module
//!
//! Client HTTP per il backend Cockpit CMS, separato in sottomoduli:
//! - `asset`: `AssetRecord` e normalizzazione delle risposte di upload
//! - `client`: `CmsClient` con upload asset (multipart) e creazione entry (JSON)

pub mod asset;
pub mod client;

pub use asset::{normalize_upload_response, AssetRecord};
pub use client::CmsClient;
