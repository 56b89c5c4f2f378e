//! # Team Member Module
//!
//! Entità composita: record del membro del team + una sola foto quadrata.
//! La validazione dei campi obbligatori avviene prima di qualsiasi elaborazione.

use crate::cms::AssetRecord;
use crate::error::{IngestError, Result};
use crate::file_manager::RawMedia;
use crate::workflow::batch::ProcessedAsset;
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;

/// Collection team members are published to
pub const TEAM_COLLECTION: &str = "teammembers";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Coordinator,
    Secretary,
    ExCoordinator,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Coordinator => "Coordinator",
            Role::Secretary => "Secretary",
            Role::ExCoordinator => "Ex-Coordinator",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "coordinator" => Ok(Role::Coordinator),
            "secretary" => Ok(Role::Secretary),
            "ex-coordinator" | "excoordinator" | "ex_coordinator" => Ok(Role::ExCoordinator),
            other => Err(IngestError::Validation(format!("Unknown role: {}", other))),
        }
    }
}

/// Raw form input for a new team member
#[derive(Debug, Clone, Default)]
pub struct TeamMemberForm {
    pub name: String,
    pub email: String,
    pub role: Option<Role>,
    /// Only meaningful for coordinators
    pub phone: String,
    /// Only meaningful for ex-coordinators
    pub year: String,
    pub sher: String,
    pub sher_author: String,
    pub photo: Option<RawMedia>,
}

impl TeamMemberForm {
    /// Name, role and photo are required. A blank name counts as missing.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() || self.role.is_none() || self.photo.is_none() {
            return Err(IngestError::Validation(
                "Name, Role, and Photo are required.".to_string(),
            ));
        }
        Ok(())
    }
}

/// A validated team member with its processed photo, awaiting commit
#[derive(Debug, Clone)]
pub struct TeamMemberDraft {
    pub name: String,
    pub email: String,
    pub role: Role,
    pub phone: String,
    pub year: String,
    pub sher: String,
    pub sher_author: String,
    pub photo: ProcessedAsset,
    /// Set once the photo is on the CMS, so a retry only re-publishes the entry
    pub uploaded_photo: Option<AssetRecord>,
}

impl TeamMemberDraft {
    pub(crate) fn new(form: TeamMemberForm, role: Role, photo_bytes: Vec<u8>) -> Self {
        let photo = ProcessedAsset::new(photo_filename(&form.name), photo_bytes);
        Self {
            name: form.name,
            email: form.email,
            role,
            phone: form.phone,
            year: form.year,
            sher: form.sher,
            sher_author: form.sher_author,
            photo,
            uploaded_photo: None,
        }
    }

    /// Field mapping sent to the `teammembers` collection
    pub fn entry_fields(&self, photo: &AssetRecord) -> Value {
        json!({
            "Name": self.name,
            "Email": self.email,
            "Role": self.role.as_str(),
            "Phone": self.phone,
            "Sher": self.sher.replace('\n', "<br>"),
            "SherAuthor": self.sher_author,
            "Year": self.year,
            "Photo": photo.reference(),
        })
    }
}

/// `team_<name>.jpg`, lower-cased with spaces turned into underscores
pub fn photo_filename(name: &str) -> String {
    format!("team_{}.jpg", name.replace(' ', "_").to_lowercase())
}
