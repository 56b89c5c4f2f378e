//! # Workflow Module
//!
//! Il workflow "process, poi authenticate-and-commit", separato in sottomoduli:
//! - `batch`: `PendingBatch` con stato per-item e `ClearPolicy`
//! - `team`: form, validazione e payload del team member
//! - `session`: `IngestSession`, il contesto di sessione che orchestra i due step

pub mod batch;
pub mod session;
pub mod team;

pub use batch::{BatchState, ClearPolicy, PendingBatch, PendingItem, ProcessedAsset, UploadStatus};
pub use session::{CommitReport, IngestSession, ItemFailure, ProcessReport};
pub use team::{Role, TeamMemberDraft, TeamMemberForm, TEAM_COLLECTION};
