//! # Pending Batch Module
//!
//! Il batch di item processati in attesa del commit autenticato.
//! Ogni item porta il proprio stato di upload (`pending` / `succeeded` / `failed`)
//! così un nuovo tentativo ricarica solo ciò che non è ancora sul CMS.

use crate::cms::AssetRecord;
use crate::file_manager::MediaKind;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A normalized file ready for upload. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedAsset {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl ProcessedAsset {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Pending,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone)]
pub struct PendingItem {
    pub asset: ProcessedAsset,
    pub status: UploadStatus,
    pub record: Option<AssetRecord>,
}

/// Lifecycle of a pending batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BatchState {
    Empty,
    Processed,
    AuthenticatedUploading,
    PartiallyUploaded,
}

/// What happens to a batch once an authenticated upload pass is over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClearPolicy {
    /// Clear only if every item is on the CMS; otherwise keep everything
    RequireAllSucceeded,
    /// Clear after every upload pass, whatever the outcome
    AlwaysClear,
    /// Drop uploaded items and keep only the failures
    DropSucceeded,
}

/// Ordered pending items of one media kind
#[derive(Debug, Clone)]
pub struct PendingBatch {
    kind: MediaKind,
    policy: ClearPolicy,
    state: BatchState,
    items: Vec<PendingItem>,
}

impl PendingBatch {
    pub fn new(kind: MediaKind, policy: ClearPolicy) -> Self {
        Self {
            kind,
            policy,
            state: BatchState::Empty,
            items: Vec::new(),
        }
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn state(&self) -> BatchState {
        self.state
    }

    pub fn items(&self) -> &[PendingItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn count(&self, status: UploadStatus) -> usize {
        self.items.iter().filter(|item| item.status == status).count()
    }

    /// Replace the whole batch with a freshly processed set
    pub fn replace(&mut self, assets: Vec<ProcessedAsset>) {
        self.items = assets
            .into_iter()
            .map(|asset| PendingItem {
                asset,
                status: UploadStatus::Pending,
                record: None,
            })
            .collect();
        self.transition(if self.items.is_empty() {
            BatchState::Empty
        } else {
            BatchState::Processed
        });
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.transition(BatchState::Empty);
    }

    pub(crate) fn begin_upload(&mut self) {
        self.transition(BatchState::AuthenticatedUploading);
    }

    /// Indices of items that still need uploading, in batch order
    pub fn retry_indices(&self) -> Vec<usize> {
        self.items
            .iter()
            .enumerate()
            .filter(|(_, item)| item.status != UploadStatus::Succeeded)
            .map(|(index, _)| index)
            .collect()
    }

    pub(crate) fn mark_succeeded(&mut self, index: usize, record: AssetRecord) {
        if let Some(item) = self.items.get_mut(index) {
            item.status = UploadStatus::Succeeded;
            item.record = Some(record);
        }
    }

    pub(crate) fn mark_failed(&mut self, index: usize) {
        if let Some(item) = self.items.get_mut(index) {
            item.status = UploadStatus::Failed;
        }
    }

    /// Apply the clear policy after an upload pass. Returns true if the batch is now empty.
    pub(crate) fn finish_upload(&mut self) -> bool {
        let all_succeeded = self.items.iter().all(|item| item.status == UploadStatus::Succeeded);

        match self.policy {
            ClearPolicy::RequireAllSucceeded if all_succeeded => self.items.clear(),
            ClearPolicy::RequireAllSucceeded => {}
            ClearPolicy::AlwaysClear => self.items.clear(),
            ClearPolicy::DropSucceeded => self.items.retain(|item| item.status != UploadStatus::Succeeded),
        }

        self.transition(if self.items.is_empty() {
            BatchState::Empty
        } else {
            BatchState::PartiallyUploaded
        });
        self.items.is_empty()
    }

    fn transition(&mut self, next: BatchState) {
        if self.state != next {
            debug!("{} batch: {:?} -> {:?}", self.kind.label(), self.state, next);
            self.state = next;
        }
    }
}
