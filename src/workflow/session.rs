//! # Ingest Session Module
//!
//! Orchestratore del workflow a due step, modellato come contesto di sessione
//! esplicito invece di stato globale mutabile.
//!
//! ## Ciclo di vita:
//! - Inizializzazione: tutti i batch vuoti, nessuna bozza team member
//! - Step 1 (`process_*`): ogni item elaborato in modo indipendente, il nuovo set
//!   sostituisce il batch precedente
//! - Step 2 (`commit`): gate sulla password, poi upload sequenziale degli item
//!   ancora `pending`/`failed`, infine applicazione della `ClearPolicy`
//! - Teardown: batch svuotato al successo (secondo policy) o con `discard`

use crate::audio_processor::{self, AudioProcessor, Channels};
use crate::cms::{AssetRecord, CmsClient};
use crate::config::{Config, Credential};
use crate::error::{IngestError, Result};
use crate::file_manager::{MediaKind, RawMedia};
use crate::image_processor::{ImageProcessor, NormalizeMode};
use crate::progress::{Phase, ProgressManager, ProgressMode};
use crate::workflow::batch::{BatchState, PendingBatch, ProcessedAsset};
use crate::workflow::team::{TeamMemberDraft, TeamMemberForm, TEAM_COLLECTION};
use futures::stream::{self, StreamExt};
use serde_json::Value;
use std::future::Future;
use std::pin::pin;
use tracing::{info, warn};

/// One item that did not make it through a step
#[derive(Debug)]
pub struct ItemFailure {
    pub name: String,
    pub error: IngestError,
}

/// Outcome of step 1 for one batch
#[derive(Debug)]
pub struct ProcessReport {
    pub kind: MediaKind,
    pub total: usize,
    pub succeeded: usize,
    pub failures: Vec<ItemFailure>,
}

impl ProcessReport {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn summary(&self) -> String {
        format!(
            "Processed {} {}. Ready for upload verification. ({} failed)",
            self.succeeded,
            self.kind.label(),
            self.failed()
        )
    }
}

/// Outcome of step 2 for one batch
#[derive(Debug)]
pub struct CommitReport {
    pub kind: MediaKind,
    /// Items uploaded in this pass
    pub attempted: usize,
    /// Items skipped because an earlier pass already uploaded them
    pub already_uploaded: usize,
    pub records: Vec<AssetRecord>,
    pub failures: Vec<ItemFailure>,
    pub cleared: bool,
    pub state: BatchState,
}

impl CommitReport {
    pub fn succeeded(&self) -> usize {
        self.records.len()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn summary(&self) -> String {
        if self.all_succeeded() {
            format!("All {} {} uploaded successfully!", self.succeeded(), self.kind.label())
        } else {
            format!("Uploaded {}/{} {}.", self.succeeded(), self.attempted, self.kind.label())
        }
    }
}

/// Session-scoped state of the ingestion workflow
pub struct IngestSession {
    client: CmsClient,
    credential: Credential,
    audio_processor: AudioProcessor,
    workers: usize,
    progress_mode: ProgressMode,
    images: PendingBatch,
    audio: PendingBatch,
    team: Option<TeamMemberDraft>,
}

impl IngestSession {
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            client: CmsClient::new(config)?,
            credential: config.upload_password.clone(),
            audio_processor: AudioProcessor::new(config),
            workers: config.workers,
            progress_mode: if config.json_output {
                ProgressMode::Json
            } else {
                ProgressMode::Bar
            },
            images: PendingBatch::new(MediaKind::Image, config.image_clear_policy),
            audio: PendingBatch::new(MediaKind::Audio, config.audio_clear_policy),
            team: None,
        })
    }

    pub fn with_progress(mut self, mode: ProgressMode) -> Self {
        self.progress_mode = mode;
        self
    }

    pub fn batch(&self, kind: MediaKind) -> &PendingBatch {
        match kind {
            MediaKind::Image => &self.images,
            MediaKind::Audio => &self.audio,
        }
    }

    pub fn team_draft(&self) -> Option<&TeamMemberDraft> {
        self.team.as_ref()
    }

    /// Step 1 for images: normalize every file, keep the ones that worked
    pub async fn process_images(&mut self, files: Vec<RawMedia>, mode: NormalizeMode) -> Result<ProcessReport> {
        let progress = self.start_processing(MediaKind::Image, files.len())?;

        let (assets, report) = process_all(MediaKind::Image, files, self.workers, &progress, |raw| async move {
            let name = raw.name.clone();
            let joined = tokio::task::spawn_blocking(move || {
                ImageProcessor::normalize(&raw.name, &raw.bytes, mode)
                    .map(|bytes| ProcessedAsset::new(mode.output_name(&raw.name), bytes))
            })
            .await;
            let result = joined.unwrap_or_else(|e| Err(IngestError::decode(&name, format!("worker failed: {}", e))));
            (name, result)
        })
        .await;

        self.images.replace(assets);
        progress.finish(report.succeeded, report.failed(), &report.summary());
        Ok(report)
    }

    /// Step 1 for audio: transcode every file to MP3 with `channels`
    pub async fn process_audio(&mut self, files: Vec<RawMedia>, channels: Channels) -> Result<ProcessReport> {
        let progress = self.start_processing(MediaKind::Audio, files.len())?;
        let processor = &self.audio_processor;

        let (assets, report) = process_all(MediaKind::Audio, files, self.workers, &progress, |raw| async move {
            let result = processor
                .transcode(&raw.name, &raw.bytes, channels)
                .await
                .map(|bytes| ProcessedAsset::new(audio_processor::output_name(&raw.name), bytes));
            (raw.name, result)
        })
        .await;

        self.audio.replace(assets);
        progress.finish(report.succeeded, report.failed(), &report.summary());
        Ok(report)
    }

    fn start_processing(&self, kind: MediaKind, total: usize) -> Result<ProgressManager> {
        if total == 0 {
            return Err(IngestError::Validation(format!("No {} selected.", kind.label())));
        }
        info!("Processing {} {}", total, kind.label());
        Ok(ProgressManager::new(self.progress_mode, Phase::Process, kind, total))
    }

    /// Step 2: check the credential, then upload what is still pending
    pub async fn commit(&mut self, kind: MediaKind, credential: &str) -> Result<CommitReport> {
        let batch = match kind {
            MediaKind::Image => &mut self.images,
            MediaKind::Audio => &mut self.audio,
        };

        if batch.is_empty() {
            return Err(IngestError::Validation(format!("No processed {} to upload.", kind.label())));
        }
        if !self.credential.matches(credential) {
            warn!("Rejected upload of {} {}: incorrect password", batch.len(), kind.label());
            return Err(IngestError::AuthMismatch);
        }

        let indices = batch.retry_indices();
        let already_uploaded = batch.len() - indices.len();
        let progress = ProgressManager::new(self.progress_mode, Phase::Upload, kind, indices.len());
        let mut records = Vec::new();
        let mut failures = Vec::new();

        batch.begin_upload();
        for index in indices {
            let (name, result) = {
                let asset = &batch.items()[index].asset;
                (asset.name.clone(), self.client.upload_asset(&asset.bytes, &asset.name).await)
            };

            match result {
                Ok(record) => {
                    progress.item_done(&name, Ok(()));
                    batch.mark_succeeded(index, record.clone());
                    records.push(record);
                }
                Err(error) => {
                    progress.item_done(&name, Err(&error));
                    batch.mark_failed(index);
                    failures.push(ItemFailure { name, error });
                }
            }
        }

        let attempted = records.len() + failures.len();
        let cleared = batch.finish_upload();
        let report = CommitReport {
            kind,
            attempted,
            already_uploaded,
            records,
            failures,
            cleared,
            state: batch.state(),
        };

        progress.finish(report.succeeded(), report.failures.len(), &report.summary());
        info!(
            succeeded = report.succeeded(),
            failed = report.failures.len(),
            cleared,
            "Upload pass finished for {}",
            kind.label()
        );
        Ok(report)
    }

    /// Drop a pending batch without uploading it
    pub fn discard(&mut self, kind: MediaKind) {
        match kind {
            MediaKind::Image => self.images.clear(),
            MediaKind::Audio => self.audio.clear(),
        }
    }

    /// Step 1 for a team member: validate, then square-normalize the photo.
    ///
    /// Any earlier draft is dropped first, so a failed preparation leaves no
    /// draft that could still be committed.
    pub async fn prepare_team_member(&mut self, mut form: TeamMemberForm) -> Result<&TeamMemberDraft> {
        self.team = None;
        form.validate()?;
        let (Some(role), Some(photo)) = (form.role, form.photo.take()) else {
            return Err(IngestError::Validation("Name, Role, and Photo are required.".to_string()));
        };

        let name = photo.name.clone();
        let bytes = tokio::task::spawn_blocking(move || {
            ImageProcessor::normalize(&photo.name, &photo.bytes, NormalizeMode::Square)
        })
        .await
        .unwrap_or_else(|e| Err(IngestError::decode(&name, format!("worker failed: {}", e))))?;

        info!("Team member '{}' prepared, photo {} bytes", form.name, bytes.len());
        Ok(self.team.insert(TeamMemberDraft::new(form, role, bytes)))
    }

    /// Step 2 for a team member: upload the photo, then create the entry.
    ///
    /// Any failure keeps the draft so the whole action can be retried.
    pub async fn commit_team_member(&mut self, credential: &str) -> Result<Value> {
        let draft = self
            .team
            .as_mut()
            .ok_or_else(|| IngestError::Validation("No team member prepared.".to_string()))?;

        if !self.credential.matches(credential) {
            warn!("Rejected team member upload: incorrect password");
            return Err(IngestError::AuthMismatch);
        }

        let photo = match &draft.uploaded_photo {
            Some(record) => record.clone(),
            None => {
                let record = self.client.upload_asset(&draft.photo.bytes, &draft.photo.name).await?;
                draft.uploaded_photo = Some(record.clone());
                record
            }
        };

        let response = self
            .client
            .create_entry(TEAM_COLLECTION, draft.entry_fields(&photo))
            .await?;

        info!("Team Member '{}' added successfully", draft.name);
        self.team = None;
        Ok(response)
    }
}

/// Run `task` over every file with up to `workers` in flight.
///
/// Results are consumed in input order, so progress is monotonic and
/// `succeeded + failed == total` always holds.
async fn process_all<F, Fut>(
    kind: MediaKind,
    files: Vec<RawMedia>,
    workers: usize,
    progress: &ProgressManager,
    task: F,
) -> (Vec<ProcessedAsset>, ProcessReport)
where
    F: FnMut(RawMedia) -> Fut,
    Fut: Future<Output = (String, Result<ProcessedAsset>)>,
{
    let total = files.len();
    let mut assets = Vec::with_capacity(total);
    let mut failures = Vec::new();

    let mut outcomes = pin!(stream::iter(files).map(task).buffered(workers.max(1)));
    while let Some((name, result)) = outcomes.next().await {
        match result {
            Ok(asset) => {
                progress.item_done(&name, Ok(()));
                assets.push(asset);
            }
            Err(error) => {
                progress.item_done(&name, Err(&error));
                failures.push(ItemFailure { name, error });
            }
        }
    }

    let report = ProcessReport {
        kind,
        total,
        succeeded: assets.len(),
        failures,
    };
    (assets, report)
}
