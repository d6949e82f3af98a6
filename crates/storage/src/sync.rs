//! Local-tree-vs-container diff planning and folder synchronization.
//!
//! Planning is pure: it reads local files and remote metadata but changes
//! nothing, and an unchanged tree and container yield an identical plan on
//! every run. Execution uploads the planned files and hands orphan removal
//! to a background bulk-delete job.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use swiftsync_common::checksum::checksum_file;
use swiftsync_common::constants::LIST_PAGE_LIMIT;
use swiftsync_filesystem::ignore::IgnoreFilter;
use swiftsync_filesystem::walker::{walk_files, LocalFile};

use crate::error::StorageError;
use crate::jobs::{JobHandle, JobRunner};
use crate::traits::ObjectStore;
use crate::types::{ListOptions, ObjectRecord, ObjectSummary};
use crate::upload::{ObjectUploader, UploadRequest};

/// What a planned action does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffKind {
    /// Upload the local file to the container.
    Upload,
    /// Leave both sides alone.
    Skip,
    /// Remote object with no local counterpart; deleted when orphan
    /// removal is enabled.
    DeleteCandidate,
}

/// Why an action was planned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffReason {
    /// No remote object with this name.
    MissingRemote,
    /// Local and remote checksums differ.
    ChecksumMismatch,
    /// Checksums differ but the remote copy is at least as new as the
    /// local file, so the local change is not pushed.
    RemoteNewer,
    /// Checksums match.
    Unchanged,
    /// No local file with this name.
    MissingLocal,
}

/// One entry of a sync plan.
#[derive(Debug, Clone)]
pub struct DiffAction {
    /// Local file involved, absent for delete candidates.
    pub local_path: Option<PathBuf>,
    /// Remote object name.
    pub remote_name: String,
    /// What to do.
    pub kind: DiffKind,
    /// Why.
    pub reason: DiffReason,
}

/// Options controlling planning and execution.
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    /// Shell glob patterns for local entries to skip.
    pub ignore_patterns: Vec<String>,
    /// Include dot-prefixed local entries.
    pub include_hidden: bool,
    /// Delete remote objects with no local counterpart.
    pub delete_orphans: bool,
    /// Upload on any checksum mismatch, even when the remote copy looks
    /// newer than the local file.
    pub ignore_timestamps: bool,
}

/// Plans and executes folder-to-container synchronization.
pub struct SyncPlanner<'a, S: ObjectStore + ?Sized> {
    store: &'a S,
    container: String,
    options: SyncOptions,
}

impl<'a, S: ObjectStore + ?Sized> SyncPlanner<'a, S> {
    /// Create a planner targeting a container.
    pub fn new(store: &'a S, container: impl Into<String>) -> Self {
        Self {
            store,
            container: container.into(),
            options: SyncOptions::default(),
        }
    }

    /// Replace the default options.
    pub fn with_options(mut self, options: SyncOptions) -> Self {
        self.options = options;
        self
    }

    /// Compute the plan for syncing `folder` into the container.
    ///
    /// Actions come back sorted by remote name, uploads and skips first,
    /// then delete candidates.
    ///
    /// # Errors
    /// Returns error if the folder cannot be walked or remote metadata
    /// cannot be fetched.
    pub async fn plan(&self, folder: &Path) -> Result<Vec<DiffAction>, StorageError> {
        let filter: IgnoreFilter =
            IgnoreFilter::new(&self.options.ignore_patterns, self.options.include_hidden)
                .map_err(|e| StorageError::InvalidConfig {
                    message: e.to_string(),
                })?;
        let local_files: Vec<LocalFile> =
            walk_files(folder, &filter).map_err(|e| match e {
                swiftsync_filesystem::FileSystemError::FolderNotFound { path } => {
                    StorageError::LocalPathMissing { path }
                }
                other => StorageError::InvalidConfig {
                    message: other.to_string(),
                },
            })?;

        let mut actions: Vec<DiffAction> = Vec::new();
        let mut local_names: HashSet<String> = HashSet::new();

        for file in &local_files {
            local_names.insert(file.remote_name.clone());
            let action: DiffAction = self.plan_one(file).await?;
            actions.push(action);
        }

        for name in self.list_all_names().await? {
            if !local_names.contains(&name) {
                actions.push(DiffAction {
                    local_path: None,
                    remote_name: name,
                    kind: DiffKind::DeleteCandidate,
                    reason: DiffReason::MissingLocal,
                });
            }
        }

        actions.sort_by(|a, b| {
            let order = |k: DiffKind| matches!(k, DiffKind::DeleteCandidate) as u8;
            order(a.kind)
                .cmp(&order(b.kind))
                .then_with(|| a.remote_name.cmp(&b.remote_name))
        });
        Ok(actions)
    }

    async fn plan_one(&self, file: &LocalFile) -> Result<DiffAction, StorageError> {
        let remote: Option<ObjectRecord> =
            match self.store.head_object(&self.container, &file.remote_name).await {
                Ok(record) => Some(record),
                Err(StorageError::NotFound { .. }) => None,
                Err(other) => return Err(other),
            };

        let (kind, reason): (DiffKind, DiffReason) = match remote {
            None => (DiffKind::Upload, DiffReason::MissingRemote),
            Some(record) => {
                let local_etag: String = checksum_file(&file.path)
                    .map_err(|e| StorageError::io(file.path.display().to_string(), e))?;
                if record.etag.as_deref() == Some(local_etag.as_str()) {
                    (DiffKind::Skip, DiffReason::Unchanged)
                } else if !self.options.ignore_timestamps
                    && remote_at_least_as_new(record.last_modified.as_deref(), file.modified)
                {
                    (DiffKind::Skip, DiffReason::RemoteNewer)
                } else {
                    (DiffKind::Upload, DiffReason::ChecksumMismatch)
                }
            }
        };

        Ok(DiffAction {
            local_path: Some(file.path.clone()),
            remote_name: file.remote_name.clone(),
            kind,
            reason,
        })
    }

    /// Full container listing, paged past the service's per-call limit.
    async fn list_all_names(&self) -> Result<Vec<String>, StorageError> {
        let mut names: Vec<String> = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let options: ListOptions = ListOptions {
                marker: marker.clone(),
                limit: Some(LIST_PAGE_LIMIT),
                ..Default::default()
            };
            let page: Vec<ObjectSummary> =
                self.store.list_objects(&self.container, &options).await?;
            if page.is_empty() {
                break;
            }
            marker = page.last().map(|s| s.name.clone());
            names.extend(page.into_iter().map(|s| s.name));
        }

        Ok(names)
    }
}

/// Timestamp heuristic: skip the upload when the remote copy's recorded
/// modification time is at least the local file's. Both sides are reduced
/// to second precision in UTC and compared lexically, the way the service
/// formats its timestamps.
fn remote_at_least_as_new(remote_last_modified: Option<&str>, local_modified: SystemTime) -> bool {
    // get() rejects short strings and splits inside a multi-byte character.
    let remote: &str = match remote_last_modified.and_then(|ts| ts.get(..19)) {
        Some(ts) => ts,
        None => return false,
    };
    let local: DateTime<Utc> = DateTime::<Utc>::from(local_modified);
    let local_str: String = local.format("%Y-%m-%dT%H:%M:%S").to_string();
    remote >= local_str.as_str()
}

/// Execute a full folder-to-container sync.
///
/// Uploads everything the plan marks for upload, then, when orphan removal
/// is enabled, submits one background bulk-delete job for the delete
/// candidates and returns its handle.
///
/// # Errors
/// Returns error if planning or any upload fails.
pub async fn sync_folder_to_container<S: ObjectStore + ?Sized + 'static>(
    store: Arc<S>,
    runner: &JobRunner,
    container: &str,
    folder: &Path,
    options: SyncOptions,
) -> Result<(Vec<DiffAction>, Option<JobHandle>), StorageError> {
    let planner: SyncPlanner<S> =
        SyncPlanner::new(store.as_ref(), container).with_options(options.clone());
    let plan: Vec<DiffAction> = planner.plan(folder).await?;

    let uploader: ObjectUploader<S> = ObjectUploader::new(store.as_ref(), container);
    let mut uploaded: u64 = 0;
    let mut orphans: Vec<String> = Vec::new();

    for action in &plan {
        match action.kind {
            DiffKind::Upload => {
                let path: &PathBuf = action
                    .local_path
                    .as_ref()
                    .ok_or(StorageError::ContentSourceMissing)?;
                let etag: String = checksum_file(path)
                    .map_err(|e| StorageError::io(path.display().to_string(), e))?;
                uploader
                    .upload(
                        UploadRequest::from_path(path)
                            .with_name(&action.remote_name)
                            .with_etag(etag)
                            .without_record(),
                    )
                    .await?;
                uploaded += 1;
                debug!(name = %action.remote_name, "synced file");
            }
            DiffKind::DeleteCandidate if options.delete_orphans => {
                orphans.push(action.remote_name.clone());
            }
            _ => {}
        }
    }

    let delete_job: Option<JobHandle> = if !orphans.is_empty() {
        Some(runner.bulk_delete(store, container.to_string(), orphans))
    } else {
        None
    };

    info!(container = %container, uploaded, "folder sync complete");
    Ok((plan, delete_job))
}
