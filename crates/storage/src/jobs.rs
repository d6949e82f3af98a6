//! Cancelable background jobs: folder uploads and bulk deletes.
//!
//! Each submitted job gets a unique id and a status entry in a shared
//! registry. Callers poll or wait on a [`JobHandle`]; cancellation is
//! cooperative, checked between files, so the file in flight when the
//! request lands still completes.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{info, warn};
use uuid::Uuid;

use swiftsync_common::constants::DEFAULT_POLL_INTERVAL_MS;
use swiftsync_filesystem::ignore::IgnoreFilter;
use swiftsync_filesystem::walker::{walk_files, LocalFile};

use crate::error::StorageError;
use crate::traits::ObjectStore;
use crate::types::BulkDeleteOutcome;
use crate::upload::{ObjectUploader, UploadRequest};

/// Identifier of a submitted background job.
pub type JobId = Uuid;

/// Live status of a background job.
#[derive(Debug, Clone, Default)]
pub struct JobStatus {
    /// Total bytes the job plans to transfer, fixed at submission.
    pub total_bytes: u64,
    /// Bytes transferred so far.
    pub uploaded_bytes: u64,
    /// Whether cancellation has been requested.
    pub cancel_requested: bool,
    /// Whether the job has finished, successfully or not.
    pub completed: bool,
    /// Failure message, when the job stopped on an error.
    pub error: Option<String>,
    /// Final results, present once `completed` is true.
    pub results: Option<JobResults>,
}

/// Final results of a background job.
#[derive(Debug, Clone)]
pub enum JobResults {
    /// A folder upload finished.
    FolderUpload(FolderUploadOutcome),
    /// A bulk delete finished.
    BulkDelete(BulkDeleteOutcome),
}

/// Outcome of a folder upload job.
#[derive(Debug, Clone, Default)]
pub struct FolderUploadOutcome {
    /// Files uploaded before the job ended.
    pub files_uploaded: u64,
    /// Whether the job stopped early on a cancellation request.
    pub canceled: bool,
}

/// Shared registry of job statuses, keyed by job id.
#[derive(Default)]
pub struct JobRegistry {
    jobs: Mutex<HashMap<JobId, JobStatus>>,
}

impl JobRegistry {
    fn insert(&self, id: JobId, status: JobStatus) {
        self.jobs.lock().unwrap().insert(id, status);
    }

    /// Snapshot of a job's status.
    pub fn status(&self, id: JobId) -> Option<JobStatus> {
        self.jobs.lock().unwrap().get(&id).cloned()
    }

    fn update(&self, id: JobId, f: impl FnOnce(&mut JobStatus)) {
        if let Some(status) = self.jobs.lock().unwrap().get_mut(&id) {
            f(status);
        }
    }

    /// Request cooperative cancellation of a job.
    pub fn cancel(&self, id: JobId) {
        self.update(id, |status| status.cancel_requested = true);
    }

    fn is_canceled(&self, id: JobId) -> bool {
        self.jobs
            .lock()
            .unwrap()
            .get(&id)
            .map(|status| status.cancel_requested)
            .unwrap_or(false)
    }

    /// Drop a finished job's entry. Statuses are kept until removed so
    /// results stay available after completion.
    pub fn remove(&self, id: JobId) -> Option<JobStatus> {
        self.jobs.lock().unwrap().remove(&id)
    }
}

/// Handle to one submitted job.
#[derive(Clone)]
pub struct JobHandle {
    id: JobId,
    registry: Arc<JobRegistry>,
}

impl JobHandle {
    /// The job's id.
    pub fn id(&self) -> JobId {
        self.id
    }

    /// Snapshot of the job's status, `None` once removed.
    pub fn poll(&self) -> Option<JobStatus> {
        self.registry.status(self.id)
    }

    /// Request cooperative cancellation.
    pub fn cancel(&self) {
        self.registry.cancel(self.id);
    }

    /// Wait until the job completes, polling at the given interval.
    ///
    /// # Returns
    /// The final status, or `None` if the job was removed while waiting.
    pub async fn wait(&self, interval: Duration) -> Option<JobStatus> {
        loop {
            match self.poll() {
                Some(status) if status.completed => return Some(status),
                Some(_) => tokio::time::sleep(interval).await,
                None => return None,
            }
        }
    }

    /// [`wait`](Self::wait) at the default one-second poll interval.
    pub async fn wait_default(&self) -> Option<JobStatus> {
        self.wait(Duration::from_millis(DEFAULT_POLL_INTERVAL_MS)).await
    }
}

/// A folder upload job request.
#[derive(Debug, Clone)]
pub struct FolderUploadRequest {
    folder: PathBuf,
    container: Option<String>,
    ignore_patterns: Vec<String>,
    include_hidden: bool,
    ttl: Option<u64>,
}

impl FolderUploadRequest {
    /// Upload the contents of a local folder.
    ///
    /// The target container defaults to the folder's base name.
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self {
            folder: folder.into(),
            container: None,
            ignore_patterns: Vec::new(),
            include_hidden: false,
            ttl: None,
        }
    }

    /// Target a specific container.
    pub fn with_container(mut self, container: impl Into<String>) -> Self {
        self.container = Some(container.into());
        self
    }

    /// Skip local entries matching these shell glob patterns.
    pub fn with_ignore_patterns(mut self, patterns: Vec<String>) -> Self {
        self.ignore_patterns = patterns;
        self
    }

    /// Include dot-prefixed local entries.
    pub fn include_hidden(mut self) -> Self {
        self.include_hidden = true;
        self
    }

    /// Schedule server-side deletion of each uploaded object.
    pub fn with_ttl(mut self, seconds: u64) -> Self {
        self.ttl = Some(seconds);
        self
    }
}

/// Submits and tracks background jobs.
#[derive(Default)]
pub struct JobRunner {
    registry: Arc<JobRegistry>,
}

impl JobRunner {
    /// Create a runner with an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The shared registry, for direct status lookups by id.
    pub fn registry(&self) -> Arc<JobRegistry> {
        Arc::clone(&self.registry)
    }

    /// Submit a folder upload job.
    ///
    /// The folder is walked and the byte total fixed before the job starts,
    /// and the target container is created up front, so progress against
    /// `total_bytes` is meaningful from the first poll.
    ///
    /// # Errors
    /// Returns `LocalPathMissing` if the folder does not exist, or an
    /// error from container creation.
    pub async fn upload_folder<S: ObjectStore + ?Sized + 'static>(
        &self,
        store: Arc<S>,
        request: FolderUploadRequest,
    ) -> Result<JobHandle, StorageError> {
        let container: String = match &request.container {
            Some(container) => container.clone(),
            None => request
                .folder
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .ok_or(StorageError::NameUnresolvable)?,
        };

        let filter: IgnoreFilter =
            IgnoreFilter::new(&request.ignore_patterns, request.include_hidden).map_err(|e| {
                StorageError::InvalidConfig {
                    message: e.to_string(),
                }
            })?;
        let files: Vec<LocalFile> = walk_files(&request.folder, &filter).map_err(|e| match e {
            swiftsync_filesystem::FileSystemError::FolderNotFound { path } => {
                StorageError::LocalPathMissing { path }
            }
            other => StorageError::InvalidConfig {
                message: other.to_string(),
            },
        })?;
        let total_bytes: u64 = files.iter().map(|f| f.size).sum();

        self.store_ready(store.as_ref(), &container).await?;

        let id: JobId = Uuid::new_v4();
        self.registry.insert(
            id,
            JobStatus {
                total_bytes,
                ..Default::default()
            },
        );
        info!(%id, container = %container, total_bytes, files = files.len(), "folder upload submitted");

        let registry: Arc<JobRegistry> = Arc::clone(&self.registry);
        let ttl: Option<u64> = request.ttl;
        tokio::spawn(async move {
            let uploader: ObjectUploader<S> = ObjectUploader::new(store.as_ref(), &container);
            let mut outcome: FolderUploadOutcome = FolderUploadOutcome::default();
            let mut error: Option<String> = None;

            for file in files {
                if registry.is_canceled(id) {
                    outcome.canceled = true;
                    break;
                }
                let mut upload: UploadRequest =
                    UploadRequest::from_path(&file.path)
                        .with_name(&file.remote_name)
                        .without_record();
                if let Some(seconds) = ttl {
                    upload = upload.with_ttl(seconds);
                }
                match uploader.upload(upload).await {
                    Ok(_) => {
                        outcome.files_uploaded += 1;
                        registry.update(id, |status| status.uploaded_bytes += file.size);
                    }
                    Err(err) => {
                        warn!(%id, name = %file.remote_name, %err, "folder upload failed");
                        error = Some(err.to_string());
                        break;
                    }
                }
            }

            registry.update(id, |status| {
                status.completed = true;
                status.error = error.clone();
                status.results = Some(JobResults::FolderUpload(outcome.clone()));
            });
            info!(%id, files = outcome.files_uploaded, canceled = outcome.canceled, "folder upload finished");
        });

        Ok(JobHandle {
            id,
            registry: self.registry(),
        })
    }

    async fn store_ready<S: ObjectStore + ?Sized>(
        &self,
        store: &S,
        container: &str,
    ) -> Result<(), StorageError> {
        store.create_container(container).await
    }

    /// Submit a bulk delete job over named objects in one container.
    pub fn bulk_delete<S: ObjectStore + ?Sized + 'static>(
        &self,
        store: Arc<S>,
        container: String,
        names: Vec<String>,
    ) -> JobHandle {
        let id: JobId = Uuid::new_v4();
        self.registry.insert(id, JobStatus::default());
        info!(%id, container = %container, objects = names.len(), "bulk delete submitted");

        let registry: Arc<JobRegistry> = Arc::clone(&self.registry);
        tokio::spawn(async move {
            let body: String = names
                .iter()
                .map(|name| format!("{container}/{name}"))
                .collect::<Vec<String>>()
                .join("\n");
            let result: Result<BulkDeleteOutcome, StorageError> =
                store.bulk_delete(&body).await;

            registry.update(id, |status| {
                status.completed = true;
                match result {
                    Ok(outcome) => status.results = Some(JobResults::BulkDelete(outcome)),
                    Err(err) => status.error = Some(err.to_string()),
                }
            });
        });

        JobHandle {
            id,
            registry: self.registry(),
        }
    }
}
