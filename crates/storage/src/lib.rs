//! Transfer engine for a remote object store.
//!
//! Built around the [`ObjectStore`] trait, this crate provides:
//! - [`ObjectUploader`]: single-part and segmented uploads with manifests
//! - [`RangeFetcher`]: size-limited and chunked downloads
//! - [`SyncPlanner`]: local-tree-vs-container diff planning and execution
//! - [`JobRunner`]: cancelable background folder uploads and bulk deletes
//! - [`TempUrlSigner`]: HMAC-SHA1 signed, time-limited object URLs
//!
//! [`MemoryStore`] is an in-process store implementation for tests.

pub mod download;
pub mod error;
pub mod jobs;
pub mod memory;
pub mod sync;
pub mod tempurl;
pub mod traits;
pub mod types;
pub mod upload;

pub use download::{ChunkStream, RangeFetcher};
pub use error::StorageError;
pub use jobs::{
    FolderUploadOutcome, FolderUploadRequest, JobHandle, JobId, JobRegistry, JobResults,
    JobRunner, JobStatus,
};
pub use memory::MemoryStore;
pub use sync::{
    sync_folder_to_container, DiffAction, DiffKind, DiffReason, SyncOptions, SyncPlanner,
};
pub use tempurl::TempUrlSigner;
pub use traits::ObjectStore;
pub use types::{
    BulkDeleteOutcome, ByteRange, ListOptions, ObjectRecord, ObjectSummary, PutHeaders,
    DELETE_AFTER_HEADER, MANIFEST_HEADER, OBJECT_META_PREFIX,
};
pub use upload::{ObjectUploader, UploadOptions, UploadRequest, UploadSource};
