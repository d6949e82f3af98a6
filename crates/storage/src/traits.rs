//! Backend abstraction over the remote object store.

use std::io::Read;
use std::path::Path;

use async_trait::async_trait;

use crate::error::StorageError;
use crate::types::{BulkDeleteOutcome, ByteRange, ListOptions, ObjectRecord, ObjectSummary, PutHeaders};

/// Object store operations the transfer engine is built on.
///
/// One implementation speaks to the live HTTP service; `MemoryStore`
/// provides an in-process implementation for tests.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch object metadata without the body.
    ///
    /// # Errors
    /// Returns `NotFound` if the object does not exist.
    async fn head_object(
        &self,
        container: &str,
        name: &str,
    ) -> Result<ObjectRecord, StorageError>;

    /// Fetch object content, optionally restricted to a byte range.
    ///
    /// Fetching a manifest without a range returns the concatenation of
    /// its segments in lexical order.
    ///
    /// # Errors
    /// Returns `NotFound` if the object does not exist.
    async fn get_object(
        &self,
        container: &str,
        name: &str,
        range: Option<ByteRange>,
    ) -> Result<Vec<u8>, StorageError>;

    /// Store an object from an in-memory body.
    ///
    /// # Returns
    /// The etag the store computed for the body.
    async fn put_object(
        &self,
        container: &str,
        name: &str,
        data: &[u8],
        headers: &PutHeaders,
    ) -> Result<String, StorageError>;

    /// Store an object by streaming from a reader.
    ///
    /// # Returns
    /// The etag the store computed for the body.
    async fn put_object_streamed(
        &self,
        container: &str,
        name: &str,
        body: Box<dyn Read + Send>,
        headers: &PutHeaders,
    ) -> Result<String, StorageError>;

    /// Store an object from a local file.
    ///
    /// # Returns
    /// The etag the store computed for the body.
    async fn put_object_from_file(
        &self,
        container: &str,
        name: &str,
        path: &Path,
        headers: &PutHeaders,
    ) -> Result<String, StorageError>;

    /// Delete a single object.
    ///
    /// # Errors
    /// Returns `NotFound` if the object does not exist.
    async fn delete_object(&self, container: &str, name: &str) -> Result<(), StorageError>;

    /// Delete many objects in one call.
    ///
    /// # Arguments
    /// * `body` - Newline-separated `container/name` lines
    async fn bulk_delete(&self, body: &str) -> Result<BulkDeleteOutcome, StorageError>;

    /// List objects in a container, one page at a time.
    async fn list_objects(
        &self,
        container: &str,
        options: &ListOptions,
    ) -> Result<Vec<ObjectSummary>, StorageError>;

    /// Create a container if it does not already exist.
    async fn create_container(&self, container: &str) -> Result<(), StorageError>;
}
