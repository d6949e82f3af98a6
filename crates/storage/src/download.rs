//! Object download: size-limited fetches, chunked range streaming, and
//! writing objects back to a local directory.

use std::path::{Path, PathBuf};

use tracing::debug;

use swiftsync_common::path_utils::from_posix_path;

use crate::error::StorageError;
use crate::traits::ObjectStore;
use crate::types::ByteRange;

/// Downloads objects from one container of a store.
pub struct RangeFetcher<'a, S: ObjectStore + ?Sized> {
    store: &'a S,
    container: String,
}

impl<'a, S: ObjectStore + ?Sized> RangeFetcher<'a, S> {
    /// Create a fetcher targeting a container.
    pub fn new(store: &'a S, container: impl Into<String>) -> Self {
        Self {
            store,
            container: container.into(),
        }
    }

    /// Fetch an object's content, optionally capped at a byte count.
    ///
    /// With a size limit the request carries `Range: bytes=0-<limit>`, so
    /// at most `limit + 1` bytes come back and never more than the object
    /// holds.
    ///
    /// # Errors
    /// Returns `NotFound` if the object does not exist.
    pub async fn fetch(&self, name: &str, size_limit: Option<u64>) -> Result<Vec<u8>, StorageError> {
        let range: Option<ByteRange> = size_limit.map(|limit| ByteRange {
            start: 0,
            end: limit,
        });
        self.store.get_object(&self.container, name, range).await
    }

    /// Stream an object in fixed-size chunks.
    ///
    /// The object's total size is resolved once with a HEAD before the
    /// first chunk; `size_limit` further caps how much is read.
    ///
    /// # Errors
    /// Returns `NotFound` if the object does not exist.
    pub async fn fetch_chunked(
        &self,
        name: &str,
        chunk_size: u64,
        size_limit: Option<u64>,
    ) -> Result<ChunkStream<'a, '_, S>, StorageError> {
        let total: u64 = self
            .store
            .head_object(&self.container, name)
            .await?
            .bytes
            .unwrap_or(0);
        let max_size: u64 = match size_limit {
            Some(limit) => limit.min(total),
            None => total,
        };

        Ok(ChunkStream {
            fetcher: self,
            name: name.to_string(),
            chunk_size: chunk_size.max(1),
            cursor: 0,
            max_size,
            exhausted: max_size == 0,
        })
    }

    /// Download an object into a local directory.
    ///
    /// With `structure` true, `/` separators in the object name become
    /// nested directories under `directory`; otherwise the object lands
    /// directly in `directory` under its base name.
    ///
    /// # Arguments
    /// * `name` - Object to download
    /// * `directory` - Existing local destination directory
    /// * `structure` - Whether to recreate the name's directory structure
    ///
    /// # Returns
    /// The path the object was written to.
    ///
    /// # Errors
    /// Returns `LocalPathMissing` if `directory` does not exist.
    pub async fn download_to_dir(
        &self,
        name: &str,
        directory: &Path,
        structure: bool,
    ) -> Result<PathBuf, StorageError> {
        if !directory.is_dir() {
            return Err(StorageError::LocalPathMissing {
                path: directory.display().to_string(),
            });
        }

        let target: PathBuf = if structure {
            from_posix_path(name, directory)
        } else {
            let base: &str = name.rsplit('/').next().unwrap_or(name);
            directory.join(base)
        };

        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StorageError::io(parent.display().to_string(), e))?;
        }

        let body: Vec<u8> = self.store.get_object(&self.container, name, None).await?;
        std::fs::write(&target, &body)
            .map_err(|e| StorageError::io(target.display().to_string(), e))?;

        debug!(name = %name, target = %target.display(), "downloaded object");
        Ok(target)
    }
}

/// Cursor over an object being downloaded chunk by chunk.
pub struct ChunkStream<'a, 'f, S: ObjectStore + ?Sized> {
    fetcher: &'f RangeFetcher<'a, S>,
    name: String,
    chunk_size: u64,
    cursor: u64,
    max_size: u64,
    exhausted: bool,
}

impl<S: ObjectStore + ?Sized> ChunkStream<'_, '_, S> {
    /// Fetch the next chunk, or `None` when the stream is done.
    ///
    /// A zero-length response also ends the stream, so a store whose HEAD
    /// overstates the object size cannot loop this forever.
    pub async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, StorageError> {
        if self.exhausted || self.cursor >= self.max_size {
            return Ok(None);
        }

        let end: u64 = (self.cursor + self.chunk_size).min(self.max_size) - 1;
        let range: ByteRange = ByteRange {
            start: self.cursor,
            end,
        };
        debug!(name = %self.name, range = %range.header_value(), "fetching chunk");
        let chunk: Vec<u8> = self
            .fetcher
            .store
            .get_object(&self.fetcher.container, &self.name, Some(range))
            .await?;

        if chunk.is_empty() {
            self.exhausted = true;
            return Ok(None);
        }

        self.cursor += chunk.len() as u64;
        Ok(Some(chunk))
    }

    /// Bytes delivered so far.
    pub fn received(&self) -> u64 {
        self.cursor
    }

    /// Drain the remaining chunks into one buffer.
    pub async fn collect(mut self) -> Result<Vec<u8>, StorageError> {
        let mut assembled: Vec<u8> = Vec::new();
        while let Some(chunk) = self.next_chunk().await? {
            assembled.extend_from_slice(&chunk);
        }
        Ok(assembled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::traits::ObjectStore;
    use crate::types::{
        BulkDeleteOutcome, ListOptions, ObjectRecord, ObjectSummary, PutHeaders,
    };
    use async_trait::async_trait;
    use std::io::Read;

    async fn seeded_store(body: &[u8]) -> MemoryStore {
        let store: MemoryStore = MemoryStore::with_container("docs");
        store
            .put_object("docs", "file.bin", body, &PutHeaders::default())
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_fetch_whole_object() {
        let store: MemoryStore = seeded_store(b"0123456789").await;
        let fetcher: RangeFetcher<MemoryStore> = RangeFetcher::new(&store, "docs");

        let body: Vec<u8> = fetcher.fetch("file.bin", None).await.unwrap();
        assert_eq!(body, b"0123456789");
    }

    #[tokio::test]
    async fn test_fetch_with_size_limit() {
        let store: MemoryStore = seeded_store(b"0123456789").await;
        let fetcher: RangeFetcher<MemoryStore> = RangeFetcher::new(&store, "docs");

        // Inclusive range, so a limit of 3 returns bytes 0..=3.
        let body: Vec<u8> = fetcher.fetch("file.bin", Some(3)).await.unwrap();
        assert_eq!(body, b"0123");

        let capped: Vec<u8> = fetcher.fetch("file.bin", Some(100)).await.unwrap();
        assert_eq!(capped, b"0123456789");
    }

    #[tokio::test]
    async fn test_fetch_missing_object() {
        let store: MemoryStore = MemoryStore::with_container("docs");
        let fetcher: RangeFetcher<MemoryStore> = RangeFetcher::new(&store, "docs");

        let result: Result<Vec<u8>, StorageError> = fetcher.fetch("ghost", None).await;
        assert!(matches!(result, Err(StorageError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_chunked_fetch_reassembles_exactly() {
        let body: Vec<u8> = (0u8..=255).cycle().take(1000).collect();
        let store: MemoryStore = seeded_store(&body).await;
        let fetcher: RangeFetcher<MemoryStore> = RangeFetcher::new(&store, "docs");

        let stream: ChunkStream<MemoryStore> =
            fetcher.fetch_chunked("file.bin", 64, None).await.unwrap();
        let assembled: Vec<u8> = stream.collect().await.unwrap();
        assert_eq!(assembled, body);
    }

    #[tokio::test]
    async fn test_chunked_fetch_respects_size_limit() {
        let store: MemoryStore = seeded_store(&vec![7u8; 500]).await;
        let fetcher: RangeFetcher<MemoryStore> = RangeFetcher::new(&store, "docs");

        let mut stream: ChunkStream<MemoryStore> = fetcher
            .fetch_chunked("file.bin", 64, Some(100))
            .await
            .unwrap();

        let mut total: u64 = 0;
        while let Some(chunk) = stream.next_chunk().await.unwrap() {
            assert!(chunk.len() <= 64);
            total += chunk.len() as u64;
        }
        assert_eq!(total, 100);
        assert_eq!(stream.received(), 100);
    }

    #[tokio::test]
    async fn test_chunked_fetch_empty_object() {
        let store: MemoryStore = seeded_store(b"").await;
        let fetcher: RangeFetcher<MemoryStore> = RangeFetcher::new(&store, "docs");

        let mut stream: ChunkStream<MemoryStore> =
            fetcher.fetch_chunked("file.bin", 64, None).await.unwrap();
        assert!(stream.next_chunk().await.unwrap().is_none());
    }

    /// Store whose HEAD overstates object sizes.
    struct LyingStore {
        inner: MemoryStore,
    }

    #[async_trait]
    impl ObjectStore for LyingStore {
        async fn head_object(
            &self,
            container: &str,
            name: &str,
        ) -> Result<ObjectRecord, StorageError> {
            let mut record: ObjectRecord = self.inner.head_object(container, name).await?;
            record.bytes = record.bytes.map(|b| b * 10 + 100);
            Ok(record)
        }

        async fn get_object(
            &self,
            container: &str,
            name: &str,
            range: Option<ByteRange>,
        ) -> Result<Vec<u8>, StorageError> {
            self.inner.get_object(container, name, range).await
        }

        async fn put_object(
            &self,
            container: &str,
            name: &str,
            data: &[u8],
            headers: &PutHeaders,
        ) -> Result<String, StorageError> {
            self.inner.put_object(container, name, data, headers).await
        }

        async fn put_object_streamed(
            &self,
            container: &str,
            name: &str,
            body: Box<dyn Read + Send>,
            headers: &PutHeaders,
        ) -> Result<String, StorageError> {
            self.inner
                .put_object_streamed(container, name, body, headers)
                .await
        }

        async fn put_object_from_file(
            &self,
            container: &str,
            name: &str,
            path: &Path,
            headers: &PutHeaders,
        ) -> Result<String, StorageError> {
            self.inner
                .put_object_from_file(container, name, path, headers)
                .await
        }

        async fn delete_object(&self, container: &str, name: &str) -> Result<(), StorageError> {
            self.inner.delete_object(container, name).await
        }

        async fn bulk_delete(&self, body: &str) -> Result<BulkDeleteOutcome, StorageError> {
            self.inner.bulk_delete(body).await
        }

        async fn list_objects(
            &self,
            container: &str,
            options: &ListOptions,
        ) -> Result<Vec<ObjectSummary>, StorageError> {
            self.inner.list_objects(container, options).await
        }

        async fn create_container(&self, container: &str) -> Result<(), StorageError> {
            self.inner.create_container(container).await
        }
    }

    #[tokio::test]
    async fn test_chunked_fetch_terminates_on_short_store() {
        let store: LyingStore = LyingStore {
            inner: seeded_store(b"short body").await,
        };
        let fetcher: RangeFetcher<LyingStore> = RangeFetcher::new(&store, "docs");

        let stream: ChunkStream<LyingStore> =
            fetcher.fetch_chunked("file.bin", 4, None).await.unwrap();
        let assembled: Vec<u8> = stream.collect().await.unwrap();
        assert_eq!(assembled, b"short body");
    }

    #[tokio::test]
    async fn test_download_flat() {
        let store: MemoryStore = MemoryStore::with_container("docs");
        store
            .put_object("docs", "a/b/file.txt", b"content", &PutHeaders::default())
            .await
            .unwrap();
        let fetcher: RangeFetcher<MemoryStore> = RangeFetcher::new(&store, "docs");

        let dir: tempfile::TempDir = tempfile::tempdir().unwrap();
        let target: PathBuf = fetcher
            .download_to_dir("a/b/file.txt", dir.path(), false)
            .await
            .unwrap();

        assert_eq!(target, dir.path().join("file.txt"));
        assert_eq!(std::fs::read(&target).unwrap(), b"content");
    }

    #[tokio::test]
    async fn test_download_with_structure() {
        let store: MemoryStore = MemoryStore::with_container("docs");
        store
            .put_object("docs", "a/b/file.txt", b"content", &PutHeaders::default())
            .await
            .unwrap();
        let fetcher: RangeFetcher<MemoryStore> = RangeFetcher::new(&store, "docs");

        let dir: tempfile::TempDir = tempfile::tempdir().unwrap();
        let target: PathBuf = fetcher
            .download_to_dir("a/b/file.txt", dir.path(), true)
            .await
            .unwrap();

        assert_eq!(target, dir.path().join("a").join("b").join("file.txt"));
        assert_eq!(std::fs::read(&target).unwrap(), b"content");
    }

    #[tokio::test]
    async fn test_download_missing_directory() {
        let store: MemoryStore = seeded_store(b"x").await;
        let fetcher: RangeFetcher<MemoryStore> = RangeFetcher::new(&store, "docs");

        let result: Result<PathBuf, StorageError> = fetcher
            .download_to_dir("file.bin", Path::new("/nonexistent/dir"), false)
            .await;
        assert!(matches!(result, Err(StorageError::LocalPathMissing { .. })));
    }
}
