//! In-process object store used by tests.
//!
//! Implements enough of the service contract for transfer code to be
//! exercised without a network: ranged reads, manifest concatenation,
//! marker-paged listings, and bulk delete.

use std::collections::{BTreeMap, HashMap};
use std::io::Read;
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use swiftsync_common::checksum::checksum_bytes;
use swiftsync_common::constants::LIST_PAGE_LIMIT;

use crate::error::StorageError;
use crate::traits::ObjectStore;
use crate::types::{
    BulkDeleteOutcome, ByteRange, ListOptions, ObjectRecord, ObjectSummary, PutHeaders,
};

#[derive(Debug, Clone)]
struct StoredEntry {
    data: Vec<u8>,
    etag: String,
    content_type: Option<String>,
    last_modified: String,
    manifest_prefix: Option<String>,
    delete_after: Option<u64>,
    metadata: HashMap<String, String>,
}

/// In-memory implementation of [`ObjectStore`].
#[derive(Default)]
pub struct MemoryStore {
    containers: Mutex<HashMap<String, BTreeMap<String, StoredEntry>>>,
}

impl MemoryStore {
    /// Create an empty store with no containers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store with one empty container.
    pub fn with_container(container: &str) -> Self {
        let store: Self = Self::new();
        store
            .containers
            .lock()
            .unwrap()
            .insert(container.to_string(), BTreeMap::new());
        store
    }

    /// Number of objects currently stored in a container.
    pub fn object_count(&self, container: &str) -> usize {
        self.containers
            .lock()
            .unwrap()
            .get(container)
            .map(|objects| objects.len())
            .unwrap_or(0)
    }

    fn now_timestamp() -> String {
        Utc::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
    }

    /// Concatenate the segments a manifest points to, in lexical order.
    fn assemble_manifest(
        containers: &HashMap<String, BTreeMap<String, StoredEntry>>,
        manifest_prefix: &str,
    ) -> Vec<u8> {
        let (segment_container, name_prefix): (&str, &str) = match manifest_prefix.split_once('/') {
            Some(parts) => parts,
            None => return Vec::new(),
        };
        let mut assembled: Vec<u8> = Vec::new();
        if let Some(objects) = containers.get(segment_container) {
            // BTreeMap iteration is already lexically ordered.
            for (name, entry) in objects.range(name_prefix.to_string()..) {
                if !name.starts_with(name_prefix) {
                    break;
                }
                assembled.extend_from_slice(&entry.data);
            }
        }
        assembled
    }

    fn store_entry(
        &self,
        container: &str,
        name: &str,
        data: Vec<u8>,
        headers: &PutHeaders,
    ) -> Result<String, StorageError> {
        if let Some(expected) = &headers.etag {
            let actual: String = checksum_bytes(&data);
            if *expected != actual {
                return Err(StorageError::Network {
                    message: format!(
                        "etag mismatch for {container}/{name}: expected {expected}, got {actual}"
                    ),
                });
            }
        }

        let etag: String = checksum_bytes(&data);
        let entry: StoredEntry = StoredEntry {
            data,
            etag: etag.clone(),
            content_type: headers.content_type.clone(),
            last_modified: Self::now_timestamp(),
            manifest_prefix: headers.manifest_prefix.clone(),
            delete_after: headers.delete_after,
            metadata: headers.metadata.clone(),
        };

        let mut containers = self.containers.lock().unwrap();
        let objects: &mut BTreeMap<String, StoredEntry> =
            containers
                .get_mut(container)
                .ok_or_else(|| StorageError::ContainerNotFound {
                    container: container.to_string(),
                })?;
        objects.insert(name.to_string(), entry);
        Ok(etag)
    }

    /// TTL recorded at PUT time, for assertions on scheduled deletion.
    pub fn delete_after(&self, container: &str, name: &str) -> Option<u64> {
        self.containers
            .lock()
            .unwrap()
            .get(container)
            .and_then(|objects| objects.get(name))
            .and_then(|entry| entry.delete_after)
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn head_object(
        &self,
        container: &str,
        name: &str,
    ) -> Result<ObjectRecord, StorageError> {
        let containers = self.containers.lock().unwrap();
        let objects: &BTreeMap<String, StoredEntry> =
            containers
                .get(container)
                .ok_or_else(|| StorageError::ContainerNotFound {
                    container: container.to_string(),
                })?;
        let entry: &StoredEntry = objects.get(name).ok_or_else(|| StorageError::NotFound {
            container: container.to_string(),
            name: name.to_string(),
        })?;

        let bytes: u64 = match &entry.manifest_prefix {
            Some(prefix) => Self::assemble_manifest(&containers, prefix).len() as u64,
            None => entry.data.len() as u64,
        };

        Ok(ObjectRecord {
            name: name.to_string(),
            bytes: Some(bytes),
            content_type: entry.content_type.clone(),
            etag: Some(entry.etag.clone()),
            last_modified: Some(entry.last_modified.clone()),
            manifest_prefix: entry.manifest_prefix.clone(),
            metadata: entry.metadata.clone(),
        })
    }

    async fn get_object(
        &self,
        container: &str,
        name: &str,
        range: Option<ByteRange>,
    ) -> Result<Vec<u8>, StorageError> {
        let containers = self.containers.lock().unwrap();
        let objects: &BTreeMap<String, StoredEntry> =
            containers
                .get(container)
                .ok_or_else(|| StorageError::ContainerNotFound {
                    container: container.to_string(),
                })?;
        let entry: &StoredEntry = objects.get(name).ok_or_else(|| StorageError::NotFound {
            container: container.to_string(),
            name: name.to_string(),
        })?;

        let body: Vec<u8> = match &entry.manifest_prefix {
            Some(prefix) => Self::assemble_manifest(&containers, prefix),
            None => entry.data.clone(),
        };

        match range {
            Some(r) => {
                let start: usize = (r.start as usize).min(body.len());
                // Inclusive end, clamped to content length.
                let end: usize = ((r.end as usize).saturating_add(1)).min(body.len());
                Ok(body[start..end.max(start)].to_vec())
            }
            None => Ok(body),
        }
    }

    async fn put_object(
        &self,
        container: &str,
        name: &str,
        data: &[u8],
        headers: &PutHeaders,
    ) -> Result<String, StorageError> {
        self.store_entry(container, name, data.to_vec(), headers)
    }

    async fn put_object_streamed(
        &self,
        container: &str,
        name: &str,
        mut body: Box<dyn Read + Send>,
        headers: &PutHeaders,
    ) -> Result<String, StorageError> {
        let mut data: Vec<u8> = Vec::new();
        body.read_to_end(&mut data)
            .map_err(|e| StorageError::io(format!("{container}/{name}"), e))?;
        self.store_entry(container, name, data, headers)
    }

    async fn put_object_from_file(
        &self,
        container: &str,
        name: &str,
        path: &Path,
        headers: &PutHeaders,
    ) -> Result<String, StorageError> {
        let data: Vec<u8> =
            std::fs::read(path).map_err(|e| StorageError::io(path.display().to_string(), e))?;
        self.store_entry(container, name, data, headers)
    }

    async fn delete_object(&self, container: &str, name: &str) -> Result<(), StorageError> {
        let mut containers = self.containers.lock().unwrap();
        let objects: &mut BTreeMap<String, StoredEntry> =
            containers
                .get_mut(container)
                .ok_or_else(|| StorageError::ContainerNotFound {
                    container: container.to_string(),
                })?;
        objects.remove(name).ok_or_else(|| StorageError::NotFound {
            container: container.to_string(),
            name: name.to_string(),
        })?;
        Ok(())
    }

    async fn bulk_delete(&self, body: &str) -> Result<BulkDeleteOutcome, StorageError> {
        let mut outcome: BulkDeleteOutcome = BulkDeleteOutcome {
            status: "200 OK".to_string(),
            ..Default::default()
        };

        let mut containers = self.containers.lock().unwrap();
        for line in body.lines() {
            let line: &str = line.trim();
            if line.is_empty() {
                continue;
            }
            let (container, name): (&str, &str) = match line.split_once('/') {
                Some(parts) => parts,
                None => {
                    outcome
                        .errors
                        .push((line.to_string(), "malformed line".to_string()));
                    continue;
                }
            };
            match containers.get_mut(container) {
                Some(objects) => {
                    if objects.remove(name).is_some() {
                        outcome.deleted += 1;
                    } else {
                        outcome.not_found += 1;
                    }
                }
                None => {
                    outcome.not_found += 1;
                }
            }
        }

        Ok(outcome)
    }

    async fn list_objects(
        &self,
        container: &str,
        options: &ListOptions,
    ) -> Result<Vec<ObjectSummary>, StorageError> {
        let containers = self.containers.lock().unwrap();
        let objects: &BTreeMap<String, StoredEntry> =
            containers
                .get(container)
                .ok_or_else(|| StorageError::ContainerNotFound {
                    container: container.to_string(),
                })?;

        let limit: usize = options.limit.unwrap_or(LIST_PAGE_LIMIT).min(LIST_PAGE_LIMIT);
        let mut summaries: Vec<ObjectSummary> = Vec::new();

        for (name, entry) in objects.iter() {
            if let Some(marker) = &options.marker {
                if name.as_str() <= marker.as_str() {
                    continue;
                }
            }
            if let Some(end_marker) = &options.end_marker {
                if name.as_str() >= end_marker.as_str() {
                    break;
                }
            }
            if let Some(prefix) = &options.prefix {
                if !name.starts_with(prefix.as_str()) {
                    continue;
                }
            }
            if summaries.len() >= limit {
                break;
            }
            summaries.push(ObjectSummary {
                name: name.clone(),
                bytes: entry.data.len() as u64,
                etag: Some(entry.etag.clone()),
                last_modified: Some(entry.last_modified.clone()),
                content_type: entry.content_type.clone(),
            });
        }

        Ok(summaries)
    }

    async fn create_container(&self, container: &str) -> Result<(), StorageError> {
        self.containers
            .lock()
            .unwrap()
            .entry(container.to_string())
            .or_default();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_round_trip() {
        let store: MemoryStore = MemoryStore::with_container("docs");
        let etag: String = store
            .put_object("docs", "readme.txt", b"hello", &PutHeaders::default())
            .await
            .unwrap();
        assert_eq!(etag, checksum_bytes(b"hello"));

        let body: Vec<u8> = store.get_object("docs", "readme.txt", None).await.unwrap();
        assert_eq!(body, b"hello");
    }

    #[tokio::test]
    async fn test_put_to_missing_container() {
        let store: MemoryStore = MemoryStore::new();
        let result: Result<String, StorageError> = store
            .put_object("nope", "x", b"data", &PutHeaders::default())
            .await;
        assert!(matches!(
            result,
            Err(StorageError::ContainerNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_etag_verified_on_put() {
        let store: MemoryStore = MemoryStore::with_container("docs");
        let headers: PutHeaders = PutHeaders {
            etag: Some("0000".to_string()),
            ..Default::default()
        };
        let result: Result<String, StorageError> =
            store.put_object("docs", "x", b"data", &headers).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_ranged_get_clamps_to_length() {
        let store: MemoryStore = MemoryStore::with_container("docs");
        store
            .put_object("docs", "x", b"0123456789", &PutHeaders::default())
            .await
            .unwrap();

        let body: Vec<u8> = store
            .get_object("docs", "x", Some(ByteRange { start: 3, end: 5 }))
            .await
            .unwrap();
        assert_eq!(body, b"345");

        let clamped: Vec<u8> = store
            .get_object("docs", "x", Some(ByteRange { start: 8, end: 100 }))
            .await
            .unwrap();
        assert_eq!(clamped, b"89");

        let empty: Vec<u8> = store
            .get_object("docs", "x", Some(ByteRange { start: 20, end: 30 }))
            .await
            .unwrap();
        assert!(empty.is_empty());
    }

    #[tokio::test]
    async fn test_manifest_concatenates_segments() {
        let store: MemoryStore = MemoryStore::with_container("media");
        store
            .put_object("media", "clip.bin.1", b"aaa", &PutHeaders::default())
            .await
            .unwrap();
        store
            .put_object("media", "clip.bin.2", b"bbb", &PutHeaders::default())
            .await
            .unwrap();

        let manifest: PutHeaders = PutHeaders {
            manifest_prefix: Some("media/clip.bin.".to_string()),
            ..Default::default()
        };
        store
            .put_object("media", "clip.bin", b"", &manifest)
            .await
            .unwrap();

        let body: Vec<u8> = store.get_object("media", "clip.bin", None).await.unwrap();
        assert_eq!(body, b"aaabbb");

        let record: ObjectRecord = store.head_object("media", "clip.bin").await.unwrap();
        assert!(record.is_manifest());
        assert_eq!(record.bytes, Some(6));
    }

    #[tokio::test]
    async fn test_listing_markers_and_prefix() {
        let store: MemoryStore = MemoryStore::with_container("docs");
        for name in ["a", "b", "c", "sub/x", "sub/y"] {
            store
                .put_object("docs", name, b"1", &PutHeaders::default())
                .await
                .unwrap();
        }

        let options: ListOptions = ListOptions {
            marker: Some("a".to_string()),
            end_marker: Some("sub/y".to_string()),
            ..Default::default()
        };
        let page: Vec<ObjectSummary> = store.list_objects("docs", &options).await.unwrap();
        let names: Vec<&str> = page.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["b", "c", "sub/x"]);

        let prefixed: ListOptions = ListOptions {
            prefix: Some("sub/".to_string()),
            ..Default::default()
        };
        let page: Vec<ObjectSummary> = store.list_objects("docs", &prefixed).await.unwrap();
        assert_eq!(page.len(), 2);
    }

    #[tokio::test]
    async fn test_listing_caps_at_page_limit() {
        let store: MemoryStore = MemoryStore::with_container("big");
        {
            let mut containers = store.containers.lock().unwrap();
            let objects: &mut BTreeMap<String, StoredEntry> =
                containers.get_mut("big").unwrap();
            for i in 0..(LIST_PAGE_LIMIT + 50) {
                objects.insert(
                    format!("obj-{i:06}"),
                    StoredEntry {
                        data: Vec::new(),
                        etag: String::new(),
                        content_type: None,
                        last_modified: MemoryStore::now_timestamp(),
                        manifest_prefix: None,
                        delete_after: None,
                        metadata: HashMap::new(),
                    },
                );
            }
        }

        let first: Vec<ObjectSummary> = store
            .list_objects("big", &ListOptions::default())
            .await
            .unwrap();
        assert_eq!(first.len(), LIST_PAGE_LIMIT);

        // Requests above the cap are clamped to it.
        let clamped: Vec<ObjectSummary> = store
            .list_objects(
                "big",
                &ListOptions {
                    limit: Some(LIST_PAGE_LIMIT * 2),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(clamped.len(), LIST_PAGE_LIMIT);

        let rest: Vec<ObjectSummary> = store
            .list_objects(
                "big",
                &ListOptions {
                    marker: first.last().map(|s| s.name.clone()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(rest.len(), 50);
    }

    #[tokio::test]
    async fn test_bulk_delete_counts() {
        let store: MemoryStore = MemoryStore::with_container("docs");
        store
            .put_object("docs", "keep", b"1", &PutHeaders::default())
            .await
            .unwrap();
        store
            .put_object("docs", "drop", b"1", &PutHeaders::default())
            .await
            .unwrap();

        let outcome: BulkDeleteOutcome = store
            .bulk_delete("docs/drop\ndocs/missing\n")
            .await
            .unwrap();
        assert_eq!(outcome.deleted, 1);
        assert_eq!(outcome.not_found, 1);
        assert_eq!(outcome.status, "200 OK");
        assert_eq!(store.object_count("docs"), 1);
    }
}
