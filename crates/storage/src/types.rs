//! Wire-level types shared across storage operations.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Header naming the segment prefix of a manifest object.
pub const MANIFEST_HEADER: &str = "X-Object-Manifest";

/// Header scheduling server-side deletion after a relative TTL in seconds.
pub const DELETE_AFTER_HEADER: &str = "X-Delete-After";

/// Prefix for user metadata headers on stored objects.
pub const OBJECT_META_PREFIX: &str = "X-Object-Meta-";

/// Metadata of a stored object as reported by a HEAD.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectRecord {
    /// Object name within its container.
    pub name: String,
    /// Content size in bytes. For a manifest this is the combined size of
    /// its segments.
    pub bytes: Option<u64>,
    /// MIME content type.
    pub content_type: Option<String>,
    /// MD5 checksum of the content, lowercase hex.
    pub etag: Option<String>,
    /// Last modification timestamp, ISO-8601 with fractional seconds.
    pub last_modified: Option<String>,
    /// Segment prefix (`container/name.`) when this object is a manifest.
    pub manifest_prefix: Option<String>,
    /// User metadata, keyed without the header prefix.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl ObjectRecord {
    /// Whether this object is a segment manifest rather than plain content.
    pub fn is_manifest(&self) -> bool {
        self.manifest_prefix.is_some()
    }
}

/// An inclusive byte range for a partial GET.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    /// First byte offset, inclusive.
    pub start: u64,
    /// Last byte offset, inclusive.
    pub end: u64,
}

impl ByteRange {
    /// Render as an HTTP Range header value, as sent on the wire by
    /// transport-backed [`ObjectStore`](crate::traits::ObjectStore)
    /// implementations.
    pub fn header_value(&self) -> String {
        format!("bytes={}-{}", self.start, self.end)
    }
}

/// Headers attached to an object PUT.
#[derive(Debug, Clone, Default)]
pub struct PutHeaders {
    /// MIME content type.
    pub content_type: Option<String>,
    /// Content encoding (e.g. `gzip`).
    pub content_encoding: Option<String>,
    /// Expected MD5 checksum; the store verifies the body against it.
    pub etag: Option<String>,
    /// Relative TTL in seconds after which the store deletes the object.
    pub delete_after: Option<u64>,
    /// Marks the object as a manifest over segments with this prefix.
    pub manifest_prefix: Option<String>,
    /// User metadata, keyed without the header prefix.
    pub metadata: HashMap<String, String>,
}

impl PutHeaders {
    /// Render as HTTP header pairs in the service's wire format. This is
    /// what transport-backed [`ObjectStore`](crate::traits::ObjectStore)
    /// implementations put on a PUT request.
    pub fn header_pairs(&self) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> = Vec::new();
        if let Some(content_type) = &self.content_type {
            pairs.push(("Content-Type".to_string(), content_type.clone()));
        }
        if let Some(encoding) = &self.content_encoding {
            pairs.push(("Content-Encoding".to_string(), encoding.clone()));
        }
        if let Some(etag) = &self.etag {
            pairs.push(("ETag".to_string(), etag.clone()));
        }
        if let Some(seconds) = self.delete_after {
            pairs.push((DELETE_AFTER_HEADER.to_string(), seconds.to_string()));
        }
        if let Some(prefix) = &self.manifest_prefix {
            pairs.push((MANIFEST_HEADER.to_string(), prefix.clone()));
        }
        for (key, value) in &self.metadata {
            pairs.push((format!("{OBJECT_META_PREFIX}{key}"), value.clone()));
        }
        pairs
    }
}

/// Options for a container listing call.
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    /// Return names strictly greater than this marker.
    pub marker: Option<String>,
    /// Return names strictly less than this marker.
    pub end_marker: Option<String>,
    /// Only return names starting with this prefix.
    pub prefix: Option<String>,
    /// Collapse names at this delimiter into pseudo-directories.
    pub delimiter: Option<String>,
    /// Maximum entries to return; the service caps this at its page limit.
    pub limit: Option<usize>,
}

/// One entry of a container listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectSummary {
    /// Object name.
    pub name: String,
    /// Content size in bytes.
    pub bytes: u64,
    /// MD5 checksum of the content, lowercase hex.
    pub etag: Option<String>,
    /// Last modification timestamp, ISO-8601 with fractional seconds.
    pub last_modified: Option<String>,
    /// MIME content type.
    pub content_type: Option<String>,
}

/// Result of a bulk delete call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BulkDeleteOutcome {
    /// Number of objects deleted.
    pub deleted: u64,
    /// Number of named objects that did not exist.
    pub not_found: u64,
    /// Response status line from the service.
    pub status: String,
    /// Per-object errors, as (name, reason) pairs.
    pub errors: Vec<(String, String)>,
}
