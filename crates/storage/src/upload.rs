//! Object upload, including segmented uploads with manifests.
//!
//! Sources larger than the single-part cap are split into fixed-size
//! segments named `<name>.<NNN>` (1-based, zero-padded so lexical order is
//! numeric order), each spooled to a temp file and uploaded with its own
//! checksum, then tied together with a zero-body manifest PUT. Segments
//! live in the same container as the manifest.

use std::collections::HashMap;
use std::io::{Cursor, Read, Write};
use std::path::PathBuf;

use tempfile::NamedTempFile;
use tracing::{debug, info};

use swiftsync_common::checksum::{checksum_bytes, checksum_file, Md5Hasher};
use swiftsync_common::constants::{COPY_BUFFER_SIZE, MAX_SINGLE_PART_SIZE};

use crate::error::StorageError;
use crate::traits::ObjectStore;
use crate::types::{ObjectRecord, PutHeaders};

/// Where upload content comes from.
pub enum UploadSource {
    /// A local file, read from disk at upload time.
    Path(PathBuf),
    /// An in-memory body.
    Data(Vec<u8>),
    /// An arbitrary reader, consumed once.
    Reader(Box<dyn Read + Send>),
}

/// A single upload request.
pub struct UploadRequest {
    source: Option<UploadSource>,
    name: Option<String>,
    content_type: Option<String>,
    content_encoding: Option<String>,
    content_length: Option<u64>,
    etag: Option<String>,
    ttl: Option<u64>,
    chunked: bool,
    metadata: HashMap<String, String>,
    return_record: bool,
}

impl UploadRequest {
    /// Upload the contents of a local file.
    ///
    /// The object name defaults to the file's base name.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self::new(Some(UploadSource::Path(path.into())))
    }

    /// Upload an in-memory body.
    pub fn from_data(data: Vec<u8>) -> Self {
        Self::new(Some(UploadSource::Data(data)))
    }

    /// Upload from a reader. Unless uploaded chunked, `with_content_length`
    /// must be supplied so the uploader can plan segmentation.
    pub fn from_reader(reader: Box<dyn Read + Send>) -> Self {
        Self::new(Some(UploadSource::Reader(reader)))
    }

    /// A request with no content source. Fails validation unless a source
    /// is set; used to build requests incrementally.
    pub fn empty() -> Self {
        Self::new(None)
    }

    fn new(source: Option<UploadSource>) -> Self {
        Self {
            source,
            name: None,
            content_type: None,
            content_encoding: None,
            content_length: None,
            etag: None,
            ttl: None,
            chunked: false,
            metadata: HashMap::new(),
            return_record: true,
        }
    }

    /// Set the object name explicitly.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the MIME content type.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Set the content encoding.
    pub fn with_content_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.content_encoding = Some(encoding.into());
        self
    }

    /// Declare the body length for reader sources.
    pub fn with_content_length(mut self, length: u64) -> Self {
        self.content_length = Some(length);
        self
    }

    /// Supply a precomputed checksum for the store to verify against.
    pub fn with_etag(mut self, etag: impl Into<String>) -> Self {
        self.etag = Some(etag.into());
        self
    }

    /// Schedule server-side deletion this many seconds after upload.
    pub fn with_ttl(mut self, seconds: u64) -> Self {
        self.ttl = Some(seconds);
        self
    }

    /// Stream the body with chunked transfer encoding. Chunked bodies are
    /// never segmented and carry no checksum.
    pub fn chunked(mut self) -> Self {
        self.chunked = true;
        self
    }

    /// Attach a user metadata key/value pair.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Skip the metadata fetch after upload; `upload` returns `None`.
    pub fn without_record(mut self) -> Self {
        self.return_record = false;
        self
    }
}

/// Tuning options for an uploader.
#[derive(Debug, Clone)]
pub struct UploadOptions {
    max_part_size: u64,
}

impl UploadOptions {
    /// Lower the segmentation threshold. Values above the service's
    /// single-part cap are clamped to it.
    pub fn with_max_part_size(mut self, bytes: u64) -> Self {
        self.max_part_size = bytes.max(1).min(MAX_SINGLE_PART_SIZE);
        self
    }
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            max_part_size: MAX_SINGLE_PART_SIZE,
        }
    }
}

/// Uploads objects into one container of a store.
pub struct ObjectUploader<'a, S: ObjectStore + ?Sized> {
    store: &'a S,
    container: String,
    options: UploadOptions,
}

impl<'a, S: ObjectStore + ?Sized> ObjectUploader<'a, S> {
    /// Create an uploader targeting a container.
    pub fn new(store: &'a S, container: impl Into<String>) -> Self {
        Self {
            store,
            container: container.into(),
            options: UploadOptions::default(),
        }
    }

    /// Replace the default options.
    pub fn with_options(mut self, options: UploadOptions) -> Self {
        self.options = options;
        self
    }

    /// Upload one object, segmenting if the source exceeds the part cap.
    ///
    /// # Returns
    /// The stored object's metadata, or `None` when the request opted out
    /// of the post-upload fetch.
    ///
    /// # Errors
    /// * `ContentSourceMissing` if the request has no source
    /// * `NameUnresolvable` if no name was given and none can be derived
    /// * `LocalPathMissing` if a path source does not exist
    /// * `PartialTransfer` if a segmented upload fails partway
    pub async fn upload(
        &self,
        request: UploadRequest,
    ) -> Result<Option<ObjectRecord>, StorageError> {
        let source: UploadSource = request
            .source
            .ok_or(StorageError::ContentSourceMissing)?;

        let name: String = match &request.name {
            Some(name) => name.clone(),
            None => match &source {
                UploadSource::Path(path) => path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .ok_or(StorageError::NameUnresolvable)?,
                _ => return Err(StorageError::NameUnresolvable),
            },
        };

        let mut headers: PutHeaders = PutHeaders {
            content_type: request.content_type.clone(),
            content_encoding: request.content_encoding.clone(),
            etag: request.etag.clone(),
            delete_after: request.ttl,
            manifest_prefix: None,
            metadata: request.metadata.clone(),
        };

        if request.chunked {
            // Chunked bodies have unknown length up front, so no checksum
            // and no segmentation.
            headers.etag = None;
            let body: Box<dyn Read + Send> = Self::into_reader(source)?;
            self.store
                .put_object_streamed(&self.container, &name, body, &headers)
                .await?;
            return self.finish(&name, request.return_record).await;
        }

        let total_size: u64 = match &source {
            UploadSource::Path(path) => {
                let metadata = std::fs::metadata(path).map_err(|_| {
                    StorageError::LocalPathMissing {
                        path: path.display().to_string(),
                    }
                })?;
                metadata.len()
            }
            UploadSource::Data(data) => data.len() as u64,
            UploadSource::Reader(_) => request.content_length.ok_or_else(|| {
                StorageError::InvalidConfig {
                    message: "reader sources need a content length unless uploaded chunked"
                        .to_string(),
                }
            })?,
        };

        if total_size <= self.options.max_part_size {
            self.put_whole(&name, source, &mut headers).await?;
            return self.finish(&name, request.return_record).await;
        }

        // Segmented path: the manifest carries the request's headers, the
        // segments each carry their own checksum.
        let segment_headers: PutHeaders = PutHeaders {
            delete_after: request.ttl,
            ..Default::default()
        };
        self.put_segments(&name, source, total_size, &segment_headers)
            .await?;

        headers.etag = None;
        headers.manifest_prefix = Some(format!("{}/{}.", self.container, name));
        debug!(headers = ?headers.header_pairs(), "writing manifest");
        self.store
            .put_object(&self.container, &name, &[], &headers)
            .await?;
        info!(name = %name, "uploaded manifest");

        self.finish(&name, request.return_record).await
    }

    async fn finish(
        &self,
        name: &str,
        return_record: bool,
    ) -> Result<Option<ObjectRecord>, StorageError> {
        if !return_record {
            return Ok(None);
        }
        let record: ObjectRecord = self.store.head_object(&self.container, name).await?;
        Ok(Some(record))
    }

    /// Single PUT. Every non-chunked body carries an integrity tag: the
    /// caller's precomputed etag when given, a freshly computed digest
    /// otherwise.
    async fn put_whole(
        &self,
        name: &str,
        source: UploadSource,
        headers: &mut PutHeaders,
    ) -> Result<(), StorageError> {
        match source {
            UploadSource::Path(path) => {
                if headers.etag.is_none() {
                    headers.etag = Some(
                        checksum_file(&path)
                            .map_err(|e| StorageError::io(path.display().to_string(), e))?,
                    );
                }
                self.store
                    .put_object_from_file(&self.container, name, &path, headers)
                    .await?;
            }
            UploadSource::Data(data) => {
                if headers.etag.is_none() {
                    headers.etag = Some(checksum_bytes(&data));
                }
                self.store
                    .put_object(&self.container, name, &data, headers)
                    .await?;
            }
            UploadSource::Reader(mut reader) => {
                if headers.etag.is_none() {
                    // Digesting consumes the reader, so spool it to disk
                    // first, the same way segments are handled.
                    let (spool, etag): (NamedTempFile, String) =
                        spool_reader(reader.as_mut(), None)
                            .map_err(|e| StorageError::io(name, e))?;
                    headers.etag = Some(etag);
                    self.store
                        .put_object_from_file(&self.container, name, spool.path(), headers)
                        .await?;
                } else {
                    self.store
                        .put_object_streamed(&self.container, name, reader, headers)
                        .await?;
                }
            }
        }
        Ok(())
    }

    async fn put_segments(
        &self,
        name: &str,
        source: UploadSource,
        total_size: u64,
        segment_headers: &PutHeaders,
    ) -> Result<(), StorageError> {
        let part_size: u64 = self.options.max_part_size;
        let num_segments: u64 = total_size.div_ceil(part_size);
        let width: usize = num_segments.to_string().len();

        debug!(
            name = %name,
            total_size,
            num_segments,
            "segmenting upload"
        );

        let mut reader: Box<dyn Read + Send> = Self::into_reader(source)?;

        for index in 1..=num_segments {
            let segment_name: String = format!("{name}.{index:0width$}");
            let result: Result<(), StorageError> = self
                .put_one_segment(&segment_name, &mut reader, part_size, segment_headers)
                .await;
            if let Err(err) = result {
                return Err(StorageError::PartialTransfer {
                    name: name.to_string(),
                    uploaded_segments: index - 1,
                    total_segments: num_segments,
                    source: Box::new(err),
                });
            }
            debug!(segment = %segment_name, "uploaded segment");
        }

        Ok(())
    }

    async fn put_one_segment(
        &self,
        segment_name: &str,
        reader: &mut Box<dyn Read + Send>,
        part_size: u64,
        segment_headers: &PutHeaders,
    ) -> Result<(), StorageError> {
        let (spool, etag): (NamedTempFile, String) =
            spool_reader(reader.as_mut(), Some(part_size))
                .map_err(|e| StorageError::io(segment_name, e))?;

        let headers: PutHeaders = PutHeaders {
            etag: Some(etag),
            ..segment_headers.clone()
        };
        self.store
            .put_object_from_file(&self.container, segment_name, spool.path(), &headers)
            .await?;
        Ok(())
    }

    fn into_reader(source: UploadSource) -> Result<Box<dyn Read + Send>, StorageError> {
        match source {
            UploadSource::Path(path) => {
                let file: std::fs::File = std::fs::File::open(&path).map_err(|_| {
                    StorageError::LocalPathMissing {
                        path: path.display().to_string(),
                    }
                })?;
                Ok(Box::new(file))
            }
            UploadSource::Data(data) => Ok(Box::new(Cursor::new(data))),
            UploadSource::Reader(reader) => Ok(reader),
        }
    }
}

/// Spool up to `limit` bytes of a reader (to EOF when `None`) into a temp
/// file, digesting as it goes. The body can then carry its checksum without
/// being held in memory.
fn spool_reader(
    reader: &mut dyn Read,
    limit: Option<u64>,
) -> Result<(NamedTempFile, String), std::io::Error> {
    let mut spool: NamedTempFile = NamedTempFile::new()?;
    let mut hasher: Md5Hasher = Md5Hasher::new();
    let mut buffer: Vec<u8> = vec![0u8; COPY_BUFFER_SIZE];
    let mut remaining: u64 = limit.unwrap_or(u64::MAX);

    while remaining > 0 {
        let want: usize = if remaining < buffer.len() as u64 {
            remaining as usize
        } else {
            buffer.len()
        };
        let got: usize = reader.read(&mut buffer[..want])?;
        if got == 0 {
            break;
        }
        hasher.update(&buffer[..got]);
        spool.write_all(&buffer[..got])?;
        remaining -= got as u64;
    }
    spool.flush()?;

    Ok((spool, hasher.finish_hex()))
}
