//! Content checksum computation.
//!
//! The remote service reports object etags as lowercase hex MD5 digests of
//! the content, so the same digest is used locally for integrity tags and
//! sync comparisons. These are equality tags, not a security boundary.

use std::io::Read;
use std::path::Path;

use md5::{Digest, Md5};

use crate::constants::COPY_BUFFER_SIZE;

/// Compute the MD5 checksum of a byte slice.
///
/// # Arguments
/// * `data` - Bytes to checksum
///
/// # Returns
/// 32-character lowercase hex string.
pub fn checksum_bytes(data: &[u8]) -> String {
    hex::encode(Md5::digest(data))
}

/// Compute the MD5 checksum of everything a reader yields.
///
/// Reads in fixed-size chunks to avoid loading the whole source into memory.
///
/// # Arguments
/// * `reader` - Source of bytes to checksum
///
/// # Errors
/// Returns error if the reader fails.
pub fn checksum_reader<R: Read>(reader: &mut R) -> Result<String, std::io::Error> {
    let mut hasher: Md5Hasher = Md5Hasher::new();
    let mut buffer: Vec<u8> = vec![0u8; COPY_BUFFER_SIZE];

    loop {
        let bytes_read: usize = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hasher.finish_hex())
}

/// Compute the MD5 checksum of a file.
///
/// # Arguments
/// * `path` - Path to the file to checksum
///
/// # Returns
/// 32-character lowercase hex string.
///
/// # Errors
/// Returns error if the file cannot be read.
pub fn checksum_file(path: &Path) -> Result<String, std::io::Error> {
    let mut file: std::fs::File = std::fs::File::open(path)?;
    checksum_reader(&mut file)
}

/// Streaming checksum for incremental MD5 computation.
///
/// Use this when hashing data as it passes through, such as while spooling
/// a segment to disk.
pub struct Md5Hasher {
    inner: Md5,
}

impl Md5Hasher {
    /// Create a new streaming hasher.
    pub fn new() -> Self {
        Self { inner: Md5::new() }
    }

    /// Update the hasher with additional data.
    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    /// Finalize and return the checksum as a 32-char hex string.
    pub fn finish_hex(self) -> String {
        hex::encode(self.inner.finalize())
    }
}

impl Default for Md5Hasher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_checksum_bytes_known_value() {
        // Well-known MD5 test vector.
        assert_eq!(
            checksum_bytes(b"abc"),
            "900150983cd24fb0d6963f7d28e17f72"
        );
    }

    #[test]
    fn test_checksum_bytes_empty() {
        assert_eq!(
            checksum_bytes(b""),
            "d41d8cd98f00b204e9800998ecf8427e"
        );
    }

    #[test]
    fn test_incremental_matches_oneshot() {
        let mut hasher: Md5Hasher = Md5Hasher::new();
        hasher.update(b"hello ");
        hasher.update(b"world");
        assert_eq!(hasher.finish_hex(), checksum_bytes(b"hello world"));
    }

    #[test]
    fn test_checksum_file() {
        let dir: tempfile::TempDir = tempfile::tempdir().unwrap();
        let file_path: std::path::PathBuf = dir.path().join("data.bin");

        let mut file: std::fs::File = std::fs::File::create(&file_path).unwrap();
        file.write_all(b"hello world").unwrap();
        drop(file);

        assert_eq!(
            checksum_file(&file_path).unwrap(),
            checksum_bytes(b"hello world")
        );
    }

    #[test]
    fn test_checksum_file_not_found() {
        let result: Result<String, std::io::Error> =
            checksum_file(Path::new("/nonexistent/file.bin"));
        assert!(result.is_err());
    }

    #[test]
    fn test_checksum_reader_large_input() {
        // Spans multiple read buffers.
        let data: Vec<u8> = vec![0xAB; COPY_BUFFER_SIZE * 3 + 17];
        let from_reader: String = checksum_reader(&mut data.as_slice()).unwrap();
        assert_eq!(from_reader, checksum_bytes(&data));
    }
}
