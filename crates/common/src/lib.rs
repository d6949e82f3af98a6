//! Shared types and utilities for swiftsync.
//!
//! This crate provides common functionality used across all swiftsync crates:
//! - Content checksum computation (MD5, matching the service's etag format)
//! - Path conversion between local OS paths and `/`-delimited object names
//! - Shared constants and error types

pub mod checksum;
pub mod constants;
pub mod error;
pub mod path_utils;

// Re-export commonly used items at crate root
pub use checksum::{checksum_bytes, checksum_file, checksum_reader, Md5Hasher};
pub use constants::*;
pub use error::PathError;
pub use path_utils::{from_posix_path, remote_object_name, to_posix_path};
