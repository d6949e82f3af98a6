//! Local filesystem scanning for swiftsync.
//!
//! Walks a local directory tree into the flat list of files that a folder
//! upload or sync plan operates on, applying hidden-file and glob-pattern
//! ignore rules along the way.

pub mod error;
pub mod ignore;
pub mod walker;

pub use error::FileSystemError;
pub use ignore::IgnoreFilter;
pub use walker::{folder_size, walk_files, LocalFile};
