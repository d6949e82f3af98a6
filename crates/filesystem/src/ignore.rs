//! Ignore rules applied while walking a local tree.
//!
//! Two rules combine: entries whose name starts with `.` are hidden and
//! skipped unless hidden files are explicitly included, and entries whose
//! name matches any user-supplied shell glob pattern are skipped. Patterns
//! match against the entry's own name, not its full path, so `*.tmp`
//! excludes temp files at any depth. A skipped directory prunes its entire
//! subtree.

use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::error::FileSystemError;

/// Compiled ignore rules for a walk.
pub struct IgnoreFilter {
    globs: Option<GlobSet>,
    include_hidden: bool,
}

impl IgnoreFilter {
    /// Compile a set of shell glob patterns into a filter.
    ///
    /// # Arguments
    /// * `patterns` - Shell glob patterns (e.g. `*.tmp`, `node_modules`)
    /// * `include_hidden` - When false, dot-prefixed entries are skipped
    ///
    /// # Errors
    /// Returns error if any pattern fails to compile.
    pub fn new(patterns: &[String], include_hidden: bool) -> Result<Self, FileSystemError> {
        let globs: Option<GlobSet> = if patterns.is_empty() {
            None
        } else {
            let mut builder: GlobSetBuilder = GlobSetBuilder::new();
            for pattern in patterns {
                let glob: Glob =
                    Glob::new(pattern).map_err(|e| FileSystemError::InvalidPattern {
                        pattern: pattern.clone(),
                        reason: e.to_string(),
                    })?;
                builder.add(glob);
            }
            Some(
                builder
                    .build()
                    .map_err(|e| FileSystemError::InvalidPattern {
                        pattern: patterns.join(", "),
                        reason: e.to_string(),
                    })?,
            )
        };

        Ok(Self {
            globs,
            include_hidden,
        })
    }

    /// Check whether an entry name should be skipped.
    ///
    /// # Arguments
    /// * `name` - The entry's own name (a single path component)
    pub fn is_ignored(&self, name: &str) -> bool {
        if !self.include_hidden && name.starts_with('.') {
            return true;
        }
        match &self.globs {
            Some(set) => set.is_match(name),
            None => false,
        }
    }
}
