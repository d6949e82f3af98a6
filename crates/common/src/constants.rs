//! Shared constants used across swiftsync crates.

/// Maximum size of a single stored object part: 5 GiB - 1 byte.
/// Sources larger than this must be uploaded as segments plus a manifest.
pub const MAX_SINGLE_PART_SIZE: u64 = 5_368_709_119;

/// Maximum number of entries the service returns per listing call.
/// Listings past this require marker-based pagination.
pub const LIST_PAGE_LIMIT: usize = 10_000;

/// Interval between completion checks when waiting synchronously on a
/// background job, in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;

/// Buffer size for streaming reads (checksums, segment spooling).
pub const COPY_BUFFER_SIZE: usize = 64 * 1024;
