//! Centralized default constants for supernote.
//!
//! Every tunable bound lives here so call sites never carry magic numbers.
//! [`crate::config::Config`] reads overrides from the environment and falls
//! back to these values.

// =============================================================================
// SERVICE
// =============================================================================

/// Service name reported by the health endpoint.
pub const SERVICE_NAME: &str = "supernote-ai-backend";

/// Default bind host.
pub const HOST: &str = "0.0.0.0";

/// Default HTTP port.
pub const PORT: u16 = 8080;

/// Per-request wall-clock limit enforced by the HTTP layer, in seconds.
///
/// Must exceed [`DB_QUERY_TIMEOUT_SECS`] so a slow store surfaces as the
/// gateway's timeout rather than the HTTP layer's.
pub const REQUEST_TIMEOUT_SECS: u64 = 35;

/// Maximum accepted request body, in bytes (1 MiB).
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

// =============================================================================
// CONNECTION POOL
// =============================================================================

/// Maximum number of concurrent connections.
pub const DB_MAX_CONNECTIONS: u32 = 25;

/// Warm connections kept open even when idle.
pub const DB_MIN_CONNECTIONS: u32 = 5;

/// Connections older than this are recycled, in seconds (1 hour).
pub const DB_MAX_LIFETIME_SECS: u64 = 3600;

/// Idle connections past this threshold are closed, in seconds (30 minutes).
pub const DB_IDLE_TIMEOUT_SECS: u64 = 1800;

/// How long to wait for a free connection (and for the boot connect), in seconds.
pub const DB_ACQUIRE_TIMEOUT_SECS: u64 = 10;

/// Deadline for a single gateway operation, in seconds.
pub const DB_QUERY_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// PAGINATION
// =============================================================================

/// Page size used when `limit` is absent or invalid.
pub const PAGE_LIMIT: i64 = 20;

/// Offset used when `offset` is absent or invalid.
pub const PAGE_OFFSET: i64 = 0;

// =============================================================================
// EMBEDDING
// =============================================================================

/// Width of the `notes.embedding` vector column.
pub const EMBED_DIMENSION: usize = 768;
