//! Error taxonomy (§7). Only four kinds ever cross the public API boundary,
//! collected into [`CoreError`]. Everything else (`ParseSkip`, `CacheStale`,
//! `CacheCorrupt`, `NoRampMatch`) is recovered entirely within the module
//! that raises it and is never constructed outside this crate.

use thiserror::Error;

/// Errors the public API can return (§6.4, §7).
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("routing engine unavailable: {0}")]
    RoutingUnavailable(String),

    #[error("deadline exceeded after {elapsed_ms}ms (budget {budget_ms}ms)")]
    DeadlineExceeded { elapsed_ms: u64, budget_ms: u64 },

    #[error("internal error: {0}")]
    Internal(String),
}

/// Raised when a single GeoJSON feature fails to parse (§4.1, §7). Caught
/// and logged by the ingest module; never escapes it.
#[derive(Debug, Error)]
pub(crate) enum ParseSkip {
    #[error("feature {index} in {source_name}: {reason}")]
    Malformed {
        index: usize,
        source_name: &'static str,
        reason: String,
    },
}

/// Raised by the cache loader when the on-disk cache cannot be trusted
/// (§4.4, §7). Both variants trigger a rebuild; neither escapes [`crate::cache`].
#[derive(Debug, Error)]
pub(crate) enum CacheLoadError {
    #[error("cache fingerprint stale: {0}")]
    Stale(String),
    #[error("cache blob corrupt: {0}")]
    Corrupt(String),
}

/// Raised by the exit optimizer when no substitute ramp satisfies the
/// corridor filters (§4.8, §7). The selector treats this as "no
/// substitution available" and falls back per §4.7.
#[derive(Debug, Error)]
#[error("no ramp substitute found for booth {closed_booth_id}")]
pub(crate) struct NoRampMatch {
    pub closed_booth_id: String,
}
