//! Typed errors for the refresh pipeline and lookup API

use thiserror::Error;

/// Refresh-cycle-local errors
///
/// Each variant aborts only the current refresh attempt; the previously
/// active catalog (if any) stays queryable.
#[derive(Debug, Error)]
pub enum RefreshError {
    /// Connection or stream failure while fetching the catalog
    #[error("catalog download failed: {0}")]
    Network(#[from] reqwest::Error),

    /// Corrupt or truncated compressed payload
    #[error("catalog decompression failed: {0}")]
    Decompress(#[source] std::io::Error),

    /// Malformed catalog payload
    #[error("catalog parse failed: {0}")]
    Parse(#[from] serde_json::Error),
}

/// The single failure mode exposed to lookup callers
///
/// "No match found" is not an error; it is an `Ok(None)` result. `NotReady`
/// means no refresh has ever succeeded, so callers can decide whether to wait
/// for the first refresh or bail out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LookupError {
    /// No catalog has been populated yet
    #[error("instrument catalog not yet populated")]
    NotReady,
}
