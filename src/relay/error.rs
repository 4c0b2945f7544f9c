//! Error types for relay operations.
//!
//! Per-relay failures are never errors: they are recorded as
//! [`FailureReason`](super::FailureReason) values in each relay's outcome.
//! The variants here cover call-level problems (bad input, every relay
//! failing) surfaced by the tool facade.

use thiserror::Error;

use crate::nostr::NostrError;

/// Errors that can occur during relay operations.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Invalid relay URL.
    #[error("Invalid relay URL: {0}")]
    InvalidUrl(String),

    /// Tool parameters failed validation.
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    /// Every relay failed; one diagnostic line per relay.
    #[error("{summary}\n\nResults:\n{}", .diagnostics.join("\n"))]
    AllRelaysFailed {
        /// Human-readable summary of the failed operation.
        summary: String,
        /// `"<relay>: ok|fail (<reason>)"` lines, in relay order.
        diagnostics: Vec<String>,
    },

    /// Building or signing an event failed.
    #[error("Signing failed: {0}")]
    Signing(#[from] NostrError),
}

/// Result type for relay operations.
pub type RelayResult<T> = Result<T, RelayError>;
