//! Error types for the fabric forwarding application.

use fabric_types::Dpid;
use thiserror::Error;

/// A message could not be written to a switch.
///
/// Logged by whoever hit it and abandoned; nothing in this crate retries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SwitchIoError {
    #[error("switch {0} is disconnected")]
    Disconnected(Dpid),

    #[error("write to switch {dpid} failed: {reason}")]
    WriteFailed { dpid: Dpid, reason: String },
}

/// Errors surfaced by the application outside the per-packet path.
#[derive(Debug, Error)]
pub enum FabricError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for fabric operations.
pub type Result<T> = std::result::Result<T, FabricError>;
