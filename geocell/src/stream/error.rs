//! Error type for the streaming coverage pipeline.
//!
//! The streaming set algebra is the only part of the crate doing real
//! I/O, so failures here surface to the caller instead of being
//! recovered locally: a half-written cell dump is not safely
//! resumable.

/// Errors raised while sorting, combining or converting cell streams.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid cell line {line:?}")]
    InvalidCell { line: String },
}
