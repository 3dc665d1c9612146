//! Codec error definitions.

use std::fmt;

use super::{MAX_RESOLUTION, MIN_RESOLUTION};

/// Errors reported by the strict codec entry points.
///
/// The permissive entry points (`build`, `split`, the steppers) clamp
/// out-of-range resolutions instead of failing; callers that need
/// validation go through [`check_resolution`](super::check_resolution)
/// and [`from_hex`](super::from_hex), which surface these.
#[derive(Debug, Clone, PartialEq)]
pub enum CodecError {
    /// Resolution is odd or outside the valid range (2 to 32)
    InvalidResolution(u32),
    /// Cell text is empty, too long, or contains non-hex characters
    InvalidHex(String),
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::InvalidResolution(resolution) => {
                write!(
                    f,
                    "Invalid resolution: {} (must be even, between {} and {})",
                    resolution, MIN_RESOLUTION, MAX_RESOLUTION
                )
            }
            CodecError::InvalidHex(text) => {
                write!(
                    f,
                    "Invalid cell text: '{}' (must be 1 to 16 hex digits)",
                    text
                )
            }
        }
    }
}

impl std::error::Error for CodecError {}
