use std::path::PathBuf;

use crate::pixels::Shape;

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Rejected tolerance values, reported once when a comparator is constructed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("zero_threshold must be a finite, non-negative number (got {value})")]
    ZeroThreshold { value: f64 },

    #[error("rel_err must be a finite number in [0, 1] (got {value})")]
    RelErr { value: f64 },
}

/// The codec could not turn a file into a pixel array.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported or corrupt image {}: {message}", .path.display())]
    Format { path: PathBuf, message: String },
}

/// The decoding capability itself is missing; detected once per comparator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{reason}")]
pub struct CapabilityError {
    pub reason: String,
}

impl CapabilityError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// One diagnosed problem with a comparison. The `Display` output is the message handed back to
/// the harness.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Failure {
    #[error("output file name must be relative: {}", .path.display())]
    InvalidName { path: PathBuf },

    #[error("Test file does not exist: {}", .path.display())]
    MissingTestFile { path: PathBuf },

    #[error("Gold file does not exist: {}", .path.display())]
    MissingGoldFile { path: PathBuf },

    #[error("unrecognized image format: {}", .path.display())]
    Decode { path: PathBuf },

    #[error("Gold and test image are not the same shape: {gold}, {test}")]
    ShapeMismatch { gold: Shape, test: Shape },

    #[error(
        "Difference between images is too large: {:.2} pct (allowable: {:.2})",
        100.0 * .observed,
        100.0 * .allowed
    )]
    ThresholdExceeded { observed: f64, allowed: f64 },

    #[error("image decoding is unavailable: {0}")]
    CodecUnavailable(CapabilityError),

    #[error("invalid comparison options: {0}")]
    InvalidOptions(ConfigError),
}
