// src/error.rs

use std::fmt;
use std::io;

use image::ImageError;

/// Errors produced by the correlation-network pipeline. Every failure mode is
/// reported synchronously at the call that detects it; nothing in the library
/// retries or exits the process.
#[derive(Debug)]
pub enum CorrnetError {
    /// Malformed input: non-square or asymmetric matrix, too few nodes, or an
    /// out-of-range parameter.
    InvalidInput(String),
    /// The rolling window does not fit inside the available history.
    InsufficientData { rows: usize, window: usize },
    /// Unknown filter method name at the CLI seam.
    UnsupportedMethod(String),
    /// A correlation matrix that could not be repaired into positive
    /// semi-definite form within tolerance.
    NumericDegeneracy(String),
    Io(io::Error),
    Csv(csv::Error),
    Image(ImageError),
}

pub type Result<T> = std::result::Result<T, CorrnetError>;

impl fmt::Display for CorrnetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CorrnetError::InvalidInput(msg) => write!(f, "invalid input: {}", msg),
            CorrnetError::InsufficientData { rows, window } => write!(
                f,
                "insufficient data: window {} does not fit in {} rows",
                window, rows
            ),
            CorrnetError::UnsupportedMethod(name) => {
                write!(f, "unsupported filter method '{}'", name)
            }
            CorrnetError::NumericDegeneracy(msg) => write!(f, "numeric degeneracy: {}", msg),
            CorrnetError::Io(e) => write!(f, "IO error: {}", e),
            CorrnetError::Csv(e) => write!(f, "CSV error: {}", e),
            CorrnetError::Image(e) => write!(f, "image error: {}", e),
        }
    }
}

impl std::error::Error for CorrnetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CorrnetError::Io(e) => Some(e),
            CorrnetError::Csv(e) => Some(e),
            CorrnetError::Image(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for CorrnetError {
    fn from(e: io::Error) -> Self {
        CorrnetError::Io(e)
    }
}

impl From<csv::Error> for CorrnetError {
    fn from(e: csv::Error) -> Self {
        CorrnetError::Csv(e)
    }
}

impl From<ImageError> for CorrnetError {
    fn from(e: ImageError) -> Self {
        CorrnetError::Image(e)
    }
}
