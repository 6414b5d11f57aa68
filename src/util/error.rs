//! Error types for the CIFTI library.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for CIFTI assembly and the format codecs it relies on.
#[derive(Error, Debug)]
pub enum Error {
    /// Requested volume/surface target combination is not implemented
    #[error("Unsupported target space: volume={volume}, surface={surface}")]
    UnsupportedSpace { volume: String, surface: String },

    /// No annotation files for the surface target
    #[error("FreeSurfer annotations for {target} not found in {}", dir.display())]
    MissingAnnotation { target: String, dir: PathBuf },

    /// Label atlas is not present in the template directory
    #[error("Label atlas not found: {}", .0.display())]
    MissingAtlas(PathBuf),

    /// Expected label or category missing from a lookup table
    #[error("Lookup failed: {0}")]
    DataLookup(String),

    /// Spatial dimensions of two inputs disagree
    #[error("Shape mismatch: label volume {label:?} vs time series {series:?}")]
    ShapeMismatch { label: [usize; 3], series: [usize; 3] },

    /// A structure's time series has a different frame count than the rest
    #[error("Frame count mismatch in {structure}: expected {expected}, got {actual}")]
    FrameCountMismatch {
        structure: String,
        expected: usize,
        actual: usize,
    },

    /// Surface time series declares the other hemisphere
    #[error("Hemisphere mismatch for {}: expected {expected}, file declares {declared}", path.display())]
    HemisphereMismatch {
        path: PathBuf,
        expected: String,
        declared: String,
    },

    /// Output could not be written
    #[error("Write failed for {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File does not exist or cannot be accessed
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Invalid magic bytes at start of file
    #[error("Invalid magic bytes: {0:02x?}")]
    InvalidMagic(Vec<u8>),

    /// Invalid data structure in file
    #[error("Invalid file structure: {0}")]
    InvalidStructure(String),

    /// Voxel or array data type this crate cannot decode
    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(String),

    /// Configuration is malformed or inconsistent
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// XML could not be parsed
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Base64 payload could not be decoded
    #[error("Base64 error: {0}")]
    Base64(#[from] base64::DecodeError),

    /// JSON configuration could not be parsed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create an invalid structure error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidStructure(msg.into())
    }

    /// Create a lookup error.
    pub fn lookup(msg: impl Into<String>) -> Self {
        Self::DataLookup(msg.into())
    }

    /// Wrap an I/O error raised while producing `path`.
    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for CIFTI operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = Error::FrameCountMismatch {
            structure: "CIFTI_STRUCTURE_CORTEX_LEFT".into(),
            expected: 10,
            actual: 9,
        };
        let msg = e.to_string();
        assert!(msg.contains("CORTEX_LEFT"));
        assert!(msg.contains("10"));
        assert!(msg.contains("9"));

        let e = Error::ShapeMismatch { label: [2, 3, 4], series: [2, 3, 5] };
        assert!(e.to_string().contains("[2, 3, 5]"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
