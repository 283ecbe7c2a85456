//! Error types for fetching, loading, shifting and saving volumes.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShiftError {
    /// The requested data file is not in the registry.
    #[error("unknown data file: {0}")]
    UnknownDataFile(String),

    #[error("checksum mismatch for {name}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        name: String,
        expected: String,
        actual: String,
    },

    #[error("failed to download {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Nifti(#[from] nifti::error::NiftiError),

    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),

    /// The array does not have a dimensionality we can work with.
    #[error("expected a {expected} image, got {actual} dimensions")]
    Dimensionality { expected: String, actual: usize },

    #[error("volume index {index} is out of range for {len} volumes")]
    VolumeIndex { index: usize, len: usize },

    #[error("shift has {offsets} components but the volume has {ndim} dimensions")]
    OffsetLength { offsets: usize, ndim: usize },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, ShiftError>;
