use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Input buffer too small: expected at least {expected} bytes, got {actual}")]
    InputSizeMismatch { expected: usize, actual: usize },

    #[error("Inconsistent frame configuration: {0}")]
    ConfigurationInconsistency(String),

    #[error("File not found: {0}")]
    NotFound(PathBuf),

    #[error("ROI {roi} lies outside the {frame_width}x{frame_height} frame")]
    GeometryOutOfBounds {
        roi: String,
        frame_width: usize,
        frame_height: usize,
    },

    #[error("Invalid ROI definition: {0}")]
    InvalidRoiDefinition(String),

    #[error("At least one capture record is required")]
    EmptyBatch,

    #[error("Invalid image dimensions: width={0}, height={1}")]
    InvalidDimensions(usize, usize),

    #[error("Failed to encode TIFF image: {0}")]
    EncodeError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
