//! Image pipeline module
//!
//! This module provides the pixel-level I/O of the measurement pipeline,
//! with separate modules for RAW10/RAW16 reading, TIFF writing, and conversion orchestration.

pub mod raw;
pub mod tiff;
pub mod conversions;
pub mod common;

pub use common::{
    PipelineError,
    Result,
};

pub use raw::{
    FrameLayout,
    FrameReader,
    PackedFrame,
    PackedLayout,
    PixelGrid,
    PixelWindow,
    Raw16Reader,
    unpack_raw10,
};

pub use tiff::{
    ConversionConfig,
    ConversionConfigBuilder,
    OutputFormat,
    StandardTiffWriter,
    TiffCompression,
    TiffWriter,
};

pub use conversions::{
    Raw10ConversionPipeline,
};
