//! TIFF writing module
//!
//! This module provides 16-bit grayscale TIFF output for decoded and masked frames.

mod writer;
mod standard_tiff_writer;
pub mod types;

pub use writer::TiffWriter;
pub use standard_tiff_writer::StandardTiffWriter;
pub use types::{ConversionConfig, ConversionConfigBuilder, OutputFormat, TiffCompression};
