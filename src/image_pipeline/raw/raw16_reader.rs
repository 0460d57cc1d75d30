//! Reader for unpacked RAW16 frames.
//!
//! RAW16 files carry no header: they are a flat run of little-endian 16-bit
//! samples, `stride` samples per row, with dimensions supplied by the caller.

use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

use tracing::debug;

use crate::image_pipeline::common::error::{PipelineError, Result};
use crate::image_pipeline::raw::reader::FrameReader;
use crate::image_pipeline::raw::types::{checked_product, FrameLayout, PixelGrid};

const BYTES_PER_SAMPLE: usize = 2;

/// Frame reader for headerless RAW16 files.
#[derive(Debug, Clone, Copy, Default)]
pub struct Raw16Reader;

impl FrameReader for Raw16Reader {
    /// Reads a RAW16 file and trims each row to `layout.width` samples.
    ///
    /// # Errors
    ///
    /// * [`PipelineError::NotFound`] if `path` does not exist
    /// * [`PipelineError::InputSizeMismatch`] if the file holds fewer than
    ///   `stride * height` samples
    /// * [`PipelineError::ConfigurationInconsistency`] if the stride is narrower than the width
    fn read_frame(&self, path: &Path, layout: &FrameLayout) -> Result<PixelGrid> {
        let bytes = {
            let mut file = File::open(path).map_err(|e| match e.kind() {
                ErrorKind::NotFound => PipelineError::NotFound(path.to_path_buf()),
                _ => PipelineError::IoError(e),
            })?;
            let mut bytes = Vec::new();
            file.read_to_end(&mut bytes)?;
            bytes
        };
        debug!("Read RAW16 frame {}, {} bytes", path.display(), bytes.len());
        decode_raw16(&bytes, layout)
    }
}

/// Interprets `bytes` as little-endian RAW16 samples laid out per `layout`.
pub fn decode_raw16(bytes: &[u8], layout: &FrameLayout) -> Result<PixelGrid> {
    let (width, height) = (layout.width, layout.height);
    if width == 0 || height == 0 {
        return Err(PipelineError::InvalidDimensions(width, height));
    }
    let stride = layout.effective_stride();
    if stride < width {
        return Err(PipelineError::ConfigurationInconsistency(format!(
            "stride of {} pixels is narrower than width {}",
            stride, width
        )));
    }

    let required = checked_product(&[stride, height, BYTES_PER_SAMPLE])?;
    if bytes.len() < required {
        return Err(PipelineError::InputSizeMismatch {
            expected: required,
            actual: bytes.len(),
        });
    }

    let row_bytes = stride * BYTES_PER_SAMPLE;
    let mut data = Vec::with_capacity(width * height);
    for row in bytes[..required].chunks_exact(row_bytes) {
        data.extend(
            row[..width * BYTES_PER_SAMPLE]
                .chunks_exact(BYTES_PER_SAMPLE)
                .map(|pair| u16::from_le_bytes([pair[0], pair[1]])),
        );
    }
    PixelGrid::new(width, height, data)
}

/// Serialises a grid as little-endian RAW16 bytes with no row padding.
pub fn encode_raw16(grid: &PixelGrid) -> Vec<u8> {
    grid.data().iter().flat_map(|&v| v.to_le_bytes()).collect()
}
