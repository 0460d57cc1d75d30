//! Pixel buffer and frame geometry types

use crate::image_pipeline::common::error::{PipelineError, Result};

/// Multiplies geometry factors, rejecting products that do not fit in `usize`.
pub(crate) fn checked_product(factors: &[usize]) -> Result<usize> {
    factors
        .iter()
        .try_fold(1usize, |acc, &f| acc.checked_mul(f))
        .ok_or_else(|| {
            PipelineError::ConfigurationInconsistency(format!(
                "frame geometry {:?} overflows the addressable size",
                factors
            ))
        })
}

/// Decoded single-channel frame of 16-bit samples, row-major.
///
/// The buffer always holds exactly `width * height` samples; any row
/// stride padding is trimmed before a grid is constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelGrid {
    width: usize,
    height: usize,
    data: Vec<u16>,
}

impl PixelGrid {
    pub fn new(width: usize, height: usize, data: Vec<u16>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(PipelineError::InvalidDimensions(width, height));
        }
        let expected = checked_product(&[width, height])?;
        if data.len() != expected {
            return Err(PipelineError::InputSizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { width, height, data })
    }

    /// Grid filled with a single value.
    pub fn filled(width: usize, height: usize, value: u16) -> Result<Self> {
        let len = checked_product(&[width, height])?;
        Self::new(width, height, vec![value; len])
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn data(&self) -> &[u16] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u16> {
        self.data
    }

    pub fn get(&self, x: usize, y: usize) -> Option<u16> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.data[y * self.width + x])
    }

    pub fn row(&self, y: usize) -> Option<&[u16]> {
        if y >= self.height {
            return None;
        }
        let start = y * self.width;
        Some(&self.data[start..start + self.width])
    }

    /// Arithmetic mean of the samples inside `window`.
    ///
    /// Returns `None` when the window is empty or not fully contained in the grid.
    pub fn window_mean(&self, window: &PixelWindow) -> Option<f64> {
        if window.is_empty() || window.x1 > self.width || window.y1 > self.height {
            return None;
        }
        let sum: u64 = (window.y0..window.y1)
            .map(|y| {
                let start = y * self.width;
                self.data[start + window.x0..start + window.x1]
                    .iter()
                    .map(|&v| v as u64)
                    .sum::<u64>()
            })
            .sum();
        Some(sum as f64 / window.area() as f64)
    }

    /// Copy of this grid with every sample inside `window` replaced by `value`.
    pub fn with_window_filled(&self, window: &PixelWindow, value: u16) -> Self {
        let mut data = self.data.clone();
        let x1 = window.x1.min(self.width);
        let y1 = window.y1.min(self.height);
        for y in window.y0.min(y1)..y1 {
            let start = y * self.width;
            data[start + window.x0.min(x1)..start + x1].fill(value);
        }
        Self {
            width: self.width,
            height: self.height,
            data,
        }
    }
}

/// Half-open pixel rectangle `[x0, x1) x [y0, y1)` in frame coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelWindow {
    pub x0: usize,
    pub y0: usize,
    pub x1: usize,
    pub y1: usize,
}

impl PixelWindow {
    pub fn width(&self) -> usize {
        self.x1.saturating_sub(self.x0)
    }

    pub fn height(&self) -> usize {
        self.y1.saturating_sub(self.y0)
    }

    pub fn area(&self) -> usize {
        self.width() * self.height()
    }

    pub fn is_empty(&self) -> bool {
        self.area() == 0
    }
}

/// Geometry of an unpacked RAW16 frame file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLayout {
    /// Width of the image in pixels
    pub width: usize,
    /// Height of the image in pixels
    pub height: usize,
    /// Row stride in pixels; `None` means rows are exactly `width` samples
    pub stride: Option<usize>,
}

impl FrameLayout {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            stride: None,
        }
    }

    pub fn with_stride(mut self, stride: usize) -> Self {
        self.stride = Some(stride);
        self
    }

    pub fn effective_stride(&self) -> usize {
        match self.stride {
            Some(stride) if stride > 0 => stride,
            _ => self.width,
        }
    }
}

/// Geometry of a MIPI RAW10 packed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackedLayout {
    /// Width of the image in pixels
    pub width: usize,
    /// Height of the image in pixels
    pub height: usize,
    /// Row stride in bytes; `None` or zero means rows are packed back to back
    pub stride_bytes: Option<usize>,
    /// Number of leading bytes to skip before the pixel payload
    pub header_bytes: usize,
}

impl PackedLayout {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            stride_bytes: None,
            header_bytes: 0,
        }
    }

    pub fn with_stride(mut self, stride_bytes: usize) -> Self {
        self.stride_bytes = Some(stride_bytes);
        self
    }

    pub fn with_header(mut self, header_bytes: usize) -> Self {
        self.header_bytes = header_bytes;
        self
    }
}

/// Borrowed RAW10 byte stream together with its declared layout.
#[derive(Debug, Clone, Copy)]
pub struct PackedFrame<'a> {
    pub data: &'a [u8],
    pub layout: PackedLayout,
}

impl<'a> PackedFrame<'a> {
    pub fn new(data: &'a [u8], layout: PackedLayout) -> Self {
        Self { data, layout }
    }
}
