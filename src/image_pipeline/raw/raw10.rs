//! MIPI RAW10 unpacking.
//!
//! Every group of five packed bytes carries four 10-bit pixels: bytes 0..4
//! hold the eight most significant bits of pixels 0..4 and byte 4 holds the
//! two least significant bits of each pixel at bit offsets 0, 2, 4 and 6.

use tracing::debug;

use crate::image_pipeline::common::error::{PipelineError, Result};
use crate::image_pipeline::raw::types::{checked_product, PackedFrame, PixelGrid};

/// Bytes in one packed group.
pub const GROUP_BYTES: usize = 5;
/// Pixels in one packed group.
pub const GROUP_PIXELS: usize = 4;
/// Largest value a RAW10 sample can take.
pub const RAW10_MAX: u16 = 1023;

#[inline]
fn unpack_group(group: &[u8]) -> [u16; GROUP_PIXELS] {
    let low_bits = group[4] as u16;
    let mut pixels = [0u16; GROUP_PIXELS];
    for (i, pixel) in pixels.iter_mut().enumerate() {
        *pixel = ((group[i] as u16) << 2) | ((low_bits >> (2 * i)) & 0b11);
    }
    debug_assert!(pixels.iter().all(|&p| p <= RAW10_MAX));
    pixels
}

/// Unpacks a RAW10 frame into a grid of `width * height` samples in `[0, 1023]`.
///
/// With a row stride the payload is read as `height` rows of `stride` bytes,
/// of which only the first `floor(stride / 5) * 5` bytes are pixel data and
/// only the first `width` unpacked columns are kept. Without a stride the
/// payload is one contiguous stream of `width * height * 5 / 4` bytes.
///
/// The required payload length is checked before any byte is read, so a
/// short buffer yields [`PipelineError::InputSizeMismatch`] and never partial data.
pub fn unpack_raw10(frame: &PackedFrame<'_>) -> Result<PixelGrid> {
    let layout = frame.layout;
    let (width, height) = (layout.width, layout.height);
    if width == 0 || height == 0 {
        return Err(PipelineError::InvalidDimensions(width, height));
    }

    let payload = frame.data.get(layout.header_bytes..).unwrap_or(&[]);

    let data = match layout.stride_bytes {
        Some(stride) if stride > 0 => unpack_strided(payload, width, height, stride)?,
        _ => unpack_contiguous(payload, width, height)?,
    };

    debug!(
        "Unpacked RAW10 frame {}x{} ({} payload bytes)",
        width,
        height,
        payload.len()
    );
    PixelGrid::new(width, height, data)
}

fn unpack_contiguous(payload: &[u8], width: usize, height: usize) -> Result<Vec<u16>> {
    let pixel_count = checked_product(&[width, height])?;
    let required = checked_product(&[pixel_count, GROUP_BYTES])?.div_ceil(GROUP_PIXELS);
    if payload.len() < required {
        return Err(PipelineError::InputSizeMismatch {
            expected: required,
            actual: payload.len(),
        });
    }
    if pixel_count % GROUP_PIXELS != 0 {
        return Err(PipelineError::ConfigurationInconsistency(format!(
            "{}x{} pixels do not fill whole RAW10 groups; a row stride is required",
            width, height
        )));
    }

    let mut data = Vec::with_capacity(pixel_count);
    for group in payload[..required].chunks_exact(GROUP_BYTES) {
        data.extend_from_slice(&unpack_group(group));
    }
    Ok(data)
}

fn unpack_strided(payload: &[u8], width: usize, height: usize, stride: usize) -> Result<Vec<u16>> {
    let required = checked_product(&[stride, height])?;
    if payload.len() < required {
        return Err(PipelineError::InputSizeMismatch {
            expected: required,
            actual: payload.len(),
        });
    }

    let packed_row = stride / GROUP_BYTES * GROUP_BYTES;
    let row_pixels = packed_row / GROUP_BYTES * GROUP_PIXELS;
    if row_pixels < width {
        return Err(PipelineError::ConfigurationInconsistency(format!(
            "stride of {} bytes holds {} pixels, fewer than width {}",
            stride, row_pixels, width
        )));
    }

    let mut data = Vec::with_capacity(width * height);
    let mut row_buf = Vec::with_capacity(row_pixels);
    for row in payload[..required].chunks_exact(stride) {
        row_buf.clear();
        for group in row[..packed_row].chunks_exact(GROUP_BYTES) {
            row_buf.extend_from_slice(&unpack_group(group));
        }
        data.extend_from_slice(&row_buf[..width]);
    }
    Ok(data)
}

/// Packs samples into RAW10 groups; the inverse of [`unpack_raw10`] for
/// contiguous streams. Samples above 1023 are clamped.
pub fn pack_raw10(samples: &[u16]) -> Vec<u8> {
    let mut packed = Vec::with_capacity(samples.len().div_ceil(GROUP_PIXELS) * GROUP_BYTES);
    for chunk in samples.chunks(GROUP_PIXELS) {
        let mut low_bits = 0u8;
        for i in 0..GROUP_PIXELS {
            let value = chunk.get(i).copied().unwrap_or(0).min(RAW10_MAX);
            packed.push((value >> 2) as u8);
            low_bits |= ((value & 0b11) as u8) << (2 * i);
        }
        packed.push(low_bits);
    }
    packed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_pipeline::raw::types::PackedLayout;

    fn required_len(width: usize, height: usize, stride: Option<usize>) -> usize {
        match stride {
            Some(s) => s * height,
            None => (width * height * 5).div_ceil(4),
        }
    }

    fn layout(width: usize, height: usize, stride: Option<usize>) -> PackedLayout {
        let layout = PackedLayout::new(width, height);
        match stride {
            Some(s) => layout.with_stride(s),
            None => layout,
        }
    }

    #[test]
    fn test_single_group_bit_layout() {
        // low bits: p0=0b01, p1=0b10, p2=0b11, p3=0b00
        let bytes = [0x10, 0x20, 0x30, 0xFF, 0b00_11_10_01];
        let frame = PackedFrame::new(&bytes, PackedLayout::new(4, 1));
        let grid = unpack_raw10(&frame).unwrap();
        assert_eq!(grid.data(), &[0x10 << 2 | 1, 0x20 << 2 | 2, 0x30 << 2 | 3, 0xFF << 2]);
    }

    #[test]
    fn test_max_value_is_1023() {
        let bytes = [0xFF; 5];
        let frame = PackedFrame::new(&bytes, PackedLayout::new(4, 1));
        let grid = unpack_raw10(&frame).unwrap();
        assert_eq!(grid.data(), &[RAW10_MAX; 4]);
    }

    #[test]
    fn test_high_bits_survive_when_low_bits_zero() {
        let cases = [(8, 2, None), (8, 3, Some(10)), (6, 2, Some(12)), (4, 4, Some(7))];
        for (width, height, stride) in cases {
            let len = required_len(width, height, stride);
            let bytes: Vec<u8> = (0..len)
                .map(|i| {
                    let offset = stride.map_or(i, |s| i % s);
                    if offset % 5 == 4 { 0 } else { (i * 37 % 256) as u8 }
                })
                .collect();
            let frame = PackedFrame::new(&bytes, layout(width, height, stride));
            let grid = unpack_raw10(&frame).unwrap();
            assert_eq!(grid.data().len(), width * height);

            let row_bytes = stride.unwrap_or(width / 4 * 5);
            for y in 0..height {
                for x in 0..width {
                    let value = grid.get(x, y).unwrap();
                    assert!(value <= RAW10_MAX);
                    let byte_index = match stride {
                        Some(_) => y * row_bytes + x / 4 * 5 + x % 4,
                        None => (y * width + x) / 4 * 5 + (y * width + x) % 4,
                    };
                    assert_eq!(value >> 2, bytes[byte_index] as u16);
                    assert_eq!(value & 0b11, 0);
                }
            }
        }
    }

    #[test]
    fn test_every_value_in_range_for_arbitrary_bytes() {
        let bytes: Vec<u8> = (0..200).map(|i| (i * 131 % 256) as u8).collect();
        let frame = PackedFrame::new(&bytes, PackedLayout::new(16, 10));
        let grid = unpack_raw10(&frame).unwrap();
        assert!(grid.data().iter().all(|&v| v <= RAW10_MAX));
    }

    #[test]
    fn test_one_byte_short_fails() {
        let cases = [
            (4, 1, None),
            (6, 1, None),
            (3, 3, None),
            (8, 2, None),
            (8, 3, Some(10)),
            (6, 2, Some(12)),
            (2328, 4, Some(2912)),
            (4, 4, Some(7)),
        ];
        for (width, height, stride) in cases {
            let len = required_len(width, height, stride) - 1;
            let bytes = vec![0u8; len];
            let frame = PackedFrame::new(&bytes, layout(width, height, stride));
            let result = unpack_raw10(&frame);
            assert!(
                matches!(result, Err(PipelineError::InputSizeMismatch { .. })),
                "expected size mismatch for {}x{} stride {:?}",
                width,
                height,
                stride
            );
        }
    }

    #[test]
    fn test_header_is_skipped() {
        let mut bytes = vec![0xAA, 0xBB, 0xCC];
        bytes.extend_from_slice(&[1, 2, 3, 4, 0]);
        let frame = PackedFrame::new(&bytes, PackedLayout::new(4, 1).with_header(3));
        let grid = unpack_raw10(&frame).unwrap();
        assert_eq!(grid.data(), &[4, 8, 12, 16]);
    }

    #[test]
    fn test_header_larger_than_buffer() {
        let bytes = [0u8; 4];
        let frame = PackedFrame::new(&bytes, PackedLayout::new(4, 1).with_header(10));
        assert!(matches!(
            unpack_raw10(&frame),
            Err(PipelineError::InputSizeMismatch { expected: 5, actual: 0 })
        ));
    }

    #[test]
    fn test_stride_padding_and_trim() {
        // 2 rows, stride 12 bytes: 10 bytes of pixel data (8 px) + 2 padding; width 6
        let mut bytes = Vec::new();
        for row in 0..2u8 {
            let samples: Vec<u16> = (0..8).map(|i| (row as u16) * 100 + i * 4 + 1).collect();
            bytes.extend(pack_raw10(&samples));
            bytes.extend_from_slice(&[0xEE, 0xEE]);
        }
        let frame = PackedFrame::new(&bytes, PackedLayout::new(6, 2).with_stride(12));
        let grid = unpack_raw10(&frame).unwrap();
        assert_eq!(grid.row(0).unwrap(), &[1, 5, 9, 13, 17, 21]);
        assert_eq!(grid.row(1).unwrap(), &[101, 105, 109, 113, 117, 121]);
    }

    #[test]
    fn test_stride_too_narrow_for_width() {
        let bytes = vec![0u8; 20];
        let frame = PackedFrame::new(&bytes, PackedLayout::new(8, 2).with_stride(9));
        assert!(matches!(
            unpack_raw10(&frame),
            Err(PipelineError::ConfigurationInconsistency(_))
        ));
    }

    #[test]
    fn test_zero_stride_means_contiguous() {
        let samples: Vec<u16> = (0..8).map(|i| i * 100).collect();
        let bytes = pack_raw10(&samples);
        let frame = PackedFrame::new(&bytes, PackedLayout::new(4, 2).with_stride(0));
        assert_eq!(unpack_raw10(&frame).unwrap().data(), samples.as_slice());
    }

    #[test]
    fn test_contiguous_requires_whole_groups() {
        let bytes = vec![0u8; 20];
        let frame = PackedFrame::new(&bytes, PackedLayout::new(3, 3));
        assert!(matches!(
            unpack_raw10(&frame),
            Err(PipelineError::ConfigurationInconsistency(_))
        ));
    }

    #[test]
    fn test_overflowing_geometry_is_rejected() {
        let bytes = [0u8; 64];
        let layouts = [
            PackedLayout::new(usize::MAX / 2, 4),
            PackedLayout::new(usize::MAX / 2, 4).with_stride(usize::MAX / 3),
            PackedLayout::new(8, usize::MAX).with_stride(10),
        ];
        for layout in layouts {
            let frame = PackedFrame::new(&bytes, layout);
            assert!(matches!(
                unpack_raw10(&frame),
                Err(PipelineError::ConfigurationInconsistency(_))
            ));
        }
    }

    #[test]
    fn test_pack_clamps_out_of_range() {
        let packed = pack_raw10(&[2000, 0, 0, 0]);
        let frame = PackedFrame::new(&packed, PackedLayout::new(4, 1));
        assert_eq!(unpack_raw10(&frame).unwrap().data()[0], RAW10_MAX);
    }
}
