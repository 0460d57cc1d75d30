//! RAW frame reading module
//!
//! This module provides the RAW10 unpacker and the RAW16 frame loader.

mod reader;
mod raw16_reader;
pub mod raw10;
pub mod types;

pub use reader::FrameReader;
pub use raw16_reader::{Raw16Reader, decode_raw16, encode_raw16};
pub use raw10::{pack_raw10, unpack_raw10, RAW10_MAX};
pub use types::{FrameLayout, PackedFrame, PackedLayout, PixelGrid, PixelWindow};
