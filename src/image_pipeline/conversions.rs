//! Pipeline conversions module
//!
//! This module contains orchestration logic for RAW10 frame conversion.

mod raw10_to_raw16;

pub use raw10_to_raw16::Raw10ConversionPipeline;
