//! Measurement pipeline for lens-flare characterization captures.
//!
//! [`image_pipeline`] decodes MIPI RAW10 and RAW16 sensor dumps into pixel
//! grids; [`analysis`] turns decoded frames and a ROI set into per-ROI
//! photo-response measurements and linear fits.

pub mod analysis;
pub mod image_pipeline;
pub mod logger;
