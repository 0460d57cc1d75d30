use std::path::Path;

use crate::image_pipeline::common::error::Result;
use crate::image_pipeline::raw::types::{FrameLayout, PixelGrid};

pub trait FrameReader {
    fn read_frame(&self, path: &Path, layout: &FrameLayout) -> Result<PixelGrid>;
}
