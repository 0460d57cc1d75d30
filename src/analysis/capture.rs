//! Capture records: one exposure of one illumination/sequence sweep.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::image_pipeline::common::error::{PipelineError, Result};
use crate::image_pipeline::raw::FrameLayout;

/// Where the RAW16 frames of a capture live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameSource {
    /// Every file in the directory whose extension is accepted.
    Directory(PathBuf),
    /// An explicit list of frame files.
    Files(Vec<PathBuf>),
}

/// Immutable description of a single exposure capture.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureRecord {
    illumination: String,
    sequence: String,
    exposure_us: u64,
    frames: FrameSource,
    layout: FrameLayout,
    metadata: Value,
}

impl CaptureRecord {
    pub fn new(
        illumination: impl Into<String>,
        sequence: impl Into<String>,
        exposure_us: u64,
        frames: FrameSource,
        layout: FrameLayout,
    ) -> Result<Self> {
        if exposure_us == 0 {
            return Err(PipelineError::ConfigurationInconsistency(
                "exposure time must be positive".to_string(),
            ));
        }
        Ok(Self {
            illumination: illumination.into(),
            sequence: sequence.into(),
            exposure_us,
            frames,
            layout,
            metadata: Value::Null,
        })
    }

    /// Attaches the capture metadata used to derive the ND factor.
    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn illumination(&self) -> &str {
        &self.illumination
    }

    pub fn sequence(&self) -> &str {
        &self.sequence
    }

    pub fn exposure_us(&self) -> u64 {
        self.exposure_us
    }

    pub fn frames(&self) -> &FrameSource {
        &self.frames
    }

    pub fn layout(&self) -> &FrameLayout {
        &self.layout
    }

    pub fn metadata(&self) -> &Value {
        &self.metadata
    }

    /// Human-readable location of the frames, for logs.
    pub fn location(&self) -> PathBuf {
        match &self.frames {
            FrameSource::Directory(dir) => dir.clone(),
            FrameSource::Files(files) => files
                .first()
                .and_then(|f| f.parent())
                .map(Path::to_path_buf)
                .unwrap_or_default(),
        }
    }

    /// Frame files in lexicographic path order.
    ///
    /// A missing frame directory is [`PipelineError::NotFound`]; `extensions`
    /// are matched case-insensitively and only apply to directory sources.
    pub fn list_frames(&self, extensions: &[String]) -> Result<Vec<PathBuf>> {
        let mut frames = match &self.frames {
            FrameSource::Directory(dir) => {
                if !dir.is_dir() {
                    return Err(PipelineError::NotFound(dir.clone()));
                }
                let mut frames = Vec::new();
                for entry in std::fs::read_dir(dir)? {
                    let path = entry?.path();
                    if path.is_file() && has_extension(&path, extensions) {
                        frames.push(path);
                    }
                }
                frames
            }
            FrameSource::Files(files) => files.clone(),
        };
        frames.sort();
        debug!(
            "Found {} frames for {}/{}/{}us",
            frames.len(),
            self.illumination,
            self.sequence,
            self.exposure_us
        );
        Ok(frames)
    }
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| extensions.iter().any(|accepted| accepted.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}
