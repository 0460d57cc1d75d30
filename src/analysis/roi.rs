//! Rectangular regions of interest and their persisted definition list.

use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::image_pipeline::common::error::{PipelineError, Result};
use crate::image_pipeline::raw::PixelWindow;

/// Default file name of the ROI list inside a run directory.
pub const ROI_FILENAME: &str = "rois.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoiCenter {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoiSize {
    pub width: i32,
    pub height: i32,
}

/// Top-left origin and size of a ROI rectangle, possibly extending past a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoiBounds {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// Result of intersecting a ROI with a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipOutcome {
    /// The ROI lies entirely inside the frame.
    Inside(PixelWindow),
    /// The ROI overlaps the frame edge; the window is the intersection.
    Truncated(PixelWindow),
    /// The ROI does not intersect the frame.
    Outside,
}

impl ClipOutcome {
    pub fn window(&self) -> Option<PixelWindow> {
        match self {
            ClipOutcome::Inside(window) | ClipOutcome::Truncated(window) => Some(*window),
            ClipOutcome::Outside => None,
        }
    }
}

/// A named rectangular measurement window, defined by its center and size.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Roi {
    center: RoiCenter,
    name: String,
    size: RoiSize,
}

/// Persisted shape of a ROI entry, validated into a [`Roi`] on load.
#[derive(Debug, Deserialize)]
struct RoiDefinition {
    name: String,
    center: RoiCenter,
    size: RoiSize,
}

impl Roi {
    pub fn new(name: impl Into<String>, center: (i32, i32), size: (i32, i32)) -> Result<Self> {
        let name = name.into();
        let (width, height) = size;
        if width <= 0 || height <= 0 {
            return Err(PipelineError::InvalidRoiDefinition(format!(
                "ROI {} has non-positive size {}x{}",
                name, width, height
            )));
        }
        let fits = |c: i32, extent: i32| {
            c.checked_sub(extent.div_euclid(2))
                .and_then(|origin| origin.checked_add(extent))
                .is_some()
        };
        if !fits(center.0, width) || !fits(center.1, height) {
            return Err(PipelineError::InvalidRoiDefinition(format!(
                "ROI {} centered at ({}, {}) with size {}x{} exceeds the coordinate range",
                name, center.0, center.1, width, height
            )));
        }
        Ok(Self {
            center: RoiCenter { x: center.0, y: center.1 },
            name,
            size: RoiSize { width, height },
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn center(&self) -> RoiCenter {
        self.center
    }

    pub fn size(&self) -> RoiSize {
        self.size
    }

    /// Origin is `center - size / 2` with floor division.
    pub fn bounds(&self) -> RoiBounds {
        RoiBounds {
            x: self.center.x - self.size.width.div_euclid(2),
            y: self.center.y - self.size.height.div_euclid(2),
            width: self.size.width,
            height: self.size.height,
        }
    }

    /// Intersects the ROI with a `frame_width` x `frame_height` frame.
    pub fn clip_to(&self, frame_width: usize, frame_height: usize) -> ClipOutcome {
        let bounds = self.bounds();
        let (x0, y0) = (bounds.x as i64, bounds.y as i64);
        let (x1, y1) = (x0 + bounds.width as i64, y0 + bounds.height as i64);
        let (fw, fh) = (frame_width as i64, frame_height as i64);

        if x1 <= 0 || y1 <= 0 || x0 >= fw || y0 >= fh {
            return ClipOutcome::Outside;
        }

        let window = PixelWindow {
            x0: x0.max(0) as usize,
            y0: y0.max(0) as usize,
            x1: x1.min(fw) as usize,
            y1: y1.min(fh) as usize,
        };
        if x0 < 0 || y0 < 0 || x1 > fw || y1 > fh {
            ClipOutcome::Truncated(window)
        } else {
            ClipOutcome::Inside(window)
        }
    }

    fn from_definition(definition: RoiDefinition) -> Result<Self> {
        Self::new(
            definition.name,
            (definition.center.x, definition.center.y),
            (definition.size.width, definition.size.height),
        )
    }
}

/// ROIs owned by a run: unique names, kept sorted by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoiSet {
    rois: Vec<Roi>,
}

impl RoiSet {
    pub fn new(rois: impl IntoIterator<Item = Roi>) -> Result<Self> {
        let mut rois: Vec<Roi> = rois.into_iter().collect();
        let mut seen = HashSet::new();
        for roi in &rois {
            if !seen.insert(roi.name()) {
                return Err(PipelineError::InvalidRoiDefinition(format!(
                    "duplicate ROI name {}",
                    roi.name()
                )));
            }
        }
        rois.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(Self { rois })
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let definitions: Vec<RoiDefinition> = serde_json::from_str(text)
            .map_err(|e| PipelineError::InvalidRoiDefinition(e.to_string()))?;
        let rois = definitions
            .into_iter()
            .map(Roi::from_definition)
            .collect::<Result<Vec<_>>>()?;
        Self::new(rois)
    }

    pub fn to_json(&self) -> Result<String> {
        let mut text = serde_json::to_string_pretty(&self.rois)?;
        text.push('\n');
        Ok(text)
    }

    /// Loads a ROI list; a missing file is [`PipelineError::NotFound`].
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => PipelineError::NotFound(path.to_path_buf()),
            _ => PipelineError::IoError(e),
        })?;
        let set = Self::from_json(&text)?;
        info!("Loaded {} ROIs from {}", set.len(), path.display());
        Ok(set)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        info!("Saved {} ROIs to {}", self.len(), path.display());
        Ok(())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Roi> {
        self.rois.iter()
    }

    pub fn get(&self, name: &str) -> Option<&Roi> {
        self.rois
            .binary_search_by(|roi| roi.name.as_str().cmp(name))
            .ok()
            .map(|index| &self.rois[index])
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.rois.iter().map(|roi| roi.name())
    }

    pub fn len(&self) -> usize {
        self.rois.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rois.is_empty()
    }

    pub fn as_slice(&self) -> &[Roi] {
        &self.rois
    }
}

impl<'a> IntoIterator for &'a RoiSet {
    type Item = &'a Roi;
    type IntoIter = std::slice::Iter<'a, Roi>;

    fn into_iter(self) -> Self::IntoIter {
        self.rois.iter()
    }
}

pub fn roi_file_path(run_root: &Path) -> PathBuf {
    run_root.join(ROI_FILENAME)
}

/// Loads the ROI list of a run directory, or an empty set if none was saved yet.
pub fn load_run_rois(run_root: &Path) -> Result<RoiSet> {
    match RoiSet::load(&roi_file_path(run_root)) {
        Err(PipelineError::NotFound(path)) => {
            warn!("No ROI definitions at {}", path.display());
            Ok(RoiSet::default())
        }
        other => other,
    }
}

pub fn save_run_rois(run_root: &Path, rois: &RoiSet) -> Result<PathBuf> {
    let path = roi_file_path(run_root);
    rois.save(&path)?;
    Ok(path)
}
