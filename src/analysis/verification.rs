//! ROI verification frames: a capture frame with every ROI window zeroed,
//! so the placement of the ROI set can be checked visually.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::analysis::capture::CaptureRecord;
use crate::analysis::diagnostics::AnalysisWarning;
use crate::analysis::roi::{ClipOutcome, RoiSet};
use crate::image_pipeline::common::error::{PipelineError, Result};
use crate::image_pipeline::raw::{FrameReader, PixelGrid};
use crate::image_pipeline::tiff::{ConversionConfig, TiffWriter};

#[derive(Debug, Clone)]
pub struct RoiVerification {
    pub masked: PixelGrid,
    /// Clip outcome per ROI, in ROI name order
    pub outcomes: Vec<(String, ClipOutcome)>,
}

/// Zeroes every ROI window of `frame`, clipping ROIs that cross the frame edge.
pub fn mask_rois(frame: &PixelGrid, rois: &RoiSet) -> RoiVerification {
    let mut masked = frame.clone();
    let mut outcomes = Vec::with_capacity(rois.len());
    for roi in rois {
        let outcome = roi.clip_to(frame.width(), frame.height());
        match outcome {
            ClipOutcome::Outside => {
                warn!("ROI {} lies completely outside the frame and will be ignored", roi.name());
            }
            ClipOutcome::Truncated(window) => {
                warn!("ROI {} extends beyond frame bounds; clipping to valid region", roi.name());
                masked = masked.with_window_filled(&window, 0);
            }
            ClipOutcome::Inside(window) => {
                masked = masked.with_window_filled(&window, 0);
            }
        }
        outcomes.push((roi.name().to_string(), outcome));
    }
    RoiVerification { masked, outcomes }
}

/// File name for a record's verification frame, e.g. `LED_white_sweep_1000us.tiff`.
pub fn verification_file_name(record: &CaptureRecord) -> String {
    format!(
        "{}_{}_{}us.tiff",
        slugify(record.illumination()),
        slugify(record.sequence()),
        record.exposure_us()
    )
}

fn slugify(component: &str) -> String {
    component
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

/// Directory under the run root holding verification frames.
pub const VERIFICATION_DIRNAME: &str = "roi_verification";
/// Markdown index of verification frames, kept at the run root.
pub const VERIFICATION_INDEX_FILENAME: &str = "roi_verification.md";

/// One line of the verification index.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct VerificationEntry {
    pub illumination: String,
    pub sequence: String,
    pub exposure_us: u64,
    /// Frame path relative to the run root when possible
    pub path: PathBuf,
}

/// Renders the index sorted by illumination, sequence, then exposure.
pub fn render_verification_index(entries: &[VerificationEntry]) -> String {
    let mut sorted: Vec<&VerificationEntry> = entries.iter().collect();
    sorted.sort();

    let mut text = String::from("# ROI Verification Images\n\n");
    for entry in sorted {
        let link = entry
            .path
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        text.push_str(&format!(
            "- **{} / {} / {}\u{00b5}s**: [{}]({})\n",
            entry.illumination, entry.sequence, entry.exposure_us, link, link
        ));
    }
    text
}

/// Writes `run_root/roi_verification.md` and returns its path.
pub fn write_verification_index(run_root: &Path, entries: &[VerificationEntry]) -> Result<PathBuf> {
    std::fs::create_dir_all(run_root)?;
    let path = run_root.join(VERIFICATION_INDEX_FILENAME);
    std::fs::write(&path, render_verification_index(entries))?;
    info!("Updated ROI verification report at {}", path.display());
    Ok(path)
}

/// Writes ROI verification frames for capture records.
pub struct RoiVerifier<R: FrameReader, W: TiffWriter> {
    reader: R,
    writer: W,
    config: ConversionConfig,
    frame_extensions: Vec<String>,
}

impl<R: FrameReader, W: TiffWriter> RoiVerifier<R, W> {
    pub fn new(reader: R, writer: W, config: ConversionConfig, frame_extensions: Vec<String>) -> Self {
        Self {
            reader,
            writer,
            config,
            frame_extensions,
        }
    }

    /// Picks the second frame of the record when there is one, so the check
    /// does not reuse the frame the ROIs were drawn on.
    pub fn select_frame(&self, record: &CaptureRecord) -> Result<PathBuf> {
        let frames = record.list_frames(&self.frame_extensions)?;
        match frames.len() {
            0 => Err(PipelineError::NotFound(record.location())),
            1 => Ok(frames[0].clone()),
            _ => Ok(frames[1].clone()),
        }
    }

    /// Masks the ROIs on a frame of `record` and writes the result as TIFF
    /// into `output_dir`. Returns the written path and any skipped ROIs.
    pub fn verify_record(
        &self,
        record: &CaptureRecord,
        rois: &RoiSet,
        output_dir: &Path,
    ) -> Result<(PathBuf, Vec<AnalysisWarning>)> {
        if rois.is_empty() {
            return Err(PipelineError::InvalidRoiDefinition(
                "ROI verification requires at least one ROI".to_string(),
            ));
        }
        let frame_path = self.select_frame(record)?;
        info!("Generating ROI verification image from {}", frame_path.display());
        let frame = self.reader.read_frame(&frame_path, record.layout())?;
        let verification = mask_rois(&frame, rois);

        let warnings = verification
            .outcomes
            .iter()
            .filter_map(|(roi, outcome)| {
                let roi = roi.clone();
                let path = frame_path.clone();
                match outcome {
                    ClipOutcome::Outside => Some(AnalysisWarning::RoiOutsideFrame { roi, path }),
                    ClipOutcome::Truncated(_) => Some(AnalysisWarning::RoiTruncated { roi, path }),
                    ClipOutcome::Inside(_) => None,
                }
            })
            .collect();

        std::fs::create_dir_all(output_dir)?;
        let output_path = output_dir.join(verification_file_name(record));
        let mut encoded = Vec::new();
        self.writer.write_tiff(&verification.masked, &mut encoded, &self.config)?;
        std::fs::write(&output_path, encoded)?;
        info!("Wrote ROI verification frame to {}", output_path.display());
        Ok((output_path, warnings))
    }

    /// Verifies every record into `run_root/roi_verification/` and rewrites
    /// the run's index. A record that cannot be verified is logged and left
    /// out of the index.
    pub fn verify_run(
        &self,
        records: &[CaptureRecord],
        rois: &RoiSet,
        run_root: &Path,
    ) -> Result<(Vec<VerificationEntry>, Vec<AnalysisWarning>)> {
        if rois.is_empty() {
            debug!("Skipping ROI verification for {} (no ROIs)", run_root.display());
            return Ok((Vec::new(), Vec::new()));
        }

        let output_dir = run_root.join(VERIFICATION_DIRNAME);
        let mut entries = Vec::with_capacity(records.len());
        let mut warnings = Vec::new();
        for record in records {
            match self.verify_record(record, rois, &output_dir) {
                Ok((path, record_warnings)) => {
                    let path = path
                        .strip_prefix(run_root)
                        .map(Path::to_path_buf)
                        .unwrap_or(path);
                    entries.push(VerificationEntry {
                        illumination: record.illumination().to_string(),
                        sequence: record.sequence().to_string(),
                        exposure_us: record.exposure_us(),
                        path,
                    });
                    warnings.extend(record_warnings);
                }
                Err(e) => {
                    warn!(
                        "Failed to create ROI verification for {}: {}",
                        record.location().display(),
                        e
                    );
                }
            }
        }

        write_verification_index(run_root, &entries)?;
        entries.sort();
        Ok((entries, warnings))
    }
}
