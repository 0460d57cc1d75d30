//! Per-frame, per-ROI mean intensity measurements.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info_span, warn};

use crate::analysis::capture::CaptureRecord;
use crate::analysis::diagnostics::AnalysisWarning;
use crate::analysis::nd_filter::{nd_factor, DEFAULT_ND_FACTOR};
use crate::analysis::roi::{ClipOutcome, Roi, RoiSet};
use crate::image_pipeline::common::error::{PipelineError, Result};
use crate::image_pipeline::raw::{FrameReader, PixelGrid};

/// Saturation threshold in DN used when none is configured.
pub const DEFAULT_SATURATION_THRESHOLD: f64 = 600.0;

/// One ROI observed in one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub illumination: String,
    pub sequence: String,
    pub exposure_us: u64,
    /// 1-based position of the frame in lexicographic file order
    pub frame_index: usize,
    pub roi_name: String,
    /// Raw mean over the (possibly clipped) ROI window
    pub mean_dn: f64,
    /// `mean_dn / nd_factor`
    pub normalised_dn: f64,
    pub saturated: bool,
    pub nd_factor: f64,
    pub source_file: String,
}

/// Saturation is strict: a mean equal to the threshold is still usable.
pub fn is_saturated(mean_dn: f64, threshold: f64) -> bool {
    mean_dn > threshold
}

/// Mean of `roi` over `frame`, clipped to the frame edge.
///
/// A ROI that does not intersect the frame at all is
/// [`PipelineError::GeometryOutOfBounds`]. The clip outcome is returned so
/// callers can report truncation.
pub fn roi_mean(frame: &PixelGrid, roi: &Roi) -> Result<(f64, ClipOutcome)> {
    let outcome = roi.clip_to(frame.width(), frame.height());
    let out_of_bounds = || PipelineError::GeometryOutOfBounds {
        roi: roi.name().to_string(),
        frame_width: frame.width(),
        frame_height: frame.height(),
    };
    let window = outcome.window().ok_or_else(out_of_bounds)?;
    let mean = frame.window_mean(&window).ok_or_else(out_of_bounds)?;
    Ok((mean, outcome))
}

/// Computes measurements for capture records through a [`FrameReader`].
pub struct MeasurementEngine<R: FrameReader> {
    reader: R,
    saturation_threshold: f64,
    frame_extensions: Vec<String>,
}

impl<R: FrameReader> MeasurementEngine<R> {
    pub fn new(reader: R, saturation_threshold: f64, frame_extensions: Vec<String>) -> Self {
        Self {
            reader,
            saturation_threshold,
            frame_extensions,
        }
    }

    pub fn configure(&mut self, saturation_threshold: f64, frame_extensions: Vec<String>) {
        self.saturation_threshold = saturation_threshold;
        self.frame_extensions = frame_extensions;
    }

    pub fn saturation_threshold(&self) -> f64 {
        self.saturation_threshold
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }

    /// Measures every record. Failures of a single record, frame or ROI are
    /// logged and pushed to `warnings`; only an empty batch is an error.
    pub fn measure_records(
        &self,
        records: &[CaptureRecord],
        rois: &RoiSet,
        warnings: &mut Vec<AnalysisWarning>,
    ) -> Result<Vec<Measurement>> {
        if records.is_empty() {
            return Err(PipelineError::EmptyBatch);
        }
        let mut measurements = Vec::new();
        for record in records {
            measurements.extend(self.measure_record(record, rois, warnings));
        }
        Ok(measurements)
    }

    /// Measures all frames of one record.
    pub fn measure_record(
        &self,
        record: &CaptureRecord,
        rois: &RoiSet,
        warnings: &mut Vec<AnalysisWarning>,
    ) -> Vec<Measurement> {
        let _span = info_span!(
            "measure_record",
            illumination = record.illumination(),
            sequence = record.sequence(),
            exposure_us = record.exposure_us()
        )
        .entered();

        let frames = match record.list_frames(&self.frame_extensions) {
            Ok(frames) => frames,
            Err(e) => {
                warn!("Cannot enumerate frames at {}: {}", record.location().display(), e);
                Vec::new()
            }
        };
        if frames.is_empty() {
            warn!(
                "No RAW16 frames discovered for {}/{}/{}us",
                record.illumination(),
                record.sequence(),
                record.exposure_us()
            );
            warnings.push(AnalysisWarning::NoFrames {
                illumination: record.illumination().to_string(),
                sequence: record.sequence().to_string(),
                exposure_us: record.exposure_us(),
                location: record.location(),
            });
            return Vec::new();
        }

        let nd = record_nd_factor(record);
        let mut measurements = Vec::with_capacity(frames.len() * rois.len());
        for (offset, path) in frames.iter().enumerate() {
            let frame = match self.reader.read_frame(path, record.layout()) {
                Ok(frame) => frame,
                Err(e) => {
                    error!("Failed to load RAW16 frame {}: {}", path.display(), e);
                    warnings.push(AnalysisWarning::FrameUnreadable {
                        path: path.clone(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };
            self.measure_frame(record, &frame, path, offset + 1, nd, rois, &mut measurements, warnings);
        }
        measurements
    }

    #[allow(clippy::too_many_arguments)]
    fn measure_frame(
        &self,
        record: &CaptureRecord,
        frame: &PixelGrid,
        path: &Path,
        frame_index: usize,
        nd: f64,
        rois: &RoiSet,
        measurements: &mut Vec<Measurement>,
        warnings: &mut Vec<AnalysisWarning>,
    ) {
        for roi in rois {
            let (mean_dn, outcome) = match roi_mean(frame, roi) {
                Ok(result) => result,
                Err(e) => {
                    error!("Failed to compute mean for ROI {}: {}", roi.name(), e);
                    warnings.push(AnalysisWarning::RoiOutsideFrame {
                        roi: roi.name().to_string(),
                        path: path.to_path_buf(),
                    });
                    continue;
                }
            };
            if let ClipOutcome::Truncated(window) = outcome {
                warn!(
                    "ROI {} extends beyond {}; measured on {}x{} intersection",
                    roi.name(),
                    path.display(),
                    window.width(),
                    window.height()
                );
                warnings.push(AnalysisWarning::RoiTruncated {
                    roi: roi.name().to_string(),
                    path: path.to_path_buf(),
                });
            }
            debug!("Frame {} ROI {}: mean {:.3} DN", frame_index, roi.name(), mean_dn);
            measurements.push(Measurement {
                illumination: record.illumination().to_string(),
                sequence: record.sequence().to_string(),
                exposure_us: record.exposure_us(),
                frame_index,
                roi_name: roi.name().to_string(),
                mean_dn,
                normalised_dn: mean_dn / nd,
                saturated: is_saturated(mean_dn, self.saturation_threshold),
                nd_factor: nd,
                source_file: path.display().to_string(),
            });
        }
    }
}

fn record_nd_factor(record: &CaptureRecord) -> f64 {
    let factor = nd_factor(record.metadata());
    if factor > 0.0 {
        factor
    } else {
        debug!("Normalisation factor {} invalid; defaulting to 1.0", factor);
        DEFAULT_ND_FACTOR
    }
}
