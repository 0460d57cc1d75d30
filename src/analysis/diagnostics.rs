//! Diagnostic outputs of an analysis run.
//!
//! [`DiagnosticsSink`] receives the per-ROI photo-response series after
//! fitting so an external renderer can plot them. [`AnalysisWarning`]
//! records every unit of work that was skipped without aborting the run.

use std::path::PathBuf;
use std::sync::Mutex;

use serde::Serialize;

/// Photo-response series of one ROI, restricted to strictly positive points.
#[derive(Debug, Clone, Copy)]
pub struct DiagnosticSeries<'a> {
    pub roi_name: &'a str,
    pub exposures: &'a [f64],
    pub measured: &'a [f64],
    /// Linear model evaluated at `exposures`, when a fit exists.
    pub fitted: Option<&'a [f64]>,
    pub illumination: &'a str,
    pub sequence: &'a str,
}

impl DiagnosticSeries<'_> {
    pub fn to_owned_series(&self) -> OwnedDiagnosticSeries {
        OwnedDiagnosticSeries {
            roi_name: self.roi_name.to_string(),
            exposures: self.exposures.to_vec(),
            measured: self.measured.to_vec(),
            fitted: self.fitted.map(<[f64]>::to_vec),
            illumination: self.illumination.to_string(),
            sequence: self.sequence.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OwnedDiagnosticSeries {
    pub roi_name: String,
    pub exposures: Vec<f64>,
    pub measured: Vec<f64>,
    pub fitted: Option<Vec<f64>>,
    pub illumination: String,
    pub sequence: String,
}

/// Output target for diagnostic series.
///
/// The pipeline calls `emit` at most once per ROI, in ROI name order.
pub trait DiagnosticsSink {
    fn emit(&self, series: &DiagnosticSeries<'_>);
}

/// Sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl DiagnosticsSink for NoopSink {
    fn emit(&self, _series: &DiagnosticSeries<'_>) {}
}

/// Sink that keeps a copy of every emitted series.
#[derive(Debug, Default)]
pub struct CollectingSink {
    emitted: Mutex<Vec<OwnedDiagnosticSeries>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emitted(&self) -> Vec<OwnedDiagnosticSeries> {
        self.emitted
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl DiagnosticsSink for CollectingSink {
    fn emit(&self, series: &DiagnosticSeries<'_>) {
        self.emitted
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(series.to_owned_series());
    }
}

impl<F> DiagnosticsSink for F
where
    F: Fn(&DiagnosticSeries<'_>),
{
    fn emit(&self, series: &DiagnosticSeries<'_>) {
        self(series)
    }
}

/// A unit of work skipped during analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnalysisWarning {
    /// No frames could be enumerated for a capture.
    NoFrames {
        illumination: String,
        sequence: String,
        exposure_us: u64,
        location: PathBuf,
    },
    /// A frame file failed to load; its measurements are missing.
    FrameUnreadable { path: PathBuf, reason: String },
    /// A ROI did not intersect a frame and was not measured.
    RoiOutsideFrame { roi: String, path: PathBuf },
    /// A ROI overlapped the frame edge and was measured on the intersection.
    RoiTruncated { roi: String, path: PathBuf },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn series<'a>(exposures: &'a [f64], measured: &'a [f64]) -> DiagnosticSeries<'a> {
        DiagnosticSeries {
            roi_name: "roi_01",
            exposures,
            measured,
            fitted: None,
            illumination: "led",
            sequence: "sweep",
        }
    }

    #[test]
    fn test_collecting_sink_keeps_order() {
        let sink = CollectingSink::new();
        sink.emit(&series(&[1.0], &[2.0]));
        sink.emit(&series(&[3.0], &[4.0]));
        let emitted = sink.emitted();
        assert_eq!(emitted.len(), 2);
        assert_eq!(emitted[1].exposures, vec![3.0]);
    }

    #[test]
    fn test_closure_sink() {
        fn counting(count: &Cell<usize>) -> impl Fn(&DiagnosticSeries<'_>) + '_ {
            move |s| count.set(count.get() + s.exposures.len())
        }
        let count = Cell::new(0);
        counting(&count).emit(&series(&[1.0, 2.0], &[2.0, 4.0]));
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn test_warning_serialises_with_kind_tag() {
        let warning = AnalysisWarning::RoiOutsideFrame {
            roi: "roi_01".to_string(),
            path: PathBuf::from("frame.raw"),
        };
        let value = serde_json::to_value(&warning).unwrap();
        assert_eq!(value["kind"], "roi_outside_frame");
        assert_eq!(value["roi"], "roi_01");
    }
}
