//! Photo-response analysis module
//!
//! Turns RAW16 capture frames and a ROI set into saturation-filtered,
//! ND-normalised ROI measurements and per-ROI linear response fits.

pub mod capture;
pub mod diagnostics;
pub mod export;
pub mod fitting;
pub mod measurement;
pub mod nd_filter;
pub mod pipeline;
pub mod roi;
pub mod verification;


pub use capture::{CaptureRecord, FrameSource};
pub use diagnostics::{
    AnalysisWarning, CollectingSink, DiagnosticSeries, DiagnosticsSink, NoopSink,
    OwnedDiagnosticSeries,
};
pub use export::{read_measurements_csv, write_measurements_csv, write_summary_json, PhotoResponseSummary};
pub use fitting::{fit_measurements, linear_fit, LinearFit, RoiFit, RoiFitReport, RoiSeries};
pub use measurement::{is_saturated, roi_mean, Measurement, MeasurementEngine, DEFAULT_SATURATION_THRESHOLD};
pub use nd_filter::{nd_factor, nd_factor_with, NdProbe, NdValueKind, DEFAULT_PROBES};
pub use pipeline::{
    AnalysisConfig, AnalysisConfigBuilder, PersistedRoiSet, PhotoResponsePipeline,
    PhotoResponseResult, RoiProvider,
};
pub use roi::{load_run_rois, roi_file_path, save_run_rois, ClipOutcome, Roi, RoiBounds, RoiSet};
pub use verification::{
    mask_rois, render_verification_index, write_verification_index, RoiVerification, RoiVerifier,
    VerificationEntry,
};
