use std::path::{Path, PathBuf};

use tracing::{info, instrument, warn};

use crate::analysis::{
    capture::CaptureRecord,
    diagnostics::{AnalysisWarning, DiagnosticSeries, DiagnosticsSink, NoopSink},
    export::{sorted_for_export, write_measurements_csv, write_summary_json, PhotoResponseSummary},
    fitting::{fit_measurements, RoiFit, RoiFitReport},
    measurement::{Measurement, MeasurementEngine, DEFAULT_SATURATION_THRESHOLD},
    roi::{load_run_rois, Roi, RoiSet},
};
use crate::image_pipeline::{
    common::error::{PipelineError, Result},
    raw::{FrameReader, Raw16Reader},
};

/// Configuration for a photo-response analysis run
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Mean DN above which a measurement is excluded from fitting
    pub saturation_threshold: f64,
    /// Accepted RAW16 frame file extensions (case-insensitive)
    pub frame_extensions: Vec<String>,
    /// File name of the measurement table written by `analyze_and_export`
    pub measurements_filename: String,
    /// File name of the JSON summary written by `analyze_and_export`
    pub summary_filename: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            saturation_threshold: DEFAULT_SATURATION_THRESHOLD,
            frame_extensions: vec!["raw".to_string(), "raw16".to_string(), "bin".to_string()],
            measurements_filename: "photo_response_measurements.csv".to_string(),
            summary_filename: "photo_response_summary.json".to_string(),
        }
    }
}

impl AnalysisConfig {
    pub fn builder() -> AnalysisConfigBuilder {
        AnalysisConfigBuilder::default()
    }
}

/// Builder for AnalysisConfig
#[derive(Default)]
pub struct AnalysisConfigBuilder {
    saturation_threshold: Option<f64>,
    frame_extensions: Option<Vec<String>>,
    measurements_filename: Option<String>,
    summary_filename: Option<String>,
}

impl AnalysisConfigBuilder {
    pub fn saturation_threshold(mut self, threshold: f64) -> Self {
        self.saturation_threshold = Some(threshold);
        self
    }

    pub fn frame_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.frame_extensions = Some(extensions.into_iter().map(Into::into).collect());
        self
    }

    pub fn measurements_filename(mut self, name: impl Into<String>) -> Self {
        self.measurements_filename = Some(name.into());
        self
    }

    pub fn summary_filename(mut self, name: impl Into<String>) -> Self {
        self.summary_filename = Some(name.into());
        self
    }

    pub fn build(self) -> AnalysisConfig {
        let default = AnalysisConfig::default();
        AnalysisConfig {
            saturation_threshold: self.saturation_threshold.unwrap_or(default.saturation_threshold),
            frame_extensions: self.frame_extensions.unwrap_or(default.frame_extensions),
            measurements_filename: self.measurements_filename.unwrap_or(default.measurements_filename),
            summary_filename: self.summary_filename.unwrap_or(default.summary_filename),
        }
    }
}

/// Source of the ROI set for a run.
pub trait RoiProvider {
    fn rois(&self, record: &CaptureRecord) -> Result<Vec<Roi>>;
}

impl RoiProvider for Vec<Roi> {
    fn rois(&self, _record: &CaptureRecord) -> Result<Vec<Roi>> {
        Ok(self.clone())
    }
}

impl RoiProvider for RoiSet {
    fn rois(&self, _record: &CaptureRecord) -> Result<Vec<Roi>> {
        Ok(self.as_slice().to_vec())
    }
}

/// ROIs persisted in a run directory; a run without a ROI file has no ROIs.
#[derive(Debug, Clone)]
pub struct PersistedRoiSet {
    pub run_root: PathBuf,
}

impl PersistedRoiSet {
    pub fn new(run_root: impl Into<PathBuf>) -> Self {
        Self {
            run_root: run_root.into(),
        }
    }
}

impl RoiProvider for PersistedRoiSet {
    fn rois(&self, _record: &CaptureRecord) -> Result<Vec<Roi>> {
        Ok(load_run_rois(&self.run_root)?.as_slice().to_vec())
    }
}

/// Everything produced by one analysis run.
#[derive(Debug, Clone)]
pub struct PhotoResponseResult {
    pub illumination: String,
    pub sequence: String,
    pub saturation_threshold: f64,
    pub measurements: Vec<Measurement>,
    /// One fit per ROI, in ROI name order
    pub fits: Vec<RoiFit>,
    pub warnings: Vec<AnalysisWarning>,
}

impl PhotoResponseResult {
    pub fn summary(&self) -> PhotoResponseSummary<'_> {
        PhotoResponseSummary {
            illumination: &self.illumination,
            sequence: &self.sequence,
            saturation_threshold: self.saturation_threshold,
            measurements: sorted_for_export(&self.measurements),
            fits: &self.fits,
            warnings: &self.warnings,
        }
    }

    pub fn fit(&self, roi_name: &str) -> Option<&RoiFit> {
        self.fits.iter().find(|fit| fit.roi_name == roi_name)
    }
}

pub struct PhotoResponsePipeline<R: FrameReader, S: DiagnosticsSink> {
    engine: MeasurementEngine<R>,
    sink: S,
    config: AnalysisConfig,
}

impl PhotoResponsePipeline<Raw16Reader, NoopSink> {
    pub fn new(config: AnalysisConfig) -> Self {
        Self::with_custom(Raw16Reader, NoopSink, config)
    }
}

impl<R: FrameReader, S: DiagnosticsSink> PhotoResponsePipeline<R, S> {
    pub fn with_custom(reader: R, sink: S, config: AnalysisConfig) -> Self {
        Self {
            engine: MeasurementEngine::new(
                reader,
                config.saturation_threshold,
                config.frame_extensions.clone(),
            ),
            sink,
            config,
        }
    }

    /// Measures every record against the run's ROIs, fits each ROI and emits
    /// the diagnostic series.
    ///
    /// The ROI set is resolved once from the first record. Per-file and
    /// per-ROI failures are skipped and listed in the result's `warnings`;
    /// an empty batch or an invalid ROI set fails the whole run.
    #[instrument(skip_all, fields(records = records.len()))]
    pub fn analyze<P: RoiProvider>(
        &self,
        records: &[CaptureRecord],
        provider: &P,
    ) -> Result<PhotoResponseResult> {
        let first = records.first().ok_or(PipelineError::EmptyBatch)?;
        info!("Starting photo-response analysis");

        let rois = {
            let _span = tracing::info_span!("resolve_rois").entered();
            RoiSet::new(provider.rois(first)?)?
        };
        if rois.is_empty() {
            warn!("No ROIs defined; no measurements will be produced");
        }

        let mut warnings = Vec::new();
        let measurements = {
            let _span = tracing::info_span!("measure", rois = rois.len()).entered();
            self.engine.measure_records(records, &rois, &mut warnings)?
        };

        let reports = {
            let _span = tracing::info_span!("fit").entered();
            fit_measurements(&measurements)
        };

        let illumination = first.illumination().to_string();
        let sequence = first.sequence().to_string();
        {
            let _span = tracing::info_span!("emit_diagnostics").entered();
            for report in &reports {
                self.emit_diagnostics(report, &illumination, &sequence);
            }
        }

        let fits = complete_fits(&rois, reports);
        info!(
            measurements = measurements.len(),
            fits = fits.len(),
            skipped = warnings.len(),
            "Analysis complete"
        );

        Ok(PhotoResponseResult {
            illumination,
            sequence,
            saturation_threshold: self.config.saturation_threshold,
            measurements,
            fits,
            warnings,
        })
    }

    /// Runs [`analyze`](Self::analyze) and writes the measurement CSV and the
    /// JSON summary into `output_dir`.
    #[instrument(skip(self, records, provider, output_dir))]
    pub fn analyze_and_export<P: RoiProvider, Q: AsRef<Path>>(
        &self,
        records: &[CaptureRecord],
        provider: &P,
        output_dir: Q,
    ) -> Result<PhotoResponseResult> {
        let output_dir = output_dir.as_ref();
        let result = self.analyze(records, provider)?;

        let _span = tracing::info_span!("export", output = %output_dir.display()).entered();
        std::fs::create_dir_all(output_dir)?;
        write_measurements_csv(
            &output_dir.join(&self.config.measurements_filename),
            &result.measurements,
        )?;
        write_summary_json(&output_dir.join(&self.config.summary_filename), &result.summary())?;
        Ok(result)
    }

    fn emit_diagnostics(&self, report: &RoiFitReport, illumination: &str, sequence: &str) {
        let series = report.series.positive_only();
        if series.is_empty() {
            tracing::debug!(
                "ROI {} has no positive points; skipping diagnostics",
                report.fit.roi_name
            );
            return;
        }
        self.sink.emit(&DiagnosticSeries {
            roi_name: &report.fit.roi_name,
            exposures: &series.exposures,
            measured: &series.measured,
            fitted: series.fitted.as_deref(),
            illumination,
            sequence,
        });
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn set_config(&mut self, config: AnalysisConfig) {
        self.engine
            .configure(config.saturation_threshold, config.frame_extensions.clone());
        self.config = config;
    }
}

/// Adds an empty fit for every ROI that produced no measurements.
fn complete_fits(rois: &RoiSet, reports: Vec<RoiFitReport>) -> Vec<RoiFit> {
    let mut fits: Vec<RoiFit> = reports.into_iter().map(|report| report.fit).collect();
    for name in rois.names() {
        if !fits.iter().any(|fit| fit.roi_name == name) {
            fits.push(RoiFit::empty(name));
        }
    }
    fits.sort_by(|a, b| a.roi_name.cmp(&b.roi_name));
    fits
}
