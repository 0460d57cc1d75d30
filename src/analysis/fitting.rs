//! Linear photo-response fits per ROI.
//!
//! Unsaturated measurements are averaged per exposure and a least-squares
//! line `DN = slope * exposure + intercept` is fitted through the averages.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::analysis::measurement::Measurement;

/// Fit result for one ROI. `slope` and `intercept` are absent when fewer
/// than two distinct exposures remain after saturation filtering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoiFit {
    pub roi_name: String,
    pub slope: Option<f64>,
    pub intercept: Option<f64>,
    /// Distinct exposure groups that entered the fit
    pub used_points: usize,
    pub total_points: usize,
    pub saturated_points: usize,
}

impl RoiFit {
    /// Fit of a ROI that produced no measurements.
    pub fn empty(roi_name: impl Into<String>) -> Self {
        Self {
            roi_name: roi_name.into(),
            slope: None,
            intercept: None,
            used_points: 0,
            total_points: 0,
            saturated_points: 0,
        }
    }

    pub fn is_degenerate(&self) -> bool {
        self.slope.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearFit {
    pub fn evaluate(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Ordinary least-squares line through `(xs[i], ys[i])`.
///
/// Returns `None` for fewer than two points or when all `xs` are equal.
pub fn linear_fit(xs: &[f64], ys: &[f64]) -> Option<LinearFit> {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return None;
    }
    let (xs, ys) = (&xs[..n], &ys[..n]);
    let mean_x = xs.iter().sum::<f64>() / n as f64;
    let mean_y = ys.iter().sum::<f64>() / n as f64;

    let (sxx, sxy) = xs.iter().zip(ys).fold((0.0, 0.0), |(sxx, sxy), (&x, &y)| {
        let dx = x - mean_x;
        (sxx + dx * dx, sxy + dx * (y - mean_y))
    });
    if sxx == 0.0 {
        return None;
    }
    let slope = sxy / sxx;
    Some(LinearFit {
        slope,
        intercept: mean_y - slope * mean_x,
    })
}

/// Averaged exposure series of one ROI, in ascending exposure order.
#[derive(Debug, Clone, PartialEq)]
pub struct RoiSeries {
    pub exposures: Vec<f64>,
    pub measured: Vec<f64>,
    pub fitted: Option<Vec<f64>>,
}

impl RoiSeries {
    /// Keeps only points where both exposure and measured value are positive.
    pub fn positive_only(&self) -> RoiSeries {
        let keep: Vec<usize> = (0..self.exposures.len())
            .filter(|&i| self.exposures[i] > 0.0 && self.measured[i] > 0.0)
            .collect();
        RoiSeries {
            exposures: keep.iter().map(|&i| self.exposures[i]).collect(),
            measured: keep.iter().map(|&i| self.measured[i]).collect(),
            fitted: self
                .fitted
                .as_ref()
                .map(|fitted| keep.iter().map(|&i| fitted[i]).collect()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.exposures.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoiFitReport {
    pub fit: RoiFit,
    pub series: RoiSeries,
}

/// Fits one ROI from its measurements.
pub fn fit_roi<'a>(
    roi_name: &str,
    entries: impl IntoIterator<Item = &'a Measurement>,
) -> RoiFitReport {
    let mut total_points = 0;
    let mut saturated_points = 0;
    let mut groups: BTreeMap<u64, Vec<f64>> = BTreeMap::new();
    for entry in entries {
        total_points += 1;
        if entry.saturated {
            saturated_points += 1;
            continue;
        }
        groups
            .entry(entry.exposure_us)
            .or_default()
            .push(entry.normalised_dn);
    }

    let exposures: Vec<f64> = groups.keys().map(|&exposure| exposure as f64).collect();
    let measured: Vec<f64> = groups
        .values()
        .map(|values| values.iter().sum::<f64>() / values.len() as f64)
        .collect();

    let fit = linear_fit(&exposures, &measured);
    let fitted = fit.map(|line| exposures.iter().map(|&x| line.evaluate(x)).collect());
    debug!(
        "ROI {}: {} exposure groups, {} of {} points saturated",
        roi_name,
        exposures.len(),
        saturated_points,
        total_points
    );

    RoiFitReport {
        fit: RoiFit {
            roi_name: roi_name.to_string(),
            slope: fit.map(|line| line.slope),
            intercept: fit.map(|line| line.intercept),
            used_points: exposures.len(),
            total_points,
            saturated_points,
        },
        series: RoiSeries {
            exposures,
            measured,
            fitted,
        },
    }
}

/// Groups measurements by ROI and fits each, in ROI name order.
pub fn fit_measurements(measurements: &[Measurement]) -> Vec<RoiFitReport> {
    let mut by_roi: BTreeMap<&str, Vec<&Measurement>> = BTreeMap::new();
    for entry in measurements {
        by_roi.entry(entry.roi_name.as_str()).or_default().push(entry);
    }
    by_roi
        .into_iter()
        .map(|(roi_name, entries)| fit_roi(roi_name, entries))
        .collect()
}
