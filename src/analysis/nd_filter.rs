//! ND filter normalisation factor lookup from capture metadata.
//!
//! Metadata can describe the filter in several ways. The lookup walks an
//! ordered list of probe rules and the first rule that yields a positive,
//! finite factor wins; otherwise the factor is 1.0 (no normalisation).

use serde_json::{Map, Value};
use tracing::debug;

/// Factor applied when metadata carries no usable ND description.
pub const DEFAULT_ND_FACTOR: f64 = 1.0;

/// Name of the nested block describing the ND filter.
pub const ND_FILTER_BLOCK: &str = "nd_filter";

const DIRECT_FACTOR_KEYS: &[&str] = &["nd_factor", "nd_attenuation", "attenuation", "transmission"];
const NESTED_FACTOR_KEYS: &[&str] = &["factor", "nd_factor", "attenuation", "transmission"];
const DENSITY_KEYS: &[&str] = &["nd_density", "density", "optical_density"];

/// How a probe turns a scalar into a multiplicative factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NdValueKind {
    /// The value is the factor itself.
    Factor,
    /// The value is an optical density `D`; the factor is `10^-D`.
    OpticalDensity,
}

/// One rule of the lookup: a set of keys, optionally inside a nested block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NdProbe {
    pub block: Option<&'static str>,
    pub keys: &'static [&'static str],
    pub kind: NdValueKind,
}

/// Lookup order applied by [`nd_factor`].
pub const DEFAULT_PROBES: [NdProbe; 4] = [
    NdProbe {
        block: None,
        keys: DIRECT_FACTOR_KEYS,
        kind: NdValueKind::Factor,
    },
    NdProbe {
        block: Some(ND_FILTER_BLOCK),
        keys: NESTED_FACTOR_KEYS,
        kind: NdValueKind::Factor,
    },
    NdProbe {
        block: Some(ND_FILTER_BLOCK),
        keys: DENSITY_KEYS,
        kind: NdValueKind::OpticalDensity,
    },
    NdProbe {
        block: None,
        keys: DENSITY_KEYS,
        kind: NdValueKind::OpticalDensity,
    },
];

impl NdProbe {
    /// Returns the first acceptable factor among this probe's keys.
    pub fn probe(&self, metadata: &Map<String, Value>) -> Option<f64> {
        let scope = match self.block {
            Some(block) => metadata.get(block)?.as_object()?,
            None => metadata,
        };
        self.keys.iter().find_map(|key| {
            let value = scope.get(*key)?;
            let Some(scalar) = as_scalar(value) else {
                debug!("Unable to interpret ND value {} for key {}", value, key);
                return None;
            };
            let factor = match self.kind {
                NdValueKind::Factor => scalar,
                NdValueKind::OpticalDensity => 10f64.powf(-scalar),
            };
            if factor > 0.0 && factor.is_finite() {
                Some(factor)
            } else {
                debug!("Ignoring unusable ND factor {} from key {}", factor, key);
                None
            }
        })
    }
}

fn as_scalar(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

/// ND normalisation factor of a capture using [`DEFAULT_PROBES`].
pub fn nd_factor(metadata: &Value) -> f64 {
    nd_factor_with(metadata, &DEFAULT_PROBES)
}

/// ND normalisation factor using a caller-supplied probe order.
pub fn nd_factor_with(metadata: &Value, probes: &[NdProbe]) -> f64 {
    let Some(map) = metadata.as_object() else {
        return DEFAULT_ND_FACTOR;
    };
    probes
        .iter()
        .find_map(|probe| probe.probe(map))
        .unwrap_or(DEFAULT_ND_FACTOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn test_empty_metadata_defaults() {
        assert_eq!(nd_factor(&json!({})), 1.0);
        assert_eq!(nd_factor(&Value::Null), 1.0);
        assert_eq!(nd_factor(&json!([1, 2])), 1.0);
    }

    #[test]
    fn test_top_level_density() {
        assert!(close(nd_factor(&json!({"nd_density": 1.0})), 0.1));
        assert!(close(nd_factor(&json!({"optical_density": 2})), 0.01));
    }

    #[test]
    fn test_direct_factor_wins_over_everything() {
        let metadata = json!({
            "nd_density": 3.0,
            "nd_filter": {"factor": 0.5},
            "transmission": 0.25
        });
        assert_eq!(nd_factor(&metadata), 0.25);
    }

    #[test]
    fn test_direct_key_order() {
        let metadata = json!({"attenuation": 0.3, "nd_attenuation": 0.2});
        assert_eq!(nd_factor(&metadata), 0.2);
    }

    #[test]
    fn test_nested_factor_before_nested_density() {
        let metadata = json!({"nd_filter": {"density": 1.0, "attenuation": 0.4}});
        assert_eq!(nd_factor(&metadata), 0.4);
    }

    #[test]
    fn test_nested_density_before_top_level_density() {
        let metadata = json!({"nd_filter": {"nd_density": 2.0}, "nd_density": 1.0});
        assert!(close(nd_factor(&metadata), 0.01));
    }

    #[test]
    fn test_invalid_candidates_are_skipped() {
        let metadata = json!({
            "nd_factor": "clear",
            "nd_attenuation": 0,
            "attenuation": -0.5,
            "nd_filter": {"factor": null, "transmission": "0.125"}
        });
        assert_eq!(nd_factor(&metadata), 0.125);
    }

    #[test]
    fn test_non_object_block_is_ignored() {
        let metadata = json!({"nd_filter": "ND8", "nd_density": 0.0});
        assert_eq!(nd_factor(&metadata), 1.0);
    }

    #[test]
    fn test_overflowing_density_falls_back() {
        let metadata = json!({"nd_density": -1000.0});
        assert_eq!(nd_factor(&metadata), 1.0);
    }

    #[test]
    fn test_custom_probe_order() {
        let probes = [DEFAULT_PROBES[3], DEFAULT_PROBES[0]];
        let metadata = json!({"nd_factor": 0.5, "density": 1.0});
        assert!(close(nd_factor_with(&metadata, &probes), 0.1));
    }
}
