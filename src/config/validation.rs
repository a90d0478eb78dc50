//! Config validation: unknown-key detection with Levenshtein suggestions
//! and physical range checks.
//!
//! The raw TOML is first walked as a `toml::Value` tree and every key is
//! compared against the known schema, producing "did you mean?" warnings.
//! Only then does serde deserialization run. Typos never break a config file;
//! they just stop having an effect, which is what the warning reports.

use std::collections::HashSet;

use super::defaults::{
    FAULT_DISTANCE_BOUNDS, PERMEABILITY_BOUNDS, SKIN_BOUNDS, WELLBORE_STORAGE_BOUNDS,
};

/// A non-fatal config warning (typo, suspicious value).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, " (did you mean '{s}'?)")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

/// Every valid dotted key path of `EngineConfig`.
///
/// Kept by hand in step with engine_config.rs; a field added there must be
/// added here too (`test_known_keys_cover_serialized_defaults` enforces it).
pub fn known_config_keys() -> HashSet<&'static str> {
    let keys: &[&str] = &[
        // [derivative]
        "derivative",
        "derivative.smoothing_l",
        "derivative.time_floor_hours",
        // [regimes]
        "regimes",
        "regimes.window_half_width",
        "regimes.unit_slope_tolerance",
        "regimes.flat_tolerance",
        "regimes.min_radial_span",
        "regimes.min_radial_points",
        "regimes.boundary_level_ratio",
        "regimes.confidence_variance_scale",
        // [matching]
        "matching",
        "matching.default_model",
        "matching.max_iterations",
        "matching.initial_step",
        "matching.step_decay",
        "matching.min_step",
        "matching.skin_step_scale",
        "matching.derivative_weight",
        // [quality]
        "quality",
        "quality.excellent_r_squared",
        "quality.good_r_squared",
        "quality.fair_r_squared",
        // [session]
        "session",
        "session.history_depth",
        "session.event_channel_capacity",
        // [templates]
        "templates",
        "templates.permeability_md",
        "templates.skin",
        "templates.wellbore_storage_bbl_psi",
        "templates.fault_distance_ft",
    ];
    keys.iter().copied().collect()
}

/// Recursively collect dotted key paths from a TOML value.
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            if v.is_table() {
                keys.extend(walk_toml_keys(v, &path));
            }
        }
    }
    keys
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Closest known key within edit distance 3, ties broken alphabetically.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    known
        .iter()
        .map(|k| (levenshtein(unknown, k), *k))
        .filter(|(dist, _)| *dist <= 3)
        .min()
        .map(|(_, k)| k.to_string())
}

// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

/// Warnings for every key in `raw_toml` the schema does not know.
///
/// Syntax errors return no warnings; serde reports those afterwards.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let Ok(value) = raw_toml.parse::<toml::Value>() else {
        return Vec::new();
    };

    let known = known_config_keys();
    walk_toml_keys(&value, "")
        .into_iter()
        .filter(|key| !known.contains(key.as_str()))
        .map(|key| ValidationWarning {
            suggestion: suggest_correction(&key, &known),
            message: format!("Unknown config key '{key}'"),
            field: key,
        })
        .collect()
}

// ============================================================================
// Physical Range Validation
// ============================================================================

fn check_bounds(
    errors: &mut Vec<String>,
    field: &str,
    value: f64,
    (lo, hi): (f64, f64),
) {
    if !(lo..=hi).contains(&value) {
        errors.push(format!(
            "{field} = {value} is outside the physical range ({lo}-{hi})"
        ));
    }
}

/// Physical range checks on a parsed config.
///
/// Returns (errors, warnings). Errors are values the models cannot evaluate;
/// warnings are legal but unusual.
pub fn validate_physical_ranges(
    config: &super::EngineConfig,
) -> (Vec<String>, Vec<ValidationWarning>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    // Templates must sit inside the optimizer bounds, otherwise the first
    // clamp silently moves the starting point.
    let t = &config.templates;
    check_bounds(&mut errors, "templates.permeability_md", t.permeability_md, PERMEABILITY_BOUNDS);
    check_bounds(&mut errors, "templates.skin", t.skin, SKIN_BOUNDS);
    check_bounds(
        &mut errors,
        "templates.wellbore_storage_bbl_psi",
        t.wellbore_storage_bbl_psi,
        WELLBORE_STORAGE_BOUNDS,
    );
    check_bounds(
        &mut errors,
        "templates.fault_distance_ft",
        t.fault_distance_ft,
        FAULT_DISTANCE_BOUNDS,
    );

    // Much beyond half a log cycle of smoothing flattens every regime.
    if config.derivative.smoothing_l > 0.6 {
        warnings.push(ValidationWarning {
            field: "derivative.smoothing_l".to_string(),
            message: format!(
                "derivative.smoothing_l = {:.2} is unusually heavy smoothing (typical 0.1-0.5 log cycles)",
                config.derivative.smoothing_l
            ),
            suggestion: None,
        });
    }

    if config.derivative.time_floor_hours > 1e-3 {
        warnings.push(ValidationWarning {
            field: "derivative.time_floor_hours".to_string(),
            message: format!(
                "derivative.time_floor_hours = {} may clip real early-time data",
                config.derivative.time_floor_hours
            ),
            suggestion: None,
        });
    }

    if config.matching.max_iterations > 1000 {
        warnings.push(ValidationWarning {
            field: "matching.max_iterations".to_string(),
            message: format!(
                "matching.max_iterations = {} will make auto-match slow",
                config.matching.max_iterations
            ),
            suggestion: None,
        });
    }

    (errors, warnings)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;

    #[test]
    fn test_levenshtein_identical() {
        assert_eq!(levenshtein("smoothing_l", "smoothing_l"), 0);
    }

    #[test]
    fn test_levenshtein_one_edit() {
        assert_eq!(levenshtein("skin", "skim"), 1);
        assert_eq!(levenshtein("step", "steps"), 1);
    }

    #[test]
    fn test_levenshtein_empty() {
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("abc", ""), 3);
    }

    #[test]
    fn test_walk_toml_keys_nested() {
        let value: toml::Value = "[matching]\nmax_iterations = 10\n".parse().unwrap();
        let keys = walk_toml_keys(&value, "");
        assert!(keys.contains(&"matching".to_string()));
        assert!(keys.contains(&"matching.max_iterations".to_string()));
    }

    #[test]
    fn test_typo_key_produces_warning_with_suggestion() {
        let warnings = validate_unknown_keys("[derivative]\nsmoothing_ll = 0.3\n");
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].field, "derivative.smoothing_ll");
        assert_eq!(
            warnings[0].suggestion.as_deref(),
            Some("derivative.smoothing_l")
        );
    }

    #[test]
    fn test_unknown_section_produces_warning() {
        let warnings = validate_unknown_keys("[plotting]\nlog_axes = true\n");
        assert_eq!(warnings.len(), 2);
        assert!(warnings.iter().all(|w| w.suggestion.is_none()));
    }

    #[test]
    fn test_malformed_toml_yields_no_key_warnings() {
        assert!(validate_unknown_keys("[matching\nmax_iterations = ").is_empty());
    }

    #[test]
    fn test_known_keys_cover_serialized_defaults() {
        let toml_str = EngineConfig::default().to_toml().unwrap();
        let warnings = validate_unknown_keys(&toml_str);
        assert!(
            warnings.is_empty(),
            "Default config should produce no unknown-key warnings: {warnings:?}"
        );
    }

    #[test]
    fn test_physical_range_defaults_clean() {
        let (errors, warnings) = validate_physical_ranges(&EngineConfig::default());
        assert!(errors.is_empty(), "{errors:?}");
        assert!(warnings.is_empty(), "{warnings:?}");
    }

    #[test]
    fn test_template_permeability_out_of_bounds() {
        let mut config = EngineConfig::default();
        config.templates.permeability_md = 0.0;
        let (errors, _) = validate_physical_ranges(&config);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("templates.permeability_md"));
    }

    #[test]
    fn test_heavy_smoothing_is_only_a_warning() {
        let mut config = EngineConfig::default();
        config.derivative.smoothing_l = 2.0;
        let (errors, warnings) = validate_physical_ranges(&config);
        assert!(errors.is_empty());
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].field, "derivative.smoothing_l");
    }
}
