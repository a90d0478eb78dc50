//! Engine Configuration - every interpretation tuning knob as a TOML value
//!
//! Each struct implements `Default` with the documented engine values, so a
//! missing file or a partial file behaves exactly like the built-in setup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::types::{ModelId, ModelParameters};

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for an interpretation engine deployment.
///
/// Load with `EngineConfig::load()` which searches:
/// 1. `$WELLTEST_CONFIG` env var
/// 2. `./welltest_config.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Bourdet derivative smoothing
    #[serde(default)]
    pub derivative: DerivativeSettings,

    /// Flow-regime classification bands
    #[serde(default)]
    pub regimes: RegimeSettings,

    /// Auto-match optimizer tuning
    #[serde(default)]
    pub matching: MatchingSettings,

    /// R² thresholds for match ratings
    #[serde(default)]
    pub quality: QualityThresholds,

    /// Session limits
    #[serde(default)]
    pub session: SessionSettings,

    /// Default starting parameters for a new interpretation
    #[serde(default)]
    pub templates: ParameterTemplates,
}

impl EngineConfig {
    /// Load configuration using the standard search order:
    /// 1. `$WELLTEST_CONFIG` environment variable
    /// 2. `./welltest_config.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> Self {
        // 1. Check env var
        if let Ok(path) = std::env::var("WELLTEST_CONFIG") {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded engine config from WELLTEST_CONFIG");
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from WELLTEST_CONFIG, falling back");
                    }
                }
            } else {
                warn!(path = %path, "WELLTEST_CONFIG points to non-existent file, falling back");
            }
        }

        // 2. Check ./welltest_config.toml
        let local = PathBuf::from("welltest_config.toml");
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded engine config from ./welltest_config.toml");
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./welltest_config.toml, using defaults");
                }
            }
        }

        // 3. Defaults
        info!("No welltest_config.toml found, using built-in defaults");
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse(_, inner) => ConfigError::Parse(path.to_path_buf(), inner),
            other => other,
        })
    }

    /// Parse and validate a TOML document.
    ///
    /// Two-pass: unknown keys are reported as warnings first, then the
    /// document is deserialized and range-checked.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }

        let config: Self = toml::from_str(contents)
            .map_err(|e| ConfigError::Parse(PathBuf::from("<inline>"), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Save config to a file.
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = self.to_toml()?;
        std::fs::write(path, contents)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        info!(path = %path.display(), "Engine config saved");
        Ok(())
    }

    /// Validate internal consistency of the configuration.
    ///
    /// Checks:
    /// - Tolerances and divisors are positive
    /// - Slope bands do not overlap
    /// - Optimizer step schedule shrinks and stays multiplicatively safe
    /// - Rating thresholds descend
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        // Derivative
        let d = &self.derivative;
        if !(0.0..=2.0).contains(&d.smoothing_l) {
            errors.push(format!(
                "derivative.smoothing_l = {:.3} must be within 0-2 log cycles",
                d.smoothing_l
            ));
        }
        if d.time_floor_hours <= 0.0 {
            errors.push("derivative.time_floor_hours must be > 0 (guards ln(0))".to_string());
        }

        // Regimes: unit-slope band and flat band must not overlap
        let r = &self.regimes;
        if r.window_half_width == 0 {
            errors.push("regimes.window_half_width must be > 0".to_string());
        }
        if r.flat_tolerance <= 0.0 || r.unit_slope_tolerance <= 0.0 {
            errors.push("regimes tolerances must be > 0".to_string());
        }
        if r.flat_tolerance >= 1.0 - r.unit_slope_tolerance {
            errors.push(format!(
                "regimes.flat_tolerance ({:.2}) must be below 1 - unit_slope_tolerance ({:.2})",
                r.flat_tolerance,
                1.0 - r.unit_slope_tolerance
            ));
        }
        if r.min_radial_points < 2 {
            errors.push("regimes.min_radial_points must be >= 2".to_string());
        }
        if r.boundary_level_ratio <= 1.0 {
            errors.push(format!(
                "regimes.boundary_level_ratio ({:.2}) must be > 1",
                r.boundary_level_ratio
            ));
        }
        if r.confidence_variance_scale <= 0.0 {
            errors.push("regimes.confidence_variance_scale must be > 0".to_string());
        }

        // Matching
        let m = &self.matching;
        if m.max_iterations == 0 {
            errors.push("matching.max_iterations must be > 0".to_string());
        }
        if !(m.initial_step > 0.0 && m.initial_step < 1.0) {
            errors.push(format!(
                "matching.initial_step = {:.3} must be within (0, 1)",
                m.initial_step
            ));
        }
        if !(m.step_decay > 0.0 && m.step_decay < 1.0) {
            errors.push(format!(
                "matching.step_decay = {:.3} must be within (0, 1)",
                m.step_decay
            ));
        }
        if m.min_step <= 0.0 {
            errors.push("matching.min_step must be > 0".to_string());
        }
        if m.skin_step_scale <= 0.0 {
            errors.push("matching.skin_step_scale must be > 0".to_string());
        }
        if m.derivative_weight < 0.0 {
            errors.push("matching.derivative_weight cannot be negative".to_string());
        }

        // Quality: excellent > good > fair
        let q = &self.quality;
        if !(q.excellent_r_squared > q.good_r_squared && q.good_r_squared > q.fair_r_squared) {
            errors.push(format!(
                "quality thresholds must descend: excellent ({:.2}) > good ({:.2}) > fair ({:.2})",
                q.excellent_r_squared, q.good_r_squared, q.fair_r_squared
            ));
        }

        if self.session.history_depth == 0 {
            errors.push("session.history_depth must be > 0".to_string());
        }
        if self.session.event_channel_capacity == 0 {
            errors.push("session.event_channel_capacity must be > 0".to_string());
        }

        // Physical range validation
        let (range_errors, range_warnings) = super::validation::validate_physical_ranges(self);
        errors.extend(range_errors);
        for w in &range_warnings {
            warn!("{}", w);
        }

        // Reject NaN/Inf in any config value (sweep all f64 fields via serialization)
        if let Ok(ref s) = toml::to_string(self) {
            if s.contains("nan") || s.contains("inf") {
                errors.push("Config contains NaN or Inf values; all settings must be finite numbers".to_string());
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, toml::de::Error),
    Serialize(toml::ser::Error),
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(path, e) => write!(f, "Config I/O error ({}): {}", path.display(), e),
            ConfigError::Parse(path, e) => {
                write!(f, "Config parse error ({}): {}", path.display(), e)
            }
            ConfigError::Serialize(e) => write!(f, "Config serialization error: {}", e),
            ConfigError::Validation(errors) => {
                writeln!(f, "Config validation failed:")?;
                for e in errors {
                    writeln!(f, "  - {}", e)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Derivative
// ============================================================================

/// Bourdet derivative smoothing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DerivativeSettings {
    /// Smoothing half-window L, in log10 cycles of superposition time.
    /// 0 uses the adjacent points.
    #[serde(default = "default_smoothing_l")]
    pub smoothing_l: f64,

    /// Floor applied to time before taking its logarithm (hours).
    #[serde(default = "default_time_floor")]
    pub time_floor_hours: f64,
}

fn default_smoothing_l() -> f64 { 0.3 }
fn default_time_floor() -> f64 { 1e-9 }

impl Default for DerivativeSettings {
    fn default() -> Self {
        Self {
            smoothing_l: default_smoothing_l(),
            time_floor_hours: default_time_floor(),
        }
    }
}

// ============================================================================
// Regime Classification
// ============================================================================

/// Slope bands used to label the derivative curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegimeSettings {
    /// Points on each side of the sliding slope window.
    #[serde(default = "default_window_half_width")]
    pub window_half_width: usize,

    /// |slope - 1| within this band reads as unit slope (storage).
    #[serde(default = "default_unit_slope_tolerance")]
    pub unit_slope_tolerance: f64,

    /// |slope| within this band reads as flat (radial flow candidate).
    #[serde(default = "default_flat_tolerance")]
    pub flat_tolerance: f64,

    /// Minimum ln(time) span of a flat run to call it radial flow.
    #[serde(default = "default_min_radial_span")]
    pub min_radial_span: f64,

    /// Minimum number of points in a flat run to call it radial flow.
    #[serde(default = "default_min_radial_points")]
    pub min_radial_points: usize,

    /// A later plateau this many times above (or below) the first radial
    /// plateau is a boundary response, not a second radial flow.
    #[serde(default = "default_boundary_level_ratio")]
    pub boundary_level_ratio: f64,

    /// Slope variance at which segment confidence starts dropping below 1.
    #[serde(default = "default_confidence_variance_scale")]
    pub confidence_variance_scale: f64,
}

fn default_window_half_width() -> usize { 3 }
fn default_unit_slope_tolerance() -> f64 { 0.3 }
fn default_flat_tolerance() -> f64 { 0.15 }
fn default_min_radial_span() -> f64 { 1.0 }
fn default_min_radial_points() -> usize { 3 }
fn default_boundary_level_ratio() -> f64 { 1.5 }
fn default_confidence_variance_scale() -> f64 { 0.01 }

impl Default for RegimeSettings {
    fn default() -> Self {
        Self {
            window_half_width: default_window_half_width(),
            unit_slope_tolerance: default_unit_slope_tolerance(),
            flat_tolerance: default_flat_tolerance(),
            min_radial_span: default_min_radial_span(),
            min_radial_points: default_min_radial_points(),
            boundary_level_ratio: default_boundary_level_ratio(),
            confidence_variance_scale: default_confidence_variance_scale(),
        }
    }
}

// ============================================================================
// Matching
// ============================================================================

/// Auto-match optimizer tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchingSettings {
    /// Model selected for new sessions.
    #[serde(default)]
    pub default_model: ModelId,

    /// Hard iteration cap; the only termination guarantee.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Initial relative perturbation.
    #[serde(default = "default_initial_step")]
    pub initial_step: f64,

    /// Step multiplier applied after every iteration.
    #[serde(default = "default_step_decay")]
    pub step_decay: f64,

    /// Search stops once the step falls below this.
    #[serde(default = "default_min_step")]
    pub min_step: f64,

    /// Skin is perturbed additively by `step * skin_step_scale`.
    #[serde(default = "default_skin_step_scale")]
    pub skin_step_scale: f64,

    /// Weight of derivative residuals relative to pressure residuals.
    /// 0 matches pressure only.
    #[serde(default = "default_derivative_weight")]
    pub derivative_weight: f64,
}

fn default_max_iterations() -> usize { 50 }
fn default_initial_step() -> f64 { 0.1 }
fn default_step_decay() -> f64 { 0.95 }
fn default_min_step() -> f64 { 1e-4 }
fn default_skin_step_scale() -> f64 { 10.0 }
fn default_derivative_weight() -> f64 { 1.0 }

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            default_model: ModelId::default(),
            max_iterations: default_max_iterations(),
            initial_step: default_initial_step(),
            step_decay: default_step_decay(),
            min_step: default_min_step(),
            skin_step_scale: default_skin_step_scale(),
            derivative_weight: default_derivative_weight(),
        }
    }
}

// ============================================================================
// Match Quality
// ============================================================================

/// R² thresholds for the qualitative match rating (strictly greater than).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityThresholds {
    #[serde(default = "default_excellent")]
    pub excellent_r_squared: f64,
    #[serde(default = "default_good")]
    pub good_r_squared: f64,
    #[serde(default = "default_fair")]
    pub fair_r_squared: f64,
}

fn default_excellent() -> f64 { 0.9 }
fn default_good() -> f64 { 0.8 }
fn default_fair() -> f64 { 0.6 }

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            excellent_r_squared: default_excellent(),
            good_r_squared: default_good(),
            fair_r_squared: default_fair(),
        }
    }
}

// ============================================================================
// Session
// ============================================================================

/// Interpretation session limits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Maximum undo (and redo) depth for model parameters.
    #[serde(default = "default_history_depth")]
    pub history_depth: usize,

    /// Buffered session events per subscriber before lagging ones drop.
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

fn default_history_depth() -> usize { 20 }
fn default_event_channel_capacity() -> usize { 256 }

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            history_depth: default_history_depth(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

// ============================================================================
// Parameter Templates
// ============================================================================

/// Starting parameters used before any manual or automatic match.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterTemplates {
    #[serde(default = "default_template_permeability")]
    pub permeability_md: f64,
    #[serde(default = "default_template_skin")]
    pub skin: f64,
    #[serde(default = "default_template_storage")]
    pub wellbore_storage_bbl_psi: f64,
    #[serde(default = "default_template_fault_distance")]
    pub fault_distance_ft: f64,
}

fn default_template_permeability() -> f64 { 10.0 }
fn default_template_skin() -> f64 { 0.0 }
fn default_template_storage() -> f64 { 0.01 }
fn default_template_fault_distance() -> f64 { 500.0 }

impl Default for ParameterTemplates {
    fn default() -> Self {
        Self {
            permeability_md: default_template_permeability(),
            skin: default_template_skin(),
            wellbore_storage_bbl_psi: default_template_storage(),
            fault_distance_ft: default_template_fault_distance(),
        }
    }
}

impl ParameterTemplates {
    /// Starting parameters for `model`; the fault distance is only filled
    /// in for models that use it.
    pub fn parameters_for(&self, model: ModelId) -> ModelParameters {
        let params = ModelParameters::new(
            self.permeability_md,
            self.skin,
            self.wellbore_storage_bbl_psi,
        );
        match model {
            ModelId::WellboreStorageRadial => params,
            ModelId::WellboreStorageFault => params.with_fault_distance(self.fault_distance_ft),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok(), "Default config must always validate");
    }

    #[test]
    fn test_empty_toml_produces_defaults() {
        let config: EngineConfig = toml::from_str("").expect("empty TOML should parse");
        assert_eq!(config.derivative.smoothing_l, 0.3);
        assert_eq!(config.matching.max_iterations, 50);
        assert_eq!(config.matching.step_decay, 0.95);
        assert_eq!(config.session.history_depth, 20);
        assert_eq!(config.quality.excellent_r_squared, 0.9);
    }

    #[test]
    fn test_partial_toml_override() {
        let toml_str = r#"
[derivative]
smoothing_l = 0.5

[matching]
default_model = "wbs_fault"
max_iterations = 80
"#;
        let config = EngineConfig::from_toml_str(toml_str).expect("partial TOML should parse");
        assert_eq!(config.derivative.smoothing_l, 0.5);
        assert_eq!(config.matching.default_model, ModelId::WellboreStorageFault);
        assert_eq!(config.matching.max_iterations, 80);
        // Non-overridden values retain defaults
        assert_eq!(config.derivative.time_floor_hours, 1e-9);
        assert_eq!(config.matching.initial_step, 0.1);
    }

    #[test]
    fn test_unknown_model_id_is_a_parse_error() {
        let result = EngineConfig::from_toml_str("[matching]\ndefault_model = \"dual_porosity\"\n");
        assert!(matches!(result, Err(ConfigError::Parse(_, _))));
    }

    #[test]
    fn test_validation_catches_overlapping_slope_bands() {
        let mut config = EngineConfig::default();
        config.regimes.flat_tolerance = 0.5;
        config.regimes.unit_slope_tolerance = 0.6;
        let result = config.validate();
        assert!(result.is_err(), "Overlapping bands should fail validation");
        if let Err(ConfigError::Validation(errors)) = result {
            assert!(errors.iter().any(|e| e.contains("flat_tolerance")));
        }
    }

    #[test]
    fn test_validation_catches_growing_step() {
        let mut config = EngineConfig::default();
        config.matching.step_decay = 1.2;
        assert!(config.validate().is_err(), "Step decay above 1 should fail");
    }

    #[test]
    fn test_validation_catches_inverted_quality_thresholds() {
        let mut config = EngineConfig::default();
        config.quality.good_r_squared = 0.95;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_roundtrip_toml() {
        let original = EngineConfig::default();
        let toml_str = original.to_toml().expect("serialization should work");
        let roundtripped: EngineConfig =
            toml::from_str(&toml_str).expect("deserialization should work");
        assert_eq!(original, roundtripped);
    }

    #[test]
    fn test_templates_fill_fault_distance_only_for_fault_model() {
        let templates = ParameterTemplates::default();
        assert_eq!(
            templates.parameters_for(ModelId::WellboreStorageRadial).fault_distance_ft,
            None
        );
        assert_eq!(
            templates.parameters_for(ModelId::WellboreStorageFault).fault_distance_ft,
            Some(500.0)
        );
    }
}
