//! System-wide default constants.
//!
//! Centralises numeric guards and limits that are not operator-tunable.
//! Grouped by subsystem for easy discovery.

// ============================================================================
// Import
// ============================================================================

/// Minimum number of valid records needed to leave column mapping.
///
/// Three points are the least a three-point derivative can work with.
pub const MIN_VALID_RECORDS: usize = 3;

// ============================================================================
// Physics
// ============================================================================

/// Floor applied to dimensionless pressure before blending and logarithms.
pub const PD_FLOOR: f64 = 1e-6;

/// Floor applied to modeled pressure change (psi).
pub const DELTA_P_FLOOR: f64 = 1e-6;

/// Half-width in ln(t) of the central difference used for model derivatives.
pub const MODEL_DERIVATIVE_DELTA: f64 = 1e-3;

// ============================================================================
// Matching
// ============================================================================

/// Initial RMSE below which the relative-improvement confidence is
/// reported as 1.0 (the starting guess already reproduces the data).
pub const NEGLIGIBLE_RMSE: f64 = 1e-12;

/// Physical search bounds: permeability (md).
pub const PERMEABILITY_BOUNDS: (f64, f64) = (1e-4, 1e5);

/// Physical search bounds: skin.
pub const SKIN_BOUNDS: (f64, f64) = (-7.0, 50.0);

/// Physical search bounds: wellbore storage (bbl/psi).
pub const WELLBORE_STORAGE_BOUNDS: (f64, f64) = (1e-6, 10.0);

/// Physical search bounds: fault distance (ft).
pub const FAULT_DISTANCE_BOUNDS: (f64, f64) = (1.0, 1e5);

// ============================================================================
// Session
// ============================================================================

/// Command channel capacity between session handles and the actor.
pub const SESSION_COMMAND_CHANNEL_SIZE: usize = 100;

/// Store key for the persisted test configuration.
pub const STORE_KEY_TEST_CONFIG: &str = "test_config";

/// Store key for the persisted processing/display settings.
pub const STORE_KEY_APP_SETTINGS: &str = "app_settings";
