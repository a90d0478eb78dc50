//! Analytical type-curves for the supported reservoir models
//!
//! Each model maps `ModelParameters` and a set of (superposition) times to a
//! pressure-change curve and its logarithmic derivative, in field units:
//!
//! - tD = 0.0002637·k·t / (φ·μ·ct·rw²)
//! - CD = 0.8936·C / (φ·ct·h·rw²)
//! - Δp = 141.2·q·B·μ / (k·h) · pD
//!
//! The wellbore storage to radial flow transition is an exponential blend of
//! the pure-storage solution tD/CD and the semilog radial solution, which has
//! the right unit-slope and half-slope asymptotes without a Laplace inversion.

use statrs::function::exponential;
use thiserror::Error;

use crate::config::defaults::{DELTA_P_FLOOR, MODEL_DERIVATIVE_DELTA, PD_FLOOR};
use crate::types::{ModelId, ModelParameters, ParameterKind, TestConfiguration, TestRecord};

/// ln(4/γ') semilog intercept: 0.5·(ln tD + 0.80907)
const SEMILOG_INTERCEPT: f64 = 0.80907;

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error, PartialEq)]
pub enum ModelError {
    #[error("unknown reservoir model '{0}'")]
    UnknownModel(String),

    #[error("invalid reservoir context: {0}")]
    InvalidContext(String),
}

// ============================================================================
// Reservoir Context
// ============================================================================

/// Fluid, rock and rate properties shared by every model evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReservoirContext {
    /// Reference rate q (STB/d)
    pub rate: f64,
    /// Formation volume factor B (rb/STB)
    pub formation_volume_factor: f64,
    /// Viscosity μ (cp)
    pub viscosity_cp: f64,
    /// Net pay h (ft)
    pub net_pay_ft: f64,
    /// Porosity φ (fraction)
    pub porosity: f64,
    /// Total compressibility ct (1/psi)
    pub total_compressibility: f64,
    /// Wellbore radius rw (ft)
    pub wellbore_radius_ft: f64,
}

impl ReservoirContext {
    pub fn from_configuration(config: &TestConfiguration, records: &[TestRecord]) -> Self {
        Self {
            rate: config.reference_rate(records),
            formation_volume_factor: config.formation_volume_factor,
            viscosity_cp: config.viscosity_cp,
            net_pay_ft: config.net_pay_ft,
            porosity: config.porosity,
            total_compressibility: config.total_compressibility,
            wellbore_radius_ft: config.wellbore_radius_ft,
        }
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        let fields = [
            ("rate", self.rate),
            ("formation_volume_factor", self.formation_volume_factor),
            ("viscosity_cp", self.viscosity_cp),
            ("net_pay_ft", self.net_pay_ft),
            ("porosity", self.porosity),
            ("total_compressibility", self.total_compressibility),
            ("wellbore_radius_ft", self.wellbore_radius_ft),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value <= 0.0 {
                return Err(ModelError::InvalidContext(format!(
                    "{name} = {value} must be positive"
                )));
            }
        }
        Ok(())
    }

    fn dimensionless_time(&self, permeability_md: f64, t: f64) -> f64 {
        0.0002637 * permeability_md * t
            / (self.porosity
                * self.viscosity_cp
                * self.total_compressibility
                * self.wellbore_radius_ft.powi(2))
    }

    fn dimensionless_storage(&self, storage_bbl_psi: f64) -> f64 {
        0.8936 * storage_bbl_psi
            / (self.porosity
                * self.total_compressibility
                * self.net_pay_ft
                * self.wellbore_radius_ft.powi(2))
    }

    /// psi per unit of dimensionless pressure.
    fn pressure_scale(&self, permeability_md: f64) -> f64 {
        141.2 * self.rate * self.formation_volume_factor * self.viscosity_cp
            / (permeability_md * self.net_pay_ft)
    }
}

// ============================================================================
// Model Capability
// ============================================================================

/// Modeled pressure change and its logarithmic derivative.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeCurve {
    pub pressure: Vec<f64>,
    pub derivative: Vec<f64>,
}

/// An analytical reservoir model.
pub trait ReservoirModel: Send + Sync {
    fn id(&self) -> ModelId;

    /// Parameters the optimizer may adjust, in search order.
    fn tunable_parameters(&self) -> &'static [ParameterKind];

    /// Pressure change (psi) at time `t` (hours), floored at a small positive
    /// value so it can always be plotted on log axes.
    fn pressure_change(&self, params: &ModelParameters, t: f64) -> f64;

    /// Pressure and ln(t)-derivative at every time in `times`.
    fn generate_curve(&self, params: &ModelParameters, times: &[f64]) -> TypeCurve {
        let delta = MODEL_DERIVATIVE_DELTA;
        let (up, down) = (delta.exp(), (-delta).exp());
        let pressure = times
            .iter()
            .map(|&t| self.pressure_change(params, t))
            .collect();
        let derivative = times
            .iter()
            .map(|&t| {
                (self.pressure_change(params, t * up) - self.pressure_change(params, t * down))
                    / (2.0 * delta)
            })
            .collect();
        TypeCurve { pressure, derivative }
    }
}

/// Line-source E1 for an image well; 0 where it has no finite value.
fn image_well_e1(x: f64) -> f64 {
    match exponential::integral(x, 1) {
        Ok(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

/// Storage/radial blend with an optional extra radial term (image wells).
fn blended_pressure(
    ctx: &ReservoirContext,
    params: &ModelParameters,
    t: f64,
    image_term: impl Fn(f64) -> f64,
) -> f64 {
    let k = params.permeability_md;
    let c = params.wellbore_storage_bbl_psi;
    if !(t > 0.0 && k > 0.0 && c > 0.0) {
        return DELTA_P_FLOOR;
    }

    let td = ctx.dimensionless_time(k, t);
    let cd = ctx.dimensionless_storage(c);
    let p_wbs = td / cd;
    let p_res = (0.5 * (td.ln() + SEMILOG_INTERCEPT) + params.skin + image_term(td)).max(PD_FLOOR);
    let pd = (p_res * (1.0 - (-p_wbs / p_res).exp())).max(PD_FLOOR);

    let dp = ctx.pressure_scale(k) * pd;
    if dp.is_finite() {
        dp.max(DELTA_P_FLOOR)
    } else {
        DELTA_P_FLOOR
    }
}

// ============================================================================
// Models
// ============================================================================

/// Infinite-acting homogeneous reservoir with wellbore storage and skin.
#[derive(Debug, Clone, Copy)]
pub struct WellboreStorageRadial {
    ctx: ReservoirContext,
}

impl WellboreStorageRadial {
    pub fn new(ctx: ReservoirContext) -> Self {
        Self { ctx }
    }
}

impl ReservoirModel for WellboreStorageRadial {
    fn id(&self) -> ModelId {
        ModelId::WellboreStorageRadial
    }

    fn tunable_parameters(&self) -> &'static [ParameterKind] {
        &[
            ParameterKind::Permeability,
            ParameterKind::Skin,
            ParameterKind::WellboreStorage,
        ]
    }

    fn pressure_change(&self, params: &ModelParameters, t: f64) -> f64 {
        blended_pressure(&self.ctx, params, t, |_| 0.0)
    }
}

/// Radial model bounded by one sealing fault at distance L, represented by
/// an image well at 2L. Without a fault distance it behaves as the radial
/// model.
#[derive(Debug, Clone, Copy)]
pub struct WellboreStorageFault {
    ctx: ReservoirContext,
}

impl WellboreStorageFault {
    pub fn new(ctx: ReservoirContext) -> Self {
        Self { ctx }
    }
}

impl ReservoirModel for WellboreStorageFault {
    fn id(&self) -> ModelId {
        ModelId::WellboreStorageFault
    }

    fn tunable_parameters(&self) -> &'static [ParameterKind] {
        &[
            ParameterKind::Permeability,
            ParameterKind::Skin,
            ParameterKind::WellboreStorage,
            ParameterKind::FaultDistance,
        ]
    }

    fn pressure_change(&self, params: &ModelParameters, t: f64) -> f64 {
        let rw = self.ctx.wellbore_radius_ft;
        let image = |td: f64| match params.fault_distance_ft {
            Some(l) if l > 0.0 => {
                let rd = 2.0 * l / rw;
                0.5 * image_well_e1(rd * rd / (4.0 * td))
            }
            _ => 0.0,
        };
        blended_pressure(&self.ctx, params, t, image)
    }
}

// ============================================================================
// Construction
// ============================================================================

/// Build the model for `id` over `ctx`.
pub fn build_model(id: ModelId, ctx: ReservoirContext) -> Result<Box<dyn ReservoirModel>, ModelError> {
    ctx.validate()?;
    Ok(match id {
        ModelId::WellboreStorageRadial => Box::new(WellboreStorageRadial::new(ctx)),
        ModelId::WellboreStorageFault => Box::new(WellboreStorageFault::new(ctx)),
    })
}

/// Build a model from its string identifier (as stored in configuration).
pub fn build_model_by_name(
    name: &str,
    ctx: ReservoirContext,
) -> Result<Box<dyn ReservoirModel>, ModelError> {
    build_model(name.parse()?, ctx)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> ReservoirContext {
        ReservoirContext {
            rate: 500.0,
            formation_volume_factor: 1.2,
            viscosity_cp: 1.0,
            net_pay_ft: 50.0,
            porosity: 0.2,
            total_compressibility: 1e-5,
            wellbore_radius_ft: 0.3,
        }
    }

    fn params() -> ModelParameters {
        ModelParameters::new(50.0, 5.0, 0.02)
    }

    #[test]
    fn test_early_time_is_unit_slope() {
        let model = WellboreStorageRadial::new(ctx());
        let curve = model.generate_curve(&params(), &[1e-4]);
        let ratio = curve.derivative[0] / curve.pressure[0];
        assert!((ratio - 1.0).abs() < 0.02, "early derivative/Δp = {ratio}");
    }

    #[test]
    fn test_late_time_derivative_is_half_of_pressure_scale() {
        let model = WellboreStorageRadial::new(ctx());
        let curve = model.generate_curve(&params(), &[100.0]);
        // 141.2·500·1.2·1/(50·50)·0.5
        let expected = 16.944;
        assert!(
            (curve.derivative[0] - expected).abs() / expected < 0.01,
            "late derivative = {}",
            curve.derivative[0]
        );
    }

    #[test]
    fn test_image_well_e1_reference_values() {
        // Abramowitz & Stegun table 5.1
        let cases = [
            (0.01, 4.037_929_576_538),
            (0.1, 1.822_923_958_419),
            (0.5, 0.559_773_594_777),
            (1.0, 0.219_383_934_396),
            (2.0, 0.048_900_510_708),
            (5.0, 0.001_148_295_591),
        ];
        for (x, expected) in cases {
            let got = image_well_e1(x);
            assert!(
                ((got - expected) / expected).abs() < 1e-9,
                "E1({x}) = {got}, expected {expected}"
            );
        }
        // No image contribution where E1 is undefined or vanishes
        assert_eq!(image_well_e1(0.0), 0.0);
        assert_eq!(image_well_e1(1e4), 0.0);
    }

    #[test]
    fn test_fault_doubles_late_derivative() {
        let radial = WellboreStorageRadial::new(ctx());
        let fault = WellboreStorageFault::new(ctx());
        let p = params().with_fault_distance(100.0);
        let d_radial = radial.generate_curve(&p, &[1000.0]).derivative[0];
        let d_fault = fault.generate_curve(&p, &[1000.0]).derivative[0];
        let ratio = d_fault / d_radial;
        assert!((1.9..2.05).contains(&ratio), "fault/radial derivative ratio = {ratio}");
    }

    #[test]
    fn test_fault_model_without_distance_matches_radial() {
        let radial = WellboreStorageRadial::new(ctx());
        let fault = WellboreStorageFault::new(ctx());
        let times = [0.01, 1.0, 100.0];
        assert_eq!(
            radial.generate_curve(&params(), &times),
            fault.generate_curve(&params(), &times)
        );
    }

    #[test]
    fn test_generation_is_deterministic() {
        let model = build_model(ModelId::WellboreStorageRadial, ctx()).unwrap();
        let times: Vec<f64> = (0..20).map(|i| 0.01 * 10f64.powf(i as f64 / 5.0)).collect();
        let a = model.generate_curve(&params(), &times);
        let b = model.generate_curve(&params(), &times);
        for (x, y) in a.pressure.iter().zip(&b.pressure) {
            assert_eq!(x.to_bits(), y.to_bits());
        }
    }

    #[test]
    fn test_degenerate_inputs_are_floored() {
        let model = WellboreStorageRadial::new(ctx());
        assert_eq!(model.pressure_change(&params(), 0.0), DELTA_P_FLOOR);
        assert_eq!(
            model.pressure_change(&ModelParameters::new(0.0, 0.0, 0.01), 1.0),
            DELTA_P_FLOOR
        );
        // Large negative skin cannot produce negative pressure
        assert!(model.pressure_change(&ModelParameters::new(50.0, -50.0, 0.01), 1.0) > 0.0);
    }

    #[test]
    fn test_unknown_model_name_is_rejected() {
        let err = build_model_by_name("dual_porosity", ctx()).err();
        assert_eq!(err, Some(ModelError::UnknownModel("dual_porosity".to_string())));
        assert!(build_model_by_name("wbs_fault", ctx()).is_ok());
    }

    #[test]
    fn test_invalid_context_is_rejected() {
        let bad = ReservoirContext { net_pay_ft: 0.0, ..ctx() };
        assert!(matches!(
            build_model(ModelId::WellboreStorageRadial, bad),
            Err(ModelError::InvalidContext(_))
        ));
    }
}
