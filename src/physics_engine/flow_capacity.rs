//! Flow capacity from fitted parameters
//!
//! Divisor guards return `None` for the affected property only; the
//! remaining properties are still reported.

use super::type_curves::ReservoirContext;
use crate::types::{FlowCapacity, ModelParameters};

/// kh, kh/μ, k/μ, kh/(μB), skin pressure drop and radius of investigation.
///
/// `duration_hours` is the elapsed test time the radius of investigation
/// is evaluated at.
pub fn calculate_flow_capacity(
    params: &ModelParameters,
    ctx: &ReservoirContext,
    duration_hours: f64,
) -> FlowCapacity {
    let k = params.permeability_md;
    let h = ctx.net_pay_ft;
    let mu = ctx.viscosity_cp;
    let b = ctx.formation_volume_factor;
    let kh = k * h;

    let finite = |v: f64| v.is_finite().then_some(v);
    let mu_ok = mu > 0.0;

    let transmissibility = if mu_ok { finite(kh / mu) } else { None };
    let mobility = if mu_ok { finite(k / mu) } else { None };
    let kh_over_mu_b = if mu_ok && b > 0.0 { finite(kh / (mu * b)) } else { None };

    let skin_pressure_drop_psi = if kh > 0.0 && mu_ok && b > 0.0 {
        finite(141.2 * ctx.rate * b * mu * params.skin / kh)
    } else {
        None
    };

    let diffusivity_denominator = 948.0 * ctx.porosity * mu * ctx.total_compressibility;
    let radius_of_investigation_ft =
        if diffusivity_denominator > 0.0 && duration_hours > 0.0 && k >= 0.0 {
            finite((k * duration_hours / diffusivity_denominator).sqrt())
        } else {
            None
        };

    FlowCapacity {
        kh_md_ft: kh,
        transmissibility,
        mobility,
        kh_over_mu_b,
        skin_pressure_drop_psi,
        radius_of_investigation_ft,
    }
}
