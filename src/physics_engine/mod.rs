//! Physics Engine Module
//!
//! Deterministic pressure-transient calculations. Everything here is pure:
//! the same inputs always produce bit-identical outputs.
//!
//! ## Diagnostics path
//! - `superposition` - equivalent time and pressure change
//! - `derivative` - smoothed Bourdet derivative
//!
//! ## Matching path
//! - `type_curves` - analytical reservoir models (`ReservoirModel`)
//! - `flow_capacity` - kh, mobility, skin pressure drop, radius of investigation

pub mod derivative;
pub mod flow_capacity;
pub mod superposition;
pub mod type_curves;

pub use derivative::BourdetDerivativeEngine;
pub use flow_capacity::calculate_flow_capacity;
pub use superposition::{delta_pressures, equivalent_time, reference_pressure, superposition_times};
pub use type_curves::{
    build_model, build_model_by_name, ModelError, ReservoirContext, ReservoirModel, TypeCurve,
    WellboreStorageFault, WellboreStorageRadial,
};
