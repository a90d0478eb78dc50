//! Type-curve matching types: model identifiers, fit parameters and scores

use serde::{Deserialize, Serialize};

use crate::physics_engine::ModelError;

/// Closed set of analytical reservoir models.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelId {
    /// Homogeneous infinite-acting reservoir with wellbore storage and skin
    #[default]
    #[serde(rename = "wbs_radial")]
    WellboreStorageRadial,
    /// Same, bounded by a single sealing fault (image well)
    #[serde(rename = "wbs_fault")]
    WellboreStorageFault,
}

impl ModelId {
    pub const ALL: [ModelId; 2] = [ModelId::WellboreStorageRadial, ModelId::WellboreStorageFault];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelId::WellboreStorageRadial => "wbs_radial",
            ModelId::WellboreStorageFault => "wbs_fault",
        }
    }
}

impl std::fmt::Display for ModelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ModelId {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModelId::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ModelError::UnknownModel(s.to_string()))
    }
}

/// A model parameter the optimizer may adjust.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterKind {
    Permeability,
    Skin,
    WellboreStorage,
    FaultDistance,
}

impl std::fmt::Display for ParameterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParameterKind::Permeability => write!(f, "permeability"),
            ParameterKind::Skin => write!(f, "skin"),
            ParameterKind::WellboreStorage => write!(f, "wellbore storage"),
            ParameterKind::FaultDistance => write!(f, "fault distance"),
        }
    }
}

/// Reservoir parameters being fitted. Snapshots are immutable; every
/// committed change produces a new value with a higher `version`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelParameters {
    /// Permeability k (md)
    pub permeability_md: f64,
    /// Skin factor s (dimensionless)
    pub skin: f64,
    /// Wellbore storage coefficient C (bbl/psi)
    pub wellbore_storage_bbl_psi: f64,
    /// Distance to a sealing fault (ft); only used by the fault model
    #[serde(default)]
    pub fault_distance_ft: Option<f64>,
    /// Monotonic version, bumped on every committed change
    #[serde(default)]
    pub version: u64,
}

impl Default for ModelParameters {
    fn default() -> Self {
        Self {
            permeability_md: 10.0,
            skin: 0.0,
            wellbore_storage_bbl_psi: 0.01,
            fault_distance_ft: None,
            version: 0,
        }
    }
}

impl ModelParameters {
    pub fn new(permeability_md: f64, skin: f64, wellbore_storage_bbl_psi: f64) -> Self {
        Self {
            permeability_md,
            skin,
            wellbore_storage_bbl_psi,
            fault_distance_ft: None,
            version: 0,
        }
    }

    pub fn with_fault_distance(mut self, distance_ft: f64) -> Self {
        self.fault_distance_ft = Some(distance_ft);
        self
    }

    pub fn get(&self, kind: ParameterKind) -> Option<f64> {
        match kind {
            ParameterKind::Permeability => Some(self.permeability_md),
            ParameterKind::Skin => Some(self.skin),
            ParameterKind::WellboreStorage => Some(self.wellbore_storage_bbl_psi),
            ParameterKind::FaultDistance => self.fault_distance_ft,
        }
    }

    /// Copy with one parameter replaced. The version is left untouched;
    /// only committed updates bump it.
    pub fn with(mut self, kind: ParameterKind, value: f64) -> Self {
        match kind {
            ParameterKind::Permeability => self.permeability_md = value,
            ParameterKind::Skin => self.skin = value,
            ParameterKind::WellboreStorage => self.wellbore_storage_bbl_psi = value,
            ParameterKind::FaultDistance => self.fault_distance_ft = Some(value),
        }
        self
    }

    /// Same physical values, ignoring the version counter.
    pub fn same_values(&self, other: &Self) -> bool {
        self.permeability_md == other.permeability_md
            && self.skin == other.skin
            && self.wellbore_storage_bbl_psi == other.wellbore_storage_bbl_psi
            && self.fault_distance_ft == other.fault_distance_ft
    }
}

/// Partial change to `ModelParameters`; `None` fields keep the current value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterUpdate {
    #[serde(default)]
    pub permeability_md: Option<f64>,
    #[serde(default)]
    pub skin: Option<f64>,
    #[serde(default)]
    pub wellbore_storage_bbl_psi: Option<f64>,
    #[serde(default)]
    pub fault_distance_ft: Option<f64>,
}

impl ParameterUpdate {
    pub fn permeability(value: f64) -> Self {
        Self { permeability_md: Some(value), ..Default::default() }
    }

    pub fn skin(value: f64) -> Self {
        Self { skin: Some(value), ..Default::default() }
    }

    pub fn wellbore_storage(value: f64) -> Self {
        Self { wellbore_storage_bbl_psi: Some(value), ..Default::default() }
    }

    /// Full replacement with every value of `params`.
    pub fn replace_with(params: &ModelParameters) -> Self {
        Self {
            permeability_md: Some(params.permeability_md),
            skin: Some(params.skin),
            wellbore_storage_bbl_psi: Some(params.wellbore_storage_bbl_psi),
            fault_distance_ft: params.fault_distance_ft,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.permeability_md.is_none()
            && self.skin.is_none()
            && self.wellbore_storage_bbl_psi.is_none()
            && self.fault_distance_ft.is_none()
    }

    /// Merge onto `current`, producing the next version.
    pub fn apply(&self, current: &ModelParameters) -> ModelParameters {
        ModelParameters {
            permeability_md: self.permeability_md.unwrap_or(current.permeability_md),
            skin: self.skin.unwrap_or(current.skin),
            wellbore_storage_bbl_psi: self
                .wellbore_storage_bbl_psi
                .unwrap_or(current.wellbore_storage_bbl_psi),
            fault_distance_ft: self.fault_distance_ft.or(current.fault_distance_ft),
            version: current.version + 1,
        }
    }

    /// Problems that would make the merged parameters physically meaningless.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let positive = [
            ("permeability_md", self.permeability_md),
            ("wellbore_storage_bbl_psi", self.wellbore_storage_bbl_psi),
            ("fault_distance_ft", self.fault_distance_ft),
        ];
        for (name, value) in positive {
            if let Some(v) = value {
                if !v.is_finite() || v <= 0.0 {
                    errors.push(format!("{name} = {v} must be a positive finite number"));
                }
            }
        }
        if let Some(s) = self.skin {
            if !s.is_finite() {
                errors.push(format!("skin = {s} must be finite"));
            }
        }
        errors
    }
}

/// Qualitative match rating derived from R².
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchRating {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl std::fmt::Display for MatchRating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchRating::Excellent => write!(f, "Excellent"),
            MatchRating::Good => write!(f, "Good"),
            MatchRating::Fair => write!(f, "Fair"),
            MatchRating::Poor => write!(f, "Poor"),
        }
    }
}

/// Observed-vs-modeled fit score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchQuality {
    pub rmse: f64,
    pub r_squared: f64,
    pub rating: MatchRating,
    /// Number of point pairs that were scored
    pub points: usize,
}

/// Transmissibility-type properties derived from fitted parameters.
///
/// Fields are `None` wherever a zero or negative divisor made the value
/// undefined.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlowCapacity {
    /// Permeability-thickness product kh (md·ft)
    pub kh_md_ft: f64,
    /// kh/μ (md·ft/cp)
    pub transmissibility: Option<f64>,
    /// k/μ (md/cp)
    pub mobility: Option<f64>,
    /// kh/(μB) (md·ft/(cp·rb/STB))
    pub kh_over_mu_b: Option<f64>,
    /// Additional pressure drop caused by skin (psi)
    pub skin_pressure_drop_psi: Option<f64>,
    /// Radius of investigation reached at the end of the test (ft)
    pub radius_of_investigation_ft: Option<f64>,
}
