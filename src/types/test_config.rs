//! Test setup: test type, fluid and formation properties, producing history

use serde::{Deserialize, Serialize};

use super::TestRecord;

/// Kind of pressure-transient test.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestType {
    /// Well shut in after a producing period; pressure rises
    #[default]
    Buildup,
    /// Well opened to flow; pressure falls
    Drawdown,
}

impl std::fmt::Display for TestType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestType::Buildup => write!(f, "Buildup"),
            TestType::Drawdown => write!(f, "Drawdown"),
        }
    }
}

/// Reservoir fluid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FluidType {
    #[default]
    Oil,
    Gas,
    Water,
}

impl std::fmt::Display for FluidType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FluidType::Oil => write!(f, "Oil"),
            FluidType::Gas => write!(f, "Gas"),
            FluidType::Water => write!(f, "Water"),
        }
    }
}

/// One constant-rate period of the producing history before the test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatePeriod {
    /// Length of the period (hours)
    pub duration_hours: f64,
    /// Rate during the period
    pub rate: f64,
}

/// Immutable snapshot of the test setup.
///
/// Replacing it invalidates every derived diagnostic and match result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestConfiguration {
    pub test_type: TestType,
    #[serde(default)]
    pub fluid_type: FluidType,
    /// Producing time before shut-in (hours); used for buildup equivalent time
    #[serde(default)]
    pub producing_time_hours: f64,
    /// Porosity (fraction)
    pub porosity: f64,
    /// Total compressibility (1/psi)
    pub total_compressibility: f64,
    /// Wellbore radius (ft)
    pub wellbore_radius_ft: f64,
    /// Net pay thickness (ft)
    pub net_pay_ft: f64,
    /// Fluid viscosity (cp)
    pub viscosity_cp: f64,
    /// Formation volume factor (rb/STB)
    pub formation_volume_factor: f64,
    /// Initial reservoir pressure (psi); 0 when unknown
    #[serde(default)]
    pub initial_pressure_psi: f64,
    /// Multi-rate producing history; empty means a single period of
    /// `producing_time_hours`
    #[serde(default)]
    pub rate_history: Vec<RatePeriod>,
}

impl Default for TestConfiguration {
    fn default() -> Self {
        Self {
            test_type: TestType::Buildup,
            fluid_type: FluidType::Oil,
            producing_time_hours: 0.0,
            porosity: 0.2,
            total_compressibility: 1e-5,
            wellbore_radius_ft: 0.3,
            net_pay_ft: 50.0,
            viscosity_cp: 1.0,
            formation_volume_factor: 1.2,
            initial_pressure_psi: 0.0,
            rate_history: Vec::new(),
        }
    }
}

impl TestConfiguration {
    /// Check that every property used as a divisor or under a logarithm is
    /// physically meaningful. Returns one message per problem.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let positive = [
            ("porosity", self.porosity),
            ("total_compressibility", self.total_compressibility),
            ("wellbore_radius_ft", self.wellbore_radius_ft),
            ("net_pay_ft", self.net_pay_ft),
            ("viscosity_cp", self.viscosity_cp),
            ("formation_volume_factor", self.formation_volume_factor),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                errors.push(format!("{name} = {value} must be a positive finite number"));
            }
        }
        if self.porosity > 1.0 {
            errors.push(format!("porosity = {:.3} must be a fraction (<= 1)", self.porosity));
        }
        if !self.producing_time_hours.is_finite() || self.producing_time_hours < 0.0 {
            errors.push(format!(
                "producing_time_hours = {} cannot be negative",
                self.producing_time_hours
            ));
        }
        if !self.initial_pressure_psi.is_finite() || self.initial_pressure_psi < 0.0 {
            errors.push(format!(
                "initial_pressure_psi = {} cannot be negative",
                self.initial_pressure_psi
            ));
        }
        for (i, period) in self.rate_history.iter().enumerate() {
            if !period.duration_hours.is_finite() || period.duration_hours <= 0.0 {
                errors.push(format!("rate_history[{i}].duration_hours must be > 0"));
            }
            if !period.rate.is_finite() {
                errors.push(format!("rate_history[{i}].rate must be finite"));
            }
        }
        errors
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }

    /// Total producing time before the test: the rate history length when
    /// present, otherwise `producing_time_hours`.
    pub fn total_producing_time(&self) -> f64 {
        if self.rate_history.is_empty() {
            self.producing_time_hours
        } else {
            self.rate_history.iter().map(|p| p.duration_hours).sum()
        }
    }

    /// Rate used to scale dimensionless solutions.
    ///
    /// Last producing period of the history when present, otherwise the
    /// largest absolute rate in the records. Zero when nothing flowed.
    pub fn reference_rate(&self, records: &[TestRecord]) -> f64 {
        if let Some(last) = self.rate_history.last() {
            return last.rate.abs();
        }
        records
            .iter()
            .map(|r| r.rate.abs())
            .filter(|r| r.is_finite())
            .fold(0.0, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_configuration_validates() {
        assert!(TestConfiguration::default().is_valid());
    }

    #[test]
    fn test_validation_catches_zero_viscosity() {
        let config = TestConfiguration {
            viscosity_cp: 0.0,
            ..Default::default()
        };
        let errors = config.validate();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("viscosity_cp"));
    }

    #[test]
    fn test_reference_rate_prefers_history() {
        let records = vec![TestRecord::new(0.1, 3000.0, 250.0)];
        let mut config = TestConfiguration::default();
        assert_eq!(config.reference_rate(&records), 250.0);

        config.rate_history = vec![
            RatePeriod { duration_hours: 10.0, rate: 400.0 },
            RatePeriod { duration_hours: 5.0, rate: 600.0 },
        ];
        assert_eq!(config.reference_rate(&records), 600.0);
        assert_eq!(config.total_producing_time(), 15.0);
    }
}
