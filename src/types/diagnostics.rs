//! Diagnostic-plot types: derivative points and flow-regime segments

use serde::{Deserialize, Serialize};

/// One point of the log-log diagnostic plot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticPoint {
    /// Elapsed time (hours)
    pub time: f64,
    /// Superposition (equivalent) time (hours)
    pub superposition_time: f64,
    /// Pressure change since the start of the test period (psi)
    pub delta_pressure: f64,
    /// Bourdet derivative dΔp/d ln(te) (psi); `None` where no neighbour was usable
    pub derivative: Option<f64>,
}

/// Flow regime recognized on the derivative curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowRegime {
    /// Unit-slope early-time response dominated by wellbore storage
    WellboreStorage,
    /// Storage-to-radial transition (the derivative hump)
    Transition,
    /// Infinite-acting radial flow: flat derivative
    RadialFlow,
    /// Late-time departure from radial flow (fault, closed or constant-pressure boundary)
    Boundary,
    /// Not enough usable derivative points to decide
    Indeterminate,
}

impl FlowRegime {
    pub fn display_name(&self) -> &'static str {
        match self {
            FlowRegime::WellboreStorage => "Wellbore Storage",
            FlowRegime::Transition => "Storage-to-Radial Transition",
            FlowRegime::RadialFlow => "Infinite-Acting Radial Flow",
            FlowRegime::Boundary => "Boundary Effect",
            FlowRegime::Indeterminate => "Indeterminate",
        }
    }
}

impl std::fmt::Display for FlowRegime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// A contiguous interval of diagnostic points sharing one flow regime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowRegimeSegment {
    /// First index in the diagnostic series (inclusive)
    pub start_index: usize,
    /// Last index in the diagnostic series (inclusive)
    pub end_index: usize,
    pub regime: FlowRegime,
    /// 0.0 - 1.0, from the slope variance inside the segment
    pub confidence: f64,
}

impl FlowRegimeSegment {
    /// Number of diagnostic points covered (bounds are inclusive).
    pub fn point_count(&self) -> usize {
        self.end_index - self.start_index + 1
    }

    pub fn contains(&self, index: usize) -> bool {
        (self.start_index..=self.end_index).contains(&index)
    }
}

/// Output of one diagnostics run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticsResult {
    pub points: Vec<DiagnosticPoint>,
    pub segments: Vec<FlowRegimeSegment>,
}

impl DiagnosticsResult {
    /// Segment covering `index`, if any.
    pub fn regime_at(&self, index: usize) -> Option<&FlowRegimeSegment> {
        self.segments.iter().find(|s| s.contains(index))
    }

    /// First radial-flow segment, if one was recognized.
    pub fn radial_flow(&self) -> Option<&FlowRegimeSegment> {
        self.segments
            .iter()
            .find(|s| s.regime == FlowRegime::RadialFlow)
    }
}
