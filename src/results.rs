//! Result types for SPM analysis

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::analysis::AnalysisType;
use crate::elements::{Displacement, Element, FailureMode, NodeKind, Panel, Point, Stringer};
use crate::error::SpmResult;
use crate::input::InputData;
use crate::loads::Force;
use crate::material::WebStresses;
use crate::math::Vec as SpmVec;

/// Displacement and reaction of a node
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodeResult {
    pub number: usize,
    pub position: Point,
    pub kind: NodeKind,
    pub displacement: Displacement,
    /// Support reaction (zero at free DOFs)
    pub reaction: Force,
}

/// Recovered state of a stringer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StringerResult {
    pub number: usize,
    pub grips: [usize; 3],
    pub length: f64,
    /// Normal forces at the start and end (N, tension positive)
    pub normal_forces: [f64; 2],
    /// Strains at the start, middle and end
    pub strains: [f64; 3],
    /// Concrete stresses at the stations (MPa)
    pub concrete_stresses: [f64; 3],
    /// Bar stresses at the stations (MPa)
    pub steel_stresses: [f64; 3],
    /// Crack openings at the stations (mm)
    pub crack_openings: [f64; 3],
    pub yielded: bool,
    pub failure: Option<FailureMode>,
}

impl StringerResult {
    pub fn from_stringer(s: &Stringer) -> Self {
        Self {
            number: s.number,
            grips: s.grips,
            length: s.length(),
            normal_forces: s.normal_forces(),
            strains: s.strains(),
            concrete_stresses: s.concrete_stresses(),
            steel_stresses: s.steel_stresses(),
            crack_openings: s.crack_openings(),
            yielded: s.is_yielded(),
            failure: s.failure(),
        }
    }

    /// Normal force with the largest magnitude
    pub fn max_normal_force(&self) -> f64 {
        let [n1, n3] = self.normal_forces;
        if n1.abs() >= n3.abs() {
            n1
        } else {
            n3
        }
    }
}

/// Recovered state of a panel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelResult {
    pub number: usize,
    pub grips: [usize; 4],
    /// Average strains `[εx, εy, γxy]`
    pub strains: [f64; 3],
    /// Average stresses `[σx, σy, τxy]` (MPa)
    pub stresses: [f64; 3],
    /// Average shear stress (MPa)
    pub shear_stress: f64,
    /// Principal strains `[e1, e2]`
    pub principal_strains: [f64; 2],
    /// Angle of the major principal strain with the x axis (rad)
    pub crack_angle: f64,
    /// Concrete principal stresses `[f1, f2]` (MPa)
    pub principal_stresses: [f64; 2],
    /// Web bar stresses (MPa)
    pub steel_stresses: WebStresses,
    /// Crack opening (mm)
    pub crack_opening: f64,
    pub yielded: bool,
    pub failure: Option<FailureMode>,
}

impl PanelResult {
    pub fn from_panel(p: &Panel) -> Self {
        let (e1, e2, theta1) = p.principal_strains();
        let (f1, f2) = p.principal_stresses();

        Self {
            number: p.number,
            grips: p.grips,
            strains: p.strains(),
            stresses: p.stresses(),
            shear_stress: p.shear_stress(),
            principal_strains: [e1, e2],
            crack_angle: theta1,
            principal_stresses: [f1, f2],
            steel_stresses: p.steel_stresses(),
            crack_opening: p.crack_opening(),
            yielded: p.is_yielded(),
            failure: p.failure(),
        }
    }
}

/// A point of the load-displacement curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonitoredPoint {
    /// Displacement of the monitored DOF (mm)
    pub displacement: f64,
    pub load_factor: f64,
}

/// Summary of one load step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadStepReport {
    pub step: usize,
    pub load_factor: f64,
    pub iterations: usize,
    /// Convergence measure of the last iteration
    pub convergence: f64,
    pub converged: bool,
    /// Convergence measure of every iteration
    pub history: Vec<f64>,
}

/// Why a nonlinear analysis ended before its last load step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StopReason {
    /// A load step did not converge
    NonConvergence {
        step: usize,
        iterations: usize,
        convergence: f64,
    },
    /// An element failed after a converged step
    Failure {
        step: usize,
        load_factor: f64,
        element: String,
        mode: FailureMode,
    },
    /// The stiffness became singular after a converged step
    SingularStiffness { step: usize, detail: String },
    /// The step limit was reached without failure
    StepLimit { steps: usize },
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonConvergence {
                step,
                iterations,
                convergence,
            } => write!(
                f,
                "Load step {} did not converge after {} iterations (convergence = {:.3e})",
                step, iterations, convergence
            ),
            Self::Failure {
                step,
                load_factor,
                element,
                mode,
            } => write!(
                f,
                "{} failed by {} at load step {} (load factor {:.3})",
                element, mode, step, load_factor
            ),
            Self::SingularStiffness { step, detail } => {
                write!(f, "Stiffness became singular after load step {}: {}", step, detail)
            }
            Self::StepLimit { steps } => write!(f, "Stopped after {} load steps without failure", steps),
        }
    }
}

/// Complete output of an analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisOutput {
    pub analysis_type: AnalysisType,
    /// Global displacement vector (mm)
    pub displacements: Vec<f64>,
    /// Global nodal forces (N)
    pub forces: Vec<f64>,
    pub nodes: Vec<NodeResult>,
    pub stringers: Vec<StringerResult>,
    pub panels: Vec<PanelResult>,
    /// Internal-node DOFs fixed for lack of stiffness
    pub fixed_dofs: Vec<usize>,
    /// DOF whose displacement is traced in `monitored`
    pub monitored_dof: Option<usize>,
    pub monitored: Vec<MonitoredPoint>,
    pub steps: Vec<LoadStepReport>,
    pub stop_reason: Option<StopReason>,
    /// Human-readable form of `stop_reason`
    pub message: Option<String>,
}

impl AnalysisOutput {
    /// Collect nodal and element results from the analysed input
    pub fn from_input(analysis_type: AnalysisType, input: &InputData, displacements: &SpmVec, forces: &SpmVec) -> Self {
        Self {
            analysis_type,
            displacements: displacements.iter().copied().collect(),
            forces: forces.iter().copied().collect(),
            nodes: input
                .nodes
                .iter()
                .map(|n| NodeResult {
                    number: n.number,
                    position: n.position,
                    kind: n.kind,
                    displacement: n.displacement(),
                    reaction: n.reaction(),
                })
                .collect(),
            stringers: input.stringers.iter().map(StringerResult::from_stringer).collect(),
            panels: input.panels.iter().map(PanelResult::from_panel).collect(),
            fixed_dofs: Vec::new(),
            monitored_dof: None,
            monitored: Vec::new(),
            steps: Vec::new(),
            stop_reason: None,
            message: None,
        }
    }

    /// Record why the analysis stopped
    pub fn with_stop_reason(mut self, reason: Option<StopReason>) -> Self {
        self.message = reason.as_ref().map(|r| r.to_string());
        self.stop_reason = reason;
        self
    }

    /// Get a node result by number
    pub fn node(&self, number: usize) -> Option<&NodeResult> {
        self.nodes.iter().find(|n| n.number == number)
    }

    /// Final load factor reached, 1 for a linear analysis
    pub fn final_load_factor(&self) -> f64 {
        match self.analysis_type {
            AnalysisType::Linear => 1.0,
            AnalysisType::Nonlinear | AnalysisType::Simulation => self.monitored.last().map_or(0.0, |p| p.load_factor),
        }
    }

    /// Whether every load step converged
    pub fn all_converged(&self) -> bool {
        self.steps.iter().all(|s| s.converged)
    }

    /// Largest displacement magnitude over all nodes
    pub fn max_displacement(&self) -> f64 {
        self.nodes
            .iter()
            .map(|n| n.displacement.magnitude())
            .fold(0.0, f64::max)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> SpmResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_reason_message() {
        let reason = StopReason::Failure {
            step: 12,
            load_factor: 0.24,
            element: "Panel 3".to_string(),
            mode: FailureMode::ConcreteCrushing,
        };
        assert_eq!(
            reason.to_string(),
            "Panel 3 failed by concrete crushing at load step 12 (load factor 0.240)"
        );
    }

    #[test]
    fn test_max_normal_force() {
        let result = StringerResult {
            number: 1,
            grips: [1, 2, 3],
            length: 1000.0,
            normal_forces: [10.0, -25.0],
            strains: [0.0; 3],
            concrete_stresses: [0.0; 3],
            steel_stresses: [0.0; 3],
            crack_openings: [0.0; 3],
            yielded: false,
            failure: None,
        };
        assert_eq!(result.max_normal_force(), -25.0);
    }
}
