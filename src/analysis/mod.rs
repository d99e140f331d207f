//! Analysis types and settings

mod linear;
mod nonlinear;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::SpmResult;
use crate::input::InputData;
use crate::material::Concrete;
use crate::math::SolverKind;
use crate::model::SpmModel;
use crate::results::AnalysisOutput;

pub use linear::solve_linear;
pub use nonlinear::solve_nonlinear;

/// Type of analysis to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalysisType {
    /// Single elastic solution
    Linear,
    /// Incremental secant-stiffness load path
    Nonlinear,
    /// Incremental load path continued past the full load until an element fails
    Simulation,
}

impl Default for AnalysisType {
    fn default() -> Self {
        Self::Linear
    }
}

/// When a nonlinear analysis stops stepping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopCondition {
    /// Stop after this many load steps
    AfterLoadSteps(usize),
    /// Keep stepping past the full load until an element fails
    AtFailure { max_steps: usize },
}

/// Step limit of a simulation without an explicit stop condition
pub const SIMULATION_MAX_STEPS: usize = 500;

/// When the secant stiffness is reassembled and refactored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StiffnessUpdate {
    /// Once per load step (modified Newton)
    #[default]
    PerLoadStep,
    /// On every iteration
    PerIteration,
}

/// What to do with a load step that did not converge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NonConvergencePolicy {
    /// Return `SpmError::NonConvergence`
    Abort,
    /// Stop at the last converged step and report the reason
    #[default]
    Stop,
    /// Accept the step and go on
    Continue,
}

/// Flag a host thread can set to abort a running analysis
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Settings for an analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    /// Type of analysis
    pub analysis_type: AnalysisType,
    /// Factor applied to the model forces
    pub load_factor: f64,
    /// Number of steps to reach the full load
    pub load_steps: usize,
    /// Convergence tolerance on `Σ Fr² / (1 + Σ Fs²)`
    pub tolerance: f64,
    /// Maximum iterations per load step
    pub max_iterations: usize,
    /// Minimum iterations per load step
    pub min_iterations: usize,
    /// DOF traced in the load-displacement curve (None = largest applied force)
    pub monitored_dof: Option<usize>,
    /// None = stop once the full load is reached
    pub stop_condition: Option<StopCondition>,
    pub stiffness_update: StiffnessUpdate,
    pub non_convergence: NonConvergencePolicy,
    /// Direct solver for the global system
    pub solver: SolverKind,
    /// Fix internal-node DOFs without stiffness instead of reporting them
    pub fix_unsupported_internal_dofs: bool,
    #[serde(skip)]
    pub cancellation: CancellationToken,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            analysis_type: AnalysisType::Linear,
            load_factor: 1.0,
            load_steps: 50,
            tolerance: 1e-2,
            max_iterations: 1000,
            min_iterations: 5,
            monitored_dof: None,
            stop_condition: None,
            stiffness_update: StiffnessUpdate::PerLoadStep,
            non_convergence: NonConvergencePolicy::Stop,
            solver: SolverKind::Lu,
            fix_unsupported_internal_dofs: true,
            cancellation: CancellationToken::default(),
        }
    }
}

impl AnalysisSettings {
    /// Create settings for linear analysis
    pub fn linear() -> Self {
        Self::default()
    }

    /// Create settings for a nonlinear analysis up to the full load
    pub fn nonlinear() -> Self {
        Self {
            analysis_type: AnalysisType::Nonlinear,
            ..Self::default()
        }
    }

    /// Create settings for a nonlinear analysis that runs until failure
    pub fn simulation() -> Self {
        Self {
            analysis_type: AnalysisType::Simulation,
            ..Self::default()
        }
    }

    /// Set the number of load steps to reach the full load
    pub fn with_load_steps(mut self, steps: usize) -> Self {
        self.load_steps = steps;
        self
    }

    pub fn with_load_factor(mut self, factor: f64) -> Self {
        self.load_factor = factor;
        self
    }

    /// Set convergence tolerance
    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tolerance = tol;
        self
    }

    /// Set maximum iterations
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iterations = max_iter;
        self
    }

    pub fn with_min_iter(mut self, min_iter: usize) -> Self {
        self.min_iterations = min_iter;
        self
    }

    pub fn with_monitored_dof(mut self, dof: usize) -> Self {
        self.monitored_dof = Some(dof);
        self
    }

    pub fn with_stop_condition(mut self, condition: StopCondition) -> Self {
        self.stop_condition = Some(condition);
        self
    }

    /// Stop condition in effect
    pub fn effective_stop_condition(&self) -> StopCondition {
        self.stop_condition.unwrap_or(match self.analysis_type {
            AnalysisType::Simulation => StopCondition::AtFailure {
                max_steps: SIMULATION_MAX_STEPS,
            },
            AnalysisType::Linear | AnalysisType::Nonlinear => StopCondition::AfterLoadSteps(self.load_steps),
        })
    }

    pub fn with_stiffness_update(mut self, update: StiffnessUpdate) -> Self {
        self.stiffness_update = update;
        self
    }

    pub fn with_non_convergence(mut self, policy: NonConvergencePolicy) -> Self {
        self.non_convergence = policy;
        self
    }

    pub fn with_solver(mut self, solver: SolverKind) -> Self {
        self.solver = solver;
        self
    }

    /// Report internal-node DOFs without stiffness as errors
    pub fn strict_internal_dofs(mut self) -> Self {
        self.fix_unsupported_internal_dofs = false;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }
}

/// Run an analysis on an already built input
pub fn analyze_input(input: &mut InputData, settings: &AnalysisSettings) -> SpmResult<AnalysisOutput> {
    match settings.analysis_type {
        AnalysisType::Linear => solve_linear(input, settings),
        AnalysisType::Nonlinear | AnalysisType::Simulation => solve_nonlinear(input, settings),
    }
}

/// Build the input from a model snapshot and run an analysis
pub fn analyze(model: &SpmModel, concrete: Concrete, settings: &AnalysisSettings) -> SpmResult<AnalysisOutput> {
    let mut input = InputData::new(model, concrete)?;
    info!("Starting {:?} analysis", settings.analysis_type);
    analyze_input(&mut input, settings)
}
