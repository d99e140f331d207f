//! Structural elements module

mod node;
mod panel;
mod section;
mod stringer;
mod support;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::math::{Mat, Vec};

pub use node::{dof_indices, Displacement, Node, NodeKind, Point, POSITION_TOLERANCE};
pub use panel::{panel_dof_continuity, Panel};
pub use section::CrossSection;
pub use stringer::Stringer;
pub use support::Constraint;

/// Material response used by an element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Behavior {
    /// Elastic, uncracked materials
    #[default]
    Linear,
    /// Secant stiffness of the current MCFT/DSFM state
    Nonlinear,
}

/// Failure detected when an element commits its state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureMode {
    /// Compressive strain reached the ultimate concrete strain
    ConcreteCrushing,
    /// Reinforcement strain reached the rupture strain
    SteelRupture,
}

impl fmt::Display for FailureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConcreteCrushing => write!(f, "concrete crushing"),
            Self::SteelRupture => write!(f, "reinforcement rupture"),
        }
    }
}

/// Common contract of stringers and panels used by the assembler
pub trait Element {
    /// Label used in logs and errors, e.g. "Stringer 3"
    fn label(&self) -> String;

    /// Global DOF indices in local order
    fn dof_indices(&self) -> &[usize];

    /// Stiffness in global axes for the current state
    fn global_stiffness(&self) -> Mat;

    /// Update the trial state from the global displacement vector
    fn analysis(&mut self, displacements: &Vec);

    /// Internal forces in global axes, in local DOF order
    fn internal_forces(&self) -> Vec;

    /// Accept the trial state as converged and check for failure
    fn commit(&mut self);

    /// Failure detected by the last commit, if any
    fn failure(&self) -> Option<FailureMode>;

    /// Clear the state and switch behavior
    fn reset(&mut self, behavior: Behavior);
}

/// Gather the element displacements from the global vector
pub(crate) fn gather<const N: usize>(dofs: &[usize; N], displacements: &Vec) -> [f64; N] {
    let mut local = [0.0; N];
    for (value, &dof) in local.iter_mut().zip(dofs) {
        *value = displacements.get(dof).copied().unwrap_or(0.0);
    }
    local
}
