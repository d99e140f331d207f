//! Support conditions

use serde::{Deserialize, Serialize};

/// Support condition at a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Constraint {
    /// No restraint
    #[default]
    Free,
    /// Restrained in X translation
    X,
    /// Restrained in Y translation
    Y,
    /// Restrained in both translations
    XY,
}

impl Constraint {
    /// Restrained in X translation
    pub fn restrains_x(&self) -> bool {
        matches!(self, Self::X | Self::XY)
    }

    /// Restrained in Y translation
    pub fn restrains_y(&self) -> bool {
        matches!(self, Self::Y | Self::XY)
    }

    /// Get list of restrained local DOF indices (0 = X, 1 = Y)
    pub fn restrained_dofs(&self) -> Vec<usize> {
        let mut dofs = Vec::new();
        if self.restrains_x() { dofs.push(0); }
        if self.restrains_y() { dofs.push(1); }
        dofs
    }

    /// Check if any DOF is restrained
    pub fn is_supported(&self) -> bool {
        *self != Self::Free
    }
}
