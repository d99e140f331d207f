//! Nodal forces

use serde::{Deserialize, Serialize};

/// A force applied directly to a node
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Force {
    /// Force in X direction (N)
    pub x: f64,
    /// Force in Y direction (N)
    pub y: f64,
}

impl Force {
    /// Create a new force
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Create a force in X direction
    pub fn fx(value: f64) -> Self {
        Self::new(value, 0.0)
    }

    /// Create a force in Y direction
    pub fn fy(value: f64) -> Self {
        Self::new(0.0, value)
    }

    /// Whether both components vanish
    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }

    /// Get total force magnitude
    pub fn magnitude(&self) -> f64 {
        (self.x.powi(2) + self.y.powi(2)).sqrt()
    }
}

impl std::ops::Add for Force {
    type Output = Force;

    fn add(self, rhs: Force) -> Force {
        Force::new(self.x + rhs.x, self.y + rhs.y)
    }
}
