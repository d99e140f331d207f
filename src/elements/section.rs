//! Stringer cross-section

use serde::{Deserialize, Serialize};

use crate::error::InputError;

/// Rectangular cross-section of a stringer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CrossSection {
    /// Width in mm
    pub width: f64,
    /// Height in mm
    pub height: f64,
}

impl CrossSection {
    /// Create a rectangular section
    pub fn rectangular(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Gross area in mm²
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    pub fn validate(&self) -> Result<(), InputError> {
        if !(self.width > 0.0 && self.height > 0.0) {
            return Err(InputError::InvalidGeometry(format!(
                "Cross-section {} x {} must have positive dimensions",
                self.width, self.height
            )));
        }
        Ok(())
    }
}

impl Default for CrossSection {
    fn default() -> Self {
        Self::rectangular(100.0, 100.0)
    }
}
