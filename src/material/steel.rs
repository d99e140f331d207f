//! Bilinear reinforcement steel

use serde::{Deserialize, Serialize};

/// Reinforcement steel with an elastic-perfectly-plastic response
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Steel {
    /// Yield stress in MPa
    pub yield_stress: f64,
    /// Modulus of elasticity in MPa
    pub elastic_module: f64,
    /// Strain at rupture (positive)
    pub ultimate_strain: f64,
}

impl Steel {
    /// Create a new steel
    pub fn new(yield_stress: f64, elastic_module: f64) -> Self {
        Self {
            yield_stress,
            elastic_module,
            ultimate_strain: 0.01,
        }
    }

    /// Set the rupture strain
    pub fn with_ultimate_strain(mut self, ultimate_strain: f64) -> Self {
        self.ultimate_strain = ultimate_strain;
        self
    }

    /// CA-50 steel (fy = 500 MPa, Es = 210 GPa)
    pub fn ca50() -> Self {
        Self::new(500.0, 210_000.0)
    }

    /// Yield strain `fy / Es`
    pub fn yield_strain(&self) -> f64 {
        self.yield_stress / self.elastic_module
    }

    /// Stress for a given strain
    pub fn stress(&self, strain: f64) -> f64 {
        let ey = self.yield_strain();

        if strain <= -ey {
            -self.yield_stress
        } else if strain >= ey {
            self.yield_stress
        } else {
            self.elastic_module * strain
        }
    }

    /// Secant modulus `stress / strain`, the elastic modulus at zero strain
    pub fn secant_module(&self, strain: f64) -> f64 {
        if strain == 0.0 {
            return self.elastic_module;
        }
        self.stress(strain) / strain
    }

    /// Whether the strain is past the yield strain
    pub fn is_yielded(&self, strain: f64) -> bool {
        strain.abs() >= self.yield_strain()
    }

    /// Whether the strain is past the rupture strain
    pub fn is_ruptured(&self, strain: f64) -> bool {
        strain.abs() >= self.ultimate_strain
    }
}

impl Default for Steel {
    fn default() -> Self {
        Self::ca50()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_bilinear_stress() {
        let steel = Steel::new(500.0, 200_000.0);
        assert_relative_eq!(steel.yield_strain(), 0.0025);
        assert_relative_eq!(steel.stress(0.001), 200.0);
        assert_relative_eq!(steel.stress(0.01), 500.0);
        assert_relative_eq!(steel.stress(-0.0025), -500.0);
        assert_relative_eq!(steel.stress(-0.001), -200.0);
    }

    #[test]
    fn test_secant_module() {
        let steel = Steel::new(500.0, 200_000.0);
        assert_eq!(steel.secant_module(0.0), 200_000.0);
        assert_relative_eq!(steel.secant_module(0.005), 100_000.0);
        assert!(steel.is_yielded(0.005));
        assert!(!steel.is_yielded(0.002));
    }
}
