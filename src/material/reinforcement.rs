//! Stringer and panel reinforcement

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use super::concrete::CrossingReinforcement;
use super::steel::Steel;
use crate::math::Mat3;

/// Mean crack spacing `φ / (3.6 ρ)` of a reinforced tie
fn mean_crack_spacing(bar_diameter: f64, ratio: f64) -> Option<f64> {
    (ratio > 0.0 && bar_diameter > 0.0).then(|| bar_diameter / (3.6 * ratio))
}

/// Longitudinal bars of a stringer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UniaxialReinforcement {
    /// Number of bars
    pub number_of_bars: u32,
    /// Bar diameter in mm
    pub bar_diameter: f64,
    /// Steel of the bars
    pub steel: Steel,
}

impl UniaxialReinforcement {
    /// Create a new uniaxial reinforcement
    pub fn new(number_of_bars: u32, bar_diameter: f64, steel: Steel) -> Self {
        Self {
            number_of_bars,
            bar_diameter,
            steel,
        }
    }

    /// Whether any steel is present
    pub fn is_set(&self) -> bool {
        self.number_of_bars > 0 && self.bar_diameter > 0.0
    }

    /// Total bar area in mm²
    pub fn area(&self) -> f64 {
        if !self.is_set() {
            return 0.0;
        }
        f64::from(self.number_of_bars) * PI * self.bar_diameter.powi(2) / 4.0
    }

    /// Reinforcement ratio relative to a concrete area
    pub fn ratio(&self, concrete_area: f64) -> f64 {
        self.area() / concrete_area
    }

    /// Steel stress for a strain
    pub fn stress(&self, strain: f64) -> f64 {
        if !self.is_set() {
            return 0.0;
        }
        self.steel.stress(strain)
    }

    /// Axial force carried by the bars
    pub fn force(&self, strain: f64) -> f64 {
        self.area() * self.stress(strain)
    }

    /// Initial axial stiffness `Es As`
    pub fn axial_stiffness(&self) -> f64 {
        self.area() * self.steel.elastic_module
    }

    /// Mean crack spacing for a concrete area
    pub fn mean_crack_spacing(&self, concrete_area: f64) -> Option<f64> {
        mean_crack_spacing(self.bar_diameter, self.ratio(concrete_area))
    }

    /// Describe the bars as a layer crossing a crack normal to them
    pub fn crossing(&self, concrete_area: f64, stress: f64) -> Option<CrossingReinforcement> {
        self.is_set().then(|| CrossingReinforcement {
            ratio: self.ratio(concrete_area),
            bar_diameter: self.bar_diameter,
            cos_theta: 1.0,
            yield_stress: self.steel.yield_stress,
            stress,
        })
    }
}

/// Bars of a panel in one direction (two layers, one at each face)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WebDirection {
    /// Bar diameter in mm
    pub bar_diameter: f64,
    /// Spacing between bars in mm
    pub spacing: f64,
    /// Steel of the bars
    pub steel: Steel,
}

impl WebDirection {
    /// Create bars with a diameter and spacing
    pub fn new(bar_diameter: f64, spacing: f64, steel: Steel) -> Self {
        Self {
            bar_diameter,
            spacing,
            steel,
        }
    }

    /// Reinforcement ratio `0.5 π φ² / (s t)` for a panel width `t`
    pub fn ratio(&self, width: f64) -> f64 {
        if self.bar_diameter <= 0.0 || self.spacing <= 0.0 || width <= 0.0 {
            return 0.0;
        }
        0.5 * PI * self.bar_diameter.powi(2) / (self.spacing * width)
    }
}

/// Orthogonal web reinforcement of a panel
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WebReinforcement {
    /// Bars parallel to the x axis
    pub x: Option<WebDirection>,
    /// Bars parallel to the y axis
    pub y: Option<WebDirection>,
}

/// Stresses of the web bars
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WebStresses {
    pub x: f64,
    pub y: f64,
}

impl WebReinforcement {
    /// Create reinforcement in both directions
    pub fn new(x: Option<WebDirection>, y: Option<WebDirection>) -> Self {
        Self { x, y }
    }

    /// Same bars in both directions
    pub fn orthogonal(direction: WebDirection) -> Self {
        Self::new(Some(direction), Some(direction))
    }

    /// Whether any steel is present
    pub fn is_set(&self) -> bool {
        self.x.is_some() || self.y.is_some()
    }

    /// Ratios `(ρx, ρy)` for a panel width
    pub fn ratios(&self, width: f64) -> (f64, f64) {
        (
            self.x.map_or(0.0, |d| d.ratio(width)),
            self.y.map_or(0.0, |d| d.ratio(width)),
        )
    }

    /// Bar stresses for the strains along x and y
    pub fn stresses(&self, ex: f64, ey: f64) -> WebStresses {
        WebStresses {
            x: self.x.map_or(0.0, |d| d.steel.stress(ex)),
            y: self.y.map_or(0.0, |d| d.steel.stress(ey)),
        }
    }

    /// Smeared steel stresses `(ρx fsx, ρy fsy)`
    pub fn smeared_stresses(&self, width: f64, ex: f64, ey: f64) -> (f64, f64) {
        let (px, py) = self.ratios(width);
        let s = self.stresses(ex, ey);
        (px * s.x, py * s.y)
    }

    /// Secant stiffness matrix of the smeared bars
    pub fn secant_matrix(&self, width: f64, ex: f64, ey: f64) -> Mat3 {
        let (px, py) = self.ratios(width);
        let ex_module = self.x.map_or(0.0, |d| d.steel.secant_module(ex));
        let ey_module = self.y.map_or(0.0, |d| d.steel.secant_module(ey));

        Mat3::from_diagonal(&nalgebra::Vector3::new(px * ex_module, py * ey_module, 0.0))
    }

    /// Layers crossing a crack whose normal makes `theta1` with the x axis
    pub fn crossings(&self, width: f64, theta1: f64, stresses: WebStresses) -> Vec<CrossingReinforcement> {
        let layers = [
            (self.x, theta1.cos(), stresses.x),
            (self.y, theta1.sin(), stresses.y),
        ];

        layers
            .into_iter()
            .filter_map(|(direction, cos_theta, stress)| {
                direction.map(|d| CrossingReinforcement {
                    ratio: d.ratio(width),
                    bar_diameter: d.bar_diameter,
                    cos_theta,
                    yield_stress: d.steel.yield_stress,
                    stress,
                })
            })
            .collect()
    }

    /// Mean spacing of cracks whose normal makes `theta1` with the x axis
    pub fn mean_crack_spacing(&self, width: f64, theta1: f64) -> Option<f64> {
        let (px, py) = self.ratios(width);
        let smx = self.x.and_then(|d| mean_crack_spacing(d.bar_diameter, px));
        let smy = self.y.and_then(|d| mean_crack_spacing(d.bar_diameter, py));

        let inverse = smx.map_or(0.0, |s| theta1.cos().abs() / s)
            + smy.map_or(0.0, |s| theta1.sin().abs() / s);

        (inverse > 0.0).then(|| 1.0 / inverse)
    }

    /// Whether any bar strain is past rupture
    pub fn is_ruptured(&self, ex: f64, ey: f64) -> bool {
        self.x.is_some_and(|d| d.steel.is_ruptured(ex)) || self.y.is_some_and(|d| d.steel.is_ruptured(ey))
    }

    /// Whether any bar strain is past yield
    pub fn is_yielded(&self, ex: f64, ey: f64) -> bool {
        self.x.is_some_and(|d| d.steel.is_yielded(ex)) || self.y.is_some_and(|d| d.steel.is_yielded(ey))
    }
}
