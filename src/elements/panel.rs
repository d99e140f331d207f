//! Panel element - quadrilateral membrane with grips at the edge midpoints
//!
//! The average strain of the panel follows from the grip displacements by
//! Green's theorem, which holds for any simple quadrilateral:
//! `εx = Σ u dy / A`, `εy = -Σ v dx / A`, `γxy = Σ (v dy - u dx) / A`,
//! summed over the edges taken counter-clockwise.
//!
//! The edge midpoints always form a parallelogram, so two grip patterns
//! strain nothing: opposite grips moving together against the other pair,
//! once along x and once along y. These hourglass modes are resisted by the
//! energy of a shear strain varying linearly across the panel, scaled by the
//! current shear stiffness.

use log::debug;
use nalgebra::{Vector2, Vector3};

use super::{gather, Behavior, Element, FailureMode, Point, POSITION_TOLERANCE};
use crate::error::InputError;
use crate::material::{Concrete, CrackContext, WebReinforcement, WebStresses};
use crate::math::{
    principal_strains, strain_transformation, Mat, Mat2, Mat3, Mat3x8, Mat8, Mat8x2, Vec, Vec8,
};

#[derive(Debug, Clone, Copy, PartialEq)]
struct PanelState {
    /// Average strains `[εx, εy, γxy]`
    strains: Vector3<f64>,
    /// Average stresses `[σx, σy, τxy]` of concrete and steel together
    stresses: Vector3<f64>,
    concrete_stresses: Vector3<f64>,
    steel_stresses: WebStresses,
    /// `(e1, e2, θ1)`
    principal_strains: (f64, f64, f64),
    /// Concrete principal stresses `(f1, f2)`
    principal_stresses: (f64, f64),
    /// Secant material stiffness
    stiffness: Mat3,
    /// Amplitudes of the x and y hourglass modes
    hourglass: Vector2<f64>,
}

impl PanelState {
    fn initial(stiffness: Mat3) -> Self {
        Self {
            strains: Vector3::zeros(),
            stresses: Vector3::zeros(),
            concrete_stresses: Vector3::zeros(),
            steel_stresses: WebStresses::default(),
            principal_strains: (0.0, 0.0, 0.0),
            principal_stresses: (0.0, 0.0),
            stiffness,
            hourglass: Vector2::zeros(),
        }
    }
}

/// A reinforced-concrete panel
#[derive(Debug, Clone)]
pub struct Panel {
    /// Number (1-based)
    pub number: usize,
    /// Node numbers of the grips, grip `k` at the midpoint of edge `k`
    pub grips: [usize; 4],
    /// Vertices in counter-clockwise order, edge `k` runs from vertex `k` to `k + 1`
    pub vertices: [Point; 4],
    /// Thickness in mm
    pub width: f64,
    /// Web bars
    pub reinforcement: WebReinforcement,

    concrete: Concrete,
    behavior: Behavior,
    dofs: [usize; 8],
    area: f64,
    b: Mat3x8,
    /// Hourglass stiffness per unit shear modulus
    hourglass: Mat2,
    trial: PanelState,
    committed: PanelState,
    failure: Option<FailureMode>,
}

impl Panel {
    /// Create a panel
    ///
    /// Clockwise vertices are reordered counter-clockwise together with
    /// their grips.
    pub fn new(
        number: usize,
        grips: [usize; 4],
        vertices: [Point; 4],
        width: f64,
        reinforcement: WebReinforcement,
        concrete: Concrete,
    ) -> Result<Self, InputError> {
        if !(width > 0.0) {
            return Err(InputError::InvalidGeometry(format!(
                "Panel {} must have a positive width",
                number
            )));
        }

        if let Some(&node) = grips.iter().find(|&&g| g == 0) {
            return Err(InputError::UnknownNode {
                element: format!("Panel {}", number),
                node,
            });
        }

        let signed = signed_area(&vertices);
        if signed.abs() <= POSITION_TOLERANCE {
            return Err(InputError::InvalidGeometry(format!("Panel {} has zero area", number)));
        }

        let (grips, vertices) = if signed < 0.0 {
            debug!("Panel {} vertices are clockwise; reordering", number);
            (
                [grips[3], grips[2], grips[1], grips[0]],
                [vertices[0], vertices[3], vertices[2], vertices[1]],
            )
        } else {
            (grips, vertices)
        };

        if !is_simple(&vertices) {
            return Err(InputError::InvalidGeometry(format!(
                "Panel {} is self-intersecting",
                number
            )));
        }

        let area = signed.abs();

        let mut dofs = [0; 8];
        for (i, &grip) in grips.iter().enumerate() {
            let [x, y] = super::dof_indices(grip);
            dofs[2 * i] = x;
            dofs[2 * i + 1] = y;
        }

        let mut panel = Self {
            number,
            grips,
            vertices,
            width,
            reinforcement,
            concrete,
            behavior: Behavior::Linear,
            dofs,
            area,
            b: strain_displacement(&vertices, area),
            hourglass: hourglass_stiffness(&vertices, width, area),
            trial: PanelState::initial(Mat3::zeros()),
            committed: PanelState::initial(Mat3::zeros()),
            failure: None,
        };
        panel.reset(Behavior::Linear);
        Ok(panel)
    }

    /// Area in mm²
    pub fn area(&self) -> f64 {
        self.area
    }

    pub fn behavior(&self) -> Behavior {
        self.behavior
    }

    /// Centroid of the vertices
    pub fn center(&self) -> Point {
        let (x, y) = self
            .vertices
            .iter()
            .fold((0.0, 0.0), |(x, y), p| (x + p.x, y + p.y));
        Point::new(x / 4.0, y / 4.0)
    }

    /// Midpoints of the four edges, where the grips must lie
    pub fn edge_midpoints(&self) -> [Point; 4] {
        std::array::from_fn(|k| self.vertices[k].midpoint(&self.vertices[(k + 1) % 4]))
    }

    /// Lengths of the four edges
    pub fn edge_lengths(&self) -> [f64; 4] {
        std::array::from_fn(|k| self.vertices[k].distance_to(&self.vertices[(k + 1) % 4]))
    }

    /// Whether all corners are right angles
    pub fn is_rectangular(&self) -> bool {
        (0..4).all(|k| {
            let (p, q, r) = (
                self.vertices[k],
                self.vertices[(k + 1) % 4],
                self.vertices[(k + 2) % 4],
            );
            let (ax, ay) = (q.x - p.x, q.y - p.y);
            let (bx, by) = (r.x - q.x, r.y - q.y);
            let dot = ax * bx + ay * by;
            dot.abs() <= 1e-9 * (ax.hypot(ay) * bx.hypot(by))
        })
    }

    /// Strain-displacement matrix relating the 8 grip DOFs to `[εx, εy, γxy]`
    pub fn strain_displacement(&self) -> &Mat3x8 {
        &self.b
    }

    /// Uncracked material stiffness with smeared bars
    pub fn initial_material_stiffness(&self) -> Mat3 {
        let ec = self.concrete.elastic_module();
        Mat3::from_diagonal(&Vector3::new(ec, ec, 0.5 * ec))
            + self.reinforcement.secant_matrix(self.width, 0.0, 0.0)
    }

    /// Material stiffness of the current state
    pub fn material_stiffness(&self) -> Mat3 {
        self.trial.stiffness
    }

    /// Global 8x8 stiffness `t A Bᵀ D B + G H C Hᵀ`
    pub fn stiffness_matrix(&self) -> Mat8 {
        let h = hourglass_modes();
        self.b.transpose() * self.trial.stiffness * self.b * (self.width * self.area)
            + h * self.hourglass * h.transpose() * self.shear_modulus()
    }

    /// Shear term of the current material stiffness
    fn shear_modulus(&self) -> f64 {
        self.trial.stiffness[(2, 2)]
    }

    /// Update the trial state from global displacements
    pub fn analyze(&mut self, displacements: &Vec) {
        let ue = Vec8::from(gather(&self.dofs, displacements));
        let strains = self.b * ue;
        let (ex, ey, gxy) = (strains[0], strains[1], strains[2]);
        let (e1, e2, theta1) = principal_strains(ex, ey, gxy);

        let mut state = self.trial;
        state.strains = strains;
        state.hourglass = hourglass_modes().transpose() * ue;
        state.principal_strains = (e1, e2, theta1);

        match self.behavior {
            Behavior::Linear => {
                let ec = self.concrete.elastic_module();
                let (px, py) = self.reinforcement.ratios(self.width);
                let steel = WebStresses {
                    x: self.reinforcement.x.map_or(0.0, |d| d.steel.elastic_module * ex),
                    y: self.reinforcement.y.map_or(0.0, |d| d.steel.elastic_module * ey),
                };

                state.concrete_stresses = Vector3::new(ec * ex, ec * ey, 0.5 * ec * gxy);
                state.steel_stresses = steel;
                state.principal_stresses = (ec * e1, ec * e2);
                state.stresses = state.concrete_stresses + Vector3::new(px * steel.x, py * steel.y, 0.0);
            }
            Behavior::Nonlinear => {
                let steel = self.reinforcement.stresses(ex, ey);
                let crossings = self.reinforcement.crossings(self.width, theta1, steel);
                let crack = CrackContext {
                    reference_length: self.area.sqrt(),
                    crossings: &crossings,
                };
                let (f1, f2) = self.concrete.principal_stresses(e1, e2, &crack);

                let t = strain_transformation(theta1);
                let concrete = t.transpose() * Vector3::new(f1, f2, 0.0);
                let (sx, sy) = self.reinforcement.smeared_stresses(self.width, ex, ey);

                let ec1 = self.concrete.secant_module(f1, e1);
                let ec2 = self.concrete.secant_module(f2, e2);
                let g12 = ec1 * ec2 / (ec1 + ec2);
                let concrete_stiffness = t.transpose() * Mat3::from_diagonal(&Vector3::new(ec1, ec2, g12)) * t;

                state.concrete_stresses = concrete;
                state.steel_stresses = steel;
                state.principal_stresses = (f1, f2);
                state.stresses = concrete + Vector3::new(sx, sy, 0.0);
                state.stiffness = concrete_stiffness + self.reinforcement.secant_matrix(self.width, ex, ey);
            }
        }

        self.trial = state;
    }

    /// Internal forces in global axes `t A Bᵀ σ + G H C a`
    pub fn internal_force_vector(&self) -> Vec8 {
        self.b.transpose() * self.trial.stresses * (self.width * self.area)
            + hourglass_modes() * (self.hourglass * self.trial.hourglass) * self.shear_modulus()
    }

    /// Committed average strains `[εx, εy, γxy]`
    pub fn strains(&self) -> [f64; 3] {
        self.committed.strains.into()
    }

    /// Committed average stresses `[σx, σy, τxy]`
    pub fn stresses(&self) -> [f64; 3] {
        self.committed.stresses.into()
    }

    /// Committed average shear stress
    pub fn shear_stress(&self) -> f64 {
        self.committed.stresses[2]
    }

    /// Committed concrete stresses `[σx, σy, τxy]`
    pub fn concrete_stresses(&self) -> [f64; 3] {
        self.committed.concrete_stresses.into()
    }

    /// Committed bar stresses
    pub fn steel_stresses(&self) -> WebStresses {
        self.committed.steel_stresses
    }

    /// Committed principal strains `(e1, e2, θ1)`
    pub fn principal_strains(&self) -> (f64, f64, f64) {
        self.committed.principal_strains
    }

    /// Committed concrete principal stresses `(f1, f2)`
    pub fn principal_stresses(&self) -> (f64, f64) {
        self.committed.principal_stresses
    }

    /// Crack opening in mm, zero while uncracked
    pub fn crack_opening(&self) -> f64 {
        let (e1, _, theta1) = self.committed.principal_strains;
        if !self.concrete.is_cracked(e1) {
            return 0.0;
        }

        let spacing = self
            .reinforcement
            .mean_crack_spacing(self.width, theta1)
            .unwrap_or_else(|| self.area.sqrt());
        e1 * spacing
    }

    /// Whether any web bars yielded
    pub fn is_yielded(&self) -> bool {
        let s = &self.committed.strains;
        self.reinforcement.is_yielded(s[0], s[1])
    }

    fn detect_failure(&self) -> Option<FailureMode> {
        let (_, e2, _) = self.committed.principal_strains;
        if self.concrete.is_crushed(e2) {
            return Some(FailureMode::ConcreteCrushing);
        }

        let s = &self.committed.strains;
        self.reinforcement
            .is_ruptured(s[0], s[1])
            .then_some(FailureMode::SteelRupture)
    }
}

impl Element for Panel {
    fn label(&self) -> String {
        format!("Panel {}", self.number)
    }

    fn dof_indices(&self) -> &[usize] {
        &self.dofs
    }

    fn global_stiffness(&self) -> Mat {
        let k = self.stiffness_matrix();
        Mat::from_column_slice(8, 8, k.as_slice())
    }

    fn analysis(&mut self, displacements: &Vec) {
        self.analyze(displacements);
    }

    fn internal_forces(&self) -> Vec {
        Vec::from_column_slice(self.internal_force_vector().as_slice())
    }

    fn commit(&mut self) {
        self.committed = self.trial;
        if self.behavior == Behavior::Nonlinear && self.failure.is_none() {
            self.failure = self.detect_failure();
        }
    }

    fn failure(&self) -> Option<FailureMode> {
        self.failure
    }

    fn reset(&mut self, behavior: Behavior) {
        self.behavior = behavior;
        self.trial = PanelState::initial(self.initial_material_stiffness());
        self.committed = self.trial;
        self.failure = None;
    }
}

/// Panel DOFs shared with a neighbouring panel, as `(panel number, local DOF)`
///
/// A grip shared by two panels contributes its two DOFs once for each panel.
pub fn panel_dof_continuity(panels: &[Panel]) -> std::vec::Vec<(usize, usize)> {
    let mut shared = std::vec::Vec::new();

    for panel in panels {
        for (k, grip) in panel.grips.iter().enumerate() {
            let continued = panels
                .iter()
                .any(|other| other.number != panel.number && other.grips.contains(grip));

            if continued {
                shared.push((panel.number, 2 * k));
                shared.push((panel.number, 2 * k + 1));
            }
        }
    }

    shared
}

/// Shoelace area, positive for counter-clockwise vertices
fn signed_area(vertices: &[Point; 4]) -> f64 {
    0.5 * (0..4)
        .map(|k| {
            let (p, q) = (vertices[k], vertices[(k + 1) % 4]);
            p.x * q.y - q.x * p.y
        })
        .sum::<f64>()
}

fn orientation(o: Point, a: Point, b: Point) -> f64 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

fn segments_cross(p1: Point, p2: Point, q1: Point, q2: Point) -> bool {
    let straddles = |a: f64, b: f64| (a > 0.0 && b < 0.0) || (a < 0.0 && b > 0.0);
    straddles(orientation(q1, q2, p1), orientation(q1, q2, p2))
        && straddles(orientation(p1, p2, q1), orientation(p1, p2, q2))
}

/// Opposite edges of a simple quadrilateral never cross
fn is_simple(v: &[Point; 4]) -> bool {
    !segments_cross(v[0], v[1], v[2], v[3]) && !segments_cross(v[1], v[2], v[3], v[0])
}

fn strain_displacement(vertices: &[Point; 4], area: f64) -> Mat3x8 {
    let mut b = Mat3x8::zeros();
    for k in 0..4 {
        let (p, q) = (vertices[k], vertices[(k + 1) % 4]);
        let (dx, dy) = ((q.x - p.x) / area, (q.y - p.y) / area);

        b[(0, 2 * k)] = dy;
        b[(1, 2 * k + 1)] = -dx;
        b[(2, 2 * k)] = -dx;
        b[(2, 2 * k + 1)] = dy;
    }
    b
}

/// Grip patterns `[hx, hy]` that leave the average strain unchanged
fn hourglass_modes() -> Mat8x2 {
    let mut h = Mat8x2::zeros();
    for k in 0..4 {
        let sign = if k % 2 == 0 { 0.5 } else { -0.5 };
        h[(2 * k, 0)] = sign;
        h[(2 * k + 1, 1)] = sign;
    }
    h
}

/// `16/3 t A Gm / det(Gm)` with `Gm` spanned by the two midpoint diagonals
///
/// For an `a x b` rectangle this is `diag(16 t a / 3b, 16 t b / 3a)`.
fn hourglass_stiffness(vertices: &[Point; 4], width: f64, area: f64) -> Mat2 {
    let m: [Point; 4] = std::array::from_fn(|k| vertices[k].midpoint(&vertices[(k + 1) % 4]));
    let d1 = Vector2::new(m[1].x - m[3].x, m[1].y - m[3].y);
    let d2 = Vector2::new(m[2].x - m[0].x, m[2].y - m[0].y);

    let gm = d1 * d1.transpose() + d2 * d2.transpose();
    gm * (16.0 / 3.0 * width * area / gm.determinant())
}
