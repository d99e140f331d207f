//! Stringer element - axial member with three grips (start, middle, end)

use std::f64::consts::FRAC_1_SQRT_2;

use log::trace;
use nalgebra::{Matrix2x3, Vector2, Vector3};

use super::{gather, Behavior, CrossSection, Element, FailureMode, Point, POSITION_TOLERANCE};
use crate::error::InputError;
use crate::material::{Concrete, CrackContext, UniaxialReinforcement};
use crate::math::{stringer_transformation, Mat, Mat2, Mat3, Mat3x6, Mat6, Vec, Vec6};

/// Positions of the integration stations along the stringer
const STATIONS: [f64; 3] = [0.0, 0.5, 1.0];

/// Simpson weights of the stations
const SIMPSON_WEIGHTS: [f64; 3] = [1.0, 4.0, 1.0];

/// State of the three stations
#[derive(Debug, Clone, Copy, PartialEq)]
struct StringerState {
    /// Secant axial stiffness EA
    axial_stiffness: [f64; 3],
    strains: [f64; 3],
    concrete_stresses: [f64; 3],
    steel_stresses: [f64; 3],
    /// Normal forces at the start and end grips
    normal_forces: [f64; 2],
}

impl StringerState {
    fn initial(axial_stiffness: f64) -> Self {
        Self {
            axial_stiffness: [axial_stiffness; 3],
            strains: [0.0; 3],
            concrete_stresses: [0.0; 3],
            steel_stresses: [0.0; 3],
            normal_forces: [0.0; 2],
        }
    }
}

/// A reinforced-concrete stringer
#[derive(Debug, Clone)]
pub struct Stringer {
    /// Number (1-based)
    pub number: usize,
    /// Node numbers of the start, middle and end grips
    pub grips: [usize; 3],
    /// Start position
    pub start: Point,
    /// End position
    pub end: Point,
    /// Cross-section
    pub section: CrossSection,
    /// Longitudinal bars
    pub reinforcement: Option<UniaxialReinforcement>,

    concrete: Concrete,
    behavior: Behavior,
    dofs: [usize; 6],
    length: f64,
    cosines: (f64, f64),
    trial: StringerState,
    committed: StringerState,
    failure: Option<FailureMode>,
}

impl Stringer {
    /// Create a stringer between two positions with grips at both ends and the midpoint
    pub fn new(
        number: usize,
        grips: [usize; 3],
        start: Point,
        end: Point,
        section: CrossSection,
        reinforcement: Option<UniaxialReinforcement>,
        concrete: Concrete,
    ) -> Result<Self, InputError> {
        section.validate()?;

        if let Some(&node) = grips.iter().find(|&&g| g == 0) {
            return Err(InputError::UnknownNode {
                element: format!("Stringer {}", number),
                node,
            });
        }

        let length = start.distance_to(&end);
        if length <= POSITION_TOLERANCE {
            return Err(InputError::InvalidGeometry(format!(
                "Stringer {} has zero length",
                number
            )));
        }

        let steel_area = reinforcement.map_or(0.0, |r| r.area());
        if steel_area >= section.area() {
            return Err(InputError::InvalidGeometry(format!(
                "Stringer {} reinforcement area {:.1} mm² exceeds its section area",
                number, steel_area
            )));
        }

        let cosines = ((end.x - start.x) / length, (end.y - start.y) / length);

        let mut dofs = [0; 6];
        for (i, &grip) in grips.iter().enumerate() {
            let [x, y] = super::dof_indices(grip);
            dofs[2 * i] = x;
            dofs[2 * i + 1] = y;
        }

        let mut stringer = Self {
            number,
            grips,
            start,
            end,
            section,
            reinforcement: reinforcement.filter(|r| r.is_set()),
            concrete,
            behavior: Behavior::Linear,
            dofs,
            length,
            cosines,
            trial: StringerState::initial(0.0),
            committed: StringerState::initial(0.0),
            failure: None,
        };
        stringer.reset(Behavior::Linear);
        Ok(stringer)
    }

    /// Length in mm
    pub fn length(&self) -> f64 {
        self.length
    }

    /// Direction cosines `(l, m)` from start to end
    pub fn direction_cosines(&self) -> (f64, f64) {
        self.cosines
    }

    /// Angle with the x axis in radians
    pub fn angle(&self) -> f64 {
        self.cosines.1.atan2(self.cosines.0)
    }

    pub fn midpoint(&self) -> Point {
        self.start.midpoint(&self.end)
    }

    pub fn behavior(&self) -> Behavior {
        self.behavior
    }

    /// Area of the bars in mm²
    pub fn steel_area(&self) -> f64 {
        self.reinforcement.map_or(0.0, |r| r.area())
    }

    /// Net concrete area in mm²
    pub fn concrete_area(&self) -> f64 {
        self.section.area() - self.steel_area()
    }

    /// Initial axial stiffness `Ec Ac + Es As`
    pub fn initial_axial_stiffness(&self) -> f64 {
        self.concrete.elastic_module() * self.concrete_area()
            + self.reinforcement.map_or(0.0, |r| r.axial_stiffness())
    }

    /// Transformation from global DOFs to axial grip displacements
    pub fn transformation(&self) -> Mat3x6 {
        stringer_transformation(self.cosines.0, self.cosines.1)
    }

    /// Elastic stiffness `EA/L [[4,-6,2],[-6,12,-6],[2,-6,4]]`
    pub fn linear_stiffness(axial_stiffness: f64, length: f64) -> Mat3 {
        Mat3::new(
            4.0, -6.0, 2.0,
            -6.0, 12.0, -6.0,
            2.0, -6.0, 4.0,
        ) * (axial_stiffness / length)
    }

    /// Local 3x3 stiffness for the current state
    pub fn local_stiffness(&self) -> Mat3 {
        match self.behavior {
            Behavior::Linear => Self::linear_stiffness(self.initial_axial_stiffness(), self.length),
            Behavior::Nonlinear => {
                let c = compatibility();
                c.transpose() * self.generalized_stiffness(&self.trial.axial_stiffness) * c
            }
        }
    }

    /// Global 6x6 stiffness `Tᵀ K T`
    pub fn global_stiffness_matrix(&self) -> Mat6 {
        let t = self.transformation();
        t.transpose() * self.local_stiffness() * t
    }

    /// Flexibility of the generalized deformations, Simpson-integrated
    fn flexibility(&self, axial_stiffness: &[f64; 3]) -> Mat2 {
        let mut f = Mat2::zeros();
        for ((&xi, &weight), &ea) in STATIONS.iter().zip(&SIMPSON_WEIGHTS).zip(axial_stiffness) {
            let psi = Vector2::new(1.0 - xi, xi);
            f += psi * psi.transpose() * (weight / (6.0 * ea));
        }
        f * self.length
    }

    /// Generalized stiffness relating `[N1, N3]` to the elongations of both halves
    fn generalized_stiffness(&self, axial_stiffness: &[f64; 3]) -> Mat2 {
        self.flexibility(axial_stiffness).try_inverse().unwrap_or_else(|| {
            trace!("Stringer {} flexibility is singular; using the elastic state", self.number);
            let ea = self.initial_axial_stiffness();
            Mat2::new(2.0, -1.0, -1.0, 2.0) * (2.0 * ea / self.length)
        })
    }

    fn local_displacements(&self, displacements: &Vec) -> Vector3<f64> {
        let ue = Vec6::from(gather(&self.dofs, displacements));
        self.transformation() * ue
    }

    /// Update the trial state from global displacements
    pub fn analyze(&mut self, displacements: &Vec) {
        let ul = self.local_displacements(displacements);
        let elongations = compatibility() * ul;

        let forces = self.generalized_stiffness(&self.trial.axial_stiffness) * elongations;
        let (n1, n3) = (forces[0], forces[1]);
        let station_forces = [n1, 0.5 * (n1 + n3), n3];

        let ec = self.concrete.elastic_module();
        let (ac, steel_area) = (self.concrete_area(), self.steel_area());
        let ea0 = self.initial_axial_stiffness();

        let mut state = self.trial;
        for i in 0..3 {
            let strain = station_forces[i] / state.axial_stiffness[i];
            state.strains[i] = strain;

            match self.behavior {
                Behavior::Linear => {
                    state.concrete_stresses[i] = ec * strain;
                    state.steel_stresses[i] = self
                        .reinforcement
                        .map_or(0.0, |r| r.steel.elastic_module * strain);
                }
                Behavior::Nonlinear => {
                    let steel_stress = self.reinforcement.map_or(0.0, |r| r.stress(strain));
                    let crossing = self.reinforcement.and_then(|r| r.crossing(ac, steel_stress));
                    let crack = CrackContext {
                        reference_length: self.length,
                        crossings: crossing.as_slice(),
                    };
                    let concrete_stress = self.concrete.uniaxial_stress(strain, &crack);

                    state.concrete_stresses[i] = concrete_stress;
                    state.steel_stresses[i] = steel_stress;

                    let force = concrete_stress * ac + steel_stress * steel_area;
                    state.axial_stiffness[i] = secant_axial_stiffness(force, strain, ea0);
                }
            }
        }

        state.normal_forces = match self.behavior {
            Behavior::Linear => [n1, n3],
            Behavior::Nonlinear => [
                state.concrete_stresses[0] * ac + state.steel_stresses[0] * steel_area,
                state.concrete_stresses[2] * ac + state.steel_stresses[2] * steel_area,
            ],
        };

        self.trial = state;
    }

    /// Internal forces in global axes `Tᵀ Cᵀ [N1, N3]`
    pub fn internal_force_vector(&self) -> Vec6 {
        let [n1, n3] = self.trial.normal_forces;
        let local = compatibility().transpose() * Vector2::new(n1, n3);
        self.transformation().transpose() * local
    }

    /// Committed normal forces at the start and end grips (tension positive)
    pub fn normal_forces(&self) -> [f64; 2] {
        self.committed.normal_forces
    }

    /// Committed strains at the start, middle and end
    pub fn strains(&self) -> [f64; 3] {
        self.committed.strains
    }

    /// Committed concrete stresses at the stations
    pub fn concrete_stresses(&self) -> [f64; 3] {
        self.committed.concrete_stresses
    }

    /// Committed bar stresses at the stations
    pub fn steel_stresses(&self) -> [f64; 3] {
        self.committed.steel_stresses
    }

    /// Crack openings at the stations in mm
    pub fn crack_openings(&self) -> [f64; 3] {
        let spacing = self
            .reinforcement
            .and_then(|r| r.mean_crack_spacing(self.concrete_area()))
            .unwrap_or(self.length);

        self.committed.strains.map(|strain| {
            if self.concrete.is_cracked(strain) {
                strain * spacing
            } else {
                0.0
            }
        })
    }

    /// Whether the bars yielded at any station
    pub fn is_yielded(&self) -> bool {
        self.reinforcement
            .is_some_and(|r| self.committed.strains.iter().any(|&e| r.steel.is_yielded(e)))
    }

    /// Whether `other` shares an end node and continues this stringer in a straight line
    ///
    /// Both directions point away from the shared node; the stringers are
    /// continuous when the angle between them is larger than 135°.
    pub fn is_continued_by(&self, other: &Stringer) -> bool {
        if self.number == other.number {
            return false;
        }

        for a in [0, 2] {
            for b in [0, 2] {
                if self.grips[a] != other.grips[b] {
                    continue;
                }

                let (ax, ay) = self.outward_direction(a);
                let (bx, by) = other.outward_direction(b);
                if ax * bx + ay * by < -FRAC_1_SQRT_2 {
                    return true;
                }
            }
        }
        false
    }

    /// Unit direction leaving the end grip `grip` (0 or 2)
    fn outward_direction(&self, grip: usize) -> (f64, f64) {
        let (l, m) = self.cosines;
        if grip == 0 {
            (l, m)
        } else {
            (-l, -m)
        }
    }

    fn detect_failure(&self) -> Option<FailureMode> {
        let strains = &self.committed.strains;
        if strains.iter().any(|&e| self.concrete.is_crushed(e)) {
            return Some(FailureMode::ConcreteCrushing);
        }
        if self
            .reinforcement
            .is_some_and(|r| strains.iter().any(|&e| r.steel.is_ruptured(e)))
        {
            return Some(FailureMode::SteelRupture);
        }
        None
    }
}

/// Generalized deformations `[u2 - u1, u3 - u2]` from the axial grip displacements
fn compatibility() -> Matrix2x3<f64> {
    Matrix2x3::new(-1.0, 1.0, 0.0, 0.0, -1.0, 1.0)
}

/// Secant stiffness `N / ε`, the initial stiffness at vanishing strain
fn secant_axial_stiffness(force: f64, strain: f64, initial: f64) -> f64 {
    if strain.abs() < 1e-12 {
        return initial;
    }
    let secant = force / strain;
    if secant.is_finite() {
        secant.max(1e-6 * initial)
    } else {
        initial
    }
}

impl Element for Stringer {
    fn label(&self) -> String {
        format!("Stringer {}", self.number)
    }

    fn dof_indices(&self) -> &[usize] {
        &self.dofs
    }

    fn global_stiffness(&self) -> Mat {
        let k = self.global_stiffness_matrix();
        Mat::from_column_slice(6, 6, k.as_slice())
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
        self.trial = StringerState::initial(self.initial_axial_stiffness());
        self.committed = self.trial;
        self.failure = None;
    }
}
