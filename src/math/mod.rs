//! Mathematical utilities for SPM calculations

pub mod skyline;

use log::debug;
use nalgebra::{DMatrix, DVector, Dyn, Matrix2, Matrix3, Matrix6, SMatrix, SVector, Vector6, LU};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use skyline::{SkylineCholesky, SkylineError};

pub type Mat = DMatrix<f64>;
pub type Vec = DVector<f64>;
pub type Mat2 = Matrix2<f64>;
pub type Mat3 = Matrix3<f64>;
pub type Mat6 = Matrix6<f64>;
pub type Vec6 = Vector6<f64>;

/// 8x8 matrix for panel stiffness
pub type Mat8 = SMatrix<f64, 8, 8>;
/// 8-element vector for panel forces/displacements
pub type Vec8 = SVector<f64, 8>;
/// Stringer rotation from 6 global DOFs to 3 axial grip displacements
pub type Mat3x6 = SMatrix<f64, 3, 6>;
/// Panel strain-displacement matrix
pub type Mat3x8 = SMatrix<f64, 3, 8>;
/// Panel hourglass modes over the 8 grip DOFs
pub type Mat8x2 = SMatrix<f64, 8, 2>;

/// Magnitudes below this are coerced to exactly zero after assembly
pub const SMALL_NUMBER: f64 = 1e-9;

/// Direction cosines transformation of a stringer
///
/// Maps the 6 global DOFs `[u1, v1, u2, v2, u3, v3]` of the three grips to
/// the 3 displacements along the stringer axis.
pub fn stringer_transformation(l: f64, m: f64) -> Mat3x6 {
    Mat3x6::new(
        l, m, 0.0, 0.0, 0.0, 0.0,
        0.0, 0.0, l, m, 0.0, 0.0,
        0.0, 0.0, 0.0, 0.0, l, m,
    )
}

/// Strain transformation for a rotation of `theta` (engineering shear strain)
///
/// `ε' = T ε` rotates `[εx, εy, γxy]` into axes at angle `theta` from x.
/// Stresses rotate back with `σ = Tᵀ σ'`.
pub fn strain_transformation(theta: f64) -> Mat3 {
    let (s, c) = theta.sin_cos();
    let (c2, s2, cs) = (c * c, s * s, c * s);

    Mat3::new(
        c2, s2, cs,
        s2, c2, -cs,
        -2.0 * cs, 2.0 * cs, c2 - s2,
    )
}

/// Principal values of a plane strain state
///
/// Returns `(e1, e2, theta1)` where `e1 >= e2` and `theta1` is the angle of
/// the major principal direction measured from the x axis.
pub fn principal_strains(ex: f64, ey: f64, gxy: f64) -> (f64, f64, f64) {
    let center = 0.5 * (ex + ey);
    let radius = (0.25 * (ex - ey).powi(2) + 0.25 * gxy * gxy).sqrt();
    let theta1 = 0.5 * gxy.atan2(ex - ey);

    (center + radius, center - radius, theta1)
}

/// Set every entry with `|x| < SMALL_NUMBER` to exactly zero
pub fn coerce_small_matrix(m: &mut Mat) {
    for value in m.iter_mut() {
        if value.abs() < SMALL_NUMBER {
            *value = 0.0;
        }
    }
}

/// Set every entry with `|x| < SMALL_NUMBER` to exactly zero
pub fn coerce_small_vector(v: &mut Vec) {
    for value in v.iter_mut() {
        if value.abs() < SMALL_NUMBER {
            *value = 0.0;
        }
    }
}

/// Check a matrix for symmetry within a relative tolerance
pub fn is_symmetric(m: &Mat, tolerance: f64) -> bool {
    if m.nrows() != m.ncols() {
        return false;
    }

    let scale = m.amax().max(1.0);
    for i in 0..m.nrows() {
        for j in (i + 1)..m.ncols() {
            if (m[(i, j)] - m[(j, i)]).abs() > tolerance * scale {
                return false;
            }
        }
    }

    true
}

/// Direct solver used for the simplified global system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SolverKind {
    /// Dense LU decomposition with partial pivoting
    #[default]
    Lu,
    /// Skyline (profile) Cholesky decomposition for banded SPD systems
    Skyline,
}

/// A factorized stiffness matrix that can be reused for several right-hand sides
pub enum Factorization {
    Lu(LU<f64, Dyn, Dyn>),
    Skyline(SkylineCholesky),
}

/// Why a stiffness matrix could not be factorized
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FactorizationError {
    #[error("empty system")]
    Empty,

    #[error("non-finite pivot at row {row}")]
    NonFinitePivot { row: usize },

    #[error("pivot {pivot:.3e} at elimination row {row} is negligible against {largest:.3e}")]
    NegligiblePivot { row: usize, pivot: f64, largest: f64 },

    #[error(transparent)]
    Skyline(#[from] SkylineError),
}

/// Smallest admissible ratio between the smallest and largest LU pivot
const PIVOT_RATIO: f64 = 1e-13;

impl Factorization {
    /// Factorize a square matrix
    pub fn new(k: &Mat, kind: SolverKind) -> Result<Self, FactorizationError> {
        if k.nrows() == 0 {
            return Err(FactorizationError::Empty);
        }

        match kind {
            SolverKind::Lu => {
                let lu = k.clone().lu();
                let diagonal = lu.u().diagonal();

                let (mut min_pivot, mut max_pivot) = (f64::INFINITY, 0.0_f64);
                let mut min_row = 0;
                for (row, pivot) in diagonal.iter().map(|p| p.abs()).enumerate() {
                    if !pivot.is_finite() {
                        return Err(FactorizationError::NonFinitePivot { row });
                    }
                    if pivot < min_pivot {
                        min_pivot = pivot;
                        min_row = row;
                    }
                    max_pivot = max_pivot.max(pivot);
                }

                if min_pivot <= PIVOT_RATIO * max_pivot {
                    return Err(FactorizationError::NegligiblePivot {
                        row: min_row,
                        pivot: min_pivot,
                        largest: max_pivot,
                    });
                }

                Ok(Self::Lu(lu))
            }
            SolverKind::Skyline => {
                let mut skyline = SkylineCholesky::from_dense(k);
                debug!(
                    "Skyline profile stores {} of {} coefficients",
                    skyline.stored_entries(),
                    k.nrows() * (k.nrows() + 1) / 2
                );
                skyline.factorize()?;
                Ok(Self::Skyline(skyline))
            }
        }
    }

    /// Solve `K x = rhs`, returning `None` if the solution is not finite
    pub fn solve(&self, rhs: &Vec) -> Option<Vec> {
        let x = match self {
            Self::Lu(lu) => lu.solve(rhs)?,
            Self::Skyline(skyline) => skyline.solve(rhs),
        };

        x.iter().all(|v| v.is_finite()).then_some(x)
    }
}
