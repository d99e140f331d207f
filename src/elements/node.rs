//! Node element - a point of the model with two planar DOFs

use serde::{Deserialize, Serialize};

use super::support::Constraint;
use crate::loads::Force;

/// Tolerance (mm) used when comparing positions
pub const POSITION_TOLERANCE: f64 = 1e-6;

/// A point in the model plane
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    /// X coordinate in mm
    pub x: f64,
    /// Y coordinate in mm
    pub y: f64,
}

impl Point {
    /// Create a new point
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Calculate distance to another point
    pub fn distance_to(&self, other: &Point) -> f64 {
        ((other.x - self.x).powi(2) + (other.y - self.y).powi(2)).sqrt()
    }

    /// Midpoint between two points
    pub fn midpoint(&self, other: &Point) -> Point {
        Point::new(0.5 * (self.x + other.x), 0.5 * (self.y + other.y))
    }

    /// Whether two points coincide within the position tolerance
    pub fn approx_eq(&self, other: &Point) -> bool {
        self.distance_to(other) <= POSITION_TOLERANCE
    }
}

/// Role of a node in the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NodeKind {
    /// End node of stringers and vertex of panels
    #[default]
    External,
    /// Midpoint of a stringer
    Internal,
    /// Drawing-only node of the deformed shape (never analysed)
    Displaced,
}

impl NodeKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::External => "external",
            Self::Internal => "internal",
            Self::Displaced => "displaced",
        }
    }
}

/// Displacement of a node
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Displacement {
    /// Displacement in X direction
    pub x: f64,
    /// Displacement in Y direction
    pub y: f64,
}

impl Displacement {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Get displacement magnitude
    pub fn magnitude(&self) -> f64 {
        (self.x.powi(2) + self.y.powi(2)).sqrt()
    }
}

/// A node of the stringer-panel model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Number (1-based) fixing the DOF indices
    pub number: usize,
    /// Position
    pub position: Point,
    /// Node type
    pub kind: NodeKind,
    /// Support condition
    #[serde(default)]
    pub constraint: Constraint,
    /// Applied force
    #[serde(default)]
    pub force: Force,

    /// Displacement from the last analysis
    #[serde(skip)]
    pub(crate) displacement: Displacement,

    /// Reaction from the last analysis
    #[serde(skip)]
    pub(crate) reaction: Force,
}

impl Node {
    /// Create a new free, unloaded node
    pub fn new(number: usize, position: Point, kind: NodeKind) -> Self {
        Self {
            number,
            position,
            kind,
            constraint: Constraint::Free,
            force: Force::default(),
            displacement: Displacement::default(),
            reaction: Force::default(),
        }
    }

    /// Global DOF indices `[2(n-1), 2(n-1)+1]`
    pub fn dof_indices(&self) -> [usize; 2] {
        dof_indices(self.number)
    }

    /// Displacement from the last analysis
    pub fn displacement(&self) -> Displacement {
        self.displacement
    }

    /// Reaction from the last analysis (zero at free DOFs)
    pub fn reaction(&self) -> Force {
        self.reaction
    }
}

/// Global DOF indices of a node number
pub fn dof_indices(number: usize) -> [usize; 2] {
    let base = 2 * (number - 1);
    [base, base + 1]
}
