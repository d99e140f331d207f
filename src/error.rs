//! Error types for SPM Solver

use thiserror::Error;

/// Errors raised while turning a model snapshot into analysis input
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InputError {
    #[error("Model has no nodes")]
    NoNodes,

    #[error("Model has no stringers")]
    NoStringers,

    #[error("Node numbering must be contiguous from 1: expected {expected}, found {found}")]
    NodeNumbering { expected: usize, found: usize },

    #[error("{element} references unknown node {node}")]
    UnknownNode { element: String, node: usize },

    #[error("{element} grip {grip} must be {expected} but node {node} is {found}")]
    GripKind {
        element: String,
        grip: usize,
        node: usize,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Node {node} is internal and cannot carry {what}")]
    InternalNodeLoad { node: usize, what: &'static str },

    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("DOF {dof} is out of range for a model with {count} DOFs")]
    InvalidDof { dof: usize, count: usize },

    #[error("Invalid material: {0}")]
    InvalidMaterial(String),
}

/// Main error type for SPM analysis
#[derive(Error, Debug)]
pub enum SpmError {
    #[error("Input error: {0}")]
    Input(#[from] InputError),

    #[error("Singular stiffness matrix at load step {step}, iteration {iteration}: {detail}")]
    SingularMatrix {
        step: usize,
        iteration: usize,
        detail: String,
    },

    #[error("Load step {step} did not converge after {iterations} iterations (convergence = {convergence:.3e})")]
    NonConvergence {
        step: usize,
        iterations: usize,
        convergence: f64,
    },

    #[error("Analysis cancelled at load step {step}, iteration {iteration}")]
    Cancelled { step: usize, iteration: usize },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Result type for SPM operations
pub type SpmResult<T> = Result<T, SpmError>;
