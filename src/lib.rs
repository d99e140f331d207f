//! SPM Solver - A native Rust stringer-panel model library
//!
//! This library analyses two-dimensional reinforced concrete membranes
//! (walls, deep beams, shear panels) idealised as stringers carrying normal
//! forces and panels carrying shear, supporting:
//! - Stringers with linearly varying normal force and smeared bar reinforcement
//! - Quadrilateral panels with orthogonal web reinforcement
//! - Concrete following MCFT or DSFM, with MC2010/MCFT/DSFM parameter sets
//! - Linear elastic analysis
//! - Nonlinear incremental secant-stiffness analysis, optionally run until failure
//!
//! Units are N, mm and MPa.
//!
//! ## Example
//! ```rust
//! use spm_solver::prelude::*;
//!
//! let mut builder = ModelBuilder::new();
//!
//! // A 1 m tie, fixed at the left end and pulled at the right end
//! builder
//!     .add_stringer(Point::new(0.0, 0.0), Point::new(1000.0, 0.0), CrossSection::rectangular(150.0, 150.0), None)
//!     .add_constraint(Point::new(0.0, 0.0), Constraint::XY)
//!     .add_constraint(Point::new(1000.0, 0.0), Constraint::Y)
//!     .add_force(Point::new(1000.0, 0.0), Force::fx(10_000.0));
//!
//! let model = builder.build().unwrap();
//!
//! // Analyze
//! let output = analyze(&model, Concrete::mcft(30.0), &AnalysisSettings::linear()).unwrap();
//!
//! // Get results
//! let elongation = output.node(3).unwrap().displacement.x;
//! assert!(elongation > 0.0);
//! ```

pub mod analysis;
pub mod assembly;
pub mod elements;
pub mod error;
pub mod input;
pub mod loads;
pub mod material;
pub mod math;
pub mod model;
pub mod results;

// Re-export common types
pub mod prelude {
    pub use crate::analysis::{
        analyze, analyze_input, solve_linear, solve_nonlinear, AnalysisSettings, AnalysisType, CancellationToken,
        NonConvergencePolicy, StiffnessUpdate, StopCondition,
    };
    pub use crate::elements::{
        Behavior, Constraint, CrossSection, Element, FailureMode, Node, NodeKind, Panel, Point, Stringer,
    };
    pub use crate::error::{InputError, SpmError, SpmResult};
    pub use crate::input::InputData;
    pub use crate::loads::Force;
    pub use crate::material::{
        AggregateType, Concrete, ConcreteParameters, ConstitutiveModel, ParameterModel, Steel,
        UniaxialReinforcement, WebDirection, WebReinforcement,
    };
    pub use crate::math::SolverKind;
    pub use crate::model::{ModelBuilder, SpmModel};
    pub use crate::results::{AnalysisOutput, NodeResult, PanelResult, StopReason, StringerResult};
}
