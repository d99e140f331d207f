//! Material and reinforcement models

pub mod concrete;
mod reinforcement;
mod steel;

pub use concrete::{
    AggregateType, Concrete, ConcreteParameters, ConstitutiveModel, CrackContext,
    CrossingReinforcement, ParameterModel,
};
pub use reinforcement::{UniaxialReinforcement, WebDirection, WebReinforcement, WebStresses};
pub use steel::Steel;
