//! Dispatch optimization
//!
//! - `model`: expands a network into the horizon-wide linear program
//! - `strategies`: solvers that turn the model into an optimal dispatch
//! - `types`: solver-facing results and the `DispatchStrategy` seam

pub mod model;
pub mod strategies;
pub mod types;

pub use model::{DispatchModel, ModelOptions};
pub use strategies::*;
pub use types::*;
