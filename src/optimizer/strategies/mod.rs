//! Dispatch strategies
//!
//! - LP: global optimum of the linear dispatch problem (Clarabel backend)

pub mod lp;

pub use lp::*;
