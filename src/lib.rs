//! Economic dispatch of battery storage on a single-bus site.
//!
//! A [`domain::Network`] of generators, storage units and a load profile is
//! turned into a linear program by [`optimizer::DispatchModel`] and solved by
//! an [`optimizer::DispatchStrategy`]. The [`scenario`] module builds one
//! network per study from aligned [`timeseries`] inputs, solves them
//! concurrently and compares the outcomes.

pub mod config;
pub mod domain;
pub mod error;
pub mod io;
pub mod optimizer;
pub mod profiles;
pub mod results;
pub mod scenario;
pub mod telemetry;
pub mod timeseries;

pub use error::{DispatchError, Result};
