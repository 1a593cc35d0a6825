//! Scenario studies
//!
//! A study is a named [`ScenarioKind`] applied to the shared site inputs.
//! Studies are built, solved concurrently and compared against the
//! grid-only baseline.

pub mod builder;
pub mod compare;
pub mod inputs;
pub mod kind;
pub mod runner;

pub use builder::ScenarioBuilder;
pub use compare::{compare, log_comparison, ComparisonRow};
pub use inputs::SiteInputs;
pub use kind::ScenarioKind;
pub use runner::{ScenarioOutcome, ScenarioReport, ScenarioRunner};

use std::collections::BTreeMap;

use crate::domain::Network;

/// A network ready to solve, with the availability of its weather-driven
/// generators kept for utilisation reporting
#[derive(Debug, Clone)]
pub struct Scenario {
    pub name: String,
    pub kind: ScenarioKind,
    pub network: Network,
    /// Upper bound of each renewable generator's output per snapshot
    pub available: BTreeMap<String, Vec<f64>>,
}
