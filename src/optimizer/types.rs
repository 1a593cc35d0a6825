use serde::{Deserialize, Serialize};

use crate::domain::Network;
use crate::error::Result;

/// Optimal trajectory of one generator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorDispatch {
    pub name: String,
    pub p: Vec<f64>,
    /// Nominal power, chosen by the solver when extendable
    pub p_nom: f64,
}

/// Optimal trajectory of one storage unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageDispatch {
    pub name: String,
    /// Stored energy at snapshot boundaries (`N + 1` values, `e[0]` initial)
    pub e: Vec<f64>,
    pub store: Vec<f64>,
    pub dispatch: Vec<f64>,
    /// Energy capacity, chosen by the solver when extendable
    pub e_nom: f64,
}

impl StorageDispatch {
    /// Net injection into the bus at snapshot `t`
    pub fn net(&self, t: usize) -> f64 {
        self.dispatch[t] - self.store[t]
    }
}

/// Raw output of an optimal solve. Never built from a non-optimal status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchSolution {
    /// Objective value as reported by the solver
    pub objective: f64,
    pub generators: Vec<GeneratorDispatch>,
    pub storages: Vec<StorageDispatch>,
    /// Shadow price of the power balance per snapshot, per unit energy
    pub marginal_price: Vec<f64>,
    pub solve_time_ms: u128,
}

/// A way of dispatching a network over its horizon
#[cfg_attr(test, mockall::automock)]
pub trait DispatchStrategy: Send + Sync {
    fn dispatch(&self, network: &Network) -> Result<DispatchSolution>;

    fn name(&self) -> &'static str;
}
