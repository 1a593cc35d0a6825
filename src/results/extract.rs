//! Result extraction
//!
//! Joins a raw [`DispatchSolution`] back onto the network it was solved for:
//! timestamps, carriers and per-snapshot prices travel with the trajectories
//! so reports and exports never need the network again.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Capacity, Carrier, Network};
use crate::optimizer::{DispatchSolution, StorageDispatch};
use crate::results::DispatchSnapshot;

/// Dispatch trajectory of one generator with the cost it was run at
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorResult {
    pub name: String,
    pub carrier: Carrier,
    pub p_nom: f64,
    pub p: Vec<f64>,
    /// Marginal cost per snapshot
    pub marginal_cost: Vec<f64>,
}

impl GeneratorResult {
    /// Energy produced over the horizon
    pub fn energy(&self, dt: f64) -> f64 {
        self.p.iter().sum::<f64>() * dt
    }

    /// Σ p·cost·Δt
    pub fn cost(&self, dt: f64) -> f64 {
        self.p
            .iter()
            .zip(&self.marginal_cost)
            .map(|(p, c)| p * c * dt)
            .sum()
    }
}

/// Immutable outcome of one successful solve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchResult {
    pub timestamps: Vec<DateTime<Utc>>,
    /// Δt in hours
    pub step_hours: f64,
    pub load: Vec<f64>,
    pub generators: Vec<GeneratorResult>,
    pub storages: Vec<StorageDispatch>,
    pub marginal_price: Vec<f64>,
    /// Objective reported by the solver
    pub objective: f64,
    /// Objective recomputed from the extracted series
    pub recomputed_objective: f64,
    pub solve_time_ms: u128,
}

impl DispatchResult {
    pub fn extract(network: &Network, solution: DispatchSolution) -> Self {
        let n = network.snapshots();
        let dt = network.horizon.step_hours();

        let generators: Vec<GeneratorResult> = network
            .generators
            .iter()
            .zip(solution.generators)
            .map(|(spec, dispatch)| GeneratorResult {
                name: dispatch.name,
                carrier: spec.carrier,
                p_nom: dispatch.p_nom,
                p: dispatch.p,
                marginal_cost: (0..n).map(|t| spec.marginal_cost.at(t)).collect(),
            })
            .collect();

        let mut recomputed = generators.iter().map(|g| g.cost(dt)).sum::<f64>();
        for (spec, g) in network.generators.iter().zip(&generators) {
            if let Capacity::Extendable { capital_cost, .. } = spec.p_nom {
                recomputed += capital_cost * g.p_nom;
            }
        }
        for (spec, s) in network.storages.iter().zip(&solution.storages) {
            recomputed += spec.marginal_cost * s.dispatch.iter().sum::<f64>() * dt;
            if let Capacity::Extendable { capital_cost, .. } = spec.e_nom {
                recomputed += capital_cost * s.e_nom;
            }
        }

        Self {
            timestamps: network.horizon.timestamps().collect(),
            step_hours: dt,
            load: network.load.clone(),
            generators,
            storages: solution.storages,
            marginal_price: solution.marginal_price,
            objective: solution.objective,
            recomputed_objective: recomputed,
            solve_time_ms: solution.solve_time_ms,
        }
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn generator(&self, name: &str) -> Option<&GeneratorResult> {
        self.generators.iter().find(|g| g.name == name)
    }

    pub fn storage(&self, name: &str) -> Option<&StorageDispatch> {
        self.storages.iter().find(|s| s.name == name)
    }

    /// Flows on the bus at snapshot `t`
    pub fn snapshot(&self, t: usize) -> DispatchSnapshot {
        DispatchSnapshot {
            timestamp: self.timestamps[t],
            load: self.load[t],
            generation: self.generators.iter().map(|g| g.p[t]).collect(),
            storage_net: self.storages.iter().map(|s| s.net(t)).collect(),
            stored: self.storages.iter().map(|s| s.e[t + 1]).collect(),
            marginal_price: self.marginal_price[t],
        }
    }

    pub fn snapshots(&self) -> impl Iterator<Item = DispatchSnapshot> + '_ {
        (0..self.len()).map(|t| self.snapshot(t))
    }

    /// Largest absolute power balance error over the horizon
    pub fn max_balance_error(&self) -> f64 {
        self.snapshots()
            .map(|s| s.imbalance().abs())
            .fold(0.0, f64::max)
    }
}
