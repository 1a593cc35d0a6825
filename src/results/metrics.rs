//! Scenario economics
//!
//! Scalar summaries of a [`DispatchResult`]. The total system cost is always
//! the solver's objective; the recomputed objective is kept only as a
//! cross-check and a mismatch is logged.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Utc};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::domain::Carrier;
use crate::results::DispatchResult;

/// Energy and cost of one generator over the horizon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSummary {
    pub name: String,
    pub carrier: Carrier,
    pub p_nom: f64,
    pub energy: f64,
    pub cost: f64,
    /// Share of available output actually used, renewables only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utilisation: Option<f64>,
}

/// Throughput of one storage unit over the horizon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageSummary {
    pub name: String,
    pub e_nom: f64,
    pub charged: f64,
    pub discharged: f64,
    pub final_energy: f64,
    /// Discharged energy in units of full capacity
    pub equivalent_cycles: f64,
}

/// Grid energy and cost aggregated per calendar month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyTotals {
    /// `YYYY-MM`
    pub month: String,
    pub grid_supply: f64,
    pub grid_cost: f64,
}

/// Summary record of one scenario run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSummary {
    pub run_id: Uuid,
    pub scenario: String,
    pub snapshots: usize,
    pub start: Option<DateTime<Utc>>,
    /// Solver objective
    pub total_cost: f64,
    pub recomputed_cost: f64,
    pub grid_supply: f64,
    pub grid_cost: f64,
    /// Σ stored energy × spot price over every storage unit in the fleet,
    /// the holding-value figure of earlier studies
    pub battery_charge_cost: f64,
    pub average_marginal_price: f64,
    pub peak_marginal_price: f64,
    /// Renewable generation per carrier
    pub renewable_generation: BTreeMap<String, f64>,
    pub sources: Vec<SourceSummary>,
    pub storages: Vec<StorageSummary>,
    pub monthly: Vec<MonthlyTotals>,
    pub solve_time_ms: u128,
}

impl ScenarioSummary {
    /// Summarise `result`. `available` carries the per-snapshot upper bound
    /// of each renewable generator (by name) when utilisation should be
    /// reported.
    pub fn from_result(
        scenario: impl Into<String>,
        result: &DispatchResult,
        available: &BTreeMap<String, Vec<f64>>,
        tolerance: f64,
    ) -> Self {
        let scenario = scenario.into();
        let dt = result.step_hours;

        let sources: Vec<SourceSummary> = result
            .generators
            .iter()
            .map(|g| {
                let energy = g.energy(dt);
                let utilisation = available.get(&g.name).and_then(|cap| {
                    let possible = cap.iter().sum::<f64>() * dt;
                    (possible > 0.0).then(|| energy / possible)
                });
                SourceSummary {
                    name: g.name.clone(),
                    carrier: g.carrier,
                    p_nom: g.p_nom,
                    energy,
                    cost: g.cost(dt),
                    utilisation,
                }
            })
            .collect();

        let grid = result.generators.iter().filter(|g| g.carrier == Carrier::Grid);
        let grid_supply = grid.clone().map(|g| g.energy(dt)).sum();
        let grid_cost = grid.clone().map(|g| g.cost(dt)).sum();

        // Spot price is the grid's marginal cost; a site without a grid
        // connection falls back to the bus price.
        let spot: Vec<f64> = match result.generators.iter().find(|g| g.carrier == Carrier::Grid) {
            Some(g) => g.marginal_cost.clone(),
            None => result.marginal_price.clone(),
        };
        let battery_charge_cost = result
            .storages
            .iter()
            .map(|s| {
                s.e[1..]
                    .iter()
                    .zip(&spot)
                    .map(|(e, price)| e * price)
                    .sum::<f64>()
            })
            .sum();

        let mut renewable_generation = BTreeMap::new();
        for g in result.generators.iter().filter(|g| g.carrier.is_renewable()) {
            *renewable_generation.entry(g.carrier.to_string()).or_insert(0.0) += g.energy(dt);
        }

        let storages = result
            .storages
            .iter()
            .map(|s| {
                let discharged = s.dispatch.iter().sum::<f64>() * dt;
                StorageSummary {
                    name: s.name.clone(),
                    e_nom: s.e_nom,
                    charged: s.store.iter().sum::<f64>() * dt,
                    discharged,
                    final_energy: s.e.last().copied().unwrap_or_default(),
                    equivalent_cycles: if s.e_nom > 0.0 { discharged / s.e_nom } else { 0.0 },
                }
            })
            .collect();

        let prices = &result.marginal_price;
        let average_marginal_price = if prices.is_empty() {
            0.0
        } else {
            prices.iter().sum::<f64>() / prices.len() as f64
        };
        let peak_marginal_price = prices
            .iter()
            .copied()
            .map(OrderedFloat)
            .max()
            .map(|p| p.0)
            .unwrap_or_default();

        let scale = result.objective.abs().max(1.0);
        if (result.objective - result.recomputed_objective).abs() > tolerance.max(1e-6) * scale * 1e3 {
            warn!(
                scenario = %scenario,
                objective = result.objective,
                recomputed = result.recomputed_objective,
                "objective cross-check mismatch"
            );
        }

        Self {
            run_id: Uuid::new_v4(),
            snapshots: result.len(),
            start: result.timestamps.first().copied(),
            total_cost: result.objective,
            recomputed_cost: result.recomputed_objective,
            grid_supply,
            grid_cost,
            battery_charge_cost,
            average_marginal_price,
            peak_marginal_price,
            renewable_generation,
            sources,
            storages,
            monthly: monthly_grid_totals(result),
            solve_time_ms: result.solve_time_ms,
            scenario,
        }
    }

    pub fn source(&self, name: &str) -> Option<&SourceSummary> {
        self.sources.iter().find(|s| s.name == name)
    }

    pub fn total_renewable_generation(&self) -> f64 {
        self.renewable_generation.values().sum()
    }
}

fn monthly_grid_totals(result: &DispatchResult) -> Vec<MonthlyTotals> {
    let dt = result.step_hours;
    let mut months: BTreeMap<(i32, u32), (f64, f64)> = BTreeMap::new();
    for g in result.generators.iter().filter(|g| g.carrier == Carrier::Grid) {
        for (t, ts) in result.timestamps.iter().enumerate() {
            let entry = months.entry((ts.year(), ts.month())).or_default();
            entry.0 += g.p[t] * dt;
            entry.1 += g.p[t] * g.marginal_cost[t] * dt;
        }
    }
    months
        .into_iter()
        .map(|((year, month), (grid_supply, grid_cost))| MonthlyTotals {
            month: format!("{year:04}-{month:02}"),
            grid_supply,
            grid_cost,
        })
        .collect()
}
