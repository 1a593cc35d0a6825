//! LP dispatch strategy
//!
//! Solves the expanded dispatch model to global optimality with `good_lp` on
//! the pure-Rust Clarabel backend. The problem is linear, so any optimum the
//! solver reports is global.
//!
//! Status handling:
//! - optimal: values, objective and balance duals are extracted
//! - infeasible: the model is re-solved with penalised slack on the power
//!   balance and the snapshots carrying slack are reported
//! - unbounded / numerical failure: surfaced as distinct errors
//!
//! Charge and discharge are two non-negative variables. With efficiencies
//! at most 1 and non-negative prices, charging and discharging in the same
//! snapshot only burns energy, so the optimum never does it and no integer
//! exclusivity constraint is needed.

use std::time::Instant;

use good_lp::constraint::ConstraintReference;
use good_lp::solvers::clarabel::clarabel;
use good_lp::solvers::{DualValues, ResolutionError, SolutionWithDual};
use good_lp::{Solution, SolverModel};
use tracing::{debug, info, instrument, warn};

use crate::domain::Network;
use crate::error::{BalanceViolation, DispatchError, Result};
use crate::optimizer::model::{CapacityTerm, DispatchModel, ModelOptions};
use crate::optimizer::types::{
    DispatchSolution, DispatchStrategy, GeneratorDispatch, StorageDispatch,
};

/// Default penalty per unit of unbalanced energy in the diagnostic relaxation
pub const DEFAULT_BALANCE_PENALTY: f64 = 1e6;

/// Default tolerance below which slack and bound distances count as zero
pub const DEFAULT_TOLERANCE: f64 = 1e-6;

/// Linear-programming dispatch on a single bus
#[derive(Debug, Clone)]
pub struct LpDispatch {
    balance_penalty: f64,
    tolerance: f64,
}

impl Default for LpDispatch {
    fn default() -> Self {
        Self {
            balance_penalty: DEFAULT_BALANCE_PENALTY,
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

/// Values read back from an optimal solve
struct Solved {
    objective: f64,
    duals: Vec<f64>,
    generators: Vec<GeneratorDispatch>,
    storages: Vec<StorageDispatch>,
    slack: Option<(Vec<f64>, Vec<f64>)>,
}

impl LpDispatch {
    pub fn new(balance_penalty: f64, tolerance: f64) -> Self {
        Self { balance_penalty, tolerance }
    }

    fn solve_model(network: &Network, model: DispatchModel) -> std::result::Result<Solved, ResolutionError> {
        let DispatchModel {
            vars,
            objective,
            balance,
            constraints,
            generators,
            storages,
            slack,
            ..
        } = model;

        let mut problem = vars.minimise(objective.clone()).using(clarabel);
        let balance_refs: Vec<ConstraintReference> =
            balance.into_iter().map(|c| problem.add_constraint(c)).collect();
        for c in constraints {
            problem.add_constraint(c);
        }

        let mut solution = problem.solve()?;

        let duals: Vec<f64> = {
            let dual = solution.compute_dual();
            balance_refs.iter().map(|c| dual.dual(c.clone())).collect()
        };

        let capacity = |term: CapacityTerm| match term {
            CapacityTerm::Fixed(v) => v,
            CapacityTerm::Variable(var) => solution.value(var),
        };

        let generators = network
            .generators
            .iter()
            .zip(&generators)
            .map(|(spec, vars)| GeneratorDispatch {
                name: spec.name.clone(),
                p: vars.p.iter().map(|v| solution.value(*v)).collect(),
                p_nom: capacity(vars.p_nom),
            })
            .collect();

        let storages = network
            .storages
            .iter()
            .zip(&storages)
            .map(|(spec, vars)| StorageDispatch {
                name: spec.name.clone(),
                e: vars.e.iter().map(|e| solution.eval(e)).collect(),
                store: vars.store.iter().map(|v| solution.value(*v)).collect(),
                dispatch: vars.dispatch.iter().map(|v| solution.value(*v)).collect(),
                e_nom: capacity(vars.e_nom),
            })
            .collect();

        let slack = slack.map(|s| {
            (
                s.shortfall.iter().map(|v| solution.value(*v)).collect(),
                s.surplus.iter().map(|v| solution.value(*v)).collect(),
            )
        });

        Ok(Solved {
            objective: solution.eval(&objective),
            duals,
            generators,
            storages,
            slack,
        })
    }

    /// Solve the relaxation and list the snapshots that needed slack
    fn diagnose_infeasibility(&self, network: &Network) -> Vec<BalanceViolation> {
        let options = ModelOptions { relax_balance: Some(self.balance_penalty) };
        let relaxed = match DispatchModel::build(network, options)
            .map_err(|e| e.to_string())
            .and_then(|m| Self::solve_model(network, m).map_err(|e| e.to_string()))
        {
            Ok(relaxed) => relaxed,
            Err(reason) => {
                warn!(%reason, "balance relaxation is infeasible too, storage limits conflict");
                return Vec::new();
            }
        };

        let Some((shortfall, surplus)) = relaxed.slack else {
            return Vec::new();
        };
        shortfall
            .into_iter()
            .zip(surplus)
            .enumerate()
            .filter(|(_, (short, over))| *short > self.tolerance || *over > self.tolerance)
            .map(|(snapshot, (shortfall, surplus))| BalanceViolation {
                snapshot,
                shortfall: shortfall.max(0.0),
                surplus: surplus.max(0.0),
            })
            .collect()
    }

    /// Balance duals per unit of load energy. The objective is in cost per
    /// snapshot, so the dual is divided by the step length.
    fn marginal_prices(network: &Network, solved: &Solved) -> Vec<f64> {
        let dt = network.horizon.step_hours();
        solved.duals.iter().map(|d| d / dt).collect()
    }
}

impl DispatchStrategy for LpDispatch {
    #[instrument(skip_all, fields(snapshots = network.snapshots(), storages = network.storages.len()))]
    fn dispatch(&self, network: &Network) -> Result<DispatchSolution> {
        let started = Instant::now();
        let model = DispatchModel::build(network, ModelOptions::default())?;
        debug!(
            variables = model.variable_count,
            constraints = model.constraint_count(),
            "solving dispatch model"
        );

        let solved = match Self::solve_model(network, model) {
            Ok(solved) => solved,
            Err(ResolutionError::Infeasible) => {
                warn!("dispatch model is infeasible, diagnosing power balance");
                let violations = self.diagnose_infeasibility(network);
                for v in violations.iter().take(10) {
                    warn!(%v, "power balance violation");
                }
                return Err(DispatchError::InfeasibleProblem { violations });
            }
            Err(ResolutionError::Unbounded) => {
                warn!("dispatch model is unbounded");
                return Err(DispatchError::UnboundedProblem(
                    "objective decreases without limit, check capacity and price bounds".to_string(),
                ));
            }
            Err(other) => {
                warn!(error = %other, "solver failed");
                return Err(DispatchError::Solver(other.to_string()));
            }
        };

        if !solved.objective.is_finite() {
            return Err(DispatchError::Solver(format!(
                "solver returned a non-finite objective ({})",
                solved.objective
            )));
        }

        let marginal_price = Self::marginal_prices(network, &solved);
        let solve_time_ms = started.elapsed().as_millis();
        info!(objective = solved.objective, solve_time_ms, "dispatch solved");

        Ok(DispatchSolution {
            objective: solved.objective,
            generators: solved.generators,
            storages: solved.storages,
            marginal_price,
            solve_time_ms,
        })
    }

    fn name(&self) -> &'static str {
        "lp"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{GeneratorSpec, Horizon, StorageSpec};
    use approx::assert_relative_eq;
    use chrono::{TimeZone, Utc};

    fn horizon(n: usize) -> Horizon {
        Horizon::hourly(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(), n)
    }

    #[test]
    fn test_single_generator_no_storage() {
        let network = Network::new(horizon(3), vec![10.0; 3])
            .with_generator(GeneratorSpec::grid(20.0, 5.0));
        let solution = LpDispatch::default().dispatch(&network).unwrap();

        for p in &solution.generators[0].p {
            assert_relative_eq!(*p, 10.0, epsilon = 1e-4);
        }
        assert_relative_eq!(solution.objective, 150.0, epsilon = 1e-3);
        for price in &solution.marginal_price {
            assert_relative_eq!(*price, 5.0, epsilon = 1e-3);
        }
    }

    #[test]
    fn test_price_positive_when_grid_at_cap() {
        // Nothing runs strictly inside its bounds: the grid sits at its cap
        // and the backup has no availability.
        let network = Network::new(horizon(2), vec![10.0, 10.0])
            .with_generator(GeneratorSpec::grid(10.0, 5.0))
            .with_generator(GeneratorSpec::new("backup", 50.0, 40.0).with_availability(0.0));
        let solution = LpDispatch::default().dispatch(&network).unwrap();

        assert_relative_eq!(solution.generators[0].p[0], 10.0, epsilon = 1e-4);
        for price in &solution.marginal_price {
            assert!(*price >= 5.0 - 1e-3, "price {price} below the grid cost");
        }
    }

    #[test]
    fn test_price_with_free_renewable_covering_load() {
        let network = Network::new(horizon(2), vec![10.0, 10.0])
            .with_generator(GeneratorSpec::grid(20.0, 5.0))
            .with_generator(GeneratorSpec::new("solar", 30.0, 0.0));
        let solution = LpDispatch::default().dispatch(&network).unwrap();

        assert!(solution.generators[0].p.iter().all(|p| p.abs() < 1e-3));
        for price in &solution.marginal_price {
            assert!(*price >= -1e-3 && *price <= 5.0 + 1e-3, "price {price}");
        }
    }

    #[test]
    fn test_half_hour_steps_scale_cost_and_price() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let horizon = Horizon::new(start, chrono::Duration::minutes(30), 2);
        let network = Network::new(horizon, vec![10.0, 10.0]).with_generator(GeneratorSpec::grid(20.0, 1.0));
        let solution = LpDispatch::default().dispatch(&network).unwrap();

        assert_relative_eq!(solution.objective, 10.0, epsilon = 1e-3);
        for price in &solution.marginal_price {
            assert_relative_eq!(*price, 1.0, epsilon = 1e-3);
        }
    }

    #[test]
    fn test_half_hour_storage_transition() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let horizon = Horizon::new(start, chrono::Duration::minutes(30), 2);
        let network = Network::new(horizon, vec![0.0, 10.0])
            .with_generator(GeneratorSpec::grid(20.0, vec![1.0, 10.0]))
            .with_storage(StorageSpec::new("battery", 10.0));
        let solution = LpDispatch::default().dispatch(&network).unwrap();

        // 10 kW for half an hour moves 5 kWh
        let battery = &solution.storages[0];
        assert_relative_eq!(battery.e[1], 5.0, epsilon = 1e-3);
        assert_relative_eq!(battery.dispatch[1], 10.0, epsilon = 1e-3);
        assert_relative_eq!(solution.objective, 5.0, epsilon = 1e-3);
    }

    #[test]
    fn test_storage_arbitrage() {
        let network = Network::new(horizon(4), vec![0.0, 0.0, 10.0, 10.0])
            .with_generator(GeneratorSpec::grid(20.0, vec![1.0, 1.0, 10.0, 10.0]))
            .with_storage(StorageSpec::new("battery", 20.0));
        let solution = LpDispatch::default().dispatch(&network).unwrap();

        assert_relative_eq!(solution.objective, 20.0, epsilon = 1e-3);
        let grid = &solution.generators[0].p;
        assert!(grid[2].abs() < 1e-3 && grid[3].abs() < 1e-3);
        let battery = &solution.storages[0];
        assert_relative_eq!(battery.e[2], 20.0, epsilon = 1e-3);
        assert_relative_eq!(battery.dispatch[2], 10.0, epsilon = 1e-3);
        assert_relative_eq!(battery.dispatch[3], 10.0, epsilon = 1e-3);
    }

    #[test]
    fn test_infeasible_reports_shortfall() {
        let network =
            Network::new(horizon(1), vec![100.0]).with_generator(GeneratorSpec::grid(10.0, 1.0));
        let err = LpDispatch::default().dispatch(&network).unwrap_err();
        match err {
            DispatchError::InfeasibleProblem { violations } => {
                assert_eq!(violations.len(), 1);
                assert_eq!(violations[0].snapshot, 0);
                assert_relative_eq!(violations[0].shortfall, 90.0, epsilon = 1e-2);
            }
            other => panic!("expected infeasible, got {other:?}"),
        }
    }

    #[test]
    fn test_must_run_floor_reports_surplus() {
        let network = Network::new(horizon(2), vec![5.0, 1.0])
            .with_generator(GeneratorSpec::grid(10.0, 1.0).with_floor(0.5));
        let err = LpDispatch::default().dispatch(&network).unwrap_err();
        let DispatchError::InfeasibleProblem { violations } = err else {
            panic!("expected infeasible");
        };
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].snapshot, 1);
        assert_relative_eq!(violations[0].surplus, 4.0, epsilon = 1e-2);
    }

    #[test]
    fn test_extendable_storage_sized_by_spread() {
        // Cheap storage pays off against a 9/unit price spread
        let network = Network::new(horizon(2), vec![0.0, 10.0])
            .with_generator(GeneratorSpec::grid(100.0, vec![1.0, 10.0]))
            .with_storage(StorageSpec::new("battery", 0.0).extendable(0.0, Some(50.0), 0.5));
        let solution = LpDispatch::default().dispatch(&network).unwrap();

        let battery = &solution.storages[0];
        assert_relative_eq!(battery.e_nom, 10.0, epsilon = 1e-2);
        // 10 units bought at 1, plus 10 * 0.5 capital
        assert_relative_eq!(solution.objective, 15.0, epsilon = 1e-2);
    }
}
