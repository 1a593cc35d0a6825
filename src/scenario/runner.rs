//! Concurrent scenario execution
//!
//! Each scenario is one blocking solve on the blocking thread pool. At most
//! `max_parallel` solves are in flight; each is bounded by a wall-clock
//! timeout. A failing scenario never affects the others.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tokio::time::timeout;
use tracing::{error, info, instrument, warn};

use super::{Scenario, ScenarioKind};
use crate::error::{DispatchError, Result};
use crate::optimizer::DispatchStrategy;
use crate::results::{DispatchResult, ScenarioSummary};

/// Successful scenario: trajectories plus economics
#[derive(Debug, Clone)]
pub struct ScenarioReport {
    pub result: DispatchResult,
    pub summary: ScenarioSummary,
}

/// Outcome of one scenario, successful or not
#[derive(Debug)]
pub struct ScenarioOutcome {
    pub name: String,
    pub kind: ScenarioKind,
    pub report: Result<ScenarioReport>,
}

impl ScenarioOutcome {
    pub fn failed(name: impl Into<String>, kind: ScenarioKind, error: DispatchError) -> Self {
        Self {
            name: name.into(),
            kind,
            report: Err(error),
        }
    }

    pub fn summary(&self) -> Option<&ScenarioSummary> {
        self.report.as_ref().ok().map(|r| &r.summary)
    }
}

pub struct ScenarioRunner {
    strategy: Arc<dyn DispatchStrategy>,
    timeout: Duration,
    max_parallel: usize,
    tolerance: f64,
}

impl ScenarioRunner {
    pub fn new(strategy: Arc<dyn DispatchStrategy>, timeout: Duration, max_parallel: usize) -> Self {
        Self {
            strategy,
            timeout,
            max_parallel: max_parallel.max(1),
            tolerance: 1e-6,
        }
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Solve one scenario on the blocking pool
    #[instrument(skip_all, fields(scenario = %scenario.name, kind = %scenario.kind))]
    pub async fn run(&self, scenario: Scenario) -> ScenarioOutcome {
        let Scenario { name, kind, network, available } = scenario;
        let network = Arc::new(network);
        let strategy = Arc::clone(&self.strategy);
        let solve_network = Arc::clone(&network);

        info!(strategy = strategy.name(), "solving scenario");
        let task = tokio::task::spawn_blocking(move || strategy.dispatch(&solve_network));

        let solution = match timeout(self.timeout, task).await {
            Ok(Ok(solution)) => solution,
            Ok(Err(join)) => Err(DispatchError::Solver(format!("solver task failed: {join}"))),
            Err(_) => {
                // The blocking solve cannot be interrupted; its result is dropped
                warn!(timeout_s = self.timeout.as_secs(), "scenario timed out");
                Err(DispatchError::Timeout(self.timeout.as_secs()))
            }
        };

        let report = solution.map(|solution| {
            let result = DispatchResult::extract(&network, solution);
            let summary = ScenarioSummary::from_result(&name, &result, &available, self.tolerance);
            info!(
                total_cost = summary.total_cost,
                grid_supply = summary.grid_supply,
                solve_time_ms = summary.solve_time_ms,
                "scenario solved"
            );
            ScenarioReport { result, summary }
        });
        if let Err(e) = &report {
            error!(error = %e, kind = e.kind(), "scenario failed");
        }

        ScenarioOutcome { name, kind, report }
    }

    /// Run every scenario, returning outcomes in input order
    pub async fn run_all(&self, scenarios: Vec<Scenario>) -> Vec<ScenarioOutcome> {
        let indexed: BTreeMap<usize, ScenarioOutcome> = stream::iter(scenarios.into_iter().enumerate())
            .map(|(i, scenario)| async move { (i, self.run(scenario).await) })
            .buffer_unordered(self.max_parallel)
            .collect()
            .await;
        let outcomes: Vec<ScenarioOutcome> = indexed.into_values().collect();
        info!(
            scenarios = outcomes.len(),
            failed = outcomes.iter().filter(|o| o.report.is_err()).count(),
            "all scenarios finished"
        );
        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{GeneratorSpec, Horizon, Network};
    use crate::optimizer::{DispatchSolution, GeneratorDispatch, MockDispatchStrategy};
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn scenario(name: &str, kind: ScenarioKind) -> Scenario {
        let horizon = Horizon::hourly(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(), 2);
        Scenario {
            name: name.to_string(),
            kind,
            network: Network::new(horizon, vec![10.0, 10.0]).with_generator(GeneratorSpec::grid(20.0, 5.0)),
            available: BTreeMap::new(),
        }
    }

    fn solution() -> DispatchSolution {
        DispatchSolution {
            objective: 100.0,
            generators: vec![GeneratorDispatch {
                name: "grid".into(),
                p: vec![10.0, 10.0],
                p_nom: 20.0,
            }],
            storages: vec![],
            marginal_price: vec![5.0, 5.0],
            solve_time_ms: 0,
        }
    }

    #[tokio::test]
    async fn test_run_success_builds_summary() {
        let mut mock = MockDispatchStrategy::new();
        mock.expect_name().return_const("mock");
        mock.expect_dispatch().times(1).returning(|_| Ok(solution()));

        let runner = ScenarioRunner::new(Arc::new(mock), Duration::from_secs(5), 2);
        let outcome = runner.run(scenario("base", ScenarioKind::NoStorage)).await;
        let summary = outcome.summary().unwrap();
        assert_eq!(summary.total_cost, 100.0);
        assert_eq!(summary.grid_supply, 20.0);
    }

    #[tokio::test]
    async fn test_failure_is_isolated() {
        let mut mock = MockDispatchStrategy::new();
        mock.expect_name().return_const("mock");
        mock.expect_dispatch().returning(|network| {
            if network.load[0] > 50.0 {
                Err(DispatchError::InfeasibleProblem { violations: vec![] })
            } else {
                Ok(solution())
            }
        });

        let mut heavy = scenario("heavy", ScenarioKind::StorageOnly);
        heavy.network.load = vec![100.0, 100.0];
        let runner = ScenarioRunner::new(Arc::new(mock), Duration::from_secs(5), 2);
        let outcomes = runner
            .run_all(vec![scenario("base", ScenarioKind::NoStorage), heavy])
            .await;

        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].name, "base");
        assert!(outcomes[0].report.is_ok());
        assert!(matches!(
            outcomes[1].report,
            Err(DispatchError::InfeasibleProblem { .. })
        ));
    }

    #[tokio::test]
    async fn test_timeout() {
        let mut mock = MockDispatchStrategy::new();
        mock.expect_name().return_const("mock");
        mock.expect_dispatch().returning(|_| {
            std::thread::sleep(std::time::Duration::from_millis(500));
            Ok(solution())
        });

        let runner = ScenarioRunner::new(Arc::new(mock), Duration::from_millis(20), 1);
        let outcome = runner.run(scenario("slow", ScenarioKind::StorageOnly)).await;
        assert!(matches!(outcome.report, Err(DispatchError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_order_preserved_with_parallelism() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut mock = MockDispatchStrategy::new();
        mock.expect_name().return_const("mock");
        mock.expect_dispatch().returning(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(solution())
        });

        let runner = ScenarioRunner::new(Arc::new(mock), Duration::from_secs(5), 3);
        let names = ["a", "b", "c", "d", "e"];
        let outcomes = runner
            .run_all(names.iter().map(|n| scenario(n, ScenarioKind::StorageOnly)).collect())
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 5);
        let got: Vec<_> = outcomes.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(got, names);
    }
}
