use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{ScenarioKind, ScenarioOutcome};

/// One line of the scenario comparison, relative to the grid-only baseline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRow {
    pub scenario: String,
    pub kind: ScenarioKind,
    /// `ok` or the error tag of a failed scenario
    pub status: String,
    pub total_cost: Option<f64>,
    pub grid_supply: Option<f64>,
    pub grid_cost: Option<f64>,
    pub renewable_generation: Option<f64>,
    pub average_marginal_price: Option<f64>,
    /// Baseline cost minus scenario cost
    pub cost_savings: Option<f64>,
    /// Baseline grid energy minus scenario grid energy
    pub grid_reduction: Option<f64>,
    pub error: Option<String>,
}

/// Compare every outcome with the first successful `NoStorage` outcome.
/// Deltas are left empty when there is no baseline.
pub fn compare(outcomes: &[ScenarioOutcome]) -> Vec<ComparisonRow> {
    let baseline = outcomes
        .iter()
        .filter(|o| o.kind.is_baseline())
        .find_map(ScenarioOutcome::summary);
    if baseline.is_none() {
        warn!("no successful no_storage scenario, comparison has no baseline");
    }

    outcomes
        .iter()
        .map(|outcome| match &outcome.report {
            Ok(report) => {
                let s = &report.summary;
                ComparisonRow {
                    scenario: outcome.name.clone(),
                    kind: outcome.kind,
                    status: "ok".to_string(),
                    total_cost: Some(s.total_cost),
                    grid_supply: Some(s.grid_supply),
                    grid_cost: Some(s.grid_cost),
                    renewable_generation: Some(s.total_renewable_generation()),
                    average_marginal_price: Some(s.average_marginal_price),
                    cost_savings: baseline.map(|b| b.total_cost - s.total_cost),
                    grid_reduction: baseline.map(|b| b.grid_supply - s.grid_supply),
                    error: None,
                }
            }
            Err(e) => ComparisonRow {
                scenario: outcome.name.clone(),
                kind: outcome.kind,
                status: e.kind().to_string(),
                total_cost: None,
                grid_supply: None,
                grid_cost: None,
                renewable_generation: None,
                average_marginal_price: None,
                cost_savings: None,
                grid_reduction: None,
                error: Some(e.to_string()),
            },
        })
        .collect()
}

/// Log the comparison, one line per scenario
pub fn log_comparison(rows: &[ComparisonRow]) {
    for row in rows {
        match row.total_cost {
            Some(total_cost) => info!(
                scenario = %row.scenario,
                total_cost,
                grid_supply = row.grid_supply.unwrap_or_default(),
                cost_savings = row.cost_savings.unwrap_or_default(),
                grid_reduction = row.grid_reduction.unwrap_or_default(),
                "scenario comparison"
            ),
            None => warn!(
                scenario = %row.scenario,
                status = %row.status,
                error = row.error.as_deref().unwrap_or_default(),
                "scenario comparison"
            ),
        }
    }
}
