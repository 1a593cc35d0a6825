use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use site_dispatch::config::Config;
use site_dispatch::io::export_outcomes;
use site_dispatch::optimizer::LpDispatch;
use site_dispatch::scenario::{
    compare, log_comparison, ScenarioBuilder, ScenarioKind, ScenarioOutcome, ScenarioRunner, SiteInputs,
};
use site_dispatch::telemetry::{init_tracing, shutdown_signal};

/// Battery storage dispatch studies for a single-bus site
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Override file merged over config/default.toml
    #[arg(short, long, env = "SITE_CONFIG")]
    config: Option<PathBuf>,

    /// Scenarios to run, repeatable; the configured list when omitted
    #[arg(short, long = "scenario")]
    scenarios: Vec<ScenarioKind>,

    /// Output directory
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();
    let cli = Cli::parse();

    let cfg = Config::load(cli.config.as_deref())?;
    let inputs = SiteInputs::load(&cfg).context("loading site inputs")?;

    let selected = cfg.selected_scenarios(&cli.scenarios);
    info!(
        scenarios = selected.len(),
        snapshots = inputs.horizon.len,
        start = %inputs.horizon.start,
        "starting dispatch studies"
    );

    let builder = ScenarioBuilder::new(&cfg, &inputs);
    let mut scenarios = Vec::new();
    let mut build_failures = Vec::new();
    for (name, kind, built) in builder.build_all(&selected) {
        match built {
            Ok(scenario) => scenarios.push(scenario),
            Err(e) => {
                warn!(scenario = %name, error = %e, "scenario could not be built");
                build_failures.push(ScenarioOutcome::failed(name, kind, e));
            }
        }
    }

    let strategy = LpDispatch::new(cfg.solver.balance_penalty, cfg.solver.tolerance);
    let runner = ScenarioRunner::new(
        Arc::new(strategy),
        Duration::from_secs(cfg.solver.timeout_seconds),
        cfg.solver.max_parallel,
    )
    .with_tolerance(cfg.solver.tolerance);

    let mut outcomes = tokio::select! {
        outcomes = runner.run_all(scenarios) => outcomes,
        _ = shutdown_signal() => {
            warn!("interrupted before all scenarios finished, nothing exported");
            return Ok(());
        }
    };
    outcomes.extend(build_failures);

    let rows = compare(&outcomes);
    log_comparison(&rows);

    let dir = cli.output.unwrap_or_else(|| cfg.output.directory.clone());
    export_outcomes(&dir, &outcomes, &rows, cfg.output.dispatch)
        .with_context(|| format!("writing results to {}", dir.display()))?;

    let failed = outcomes.iter().filter(|o| o.report.is_err()).count();
    if failed > 0 {
        warn!(failed, "some scenarios failed");
    }
    info!(dir = %dir.display(), "done");
    Ok(())
}
