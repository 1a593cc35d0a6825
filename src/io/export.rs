//! CSV and JSON export of scenario results.
//!
//! Layout under the output directory:
//!
//! ```text
//! <out>/comparison.csv
//! <out>/<scenario>/dispatch.csv
//! <out>/<scenario>/summary.json
//! ```

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{info, instrument};

use crate::error::Result;
use crate::results::{DispatchResult, ScenarioSummary};
use crate::scenario::{ComparisonRow, ScenarioOutcome};

/// Writes the per-snapshot dispatch as CSV.
///
/// Columns: `timestamp`, `load`, one column per generator, one stored-energy
/// column per storage unit (`<name>_stored`), `marginal_price`.
pub fn write_dispatch_csv(result: &DispatchResult, writer: impl Write) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);

    let mut header = vec!["timestamp".to_string(), "load".to_string()];
    header.extend(result.generators.iter().map(|g| g.name.clone()));
    header.extend(result.storages.iter().map(|s| format!("{}_stored", s.name)));
    header.push("marginal_price".to_string());
    wtr.write_record(&header)?;

    for (t, timestamp) in result.timestamps.iter().enumerate() {
        let mut row = Vec::with_capacity(header.len());
        row.push(timestamp.to_rfc3339());
        row.push(format!("{:.4}", result.load[t]));
        row.extend(result.generators.iter().map(|g| format!("{:.4}", g.p[t])));
        row.extend(result.storages.iter().map(|s| format!("{:.4}", s.e[t + 1])));
        row.push(format!("{:.6}", result.marginal_price[t]));
        wtr.write_record(&row)?;
    }

    wtr.flush()?;
    Ok(())
}

/// Writes a scenario summary as pretty JSON
pub fn write_summary_json(summary: &ScenarioSummary, writer: impl Write) -> Result<()> {
    serde_json::to_writer_pretty(writer, summary).map_err(io::Error::from)?;
    Ok(())
}

/// Writes the scenario comparison as CSV, one row per scenario
pub fn write_comparison_csv(rows: &[ComparisonRow], writer: impl Write) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Writes every successful scenario plus the comparison under `dir`.
///
/// Returns the paths written.
#[instrument(skip_all, fields(dir = %dir.display()))]
pub fn export_outcomes(
    dir: &Path,
    outcomes: &[ScenarioOutcome],
    comparison: &[ComparisonRow],
    dispatch: bool,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;
    let mut written = Vec::new();

    for outcome in outcomes {
        let Ok(report) = &outcome.report else {
            continue;
        };
        let scenario_dir = dir.join(&outcome.name);
        fs::create_dir_all(&scenario_dir)?;

        if dispatch {
            let path = scenario_dir.join("dispatch.csv");
            write_dispatch_csv(&report.result, BufWriter::new(File::create(&path)?))?;
            written.push(path);
        }
        let path = scenario_dir.join("summary.json");
        let mut file = BufWriter::new(File::create(&path)?);
        write_summary_json(&report.summary, &mut file)?;
        file.flush()?;
        written.push(path);
    }

    let path = dir.join("comparison.csv");
    write_comparison_csv(comparison, BufWriter::new(File::create(&path)?))?;
    written.push(path);

    info!(files = written.len(), "results exported");
    Ok(written)
}
