//! Alignment of raw series onto the horizon's snapshot index
//!
//! Every snapshot covers `[timestamp, timestamp + step)`. Points falling inside
//! a snapshot are averaged, which resamples finer series down. Snapshots with
//! no point are filled according to the series' [`FillMethod`]:
//!
//! - `Nearest`: closest point in time, for gaps inside the series' span only.
//!   The span runs from the first point to one sampling interval past the
//!   last. The point must lie within one sampling interval (the coarser of
//!   the series' and the horizon's). A snapshot outside the span, or one the
//!   nearest point cannot reach, means the series does not cover the horizon.
//! - `ZeroFill`: zero. Used for series that are legitimately absent outside
//!   their range (a park commissioned mid-year, a short production log).
//!
//! The horizon is never shortened to fit a series.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::debug;

use super::TimeSeries;
use crate::domain::Horizon;
use crate::error::{DispatchError, Result};

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FillMethod {
    #[default]
    Nearest,
    ZeroFill,
}

/// Values of `series` at every snapshot of `horizon`
pub fn align(series: &TimeSeries, horizon: &Horizon, fill: FillMethod) -> Result<Vec<f64>> {
    let points = series.points();
    let sampling = series.typical_step().unwrap_or(horizon.step);
    let reach = sampling.max(horizon.step);
    let span_end = series.last() + sampling;

    let mut values = Vec::with_capacity(horizon.len);
    let mut cursor = 0;
    let mut filled = 0usize;

    for t in 0..horizon.len {
        let from = horizon.timestamp(t);
        let to = horizon.timestamp(t + 1);

        while cursor < points.len() && points[cursor].0 < from {
            cursor += 1;
        }
        let inside: Vec<f64> = points[cursor..]
            .iter()
            .take_while(|(ts, _)| *ts < to)
            .map(|(_, v)| *v)
            .collect();
        if !inside.is_empty() {
            values.push(inside.iter().sum::<f64>() / inside.len() as f64);
            continue;
        }

        filled += 1;
        match fill {
            FillMethod::ZeroFill => values.push(0.0),
            FillMethod::Nearest => {
                if to <= series.first() || from >= span_end {
                    return Err(DispatchError::misaligned(
                        &series.name,
                        format!(
                            "snapshot {t} ({from}) lies outside the series span {} to {span_end}",
                            series.first()
                        ),
                    ));
                }
                let before = cursor.checked_sub(1).map(|i| points[i]);
                let after = points.get(cursor).copied();
                let nearest = [before, after]
                    .into_iter()
                    .flatten()
                    .min_by_key(|(ts, _)| (*ts - from).num_seconds().abs());
                match nearest {
                    Some((ts, v)) if (ts - from).num_seconds().abs() <= reach.num_seconds() => {
                        values.push(v)
                    }
                    _ => {
                        return Err(DispatchError::misaligned(
                            &series.name,
                            format!(
                                "no point within {}s of snapshot {t} ({from}); series spans {} to {}",
                                reach.num_seconds(),
                                series.first(),
                                series.last()
                            ),
                        ))
                    }
                }
            }
        }
    }

    if filled > 0 {
        debug!(series = %series.name, filled, method = %fill, "filled snapshots without samples");
    }
    Ok(values)
}

/// Align several series at once, each with its own fill policy
pub fn align_all<'a>(
    horizon: &Horizon,
    series: impl IntoIterator<Item = (&'a TimeSeries, FillMethod)>,
) -> Result<Vec<Vec<f64>>> {
    series
        .into_iter()
        .map(|(s, fill)| align(s, horizon, fill))
        .collect()
}
