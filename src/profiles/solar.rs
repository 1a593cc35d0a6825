use crate::domain::Horizon;
use crate::error::Result;
use crate::timeseries::{align, FillMethod, TimeSeries};

/// PV production per snapshot from a metered or simulated production log.
///
/// Negative readings are inverter standby draw and count as zero; hours
/// missing from the log produced nothing.
pub fn solar_production(series: TimeSeries, horizon: &Horizon) -> Result<Vec<f64>> {
    align(&series.clip_negative(), horizon, FillMethod::ZeroFill)
}
