use serde::{Deserialize, Serialize};

use crate::domain::Horizon;
use crate::error::{DispatchError, Result};
use crate::timeseries::{align, FillMethod, TimeSeries};

/// Piecewise-linear turbine power curve (wind speed in m/s to capacity factor)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerCurve {
    pub cut_in: f64,
    pub rated: f64,
    pub cut_out: f64,
}

impl Default for PowerCurve {
    fn default() -> Self {
        Self {
            cut_in: 3.0,
            rated: 12.0,
            cut_out: 25.0,
        }
    }
}

impl PowerCurve {
    pub fn validate(&self) -> Result<()> {
        if !(0.0 <= self.cut_in && self.cut_in < self.rated && self.rated <= self.cut_out) {
            return Err(DispatchError::config(format!(
                "power curve needs 0 <= cut_in < rated <= cut_out, got {} / {} / {}",
                self.cut_in, self.rated, self.cut_out
            )));
        }
        Ok(())
    }

    /// Output per unit of rated power at `speed`
    pub fn capacity_factor(&self, speed: f64) -> f64 {
        if speed < self.cut_in || speed > self.cut_out {
            0.0
        } else if speed >= self.rated {
            1.0
        } else {
            (speed - self.cut_in) / (self.rated - self.cut_in)
        }
    }

    /// Capacity factor per snapshot from a wind speed series
    pub fn profile(&self, speeds: &TimeSeries, horizon: &Horizon) -> Result<Vec<f64>> {
        self.validate()?;
        let aligned = align(speeds, horizon, FillMethod::Nearest)?;
        Ok(aligned.into_iter().map(|v| self.capacity_factor(v)).collect())
    }
}

/// Park output per snapshot from a power log.
///
/// The log may stop before the horizon ends (a park commissioned partway
/// through the year); the remaining snapshots produce nothing.
pub fn wind_park_production(power: TimeSeries, horizon: &Horizon) -> Result<Vec<f64>> {
    align(&power.clip_negative(), horizon, FillMethod::ZeroFill)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{Duration, TimeZone, Utc};
    use rstest::rstest;

    #[rstest]
    #[case(0.0, 0.0)]
    #[case(2.9, 0.0)]
    #[case(3.0, 0.0)]
    #[case(7.5, 0.5)]
    #[case(12.0, 1.0)]
    #[case(25.0, 1.0)]
    #[case(25.1, 0.0)]
    fn test_power_curve(#[case] speed: f64, #[case] expected: f64) {
        assert_relative_eq!(PowerCurve::default().capacity_factor(speed), expected);
    }

    #[test]
    fn test_invalid_curve() {
        let curve = PowerCurve { cut_in: 5.0, rated: 4.0, cut_out: 25.0 };
        assert!(curve.validate().is_err());
    }

    #[test]
    fn test_park_log_padded_with_zeros() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let log = TimeSeries::from_values("park", start, Duration::hours(1), vec![100.0, 250.0]).unwrap();
        let production = wind_park_production(log, &Horizon::hourly(start, 4)).unwrap();
        assert_eq!(production, vec![100.0, 250.0, 0.0, 0.0]);
    }
}
