use serde::{Deserialize, Serialize};

use crate::domain::Horizon;
use crate::error::Result;
use crate::timeseries::{align, FillMethod, TimeSeries};

const JOULES_PER_KWH: f64 = 3.6e6;

/// Piezoelectric rain harvesting on a roof.
///
/// Energy per hour = rain depth / drop volume × energy per drop × roof area.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RainHarvester {
    /// Effective collecting area in m²
    pub roof_area: f64,
    /// Average drop volume in m³
    pub drop_volume: f64,
    /// Energy captured per drop in J
    pub energy_per_drop: f64,
}

impl Default for RainHarvester {
    fn default() -> Self {
        Self {
            roof_area: 0.7 * 18_100.0,
            drop_volume: 50e-6,
            energy_per_drop: 0.022,
        }
    }
}

impl RainHarvester {
    /// Energy in kWh harvested from `mm` of rain
    pub fn energy_kwh(&self, mm: f64) -> f64 {
        let joules = (mm.max(0.0) * 1e-3) / self.drop_volume * self.energy_per_drop * self.roof_area;
        joules / JOULES_PER_KWH
    }

    /// Average power per snapshot from a precipitation series (mm per step).
    /// Dry spells missing from the record produce nothing.
    pub fn production(&self, precipitation: &TimeSeries, horizon: &Horizon) -> Result<Vec<f64>> {
        let dt = horizon.step_hours();
        let mm = align(precipitation, horizon, FillMethod::ZeroFill)?;
        Ok(mm.into_iter().map(|v| self.energy_kwh(v) / dt).collect())
    }
}
