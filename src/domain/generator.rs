use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::{Capacity, Profile};
use crate::error::{DispatchError, Result};

/// Energy carrier of a generator, used for grouping in reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Carrier {
    Grid,
    Solar,
    Wind,
    Rain,
    Other,
}

impl Carrier {
    /// Weather-driven carriers whose output is free but capped by a capacity factor
    pub fn is_renewable(&self) -> bool {
        matches!(self, Carrier::Solar | Carrier::Wind | Carrier::Rain)
    }
}

/// Dispatchable source attached to the bus.
///
/// Output at snapshot `t` is bounded by `[p_min_pu[t], p_max_pu[t]] * p_nom`
/// and priced at `marginal_cost[t]` per unit energy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorSpec {
    pub name: String,
    pub carrier: Carrier,
    pub p_nom: Capacity,
    pub p_min_pu: Profile,
    pub p_max_pu: Profile,
    pub marginal_cost: Profile,
}

impl GeneratorSpec {
    /// Always-available source with a zero floor
    pub fn new(name: impl Into<String>, p_nom: f64, marginal_cost: impl Into<Profile>) -> Self {
        Self {
            name: name.into(),
            carrier: Carrier::Other,
            p_nom: Capacity::Fixed(p_nom),
            p_min_pu: Profile::Constant(0.0),
            p_max_pu: Profile::Constant(1.0),
            marginal_cost: marginal_cost.into(),
        }
    }

    /// Grid connection buying at a (usually spot) price
    pub fn grid(p_nom: f64, price: impl Into<Profile>) -> Self {
        Self::new("grid", p_nom, price).with_carrier(Carrier::Grid)
    }

    /// Curtailable weather-driven source with a free marginal cost
    pub fn renewable(
        name: impl Into<String>,
        carrier: Carrier,
        p_nom: f64,
        capacity_factor: Vec<f64>,
    ) -> Self {
        Self::new(name, p_nom, 0.0)
            .with_carrier(carrier)
            .with_availability(capacity_factor)
    }

    pub fn with_carrier(mut self, carrier: Carrier) -> Self {
        self.carrier = carrier;
        self
    }

    pub fn with_availability(mut self, p_max_pu: impl Into<Profile>) -> Self {
        self.p_max_pu = p_max_pu.into();
        self
    }

    pub fn with_cost(mut self, marginal_cost: impl Into<Profile>) -> Self {
        self.marginal_cost = marginal_cost.into();
        self
    }

    pub fn with_floor(mut self, p_min_pu: impl Into<Profile>) -> Self {
        self.p_min_pu = p_min_pu.into();
        self
    }

    pub fn extendable(mut self, min: f64, max: Option<f64>, capital_cost: f64) -> Self {
        self.p_nom = Capacity::Extendable { min, max, capital_cost };
        self
    }

    pub fn validate(&self, snapshots: usize) -> Result<()> {
        if self.name.is_empty() {
            return Err(DispatchError::config("generator name cannot be empty"));
        }
        self.p_nom.check(&format!("generator '{}' p_nom", self.name))?;
        self.p_min_pu.check(&format!("generator '{}' p_min_pu", self.name), snapshots)?;
        self.p_max_pu.check(&format!("generator '{}' p_max_pu", self.name), snapshots)?;
        self.marginal_cost
            .check(&format!("generator '{}' marginal_cost", self.name), snapshots)?;

        for t in 0..snapshots {
            let (lo, hi) = (self.p_min_pu.at(t), self.p_max_pu.at(t));
            if !(0.0..=1.0).contains(&hi) {
                return Err(DispatchError::config(format!(
                    "generator '{}' p_max_pu {hi} outside [0, 1] at snapshot {t}",
                    self.name
                )));
            }
            if lo < 0.0 || lo > hi {
                return Err(DispatchError::config(format!(
                    "generator '{}' p_min_pu {lo} outside [0, p_max_pu={hi}] at snapshot {t}",
                    self.name
                )));
            }
        }
        Ok(())
    }
}
