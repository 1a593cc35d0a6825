use serde::{Deserialize, Serialize};

use super::Capacity;
use crate::error::{DispatchError, Result};

/// Energy store attached to the bus (a battery unit).
///
/// Stored energy evolves as
/// `e[t+1] = e[t] * (1 - standing_loss) + (p_store[t] * efficiency_store - p_dispatch[t] / efficiency_dispatch) * Δt`
/// and must stay within `[e_min_pu, e_max_pu] * e_nom` after every step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageSpec {
    pub name: String,
    pub e_nom: Capacity,
    pub e_min_pu: f64,
    pub e_max_pu: f64,
    pub e_initial: f64,
    pub efficiency_store: f64,
    pub efficiency_dispatch: f64,
    /// Fraction of stored energy lost per snapshot
    pub standing_loss: f64,
    /// Final stored energy must equal the initial one; `e_initial` is ignored
    pub cyclic: bool,
    /// Cost per unit of discharged energy
    pub marginal_cost: f64,
    /// Charge and discharge power rating, unlimited when `None`
    pub p_nom: Option<f64>,
}

impl StorageSpec {
    /// Lossless store with the full energy window, starting empty
    pub fn new(name: impl Into<String>, e_nom: f64) -> Self {
        Self {
            name: name.into(),
            e_nom: Capacity::Fixed(e_nom),
            e_min_pu: 0.0,
            e_max_pu: 1.0,
            e_initial: 0.0,
            efficiency_store: 1.0,
            efficiency_dispatch: 1.0,
            standing_loss: 0.0,
            cyclic: false,
            marginal_cost: 0.0,
            p_nom: None,
        }
    }

    pub fn with_window(mut self, e_min_pu: f64, e_max_pu: f64) -> Self {
        self.e_min_pu = e_min_pu;
        self.e_max_pu = e_max_pu;
        self
    }

    pub fn with_initial(mut self, e_initial: f64) -> Self {
        self.e_initial = e_initial;
        self
    }

    pub fn with_efficiency(mut self, store: f64, dispatch: f64) -> Self {
        self.efficiency_store = store;
        self.efficiency_dispatch = dispatch;
        self
    }

    pub fn with_standing_loss(mut self, standing_loss: f64) -> Self {
        self.standing_loss = standing_loss;
        self
    }

    pub fn with_marginal_cost(mut self, marginal_cost: f64) -> Self {
        self.marginal_cost = marginal_cost;
        self
    }

    pub fn with_power_rating(mut self, p_nom: f64) -> Self {
        self.p_nom = Some(p_nom);
        self
    }

    pub fn cyclic(mut self) -> Self {
        self.cyclic = true;
        self
    }

    pub fn extendable(mut self, min: f64, max: Option<f64>, capital_cost: f64) -> Self {
        self.e_nom = Capacity::Extendable { min, max, capital_cost };
        self
    }

    /// Round-trip efficiency of one stored and re-dispatched unit
    pub fn round_trip_efficiency(&self) -> f64 {
        self.efficiency_store * self.efficiency_dispatch
    }

    pub fn validate(&self) -> Result<()> {
        let name = &self.name;
        if name.is_empty() {
            return Err(DispatchError::config("storage name cannot be empty"));
        }
        self.e_nom.check(&format!("storage '{name}' e_nom"))?;

        if !(0.0..=1.0).contains(&self.e_min_pu) || !(0.0..=1.0).contains(&self.e_max_pu) {
            return Err(DispatchError::config(format!(
                "storage '{name}' energy window [{}, {}] must lie within [0, 1]",
                self.e_min_pu, self.e_max_pu
            )));
        }
        if self.e_min_pu > self.e_max_pu {
            return Err(DispatchError::config(format!(
                "storage '{name}' e_min_pu {} exceeds e_max_pu {}",
                self.e_min_pu, self.e_max_pu
            )));
        }
        for (label, eta) in [
            ("efficiency_store", self.efficiency_store),
            ("efficiency_dispatch", self.efficiency_dispatch),
        ] {
            if !(eta > 0.0 && eta <= 1.0) {
                return Err(DispatchError::config(format!(
                    "storage '{name}' {label} {eta} outside (0, 1]"
                )));
            }
        }
        if !(0.0..1.0).contains(&self.standing_loss) {
            return Err(DispatchError::config(format!(
                "storage '{name}' standing_loss {} outside [0, 1)",
                self.standing_loss
            )));
        }
        if !self.e_initial.is_finite() || self.e_initial < 0.0 {
            return Err(DispatchError::config(format!(
                "storage '{name}' e_initial {} must be non-negative",
                self.e_initial
            )));
        }
        if let Some(upper) = self.e_nom.upper() {
            if !self.cyclic && self.e_initial > upper {
                return Err(DispatchError::config(format!(
                    "storage '{name}' e_initial {} exceeds capacity {upper}",
                    self.e_initial
                )));
            }
        }
        if !self.marginal_cost.is_finite() {
            return Err(DispatchError::config(format!(
                "storage '{name}' marginal_cost is not finite"
            )));
        }
        if let Some(p_nom) = self.p_nom {
            if !p_nom.is_finite() || p_nom <= 0.0 {
                return Err(DispatchError::config(format!(
                    "storage '{name}' power rating must be positive, got {p_nom}"
                )));
            }
        }
        Ok(())
    }
}
