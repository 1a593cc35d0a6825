use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Every energy flow on the bus at one snapshot
///
/// Power balance: Σ generation + Σ storage net injection = load
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchSnapshot {
    pub timestamp: DateTime<Utc>,

    /// Demand at the bus
    pub load: f64,

    /// Output per generator, in network order
    pub generation: Vec<f64>,

    /// Net injection per storage unit (positive = discharging)
    pub storage_net: Vec<f64>,

    /// Stored energy per storage unit at the end of the snapshot
    pub stored: Vec<f64>,

    /// Bus marginal price
    pub marginal_price: f64,
}

impl DispatchSnapshot {
    /// Total injection into the bus
    pub fn supply(&self) -> f64 {
        self.generation.iter().sum::<f64>() + self.storage_net.iter().sum::<f64>()
    }

    /// Supply minus load, zero for a balanced snapshot
    pub fn imbalance(&self) -> f64 {
        self.supply() - self.load
    }

    /// Verify power balance holds (supply = load) within `tolerance`,
    /// scaled by the size of the flows involved
    pub fn verify_power_balance(&self, tolerance: f64) -> bool {
        let scale = self.load.abs().max(1.0);
        self.imbalance().abs() <= tolerance * scale
    }

    /// Power absorbed by storage units that are charging
    pub fn storage_charging(&self) -> f64 {
        self.storage_net.iter().map(|p| (-p).max(0.0)).sum()
    }

    /// Power delivered by storage units that are discharging
    pub fn storage_discharging(&self) -> f64 {
        self.storage_net.iter().map(|p| p.max(0.0)).sum()
    }

    pub fn total_stored(&self) -> f64 {
        self.stored.iter().sum()
    }
}

impl fmt::Display for DispatchSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} load {:.2} supply {:.2} stored {:.2} price {:.4}",
            self.timestamp.format("%Y-%m-%d %H:%M"),
            self.load,
            self.supply(),
            self.total_stored(),
            self.marginal_price
        )
    }
}
