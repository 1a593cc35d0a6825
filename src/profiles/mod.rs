//! Renewable and demand profiles
//!
//! Turn raw weather and metering inputs into the per-snapshot series a
//! network needs: capacity factors for weather-driven generators, synthetic
//! demand and synthetic spot prices for studies without market data.

pub mod prices;
pub mod rain;
pub mod solar;
pub mod synthetic;
pub mod wind;

pub use prices::SyntheticPrices;
pub use rain::RainHarvester;
pub use solar::solar_production;
pub use synthetic::{OperatingModes, SyntheticLoad};
pub use wind::{wind_park_production, PowerCurve};

use tracing::warn;

use crate::error::{DispatchError, Result};

/// Production (power) per snapshot expressed per unit of `p_nom`.
///
/// Values above the rating are clipped to 1 and reported once.
pub fn capacity_factor(name: &str, production: &[f64], p_nom: f64) -> Result<Vec<f64>> {
    if !(p_nom.is_finite() && p_nom > 0.0) {
        return Err(DispatchError::config(format!(
            "'{name}' nominal power must be positive, got {p_nom}"
        )));
    }
    let mut clipped = 0usize;
    let factors = production
        .iter()
        .map(|p| {
            let cf = p.max(0.0) / p_nom;
            if cf > 1.0 {
                clipped += 1;
                1.0
            } else {
                cf
            }
        })
        .collect();
    if clipped > 0 {
        warn!(series = name, clipped, p_nom, "production above nominal power clipped");
    }
    Ok(factors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_factor_clips() {
        let cf = capacity_factor("pv", &[0.0, 50.0, 150.0, -1.0], 100.0).unwrap();
        assert_eq!(cf, vec![0.0, 0.5, 1.0, 0.0]);
    }

    #[test]
    fn test_capacity_factor_rejects_zero_rating() {
        assert!(capacity_factor("pv", &[1.0], 0.0).is_err());
    }
}
