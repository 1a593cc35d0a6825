use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{DispatchError, Result};

// ============================================================================
// Horizon
// ============================================================================

/// Ordered, gap-free sequence of snapshots sharing one step size.
///
/// Snapshot `t` starts at `start + t * step`. All series fed to a network must
/// have exactly `len` values in this order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Horizon {
    pub start: DateTime<Utc>,
    #[serde(with = "step_seconds")]
    pub step: Duration,
    pub len: usize,
}

impl Horizon {
    pub fn new(start: DateTime<Utc>, step: Duration, len: usize) -> Self {
        Self { start, step, len }
    }

    /// Hourly horizon, the resolution of every study so far
    pub fn hourly(start: DateTime<Utc>, len: usize) -> Self {
        Self::new(start, Duration::hours(1), len)
    }

    /// Step length in hours (Δt), the energy weight of one snapshot
    pub fn step_hours(&self) -> f64 {
        self.step.num_seconds() as f64 / 3600.0
    }

    pub fn timestamp(&self, snapshot: usize) -> DateTime<Utc> {
        self.start + self.step * snapshot as i32
    }

    pub fn timestamps(&self) -> impl Iterator<Item = DateTime<Utc>> + '_ {
        (0..self.len).map(|t| self.timestamp(t))
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.timestamp(self.len)
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn validate(&self) -> Result<()> {
        if self.len == 0 {
            return Err(DispatchError::config("horizon has no snapshots"));
        }
        if self.step <= Duration::zero() {
            return Err(DispatchError::config(format!(
                "horizon step must be positive, got {}s",
                self.step.num_seconds()
            )));
        }
        Ok(())
    }
}

impl fmt::Display for Horizon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} x {}s from {}",
            self.len,
            self.step.num_seconds(),
            self.start.to_rfc3339()
        )
    }
}

mod step_seconds {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(step: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_i64(step.num_seconds())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        i64::deserialize(d).map(Duration::seconds)
    }
}

// ============================================================================
// Profiles
// ============================================================================

/// Per-snapshot parameter, either constant over the horizon or one value per
/// snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Profile {
    Constant(f64),
    Series(Vec<f64>),
}

impl Profile {
    pub fn at(&self, snapshot: usize) -> f64 {
        match self {
            Profile::Constant(v) => *v,
            Profile::Series(values) => values[snapshot],
        }
    }

    /// Check that a series profile is indexed by the same snapshots as the
    /// horizon and holds only finite values.
    pub fn check(&self, name: &str, len: usize) -> Result<()> {
        match self {
            Profile::Constant(v) if !v.is_finite() => Err(DispatchError::config(format!(
                "{name} is not finite"
            ))),
            Profile::Constant(_) => Ok(()),
            Profile::Series(values) => {
                if values.len() != len {
                    return Err(DispatchError::config(format!(
                        "{name} has {} values but the horizon has {len} snapshots",
                        values.len()
                    )));
                }
                if let Some(t) = values.iter().position(|v| !v.is_finite()) {
                    return Err(DispatchError::config(format!(
                        "{name} is not finite at snapshot {t}"
                    )));
                }
                Ok(())
            }
        }
    }

    pub fn min(&self) -> f64 {
        match self {
            Profile::Constant(v) => *v,
            Profile::Series(values) => values.iter().copied().fold(f64::INFINITY, f64::min),
        }
    }

    pub fn max(&self) -> f64 {
        match self {
            Profile::Constant(v) => *v,
            Profile::Series(values) => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        }
    }
}

impl From<f64> for Profile {
    fn from(v: f64) -> Self {
        Profile::Constant(v)
    }
}

impl From<Vec<f64>> for Profile {
    fn from(values: Vec<f64>) -> Self {
        Profile::Series(values)
    }
}

// ============================================================================
// Capacity
// ============================================================================

/// Nominal capacity of a component: either given, or chosen by the solver and
/// priced per unit through `capital_cost`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capacity {
    Fixed(f64),
    Extendable {
        min: f64,
        max: Option<f64>,
        capital_cost: f64,
    },
}

impl Capacity {
    pub fn is_extendable(&self) -> bool {
        matches!(self, Capacity::Extendable { .. })
    }

    /// Largest value the capacity can take, if bounded
    pub fn upper(&self) -> Option<f64> {
        match self {
            Capacity::Fixed(v) => Some(*v),
            Capacity::Extendable { max, .. } => *max,
        }
    }

    pub fn check(&self, name: &str) -> Result<()> {
        match self {
            Capacity::Fixed(v) if !v.is_finite() || *v <= 0.0 => Err(DispatchError::config(
                format!("{name} must be positive, got {v}"),
            )),
            Capacity::Fixed(_) => Ok(()),
            Capacity::Extendable { min, max, capital_cost } => {
                if !min.is_finite() || *min < 0.0 {
                    return Err(DispatchError::config(format!(
                        "{name} minimum must be non-negative, got {min}"
                    )));
                }
                if let Some(max) = max {
                    if !max.is_finite() || max < min {
                        return Err(DispatchError::config(format!(
                            "{name} maximum {max} is below minimum {min}"
                        )));
                    }
                }
                if !capital_cost.is_finite() {
                    return Err(DispatchError::config(format!(
                        "{name} capital cost is not finite"
                    )));
                }
                Ok(())
            }
        }
    }

    /// A capacity the solver can grow forever while earning money makes the
    /// objective unbounded below.
    pub fn is_unbounded_below(&self) -> bool {
        matches!(
            self,
            Capacity::Extendable { max: None, capital_cost, .. } if *capital_cost < 0.0
        )
    }
}

impl fmt::Display for Capacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capacity::Fixed(v) => write!(f, "{v}"),
            Capacity::Extendable { min, max: Some(max), .. } => write!(f, "[{min}, {max}]"),
            Capacity::Extendable { min, max: None, .. } => write!(f, "[{min}, ∞)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_horizon_timestamps() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let horizon = Horizon::new(start, Duration::minutes(30), 4);
        let stamps: Vec<_> = horizon.timestamps().collect();
        assert_eq!(stamps.len(), 4);
        assert_eq!(stamps[3], Utc.with_ymd_and_hms(2024, 1, 1, 1, 30, 0).unwrap());
        assert_eq!(horizon.step_hours(), 0.5);
        assert_eq!(horizon.end(), Utc.with_ymd_and_hms(2024, 1, 1, 2, 0, 0).unwrap());
    }

    #[test]
    fn test_horizon_rejects_empty() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert!(Horizon::hourly(start, 0).validate().is_err());
    }

    #[test]
    fn test_profile_length_mismatch() {
        let profile = Profile::Series(vec![1.0, 2.0]);
        assert!(profile.check("price", 2).is_ok());
        let err = profile.check("price", 3).unwrap_err();
        assert!(matches!(err, DispatchError::Configuration(_)));
    }

    #[test]
    fn test_profile_rejects_nan() {
        let profile = Profile::Series(vec![1.0, f64::NAN]);
        assert!(profile.check("load", 2).is_err());
    }

    #[test]
    fn test_capacity_checks() {
        assert!(Capacity::Fixed(0.0).check("p_nom").is_err());
        assert!(Capacity::Fixed(10.0).check("p_nom").is_ok());
        let bad = Capacity::Extendable { min: 5.0, max: Some(1.0), capital_cost: 1.0 };
        assert!(bad.check("e_nom").is_err());
        let open = Capacity::Extendable { min: 0.0, max: None, capital_cost: -1.0 };
        assert!(open.check("e_nom").is_ok());
        assert!(open.is_unbounded_below());
    }
}
