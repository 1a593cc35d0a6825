//! Synthetic year-long demand
//!
//! A short metering campaign records the site in three operating modes. A
//! year is assembled from whole days of those recordings, mixed in fixed
//! proportions and shuffled, so daily shape is preserved while the seasonal
//! mix is controlled.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{DispatchError, Result};

/// Demand recordings per operating mode, hourly, aligned day by day
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OperatingModes {
    pub normal: Vec<f64>,
    pub low: Vec<f64>,
    pub peak: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticLoad {
    /// Share of days drawn from normal operation
    pub normal_share: f64,
    /// Share of days drawn from low-power operation; peak days fill the rest
    pub low_share: f64,
    pub steps_per_day: usize,
    /// Seeds for sampling normal, low and peak days
    pub sample_seeds: [u64; 3],
    pub shuffle_seed: u64,
}

impl Default for SyntheticLoad {
    fn default() -> Self {
        Self {
            normal_share: 0.5,
            low_share: 0.35,
            steps_per_day: 24,
            sample_seeds: [42, 43, 44],
            shuffle_seed: 123,
        }
    }
}

impl SyntheticLoad {
    pub fn validate(&self) -> Result<()> {
        if self.steps_per_day == 0 {
            return Err(DispatchError::config("steps_per_day must be positive"));
        }
        if self.normal_share < 0.0 || self.low_share < 0.0 || self.normal_share + self.low_share > 1.0 {
            return Err(DispatchError::config(format!(
                "mode shares {} + {} must be non-negative and sum to at most 1",
                self.normal_share, self.low_share
            )));
        }
        Ok(())
    }

    /// Assemble a profile with as many days as the recordings hold
    pub fn generate(&self, modes: &OperatingModes) -> Result<Vec<f64>> {
        self.validate()?;
        let days = |values: &[f64]| -> Vec<Vec<f64>> {
            values
                .chunks_exact(self.steps_per_day)
                .map(<[f64]>::to_vec)
                .collect()
        };
        let normal = days(&modes.normal);
        let low = days(&modes.low);
        let peak = days(&modes.peak);

        let n_days = normal.len().min(low.len()).min(peak.len());
        if n_days == 0 {
            return Err(DispatchError::config(format!(
                "every operating mode needs at least one full day of {} steps",
                self.steps_per_day
            )));
        }
        let n_normal = (n_days as f64 * self.normal_share) as usize;
        let n_low = (n_days as f64 * self.low_share) as usize;
        let n_peak = n_days - n_normal - n_low;

        let sample = |blocks: &[Vec<f64>], n: usize, seed: u64| -> Vec<Vec<f64>> {
            let mut rng = StdRng::seed_from_u64(seed);
            blocks.choose_multiple(&mut rng, n).cloned().collect()
        };
        let [normal_seed, low_seed, peak_seed] = self.sample_seeds;
        let mut all_days = sample(&normal, n_normal, normal_seed);
        all_days.extend(sample(&low, n_low, low_seed));
        all_days.extend(sample(&peak, n_peak, peak_seed));

        all_days.shuffle(&mut StdRng::seed_from_u64(self.shuffle_seed));
        debug!(n_days, n_normal, n_low, n_peak, "synthetic load assembled");
        Ok(all_days.into_iter().flatten().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn modes(days: usize) -> OperatingModes {
        OperatingModes {
            normal: vec![2.0; 24 * days],
            low: vec![1.0; 24 * days],
            peak: vec![3.0; 24 * days],
        }
    }

    #[test]
    fn test_mix_proportions() {
        let load = SyntheticLoad::default().generate(&modes(20)).unwrap();
        assert_eq!(load.len(), 20 * 24);
        let count = |v: f64| load.iter().filter(|x| **x == v).count() / 24;
        assert_eq!(count(2.0), 10);
        assert_eq!(count(1.0), 7);
        assert_eq!(count(3.0), 3);
    }

    #[test]
    fn test_reproducible() {
        let recorded = OperatingModes {
            normal: (0..240).map(f64::from).collect(),
            low: (0..240).map(|v| f64::from(v) + 1000.0).collect(),
            peak: (0..240).map(|v| f64::from(v) + 2000.0).collect(),
        };
        let synth = SyntheticLoad::default();
        assert_eq!(synth.generate(&recorded).unwrap(), synth.generate(&recorded).unwrap());
    }

    #[test]
    fn test_days_stay_whole() {
        let recorded = OperatingModes {
            normal: (0..240).map(f64::from).collect(),
            ..modes(10)
        };
        let load = SyntheticLoad::default().generate(&recorded).unwrap();
        // Constant low and peak days start and end on the same value
        for day in load.chunks(24).filter(|day| day[0] != day[23]) {
            assert_eq!(day[0] as usize % 24, 0);
            assert_eq!(day[23], day[0] + 23.0);
        }
    }

    #[test]
    fn test_rejects_partial_day() {
        let recorded = OperatingModes {
            normal: vec![1.0; 10],
            low: vec![1.0; 10],
            peak: vec![1.0; 10],
        };
        assert!(SyntheticLoad::default().generate(&recorded).is_err());
    }
}
