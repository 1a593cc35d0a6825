use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Time series construction errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SeriesError {
    #[error("Series '{0}' has no points")]
    Empty(String),

    #[error("Series '{name}' is not sorted at point {index}")]
    Unsorted { name: String, index: usize },

    #[error("Series '{name}' has duplicate timestamp {timestamp}")]
    Duplicate { name: String, timestamp: DateTime<Utc> },

    #[error("Series '{name}' has a non-finite value at point {index}")]
    NonFinite { name: String, index: usize },

    #[error("Series '{name}' line {line}: {reason}")]
    Parse { name: String, line: u64, reason: String },
}

/// Named, strictly increasing sequence of timestamped values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    pub name: String,
    points: Vec<(DateTime<Utc>, f64)>,
}

impl TimeSeries {
    pub fn new(
        name: impl Into<String>,
        points: Vec<(DateTime<Utc>, f64)>,
    ) -> Result<Self, SeriesError> {
        let name = name.into();
        if points.is_empty() {
            return Err(SeriesError::Empty(name));
        }
        if let Some(index) = points.iter().position(|(_, v)| !v.is_finite()) {
            return Err(SeriesError::NonFinite { name, index });
        }
        for (index, pair) in points.windows(2).enumerate() {
            if pair[1].0 == pair[0].0 {
                return Err(SeriesError::Duplicate { name, timestamp: pair[1].0 });
            }
            if pair[1].0 < pair[0].0 {
                return Err(SeriesError::Unsorted { name, index: index + 1 });
            }
        }
        Ok(Self { name, points })
    }

    /// Regularly sampled series starting at `start`
    pub fn from_values(
        name: impl Into<String>,
        start: DateTime<Utc>,
        step: Duration,
        values: Vec<f64>,
    ) -> Result<Self, SeriesError> {
        let points = values
            .into_iter()
            .enumerate()
            .map(|(i, v)| (start + step * i as i32, v))
            .collect();
        Self::new(name, points)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[(DateTime<Utc>, f64)] {
        &self.points
    }

    pub fn first(&self) -> DateTime<Utc> {
        self.points[0].0
    }

    pub fn last(&self) -> DateTime<Utc> {
        self.points[self.points.len() - 1].0
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|(_, v)| *v)
    }

    pub fn sum(&self) -> f64 {
        self.values().sum()
    }

    /// Median spacing between consecutive points, `None` for a single point
    pub fn typical_step(&self) -> Option<Duration> {
        let mut steps: Vec<Duration> = self.points.windows(2).map(|w| w[1].0 - w[0].0).collect();
        if steps.is_empty() {
            return None;
        }
        steps.sort();
        Some(steps[steps.len() / 2])
    }

    /// Apply `f` to every value
    pub fn map(mut self, f: impl Fn(f64) -> f64) -> Self {
        for (_, v) in &mut self.points {
            *v = f(*v);
        }
        self
    }

    pub fn scale(self, factor: f64) -> Self {
        self.map(|v| v * factor)
    }

    /// Clip negative values to zero (sensor noise on production meters)
    pub fn clip_negative(self) -> Self {
        self.map(|v| v.max(0.0))
    }

    pub fn rename(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}
