//! Shared study inputs
//!
//! Every scenario of a run sees the same load, prices and weather. They are
//! read and aligned once, before any network is built.

use tracing::{info, instrument};

use crate::config::{Config, LoadModesInput, SeriesInput};
use crate::domain::Horizon;
use crate::error::{DispatchError, Result};
use crate::profiles::{solar_production, wind_park_production, OperatingModes};
use crate::timeseries::{align, read_series_file, Column, CsvFormat, TimeSeries};

/// Aligned per-snapshot inputs
#[derive(Debug, Clone, PartialEq)]
pub struct SiteInputs {
    pub horizon: Horizon,
    pub load: Vec<f64>,
    /// Cost per unit energy, already scaled
    pub prices: Vec<f64>,
    /// PV production
    pub solar: Option<Vec<f64>>,
    /// Turbine capacity factor
    pub wind: Option<Vec<f64>>,
    /// Wind park production
    pub wind_park: Option<Vec<f64>>,
    /// Rain harvesting production
    pub rain: Option<Vec<f64>>,
}

impl SiteInputs {
    pub fn new(horizon: Horizon, load: Vec<f64>, prices: Vec<f64>) -> Self {
        Self {
            horizon,
            load,
            prices,
            solar: None,
            wind: None,
            wind_park: None,
            rain: None,
        }
    }

    pub fn with_solar(mut self, production: Vec<f64>) -> Self {
        self.solar = Some(production);
        self
    }

    pub fn with_wind(mut self, capacity_factor: Vec<f64>) -> Self {
        self.wind = Some(capacity_factor);
        self
    }

    pub fn with_wind_park(mut self, production: Vec<f64>) -> Self {
        self.wind_park = Some(production);
        self
    }

    pub fn with_rain(mut self, production: Vec<f64>) -> Self {
        self.rain = Some(production);
        self
    }

    /// Read every configured input and align it to the configured horizon
    #[instrument(skip_all)]
    pub fn load(config: &Config) -> Result<Self> {
        let horizon = config.horizon.horizon();
        horizon.validate()?;
        let tz = config.horizon.timezone;
        let inputs = &config.inputs;

        let load = match (&inputs.load, &inputs.load_modes) {
            (Some(input), _) => {
                let series = read_input("load", input, &horizon, tz)?;
                align(&series, &horizon, input.fill)?
            }
            (None, Some(modes)) => synthetic_load(modes, &horizon, tz)?,
            (None, None) => {
                return Err(DispatchError::config(
                    "no load input: set [inputs.load] or [inputs.load_modes]",
                ))
            }
        };

        let raw_prices = match &inputs.prices {
            Some(input) => {
                let series = read_input("prices", input, &horizon, tz)?;
                align(&series, &horizon, input.fill)?
            }
            None => {
                info!("no price input, generating synthetic spot prices");
                inputs.synthetic_prices.generate(&horizon)?
            }
        };
        let prices = raw_prices.iter().map(|p| p * config.grid.price_scale).collect();

        let mut site = Self::new(horizon, load, prices);
        if let Some(input) = &inputs.solar {
            let series = read_input("solar", input, &site.horizon, tz)?;
            site.solar = Some(solar_production(series, &site.horizon)?);
        }
        if let Some(input) = &inputs.wind_speed {
            let series = read_input("wind_speed", input, &site.horizon, tz)?;
            site.wind = Some(config.renewables.wind.curve.profile(&series, &site.horizon)?);
        }
        if let Some(input) = &inputs.wind_park {
            let series = read_input("wind_park", input, &site.horizon, tz)?;
            site.wind_park = Some(wind_park_production(series, &site.horizon)?);
        }
        if let Some(input) = &inputs.rain {
            let series = read_input("rain", input, &site.horizon, tz)?;
            site.rain = Some(config.renewables.rain.harvester.production(&series, &site.horizon)?);
        }

        info!(
            snapshots = site.horizon.len,
            peak_load = site.load.iter().copied().fold(0.0, f64::max),
            solar = site.solar.is_some(),
            wind = site.wind.is_some(),
            wind_park = site.wind_park.is_some(),
            rain = site.rain.is_some(),
            "inputs loaded"
        );
        Ok(site)
    }
}

fn with_default_tz(format: &CsvFormat, tz: Option<chrono_tz::Tz>) -> CsvFormat {
    let mut format = format.clone();
    if format.timezone.is_none() {
        format.timezone = tz;
    }
    format
}

fn read_input(
    name: &str,
    input: &SeriesInput,
    horizon: &Horizon,
    tz: Option<chrono_tz::Tz>,
) -> Result<TimeSeries> {
    let format = with_default_tz(&input.format, tz);
    let series = read_series_file(name, &input.path, &format, horizon)?;
    Ok(series.scale(input.scale))
}

fn synthetic_load(
    input: &LoadModesInput,
    horizon: &Horizon,
    tz: Option<chrono_tz::Tz>,
) -> Result<Vec<f64>> {
    let column = |value_column: Column| -> Result<Vec<f64>> {
        let format = CsvFormat {
            value_column,
            ..with_default_tz(&input.format, tz)
        };
        Ok(read_series_file("load_modes", &input.path, &format, horizon)?
            .values()
            .collect())
    };
    let modes = OperatingModes {
        normal: column(input.normal.clone())?,
        low: column(input.low.clone())?,
        peak: column(input.peak.clone())?,
    };
    let mut load = input.mix.generate(&modes)?;
    if load.len() < horizon.len {
        return Err(DispatchError::misaligned(
            "load_modes",
            format!(
                "synthetic profile has {} steps, horizon needs {}",
                load.len(),
                horizon.len
            ),
        ));
    }
    load.truncate(horizon.len);
    Ok(load)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn config(dir: &std::path::Path, extra: &str) -> Config {
        let toml = format!(
            r#"
[horizon]
start = "2024-01-01T00:00:00Z"
snapshots = 3

[solver]
timeout_seconds = 60
max_parallel = 2
tolerance = 1e-6
balance_penalty = 1e6

[grid]
p_nom = 5000
price_scale = 0.001

[inputs.load]
path = "{dir}/load.csv"

{extra}
"#,
            dir = dir.display()
        );
        Config::from_toml(&toml).unwrap()
    }

    fn write(dir: &std::path::Path, name: &str, body: &str) {
        let mut file = std::fs::File::create(dir.join(name)).unwrap();
        file.write_all(body.as_bytes()).unwrap();
    }

    #[test]
    fn test_load_with_csv_prices() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "load.csv", "time,kw\n2024-01-01 00:00,10\n2024-01-01 01:00,20\n2024-01-01 02:00,30\n");
        write(dir.path(), "prices.csv", "time;eur\n2024-01-01 00:00;100,0\n2024-01-01 01:00;200,0\n2024-01-01 02:00;300,0\n");
        let extra = format!(
            "[inputs.prices]\npath = \"{}/prices.csv\"\nformat = {{ delimiter = \";\", decimal_comma = true }}\n",
            dir.path().display()
        );
        let site = SiteInputs::load(&config(dir.path(), &extra)).unwrap();
        assert_eq!(site.load, vec![10.0, 20.0, 30.0]);
        for (price, expected) in site.prices.iter().zip([0.1, 0.2, 0.3]) {
            approx::assert_relative_eq!(*price, expected, epsilon = 1e-12);
        }
        assert!(site.solar.is_none());
    }

    #[test]
    fn test_synthetic_prices_when_unset() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "load.csv", "time,kw\n2024-01-01 00:00,10\n2024-01-01 01:00,20\n2024-01-01 02:00,30\n");
        let site = SiteInputs::load(&config(dir.path(), "")).unwrap();
        assert_eq!(site.prices.len(), 3);
    }

    #[test]
    fn test_short_load_is_misaligned() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "load.csv", "time,kw\n2024-01-01 00:00,10\n");
        let err = SiteInputs::load(&config(dir.path(), "")).unwrap_err();
        assert!(matches!(err, DispatchError::MisalignedSeries { .. }));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = SiteInputs::load(&config(dir.path(), "")).unwrap_err();
        assert!(matches!(err, DispatchError::Io(_)));
    }
}
