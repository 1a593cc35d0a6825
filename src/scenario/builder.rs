use std::collections::BTreeMap;

use tracing::debug;

use super::{Scenario, ScenarioKind, SiteInputs};
use crate::config::{Config, RenewableConfig};
use crate::domain::{Carrier, GeneratorSpec, Network};
use crate::error::{DispatchError, Result};
use crate::profiles::capacity_factor;

/// Assembles the network of one study from the shared inputs
pub struct ScenarioBuilder<'a> {
    config: &'a Config,
    inputs: &'a SiteInputs,
}

impl<'a> ScenarioBuilder<'a> {
    pub fn new(config: &'a Config, inputs: &'a SiteInputs) -> Self {
        Self { config, inputs }
    }

    pub fn build(&self, name: impl Into<String>, kind: ScenarioKind) -> Result<Scenario> {
        let name = name.into();
        let inputs = self.inputs;
        let grid = GeneratorSpec::grid(self.config.grid.p_nom, inputs.prices.clone());
        let mut network = Network::new(inputs.horizon.clone(), inputs.load.clone()).with_generator(grid);
        let mut available = BTreeMap::new();

        match kind {
            ScenarioKind::NoStorage => {}
            ScenarioKind::StorageExtendable => {
                network = network.with_storage(self.config.storage.extendable_unit());
            }
            _ => {
                network = network.with_storages(self.config.storage.fleet());
            }
        }

        let renewables = &self.config.renewables;
        let mut attach = |generator: GeneratorSpec, network: &mut Network| {
            let p_nom = generator.p_nom.upper().unwrap_or_default();
            let cap = (0..network.snapshots())
                .map(|t| generator.p_max_pu.at(t) * p_nom)
                .collect();
            available.insert(generator.name.clone(), cap);
            network.generators.push(generator);
        };

        match kind {
            ScenarioKind::StorageSolar => {
                let solar = self.from_production("solar", Carrier::Solar, &inputs.solar, &renewables.solar)?;
                attach(solar, &mut network);
            }
            ScenarioKind::StorageWind => attach(self.turbine()?, &mut network),
            ScenarioKind::StorageWindPark => {
                let park =
                    self.from_production("wind_park", Carrier::Wind, &inputs.wind_park, &renewables.wind_park)?;
                attach(park, &mut network);
            }
            ScenarioKind::StorageRain => {
                let rain = self.from_production("rain", Carrier::Rain, &inputs.rain, &renewables.rain.generator)?;
                attach(rain, &mut network);
            }
            ScenarioKind::StorageSolarWind => {
                let solar = self.from_production("solar", Carrier::Solar, &inputs.solar, &renewables.solar)?;
                attach(solar, &mut network);
                attach(self.turbine()?, &mut network);
            }
            ScenarioKind::NoStorage | ScenarioKind::StorageOnly | ScenarioKind::StorageExtendable => {}
        }

        network.validate()?;
        debug!(
            scenario = %name,
            %kind,
            generators = network.generators.len(),
            storages = network.storages.len(),
            "network built"
        );
        Ok(Scenario { name, kind, network, available })
    }

    /// Generator rated at its configured power, or at the series peak
    fn from_production(
        &self,
        name: &str,
        carrier: Carrier,
        production: &Option<Vec<f64>>,
        config: &RenewableConfig,
    ) -> Result<GeneratorSpec> {
        let production = production.as_ref().ok_or_else(|| missing_input(name))?;
        let peak = production.iter().copied().fold(0.0, f64::max);
        // A dry or dark horizon has nothing to normalise by
        let p_nom = config.p_nom.unwrap_or(if peak > 0.0 { peak } else { 1.0 });
        let cf = capacity_factor(name, production, p_nom)?;
        Ok(GeneratorSpec::renewable(name, carrier, p_nom, cf).with_cost(config.marginal_cost))
    }

    fn turbine(&self) -> Result<GeneratorSpec> {
        let cf = self.inputs.wind.clone().ok_or_else(|| missing_input("wind_speed"))?;
        let wind = &self.config.renewables.wind;
        Ok(GeneratorSpec::renewable("wind", Carrier::Wind, wind.p_nom, cf).with_cost(wind.marginal_cost))
    }

    /// Every selected study, built up front so input problems surface before
    /// any solver runs
    pub fn build_all(&self, selected: &[crate::config::ScenarioConfig]) -> Vec<(String, ScenarioKind, Result<Scenario>)> {
        selected
            .iter()
            .map(|s| {
                let name = s.name();
                let built = self.build(name.clone(), s.kind);
                (name, s.kind, built)
            })
            .collect()
    }
}

fn missing_input(name: &str) -> DispatchError {
    DispatchError::config(format!("scenario needs the '{name}' input, set [inputs.{name}]"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Capacity;
    use chrono::{TimeZone, Utc};
    use rstest::rstest;

    fn config() -> Config {
        Config::from_toml(
            r#"
[horizon]
start = "2024-01-01T00:00:00Z"
snapshots = 4

[solver]
timeout_seconds = 60
max_parallel = 2
tolerance = 1e-6
balance_penalty = 1e6

[grid]
p_nom = 5000
"#,
        )
        .unwrap()
    }

    fn inputs() -> SiteInputs {
        let horizon = crate::domain::Horizon::hourly(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(), 4);
        SiteInputs::new(horizon, vec![100.0; 4], vec![0.1, 0.2, 0.3, 0.4])
            .with_solar(vec![0.0, 50.0, 200.0, 0.0])
            .with_wind(vec![0.1, 0.5, 1.0, 0.0])
    }

    #[rstest]
    #[case(ScenarioKind::NoStorage, 1, 0)]
    #[case(ScenarioKind::StorageOnly, 1, 6)]
    #[case(ScenarioKind::StorageSolar, 2, 6)]
    #[case(ScenarioKind::StorageWind, 2, 6)]
    #[case(ScenarioKind::StorageSolarWind, 3, 6)]
    #[case(ScenarioKind::StorageExtendable, 1, 1)]
    fn test_components_per_kind(#[case] kind: ScenarioKind, #[case] generators: usize, #[case] storages: usize) {
        let cfg = config();
        let inputs = inputs();
        let scenario = ScenarioBuilder::new(&cfg, &inputs).build(kind.to_string(), kind).unwrap();
        assert_eq!(scenario.network.generators.len(), generators);
        assert_eq!(scenario.network.storages.len(), storages);
    }

    #[test]
    fn test_solar_rated_at_peak() {
        let cfg = config();
        let inputs = inputs();
        let scenario = ScenarioBuilder::new(&cfg, &inputs)
            .build("pv", ScenarioKind::StorageSolar)
            .unwrap();
        let solar = scenario.network.generator("solar").unwrap();
        assert_eq!(solar.p_nom, Capacity::Fixed(200.0));
        assert_eq!(scenario.available["solar"], vec![0.0, 50.0, 200.0, 0.0]);
    }

    #[test]
    fn test_extendable_unit_is_extendable() {
        let cfg = config();
        let inputs = inputs();
        let scenario = ScenarioBuilder::new(&cfg, &inputs)
            .build("ext", ScenarioKind::StorageExtendable)
            .unwrap();
        assert!(scenario.network.storages[0].e_nom.is_extendable());
    }

    #[test]
    fn test_missing_input_is_configuration_error() {
        let cfg = config();
        let inputs = inputs();
        let err = ScenarioBuilder::new(&cfg, &inputs)
            .build("rain", ScenarioKind::StorageRain)
            .unwrap_err();
        assert!(err.to_string().contains("'rain'"));
    }
}
