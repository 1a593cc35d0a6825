use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use figment::{providers::{Env, Format, Toml}, Figment};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use validator::Validate;

use crate::domain::{Horizon, StorageSpec};
use crate::profiles::{PowerCurve, RainHarvester, SyntheticLoad, SyntheticPrices};
use crate::scenario::ScenarioKind;
use crate::timeseries::{Column, CsvFormat, FillMethod};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Config {
    #[validate(nested)]
    pub horizon: HorizonConfig,
    #[validate(nested)]
    pub solver: SolverConfig,
    #[serde(default)]
    #[validate(nested)]
    pub inputs: InputsConfig,
    #[validate(nested)]
    pub grid: GridConfig,
    #[serde(default)]
    #[validate(nested)]
    pub storage: StorageConfig,
    #[serde(default)]
    #[validate(nested)]
    pub renewables: RenewablesConfig,
    #[serde(default)]
    pub scenarios: Vec<ScenarioConfig>,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct HorizonConfig {
    pub start: DateTime<Utc>,
    #[validate(range(min = 1))]
    pub snapshots: usize,
    #[serde(default = "default_step_hours")]
    #[validate(range(exclusive_min = 0.0, max = 24.0))]
    pub step_hours: f64,
    /// Zone of naive timestamps in input files
    #[serde(default)]
    pub timezone: Option<Tz>,
}

fn default_step_hours() -> f64 { 1.0 }

impl HorizonConfig {
    pub fn horizon(&self) -> Horizon {
        let step = Duration::seconds((self.step_hours * 3600.0).round() as i64);
        Horizon::new(self.start, step, self.snapshots)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SolverConfig {
    #[validate(range(min = 1))]
    pub timeout_seconds: u64,
    #[validate(range(min = 1, max = 64))]
    pub max_parallel: usize,
    #[validate(range(exclusive_min = 0.0, max = 1e-2))]
    pub tolerance: f64,
    #[validate(range(exclusive_min = 0.0))]
    pub balance_penalty: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 300,
            max_parallel: 4,
            tolerance: 1e-6,
            balance_penalty: 1e6,
        }
    }
}

/// One CSV-backed input series
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SeriesInput {
    pub path: PathBuf,
    #[serde(default)]
    pub format: CsvFormat,
    #[serde(default)]
    pub fill: FillMethod,
    #[serde(default = "default_scale")]
    #[validate(range(exclusive_min = 0.0))]
    pub scale: f64,
}

fn default_scale() -> f64 { 1.0 }

/// Recorded demand in three operating modes, one column each
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoadModesInput {
    pub path: PathBuf,
    #[serde(default)]
    pub format: CsvFormat,
    pub normal: Column,
    pub low: Column,
    pub peak: Column,
    #[serde(default)]
    pub mix: SyntheticLoad,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct InputsConfig {
    #[validate(nested)]
    pub load: Option<SeriesInput>,
    /// Used when `load` is unset
    pub load_modes: Option<LoadModesInput>,
    /// Spot prices; synthetic prices are generated when unset
    #[validate(nested)]
    pub prices: Option<SeriesInput>,
    #[serde(default)]
    pub synthetic_prices: SyntheticPrices,
    #[validate(nested)]
    pub solar: Option<SeriesInput>,
    #[validate(nested)]
    pub wind_speed: Option<SeriesInput>,
    #[validate(nested)]
    pub wind_park: Option<SeriesInput>,
    #[validate(nested)]
    pub rain: Option<SeriesInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GridConfig {
    #[validate(range(exclusive_min = 0.0))]
    pub p_nom: f64,
    /// Multiplier from input price unit to cost per unit energy (0.001 for
    /// EUR/MWh prices on a kWh network)
    #[serde(default = "default_scale")]
    #[validate(range(exclusive_min = 0.0))]
    pub price_scale: f64,
}

/// Parameters of one storage unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct StorageUnitConfig {
    pub name: Option<String>,
    #[validate(range(exclusive_min = 0.0))]
    pub e_nom: f64,
    #[validate(range(min = 0.0))]
    pub e_initial: f64,
    #[validate(range(min = 0.0, max = 1.0))]
    pub e_min_pu: f64,
    #[validate(range(min = 0.0, max = 1.0))]
    pub e_max_pu: f64,
    #[validate(range(exclusive_min = 0.0, max = 1.0))]
    pub efficiency_store: f64,
    #[validate(range(exclusive_min = 0.0, max = 1.0))]
    pub efficiency_dispatch: f64,
    #[validate(range(min = 0.0, exclusive_max = 1.0))]
    pub standing_loss: f64,
    pub cyclic: bool,
    pub marginal_cost: f64,
    /// Charge and discharge power rating
    pub p_nom: Option<f64>,
}

impl Default for StorageUnitConfig {
    fn default() -> Self {
        Self {
            name: None,
            e_nom: 1000.0,
            e_initial: 0.0,
            e_min_pu: 0.2,
            e_max_pu: 0.8,
            efficiency_store: 0.9,
            efficiency_dispatch: 0.9,
            standing_loss: 0.001,
            cyclic: false,
            marginal_cost: 0.0,
            p_nom: None,
        }
    }
}

impl StorageUnitConfig {
    pub fn spec(&self, name: impl Into<String>) -> StorageSpec {
        let mut spec = StorageSpec::new(name, self.e_nom)
            .with_window(self.e_min_pu, self.e_max_pu)
            .with_initial(self.e_initial)
            .with_efficiency(self.efficiency_store, self.efficiency_dispatch)
            .with_standing_loss(self.standing_loss)
            .with_marginal_cost(self.marginal_cost);
        if let Some(p_nom) = self.p_nom {
            spec = spec.with_power_rating(p_nom);
        }
        if self.cyclic {
            spec = spec.cyclic();
        }
        spec
    }
}

/// Sizing bounds for the extendable-storage study
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ExtendableConfig {
    #[validate(range(min = 0.0))]
    pub min: f64,
    pub max: Option<f64>,
    /// Cost per unit of installed energy capacity
    pub capital_cost: f64,
}

impl Default for ExtendableConfig {
    fn default() -> Self {
        Self {
            min: 0.0,
            max: Some(20_000.0),
            capital_cost: 100_000.0,
        }
    }
}

/// Storage fleet: an explicit list of units, or `count` copies of `template`
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct StorageConfig {
    #[validate(range(min = 1, max = 1000))]
    pub count: usize,
    #[validate(nested)]
    pub template: StorageUnitConfig,
    #[validate(nested)]
    pub units: Vec<StorageUnitConfig>,
    #[validate(nested)]
    pub extendable: ExtendableConfig,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            count: 6,
            template: StorageUnitConfig::default(),
            units: Vec::new(),
            extendable: ExtendableConfig::default(),
        }
    }
}

impl StorageConfig {
    /// Storage units of the fixed-capacity studies
    pub fn fleet(&self) -> Vec<StorageSpec> {
        if self.units.is_empty() {
            (1..=self.count)
                .map(|i| self.template.spec(format!("battery{i}")))
                .collect()
        } else {
            self.units
                .iter()
                .enumerate()
                .map(|(i, unit)| {
                    let name = unit.name.clone().unwrap_or_else(|| format!("battery{}", i + 1));
                    unit.spec(name)
                })
                .collect()
        }
    }

    /// Single unit whose capacity is left to the optimizer
    pub fn extendable_unit(&self) -> StorageSpec {
        let ext = &self.extendable;
        self.template
            .spec("battery")
            .extendable(ext.min, ext.max, ext.capital_cost)
    }
}

/// Weather-driven generator rating and cost
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct RenewableConfig {
    /// Nominal power; the peak of the production series when unset
    pub p_nom: Option<f64>,
    pub marginal_cost: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct WindConfig {
    #[validate(range(exclusive_min = 0.0))]
    pub p_nom: f64,
    pub marginal_cost: f64,
    pub curve: PowerCurve,
}

impl Default for WindConfig {
    fn default() -> Self {
        Self {
            p_nom: 1300.0,
            marginal_cost: 0.0,
            curve: PowerCurve::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct RainConfig {
    #[serde(flatten)]
    #[validate(nested)]
    pub generator: RenewableConfig,
    pub harvester: RainHarvester,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct RenewablesConfig {
    #[validate(nested)]
    pub solar: RenewableConfig,
    #[validate(nested)]
    pub wind: WindConfig,
    #[validate(nested)]
    pub wind_park: RenewableConfig,
    #[validate(nested)]
    pub rain: RainConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub kind: ScenarioKind,
    /// Output folder and report label, the kind when unset
    #[serde(default)]
    pub name: Option<String>,
}

impl ScenarioConfig {
    pub fn name(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.kind.to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub directory: PathBuf,
    /// Write per-snapshot dispatch files next to the summaries
    pub dispatch: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("results"),
            dispatch: true,
        }
    }
}

impl Config {
    /// Layered load: `config/default.toml`, an optional override file, then
    /// `SITE__` environment variables (`SITE__SOLVER__MAX_PARALLEL=2`).
    pub fn load(extra: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new().merge(Toml::file("config/default.toml"));
        if let Some(path) = extra {
            anyhow::ensure!(path.exists(), "config file {} not found", path.display());
            figment = figment.merge(Toml::file(path));
        }
        Self::from_figment(figment.merge(Env::prefixed("SITE__").split("__")))
    }

    pub fn from_toml(toml: &str) -> Result<Self> {
        Self::from_figment(Figment::new().merge(Toml::string(toml)))
    }

    fn from_figment(figment: Figment) -> Result<Self> {
        let cfg: Config = figment.extract().context("invalid configuration")?;
        cfg.validate().context("configuration out of range")?;
        cfg.check()?;
        Ok(cfg)
    }

    /// Cross-field rules the derive cannot express
    fn check(&self) -> Result<()> {
        let fleet = &self.storage;
        for unit in fleet.units.iter().chain(std::iter::once(&fleet.template)) {
            anyhow::ensure!(
                unit.e_min_pu <= unit.e_max_pu,
                "storage e_min_pu {} exceeds e_max_pu {}",
                unit.e_min_pu,
                unit.e_max_pu
            );
        }
        if let Some(max) = fleet.extendable.max {
            anyhow::ensure!(
                max >= fleet.extendable.min,
                "extendable storage max {max} is below min {}",
                fleet.extendable.min
            );
        }
        Ok(())
    }

    /// Scenarios to run: the CLI selection, else the configured list, else a
    /// storage vs no-storage comparison
    pub fn selected_scenarios(&self, cli: &[ScenarioKind]) -> Vec<ScenarioConfig> {
        if !cli.is_empty() {
            return cli
                .iter()
                .map(|kind| ScenarioConfig { kind: *kind, name: None })
                .collect();
        }
        if !self.scenarios.is_empty() {
            return self.scenarios.clone();
        }
        [ScenarioKind::NoStorage, ScenarioKind::StorageOnly]
            .into_iter()
            .map(|kind| ScenarioConfig { kind, name: None })
            .collect()
    }
}
