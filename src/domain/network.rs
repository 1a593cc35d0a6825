use itertools::Itertools;
use serde::{Deserialize, Serialize};

use super::{GeneratorSpec, Horizon, StorageSpec};
use crate::error::{DispatchError, Result};

/// Single copper bus with one fixed load and any number of generators and
/// storage units. All components are electrically coincident.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Network {
    pub bus: String,
    pub horizon: Horizon,
    /// Demand per snapshot (power, averaged over the step)
    pub load: Vec<f64>,
    pub generators: Vec<GeneratorSpec>,
    pub storages: Vec<StorageSpec>,
}

impl Network {
    pub fn new(horizon: Horizon, load: Vec<f64>) -> Self {
        Self {
            bus: "bus0".to_string(),
            horizon,
            load,
            generators: Vec::new(),
            storages: Vec::new(),
        }
    }

    pub fn with_generator(mut self, generator: GeneratorSpec) -> Self {
        self.generators.push(generator);
        self
    }

    pub fn with_storage(mut self, storage: StorageSpec) -> Self {
        self.storages.push(storage);
        self
    }

    pub fn with_storages(mut self, storages: impl IntoIterator<Item = StorageSpec>) -> Self {
        self.storages.extend(storages);
        self
    }

    pub fn snapshots(&self) -> usize {
        self.horizon.len
    }

    pub fn generator(&self, name: &str) -> Option<&GeneratorSpec> {
        self.generators.iter().find(|g| g.name == name)
    }

    pub fn storage(&self, name: &str) -> Option<&StorageSpec> {
        self.storages.iter().find(|s| s.name == name)
    }

    /// Check every static parameter before a model is built
    pub fn validate(&self) -> Result<()> {
        self.horizon.validate()?;
        let n = self.snapshots();

        if self.load.len() != n {
            return Err(DispatchError::config(format!(
                "load has {} values but the horizon has {n} snapshots",
                self.load.len()
            )));
        }
        if let Some(t) = self.load.iter().position(|l| !l.is_finite() || *l < 0.0) {
            return Err(DispatchError::config(format!(
                "load must be finite and non-negative, got {} at snapshot {t}",
                self.load[t]
            )));
        }
        if self.generators.is_empty() {
            return Err(DispatchError::config("network has no generators"));
        }

        let names = self
            .generators
            .iter()
            .map(|g| g.name.as_str())
            .chain(self.storages.iter().map(|s| s.name.as_str()));
        if let Some(dup) = names.duplicates().next() {
            return Err(DispatchError::config(format!(
                "component name '{dup}' is used more than once"
            )));
        }

        for generator in &self.generators {
            generator.validate(n)?;
        }
        for storage in &self.storages {
            storage.validate()?;
        }
        Ok(())
    }

    /// Names of capacity variables that make the objective unbounded below
    pub fn unbounded_capacities(&self) -> Vec<String> {
        let gens = self
            .generators
            .iter()
            .filter(|g| g.p_nom.is_unbounded_below())
            .map(|g| format!("generator '{}' p_nom", g.name));
        let stores = self
            .storages
            .iter()
            .filter(|s| s.e_nom.is_unbounded_below())
            .map(|s| format!("storage '{}' e_nom", s.name));
        gens.chain(stores).collect()
    }
}
