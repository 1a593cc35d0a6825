use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::domain::Carrier;

/// Study variants. Every variant shares the site load and grid connection.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ScenarioKind {
    /// Grid only, the baseline every other study is compared against
    NoStorage,
    /// Fixed battery fleet
    StorageOnly,
    StorageSolar,
    /// Single turbine driven by measured wind speed
    StorageWind,
    /// Metered output of a wind park
    StorageWindPark,
    StorageRain,
    StorageSolarWind,
    /// One battery sized by the optimizer
    StorageExtendable,
}

impl ScenarioKind {
    pub fn is_baseline(&self) -> bool {
        matches!(self, ScenarioKind::NoStorage)
    }

    pub fn has_fleet(&self) -> bool {
        !matches!(self, ScenarioKind::NoStorage | ScenarioKind::StorageExtendable)
    }

    /// Weather-driven carriers attached in this study
    pub fn renewables(&self) -> &'static [Carrier] {
        match self {
            ScenarioKind::StorageSolar => &[Carrier::Solar],
            ScenarioKind::StorageWind | ScenarioKind::StorageWindPark => &[Carrier::Wind],
            ScenarioKind::StorageRain => &[Carrier::Rain],
            ScenarioKind::StorageSolarWind => &[Carrier::Solar, Carrier::Wind],
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_parse_round_trip() {
        for kind in ScenarioKind::iter() {
            assert_eq!(kind.to_string().parse::<ScenarioKind>().unwrap(), kind);
        }
        assert_eq!("storage_wind_park".parse::<ScenarioKind>().unwrap(), ScenarioKind::StorageWindPark);
    }

    #[test]
    fn test_only_baseline_has_no_storage() {
        assert_eq!(ScenarioKind::iter().filter(|k| k.is_baseline()).count(), 1);
        assert!(!ScenarioKind::StorageExtendable.has_fleet());
        assert_eq!(ScenarioKind::StorageSolarWind.renewables().len(), 2);
    }
}
