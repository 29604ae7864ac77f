//! Scripted scenarios replayed against a running simulation.

use serde::{Deserialize, Serialize};

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioId {
    /// A healthy phone 10px from an infected one is infected by one scan
    Proximity,

    /// An infected phone at the repair threshold claims a free shop in one step
    RepairRush,

    /// A second phone waits, still infected, while the shop is held
    RepairContention,

    /// A phone dies on its way to the shop; it is reaped and the shop freed
    DeathInRepair,

    /// Pause freezes every phone, resume restores progress
    PauseFreeze,

    /// Shutdown during a repair releases the shop without aborting anything
    StopMidRepair,

    /// Free-running outbreak with invariant checks
    Outbreak,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::Proximity,
            ScenarioId::RepairRush,
            ScenarioId::RepairContention,
            ScenarioId::DeathInRepair,
            ScenarioId::PauseFreeze,
            ScenarioId::StopMidRepair,
            ScenarioId::Outbreak,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::Proximity => "proximity",
            ScenarioId::RepairRush => "repair_rush",
            ScenarioId::RepairContention => "repair_contention",
            ScenarioId::DeathInRepair => "death_in_repair",
            ScenarioId::PauseFreeze => "pause_freeze",
            ScenarioId::StopMidRepair => "stop_mid_repair",
            ScenarioId::Outbreak => "outbreak",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::Proximity => "infected and healthy phone 10px apart, radius 25, one scan",
            ScenarioId::RepairRush => "infected phone at health 301 with a free shop",
            ScenarioId::RepairContention => "two infected phones, one repair shop held far away",
            ScenarioId::DeathInRepair => "phone runs out of health on the way to a distant shop",
            ScenarioId::PauseFreeze => "population paused mid-run, then resumed",
            ScenarioId::StopMidRepair => "shutdown while a phone sits in the repair shop",
            ScenarioId::Outbreak => "free-running population with one initial infection",
        }
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "proximity" => Ok(ScenarioId::Proximity),
            "repair_rush" | "repairrush" => Ok(ScenarioId::RepairRush),
            "repair_contention" | "repaircontention" => Ok(ScenarioId::RepairContention),
            "death_in_repair" | "deathinrepair" => Ok(ScenarioId::DeathInRepair),
            "pause_freeze" | "pausefreeze" => Ok(ScenarioId::PauseFreeze),
            "stop_mid_repair" | "stopmidrepair" => Ok(ScenarioId::StopMidRepair),
            "outbreak" => Ok(ScenarioId::Outbreak),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}
