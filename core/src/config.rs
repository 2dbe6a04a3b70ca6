//! Save-time server settings that shape the written file.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveConfig {
    /// Write the generator table so a reload continues the same sequence.
    pub save_random:           bool,
    /// Write the per-tile known masks.
    pub save_known:            bool,
    /// Write each player's private map.
    pub save_private_map:      bool,
    pub fogofwar:              bool,
    /// Player maps remember tile owners as last seen.
    pub foggedborders:         bool,
    /// Write a scenario instead of a running game.
    pub scenario:              bool,
    /// Scenario saves include player data.
    pub scenario_save_players: bool,
    /// Scenario saves carry rivers only, no other specials or resources.
    pub rivers_overlay:        bool,
}

impl Default for SaveConfig {
    fn default() -> Self {
        Self {
            save_random:           true,
            save_known:            true,
            save_private_map:      true,
            fogofwar:              true,
            foggedborders:         false,
            scenario:              false,
            scenario_save_players: true,
            rivers_overlay:        false,
        }
    }
}

impl SaveConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: SaveConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// A scenario skeleton: no players, no private maps.
    pub fn scenario_without_players() -> Self {
        Self {
            scenario: true,
            scenario_save_players: false,
            save_private_map: false,
            ..Self::default()
        }
    }
}
