//! Ruleset: the current build's name→id lookups.
//!
//! Savegames never store live enumeration values. Every ruleset-defined
//! concept is written by rule name (or identifier character) and resolved
//! back through this table on load.

use crate::bitset::FLAG_CAPACITY;
use crate::map::{BaseId, RoadId};
use crate::types::{
    CityStyleId, GovernmentId, ImprovementId, NationId, ResourceId, SpecialistId, TechId,
    TerrainId, UnitTypeId,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerrainType {
    pub name:       String,
    pub identifier: char,
    #[serde(default)]
    pub ocean:      bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceType {
    pub name:       String,
    pub identifier: char,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseType {
    pub name:        String,
    #[serde(default = "default_true")]
    pub pillageable: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoadType {
    pub name:        String,
    #[serde(default = "default_true")]
    pub pillageable: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Genus {
    GreatWonder,
    SmallWonder,
    Improvement,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImprovementType {
    pub name:     String,
    pub genus:    Genus,
    #[serde(default)]
    pub requires: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitDomain {
    Land,
    Sea,
    Air,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitType {
    pub name:     String,
    pub domain:   UnitDomain,
    pub hp:       i32,
    #[serde(default)]
    pub fuel:     i32,
    /// How many land units this type can carry.
    #[serde(default)]
    pub capacity: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ruleset {
    pub name:         String,
    pub terrains:     Vec<TerrainType>,
    pub resources:    Vec<ResourceType>,
    pub bases:        Vec<BaseType>,
    pub roads:        Vec<RoadType>,
    pub improvements: Vec<ImprovementType>,
    pub techs:        Vec<String>,
    pub unit_types:   Vec<UnitType>,
    pub governments:  Vec<String>,
    pub nations:      Vec<String>,
    pub specialists:  Vec<String>,
    pub city_styles:  Vec<String>,
}

fn default_true() -> bool {
    true
}

fn position_ci<'a>(names: impl Iterator<Item = &'a str>, wanted: &str) -> Option<usize> {
    names.into_iter().position(|n| n.eq_ignore_ascii_case(wanted))
}

impl Ruleset {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let ruleset: Ruleset = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        ruleset.validate().map_err(|e| anyhow::anyhow!("Invalid ruleset {path}: {e}"))?;
        Ok(ruleset)
    }

    /// Base and road sets are stored per tile in a fixed-capacity flag set.
    pub fn validate(&self) -> anyhow::Result<()> {
        for (kind, count) in [("base", self.bases.len()), ("road", self.roads.len())] {
            if count > FLAG_CAPACITY {
                anyhow::bail!("{count} {kind} types, at most {FLAG_CAPACITY} supported");
            }
        }
        Ok(())
    }

    // ── Lookups ──────────────────────────────────────────────────────────────

    pub fn terrain_by_identifier(&self, ch: char) -> Option<TerrainId> {
        self.terrains.iter().position(|t| t.identifier == ch)
    }

    pub fn terrain_identifier(&self, id: TerrainId) -> Option<char> {
        self.terrains.get(id).map(|t| t.identifier)
    }

    pub fn is_ocean(&self, id: TerrainId) -> bool {
        self.terrains.get(id).is_some_and(|t| t.ocean)
    }

    pub fn resource_by_identifier(&self, ch: char) -> Option<ResourceId> {
        self.resources.iter().position(|r| r.identifier == ch)
    }

    pub fn resource_identifier(&self, id: ResourceId) -> Option<char> {
        self.resources.get(id).map(|r| r.identifier)
    }

    pub fn base_by_name(&self, name: &str) -> Option<BaseId> {
        position_ci(self.bases.iter().map(|b| b.name.as_str()), name).map(|i| BaseId(i as u8))
    }

    pub fn road_by_name(&self, name: &str) -> Option<RoadId> {
        position_ci(self.roads.iter().map(|r| r.name.as_str()), name).map(|i| RoadId(i as u8))
    }

    pub fn improvement_by_name(&self, name: &str) -> Option<ImprovementId> {
        position_ci(self.improvements.iter().map(|i| i.name.as_str()), name)
    }

    pub fn tech_by_name(&self, name: &str) -> Option<TechId> {
        position_ci(self.techs.iter().map(String::as_str), name)
    }

    pub fn unit_type_by_name(&self, name: &str) -> Option<UnitTypeId> {
        position_ci(self.unit_types.iter().map(|u| u.name.as_str()), name)
    }

    pub fn government_by_name(&self, name: &str) -> Option<GovernmentId> {
        position_ci(self.governments.iter().map(String::as_str), name)
    }

    pub fn nation_by_name(&self, name: &str) -> Option<NationId> {
        position_ci(self.nations.iter().map(String::as_str), name)
    }

    pub fn specialist_by_name(&self, name: &str) -> Option<SpecialistId> {
        position_ci(self.specialists.iter().map(String::as_str), name)
    }

    pub fn city_style_by_name(&self, name: &str) -> Option<CityStyleId> {
        position_ci(self.city_styles.iter().map(String::as_str), name)
    }

    pub fn improvement_name(&self, id: ImprovementId) -> &str {
        self.improvements.get(id).map_or("", |i| i.name.as_str())
    }

    pub fn tech_name(&self, id: TechId) -> &str {
        self.techs.get(id).map_or("", String::as_str)
    }

    pub fn unit_type_name(&self, id: UnitTypeId) -> &str {
        self.unit_types.get(id).map_or("", |u| u.name.as_str())
    }

    pub fn is_wonder(&self, id: ImprovementId) -> bool {
        self.improvements
            .get(id)
            .is_some_and(|i| i.genus != Genus::Improvement)
    }

    pub fn is_great_wonder(&self, id: ImprovementId) -> bool {
        self.improvements
            .get(id)
            .is_some_and(|i| i.genus == Genus::GreatWonder)
    }

    /// The tech an improvement needs, if any.
    pub fn improvement_requirement(&self, id: ImprovementId) -> Option<TechId> {
        self.improvements
            .get(id)
            .and_then(|i| i.requires.as_deref())
            .and_then(|name| self.tech_by_name(name))
    }

    // ── Built-in ruleset ─────────────────────────────────────────────────────

    /// The classic ruleset. Used by tests and as the tool's default.
    pub fn classic() -> Self {
        let terrain = |name: &str, identifier: char, ocean: bool| TerrainType {
            name: name.to_string(),
            identifier,
            ocean,
        };
        let resource = |name: &str, identifier: char| ResourceType {
            name: name.to_string(),
            identifier,
        };
        let building = |name: &str, genus: Genus, requires: Option<&str>| ImprovementType {
            name: name.to_string(),
            genus,
            requires: requires.map(str::to_string),
        };
        let unit = |name: &str, domain: UnitDomain, hp: i32, fuel: i32, capacity: i32| UnitType {
            name: name.to_string(),
            domain,
            hp,
            fuel,
            capacity,
        };
        let names = |list: &[&str]| list.iter().map(|s| s.to_string()).collect::<Vec<_>>();

        Self {
            name: "classic".to_string(),
            terrains: vec![
                terrain("Inaccessible", 'i', false),
                terrain("Lake", '+', true),
                terrain("Ocean", ' ', true),
                terrain("Deep Ocean", ':', true),
                terrain("Glacier", 'a', false),
                terrain("Desert", 'd', false),
                terrain("Forest", 'f', false),
                terrain("Grassland", 'g', false),
                terrain("Hills", 'h', false),
                terrain("Jungle", 'j', false),
                terrain("Mountains", 'm', false),
                terrain("Plains", 'p', false),
                terrain("Swamp", 's', false),
                terrain("Tundra", 't', false),
            ],
            resources: vec![
                resource("Fish", 'y'),
                resource("Wheat", 'w'),
                resource("Gold", 'g'),
                resource("Oil", 'o'),
                resource("Game", 'a'),
                resource("Gems", 'e'),
                resource("Coal", 'c'),
                resource("Spice", 's'),
            ],
            bases: vec![
                BaseType { name: "Fortress".to_string(), pillageable: true },
                BaseType { name: "Airbase".to_string(), pillageable: true },
                BaseType { name: "Buoy".to_string(), pillageable: false },
            ],
            roads: vec![
                RoadType { name: "Road".to_string(), pillageable: true },
                RoadType { name: "Railroad".to_string(), pillageable: true },
            ],
            improvements: vec![
                building("Airport", Genus::Improvement, Some("Construction")),
                building("Aqueduct", Genus::Improvement, Some("Construction")),
                building("Barracks", Genus::Improvement, None),
                building("City Walls", Genus::Improvement, Some("Masonry")),
                building("Granary", Genus::Improvement, Some("Pottery")),
                building("Library", Genus::Improvement, Some("Writing")),
                building("Marketplace", Genus::Improvement, Some("Currency")),
                building("Temple", Genus::Improvement, Some("Ceremonial Burial")),
                building("Colossus", Genus::GreatWonder, Some("Bronze Working")),
                building("Great Library", Genus::GreatWonder, Some("Literacy")),
                building("Pyramids", Genus::GreatWonder, Some("Bronze Working")),
                building("Palace", Genus::SmallWonder, Some("Masonry")),
            ],
            techs: names(&[
                "Alphabet",
                "Bronze Working",
                "Ceremonial Burial",
                "Construction",
                "Currency",
                "Literacy",
                "Masonry",
                "Mathematics",
                "Monarchy",
                "Philosophy",
                "Pottery",
                "Writing",
            ]),
            unit_types: vec![
                unit("Settlers", UnitDomain::Land, 20, 0, 0),
                unit("Workers", UnitDomain::Land, 10, 0, 0),
                unit("Warriors", UnitDomain::Land, 10, 0, 0),
                unit("Phalanx", UnitDomain::Land, 10, 0, 0),
                unit("Trireme", UnitDomain::Sea, 10, 0, 2),
                unit("Caravel", UnitDomain::Sea, 10, 0, 3),
                unit("Fighter", UnitDomain::Air, 20, 1, 0),
            ],
            governments: names(&[
                "Anarchy",
                "Despotism",
                "Monarchy",
                "Communism",
                "Republic",
                "Democracy",
            ]),
            nations: names(&["Romans", "Greeks", "Babylonians", "Egyptians", "Barbarian"]),
            specialists: names(&["elvis", "scientist", "taxman"]),
            city_styles: names(&["European", "Classical", "Tropical", "Asian"]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classic_ruleset_is_valid() {
        assert!(Ruleset::classic().validate().is_ok());
    }

    #[test]
    fn too_many_road_types_are_rejected() {
        let mut ruleset = Ruleset::classic();
        while ruleset.roads.len() <= FLAG_CAPACITY {
            let name = format!("Road {}", ruleset.roads.len());
            ruleset.roads.push(RoadType { name, pillageable: true });
        }
        let err = ruleset.validate().expect_err("65 road types must be rejected");
        assert!(err.to_string().contains("road types"), "Unexpected error: {err}");
    }
}
