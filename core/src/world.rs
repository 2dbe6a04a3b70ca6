//! The live world: everything a savegame captures.
//!
//! Arena-and-index layout. Tiles are a `Vec` on the map, players a `Vec`
//! indexed by player number, cities and units `Arena`s keyed by identity
//! number. Cross references are ids, validated by the loaders.

use crate::arena::Arena;
use crate::city::City;
use crate::map::Map;
use crate::player::Player;
use crate::rng::GameRng;
use crate::types::{IdentityNo, ImprovementId, PlayerNo, TileIndex, Turn, UnitId, Year};
use crate::unit::Unit;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ServerState {
    #[default]
    Initial,
    Running,
    Over,
}

impl ServerState {
    pub fn name(self) -> &'static str {
        match self {
            Self::Initial => "S_S_INITIAL",
            Self::Running => "S_S_RUNNING",
            Self::Over => "S_S_OVER",
        }
    }

    pub fn by_name(name: &str) -> Option<Self> {
        [Self::Initial, Self::Running, Self::Over]
            .into_iter()
            .find(|s| s.name().eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeoutSettings {
    pub timeoutint:     i32,
    pub timeoutintinc:  i32,
    pub timeoutinc:     i32,
    pub timeoutincmult: i32,
    pub timeoutcounter: i32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Climate {
    pub globalwarming: i32,
    pub heating:       i32,
    pub warminglevel:  i32,
    pub nuclearwinter: i32,
    pub cooling:       i32,
    pub coolinglevel:  i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GameInfo {
    /// Base64url game identifier.
    pub id:             String,
    pub server_state:   ServerState,
    pub turn:           Turn,
    pub year:           Year,
    pub year_0_hack:    bool,
    pub skill_level:    i32,
    pub phase_mode:     i32,
    pub scoreturn:      Turn,
    pub timeout:        TimeoutSettings,
    pub climate:        Climate,
    pub is_new_game:    bool,
    /// Value of `game.version` in the loaded file.
    pub version:        i64,
    pub rulesetdir:     String,
    pub foggedborders:  bool,
    pub fogofwar:       bool,
}

impl Default for GameInfo {
    fn default() -> Self {
        Self {
            id:            String::new(),
            server_state:  ServerState::Initial,
            turn:          0,
            year:          -4000,
            year_0_hack:   false,
            skill_level:   3,
            phase_mode:    0,
            scoreturn:     20,
            timeout:       TimeoutSettings::default(),
            climate:       Climate::default(),
            is_new_game:   true,
            version:       0,
            rulesetdir:    "classic".to_string(),
            foggedborders: false,
            fogofwar:      true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScenarioInfo {
    pub is_scenario:      bool,
    pub name:             String,
    pub description:      String,
    pub save_players:     bool,
    pub startpos_nations: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CachedEvent {
    pub turn:    Turn,
    pub kind:    String,
    pub message: String,
    /// `None` targets every player.
    pub target:  Option<PlayerNo>,
}

#[derive(Debug, Clone, Default)]
pub struct World {
    pub info:                 GameInfo,
    pub map:                  Map,
    pub players:              Vec<Player>,
    pub cities:               Arena<City>,
    pub units:                Arena<Unit>,
    pub rng:                  GameRng,
    pub scenario:             ScenarioInfo,
    /// Server settings as name/value pairs, in save order.
    pub settings:             Vec<(String, String)>,
    /// Opaque script engine state.
    pub script_state:         String,
    pub event_cache:          Vec<CachedEvent>,
    pub mapimg_defs:          Vec<String>,
    pub shuffled_order:       Vec<PlayerNo>,
    pub destroyed_wonders:    BTreeSet<ImprovementId>,
    pub identity_number_used: IdentityNo,
    reserved_ids:             BTreeSet<IdentityNo>,
}

impl World {
    pub fn new(xsize: usize, ysize: usize) -> Self {
        Self { map: Map::new(xsize, ysize), ..Self::default() }
    }

    pub fn game_was_started(&self) -> bool {
        self.info.server_state != ServerState::Initial
    }

    pub fn player(&self, number: PlayerNo) -> Option<&Player> {
        self.players.get(number)
    }

    pub fn player_mut(&mut self, number: PlayerNo) -> Option<&mut Player> {
        self.players.get_mut(number)
    }

    pub fn pplayers_allied(&self, a: PlayerNo, b: PlayerNo) -> bool {
        a == b || self.player(a).is_some_and(|p| p.diplstate(b).is_allied())
    }

    pub fn pplayers_at_war(&self, a: PlayerNo, b: PlayerNo) -> bool {
        a != b && self.player(a).is_some_and(|p| p.diplstate(b).is_war())
    }

    // ── Identity numbers ─────────────────────────────────────────────────────

    /// Mark an id as used. Returns false if it was taken already.
    pub fn reserve_identity(&mut self, id: IdentityNo) -> bool {
        if id > self.identity_number_used {
            self.identity_number_used = id;
        }
        self.reserved_ids.insert(id)
    }

    pub fn identity_reserved(&self, id: IdentityNo) -> bool {
        self.reserved_ids.contains(&id)
    }

    pub fn next_identity(&mut self) -> IdentityNo {
        let mut id = self.identity_number_used + 1;
        while self.reserved_ids.contains(&id) {
            id += 1;
        }
        self.reserve_identity(id);
        id
    }

    // ── Mutation APIs used by the loaders ────────────────────────────────────

    /// Put a city on its tile. Fails if the tile already holds one.
    pub fn create_city(&mut self, city: City) -> Result<(), City> {
        let tile = city.tile;
        if tile >= self.map.tile_count() || self.map.tile(tile).city.is_some() {
            return Err(city);
        }
        let id = city.id;
        self.cities.insert(city)?;
        self.reserve_identity(id);
        let t = self.map.tile_mut(tile);
        t.city = Some(id);
        let previous = t.worked.replace(id);
        if let Some(other) = previous.filter(|&other| other != id) {
            log::warn!("City {id}: centre tile {tile} was worked by city {other}, released");
            if let Some(other) = self.cities.get_mut(other) {
                other.worked.retain(|&w| w != tile);
                match other.specialists.first_mut() {
                    Some(default) => *default += 1,
                    None => other.specialists.push(1),
                }
            }
        }
        Ok(())
    }

    /// Add a unit on top of its tile's stack.
    pub fn place_unit(&mut self, unit: Unit) -> Result<(), Unit> {
        let tile = unit.tile;
        if tile >= self.map.tile_count() {
            return Err(unit);
        }
        let id = unit.id;
        let homecity = unit.homecity;
        self.units.insert(unit)?;
        self.reserve_identity(id);
        self.map.tile_mut(tile).units.push(id);
        if let Some(city) = homecity.and_then(|c| self.cities.get_mut(c)) {
            city.units_supported.push(id);
        }
        Ok(())
    }

    pub fn remove_unit(&mut self, id: UnitId) -> Option<Unit> {
        let unit = self.units.remove(id)?;
        self.map.tile_mut(unit.tile).units.retain(|&u| u != id);
        if let Some(city) = unit.homecity.and_then(|c| self.cities.get_mut(c)) {
            city.units_supported.retain(|&u| u != id);
        }
        for other in self.units.iter_mut() {
            if other.transported_by == Some(id) {
                other.transported_by = None;
            }
        }
        Some(unit)
    }

    pub fn move_unit(&mut self, id: UnitId, to: TileIndex) {
        let Some(from) = self.units.get(id).map(|u| u.tile) else { return };
        self.map.tile_mut(from).units.retain(|&u| u != id);
        self.map.tile_mut(to).units.push(id);
        if let Some(unit) = self.units.get_mut(id) {
            unit.tile = to;
        }
    }
}
