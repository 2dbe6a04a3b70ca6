use crate::arena::Identified;
use crate::types::{CityId, ImprovementId, PlayerNo, TileIndex, Turn, UnitId, UnitTypeId};
use std::collections::{BTreeMap, BTreeSet};

/// What a city is producing, or a worklist entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Production {
    Improvement(ImprovementId),
    Unit(UnitTypeId),
}

impl Production {
    /// Kind label as written in `*_kind` keys.
    pub fn kind_name(self) -> &'static str {
        match self {
            Self::Improvement(_) => "Building",
            Self::Unit(_) => "UnitType",
        }
    }
}

impl Default for Production {
    fn default() -> Self {
        Self::Improvement(0)
    }
}

pub const DEFAULT_CITY_RADIUS_SQ: i32 = 5;
pub const MAX_CITY_SIZE: i32 = 100;
pub const MAX_LEN_WORKLIST: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub struct City {
    pub id:                        CityId,
    pub owner:                     PlayerNo,
    pub original:                  PlayerNo,
    pub tile:                      TileIndex,
    pub name:                      String,
    pub size:                      i32,
    /// Count per ruleset specialist.
    pub specialists:               Vec<i32>,
    pub food_stock:                i32,
    pub shield_stock:              i32,
    pub airlift:                   i32,
    pub was_happy:                 bool,
    pub anarchy:                   i32,
    pub rapture:                   i32,
    pub steal:                     i32,
    pub turn_founded:              Turn,
    pub did_buy:                   bool,
    pub did_sell:                  bool,
    pub turn_last_built:           Turn,
    pub production:                Production,
    pub changed_from:              Production,
    pub before_change_shields:     i32,
    pub caravan_shields:           i32,
    pub disbanded_shields:         i32,
    pub last_turns_shield_surplus: i32,
    pub improvements:              BTreeSet<ImprovementId>,
    pub city_radius_sq:            i32,
    pub worklist:                  Vec<Production>,
    pub trade_routes:              Vec<CityId>,
    /// Citizens by nationality.
    pub citizens:                  BTreeMap<PlayerNo, i32>,
    /// Worked tiles, rebuilt from the map on load.
    pub worked:                    Vec<TileIndex>,
    /// Units with this city as home, in upkeep order.
    pub units_supported:           Vec<UnitId>,
    /// Improvements the city could start now. Never saved.
    pub can_build:                 Vec<ImprovementId>,
}

impl Identified for City {
    fn id(&self) -> CityId {
        self.id
    }
}

impl City {
    pub fn new(id: CityId, owner: PlayerNo, tile: TileIndex, name: &str, size: i32) -> Self {
        Self {
            id,
            owner,
            original: owner,
            tile,
            name: name.to_string(),
            size,
            specialists: Vec::new(),
            food_stock: 0,
            shield_stock: 0,
            airlift: 0,
            was_happy: false,
            anarchy: 0,
            rapture: 0,
            steal: 0,
            turn_founded: 0,
            did_buy: false,
            did_sell: false,
            turn_last_built: 0,
            production: Production::default(),
            changed_from: Production::default(),
            before_change_shields: 0,
            caravan_shields: 0,
            disbanded_shields: 0,
            last_turns_shield_surplus: 0,
            improvements: BTreeSet::new(),
            city_radius_sq: DEFAULT_CITY_RADIUS_SQ,
            worklist: Vec::new(),
            trade_routes: Vec::new(),
            citizens: BTreeMap::new(),
            worked: vec![tile],
            units_supported: Vec::new(),
            can_build: Vec::new(),
        }
    }

    pub fn specialist_total(&self) -> i32 {
        self.specialists.iter().fold(0i32, |acc, &n| acc.saturating_add(n))
    }
}
