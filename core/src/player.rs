//! Player model: identity, economy, diplomacy, research, spaceship.

use crate::bitset::FlagSet;
use crate::map::{PlayerTile, VisionSite};
use crate::types::{
    CityStyleId, GovernmentId, ImprovementId, NationId, PlayerNo, TechId, TileIndex, Turn, Year,
};
use std::collections::{BTreeMap, BTreeSet};

/// Diplomatic state between two players. Values are the saved integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiplState {
    Armistice = 0,
    War = 1,
    Ceasefire = 2,
    Peace = 3,
    Alliance = 4,
    NoContact = 5,
    Team = 6,
}

impl DiplState {
    pub fn from_int(v: i64) -> Option<Self> {
        Some(match v {
            0 => Self::Armistice,
            1 => Self::War,
            2 => Self::Ceasefire,
            3 => Self::Peace,
            4 => Self::Alliance,
            5 => Self::NoContact,
            6 => Self::Team,
            _ => return None,
        })
    }

    pub fn is_allied(self) -> bool {
        matches!(self, Self::Alliance | Self::Team)
    }

    pub fn is_war(self) -> bool {
        matches!(self, Self::War)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Diplstate {
    pub kind:                 DiplState,
    pub max_state:            DiplState,
    pub first_contact_turn:   Turn,
    pub turns_left:           i32,
    pub has_reason_to_cancel: i32,
    pub contact_turns_left:   i32,
}

impl Default for Diplstate {
    fn default() -> Self {
        Self {
            kind:                 DiplState::War,
            max_state:            DiplState::War,
            first_contact_turn:   0,
            turns_left:           -2,
            has_reason_to_cancel: 0,
            contact_turns_left:   0,
        }
    }
}

/// A research target as written in `research.*_name`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TechRef {
    /// Empty name in the file.
    #[default]
    Unknown,
    None,
    Unset,
    Future,
    Tech(TechId),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Research {
    pub goal:              TechRef,
    pub researching:       TechRef,
    pub researching_saved: TechRef,
    pub bulbs_researched:  i32,
    pub bulbs_before:      i32,
    pub bulbs_last_turn:   i32,
    pub techs_researched:  i32,
    pub future_tech:       i32,
    pub got_tech:          bool,
    pub known:             BTreeSet<TechId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpaceshipState {
    #[default]
    None = 0,
    Started = 1,
    Launched = 2,
    Arrived = 3,
}

impl SpaceshipState {
    pub fn from_int(v: i64) -> Option<Self> {
        Some(match v {
            0 => Self::None,
            1 => Self::Started,
            2 => Self::Launched,
            3 => Self::Arrived,
            _ => return None,
        })
    }
}

pub const NUM_SS_STRUCTURALS: usize = 32;

#[derive(Debug, Clone, PartialEq)]
pub struct Spaceship {
    pub state:        SpaceshipState,
    pub structurals:  i32,
    pub components:   i32,
    pub modules:      i32,
    pub fuel:         i32,
    pub propulsion:   i32,
    pub habitation:   i32,
    pub life_support: i32,
    pub solar_panels: i32,
    pub structure:    [bool; NUM_SS_STRUCTURALS],
    pub launch_year:  Year,
}

impl Default for Spaceship {
    fn default() -> Self {
        Self {
            state:        SpaceshipState::None,
            structurals:  0,
            components:   0,
            modules:      0,
            fuel:         0,
            propulsion:   0,
            habitation:   0,
            life_support: 0,
            solar_panels: 0,
            structure:    [false; NUM_SS_STRUCTURALS],
            launch_year:  0,
        }
    }
}

/// Derived on load, never read from the file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Score {
    pub techs:    i32,
    pub wonders:  i32,
    pub cities:   i32,
    pub citizens: i32,
    pub units:    i32,
    pub total:    i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub number:              PlayerNo,
    pub name:                String,
    pub username:            String,
    pub ai_type:             String,
    pub team_no:             i32,
    pub nation:              Option<NationId>,
    pub government:          GovernmentId,
    pub target_government:   Option<GovernmentId>,
    pub revolution_finishes: Turn,
    pub capital:             bool,
    pub ai_controlled:       bool,
    pub skill_level:         i32,
    pub barbarian_type:      i32,
    pub city_style:          CityStyleId,
    pub is_male:             bool,
    pub is_alive:            bool,
    pub gold:                i32,
    pub tax:                 i32,
    pub science:             i32,
    pub luxury:              i32,
    /// Indexed by the other player's number.
    pub diplstates:          Vec<Diplstate>,
    pub love:                Vec<i32>,
    pub embassy:             FlagSet<usize>,
    pub gives_shared_vision: FlagSet<usize>,
    pub research:            Research,
    pub spaceship:           Spaceship,
    pub lost_wonders:        BTreeSet<ImprovementId>,
    pub units_built:         i32,
    pub units_killed:        i32,
    pub units_lost:          i32,
    pub score:               Score,
    /// Opaque client data, saved quoted.
    pub attribute_block:     Vec<u8>,
    /// Empty when the player has no private map.
    pub private_map:         Vec<PlayerTile>,
    pub vision_sites:        BTreeMap<TileIndex, VisionSite>,
}

impl Player {
    pub fn new(number: PlayerNo, name: &str) -> Self {
        Self {
            number,
            name: name.to_string(),
            username: String::new(),
            ai_type: "classic".to_string(),
            team_no: number as i32,
            nation: None,
            government: 0,
            target_government: None,
            revolution_finishes: -1,
            capital: false,
            ai_controlled: false,
            skill_level: 0,
            barbarian_type: 0,
            city_style: 0,
            is_male: true,
            is_alive: true,
            gold: 50,
            tax: 30,
            science: 60,
            luxury: 10,
            diplstates: Vec::new(),
            love: Vec::new(),
            embassy: FlagSet::new(),
            gives_shared_vision: FlagSet::new(),
            research: Research::default(),
            spaceship: Spaceship::default(),
            lost_wonders: BTreeSet::new(),
            units_built: 0,
            units_killed: 0,
            units_lost: 0,
            score: Score::default(),
            attribute_block: Vec::new(),
            private_map: Vec::new(),
            vision_sites: BTreeMap::new(),
        }
    }

    pub fn diplstate(&self, other: PlayerNo) -> DiplState {
        if other == self.number {
            return DiplState::Team;
        }
        self.diplstates.get(other).map_or(DiplState::NoContact, |d| d.kind)
    }
}
