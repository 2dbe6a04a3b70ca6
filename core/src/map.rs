//! Map model: tiles, per-tile attribute sets, start positions.
//!
//! Tiles live in one `Vec` in native row-major order. Cities, units and
//! players are referenced by id only.

use crate::bitset::{FlagIndex, FlagSet};
use crate::types::{
    CityId, IdentityNo, ImprovementId, NationId, PlayerNo, ResourceId, TerrainId, TileIndex, Turn,
    UnitId,
};
use std::collections::BTreeSet;

// ── Attribute enumerations ───────────────────────────────────────────────────

/// Tile specials known to this build. Order here is the live order; the
/// savegame maps its own order onto it by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TileSpecial {
    Hut,
    River,
    Irrigation,
    Mine,
    Pollution,
    Fallout,
    Farmland,
}

impl TileSpecial {
    pub const ALL: [TileSpecial; 7] = [
        Self::Hut,
        Self::River,
        Self::Irrigation,
        Self::Mine,
        Self::Pollution,
        Self::Fallout,
        Self::Farmland,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Hut => "Hut",
            Self::River => "River",
            Self::Irrigation => "Irrigation",
            Self::Mine => "Mine",
            Self::Pollution => "Pollution",
            Self::Fallout => "Fallout",
            Self::Farmland => "Farmland",
        }
    }

    pub fn by_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.name().eq_ignore_ascii_case(name))
    }

    pub fn is_pillageable(self) -> bool {
        matches!(self, Self::Irrigation | Self::Mine | Self::Farmland)
    }
}

impl FlagIndex for TileSpecial {
    fn index(self) -> usize {
        self as usize
    }

    fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

/// Index of a base type in the live ruleset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BaseId(pub u8);

/// Index of a road type in the live ruleset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoadId(pub u8);

impl FlagIndex for BaseId {
    fn index(self) -> usize {
        self.0 as usize
    }

    fn from_index(index: usize) -> Option<Self> {
        u8::try_from(index).ok().map(BaseId)
    }
}

impl FlagIndex for RoadId {
    fn index(self) -> usize {
        self.0 as usize
    }

    fn from_index(index: usize) -> Option<Self> {
        u8::try_from(index).ok().map(RoadId)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    NorthWest,
    North,
    NorthEast,
    West,
    East,
    SouthWest,
    South,
    SouthEast,
}

impl Direction {
    pub const ALL: [Direction; 8] = [
        Self::NorthWest,
        Self::North,
        Self::NorthEast,
        Self::West,
        Self::East,
        Self::SouthWest,
        Self::South,
        Self::SouthEast,
    ];

    pub fn delta(self) -> (i64, i64) {
        match self {
            Self::NorthWest => (-1, -1),
            Self::North => (0, -1),
            Self::NorthEast => (1, -1),
            Self::West => (-1, 0),
            Self::East => (1, 0),
            Self::SouthWest => (-1, 1),
            Self::South => (0, 1),
            Self::SouthEast => (1, 1),
        }
    }
}

// ── Tiles ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tile {
    pub terrain:  Option<TerrainId>,
    pub resource: Option<ResourceId>,
    pub specials: FlagSet<TileSpecial>,
    pub bases:    FlagSet<BaseId>,
    pub roads:    FlagSet<RoadId>,
    pub owner:    Option<PlayerNo>,
    /// Tile whose border source claimed this one.
    pub claimer:  Option<TileIndex>,
    pub worked:   Option<CityId>,
    pub city:     Option<CityId>,
    /// Unit stack, bottom first.
    pub units:    Vec<UnitId>,
    /// Player numbers that know this tile.
    pub known:    FlagSet<usize>,
}

/// What a player remembers about a tile.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerTile {
    pub terrain:      Option<TerrainId>,
    pub resource:     Option<ResourceId>,
    pub specials:     FlagSet<TileSpecial>,
    pub bases:        FlagSet<BaseId>,
    pub roads:        FlagSet<RoadId>,
    pub owner:        Option<PlayerNo>,
    pub last_updated: u16,
}

/// A foreign city as last seen by a player.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VisionSite {
    pub id:           IdentityNo,
    pub owner:        PlayerNo,
    pub size:         i32,
    pub occupied:     bool,
    pub walls:        bool,
    pub happy:        bool,
    pub unhappy:      bool,
    pub improvements: BTreeSet<ImprovementId>,
    pub name:         String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StartPos {
    pub tile:    TileIndex,
    /// When true, `nations` lists who may NOT start here.
    pub exclude: bool,
    pub nations: Vec<NationId>,
}

// ── Map ──────────────────────────────────────────────────────────────────────

pub const MAP_MAX_WIDTH: usize = 200;
pub const MAP_MAX_HEIGHT: usize = 100;

#[derive(Debug, Clone, Default)]
pub struct Map {
    pub xsize:     usize,
    pub ysize:     usize,
    pub tiles:     Vec<Tile>,
    pub startpos:  Vec<StartPos>,
    pub have_huts: bool,
}

impl Map {
    pub fn new(xsize: usize, ysize: usize) -> Self {
        Self {
            xsize,
            ysize,
            tiles: vec![Tile::default(); xsize * ysize],
            startpos: Vec::new(),
            have_huts: false,
        }
    }

    /// Tile count for a loadable map size, None when either side is zero
    /// or past the map limits.
    pub fn checked_tile_count(xsize: usize, ysize: usize) -> Option<usize> {
        if xsize == 0 || ysize == 0 || xsize > MAP_MAX_WIDTH || ysize > MAP_MAX_HEIGHT {
            return None;
        }
        xsize.checked_mul(ysize)
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_allocated(&self) -> bool {
        !self.tiles.is_empty()
    }

    /// Native position to index. None when off the map.
    pub fn index(&self, x: i64, y: i64) -> Option<TileIndex> {
        if x < 0 || y < 0 || x >= self.xsize as i64 || y >= self.ysize as i64 {
            return None;
        }
        Some(y as usize * self.xsize + x as usize)
    }

    pub fn native_pos(&self, index: TileIndex) -> (usize, usize) {
        (index % self.xsize.max(1), index / self.xsize.max(1))
    }

    pub fn tile(&self, index: TileIndex) -> &Tile {
        &self.tiles[index]
    }

    pub fn tile_mut(&mut self, index: TileIndex) -> &mut Tile {
        &mut self.tiles[index]
    }

    pub fn step(&self, from: TileIndex, dir: Direction) -> Option<TileIndex> {
        let (x, y) = self.native_pos(from);
        let (dx, dy) = dir.delta();
        self.index(x as i64 + dx, y as i64 + dy)
    }

    /// Adjacent tiles in direction order.
    pub fn adjacent(&self, from: TileIndex) -> Vec<TileIndex> {
        Direction::ALL.iter().filter_map(|&d| self.step(from, d)).collect()
    }

    pub fn sq_distance(&self, a: TileIndex, b: TileIndex) -> i64 {
        let (ax, ay) = self.native_pos(a);
        let (bx, by) = self.native_pos(b);
        let dx = ax as i64 - bx as i64;
        let dy = ay as i64 - by as i64;
        dx * dx + dy * dy
    }

    /// Tiles within `radius_sq` of `center`, centre first.
    pub fn tiles_in_radius(&self, center: TileIndex, radius_sq: i64) -> Vec<TileIndex> {
        let mut out = vec![center];
        out.extend(
            (0..self.tile_count()).filter(|&t| t != center && self.sq_distance(center, t) <= radius_sq),
        );
        out
    }

    pub fn claim_ownership(
        &mut self,
        tile: TileIndex,
        owner: Option<PlayerNo>,
        source: Option<TileIndex>,
    ) {
        let t = &mut self.tiles[tile];
        t.owner = owner;
        t.claimer = source;
    }
}

/// Per-player last-updated turns are stored in 16 bits.
pub fn clamp_turn_u16(turn: Turn) -> u16 {
    turn.clamp(0, u16::MAX as Turn) as u16
}
