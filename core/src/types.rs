//! Shared primitive types used across the persistence engine.

/// A game turn. Negative values are legacy markers (see city loading).
pub type Turn = i32;

/// Calendar year as shown to players.
pub type Year = i32;

/// Player slot number, also the `N` in `player<N>.*` keys.
pub type PlayerNo = usize;

/// Stable identity number shared by cities and units.
pub type IdentityNo = u32;

pub type CityId = IdentityNo;
pub type UnitId = IdentityNo;

/// Index of a tile in native row-major order: `y * xsize + x`.
pub type TileIndex = usize;

pub type TerrainId = usize;
pub type ResourceId = usize;
pub type ImprovementId = usize;
pub type TechId = usize;
pub type UnitTypeId = usize;
pub type GovernmentId = usize;
pub type NationId = usize;
pub type SpecialistId = usize;
pub type CityStyleId = usize;

/// Identity number 0 is never handed out.
pub const IDENTITY_NUMBER_ZERO: IdentityNo = 0;

/// Upper bound on player slots; known-tile masks pack 32 per hex line.
pub const MAX_NUM_PLAYER_SLOTS: usize = 64;

/// Cities always work their centre tile for free.
pub const FREE_WORKED_TILES: i32 = 1;
