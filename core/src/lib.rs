//! civsave-core: savegame persistence for a turn-based strategy server.
//!
//! Entry point is `engine::SaveEngine`. Sections live in `*_section.rs`,
//! the world model in `world`, `map`, `player`, `city` and `unit`.

pub mod arena;
pub mod aux_section;
pub mod bitset;
pub mod city;
pub mod city_section;
pub mod codec;
pub mod compat;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod game_section;
pub mod header_section;
pub mod map;
pub mod map_section;
pub mod order_table;
pub mod player;
pub mod player_section;
pub mod random_section;
pub mod rng;
pub mod ruleset;
pub mod sanity;
pub mod scenario_section;
pub mod secfile;
pub mod section;
pub mod types;
pub mod unit;
pub mod unit_section;
pub mod vision_section;
pub mod world;
