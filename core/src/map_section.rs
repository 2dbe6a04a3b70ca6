//! `map.*`: terrain, resources, attribute grids, borders, worked tiles,
//! known masks and start positions.
//!
//! LOAD RULES:
//!   - Pre-game files of an ordinary game carry no usable map; skipped.
//!   - Pre-game scenarios load terrain, start positions, bases and roads,
//!     then specials and resources (`specials` capability) or rivers only
//!     (`riversoverlay` capability).
//!   - A terrain character the ruleset does not know is a ruleset
//!     mismatch and aborts the load outright.

use crate::bitset::FlagSet;
use crate::codec::attrs::{grid_prefix, load_attr_grid, save_attr_grid};
use crate::codec::hex::{decode_halfbyte, encode_halfbyte};
use crate::codec::row::{
    load_char_rows, load_token_rows, row_path, save_char_rows, save_token_rows, MapDims,
};
use crate::context::{LoadContext, SaveContext};
use crate::error::{SaveError, SaveResult};
use crate::map::{StartPos, TileSpecial};
use crate::ruleset::Ruleset;
use crate::section::SaveSection;
use crate::types::{CityId, ResourceId, TerrainId};
use crate::world::{ServerState, World};

/// Written for tiles whose terrain is not known.
pub const UNKNOWN_TERRAIN: char = 'u';

/// Written for tiles without a resource.
pub const NO_RESOURCE: char = ' ';

pub const CAP_SPECIALS: &str = "specials";
pub const CAP_RIVERS_OVERLAY: &str = "riversoverlay";

/// Players per known-mask group; one group spans 8 hex rows.
const KNOWN_GROUP: usize = 32;
const KNOWN_ROWS_PER_GROUP: usize = 8;

// ── Character mappings shared with the private maps ──────────────────────────

pub fn terrain_to_char(ruleset: &Ruleset, terrain: Option<TerrainId>) -> char {
    terrain.and_then(|t| ruleset.terrain_identifier(t)).unwrap_or(UNKNOWN_TERRAIN)
}

/// `Some(None)` is the unknown-terrain marker; `None` is an unknown character.
pub fn char_to_terrain(ruleset: &Ruleset, ch: char) -> Option<Option<TerrainId>> {
    match ruleset.terrain_by_identifier(ch) {
        Some(t) => Some(Some(t)),
        None if ch == UNKNOWN_TERRAIN => Some(None),
        None => None,
    }
}

pub fn resource_to_char(ruleset: &Ruleset, resource: Option<ResourceId>) -> char {
    resource.and_then(|r| ruleset.resource_identifier(r)).unwrap_or(NO_RESOURCE)
}

pub fn char_to_resource(ruleset: &Ruleset, ch: char) -> Option<Option<ResourceId>> {
    match ruleset.resource_by_identifier(ch) {
        Some(r) => Some(Some(r)),
        None if ch == NO_RESOURCE => Some(None),
        None => None,
    }
}

fn rivers_only() -> FlagSet<TileSpecial> {
    [TileSpecial::River].into_iter().collect()
}

pub struct MapSection;

// ── Load ─────────────────────────────────────────────────────────────────────

impl MapSection {
    fn load_terrain(ctx: &mut LoadContext<'_>, world: &mut World, dims: MapDims) -> SaveResult<()> {
        let ruleset = ctx.ruleset;
        let tiles = &mut world.map.tiles;
        load_char_rows(ctx.file, dims, "map.t", &mut ctx.status, |t, ch| {
            match char_to_terrain(ruleset, ch) {
                Some(terrain) => {
                    tiles[t].terrain = terrain;
                    Ok(())
                }
                None => Err(SaveError::RulesetMismatch {
                    what:  "terrain identifier".to_string(),
                    value: ch.to_string(),
                }),
            }
        })
    }

    fn load_resources(ctx: &mut LoadContext<'_>, world: &mut World, dims: MapDims) -> SaveResult<()> {
        let ruleset = ctx.ruleset;
        let tiles = &mut world.map.tiles;
        let mut unknown = 0;
        load_char_rows(ctx.file, dims, "map.res", &mut ctx.status, |t, ch| {
            match char_to_resource(ruleset, ch) {
                Some(resource) => tiles[t].resource = resource,
                None => unknown += 1,
            }
            Ok(())
        })?;
        if unknown > 0 {
            ctx.status.warn(format!("{unknown} tiles hold an unknown resource, cleared"));
        }
        Ok(())
    }

    fn load_specials(
        ctx: &mut LoadContext<'_>,
        world: &mut World,
        dims: MapDims,
        filter: Option<&FlagSet<TileSpecial>>,
    ) {
        let tiles = &mut world.map.tiles;
        load_attr_grid(ctx.file, dims, "map.spe", &ctx.tables.specials, filter, &mut ctx.status, |t, set| {
            for special in set.iter() {
                tiles[t].specials.insert(special);
            }
        });
    }

    fn load_bases_and_roads(ctx: &mut LoadContext<'_>, world: &mut World, dims: MapDims) {
        let tiles = &mut world.map.tiles;
        load_attr_grid(ctx.file, dims, "map.b", &ctx.tables.bases, None, &mut ctx.status, |t, set| {
            for base in set.iter() {
                tiles[t].bases.insert(base);
            }
        });
        load_attr_grid(ctx.file, dims, "map.r", &ctx.tables.roads, None, &mut ctx.status, |t, set| {
            for road in set.iter() {
                tiles[t].roads.insert(road);
            }
        });
    }

    fn load_borders(ctx: &mut LoadContext<'_>, world: &mut World, dims: MapDims) -> SaveResult<()> {
        let nplayers = world.players.len();
        let ntiles = world.map.tile_count();
        let map = &mut world.map;
        let mut dropped = 0;

        load_token_rows(ctx.file, dims, "map.owner", &mut ctx.status, |t, value| {
            let owner = value.and_then(|v| usize::try_from(v).ok()).filter(|&p| p < nplayers);
            if value.is_some() && owner.is_none() {
                dropped += 1;
            }
            let claimer = map.tile(t).claimer;
            map.claim_ownership(t, owner, claimer);
            Ok(())
        })?;
        load_token_rows(ctx.file, dims, "map.source", &mut ctx.status, |t, value| {
            let source = value.and_then(|v| usize::try_from(v).ok()).filter(|&s| s < ntiles);
            if value.is_some() && source.is_none() {
                dropped += 1;
            }
            let owner = map.tile(t).owner;
            map.claim_ownership(t, owner, source);
            Ok(())
        })?;

        if dropped > 0 {
            ctx.status.warn(format!("{dropped} border entries point nowhere, cleared"));
        }
        Ok(())
    }

    fn load_worked(ctx: &mut LoadContext<'_>, world: &World, dims: MapDims) -> SaveResult<()> {
        let mut worked: Vec<Option<CityId>> = vec![None; world.map.tile_count()];
        load_token_rows(ctx.file, dims, "map.worked", &mut ctx.status, |t, value| {
            worked[t] = value.and_then(|v| CityId::try_from(v).ok());
            Ok(())
        })?;
        ctx.worked_tiles = worked;
        Ok(())
    }

    fn load_known(ctx: &mut LoadContext<'_>, world: &mut World, dims: MapDims) -> SaveResult<()> {
        if !ctx.file.contains(&row_path(&grid_prefix("map.k", 0), 0)) {
            log::debug!("No known masks saved");
            return Ok(());
        }
        let nplayers = world.players.len();
        let tiles = &mut world.map.tiles;
        let mut bad = 0;

        for group in 0..nplayers.div_ceil(KNOWN_GROUP) {
            let mut masks = vec![0u32; tiles.len()];
            for half in 0..KNOWN_ROWS_PER_GROUP {
                let prefix = grid_prefix("map.k", group * KNOWN_ROWS_PER_GROUP + half);
                load_char_rows(ctx.file, dims, &prefix, &mut ctx.status, |t, ch| {
                    match decode_halfbyte(ch, half) {
                        Ok(bits) => masks[t] |= bits,
                        Err(_) => bad += 1,
                    }
                    Ok(())
                })?;
            }
            for (t, mask) in masks.into_iter().enumerate() {
                for bit in 0..KNOWN_GROUP {
                    let plrno = group * KNOWN_GROUP + bit;
                    if mask & (1 << bit) != 0 && plrno < nplayers {
                        tiles[t].known.insert(plrno);
                    }
                }
            }
        }

        if bad > 0 {
            ctx.status.warn(format!("{bad} known-mask digits unreadable, treated as unknown"));
        }
        Ok(())
    }

    fn load_startpos(ctx: &mut LoadContext<'_>, world: &mut World) {
        let count = ctx.file.lookup_int_or("map.startpos_count", 0).max(0) as usize;
        world.map.startpos.clear();

        for i in 0..count {
            let prefix = format!("map.startpos{i}");
            let x = ctx.file.lookup_int(&format!("{prefix}.x"));
            let y = ctx.file.lookup_int(&format!("{prefix}.y"));
            let Some(tile) = x.zip(y).and_then(|(x, y)| world.map.index(x, y)) else {
                ctx.status.warn(format!("Start position {i} is off the map, skipped"));
                continue;
            };

            let exclude = ctx.file.lookup_bool_or(&format!("{prefix}.exclude"), false);
            let mut nations = Vec::new();
            let names = ctx.file.lookup_str_or(&format!("{prefix}.nations"), "").to_string();
            for name in names.split('#').filter(|n| !n.is_empty()) {
                match ctx.ruleset.nation_by_name(name) {
                    Some(nation) => nations.push(nation),
                    None => ctx.status.warn(format!("Start position {i}: unknown nation '{name}'")),
                }
            }
            world.map.startpos.push(StartPos { tile, exclude, nations });
        }
    }
}

impl SaveSection for MapSection {
    fn name(&self) -> &'static str { "map" }

    fn load(&self, ctx: &mut LoadContext<'_>, world: &mut World) -> SaveResult<()> {
        let pregame = ctx.server_state == ServerState::Initial;
        if pregame && !world.scenario.is_scenario {
            log::debug!("Pre-game savegame, map not loaded");
            return Ok(());
        }
        if !world.map.is_allocated() {
            return Err(SaveError::corrupt("map", "map rows present but the map size is unknown"));
        }
        let dims = MapDims::of(&world.map);

        world.map.have_huts = ctx.file.lookup_bool_or("map.have_huts", false);
        Self::load_terrain(ctx, world, dims)?;
        Self::load_startpos(ctx, world);
        Self::load_bases_and_roads(ctx, world, dims);

        if pregame {
            if ctx.has_capability(CAP_SPECIALS) {
                Self::load_specials(ctx, world, dims, None);
                Self::load_resources(ctx, world, dims)?;
            } else if ctx.has_capability(CAP_RIVERS_OVERLAY) {
                Self::load_specials(ctx, world, dims, Some(&rivers_only()));
            }
            return Ok(());
        }

        Self::load_specials(ctx, world, dims, None);
        Self::load_resources(ctx, world, dims)?;
        if !world.info.is_new_game {
            Self::load_borders(ctx, world, dims)?;
        }
        Self::load_worked(ctx, world, dims)?;
        Self::load_known(ctx, world, dims)?;
        log::debug!("Map {}x{} loaded", dims.xsize, dims.ysize);
        Ok(())
    }

    fn save(&self, ctx: &mut SaveContext<'_>, world: &World) -> SaveResult<()> {
        if !world.map.is_allocated() {
            return Ok(());
        }
        let map = &world.map;
        let dims = MapDims::of(map);
        let ruleset = ctx.ruleset;
        let rivers_overlay = ctx.scenario && ctx.config.rivers_overlay;
        if ctx.scenario {
            ctx.add_option(if rivers_overlay { CAP_RIVERS_OVERLAY } else { CAP_SPECIALS });
        }

        ctx.file.set_bool("map.have_huts", map.have_huts);
        save_char_rows(&mut ctx.file, dims, "map.t", |t| {
            terrain_to_char(ruleset, map.tile(t).terrain)
        })?;

        let filter = rivers_only();
        save_attr_grid(&mut ctx.file, dims, "map.spe", &ctx.tables.specials, |t| {
            let mut set = map.tile(t).specials;
            if rivers_overlay {
                set.retain_in(&filter);
            }
            set
        })?;
        save_attr_grid(&mut ctx.file, dims, "map.b", &ctx.tables.bases, |t| map.tile(t).bases)?;
        save_attr_grid(&mut ctx.file, dims, "map.r", &ctx.tables.roads, |t| map.tile(t).roads)?;
        if !rivers_overlay {
            save_char_rows(&mut ctx.file, dims, "map.res", |t| {
                resource_to_char(ruleset, map.tile(t).resource)
            })?;
        }

        save_token_rows(&mut ctx.file, dims, "map.owner", |t| map.tile(t).owner.map(|p| p as i64));
        save_token_rows(&mut ctx.file, dims, "map.source", |t| {
            map.tile(t).claimer.map(|s| s as i64)
        });
        save_token_rows(&mut ctx.file, dims, "map.worked", |t| {
            map.tile(t).worked.map(|c| c as i64)
        });

        if ctx.config.save_known {
            let nplayers = world.players.len();
            for group in 0..nplayers.div_ceil(KNOWN_GROUP) {
                for half in 0..KNOWN_ROWS_PER_GROUP {
                    let prefix = grid_prefix("map.k", group * KNOWN_ROWS_PER_GROUP + half);
                    save_char_rows(&mut ctx.file, dims, &prefix, |t| {
                        let mut mask = 0u32;
                        for plrno in map.tile(t).known.iter() {
                            if plrno / KNOWN_GROUP == group {
                                mask |= 1 << (plrno % KNOWN_GROUP);
                            }
                        }
                        encode_halfbyte(mask, half)
                    })?;
                }
            }
        }

        ctx.file.set_int("map.startpos_count", map.startpos.len() as i64);
        for (i, pos) in map.startpos.iter().enumerate() {
            let (x, y) = map.native_pos(pos.tile);
            let prefix = format!("map.startpos{i}");
            ctx.file.set_int(&format!("{prefix}.x"), x as i64);
            ctx.file.set_int(&format!("{prefix}.y"), y as i64);
            ctx.file.set_bool(&format!("{prefix}.exclude"), pos.exclude);
            let nations = pos
                .nations
                .iter()
                .filter_map(|&n| ruleset.nations.get(n).map(String::as_str))
                .collect::<Vec<_>>()
                .join("#");
            ctx.file.set_str(&format!("{prefix}.nations"), &nations);
        }
        Ok(())
    }
}
