//! `player%d.map_*` and `player%d.dc%d.*`: what each player remembers.
//!
//! The rows mirror the global map under a player prefix. Last-updated
//! turns are 16 bits, spread over four hex grids (`map_u00`..`map_u03`).

use crate::codec::attrs::{grid_prefix, load_attr_grid, save_attr_grid};
use crate::codec::hex::{decode_halfbyte, encode_halfbyte};
use crate::codec::row::{load_char_rows, load_token_rows, row_path, save_char_rows, save_token_rows, MapDims};
use crate::context::{LoadContext, SaveContext};
use crate::error::SaveResult;
use crate::map::{PlayerTile, VisionSite};
use crate::map_section::{char_to_resource, char_to_terrain, resource_to_char, terrain_to_char};
use crate::order_table::{load_presence, save_presence};
use crate::types::{IdentityNo, PlayerNo};
use crate::world::World;

const LAST_UPDATED_HALFBYTES: usize = 4;

// ── Load ─────────────────────────────────────────────────────────────────────

pub(crate) fn load_player_vision(
    ctx: &mut LoadContext<'_>,
    world: &mut World,
    plrno: PlayerNo,
) -> SaveResult<()> {
    let base = format!("player{plrno}.map_");
    if !world.map.is_allocated() || !ctx.file.contains(&row_path(&format!("{base}t"), 0)) {
        return Ok(());
    }
    let dims = MapDims::of(&world.map);
    let ruleset = ctx.ruleset;
    let nplayers = world.players.len();
    let mut tiles = vec![PlayerTile::default(); world.map.tile_count()];
    let mut unknown = 0;

    load_char_rows(ctx.file, dims, &format!("{base}t"), &mut ctx.status, |t, ch| {
        match char_to_terrain(ruleset, ch) {
            Some(terrain) => tiles[t].terrain = terrain,
            None => unknown += 1,
        }
        Ok(())
    })?;
    load_char_rows(ctx.file, dims, &format!("{base}res"), &mut ctx.status, |t, ch| {
        match char_to_resource(ruleset, ch) {
            Some(resource) => tiles[t].resource = resource,
            None => unknown += 1,
        }
        Ok(())
    })?;
    if unknown > 0 {
        ctx.status.warn(format!("player{plrno}: {unknown} remembered tiles hold unknown terrain or resources"));
    }

    load_attr_grid(ctx.file, dims, &format!("{base}spe"), &ctx.tables.specials, None, &mut ctx.status, |t, set| {
        for special in set.iter() {
            tiles[t].specials.insert(special);
        }
    });
    load_attr_grid(ctx.file, dims, &format!("{base}b"), &ctx.tables.bases, None, &mut ctx.status, |t, set| {
        for b in set.iter() {
            tiles[t].bases.insert(b);
        }
    });
    load_attr_grid(ctx.file, dims, &format!("{base}r"), &ctx.tables.roads, None, &mut ctx.status, |t, set| {
        for r in set.iter() {
            tiles[t].roads.insert(r);
        }
    });

    if ctx.file.contains(&row_path(&format!("{base}owner"), 0)) {
        load_token_rows(ctx.file, dims, &format!("{base}owner"), &mut ctx.status, |t, value| {
            tiles[t].owner = value.and_then(|v| usize::try_from(v).ok()).filter(|&p| p < nplayers);
            Ok(())
        })?;
    }

    for half in 0..LAST_UPDATED_HALFBYTES {
        let prefix = grid_prefix(&format!("{base}u"), half);
        load_char_rows(ctx.file, dims, &prefix, &mut ctx.status, |t, ch| {
            if let Ok(bits) = decode_halfbyte(ch, half) {
                tiles[t].last_updated |= bits as u16;
            }
            Ok(())
        })?;
    }

    let sites = load_vision_sites(ctx, world, plrno);
    if let Some(player) = world.player_mut(plrno) {
        player.private_map = tiles;
        player.vision_sites = sites;
    }
    Ok(())
}

fn load_vision_sites(
    ctx: &mut LoadContext<'_>,
    world: &World,
    plrno: PlayerNo,
) -> std::collections::BTreeMap<usize, VisionSite> {
    let mut sites = std::collections::BTreeMap::new();
    let total = ctx.file.lookup_int_or(&format!("player{plrno}.dc_total"), 0).max(0) as usize;

    for i in 0..total {
        let prefix = format!("player{plrno}.dc{i}");
        let key = |k: &str| format!("{prefix}.{k}");
        let file = &*ctx.file;
        let int = |k: &str, default: i64| file.lookup_int_or(&key(k), default);

        let Some(tile) = world.map.index(int("x", -1), int("y", -1)) else {
            ctx.status.warn(format!("{prefix}: remembered city off the map, skipped"));
            continue;
        };
        let owner = usize::try_from(int("owner", -1)).ok().filter(|&p| p < world.players.len());
        let Some(owner) = owner else {
            ctx.status.warn(format!("{prefix}: remembered city has no valid owner, skipped"));
            continue;
        };

        let mut site = VisionSite {
            id: IdentityNo::try_from(int("id", 0)).unwrap_or(0),
            owner,
            size: int("size", 1) as i32,
            occupied: file.lookup_bool_or(&key("occupied"), false),
            walls: file.lookup_bool_or(&key("walls"), false),
            happy: file.lookup_bool_or(&key("happy"), false),
            unhappy: file.lookup_bool_or(&key("unhappy"), false),
            name: file.lookup_str_or(&key("name"), "").to_string(),
            ..VisionSite::default()
        };
        if let Some(text) = file.lookup_str(&key("improvements")) {
            site.improvements = load_presence(text, &ctx.tables.improvements, &key("improvements"), &mut ctx.status)
                .into_iter()
                .collect();
        }
        sites.insert(tile, site);
    }
    sites
}

// ── Save ─────────────────────────────────────────────────────────────────────

pub(crate) fn save_player_vision(
    ctx: &mut SaveContext<'_>,
    world: &World,
    plrno: PlayerNo,
) -> SaveResult<()> {
    let Some(player) = world.player(plrno) else { return Ok(()) };
    if !ctx.config.save_private_map
        || !ctx.config.fogofwar
        || player.private_map.len() != world.map.tile_count()
        || !world.map.is_allocated()
    {
        return Ok(());
    }
    let base = format!("player{plrno}.map_");
    let dims = MapDims::of(&world.map);
    let ruleset = ctx.ruleset;
    let tiles = &player.private_map;
    let tables = &ctx.tables;
    let file = &mut ctx.file;

    save_char_rows(file, dims, &format!("{base}t"), |t| terrain_to_char(ruleset, tiles[t].terrain))?;
    save_char_rows(file, dims, &format!("{base}res"), |t| resource_to_char(ruleset, tiles[t].resource))?;
    save_attr_grid(file, dims, &format!("{base}spe"), &tables.specials, |t| tiles[t].specials)?;
    save_attr_grid(file, dims, &format!("{base}b"), &tables.bases, |t| tiles[t].bases)?;
    save_attr_grid(file, dims, &format!("{base}r"), &tables.roads, |t| tiles[t].roads)?;
    if ctx.config.foggedborders {
        save_token_rows(file, dims, &format!("{base}owner"), |t| tiles[t].owner.map(|p| p as i64));
    }
    for half in 0..LAST_UPDATED_HALFBYTES {
        save_char_rows(file, dims, &grid_prefix(&format!("{base}u"), half), |t| {
            encode_halfbyte(tiles[t].last_updated as u32, half)
        })?;
    }

    file.set_int(&format!("player{plrno}.dc_total"), player.vision_sites.len() as i64);
    for (i, (&tile, site)) in player.vision_sites.iter().enumerate() {
        let prefix = format!("player{plrno}.dc{i}");
        let key = |k: &str| format!("{prefix}.{k}");
        let (x, y) = world.map.native_pos(tile);
        file.set_int(&key("x"), x as i64);
        file.set_int(&key("y"), y as i64);
        file.set_int(&key("id"), site.id as i64);
        file.set_int(&key("owner"), site.owner as i64);
        file.set_int(&key("size"), site.size as i64);
        file.set_bool(&key("occupied"), site.occupied);
        file.set_bool(&key("walls"), site.walls);
        file.set_bool(&key("happy"), site.happy);
        file.set_bool(&key("unhappy"), site.unhappy);
        file.set_str(
            &key("improvements"),
            &save_presence(&tables.improvements, |b| site.improvements.contains(&b)),
        );
        file.set_str(&key("name"), &site.name);
    }
    Ok(())
}
