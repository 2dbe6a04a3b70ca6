//! `player%d.c%d.*`: cities.
//!
//! Worked tiles are not stored per city. They come from the
//! `map.worked%04d` rows read earlier into the load context.

use crate::city::{City, Production, MAX_CITY_SIZE, MAX_LEN_WORKLIST};
use crate::context::{LoadContext, SaveContext};
use crate::error::{SaveError, SaveResult};
use crate::order_table::{load_presence, save_presence};
use crate::ruleset::Ruleset;
use crate::secfile::SectionFile;
use crate::types::{CityId, PlayerNo, FREE_WORKED_TILES, IDENTITY_NUMBER_ZERO};
use crate::world::World;

/// `turn_founded` value old writers paired with `did_buy = -1`.
const LEGACY_FOUNDED_THIS_TURN: i64 = -2;

fn decode_production(ruleset: &Ruleset, kind: &str, name: &str) -> Option<Production> {
    match kind {
        "Building" | "Improvement" => ruleset.improvement_by_name(name).map(Production::Improvement),
        "UnitType" | "Unit" => ruleset.unit_type_by_name(name).map(Production::Unit),
        _ => None,
    }
}

fn production_name(ruleset: &Ruleset, production: Production) -> &str {
    match production {
        Production::Improvement(id) => ruleset.improvement_name(id),
        Production::Unit(id) => ruleset.unit_type_name(id),
    }
}

fn lookup_production(
    file: &SectionFile,
    ruleset: &Ruleset,
    kind_key: &str,
    name_key: &str,
) -> Option<Production> {
    let kind = file.lookup_str(kind_key)?;
    let name = file.lookup_str(name_key)?;
    decode_production(ruleset, kind, name)
}

fn save_production(file: &mut SectionFile, ruleset: &Ruleset, kind_key: &str, name_key: &str, p: Production) {
    file.set_str(kind_key, p.kind_name());
    file.set_str(name_key, production_name(ruleset, p));
}

// ── Load ─────────────────────────────────────────────────────────────────────

pub(crate) fn load_cities(
    ctx: &mut LoadContext<'_>,
    world: &mut World,
    plrno: PlayerNo,
) -> SaveResult<()> {
    let count = ctx.file.lookup_int_or(&format!("player{plrno}.ncities"), 0).max(0) as usize;
    for i in 0..count {
        let city = load_city(ctx, world, plrno, i)?;
        let id = city.id;
        world.create_city(city).map_err(|city| {
            let (x, y) = world.map.native_pos(city.tile);
            SaveError::corrupt(
                "player",
                format!("player{plrno}.c{i}: city {id} duplicates a city at ({x}, {y}) or its id"),
            )
        })?;
        attach_worked_tiles(ctx, world, id);
    }
    log::debug!("player{plrno}: {count} cities loaded");
    Ok(())
}

fn load_city(
    ctx: &mut LoadContext<'_>,
    world: &World,
    plrno: PlayerNo,
    i: usize,
) -> SaveResult<City> {
    let file = &*ctx.file;
    let ruleset = ctx.ruleset;
    let prefix = format!("player{plrno}.c{i}");
    let key = |k: &str| format!("{prefix}.{k}");
    let int = |k: &str, default: i64| file.lookup_int_or(&key(k), default);
    let required = |k: &str| {
        file.lookup_int(&key(k))
            .ok_or_else(|| SaveError::corrupt("player", format!("'{}' is missing", key(k))))
    };

    let (x, y) = (required("x")?, required("y")?);
    let tile = world
        .map
        .index(x, y)
        .ok_or_else(|| SaveError::corrupt("player", format!("{prefix}: ({x}, {y}) is off the map")))?;
    let id = CityId::try_from(required("id")?)
        .ok()
        .filter(|&id| id != IDENTITY_NUMBER_ZERO)
        .ok_or_else(|| SaveError::corrupt("player", format!("{prefix}: invalid id")))?;

    let mut name = file.lookup_str_or(&key("name"), "").to_string();
    if name.is_empty() {
        name = format!("City {id}");
        ctx.status.warn(format!("{prefix}: unnamed city, called '{name}'"));
    }
    let mut size = int("size", 1);
    if !(1..=MAX_CITY_SIZE as i64).contains(&size) {
        let clamped = size.clamp(1, MAX_CITY_SIZE as i64);
        ctx.status.warn(format!("{prefix}: size {size} clamped to {clamped}"));
        size = clamped;
    }

    let mut city = City::new(id, plrno, tile, &name, size as i32);
    let original = int("original", plrno as i64);
    city.original = usize::try_from(original)
        .ok()
        .filter(|&p| p < world.players.len())
        .unwrap_or(plrno);

    city.specialists = Vec::with_capacity(ruleset.specialists.len());
    for s in 0..ruleset.specialists.len() {
        let count = int(&format!("nspe{s}"), 0);
        if !(0..=MAX_CITY_SIZE as i64).contains(&count) {
            ctx.status.warn(format!("{prefix}: {count} specialists of kind {s} ignored"));
            city.specialists.push(0);
        } else {
            city.specialists.push(count as i32);
        }
    }
    city.food_stock = int("food_stock", 0) as i32;
    city.shield_stock = int("shield_stock", 0) as i32;
    city.airlift = int("airlift", 0) as i32;
    city.was_happy = file.lookup_bool_or(&key("was_happy"), false);
    city.anarchy = int("anarchy", 0) as i32;
    city.rapture = int("rapture", 0) as i32;
    city.steal = int("steal", 0) as i32;

    let turn_founded = int("turn_founded", 0);
    let did_buy = int("did_buy", 0);
    if did_buy == -1 && turn_founded == LEGACY_FOUNDED_THIS_TURN {
        city.turn_founded = world.info.turn;
        city.did_buy = false;
    } else {
        city.turn_founded = turn_founded as i32;
        city.did_buy = did_buy > 0;
    }
    city.did_sell = file.lookup_bool_or(&key("did_sell"), false);
    city.turn_last_built = int("turn_last_built", 0) as i32;

    city.production = lookup_production(
        file,
        ruleset,
        &key("currently_building_kind"),
        &key("currently_building_name"),
    )
    .ok_or_else(|| SaveError::corrupt("player", format!("{prefix}: unknown production")))?;
    city.changed_from =
        match lookup_production(file, ruleset, &key("changed_from_kind"), &key("changed_from_name")) {
            Some(p) => p,
            None => {
                ctx.status.warn(format!("{prefix}: unknown 'changed_from', using production"));
                city.production
            }
        };
    city.before_change_shields = int("before_change_shields", 0) as i32;
    city.caravan_shields = int("caravan_shields", 0) as i32;
    city.disbanded_shields = int("disbanded_shields", 0) as i32;
    city.last_turns_shield_surplus = int("last_turns_shield_surplus", 0) as i32;

    if let Some(text) = file.lookup_str(&key("improvements")) {
        let path = key("improvements");
        city.improvements =
            load_presence(text, &ctx.tables.improvements, &path, &mut ctx.status).into_iter().collect();
    }
    city.city_radius_sq = int("city_radius_sq", city.city_radius_sq as i64) as i32;

    let wl_length = int("wl_length", 0).max(0) as usize;
    if wl_length > MAX_LEN_WORKLIST {
        ctx.status.warn(format!("{prefix}: worklist of {wl_length} truncated"));
    }
    for j in 0..wl_length.min(MAX_LEN_WORKLIST) {
        match lookup_production(file, ruleset, &key(&format!("wl_kind{j}")), &key(&format!("wl_value{j}"))) {
            Some(p) => city.worklist.push(p),
            None => ctx.status.warn(format!("{prefix}: worklist entry {j} unknown, dropped")),
        }
    }

    let mut r = 0;
    while let Some(partner) = file.lookup_int(&key(&format!("traderoute{r}"))) {
        if let Ok(partner) = CityId::try_from(partner) {
            if partner != IDENTITY_NUMBER_ZERO {
                city.trade_routes.push(partner);
            }
        }
        r += 1;
    }

    for slot in 0..world.players.len() {
        let count = int(&format!("citizen{slot}"), 0);
        if count > 0 {
            city.citizens.insert(slot, count as i32);
        }
    }

    Ok(city)
}

/// Claim the tiles `map.worked` assigns to the city and make the
/// specialist count absorb any mismatch with the size.
fn attach_worked_tiles(ctx: &mut LoadContext<'_>, world: &mut World, id: CityId) {
    let Some((center, radius_sq)) = world.cities.get(id).map(|c| (c.tile, c.city_radius_sq)) else {
        return;
    };
    let from_file = !ctx.worked_tiles.is_empty();
    if from_file && ctx.worked_tiles.get(center) != Some(&Some(id)) {
        ctx.status.warn(format!("City {id} did not work its centre tile, repaired"));
    }

    let mut worked = vec![center];
    for t in world.map.tiles_in_radius(center, radius_sq as i64).into_iter().skip(1) {
        if ctx.worked_tiles.get(t) != Some(&Some(id)) {
            continue;
        }
        let tile = world.map.tile_mut(t);
        if tile.worked.is_some() {
            ctx.status.warn(format!("City {id}: tile {t} is worked twice, released"));
            continue;
        }
        tile.worked = Some(id);
        worked.push(t);
    }

    let Some(city) = world.cities.get_mut(id) else { return };
    if city.specialists.is_empty() {
        city.specialists.push(0);
    }
    let workers = worked.len() as i32 - FREE_WORKED_TILES;
    let diff = city.size - workers - city.specialist_total();
    if diff != 0 {
        ctx.status.warn(format!(
            "City {id}: size {} does not match {workers} workers and {} specialists, repaired",
            city.size,
            city.specialist_total()
        ));
        if diff > 0 {
            city.specialists[0] = city.specialists[0].saturating_add(diff);
        } else {
            let mut excess = diff.saturating_neg();
            for count in city.specialists.iter_mut() {
                let taken = excess.min(*count);
                *count -= taken;
                excess -= taken;
            }
            while excess > 0 && worked.len() > 1 {
                if let Some(t) = worked.pop() {
                    world.map.tile_mut(t).worked = None;
                }
                excess -= 1;
            }
        }
    }
    city.worked = worked;
}

// ── Save ─────────────────────────────────────────────────────────────────────

pub(crate) fn save_cities(ctx: &mut SaveContext<'_>, world: &World, plrno: PlayerNo) -> SaveResult<()> {
    let ruleset = ctx.ruleset;
    let cities: Vec<&City> = world.cities.iter().filter(|c| c.owner == plrno).collect();
    ctx.file.set_int(&format!("player{plrno}.ncities"), cities.len() as i64);

    for (i, city) in cities.into_iter().enumerate() {
        let prefix = format!("player{plrno}.c{i}");
        let key = |k: &str| format!("{prefix}.{k}");
        let improvements = save_presence(&ctx.tables.improvements, |b| city.improvements.contains(&b));
        let file = &mut ctx.file;
        let (x, y) = world.map.native_pos(city.tile);

        file.set_int(&key("x"), x as i64);
        file.set_int(&key("y"), y as i64);
        file.set_int(&key("id"), city.id as i64);
        file.set_int(&key("original"), city.original as i64);
        file.set_str(&key("name"), &city.name);
        file.set_int(&key("size"), city.size as i64);
        for (s, count) in city.specialists.iter().enumerate() {
            file.set_int(&key(&format!("nspe{s}")), *count as i64);
        }
        file.set_int(&key("food_stock"), city.food_stock as i64);
        file.set_int(&key("shield_stock"), city.shield_stock as i64);
        file.set_int(&key("airlift"), city.airlift as i64);
        file.set_bool(&key("was_happy"), city.was_happy);
        file.set_int(&key("anarchy"), city.anarchy as i64);
        file.set_int(&key("rapture"), city.rapture as i64);
        file.set_int(&key("steal"), city.steal as i64);
        file.set_int(&key("turn_founded"), city.turn_founded as i64);
        file.set_int(&key("did_buy"), city.did_buy as i64);
        file.set_bool(&key("did_sell"), city.did_sell);
        file.set_int(&key("turn_last_built"), city.turn_last_built as i64);

        save_production(
            file,
            ruleset,
            &key("currently_building_kind"),
            &key("currently_building_name"),
            city.production,
        );
        save_production(file, ruleset, &key("changed_from_kind"), &key("changed_from_name"), city.changed_from);
        file.set_int(&key("before_change_shields"), city.before_change_shields as i64);
        file.set_int(&key("caravan_shields"), city.caravan_shields as i64);
        file.set_int(&key("disbanded_shields"), city.disbanded_shields as i64);
        file.set_int(&key("last_turns_shield_surplus"), city.last_turns_shield_surplus as i64);

        file.set_str(&key("improvements"), &improvements);
        file.set_int(&key("city_radius_sq"), city.city_radius_sq as i64);

        file.set_int(&key("wl_length"), city.worklist.len() as i64);
        for (j, entry) in city.worklist.iter().enumerate() {
            save_production(
                file,
                ruleset,
                &key(&format!("wl_kind{j}")),
                &key(&format!("wl_value{j}")),
                *entry,
            );
        }
        for (r, partner) in city.trade_routes.iter().enumerate() {
            file.set_int(&key(&format!("traderoute{r}")), *partner as i64);
        }
        for (slot, count) in &city.citizens {
            file.set_int(&key(&format!("citizen{slot}")), *count as i64);
        }
    }
    Ok(())
}
