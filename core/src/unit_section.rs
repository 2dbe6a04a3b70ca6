//! `player%d.u%d.*`: units and their orders.
//!
//! Orders are five parallel strings, one character per order. A unit whose
//! order strings do not agree with `orders_length` loses its orders and
//! goes idle; the rest of the load is unaffected.

use crate::codec::hex::{decode_base64sym, encode_base64sym};
use crate::codec::orders::{
    activity2char, char2activity, char2dir, char2order, dir2char, order2char, ActivityCode,
    NOT_APPLICABLE,
};
use crate::context::{LoadContext, SaveContext};
use crate::error::{LoadStatus, SaveError, SaveResult};
use crate::map::{Direction, TileSpecial};
use crate::order_table::OrderTables;
use crate::ruleset::{Ruleset, UnitDomain};
use crate::secfile::SectionFile;
use crate::types::{CityId, PlayerNo, UnitId, IDENTITY_NUMBER_ZERO};
use crate::unit::{
    Activity, ActivityTarget, OrderKind, Unit, UnitOrder, UnitOrders, MAX_LEN_ROUTE,
};
use crate::world::World;

/// Written in place of every order list when a unit has no orders.
const NO_ORDERS: &str = "-";

// ── Activities ───────────────────────────────────────────────────────────────

/// Decode an activity character, mapping the legacy road/base activities
/// onto their generic replacements.
fn decode_activity(ruleset: &Ruleset, ch: char) -> Option<(Activity, ActivityTarget)> {
    let road = |name: &str| ruleset.road_by_name(name).map_or(ActivityTarget::None, ActivityTarget::Road);
    let base = |name: &str| ruleset.base_by_name(name).map_or(ActivityTarget::None, ActivityTarget::Base);
    Some(match char2activity(ch)? {
        ActivityCode::Current(activity) => (activity, ActivityTarget::None),
        ActivityCode::Unknown => (Activity::Idle, ActivityTarget::None),
        ActivityCode::LegacyRoad => (Activity::GenRoad, road("Road")),
        ActivityCode::LegacyRailroad => (Activity::GenRoad, road("Railroad")),
        ActivityCode::LegacyFortress => (Activity::Base, base("Fortress")),
        ActivityCode::LegacyAirbase => (Activity::Base, base("Airbase")),
    })
}

/// Read `<prefix>.<stem>_target`, `_base` and `_road` through the order
/// tables. The first usable one wins.
fn load_target(file: &SectionFile, tables: &OrderTables, prefix: &str, stem: &str) -> ActivityTarget {
    let slot = |suffix: &str| {
        file.lookup_int(&format!("{prefix}.{stem}_{suffix}"))
            .and_then(|v| usize::try_from(v).ok())
    };
    if let Some(special) = slot("target").and_then(|s| tables.specials.get(s)) {
        return ActivityTarget::Special(special);
    }
    if let Some(base) = slot("base").and_then(|s| tables.bases.get(s)) {
        return ActivityTarget::Base(base);
    }
    if let Some(road) = slot("road").and_then(|s| tables.roads.get(s)) {
        return ActivityTarget::Road(road);
    }
    ActivityTarget::None
}

fn save_target(file: &mut SectionFile, tables: &OrderTables, prefix: &str, stem: &str, target: ActivityTarget) {
    let (special, base, road) = match target {
        ActivityTarget::None => (None, None, None),
        ActivityTarget::Special(s) => (tables.specials.position(s), None, None),
        ActivityTarget::Base(b) => (None, tables.bases.position(b), None),
        ActivityTarget::Road(r) => (None, None, tables.roads.position(r)),
    };
    let value = |slot: Option<usize>| slot.map_or(-1, |s| s as i64);
    file.set_int(&format!("{prefix}.{stem}_target"), value(special));
    file.set_int(&format!("{prefix}.{stem}_base"), value(base));
    file.set_int(&format!("{prefix}.{stem}_road"), value(road));
}

/// Whether a unit may keep its activity on its current tile.
pub fn activity_legal(world: &World, ruleset: &Ruleset, unit: &Unit) -> bool {
    let tile = world.map.tile(unit.tile);
    let ocean = tile.terrain.is_some_and(|t| ruleset.is_ocean(t));
    let land_unit = ruleset
        .unit_types
        .get(unit.utype)
        .is_some_and(|t| t.domain == UnitDomain::Land);

    match unit.activity {
        Activity::Idle | Activity::Goto | Activity::Explore | Activity::Sentry => true,
        Activity::Fortifying | Activity::Fortified | Activity::Pillage => land_unit,
        Activity::Pollution => land_unit && tile.specials.contains(TileSpecial::Pollution),
        Activity::Fallout => land_unit && tile.specials.contains(TileSpecial::Fallout),
        Activity::Mine
        | Activity::Irrigate
        | Activity::Transform
        | Activity::Convert
        | Activity::Base
        | Activity::GenRoad => land_unit && !ocean,
    }
}

// ── Orders ───────────────────────────────────────────────────────────────────

/// Decode the order lists. `Err` holds why they were dropped.
fn load_orders(
    file: &SectionFile,
    tables: &OrderTables,
    prefix: &str,
) -> Result<Option<UnitOrders>, String> {
    let length = file.lookup_int_or(&format!("{prefix}.orders_length"), 0);
    if length <= 0 {
        return Ok(None);
    }
    let length = length as usize;
    if length > MAX_LEN_ROUTE {
        return Err(format!("{length} orders exceed the route limit"));
    }

    let list = |name: &str, required: bool| -> Result<Vec<char>, String> {
        match file.lookup_str(&format!("{prefix}.{name}")) {
            Some(text) => {
                let chars: Vec<char> = text.chars().collect();
                if chars.len() < length {
                    Err(format!("'{name}' holds {} of {length} orders", chars.len()))
                } else {
                    Ok(chars)
                }
            }
            None if required => Err(format!("'{name}' is missing")),
            None => Ok(vec![NOT_APPLICABLE; length]),
        }
    };
    let kinds = list("orders_list", true)?;
    let dirs = list("dir_list", false)?;
    let activities = list("activity_list", false)?;
    let bases = list("base_list", false)?;
    let roads = list("road_list", false)?;

    let mut orders = Vec::with_capacity(length);
    for j in 0..length {
        let kind = char2order(kinds[j]).ok_or_else(|| format!("unknown order '{}'", kinds[j]))?;
        let mut order = UnitOrder::new(kind);
        order.dir = char2dir(dirs[j]);

        if matches!(kind, OrderKind::Move | OrderKind::FullMp) && order.dir.is_none() {
            return Err(format!("order {j} moves without a direction"));
        }
        if kind == OrderKind::Activity {
            match char2activity(activities[j]) {
                Some(ActivityCode::Current(activity)) => order.activity = Some(activity),
                _ => return Err(format!("order {j} has unknown activity '{}'", activities[j])),
            }
        }
        if bases[j] != NOT_APPLICABLE {
            order.base = decode_base64sym(bases[j]).ok().and_then(|s| tables.bases.get(s));
        }
        if roads[j] != NOT_APPLICABLE {
            order.road = decode_base64sym(roads[j]).ok().and_then(|s| tables.roads.get(s));
        }
        orders.push(order);
    }

    let index = file.lookup_int_or(&format!("{prefix}.orders_index"), 0).max(0) as usize;
    Ok(Some(UnitOrders {
        list: orders,
        index: index.min(length - 1),
        repeat: file.lookup_bool_or(&format!("{prefix}.orders_repeat"), false),
        vigilant: file.lookup_bool_or(&format!("{prefix}.orders_vigilant"), false),
    }))
}

fn save_orders(file: &mut SectionFile, tables: &OrderTables, prefix: &str, orders: Option<&UnitOrders>) {
    let key = |k: &str| format!("{prefix}.{k}");
    let Some(orders) = orders.filter(|o| !o.list.is_empty()) else {
        file.set_int(&key("orders_length"), 0);
        for name in ["orders_list", "dir_list", "activity_list", "base_list", "road_list"] {
            file.set_str(&key(name), NO_ORDERS);
        }
        return;
    };

    file.set_int(&key("orders_length"), orders.list.len() as i64);
    file.set_int(&key("orders_index"), orders.index as i64);
    file.set_bool(&key("orders_repeat"), orders.repeat);
    file.set_bool(&key("orders_vigilant"), orders.vigilant);

    let column = |f: &dyn Fn(&UnitOrder) -> char| orders.list.iter().map(f).collect::<String>();
    file.set_str(&key("orders_list"), &column(&|o| order2char(o.kind)));
    file.set_str(&key("dir_list"), &column(&|o| o.dir.map_or(NOT_APPLICABLE, dir2char)));
    file.set_str(
        &key("activity_list"),
        &column(&|o| o.activity.map_or(NOT_APPLICABLE, activity2char)),
    );
    file.set_str(
        &key("base_list"),
        &column(&|o| {
            o.base
                .and_then(|b| tables.bases.position(b))
                .map_or(NOT_APPLICABLE, encode_base64sym)
        }),
    );
    file.set_str(
        &key("road_list"),
        &column(&|o| {
            o.road
                .and_then(|r| tables.roads.position(r))
                .map_or(NOT_APPLICABLE, encode_base64sym)
        }),
    );
}

// ── Load ─────────────────────────────────────────────────────────────────────

pub(crate) fn load_units(
    ctx: &mut LoadContext<'_>,
    world: &mut World,
    plrno: PlayerNo,
) -> SaveResult<()> {
    let count = ctx.file.lookup_int_or(&format!("player{plrno}.nunits"), 0).max(0) as usize;
    for i in 0..count {
        let unit = load_unit(ctx.file, ctx.ruleset, &ctx.tables, &mut ctx.status, world, plrno, i)?;
        let id = unit.id;
        world.place_unit(unit).map_err(|_| {
            SaveError::corrupt("player", format!("player{plrno}.u{i}: unit id {id} is taken"))
        })?;
    }
    log::debug!("player{plrno}: {count} units loaded");
    Ok(())
}

fn load_unit(
    file: &SectionFile,
    ruleset: &Ruleset,
    tables: &OrderTables,
    status: &mut LoadStatus,
    world: &World,
    plrno: PlayerNo,
    i: usize,
) -> SaveResult<Unit> {
    let prefix = format!("player{plrno}.u{i}");
    let key = |k: &str| format!("{prefix}.{k}");
    let int = |k: &str, default: i64| file.lookup_int_or(&key(k), default);
    let required = |k: &str| {
        file.lookup_int(&key(k))
            .ok_or_else(|| SaveError::corrupt("player", format!("'{}' is missing", key(k))))
    };

    let type_name = file.lookup_str_or(&key("type_by_name"), "");
    let utype = ruleset.unit_type_by_name(type_name).ok_or_else(|| {
        SaveError::corrupt("player", format!("{prefix}: unknown unit type '{type_name}'"))
    })?;
    let id = UnitId::try_from(required("id")?)
        .ok()
        .filter(|&id| id != IDENTITY_NUMBER_ZERO)
        .ok_or_else(|| SaveError::corrupt("player", format!("{prefix}: invalid id")))?;
    let (x, y) = (required("x")?, required("y")?);
    let tile = world
        .map
        .index(x, y)
        .ok_or_else(|| SaveError::corrupt("player", format!("{prefix}: ({x}, {y}) is off the map")))?;

    let mut unit = Unit::new(id, plrno, utype, tile);

    let facing = file.lookup_str_or(&key("facing"), "");
    unit.facing = match facing.chars().next().and_then(char2dir) {
        Some(dir) => dir,
        None => {
            status.warn(format!("{prefix}: bad facing '{facing}', facing south"));
            Direction::South
        }
    };

    let homecity = int("homecity", 0);
    if homecity > 0 {
        let home = CityId::try_from(homecity).ok();
        match home.filter(|&c| world.cities.get(c).is_some_and(|c| c.owner == plrno)) {
            Some(city) => unit.homecity = Some(city),
            None => status.warn(format!("{prefix}: home city {homecity} not found, unit made free")),
        }
    }

    unit.moves_left = int("moves", 0) as i32;
    unit.fuel = int("fuel", 0) as i32;
    unit.hp = int("hp", ruleset.unit_types[utype].hp as i64) as i32;
    unit.veteran = int("veteran", 0) as i32;

    let activity_text = file.lookup_str_or(&key("activity"), "n");
    let (activity, legacy_target) = match activity_text.chars().next().and_then(|ch| decode_activity(ruleset, ch)) {
        Some(decoded) => decoded,
        None => {
            status.warn(format!("{prefix}: unknown activity '{activity_text}', unit idle"));
            (Activity::Idle, ActivityTarget::None)
        }
    };
    unit.activity = activity;
    unit.activity_count = int("activity_count", 0) as i32;
    unit.activity_target = match load_target(file, tables, &prefix, "activity") {
        ActivityTarget::None => legacy_target,
        target => target,
    };

    let changed_text = file.lookup_str_or(&key("changed_from"), "n");
    let (changed_from, changed_legacy) = changed_text
        .chars()
        .next()
        .and_then(|ch| decode_activity(ruleset, ch))
        .unwrap_or((Activity::Idle, ActivityTarget::None));
    unit.changed_from = changed_from;
    unit.changed_from_count = int("changed_from_count", 0) as i32;
    unit.changed_from_target = match load_target(file, tables, &prefix, "changed_from") {
        ActivityTarget::None => changed_legacy,
        target => target,
    };

    unit.done_moving = file.lookup_bool_or(&key("done_moving"), false);
    unit.born = int("born", 0) as i32;
    unit.battlegroup = int("battlegroup", -1) as i32;
    if file.lookup_bool_or(&key("go"), false) {
        unit.goto_tile = world.map.index(int("goto_x", -1), int("goto_y", -1));
        if unit.goto_tile.is_none() {
            status.warn(format!("{prefix}: goto target off the map, cleared"));
        }
    }
    unit.ai_controlled = file.lookup_bool_or(&key("ai"), false);
    unit.ord_map = int("ord_map", 0) as i32;
    unit.ord_city = int("ord_city", 0) as i32;
    unit.moved = file.lookup_bool_or(&key("moved"), false);
    unit.paradropped = file.lookup_bool_or(&key("paradropped"), false);
    unit.transported_by = UnitId::try_from(int("transported_by", -1))
        .ok()
        .filter(|&t| t != IDENTITY_NUMBER_ZERO);

    match load_orders(file, tables, &prefix) {
        Ok(orders) => unit.orders = orders,
        Err(reason) => {
            status.warn(format!("{prefix}: orders dropped ({reason})"));
            unit.orders = None;
            unit.set_idle();
        }
    }

    Ok(unit)
}

// ── Save ─────────────────────────────────────────────────────────────────────

pub(crate) fn save_units(ctx: &mut SaveContext<'_>, world: &World, plrno: PlayerNo) -> SaveResult<()> {
    let ruleset = ctx.ruleset;
    let units: Vec<&Unit> = world.units.iter().filter(|u| u.owner == plrno).collect();
    ctx.file.set_int(&format!("player{plrno}.nunits"), units.len() as i64);

    for (i, unit) in units.into_iter().enumerate() {
        let prefix = format!("player{plrno}.u{i}");
        let key = |k: &str| format!("{prefix}.{k}");
        let tables = &ctx.tables;
        let file = &mut ctx.file;
        let (x, y) = world.map.native_pos(unit.tile);

        let ord_map = world.map.tile(unit.tile).units.iter().position(|&u| u == unit.id);
        let ord_city = unit
            .homecity
            .and_then(|c| world.cities.get(c))
            .and_then(|c| c.units_supported.iter().position(|&u| u == unit.id));

        file.set_str(&key("type_by_name"), ruleset.unit_type_name(unit.utype));
        file.set_int(&key("id"), unit.id as i64);
        file.set_int(&key("x"), x as i64);
        file.set_int(&key("y"), y as i64);
        file.set_str(&key("facing"), &dir2char(unit.facing).to_string());
        file.set_int(&key("homecity"), unit.homecity.map_or(0, |c| c as i64));
        file.set_int(&key("moves"), unit.moves_left as i64);
        file.set_int(&key("fuel"), unit.fuel as i64);
        file.set_int(&key("hp"), unit.hp as i64);
        file.set_int(&key("veteran"), unit.veteran as i64);

        file.set_str(&key("activity"), &activity2char(unit.activity).to_string());
        file.set_int(&key("activity_count"), unit.activity_count as i64);
        save_target(file, tables, &prefix, "activity", unit.activity_target);
        file.set_str(&key("changed_from"), &activity2char(unit.changed_from).to_string());
        file.set_int(&key("changed_from_count"), unit.changed_from_count as i64);
        save_target(file, tables, &prefix, "changed_from", unit.changed_from_target);

        file.set_bool(&key("done_moving"), unit.done_moving);
        file.set_int(&key("born"), unit.born as i64);
        file.set_int(&key("battlegroup"), unit.battlegroup as i64);
        file.set_bool(&key("go"), unit.goto_tile.is_some());
        if let Some(goto) = unit.goto_tile {
            let (gx, gy) = world.map.native_pos(goto);
            file.set_int(&key("goto_x"), gx as i64);
            file.set_int(&key("goto_y"), gy as i64);
        }
        file.set_bool(&key("ai"), unit.ai_controlled);
        file.set_int(&key("ord_map"), ord_map.unwrap_or(0) as i64);
        file.set_int(&key("ord_city"), ord_city.unwrap_or(0) as i64);
        file.set_bool(&key("moved"), unit.moved);
        file.set_bool(&key("paradropped"), unit.paradropped);
        file.set_int(&key("transported_by"), unit.transported_by.map_or(-1, |t| t as i64));

        save_orders(file, tables, &prefix, unit.orders.as_ref());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_activities_map_to_generic_ones() {
        let ruleset = Ruleset::classic();
        let road = ruleset.road_by_name("Railroad").expect("railroad");
        assert_eq!(
            decode_activity(&ruleset, 'l'),
            Some((Activity::GenRoad, ActivityTarget::Road(road)))
        );
        assert_eq!(decode_activity(&ruleset, '?'), Some((Activity::Idle, ActivityTarget::None)));
        assert_eq!(decode_activity(&ruleset, 'Z'), None);
    }
}
