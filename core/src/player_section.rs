//! `players.*` and `player%d.*`.
//!
//! Two passes. `PlayersBasicSection` runs before the map and only creates
//! the player slots. `PlayersSection` runs after the map and fills in
//! everything that needs tiles: cities, units and private maps.
//!
//! LOAD RULES:
//!   - more than MAX_NUM_PLAYER_SLOTS players, a missing `ai_type`, an
//!     unknown government or an unresolvable research name fail the load
//!   - a broken shuffle order is rebuilt with a warning
//!   - an oversized or malformed attribute block is dropped with a warning
//!   - alliances that conflict with a war against an ally become peace

use crate::city_section::{load_cities, save_cities};
use crate::codec::quote::{quote_block, split_parts, unquote_block, MAX_ATTRIBUTE_BLOCK};
use crate::context::{LoadContext, SaveContext};
use crate::error::{LoadStatus, SaveError, SaveResult};
use crate::order_table::{load_presence, save_presence, OrderTables};
use crate::player::{
    DiplState, Diplstate, Player, Research, Spaceship, SpaceshipState, TechRef, NUM_SS_STRUCTURALS,
};
use crate::rng::GameRng;
use crate::ruleset::Ruleset;
use crate::secfile::SectionFile;
use crate::section::SaveSection;
use crate::types::{IdentityNo, PlayerNo, UnitId, MAX_NUM_PLAYER_SLOTS};
use crate::unit_section::{activity_legal, load_units, save_units};
use crate::vision_section::{load_player_vision, save_player_vision};
use crate::world::World;

const A_NONE: &str = "A_NONE";
const A_UNSET: &str = "A_UNSET";
const A_FUTURE: &str = "A_FUTURE";

/// Initial AI attitude towards every other player.
const DEFAULT_LOVE: i64 = 1;

// ── Players basic ────────────────────────────────────────────────────────────

pub struct PlayersBasicSection;

fn is_permutation(order: &[PlayerNo], nplayers: usize) -> bool {
    let mut seen = vec![false; nplayers];
    order.len() == nplayers
        && order.iter().all(|&p| p < nplayers && !std::mem::replace(&mut seen[p], true))
}

/// Fisher-Yates over a copy of the game generator, so the live state is
/// left untouched.
fn shuffle_players(rng: &GameRng, nplayers: usize) -> Vec<PlayerNo> {
    let mut rng = rng.clone();
    let mut order: Vec<PlayerNo> = (0..nplayers).collect();
    for i in (1..nplayers).rev() {
        let j = rng.next_below(i as u32 + 1) as usize;
        order.swap(i, j);
    }
    order
}

impl SaveSection for PlayersBasicSection {
    fn name(&self) -> &'static str { "players_basic" }

    fn load(&self, ctx: &mut LoadContext<'_>, world: &mut World) -> SaveResult<()> {
        let raw = ctx.file.lookup_int_or("players.nplayers", 0);
        let nplayers = usize::try_from(raw)
            .ok()
            .filter(|&n| n <= MAX_NUM_PLAYER_SLOTS)
            .ok_or_else(|| SaveError::corrupt("players", format!("invalid number of players ({raw})")))?;

        world.players = (0..nplayers)
            .map(|p| {
                let mut player = Player::new(p, "");
                player.diplstates = vec![Diplstate::default(); nplayers];
                player.love = vec![DEFAULT_LOVE as i32; nplayers];
                player
            })
            .collect();

        if let Some(text) = ctx.file.lookup_str("players.destroyed_wonders") {
            world.destroyed_wonders =
                load_presence(text, &ctx.tables.improvements, "players.destroyed_wonders", &mut ctx.status)
                    .into_iter()
                    .collect();
        }
        let used = ctx.file.lookup_int_or("players.identity_number_used", 0);
        world.identity_number_used = IdentityNo::try_from(used).unwrap_or(0);

        let order: Vec<PlayerNo> = (0..nplayers)
            .map_while(|i| {
                ctx.file
                    .lookup_int(&format!("players.shuffled_player_{i}"))
                    .and_then(|v| usize::try_from(v).ok())
            })
            .collect();
        world.shuffled_order = if is_permutation(&order, nplayers) {
            order
        } else {
            ctx.status.warn("Player shuffle order is broken, reshuffled");
            shuffle_players(&ctx.rstate, nplayers)
        };

        for p in 0..nplayers {
            let ai_key = format!("player{p}.ai_type");
            let ai_type = ctx
                .file
                .lookup_str(&ai_key)
                .ok_or_else(|| SaveError::corrupt("players", format!("'{ai_key}' is missing")))?
                .to_string();
            let team_no = ctx.file.lookup_int_or(&format!("player{p}.team_no"), p as i64) as i32;
            let player = &mut world.players[p];
            player.ai_type = ai_type;
            player.team_no = team_no;
        }
        log::debug!("{nplayers} player slots");
        Ok(())
    }

    fn save(&self, ctx: &mut SaveContext<'_>, world: &World) -> SaveResult<()> {
        if !ctx.save_players {
            ctx.file.set_int("players.nplayers", 0);
            return Ok(());
        }
        let nplayers = world.players.len();
        let destroyed = save_presence(&ctx.tables.improvements, |b| world.destroyed_wonders.contains(&b));
        let file = &mut ctx.file;

        file.set_int("players.nplayers", nplayers as i64);
        file.set_str("players.destroyed_wonders", &destroyed);
        file.set_int("players.identity_number_used", world.identity_number_used as i64);

        let order: Vec<PlayerNo> = if is_permutation(&world.shuffled_order, nplayers) {
            world.shuffled_order.clone()
        } else {
            (0..nplayers).collect()
        };
        for (i, p) in order.iter().enumerate() {
            file.set_int(&format!("players.shuffled_player_{i}"), *p as i64);
        }
        for player in &world.players {
            file.set_str(&format!("player{}.ai_type", player.number), &player.ai_type);
            file.set_int(&format!("player{}.team_no", player.number), player.team_no as i64);
        }
        Ok(())
    }
}

// ── Research names ───────────────────────────────────────────────────────────

fn load_tech_ref(file: &SectionFile, ruleset: &Ruleset, path: &str) -> SaveResult<TechRef> {
    match file.lookup_str_or(path, "") {
        "" => Ok(TechRef::Unknown),
        A_NONE => Ok(TechRef::None),
        A_UNSET => Ok(TechRef::Unset),
        A_FUTURE => Ok(TechRef::Future),
        name => ruleset
            .tech_by_name(name)
            .map(TechRef::Tech)
            .ok_or_else(|| SaveError::corrupt("player", format!("'{path}': unknown technology '{name}'"))),
    }
}

fn tech_ref_name(ruleset: &Ruleset, tech: TechRef) -> &str {
    match tech {
        TechRef::Unknown => "",
        TechRef::None => A_NONE,
        TechRef::Unset => A_UNSET,
        TechRef::Future => A_FUTURE,
        TechRef::Tech(id) => ruleset.tech_name(id),
    }
}

fn load_research(
    file: &SectionFile,
    ruleset: &Ruleset,
    tables: &OrderTables,
    status: &mut LoadStatus,
    prefix: &str,
) -> SaveResult<Research> {
    let key = |k: &str| format!("{prefix}.research.{k}");
    let int = |k: &str| file.lookup_int_or(&key(k), 0) as i32;

    let mut research = Research {
        goal: load_tech_ref(file, ruleset, &key("goal_name"))?,
        researching: load_tech_ref(file, ruleset, &key("now_name"))?,
        researching_saved: load_tech_ref(file, ruleset, &key("saved_name"))?,
        bulbs_researched: int("bulbs"),
        bulbs_before: int("bulbs_before"),
        bulbs_last_turn: int("bulbs_last_turn"),
        techs_researched: int("techs"),
        future_tech: int("futuretech"),
        got_tech: file.lookup_bool_or(&key("got_tech"), false),
        ..Research::default()
    };
    match file.lookup_str(&key("done")) {
        Some(text) => {
            research.known = load_presence(text, &tables.techs, &key("done"), status).into_iter().collect();
        }
        None => status.warn(format!("'{}' is missing, no techs known", key("done"))),
    }
    Ok(research)
}

fn save_research(file: &mut SectionFile, ruleset: &Ruleset, tables: &OrderTables, prefix: &str, r: &Research) {
    let key = |k: &str| format!("{prefix}.research.{k}");
    file.set_str(&key("goal_name"), tech_ref_name(ruleset, r.goal));
    file.set_str(&key("now_name"), tech_ref_name(ruleset, r.researching));
    file.set_str(&key("saved_name"), tech_ref_name(ruleset, r.researching_saved));
    file.set_int(&key("bulbs"), r.bulbs_researched as i64);
    file.set_int(&key("bulbs_before"), r.bulbs_before as i64);
    file.set_int(&key("bulbs_last_turn"), r.bulbs_last_turn as i64);
    file.set_int(&key("techs"), r.techs_researched as i64);
    file.set_int(&key("futuretech"), r.future_tech as i64);
    file.set_bool(&key("got_tech"), r.got_tech);
    file.set_str(&key("done"), &save_presence(&tables.techs, |t| r.known.contains(&t)));
}

// ── Diplomacy and spaceship ──────────────────────────────────────────────────

fn load_diplstate(file: &SectionFile, status: &mut LoadStatus, prefix: &str, other: PlayerNo) -> Diplstate {
    let key = |k: &str| format!("{prefix}.diplstate{other}.{k}");
    let mut state = |k: &str| {
        let raw = file.lookup_int_or(&key(k), DiplState::War as i64);
        DiplState::from_int(raw).unwrap_or_else(|| {
            status.warn(format!("'{}' holds unknown state {raw}, war assumed", key(k)));
            DiplState::War
        })
    };
    let kind = state("type");
    let max_state = state("max_state");
    let int = |k: &str, default: i64| file.lookup_int_or(&key(k), default) as i32;
    Diplstate {
        kind,
        max_state,
        first_contact_turn: int("first_contact_turn", 0),
        turns_left: int("turns_left", -2),
        has_reason_to_cancel: int("has_reason_to_cancel", 0),
        contact_turns_left: int("contact_turns_left", 0),
    }
}

fn load_spaceship(file: &SectionFile, status: &mut LoadStatus, prefix: &str) -> Spaceship {
    let key = |k: &str| format!("{prefix}.spaceship.{k}");
    let int = |k: &str| file.lookup_int_or(&key(k), 0) as i32;

    let raw = file.lookup_int_or(&key("state"), 0);
    let state = SpaceshipState::from_int(raw).unwrap_or_else(|| {
        status.warn(format!("'{}' holds unknown state {raw}, spaceship dropped", key("state")));
        SpaceshipState::None
    });
    if state == SpaceshipState::None {
        return Spaceship::default();
    }

    let mut ship = Spaceship {
        state,
        structurals: int("structurals"),
        components: int("components"),
        modules: int("modules"),
        fuel: int("fuel"),
        propulsion: int("propulsion"),
        habitation: int("habitation"),
        life_support: int("life_support"),
        solar_panels: int("solar_panels"),
        launch_year: int("launch_year"),
        ..Spaceship::default()
    };
    let structure = file.lookup_str_or(&key("structure"), "");
    if structure.chars().count() != NUM_SS_STRUCTURALS {
        status.warn(format!("'{}' has {} entries", key("structure"), structure.chars().count()));
    }
    for (slot, ch) in structure.chars().take(NUM_SS_STRUCTURALS).enumerate() {
        ship.structure[slot] = ch == '1';
    }
    ship
}

fn save_spaceship(file: &mut SectionFile, prefix: &str, ship: &Spaceship) {
    let key = |k: &str| format!("{prefix}.spaceship.{k}");
    file.set_int(&key("state"), ship.state as i64);
    if ship.state == SpaceshipState::None {
        return;
    }
    file.set_int(&key("structurals"), ship.structurals as i64);
    file.set_int(&key("components"), ship.components as i64);
    file.set_int(&key("modules"), ship.modules as i64);
    file.set_int(&key("fuel"), ship.fuel as i64);
    file.set_int(&key("propulsion"), ship.propulsion as i64);
    file.set_int(&key("habitation"), ship.habitation as i64);
    file.set_int(&key("life_support"), ship.life_support as i64);
    file.set_int(&key("solar_panels"), ship.solar_panels as i64);
    let structure: String = ship.structure.iter().map(|&s| if s { '1' } else { '0' }).collect();
    file.set_str(&key("structure"), &structure);
    file.set_int(&key("launch_year"), ship.launch_year as i64);
}

// ── Attribute block ──────────────────────────────────────────────────────────

fn load_attribute_block(file: &SectionFile, status: &mut LoadStatus, prefix: &str) -> Vec<u8> {
    let key = |k: &str| format!("{prefix}.attribute_v2_block{k}");
    let length = file.lookup_int_or(&key("_length"), 0);
    if length <= 0 {
        return Vec::new();
    }
    let length = length as usize;
    if length > MAX_ATTRIBUTE_BLOCK {
        status.warn(format!("{prefix}: attribute block of {length} bytes exceeds the limit, dropped"));
        return Vec::new();
    }

    let quoted_length = file.lookup_int_or(&key("_length_quoted"), 0).max(0) as usize;
    let parts = file.lookup_int_or(&key("_parts"), 0).max(0) as usize;
    let mut quoted = String::with_capacity(quoted_length);
    for part in 0..parts {
        let Some(text) = file.lookup_str(&key(&format!("_data.part{part}"))) else {
            status.warn(format!("{prefix}: attribute block part {part} is missing, dropped"));
            return Vec::new();
        };
        quoted.push_str(text);
    }
    if quoted.len() != quoted_length {
        status.warn(format!(
            "{prefix}: attribute block is {} characters, {quoted_length} recorded, dropped",
            quoted.len()
        ));
        return Vec::new();
    }

    match unquote_block(&quoted) {
        Ok(data) if data.len() == length => data,
        Ok(data) => {
            status.warn(format!("{prefix}: attribute block holds {} of {length} bytes, dropped", data.len()));
            Vec::new()
        }
        Err(e) => {
            status.warn(format!("{prefix}: attribute block dropped ({e})"));
            Vec::new()
        }
    }
}

fn save_attribute_block(file: &mut SectionFile, prefix: &str, block: &[u8]) {
    let key = |k: &str| format!("{prefix}.attribute_v2_block{k}");
    file.set_int(&key("_length"), block.len() as i64);
    if block.is_empty() {
        return;
    }
    let quoted = quote_block(block);
    let parts = split_parts(&quoted);
    file.set_int(&key("_length_quoted"), quoted.len() as i64);
    file.set_int(&key("_parts"), parts.len() as i64);
    for (i, part) in parts.iter().enumerate() {
        file.set_str(&key(&format!("_data.part{i}")), part);
    }
}

// ── Player main ──────────────────────────────────────────────────────────────

fn load_player_main(ctx: &mut LoadContext<'_>, world: &mut World, plrno: PlayerNo) -> SaveResult<()> {
    let file = &*ctx.file;
    let ruleset = ctx.ruleset;
    let tables = &ctx.tables;
    let status = &mut ctx.status;
    let nplayers = world.players.len();
    let prefix = format!("player{plrno}");
    let key = |k: &str| format!("{prefix}.{k}");
    let int = |k: &str, default: i64| file.lookup_int_or(&key(k), default);

    let name = file
        .lookup_str(&key("name"))
        .ok_or_else(|| SaveError::corrupt("player", format!("'{}' is missing", key("name"))))?;
    let government_name = file.lookup_str_or(&key("government_name"), "");
    let government = ruleset.government_by_name(government_name).ok_or_else(|| {
        SaveError::corrupt("player", format!("{prefix}: unknown government '{government_name}'"))
    })?;
    let target_government = match file.lookup_str_or(&key("target_government_name"), "") {
        "" => None,
        other => {
            let found = ruleset.government_by_name(other);
            if found.is_none() {
                status.warn(format!("{prefix}: unknown target government '{other}', cleared"));
            }
            found
        }
    };
    let nation = match file.lookup_str_or(&key("nation"), "") {
        "" => None,
        other => {
            let found = ruleset.nation_by_name(other);
            if found.is_none() {
                status.warn(format!("{prefix}: unknown nation '{other}', left unassigned"));
            }
            found
        }
    };
    let style_name = file.lookup_str_or(&key("city_style_by_name"), "");
    let city_style = ruleset.city_style_by_name(style_name).unwrap_or_else(|| {
        status.warn(format!("{prefix}: unknown city style '{style_name}', using the first style"));
        0
    });

    let research = load_research(file, ruleset, tables, status, &prefix)?;
    let diplstates: Vec<Diplstate> =
        (0..nplayers).map(|q| load_diplstate(file, status, &prefix, q)).collect();
    let spaceship = load_spaceship(file, status, &prefix);
    let lost_wonders = match file.lookup_str(&key("lost_wonders")) {
        Some(text) => load_presence(text, &tables.improvements, &key("lost_wonders"), status),
        None => Vec::new(),
    };
    let attribute_block = load_attribute_block(file, status, &prefix);

    let player = &mut world.players[plrno];
    player.name = name.to_string();
    player.username = file.lookup_str_or(&key("username"), "").to_string();
    player.nation = nation;
    player.government = government;
    player.target_government = target_government;
    player.revolution_finishes = int("revolution_finishes", -1) as i32;
    player.capital = file.lookup_bool_or(&key("capital"), false);
    player.ai_controlled = file.lookup_bool_or(&key("ai.control"), false);
    player.skill_level = int("ai.skill_level", 0) as i32;
    player.barbarian_type = int("ai.is_barbarian", 0) as i32;
    player.city_style = city_style;
    player.is_male = file.lookup_bool_or(&key("is_male"), true);
    player.is_alive = file.lookup_bool_or(&key("is_alive"), true);
    player.gold = int("gold", 0) as i32;
    player.tax = int("rates.tax", 0) as i32;
    player.science = int("rates.science", 0) as i32;
    player.luxury = int("rates.luxury", 0) as i32;

    player.embassy.clear();
    player.gives_shared_vision.clear();
    for q in 0..nplayers {
        let dkey = |k: &str| format!("{prefix}.diplstate{q}.{k}");
        if file.lookup_bool_or(&dkey("embassy"), false) {
            player.embassy.insert(q);
        }
        if file.lookup_bool_or(&dkey("gives_shared_vision"), false) {
            player.gives_shared_vision.insert(q);
        }
    }
    player.diplstates = diplstates;
    player.love = (0..nplayers)
        .map(|q| file.lookup_int_or(&key(&format!("ai{q}.love")), DEFAULT_LOVE) as i32)
        .collect();

    player.research = research;
    player.spaceship = spaceship;
    player.lost_wonders = lost_wonders.into_iter().collect();
    player.units_built = int("units_built", 0) as i32;
    player.units_killed = int("units_killed", 0) as i32;
    player.units_lost = int("units_lost", 0) as i32;
    player.attribute_block = attribute_block;
    Ok(())
}

fn name_at(names: &[String], id: usize) -> &str {
    names.get(id).map_or("", String::as_str)
}

fn save_player_main(ctx: &mut SaveContext<'_>, world: &World, player: &Player) {
    let ruleset = ctx.ruleset;
    let tables = &ctx.tables;
    let file = &mut ctx.file;
    let prefix = format!("player{}", player.number);
    let key = |k: &str| format!("{prefix}.{k}");

    file.set_str(&key("name"), &player.name);
    file.set_str(&key("username"), &player.username);
    file.set_str(&key("nation"), player.nation.map_or("", |n| name_at(&ruleset.nations, n)));
    file.set_str(&key("government_name"), name_at(&ruleset.governments, player.government));
    file.set_str(
        &key("target_government_name"),
        player.target_government.map_or("", |g| name_at(&ruleset.governments, g)),
    );
    file.set_int(&key("revolution_finishes"), player.revolution_finishes as i64);
    file.set_bool(&key("capital"), player.capital);
    file.set_bool(&key("ai.control"), player.ai_controlled);
    file.set_int(&key("ai.skill_level"), player.skill_level as i64);
    file.set_int(&key("ai.is_barbarian"), player.barbarian_type as i64);
    file.set_str(&key("city_style_by_name"), name_at(&ruleset.city_styles, player.city_style));
    file.set_bool(&key("is_male"), player.is_male);
    file.set_bool(&key("is_alive"), player.is_alive);
    file.set_int(&key("gold"), player.gold as i64);
    file.set_int(&key("rates.tax"), player.tax as i64);
    file.set_int(&key("rates.science"), player.science as i64);
    file.set_int(&key("rates.luxury"), player.luxury as i64);

    for q in 0..world.players.len() {
        let ds = player.diplstates.get(q).cloned().unwrap_or_default();
        let dkey = |k: &str| format!("{prefix}.diplstate{q}.{k}");
        file.set_int(&dkey("type"), ds.kind as i64);
        file.set_int(&dkey("max_state"), ds.max_state as i64);
        file.set_int(&dkey("first_contact_turn"), ds.first_contact_turn as i64);
        file.set_int(&dkey("turns_left"), ds.turns_left as i64);
        file.set_int(&dkey("has_reason_to_cancel"), ds.has_reason_to_cancel as i64);
        file.set_int(&dkey("contact_turns_left"), ds.contact_turns_left as i64);
        file.set_bool(&dkey("embassy"), player.embassy.contains(q));
        file.set_bool(&dkey("gives_shared_vision"), player.gives_shared_vision.contains(q));
        let love = player.love.get(q).map_or(DEFAULT_LOVE, |&l| l as i64);
        file.set_int(&key(&format!("ai{q}.love")), love);
    }

    save_research(file, ruleset, tables, &prefix, &player.research);
    file.set_int(&key("units_built"), player.units_built as i64);
    file.set_int(&key("units_killed"), player.units_killed as i64);
    file.set_int(&key("units_lost"), player.units_lost as i64);
    save_spaceship(file, &prefix, &player.spaceship);
    file.set_str(
        &key("lost_wonders"),
        &save_presence(&tables.improvements, |b| player.lost_wonders.contains(&b)),
    );
    save_attribute_block(file, &prefix, &player.attribute_block);
}

// ── Post-load fixes ──────────────────────────────────────────────────────────

fn fix_alliances(world: &mut World, status: &mut LoadStatus) {
    let nplayers = world.players.len();
    for p in 0..nplayers {
        for q in 0..nplayers {
            if p == q || world.players[p].diplstate(q) != DiplState::Alliance {
                continue;
            }
            let conflict = (0..nplayers).filter(|&r| r != p && r != q).any(|r| {
                (world.pplayers_allied(p, r) && world.pplayers_at_war(q, r))
                    || (world.pplayers_allied(q, r) && world.pplayers_at_war(p, r))
            });
            if !conflict {
                continue;
            }
            status.warn(format!(
                "Alliance between player{p} and player{q} conflicts with a war against an ally, reduced to peace"
            ));
            for (a, b) in [(p, q), (q, p)] {
                if let Some(ds) = world.players[a].diplstates.get_mut(b) {
                    ds.kind = DiplState::Peace;
                }
            }
        }
    }
}

fn idle_illegal_activities(world: &mut World, ruleset: &Ruleset, status: &mut LoadStatus) {
    let illegal: Vec<UnitId> = world
        .units
        .iter()
        .filter(|u| !activity_legal(world, ruleset, u))
        .map(|u| u.id)
        .collect();
    for id in illegal {
        if let Some(unit) = world.units.get_mut(id) {
            status.warn(format!("Unit {id}: activity {:?} is not legal on its tile, set idle", unit.activity));
            unit.set_idle();
        }
    }
}

fn unlink_broken_transports(world: &mut World, status: &mut LoadStatus) {
    let broken: Vec<UnitId> = world
        .units
        .iter()
        .filter(|u| {
            u.transported_by
                .is_some_and(|t| t == u.id || world.units.get(t).is_none_or(|carrier| carrier.tile != u.tile))
        })
        .map(|u| u.id)
        .collect();
    for id in broken {
        if let Some(unit) = world.units.get_mut(id) {
            status.warn(format!("Unit {id}: transporter {:?} is not on its tile, unloaded", unit.transported_by));
            unit.transported_by = None;
        }
    }
}

/// Restore saved stacking and support order.
fn sort_unit_lists(world: &mut World) {
    let units = &world.units;
    for tile in world.map.tiles.iter_mut() {
        tile.units.sort_by_key(|id| units.get(*id).map_or(i32::MAX, |u| u.ord_map));
    }
    for city in world.cities.iter_mut() {
        city.units_supported.sort_by_key(|id| units.get(*id).map_or(i32::MAX, |u| u.ord_city));
    }
}

// ── Players ──────────────────────────────────────────────────────────────────

pub struct PlayersSection;

impl SaveSection for PlayersSection {
    fn name(&self) -> &'static str { "players" }

    fn load(&self, ctx: &mut LoadContext<'_>, world: &mut World) -> SaveResult<()> {
        if world.info.is_new_game {
            log::debug!("Savegame holds no player data, players not loaded");
            return Ok(());
        }
        for plrno in 0..world.players.len() {
            load_player_main(ctx, world, plrno)?;
            load_cities(ctx, world, plrno)?;
            load_units(ctx, world, plrno)?;
            load_player_vision(ctx, world, plrno)?;
        }

        unlink_broken_transports(world, &mut ctx.status);
        fix_alliances(world, &mut ctx.status);
        idle_illegal_activities(world, ctx.ruleset, &mut ctx.status);
        sort_unit_lists(world);

        log::debug!(
            "{} players, {} cities, {} units loaded",
            world.players.len(),
            world.cities.len(),
            world.units.len()
        );
        Ok(())
    }

    fn save(&self, ctx: &mut SaveContext<'_>, world: &World) -> SaveResult<()> {
        if !ctx.save_players {
            return Ok(());
        }
        for player in &world.players {
            save_player_main(ctx, world, player);
            save_cities(ctx, world, player.number)?;
            save_units(ctx, world, player.number)?;
            save_player_vision(ctx, world, player.number)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shuffle_is_a_permutation_and_leaves_generator_alone() {
        let rng = GameRng::seeded(7);
        let before = rng.clone();
        let order = shuffle_players(&rng, 9);
        assert!(is_permutation(&order, 9), "not a permutation: {order:?}");
        assert_eq!(rng, before);
    }

    #[test]
    fn duplicate_shuffle_entries_are_rejected() {
        assert!(!is_permutation(&[0, 0, 1], 3));
        assert!(!is_permutation(&[0, 1], 3));
        assert!(is_permutation(&[2, 0, 1], 3));
    }

    #[test]
    fn attribute_block_survives_part_splitting() {
        let block: Vec<u8> = (0..700u32).map(|i| (i * 7 % 251) as u8).collect();
        let mut file = SectionFile::new();
        save_attribute_block(&mut file, "player0", &block);
        assert!(file.lookup_int_or("player0.attribute_v2_block_parts", 0) > 1);

        let mut status = LoadStatus::new();
        let loaded = load_attribute_block(&file, &mut status, "player0");
        assert_eq!(loaded, block);
        assert_eq!(status.warnings().count(), 0);
    }

    #[test]
    fn attribute_block_with_huge_prefix_is_dropped() {
        let part = "6148914691236517206:00 ";
        let mut file = SectionFile::new();
        file.set_int("player0.attribute_v2_block_length", 1);
        file.set_int("player0.attribute_v2_block_length_quoted", part.len() as i64);
        file.set_int("player0.attribute_v2_block_parts", 1);
        file.set_str("player0.attribute_v2_block_data.part0", part);

        let mut status = LoadStatus::new();
        let loaded = load_attribute_block(&file, &mut status, "player0");
        assert!(loaded.is_empty());
        assert!(status.is_ok(), "A bad block is a warning, not a failure");
        assert_eq!(status.warnings().count(), 1);
    }
}
