//! City entries as read back from a savegame.
//!
//! Tests:
//!   1. The legacy "founded this turn" marker becomes the current turn
//!   2. Specialist counts past any city size are ignored and repaired
//!   3. A city founded on a worked tile takes it from the other city

use civsave_core::{
    city::City,
    config::SaveConfig,
    engine::SaveEngine,
    player::{Diplstate, Player},
    rng::GameRng,
    ruleset::Ruleset,
    sanity::sanity_check,
    secfile::SectionFile,
    world::{ServerState, World},
};

const SEED: u64 = 31;
const CITY_ID: u32 = 40;

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// 4x4 grassland on turn 12 with one size-1 city on tile 5.
fn build_world(ruleset: &Ruleset) -> World {
    let mut world = World::new(4, 4);
    world.info.server_state = ServerState::Running;
    world.info.turn = 12;
    world.rng = GameRng::seeded(SEED);
    let grass = ruleset.terrain_by_identifier('g').expect("grassland");
    for tile in world.map.tiles.iter_mut() {
        tile.terrain = Some(grass);
    }
    let mut player = Player::new(0, "Solo");
    player.diplstates = vec![Diplstate::default()];
    player.love = vec![1];
    world.players.push(player);

    let mut city = City::new(CITY_ID, 0, 5, "Uruk", 1);
    city.specialists = vec![1, 0, 0];
    city.turn_founded = 4;
    world.create_city(city).expect("create city");
    sanity_check(&mut world, ruleset, SEED);
    world
}

fn saved_file(ruleset: &Ruleset) -> SectionFile {
    init_logs();
    let world = build_world(ruleset);
    SaveEngine::build(SEED)
        .save(&world, ruleset, &SaveConfig::default(), "city test")
        .expect("save")
}

fn load(file: &mut SectionFile, ruleset: &Ruleset) -> (City, Vec<String>) {
    let mut world = World::default();
    let report = SaveEngine::build(SEED).load(file, ruleset, &mut world).expect("load");
    let city = world.cities.get(CITY_ID).cloned().expect("city reloaded");
    (city, report.warnings)
}

// ─── Test 1: Legacy founding marker ───────────────────────────────────────────

#[test]
fn legacy_founded_marker_becomes_current_turn() {
    let ruleset = Ruleset::classic();
    let mut file = saved_file(&ruleset);
    assert_eq!(file.lookup_int("player0.c0.turn_founded"), Some(4));

    file.set_int("player0.c0.turn_founded", -2);
    file.set_int("player0.c0.did_buy", -1);
    let (city, _) = load(&mut file.clone(), &ruleset);
    assert_eq!(city.turn_founded, 12, "Marker must resolve to the saved turn");
    assert!(!city.did_buy);

    // The marker needs both halves.
    file.set_int("player0.c0.did_buy", 1);
    let (city, _) = load(&mut file, &ruleset);
    assert_eq!(city.turn_founded, -2);
    assert!(city.did_buy);
}

// ─── Test 2: Specialist overflow ──────────────────────────────────────────────

#[test]
fn absurd_specialist_counts_are_ignored() {
    let ruleset = Ruleset::classic();
    let mut file = saved_file(&ruleset);
    file.set_int("player0.c0.nspe0", i32::MAX as i64);
    file.set_int("player0.c0.nspe1", i32::MAX as i64);

    let (city, warnings) = load(&mut file, &ruleset);
    assert_eq!(city.specialists, vec![1, 0, 0], "Size 1 with no workers is one specialist");
    assert_eq!(city.specialist_total(), city.size);
    assert!(
        warnings.iter().any(|w| w.contains("specialists of kind 1 ignored")),
        "Expected an ignored-specialists warning, got {warnings:?}"
    );
}

// ─── Test 3: Centre tile taken from a neighbour ───────────────────────────────

#[test]
fn new_city_takes_worked_centre_tile() {
    let ruleset = Ruleset::classic();
    let mut world = build_world(&ruleset);
    {
        let uruk = world.cities.get_mut(CITY_ID).expect("city");
        uruk.specialists = vec![0, 0, 0];
        uruk.worked.push(6);
    }
    world.map.tile_mut(6).worked = Some(CITY_ID);

    world.create_city(City::new(41, 0, 6, "Kish", 1)).expect("create second city");

    assert_eq!(world.map.tile(6).worked, Some(41));
    let uruk = world.cities.get(CITY_ID).expect("city");
    assert_eq!(uruk.worked, vec![5], "Released tile still listed as worked");
    assert_eq!(uruk.specialists[0], 1, "Released worker becomes a specialist");
}
