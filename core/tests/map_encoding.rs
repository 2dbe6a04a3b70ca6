//! Map rows and order tables, checked against the written file.
//!
//! Tests:
//!   1. Hut + River on one tile is digit '3' in the first special grid
//!   2. A reversed specials table decodes to the same flags
//!   3. A special name this build does not know drops its bits only
//!   4. A short terrain row is a warning, the rest still loads
//!   5. An unknown terrain character aborts with a ruleset mismatch
//!   6. Improvements are read through the writer's table order
//!   7. A map size past the map limits fails the load

use civsave_core::{
    city::City,
    config::SaveConfig,
    engine::SaveEngine,
    error::SaveError,
    map::TileSpecial,
    player::{Diplstate, Player},
    rng::GameRng,
    ruleset::Ruleset,
    sanity::sanity_check,
    secfile::SectionFile,
    world::{ServerState, World},
};

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// 4x4 grassland, one player, Hut and River on tile (1,1).
fn small_world(ruleset: &Ruleset) -> World {
    let mut world = World::new(4, 4);
    world.info.server_state = ServerState::Running;
    world.info.turn = 3;
    world.rng = GameRng::seeded(11);

    let grass = ruleset.terrain_by_identifier('g').expect("grassland");
    for tile in world.map.tiles.iter_mut() {
        tile.terrain = Some(grass);
    }
    let mut player = Player::new(0, "Solo");
    player.diplstates = vec![Diplstate::default()];
    player.love = vec![1];
    world.players.push(player);

    let t = world.map.index(1, 1).expect("tile");
    world.map.tile_mut(t).specials.insert(TileSpecial::Hut);
    world.map.tile_mut(t).specials.insert(TileSpecial::River);
    sanity_check(&mut world, ruleset, 11);
    world
}

fn saved_file(world: &World, ruleset: &Ruleset) -> SectionFile {
    init_logs();
    SaveEngine::build(11)
        .save(world, ruleset, &SaveConfig::default(), "encoding test")
        .expect("save")
}

fn load(file: &mut SectionFile, ruleset: &Ruleset) -> Result<(World, Vec<String>), SaveError> {
    let mut world = World::default();
    let report = SaveEngine::build(11).load(file, ruleset, &mut world)?;
    Ok((world, report.warnings))
}

/// Overwrite every row of one special grid with zeros, then set one digit.
fn write_grid(file: &mut SectionFile, grid: usize, digit_at: Option<(usize, usize, char)>) {
    for y in 0..4 {
        let mut row: Vec<char> = "0000".chars().collect();
        if let Some((x, dy, ch)) = digit_at {
            if dy == y {
                row[x] = ch;
            }
        }
        let row: String = row.into_iter().collect();
        file.set_str(&format!("map.spe{grid:02}_{y:04}"), &row);
    }
}

// ─── Test 1: Digit layout ─────────────────────────────────────────────────────

#[test]
fn hut_and_river_are_digit_three() {
    let ruleset = Ruleset::classic();
    let file = saved_file(&small_world(&ruleset), &ruleset);

    assert_eq!(file.lookup_str("map.spe00_0001"), Some("0300"));
    assert_eq!(file.lookup_str("map.spe00_0000"), Some("0000"));
    assert_eq!(
        file.lookup_str_list("savefile.specials_vector").expect("specials vector")[..2],
        ["Hut".to_string(), "River".to_string()]
    );
}

// ─── Test 2: Reversed table ───────────────────────────────────────────────────

#[test]
fn reversed_specials_table_decodes_same_flags() {
    let ruleset = Ruleset::classic();
    let mut file = saved_file(&small_world(&ruleset), &ruleset);

    let mut names = file.lookup_str_list("savefile.specials_vector").expect("specials vector");
    names.reverse();
    assert_eq!(names.len(), 7);
    file.set_str_list("savefile.specials_vector", &names);

    // River is now slot 5 and Hut slot 6: grid 1, bits 1 and 2.
    write_grid(&mut file, 0, None);
    write_grid(&mut file, 1, Some((1, 1, '6')));

    let (world, _) = load(&mut file, &ruleset).expect("load with reversed table");
    let t = world.map.index(1, 1).expect("tile");
    let specials = world.map.tile(t).specials;
    assert!(specials.contains(TileSpecial::Hut), "Hut lost under reversed table");
    assert!(specials.contains(TileSpecial::River), "River lost under reversed table");
    assert_eq!(specials.len(), 2, "Reversed table produced extra flags: {specials:?}");
}

// ─── Test 3: Unknown name ─────────────────────────────────────────────────────

#[test]
fn unknown_special_name_drops_only_its_bits() {
    let ruleset = Ruleset::classic();
    let mut file = saved_file(&small_world(&ruleset), &ruleset);

    file.set_int("savefile.specials_size", 3);
    file.set_str_list("savefile.specials_vector", &["Hut", "Volcano", "River"]);
    write_grid(&mut file, 0, Some((1, 1, '7')));

    let (world, warnings) = load(&mut file, &ruleset).expect("load with unknown special");
    let t = world.map.index(1, 1).expect("tile");
    let specials = world.map.tile(t).specials;
    assert!(specials.contains(TileSpecial::Hut));
    assert!(specials.contains(TileSpecial::River));
    assert_eq!(specials.len(), 2, "Unknown slot must not map to any flag");
    assert!(
        warnings.iter().any(|w| w.contains("Volcano")),
        "Expected a warning naming the unknown special, got {warnings:?}"
    );
}

// ─── Test 4: Short row ────────────────────────────────────────────────────────

#[test]
fn short_terrain_row_warns_and_loads_prefix() {
    let ruleset = Ruleset::classic();
    let mut file = saved_file(&small_world(&ruleset), &ruleset);
    file.set_str("map.t0002", "hh");

    let (world, warnings) = load(&mut file, &ruleset).expect("short row must not fail the load");
    let hills = ruleset.terrain_by_identifier('h').expect("hills");
    assert_eq!(world.map.tile(world.map.index(0, 2).expect("tile")).terrain, Some(hills));
    assert_eq!(world.map.tile(world.map.index(1, 2).expect("tile")).terrain, Some(hills));
    assert_eq!(
        world.map.tile(world.map.index(3, 2).expect("tile")).terrain,
        None,
        "Tiles past a short row stay unset"
    );
    assert!(
        warnings.iter().any(|w| w.contains("Incomplete map data")),
        "Expected an incomplete-row warning, got {warnings:?}"
    );
}

// ─── Test 5: Unknown terrain ──────────────────────────────────────────────────

#[test]
fn unknown_terrain_identifier_is_a_ruleset_mismatch() {
    let ruleset = Ruleset::classic();
    let mut file = saved_file(&small_world(&ruleset), &ruleset);
    file.set_str("map.t0000", "gZgg");

    match load(&mut file, &ruleset) {
        Err(SaveError::RulesetMismatch { value, .. }) => assert_eq!(value, "Z"),
        other => panic!("Expected RulesetMismatch, got {:?}", other.map(|(_, w)| w)),
    }
}

// ─── Test 6: Improvement table ────────────────────────────────────────────────

#[test]
fn improvements_follow_writer_order() {
    let ruleset = Ruleset::classic();
    let mut world = small_world(&ruleset);
    let t = world.map.index(2, 2).expect("tile");
    let mut city = City::new(7, 0, t, "Ur", 1);
    city.specialists = vec![1, 0, 0];
    let temple = ruleset.improvement_by_name("Temple").expect("temple");
    city.improvements.insert(temple);
    world.create_city(city).expect("create city");
    let mut file = saved_file(&world, &ruleset);

    // The writer listed only two improvements, Temple first.
    file.set_int("savefile.improvement_size", 2);
    file.set_str_list("savefile.improvement_vector", &["Temple", "Granary"]);
    file.set_str("player0.c0.improvements", "10");

    let (loaded, _) = load(&mut file, &ruleset).expect("load");
    let city = loaded.cities.get(7).expect("city");
    assert_eq!(city.improvements.iter().copied().collect::<Vec<_>>(), vec![temple]);
}

// ─── Test 7: Map size limits ──────────────────────────────────────────────────

#[test]
fn oversized_map_fails_the_load() {
    let ruleset = Ruleset::classic();
    let world = small_world(&ruleset);
    let saved = saved_file(&world, &ruleset);
    assert_eq!(saved.lookup_str("settings.set0.name"), Some("xsize"));
    assert_eq!(saved.lookup_str("settings.set1.name"), Some("ysize"));

    for (xsize, ysize) in [("5000000000", "5000000000"), ("201", "4"), ("4", "0")] {
        let mut file = saved.clone();
        file.set_str("settings.set0.value", xsize);
        file.set_str("settings.set1.value", ysize);
        match load(&mut file, &ruleset) {
            Err(SaveError::LoadFailed { message }) => assert!(
                message.contains("map limits"),
                "Unexpected failure text for {xsize}x{ysize}: {message}"
            ),
            Err(other) => panic!("Expected LoadFailed for {xsize}x{ysize}, got {other}"),
            Ok(_) => panic!("A {xsize}x{ysize} map must not load"),
        }
    }
}
