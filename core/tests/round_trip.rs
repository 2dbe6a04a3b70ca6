//! Save a running game, load it back, compare.
//!
//! The world is settled with one sanity pass first so derived caches
//! (build lists, scores, game id) already hold their final values.
//!
//! Tests:
//!   1. Terrain, tile sets, borders and known masks survive
//!   2. Players, research and the attribute block survive
//!   3. Cities and units survive, including orders and cargo
//!   4. Game info and the generator continue unchanged
//!   5. The reloaded world saves to the same text
//!   6. Scenario without players reloads as a pre-game map
//!   7. A file that withholds player data skips players and borders

use civsave_core::{
    city::{City, Production},
    config::SaveConfig,
    engine::SaveEngine,
    map::{Direction, TileSpecial},
    player::{Diplstate, Player, TechRef},
    rng::GameRng,
    ruleset::Ruleset,
    sanity::{sanity_check, valid_game_id},
    secfile::SectionFile,
    unit::{Activity, OrderKind, Unit, UnitOrder, UnitOrders},
    world::{ServerState, World},
};

const SEED: u64 = 0x5A7E_0001;

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn tile(world: &World, x: i64, y: i64) -> usize {
    world.map.index(x, y).expect("tile on the map")
}

/// A 6x4 running game. Column 5 is ocean, everything else grassland.
/// Player 0 holds the west half, player 1 the east.
fn build_world(ruleset: &Ruleset) -> World {
    let mut world = World::new(6, 4);
    world.info.server_state = ServerState::Running;
    world.info.turn = 42;
    world.info.year = -2000;
    world.rng = GameRng::seeded(SEED);

    let grass = ruleset.terrain_by_identifier('g').expect("grassland");
    let ocean = ruleset.terrain_by_identifier(' ').expect("ocean");
    let xsize = world.map.xsize;
    for (t, tile) in world.map.tiles.iter_mut().enumerate() {
        tile.terrain = Some(if t % xsize == 5 { ocean } else { grass });
    }

    for p in 0..2 {
        let mut player = Player::new(p, &format!("Leader{p}"));
        player.diplstates = vec![Diplstate::default(); 2];
        player.love = vec![1; 2];
        player.government = ruleset.government_by_name("Despotism").expect("despotism");
        world.players.push(player);
    }
    world.shuffled_order = vec![1, 0];

    let research = &mut world.players[0].research;
    research.known.insert(ruleset.tech_by_name("Bronze Working").expect("tech"));
    research.known.insert(ruleset.tech_by_name("Masonry").expect("tech"));
    research.researching = TechRef::Tech(ruleset.tech_by_name("Currency").expect("tech"));
    research.goal = TechRef::Unset;
    research.bulbs_researched = 17;
    world.players[1].attribute_block = (0..=255u8).cycle().take(800).collect();
    world.players[1].gold = 123;

    // Tile features.
    let t11 = tile(&world, 1, 1);
    let t21 = tile(&world, 2, 1);
    let t22 = tile(&world, 2, 2);
    let t32 = tile(&world, 3, 2);
    let road = ruleset.road_by_name("Road").expect("road");
    let rail = ruleset.road_by_name("Railroad").expect("railroad");
    let fortress = ruleset.base_by_name("Fortress").expect("fortress");
    world.map.tile_mut(t11).specials.insert(TileSpecial::Irrigation);
    world.map.tile_mut(t11).specials.insert(TileSpecial::River);
    world.map.tile_mut(t11).roads.insert(road);
    world.map.tile_mut(t21).specials.insert(TileSpecial::Mine);
    world.map.tile_mut(t22).roads.insert(road);
    world.map.tile_mut(t22).roads.insert(rail);
    world.map.tile_mut(t32).bases.insert(fortress);
    world.map.tile_mut(0).resource = Some(ruleset.resource_by_identifier('w').expect("wheat"));

    let t42 = tile(&world, 4, 2);
    for t in 0..world.map.tile_count() {
        let (x, _) = world.map.native_pos(t);
        let (owner, claimer) = if x < 3 { (0, t11) } else { (1, t42) };
        let tile = world.map.tile_mut(t);
        tile.owner = Some(owner);
        tile.claimer = Some(claimer);
        tile.known.insert(0);
        if x >= 2 {
            tile.known.insert(1);
        }
    }

    // Cities.
    let mut capital = City::new(101, 0, t11, "Roma", 2);
    capital.specialists = vec![1, 0, 0];
    capital.worked.push(t21);
    capital.citizens.insert(0, 2);
    capital.improvements.insert(ruleset.improvement_by_name("Palace").expect("palace"));
    capital.improvements.insert(ruleset.improvement_by_name("Barracks").expect("barracks"));
    capital.production = Production::Improvement(ruleset.improvement_by_name("City Walls").expect("walls"));
    capital.changed_from = capital.production;
    capital.worklist = vec![
        Production::Unit(ruleset.unit_type_by_name("Warriors").expect("warriors")),
        Production::Improvement(ruleset.improvement_by_name("Temple").expect("temple")),
    ];
    capital.food_stock = 9;
    world.create_city(capital).expect("create Roma");
    world.map.tile_mut(t21).worked = Some(101);

    let mut colony = City::new(201, 1, t42, "Athens", 1);
    colony.specialists = vec![0, 1, 0];
    colony.citizens.insert(1, 1);
    colony.production = Production::Unit(ruleset.unit_type_by_name("Phalanx").expect("phalanx"));
    colony.changed_from = colony.production;
    world.create_city(colony).expect("create Athens");

    // Units, one per tile except the loaded boat.
    let settlers = ruleset.unit_type_by_name("Settlers").expect("settlers");
    let workers = ruleset.unit_type_by_name("Workers").expect("workers");
    let warriors = ruleset.unit_type_by_name("Warriors").expect("warriors");
    let trireme = ruleset.unit_type_by_name("Trireme").expect("trireme");

    let mut pioneer = Unit::new(102, 0, settlers, tile(&world, 0, 1));
    pioneer.homecity = Some(101);
    pioneer.orders = Some(UnitOrders {
        list: vec![UnitOrder::move_to(Direction::East), UnitOrder::new(OrderKind::BuildCity)],
        index: 0,
        repeat: false,
        vigilant: false,
    });
    world.place_unit(pioneer).expect("place settlers");

    let mut miner = Unit::new(103, 0, workers, t22);
    miner.activity = Activity::Mine;
    miner.activity_count = 3;
    world.place_unit(miner).expect("place workers");

    let mut guard = Unit::new(202, 1, warriors, tile(&world, 3, 3));
    guard.homecity = Some(201);
    guard.activity = Activity::Fortified;
    world.place_unit(guard).expect("place warriors");

    let boat_tile = tile(&world, 5, 1);
    world.place_unit(Unit::new(203, 1, trireme, boat_tile)).expect("place trireme");
    let mut passenger = Unit::new(204, 1, warriors, boat_tile);
    passenger.transported_by = Some(203);
    passenger.ord_map = 1;
    world.place_unit(passenger).expect("place passenger");

    world.event_cache.push(civsave_core::world::CachedEvent {
        turn: 41,
        kind: "E_CITY_BUILD".to_string(),
        message: "Roma builds Barracks".to_string(),
        target: Some(0),
    });
    world.mapimg_defs.push("zoom=2:map=tcu".to_string());
    world
}

fn settled_world(ruleset: &Ruleset) -> World {
    let mut world = build_world(ruleset);
    sanity_check(&mut world, ruleset, SEED);
    world
}

fn round_trip(world: &World, ruleset: &Ruleset, config: &SaveConfig) -> (SectionFile, World) {
    init_logs();
    let engine = SaveEngine::build(SEED);
    let mut file = engine.save(world, ruleset, config, "round trip").expect("save");
    let saved = file.clone();
    let mut loaded = World::default();
    let report = engine.load(&mut file, ruleset, &mut loaded).expect("load");

    // Build lists and scores are never saved, so only those get recomputed.
    let repairs = &report.repairs;
    assert!(
        repairs.units_bounced.is_empty()
            && repairs.units_removed.is_empty()
            && repairs.units_evicted.is_empty()
            && !repairs.rng_reseeded
            && !repairs.game_id_generated,
        "A settled world should need no repairs, got {repairs:?}"
    );
    (saved, loaded)
}

// ─── Test 1: Map ──────────────────────────────────────────────────────────────

#[test]
fn map_survives_round_trip() {
    let ruleset = Ruleset::classic();
    let world = settled_world(&ruleset);
    let (_, loaded) = round_trip(&world, &ruleset, &SaveConfig::default());

    assert_eq!(loaded.map.xsize, 6);
    assert_eq!(loaded.map.ysize, 4);
    for t in 0..world.map.tile_count() {
        assert_eq!(
            loaded.map.tile(t),
            world.map.tile(t),
            "Tile {t} differs after reload"
        );
    }
}

// ─── Test 2: Players ──────────────────────────────────────────────────────────

#[test]
fn players_survive_round_trip() {
    let ruleset = Ruleset::classic();
    let world = settled_world(&ruleset);
    let (_, loaded) = round_trip(&world, &ruleset, &SaveConfig::default());

    assert_eq!(loaded.players.len(), 2);
    assert_eq!(loaded.shuffled_order, vec![1, 0]);
    for (a, b) in world.players.iter().zip(loaded.players.iter()) {
        assert_eq!(a.name, b.name);
        assert_eq!(a.government, b.government, "government of {}", a.name);
        assert_eq!(a.research, b.research, "research of {}", a.name);
        assert_eq!(a.diplstates, b.diplstates, "diplomacy of {}", a.name);
        assert_eq!(a.love, b.love);
        assert_eq!(a.gold, b.gold);
        assert_eq!(a.score, b.score, "score of {}", a.name);
    }
    assert_eq!(
        loaded.players[1].attribute_block.len(),
        800,
        "Attribute block spanning two parts must reload whole"
    );
    assert_eq!(loaded.players[1].attribute_block, world.players[1].attribute_block);
}

// ─── Test 3: Cities and units ─────────────────────────────────────────────────

#[test]
fn cities_and_units_survive_round_trip() {
    let ruleset = Ruleset::classic();
    let world = settled_world(&ruleset);
    let (_, loaded) = round_trip(&world, &ruleset, &SaveConfig::default());

    assert_eq!(loaded.cities.len(), world.cities.len());
    for city in world.cities.iter() {
        let other = loaded.cities.get(city.id).expect("city reloaded");
        assert_eq!(other, city, "City {} differs after reload", city.name);
    }

    assert_eq!(loaded.units.len(), world.units.len());
    for unit in world.units.iter() {
        let other = loaded.units.get(unit.id).expect("unit reloaded");
        assert_eq!(other, unit, "Unit {} differs after reload", unit.id);
    }

    let passenger = loaded.units.get(204).expect("passenger");
    assert_eq!(passenger.transported_by, Some(203));
    let orders = loaded.units.get(102).and_then(|u| u.orders.as_ref()).expect("orders");
    assert_eq!(orders.list.len(), 2);
    assert_eq!(orders.list[1].kind, OrderKind::BuildCity);
}

// ─── Test 4: Game info and generator ──────────────────────────────────────────

#[test]
fn game_info_and_generator_survive_round_trip() {
    let ruleset = Ruleset::classic();
    let world = settled_world(&ruleset);
    assert!(valid_game_id(&world.info.id), "sanity pass must assign a game id");
    let (_, mut loaded) = round_trip(&world, &ruleset, &SaveConfig::default());

    assert_eq!(loaded.info.turn, 42);
    assert_eq!(loaded.info.year, -2000);
    assert_eq!(loaded.info.server_state, ServerState::Running);
    assert_eq!(loaded.info.id, world.info.id);
    assert_eq!(loaded.event_cache, world.event_cache);
    assert_eq!(loaded.mapimg_defs, world.mapimg_defs);

    let mut original = world.rng.clone();
    let a: Vec<u32> = (0..20).map(|_| original.next_below(1000)).collect();
    let b: Vec<u32> = (0..20).map(|_| loaded.rng.next_below(1000)).collect();
    assert_eq!(a, b, "Generator must continue the same sequence after reload");
}

// ─── Test 5: Stable re-save ───────────────────────────────────────────────────

#[test]
fn reloaded_world_saves_identically() {
    let ruleset = Ruleset::classic();
    let world = settled_world(&ruleset);
    let config = SaveConfig::default();
    let (saved, loaded) = round_trip(&world, &ruleset, &config);

    let engine = SaveEngine::build(SEED);
    let resaved = engine.save(&loaded, &ruleset, &config, "round trip").expect("re-save");
    assert_eq!(
        saved.to_text(),
        resaved.to_text(),
        "Saving a reloaded world must reproduce the file"
    );
}

// ─── Test 6: Scenario skeleton ────────────────────────────────────────────────

#[test]
fn scenario_without_players_reloads_as_pregame_map() {
    init_logs();
    let ruleset = Ruleset::classic();
    let world = settled_world(&ruleset);
    let config = SaveConfig { rivers_overlay: true, ..SaveConfig::scenario_without_players() };

    let engine = SaveEngine::build(SEED);
    let mut file = engine.save(&world, &ruleset, &config, "scenario").expect("save scenario");
    assert_eq!(file.lookup_int("players.nplayers"), Some(0));
    assert!(!file.contains("event_cache.count"), "Scenario saves carry no event cache");

    let mut loaded = World::default();
    engine.load(&mut file, &ruleset, &mut loaded).expect("load scenario");

    assert!(loaded.scenario.is_scenario);
    assert!(loaded.info.is_new_game);
    assert_eq!(loaded.info.server_state, ServerState::Initial);
    assert!(loaded.players.is_empty());
    assert!(loaded.cities.is_empty());

    let t11 = tile(&loaded, 1, 1);
    let specials = loaded.map.tile(t11).specials;
    assert!(specials.contains(TileSpecial::River), "Rivers survive the overlay");
    assert!(
        !specials.contains(TileSpecial::Irrigation),
        "Only rivers are written in a rivers overlay"
    );
    assert_eq!(loaded.map.tile(0).resource, None, "Rivers overlay drops resources");
    assert_eq!(loaded.map.tile(t11).terrain, world.map.tile(t11).terrain);
}

// ─── Test 7: Player data withheld ─────────────────────────────────────────────

#[test]
fn withheld_player_data_skips_players_and_borders() {
    init_logs();
    let ruleset = Ruleset::classic();
    let world = settled_world(&ruleset);
    let engine = SaveEngine::build(SEED);
    let saved = engine.save(&world, &ruleset, &SaveConfig::default(), "withheld").expect("save");

    let mut file = saved.clone();
    file.remove("game.save_players");
    let mut loaded = World::default();
    engine.load(&mut file, &ruleset, &mut loaded).expect("load without flag");
    assert!(!loaded.info.is_new_game, "A missing flag means players were saved");
    assert_eq!(loaded.cities.len(), 2);

    let mut file = saved;
    file.set_bool("game.save_players", false);
    let mut loaded = World::default();
    let report = engine.load(&mut file, &ruleset, &mut loaded).expect("load withheld");
    assert!(loaded.info.is_new_game);
    assert!(loaded.cities.is_empty(), "Cities loaded from a file without player data");
    assert!(loaded.units.is_empty());
    assert!(loaded.map.tiles.iter().all(|t| t.owner.is_none()), "Borders were loaded");
    assert!(report.repairs.is_empty(), "Sanity pass ran on a new game: {:?}", report.repairs);
}
