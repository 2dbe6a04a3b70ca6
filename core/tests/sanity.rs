//! Post-load repair pass.
//!
//! Tests:
//!   1. A second run after repairs reports nothing
//!   2. A unit with nowhere to go is removed
//!   3. A carrier bounced off land takes its cargo along
//!   4. A tied stack belongs to the first owner in it
//!   5. Allied units share a tile undisturbed
//!   6. A broken id is replaced without moving the generator

use civsave_core::{
    city::City,
    player::{DiplState, Diplstate, Player},
    rng::GameRng,
    ruleset::Ruleset,
    sanity::{sanity_check, valid_game_id},
    unit::{Activity, ActivityTarget, Unit},
    world::{ServerState, World},
};

const SEED: u64 = 77;

/// `xsize` x `ysize` grassland with the given ocean columns and two
/// players who have never met.
fn world_with(xsize: usize, ysize: usize, ocean_columns: &[usize], ruleset: &Ruleset) -> World {
    let mut world = World::new(xsize, ysize);
    world.info.server_state = ServerState::Running;
    world.rng = GameRng::seeded(SEED);

    let grass = ruleset.terrain_by_identifier('g').expect("grassland");
    let ocean = ruleset.terrain_by_identifier(' ').expect("ocean");
    for (t, tile) in world.map.tiles.iter_mut().enumerate() {
        let x = t % xsize;
        tile.terrain = Some(if ocean_columns.contains(&x) { ocean } else { grass });
    }
    for p in 0..2 {
        world.players.push(Player::new(p, &format!("P{p}")));
    }
    world
}

fn unit(ruleset: &Ruleset, id: u32, owner: usize, type_name: &str, tile: usize) -> Unit {
    let utype = ruleset.unit_type_by_name(type_name).expect("unit type");
    Unit::new(id, owner, utype, tile)
}

fn ally(world: &mut World, a: usize, b: usize) {
    for (p, q) in [(a, b), (b, a)] {
        let player = &mut world.players[p];
        player.diplstates = vec![Diplstate::default(); 2];
        player.diplstates[q].kind = DiplState::Alliance;
    }
}

// ─── Test 1: Fixed point ──────────────────────────────────────────────────────

#[test]
fn second_run_reports_nothing() {
    let ruleset = Ruleset::classic();
    let mut world = world_with(5, 5, &[4], &ruleset);
    world.rng = GameRng::uninitialized();
    let road = ruleset.road_by_name("Road").expect("road");

    let mut city = City::new(50, 0, 6, "Home", 1);
    city.specialists = vec![1, 0, 0];
    world.create_city(city).expect("city");

    // Land unit at sea, intruder in a foreign city, two pillagers.
    world.place_unit(unit(&ruleset, 1, 0, "Warriors", 4)).expect("place");
    world.place_unit(unit(&ruleset, 2, 1, "Warriors", 6)).expect("place");
    world.map.tile_mut(17).roads.insert(road);
    let mut raider = unit(&ruleset, 3, 0, "Warriors", 17);
    raider.activity = Activity::Pillage;
    world.place_unit(raider).expect("place");
    let mut idle_raider = unit(&ruleset, 4, 0, "Warriors", 15);
    idle_raider.activity = Activity::Pillage;
    world.place_unit(idle_raider).expect("place");

    let first = sanity_check(&mut world, &ruleset, SEED);
    assert_eq!(first.units_bounced, vec![1], "Land unit at sea must bounce");
    assert_eq!(first.units_evicted, vec![2], "Foreign unit in a city must leave");
    assert_eq!(first.pillage_targets, vec![3]);
    assert_eq!(first.units_idled, vec![4]);
    assert!(first.rng_reseeded);
    assert!(first.game_id_generated);
    assert_eq!(first.caches_rebuilt, 1);

    assert_eq!(world.units.get(1).map(|u| u.tile), Some(3), "Nearest land is west");
    assert_eq!(world.units.get(2).map(|u| u.tile), Some(1), "Nearest free tile, lowest index first");
    assert_eq!(
        world.units.get(3).map(|u| u.activity_target),
        Some(ActivityTarget::Road(road))
    );
    assert_eq!(world.units.get(4).map(|u| u.activity), Some(Activity::Idle));

    let second = sanity_check(&mut world, &ruleset, SEED);
    assert!(second.is_empty(), "Second run must be a no-op, got {second:?}");
}

// ─── Test 2: Removal ──────────────────────────────────────────────────────────

#[test]
fn unit_with_nowhere_to_go_is_removed() {
    let ruleset = Ruleset::classic();
    let mut world = world_with(3, 3, &[0, 1, 2], &ruleset);
    world.place_unit(unit(&ruleset, 8, 0, "Phalanx", 4)).expect("place");

    let report = sanity_check(&mut world, &ruleset, SEED);
    assert_eq!(report.units_removed, vec![8]);
    assert!(report.units_bounced.is_empty());
    assert!(world.units.get(8).is_none(), "Removed unit still in the arena");
    assert!(world.map.tile(4).units.is_empty(), "Removed unit still on its tile");
}

// ─── Test 3: Cargo follows the carrier ────────────────────────────────────────

#[test]
fn bounced_carrier_takes_its_cargo() {
    let ruleset = Ruleset::classic();
    let mut world = world_with(5, 3, &[4], &ruleset);
    let start = world.map.index(2, 1).expect("tile");
    let sea = world.map.index(4, 1).expect("tile");

    world.place_unit(unit(&ruleset, 20, 0, "Trireme", start)).expect("place");
    let mut passenger = unit(&ruleset, 21, 0, "Settlers", start);
    passenger.transported_by = Some(20);
    world.place_unit(passenger).expect("place");

    let report = sanity_check(&mut world, &ruleset, SEED);
    assert_eq!(report.units_bounced, vec![20], "Only the boat is out of place");
    assert_eq!(world.units.get(20).map(|u| u.tile), Some(sea));
    assert_eq!(world.units.get(21).map(|u| u.tile), Some(sea), "Cargo left behind");
    assert_eq!(world.units.get(21).and_then(|u| u.transported_by), Some(20));
    assert!(world.map.tile(start).units.is_empty());
}

// ─── Test 4: Tie on a shared tile ─────────────────────────────────────────────

#[test]
fn tied_stack_belongs_to_first_owner() {
    let ruleset = Ruleset::classic();
    let mut world = world_with(4, 4, &[], &ruleset);
    world.place_unit(unit(&ruleset, 30, 1, "Warriors", 5)).expect("place");
    world.place_unit(unit(&ruleset, 31, 0, "Warriors", 5)).expect("place");

    let report = sanity_check(&mut world, &ruleset, SEED);
    assert_eq!(report.units_evicted, vec![31], "Second owner in the stack must leave");
    assert_eq!(world.units.get(30).map(|u| u.tile), Some(5));
    assert_ne!(world.units.get(31).map(|u| u.tile), Some(5));
}

// ─── Test 5: Allies ───────────────────────────────────────────────────────────

#[test]
fn allied_units_share_a_tile() {
    let ruleset = Ruleset::classic();
    let mut world = world_with(4, 4, &[], &ruleset);
    ally(&mut world, 0, 1);
    world.place_unit(unit(&ruleset, 40, 1, "Warriors", 5)).expect("place");
    world.place_unit(unit(&ruleset, 41, 0, "Phalanx", 5)).expect("place");

    let report = sanity_check(&mut world, &ruleset, SEED);
    assert!(report.units_evicted.is_empty(), "Allies were evicted: {report:?}");
    assert_eq!(world.map.tile(5).units, vec![40, 41]);
}

// ─── Test 6: Game id ──────────────────────────────────────────────────────────

#[test]
fn broken_game_id_is_replaced_without_moving_generator() {
    let ruleset = Ruleset::classic();
    let mut world = world_with(4, 4, &[], &ruleset);
    world.info.id = "not an id".to_string();
    let before = world.rng.clone();

    let report = sanity_check(&mut world, &ruleset, SEED);
    assert!(report.game_id_generated);
    assert!(!report.rng_reseeded);
    assert!(valid_game_id(&world.info.id), "Generated id '{}' is invalid", world.info.id);
    assert_eq!(world.rng, before, "Id generation must not advance the generator");
}
