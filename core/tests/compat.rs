//! Format migration tests.
//!
//! Tests:
//!   1. Pending thresholds are ascending and only above the file version
//!   2. A transform applied twice changes nothing the second time
//!   3. An older savegame loads through the remaining transforms
//!   4. A file without a version fails the load
//!   5. A file newer than this build warns in debug builds, fails in release

use civsave_core::{
    compat::{CompatPipeline, CompatTransform, Release2_6, CURRENT_FORMAT_VERSION, VERSION_KEY},
    config::SaveConfig,
    engine::SaveEngine,
    error::{LoadStatus, SaveError},
    player::{Diplstate, Player},
    rng::GameRng,
    ruleset::Ruleset,
    sanity::sanity_check,
    secfile::SectionFile,
    unit::{Activity, Unit},
    world::{ServerState, World},
};

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// One player with a sentried warrior on a 4x4 grassland map, saved
/// at the current format.
fn current_save(ruleset: &Ruleset) -> SectionFile {
    let mut world = World::new(4, 4);
    world.info.server_state = ServerState::Running;
    world.rng = GameRng::seeded(5);
    let grass = ruleset.terrain_by_identifier('g').expect("grassland");
    for tile in world.map.tiles.iter_mut() {
        tile.terrain = Some(grass);
    }
    let mut player = Player::new(0, "Solo");
    player.diplstates = vec![Diplstate::default()];
    player.love = vec![1];
    world.players.push(player);

    let warriors = ruleset.unit_type_by_name("Warriors").expect("warriors");
    let mut unit = Unit::new(9, 0, warriors, 5);
    unit.activity = Activity::Sentry;
    world.place_unit(unit).expect("place unit");
    sanity_check(&mut world, ruleset, 5);

    SaveEngine::build(5)
        .save(&world, ruleset, &SaveConfig::default(), "compat test")
        .expect("save")
}

// ─── Test 1: Monotonic thresholds ─────────────────────────────────────────────

#[test]
fn pending_thresholds_are_ascending_and_above_version() {
    let pipeline = CompatPipeline::standard();
    assert_eq!(pipeline.current_version(), CURRENT_FORMAT_VERSION);

    for version in [3, 9, 10, 15, 20, 29, 30] {
        let pending = pipeline.pending(version);
        assert!(
            pending.windows(2).all(|w| w[0] < w[1]),
            "Thresholds for version {version} not ascending: {pending:?}"
        );
        assert!(
            pending.iter().all(|&t| t > version && t <= CURRENT_FORMAT_VERSION),
            "Version {version} got out-of-range thresholds: {pending:?}"
        );
    }
    assert_eq!(pipeline.pending(3), vec![10, 20, 30]);
    assert_eq!(pipeline.pending(20), vec![30]);
    assert!(pipeline.pending(CURRENT_FORMAT_VERSION).is_empty());
}

// ─── Test 2: Idempotent apply ─────────────────────────────────────────────────

#[test]
fn transform_applied_twice_is_a_no_op_the_second_time() {
    let ruleset = Ruleset::classic();
    let mut file = SectionFile::new();
    file.set_int(VERSION_KEY, 20);
    file.set_int("players.nplayers", 1);
    file.set_int("player0.ncities", 0);
    file.set_int("player0.nunits", 1);
    file.set_str("player0.u0.activity", "s");
    file.set_str("player0.u0.changed_from", "w");

    let mut status = LoadStatus::new();
    let first = Release2_6.apply(&mut file, &ruleset, &mut status).expect("first apply");
    assert!(first, "A version 20 file needs the 2.6 transform");
    assert_eq!(file.lookup_str("player0.u0.activity"), Some("w"));
    assert_eq!(file.lookup_str("player0.u0.changed_from"), Some("n"));
    assert_eq!(file.lookup_int(VERSION_KEY), Some(30));

    let snapshot = file.to_text();
    let second = Release2_6.apply(&mut file, &ruleset, &mut status).expect("second apply");
    assert!(!second, "Second apply must report nothing done");
    assert_eq!(file.to_text(), snapshot, "Second apply changed the file");
}

// ─── Test 3: Loading an older file ────────────────────────────────────────────

#[test]
fn older_savegame_loads_through_remaining_transforms() {
    init_logs();
    let ruleset = Ruleset::classic();
    let mut file = current_save(&ruleset);
    assert_eq!(file.lookup_str("player0.u0.activity"), Some("w"));

    // Rewrite as the 2.5 writer would have: sentry was 's'.
    file.set_int(VERSION_KEY, 20);
    file.set_str("player0.u0.activity", "s");

    let mut world = World::default();
    let report = SaveEngine::build(5).load(&mut file, &ruleset, &mut world).expect("load");
    assert_eq!(report.file_version, 20);
    assert_eq!(report.applied_transforms, vec![30]);
    assert_eq!(
        world.units.get(9).map(|u| u.activity),
        Some(Activity::Sentry),
        "Legacy sentry character must migrate"
    );
}

// ─── Test 4: Missing version ──────────────────────────────────────────────────

#[test]
fn missing_version_fails_the_load() {
    init_logs();
    let ruleset = Ruleset::classic();
    let mut file = current_save(&ruleset);
    file.remove(VERSION_KEY);

    let mut world = World::default();
    match SaveEngine::build(5).load(&mut file, &ruleset, &mut world) {
        Err(SaveError::LoadFailed { message }) => assert!(
            message.contains("no usable format version"),
            "Unexpected failure text: {message}"
        ),
        Err(other) => panic!("Expected LoadFailed, got {other}"),
        Ok(_) => panic!("A file without a version must not load"),
    }
}

// ─── Test 5: Newer than current ───────────────────────────────────────────────

#[test]
fn newer_version_warns_in_debug_and_fails_in_release() {
    init_logs();
    let ruleset = Ruleset::classic();
    let pipeline = CompatPipeline::standard();
    let newer = CURRENT_FORMAT_VERSION + 1;
    let mut file = SectionFile::new();
    file.set_int(VERSION_KEY, newer);

    let mut status = LoadStatus::new();
    let result = pipeline.run(&mut file, &ruleset, &mut status);
    if cfg!(debug_assertions) {
        let applied = result.expect("debug builds try newer files");
        assert!(applied.is_empty(), "Nothing to apply above current, got {applied:?}");
        assert!(status.is_ok());
        assert_eq!(status.warnings().count(), 1);
        assert_eq!(file.lookup_int(VERSION_KEY), Some(newer), "Version must be left alone");
    } else {
        match result {
            Err(SaveError::VersionUnsupported { found, current }) => {
                assert_eq!(found, newer);
                assert_eq!(current, CURRENT_FORMAT_VERSION);
            }
            other => panic!("Expected VersionUnsupported, got {other:?}"),
        }
    }
}
