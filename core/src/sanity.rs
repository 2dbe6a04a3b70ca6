//! Post-load repair pass.
//!
//! Runs after a successful load of a started game. Every step either
//! leaves the world unchanged or moves it to a state the same step
//! accepts, so a second run reports nothing.
//!
//! Order:
//!   1. units that cannot exist on their tile are bounced or removed
//!   2. units sharing a tile with a non-allied holder are evicted, then
//!      step 1 runs again for cargo stranded by removed carriers
//!   3. pillage orders without a target get one (or go idle)
//!   4. per-city build lists are recomputed
//!   5. an invalid generator state is reseeded
//!   6. an invalid game id is regenerated
//!   7. scores are recomputed

use crate::context::{LoadContext, SaveContext};
use crate::error::SaveResult;
use crate::map::{BaseId, RoadId, TileSpecial};
use crate::player::Score;
use crate::rng::GameRng;
use crate::ruleset::{Genus, Ruleset, UnitDomain};
use crate::section::SaveSection;
use crate::types::{ImprovementId, PlayerNo, TileIndex, UnitId};
use crate::unit::{Activity, ActivityTarget, Unit};
use crate::world::World;
use serde::Serialize;
use std::collections::BTreeMap;

/// How far a misplaced unit may be moved, as a squared distance.
const BOUNCE_RADIUS_SQ: i64 = 8;

pub const GAME_ID_LENGTH: usize = 32;
const GAME_ID_CHARS: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RepairReport {
    pub units_bounced:     Vec<UnitId>,
    pub units_removed:     Vec<UnitId>,
    pub units_evicted:     Vec<UnitId>,
    pub pillage_targets:   Vec<UnitId>,
    pub units_idled:       Vec<UnitId>,
    /// Cities whose build list differed from the recomputed one.
    pub caches_rebuilt:    usize,
    pub scores_updated:    usize,
    pub rng_reseeded:      bool,
    pub game_id_generated: bool,
}

impl RepairReport {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

pub fn valid_game_id(id: &str) -> bool {
    id.len() == GAME_ID_LENGTH && id.bytes().all(|b| GAME_ID_CHARS.contains(&b))
}

/// Run every repair step in order.
pub fn sanity_check(world: &mut World, ruleset: &Ruleset, seed: u64) -> RepairReport {
    let mut report = RepairReport::default();

    relocate_illegal_units(world, ruleset, &mut report);
    evict_hostile_stacks(world, ruleset, &mut report);
    relocate_illegal_units(world, ruleset, &mut report);
    assign_pillage_targets(world, ruleset, &mut report);
    report.caches_rebuilt = rebuild_can_build(world, ruleset);

    if !world.rng.is_valid() {
        log::warn!("Generator state is invalid, reseeding");
        world.rng = GameRng::seeded(seed);
        report.rng_reseeded = true;
    }
    if !valid_game_id(&world.info.id) {
        world.info.id = generate_game_id(&mut world.rng);
        log::info!("New game id {}", world.info.id);
        report.game_id_generated = true;
    }

    report.scores_updated = update_scores(world, ruleset);
    report
}

// ── Unit placement ───────────────────────────────────────────────────────────

fn domain(ruleset: &Ruleset, unit: &Unit) -> UnitDomain {
    ruleset.unit_types.get(unit.utype).map_or(UnitDomain::Land, |t| t.domain)
}

fn carried_here(world: &World, unit: &Unit) -> bool {
    unit.transported_by
        .and_then(|t| world.units.get(t))
        .is_some_and(|carrier| carrier.id != unit.id && carrier.tile == unit.tile)
}

/// Terrain check only. Unknown terrain accepts every unit.
fn can_exist_at(world: &World, ruleset: &Ruleset, unit: &Unit, tile: TileIndex) -> bool {
    let t = world.map.tile(tile);
    if t.city.is_some() {
        return true;
    }
    let Some(terrain) = t.terrain else { return true };
    match domain(ruleset, unit) {
        UnitDomain::Air => true,
        UnitDomain::Land => !ruleset.is_ocean(terrain) || carried_here(world, unit),
        UnitDomain::Sea => ruleset.is_ocean(terrain),
    }
}

fn hostile_to(world: &World, tile: TileIndex, owner: PlayerNo) -> bool {
    let t = world.map.tile(tile);
    let city_hostile = t
        .city
        .and_then(|c| world.cities.get(c))
        .is_some_and(|c| !world.pplayers_allied(c.owner, owner));
    city_hostile
        || t.units
            .iter()
            .filter_map(|&u| world.units.get(u))
            .any(|other| !world.pplayers_allied(other.owner, owner))
}

/// Nearest tile where the unit can stand among friends, ties by index.
fn bounce_destination(world: &World, ruleset: &Ruleset, unit: &Unit) -> Option<TileIndex> {
    let mut candidates: Vec<TileIndex> = world
        .map
        .tiles_in_radius(unit.tile, BOUNCE_RADIUS_SQ)
        .into_iter()
        .filter(|&t| t != unit.tile)
        .collect();
    candidates.sort_by_key(|&t| (world.map.sq_distance(unit.tile, t), t));

    candidates.into_iter().find(|&t| {
        let terrain_ok = match world.map.tile(t).terrain {
            Some(terrain) if world.map.tile(t).city.is_none() => match domain(ruleset, unit) {
                UnitDomain::Air => true,
                UnitDomain::Land => !ruleset.is_ocean(terrain),
                UnitDomain::Sea => ruleset.is_ocean(terrain),
            },
            Some(_) => true,
            None => false,
        };
        terrain_ok && !hostile_to(world, t, unit.owner)
    })
}

/// Move a unit and its cargo, or remove the unit. Returns true if moved.
fn bounce_or_remove(world: &mut World, ruleset: &Ruleset, id: UnitId) -> bool {
    let Some(unit) = world.units.get(id).cloned() else { return false };
    let cargo: Vec<UnitId> = world
        .units
        .iter()
        .filter(|u| u.transported_by == Some(id) && u.tile == unit.tile)
        .map(|u| u.id)
        .collect();

    match bounce_destination(world, ruleset, &unit) {
        Some(dest) => {
            log::warn!("Unit {id} bounced from tile {} to {dest}", unit.tile);
            world.move_unit(id, dest);
            if let Some(moved) = world.units.get_mut(id) {
                moved.transported_by = None;
            }
            for c in cargo {
                world.move_unit(c, dest);
            }
            true
        }
        None => {
            log::warn!("Unit {id} has nowhere to go from tile {}, removed", unit.tile);
            world.remove_unit(id);
            false
        }
    }
}

fn relocate_illegal_units(world: &mut World, ruleset: &Ruleset, report: &mut RepairReport) {
    // Removing a carrier strands its cargo, so repeat until stable.
    loop {
        let illegal: Vec<UnitId> = world
            .units
            .iter()
            .filter(|u| !can_exist_at(world, ruleset, u, u.tile))
            .map(|u| u.id)
            .collect();
        if illegal.is_empty() {
            return;
        }
        for id in illegal {
            let still_illegal = world
                .units
                .get(id)
                .is_some_and(|u| !can_exist_at(world, ruleset, u, u.tile));
            if !still_illegal {
                continue;
            }
            if bounce_or_remove(world, ruleset, id) {
                report.units_bounced.push(id);
            } else {
                report.units_removed.push(id);
            }
        }
    }
}

// ── Hostile stacks ───────────────────────────────────────────────────────────

/// The city owner, or else the owner with most units (first in stack wins ties).
fn tile_holder(world: &World, tile: TileIndex) -> Option<PlayerNo> {
    let t = world.map.tile(tile);
    if let Some(city) = t.city.and_then(|c| world.cities.get(c)) {
        return Some(city.owner);
    }
    let owners: Vec<PlayerNo> = t.units.iter().filter_map(|&u| world.units.get(u)).map(|u| u.owner).collect();
    let mut counts: BTreeMap<PlayerNo, usize> = BTreeMap::new();
    for &owner in &owners {
        *counts.entry(owner).or_default() += 1;
    }
    let best = counts.values().copied().max()?;
    owners.into_iter().find(|o| counts.get(o) == Some(&best))
}

fn evict_hostile_stacks(world: &mut World, ruleset: &Ruleset, report: &mut RepairReport) {
    for tile in 0..world.map.tile_count() {
        let Some(holder) = tile_holder(world, tile) else { continue };
        let intruders: Vec<UnitId> = world
            .map
            .tile(tile)
            .units
            .iter()
            .filter_map(|&u| world.units.get(u))
            .filter(|u| !world.pplayers_allied(u.owner, holder))
            .map(|u| u.id)
            .collect();
        for id in intruders {
            // Cargo may already have left with its carrier.
            if !world.units.get(id).is_some_and(|u| u.tile == tile) {
                continue;
            }
            log::warn!("Unit {id} shares tile {tile} with non-allied player{holder}");
            if !bounce_or_remove(world, ruleset, id) {
                report.units_removed.push(id);
            }
            report.units_evicted.push(id);
        }
    }
}

// ── Pillage targets ──────────────────────────────────────────────────────────

fn pillage_target(world: &World, ruleset: &Ruleset, tile: TileIndex) -> ActivityTarget {
    let t = world.map.tile(tile);
    if let Some(special) = TileSpecial::ALL.into_iter().find(|s| s.is_pillageable() && t.specials.contains(*s)) {
        return ActivityTarget::Special(special);
    }
    if let Some(i) = (0..ruleset.bases.len()).find(|&i| ruleset.bases[i].pillageable && t.bases.contains(BaseId(i as u8))) {
        return ActivityTarget::Base(BaseId(i as u8));
    }
    if let Some(i) = (0..ruleset.roads.len()).find(|&i| ruleset.roads[i].pillageable && t.roads.contains(RoadId(i as u8))) {
        return ActivityTarget::Road(RoadId(i as u8));
    }
    ActivityTarget::None
}

fn assign_pillage_targets(world: &mut World, ruleset: &Ruleset, report: &mut RepairReport) {
    let open: Vec<(UnitId, TileIndex)> = world
        .units
        .iter()
        .filter(|u| u.activity == Activity::Pillage && u.activity_target == ActivityTarget::None)
        .map(|u| (u.id, u.tile))
        .collect();
    for (id, tile) in open {
        let target = pillage_target(world, ruleset, tile);
        let Some(unit) = world.units.get_mut(id) else { continue };
        if target == ActivityTarget::None {
            unit.set_idle();
            report.units_idled.push(id);
        } else {
            unit.activity_target = target;
            report.pillage_targets.push(id);
        }
    }
}

// ── Derived caches ───────────────────────────────────────────────────────────

fn rebuild_can_build(world: &mut World, ruleset: &Ruleset) -> usize {
    let built_anywhere = |b: ImprovementId| world.cities.iter().any(|c| c.improvements.contains(&b));
    let mut lists: Vec<(u32, Vec<ImprovementId>)> = Vec::with_capacity(world.cities.len());

    for city in world.cities.iter() {
        let known = world.player(city.owner).map(|p| &p.research.known);
        let list = (0..ruleset.improvements.len())
            .filter(|b| !city.improvements.contains(b))
            .filter(|&b| {
                ruleset
                    .improvement_requirement(b)
                    .is_none_or(|tech| known.is_some_and(|k| k.contains(&tech)))
            })
            .filter(|&b| match ruleset.improvements[b].genus {
                Genus::GreatWonder => !built_anywhere(b) && !world.destroyed_wonders.contains(&b),
                Genus::SmallWonder => !world
                    .cities
                    .iter()
                    .any(|c| c.owner == city.owner && c.improvements.contains(&b)),
                Genus::Improvement => true,
            })
            .collect();
        lists.push((city.id, list));
    }

    let mut changed = 0;
    for (id, list) in lists {
        if let Some(city) = world.cities.get_mut(id) {
            if city.can_build != list {
                city.can_build = list;
                changed += 1;
            }
        }
    }
    changed
}

fn generate_game_id(rng: &mut GameRng) -> String {
    let saved = rng.clone();
    let id = (0..GAME_ID_LENGTH)
        .map(|_| GAME_ID_CHARS[rng.next_below(GAME_ID_CHARS.len() as u32) as usize] as char)
        .collect();
    *rng = saved;
    id
}

fn update_scores(world: &mut World, ruleset: &Ruleset) -> usize {
    let mut scores: Vec<Score> = vec![Score::default(); world.players.len()];
    for city in world.cities.iter() {
        if let Some(score) = scores.get_mut(city.owner) {
            score.cities += 1;
            score.citizens += city.size;
            score.wonders += city.improvements.iter().filter(|&&b| ruleset.is_great_wonder(b)).count() as i32;
        }
    }
    for unit in world.units.iter() {
        if let Some(score) = scores.get_mut(unit.owner) {
            score.units += 1;
        }
    }

    let mut changed = 0;
    for (player, mut score) in world.players.iter_mut().zip(scores) {
        score.techs = player.research.known.len() as i32 + player.research.future_tech;
        score.total = score.citizens + score.techs * 2 + score.wonders * 5;
        if player.score != score {
            player.score = score;
            changed += 1;
        }
    }
    changed
}

// ── Section ──────────────────────────────────────────────────────────────────

pub struct SanitySection;

impl SaveSection for SanitySection {
    fn name(&self) -> &'static str { "sanity" }

    fn load(&self, ctx: &mut LoadContext<'_>, world: &mut World) -> SaveResult<()> {
        if ctx.rstate_from_file {
            world.rng = ctx.rstate.clone();
        } else if world.game_was_started() {
            // The id was drawn from a generator the file did not carry.
            world.info.id.clear();
        }
        if !world.game_was_started() || world.info.is_new_game {
            return Ok(());
        }
        ctx.repairs = sanity_check(world, ctx.ruleset, ctx.seed);
        if !ctx.repairs.is_empty() {
            log::info!("Repairs after load: {:?}", ctx.repairs);
        }
        Ok(())
    }

    fn save(&self, _ctx: &mut SaveContext<'_>, _world: &World) -> SaveResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn game_id_generation_leaves_generator_untouched() {
        let mut rng = GameRng::seeded(3);
        let before = rng.clone();
        let id = generate_game_id(&mut rng);
        assert!(valid_game_id(&id), "generated id '{id}' is invalid");
        assert_eq!(rng, before);
        assert_eq!(generate_game_id(&mut rng), id);
    }

    #[test]
    fn short_or_foreign_ids_are_invalid() {
        assert!(!valid_game_id(""));
        assert!(!valid_game_id(&"a".repeat(31)));
        assert!(!valid_game_id(&format!("{}!", "a".repeat(31))));
        assert!(valid_game_id(&"a".repeat(32)));
    }
}
