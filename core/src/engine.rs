//! The savegame engine: runs every section in a fixed order.
//!
//! EXECUTION ORDER (fixed, documented, never reordered):
//!   1. compat         format migrations up to the current version
//!   2. savefile       header, capabilities, order tables
//!   3. game           turn, year, server state, timeouts, climate
//!   4. random         generator snapshot
//!   5. script         opaque script state
//!   6. scenario       scenario flags
//!   7. settings       server settings, map size
//!   8. players_basic  player slots, teams, shuffle order
//!   9. map            tiles (skipped before the game starts)
//!  10. players        economy, research, cities, units, private maps
//!  11. event_cache
//!  12. mapimg
//!  13. sanity         repairs on the loaded world
//!
//! RULES:
//!   - Load stops at the first failure. Later sections are skipped and
//!     the partly built world is left for the caller to discard.
//!   - Save runs every section and fails on the first error.
//!   - All per-call state lives in the context and dies with the call.

use crate::aux_section::{EventCacheSection, MapImgSection};
use crate::compat::CompatSection;
use crate::config::SaveConfig;
use crate::context::{LoadContext, SaveContext};
use crate::error::SaveResult;
use crate::game_section::GameSection;
use crate::header_section::HeaderSection;
use crate::map_section::MapSection;
use crate::player_section::{PlayersBasicSection, PlayersSection};
use crate::random_section::RandomSection;
use crate::ruleset::Ruleset;
use crate::sanity::{RepairReport, SanitySection};
use crate::scenario_section::{ScenarioSection, ScriptSection, SettingsSection};
use crate::secfile::SectionFile;
use crate::section::SaveSection;
use crate::types::{Turn, Year};
use crate::world::World;
use serde::Serialize;
use std::path::Path;

/// Summary of a successful load.
#[derive(Debug, Clone, Serialize)]
pub struct LoadReport {
    /// `savefile.version` before migration.
    pub file_version:       i64,
    pub applied_transforms: Vec<i64>,
    pub server_state:       String,
    pub turn:               Turn,
    pub year:               Year,
    pub players:            usize,
    pub cities:             usize,
    pub units:              usize,
    pub tiles:              usize,
    pub warnings:           Vec<String>,
    pub repairs:            RepairReport,
}

pub struct SaveEngine {
    /// Seeds the generator when a file carries none.
    pub seed: u64,
    sections: Vec<Box<dyn SaveSection>>,
}

impl SaveEngine {
    pub fn new(seed: u64) -> Self {
        Self { seed, sections: Vec::new() }
    }

    /// Build a fully wired engine with all sections registered.
    /// Call this instead of new() + manual register() calls.
    pub fn build(seed: u64) -> Self {
        let mut engine = SaveEngine::new(seed);
        engine.register(Box::new(CompatSection::default()));
        engine.register(Box::new(HeaderSection));
        engine.register(Box::new(GameSection));
        engine.register(Box::new(RandomSection));
        engine.register(Box::new(ScriptSection));
        engine.register(Box::new(ScenarioSection));
        engine.register(Box::new(SettingsSection));
        engine.register(Box::new(PlayersBasicSection));
        engine.register(Box::new(MapSection));
        engine.register(Box::new(PlayersSection));
        engine.register(Box::new(EventCacheSection));
        engine.register(Box::new(MapImgSection));
        engine.register(Box::new(SanitySection));
        engine
    }

    /// Register a section. Call in the documented execution order.
    pub fn register(&mut self, section: Box<dyn SaveSection>) {
        self.sections.push(section);
    }

    pub fn section_names(&self) -> Vec<&'static str> {
        self.sections.iter().map(|s| s.name()).collect()
    }

    /// Load `file` into `world`, replacing its contents.
    ///
    /// The file is migrated in place to the current format first.
    /// On failure every collected diagnostic comes back in one
    /// `SaveError::LoadFailed`; I/O and ruleset errors propagate as is.
    pub fn load(&self, file: &mut SectionFile, ruleset: &Ruleset, world: &mut World) -> SaveResult<LoadReport> {
        *world = World::default();
        let mut ctx = LoadContext::new(file, ruleset);
        ctx.seed = self.seed;

        for section in &self.sections {
            if !ctx.status.is_ok() {
                break;
            }
            log::debug!("load step '{}'", section.name());
            match section.load(&mut ctx, world) {
                Ok(()) => {}
                Err(e) if e.is_failure() => ctx.status.fail(format!("[{}] {e}", section.name())),
                Err(e) => return Err(e),
            }
        }
        if !ctx.status.is_ok() {
            return Err(ctx.status.into_error());
        }

        let report = LoadReport {
            file_version:       ctx.file_version,
            applied_transforms: ctx.applied_transforms,
            server_state:       world.info.server_state.name().to_string(),
            turn:               world.info.turn,
            year:               world.info.year,
            players:            world.players.len(),
            cities:             world.cities.len(),
            units:              world.units.len(),
            tiles:              world.map.tile_count(),
            warnings:           ctx.status.warnings().map(str::to_string).collect(),
            repairs:            ctx.repairs,
        };
        log::info!(
            "Loaded turn {} with {} players on {} tiles ({} warnings)",
            report.turn,
            report.players,
            report.tiles,
            report.warnings.len()
        );
        Ok(report)
    }

    /// Write `world` into a fresh section file.
    pub fn save(
        &self,
        world: &World,
        ruleset: &Ruleset,
        config: &SaveConfig,
        reason: &str,
    ) -> SaveResult<SectionFile> {
        let mut ctx = SaveContext::new(ruleset, config, reason);
        for section in &self.sections {
            log::debug!("save step '{}'", section.name());
            section.save(&mut ctx, world)?;
        }
        log::info!(
            "Saved turn {} with {} players ({} entries)",
            world.info.turn,
            world.players.len(),
            ctx.file.len()
        );
        Ok(ctx.file)
    }

    pub fn load_path(&self, path: impl AsRef<Path>, ruleset: &Ruleset, world: &mut World) -> SaveResult<LoadReport> {
        let mut file = SectionFile::load(path)?;
        self.load(&mut file, ruleset, world)
    }

    pub fn save_path(
        &self,
        path: impl AsRef<Path>,
        world: &World,
        ruleset: &Ruleset,
        config: &SaveConfig,
        reason: &str,
    ) -> SaveResult<()> {
        self.save(world, ruleset, config, reason)?.save(path)
    }
}
