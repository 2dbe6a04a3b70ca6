//! Savegame format compatibility pipeline.
//!
//! RULE: the on-disk layout of an existing key never changes in place.
//! A format change adds a transform here that rewrites the older layout
//! into the newer one, and bumps CURRENT_FORMAT_VERSION.
//!
//! VERSIONS:
//!    3  first format with order tables, oldest loadable
//!   10  v2_4: AI type per player, citizen nationality, known-tile rows
//!   20  v2_5: generic roads
//!   30  v2_6: numbered specialists, diplomacy repair, activity alphabet
//!
//! Given a file at version V, every transform with V < threshold <= current
//! runs in ascending order before any section is loaded.

mod v2_4;
mod v2_5;
mod v2_6;

pub use v2_4::Release2_4;
pub use v2_5::Release2_5;
pub use v2_6::Release2_6;

use crate::context::{LoadContext, SaveContext};
use crate::error::{LoadStatus, SaveError, SaveResult};
use crate::ruleset::Ruleset;
use crate::secfile::SectionFile;
use crate::section::SaveSection;
use crate::world::World;

pub const CURRENT_FORMAT_VERSION: i64 = 30;

pub const VERSION_KEY: &str = "savefile.version";

/// One format revision.
pub trait CompatTransform {
    /// Files older than this version need the transform.
    fn version(&self) -> i64;

    /// Release the revision shipped with, for logs.
    fn release(&self) -> &'static str;

    /// Rewrite the file from the previous layout to this version's.
    fn migrate(
        &self,
        file: &mut SectionFile,
        ruleset: &Ruleset,
        status: &mut LoadStatus,
    ) -> SaveResult<()>;

    /// Run `migrate` unless the file is already at this version, then
    /// stamp the file so a second call is a no-op.
    fn apply(
        &self,
        file: &mut SectionFile,
        ruleset: &Ruleset,
        status: &mut LoadStatus,
    ) -> SaveResult<bool> {
        if file.lookup_int_or(VERSION_KEY, 0) >= self.version() {
            return Ok(false);
        }
        self.migrate(file, ruleset, status)?;
        file.set_int(VERSION_KEY, self.version());
        Ok(true)
    }
}

pub struct CompatPipeline {
    transforms: Vec<Box<dyn CompatTransform>>,
    current:    i64,
}

impl Default for CompatPipeline {
    fn default() -> Self {
        Self::standard()
    }
}

impl CompatPipeline {
    pub fn new(current: i64) -> Self {
        Self { transforms: Vec::new(), current }
    }

    /// Every revision this build knows about, in order.
    pub fn standard() -> Self {
        let mut pipeline = Self::new(CURRENT_FORMAT_VERSION);
        pipeline.register(Box::new(Release2_4));
        pipeline.register(Box::new(Release2_5));
        pipeline.register(Box::new(Release2_6));
        pipeline
    }

    /// Register a transform. Call in ascending version order.
    pub fn register(&mut self, transform: Box<dyn CompatTransform>) {
        debug_assert!(
            self.transforms.last().is_none_or(|t| t.version() < transform.version()),
            "compat transforms must be registered in ascending order"
        );
        debug_assert!(transform.version() <= self.current);
        self.transforms.push(transform);
    }

    pub fn current_version(&self) -> i64 {
        self.current
    }

    /// Thresholds that a file at `file_version` will go through.
    pub fn pending(&self, file_version: i64) -> Vec<i64> {
        self.transforms
            .iter()
            .map(|t| t.version())
            .filter(|&v| v > file_version && v <= self.current)
            .collect()
    }

    /// Read the version and bring the file up to date.
    ///
    /// Returns the thresholds actually applied.
    pub fn run(
        &self,
        file: &mut SectionFile,
        ruleset: &Ruleset,
        status: &mut LoadStatus,
    ) -> SaveResult<Vec<i64>> {
        let version = match file.lookup_int(VERSION_KEY) {
            Some(v) if v > 0 => v,
            _ => return Err(SaveError::MissingVersion),
        };

        if version > self.current {
            if cfg!(debug_assertions) {
                status.warn(format!(
                    "Savegame version {version} is newer than {}; trying anyway",
                    self.current
                ));
            } else {
                return Err(SaveError::VersionUnsupported { found: version, current: self.current });
            }
        }

        let mut applied = Vec::new();
        for transform in &self.transforms {
            let threshold = transform.version();
            if threshold <= version || threshold > self.current {
                continue;
            }
            log::info!("Run compat for {} (format version {threshold})", transform.release());
            if transform.apply(file, ruleset, status)? {
                applied.push(threshold);
            }
        }
        Ok(applied)
    }
}

// ── Orchestrator step ────────────────────────────────────────────────────────

/// First load step. Nothing to write on save: the header section stamps
/// the current version.
pub struct CompatSection {
    pipeline: CompatPipeline,
}

impl CompatSection {
    pub fn new(pipeline: CompatPipeline) -> Self {
        Self { pipeline }
    }
}

impl Default for CompatSection {
    fn default() -> Self { Self::new(CompatPipeline::standard()) }
}

impl SaveSection for CompatSection {
    fn name(&self) -> &'static str { "compat" }

    fn load(&self, ctx: &mut LoadContext<'_>, _world: &mut World) -> SaveResult<()> {
        ctx.file_version = ctx.file.lookup_int_or(VERSION_KEY, 0);
        let applied = self.pipeline.run(ctx.file, ctx.ruleset, &mut ctx.status)?;
        if !applied.is_empty() {
            log::info!(
                "Savegame upgraded from format version {} through {:?}",
                ctx.file_version,
                applied
            );
        }
        ctx.applied_transforms = applied;
        Ok(())
    }

    fn save(&self, _ctx: &mut SaveContext<'_>, _world: &World) -> SaveResult<()> {
        Ok(())
    }
}

// ── Helpers shared by the transforms ─────────────────────────────────────────

pub(crate) fn player_count(file: &SectionFile) -> usize {
    file.lookup_int_or("players.nplayers", 0).max(0) as usize
}

pub(crate) fn city_count(file: &SectionFile, plrno: usize) -> usize {
    file.lookup_int_or(&format!("player{plrno}.ncities"), 0).max(0) as usize
}

pub(crate) fn unit_count(file: &SectionFile, plrno: usize) -> usize {
    file.lookup_int_or(&format!("player{plrno}.nunits"), 0).max(0) as usize
}
