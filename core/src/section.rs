//! Section trait and registry.
//!
//! RULE: every part of the savegame implements SaveSection.
//! The engine calls load()/save() on each registered section in
//! registration order. Execution order is fixed and documented in
//! engine.rs.

use crate::context::{LoadContext, SaveContext};
use crate::error::SaveResult;
use crate::world::World;

/// The contract every savegame section must fulfil.
pub trait SaveSection {
    /// Unique stable name, used in logs.
    fn name(&self) -> &'static str;

    /// Read this section into the world.
    ///
    /// - `Err(SaveError::Corrupt { .. })` marks the whole load failed and
    ///   stops later sections.
    /// - Recoverable problems go to `ctx.status.warn` and return `Ok`.
    fn load(&self, ctx: &mut LoadContext<'_>, world: &mut World) -> SaveResult<()>;

    /// Write this section. Any error fails the whole save.
    fn save(&self, ctx: &mut SaveContext<'_>, world: &World) -> SaveResult<()>;
}
