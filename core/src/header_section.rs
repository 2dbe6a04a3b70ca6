//! `savefile.*`: capability string, format version, order tables.

use crate::compat::{CURRENT_FORMAT_VERSION, VERSION_KEY};
use crate::context::{LoadContext, SaveContext};
use crate::error::{SaveError, SaveResult};
use crate::order_table::OrderTables;
use crate::section::SaveSection;
use crate::world::World;

/// Capability every loadable file declares.
pub const CAP_VERSION2: &str = "+version2";

pub struct HeaderSection;

impl SaveSection for HeaderSection {
    fn name(&self) -> &'static str { "savefile" }

    fn load(&self, ctx: &mut LoadContext<'_>, world: &mut World) -> SaveResult<()> {
        let options = ctx
            .file
            .lookup_str("savefile.options")
            .ok_or_else(|| SaveError::corrupt("savefile", "missing 'savefile.options'"))?
            .to_string();
        ctx.set_capabilities(&options);
        if !ctx.has_capability(CAP_VERSION2) {
            return Err(SaveError::corrupt(
                "savefile",
                format!("legacy savegame format (options '{}')", options.trim()),
            ));
        }

        if let Some(dir) = ctx.file.lookup_str("savefile.rulesetdir") {
            if dir != ctx.ruleset.name {
                ctx.status.warn(format!(
                    "Savegame was written with ruleset '{dir}', loading with '{}'",
                    ctx.ruleset.name
                ));
            }
            world.info.rulesetdir = dir.to_string();
        }

        ctx.tables = OrderTables::load(ctx.file, ctx.ruleset, &mut ctx.status)?;
        log::debug!(
            "order tables: {} improvements, {} techs, {} specials, {} bases, {} roads",
            ctx.tables.improvements.name_count(),
            ctx.tables.techs.name_count(),
            ctx.tables.specials.name_count(),
            ctx.tables.bases.name_count(),
            ctx.tables.roads.name_count()
        );
        Ok(())
    }

    fn save(&self, ctx: &mut SaveContext<'_>, _world: &World) -> SaveResult<()> {
        ctx.add_option(CAP_VERSION2);
        ctx.file.set_int(VERSION_KEY, CURRENT_FORMAT_VERSION);
        let reason = ctx.reason.clone();
        ctx.file.set_str("savefile.reason", &reason);
        let rulesetdir = ctx.ruleset.name.clone();
        ctx.file.set_str("savefile.rulesetdir", &rulesetdir);
        ctx.tables.save(&mut ctx.file);
        Ok(())
    }
}
