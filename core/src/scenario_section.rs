//! `script.*`, `scenario.*` and `settings.*`.
//!
//! The settings step also sizes the map: `xsize` and `ysize` are ordinary
//! settings, and every later section needs the tile count.

use crate::context::{LoadContext, SaveContext};
use crate::error::{SaveError, SaveResult};
use crate::map::Map;
use crate::section::SaveSection;
use crate::world::{ServerState, World};

// ── Script ───────────────────────────────────────────────────────────────────

pub struct ScriptSection;

impl SaveSection for ScriptSection {
    fn name(&self) -> &'static str { "script" }

    fn load(&self, ctx: &mut LoadContext<'_>, world: &mut World) -> SaveResult<()> {
        world.script_state = ctx.file.lookup_str_or("script.vars", "").to_string();
        Ok(())
    }

    fn save(&self, ctx: &mut SaveContext<'_>, world: &World) -> SaveResult<()> {
        ctx.file.set_str("script.vars", &world.script_state);
        Ok(())
    }
}

// ── Scenario ─────────────────────────────────────────────────────────────────

pub struct ScenarioSection;

impl SaveSection for ScenarioSection {
    fn name(&self) -> &'static str { "scenario" }

    fn load(&self, ctx: &mut LoadContext<'_>, world: &mut World) -> SaveResult<()> {
        let file = &*ctx.file;
        let scenario = &mut world.scenario;
        scenario.is_scenario = file.lookup_bool_or("scenario.is_scenario", false);
        if !scenario.is_scenario {
            return Ok(());
        }

        scenario.name = file.lookup_str_or("scenario.name", "").to_string();
        scenario.description = file.lookup_str_or("scenario.description", "").to_string();
        scenario.save_players = file.lookup_bool_or("scenario.players", true);
        scenario.startpos_nations = file.lookup_bool_or("scenario.startpos_nations", false);
        log::info!("Loading scenario '{}'", scenario.name);

        if !scenario.save_players && ctx.server_state != ServerState::Initial {
            return Err(SaveError::corrupt(
                "scenario",
                "scenario without players is only loadable before the game starts",
            ));
        }
        Ok(())
    }

    fn save(&self, ctx: &mut SaveContext<'_>, world: &World) -> SaveResult<()> {
        ctx.file.set_bool("scenario.is_scenario", ctx.scenario);
        if !ctx.scenario {
            return Ok(());
        }
        let name = if world.scenario.name.is_empty() {
            world.info.id.as_str()
        } else {
            world.scenario.name.as_str()
        };
        ctx.file.set_str("scenario.name", name);
        ctx.file.set_str("scenario.description", &world.scenario.description);
        ctx.file.set_bool("scenario.players", ctx.save_players);
        ctx.file.set_bool("scenario.startpos_nations", world.scenario.startpos_nations);
        Ok(())
    }
}

// ── Settings ─────────────────────────────────────────────────────────────────

pub struct SettingsSection;

fn setting_dim(settings: &[(String, String)], name: &str) -> Option<usize> {
    settings
        .iter()
        .find(|(n, _)| n == name)
        .and_then(|(_, v)| v.trim().parse::<usize>().ok())
}

impl SaveSection for SettingsSection {
    fn name(&self) -> &'static str { "settings" }

    fn load(&self, ctx: &mut LoadContext<'_>, world: &mut World) -> SaveResult<()> {
        let count = ctx.file.lookup_int_or("settings.set_count", 0).max(0) as usize;
        world.settings.clear();
        for i in 0..count {
            let name = ctx.file.lookup_str(&format!("settings.set{i}.name"));
            let value = ctx.file.lookup_str(&format!("settings.set{i}.value"));
            match (name, value) {
                (Some(name), Some(value)) => {
                    world.settings.push((name.to_string(), value.to_string()));
                }
                _ => ctx.status.warn(format!("Setting {i} is incomplete, skipped")),
            }
        }

        match (setting_dim(&world.settings, "xsize"), setting_dim(&world.settings, "ysize")) {
            (Some(xsize), Some(ysize)) => {
                if Map::checked_tile_count(xsize, ysize).is_none() {
                    return Err(SaveError::corrupt(
                        "settings",
                        format!("map size {xsize}x{ysize} is outside the map limits"),
                    ));
                }
                if world.map.xsize != xsize || world.map.ysize != ysize || !world.map.is_allocated()
                {
                    world.map = Map::new(xsize, ysize);
                }
                log::debug!("Map size {xsize}x{ysize}");
                Ok(())
            }
            _ if ctx.server_state == ServerState::Initial => {
                log::debug!("No map size saved; map left unallocated");
                Ok(())
            }
            _ => Err(SaveError::corrupt("settings", "map size ('xsize'/'ysize') is missing")),
        }
    }

    fn save(&self, ctx: &mut SaveContext<'_>, world: &World) -> SaveResult<()> {
        let mut settings = Vec::with_capacity(world.settings.len() + 2);
        if world.map.is_allocated() {
            settings.push(("xsize".to_string(), world.map.xsize.to_string()));
            settings.push(("ysize".to_string(), world.map.ysize.to_string()));
        }
        settings.extend(
            world
                .settings
                .iter()
                .filter(|(n, _)| !(world.map.is_allocated() && (n == "xsize" || n == "ysize")))
                .cloned(),
        );

        ctx.file.set_int("settings.set_count", settings.len() as i64);
        for (i, (name, value)) in settings.iter().enumerate() {
            ctx.file.set_str(&format!("settings.set{i}.name"), name);
            ctx.file.set_str(&format!("settings.set{i}.value"), value);
        }
        Ok(())
    }
}
