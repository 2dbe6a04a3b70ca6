//! `game.*`: lifecycle state, calendar, timeout tuning, climate counters.

use crate::context::{LoadContext, SaveContext};
use crate::error::{SaveError, SaveResult};
use crate::section::SaveSection;
use crate::world::{ServerState, World};

/// Release number written to `game.version`.
pub const GAME_VERSION: i64 = 20600;

/// Oldest `game.version` this loader accepts.
pub const MIN_GAME_VERSION: i64 = 20299;

pub struct GameSection;

impl SaveSection for GameSection {
    fn name(&self) -> &'static str { "game" }

    fn load(&self, ctx: &mut LoadContext<'_>, world: &mut World) -> SaveResult<()> {
        let file = &*ctx.file;
        let info = &mut world.info;

        info.version = file.lookup_int_or("game.version", 0);
        if info.version < MIN_GAME_VERSION {
            return Err(SaveError::corrupt(
                "game",
                format!("game version {} is older than {MIN_GAME_VERSION}", info.version),
            ));
        }

        let state = match file.lookup_str("game.server_state") {
            Some(name) => ServerState::by_name(name).unwrap_or_else(|| {
                ctx.status.warn(format!("Unknown server state '{name}', assuming pre-game"));
                ServerState::Initial
            }),
            None => ServerState::Initial,
        };
        ctx.server_state = state;
        info.server_state = state;

        info.id = file.lookup_str_or("game.id", "").to_string();
        info.skill_level = file.lookup_int_or("game.skill_level", 3) as i32;
        info.phase_mode = file.lookup_int_or("game.phase_mode", 0) as i32;
        info.scoreturn = file.lookup_int_or("game.scoreturn", 20) as i32;

        let timeout = &mut info.timeout;
        timeout.timeoutint = file.lookup_int_or("game.timeoutint", 0) as i32;
        timeout.timeoutintinc = file.lookup_int_or("game.timeoutintinc", 0) as i32;
        timeout.timeoutinc = file.lookup_int_or("game.timeoutinc", 0) as i32;
        timeout.timeoutincmult = file.lookup_int_or("game.timeoutincmult", 1) as i32;
        timeout.timeoutcounter = file.lookup_int_or("game.timeoutcounter", 0) as i32;

        info.turn = file.lookup_int_or("game.turn", 0) as i32;
        info.year = file
            .lookup_int("game.year")
            .ok_or_else(|| SaveError::corrupt("game", "missing 'game.year'"))? as i32;
        info.year_0_hack = file.lookup_bool_or("game.year_0_hack", false);

        let climate = &mut info.climate;
        climate.globalwarming = file.lookup_int_or("game.globalwarming", 0) as i32;
        climate.heating = file.lookup_int_or("game.heating", 0) as i32;
        climate.warminglevel = file.lookup_int_or("game.warminglevel", 8) as i32;
        climate.nuclearwinter = file.lookup_int_or("game.nuclearwinter", 0) as i32;
        climate.cooling = file.lookup_int_or("game.cooling", 0) as i32;
        climate.coolinglevel = file.lookup_int_or("game.coolinglevel", 8) as i32;

        info.fogofwar = file.lookup_bool_or("game.fogofwar", true);
        info.foggedborders = file.lookup_bool_or("game.foggedborders", false);
        info.is_new_game = !file.lookup_bool_or("game.save_players", true);
        Ok(())
    }

    fn save(&self, ctx: &mut SaveContext<'_>, world: &World) -> SaveResult<()> {
        let info = &world.info;
        // An unstarted scenario is reloaded as pre-game whatever the state.
        let state = if ctx.scenario && !ctx.save_players {
            ServerState::Initial
        } else {
            info.server_state
        };
        let file = &mut ctx.file;

        file.set_int("game.version", GAME_VERSION);
        file.set_str("game.server_state", state.name());
        file.set_str("game.id", &info.id);
        file.set_int("game.skill_level", info.skill_level as i64);
        file.set_int("game.phase_mode", info.phase_mode as i64);
        file.set_int("game.scoreturn", info.scoreturn as i64);

        file.set_int("game.timeoutint", info.timeout.timeoutint as i64);
        file.set_int("game.timeoutintinc", info.timeout.timeoutintinc as i64);
        file.set_int("game.timeoutinc", info.timeout.timeoutinc as i64);
        file.set_int("game.timeoutincmult", info.timeout.timeoutincmult as i64);
        file.set_int("game.timeoutcounter", info.timeout.timeoutcounter as i64);

        file.set_int("game.turn", info.turn as i64);
        file.set_int("game.year", info.year as i64);
        file.set_bool("game.year_0_hack", info.year_0_hack);

        file.set_int("game.globalwarming", info.climate.globalwarming as i64);
        file.set_int("game.heating", info.climate.heating as i64);
        file.set_int("game.warminglevel", info.climate.warminglevel as i64);
        file.set_int("game.nuclearwinter", info.climate.nuclearwinter as i64);
        file.set_int("game.cooling", info.climate.cooling as i64);
        file.set_int("game.coolinglevel", info.climate.coolinglevel as i64);

        file.set_bool("game.fogofwar", ctx.config.fogofwar);
        file.set_bool("game.foggedborders", ctx.config.foggedborders);
        file.set_bool("game.save_players", ctx.save_players);
        Ok(())
    }
}
