//! `event_cache.*` and `mapimg.*`. Both are left out of scenario saves.

use crate::context::{LoadContext, SaveContext};
use crate::error::SaveResult;
use crate::section::SaveSection;
use crate::world::{CachedEvent, World};

// ── Event cache ──────────────────────────────────────────────────────────────

pub struct EventCacheSection;

impl SaveSection for EventCacheSection {
    fn name(&self) -> &'static str { "event_cache" }

    fn load(&self, ctx: &mut LoadContext<'_>, world: &mut World) -> SaveResult<()> {
        let count = ctx.file.lookup_int_or("event_cache.count", 0).max(0) as usize;
        let nplayers = world.players.len();
        world.event_cache.clear();

        for i in 0..count {
            let key = |k: &str| format!("event_cache.events{i}.{k}");
            let Some(message) = ctx.file.lookup_str(&key("message")) else {
                ctx.status.warn(format!("Cached event {i} has no message, skipped"));
                continue;
            };
            let target = match ctx.file.lookup_int_or(&key("target"), -1) {
                -1 => None,
                t => match usize::try_from(t).ok().filter(|&p| p < nplayers) {
                    Some(p) => Some(p),
                    None => {
                        ctx.status.warn(format!("Cached event {i} targets unknown player {t}, skipped"));
                        continue;
                    }
                },
            };
            world.event_cache.push(CachedEvent {
                turn: ctx.file.lookup_int_or(&key("turn"), 0) as i32,
                kind: ctx.file.lookup_str_or(&key("type"), "").to_string(),
                message: message.to_string(),
                target,
            });
        }
        Ok(())
    }

    fn save(&self, ctx: &mut SaveContext<'_>, world: &World) -> SaveResult<()> {
        if ctx.scenario {
            return Ok(());
        }
        ctx.file.set_int("event_cache.count", world.event_cache.len() as i64);
        for (i, event) in world.event_cache.iter().enumerate() {
            let key = |k: &str| format!("event_cache.events{i}.{k}");
            ctx.file.set_int(&key("turn"), event.turn as i64);
            ctx.file.set_str(&key("type"), &event.kind);
            ctx.file.set_str(&key("message"), &event.message);
            ctx.file.set_int(&key("target"), event.target.map_or(-1, |p| p as i64));
        }
        Ok(())
    }
}

// ── Map images ───────────────────────────────────────────────────────────────

pub struct MapImgSection;

impl SaveSection for MapImgSection {
    fn name(&self) -> &'static str { "mapimg" }

    fn load(&self, ctx: &mut LoadContext<'_>, world: &mut World) -> SaveResult<()> {
        let count = ctx.file.lookup_int_or("mapimg.count", 0).max(0) as usize;
        world.mapimg_defs.clear();
        for i in 0..count {
            match ctx.file.lookup_str(&format!("mapimg.mapdef{i}")) {
                Some(def) => world.mapimg_defs.push(def.to_string()),
                None => ctx.status.warn(format!("Map image definition {i} is missing")),
            }
        }
        Ok(())
    }

    fn save(&self, ctx: &mut SaveContext<'_>, world: &World) -> SaveResult<()> {
        if ctx.scenario {
            return Ok(());
        }
        ctx.file.set_int("mapimg.count", world.mapimg_defs.len() as i64);
        for (i, def) in world.mapimg_defs.iter().enumerate() {
            ctx.file.set_str(&format!("mapimg.mapdef{i}"), def);
        }
        Ok(())
    }
}
