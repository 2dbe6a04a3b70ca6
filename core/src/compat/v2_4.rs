use super::{city_count, player_count, CompatTransform};
use crate::error::{LoadStatus, SaveResult};
use crate::ruleset::Ruleset;
use crate::secfile::SectionFile;

/// Per-player AI type, citizen nationality and the `k` known-tile rows.
pub struct Release2_4;

impl CompatTransform for Release2_4 {
    fn version(&self) -> i64 {
        10
    }

    fn release(&self) -> &'static str {
        "2.4.0"
    }

    fn migrate(
        &self,
        file: &mut SectionFile,
        _ruleset: &Ruleset,
        status: &mut LoadStatus,
    ) -> SaveResult<()> {
        let nplayers = player_count(file);

        for plrno in 0..nplayers {
            let ai_type = format!("player{plrno}.ai_type");
            if !file.contains(&ai_type) {
                file.set_str(&ai_type, "classic");
            }
        }

        // Cities written before nationality tracking: every citizen belongs
        // to the owner.
        for plrno in 0..nplayers {
            for c in 0..city_count(file, plrno) {
                let prefix = format!("player{plrno}.c{c}");
                let size = file.lookup_int_or(&format!("{prefix}.size"), 0);
                if size <= 0 || !file.keys_with_prefix(&format!("{prefix}.citizen")).is_empty() {
                    continue;
                }
                file.set_int(&format!("{prefix}.citizen{plrno}"), size);
            }
        }

        // Known-tile bit vectors moved from `kvb` to `k`.
        let vb_rows = file.keys_with_prefix("map.kvb");
        if !vb_rows.is_empty() {
            let stale: Vec<String> = file
                .keys_with_prefix("map.k")
                .into_iter()
                .filter(|k| !k.starts_with("map.kvb"))
                .collect();
            if !stale.is_empty() {
                status.warn(format!("Dropping {} stale known-tile rows", stale.len()));
            }
            for key in stale {
                file.remove(&key);
            }
            for key in vb_rows {
                let renamed = format!("map.k{}", &key["map.kvb".len()..]);
                file.rename(&key, &renamed);
            }
        }

        Ok(())
    }
}
