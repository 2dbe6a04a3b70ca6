use super::{city_count, player_count, unit_count, CompatTransform};
use crate::error::{LoadStatus, SaveResult};
use crate::player::DiplState;
use crate::ruleset::Ruleset;
use crate::secfile::SectionFile;

/// Numbered specialist keys, a `max_state` repair and the activity
/// alphabet change (`s` sentry became `w`, `w` idle became `n`).
pub struct Release2_6;

impl CompatTransform for Release2_6 {
    fn version(&self) -> i64 {
        30
    }

    fn release(&self) -> &'static str {
        "2.6.0"
    }

    fn migrate(
        &self,
        file: &mut SectionFile,
        ruleset: &Ruleset,
        status: &mut LoadStatus,
    ) -> SaveResult<()> {
        let nplayers = player_count(file);

        for plrno in 0..nplayers {
            for c in 0..city_count(file, plrno) {
                for (i, name) in ruleset.specialists.iter().enumerate() {
                    let old = format!("player{plrno}.c{c}.n{name}");
                    file.rename(&old, &format!("player{plrno}.c{c}.nspe{i}"));
                }
            }
        }

        let mut repaired = 0;
        for plrno in 0..nplayers {
            for other in 0..nplayers {
                let prefix = format!("player{plrno}.diplstate{other}");
                let kind = file.lookup_int(&format!("{prefix}.type")).and_then(DiplState::from_int);
                let max = file
                    .lookup_int(&format!("{prefix}.max_state"))
                    .and_then(DiplState::from_int);
                if max == Some(DiplState::NoContact)
                    && matches!(kind, Some(DiplState::Peace | DiplState::Alliance))
                {
                    if let Some(kind) = kind {
                        file.set_int(&format!("{prefix}.max_state"), kind as i64);
                        repaired += 1;
                    }
                }
            }
        }
        if repaired > 0 {
            status.warn(format!("Repaired {repaired} diplomatic max_state entries"));
        }

        for plrno in 0..nplayers {
            for u in 0..unit_count(file, plrno) {
                for key in ["activity", "changed_from", "activity_list"] {
                    let path = format!("player{plrno}.u{u}.{key}");
                    let Some(old) = file.lookup_str(&path) else { continue };
                    let new = remap_activity_chars(old);
                    file.set_str(&path, &new);
                }
            }
        }

        Ok(())
    }
}

fn remap_activity_chars(old: &str) -> String {
    old.chars()
        .map(|ch| match ch {
            's' => 'w',
            'w' => 'n',
            other => other,
        })
        .collect()
}
