use super::{player_count, CompatTransform};
use crate::codec::attrs::grid_prefix;
use crate::codec::hex::{decode_hex4, encode_hex4};
use crate::codec::row::row_path;
use crate::error::{LoadStatus, SaveResult};
use crate::ruleset::Ruleset;
use crate::secfile::SectionFile;

const LEGACY_ROADS: [&str; 2] = ["Road", "Railroad"];

/// Roads and railroads stop being tile specials and get their own grid.
pub struct Release2_5;

impl CompatTransform for Release2_5 {
    fn version(&self) -> i64 {
        20
    }

    fn release(&self) -> &'static str {
        "2.5.0"
    }

    fn migrate(
        &self,
        file: &mut SectionFile,
        _ruleset: &Ruleset,
        status: &mut LoadStatus,
    ) -> SaveResult<()> {
        if file.contains("savefile.roads_vector") {
            return Ok(());
        }
        file.set_int("savefile.roads_size", LEGACY_ROADS.len() as i64);
        file.set_str_list("savefile.roads_vector", &LEGACY_ROADS);

        let specials = file.lookup_str_list("savefile.specials_vector").unwrap_or_default();
        let slots: Vec<Option<usize>> = LEGACY_ROADS
            .iter()
            .map(|name| specials.iter().position(|s| s == name))
            .collect();
        if slots.iter().all(Option::is_none) {
            return Ok(());
        }

        let mut bases = vec!["map.".to_string()];
        bases.extend((0..player_count(file)).map(|p| format!("player{p}.map_")));
        for base in bases {
            let folded = fold_roads(file, &base, &slots);
            if folded > 0 {
                log::info!("Folded {folded} road rows under '{base}'");
            }
        }
        status.warn("Roads were stored as specials; converted to road rows".to_string());
        Ok(())
    }
}

/// Build `<base>r00_<y>` from the special grid bits at `slots`.
/// Stops at the first y for which no source row exists.
fn fold_roads(file: &mut SectionFile, base: &str, slots: &[Option<usize>]) -> usize {
    let mut y = 0;
    loop {
        let sources: Vec<Option<(Vec<char>, usize)>> = slots
            .iter()
            .map(|slot| {
                let slot = (*slot)?;
                let path = row_path(&grid_prefix(&format!("{base}spe"), slot / 4), y);
                file.lookup_str(&path).map(|row| (row.chars().collect(), slot % 4))
            })
            .collect();
        if sources.iter().all(Option::is_none) {
            return y;
        }

        let width = sources.iter().flatten().map(|(row, _)| row.len()).max().unwrap_or(0);
        let row: String = (0..width)
            .map(|x| {
                let mut bits = 0u8;
                for (road, source) in sources.iter().enumerate() {
                    let Some((chars, bit)) = source else { continue };
                    let set = chars
                        .get(x)
                        .and_then(|&ch| decode_hex4(ch).ok())
                        .is_some_and(|digit| digit & (1 << bit) != 0);
                    if set {
                        bits |= 1 << road;
                    }
                }
                encode_hex4(bits)
            })
            .collect();

        let target = row_path(&grid_prefix(&format!("{base}r"), 0), y);
        if !file.contains(&target) {
            file.set_str(&target, &row);
        }
        y += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn road_specials_fold_into_road_rows() {
        let mut file = SectionFile::new();
        file.set_int("savefile.specials_size", 3);
        file.set_str_list("savefile.specials_vector", &["Hut", "Road", "Railroad"]);
        // Hut=1, Road=2, Railroad=4.
        file.set_str("map.spe00_0000", "0267");

        let mut status = LoadStatus::new();
        Release2_5.migrate(&mut file, &Ruleset::classic(), &mut status).expect("migrate");

        assert_eq!(file.lookup_int("savefile.roads_size"), Some(2));
        assert_eq!(file.lookup_str("map.r00_0000"), Some("0133"));
        assert!(!file.contains("map.r00_0001"));
    }
}
