//! Attribute-set codec: per-tile flag sets packed 4 flags per hex digit.
//!
//! Grid row `j` carries slots `[4j, 4j+3]` of the order table. Bit `i` of
//! the digit is slot `4j+i`. A sentinel slot never produces a bit on save
//! and its bit is dropped on load.

use crate::bitset::{FlagIndex, FlagSet};
use crate::codec::hex::{decode_hex4, encode_hex4};
use crate::codec::row::{row_path, save_char_rows, MapDims};
use crate::error::{LoadStatus, SaveResult};
use crate::order_table::OrderTable;
use crate::secfile::SectionFile;
use crate::types::TileIndex;

/// Hex digit for grid row `j` of one tile.
pub fn get_digit<T: FlagIndex + PartialEq>(
    set: &FlagSet<T>,
    table: &OrderTable<T>,
    j: usize,
) -> char {
    let mut bits = 0u8;
    for i in 0..4 {
        if let Some(flag) = table.get(4 * j + i) {
            if set.contains(flag) {
                bits |= 1 << i;
            }
        }
    }
    encode_hex4(bits)
}

/// Apply grid row `j`'s digit to a tile's set.
///
/// With a filter, only flags contained in it are applied.
pub fn set_digit<T: FlagIndex + PartialEq>(
    set: &mut FlagSet<T>,
    ch: char,
    table: &OrderTable<T>,
    j: usize,
    filter: Option<&FlagSet<T>>,
) -> SaveResult<()> {
    let bits = decode_hex4(ch)?;
    for i in 0..4 {
        if bits & (1 << i) == 0 {
            continue;
        }
        let Some(flag) = table.get(4 * j + i) else { continue };
        if filter.is_some_and(|f| !f.contains(flag)) {
            continue;
        }
        set.insert(flag);
    }
    Ok(())
}

/// Path prefix of grid row `j`, e.g. `map.spe02_`.
pub fn grid_prefix(base: &str, j: usize) -> String {
    format!("{base}{j:02}_")
}

pub fn save_attr_grid<T: FlagIndex + PartialEq>(
    file: &mut SectionFile,
    dims: MapDims,
    base: &str,
    table: &OrderTable<T>,
    get: impl Fn(TileIndex) -> FlagSet<T>,
) -> SaveResult<()> {
    for j in 0..table.hex_rows() {
        save_char_rows(file, dims, &grid_prefix(base, j), |t| {
            get_digit(&get(t), table, j)
        })?;
    }
    Ok(())
}

/// Load every grid row the table calls for. A row holding a character
/// outside the hex alphabet is treated as all zero, with a warning.
pub fn load_attr_grid<T: FlagIndex + PartialEq>(
    file: &SectionFile,
    dims: MapDims,
    base: &str,
    table: &OrderTable<T>,
    filter: Option<&FlagSet<T>>,
    status: &mut LoadStatus,
    mut apply: impl FnMut(TileIndex, FlagSet<T>),
) {
    for j in 0..table.hex_rows() {
        let prefix = grid_prefix(base, j);
        for y in 0..dims.ysize {
            let path = row_path(&prefix, y);
            let Some(row) = file.lookup_str(&path) else {
                status.warn(format!("Incomplete map data: row '{path}' is missing"));
                continue;
            };
            let chars: Vec<char> = row.chars().collect();
            if let Some(bad) = chars.iter().find(|c| decode_hex4(**c).is_err()) {
                status.warn(format!("Unknown digit '{bad}' in '{path}', row ignored"));
                continue;
            }
            if chars.len() != dims.xsize {
                status.warn(format!(
                    "Incomplete map data: row '{path}' has {} of {} tiles",
                    chars.len(),
                    dims.xsize
                ));
            }
            for (x, &ch) in chars.iter().take(dims.xsize).enumerate() {
                let mut decoded = FlagSet::new();
                if set_digit(&mut decoded, ch, table, j, filter).is_err() {
                    continue;
                }
                if !decoded.is_empty() {
                    apply(y * dims.xsize + x, decoded);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::TileSpecial;

    fn table(names: &[&str]) -> OrderTable<TileSpecial> {
        OrderTable::new(
            names.iter().map(|s| s.to_string()).collect(),
            names.iter().map(|n| TileSpecial::by_name(n)).collect(),
        )
        .padded()
    }

    #[test]
    fn sentinel_slot_never_encodes() {
        let set: FlagSet<TileSpecial> = [TileSpecial::Hut, TileSpecial::Mine].into_iter().collect();
        let t = table(&["Hut", "Unobtainium", "River"]);
        assert_eq!(get_digit(&set, &t, 0), '1');
    }

    #[test]
    fn filter_restricts_decoded_flags() {
        let t = table(&["Hut", "River"]);
        let only_rivers: FlagSet<TileSpecial> = [TileSpecial::River].into_iter().collect();
        let mut set = FlagSet::new();
        set_digit(&mut set, '3', &t, 0, Some(&only_rivers)).expect("digit");
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![TileSpecial::River]);
    }

    #[test]
    fn bad_digit_ignores_whole_row() {
        let dims = MapDims { xsize: 3, ysize: 1 };
        let mut file = SectionFile::new();
        file.set_str("map.spe00_0000", "1z1");
        let mut status = LoadStatus::new();
        let mut hits = 0;
        load_attr_grid(&file, dims, "map.spe", &table(&["Hut"]), None, &mut status, |_, _| hits += 1);
        assert_eq!(hits, 0);
        assert_eq!(status.warnings().count(), 1);
        assert!(status.is_ok());
    }
}
