//! Tile-row codec: one text row per map row.
//!
//! Two row shapes exist:
//!   - char rows: one printable character per tile (`map.t0003`)
//!   - token rows: comma-separated integers or `-` (`map.owner0003`)
//!
//! RULE: loading never fails on a missing or short row. The available
//! prefix is decoded, the rest of the row keeps its defaults, and a
//! warning is recorded.

use crate::error::{LoadStatus, SaveError, SaveResult};
use crate::map::Map;
use crate::secfile::SectionFile;
use crate::types::TileIndex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapDims {
    pub xsize: usize,
    pub ysize: usize,
}

impl MapDims {
    pub fn of(map: &Map) -> Self {
        Self { xsize: map.xsize, ysize: map.ysize }
    }

    fn index(&self, x: usize, y: usize) -> TileIndex {
        y * self.xsize + x
    }
}

pub fn row_path(prefix: &str, y: usize) -> String {
    format!("{prefix}{y:04}")
}

// ── Char rows ────────────────────────────────────────────────────────────────

/// Write one char per tile. A control character aborts the save.
pub fn save_char_rows(
    file: &mut SectionFile,
    dims: MapDims,
    prefix: &str,
    mut get: impl FnMut(TileIndex) -> char,
) -> SaveResult<()> {
    for y in 0..dims.ysize {
        let path = row_path(prefix, y);
        let mut line = String::with_capacity(dims.xsize);
        for x in 0..dims.xsize {
            let ch = get(dims.index(x, y));
            if ch.is_control() {
                return Err(SaveError::UnprintableChar { path, code: ch as u32 });
            }
            line.push(ch);
        }
        file.set_str(&path, &line);
    }
    Ok(())
}

pub fn load_char_rows(
    file: &SectionFile,
    dims: MapDims,
    prefix: &str,
    status: &mut LoadStatus,
    mut set: impl FnMut(TileIndex, char) -> SaveResult<()>,
) -> SaveResult<()> {
    for y in 0..dims.ysize {
        let path = row_path(prefix, y);
        let Some(row) = file.lookup_str(&path) else {
            status.warn(format!("Incomplete map data: row '{path}' is missing"));
            continue;
        };
        let chars: Vec<char> = row.chars().collect();
        if chars.len() != dims.xsize {
            status.warn(format!(
                "Incomplete map data: row '{path}' has {} of {} tiles",
                chars.len(),
                dims.xsize
            ));
        }
        for (x, &ch) in chars.iter().take(dims.xsize).enumerate() {
            set(dims.index(x, y), ch)?;
        }
    }
    Ok(())
}

// ── Token rows ───────────────────────────────────────────────────────────────

pub fn save_token_rows(
    file: &mut SectionFile,
    dims: MapDims,
    prefix: &str,
    mut get: impl FnMut(TileIndex) -> Option<i64>,
) {
    for y in 0..dims.ysize {
        let line = (0..dims.xsize)
            .map(|x| get(dims.index(x, y)).map_or_else(|| "-".to_string(), |v| v.to_string()))
            .collect::<Vec<_>>()
            .join(",");
        file.set_str(&row_path(prefix, y), &line);
    }
}

/// A token that is neither `-` nor an integer is a structural failure.
pub fn load_token_rows(
    file: &SectionFile,
    dims: MapDims,
    prefix: &str,
    status: &mut LoadStatus,
    mut set: impl FnMut(TileIndex, Option<i64>) -> SaveResult<()>,
) -> SaveResult<()> {
    for y in 0..dims.ysize {
        let path = row_path(prefix, y);
        let Some(row) = file.lookup_str(&path) else {
            status.warn(format!("Incomplete map data: row '{path}' is missing"));
            continue;
        };
        // Older writers left a trailing comma.
        let tokens: Vec<&str> = row
            .trim_end_matches(',')
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect();
        if tokens.len() != dims.xsize {
            status.warn(format!(
                "Incomplete map data: row '{path}' has {} of {} tiles",
                tokens.len(),
                dims.xsize
            ));
        }
        for (x, token) in tokens.iter().take(dims.xsize).enumerate() {
            let value = match *token {
                "-" => None,
                t => Some(t.parse::<i64>().map_err(|_| {
                    SaveError::corrupt("map", format!("got '{t}' at ({x}, {y}) in '{path}'"))
                })?),
            };
            set(dims.index(x, y), value)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIMS: MapDims = MapDims { xsize: 4, ysize: 2 };

    #[test]
    fn short_char_row_decodes_prefix_and_warns() {
        let mut file = SectionFile::new();
        file.set_str("map.t0000", "gg");
        file.set_str("map.t0001", "hhhh");
        let mut status = LoadStatus::new();
        let mut seen = vec!['.'; 8];
        load_char_rows(&file, DIMS, "map.t", &mut status, |t, ch| {
            seen[t] = ch;
            Ok(())
        })
        .expect("load");
        assert_eq!(seen.iter().collect::<String>(), "gg..hhhh");
        assert!(status.is_ok());
        assert_eq!(status.warnings().count(), 1);
    }

    #[test]
    fn control_char_aborts_save() {
        let mut file = SectionFile::new();
        let err = save_char_rows(&mut file, DIMS, "map.t", |_| '\u{7}').unwrap_err();
        assert!(matches!(err, SaveError::UnprintableChar { code: 7, .. }));
    }

    #[test]
    fn token_rows_round_trip_and_reject_garbage() {
        let mut file = SectionFile::new();
        save_token_rows(&mut file, DIMS, "map.owner", |t| (t % 3 == 0).then_some(t as i64));
        assert_eq!(file.lookup_str("map.owner0000"), Some("0,-,-,3"));

        let mut status = LoadStatus::new();
        let mut owners = vec![None; 8];
        load_token_rows(&file, DIMS, "map.owner", &mut status, |t, v| {
            owners[t] = v;
            Ok(())
        })
        .expect("load");
        assert_eq!(owners[6], Some(6));
        assert_eq!(owners[7], None);

        file.set_str("map.owner0001", "1,x,-,-");
        let err = load_token_rows(&file, DIMS, "map.owner", &mut status, |_, _| Ok(()));
        assert!(matches!(err, Err(SaveError::Corrupt { .. })));
    }
}
