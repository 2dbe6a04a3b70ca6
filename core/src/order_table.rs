//! Order tables: save-time ordinal position → live enumeration value.
//!
//! Every bit-set or 0/1 string in a savegame is indexed by the order the
//! writer listed its names in the header, never by the loader's own
//! enumeration. A name the current ruleset does not know becomes the
//! sentinel (`None`) and its bits are skipped.
//!
//! RULE: tables belong to one load or save call. They are never cached.

use crate::error::{LoadStatus, SaveError, SaveResult};
use crate::map::{BaseId, RoadId, TileSpecial};
use crate::ruleset::Ruleset;
use crate::secfile::SectionFile;
use crate::types::{ImprovementId, TechId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderTable<T> {
    names: Vec<String>,
    slots: Vec<Option<T>>,
}

impl<T> Default for OrderTable<T> {
    fn default() -> Self {
        Self { names: Vec::new(), slots: Vec::new() }
    }
}

impl<T: Copy + PartialEq> OrderTable<T> {
    pub fn new(names: Vec<String>, slots: Vec<Option<T>>) -> Self {
        debug_assert_eq!(names.len(), slots.len());
        Self { names, slots }
    }

    /// Pad with sentinels up to the next multiple of 4.
    pub fn padded(mut self) -> Self {
        while self.slots.len() % 4 != 0 {
            self.slots.push(None);
        }
        self
    }

    /// Slot count including padding.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Declared names, without padding.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn name_count(&self) -> usize {
        self.names.len()
    }

    /// Live value at a save-time slot. `None` for sentinel or out of range.
    pub fn get(&self, slot: usize) -> Option<T> {
        self.slots.get(slot).copied().flatten()
    }

    /// Save-time slot of a live value.
    pub fn position(&self, value: T) -> Option<usize> {
        self.slots.iter().position(|s| *s == Some(value))
    }

    /// Number of 4-slot hex rows needed to carry the table.
    pub fn hex_rows(&self) -> usize {
        self.slots.len().div_ceil(4)
    }
}

/// Read `<size_key>` and the same-length `<vector_key>` and resolve each
/// name. A size without a matching vector is header corruption.
pub fn load_order_table<T: Copy + PartialEq>(
    file: &SectionFile,
    size_key: &str,
    vector_key: &str,
    status: &mut LoadStatus,
    resolve: impl Fn(&str) -> Option<T>,
) -> SaveResult<OrderTable<T>> {
    let size = file.lookup_int_or(size_key, 0);
    if size < 0 {
        return Err(SaveError::corrupt("savefile", format!("'{size_key}' is negative ({size})")));
    }
    if size == 0 {
        return Ok(OrderTable::default());
    }

    let names = file.lookup_str_list(vector_key).ok_or_else(|| {
        SaveError::corrupt("savefile", format!("'{vector_key}' is missing"))
    })?;
    if names.len() != size as usize {
        return Err(SaveError::corrupt(
            "savefile",
            format!("'{vector_key}' holds {} names but '{size_key}' is {size}", names.len()),
        ));
    }

    let slots = names
        .iter()
        .map(|name| {
            let value = resolve(name);
            if value.is_none() {
                status.warn(format!("'{vector_key}': unknown name '{name}', its entries are ignored"));
            }
            value
        })
        .collect();
    Ok(OrderTable::new(names, slots))
}

pub fn save_order_table<S: AsRef<str>>(
    file: &mut SectionFile,
    size_key: &str,
    vector_key: &str,
    names: &[S],
) {
    file.set_int(size_key, names.len() as i64);
    if !names.is_empty() {
        file.set_str_list(vector_key, names);
    }
}

// ── 0/1 vectors ──────────────────────────────────────────────────────────────

/// One `'1'`/`'0'` per declared name, in table order.
pub fn save_presence<T: Copy + PartialEq>(
    table: &OrderTable<T>,
    present: impl Fn(T) -> bool,
) -> String {
    (0..table.name_count())
        .map(|slot| match table.get(slot) {
            Some(value) if present(value) => '1',
            _ => '0',
        })
        .collect()
}

/// Decode a 0/1 vector written against `table`. A length other than the
/// table's is a warning; the common prefix is still applied.
pub fn load_presence<T: Copy + PartialEq>(
    text: &str,
    table: &OrderTable<T>,
    path: &str,
    status: &mut LoadStatus,
) -> Vec<T> {
    if text.chars().count() != table.name_count() {
        status.warn(format!(
            "'{path}' has {} entries, {} expected",
            text.chars().count(),
            table.name_count()
        ));
    }
    text.chars()
        .take(table.name_count())
        .enumerate()
        .filter(|(_, ch)| *ch == '1')
        .filter_map(|(slot, _)| table.get(slot))
        .collect()
}

// ── The five tables of a savegame ────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct OrderTables {
    pub improvements: OrderTable<ImprovementId>,
    pub techs:        OrderTable<TechId>,
    pub specials:     OrderTable<TileSpecial>,
    pub bases:        OrderTable<BaseId>,
    pub roads:        OrderTable<RoadId>,
}

impl OrderTables {
    pub fn load(file: &SectionFile, ruleset: &Ruleset, status: &mut LoadStatus) -> SaveResult<Self> {
        Ok(Self {
            improvements: load_order_table(
                file,
                "savefile.improvement_size",
                "savefile.improvement_vector",
                status,
                |n| ruleset.improvement_by_name(n),
            )?,
            techs: load_order_table(
                file,
                "savefile.technology_size",
                "savefile.technology_vector",
                status,
                |n| ruleset.tech_by_name(n),
            )?,
            specials: load_order_table(
                file,
                "savefile.specials_size",
                "savefile.specials_vector",
                status,
                TileSpecial::by_name,
            )?
            .padded(),
            bases: load_order_table(
                file,
                "savefile.bases_size",
                "savefile.bases_vector",
                status,
                |n| ruleset.base_by_name(n),
            )?
            .padded(),
            roads: load_order_table(
                file,
                "savefile.roads_size",
                "savefile.roads_vector",
                status,
                |n| ruleset.road_by_name(n),
            )?
            .padded(),
        })
    }

    /// Identity tables for the current build, as used by the writer.
    pub fn current(ruleset: &Ruleset) -> Self {
        fn identity<T: Copy + PartialEq>(
            names: Vec<String>,
            make: impl Fn(usize) -> T,
        ) -> OrderTable<T> {
            let slots = (0..names.len()).map(|i| Some(make(i))).collect();
            OrderTable::new(names, slots).padded()
        }

        Self {
            improvements: identity(
                ruleset.improvements.iter().map(|i| i.name.clone()).collect(),
                |i| i,
            ),
            techs: identity(ruleset.techs.clone(), |i| i),
            specials: identity(
                TileSpecial::ALL.iter().map(|s| s.name().to_string()).collect(),
                |i| TileSpecial::ALL[i],
            ),
            bases: identity(ruleset.bases.iter().map(|b| b.name.clone()).collect(), |i| {
                BaseId(i as u8)
            }),
            roads: identity(ruleset.roads.iter().map(|r| r.name.clone()).collect(), |i| {
                RoadId(i as u8)
            }),
        }
    }

    pub fn save(&self, file: &mut SectionFile) {
        save_order_table(
            file,
            "savefile.improvement_size",
            "savefile.improvement_vector",
            self.improvements.names(),
        );
        save_order_table(
            file,
            "savefile.technology_size",
            "savefile.technology_vector",
            self.techs.names(),
        );
        save_order_table(
            file,
            "savefile.specials_size",
            "savefile.specials_vector",
            self.specials.names(),
        );
        save_order_table(file, "savefile.bases_size", "savefile.bases_vector", self.bases.names());
        save_order_table(file, "savefile.roads_size", "savefile.roads_vector", self.roads.names());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_name_becomes_sentinel() {
        let mut file = SectionFile::new();
        file.set_int("savefile.specials_size", 3);
        file.set_str_list("savefile.specials_vector", &["River", "Worm Hole", "Hut"]);
        let mut status = LoadStatus::new();
        let table = load_order_table(
            &file,
            "savefile.specials_size",
            "savefile.specials_vector",
            &mut status,
            TileSpecial::by_name,
        )
        .expect("load")
        .padded();

        assert_eq!(table.len(), 4);
        assert_eq!(table.get(0), Some(TileSpecial::River));
        assert_eq!(table.get(1), None);
        assert_eq!(table.get(2), Some(TileSpecial::Hut));
        assert_eq!(table.get(3), None);
        assert!(status.is_ok());
        assert_eq!(status.warnings().count(), 1);
    }

    #[test]
    fn presence_vector_follows_table_order() {
        let table = OrderTable::new(
            vec!["B".to_string(), "Gone".to_string(), "A".to_string()],
            vec![Some(1usize), None, Some(0)],
        );
        assert_eq!(save_presence(&table, |v| v == 0), "001");

        let mut status = LoadStatus::new();
        assert_eq!(load_presence("111", &table, "x.done", &mut status), vec![1, 0]);
        assert_eq!(status.warnings().count(), 0);
        load_presence("1", &table, "x.done", &mut status);
        assert_eq!(status.warnings().count(), 1);
    }

    #[test]
    fn size_mismatch_is_corruption() {
        let mut file = SectionFile::new();
        file.set_int("savefile.roads_size", 3);
        file.set_str_list("savefile.roads_vector", &["Road", "Railroad"]);
        let mut status = LoadStatus::new();
        let result = load_order_table(
            &file,
            "savefile.roads_size",
            "savefile.roads_vector",
            &mut status,
            |_| Some(0usize),
        );
        assert!(matches!(result, Err(SaveError::Corrupt { .. })));
    }
}
