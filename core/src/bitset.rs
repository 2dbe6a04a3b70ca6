//! Typed fixed-capacity flag sets.
//!
//! A `FlagSet<T>` holds up to 64 members of an enumeration `T`. The hex
//! packing used by the savegame grids lives in `codec::attrs` and only
//! talks to this type through `insert`/`contains`.

use std::fmt;
use std::marker::PhantomData;

/// Anything that maps onto a dense index below 64.
pub trait FlagIndex: Copy {
    fn index(self) -> usize;
    fn from_index(index: usize) -> Option<Self>;
}

pub const FLAG_CAPACITY: usize = 64;

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FlagSet<T: FlagIndex> {
    bits:    u64,
    _marker: PhantomData<T>,
}

impl<T: FlagIndex> Default for FlagSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: FlagIndex> FlagSet<T> {
    pub const fn new() -> Self {
        Self { bits: 0, _marker: PhantomData }
    }

    /// Returns false when the index does not fit.
    pub fn insert(&mut self, flag: T) -> bool {
        let i = flag.index();
        if i >= FLAG_CAPACITY {
            return false;
        }
        self.bits |= 1 << i;
        true
    }

    pub fn remove(&mut self, flag: T) {
        let i = flag.index();
        if i < FLAG_CAPACITY {
            self.bits &= !(1 << i);
        }
    }

    pub fn contains(&self, flag: T) -> bool {
        let i = flag.index();
        i < FLAG_CAPACITY && self.bits & (1 << i) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    pub fn len(&self) -> usize {
        self.bits.count_ones() as usize
    }

    pub fn clear(&mut self) {
        self.bits = 0;
    }

    /// Members in ascending index order.
    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        (0..FLAG_CAPACITY)
            .filter(move |i| self.bits & (1 << i) != 0)
            .filter_map(T::from_index)
    }

    /// Keep only members also present in `other`.
    pub fn retain_in(&mut self, other: &FlagSet<T>) {
        self.bits &= other.bits;
    }
}

impl<T: FlagIndex> FromIterator<T> for FlagSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = Self::new();
        for flag in iter {
            set.insert(flag);
        }
        set
    }
}

impl<T: FlagIndex + fmt::Debug> fmt::Debug for FlagSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl FlagIndex for usize {
    fn index(self) -> usize {
        self
    }

    fn from_index(index: usize) -> Option<Self> {
        Some(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_contains_iterate() {
        let mut set: FlagSet<usize> = FlagSet::new();
        assert!(set.insert(3));
        assert!(set.insert(63));
        assert!(!set.insert(64));
        assert!(set.contains(3));
        assert!(!set.contains(4));
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![3, 63]);
        set.remove(3);
        assert_eq!(set.len(), 1);
    }
}
