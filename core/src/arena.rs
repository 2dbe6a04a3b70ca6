//! Generic id-keyed arena for cities and units.
//!
//! Elements keep insertion order, which is the order they are saved in.

use crate::types::IdentityNo;
use std::collections::HashMap;

pub trait Identified {
    fn id(&self) -> IdentityNo;
}

#[derive(Debug, Clone)]
pub struct Arena<T: Identified> {
    items: Vec<T>,
    index: HashMap<IdentityNo, usize>,
}

impl<T: Identified> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Identified> Arena<T> {
    pub fn new() -> Self {
        Self { items: Vec::new(), index: HashMap::new() }
    }

    /// Insert an element. Returns it back if its id is already taken.
    pub fn insert(&mut self, item: T) -> Result<(), T> {
        let id = item.id();
        if self.index.contains_key(&id) {
            return Err(item);
        }
        self.index.insert(id, self.items.len());
        self.items.push(item);
        Ok(())
    }

    pub fn get(&self, id: IdentityNo) -> Option<&T> {
        self.index.get(&id).map(|&i| &self.items[i])
    }

    pub fn get_mut(&mut self, id: IdentityNo) -> Option<&mut T> {
        match self.index.get(&id) {
            Some(&i) => Some(&mut self.items[i]),
            None => None,
        }
    }

    pub fn contains(&self, id: IdentityNo) -> bool {
        self.index.contains_key(&id)
    }

    pub fn remove(&mut self, id: IdentityNo) -> Option<T> {
        let pos = self.index.remove(&id)?;
        let item = self.items.remove(pos);
        for slot in self.index.values_mut() {
            if *slot > pos {
                *slot -= 1;
            }
        }
        Some(item)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.items.iter_mut()
    }

    pub fn ids(&self) -> Vec<IdentityNo> {
        self.items.iter().map(Identified::id).collect()
    }

    /// Reorder elements by a key, keeping relative order on ties.
    pub fn sort_by_key<K: Ord>(&mut self, mut key: impl FnMut(&T) -> K) {
        self.items.sort_by_key(|item| key(item));
        self.reindex();
    }

    fn reindex(&mut self) {
        self.index = self
            .items
            .iter()
            .enumerate()
            .map(|(i, item)| (item.id(), i))
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Thing(u32);

    impl Identified for Thing {
        fn id(&self) -> IdentityNo {
            self.0
        }
    }

    #[test]
    fn remove_keeps_order_and_index() {
        let mut arena = Arena::new();
        for id in [5, 2, 9] {
            assert!(arena.insert(Thing(id)).is_ok());
        }
        assert!(arena.insert(Thing(2)).is_err());
        arena.remove(5);
        assert_eq!(arena.ids(), vec![2, 9]);
        assert_eq!(arena.get(9).map(|t| t.0), Some(9));
    }
}
