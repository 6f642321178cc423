//! Dense containers keyed by free variable id.
//!
//! Free variable ids inside one tree form a small, nearly contiguous range,
//! so both containers store their entries in a flat buffer offset by the
//! smallest id seen and grow geometrically when an id falls outside it.

use bitvec::vec::BitVec;
use std::fmt;

/// Set of free variable ids backed by a bitmap.
#[derive(Clone, Default)]
pub struct FreeVarIdSet {
    offset: usize,
    bits: BitVec,
    len: usize,
}

impl FreeVarIdSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `id`, returning `true` if it was not already present.
    pub fn insert(&mut self, id: usize) -> bool {
        self.reserve_for(id);
        let idx = id - self.offset;
        if self.bits[idx] {
            return false;
        }
        self.bits.set(idx, true);
        self.len += 1;
        true
    }

    pub fn remove(&mut self, id: usize) -> bool {
        match self.slot(id) {
            Some(idx) if self.bits[idx] => {
                self.bits.set(idx, false);
                self.len -= 1;
                true
            }
            _ => false,
        }
    }

    pub fn contains(&self, id: usize) -> bool {
        self.slot(id).is_some_and(|idx| self.bits[idx])
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.bits.clear();
        self.offset = 0;
        self.len = 0;
    }

    /// Smallest id in the set.
    pub fn min(&self) -> Option<usize> {
        self.bits.first_one().map(|idx| idx + self.offset)
    }

    /// Largest id in the set.
    pub fn max(&self) -> Option<usize> {
        self.bits.last_one().map(|idx| idx + self.offset)
    }

    /// Ids in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        let offset = self.offset;
        self.bits.iter_ones().map(move |idx| idx + offset)
    }

    pub fn union_with(&mut self, other: &FreeVarIdSet) {
        for id in other.iter() {
            self.insert(id);
        }
    }

    fn slot(&self, id: usize) -> Option<usize> {
        if id < self.offset {
            return None;
        }
        let idx = id - self.offset;
        (idx < self.bits.len()).then_some(idx)
    }

    fn reserve_for(&mut self, id: usize) {
        if self.bits.is_empty() {
            self.offset = id;
            self.bits = BitVec::repeat(false, 1);
        } else if id < self.offset {
            let shift = self.offset - id;
            let mut grown: BitVec = BitVec::repeat(false, shift);
            grown.extend_from_bitslice(self.bits.as_bitslice());
            self.bits = grown;
            self.offset = id;
        } else if id - self.offset >= self.bits.len() {
            let needed = id - self.offset + 1;
            let new_len = needed.max(self.bits.len() * 2);
            self.bits.resize(new_len, false);
        }
    }
}

impl PartialEq for FreeVarIdSet {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.iter().eq(other.iter())
    }
}

impl Eq for FreeVarIdSet {}

impl fmt::Debug for FreeVarIdSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl FromIterator<usize> for FreeVarIdSet {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        let mut set = FreeVarIdSet::new();
        set.extend(iter);
        set
    }
}

impl Extend<usize> for FreeVarIdSet {
    fn extend<I: IntoIterator<Item = usize>>(&mut self, iter: I) {
        for id in iter {
            self.insert(id);
        }
    }
}

/// Map from free variable id to `T`, stored as a dense slot vector.
#[derive(Clone)]
pub struct FreeVarMap<T> {
    offset: usize,
    slots: Vec<Option<T>>,
    len: usize,
}

impl<T> Default for FreeVarMap<T> {
    fn default() -> Self {
        Self { offset: 0, slots: Vec::new(), len: 0 }
    }
}

impl<T> FreeVarMap<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the value for `id`, returning the old value.
    pub fn insert(&mut self, id: usize, value: T) -> Option<T> {
        self.reserve_for(id);
        let old = self.slots[id - self.offset].replace(value);
        if old.is_none() {
            self.len += 1;
        }
        old
    }

    pub fn get(&self, id: usize) -> Option<&T> {
        self.slot(id).and_then(|idx| self.slots[idx].as_ref())
    }

    pub fn get_mut(&mut self, id: usize) -> Option<&mut T> {
        let idx = self.slot(id)?;
        self.slots[idx].as_mut()
    }

    pub fn contains(&self, id: usize) -> bool {
        self.get(id).is_some()
    }

    pub fn remove(&mut self, id: usize) -> Option<T> {
        let idx = self.slot(id)?;
        let old = self.slots[idx].take();
        if old.is_some() {
            self.len -= 1;
        }
        old
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.offset = 0;
        self.len = 0;
    }

    /// Entries in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> + '_ {
        let offset = self.offset;
        self.slots
            .iter()
            .enumerate()
            .filter_map(move |(idx, slot)| slot.as_ref().map(|v| (idx + offset, v)))
    }

    pub fn keys(&self) -> impl Iterator<Item = usize> + '_ {
        self.iter().map(|(id, _)| id)
    }

    fn slot(&self, id: usize) -> Option<usize> {
        if id < self.offset {
            return None;
        }
        let idx = id - self.offset;
        (idx < self.slots.len()).then_some(idx)
    }

    fn reserve_for(&mut self, id: usize) {
        if self.slots.is_empty() {
            self.offset = id;
            self.slots.push(None);
        } else if id < self.offset {
            let shift = self.offset - id;
            let mut grown: Vec<Option<T>> = Vec::with_capacity(shift + self.slots.len());
            grown.resize_with(shift, || None);
            grown.append(&mut self.slots);
            self.slots = grown;
            self.offset = id;
        } else if id - self.offset >= self.slots.len() {
            let needed = id - self.offset + 1;
            let new_len = needed.max(self.slots.len() * 2);
            self.slots.resize_with(new_len, || None);
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for FreeVarMap<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}
