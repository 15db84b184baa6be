//! Tables keyed by dense guest ids.
//!
//! Every slot carries a generation that moves on each destroy or redefine, so a
//! [`SlotKey`] taken before the slot was recycled never resolves to the new occupant.

use std::collections::TryReserveError;

/// Stable handle to one occupant of a [`SlotMap`] slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotKey {
    index: u32,
    generation: u32,
}

impl SlotKey {
    pub fn index(self) -> u32 {
        self.index
    }

    pub fn generation(self) -> u32 {
        self.generation
    }
}

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self {
            generation: 0,
            value: None,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum SlotError {
    OutOfRange { limit: u32 },
    NoMemory,
}

impl From<TryReserveError> for SlotError {
    fn from(_: TryReserveError) -> Self {
        Self::NoMemory
    }
}

#[derive(Debug)]
pub struct SlotMap<T> {
    slots: Vec<Slot<T>>,
    limit: u32,
    len: usize,
}

impl<T> SlotMap<T> {
    pub fn with_limit(limit: u32) -> Self {
        Self {
            slots: Vec::new(),
            limit,
            len: 0,
        }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn in_range(&self, id: u32) -> bool {
        id < self.limit
    }

    /// Grows the table so `id` has a slot, without touching any occupant.
    pub fn reserve_for(&mut self, id: u32) -> Result<(), SlotError> {
        if !self.in_range(id) {
            return Err(SlotError::OutOfRange { limit: self.limit });
        }
        let needed = id as usize + 1;
        if needed > self.slots.len() {
            self.slots.try_reserve(needed - self.slots.len())?;
            self.slots.resize_with(needed, Slot::default);
        }
        Ok(())
    }

    /// Stores `value` under `id` and returns its key plus whatever lived there before.
    pub fn insert(&mut self, id: u32, value: T) -> Result<(SlotKey, Option<T>), SlotError> {
        self.reserve_for(id)?;
        let slot = &mut self.slots[id as usize];
        let previous = slot.value.take();
        if previous.is_some() {
            slot.generation = slot.generation.wrapping_add(1);
        } else {
            self.len += 1;
        }
        slot.value = Some(value);
        let key = SlotKey {
            index: id,
            generation: slot.generation,
        };
        Ok((key, previous))
    }

    pub fn remove(&mut self, id: u32) -> Option<T> {
        let slot = self.slots.get_mut(id as usize)?;
        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.len -= 1;
        Some(value)
    }

    pub fn get(&self, id: u32) -> Option<&T> {
        self.slots.get(id as usize)?.value.as_ref()
    }

    pub fn get_mut(&mut self, id: u32) -> Option<&mut T> {
        self.slots.get_mut(id as usize)?.value.as_mut()
    }

    pub fn contains(&self, id: u32) -> bool {
        self.get(id).is_some()
    }

    pub fn key_of(&self, id: u32) -> Option<SlotKey> {
        let slot = self.slots.get(id as usize)?;
        slot.value.as_ref().map(|_| SlotKey {
            index: id,
            generation: slot.generation,
        })
    }

    /// Resolves a key, or `None` once the slot has been recycled.
    pub fn get_key(&self, key: SlotKey) -> Option<&T> {
        let slot = self.slots.get(key.index as usize)?;
        if slot.generation != key.generation {
            return None;
        }
        slot.value.as_ref()
    }

    pub fn get_key_mut(&mut self, key: SlotKey) -> Option<&mut T> {
        let slot = self.slots.get_mut(key.index as usize)?;
        if slot.generation != key.generation {
            return None;
        }
        slot.value.as_mut()
    }

    pub fn ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.value.is_some())
            .map(|(i, _)| i as u32)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.value.as_ref().map(|v| (i as u32, v)))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (u32, &mut T)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(i, s)| s.value.as_mut().map(|v| (i as u32, v)))
    }

    /// Removes every occupant, lowest id first.
    pub fn drain(&mut self) -> Vec<(u32, T)> {
        let mut out = Vec::with_capacity(self.len);
        for (i, slot) in self.slots.iter_mut().enumerate() {
            if let Some(v) = slot.value.take() {
                slot.generation = slot.generation.wrapping_add(1);
                out.push((i as u32, v));
            }
        }
        self.len = 0;
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_keys_do_not_resolve_after_redefine() {
        let mut map = SlotMap::with_limit(8);
        let (k1, prev) = map.insert(3, "first").unwrap();
        assert!(prev.is_none());
        let (k2, prev) = map.insert(3, "second").unwrap();
        assert_eq!(prev, Some("first"));
        assert_ne!(k1, k2);
        assert!(map.get_key(k1).is_none());
        assert_eq!(map.get_key(k2), Some(&"second"));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn remove_bumps_generation() {
        let mut map = SlotMap::with_limit(4);
        let (k, _) = map.insert(1, 10u32).unwrap();
        assert_eq!(map.remove(1), Some(10));
        assert!(map.get_key(k).is_none());
        let (k2, _) = map.insert(1, 11).unwrap();
        assert_eq!(k2.index(), 1);
        assert_ne!(k2.generation(), k.generation());
        assert!(map.remove(2).is_none());
    }

    #[test]
    fn ids_beyond_limit_are_rejected() {
        let mut map = SlotMap::with_limit(2);
        assert_eq!(map.insert(2, ()).unwrap_err(), SlotError::OutOfRange { limit: 2 });
        assert!(map.is_empty());
    }

    #[test]
    fn drain_empties_in_id_order() {
        let mut map = SlotMap::with_limit(16);
        map.insert(9, 'b').unwrap();
        map.insert(2, 'a').unwrap();
        assert_eq!(map.ids().collect::<Vec<_>>(), vec![2, 9]);
        assert_eq!(map.drain(), vec![(2, 'a'), (9, 'b')]);
        assert!(map.is_empty());
        assert!(map.get(9).is_none());
    }
}
