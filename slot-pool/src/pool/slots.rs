use std::collections::{HashMap, VecDeque};
use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;

use super::error::{AddError, ReleaseError};

/// The identity of a pooled resource: the address of its shared allocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct ResourceKey(usize);

impl ResourceKey {
    fn of<T>(resource: &Arc<T>) -> Self {
        Self(Arc::as_ptr(resource) as usize)
    }
}

struct Slot<T> {
    resource: Arc<T>,
    free: bool,
}

/// Tracks every resource owned by a pool and whether it is lent out.
///
/// Free slots are kept in a FIFO list of indices, so finding a free resource
/// and returning one are both constant time. The length of that list is the
/// free count.
pub(crate) struct SlotTable<T> {
    slots: Vec<Slot<T>>,
    index: HashMap<ResourceKey, usize>,
    free: VecDeque<usize>,
}

impl<T> SlotTable<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
            free: VecDeque::with_capacity(capacity),
        }
    }

    /// Create a table of `count` free slots, calling `create` once for each.
    pub fn initialize<F>(mut create: F, count: usize) -> Result<Self, AddError>
    where
        F: FnMut() -> Arc<T>,
    {
        let mut table = Self::with_capacity(count);
        for _ in 0..count {
            table.insert(create(), true)?;
        }
        Ok(table)
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    /// Append a slot for a new resource, either free or already borrowed.
    pub fn insert(&mut self, resource: Arc<T>, free: bool) -> Result<usize, AddError> {
        let key = ResourceKey::of(&resource);
        if self.index.contains_key(&key) {
            return Err(AddError::DuplicateResource);
        }
        let idx = self.slots.len();
        self.slots.push(Slot { resource, free });
        self.index.insert(key, idx);
        if free {
            self.free.push_back(idx);
        }
        Ok(idx)
    }

    /// Take the next free slot, marking it borrowed.
    pub fn acquire(&mut self) -> Option<Arc<T>> {
        let idx = self.free.pop_front()?;
        let slot = &mut self.slots[idx];
        debug_assert!(slot.free, "free list entry for a borrowed slot");
        slot.free = false;
        Some(slot.resource.clone())
    }

    /// Find the slot of a resource which is currently borrowed.
    pub fn borrowed_index(&self, resource: &Arc<T>) -> Result<usize, ReleaseError> {
        let idx = *self
            .index
            .get(&ResourceKey::of(resource))
            .ok_or(ReleaseError::UnknownResource)?;
        if self.slots[idx].free {
            Err(ReleaseError::DoubleRelease)
        } else {
            Ok(idx)
        }
    }

    pub fn mark_free(&mut self, idx: usize) {
        let slot = &mut self.slots[idx];
        debug_assert!(!slot.free, "slot is already free");
        slot.free = true;
        self.free.push_back(idx);
    }
}

impl<T> Debug for SlotTable<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotTable")
            .field("capacity", &self.capacity())
            .field("free", &self.free_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counted(count: usize) -> SlotTable<usize> {
        let mut next = 0;
        SlotTable::initialize(
            || {
                next += 1;
                Arc::new(next)
            },
            count,
        )
        .unwrap()
    }

    fn free_flags<T>(table: &SlotTable<T>) -> usize {
        table.slots.iter().filter(|slot| slot.free).count()
    }

    #[test]
    fn slots_initialize_free() {
        let table = counted(3);
        assert_eq!(table.capacity(), 3);
        assert_eq!(table.free_count(), 3);
        assert_eq!(free_flags(&table), 3);
    }

    #[test]
    fn slots_acquire_in_order() {
        let mut table = counted(2);
        assert_eq!(*table.acquire().unwrap(), 1);
        assert_eq!(*table.acquire().unwrap(), 2);
        assert!(table.acquire().is_none());
        assert_eq!(table.free_count(), 0);
        assert_eq!(free_flags(&table), 0);
    }

    #[test]
    fn slots_release_lookup() {
        let mut table = counted(1);
        let res = table.acquire().unwrap();
        let idx = table.borrowed_index(&res).unwrap();
        table.mark_free(idx);
        assert_eq!(table.free_count(), 1);
        assert_eq!(
            table.borrowed_index(&res),
            Err(ReleaseError::DoubleRelease)
        );
        // equal value, different allocation
        assert_eq!(
            table.borrowed_index(&Arc::new(1)),
            Err(ReleaseError::UnknownResource)
        );
    }

    #[test]
    fn slots_reject_duplicate() {
        let mut table = SlotTable::with_capacity(0);
        let res = Arc::new(5u8);
        assert_eq!(table.insert(res.clone(), true), Ok(0));
        assert_eq!(
            table.insert(res.clone(), true),
            Err(AddError::DuplicateResource)
        );
        assert_eq!(table.borrowed_index(&res), Err(ReleaseError::DoubleRelease));
        assert_eq!(table.capacity(), 1);
        assert_eq!(table.free_count(), 1);
    }

    #[test]
    fn slots_insert_borrowed() {
        let mut table = counted(1);
        let res = Arc::new(10);
        table.insert(res.clone(), false).unwrap();
        assert_eq!(table.capacity(), 2);
        assert_eq!(table.free_count(), 1);
        assert!(table.borrowed_index(&res).is_ok());
    }

    #[test]
    fn slots_initialize_duplicate() {
        let shared = Arc::new(0u32);
        let result = SlotTable::initialize(|| shared.clone(), 2);
        assert_eq!(result.err(), Some(AddError::DuplicateResource));
    }
}
