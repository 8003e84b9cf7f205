//! In-memory stand-ins for the engine's external-interface contracts
//! (`SPEC_FULL.md` §9A), so the rest of the crate's tests can exercise
//! allocation failure and preset persistence without touching real hardware
//! or a filesystem. Test-only: gated out of non-test builds.

use crate::dsp::block::StereoBlock;
use crate::error::PresetError;
use crate::external::{BlockAllocator, FileStore};
use std::collections::HashMap;
use std::sync::Mutex;

/// Bounded in-memory block allocator. `allocate` returns `None` once
/// `capacity` blocks are outstanding, letting tests exercise the
/// audio-interrupt's allocation-failure path (spec §7) deterministically.
pub struct MemoryBlockAllocator {
    capacity: usize,
    outstanding: Mutex<usize>,
}

impl MemoryBlockAllocator {
    pub fn new(capacity: usize) -> Self {
        Self { capacity, outstanding: Mutex::new(0) }
    }

    pub fn outstanding(&self) -> usize {
        *self.outstanding.lock().unwrap()
    }
}

impl BlockAllocator for MemoryBlockAllocator {
    fn allocate(&self) -> Option<StereoBlock> {
        let mut count = self.outstanding.lock().unwrap();
        if *count >= self.capacity {
            return None;
        }
        *count += 1;
        Some(StereoBlock::silence())
    }

    fn release(&self, _block: StereoBlock) {
        let mut count = self.outstanding.lock().unwrap();
        *count = count.saturating_sub(1);
    }
}

/// In-memory file store backed by a `HashMap`, standing in for the preset
/// slots' backing media (spec §6.5) in tests.
#[derive(Default)]
pub struct MemoryFileStore {
    slots: HashMap<u8, Vec<u8>>,
}

impl MemoryFileStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FileStore for MemoryFileStore {
    fn save(&mut self, slot: u8, left: &[i16], right: &[i16]) -> Result<(), PresetError> {
        let bytes = crate::external::encode_preset(left, right);
        self.slots.insert(slot, bytes);
        Ok(())
    }

    fn load(&mut self, slot: u8, capacity: usize) -> Result<(Vec<i16>, Vec<i16>), PresetError> {
        let bytes = self.slots.get(&slot).ok_or(PresetError::NotFound(slot))?;
        crate::external::decode_preset(bytes, capacity)
    }

    fn delete(&mut self, slot: u8) -> Result<(), PresetError> {
        self.slots.remove(&slot);
        Ok(())
    }

    fn exists(&self, slot: u8) -> bool {
        self.slots.contains_key(&slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocator_refuses_past_capacity() {
        let alloc = MemoryBlockAllocator::new(2);
        let a = alloc.allocate().unwrap();
        let _b = alloc.allocate().unwrap();
        assert!(alloc.allocate().is_none());
        alloc.release(a);
        assert!(alloc.allocate().is_some());
    }

    #[test]
    fn file_store_roundtrips_a_slot() {
        let mut store = MemoryFileStore::new();
        assert!(!store.exists(0));
        store.save(0, &[1, 2, 3], &[4, 5, 6]).unwrap();
        assert!(store.exists(0));
        let (left, right) = store.load(0, 100).unwrap();
        assert_eq!(left, vec![1, 2, 3]);
        assert_eq!(right, vec![4, 5, 6]);
        store.delete(0).unwrap();
        assert!(!store.exists(0));
    }

    #[test]
    fn loading_an_empty_slot_is_not_found() {
        let mut store = MemoryFileStore::new();
        assert!(matches!(store.load(3, 10), Err(PresetError::NotFound(3))));
    }
}
