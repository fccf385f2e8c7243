//! LMEM: the per-module local heap
//!
//! Same shape as GMEM but sized the way 16-bit local heaps are: block sizes
//! are bounded to `u16`, and blocks support in-place `realloc`. Grounded on
//! the teacher's `mm::pool` allocator, narrowed per spec.md's LMEM model.

use crate::config::Limits;
use crate::error::{KernelError, Result};
use crate::handle::{Handle, HandleTable};
use crate::mm::flags::MemFlags;

struct LmemBlock {
    owner: Handle,
    flags: MemFlags,
    lock_count: u32,
    data: Vec<u8>,
}

pub struct LocalHeap {
    blocks: HandleTable<LmemBlock>,
}

impl LocalHeap {
    pub fn new(limits: &Limits) -> Self {
        LocalHeap {
            blocks: HandleTable::new(limits.max_lmem_blocks),
        }
    }

    pub fn alloc(&mut self, owner: Handle, size: u16, flags: MemFlags) -> Result<Handle> {
        if size == 0 {
            return Err(KernelError::ZeroSize);
        }
        self.blocks.insert(|_handle| LmemBlock {
            owner,
            flags,
            lock_count: 0,
            data: vec![0u8; size as usize],
        })
    }

    pub fn free(&mut self, handle: Handle) -> Result<()> {
        self.blocks.remove(handle)?;
        Ok(())
    }

    /// Resize a block in place and update its flags. A `new_size` of 0 is
    /// rejected; callers that want to free a block use `free`.
    pub fn realloc(&mut self, handle: Handle, new_size: u16, flags: MemFlags) -> Result<()> {
        if new_size == 0 {
            return Err(KernelError::ZeroSize);
        }
        let block = self.blocks.get_mut(handle)?;
        block.data.resize(new_size as usize, 0);
        block.flags = flags;
        Ok(())
    }

    pub fn lock(&mut self, handle: Handle) -> Result<*mut u8> {
        let block = self.blocks.get_mut(handle)?;
        block.lock_count = block.lock_count.saturating_add(1);
        Ok(block.data.as_mut_ptr())
    }

    pub fn unlock(&mut self, handle: Handle) -> Result<u32> {
        let block = self.blocks.get_mut(handle)?;
        block.lock_count = block.lock_count.saturating_sub(1);
        Ok(block.lock_count)
    }

    pub fn size(&self, handle: Handle) -> Result<u16> {
        Ok(self.blocks.get(handle)?.data.len() as u16)
    }

    pub fn flags(&self, handle: Handle) -> Result<MemFlags> {
        Ok(self.blocks.get(handle)?.flags)
    }

    /// Discard every block in the heap at once, as when the owning module
    /// unloads. LMEM has no cross-heap `free_by_owner` — reclaiming a
    /// single owner's blocks without tearing down the rest of the heap
    /// isn't a local-heap operation; that granularity belongs to GMEM.
    /// Returns the number of blocks discarded.
    pub fn heap_free(&mut self) -> usize {
        let count = self.blocks.len();
        self.blocks = HandleTable::new(self.blocks.capacity());
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heap() -> LocalHeap {
        LocalHeap::new(&Limits::DEFAULT)
    }

    #[test]
    fn realloc_grows_and_shrinks_in_place() {
        let mut h = heap();
        let handle = h.alloc(1, 8, MemFlags::FIXED).unwrap();
        h.realloc(handle, 32, MemFlags::FIXED).unwrap();
        assert_eq!(h.size(handle).unwrap(), 32);
        h.realloc(handle, 4, MemFlags::FIXED).unwrap();
        assert_eq!(h.size(handle).unwrap(), 4);
    }

    #[test]
    fn realloc_updates_flags() {
        let mut h = heap();
        let handle = h.alloc(1, 8, MemFlags::FIXED).unwrap();
        h.realloc(handle, 8, MemFlags::MOVABLE | MemFlags::DISCARDABLE)
            .unwrap();
        assert_eq!(
            h.flags(handle).unwrap(),
            MemFlags::MOVABLE | MemFlags::DISCARDABLE
        );
    }

    #[test]
    fn realloc_to_zero_is_rejected() {
        let mut h = heap();
        let handle = h.alloc(1, 8, MemFlags::FIXED).unwrap();
        assert_eq!(
            h.realloc(handle, 0, MemFlags::FIXED).unwrap_err(),
            KernelError::ZeroSize
        );
    }

    #[test]
    fn heap_free_discards_every_block_at_once() {
        let mut h = heap();
        let a = h.alloc(5, 8, MemFlags::FIXED).unwrap();
        let b = h.alloc(6, 8, MemFlags::FIXED).unwrap();
        assert_eq!(h.heap_free(), 2);
        assert!(h.size(a).is_err());
        assert!(h.size(b).is_err());
        // The heap keeps its configured capacity and is usable afterward.
        assert!(h.alloc(5, 8, MemFlags::FIXED).is_ok());
    }
}
