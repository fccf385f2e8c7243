//! Segment manager: NE-image-backed segments with an evict/reload lifecycle
//!
//! Grounded on the teacher's `ldr::pe` (section-table bounds checking
//! against a loaded image) and `mm::pool` (lock counts, flag-gated
//! reclamation), merged into the Loaded/Evicted state machine spec.md's
//! segment model names. Segment flags reuse [`crate::mm::MemFlags`] — the
//! teacher's own segment descriptors and pool blocks share the same
//! attribute bits (FIXED/MOVABLE/DISCARDABLE), so duplicating the type here
//! would only invite drift.

use crate::config::Limits;
use crate::error::{KernelError, Result};
use crate::handle::{Handle, HandleTable};
use crate::mm::MemFlags;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentState {
    Loaded,
    Evicted,
}

struct SegmentEntry {
    flags: MemFlags,
    state: SegmentState,
    lock_count: u32,
    file_offset: usize,
    /// Bytes actually present in the backing image.
    file_size: usize,
    /// Bytes to allocate in memory; always >= `file_size`. The tail beyond
    /// `file_size` is BSS — zero-filled, never read from the image.
    alloc_size: usize,
    data: Vec<u8>,
}

/// Owns the backing file image and every segment read out of it.
pub struct SegmentManager {
    segments: HandleTable<SegmentEntry>,
    image: Vec<u8>,
}

impl SegmentManager {
    pub fn new(image: Vec<u8>, limits: &Limits) -> Self {
        SegmentManager {
            segments: HandleTable::new(limits.max_segments),
            image,
        }
    }

    /// Register and immediately load a segment: `file_size` bytes are read
    /// from `[file_offset, file_offset + file_size)` of the backing image
    /// into an `alloc_size`-byte buffer (`alloc_size` must be at least
    /// `file_size`; the tail beyond `file_size` is zero-filled BSS).
    pub fn create(
        &mut self,
        file_offset: usize,
        file_size: usize,
        alloc_size: usize,
        flags: MemFlags,
    ) -> Result<Handle> {
        if alloc_size < file_size {
            return Err(KernelError::AllocFailure);
        }
        let payload = self.read_image(file_offset, file_size)?;
        let mut data = vec![0u8; alloc_size];
        data[..file_size].copy_from_slice(&payload);
        self.segments.insert(|_handle| SegmentEntry {
            flags,
            state: SegmentState::Loaded,
            lock_count: 0,
            file_offset,
            file_size,
            alloc_size,
            data,
        })
    }

    /// Bounds-checked read from the backing image; out-of-range ranges are
    /// an `Io` failure (the NE parser, not this manager, is responsible for
    /// rejecting structurally malformed records as `BadData`).
    fn read_image(&self, offset: usize, length: usize) -> Result<Vec<u8>> {
        let end = offset.checked_add(length).ok_or(KernelError::Io)?;
        if end > self.image.len() {
            return Err(KernelError::Io);
        }
        Ok(self.image[offset..end].to_vec())
    }

    pub fn state(&self, handle: Handle) -> Result<SegmentState> {
        Ok(self.segments.get(handle)?.state)
    }

    /// Discard a loaded segment's bytes. Requires `DISCARDABLE` and a zero
    /// lock count; otherwise `StateError`.
    pub fn evict(&mut self, handle: Handle) -> Result<()> {
        let seg = self.segments.get_mut(handle)?;
        if seg.state != SegmentState::Loaded {
            return Ok(()); // already evicted: idempotent
        }
        if !seg.flags.contains(MemFlags::DISCARDABLE) || seg.lock_count != 0 {
            return Err(KernelError::StateError);
        }
        seg.data.clear();
        seg.data.shrink_to_fit();
        seg.state = SegmentState::Evicted;
        Ok(())
    }

    /// Re-read an evicted segment's `file_size` bytes from the backing
    /// image into a freshly zeroed `alloc_size`-byte buffer. Reloading a
    /// segment that is already Loaded is a `StateError`: a caller that
    /// wants this precondition checked can't be handed a disguised no-op.
    pub fn reload(&mut self, handle: Handle) -> Result<()> {
        let (offset, file_size, alloc_size, already_loaded) = {
            let seg = self.segments.get(handle)?;
            (
                seg.file_offset,
                seg.file_size,
                seg.alloc_size,
                seg.state == SegmentState::Loaded,
            )
        };
        if already_loaded {
            return Err(KernelError::StateError);
        }
        let payload = self.read_image(offset, file_size)?;
        let mut data = vec![0u8; alloc_size];
        data[..file_size].copy_from_slice(&payload);
        let seg = self.segments.get_mut(handle)?;
        seg.data = data;
        seg.state = SegmentState::Loaded;
        Ok(())
    }

    /// Returns a pointer to the segment's bytes, or a null pointer if the
    /// segment is currently evicted (mirroring the classic "lock returns
    /// NULL" convention rather than an error).
    pub fn lock(&mut self, handle: Handle) -> Result<*mut u8> {
        let seg = self.segments.get_mut(handle)?;
        if seg.state == SegmentState::Evicted {
            return Ok(std::ptr::null_mut());
        }
        seg.lock_count = seg.lock_count.saturating_add(1);
        Ok(seg.data.as_mut_ptr())
    }

    pub fn unlock(&mut self, handle: Handle) -> Result<u32> {
        let seg = self.segments.get_mut(handle)?;
        seg.lock_count = seg.lock_count.saturating_sub(1);
        Ok(seg.lock_count)
    }

    pub fn flags(&self, handle: Handle) -> Result<MemFlags> {
        Ok(self.segments.get(handle)?.flags)
    }

    /// Evict every movable, unlocked, loaded, discardable segment. Returns
    /// the number evicted.
    pub fn compact(&mut self) -> usize {
        let candidates: Vec<Handle> = self
            .segments
            .iter()
            .filter(|(_, s)| {
                s.state == SegmentState::Loaded
                    && s.lock_count == 0
                    && s.flags.contains(MemFlags::MOVABLE)
                    && s.flags.contains(MemFlags::DISCARDABLE)
            })
            .map(|(h, _)| h)
            .collect();
        let mut reclaimed = 0;
        for handle in candidates {
            if self.evict(handle).is_ok() {
                reclaimed += 1;
            }
        }
        reclaimed
    }
}
