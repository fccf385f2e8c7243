//! NE (New Executable) image reader
//!
//! Parses just enough of the MZ/NE header chain and segment table to feed
//! [`crate::seg::SegmentManager`]: magic checks, the `e_lfanew` indirection,
//! and the segment table's zero-means-65536 encoding. Grounded on the
//! teacher's `ldr::pe` loader, adapted from PE/COFF to the older NE layout.

mod header;

pub use header::{MzHeader, NeHeader, SegmentDescriptor, NE_HEADER_SIZE, SEGMENT_DESCRIPTOR_SIZE};

use crate::config::Limits;
use crate::error::Result;
use crate::mm::MemFlags;
use crate::seg::SegmentManager;

/// Parse `image` and build a [`SegmentManager`] preloaded with one segment
/// per entry in the NE segment table, using the descriptor's preload
/// (DISCARDABLE-equivalent) bit to pick flags.
pub fn load_segments(image: Vec<u8>, limits: &Limits) -> Result<SegmentManager> {
    let mz = MzHeader::parse(&image)?;
    let ne = NeHeader::parse(&image, mz.e_lfanew as usize)?;
    let descriptors = SegmentDescriptor::parse_table(&image, &ne)?;

    let mut manager = SegmentManager::new(image, limits);
    for descriptor in descriptors {
        if descriptor.data_length == 0 {
            continue;
        }
        let flags = flags_from_ne(descriptor.flags);
        // `min_alloc` is the segment's in-memory allocation size; a
        // malformed header could claim one smaller than the data it holds,
        // so widen it rather than let `create` reject the segment outright.
        let alloc_size = descriptor.min_alloc.max(descriptor.data_length);
        manager.create(
            descriptor.data_offset,
            descriptor.data_length,
            alloc_size,
            flags,
        )?;
    }
    Ok(manager)
}

/// NE segment flag bit 0x1000 marks a segment discardable, matching the
/// classic NSEGFLAGS encoding; movability (bit 0x0010) maps the same way.
fn flags_from_ne(ne_flags: u16) -> MemFlags {
    let mut flags = MemFlags::empty();
    if ne_flags & 0x1000 != 0 {
        flags |= MemFlags::DISCARDABLE;
    }
    if ne_flags & 0x0010 != 0 {
        flags |= MemFlags::MOVABLE;
    } else {
        flags |= MemFlags::FIXED;
    }
    flags
}
