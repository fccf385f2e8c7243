//! Allocation flags shared by GMEM and LMEM.
//!
//! Grounded on the teacher's `mm::pool` allocation-tag bitflags, using the
//! same `bitflags` crate the teacher depends on.

use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MemFlags: u32 {
        /// Block never moves and is never evicted by `compact`.
        const FIXED = 1 << 0;
        /// Block may be relocated by a (currently stubbed) compaction pass.
        const MOVABLE = 1 << 1;
        /// Newly allocated bytes are zero-filled.
        const ZEROINIT = 1 << 2;
        /// Block is a candidate for discard when unlocked and unused.
        const DISCARDABLE = 1 << 3;
    }
}
