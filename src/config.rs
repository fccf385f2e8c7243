//! Table capacities and default sizes
//!
//! Grouped into one struct, mirroring the teacher's `ke::thread::constants`
//! convention, so callers exercising boundary behavior (e.g. the `Full`
//! result) can stand up a smaller table without touching internals.

/// Bounds shared by the scheduler, GMEM/LMEM heaps and segment table.
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    /// Maximum tasks in one `Scheduler` table.
    pub max_tasks: usize,
    /// Maximum GMEM handles owned by a single task (`owned_mem[]`).
    pub max_owned_mem: usize,
    /// Default task stack size in bytes when `create` is given 0.
    pub default_stack_size: usize,
    /// Minimum task stack size in bytes.
    pub min_stack_size: usize,
    /// Maximum GMEM blocks in one `MemoryManager` table.
    pub max_gmem_blocks: usize,
    /// Maximum LMEM blocks in one local heap.
    pub max_lmem_blocks: usize,
    /// Maximum segments in one `SegmentManager` table.
    pub max_segments: usize,
}

impl Limits {
    pub const DEFAULT: Limits = Limits {
        max_tasks: 64,
        max_owned_mem: 32,
        default_stack_size: 4096,
        min_stack_size: 256,
        max_gmem_blocks: 1024,
        max_lmem_blocks: 64,
        max_segments: 256,
    };
}

impl Default for Limits {
    fn default() -> Self {
        Limits::DEFAULT
    }
}
