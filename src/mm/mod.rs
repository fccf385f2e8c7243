//! Memory management (MM): GMEM and LMEM
//!
//! Both allocators are generalizations of the teacher's `mm::pool` block
//! table onto [`crate::handle::HandleTable`]; `flags` holds the bitflags
//! type they share.

mod flags;
mod gmem;
mod lmem;

pub use flags::MemFlags;
pub use gmem::MemoryManager;
pub use lmem::LocalHeap;
