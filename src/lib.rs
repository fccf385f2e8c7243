//! Portable re-implementation of the WinDOS kernel-replacement layer:
//! a cooperative task scheduler, a handle-indexed memory manager (GMEM and
//! LMEM), an NE segment manager with an evict/reload lifecycle, and a CPU
//! trap dispatcher.
//!
//! The hosted build (this crate, default configuration) is normative: it
//! runs as ordinary userspace code using a `naked_asm!`-based cooperative
//! context switch instead of hardware task state. A `bare-metal` feature
//! sketches the 16-bit lowering but is not exercised by the test suite.

pub mod arch;
pub mod config;
pub mod error;
pub mod handle;
pub mod ke;
pub mod mm;
pub mod ne;
pub mod seg;
pub mod trap;

pub use config::Limits;
pub use error::{KernelError, Result};
pub use handle::{Handle, INVALID_HANDLE};
