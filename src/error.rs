//! Shared error taxonomy
//!
//! Every fallible operation across the four core components returns
//! `Result<T, KernelError>`. No component recovers on another's behalf;
//! errors are reported at the API boundary where they arise.

use core::fmt;

/// Error kinds shared by the scheduler, memory manager, segment manager and
/// trap dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelError {
    /// A required reference was absent (NULL context pointer on a mutating API).
    Null,
    /// A context was used before its `init`/`table_init`.
    NotInitialized,
    /// A bounded table is at capacity.
    Full,
    /// A handle value is not present in the table.
    NotFound,
    /// A handle value is the invalid sentinel (0) or structurally invalid.
    BadHandle,
    /// A trap vector is out of the 0..16 range.
    BadVector,
    /// Allocation of a backing buffer failed.
    AllocFailure,
    /// A bounds-checked file-image read failed.
    Io,
    /// Operation forbidden in the object's current state.
    StateError,
    /// Allocation of size 0 was requested.
    ZeroSize,
    /// A structurally malformed record was rejected.
    BadData,
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            KernelError::Null => "null reference",
            KernelError::NotInitialized => "not initialized",
            KernelError::Full => "table full",
            KernelError::NotFound => "handle not found",
            KernelError::BadHandle => "bad handle",
            KernelError::BadVector => "trap vector out of range",
            KernelError::AllocFailure => "allocation failure",
            KernelError::Io => "bounds-checked image read failed",
            KernelError::StateError => "operation forbidden in current state",
            KernelError::ZeroSize => "zero-size allocation",
            KernelError::BadData => "structurally malformed record",
        };
        f.write_str(s)
    }
}

impl std::error::Error for KernelError {}

pub type Result<T> = core::result::Result<T, KernelError>;
