//! Named CPU exception vectors
//!
//! The sixteen reserved x86 exception vectors, named the way the teacher's
//! `arch::x86_64::idt` module names them. `FATAL_VECTORS` is this crate's
//! default fatal set — vectors where an unhandled trap panics rather than
//! being silently skipped.

pub const DIVIDE_ERROR: u8 = 0;
pub const DEBUG: u8 = 1;
pub const NON_MASKABLE_INTERRUPT: u8 = 2;
pub const BREAKPOINT: u8 = 3;
pub const OVERFLOW: u8 = 4;
pub const BOUND_RANGE_EXCEEDED: u8 = 5;
pub const INVALID_OPCODE: u8 = 6;
pub const DEVICE_NOT_AVAILABLE: u8 = 7;
pub const DOUBLE_FAULT: u8 = 8;
pub const COPROCESSOR_SEGMENT_OVERRUN: u8 = 9;
pub const INVALID_TSS: u8 = 10;
pub const SEGMENT_NOT_PRESENT: u8 = 11;
pub const STACK_SEGMENT_FAULT: u8 = 12;
pub const GENERAL_PROTECTION_FAULT: u8 = 13;
pub const PAGE_FAULT: u8 = 14;
pub const X87_FLOATING_POINT: u8 = 15;

/// Total number of installable vectors.
pub const VECTOR_COUNT: usize = 16;

/// Vectors that panic by default when no handler overrides the policy.
pub const FATAL_VECTORS: &[u8] = &[
    DIVIDE_ERROR,
    DOUBLE_FAULT,
    STACK_SEGMENT_FAULT,
    GENERAL_PROTECTION_FAULT,
];

pub fn is_fatal(vector: u8) -> bool {
    FATAL_VECTORS.contains(&vector)
}
