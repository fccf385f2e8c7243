//! Bare-metal lowering sketch (feature = "bare-metal")
//!
//! Spec.md §1 treats the hosted cooperative-switch build as normative and
//! describes a bare-metal 16-bit build only as a *lowering*: context
//! switches become hardware stack swaps and traps arrive through real
//! interrupt vectors rather than the in-process [`crate::trap::TrapDispatcher::dispatch`]
//! call. This module sketches that lowering's two distinguishing pieces —
//! it is not wired into [`crate::ke::Scheduler`] or [`crate::trap::TrapDispatcher`],
//! and carries no tests, matching the teacher's own unfinished
//! `ke::thread::thread_entry_trampoline` (a placeholder `hlt` loop in the
//! source this crate is grounded on).

use x86_64::structures::idt::InterruptDescriptorTable;

/// Install the sixteen named CPU-exception vectors (spec.md §6) so that each
/// one forwards into [`crate::trap::TrapDispatcher::dispatch`] instead of
/// being handled directly by the hardware ISR stub. A real bare-metal build
/// would populate the remaining vectors too; only the named set matters here.
pub fn install_fatal_vectors(_idt: &mut InterruptDescriptorTable) {
    // A full lowering would call `idt[vec].set_handler_fn(trampoline)` for
    // each of the sixteen named vectors, where `trampoline` reconstructs a
    // `TrapContext` from the `InterruptStackFrame` and calls `dispatch`.
    // Left unimplemented: wiring real ISR stubs needs a real ring-0 IDT,
    // which is out of scope for the hosted build this crate targets.
}

/// Build the register image a 16-bit task's stack would need so that the
/// first far jump into it begins executing `entry` with `arg` already
/// loaded, mirroring [`crate::arch::context::init_task_stack`] but for a
/// hardware-switched stack instead of a `swap_context` call.
pub fn init_real_mode_stack(_stack_top: *mut u8, _entry_cs_ip: (u16, u16)) {
    // Left unimplemented: real-mode segment:offset addressing has no
    // hosted-build equivalent to exercise in tests.
}
