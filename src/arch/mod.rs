//! Architecture-specific context switch primitives
//!
//! `context` holds the hosted lowering: a `swapcontext`-equivalent built on
//! `naked_asm!`, the same register discipline the teacher's
//! `arch::x86_64::context` module uses for its `ki_swap_context` /
//! `ki_load_context` pair, unified here into one symmetric primitive (the
//! scheduler always has a valid slot to save into, even on the very first
//! switch, so the teacher's two-function split collapses to one).
//!
//! `bare_metal` is the 16-bit lowering sketch described in spec.md §1 and
//! §9: an IDT-vector trampoline and initial-register-image construction for
//! a build that arrives at traps through real interrupt vectors instead of
//! in-process dispatch. It is feature-gated (`bare-metal`) and not exercised
//! by the test suite — the hosted semantics are normative.

#[cfg(target_arch = "x86_64")]
pub mod context;

#[cfg(all(feature = "bare-metal", target_arch = "x86_64"))]
pub mod bare_metal;
