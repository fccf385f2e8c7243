//! x86_64 cooperative context switch
//!
//! Saves/restores the callee-saved register set (RBX, RBP, R12-R15, RFLAGS)
//! across a stack switch, exactly as the teacher's
//! `arch::x86_64::context::{ki_swap_context, ki_load_context}` do. Unlike
//! the teacher, a single `swap_context` handles both the "first resume of a
//! brand-new task" and "resume a previously-yielded task" cases: the
//! scheduler always owns a valid save slot (its own `scheduler_rsp`), so
//! there is no case where the old side has nothing to save into.
//!
//! This is the hosted lowering spec.md §1 calls normative: it runs as
//! ordinary userspace code and requires neither ring 0 nor a real IDT.

use core::arch::naked_asm;
use core::ffi::c_void;

/// Opaque saved-register snapshot. Corresponds 1:1 to `TaskDescriptor.saved_context`.
#[derive(Debug)]
#[repr(transparent)]
pub struct SavedContext(usize);

impl SavedContext {
    pub const fn empty() -> Self {
        SavedContext(0)
    }
}

/// Arguments threaded through the initial stack frame to the task
/// trampoline. Lives for as long as the owning `TaskDescriptor` (the
/// scheduler keeps it pinned inside the descriptor, which is never moved
/// while a task is runnable).
#[repr(C)]
pub struct TaskLinkage {
    /// The task's entry point.
    pub entry: unsafe extern "C" fn(*mut c_void),
    /// Opaque argument passed to `entry`.
    pub arg: *mut c_void,
    /// Where to jump back to once `entry` returns (the scheduler's saved rsp cell).
    pub return_rsp: *mut SavedContext,
}

/// Swap the current execution context for `new_ctx`, saving the caller's
/// register state into `save_ctx` first.
///
/// # Safety
/// - `save_ctx` must be a valid, writable `SavedContext` cell.
/// - `new_ctx.0` must hold an rsp value previously produced by this function
///   or by [`init_task_stack`].
#[unsafe(naked)]
pub unsafe extern "C" fn swap_context(save_ctx: *mut SavedContext, new_rsp: usize) {
    naked_asm!(
        "push rbx",
        "push rbp",
        "push r12",
        "push r13",
        "push r14",
        "push r15",
        "pushfq",
        "mov [rdi], rsp",
        "mov rsp, rsi",
        "popfq",
        "pop r15",
        "pop r14",
        "pop r13",
        "pop r12",
        "pop rbp",
        "pop rbx",
        "ret",
    )
}

/// Build the initial stack image for a brand-new task so that the first
/// `swap_context` into it lands in [`task_trampoline_entry`] with the
/// `TaskLinkage` pointer available in `r12`.
///
/// # Safety
/// `stack_top` must be the highest address of a stack buffer at least
/// `size_of::<TaskLinkage>() + 7 * 8` bytes long, owned exclusively by the
/// caller for as long as the returned rsp may be resumed.
pub unsafe fn init_task_stack(stack_top: *mut u8, linkage: *mut TaskLinkage) -> usize {
    let mut sp = stack_top as usize;

    sp -= 8;
    *(sp as *mut u64) = task_trampoline_entry as usize as u64; // "return address"
    sp -= 8;
    *(sp as *mut u64) = 0; // rbx
    sp -= 8;
    *(sp as *mut u64) = 0; // rbp
    sp -= 8;
    *(sp as *mut u64) = linkage as u64; // r12: carries TaskLinkage*
    sp -= 8;
    *(sp as *mut u64) = 0; // r13
    sp -= 8;
    *(sp as *mut u64) = 0; // r14
    sp -= 8;
    *(sp as *mut u64) = 0; // r15
    sp -= 8;
    *(sp as *mut u64) = 0x202; // rflags, interrupts-enabled bit set

    sp
}

/// Naked trampoline: moves the `TaskLinkage*` `swap_context` left sitting in
/// `r12` into the first argument register and calls into Rust.
#[unsafe(naked)]
unsafe extern "C" fn task_trampoline_entry() -> ! {
    naked_asm!("mov rdi, r12", "call {trampoline}", "ud2", trampoline = sym task_trampoline);
}

/// Runs the task's entry point, then swaps back into the scheduler.
///
/// # Safety
/// Called only from [`task_trampoline_entry`] with a valid `TaskLinkage*`.
unsafe extern "C" fn task_trampoline(linkage: *mut TaskLinkage) -> ! {
    let linkage = &*linkage;
    (linkage.entry)(linkage.arg);

    // The task returned from its entry function: it is Terminated. Swap
    // back into the scheduler; this task's own save slot is never read
    // again so a throwaway cell is fine.
    let mut discarded = SavedContext::empty();
    swap_context(&mut discarded, (*linkage.return_rsp).0);
    unreachable!("scheduler must never resume a terminated task")
}

impl SavedContext {
    /// Read the raw rsp value (used to hand a resume target to `swap_context`).
    pub fn raw(&self) -> usize {
        self.0
    }

    /// Construct from a raw rsp value produced by [`init_task_stack`].
    pub fn from_raw(rsp: usize) -> Self {
        SavedContext(rsp)
    }
}
