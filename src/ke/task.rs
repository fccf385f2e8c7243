//! Task descriptor (KTHREAD analogue)
//!
//! Mirrors the teacher's `ke::thread::KThread` shape (scheduling fields,
//! stack bounds, saved register context, owning-process-style back
//! reference) but trimmed to what spec.md's data model actually names, and
//! completed where the teacher left a TODO: `entry`/`arg` really do run on
//! first resume (see [`crate::arch::context`]).

use std::ffi::c_void;

use crate::arch::context::{SavedContext, TaskLinkage};
use crate::handle::Handle;

/// A task's scheduling priority band. Iterated High-before-Normal-before-Low
/// by [`crate::ke::Scheduler::run_pass`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    Low,
    Normal,
    High,
}

/// Lifecycle state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Ready,
    Running,
    Yielded,
    Terminated,
}

/// The work a task executes: a plain C-ABI function pointer plus an opaque
/// argument, so `create` can hand it directly to the initial stack image
/// without any Rust closure machinery crossing the context-switch boundary.
pub type TaskEntry = unsafe extern "C" fn(*mut c_void);

/// One slot in the scheduler's task table.
pub struct TaskDescriptor {
    pub(crate) handle: Handle,
    pub(crate) state: TaskState,
    pub(crate) priority: Priority,
    pub(crate) entry: TaskEntry,
    pub(crate) arg: *mut c_void,
    /// Exclusively owned; the task's complete stack while it is not Running.
    pub(crate) stack: Vec<u8>,
    pub(crate) saved_context: SavedContext,
    /// Pins the `TaskLinkage` the initial stack image's r12 slot points at.
    pub(crate) linkage: Box<TaskLinkage>,
    /// GMEM handles this task is responsible for, duplicate-suppressed,
    /// bounded by `Limits::max_owned_mem`.
    pub(crate) owned_mem: Vec<Handle>,
}

impl TaskDescriptor {
    pub fn handle(&self) -> Handle {
        self.handle
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn stack_size(&self) -> usize {
        self.stack.len()
    }

    pub fn owned_mem(&self) -> &[Handle] {
        &self.owned_mem
    }
}

// SAFETY: a TaskDescriptor's raw pointers (`arg`, the linkage's `entry`/`arg`)
// are only ever dereferenced while the scheduler runs the task cooperatively
// on the single thread that owns the scheduler; no other thread touches them.
unsafe impl Send for TaskDescriptor {}
