//! Cooperative scheduler (KE — kernel executive, in the teacher's naming)
//!
//! Grounded on `ke::scheduler` and `ke::thread` in the teacher repo. The
//! split mirrors theirs: `task` holds the per-task descriptor and enums,
//! `scheduler` holds the table-owning scheduler and the pass algorithm.

mod scheduler;
mod task;

pub use scheduler::{yield_now, Scheduler};
pub use task::{Priority, TaskDescriptor, TaskEntry, TaskState};
