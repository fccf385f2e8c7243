//! Cooperative task scheduler
//!
//! Grounded on the teacher's `ke::scheduler::Scheduler` (table-backed task
//! list, priority-banded ready queue) and `ke::thread` (the descriptor
//! fields), combined with the unified `swap_context` primitive in
//! [`crate::arch::context`].

use std::cell::Cell;
use std::ffi::c_void;

use crate::arch::context::{self, SavedContext};
use crate::config::Limits;
use crate::error::{KernelError, Result};
use crate::handle::{Handle, HandleTable};
use crate::ke::task::{Priority, TaskDescriptor, TaskEntry, TaskState};

thread_local! {
    /// Raw pointer to the `Scheduler` currently executing a task on this
    /// thread, so `yield_now` can find its way back without a handle to the
    /// scheduler being threaded through every task's argument. Null outside
    /// of `run_pass`.
    static CURRENT_SCHEDULER: Cell<*mut c_void> = const { Cell::new(std::ptr::null_mut()) };
}

/// Priority bands in the order `run_pass` visits them.
const PASS_ORDER: [Priority; 3] = [Priority::High, Priority::Normal, Priority::Low];

pub struct Scheduler {
    tasks: HandleTable<TaskDescriptor>,
    limits: Limits,
    /// Heap-pinned so its address stays stable across any future move of the
    /// `Scheduler` value itself; every task's `TaskLinkage::return_rsp` is
    /// set to this pointer once, at creation time.
    scheduler_context: Box<SavedContext>,
    current: Option<Handle>,
}

impl Scheduler {
    pub fn new(limits: Limits) -> Self {
        Scheduler {
            tasks: HandleTable::new(limits.max_tasks),
            limits,
            scheduler_context: Box::new(SavedContext::empty()),
            current: None,
        }
    }

    pub fn with_capacity(max_tasks: usize) -> Self {
        Scheduler::new(Limits {
            max_tasks,
            ..Limits::DEFAULT
        })
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Create a new task. `stack_size` of 0 means "use the configured
    /// default"; a nonzero size below the configured minimum is raised to
    /// the minimum rather than rejected.
    pub fn create(
        &mut self,
        entry: TaskEntry,
        arg: *mut c_void,
        stack_size: usize,
        priority: Priority,
    ) -> Result<Handle> {
        let effective_size = if stack_size == 0 {
            self.limits.default_stack_size
        } else {
            stack_size.max(self.limits.min_stack_size)
        };
        let scheduler_ctx_ptr: *mut SavedContext = &mut *self.scheduler_context;

        self.tasks.insert(move |handle| {
            let mut stack = vec![0u8; effective_size];
            let stack_top = unsafe { stack.as_mut_ptr().add(stack.len()) };
            let linkage = Box::new(context::TaskLinkage {
                entry,
                arg,
                return_rsp: scheduler_ctx_ptr,
            });
            let linkage_ptr = Box::into_raw(linkage);
            let rsp = unsafe { context::init_task_stack(stack_top, linkage_ptr) };
            TaskDescriptor {
                handle,
                state: TaskState::Ready,
                priority,
                entry,
                arg,
                stack,
                saved_context: SavedContext::from_raw(rsp),
                linkage: unsafe { Box::from_raw(linkage_ptr) },
                owned_mem: Vec::new(),
            }
        })
    }

    pub fn get(&self, handle: Handle) -> Result<&TaskDescriptor> {
        self.tasks.get(handle)
    }

    /// Destroy a task. Fails with `StateError` if the task is currently
    /// running (a task cannot destroy itself mid-execution via this path).
    pub fn destroy(&mut self, handle: Handle) -> Result<()> {
        if self.tasks.get(handle)?.state == TaskState::Running {
            return Err(KernelError::StateError);
        }
        self.tasks.remove(handle)?;
        Ok(())
    }

    /// Record that `handle` owns `mem`, silently ignoring duplicates.
    pub fn own_mem(&mut self, handle: Handle, mem: Handle) -> Result<()> {
        let task = self.tasks.get_mut(handle)?;
        if task.owned_mem.contains(&mem) {
            return Ok(());
        }
        if task.owned_mem.len() >= self.limits.max_owned_mem {
            return Err(KernelError::Full);
        }
        task.owned_mem.push(mem);
        Ok(())
    }

    /// Remove `mem` from `handle`'s owned list. `NotFound` if it wasn't owned.
    pub fn disown_mem(&mut self, handle: Handle, mem: Handle) -> Result<()> {
        let task = self.tasks.get_mut(handle)?;
        let before = task.owned_mem.len();
        task.owned_mem.retain(|&m| m != mem);
        if task.owned_mem.len() == before {
            return Err(KernelError::NotFound);
        }
        Ok(())
    }

    /// Run one sweep: every Ready or Yielded task, high priority first,
    /// each resumed exactly once. Returns the number of tasks actually run.
    pub fn run_pass(&mut self) -> usize {
        let mut run_count = 0;

        for priority in PASS_ORDER {
            let candidates: Vec<Handle> = self
                .tasks
                .iter()
                .filter(|(_, t)| {
                    t.priority == priority
                        && matches!(t.state, TaskState::Ready | TaskState::Yielded)
                })
                .map(|(h, _)| h)
                .collect();

            for handle in candidates {
                let runnable = matches!(
                    self.tasks.get(handle).map(|t| t.state),
                    Ok(TaskState::Ready) | Ok(TaskState::Yielded)
                );
                if !runnable {
                    continue;
                }

                self.tasks.get_mut(handle).unwrap().state = TaskState::Running;
                self.current = Some(handle);
                run_count += 1;

                let new_rsp = self.tasks.get(handle).unwrap().saved_context.raw();
                unsafe {
                    CURRENT_SCHEDULER.with(|c| c.set(self as *mut Scheduler as *mut c_void));
                    context::swap_context(&mut *self.scheduler_context, new_rsp);
                    CURRENT_SCHEDULER.with(|c| c.set(std::ptr::null_mut()));
                }
                self.current = None;

                // `yield_current` always sets Yielded before swapping back.
                // Still Running here means the task fell off the end of
                // `entry` and returned through the trampoline instead.
                let task = self.tasks.get_mut(handle).unwrap();
                if task.state == TaskState::Running {
                    task.state = TaskState::Terminated;
                }
            }
        }

        run_count
    }

    fn yield_current(&mut self) {
        let Some(handle) = self.current else {
            return;
        };
        let scheduler_ctx_ptr: *mut SavedContext = &mut *self.scheduler_context;

        let task = self
            .tasks
            .get_mut(handle)
            .expect("currently-running task must exist");
        task.state = TaskState::Yielded;
        let save_slot: *mut SavedContext = &mut task.saved_context;

        unsafe {
            context::swap_context(save_slot, (*scheduler_ctx_ptr).raw());
        }

        // Resumed: the scheduler swapped back into us for another run_pass.
        let task = self
            .tasks
            .get_mut(handle)
            .expect("currently-running task must exist");
        task.state = TaskState::Running;
    }
}

/// Called from inside a running task to yield control back to the scheduler
/// for the remainder of the current `run_pass`. A no-op if called outside
/// of any `run_pass` (no scheduler is currently resuming a task on this
/// thread), matching spec.md's documented edge case.
pub fn yield_now() {
    CURRENT_SCHEDULER.with(|c| {
        let ptr = c.get();
        if ptr.is_null() {
            return;
        }
        unsafe {
            let scheduler = &mut *(ptr as *mut Scheduler);
            scheduler.yield_current();
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    static COUNTER: AtomicU32 = AtomicU32::new(0);

    unsafe extern "C" fn increments_once(_arg: *mut c_void) {
        COUNTER.fetch_add(1, Ordering::SeqCst);
    }

    unsafe extern "C" fn yields_then_increments(_arg: *mut c_void) {
        COUNTER.fetch_add(1, Ordering::SeqCst);
        yield_now();
        COUNTER.fetch_add(1, Ordering::SeqCst);
    }

    #[test]
    fn task_runs_to_completion_and_terminates() {
        COUNTER.store(0, Ordering::SeqCst);
        let mut sched = Scheduler::with_capacity(4);
        let h = sched
            .create(increments_once, std::ptr::null_mut(), 0, Priority::Normal)
            .unwrap();
        let run = sched.run_pass();
        assert_eq!(run, 1);
        assert_eq!(COUNTER.load(Ordering::SeqCst), 1);
        assert_eq!(sched.get(h).unwrap().state(), TaskState::Terminated);
        // Already-terminated tasks are not resumed on the next pass.
        assert_eq!(sched.run_pass(), 0);
    }

    #[test]
    fn yield_resumes_on_next_pass_exactly_where_it_left_off() {
        COUNTER.store(0, Ordering::SeqCst);
        let mut sched = Scheduler::with_capacity(4);
        let h = sched
            .create(
                yields_then_increments,
                std::ptr::null_mut(),
                0,
                Priority::Normal,
            )
            .unwrap();

        sched.run_pass();
        assert_eq!(COUNTER.load(Ordering::SeqCst), 1);
        assert_eq!(sched.get(h).unwrap().state(), TaskState::Yielded);

        sched.run_pass();
        assert_eq!(COUNTER.load(Ordering::SeqCst), 2);
        assert_eq!(sched.get(h).unwrap().state(), TaskState::Terminated);
    }

    #[test]
    fn run_pass_visits_high_before_normal_before_low() {
        static ORDER: std::sync::Mutex<Vec<u8>> = std::sync::Mutex::new(Vec::new());
        unsafe extern "C" fn record(arg: *mut c_void) {
            let tag = arg as usize as u8;
            ORDER.lock().unwrap().push(tag);
        }

        let mut sched = Scheduler::with_capacity(8);
        sched
            .create(record, 2usize as *mut c_void, 0, Priority::Low)
            .unwrap();
        sched
            .create(record, 0usize as *mut c_void, 0, Priority::High)
            .unwrap();
        sched
            .create(record, 1usize as *mut c_void, 0, Priority::Normal)
            .unwrap();

        sched.run_pass();
        assert_eq!(*ORDER.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn yield_outside_a_pass_is_a_no_op() {
        yield_now(); // must not panic
    }

    #[test]
    fn destroying_a_running_task_is_rejected() {
        unsafe extern "C" fn self_destroy(arg: *mut c_void) {
            let sched = unsafe { &mut *(arg as *mut Scheduler) };
            let h = sched.current.expect("self is running");
            assert_eq!(sched.destroy(h).unwrap_err(), KernelError::StateError);
        }

        let mut sched = Scheduler::with_capacity(4);
        let sched_ptr: *mut Scheduler = &mut sched;
        sched
            .create(self_destroy, sched_ptr as *mut c_void, 0, Priority::Normal)
            .unwrap();
        sched.run_pass();
    }

    #[test]
    fn owned_mem_suppresses_duplicates_and_tracks_list() {
        let mut sched = Scheduler::with_capacity(4);
        let h = sched
            .create(increments_once, std::ptr::null_mut(), 0, Priority::Normal)
            .unwrap();
        sched.own_mem(h, 7).unwrap();
        sched.own_mem(h, 7).unwrap();
        assert_eq!(sched.get(h).unwrap().owned_mem(), &[7]);
        sched.disown_mem(h, 7).unwrap();
        assert_eq!(sched.disown_mem(h, 7).unwrap_err(), KernelError::NotFound);
    }
}
