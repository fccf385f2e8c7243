//! CPU trap dispatcher
//!
//! Grounded on the teacher's `ke::exception::KiDispatchException` (per-vector
//! handler table, fatal-vector fallback to bugcheck) and `ke::bugcheck`
//! (the panic hook). The handler table is this crate's one permitted
//! mutable global, guarded by `spin::Mutex` exactly as the teacher guards
//! its own per-CPU exception table.

use spin::Mutex;

use crate::error::{KernelError, Result};
use crate::trap::vectors::{self, VECTOR_COUNT};

/// What a trap handler decides should happen next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// Re-execute the faulting instruction.
    Retry,
    /// Move past the faulting instruction and continue.
    Skip,
    /// Unrecoverable: invoke the panic hook.
    Panic,
}

/// A per-vector trap handler. `info` carries whatever vector-specific detail
/// the caller wants to pass through (a faulting address for `PAGE_FAULT`,
/// an opcode for `INVALID_OPCODE`, and so on) — the dispatcher itself never
/// inspects it.
pub type TrapHandler = fn(vector: u8, info: u64) -> Recovery;

/// Called when dispatch resolves to `Recovery::Panic`.
pub type PanicHook = fn(vector: u8);

struct TrapTable {
    handlers: [Option<TrapHandler>; VECTOR_COUNT],
    panic_hook: Option<PanicHook>,
}

impl TrapTable {
    const fn new() -> Self {
        TrapTable {
            handlers: [None; VECTOR_COUNT],
            panic_hook: None,
        }
    }
}

static TRAP_TABLE: Mutex<TrapTable> = Mutex::new(TrapTable::new());

/// Stateless handle onto the global trap table.
pub struct TrapDispatcher;

impl TrapDispatcher {
    /// Install a handler for `vector`, replacing any previous one.
    pub fn install(vector: u8, handler: TrapHandler) -> Result<()> {
        let slot = vector as usize;
        if slot >= VECTOR_COUNT {
            return Err(KernelError::BadVector);
        }
        TRAP_TABLE.lock().handlers[slot] = Some(handler);
        Ok(())
    }

    /// Remove `vector`'s handler, reverting it to the default policy.
    pub fn remove(vector: u8) -> Result<()> {
        let slot = vector as usize;
        if slot >= VECTOR_COUNT {
            return Err(KernelError::BadVector);
        }
        TRAP_TABLE.lock().handlers[slot] = None;
        Ok(())
    }

    /// Register the function called whenever dispatch resolves to Panic.
    pub fn set_panic_hook(hook: PanicHook) {
        TRAP_TABLE.lock().panic_hook = Some(hook);
    }

    pub fn clear_panic_hook() {
        TRAP_TABLE.lock().panic_hook = None;
    }

    /// Resolve a trap at `vector`. An out-of-range vector is logged and
    /// treated as fatal. Otherwise: the installed handler decides; with no
    /// handler installed, fatal vectors panic and all others are skipped.
    pub fn dispatch(vector: u8, info: u64) -> Recovery {
        let slot = vector as usize;
        if slot >= VECTOR_COUNT {
            log::error!("trap dispatch: vector {vector} has no CPU exception meaning");
            Self::fire_panic_hook(vector);
            return Recovery::Panic;
        }

        let handler = TRAP_TABLE.lock().handlers[slot];
        let recovery = match handler {
            Some(handler) => handler(vector, info),
            None if vectors::is_fatal(vector) => Recovery::Panic,
            None => Recovery::Skip,
        };

        if recovery == Recovery::Panic {
            Self::fire_panic_hook(vector);
        }
        recovery
    }

    fn fire_panic_hook(vector: u8) {
        let hook = TRAP_TABLE.lock().panic_hook;
        if let Some(hook) = hook {
            hook(vector);
        }
    }

    /// Emit a diagnostic line tagged with the vector. Kept distinct from
    /// `dispatch`'s own logging so handlers can narrate recoverable traps
    /// without it looking like a dispatcher-level event.
    pub fn log(vector: u8, message: &str) {
        log::warn!("trap {vector}: {message}");
    }

    #[cfg(test)]
    pub(crate) fn reset_for_test() {
        let mut table = TRAP_TABLE.lock();
        table.handlers = [None; VECTOR_COUNT];
        table.panic_hook = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    // The trap table is a single process-wide global; serialize the tests
    // that touch it so they don't observe each other's installed handlers.
    static TEST_SERIAL: StdMutex<()> = StdMutex::new(());

    #[test]
    fn unhandled_fatal_vector_panics_by_default() {
        let _guard = TEST_SERIAL.lock().unwrap();
        TrapDispatcher::reset_for_test();
        assert_eq!(
            TrapDispatcher::dispatch(vectors::STACK_SEGMENT_FAULT, 0),
            Recovery::Panic
        );
    }

    #[test]
    fn unhandled_non_fatal_vector_is_skipped() {
        let _guard = TEST_SERIAL.lock().unwrap();
        TrapDispatcher::reset_for_test();
        assert_eq!(
            TrapDispatcher::dispatch(vectors::BREAKPOINT, 0),
            Recovery::Skip
        );
    }

    #[test]
    fn out_of_range_vector_is_fatal() {
        let _guard = TEST_SERIAL.lock().unwrap();
        TrapDispatcher::reset_for_test();
        assert_eq!(TrapDispatcher::dispatch(200, 0), Recovery::Panic);
    }

    #[test]
    fn installed_handler_overrides_default_policy() {
        let _guard = TEST_SERIAL.lock().unwrap();
        TrapDispatcher::reset_for_test();
        fn always_retry(_vector: u8, _info: u64) -> Recovery {
            Recovery::Retry
        }
        TrapDispatcher::install(vectors::STACK_SEGMENT_FAULT, always_retry).unwrap();
        assert_eq!(
            TrapDispatcher::dispatch(vectors::STACK_SEGMENT_FAULT, 0),
            Recovery::Retry
        );
        TrapDispatcher::remove(vectors::STACK_SEGMENT_FAULT).unwrap();
        assert_eq!(
            TrapDispatcher::dispatch(vectors::STACK_SEGMENT_FAULT, 0),
            Recovery::Panic
        );
    }

    #[test]
    fn panic_hook_is_called_exactly_once_per_panic_resolution() {
        let _guard = TEST_SERIAL.lock().unwrap();
        TrapDispatcher::reset_for_test();
        static CALLS: AtomicUsize = AtomicUsize::new(0);
        static LAST_VECTOR: AtomicU8 = AtomicU8::new(0);
        fn hook(vector: u8) {
            CALLS.fetch_add(1, Ordering::SeqCst);
            LAST_VECTOR.store(vector, Ordering::SeqCst);
        }
        CALLS.store(0, Ordering::SeqCst);
        TrapDispatcher::set_panic_hook(hook);
        TrapDispatcher::dispatch(vectors::DOUBLE_FAULT, 0);
        assert_eq!(CALLS.load(Ordering::SeqCst), 1);
        assert_eq!(LAST_VECTOR.load(Ordering::SeqCst), vectors::DOUBLE_FAULT);
        TrapDispatcher::clear_panic_hook();
    }

    #[test]
    fn install_and_remove_reject_out_of_range_vectors() {
        let _guard = TEST_SERIAL.lock().unwrap();
        fn handler(_v: u8, _i: u64) -> Recovery {
            Recovery::Skip
        }
        assert_eq!(
            TrapDispatcher::install(16, handler).unwrap_err(),
            KernelError::BadVector
        );
        assert_eq!(
            TrapDispatcher::remove(16).unwrap_err(),
            KernelError::BadVector
        );
    }
}
