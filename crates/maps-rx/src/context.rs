//! Execution context identity and the designated main context.
//!
//! A host map surface only accepts listener registration, invocation and
//! removal on one context (the UI thread). [`MainContext`] is the capability
//! the subscription guard queries to decide whether it is running there.
//!
//! # Identity
//!
//! Contexts are compared by [`ContextId`], an opaque token minted from a
//! process-wide counter. Two contexts are the same only if they carry the
//! same token; thread names or types never take part in the comparison.
//!
//! # Implementations
//!
//! - [`ThreadContext`] designates the thread that created it as main.
//! - [`ManualContext`] lets tests switch the "current" context by hand.
//!
//! Both queue work handed to [`MainContext::dispatch`] until the owner of the
//! main loop drains it with `run_pending()`.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::error::MapsRxError;

/// Source of unique context tokens.
static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    /// Token for the calling OS thread, minted on first use.
    static THREAD_CONTEXT_ID: ContextId = ContextId::fresh();
}

/// Opaque identity of an execution context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(u64);

impl ContextId {
    /// Mints a token that is distinct from every other token in the process.
    #[must_use]
    pub fn fresh() -> Self { Self(NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed)) }

    /// Returns the token of the calling OS thread.
    ///
    /// Stable for the lifetime of the thread.
    #[must_use]
    pub fn current_thread() -> Self { THREAD_CONTEXT_ID.with(|id| *id) }

    /// Returns the raw token value.
    #[must_use]
    pub const fn get(self) -> u64 { self.0 }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "context#{}", self.0) }
}

/// Work scheduled onto the main context.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// The designated main context and a way to ask where the caller is running.
pub trait MainContext: Send + Sync {
    /// Identity of the designated main context.
    fn main_id(&self) -> ContextId;

    /// Identity of the context the caller is running on right now.
    fn current_id(&self) -> ContextId;

    /// Schedules `task` to run on the main context.
    fn dispatch(&self, task: Task);

    /// Returns `true` when the caller is on the main context.
    fn is_current(&self) -> bool { self.current_id() == self.main_id() }

    /// Fails with [`MapsRxError::NotOnMainContext`] off the main context.
    ///
    /// # Errors
    ///
    /// Returns `NotOnMainContext` carrying both identities when the caller
    /// is not on the main context.
    fn ensure_current(&self) -> Result<(), MapsRxError> {
        let expected = self.main_id();
        let actual = self.current_id();
        if actual == expected {
            Ok(())
        } else {
            Err(MapsRxError::NotOnMainContext { expected, actual })
        }
    }
}

/// FIFO of tasks waiting for the main context.
#[derive(Default)]
struct TaskQueue {
    tasks: Mutex<VecDeque<Task>>,
}

impl TaskQueue {
    fn push(&self, task: Task) { self.tasks.lock().push_back(task); }

    fn len(&self) -> usize { self.tasks.lock().len() }

    /// Runs queued tasks in order, including tasks queued while draining.
    fn drain(&self) -> usize {
        let mut ran = 0;
        loop {
            // Lock released before the task runs so it can dispatch more work.
            let next = self.tasks.lock().pop_front();
            let Some(task) = next else { break };
            task();
            ran += 1;
        }
        ran
    }
}

impl fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskQueue").field("pending", &self.len()).finish()
    }
}

// ============================================================================
// Thread Context
// ============================================================================

/// Main context bound to the OS thread that created it.
#[derive(Debug)]
pub struct ThreadContext {
    main: ContextId,
    thread_name: Option<String>,
    pending: TaskQueue,
}

impl ThreadContext {
    /// Designates the calling thread as the main context.
    #[must_use]
    pub fn for_current_thread() -> Self {
        let main = ContextId::current_thread();
        let thread_name = std::thread::current().name().map(str::to_string);
        tracing::debug!(context = %main, thread = ?thread_name, "context: main thread designated");
        Self { main, thread_name, pending: TaskQueue::default() }
    }

    /// Name of the designated thread, if it has one. Informational only.
    #[must_use]
    pub fn thread_name(&self) -> Option<&str> { self.thread_name.as_deref() }

    /// Number of dispatched tasks waiting to run.
    #[must_use]
    pub fn pending(&self) -> usize { self.pending.len() }

    /// Runs every dispatched task on the calling thread.
    ///
    /// Meant to be called from the host's main loop.
    ///
    /// # Errors
    ///
    /// Returns `NotOnMainContext` when called off the designated thread. No
    /// task runs in that case.
    pub fn run_pending(&self) -> Result<usize, MapsRxError> {
        self.ensure_current()?;
        Ok(self.pending.drain())
    }
}

impl MainContext for ThreadContext {
    fn main_id(&self) -> ContextId { self.main }

    fn current_id(&self) -> ContextId { ContextId::current_thread() }

    fn dispatch(&self, task: Task) {
        self.pending.push(task);
        tracing::trace!(context = %self.main, "context: task dispatched to main thread");
    }
}

// ============================================================================
// Manual Context
// ============================================================================

/// Main context whose "current" context is switched explicitly.
///
/// Lets single-threaded tests exercise off-context paths.
#[derive(Debug)]
pub struct ManualContext {
    main: ContextId,
    current: Mutex<ContextId>,
    pending: TaskQueue,
}

impl Default for ManualContext {
    fn default() -> Self { Self::new() }
}

impl ManualContext {
    /// Creates a context that starts out on its main context.
    #[must_use]
    pub fn new() -> Self {
        let main = ContextId::fresh();
        Self { main, current: Mutex::new(main), pending: TaskQueue::default() }
    }

    /// Makes the main context current.
    pub fn enter_main(&self) { *self.current.lock() = self.main; }

    /// Makes a brand new foreign context current and returns its identity.
    pub fn enter_foreign(&self) -> ContextId {
        let foreign = ContextId::fresh();
        *self.current.lock() = foreign;
        foreign
    }

    /// Makes `id` current.
    pub fn enter(&self, id: ContextId) { *self.current.lock() = id; }

    /// Number of dispatched tasks waiting to run.
    #[must_use]
    pub fn pending(&self) -> usize { self.pending.len() }

    /// Runs every dispatched task.
    ///
    /// # Errors
    ///
    /// Returns `NotOnMainContext` unless the main context is current.
    pub fn run_pending(&self) -> Result<usize, MapsRxError> {
        self.ensure_current()?;
        Ok(self.pending.drain())
    }
}

impl MainContext for ManualContext {
    fn main_id(&self) -> ContextId { self.main }

    fn current_id(&self) -> ContextId { *self.current.lock() }

    fn dispatch(&self, task: Task) { self.pending.push(task); }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;
    use std::thread;

    use super::*;

    #[test]
    fn test_fresh_ids_are_distinct() {
        let a = ContextId::fresh();
        let b = ContextId::fresh();
        assert_ne!(a, b);
    }

    #[test]
    fn test_current_thread_id_is_stable() {
        assert_eq!(ContextId::current_thread(), ContextId::current_thread());
    }

    #[test]
    fn test_other_thread_has_different_id() {
        let here = ContextId::current_thread();
        let there = thread::spawn(ContextId::current_thread).join().unwrap();
        assert_ne!(here, there);
    }

    #[test]
    fn test_same_thread_name_is_not_same_context() {
        let spawn = || {
            thread::Builder::new()
                .name("maps-rx-ui".to_string())
                .spawn(ContextId::current_thread)
                .unwrap()
                .join()
                .unwrap()
        };
        assert_ne!(spawn(), spawn());
    }

    #[test]
    fn test_thread_context_is_current_on_creating_thread() {
        let context = ThreadContext::for_current_thread();
        assert!(context.is_current());
        assert!(context.ensure_current().is_ok());
    }

    #[test]
    fn test_thread_context_is_not_current_on_other_thread() {
        let context = Arc::new(ThreadContext::for_current_thread());
        let remote = Arc::clone(&context);

        let err = thread::spawn(move || remote.ensure_current()).join().unwrap().unwrap_err();

        match err {
            MapsRxError::NotOnMainContext { expected, actual } => {
                assert_eq!(expected, context.main_id());
                assert_ne!(actual, expected);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_thread_context_runs_dispatched_tasks_in_order() {
        let context = ThreadContext::for_current_thread();
        let log = Arc::new(Mutex::new(Vec::new()));

        for i in 0..3 {
            let log = Arc::clone(&log);
            context.dispatch(Box::new(move || log.lock().push(i)));
        }
        assert_eq!(context.pending(), 3);

        assert_eq!(context.run_pending().unwrap(), 3);
        assert_eq!(*log.lock(), vec![0, 1, 2]);
        assert_eq!(context.pending(), 0);
    }

    #[test]
    fn test_thread_context_refuses_to_drain_off_thread() {
        let context = Arc::new(ThreadContext::for_current_thread());
        context.dispatch(Box::new(|| {}));

        let remote = Arc::clone(&context);
        let result = thread::spawn(move || remote.run_pending()).join().unwrap();

        assert!(result.unwrap_err().is_not_on_main_context());
        assert_eq!(context.pending(), 1);
    }

    #[test]
    fn test_drain_runs_tasks_queued_while_draining() {
        let context = Arc::new(ManualContext::new());
        let ran = Arc::new(AtomicUsize::new(0));

        let inner_context = Arc::clone(&context);
        let inner_ran = Arc::clone(&ran);
        context.dispatch(Box::new(move || {
            inner_ran.fetch_add(1, Ordering::SeqCst);
            let again = Arc::clone(&inner_ran);
            inner_context.dispatch(Box::new(move || {
                again.fetch_add(1, Ordering::SeqCst);
            }));
        }));

        assert_eq!(context.run_pending().unwrap(), 2);
        assert_eq!(ran.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_manual_context_switching() {
        let context = ManualContext::new();
        assert!(context.is_current());

        let foreign = context.enter_foreign();
        assert!(!context.is_current());
        assert_eq!(context.current_id(), foreign);

        context.enter_main();
        assert!(context.is_current());

        context.enter(foreign);
        assert_eq!(context.current_id(), foreign);
    }

    #[test]
    fn test_manual_context_refuses_to_drain_off_main() {
        let context = ManualContext::new();
        context.dispatch(Box::new(|| {}));
        context.enter_foreign();

        assert!(context.run_pending().is_err());
        assert_eq!(context.pending(), 1);

        context.enter_main();
        assert_eq!(context.run_pending().unwrap(), 1);
    }
}
