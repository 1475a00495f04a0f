//! Disposal handles for live subscriptions.
//!
//! A [`Disposable`] is the handle a subscriber receives before any event can
//! reach it. It owns two things:
//!
//! - a liveness flag, checked by the native callback before forwarding;
//! - a one-shot teardown that releases the native registration.
//!
//! # Invariants
//!
//! 1. The liveness flag flips exactly once, on the first `dispose()`.
//! 2. The teardown runs at most once, no matter how many clones dispose or
//!    whether the teardown was attached before or after disposal.
//! 3. When bound to a [`MainContext`], a teardown requested off that context
//!    is dispatched onto it instead of running on the caller's thread. The
//!    flag still flips immediately, so no event is forwarded in between.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::context::MainContext;

/// One-shot release action.
type Teardown = Box<dyn FnOnce() + Send + 'static>;

struct Inner {
    disposed: AtomicBool,
    teardown: Mutex<Option<Teardown>>,
    context: Option<Arc<dyn MainContext>>,
}

/// Cancellation handle shared between a subscriber and its native listener.
///
/// Cloning yields another handle to the same subscription.
#[derive(Clone)]
pub struct Disposable {
    inner: Arc<Inner>,
}

impl Disposable {
    fn with_context(context: Option<Arc<dyn MainContext>>) -> Self {
        Self {
            inner: Arc::new(Inner {
                disposed: AtomicBool::new(false),
                teardown: Mutex::new(None),
                context,
            }),
        }
    }

    /// A handle with nothing to release.
    ///
    /// Same as [`Disposable::new`]; names the handle handed to subscribers
    /// whose subscription was rejected, which never gets a teardown.
    #[must_use]
    pub fn empty() -> Self { Self::new() }

    /// A live handle whose teardown always runs on the disposing thread.
    #[must_use]
    pub fn new() -> Self { Self::with_context(None) }

    /// A live handle whose teardown always runs on `context`.
    #[must_use]
    pub fn on_main_context(context: Arc<dyn MainContext>) -> Self {
        Self::with_context(Some(context))
    }

    /// Whether `dispose()` has been called on this subscription.
    #[must_use]
    pub fn is_disposed(&self) -> bool { self.inner.disposed.load(Ordering::Acquire) }

    /// Cancels the subscription.
    ///
    /// Idempotent: only the first call releases anything.
    pub fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        let teardown = self.inner.teardown.lock().take();
        if let Some(teardown) = teardown {
            self.release(teardown);
        }
    }

    /// Attaches the release action for this subscription.
    ///
    /// If the subscription is already disposed the action runs right away,
    /// so a cancellation that races the attachment still releases once.
    pub fn set_teardown<F>(&self, teardown: F)
    where F: FnOnce() + Send + 'static {
        let mut slot = self.inner.teardown.lock();
        if self.is_disposed() {
            drop(slot);
            self.release(Box::new(teardown));
            return;
        }
        debug_assert!(slot.is_none(), "teardown attached twice");
        *slot = Some(Box::new(teardown));
    }

    /// Whether both handles refer to the same subscription.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool { Arc::ptr_eq(&self.inner, &other.inner) }

    fn release(&self, teardown: Teardown) {
        match &self.inner.context {
            Some(context) if !context.is_current() => {
                tracing::trace!(
                    context = %context.current_id(),
                    "disposable: teardown dispatched to main context"
                );
                context.dispatch(teardown);
            }
            _ => teardown(),
        }
    }
}

impl Default for Disposable {
    fn default() -> Self { Self::new() }
}

impl fmt::Debug for Disposable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Disposable")
            .field("disposed", &self.is_disposed())
            .field("bound_to_main", &self.inner.context.is_some())
            .finish_non_exhaustive()
    }
}
