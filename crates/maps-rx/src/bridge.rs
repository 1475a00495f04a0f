//! Listener bridge: one native listener per subscription.
//!
//! A [`ListenerBridge`] turns one single-listener host slot into a
//! [`MainContextObservable`]. Which slot and what payload is described by a
//! [`SlotBinding`]; every event kind in [`crate::RxMap`] is one binding.
//!
//! # Lifecycle
//!
//! ```text
//!   subscribe ──▶ guard ──▶ on_subscribe(handle) ──▶ install(Some(listener))
//!                                                          │
//!                        host invokes listener 0..N times ─┤ forward while live
//!                                                          │
//!   handle.dispose() ──▶ flag flips ──▶ install(None) (exactly once)
//! ```
//!
//! The handle reaches the subscriber before the listener is installed. A
//! subscriber that cancels from inside `on_subscribe` never gets a listener.
//!
//! # Shared Slots
//!
//! Two live subscriptions of the same kind share one host slot; the later
//! install wins and the earlier subscriber stops receiving events without
//! notice. What the earlier one's disposal does to the slot depends on the
//! [`SlotRelease`] policy.

use std::fmt;
use std::sync::Arc;

use crate::config::RxConfig;
use crate::context::MainContext;
use crate::disposable::Disposable;
use crate::observable::MainContextObservable;
use crate::observer::Observer;
use crate::slots::{SlotClaims, SlotRelease};
use crate::surface::{EventKind, Listener};

/// How to reach one host slot and what to forward from it.
///
/// `install` both registers (`Some`) and unregisters (`None`), mirroring the
/// host's single setter.
pub struct SlotBinding<S: ?Sized, N, P> {
    /// Which slot this is.
    pub kind: EventKind,
    /// The host's setter for the slot.
    pub install: fn(&S, Option<Listener<N>>),
    /// Converts the native callback argument into the emitted payload.
    pub extract: fn(N) -> P,
}

impl<S: ?Sized, N, P> Clone for SlotBinding<S, N, P> {
    fn clone(&self) -> Self { *self }
}

impl<S: ?Sized, N, P> Copy for SlotBinding<S, N, P> {}

impl<S: ?Sized, N, P> fmt::Debug for SlotBinding<S, N, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotBinding").field("kind", &self.kind).finish_non_exhaustive()
    }
}

/// Observable over one host slot.
pub struct ListenerBridge<S: ?Sized, N, P> {
    surface: Arc<S>,
    context: Arc<dyn MainContext>,
    claims: Arc<SlotClaims>,
    config: RxConfig,
    binding: SlotBinding<S, N, P>,
}

impl<S, N, P> ListenerBridge<S, N, P>
where
    S: ?Sized + Send + Sync + 'static,
    N: Send + 'static,
    P: Send + 'static,
{
    /// Creates a bridge over `binding` on `surface`.
    #[must_use]
    pub fn new(
        surface: Arc<S>,
        context: Arc<dyn MainContext>,
        claims: Arc<SlotClaims>,
        config: RxConfig,
        binding: SlotBinding<S, N, P>,
    ) -> Self {
        Self { surface, context, claims, config, binding }
    }

    /// The slot this bridge installs into.
    #[must_use]
    pub const fn kind(&self) -> EventKind { self.binding.kind }

    fn listener(&self, observer: Arc<dyn Observer<P>>, live: Disposable) -> Listener<N> {
        let kind = self.binding.kind;
        let extract = self.binding.extract;
        let watch = self.config.warn_off_context_delivery.then(|| Arc::clone(&self.context));

        Arc::new(move |native: N| {
            if live.is_disposed() {
                tracing::trace!(%kind, "bridge: dropped event after disposal");
                return;
            }
            if let Some(context) = &watch {
                if !context.is_current() {
                    tracing::warn!(
                        %kind,
                        context = %context.current_id(),
                        "bridge: event delivered off main context"
                    );
                }
            }
            observer.on_next(extract(native));
        })
    }
}

impl<S, N, P> MainContextObservable for ListenerBridge<S, N, P>
where
    S: ?Sized + Send + Sync + 'static,
    N: Send + 'static,
    P: Send + 'static,
{
    type Item = P;

    fn main_context(&self) -> &Arc<dyn MainContext> { &self.context }

    fn subscribe_main_context(&self, observer: Arc<dyn Observer<P>>) {
        let SlotBinding { kind, install, .. } = self.binding;

        let disposable = Disposable::on_main_context(Arc::clone(&self.context));
        observer.on_subscribe(disposable.clone());
        if disposable.is_disposed() {
            tracing::debug!(%kind, "bridge: disposed during on_subscribe, not installing");
            return;
        }

        install(&*self.surface, Some(self.listener(observer, disposable.clone())));
        let claim = self.claims.claim(kind);
        tracing::debug!(%kind, "bridge: listener installed");

        let surface = Arc::clone(&self.surface);
        let claims = Arc::clone(&self.claims);
        let policy: SlotRelease = self.config.slot_release;
        disposable.set_teardown(move || {
            if claims.release(claim, policy) {
                install(&*surface, None);
                tracing::debug!(%kind, "bridge: listener removed");
            }
        });
    }
}

impl<S: ?Sized, N, P> fmt::Debug for ListenerBridge<S, N, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerBridge")
            .field("kind", &self.binding.kind)
            .field("slot_release", &self.config.slot_release)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{self, AssertUnwindSafe};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use parking_lot::Mutex;

    use super::*;
    use crate::context::ManualContext;
    use crate::testing::TestObserver;

    /// A bare host with a single `u32` slot.
    #[derive(Default)]
    struct Counter {
        slot: Mutex<Option<Listener<u32>>>,
        installs: AtomicUsize,
        clears: AtomicUsize,
        refuse_installs: AtomicBool,
    }

    impl Counter {
        fn set(&self, listener: Option<Listener<u32>>) {
            if listener.is_some() && self.refuse_installs.load(Ordering::SeqCst) {
                panic!("host refused listener");
            }
            if listener.is_some() {
                self.installs.fetch_add(1, Ordering::SeqCst);
            } else {
                self.clears.fetch_add(1, Ordering::SeqCst);
            }
            *self.slot.lock() = listener;
        }

        fn fire(&self, value: u32) {
            let listener = self.slot.lock().clone();
            if let Some(listener) = listener {
                listener(value);
            }
        }
    }

    fn doubled(value: u32) -> u64 { u64::from(value) * 2 }

    fn bridge(
        surface: &Arc<Counter>,
        context: &Arc<ManualContext>,
        config: RxConfig,
    ) -> ListenerBridge<Counter, u32, u64> {
        ListenerBridge::new(
            Arc::clone(surface),
            context.clone(),
            Arc::new(SlotClaims::new()),
            config,
            SlotBinding { kind: EventKind::MapClick, install: Counter::set, extract: doubled },
        )
    }

    #[test]
    fn test_subscribe_installs_once_and_extracts_payload() {
        let surface = Arc::new(Counter::default());
        let context = Arc::new(ManualContext::new());
        let observer = TestObserver::<u64>::new();

        bridge(&surface, &context, RxConfig::default()).subscribe(observer.clone());
        surface.fire(1);
        surface.fire(5);

        assert_eq!(surface.installs.load(Ordering::SeqCst), 1);
        assert_eq!(observer.values(), vec![2, 10]);
        assert_eq!(observer.completion_count(), 0);
    }

    #[test]
    fn test_handle_delivered_before_install() {
        let surface = Arc::new(Counter::default());
        let context = Arc::new(ManualContext::new());
        let observer = TestObserver::<u64>::disposing_on_subscribe();

        bridge(&surface, &context, RxConfig::default()).subscribe(observer.clone());

        assert_eq!(surface.installs.load(Ordering::SeqCst), 0);
        assert_eq!(surface.clears.load(Ordering::SeqCst), 0);
        assert_eq!(observer.subscribe_count(), 1);
    }

    #[test]
    fn test_dispose_clears_once_and_drops_stale_invocations() {
        let surface = Arc::new(Counter::default());
        let context = Arc::new(ManualContext::new());
        let observer = TestObserver::<u64>::new();

        bridge(&surface, &context, RxConfig::default()).subscribe(observer.clone());
        let stale = surface.slot.lock().clone().unwrap();

        observer.dispose();
        observer.dispose();
        stale(7);

        assert_eq!(surface.clears.load(Ordering::SeqCst), 1);
        assert!(observer.values().is_empty());
    }

    #[test]
    fn test_off_context_dispose_defers_clear_to_main() {
        let surface = Arc::new(Counter::default());
        let context = Arc::new(ManualContext::new());
        let observer = TestObserver::<u64>::new();

        bridge(&surface, &context, RxConfig::default()).subscribe(observer.clone());
        let stale = surface.slot.lock().clone().unwrap();

        context.enter_foreign();
        observer.dispose();
        stale(3);
        assert_eq!(surface.clears.load(Ordering::SeqCst), 0);
        assert!(observer.values().is_empty());

        context.enter_main();
        context.run_pending().unwrap();
        assert_eq!(surface.clears.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_off_context_delivery_still_forwards_when_warning() {
        let surface = Arc::new(Counter::default());
        let context = Arc::new(ManualContext::new());
        let observer = TestObserver::<u64>::new();
        let config = RxConfig { warn_off_context_delivery: true, ..RxConfig::default() };

        bridge(&surface, &context, config).subscribe(observer.clone());
        context.enter_foreign();
        surface.fire(4);

        assert_eq!(observer.values(), vec![8]);
    }

    #[test]
    fn test_owner_only_keeps_newer_occupant() {
        let surface = Arc::new(Counter::default());
        let context = Arc::new(ManualContext::new());
        let config = RxConfig { slot_release: SlotRelease::OwnerOnly, ..RxConfig::default() };
        let source = bridge(&surface, &context, config);
        let first = TestObserver::<u64>::new();
        let second = TestObserver::<u64>::new();

        source.subscribe(first.clone());
        source.subscribe(second.clone());
        first.dispose();
        surface.fire(1);

        assert_eq!(surface.clears.load(Ordering::SeqCst), 0);
        assert!(first.values().is_empty());
        assert_eq!(second.values(), vec![2]);
    }

    #[test]
    fn test_failed_install_propagates_without_taking_the_slot() {
        let surface = Arc::new(Counter::default());
        let context = Arc::new(ManualContext::new());
        let config = RxConfig { slot_release: SlotRelease::OwnerOnly, ..RxConfig::default() };
        let source = bridge(&surface, &context, config);
        let first = TestObserver::<u64>::new();
        source.subscribe(first.clone());

        surface.refuse_installs.store(true, Ordering::SeqCst);
        let refused = TestObserver::<u64>::new();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| source.subscribe(refused.clone())));
        surface.refuse_installs.store(false, Ordering::SeqCst);
        assert!(outcome.is_err());
        assert_eq!(surface.installs.load(Ordering::SeqCst), 1);

        surface.fire(2);
        assert_eq!(first.values(), vec![4]);

        first.dispose();
        assert!(surface.slot.lock().is_none());
        assert_eq!(surface.clears.load(Ordering::SeqCst), 1);
    }
}
