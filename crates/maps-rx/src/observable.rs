//! Main-context subscription guard.
//!
//! [`MainContextObservable`] and [`MainContextMaybe`] are the base behaviour
//! for every stream in this crate. Implementors provide the bridging logic in
//! `subscribe_main_context`; callers go through `subscribe`, which compares
//! the calling context with the designated main context first.
//!
//! # Guard Contract
//!
//! - Off the main context the subscriber gets [`Disposable::empty()`] and then
//!   [`MapsRxError::NotOnMainContext`]. `subscribe_main_context` never runs,
//!   so no native registration happens.
//! - On the main context the subscriber is passed through unchanged.
//! - The check happens once, at subscription time. Later deliveries are not
//!   re-checked.
//!
//! Implementors must not override `subscribe`.

use std::sync::Arc;

use crate::context::MainContext;
use crate::disposable::Disposable;
use crate::error::MapsRxError;
use crate::observer::{MaybeObserver, Observer};

/// A zero-or-many stream that only accepts subscriptions on the main context.
pub trait MainContextObservable: Send + Sync {
    /// Value forwarded per event.
    type Item: Send + 'static;

    /// The context subscriptions must come from.
    fn main_context(&self) -> &Arc<dyn MainContext>;

    /// Bridging logic. Only called after the context check passed.
    fn subscribe_main_context(&self, observer: Arc<dyn Observer<Self::Item>>);

    /// Subscribes `observer`, enforcing main-context affinity.
    fn subscribe(&self, observer: Arc<dyn Observer<Self::Item>>) {
        if let Err(error) = self.main_context().ensure_current() {
            reject(&error);
            observer.on_subscribe(Disposable::empty());
            observer.on_error(error);
            return;
        }
        self.subscribe_main_context(observer);
    }
}

/// A zero-or-one stream that only accepts subscriptions on the main context.
pub trait MainContextMaybe: Send + Sync {
    /// The single value.
    type Item: Send + 'static;

    /// The context subscriptions must come from.
    fn main_context(&self) -> &Arc<dyn MainContext>;

    /// Bridging logic. Only called after the context check passed.
    fn subscribe_main_context(&self, observer: Arc<dyn MaybeObserver<Self::Item>>);

    /// Subscribes `observer`, enforcing main-context affinity.
    fn subscribe(&self, observer: Arc<dyn MaybeObserver<Self::Item>>) {
        if let Err(error) = self.main_context().ensure_current() {
            reject(&error);
            observer.on_subscribe(Disposable::empty());
            observer.on_error(error);
            return;
        }
        self.subscribe_main_context(observer);
    }
}

fn reject(error: &MapsRxError) {
    tracing::warn!(%error, "guard: subscription rejected off main context");
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::context::ManualContext;
    use crate::testing::TestObserver;

    /// Emits `7` synchronously to every accepted subscriber.
    struct Seven {
        context: Arc<dyn MainContext>,
        delegated: AtomicUsize,
    }

    impl Seven {
        fn new(context: Arc<dyn MainContext>) -> Self {
            Self { context, delegated: AtomicUsize::new(0) }
        }
    }

    impl MainContextObservable for Seven {
        type Item = u8;

        fn main_context(&self) -> &Arc<dyn MainContext> { &self.context }

        fn subscribe_main_context(&self, observer: Arc<dyn Observer<u8>>) {
            self.delegated.fetch_add(1, Ordering::SeqCst);
            observer.on_subscribe(Disposable::new());
            observer.on_next(7);
        }
    }

    impl MainContextMaybe for Seven {
        type Item = u8;

        fn main_context(&self) -> &Arc<dyn MainContext> { &self.context }

        fn subscribe_main_context(&self, observer: Arc<dyn MaybeObserver<u8>>) {
            self.delegated.fetch_add(1, Ordering::SeqCst);
            observer.on_subscribe(Disposable::new());
            observer.on_success(7);
        }
    }

    #[test]
    fn test_observable_on_main_delegates() {
        let context = Arc::new(ManualContext::new());
        let source = Seven::new(context);
        let observer = TestObserver::<u8>::new();

        MainContextObservable::subscribe(&source, observer.clone());

        assert_eq!(source.delegated.load(Ordering::SeqCst), 1);
        assert_eq!(observer.values(), vec![7]);
        assert_eq!(observer.error_count(), 0);
    }

    #[test]
    fn test_observable_off_main_rejects_without_delegating() {
        let context = Arc::new(ManualContext::new());
        context.enter_foreign();
        let source = Seven::new(context);
        let observer = TestObserver::<u8>::new();

        MainContextObservable::subscribe(&source, observer.clone());

        assert_eq!(source.delegated.load(Ordering::SeqCst), 0);
        assert_eq!(observer.subscribe_count(), 1);
        assert!(observer.values().is_empty());
        assert_eq!(observer.error_count(), 1);
        assert!(observer.has_not_on_main_context_error());
    }

    #[test]
    fn test_rejected_subscriber_receives_handle_before_error() {
        let context = Arc::new(ManualContext::new());
        context.enter_foreign();
        let source = Seven::new(context);
        let observer = TestObserver::<u8>::new();

        MainContextObservable::subscribe(&source, observer.clone());

        assert_eq!(observer.events(), vec!["subscribe", "error"]);
    }

    #[test]
    fn test_maybe_on_main_delegates() {
        let context = Arc::new(ManualContext::new());
        let source = Seven::new(context);
        let observer = TestObserver::<u8>::new();

        MainContextMaybe::subscribe(&source, observer.clone());

        assert_eq!(observer.values(), vec![7]);
        assert_eq!(observer.completion_count(), 1);
    }

    #[test]
    fn test_maybe_off_main_rejects_without_delegating() {
        let context = Arc::new(ManualContext::new());
        context.enter_foreign();
        let source = Seven::new(context);
        let observer = TestObserver::<u8>::new();

        MainContextMaybe::subscribe(&source, observer.clone());

        assert_eq!(source.delegated.load(Ordering::SeqCst), 0);
        assert!(observer.values().is_empty());
        assert!(observer.has_not_on_main_context_error());
    }

    #[test]
    fn test_resubscribe_from_main_after_rejection_succeeds() {
        let context = Arc::new(ManualContext::new());
        let source = Seven::new(context.clone());

        context.enter_foreign();
        let rejected = TestObserver::<u8>::new();
        MainContextObservable::subscribe(&source, rejected.clone());

        context.enter_main();
        let accepted = TestObserver::<u8>::new();
        MainContextObservable::subscribe(&source, accepted.clone());

        assert!(rejected.has_not_on_main_context_error());
        assert_eq!(accepted.values(), vec![7]);
    }
}
