//! Recording observer for tests.
//!
//! [`TestObserver`] implements both [`Observer`] and [`MaybeObserver`] and
//! records every notification it receives, in order. Outside this crate's
//! own tests it is only compiled with the `test-util` feature.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::disposable::Disposable;
use crate::error::MapsRxError;
use crate::observer::{MaybeObserver, Observer};

struct Recorded<T> {
    events: Vec<&'static str>,
    disposable: Option<Disposable>,
    values: Vec<T>,
    errors: Vec<MapsRxError>,
    completions: usize,
}

/// Observer that records what it receives.
pub struct TestObserver<T> {
    recorded: Mutex<Recorded<T>>,
    dispose_on_subscribe: bool,
}

impl<T: Clone + Send> TestObserver<T> {
    fn build(dispose_on_subscribe: bool) -> Arc<Self> {
        Arc::new(Self {
            recorded: Mutex::new(Recorded {
                events: Vec::new(),
                disposable: None,
                values: Vec::new(),
                errors: Vec::new(),
                completions: 0,
            }),
            dispose_on_subscribe,
        })
    }

    /// A plain recorder.
    #[must_use]
    pub fn new() -> Arc<Self> { Self::build(false) }

    /// A recorder that cancels from inside `on_subscribe`.
    #[must_use]
    pub fn disposing_on_subscribe() -> Arc<Self> { Self::build(true) }

    /// Values received so far, in order.
    #[must_use]
    pub fn values(&self) -> Vec<T> { self.recorded.lock().values.clone() }

    /// Notification names in arrival order.
    #[must_use]
    pub fn events(&self) -> Vec<&'static str> { self.recorded.lock().events.clone() }

    /// Number of `on_subscribe` calls.
    #[must_use]
    pub fn subscribe_count(&self) -> usize {
        self.recorded.lock().events.iter().filter(|event| **event == "subscribe").count()
    }

    /// Number of `on_error` calls.
    #[must_use]
    pub fn error_count(&self) -> usize { self.recorded.lock().errors.len() }

    /// Number of `on_complete` calls, plus `on_success` for Maybe streams.
    #[must_use]
    pub fn completion_count(&self) -> usize { self.recorded.lock().completions }

    /// Whether exactly one error was received and it was `NotOnMainContext`.
    #[must_use]
    pub fn has_not_on_main_context_error(&self) -> bool {
        let recorded = self.recorded.lock();
        recorded.errors.len() == 1 && recorded.errors[0].is_not_on_main_context()
    }

    /// The handle received in `on_subscribe`, if any.
    #[must_use]
    pub fn disposable(&self) -> Option<Disposable> { self.recorded.lock().disposable.clone() }

    /// Cancels through the received handle.
    ///
    /// # Panics
    ///
    /// Panics if `on_subscribe` was never called.
    pub fn dispose(&self) {
        let disposable = self.disposable();
        match disposable {
            Some(disposable) => disposable.dispose(),
            None => panic!("dispose() called before on_subscribe"),
        }
    }

    fn record(&self, event: &'static str) { self.recorded.lock().events.push(event); }

    fn subscribed(&self, disposable: Disposable) {
        {
            let mut recorded = self.recorded.lock();
            recorded.events.push("subscribe");
            recorded.disposable = Some(disposable.clone());
        }
        if self.dispose_on_subscribe {
            disposable.dispose();
        }
    }

    fn errored(&self, error: MapsRxError) {
        let mut recorded = self.recorded.lock();
        recorded.events.push("error");
        recorded.errors.push(error);
    }
}

impl<T: Clone + Send> Observer<T> for TestObserver<T> {
    fn on_subscribe(&self, disposable: Disposable) { self.subscribed(disposable); }

    fn on_next(&self, value: T) {
        let mut recorded = self.recorded.lock();
        recorded.events.push("next");
        recorded.values.push(value);
    }

    fn on_error(&self, error: MapsRxError) { self.errored(error); }

    fn on_complete(&self) {
        self.record("complete");
        self.recorded.lock().completions += 1;
    }
}

impl<T: Clone + Send> MaybeObserver<T> for TestObserver<T> {
    fn on_subscribe(&self, disposable: Disposable) { self.subscribed(disposable); }

    fn on_success(&self, value: T) {
        let mut recorded = self.recorded.lock();
        recorded.events.push("success");
        recorded.values.push(value);
        recorded.completions += 1;
    }

    fn on_error(&self, error: MapsRxError) { self.errored(error); }

    fn on_complete(&self) {
        self.record("complete");
        self.recorded.lock().completions += 1;
    }
}
