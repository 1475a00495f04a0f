//! Async and closure adapters over main-context sources.
//!
//! The observer traits are the native shape of every source in this crate.
//! For application code they are wrapped three ways:
//!
//! - [`ObservableExt::subscribe_with`] takes a closure and returns a
//!   [`Subscription`] that disposes when dropped;
//! - [`ObservableExt::into_stream`] yields an [`EventStream`], a
//!   `futures::Stream` of `Result<T, MapsRxError>`;
//! - [`MaybeExt::into_future`] yields a [`MaybeFuture`] resolving to
//!   `Result<Option<T>, MapsRxError>`.
//!
//! All three subscribe immediately, so they must be created on the main
//! context. Dropping any of them disposes the underlying subscription.

use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::channel::{mpsc, oneshot};
use futures::{FutureExt, Stream, StreamExt};
use parking_lot::Mutex;

use crate::disposable::Disposable;
use crate::error::MapsRxError;
use crate::observable::{MainContextMaybe, MainContextObservable};
use crate::observer::{MaybeObserver, Observer};

/// Handle slot filled by `on_subscribe`.
type SharedHandle = Arc<Mutex<Option<Disposable>>>;

fn dispose_shared(handle: &SharedHandle) {
    let disposable = handle.lock().clone();
    if let Some(disposable) = disposable {
        disposable.dispose();
    }
}

/// RAII guard for a closure subscription. Disposes when dropped.
#[must_use = "dropping a Subscription disposes it immediately"]
pub struct Subscription {
    disposable: Disposable,
}

impl Subscription {
    /// Whether events are still being forwarded.
    #[must_use]
    pub fn is_active(&self) -> bool { !self.disposable.is_disposed() }

    /// Disposes now. Equivalent to dropping the guard.
    pub fn unsubscribe(self) { drop(self); }

    /// The underlying handle.
    #[must_use]
    pub const fn disposable(&self) -> &Disposable { &self.disposable }
}

impl Drop for Subscription {
    fn drop(&mut self) { self.disposable.dispose(); }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("active", &self.is_active()).finish()
    }
}

struct FnObserver<T, F> {
    on_next: F,
    handle: Mutex<Option<Disposable>>,
    error: Mutex<Option<MapsRxError>>,
    _item: PhantomData<fn(T)>,
}

impl<T, F> Observer<T> for FnObserver<T, F>
where
    F: Fn(T) + Send + Sync,
{
    fn on_subscribe(&self, disposable: Disposable) { *self.handle.lock() = Some(disposable); }

    fn on_next(&self, value: T) { (self.on_next)(value); }

    fn on_error(&self, error: MapsRxError) {
        tracing::warn!(%error, "stream: subscription failed");
        *self.error.lock() = Some(error);
    }
}

struct ChannelObserver<T> {
    sender: mpsc::UnboundedSender<Result<T, MapsRxError>>,
    handle: SharedHandle,
}

impl<T: Send> Observer<T> for ChannelObserver<T> {
    fn on_subscribe(&self, disposable: Disposable) { *self.handle.lock() = Some(disposable); }

    fn on_next(&self, value: T) {
        if self.sender.unbounded_send(Ok(value)).is_err() {
            tracing::trace!("stream: receiver gone, event dropped");
        }
    }

    fn on_error(&self, error: MapsRxError) {
        // The receiver may already be gone; nothing left to notify then.
        let _ = self.sender.unbounded_send(Err(error));
        self.sender.close_channel();
    }

    fn on_complete(&self) { self.sender.close_channel(); }
}

/// Event stream backed by an unbounded channel.
///
/// Yields `Ok` per event and at most one `Err`, after which it ends. Map
/// event sources never complete, so a live stream only ends when dropped.
pub struct EventStream<T> {
    receiver: mpsc::UnboundedReceiver<Result<T, MapsRxError>>,
    handle: SharedHandle,
}

impl<T> EventStream<T> {
    /// Disposes the subscription. Events already queued are still yielded.
    pub fn dispose(&self) { dispose_shared(&self.handle); }

    /// Whether the subscription has been disposed.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.handle.lock().as_ref().is_none_or(Disposable::is_disposed)
    }
}

impl<T> Stream for EventStream<T> {
    type Item = Result<T, MapsRxError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().receiver.poll_next_unpin(cx)
    }
}

impl<T> Drop for EventStream<T> {
    fn drop(&mut self) { dispose_shared(&self.handle); }
}

impl<T> fmt::Debug for EventStream<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream").field("disposed", &self.is_disposed()).finish()
    }
}

/// Convenience adapters for [`MainContextObservable`] sources.
pub trait ObservableExt: MainContextObservable {
    /// Subscribes a closure.
    ///
    /// # Errors
    ///
    /// Returns the error the source signalled during subscription, such as
    /// [`MapsRxError::NotOnMainContext`] when called off the main context.
    fn subscribe_with<F>(&self, on_next: F) -> Result<Subscription, MapsRxError>
    where
        F: Fn(Self::Item) + Send + Sync + 'static,
    {
        let observer = Arc::new(FnObserver {
            on_next,
            handle: Mutex::new(None),
            error: Mutex::new(None),
            _item: PhantomData,
        });
        self.subscribe(observer.clone());

        let disposable = observer.handle.lock().take().unwrap_or_else(Disposable::empty);
        let error = observer.error.lock().take();
        if let Some(error) = error {
            disposable.dispose();
            return Err(error);
        }
        Ok(Subscription { disposable })
    }

    /// Subscribes and returns the events as a `futures::Stream`.
    ///
    /// A rejected subscription yields its error as the single item.
    fn into_stream(&self) -> EventStream<Self::Item> {
        let (sender, receiver) = mpsc::unbounded();
        let handle = SharedHandle::default();
        self.subscribe(Arc::new(ChannelObserver { sender, handle: Arc::clone(&handle) }));
        EventStream { receiver, handle }
    }
}

impl<O: MainContextObservable + ?Sized> ObservableExt for O {}

struct OneshotObserver<T> {
    sender: Mutex<Option<oneshot::Sender<Result<Option<T>, MapsRxError>>>>,
    handle: SharedHandle,
}

impl<T: Send> OneshotObserver<T> {
    fn resolve(&self, outcome: Result<Option<T>, MapsRxError>) {
        let sender = self.sender.lock().take();
        if let Some(sender) = sender {
            if sender.send(outcome).is_err() {
                tracing::trace!("stream: future dropped before resolution");
            }
        }
    }
}

impl<T: Send> MaybeObserver<T> for OneshotObserver<T> {
    fn on_subscribe(&self, disposable: Disposable) { *self.handle.lock() = Some(disposable); }

    fn on_success(&self, value: T) { self.resolve(Ok(Some(value))); }

    fn on_error(&self, error: MapsRxError) { self.resolve(Err(error)); }

    fn on_complete(&self) { self.resolve(Ok(None)); }
}

/// Future over a [`MainContextMaybe`] source.
///
/// Resolves to `Ok(Some(value))` on success, `Ok(None)` on empty completion
/// or when the source lets go of its observer without signalling, and
/// `Err` on failure.
pub struct MaybeFuture<T> {
    receiver: oneshot::Receiver<Result<Option<T>, MapsRxError>>,
    handle: SharedHandle,
}

impl<T> MaybeFuture<T> {
    /// Disposes the subscription. The future then resolves to `Ok(None)`
    /// once the source drops its observer.
    pub fn dispose(&self) { dispose_shared(&self.handle); }
}

impl<T> Future for MaybeFuture<T> {
    type Output = Result<Option<T>, MapsRxError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.get_mut().receiver.poll_unpin(cx) {
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
            Poll::Ready(Err(oneshot::Canceled)) => Poll::Ready(Ok(None)),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<T> Drop for MaybeFuture<T> {
    fn drop(&mut self) { dispose_shared(&self.handle); }
}

impl<T> fmt::Debug for MaybeFuture<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MaybeFuture").finish_non_exhaustive()
    }
}

/// Convenience adapters for [`MainContextMaybe`] sources.
pub trait MaybeExt: MainContextMaybe {
    /// Subscribes and returns the outcome as a future.
    fn into_future(&self) -> MaybeFuture<Self::Item> {
        let (sender, receiver) = oneshot::channel();
        let handle = SharedHandle::default();
        self.subscribe(Arc::new(OneshotObserver {
            sender: Mutex::new(Some(sender)),
            handle: Arc::clone(&handle),
        }));
        MaybeFuture { receiver, handle }
    }
}

impl<M: MainContextMaybe + ?Sized> MaybeExt for M {}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use futures::executor::block_on;

    use super::*;
    use crate::context::ManualContext;
    use crate::events::RxMap;
    use crate::headless::{HeadlessContainer, HeadlessMap};
    use crate::ready::map_ready;
    use crate::surface::LatLng;

    fn setup() -> (Arc<HeadlessMap>, Arc<ManualContext>, RxMap<HeadlessMap>) {
        let map = Arc::new(HeadlessMap::new());
        let context = Arc::new(ManualContext::new());
        let rx = RxMap::new(Arc::clone(&map), context.clone());
        (map, context, rx)
    }

    #[test]
    fn test_subscribe_with_forwards_until_dropped() {
        let (map, _context, rx) = setup();
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);

        let subscription = rx
            .camera_idle_events()
            .subscribe_with(move |()| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        map.camera_idle.emit(());
        assert!(subscription.is_active());

        drop(subscription);
        map.camera_idle.emit(());

        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert!(!map.camera_idle.is_occupied());
    }

    #[test]
    fn test_subscribe_with_off_main_returns_error() {
        let (map, context, rx) = setup();
        context.enter_foreign();

        let result = rx.map_click_events().subscribe_with(|_| {});

        assert!(result.unwrap_err().is_not_on_main_context());
        assert_eq!(map.total_writes(), 0);
    }

    #[test]
    fn test_unsubscribe_clears_slot() {
        let (map, _context, rx) = setup();
        let subscription = rx.map_click_events().subscribe_with(|_| {}).unwrap();

        subscription.unsubscribe();

        assert_eq!(map.map_click.clear_count(), 1);
    }

    #[test]
    fn test_stream_yields_events_in_order() {
        let (map, _context, rx) = setup();
        let mut stream = rx.map_click_events().into_stream();

        map.map_click.emit(LatLng::new(1.0, 1.0));
        map.map_click.emit(LatLng::new(2.0, 2.0));

        let first = stream.next().now_or_never().unwrap().unwrap().unwrap();
        let second = stream.next().now_or_never().unwrap().unwrap().unwrap();
        assert_eq!(first, LatLng::new(1.0, 1.0));
        assert_eq!(second, LatLng::new(2.0, 2.0));
        assert!(stream.next().now_or_never().is_none());
    }

    #[test]
    fn test_stream_off_main_yields_error_then_ends() {
        let (_map, context, rx) = setup();
        context.enter_foreign();

        let items: Vec<_> = block_on(rx.camera_move_events().into_stream().collect());

        assert_eq!(items.len(), 1);
        assert!(items[0].as_ref().unwrap_err().is_not_on_main_context());
    }

    #[test]
    fn test_dropping_stream_clears_slot() {
        let (map, _context, rx) = setup();
        let stream = rx.camera_move_events().into_stream();
        assert!(map.camera_move.is_occupied());
        assert!(!stream.is_disposed());

        drop(stream);

        assert!(!map.camera_move.is_occupied());
        assert_eq!(map.camera_move.clear_count(), 1);
    }

    #[test]
    fn test_future_resolves_with_ready_map() {
        let context = Arc::new(ManualContext::new());
        let container = Arc::new(HeadlessContainer::new());
        let future = map_ready(Arc::clone(&container), context).into_future();

        let map = container.make_ready();
        let delivered = block_on(future).unwrap().unwrap();

        assert!(Arc::ptr_eq(&delivered, &map));
    }

    #[test]
    fn test_future_is_pending_until_ready() {
        let context = Arc::new(ManualContext::new());
        let container = Arc::new(HeadlessContainer::new());
        let mut future = map_ready(Arc::clone(&container), context).into_future();

        assert!((&mut future).now_or_never().is_none());
        container.make_ready();
        assert!(future.now_or_never().unwrap().unwrap().is_some());
    }

    #[test]
    fn test_future_off_main_is_error() {
        let context = Arc::new(ManualContext::new());
        context.enter_foreign();
        let container = Arc::new(HeadlessContainer::new());

        let outcome = block_on(map_ready(container, context).into_future());

        assert!(outcome.unwrap_err().is_not_on_main_context());
    }

    #[test]
    fn test_disposed_future_ignores_late_map() {
        let context = Arc::new(ManualContext::new());
        let container = Arc::new(HeadlessContainer::new());
        let future = map_ready(Arc::clone(&container), context).into_future();

        future.dispose();
        container.make_ready();

        assert_eq!(block_on(future).unwrap().map(|_| ()), None);
    }
}
