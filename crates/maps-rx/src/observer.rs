//! Subscriber traits.
//!
//! Observers are shared with native listeners that the host may invoke later,
//! so they are held as `Arc<dyn Observer<T>>` and take `&self`.

use crate::disposable::Disposable;
use crate::error::MapsRxError;

/// Receiver of a zero-or-many value stream.
pub trait Observer<T>: Send + Sync {
    /// Called exactly once, before any other notification.
    fn on_subscribe(&self, disposable: Disposable);

    /// Called once per forwarded event, in host invocation order.
    fn on_next(&self, value: T);

    /// Terminal failure.
    fn on_error(&self, error: MapsRxError);

    /// Terminal completion. Map event streams never complete on their own.
    fn on_complete(&self) {}
}

/// Receiver of a zero-or-one value stream.
pub trait MaybeObserver<T>: Send + Sync {
    /// Called exactly once, before any other notification.
    fn on_subscribe(&self, disposable: Disposable);

    /// Terminal success carrying the single value.
    fn on_success(&self, value: T);

    /// Terminal failure.
    fn on_error(&self, error: MapsRxError);

    /// Terminal completion without a value.
    fn on_complete(&self) {}
}
