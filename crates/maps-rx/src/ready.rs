//! One-shot "map ready" source.
//!
//! The host hands out its map through a one-shot callback that cannot be
//! withdrawn. [`MapReady`] wraps that in a [`MainContextMaybe`]: disposing
//! only flips the liveness flag, so a callback arriving afterwards is
//! dropped instead of reaching the subscriber.

use std::fmt;
use std::sync::Arc;

use crate::context::MainContext;
use crate::disposable::Disposable;
use crate::observable::MainContextMaybe;
use crate::observer::MaybeObserver;
use crate::surface::MapContainer;

/// Emits the container's map once it is ready.
pub struct MapReady<C> {
    container: Arc<C>,
    context: Arc<dyn MainContext>,
}

impl<C: MapContainer> MapReady<C> {
    /// Creates the source for `container`.
    #[must_use]
    pub fn new(container: Arc<C>, context: Arc<dyn MainContext>) -> Self {
        Self { container, context }
    }
}

/// Shorthand for [`MapReady::new`].
#[must_use]
pub fn map_ready<C: MapContainer>(container: Arc<C>, context: Arc<dyn MainContext>) -> MapReady<C> {
    MapReady::new(container, context)
}

impl<C: MapContainer> MainContextMaybe for MapReady<C> {
    type Item = Arc<C::Map>;

    fn main_context(&self) -> &Arc<dyn MainContext> { &self.context }

    fn subscribe_main_context(&self, observer: Arc<dyn MaybeObserver<Arc<C::Map>>>) {
        let disposable = Disposable::on_main_context(Arc::clone(&self.context));
        observer.on_subscribe(disposable.clone());
        if disposable.is_disposed() {
            return;
        }

        self.container.get_map_async(Box::new(move |map| {
            if disposable.is_disposed() {
                tracing::trace!("ready: map arrived after disposal, dropped");
                return;
            }
            // Terminal: later dispose() calls on the handle do nothing.
            disposable.dispose();
            tracing::debug!("ready: map delivered");
            observer.on_success(map);
        }));
    }
}

impl<C> fmt::Debug for MapReady<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapReady").finish_non_exhaustive()
    }
}
