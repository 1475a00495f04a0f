//! maps-rx - Observable streams over single-listener map callbacks.
//!
//! A host map exposes one listener slot per event kind (camera move, map
//! click, info window close, ...). This crate turns each slot into a push
//! stream with explicit cancellation, and refuses subscriptions made off the
//! host's main context.
//!
//! ```text
//!   host map ──listener──▶ ListenerBridge ──on_next──▶ Observer
//!      ▲                        │
//!      └──── install(None) ◀── Disposable::dispose()
//! ```
//!
//! Start from [`RxMap`] for event streams and [`map_ready`] for the one-shot
//! map-ready source. [`ObservableExt`] and [`MaybeExt`] adapt either to
//! closures, `futures::Stream` and `Future`.

// Core modules
pub mod bridge;
pub mod context;
pub mod disposable;
pub mod error;
pub mod events;
pub mod observable;
pub mod observer;
pub mod ready;
pub mod replay;
pub mod slots;
pub mod stream;
pub mod surface;

// Ambient modules
pub mod cli;
pub mod config;
pub mod logging;

// Headless host and test helpers
pub mod headless;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use bridge::{ListenerBridge, SlotBinding};
pub use config::RxConfig;
pub use context::{ContextId, MainContext, ManualContext, ThreadContext};
pub use disposable::Disposable;
pub use error::MapsRxError;
pub use events::RxMap;
pub use observable::{MainContextMaybe, MainContextObservable};
pub use observer::{MaybeObserver, Observer};
pub use ready::{MapReady, map_ready};
pub use slots::SlotRelease;
pub use stream::{EventStream, MaybeExt, MaybeFuture, ObservableExt, Subscription};
pub use surface::{
    CameraMoveStartedReason, EventKind, LatLng, Listener, MapContainer, MapSurface, Marker,
};
