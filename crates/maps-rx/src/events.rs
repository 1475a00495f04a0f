//! Event stream factories for a host map.
//!
//! [`RxMap`] attaches to one [`MapSurface`] and hands out one
//! [`ListenerBridge`] per event kind. Each factory is a [`SlotBinding`]:
//! which setter to call and how to turn the native argument into a payload.
//!
//! # One Listener Per Kind
//!
//! The host keeps a single listener per kind, so only one live subscription
//! per kind behaves as expected. A second subscription of the same kind
//! displaces the first, which then stops receiving events without any
//! notification. With the default [`SlotRelease::Unconditional`] policy,
//! disposing the displaced subscription also clears the slot under the newer
//! one; [`SlotRelease::OwnerOnly`] leaves the newer listener in place.
//!
//! [`SlotRelease::Unconditional`]: crate::SlotRelease::Unconditional
//! [`SlotRelease::OwnerOnly`]: crate::SlotRelease::OwnerOnly

use std::convert::identity;
use std::fmt;
use std::sync::Arc;

use crate::bridge::{ListenerBridge, SlotBinding};
use crate::config::RxConfig;
use crate::context::MainContext;
use crate::slots::SlotClaims;
use crate::surface::{CameraMoveStartedReason, EventKind, LatLng, MapSurface, Marker};

/// Camera move events. Emits `()` per move.
pub type CameraMoveEvents<M> = ListenerBridge<M, (), ()>;
/// Camera move started events.
pub type CameraMoveStartedEvents<M> = ListenerBridge<M, i32, CameraMoveStartedReason>;
/// Camera idle events. Emits `()` each time the camera settles.
pub type CameraIdleEvents<M> = ListenerBridge<M, (), ()>;
/// Map click events.
pub type MapClickEvents<M> = ListenerBridge<M, LatLng, LatLng>;
/// Map long click events.
pub type MapLongClickEvents<M> = ListenerBridge<M, LatLng, LatLng>;
/// Info window close events. Emits the marker whose window closed.
pub type InfoWindowCloseEvents<M> = ListenerBridge<M, Marker, Marker>;
/// Info window click events.
pub type InfoWindowClickEvents<M> = ListenerBridge<M, Marker, Marker>;

/// Reactive view of a host map.
pub struct RxMap<M: MapSurface> {
    map: Arc<M>,
    context: Arc<dyn MainContext>,
    claims: Arc<SlotClaims>,
    config: RxConfig,
}

impl<M: MapSurface> RxMap<M> {
    /// Attaches to `map` with the default configuration.
    #[must_use]
    pub fn new(map: Arc<M>, context: Arc<dyn MainContext>) -> Self {
        Self::with_config(map, context, RxConfig::default())
    }

    /// Attaches to `map` with `config`.
    #[must_use]
    pub fn with_config(map: Arc<M>, context: Arc<dyn MainContext>, config: RxConfig) -> Self {
        Self { map, context, claims: Arc::new(SlotClaims::new()), config }
    }

    /// The underlying host map.
    #[must_use]
    pub const fn map(&self) -> &Arc<M> { &self.map }

    /// The configuration streams are created with.
    #[must_use]
    pub const fn config(&self) -> &RxConfig { &self.config }

    /// Slot occupancy as recorded by this view.
    #[must_use]
    pub const fn claims(&self) -> &Arc<SlotClaims> { &self.claims }

    /// Emits whenever the camera moves.
    #[must_use]
    pub fn camera_move_events(&self) -> CameraMoveEvents<M> {
        self.bridge(SlotBinding {
            kind: EventKind::CameraMove,
            install: M::set_on_camera_move_listener,
            extract: identity,
        })
    }

    /// Emits the reason whenever the camera starts moving.
    #[must_use]
    pub fn camera_move_started_events(&self) -> CameraMoveStartedEvents<M> {
        self.bridge(SlotBinding {
            kind: EventKind::CameraMoveStarted,
            install: M::set_on_camera_move_started_listener,
            extract: CameraMoveStartedReason::from_code,
        })
    }

    /// Emits whenever the camera stops moving.
    #[must_use]
    pub fn camera_idle_events(&self) -> CameraIdleEvents<M> {
        self.bridge(SlotBinding {
            kind: EventKind::CameraIdle,
            install: M::set_on_camera_idle_listener,
            extract: identity,
        })
    }

    /// Emits the tapped coordinate whenever the map is tapped.
    #[must_use]
    pub fn map_click_events(&self) -> MapClickEvents<M> {
        self.bridge(SlotBinding {
            kind: EventKind::MapClick,
            install: M::set_on_map_click_listener,
            extract: identity,
        })
    }

    /// Emits the pressed coordinate whenever the map is long-pressed.
    #[must_use]
    pub fn map_long_click_events(&self) -> MapLongClickEvents<M> {
        self.bridge(SlotBinding {
            kind: EventKind::MapLongClick,
            install: M::set_on_map_long_click_listener,
            extract: identity,
        })
    }

    /// Emits the marker whenever its info window is closed.
    #[must_use]
    pub fn info_window_close_events(&self) -> InfoWindowCloseEvents<M> {
        self.bridge(SlotBinding {
            kind: EventKind::InfoWindowClose,
            install: M::set_on_info_window_close_listener,
            extract: identity,
        })
    }

    /// Emits the marker whenever its info window is tapped.
    #[must_use]
    pub fn info_window_click_events(&self) -> InfoWindowClickEvents<M> {
        self.bridge(SlotBinding {
            kind: EventKind::InfoWindowClick,
            install: M::set_on_info_window_click_listener,
            extract: identity,
        })
    }

    fn bridge<N, P>(&self, binding: SlotBinding<M, N, P>) -> ListenerBridge<M, N, P>
    where
        N: Send + 'static,
        P: Send + 'static,
    {
        ListenerBridge::new(
            Arc::clone(&self.map),
            Arc::clone(&self.context),
            Arc::clone(&self.claims),
            self.config.clone(),
            binding,
        )
    }
}

impl<M: MapSurface> Clone for RxMap<M> {
    fn clone(&self) -> Self {
        Self {
            map: Arc::clone(&self.map),
            context: Arc::clone(&self.context),
            claims: Arc::clone(&self.claims),
            config: self.config.clone(),
        }
    }
}

impl<M: MapSurface> fmt::Debug for RxMap<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RxMap")
            .field("main_context", &self.context.main_id())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
