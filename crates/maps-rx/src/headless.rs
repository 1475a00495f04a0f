//! In-memory map surface.
//!
//! [`HeadlessMap`] behaves like a host map with nothing rendered: one
//! single-occupant [`Slot`] per event kind, last write wins, and events are
//! injected by calling `emit` on a slot. Every write is recorded so callers
//! can assert how many times a slot was installed or cleared.
//!
//! Listeners are always invoked with no lock held, so a listener may dispose
//! its own subscription (and clear the slot) from inside the callback.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::surface::{EventKind, LatLng, Listener, MapContainer, MapSurface, Marker, OnceCallback};

/// One write made to a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotWrite {
    /// A listener was installed.
    Installed,
    /// The slot was set to `None`.
    Cleared,
}

/// A single-listener registration point.
pub struct Slot<N> {
    kind: EventKind,
    current: Mutex<Option<Listener<N>>>,
    retired: Mutex<Vec<Listener<N>>>,
    writes: Mutex<Vec<SlotWrite>>,
}

impl<N: Clone> Slot<N> {
    /// Creates an empty slot.
    #[must_use]
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            current: Mutex::new(None),
            retired: Mutex::new(Vec::new()),
            writes: Mutex::new(Vec::new()),
        }
    }

    /// Which slot this is.
    #[must_use]
    pub const fn kind(&self) -> EventKind { self.kind }

    /// Replaces the occupant.
    pub fn set(&self, listener: Option<Listener<N>>) {
        let write = if listener.is_some() { SlotWrite::Installed } else { SlotWrite::Cleared };
        let previous = std::mem::replace(&mut *self.current.lock(), listener);
        if let Some(previous) = previous {
            self.retired.lock().push(previous);
        }
        self.writes.lock().push(write);
        tracing::trace!(kind = %self.kind, ?write, "headless: slot written");
    }

    /// Invokes the current occupant. Returns `false` if the slot is empty.
    pub fn emit(&self, value: N) -> bool {
        let listener = self.current.lock().clone();
        listener.is_some_and(|listener| {
            listener(value);
            true
        })
    }

    /// Invokes every listener replaced or removed since the last call, as if
    /// the host had queued invocations for them before the write. Each one is
    /// invoked once and then forgotten. Returns how many were invoked.
    pub fn emit_stale(&self, value: &N) -> usize {
        let retired = std::mem::take(&mut *self.retired.lock());
        for listener in &retired {
            listener(value.clone());
        }
        retired.len()
    }

    /// Whether a listener is installed.
    #[must_use]
    pub fn is_occupied(&self) -> bool { self.current.lock().is_some() }

    /// Every write, in order.
    #[must_use]
    pub fn writes(&self) -> Vec<SlotWrite> { self.writes.lock().clone() }

    /// Number of installs.
    #[must_use]
    pub fn install_count(&self) -> usize { self.count(SlotWrite::Installed) }

    /// Number of clears.
    #[must_use]
    pub fn clear_count(&self) -> usize { self.count(SlotWrite::Cleared) }

    fn count(&self, write: SlotWrite) -> usize {
        self.writes.lock().iter().filter(|recorded| **recorded == write).count()
    }
}

impl<N> fmt::Debug for Slot<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slot")
            .field("kind", &self.kind)
            .field("occupied", &self.current.lock().is_some())
            .field("writes", &self.writes.lock().len())
            .finish()
    }
}

/// Map surface backed by in-memory slots.
#[derive(Debug)]
pub struct HeadlessMap {
    /// Camera move slot.
    pub camera_move: Slot<()>,
    /// Camera move started slot (native reason code).
    pub camera_move_started: Slot<i32>,
    /// Camera idle slot.
    pub camera_idle: Slot<()>,
    /// Map click slot.
    pub map_click: Slot<LatLng>,
    /// Map long click slot.
    pub map_long_click: Slot<LatLng>,
    /// Info window close slot.
    pub info_window_close: Slot<Marker>,
    /// Info window click slot.
    pub info_window_click: Slot<Marker>,
}

impl Default for HeadlessMap {
    fn default() -> Self { Self::new() }
}

impl HeadlessMap {
    /// Creates a map with every slot empty.
    #[must_use]
    pub fn new() -> Self {
        Self {
            camera_move: Slot::new(EventKind::CameraMove),
            camera_move_started: Slot::new(EventKind::CameraMoveStarted),
            camera_idle: Slot::new(EventKind::CameraIdle),
            map_click: Slot::new(EventKind::MapClick),
            map_long_click: Slot::new(EventKind::MapLongClick),
            info_window_close: Slot::new(EventKind::InfoWindowClose),
            info_window_click: Slot::new(EventKind::InfoWindowClick),
        }
    }

    /// Writes recorded for `kind`.
    #[must_use]
    pub fn writes(&self, kind: EventKind) -> Vec<SlotWrite> {
        match kind {
            EventKind::CameraMove => self.camera_move.writes(),
            EventKind::CameraMoveStarted => self.camera_move_started.writes(),
            EventKind::CameraIdle => self.camera_idle.writes(),
            EventKind::MapClick => self.map_click.writes(),
            EventKind::MapLongClick => self.map_long_click.writes(),
            EventKind::InfoWindowClose => self.info_window_close.writes(),
            EventKind::InfoWindowClick => self.info_window_click.writes(),
        }
    }

    /// Whether `kind` has a listener installed.
    #[must_use]
    pub fn is_occupied(&self, kind: EventKind) -> bool {
        match kind {
            EventKind::CameraMove => self.camera_move.is_occupied(),
            EventKind::CameraMoveStarted => self.camera_move_started.is_occupied(),
            EventKind::CameraIdle => self.camera_idle.is_occupied(),
            EventKind::MapClick => self.map_click.is_occupied(),
            EventKind::MapLongClick => self.map_long_click.is_occupied(),
            EventKind::InfoWindowClose => self.info_window_close.is_occupied(),
            EventKind::InfoWindowClick => self.info_window_click.is_occupied(),
        }
    }

    /// Total number of writes across all slots.
    #[must_use]
    pub fn total_writes(&self) -> usize {
        EventKind::ALL.iter().map(|kind| self.writes(*kind).len()).sum()
    }
}

impl MapSurface for HeadlessMap {
    fn set_on_camera_move_listener(&self, listener: Option<Listener<()>>) {
        self.camera_move.set(listener);
    }

    fn set_on_camera_move_started_listener(&self, listener: Option<Listener<i32>>) {
        self.camera_move_started.set(listener);
    }

    fn set_on_camera_idle_listener(&self, listener: Option<Listener<()>>) {
        self.camera_idle.set(listener);
    }

    fn set_on_map_click_listener(&self, listener: Option<Listener<LatLng>>) {
        self.map_click.set(listener);
    }

    fn set_on_map_long_click_listener(&self, listener: Option<Listener<LatLng>>) {
        self.map_long_click.set(listener);
    }

    fn set_on_info_window_close_listener(&self, listener: Option<Listener<Marker>>) {
        self.info_window_close.set(listener);
    }

    fn set_on_info_window_click_listener(&self, listener: Option<Listener<Marker>>) {
        self.info_window_click.set(listener);
    }
}

/// Container that produces a [`HeadlessMap`] on demand.
#[derive(Default)]
pub struct HeadlessContainer {
    map: Mutex<Option<Arc<HeadlessMap>>>,
    waiting: Mutex<Vec<OnceCallback<Arc<HeadlessMap>>>>,
}

impl HeadlessContainer {
    /// Creates a container whose map is not ready yet.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Makes the map ready and runs every waiting callback.
    ///
    /// Returns the map. Calling it again returns the same map.
    pub fn make_ready(&self) -> Arc<HeadlessMap> {
        let map = Arc::clone(self.map.lock().get_or_insert_with(|| Arc::new(HeadlessMap::new())));
        let waiting = std::mem::take(&mut *self.waiting.lock());
        for callback in waiting {
            callback(Arc::clone(&map));
        }
        map
    }

    /// Number of callbacks waiting for the map.
    #[must_use]
    pub fn pending_requests(&self) -> usize { self.waiting.lock().len() }
}

impl MapContainer for HeadlessContainer {
    type Map = HeadlessMap;

    fn get_map_async(&self, callback: OnceCallback<Arc<HeadlessMap>>) {
        let ready = self.map.lock().clone();
        match ready {
            Some(map) => callback(map),
            None => self.waiting.lock().push(callback),
        }
    }
}

impl fmt::Debug for HeadlessContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeadlessContainer")
            .field("ready", &self.map.lock().is_some())
            .field("pending_requests", &self.pending_requests())
            .finish()
    }
}
