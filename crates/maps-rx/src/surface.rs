//! Host map surface abstraction.
//!
//! The host map exposes one listener slot per event kind. Each slot holds at
//! most one listener; installing a listener (or `None`) replaces whatever was
//! there before. The host only installs, invokes and removes listeners on its
//! main context, and those calls are treated as infallible.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// A native listener installed into a host slot.
pub type Listener<N> = Arc<dyn Fn(N) + Send + Sync>;

/// One-shot native callback, invoked at most once by the host.
pub type OnceCallback<N> = Box<dyn FnOnce(N) + Send>;

/// Identifies a single-listener slot on the host map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
    /// Camera moved (repeatedly, while moving).
    CameraMove,
    /// Camera started moving.
    CameraMoveStarted,
    /// Camera stopped moving.
    CameraIdle,
    /// Map tapped.
    MapClick,
    /// Map long-pressed.
    MapLongClick,
    /// A marker's info window closed.
    InfoWindowClose,
    /// A marker's info window tapped.
    InfoWindowClick,
}

impl EventKind {
    /// Every slot kind, in declaration order.
    pub const ALL: [Self; 7] = [
        Self::CameraMove,
        Self::CameraMoveStarted,
        Self::CameraIdle,
        Self::MapClick,
        Self::MapLongClick,
        Self::InfoWindowClose,
        Self::InfoWindowClick,
    ];

    /// Dense index into per-kind tables.
    #[must_use]
    pub const fn index(self) -> usize { self as usize }

    /// Stable kebab-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CameraMove => "camera-move",
            Self::CameraMoveStarted => "camera-move-started",
            Self::CameraIdle => "camera-idle",
            Self::MapClick => "map-click",
            Self::MapLongClick => "map-long-click",
            Self::InfoWindowClose => "info-window-close",
            Self::InfoWindowClick => "info-window-click",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Geographic coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

impl LatLng {
    /// Creates a coordinate.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self { Self { latitude, longitude } }
}

impl fmt::Display for LatLng {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.latitude, self.longitude)
    }
}

/// A marker placed on the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Marker {
    /// Host-assigned marker id.
    pub id: String,
    /// Where the marker sits.
    pub position: LatLng,
    /// Info window title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Info window snippet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

impl Marker {
    /// Creates an untitled marker.
    #[must_use]
    pub fn new(id: impl Into<String>, position: LatLng) -> Self {
        Self { id: id.into(), position, title: None, snippet: None }
    }

    /// Sets the info window title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// Why the camera started moving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CameraMoveStartedReason {
    /// The user gestured on the map.
    Gesture,
    /// A default animation in response to a user action (e.g. zoom controls).
    ApiAnimation,
    /// An animation started by the app.
    DeveloperAnimation,
    /// A reason code this crate does not know about.
    Other(i32),
}

impl CameraMoveStartedReason {
    /// Native code for [`Self::Gesture`].
    pub const REASON_GESTURE: i32 = 1;
    /// Native code for [`Self::ApiAnimation`].
    pub const REASON_API_ANIMATION: i32 = 2;
    /// Native code for [`Self::DeveloperAnimation`].
    pub const REASON_DEVELOPER_ANIMATION: i32 = 3;

    /// Decodes the host's integer reason code.
    #[must_use]
    pub const fn from_code(code: i32) -> Self {
        match code {
            Self::REASON_GESTURE => Self::Gesture,
            Self::REASON_API_ANIMATION => Self::ApiAnimation,
            Self::REASON_DEVELOPER_ANIMATION => Self::DeveloperAnimation,
            other => Self::Other(other),
        }
    }

    /// The host's integer reason code.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Gesture => Self::REASON_GESTURE,
            Self::ApiAnimation => Self::REASON_API_ANIMATION,
            Self::DeveloperAnimation => Self::REASON_DEVELOPER_ANIMATION,
            Self::Other(code) => code,
        }
    }
}

/// The host map's single-listener slots.
///
/// Passing `None` removes the current listener. Each setter replaces any
/// previously installed listener for that kind.
pub trait MapSurface: Send + Sync + 'static {
    /// Camera move slot.
    fn set_on_camera_move_listener(&self, listener: Option<Listener<()>>);

    /// Camera move started slot. The listener receives the native reason code.
    fn set_on_camera_move_started_listener(&self, listener: Option<Listener<i32>>);

    /// Camera idle slot.
    fn set_on_camera_idle_listener(&self, listener: Option<Listener<()>>);

    /// Map click slot.
    fn set_on_map_click_listener(&self, listener: Option<Listener<LatLng>>);

    /// Map long click slot.
    fn set_on_map_long_click_listener(&self, listener: Option<Listener<LatLng>>);

    /// Info window close slot.
    fn set_on_info_window_close_listener(&self, listener: Option<Listener<Marker>>);

    /// Info window click slot.
    fn set_on_info_window_click_listener(&self, listener: Option<Listener<Marker>>);
}

/// A view that produces its map asynchronously.
pub trait MapContainer: Send + Sync + 'static {
    /// The map type handed out once ready.
    type Map: Send + Sync + 'static;

    /// Requests the map. The host calls `callback` once, on the main context,
    /// when the map is ready (immediately if it already is). The request
    /// cannot be withdrawn.
    fn get_map_async(&self, callback: OnceCallback<Arc<Self::Map>>);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_kind_indices_are_dense() {
        for (expected, kind) in EventKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), expected);
        }
    }

    #[test]
    fn test_event_kind_serde_uses_camel_case() {
        let json = serde_json::to_string(&EventKind::InfoWindowClose).unwrap();
        assert_eq!(json, "\"infoWindowClose\"");

        let kind: EventKind = serde_json::from_str("\"mapLongClick\"").unwrap();
        assert_eq!(kind, EventKind::MapLongClick);
    }

    #[test]
    fn test_event_kind_display() {
        assert_eq!(EventKind::CameraMoveStarted.to_string(), "camera-move-started");
    }

    #[test]
    fn test_reason_codes() {
        assert_eq!(CameraMoveStartedReason::from_code(1), CameraMoveStartedReason::Gesture);
        assert_eq!(CameraMoveStartedReason::from_code(2), CameraMoveStartedReason::ApiAnimation);
        assert_eq!(
            CameraMoveStartedReason::from_code(3),
            CameraMoveStartedReason::DeveloperAnimation
        );
        assert_eq!(CameraMoveStartedReason::from_code(42), CameraMoveStartedReason::Other(42));
        assert_eq!(CameraMoveStartedReason::Other(42).code(), 42);
        assert_eq!(CameraMoveStartedReason::Gesture.code(), 1);
    }

    #[test]
    fn test_marker_json_omits_empty_fields() {
        let marker = Marker::new("m1", LatLng::new(1.0, 2.0));
        let json = serde_json::to_value(&marker).unwrap();
        assert!(json.get("title").is_none());

        let titled = marker.with_title("Sydney");
        let json = serde_json::to_value(&titled).unwrap();
        assert_eq!(json["title"], "Sydney");
    }

    #[test]
    fn test_latlng_display() {
        assert_eq!(LatLng::new(-33.8688, 151.2093).to_string(), "(-33.868800, 151.209300)");
    }
}
