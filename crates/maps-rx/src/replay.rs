//! Scripted replays against a headless map.
//!
//! A script is a JSONC document listing steps in order. Subscribe steps
//! open a subscription (numbered from 1 in script order), cancel steps drop
//! one by number, and every other step makes the host invoke a slot:
//!
//! ```jsonc
//! {
//!   "steps": [
//!     { "op": "subscribe", "kind": "mapClick" },
//!     { "op": "subscribe", "kind": "mapClick" },   // displaces #1
//!     { "op": "cancel", "id": 1 },                 // clears the slot under #2
//!     { "op": "mapClick", "latitude": 1.5, "longitude": 2.5 }
//!   ]
//! }
//! ```
//!
//! The whole replay runs on the calling thread, which is the main context.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::config::RxConfig;
use crate::context::{MainContext, ThreadContext};
use crate::error::MapsRxError;
use crate::events::RxMap;
use crate::headless::{HeadlessMap, SlotWrite};
use crate::observable::MainContextObservable;
use crate::stream::{ObservableExt, Subscription};
use crate::surface::{EventKind, LatLng, Marker};

/// A parsed replay script.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Script {
    /// Steps in execution order.
    pub steps: Vec<Step>,
}

/// One script step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Step {
    /// Open a subscription to `kind`.
    Subscribe {
        /// The event kind.
        kind: EventKind,
    },
    /// Dispose subscription number `id`.
    Cancel {
        /// 1-based subscription number.
        id: usize,
    },
    /// Host reports a camera move.
    CameraMove,
    /// Host reports the camera starting to move.
    CameraMoveStarted {
        /// Raw reason code.
        reason: i32,
    },
    /// Host reports the camera settling.
    CameraIdle,
    /// Host reports a tap.
    MapClick {
        /// Latitude in degrees.
        latitude: f64,
        /// Longitude in degrees.
        longitude: f64,
    },
    /// Host reports a long press.
    MapLongClick {
        /// Latitude in degrees.
        latitude: f64,
        /// Longitude in degrees.
        longitude: f64,
    },
    /// Host reports an info window closing.
    InfoWindowClose {
        /// The marker whose window closed.
        marker: Marker,
    },
    /// Host reports an info window tap.
    InfoWindowClick {
        /// The marker whose window was tapped.
        marker: Marker,
    },
}

/// One event as seen by a subscriber.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Delivery {
    /// Subscription number.
    pub subscription: usize,
    /// Event kind.
    pub kind: EventKind,
    /// Payload as JSON; `null` for unit events.
    pub payload: serde_json::Value,
}

/// Final state of one slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotSummary {
    /// Event kind.
    pub kind: EventKind,
    /// Whether a listener is installed after the replay.
    pub occupied: bool,
    /// Number of installs.
    pub installs: usize,
    /// Number of clears.
    pub clears: usize,
}

/// Outcome of a replay.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayReport {
    /// Every delivery, in order.
    pub deliveries: Vec<Delivery>,
    /// Slots that saw at least one write.
    pub slots: Vec<SlotSummary>,
}

impl ReplayReport {
    /// Deliveries received by subscription `id`.
    #[must_use]
    pub fn deliveries_for(&self, id: usize) -> Vec<&Delivery> {
        self.deliveries.iter().filter(|delivery| delivery.subscription == id).collect()
    }

    /// Summary for `kind`, if its slot was touched.
    #[must_use]
    pub fn slot(&self, kind: EventKind) -> Option<&SlotSummary> {
        self.slots.iter().find(|slot| slot.kind == kind)
    }
}

type DeliveryLog = Arc<Mutex<Vec<Delivery>>>;

/// Reads and parses a script file. Comments are allowed.
///
/// # Errors
///
/// Returns `MapsRxError::Io` if the file cannot be read and
/// `MapsRxError::Script` if it does not parse.
pub fn load_script(path: &Path) -> Result<Script, MapsRxError> {
    let file = fs::File::open(path)?;
    let reader = json_comments::StripComments::new(file);
    Ok(serde_json::from_reader(reader)?)
}

/// Parses a script from a string. Comments are allowed.
///
/// # Errors
///
/// Returns `MapsRxError::Script` if the text does not parse.
pub fn parse_script(text: &str) -> Result<Script, MapsRxError> {
    let reader = json_comments::StripComments::new(text.as_bytes());
    Ok(serde_json::from_reader(reader)?)
}

/// Runs `script` on a fresh headless map, on the calling thread.
///
/// # Errors
///
/// Returns `MapsRxError::Script` when a cancel step names an unknown or
/// already cancelled subscription.
pub fn run_script(script: &Script, config: &RxConfig) -> Result<ReplayReport, MapsRxError> {
    let map = Arc::new(HeadlessMap::new());
    let context = Arc::new(ThreadContext::for_current_thread());
    let rx = RxMap::with_config(Arc::clone(&map), context.clone(), config.clone());
    let log = DeliveryLog::default();
    let mut subscriptions: Vec<Option<Subscription>> = Vec::new();

    tracing::info!(
        steps = script.steps.len(),
        release = ?config.slot_release,
        context = %context.main_id(),
        "replay: starting"
    );

    for (index, step) in script.steps.iter().enumerate() {
        tracing::debug!(step = index + 1, ?step, "replay: step");
        match step {
            Step::Subscribe { kind } => {
                let id = subscriptions.len() + 1;
                subscriptions.push(Some(subscribe(&rx, *kind, id, &log)?));
            }
            Step::Cancel { id } => {
                let subscription = id
                    .checked_sub(1)
                    .and_then(|slot| subscriptions.get_mut(slot))
                    .and_then(Option::take)
                    .ok_or_else(|| {
                        MapsRxError::Script(format!(
                            "step {}: no live subscription #{id}",
                            index + 1
                        ))
                    })?;
                subscription.unsubscribe();
            }
            Step::CameraMove => emit(map.camera_move.emit(()), EventKind::CameraMove),
            Step::CameraMoveStarted { reason } => {
                emit(map.camera_move_started.emit(*reason), EventKind::CameraMoveStarted);
            }
            Step::CameraIdle => emit(map.camera_idle.emit(()), EventKind::CameraIdle),
            Step::MapClick { latitude, longitude } => {
                emit(map.map_click.emit(LatLng::new(*latitude, *longitude)), EventKind::MapClick);
            }
            Step::MapLongClick { latitude, longitude } => emit(
                map.map_long_click.emit(LatLng::new(*latitude, *longitude)),
                EventKind::MapLongClick,
            ),
            Step::InfoWindowClose { marker } => {
                emit(map.info_window_close.emit(marker.clone()), EventKind::InfoWindowClose);
            }
            Step::InfoWindowClick { marker } => {
                emit(map.info_window_click.emit(marker.clone()), EventKind::InfoWindowClick);
            }
        }
    }

    let slots = EventKind::ALL
        .iter()
        .filter_map(|kind| summarize(&map, *kind))
        .collect();

    // Subscriptions still open are disposed here, after the slot snapshot.
    drop(subscriptions);
    context.run_pending()?;

    let deliveries = std::mem::take(&mut *log.lock());
    tracing::info!(deliveries = deliveries.len(), "replay: finished");
    Ok(ReplayReport { deliveries, slots })
}

fn emit(delivered: bool, kind: EventKind) {
    if !delivered {
        tracing::debug!(%kind, "replay: slot empty, event ignored by host");
    }
}

fn summarize(map: &HeadlessMap, kind: EventKind) -> Option<SlotSummary> {
    let writes = map.writes(kind);
    if writes.is_empty() {
        return None;
    }
    let installs = writes.iter().filter(|write| **write == SlotWrite::Installed).count();
    Some(SlotSummary {
        kind,
        occupied: map.is_occupied(kind),
        installs,
        clears: writes.len() - installs,
    })
}

fn subscribe(
    rx: &RxMap<HeadlessMap>,
    kind: EventKind,
    id: usize,
    log: &DeliveryLog,
) -> Result<Subscription, MapsRxError> {
    match kind {
        EventKind::CameraMove => record(&rx.camera_move_events(), kind, id, log),
        EventKind::CameraMoveStarted => record(&rx.camera_move_started_events(), kind, id, log),
        EventKind::CameraIdle => record(&rx.camera_idle_events(), kind, id, log),
        EventKind::MapClick => record(&rx.map_click_events(), kind, id, log),
        EventKind::MapLongClick => record(&rx.map_long_click_events(), kind, id, log),
        EventKind::InfoWindowClose => record(&rx.info_window_close_events(), kind, id, log),
        EventKind::InfoWindowClick => record(&rx.info_window_click_events(), kind, id, log),
    }
}

fn record<O>(
    source: &O,
    kind: EventKind,
    id: usize,
    log: &DeliveryLog,
) -> Result<Subscription, MapsRxError>
where
    O: MainContextObservable,
    O::Item: Serialize,
{
    let log = Arc::clone(log);
    source.subscribe_with(move |payload| {
        let payload = serde_json::to_value(&payload).unwrap_or(serde_json::Value::Null);
        log.lock().push(Delivery { subscription: id, kind, payload });
    })
}
