// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! External collaborator interfaces (§4.6): HAL, Device Manager, and the
//! Communicator hook bus. These are traits so the manager is fully
//! testable without a real audio server behind it; the default
//! implementations are no-op stand-ins.

use streammgr_ipc::Direction;
use tracing::debug;

/// Buffer-latency hints the HAL would normally compute from a stream's
/// latency class.
#[derive(Debug, Clone, Default)]
pub struct BufferAttribute {
    pub maxlength: u32,
    pub tlength: u32,
    pub prebuf: u32,
    pub minreq: u32,
    pub fragsize: u32,
}

/// Hardware Abstraction Layer: device-specific level tables, buffer hints,
/// and mute controls (§4.6).
pub trait HalClient: Send {
    fn get_volume_value(&self, volume_type: &str, direction: Direction, level: u32) -> Option<f64>;
    fn set_volume_level(&self, volume_type: &str, direction: Direction, level: u32);
    fn set_mute(&self, volume_type: &str, direction: Direction, muted: bool);
    fn get_buffer_attribute(&self, latency_class: &str) -> BufferAttribute;
}

/// No-op HAL used when no real hardware abstraction layer is wired in.
#[derive(Debug, Default)]
pub struct NullHal;

impl HalClient for NullHal {
    fn get_volume_value(&self, volume_type: &str, _direction: Direction, _level: u32) -> Option<f64> {
        debug!(volume_type, "NullHal: no HAL-backed volume value");
        None
    }

    fn set_volume_level(&self, _volume_type: &str, _direction: Direction, _level: u32) {}

    fn set_mute(&self, _volume_type: &str, _direction: Direction, _muted: bool) {}

    fn get_buffer_attribute(&self, _latency_class: &str) -> BufferAttribute {
        BufferAttribute::default()
    }
}

/// Device connectivity event published by the Device Manager (§4.6).
#[derive(Debug, Clone)]
pub struct ConnectionChanged {
    pub device: String,
    pub direction: Direction,
    pub is_connected: bool,
}

/// Outcome of a `SelectInitSinkOrSource` hook dispatch, replacing the
/// source's destination-out-parameter (§9).
#[derive(Debug, Clone, Default)]
pub struct SelectionOutcome {
    pub chosen_device: Option<String>,
    pub options: Vec<String>,
}

/// A routing/volume decision published to external subscribers (§4.5,
/// §4.6). Carries the data the source's `do_notify` hook payloads carry.
#[derive(Debug, Clone)]
pub enum Notification {
    SelectInitSinkOrSource {
        direction: Direction,
        role: String,
    },
    ChangeRouteStartWithNewData {
        direction: Direction,
        role: String,
        route_type: streammgr_ipc::RouteType,
        avail_devices: Vec<String>,
        manual_devices: Vec<u32>,
    },
    ChangeRouteStart {
        direction: Direction,
        role: String,
        manual_devices: Vec<u32>,
    },
    ChangeRouteEnd {
        direction: Direction,
        role: String,
    },
    UpdateRouteOption {
        direction: Direction,
        name: String,
        value: i32,
    },
    InformStreamConnected {
        direction: Direction,
        stream_id: u32,
    },
    InformStreamDisconnected {
        direction: Direction,
        stream_id: u32,
    },
}

/// Hook bus used to publish routing decisions (§4.6). The manager calls
/// into this on every pipeline step that the source's `do_notify` covers;
/// a real binding would forward these onto the Communicator's hook
/// subscribers.
pub trait Communicator: Send {
    fn select_init_sink_or_source(&self, direction: Direction, role: &str) -> SelectionOutcome;
    fn notify(&self, notification: Notification);
}

/// Default Communicator: logs every notification and never overrides
/// device selection. Sufficient for a standalone daemon with no real
/// Device Router behind it.
#[derive(Debug, Default)]
pub struct LoggingCommunicator;

impl Communicator for LoggingCommunicator {
    fn select_init_sink_or_source(&self, direction: Direction, role: &str) -> SelectionOutcome {
        debug!(?direction, role, "select_init_sink_or_source: no override");
        SelectionOutcome::default()
    }

    fn notify(&self, notification: Notification) {
        debug!(?notification, "communicator notify");
    }
}

/// Persistent-KV seeding of initial playback levels (§6). Backed in this
/// daemon by a small JSON sidecar rather than a system key-value service
/// (see `config.rs`).
pub trait InitialLevelStore: Send {
    fn initial_level(&self, volume_type: &str) -> Option<u32>;
}

/// No seeding at all — every type starts at level 0.
#[derive(Debug, Default)]
pub struct NoInitialLevels;

impl InitialLevelStore for NoInitialLevels {
    fn initial_level(&self, _volume_type: &str) -> Option<u32> {
        None
    }
}
