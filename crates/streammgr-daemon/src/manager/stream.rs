// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Per-stream identity and the side table that replaces the source's
//! property-bag coupling.

use streammgr_ipc::{Direction, RouteType};

/// Identifies a single sink-input or source-output. The server hands out
/// these indices; the manager never allocates them itself.
pub type StreamId = u32;

/// Lifecycle state of a stream as seen by the routing pipeline.
///
/// Replaces the `-1` priority sentinel used by the source to guard against
/// re-entrant end-of-stream processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Seen via new-data, not yet committed by `put`/`started`.
    Fresh,
    /// Routed and counted by the priority tracker.
    Active,
    /// Unlinked, corked, or moved away; further end events are no-ops.
    Ended,
}

/// Whether a stream's current mute was imposed by an in-flight device move,
/// or is the stream's own user-requested mute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveMuteState {
    /// Not muted due to a move in progress.
    None,
    /// Muted by `on_move_start`; `on_move_finish` will lift it.
    MutedByMove,
}

/// Everything the routing and volume pipelines need to know about one
/// stream, keyed by `StreamId` instead of scattered across string
/// properties on the stream object itself.
#[derive(Debug, Clone)]
pub struct StreamRecord {
    pub id: StreamId,
    pub direction: Direction,
    pub role: String,
    pub priority: i32,
    pub route_type: RouteType,
    pub volume_type: Option<String>,
    pub gain_type: Option<String>,
    pub parent_id: Option<u32>,
    pub state: StreamState,
    pub move_mute: MoveMuteState,
    /// This stream's own mute flag, distinct from its volume type's mute
    /// (§4.5): set directly, or by the move-mute machinery.
    pub muted: bool,
    /// Last linear gain value the Volume Applicator computed for this
    /// stream (§4.2), kept for inspection rather than pushed to a real
    /// device.
    pub last_applied_linear: Option<f64>,
    /// Last effective mute (type mute OR own mute) the Volume Applicator
    /// computed for this stream.
    pub last_applied_mute: bool,
}

impl StreamRecord {
    pub fn new(id: StreamId, direction: Direction, role: String) -> Self {
        Self {
            id,
            direction,
            role,
            priority: 0,
            route_type: RouteType::Auto,
            volume_type: None,
            gain_type: None,
            parent_id: None,
            state: StreamState::Fresh,
            move_mute: MoveMuteState::None,
            muted: false,
            last_applied_linear: None,
            last_applied_mute: false,
        }
    }
}
