// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Shared IPC types and D-Bus interface definitions for the Stream Manager.
//!
//! This crate defines the wire contract between the daemon and any external
//! policy client: object path, interface name, and the DTOs exchanged by
//! the RPC surface described in the Control Interface.

use serde::{Deserialize, Serialize};
use zbus::zvariant::Type;

/// D-Bus service name for the Stream Manager daemon.
pub const DBUS_NAME: &str = "org.streammgr.StreamManager";

/// D-Bus object path for the main daemon interface.
pub const DBUS_PATH: &str = "/org/streammgr/StreamManager";

/// D-Bus interface name.
pub const DBUS_INTERFACE: &str = "org.streammgr.StreamManager";

/// Stream direction, as used throughout the RPC surface (`"in"` / `"out"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
pub enum Direction {
    In,
    Out,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::In => "in",
            Direction::Out => "out",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "in" => Some(Direction::In),
            "out" => Some(Direction::Out),
            _ => None,
        }
    }
}

/// Route-type assigned to a role, as reported by `GetStreamInfo`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
pub enum RouteType {
    Auto,
    AutoAll,
    Manual,
}

impl RouteType {
    pub fn as_i32(&self) -> i32 {
        match self {
            RouteType::Auto => 0,
            RouteType::AutoAll => 1,
            RouteType::Manual => 2,
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "auto" => Some(RouteType::Auto),
            "auto-all" => Some(RouteType::AutoAll),
            "manual" => Some(RouteType::Manual),
            _ => None,
        }
    }
}

/// Reply status shared by most RPC methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
pub enum Status {
    Ok,
    Error,
    ErrorNoStream,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::Error => "ERROR",
            Status::ErrorNoStream => "ERROR_NO_STREAM",
        }
    }
}

/// Reply body of `GetStreamInfo`.
#[derive(Debug, Clone, Serialize, Deserialize, Type)]
pub struct StreamInfo {
    pub priority: i32,
    pub route_type: i32,
    pub avail_in: Vec<String>,
    pub avail_out: Vec<String>,
    pub avail_fwks: Vec<String>,
}

/// Reply body of `GetStreamList`: parallel arrays of role and priority.
#[derive(Debug, Clone, Serialize, Deserialize, Type)]
pub struct StreamList {
    pub roles: Vec<String>,
    pub priorities: Vec<i32>,
}

/// Errors surfaced at the transport boundary, before a request ever reaches
/// the manager (malformed arguments that the manager's own `status` protocol
/// has no room for).
#[derive(Debug, Clone, thiserror::Error)]
pub enum IpcError {
    #[error("invalid direction: {0}")]
    InvalidDirection(String),
    #[error("invalid route type: {0}")]
    InvalidRouteType(String),
}

impl From<IpcError> for zbus::fdo::Error {
    fn from(e: IpcError) -> Self {
        zbus::fdo::Error::InvalidArgs(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_round_trips_through_its_wire_string() {
        assert_eq!(Direction::from_str("in"), Some(Direction::In));
        assert_eq!(Direction::from_str("out"), Some(Direction::Out));
        assert_eq!(Direction::from_str("sideways"), None);
        assert_eq!(Direction::In.as_str(), "in");
    }

    #[test]
    fn route_type_parses_case_sensitively() {
        assert_eq!(RouteType::from_str("auto"), Some(RouteType::Auto));
        assert_eq!(RouteType::from_str("auto-all"), Some(RouteType::AutoAll));
        assert_eq!(RouteType::from_str("manual"), Some(RouteType::Manual));
        assert_eq!(RouteType::from_str("Auto"), None);
    }

    #[test]
    fn status_strings_match_the_rpc_contract() {
        assert_eq!(Status::Ok.as_str(), "OK");
        assert_eq!(Status::Error.as_str(), "ERROR");
        assert_eq!(Status::ErrorNoStream.as_str(), "ERROR_NO_STREAM");
    }
}
