// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Stream Map (C1): the immutable role → policy lookup loaded once at init.

use std::collections::{HashMap, HashSet};

use serde::Deserialize;
use streammgr_ipc::RouteType;

use super::error::ManagerError;

/// One role's policy, as configured in the stream map document.
#[derive(Debug, Clone)]
pub struct StreamSpec {
    pub priority: i32,
    pub route_type: RouteType,
    pub volume_type_in: Option<String>,
    pub volume_type_out: Option<String>,
    pub is_hal_volume_in: bool,
    pub is_hal_volume_out: bool,
    pub avail_in_devices: HashSet<String>,
    pub avail_out_devices: HashSet<String>,
    pub avail_frameworks: HashSet<String>,
}

/// Raw JSON shape of one `streams[]` entry.
#[derive(Debug, Deserialize)]
struct RawVolumeTypes {
    #[serde(rename = "in")]
    in_: String,
    #[serde(rename = "out")]
    out: String,
}

#[derive(Debug, Deserialize)]
struct RawIsHalVolume {
    #[serde(rename = "in")]
    in_: bool,
    #[serde(rename = "out")]
    out: bool,
}

#[derive(Debug, Deserialize)]
struct RawStreamEntry {
    role: String,
    priority: i32,
    #[serde(rename = "route-type")]
    route_type: String,
    #[serde(rename = "volume-types")]
    volume_types: RawVolumeTypes,
    #[serde(rename = "is-hal-volume")]
    is_hal_volume: RawIsHalVolume,
    #[serde(rename = "avail-in-devices")]
    avail_in_devices: Vec<String>,
    #[serde(rename = "avail-out-devices")]
    avail_out_devices: Vec<String>,
    #[serde(rename = "avail-frameworks")]
    avail_frameworks: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawStreamMap {
    streams: Vec<RawStreamEntry>,
}

/// Default role assigned to streams whose declared role is absent from the
/// map.
pub const DEFAULT_ROLE: &str = "media";

/// Immutable role → `StreamSpec` lookup.
#[derive(Debug, Clone)]
pub struct StreamMap {
    specs: HashMap<String, StreamSpec>,
}

impl StreamMap {
    /// Parses the stream map document. Any missing required key, or an
    /// unrecognized route-type string, aborts initialization.
    pub fn load(json: &str) -> Result<Self, ManagerError> {
        let raw: RawStreamMap = serde_json::from_str(json)
            .map_err(|e| ManagerError::ConfigInvalid(e.to_string()))?;

        let mut specs = HashMap::with_capacity(raw.streams.len());
        for entry in raw.streams {
            let route_type = RouteType::from_str(&entry.route_type).ok_or_else(|| {
                ManagerError::ConfigInvalid(format!(
                    "role {}: unrecognized route-type {:?}",
                    entry.role, entry.route_type
                ))
            })?;

            let spec = StreamSpec {
                priority: entry.priority,
                route_type,
                volume_type_in: none_if_sentinel(&entry.volume_types.in_),
                volume_type_out: none_if_sentinel(&entry.volume_types.out),
                is_hal_volume_in: entry.is_hal_volume.in_,
                is_hal_volume_out: entry.is_hal_volume.out,
                avail_in_devices: entry.avail_in_devices.into_iter().collect(),
                avail_out_devices: entry.avail_out_devices.into_iter().collect(),
                avail_frameworks: entry.avail_frameworks.into_iter().collect(),
            };
            specs.insert(entry.role, spec);
        }

        Ok(Self { specs })
    }

    /// Looks up a role's spec, falling back to [`DEFAULT_ROLE`] if `role`
    /// itself is not configured. Returns `None` if even the default role is
    /// missing from the map (a misconfigured document).
    pub fn resolve<'a>(&'a self, role: &str) -> Option<(&'a str, &'a StreamSpec)> {
        if let Some(spec) = self.specs.get(role) {
            return Some((role, spec));
        }
        self.specs.get(DEFAULT_ROLE).map(|spec| (DEFAULT_ROLE, spec))
    }

    pub fn get(&self, role: &str) -> Option<&StreamSpec> {
        self.specs.get(role)
    }

    pub fn roles_and_priorities(&self) -> (Vec<String>, Vec<i32>) {
        let mut roles: Vec<String> = self.specs.keys().cloned().collect();
        roles.sort();
        let priorities = roles.iter().map(|r| self.specs[r].priority).collect();
        (roles, priorities)
    }
}

fn none_if_sentinel(value: &str) -> Option<String> {
    if value == "none" {
        None
    } else {
        Some(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json() -> &'static str {
        r#"{
            "streams": [
                {
                    "role": "media",
                    "priority": 100,
                    "route-type": "auto",
                    "volume-types": { "in": "none", "out": "media" },
                    "is-hal-volume": { "in": false, "out": false },
                    "avail-in-devices": [],
                    "avail-out-devices": ["speaker", "bt"],
                    "avail-frameworks": ["pulseaudio"]
                },
                {
                    "role": "phone",
                    "priority": 300,
                    "route-type": "manual",
                    "volume-types": { "in": "call", "out": "call" },
                    "is-hal-volume": { "in": true, "out": true },
                    "avail-in-devices": ["mic"],
                    "avail-out-devices": ["earpiece"],
                    "avail-frameworks": []
                }
            ]
        }"#
    }

    #[test]
    fn loads_valid_document() {
        let map = StreamMap::load(sample_json()).unwrap();
        let spec = map.get("media").unwrap();
        assert_eq!(spec.priority, 100);
        assert_eq!(spec.route_type, RouteType::Auto);
        assert_eq!(spec.volume_type_in, None);
        assert_eq!(spec.volume_type_out.as_deref(), Some("media"));
    }

    #[test]
    fn unresolved_role_falls_back_to_default() {
        let map = StreamMap::load(sample_json()).unwrap();
        let (resolved_role, spec) = map.resolve("unknown-role").unwrap();
        assert_eq!(resolved_role, DEFAULT_ROLE);
        assert_eq!(spec.priority, 100);
    }

    #[test]
    fn rejects_unrecognized_route_type() {
        let bad = r#"{"streams": [{
            "role": "x", "priority": 1, "route-type": "Auto",
            "volume-types": {"in": "none", "out": "none"},
            "is-hal-volume": {"in": false, "out": false},
            "avail-in-devices": [], "avail-out-devices": [], "avail-frameworks": []
        }]}"#;
        assert!(StreamMap::load(bad).is_err());
    }

    #[test]
    fn rejects_missing_required_key() {
        let bad = r#"{"streams": [{"role": "x", "priority": 1}]}"#;
        assert!(StreamMap::load(bad).is_err());
    }
}
