// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Parent Registry (C3): external control-client ownership of streams and
//! their manually configured device lists.

use std::collections::{HashMap, HashSet};

use super::error::ManagerError;
use super::stream::StreamId;

/// Reserved client application name that causes a `Parent` to be created
/// on connect.
pub const PARENT_CLIENT_NAME: &str = "SOUND_MANAGER_STREAM_INFO";

#[derive(Debug, Clone, Default)]
pub struct Parent {
    pub id: u32,
    pub sink_inputs: HashSet<StreamId>,
    pub source_outputs: HashSet<StreamId>,
    pub route_in_devices: Vec<u32>,
    pub route_out_devices: Vec<u32>,
}

impl Parent {
    fn new(id: u32) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }
}

#[derive(Debug, Default)]
pub struct ParentRegistry {
    parents: HashMap<u32, Parent>,
    /// Reverse index used to enforce single ownership (§9): a stream id
    /// names at most one parent at a time.
    owner_of: HashMap<StreamId, u32>,
}

impl ParentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a `Parent` on client-connect, iff `app_name` is the reserved
    /// identifier. No-op otherwise.
    pub fn on_client_connect(&mut self, client_id: u32, app_name: &str) {
        if app_name == PARENT_CLIENT_NAME {
            self.parents.insert(client_id, Parent::new(client_id));
        }
    }

    /// Removes the Parent on client-disconnect. Per the invariant in §4.3,
    /// stream references into it are *not* scrubbed; streams that named
    /// this parent simply become un-routable via Manual policy.
    pub fn on_client_disconnect(&mut self, client_id: u32) {
        if let Some(parent) = self.parents.remove(&client_id) {
            for id in parent.sink_inputs.iter().chain(parent.source_outputs.iter()) {
                self.owner_of.remove(id);
            }
        }
    }

    pub fn get(&self, id: u32) -> Option<&Parent> {
        self.parents.get(&id)
    }

    /// Registers a sink-input under `parent_id`, first removing it from
    /// whichever parent (if any) previously claimed it, so a stream id
    /// belongs to at most one parent (§9 Open Question, resolved).
    pub fn add_sink_input(&mut self, parent_id: u32, stream_id: StreamId) -> Result<(), ManagerError> {
        self.reassign(stream_id, parent_id)?;
        self.parents
            .get_mut(&parent_id)
            .unwrap()
            .sink_inputs
            .insert(stream_id);
        Ok(())
    }

    pub fn add_source_output(
        &mut self,
        parent_id: u32,
        stream_id: StreamId,
    ) -> Result<(), ManagerError> {
        self.reassign(stream_id, parent_id)?;
        self.parents
            .get_mut(&parent_id)
            .unwrap()
            .source_outputs
            .insert(stream_id);
        Ok(())
    }

    fn reassign(&mut self, stream_id: StreamId, new_parent_id: u32) -> Result<(), ManagerError> {
        if !self.parents.contains_key(&new_parent_id) {
            return Err(ManagerError::ParentNotFound(new_parent_id));
        }
        if let Some(&old_parent_id) = self.owner_of.get(&stream_id) {
            if old_parent_id != new_parent_id {
                if let Some(old) = self.parents.get_mut(&old_parent_id) {
                    old.sink_inputs.remove(&stream_id);
                    old.source_outputs.remove(&stream_id);
                }
            }
        }
        self.owner_of.insert(stream_id, new_parent_id);
        Ok(())
    }

    pub fn which_parent_owns(&self, stream_id: StreamId) -> Option<u32> {
        self.owner_of.get(&stream_id).copied()
    }

    pub fn set_route_devices(
        &mut self,
        parent_id: u32,
        in_devices: Option<Vec<u32>>,
        out_devices: Option<Vec<u32>>,
    ) -> Result<(), ManagerError> {
        let parent = self
            .parents
            .get_mut(&parent_id)
            .ok_or(ManagerError::ParentNotFound(parent_id))?;
        if let Some(devices) = in_devices {
            parent.route_in_devices = devices;
        }
        if let Some(devices) = out_devices {
            parent.route_out_devices = devices;
        }
        Ok(())
    }

    pub fn owns_sink_input(&self, parent_id: u32, stream_id: StreamId) -> bool {
        self.parents
            .get(&parent_id)
            .map(|p| p.sink_inputs.contains(&stream_id))
            .unwrap_or(false)
    }

    pub fn owns_source_output(&self, parent_id: u32, stream_id: StreamId) -> bool {
        self.parents
            .get(&parent_id)
            .map(|p| p.source_outputs.contains(&stream_id))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parent_created_only_for_reserved_client_name() {
        let mut reg = ParentRegistry::new();
        reg.on_client_connect(1, "some-other-app");
        assert!(reg.get(1).is_none());
        reg.on_client_connect(2, PARENT_CLIENT_NAME);
        assert!(reg.get(2).is_some());
    }

    #[test]
    fn removing_a_parent_does_not_remove_its_streams_invariant_4() {
        let mut reg = ParentRegistry::new();
        reg.on_client_connect(1, PARENT_CLIENT_NAME);
        reg.add_sink_input(1, 42).unwrap();
        assert!(reg.owns_sink_input(1, 42));

        reg.on_client_disconnect(1);

        // The parent is gone, but no panic/dangling state: the stream id
        // simply has no owner any more.
        assert!(reg.get(1).is_none());
        assert_eq!(reg.which_parent_owns(42), None);
    }

    #[test]
    fn a_stream_has_at_most_one_owning_parent() {
        let mut reg = ParentRegistry::new();
        reg.on_client_connect(1, PARENT_CLIENT_NAME);
        reg.on_client_connect(2, PARENT_CLIENT_NAME);
        reg.add_sink_input(1, 7).unwrap();
        assert!(reg.owns_sink_input(1, 7));

        reg.add_sink_input(2, 7).unwrap();
        assert!(!reg.owns_sink_input(1, 7));
        assert!(reg.owns_sink_input(2, 7));
        assert_eq!(reg.which_parent_owns(7), Some(2));
    }

    #[test]
    fn set_route_devices_requires_existing_parent() {
        let mut reg = ParentRegistry::new();
        assert!(reg.set_route_devices(99, Some(vec![1]), None).is_err());
    }
}
