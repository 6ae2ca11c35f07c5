// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! D-Bus interface implementation: the Control Interface's RPC surface
//! (§6) as `org.streammgr.StreamManager`.

use std::sync::{Arc, Mutex};

use streammgr_ipc::{Direction, IpcError, Status, StreamInfo, StreamList};
use tracing::debug;
use zbus::interface;

use crate::manager::StreamManager;

fn parse_direction(s: &str) -> Result<Direction, zbus::fdo::Error> {
    Direction::from_str(s).ok_or_else(|| IpcError::InvalidDirection(s.to_string()).into())
}

fn lock_err(e: impl std::fmt::Display) -> zbus::fdo::Error {
    zbus::fdo::Error::Failed(e.to_string())
}

pub struct StreamMgrDbusService {
    manager: Arc<Mutex<StreamManager>>,
}

impl StreamMgrDbusService {
    pub fn new(manager: Arc<Mutex<StreamManager>>) -> Self {
        Self { manager }
    }
}

#[interface(name = "org.streammgr.StreamManager")]
impl StreamMgrDbusService {
    // ==================== Stream Map (C1) ====================

    async fn get_stream_info(&self, role: &str) -> zbus::fdo::Result<StreamInfo> {
        debug!(role, "D-Bus: GetStreamInfo");
        let manager = self.manager.lock().map_err(lock_err)?;
        manager.get_stream_info(role).map_err(lock_err)
    }

    async fn get_stream_list(&self) -> zbus::fdo::Result<StreamList> {
        let manager = self.manager.lock().map_err(lock_err)?;
        Ok(manager.get_stream_list())
    }

    // ==================== Parent registration ====================
    //
    // The source derives Parent identity from the bus client that connects
    // under the reserved application name. Deriving and verifying peer
    // identity from the live D-Bus connection is transport plumbing this
    // daemon does not implement (see Non-goals); callers register and
    // release their own parent id explicitly instead.

    async fn register_parent(&self, client_id: u32, app_name: &str) -> zbus::fdo::Result<()> {
        debug!(client_id, app_name, "D-Bus: RegisterParent");
        let mut manager = self.manager.lock().map_err(lock_err)?;
        manager.on_client_connect(client_id, app_name);
        Ok(())
    }

    async fn unregister_parent(&self, client_id: u32) -> zbus::fdo::Result<()> {
        debug!(client_id, "D-Bus: UnregisterParent");
        let mut manager = self.manager.lock().map_err(lock_err)?;
        manager.on_client_disconnect(client_id);
        Ok(())
    }

    // ==================== Parent Registry / Routing (C3, C5) ====================

    async fn set_stream_route_devices(
        &self,
        parent_id: u32,
        in_devices: Vec<u32>,
        out_devices: Vec<u32>,
    ) -> zbus::fdo::Result<String> {
        debug!(parent_id, ?in_devices, ?out_devices, "D-Bus: SetStreamRouteDevices");
        let mut manager = self.manager.lock().map_err(lock_err)?;
        let status = match manager.set_stream_route_devices(parent_id, in_devices, out_devices) {
            Ok(()) => Status::Ok,
            Err(e) => e.status(),
        };
        Ok(status.as_str().to_string())
    }

    async fn set_stream_route_option(
        &self,
        parent_id: u32,
        name: &str,
        value: i32,
    ) -> zbus::fdo::Result<String> {
        debug!(parent_id, name, value, "D-Bus: SetStreamRouteOption");
        let mut manager = self.manager.lock().map_err(lock_err)?;
        let status = match manager.set_stream_route_option(parent_id, name, value) {
            Ok(()) => Status::Ok,
            Err(e) => e.status(),
        };
        Ok(status.as_str().to_string())
    }

    // ==================== Volume (C2, C6) ====================

    async fn set_volume_level(
        &self,
        #[zbus(signal_context)] ctx: zbus::SignalContext<'_>,
        direction: &str,
        volume_type: &str,
        level: u32,
    ) -> zbus::fdo::Result<String> {
        let direction = parse_direction(direction)?;
        debug!(?direction, volume_type, level, "D-Bus: SetVolumeLevel");
        let status = {
            let mut manager = self.manager.lock().map_err(lock_err)?;
            match manager.set_volume_level(direction, volume_type, level) {
                Ok(()) => Status::Ok,
                Err(e) => e.status(),
            }
        };
        if status == Status::Ok {
            let _ = Self::volume_changed(&ctx, direction.as_str(), volume_type, level).await;
        }
        Ok(status.as_str().to_string())
    }

    async fn get_volume_level(&self, direction: &str, volume_type: &str) -> zbus::fdo::Result<(u32, String)> {
        let direction = parse_direction(direction)?;
        let manager = self.manager.lock().map_err(lock_err)?;
        match manager.get_volume_level(direction, volume_type) {
            Ok(level) => Ok((level, Status::Ok.as_str().to_string())),
            Err(e) => Ok((0, e.status().as_str().to_string())),
        }
    }

    async fn get_volume_max_level(&self, direction: &str, volume_type: &str) -> zbus::fdo::Result<(u32, String)> {
        let direction = parse_direction(direction)?;
        let manager = self.manager.lock().map_err(lock_err)?;
        match manager.get_volume_max_level(direction, volume_type) {
            Ok(max) => Ok((max, Status::Ok.as_str().to_string())),
            Err(e) => Ok((0, e.status().as_str().to_string())),
        }
    }

    async fn set_volume_mute(&self, direction: &str, volume_type: &str, on: u32) -> zbus::fdo::Result<String> {
        let direction = parse_direction(direction)?;
        let mute = on != 0;
        debug!(?direction, volume_type, mute, "D-Bus: SetVolumeMute");
        let mut manager = self.manager.lock().map_err(lock_err)?;
        let status = match manager.set_volume_mute(direction, volume_type, mute) {
            Ok(()) => Status::Ok,
            Err(e) => e.status(),
        };
        Ok(status.as_str().to_string())
    }

    async fn get_volume_mute(&self, direction: &str, volume_type: &str) -> zbus::fdo::Result<(u32, String)> {
        let direction = parse_direction(direction)?;
        let manager = self.manager.lock().map_err(lock_err)?;
        match manager.get_volume_mute(direction, volume_type) {
            Ok(muted) => Ok((muted as u32, Status::Ok.as_str().to_string())),
            Err(e) => Ok((0, e.status().as_str().to_string())),
        }
    }

    async fn get_current_volume_type(&self, direction: &str) -> zbus::fdo::Result<(String, String)> {
        let direction = parse_direction(direction)?;
        let manager = self.manager.lock().map_err(lock_err)?;
        match manager.get_current_volume_type(direction) {
            Ok(volume_type) => Ok((volume_type, Status::Ok.as_str().to_string())),
            Err(e) => Ok((String::new(), e.status().as_str().to_string())),
        }
    }

    // ==================== Signals ====================

    /// Emitted whenever `SetVolumeLevel` successfully changes a type's
    /// current level.
    #[zbus(signal)]
    async fn volume_changed(
        ctx: &zbus::SignalContext<'_>,
        direction: &str,
        volume_type: &str,
        level: u32,
    ) -> zbus::Result<()>;
}
