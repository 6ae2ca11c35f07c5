// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Manager-level error kinds and their mapping onto the RPC `status` strings.

use streammgr_ipc::Status;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("stream map config invalid: {0}")]
    ConfigInvalid(String),
    #[error("unknown role: {0}")]
    UnknownRole(String),
    #[error("unknown volume type: {0}")]
    UnknownVolumeType(String),
    #[error("volume level {level} out of range for type {volume_type} (max {max})")]
    LevelOutOfRange {
        volume_type: String,
        level: u32,
        max: u32,
    },
    #[error("no parent registered with id {0}")]
    ParentNotFound(u32),
    #[error("no active stream for this request")]
    NoActiveStream,
    #[error("HAL error: {0}")]
    HalError(String),
}

impl ManagerError {
    /// Maps this error onto the RPC surface's `status` string contract.
    /// `NoActiveStream` gets its own distinguished status; everything
    /// else collapses to the generic `ERROR`.
    pub fn status(&self) -> Status {
        match self {
            ManagerError::NoActiveStream => Status::ErrorNoStream,
            _ => Status::Error,
        }
    }
}
