// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Stream Manager Daemon - userspace audio stream routing and volume
//! policy.
//!
//! This daemon tracks sink-inputs and source-outputs, applies the
//! configured stream map's priority and routing policy, and exposes a
//! D-Bus control interface for volume and manual-route requests.

mod config;
mod dbus;
mod manager;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use streammgr_ipc::{DBUS_NAME, DBUS_PATH};
use tracing::{error, info};
use zbus::connection::Builder;

use config::ConfigManager;
use dbus::StreamMgrDbusService;
use manager::{LoggingCommunicator, NullHal, StreamManager};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("streammgr_daemon=debug".parse().unwrap())
                .add_directive("zbus=warn".parse().unwrap()),
        )
        .init();

    info!("Stream Manager Daemon starting...");

    let config_manager = ConfigManager::new()?;
    let stream_map = config_manager.load_stream_map()?;
    let volume_store = config_manager.load_volume_store(&stream_map)?;
    let initial_levels = config_manager.load_initial_levels()?;

    let (roles, _) = stream_map.roles_and_priorities();
    info!(roles = roles.len(), "Loaded stream map");

    let manager = StreamManager::new(
        stream_map,
        volume_store,
        &initial_levels,
        Box::new(NullHal),
        Box::new(LoggingCommunicator),
    );
    let manager = Arc::new(Mutex::new(manager));

    let dbus_service = StreamMgrDbusService::new(manager.clone());

    let connection = Builder::session()?
        .name(DBUS_NAME)?
        .serve_at(DBUS_PATH, dbus_service)?
        .build()
        .await?;

    info!("D-Bus service registered at {}", DBUS_NAME);
    info!("Stream Manager Daemon ready");

    let shutdown_flag = Arc::new(AtomicBool::new(false));

    // No PCM event source is wired in this daemon (the HAL/PCM backend is
    // out of scope); this task exists so a future event source has a
    // natural place to feed `StreamManager::on_stream_*` calls without
    // reshaping the shutdown sequence below.
    let shutdown_flag_idle = shutdown_flag.clone();
    let idle_task = tokio::spawn(async move {
        while !shutdown_flag_idle.load(Ordering::Relaxed) {
            tokio::time::sleep(tokio::time::Duration::from_millis(200)).await;
        }
    });

    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
    let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())?;

    tokio::select! {
        _ = sigterm.recv() => {
            info!("Received SIGTERM, shutting down...");
        }
        _ = sigint.recv() => {
            info!("Received SIGINT, shutting down...");
        }
    }

    shutdown_flag.store(true, Ordering::Relaxed);
    let _ = tokio::time::timeout(tokio::time::Duration::from_secs(2), idle_task).await;
    drop(connection);

    if let Err(e) = save_initial_levels(&config_manager, &manager) {
        error!("Failed to save initial volume levels on shutdown: {}", e);
    }

    info!("Stream Manager Daemon stopped");
    Ok(())
}

fn save_initial_levels(
    config_manager: &ConfigManager,
    manager: &Arc<Mutex<StreamManager>>,
) -> Result<(), config::ConfigError> {
    let manager = manager.lock().map_err(|_| config::ConfigError::Poisoned)?;
    let levels = config::JsonInitialLevels::from(manager.current_levels_by_type());
    config_manager.save_initial_levels(&levels)
}
