// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device manager for coordinating multiple appliances.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, watch};

use crate::device::{DeviceRegistry, DeviceSession};
use crate::error::{Error, Result};
use crate::protocol::{CommandSink, Topic};
use crate::state::DeviceState;
use crate::telemetry::Telegram;

use super::device_config::DeviceConfig;
use super::managed_device::{DeviceHandle, spawn_device};

/// Manager for coordinating multiple appliances.
///
/// Each added device runs in its own task (see [`spawn_device`]); the
/// manager routes inbound topics to the owning task by device id.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use hame_bridge::command::OutboundCommand;
/// use hame_bridge::manager::{DeviceConfig, DeviceManager};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> hame_bridge::Result<()> {
/// let manager = DeviceManager::new()?;
/// let sink = Arc::new(|cmd: OutboundCommand| println!("{}", cmd.payload()));
/// manager.add_device(&DeviceConfig::new("HMA", "0123456789ab"), sink).await?;
///
/// manager
///     .route("hame_energy/HMA/device/0123456789ab/ctrl", "pe=80,kn=2240")
///     .await?;
/// let state = manager.get_state("0123456789ab").await.unwrap();
/// assert_eq!(state.battery_percentage(), Some(80));
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct DeviceManager {
    registry: DeviceRegistry,
    devices: Arc<RwLock<HashMap<String, DeviceHandle>>>,
}

impl DeviceManager {
    /// Creates a manager with the built-in device definitions.
    ///
    /// # Errors
    ///
    /// Returns `Error::Registry` if a built-in definition is inconsistent.
    pub fn new() -> Result<Self> {
        Ok(Self::with_registry(DeviceRegistry::builtin()?))
    }

    /// Creates a manager with a custom set of device definitions.
    #[must_use]
    pub fn with_registry(registry: DeviceRegistry) -> Self {
        Self {
            registry,
            devices: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Returns the device definitions.
    #[must_use]
    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    // =========================================================================
    // Device Management
    // =========================================================================

    /// Starts a task for a configured device.
    ///
    /// # Errors
    ///
    /// Returns `Error::Registry` if the device type is unknown and
    /// `Error::DuplicateDevice` if the id is already managed.
    pub async fn add_device(
        &self,
        config: &DeviceConfig,
        sink: Arc<dyn CommandSink>,
    ) -> Result<()> {
        let mut devices = self.devices.write().await;
        if devices.contains_key(&config.device_id) {
            return Err(Error::DuplicateDevice(config.device_id.clone()));
        }

        let session = DeviceSession::from_config(config, &self.registry)?;
        devices.insert(config.device_id.clone(), spawn_device(session, sink));

        tracing::info!(
            device_id = %config.device_id,
            name = %config.display_name(),
            "Added device"
        );
        Ok(())
    }

    /// Stops and removes a device.
    ///
    /// Returns `true` if the device was found and removed, `false` otherwise.
    pub async fn remove_device(&self, device_id: &str) -> bool {
        let removed = self.devices.write().await.remove(device_id);
        match removed {
            Some(handle) => {
                handle.shutdown().await;
                tracing::info!(device_id = %device_id, "Removed device");
                true
            }
            None => false,
        }
    }

    /// Stops every device.
    pub async fn shutdown(&self) {
        let handles: Vec<_> = self.devices.write().await.drain().map(|(_, h)| h).collect();
        for handle in handles {
            handle.shutdown().await;
        }
    }

    /// Returns a list of all device ids.
    pub async fn device_ids(&self) -> Vec<String> {
        self.devices.read().await.keys().cloned().collect()
    }

    /// Returns the number of managed devices.
    pub async fn device_count(&self) -> usize {
        self.devices.read().await.len()
    }

    // =========================================================================
    // State
    // =========================================================================

    /// Returns the current state of a device.
    pub async fn get_state(&self, device_id: &str) -> Option<DeviceState> {
        self.devices
            .read()
            .await
            .get(device_id)
            .map(|d| d.state().borrow().clone())
    }

    /// Creates a watch receiver for a device's state.
    ///
    /// The receiver will be notified whenever the device state changes.
    pub async fn watch_device(&self, device_id: &str) -> Option<watch::Receiver<DeviceState>> {
        self.devices.read().await.get(device_id).map(DeviceHandle::state)
    }

    // =========================================================================
    // Inbound Messages
    // =========================================================================

    /// Routes an inbound MQTT message to its device.
    ///
    /// Returns `false` for topics the bridge does not consume and for
    /// devices it does not manage.
    ///
    /// # Errors
    ///
    /// Returns `Error::Command` if a control message was rejected and
    /// `Error::ChannelClosed` if the device task has stopped.
    pub async fn route(&self, topic: &str, payload: &str) -> Result<bool> {
        let Some(parsed) = Topic::parse(topic) else {
            tracing::trace!(topic = %topic, "Ignoring foreign topic");
            return Ok(false);
        };

        let devices = self.devices.read().await;
        let Some(device) = devices.get(parsed.device_id()) else {
            tracing::debug!(topic = %topic, "Ignoring message for unmanaged device");
            return Ok(false);
        };

        match parsed {
            Topic::Telegram { .. } => {
                device.send_telegram(Telegram::parse(payload)).await?;
            }
            Topic::Control { command, .. } => {
                device.send_control(command, payload).await?;
            }
        }
        Ok(true)
    }

    /// Asks every managed appliance for a full telegram.
    ///
    /// # Errors
    ///
    /// Returns `Error::ChannelClosed` if a device task has stopped.
    pub async fn refresh_all(&self) -> Result<()> {
        for device in self.devices.read().await.values() {
            device.refresh().await?;
        }
        Ok(())
    }
}

impl Clone for DeviceManager {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
            devices: Arc::clone(&self.devices),
        }
    }
}
