// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device configuration types for the device manager.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Configuration for one bridged appliance.
///
/// # Examples
///
/// ```
/// use hame_bridge::manager::DeviceConfig;
///
/// let config = DeviceConfig::new("HMA", "0123456789ab")
///     .with_use_flash_commands(true)
///     .with_friendly_name("Garage Battery");
///
/// assert_eq!(config.device_type, "HMA");
/// assert_eq!(config.use_flash_commands, Some(true));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceConfig {
    /// The device type code (e.g., `HMA`).
    pub device_type: String,
    /// The appliance id as it appears in its topics.
    pub device_id: String,
    /// Initial command encoding flag; the definition's default when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_flash_commands: Option<bool>,
    /// Optional friendly name for the device.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub friendly_name: Option<String>,
}

impl DeviceConfig {
    /// Creates a configuration with defaults for everything optional.
    #[must_use]
    pub fn new(device_type: impl Into<String>, device_id: impl Into<String>) -> Self {
        Self {
            device_type: device_type.into(),
            device_id: device_id.into(),
            use_flash_commands: None,
            friendly_name: None,
        }
    }

    /// Overrides the initial command encoding flag.
    #[must_use]
    pub fn with_use_flash_commands(mut self, enabled: bool) -> Self {
        self.use_flash_commands = Some(enabled);
        self
    }

    /// Sets a friendly name for the device.
    #[must_use]
    pub fn with_friendly_name(mut self, name: impl Into<String>) -> Self {
        self.friendly_name = Some(name.into());
        self
    }

    /// Returns the friendly name, falling back to the device id.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.friendly_name.as_deref().unwrap_or(&self.device_id)
    }
}

/// The set of appliances one bridge instance serves.
///
/// # Examples
///
/// ```
/// use hame_bridge::manager::BridgeConfig;
///
/// let config = BridgeConfig::from_json_str(
///     r#"{"devices": [{"deviceType": "HMA", "deviceId": "0123456789ab"}]}"#,
/// )
/// .unwrap();
/// assert_eq!(config.devices.len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Configured devices.
    #[serde(default)]
    pub devices: Vec<DeviceConfig>,
}

impl BridgeConfig {
    /// Parses a JSON configuration document.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the document is not valid JSON or does not
    /// match the expected shape.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        tracing::debug!(devices = config.devices.len(), "Loaded bridge configuration");
        Ok(config)
    }

    /// Adds a device.
    #[must_use]
    pub fn with_device(mut self, device: DeviceConfig) -> Self {
        self.devices.push(device);
        self
    }
}
