// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Running devices concurrently.
//!
//! Every appliance gets its own tokio task owning its [`DeviceSession`].
//! Messages for one appliance are handled strictly in arrival order while
//! different appliances proceed independently.
//!
//! # Overview
//!
//! - [`spawn_device`] starts a task for one session and returns its
//!   [`DeviceHandle`].
//! - [`DeviceManager`] keeps the handles by device id and routes inbound
//!   MQTT topics to them.
//! - [`DeviceConfig`] and [`BridgeConfig`] describe which appliances to run.
//!
//! # Examples
//!
//! ## Watching Device State
//!
//! ```
//! use std::sync::Arc;
//! use hame_bridge::command::OutboundCommand;
//! use hame_bridge::manager::{BridgeConfig, DeviceManager};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> hame_bridge::Result<()> {
//! let config = BridgeConfig::from_json_str(
//!     r#"{"devices": [{"deviceType": "HMK", "deviceId": "0123456789ab"}]}"#,
//! )?;
//!
//! let manager = DeviceManager::new()?;
//! for device in &config.devices {
//!     let sink = Arc::new(|cmd: OutboundCommand| println!("{}", cmd.payload()));
//!     manager.add_device(device, sink).await?;
//! }
//!
//! let mut state_rx = manager.watch_device("0123456789ab").await.unwrap();
//! manager
//!     .route("hame_energy/HMK/device/0123456789ab/ctrl", "c0=1")
//!     .await?;
//! assert!(state_rx.has_changed().unwrap());
//! # Ok(())
//! # }
//! ```
//!
//! [`DeviceSession`]: crate::device::DeviceSession

mod device_config;
mod device_manager;
mod managed_device;

pub use device_config::{BridgeConfig, DeviceConfig};
pub use device_manager::DeviceManager;
pub use managed_device::{DeviceHandle, spawn_device};
