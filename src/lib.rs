// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `hame_bridge` - Field and command mapping for B2500 storage appliances.
//!
//! The appliances report their state as flat `key=value` telegrams and
//! accept settings as `cd=<code>,key=value` command payloads. This crate
//! maps both directions onto a typed [`DeviceState`](state::DeviceState):
//!
//! - **Decode path**: a [`Telegram`](telemetry::Telegram) is decoded through
//!   the device's field table and applied as one state patch.
//! - **Control path**: a control message is dispatched by command name,
//!   validated, turned into an outbound command and handed to a
//!   [`CommandSink`](protocol::CommandSink).
//! - **Time periods**: the five discharge windows are edited one setting at
//!   a time but always published as a complete schedule.
//!
//! # Supported Devices
//!
//! - B2500 V2 (device types `HMA`, `HMF`, `HMK`)
//!
//! # Quick Start
//!
//! ## Single Session
//!
//! ```
//! use std::sync::Arc;
//! use hame_bridge::command::OutboundCommand;
//! use hame_bridge::device::{DeviceSession, b2500_v2};
//! use hame_bridge::telemetry::Telegram;
//!
//! # fn main() -> hame_bridge::Result<()> {
//! let mut session = DeviceSession::new("0123456789ab", Arc::new(b2500_v2::definition()?));
//!
//! // The appliance reports two of its five time periods.
//! session.handle_telegram(&Telegram::parse(
//!     "d1=1,e1=08:00,f1=12:00,h1=200,d2=0,e2=18:00,f2=22:00,h2=400",
//! ));
//!
//! // Enabling period 2 publishes the whole schedule.
//! let sink = |cmd: OutboundCommand| println!("{}", cmd.payload());
//! session.handle_control("time-period/2/enabled", "true", &sink)?;
//! let periods = session.state().time_periods().unwrap();
//! assert_eq!(periods.get(1).unwrap().enabled, Some(true));
//! # Ok(())
//! # }
//! ```
//!
//! ## Many Devices over MQTT
//!
//! ```no_run
//! use std::sync::Arc;
//! use hame_bridge::manager::{BridgeConfig, DeviceManager};
//! use hame_bridge::protocol::{MqttCommandSink, run_event_loop, subscribe_device};
//! use rumqttc::{AsyncClient, MqttOptions};
//!
//! #[tokio::main]
//! async fn main() -> hame_bridge::Result<()> {
//!     let config = BridgeConfig::from_json_str(
//!         r#"{"devices": [{"deviceType": "HMA", "deviceId": "0123456789ab"}]}"#,
//!     )?;
//!     let (client, event_loop) = AsyncClient::new(MqttOptions::new("bridge", "broker", 1883), 64);
//!
//!     let manager = DeviceManager::new()?;
//!     for device in &config.devices {
//!         let sink = MqttCommandSink::new(client.clone(), &device.device_type, &device.device_id);
//!         manager.add_device(device, Arc::new(sink)).await?;
//!         subscribe_device(&client, &device.device_type, &device.device_id).await?;
//!     }
//!
//!     run_event_loop(event_loop, manager).await
//! }
//! ```

pub mod command;
pub mod device;
pub mod error;
pub mod manager;
pub mod protocol;
pub mod registry;
pub mod state;
pub mod telemetry;
pub mod types;

pub use command::{CommandBuilder, CommandEncoding, CommandType, OutboundCommand};
pub use device::{DeviceDefinition, DeviceRegistry, DeviceSession};
pub use error::{CommandError, Error, RegistryError, Result, StateError, ValueError};
pub use manager::{BridgeConfig, DeviceConfig, DeviceHandle, DeviceManager};
pub use protocol::CommandSink;
pub use state::{DeviceState, StateChange, SubscriptionId};
pub use telemetry::Telegram;
