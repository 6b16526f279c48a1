// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Transport seam and MQTT topic layout.
//!
//! The bridge hands every built command to a [`CommandSink`] and never waits
//! for it; delivery, retries and backpressure belong to the sink.
//!
//! # Topics
//!
//! | Direction | Topic |
//! |-----------|-------|
//! | appliance to bridge | `hame_energy/<type>/device/<id>/ctrl` |
//! | bridge to appliance | `hame_energy/<type>/App/<id>/ctrl` |
//! | automation to bridge | `hame_energy/<type>/control/<id>/<command>` |
//!
//! Command names may contain slashes (`time-period/3/start-time`); everything
//! after the device id is the command name.

#[cfg(feature = "mqtt")]
mod mqtt;

#[cfg(feature = "mqtt")]
pub use mqtt::{MqttCommandSink, run_event_loop, subscribe_device};

use crate::command::OutboundCommand;

/// Root of every topic.
pub const TOPIC_PREFIX: &str = "hame_energy";

/// Fire-and-forget outbound command transport.
///
/// Implemented for any `Fn(OutboundCommand)` closure, which is what tests
/// and simple embeddings use.
pub trait CommandSink: Send + Sync {
    /// Hands a command to the transport.
    fn publish(&self, command: OutboundCommand);
}

impl<F> CommandSink for F
where
    F: Fn(OutboundCommand) + Send + Sync,
{
    fn publish(&self, command: OutboundCommand) {
        self(command);
    }
}

/// Returns the topic the appliance listens on for commands.
#[must_use]
pub fn command_topic(device_type: &str, device_id: &str) -> String {
    format!("{TOPIC_PREFIX}/{device_type}/App/{device_id}/ctrl")
}

/// Returns the topic the appliance reports telegrams on.
#[must_use]
pub fn telegram_topic(device_type: &str, device_id: &str) -> String {
    format!("{TOPIC_PREFIX}/{device_type}/device/{device_id}/ctrl")
}

/// Returns the topic prefix control messages for one command arrive on.
#[must_use]
pub fn control_topic(device_type: &str, device_id: &str, command: &str) -> String {
    format!("{TOPIC_PREFIX}/{device_type}/control/{device_id}/{command}")
}

/// An inbound topic, split into its parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topic<'a> {
    /// A telegram from the appliance.
    Telegram {
        /// Device type code.
        device_type: &'a str,
        /// Device id.
        device_id: &'a str,
    },
    /// A control message from the automation layer.
    Control {
        /// Device type code.
        device_type: &'a str,
        /// Device id.
        device_id: &'a str,
        /// Command name.
        command: &'a str,
    },
}

impl<'a> Topic<'a> {
    /// Parses an inbound topic.
    ///
    /// Returns `None` for topics the bridge does not consume, including the
    /// bridge's own command topic.
    ///
    /// # Examples
    ///
    /// ```
    /// use hame_bridge::protocol::Topic;
    ///
    /// assert_eq!(
    ///     Topic::parse("hame_energy/HMA/control/0123/time-period/3/enabled"),
    ///     Some(Topic::Control {
    ///         device_type: "HMA",
    ///         device_id: "0123",
    ///         command: "time-period/3/enabled",
    ///     })
    /// );
    /// assert!(Topic::parse("hame_energy/HMA/App/0123/ctrl").is_none());
    /// ```
    #[must_use]
    pub fn parse(topic: &'a str) -> Option<Self> {
        let rest = topic.strip_prefix(TOPIC_PREFIX)?.strip_prefix('/')?;
        let mut parts = rest.splitn(4, '/');
        let device_type = parts.next().filter(|s| !s.is_empty())?;
        let kind = parts.next()?;
        let device_id = parts.next().filter(|s| !s.is_empty())?;
        let tail = parts.next()?;

        match kind {
            "device" if tail == "ctrl" => Some(Self::Telegram {
                device_type,
                device_id,
            }),
            "control" if !tail.is_empty() => Some(Self::Control {
                device_type,
                device_id,
                command: tail,
            }),
            _ => None,
        }
    }

    /// Returns the device id.
    #[must_use]
    pub fn device_id(&self) -> &'a str {
        match self {
            Self::Telegram { device_id, .. } | Self::Control { device_id, .. } => device_id,
        }
    }
}
