// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! MQTT transport: outbound command sink and inbound event loop.

use rumqttc::{AsyncClient, Event, EventLoop, Packet, QoS};

use crate::command::OutboundCommand;
use crate::error::{Error, Result};
use crate::manager::DeviceManager;

use super::{CommandSink, TOPIC_PREFIX, command_topic, telegram_topic};

/// Publishes commands to one appliance's command topic.
///
/// Uses `try_publish` so the sequential device task never blocks on the
/// broker; a full client queue drops the command with a warning.
///
/// # Examples
///
/// ```ignore
/// use hame_bridge::protocol::MqttCommandSink;
/// use rumqttc::{AsyncClient, MqttOptions};
///
/// let (client, event_loop) = AsyncClient::new(MqttOptions::new("bridge", "broker", 1883), 10);
/// let sink = MqttCommandSink::new(client, "HMA", "0123456789ab");
/// ```
#[derive(Debug, Clone)]
pub struct MqttCommandSink {
    client: AsyncClient,
    topic: String,
}

impl MqttCommandSink {
    /// Creates a sink for one device.
    #[must_use]
    pub fn new(client: AsyncClient, device_type: &str, device_id: &str) -> Self {
        Self {
            client,
            topic: command_topic(device_type, device_id),
        }
    }

    /// Returns the command topic.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }
}

impl CommandSink for MqttCommandSink {
    fn publish(&self, command: OutboundCommand) {
        let payload = command.payload();
        tracing::debug!(topic = %self.topic, payload = %payload, "Publishing MQTT command");

        if let Err(e) = self
            .client
            .try_publish(&self.topic, QoS::AtLeastOnce, false, payload)
        {
            tracing::warn!(topic = %self.topic, error = %e, "Failed to queue MQTT command");
        }
    }
}

/// Subscribes to the telegram and control topics of one appliance.
///
/// # Errors
///
/// Returns `Error::Mqtt` if the client request queue is closed.
pub async fn subscribe_device(
    client: &AsyncClient,
    device_type: &str,
    device_id: &str,
) -> Result<()> {
    let telegrams = telegram_topic(device_type, device_id);
    let controls = format!("{TOPIC_PREFIX}/{device_type}/control/{device_id}/#");

    client.subscribe(&telegrams, QoS::AtLeastOnce).await?;
    client.subscribe(&controls, QoS::AtLeastOnce).await?;

    tracing::debug!(
        telegram = %telegrams,
        control = %controls,
        "Subscribed to device topics"
    );
    Ok(())
}

/// Drives the MQTT connection and routes inbound messages to the manager.
///
/// Returns when the broker disconnects or the connection fails. Rejected
/// control messages are logged by the device task and do not stop the loop.
///
/// # Errors
///
/// Returns `Error::Connection` if polling the connection fails.
pub async fn run_event_loop(mut event_loop: EventLoop, manager: DeviceManager) -> Result<()> {
    loop {
        match event_loop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(connack))) => {
                tracing::debug!(?connack, "MQTT broker connected");
            }
            Ok(Event::Incoming(Packet::SubAck(suback))) => {
                tracing::debug!(?suback, "MQTT subscription acknowledged");
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                let Ok(payload) = std::str::from_utf8(&publish.payload) else {
                    tracing::warn!(topic = %publish.topic, "Dropping non UTF-8 payload");
                    continue;
                };
                tracing::trace!(
                    topic = %publish.topic,
                    payload = %payload,
                    "MQTT message received"
                );

                match manager.route(&publish.topic, payload).await {
                    Ok(_) | Err(Error::Command(_)) => {}
                    Err(e) => {
                        tracing::warn!(
                            topic = %publish.topic,
                            error = %e,
                            "Failed to route message"
                        );
                    }
                }
            }
            Ok(Event::Incoming(Packet::Disconnect)) => {
                tracing::info!("MQTT broker disconnected");
                return Ok(());
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!(error = %e, "MQTT event loop error");
                return Err(Error::Connection(e));
            }
        }
    }
}
