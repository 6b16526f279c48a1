// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device sessions running as tokio tasks.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::device::{DeviceDefinition, DeviceSession};
use crate::error::{CommandError, Error, Result};
use crate::protocol::CommandSink;
use crate::state::{DeviceState, StateObservers, SubscriptionId};
use crate::telemetry::Telegram;

/// Capacity of a device task's inbox.
const INBOX_CAPACITY: usize = 64;

enum Request {
    Telegram {
        telegram: Telegram,
        reply: oneshot::Sender<bool>,
    },
    Control {
        command: String,
        message: String,
        reply: oneshot::Sender<std::result::Result<(), CommandError>>,
    },
    Refresh,
    Shutdown,
}

/// Runs a session as a tokio task.
///
/// The task owns the session and handles one request at a time in arrival
/// order. The latest state is mirrored into a `watch` channel after every
/// applied patch.
///
/// Must be called from within a tokio runtime.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use hame_bridge::command::OutboundCommand;
/// use hame_bridge::device::{DeviceSession, b2500_v2};
/// use hame_bridge::manager::spawn_device;
/// use hame_bridge::telemetry::Telegram;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> hame_bridge::Result<()> {
/// let session = DeviceSession::new("0123456789ab", Arc::new(b2500_v2::definition()?));
/// let sink = Arc::new(|cmd: OutboundCommand| println!("{}", cmd.payload()));
/// let device = spawn_device(session, sink);
///
/// device.send_telegram(Telegram::parse("pe=64")).await?;
/// assert_eq!(device.state().borrow().battery_percentage(), Some(64));
///
/// device.shutdown().await;
/// # Ok(())
/// # }
/// ```
pub fn spawn_device(session: DeviceSession, sink: Arc<dyn CommandSink>) -> DeviceHandle {
    let device_id = session.device_id().to_string();
    let definition = Arc::clone(session.definition());
    let observers = Arc::clone(session.observers());

    let (state_tx, state_rx) = watch::channel(session.state().clone());
    observers.subscribe(move |state| {
        state_tx.send_replace(state.clone());
    });

    let (requests, inbox) = mpsc::channel(INBOX_CAPACITY);
    let task = tokio::spawn(run(session, inbox, sink));

    DeviceHandle {
        device_id,
        definition,
        observers,
        requests,
        state_rx,
        task,
    }
}

async fn run(
    mut session: DeviceSession,
    mut inbox: mpsc::Receiver<Request>,
    sink: Arc<dyn CommandSink>,
) {
    tracing::debug!(device_id = %session.device_id(), "Starting device task");

    while let Some(request) = inbox.recv().await {
        match request {
            Request::Telegram { telegram, reply } => {
                let applied = session.handle_telegram(&telegram);
                let _ = reply.send(applied);
            }
            Request::Control {
                command,
                message,
                reply,
            } => {
                let result = session.handle_control(&command, &message, sink.as_ref());
                let _ = reply.send(result);
            }
            Request::Refresh => sink.publish(session.refresh_command()),
            Request::Shutdown => break,
        }
    }

    tracing::debug!(device_id = %session.device_id(), "Device task stopped");
}

/// Owner-side handle of a running device task.
#[derive(Debug)]
pub struct DeviceHandle {
    device_id: String,
    definition: Arc<DeviceDefinition>,
    observers: Arc<StateObservers>,
    requests: mpsc::Sender<Request>,
    state_rx: watch::Receiver<DeviceState>,
    task: JoinHandle<()>,
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Telegram { telegram, .. } => {
                f.debug_struct("Telegram").field("pairs", &telegram.len()).finish()
            }
            Self::Control {
                command, message, ..
            } => f
                .debug_struct("Control")
                .field("command", command)
                .field("message", message)
                .finish(),
            Self::Refresh => f.write_str("Refresh"),
            Self::Shutdown => f.write_str("Shutdown"),
        }
    }
}

impl DeviceHandle {
    /// Returns the device id.
    #[must_use]
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Returns the definition the device runs with.
    #[must_use]
    pub fn definition(&self) -> &Arc<DeviceDefinition> {
        &self.definition
    }

    /// Returns a receiver that always holds the latest state.
    #[must_use]
    pub fn state(&self) -> watch::Receiver<DeviceState> {
        self.state_rx.clone()
    }

    /// Registers a state observer.
    ///
    /// The callback runs on the device task after every applied patch.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&DeviceState) + Send + Sync + 'static,
    {
        self.observers.subscribe(callback)
    }

    /// Removes a state observer.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }

    /// Returns true while the device task accepts requests.
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.requests.is_closed()
    }

    /// Hands a telegram to the device task and waits until it is applied.
    ///
    /// Returns whether any registered field was decoded.
    ///
    /// # Errors
    ///
    /// Returns `Error::ChannelClosed` if the task has stopped.
    pub async fn send_telegram(&self, telegram: Telegram) -> Result<bool> {
        let (reply, response) = oneshot::channel();
        self.request(Request::Telegram { telegram, reply }).await?;
        response.await.map_err(|_| self.closed())
    }

    /// Hands a control message to the device task and waits for the outcome.
    ///
    /// # Errors
    ///
    /// Returns `Error::Command` if the message was rejected (already logged
    /// by the task) and `Error::ChannelClosed` if the task has stopped.
    pub async fn send_control(
        &self,
        command: impl Into<String>,
        message: impl Into<String>,
    ) -> Result<()> {
        let (reply, response) = oneshot::channel();
        self.request(Request::Control {
            command: command.into(),
            message: message.into(),
            reply,
        })
        .await?;
        response.await.map_err(|_| self.closed())?.map_err(Error::from)
    }

    /// Asks the appliance for a full telegram.
    ///
    /// # Errors
    ///
    /// Returns `Error::ChannelClosed` if the task has stopped.
    pub async fn refresh(&self) -> Result<()> {
        self.request(Request::Refresh).await
    }

    /// Stops the task after the requests queued before this call.
    pub async fn shutdown(self) {
        if self.requests.send(Request::Shutdown).await.is_ok() {
            if let Err(e) = self.task.await {
                tracing::error!(device_id = %self.device_id, error = %e, "Device task failed");
            }
        } else {
            tracing::debug!(device_id = %self.device_id, "Device task already stopped");
        }
    }

    async fn request(&self, request: Request) -> Result<()> {
        self.requests.send(request).await.map_err(|_| self.closed())
    }

    fn closed(&self) -> Error {
        Error::ChannelClosed(self.device_id.clone())
    }
}
