// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! One connected appliance.

use std::sync::Arc;

use crate::command::OutboundCommand;
use crate::error::{CommandError, RegistryError};
use crate::manager::DeviceConfig;
use crate::protocol::CommandSink;
use crate::registry::CommandContext;
use crate::state::{DeviceState, StateObservers, StateUpdater, SubscriptionId};
use crate::telemetry::Telegram;

use super::{DeviceDefinition, DeviceRegistry};

/// State and tables of one connected appliance.
///
/// A session owns its [`DeviceState`] exclusively. Both entry points,
/// [`handle_telegram`](Self::handle_telegram) and
/// [`handle_control`](Self::handle_control), take `&mut self`, so one
/// message is processed to completion before the next one starts.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use hame_bridge::command::OutboundCommand;
/// use hame_bridge::device::{DeviceSession, b2500_v2};
/// use hame_bridge::telemetry::Telegram;
///
/// let mut session = DeviceSession::new("0123456789ab", Arc::new(b2500_v2::definition().unwrap()));
/// session.handle_telegram(&Telegram::parse("cs=1,c0=255"));
///
/// let sink = |cmd: OutboundCommand| println!("{}", cmd.payload());
/// session.handle_control("connected-phase", "auto", &sink).unwrap();
/// ```
#[derive(Debug)]
pub struct DeviceSession {
    device_id: String,
    definition: Arc<DeviceDefinition>,
    state: DeviceState,
    observers: Arc<StateObservers>,
}

impl DeviceSession {
    /// Creates a session in the definition's default state.
    #[must_use]
    pub fn new(device_id: impl Into<String>, definition: Arc<DeviceDefinition>) -> Self {
        let state = definition.default_state();
        Self {
            device_id: device_id.into(),
            definition,
            state,
            observers: Arc::new(StateObservers::new()),
        }
    }

    /// Creates a session from configuration.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::UnknownDeviceType` if no definition covers
    /// the configured type.
    pub fn from_config(
        config: &DeviceConfig,
        registry: &DeviceRegistry,
    ) -> Result<Self, RegistryError> {
        let definition = registry.get(&config.device_type)?;
        let mut session = Self::new(config.device_id.clone(), definition);
        if let Some(use_flash_commands) = config.use_flash_commands {
            session.state = DeviceState::with_flash_commands(use_flash_commands);
        }
        tracing::info!(
            device_id = %session.device_id,
            device_type = %config.device_type,
            definition = %session.definition.name(),
            use_flash_commands = session.state.use_flash_commands(),
            "Created device session"
        );
        Ok(session)
    }

    /// Returns the device id.
    #[must_use]
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Returns the device definition.
    #[must_use]
    pub fn definition(&self) -> &Arc<DeviceDefinition> {
        &self.definition
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> &DeviceState {
        &self.state
    }

    /// Returns the observer registry.
    ///
    /// Shared so observers can be added while the session runs in a task.
    #[must_use]
    pub fn observers(&self) -> &Arc<StateObservers> {
        &self.observers
    }

    /// Registers a state observer.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&DeviceState) + Send + Sync + 'static,
    {
        self.observers.subscribe(callback)
    }

    /// Decodes a telegram and applies it as one patch.
    ///
    /// Returns `true` if any registered field was applied; observers are then
    /// notified once for the whole telegram. Values that fail to decode or
    /// do not fit the state are logged and skipped on their own.
    pub fn handle_telegram(&mut self, telegram: &Telegram) -> bool {
        let definition = Arc::clone(&self.definition);
        let mut updater = StateUpdater::new(&mut self.state, &self.observers);
        let applied = updater.update(|state| {
            let change = definition.fields().decode_telegram(telegram)?;
            state.retain_fitting(change)
        });

        tracing::trace!(
            device_id = %self.device_id,
            pairs = telegram.len(),
            applied,
            "Handled telegram"
        );
        applied
    }

    /// Dispatches a control message.
    ///
    /// Failures are logged here: unknown commands as a warning, rejected
    /// messages as an error with the offending message. The error is
    /// returned as well for callers that report it; nothing has been
    /// published and the state is unchanged.
    ///
    /// # Errors
    ///
    /// Returns the `CommandError` the command was rejected with.
    pub fn handle_control(
        &mut self,
        command: &str,
        message: &str,
        sink: &dyn CommandSink,
    ) -> Result<(), CommandError> {
        let definition = Arc::clone(&self.definition);
        let refresh = definition.refresh_command();
        let updater = StateUpdater::new(&mut self.state, &self.observers);
        let mut ctx = CommandContext::new(&self.device_id, message, updater, sink, &refresh);

        let result = definition.commands().dispatch(command, &mut ctx);
        match &result {
            Ok(()) => {
                tracing::debug!(
                    device_id = %self.device_id,
                    command = %command,
                    "Handled control message"
                );
            }
            Err(e @ CommandError::UnknownCommand(_)) => {
                tracing::warn!(device_id = %self.device_id, error = %e, "Ignoring control message");
            }
            Err(e) => {
                tracing::error!(
                    device_id = %self.device_id,
                    command = %command,
                    message = %message,
                    error = %e,
                    "Rejected control message"
                );
            }
        }
        result
    }

    /// Returns the command that asks the appliance for a full telegram.
    #[must_use]
    pub fn refresh_command(&self) -> OutboundCommand {
        self.definition.refresh_command()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use parking_lot::Mutex;

    use super::*;
    use crate::device::b2500_v2;
    use crate::types::SmartMeterStatus;

    fn session() -> DeviceSession {
        DeviceSession::new("dev", Arc::new(b2500_v2::definition().unwrap()))
    }

    #[test]
    fn telegram_notifies_once() {
        let mut session = session();
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        session.subscribe(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        assert!(session.handle_telegram(&Telegram::parse("pe=50,kn=2240,c1=9,zz=1")));
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(session.state().battery_capacity(), Some(2240));
        assert_eq!(
            session.state().ct_info().status,
            Some(SmartMeterStatus::DiagnosisTimeout)
        );
    }

    #[test]
    fn telegram_without_known_fields_is_no_op() {
        let mut session = session();
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        session.subscribe(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        assert!(!session.handle_telegram(&Telegram::parse("zz=1,yy=2")));
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn control_reaches_sink() {
        let mut session = session();
        let published = Mutex::new(Vec::new());
        let sink = |cmd: OutboundCommand| published.lock().push(cmd.payload());

        session.handle_control("time-zone", "60", &sink).unwrap();
        assert!(session.handle_control("time-zone", "UTC", &sink).is_err());
        assert!(session.handle_control("warp-drive", "1", &sink).is_err());

        assert_eq!(*published.lock(), ["cd=9,wy=60"]);
    }

    #[test]
    fn refresh_command_payload() {
        assert_eq!(session().refresh_command().payload(), "cd=1");
    }
}
