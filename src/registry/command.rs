// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The control table: command name to handler.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::command::{CommandBuilder, OutboundCommand};
use crate::error::{CommandError, RegistryError, StateError};
use crate::protocol::CommandSink;
use crate::state::{DeviceState, StateChange, StateUpdater};

use super::ControlDescriptor;

/// Everything a command handler may touch.
///
/// The handler reads the message and the current state, and acts only
/// through [`publish`](Self::publish), [`update`](Self::update) or
/// [`publish_and_update`](Self::publish_and_update).
pub struct CommandContext<'a> {
    device_id: &'a str,
    message: &'a str,
    updater: StateUpdater<'a>,
    sink: &'a dyn CommandSink,
    refresh: &'a OutboundCommand,
}

impl<'a> CommandContext<'a> {
    pub(crate) fn new(
        device_id: &'a str,
        message: &'a str,
        updater: StateUpdater<'a>,
        sink: &'a dyn CommandSink,
        refresh: &'a OutboundCommand,
    ) -> Self {
        Self {
            device_id,
            message,
            updater,
            sink,
            refresh,
        }
    }

    /// Returns the device id.
    #[must_use]
    pub fn device_id(&self) -> &str {
        self.device_id
    }

    /// Returns the raw control message.
    #[must_use]
    pub fn message(&self) -> &str {
        self.message
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> &DeviceState {
        self.updater.state()
    }

    /// Returns a builder in the device's current encoding.
    #[must_use]
    pub fn builder(&self) -> CommandBuilder {
        CommandBuilder::for_state(self.state())
    }

    /// Returns the device definition's refresh request.
    #[must_use]
    pub fn refresh_command(&self) -> OutboundCommand {
        self.refresh.clone()
    }

    /// Hands a command to the transport.
    pub fn publish(&self, command: OutboundCommand) {
        tracing::debug!(
            device_id = %self.device_id,
            command = %command.command,
            payload = %command.payload(),
            "Publishing command"
        );
        self.sink.publish(command);
    }

    /// Updates the local state mirror without publishing.
    pub fn update<F>(&mut self, f: F) -> bool
    where
        F: FnOnce(&DeviceState) -> Option<StateChange>,
    {
        self.updater.update(f)
    }

    /// Commits a patch to the local state mirror without publishing.
    ///
    /// # Errors
    ///
    /// Returns `StateError` if the patch does not fit the state tree; the
    /// state is then unchanged.
    pub fn apply(&mut self, change: &StateChange) -> Result<(), StateError> {
        self.updater.commit(change, || {})
    }

    /// Publishes a command and commits the patch it was built from.
    ///
    /// The patch is checked first; if it does not fit the state nothing is
    /// published. Observers are notified after the publish.
    ///
    /// # Errors
    ///
    /// Returns `StateError` if the patch does not fit the state tree.
    pub fn publish_and_update(
        &mut self,
        command: OutboundCommand,
        change: StateChange,
    ) -> Result<(), StateError> {
        let device_id = self.device_id;
        let sink = self.sink;
        self.updater.commit(&change, || {
            tracing::debug!(
                device_id = %device_id,
                command = %command.command,
                payload = %command.payload(),
                "Publishing command"
            );
            sink.publish(command);
        })
    }
}

/// A command handler.
///
/// Handlers validate before acting: an `Err` must mean nothing was published
/// and the state is unchanged.
pub type CommandHandler =
    Arc<dyn Fn(&mut CommandContext<'_>) -> Result<(), CommandError> + Send + Sync>;

/// One named command.
#[derive(Clone)]
pub struct CommandDefinition {
    name: String,
    handler: CommandHandler,
    descriptor: Option<ControlDescriptor>,
}

impl CommandDefinition {
    /// Creates a command.
    pub fn new<F>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut CommandContext<'_>) -> Result<(), CommandError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            handler: Arc::new(handler),
            descriptor: None,
        }
    }

    /// Attaches a discovery descriptor, for commands that are controls of
    /// their own (buttons).
    #[must_use]
    pub fn with_descriptor(mut self, descriptor: ControlDescriptor) -> Self {
        self.descriptor = Some(descriptor);
        self
    }

    /// Returns the command name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the discovery descriptor, if any.
    #[must_use]
    pub fn descriptor(&self) -> Option<&ControlDescriptor> {
        self.descriptor.as_ref()
    }

    /// Runs the handler.
    ///
    /// # Errors
    ///
    /// Returns whatever the handler rejected the message with.
    pub fn handle(&self, ctx: &mut CommandContext<'_>) -> Result<(), CommandError> {
        (self.handler)(ctx)
    }
}

impl fmt::Debug for CommandDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDefinition")
            .field("name", &self.name)
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

/// Registered commands of one device type.
#[derive(Debug, Clone, Default)]
pub struct CommandRegistry {
    commands: Vec<CommandDefinition>,
    by_name: HashMap<String, usize>,
}

impl CommandRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a command.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::DuplicateCommand` if the name is taken.
    pub fn register(&mut self, command: CommandDefinition) -> Result<(), RegistryError> {
        if self.by_name.contains_key(command.name()) {
            return Err(RegistryError::DuplicateCommand(command.name));
        }
        self.by_name.insert(command.name.clone(), self.commands.len());
        self.commands.push(command);
        Ok(())
    }

    /// Looks up a command.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&CommandDefinition> {
        self.by_name.get(name).map(|&i| &self.commands[i])
    }

    /// Iterates over commands in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &CommandDefinition> {
        self.commands.iter()
    }

    /// Returns the number of registered commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Returns `true` if no command is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Looks up and runs a command.
    ///
    /// # Errors
    ///
    /// Returns `CommandError::UnknownCommand` on a lookup miss, or the
    /// handler's error.
    pub fn dispatch(&self, name: &str, ctx: &mut CommandContext<'_>) -> Result<(), CommandError> {
        self.get(name)
            .ok_or_else(|| CommandError::UnknownCommand(name.to_string()))?
            .handle(ctx)
    }
}
