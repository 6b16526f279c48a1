// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device type definitions and per-device sessions.
//!
//! A [`DeviceDefinition`] bundles the field and command tables of one
//! appliance generation together with its default state. Definitions are
//! built once, wrapped in an `Arc` and shared by every [`DeviceSession`] of
//! that type through the [`DeviceRegistry`].
//!
//! # Examples
//!
//! ```
//! use hame_bridge::device::DeviceRegistry;
//!
//! let registry = DeviceRegistry::builtin().unwrap();
//! let definition = registry.get("HMA").unwrap();
//!
//! assert!(definition.fields().get("c1").is_some());
//! assert!(definition.commands().get("time-period/3/start-time").is_some());
//! assert!(registry.get("HMX").is_err());
//! ```

pub mod b2500_v2;
mod base;
mod session;

pub use session::DeviceSession;

use std::collections::HashMap;
use std::sync::Arc;

use crate::command::{CommandBuilder, CommandEncoding, OutboundCommand};
use crate::error::RegistryError;
use crate::registry::{
    CommandDefinition, CommandRegistry, ControlDescriptor, FieldDefinition, FieldRegistry,
};
use crate::state::DeviceState;

/// Field and command tables of one appliance generation.
#[derive(Debug)]
pub struct DeviceDefinition {
    name: String,
    device_types: Vec<String>,
    use_flash_commands: bool,
    fields: FieldRegistry,
    commands: CommandRegistry,
}

impl DeviceDefinition {
    /// Starts building a definition.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> DeviceDefinitionBuilder {
        DeviceDefinitionBuilder {
            definition: Self {
                name: name.into(),
                device_types: Vec::new(),
                use_flash_commands: false,
                fields: FieldRegistry::new(),
                commands: CommandRegistry::new(),
            },
        }
    }

    /// Returns the definition name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the device type codes covered by this definition.
    #[must_use]
    pub fn device_types(&self) -> &[String] {
        &self.device_types
    }

    /// Returns the state a new session starts from.
    #[must_use]
    pub fn default_state(&self) -> DeviceState {
        DeviceState::with_flash_commands(self.use_flash_commands)
    }

    /// Returns the field table.
    #[must_use]
    pub fn fields(&self) -> &FieldRegistry {
        &self.fields
    }

    /// Returns the command table.
    #[must_use]
    pub fn commands(&self) -> &CommandRegistry {
        &self.commands
    }

    /// Returns the command that asks the appliance for a full telegram.
    ///
    /// The request has no settings code, so it is the same in both
    /// encodings.
    #[must_use]
    pub fn refresh_command(&self) -> OutboundCommand {
        CommandBuilder::new(CommandEncoding::from_flag(self.use_flash_commands)).read_device_info()
    }

    /// Lists every discovery descriptor, fields first, in registration
    /// order.
    #[must_use]
    pub fn descriptors(&self) -> Vec<&ControlDescriptor> {
        self.fields
            .iter()
            .filter_map(FieldDefinition::descriptor)
            .chain(self.commands.iter().filter_map(CommandDefinition::descriptor))
            .collect()
    }
}

/// Incremental construction of a [`DeviceDefinition`].
#[derive(Debug)]
pub struct DeviceDefinitionBuilder {
    definition: DeviceDefinition,
}

impl DeviceDefinitionBuilder {
    /// Adds a device type code.
    #[must_use]
    pub fn device_type(mut self, device_type: impl Into<String>) -> Self {
        self.definition.device_types.push(device_type.into());
        self
    }

    /// Sets the initial command encoding flag.
    #[must_use]
    pub fn use_flash_commands(mut self, enabled: bool) -> Self {
        self.definition.use_flash_commands = enabled;
        self
    }

    /// Registers a field.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::DuplicateField` if the key is taken.
    pub fn field(&mut self, field: FieldDefinition) -> Result<&mut Self, RegistryError> {
        self.definition.fields.register(field)?;
        Ok(self)
    }

    /// Registers a command.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::DuplicateCommand` if the name is taken.
    pub fn command(&mut self, command: CommandDefinition) -> Result<&mut Self, RegistryError> {
        self.definition.commands.register(command)?;
        Ok(self)
    }

    /// Finishes the definition.
    #[must_use]
    pub fn build(self) -> DeviceDefinition {
        self.definition
    }
}

/// Lookup from device type code to its shared definition.
#[derive(Debug, Clone, Default)]
pub struct DeviceRegistry {
    definitions: HashMap<String, Arc<DeviceDefinition>>,
}

impl DeviceRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with every built-in definition.
    ///
    /// # Errors
    ///
    /// Returns a `RegistryError` if a built-in table is inconsistent.
    pub fn builtin() -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        registry.register(b2500_v2::definition()?)?;
        Ok(registry)
    }

    /// Adds a definition under each of its device types.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::DuplicateDeviceType` if a type is already
    /// covered; the registry is left unchanged.
    pub fn register(&mut self, definition: DeviceDefinition) -> Result<(), RegistryError> {
        if let Some(taken) = definition
            .device_types()
            .iter()
            .find(|t| self.definitions.contains_key(t.as_str()))
        {
            return Err(RegistryError::DuplicateDeviceType(taken.clone()));
        }

        tracing::debug!(
            definition = %definition.name(),
            device_types = ?definition.device_types(),
            fields = definition.fields().len(),
            commands = definition.commands().len(),
            "Registered device definition"
        );
        let definition = Arc::new(definition);
        for device_type in definition.device_types() {
            self.definitions
                .insert(device_type.clone(), Arc::clone(&definition));
        }
        Ok(())
    }

    /// Returns the definition for a device type.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::UnknownDeviceType` for an unregistered type.
    pub fn get(&self, device_type: &str) -> Result<Arc<DeviceDefinition>, RegistryError> {
        self.definitions
            .get(device_type)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownDeviceType(device_type.to_string()))
    }

    /// Returns the registered device type codes.
    pub fn device_types(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::StatePath;

    #[test]
    fn builtin_covers_v2_types() {
        let registry = DeviceRegistry::builtin().unwrap();
        for device_type in ["HMA", "HMF", "HMK"] {
            let definition = registry.get(device_type).unwrap();
            assert_eq!(definition.name(), "B2500 V2");
        }
        assert!(Arc::ptr_eq(
            &registry.get("HMA").unwrap(),
            &registry.get("HMK").unwrap()
        ));
    }

    #[test]
    fn unknown_type_is_an_error() {
        let registry = DeviceRegistry::builtin().unwrap();
        assert_eq!(
            registry.get("HMB").unwrap_err(),
            RegistryError::UnknownDeviceType("HMB".to_string())
        );
    }

    #[test]
    fn duplicate_device_type_is_rejected() {
        let mut registry = DeviceRegistry::builtin().unwrap();
        let other = DeviceDefinition::builder("Other").device_type("HMF").build();
        assert_eq!(
            registry.register(other).unwrap_err(),
            RegistryError::DuplicateDeviceType("HMF".to_string())
        );
        assert_eq!(registry.get("HMF").unwrap().name(), "B2500 V2");
    }

    #[test]
    fn builder_rejects_duplicate_field() {
        let mut builder = DeviceDefinition::builder("Test");
        builder
            .field(FieldDefinition::new("pe", StatePath::BatteryPercentage))
            .unwrap();
        assert!(
            builder
                .field(FieldDefinition::new("pe", StatePath::BatteryCapacity))
                .is_err()
        );
    }

    #[test]
    fn default_state_and_refresh() {
        let definition = b2500_v2::definition().unwrap();
        assert!(!definition.default_state().use_flash_commands());
        assert_eq!(definition.refresh_command().payload(), "cd=1");
    }

    #[test]
    fn descriptors_list_fields_then_commands() {
        let definition = b2500_v2::definition().unwrap();
        let descriptors = definition.descriptors();
        let ids: Vec<_> = descriptors.iter().map(|d| d.id.as_str()).collect();

        assert_eq!(ids.first(), Some(&"battery_percentage"));
        assert!(ids.contains(&"ct_status"));
        assert!(ids.contains(&"time_period_5_output_value"));
        assert_eq!(ids.last(), Some(&"sync_time"));
    }
}
