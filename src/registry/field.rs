// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The decode table: protocol key to state path.

use std::collections::HashMap;

use crate::error::{RegistryError, ValueError};
use crate::state::{StateChange, StatePath};
use crate::telemetry::Telegram;
use crate::telemetry::transform::{self, Transform};

use super::ControlDescriptor;

/// One protocol key and where its value lands.
#[derive(Debug, Clone)]
pub struct FieldDefinition {
    key: String,
    path: StatePath,
    transform: Transform,
    descriptor: Option<ControlDescriptor>,
}

impl FieldDefinition {
    /// Creates a field that stores the raw string.
    #[must_use]
    pub fn new(key: impl Into<String>, path: StatePath) -> Self {
        Self {
            key: key.into(),
            path,
            transform: transform::text,
            descriptor: None,
        }
    }

    /// Sets the decode transform.
    #[must_use]
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    /// Attaches a discovery descriptor.
    #[must_use]
    pub fn with_descriptor(mut self, descriptor: ControlDescriptor) -> Self {
        self.descriptor = Some(descriptor);
        self
    }

    /// Returns the protocol key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the target state path.
    #[must_use]
    pub fn path(&self) -> StatePath {
        self.path
    }

    /// Returns the discovery descriptor, if any.
    #[must_use]
    pub fn descriptor(&self) -> Option<&ControlDescriptor> {
        self.descriptor.as_ref()
    }

    /// Decodes a raw value into a patch for this field's path.
    ///
    /// # Errors
    ///
    /// Returns the transform's error if the raw value is outside its domain.
    pub fn decode(&self, raw: &str) -> Result<StateChange, ValueError> {
        let value = (self.transform)(raw)?;
        Ok(StateChange::field(self.path, value))
    }
}

/// Registered fields of one device type.
///
/// Immutable once the owning definition is built.
#[derive(Debug, Clone, Default)]
pub struct FieldRegistry {
    fields: Vec<FieldDefinition>,
    by_key: HashMap<String, usize>,
}

impl FieldRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::DuplicateField` if the key is already taken.
    pub fn register(&mut self, field: FieldDefinition) -> Result<(), RegistryError> {
        if self.by_key.contains_key(field.key()) {
            return Err(RegistryError::DuplicateField(field.key));
        }
        self.by_key.insert(field.key.clone(), self.fields.len());
        self.fields.push(field);
        Ok(())
    }

    /// Looks up a field by protocol key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&FieldDefinition> {
        self.by_key.get(key).map(|&i| &self.fields[i])
    }

    /// Iterates over fields in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.fields.iter()
    }

    /// Returns the number of registered fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if no field is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Decodes one protocol field.
    ///
    /// Returns `Ok(None)` for keys that are not registered; appliances send
    /// more fields than are modelled.
    ///
    /// # Errors
    ///
    /// Returns the transform's error for a registered key with a bad value.
    pub fn decode_field(&self, key: &str, raw: &str) -> Result<Option<StateChange>, ValueError> {
        self.get(key).map(|field| field.decode(raw)).transpose()
    }

    /// Decodes a whole telegram into one patch.
    ///
    /// Unknown keys are skipped at debug level and undecodable values are
    /// logged and skipped, so one bad field does not drop the rest of the
    /// telegram. Returns `None` when nothing was decoded.
    #[must_use]
    pub fn decode_telegram(&self, telegram: &Telegram) -> Option<StateChange> {
        let changes: Vec<StateChange> = telegram
            .iter()
            .filter_map(|(key, raw)| match self.decode_field(key, raw) {
                Ok(Some(change)) => Some(change),
                Ok(None) => {
                    tracing::debug!(key = %key, "Ignoring unknown field");
                    None
                }
                Err(e) => {
                    tracing::error!(key = %key, raw = %raw, error = %e, "Failed to decode field");
                    None
                }
            })
            .collect();

        if changes.is_empty() {
            None
        } else {
            Some(StateChange::batch(changes))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{CtField, FieldValue};
    use crate::types::SmartMeterStatus;

    fn registry() -> FieldRegistry {
        let mut registry = FieldRegistry::new();
        registry
            .register(
                FieldDefinition::new("pe", StatePath::BatteryPercentage)
                    .with_transform(transform::integer),
            )
            .unwrap();
        registry
            .register(
                FieldDefinition::new("c1", StatePath::CtInfo(CtField::Status))
                    .with_transform(transform::ct_status),
            )
            .unwrap();
        registry
            .register(FieldDefinition::new("vv", StatePath::FirmwareVersion))
            .unwrap();
        registry
    }

    #[test]
    fn duplicate_key_is_rejected() {
        let mut registry = registry();
        let err = registry
            .register(FieldDefinition::new("pe", StatePath::BatteryCapacity))
            .unwrap_err();
        assert_eq!(err, RegistryError::DuplicateField("pe".to_string()));
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn unknown_key_is_no_op() {
        assert_eq!(registry().decode_field("zz", "1"), Ok(None));
    }

    #[test]
    fn raw_passthrough_without_transform() {
        assert_eq!(
            registry().decode_field("vv", "226"),
            Ok(Some(StateChange::field(
                StatePath::FirmwareVersion,
                FieldValue::Text("226".to_string())
            )))
        );
    }

    #[test]
    fn decode_telegram_skips_bad_and_unknown_fields() {
        let telegram = Telegram::parse("pe=abc,zz=1,c1=42");
        let change = registry().decode_telegram(&telegram).unwrap();
        assert_eq!(
            change,
            StateChange::batch(vec![StateChange::field(
                StatePath::CtInfo(CtField::Status),
                FieldValue::CtStatus(SmartMeterStatus::NotInDiagnosis)
            )])
        );
    }

    #[test]
    fn decode_telegram_without_known_fields() {
        assert!(registry().decode_telegram(&Telegram::parse("zz=1")).is_none());
    }
}
