// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Discovery metadata attached to fields and commands.
//!
//! A [`ControlDescriptor`] tells the automation layer how to present a value
//! or a control. The bridge fills it in and forwards it; it never reads it
//! back.

use std::collections::BTreeMap;

use serde::Serialize;

/// Kind of control the automation layer should create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    /// Read-only value.
    Sensor,
    /// Read-only on/off value.
    BinarySensor,
    /// Writable on/off value.
    Switch,
    /// Writable choice from a fixed set.
    Select,
    /// Writable number.
    Number,
    /// Writable free text.
    Text,
    /// Press-only action.
    Button,
}

/// Discovery descriptor of one field or command.
///
/// # Examples
///
/// ```
/// use hame_bridge::registry::{ComponentKind, ControlDescriptor};
///
/// let descriptor =
///     ControlDescriptor::number("time_period_1_output_value", "Time Period 1 Output Value")
///         .with_unit("W")
///         .with_command("time-period/1/output-value")
///         .with_range(80, 800);
///
/// assert_eq!(descriptor.kind, ComponentKind::Number);
/// assert_eq!(descriptor.max, Some(800));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControlDescriptor {
    /// Component kind.
    #[serde(rename = "type")]
    pub kind: ComponentKind,
    /// Stable object id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Device class (`power`, `energy`, `battery`, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_class: Option<String>,
    /// Unit of measurement.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_of_measurement: Option<String>,
    /// State class (`measurement`, `total_increasing`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_class: Option<String>,
    /// Icon name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Command name for writable controls.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    /// State token to display label mapping.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub value_mappings: BTreeMap<String, String>,
    /// Lower bound of a number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<i64>,
    /// Upper bound of a number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<i64>,
    /// Validation pattern of a text control.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Message sent when a button is pressed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload_press: Option<String>,
    /// Whether the control is enabled when first discovered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled_by_default: Option<bool>,
}

impl ControlDescriptor {
    fn new(kind: ComponentKind, id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            name: name.into(),
            device_class: None,
            unit_of_measurement: None,
            state_class: None,
            icon: None,
            command: None,
            value_mappings: BTreeMap::new(),
            min: None,
            max: None,
            pattern: None,
            payload_press: None,
            enabled_by_default: None,
        }
    }

    /// Creates a sensor descriptor.
    #[must_use]
    pub fn sensor(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(ComponentKind::Sensor, id, name)
    }

    /// Creates a binary sensor descriptor.
    #[must_use]
    pub fn binary_sensor(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(ComponentKind::BinarySensor, id, name)
    }

    /// Creates a switch descriptor.
    #[must_use]
    pub fn switch(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(ComponentKind::Switch, id, name)
    }

    /// Creates a select descriptor.
    #[must_use]
    pub fn select(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(ComponentKind::Select, id, name)
    }

    /// Creates a number descriptor.
    #[must_use]
    pub fn number(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(ComponentKind::Number, id, name)
    }

    /// Creates a text descriptor.
    #[must_use]
    pub fn text(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(ComponentKind::Text, id, name)
    }

    /// Creates a button descriptor.
    #[must_use]
    pub fn button(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(ComponentKind::Button, id, name)
    }

    /// Sets the device class.
    #[must_use]
    pub fn with_device_class(mut self, device_class: impl Into<String>) -> Self {
        self.device_class = Some(device_class.into());
        self
    }

    /// Sets the unit of measurement.
    #[must_use]
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit_of_measurement = Some(unit.into());
        self
    }

    /// Sets the state class.
    #[must_use]
    pub fn with_state_class(mut self, state_class: impl Into<String>) -> Self {
        self.state_class = Some(state_class.into());
        self
    }

    /// Sets the icon.
    #[must_use]
    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    /// Sets the command written by this control.
    #[must_use]
    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    /// Adds a value mapping.
    #[must_use]
    pub fn with_mapping(mut self, value: impl Into<String>, label: impl Into<String>) -> Self {
        self.value_mappings.insert(value.into(), label.into());
        self
    }

    /// Sets the numeric bounds.
    #[must_use]
    pub fn with_range(mut self, min: i64, max: i64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    /// Sets the text validation pattern.
    #[must_use]
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    /// Sets the press payload of a button.
    #[must_use]
    pub fn with_payload_press(mut self, payload: impl Into<String>) -> Self {
        self.payload_press = Some(payload.into());
        self
    }

    /// Sets whether the control is enabled when first discovered.
    #[must_use]
    pub fn with_enabled_by_default(mut self, enabled: bool) -> Self {
        self.enabled_by_default = Some(enabled);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_only_set_fields() {
        let descriptor = ControlDescriptor::button("sync_time", "Sync Time")
            .with_icon("mdi:clock-sync")
            .with_command("sync-time")
            .with_payload_press("PRESS")
            .with_enabled_by_default(false);

        let json = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(json["type"], "button");
        assert_eq!(json["payload_press"], "PRESS");
        assert_eq!(json["enabled_by_default"], false);
        assert!(json.get("unit_of_measurement").is_none());
        assert!(json.get("value_mappings").is_none());
    }

    #[test]
    fn mappings_are_sorted() {
        let descriptor = ControlDescriptor::select("ct_connected_phase", "CT Connected Phase")
            .with_mapping("unknown", "None")
            .with_mapping("0", "Phase 1");
        let keys: Vec<_> = descriptor.value_mappings.keys().collect();
        assert_eq!(keys, ["0", "unknown"]);
    }
}
