// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the bridge.
//!
//! Failures are split by the layer that detects them: value validation,
//! the control path, state mutation and registry construction. None of them
//! is fatal to a device session; the session logs and drops the single
//! operation that failed.

use thiserror::Error;

use crate::state::StatePath;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// A raw value failed validation.
    #[error("value error: {0}")]
    Value(#[from] ValueError),

    /// A control message could not be executed.
    #[error("command error: {0}")]
    Command(#[from] CommandError),

    /// A state patch could not be applied.
    #[error("state error: {0}")]
    State(#[from] StateError),

    /// A device definition or registry lookup failed.
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Configuration could not be parsed.
    #[error("configuration error: {0}")]
    Config(#[from] serde_json::Error),

    /// The device task is no longer running.
    #[error("device channel closed: {0}")]
    ChannelClosed(String),

    /// An MQTT client request could not be queued.
    #[cfg(feature = "mqtt")]
    #[error("MQTT error: {0}")]
    Mqtt(#[from] rumqttc::ClientError),

    /// The MQTT connection failed.
    #[cfg(feature = "mqtt")]
    #[error("MQTT connection error: {0}")]
    Connection(#[from] rumqttc::ConnectionError),

    /// A device id is already managed.
    #[error("device already managed: {0}")]
    DuplicateDevice(String),
}

/// Errors related to value validation and constraints.
///
/// Raised both when decoding protocol fields and when validating inbound
/// control messages.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// A numeric value is outside the allowed range.
    #[error("value {actual} is out of range [{min}, {max}]")]
    OutOfRange {
        /// Minimum allowed value.
        min: i64,
        /// Maximum allowed value.
        max: i64,
        /// The actual value that was provided.
        actual: i64,
    },

    /// A value was expected to be a decimal integer.
    #[error("invalid integer: {0:?}")]
    InvalidInteger(String),

    /// A value was expected to be a boolean token.
    #[error("invalid boolean: {0:?}")]
    InvalidBoolean(String),

    /// A time of day did not match `HH:MM`.
    #[error("invalid time (should be HH:MM): {0:?}")]
    InvalidTime(String),

    /// A token is not one of the accepted choices.
    #[error("invalid value {value:?}, expected one of: {expected}")]
    InvalidChoice {
        /// The rejected token.
        value: String,
        /// Human-readable list of accepted tokens.
        expected: &'static str,
    },

    /// A time synchronisation payload could not be parsed.
    #[error("invalid time sync data: {0}")]
    InvalidSyncTime(String),
}

/// Errors raised while handling an inbound control message.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// No command is registered under this name.
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// The message failed validation.
    #[error(transparent)]
    Value(#[from] ValueError),

    /// The addressed time period has not been reported by the device yet.
    #[error("time period {period} has not been reported by the device")]
    PeriodNotReported {
        /// The 1-based period number.
        period: u8,
    },

    /// The computed patch could not be applied.
    #[error(transparent)]
    State(#[from] StateError),
}

/// Errors raised when a patch does not fit the state tree.
///
/// These indicate a defect in a registry table rather than bad input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StateError {
    /// A decoded value has the wrong type for its path.
    #[error("cannot store {found} value at {path}")]
    TypeMismatch {
        /// The targeted state path.
        path: StatePath,
        /// The kind of value that was offered.
        found: &'static str,
    },

    /// A time period index outside the fixed schedule.
    #[error("time period index {0} is out of range")]
    PeriodIndex(usize),
}

/// Errors raised while building or querying registries.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Two fields were registered for the same protocol key.
    #[error("duplicate field registration: {0}")]
    DuplicateField(String),

    /// Two commands were registered under the same name.
    #[error("duplicate command registration: {0}")]
    DuplicateCommand(String),

    /// Two definitions claim the same device type.
    #[error("device type registered twice: {0}")]
    DuplicateDeviceType(String),

    /// No definition covers the device type.
    #[error("unknown device type: {0}")]
    UnknownDeviceType(String),
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;
