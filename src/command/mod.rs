// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Outbound command definitions.
//!
//! This module provides the wire representation of commands sent to the
//! appliance.
//!
//! # Available Commands
//!
//! | Command Type | Purpose | Parameters |
//! |-------------|---------|------------|
//! | [`CommandType::ReadDeviceInfo`] | Request a status telegram | none |
//! | [`CommandType::ChargingMode`] | Simultaneous or charge-then-discharge | `md` |
//! | [`CommandType::DischargeMode`] | Adaptive discharge on/off | `md` |
//! | [`CommandType::DischargeDepth`] | Discharge depth in percent | `md` |
//! | [`CommandType::TimedDischarge`] | Full 5-period schedule | `md`, `a*`, `b*`, `e*`, `v*` |
//! | [`CommandType::SetConnectedPhase`] | Smart meter channel | `md` |
//! | [`CommandType::TimeZone`] | Time zone offset | `wy` |
//! | [`CommandType::SyncTime`] | Set the clock | `wy`, `yy`, `mm`, `rr`, `hh`, `mn`, `ss` |
//! | [`CommandType::Restart`] | Reboot | none |
//! | [`CommandType::FactoryReset`] | Factory reset | none |
//!
//! # Encoding
//!
//! Every command is rendered in one of two encodings selected per device.
//! The [`Flash`](CommandEncoding::Flash) encoding uses the base command codes
//! and persists settings; the [`Legacy`](CommandEncoding::Legacy) encoding
//! sends settings commands with their RAM-only codes.
//!
//! # Examples
//!
//! ```
//! use hame_bridge::command::{CommandBuilder, CommandEncoding};
//! use hame_bridge::types::PhaseChannel;
//!
//! let builder = CommandBuilder::new(CommandEncoding::Flash);
//! let cmd = builder.connected_phase(PhaseChannel::AUTO);
//! assert_eq!(cmd.payload(), "cd=8,md=255");
//! ```

mod builder;
mod params;

pub use builder::{CommandBuilder, time_period_params};
pub use params::{CommandParams, ParamValue};

use std::fmt;

use serde::Serialize;

/// Command types understood by the appliance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandType {
    /// Request a status telegram.
    ReadDeviceInfo,
    /// Set the charging mode.
    ChargingMode,
    /// Set adaptive discharge.
    DischargeMode,
    /// Set the discharge depth.
    DischargeDepth,
    /// Set the start discharge threshold.
    StartDischargeThreshold,
    /// Write the discharge schedule.
    TimedDischarge,
    /// Select the smart meter channel.
    SetConnectedPhase,
    /// Set the time zone.
    TimeZone,
    /// Set the clock.
    SyncTime,
    /// Reboot.
    Restart,
    /// Factory reset.
    FactoryReset,
}

impl CommandType {
    /// Returns the base (`cd`) code.
    #[must_use]
    pub const fn code(&self) -> u8 {
        match self {
            Self::ReadDeviceInfo => 1,
            Self::ChargingMode => 3,
            Self::DischargeMode => 4,
            Self::DischargeDepth => 5,
            Self::StartDischargeThreshold => 6,
            Self::TimedDischarge => 7,
            Self::SetConnectedPhase => 8,
            Self::TimeZone => 9,
            Self::SyncTime => 10,
            Self::Restart => 11,
            Self::FactoryReset => 12,
        }
    }

    /// Returns the RAM-only code, for settings commands that have one.
    #[must_use]
    pub const fn legacy_code(&self) -> Option<u8> {
        match self {
            Self::ChargingMode => Some(17),
            Self::DischargeMode => Some(18),
            Self::DischargeDepth => Some(19),
            Self::TimedDischarge => Some(20),
            _ => None,
        }
    }

    /// Returns the code used in an encoding.
    #[must_use]
    pub const fn code_for(&self, encoding: CommandEncoding) -> u8 {
        match (encoding, self.legacy_code()) {
            (CommandEncoding::Legacy, Some(code)) => code,
            _ => self.code(),
        }
    }
}

impl fmt::Display for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ReadDeviceInfo => "READ_DEVICE_INFO",
            Self::ChargingMode => "CHARGING_MODE",
            Self::DischargeMode => "DISCHARGE_MODE",
            Self::DischargeDepth => "DISCHARGE_DEPTH",
            Self::StartDischargeThreshold => "START_DISCHARGE_THRESHOLD",
            Self::TimedDischarge => "TIMED_DISCHARGE",
            Self::SetConnectedPhase => "SET_CONNECTED_PHASE",
            Self::TimeZone => "TIME_ZONE",
            Self::SyncTime => "SYNC_TIME",
            Self::Restart => "RESTART",
            Self::FactoryReset => "FACTORY_RESET",
        };
        f.write_str(name)
    }
}

/// Wire encoding of outbound commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandEncoding {
    /// RAM-only codes for settings commands.
    #[default]
    Legacy,
    /// Base codes, settings are written to flash.
    Flash,
}

impl CommandEncoding {
    /// Maps the per-device `useFlashCommands` flag.
    #[must_use]
    pub const fn from_flag(use_flash_commands: bool) -> Self {
        if use_flash_commands {
            Self::Flash
        } else {
            Self::Legacy
        }
    }
}

/// A command ready to hand to the transport.
///
/// Carries the parameters together with the encoding they were built for;
/// [`payload`](Self::payload) renders the default text form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundCommand {
    /// The logical command.
    pub command: CommandType,
    /// The `cd` code in the selected encoding.
    pub code: u8,
    /// The selected encoding.
    pub encoding: CommandEncoding,
    /// The parameters, in wire order.
    pub params: CommandParams,
}

impl OutboundCommand {
    /// Renders `cd=<code>,<k>=<v>,...`.
    #[must_use]
    pub fn payload(&self) -> String {
        let mut payload = format!("cd={}", self.code);
        for (key, value) in self.params.iter() {
            payload.push(',');
            payload.push_str(key);
            payload.push('=');
            payload.push_str(&value.to_string());
        }
        payload
    }
}

impl fmt::Display for OutboundCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.payload())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_codes_only_for_settings() {
        assert_eq!(CommandType::ChargingMode.code_for(CommandEncoding::Legacy), 17);
        assert_eq!(CommandType::DischargeMode.code_for(CommandEncoding::Legacy), 18);
        assert_eq!(CommandType::DischargeDepth.code_for(CommandEncoding::Legacy), 19);
        assert_eq!(CommandType::TimedDischarge.code_for(CommandEncoding::Legacy), 20);
        assert_eq!(CommandType::SyncTime.code_for(CommandEncoding::Legacy), 10);
        assert_eq!(CommandType::TimedDischarge.code_for(CommandEncoding::Flash), 7);
    }

    #[test]
    fn encoding_from_flag() {
        assert_eq!(CommandEncoding::from_flag(false), CommandEncoding::Legacy);
        assert_eq!(CommandEncoding::from_flag(true), CommandEncoding::Flash);
    }

    #[test]
    fn payload_keeps_param_order() {
        let cmd = OutboundCommand {
            command: CommandType::TimeZone,
            code: 9,
            encoding: CommandEncoding::Flash,
            params: CommandParams::new().with("wy", 480_i64).with("xx", "a"),
        };
        assert_eq!(cmd.payload(), "cd=9,wy=480,xx=a");
        assert_eq!(cmd.to_string(), cmd.payload());
    }

    #[test]
    fn command_type_display() {
        assert_eq!(CommandType::TimedDischarge.to_string(), "TIMED_DISCHARGE");
    }
}
