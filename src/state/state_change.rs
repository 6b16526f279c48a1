// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! State paths, decoded values and patches.
//!
//! A [`StatePath`] names one slot of [`DeviceState`](super::DeviceState)
//! from a closed set, replacing string path traversal. A [`StateChange`] is
//! the patch handed to the [`StateUpdater`](super::StateUpdater).
//!
//! # Examples
//!
//! ```
//! use hame_bridge::state::{FieldValue, StateChange, StatePath};
//!
//! let change = StateChange::field(StatePath::BatteryPercentage, FieldValue::Integer(87));
//! assert_eq!(change.change_count(), 1);
//! ```

use std::fmt;

use crate::types::{ChargingMode, ConnectedPhase, SmartMeterStatus, TimeOfDay};

use super::{PeriodSetting, TimePeriods};

/// One of the two solar inputs or battery outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Input/output 1.
    First,
    /// Input/output 2.
    Second,
}

impl Channel {
    /// Returns the zero-based array index.
    #[must_use]
    pub const fn index(&self) -> usize {
        match self {
            Self::First => 0,
            Self::Second => 1,
        }
    }
}

/// Settings tracked per input/output channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelField {
    /// Whether the channel is active.
    Active,
    /// Power flowing through the channel in watts.
    Power,
}

/// Daily energy counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DailyStat {
    /// Energy charged into the battery.
    BatteryChargingPower,
    /// Energy discharged from the battery.
    BatteryDischargePower,
    /// Energy charged from photovoltaics.
    PhotovoltaicChargingPower,
    /// Energy fed back by the micro inverter.
    MicroReverseOutputPower,
}

/// Smart meter (CT) readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CtField {
    /// Whether a CT is paired.
    Connected,
    /// Automatically sized power.
    AutomaticPowerSize,
    /// Power transmitted by the CT.
    TransmittedPower,
    /// Grid phase the CT is attached to.
    ConnectedPhase,
    /// Diagnosis status.
    Status,
    /// Clip power on phase 1.
    Phase1,
    /// Clip power on phase 2.
    Phase2,
    /// Clip power on phase 3.
    Phase3,
    /// Micro inverter power.
    MicroInverterPower,
}

/// Rated power limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RatedPowerField {
    /// Rated output power.
    Output,
    /// Rated input power.
    Input,
    /// Whether the rated power is limited.
    IsLimited,
}

/// Address of one value in the device state tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatePath {
    /// Battery state of charge in percent.
    BatteryPercentage,
    /// Battery capacity in Wh.
    BatteryCapacity,
    /// Discharge depth in percent.
    DischargeDepth,
    /// Firmware version string.
    FirmwareVersion,
    /// Lowest cell temperature.
    TemperatureLow,
    /// Highest cell temperature.
    TemperatureHigh,
    /// A solar input reading.
    SolarInput(Channel, ChannelField),
    /// A battery output reading.
    Output(Channel, ChannelField),
    /// Battery output threshold in watts.
    BatteryOutputThreshold,
    /// Charging mode.
    ChargingMode,
    /// Adaptive (smart meter driven) discharge.
    AdaptiveMode,
    /// One setting of one discharge period.
    TimePeriod {
        /// Zero-based period index.
        index: usize,
        /// The addressed setting.
        setting: PeriodSetting,
    },
    /// A daily energy counter.
    DailyStats(DailyStat),
    /// A smart meter reading.
    CtInfo(CtField),
    /// A rated power value.
    RatedPower(RatedPowerField),
    /// Per-device command encoding flag.
    UseFlashCommands,
}

impl fmt::Display for StatePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let channel_field = |field: &ChannelField| match field {
            ChannelField::Active => "active",
            ChannelField::Power => "power",
        };
        match self {
            Self::BatteryPercentage => f.write_str("batteryPercentage"),
            Self::BatteryCapacity => f.write_str("batteryCapacity"),
            Self::DischargeDepth => f.write_str("dischargeDepth"),
            Self::FirmwareVersion => f.write_str("firmwareVersion"),
            Self::TemperatureLow => f.write_str("temperature.min"),
            Self::TemperatureHigh => f.write_str("temperature.max"),
            Self::SolarInput(channel, field) => write!(
                f,
                "solarInputs[{}].{}",
                channel.index(),
                channel_field(field)
            ),
            Self::Output(channel, field) => {
                write!(f, "outputs[{}].{}", channel.index(), channel_field(field))
            }
            Self::BatteryOutputThreshold => f.write_str("batteryOutputThreshold"),
            Self::ChargingMode => f.write_str("chargingMode"),
            Self::AdaptiveMode => f.write_str("adaptiveMode"),
            Self::TimePeriod { index, setting } => {
                write!(f, "timePeriods[{index}].{}", setting.field_name())
            }
            Self::DailyStats(stat) => {
                let name = match stat {
                    DailyStat::BatteryChargingPower => "batteryChargingPower",
                    DailyStat::BatteryDischargePower => "batteryDischargePower",
                    DailyStat::PhotovoltaicChargingPower => "photovoltaicChargingPower",
                    DailyStat::MicroReverseOutputPower => "microReverseOutputPower",
                };
                write!(f, "dailyStats.{name}")
            }
            Self::CtInfo(field) => {
                let name = match field {
                    CtField::Connected => "connected",
                    CtField::AutomaticPowerSize => "automaticPowerSize",
                    CtField::TransmittedPower => "transmittedPower",
                    CtField::ConnectedPhase => "connectedPhase",
                    CtField::Status => "status",
                    CtField::Phase1 => "phase1",
                    CtField::Phase2 => "phase2",
                    CtField::Phase3 => "phase3",
                    CtField::MicroInverterPower => "microInverterPower",
                };
                write!(f, "ctInfo.{name}")
            }
            Self::RatedPower(field) => {
                let name = match field {
                    RatedPowerField::Output => "output",
                    RatedPowerField::Input => "input",
                    RatedPowerField::IsLimited => "isLimited",
                };
                write!(f, "ratedPower.{name}")
            }
            Self::UseFlashCommands => f.write_str("useFlashCommands"),
        }
    }
}

/// A decoded semantic value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// On/off flag.
    Bool(bool),
    /// Integer reading.
    Integer(i64),
    /// Free text, also the raw passthrough.
    Text(String),
    /// Time of day.
    Time(TimeOfDay),
    /// Charging mode.
    ChargingMode(ChargingMode),
    /// Connected phase.
    ConnectedPhase(ConnectedPhase),
    /// Smart meter status.
    CtStatus(SmartMeterStatus),
}

impl FieldValue {
    /// Returns a short name of the value kind, for diagnostics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Bool(_) => "boolean",
            Self::Integer(_) => "integer",
            Self::Text(_) => "text",
            Self::Time(_) => "time",
            Self::ChargingMode(_) => "charging mode",
            Self::ConnectedPhase(_) => "connected phase",
            Self::CtStatus(_) => "CT status",
        }
    }
}

/// A patch to apply to the device state.
#[derive(Debug, Clone, PartialEq)]
pub enum StateChange {
    /// Set one path to a value.
    Field {
        /// The targeted path.
        path: StatePath,
        /// The new value.
        value: FieldValue,
    },

    /// Replace the whole discharge schedule.
    TimePeriods(TimePeriods),

    /// Several changes applied together.
    ///
    /// Used for a whole telegram so observers see one notification.
    Batch(Vec<StateChange>),
}

impl StateChange {
    /// Creates a single-field change.
    #[must_use]
    pub fn field(path: StatePath, value: FieldValue) -> Self {
        Self::Field { path, value }
    }

    /// Creates a batch of changes.
    #[must_use]
    pub fn batch(changes: Vec<StateChange>) -> Self {
        Self::Batch(changes)
    }

    /// Returns the number of individual changes.
    ///
    /// For batch changes, returns the total count of nested changes.
    #[must_use]
    pub fn change_count(&self) -> usize {
        match self {
            Self::Batch(changes) => changes.iter().map(Self::change_count).sum(),
            _ => 1,
        }
    }
}
