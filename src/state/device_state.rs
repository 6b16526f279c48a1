// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device state tracking.

use serde::Serialize;

use crate::error::StateError;
use crate::types::{ChargingMode, ConnectedPhase, SmartMeterStatus};

use super::{
    ChannelField, CtField, DailyStat, FieldValue, RatedPowerField, StateChange, StatePath,
    TimePeriods,
};

/// Readings of one solar input or battery output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChannelState {
    /// Whether the channel is active.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    /// Power in watts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub power: Option<i64>,
}

/// Cell temperature range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Temperature {
    /// Lowest cell temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<i64>,
    /// Highest cell temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<i64>,
}

/// Daily energy counters in Wh.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyStats {
    /// Energy charged into the battery.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub battery_charging_power: Option<i64>,
    /// Energy discharged from the battery.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub battery_discharge_power: Option<i64>,
    /// Energy charged from photovoltaics.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photovoltaic_charging_power: Option<i64>,
    /// Energy fed back by the micro inverter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub micro_reverse_output_power: Option<i64>,
}

/// Smart meter (CT) readings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CtInfo {
    /// Whether a CT is paired.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connected: Option<bool>,
    /// Automatically sized power in watts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub automatic_power_size: Option<i64>,
    /// Power transmitted by the CT in watts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transmitted_power: Option<i64>,
    /// Grid phase the CT is attached to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connected_phase: Option<ConnectedPhase>,
    /// Diagnosis status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<SmartMeterStatus>,
    /// Clip power on phase 1.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase1: Option<i64>,
    /// Clip power on phase 2.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase2: Option<i64>,
    /// Clip power on phase 3.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase3: Option<i64>,
    /// Micro inverter power.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub micro_inverter_power: Option<i64>,
}

/// Rated power limits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatedPower {
    /// Rated output power in watts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<i64>,
    /// Rated input power in watts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<i64>,
    /// Whether the rated power is limited.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_limited: Option<bool>,
}

/// Tracked state of one connected appliance.
///
/// All readings are optional because they are unknown until the appliance
/// reports them. The state is only mutated through
/// [`StateUpdater`](super::StateUpdater); the accessors here are read-only.
///
/// Serializes to the camelCase JSON document published on the state topic.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceState {
    use_flash_commands: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    battery_percentage: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    battery_capacity: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    discharge_depth: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    firmware_version: Option<String>,
    temperature: Temperature,
    solar_inputs: [ChannelState; 2],
    outputs: [ChannelState; 2],
    #[serde(skip_serializing_if = "Option::is_none")]
    battery_output_threshold: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    charging_mode: Option<ChargingMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    adaptive_mode: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    time_periods: Option<TimePeriods>,
    daily_stats: DailyStats,
    ct_info: CtInfo,
    rated_power: RatedPower,
}

impl DeviceState {
    /// Creates a new empty device state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty state with the given command encoding flag.
    #[must_use]
    pub fn with_flash_commands(use_flash_commands: bool) -> Self {
        Self {
            use_flash_commands,
            ..Self::default()
        }
    }

    /// Returns `true` if commands use the flash encoding.
    #[must_use]
    pub fn use_flash_commands(&self) -> bool {
        self.use_flash_commands
    }

    /// Battery state of charge in percent.
    #[must_use]
    pub fn battery_percentage(&self) -> Option<i64> {
        self.battery_percentage
    }

    /// Battery capacity in Wh.
    #[must_use]
    pub fn battery_capacity(&self) -> Option<i64> {
        self.battery_capacity
    }

    /// Discharge depth in percent.
    #[must_use]
    pub fn discharge_depth(&self) -> Option<i64> {
        self.discharge_depth
    }

    /// Firmware version.
    #[must_use]
    pub fn firmware_version(&self) -> Option<&str> {
        self.firmware_version.as_deref()
    }

    /// Cell temperature range.
    #[must_use]
    pub fn temperature(&self) -> &Temperature {
        &self.temperature
    }

    /// Solar input readings, indexed by [`Channel::index`](super::Channel::index).
    #[must_use]
    pub fn solar_inputs(&self) -> &[ChannelState; 2] {
        &self.solar_inputs
    }

    /// Battery output readings, indexed by [`Channel::index`](super::Channel::index).
    #[must_use]
    pub fn outputs(&self) -> &[ChannelState; 2] {
        &self.outputs
    }

    /// Battery output threshold in watts.
    #[must_use]
    pub fn battery_output_threshold(&self) -> Option<i64> {
        self.battery_output_threshold
    }

    /// Charging mode.
    #[must_use]
    pub fn charging_mode(&self) -> Option<ChargingMode> {
        self.charging_mode
    }

    /// Adaptive discharge mode.
    #[must_use]
    pub fn adaptive_mode(&self) -> Option<bool> {
        self.adaptive_mode
    }

    /// Discharge schedule, once the appliance has reported any of it.
    #[must_use]
    pub fn time_periods(&self) -> Option<&TimePeriods> {
        self.time_periods.as_ref()
    }

    /// Daily energy counters.
    #[must_use]
    pub fn daily_stats(&self) -> &DailyStats {
        &self.daily_stats
    }

    /// Smart meter readings.
    #[must_use]
    pub fn ct_info(&self) -> &CtInfo {
        &self.ct_info
    }

    /// Rated power limits.
    #[must_use]
    pub fn rated_power(&self) -> &RatedPower {
        &self.rated_power
    }

    /// Renders the state document.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    // ========== State Changes ==========

    /// Applies a patch.
    ///
    /// On error the state may be partially modified; callers apply to a
    /// scratch copy (see [`StateUpdater`](super::StateUpdater)).
    pub(crate) fn apply(&mut self, change: &StateChange) -> Result<(), StateError> {
        match change {
            StateChange::Field { path, value } => self.set(*path, value),
            StateChange::TimePeriods(periods) => {
                self.time_periods = Some(periods.clone());
                Ok(())
            }
            StateChange::Batch(changes) => changes.iter().try_for_each(|c| self.apply(c)),
        }
    }

    /// Drops the entries of a patch that do not fit the state tree.
    ///
    /// Entries are tried in order on a scratch copy; rejected ones are
    /// logged and removed. Returns `None` when no entry fits.
    pub(crate) fn retain_fitting(&self, change: StateChange) -> Option<StateChange> {
        let entries = match change {
            StateChange::Batch(entries) => entries,
            other => vec![other],
        };

        let mut scratch = self.clone();
        let fitting: Vec<StateChange> = entries
            .into_iter()
            .filter(|entry| {
                let mut attempt = scratch.clone();
                let result = attempt.apply(entry).map(|()| scratch = attempt);
                if let Err(e) = &result {
                    tracing::error!(error = %e, "Dropping state change");
                }
                result.is_ok()
            })
            .collect();

        (!fitting.is_empty()).then(|| StateChange::batch(fitting))
    }

    fn set(&mut self, path: StatePath, value: &FieldValue) -> Result<(), StateError> {
        let mismatch = || StateError::TypeMismatch {
            path,
            found: value.kind(),
        };
        let int = || match value {
            FieldValue::Integer(v) => Ok(Some(*v)),
            _ => Err(mismatch()),
        };
        let flag = || match value {
            FieldValue::Bool(v) => Ok(Some(*v)),
            _ => Err(mismatch()),
        };

        match path {
            StatePath::BatteryPercentage => self.battery_percentage = int()?,
            StatePath::BatteryCapacity => self.battery_capacity = int()?,
            StatePath::DischargeDepth => self.discharge_depth = int()?,
            StatePath::FirmwareVersion => match value {
                FieldValue::Text(v) => self.firmware_version = Some(v.clone()),
                _ => return Err(mismatch()),
            },
            StatePath::TemperatureLow => self.temperature.min = int()?,
            StatePath::TemperatureHigh => self.temperature.max = int()?,
            StatePath::SolarInput(channel, field) => {
                let slot = &mut self.solar_inputs[channel.index()];
                match field {
                    ChannelField::Active => slot.active = flag()?,
                    ChannelField::Power => slot.power = int()?,
                }
            }
            StatePath::Output(channel, field) => {
                let slot = &mut self.outputs[channel.index()];
                match field {
                    ChannelField::Active => slot.active = flag()?,
                    ChannelField::Power => slot.power = int()?,
                }
            }
            StatePath::BatteryOutputThreshold => self.battery_output_threshold = int()?,
            StatePath::ChargingMode => match value {
                FieldValue::ChargingMode(mode) => self.charging_mode = Some(*mode),
                _ => return Err(mismatch()),
            },
            StatePath::AdaptiveMode => self.adaptive_mode = flag()?,
            StatePath::TimePeriod { index, setting } => self
                .time_periods
                .get_or_insert_with(TimePeriods::default)
                .set_reported(index, setting, value)?,
            StatePath::DailyStats(stat) => {
                let stats = &mut self.daily_stats;
                match stat {
                    DailyStat::BatteryChargingPower => stats.battery_charging_power = int()?,
                    DailyStat::BatteryDischargePower => stats.battery_discharge_power = int()?,
                    DailyStat::PhotovoltaicChargingPower => {
                        stats.photovoltaic_charging_power = int()?;
                    }
                    DailyStat::MicroReverseOutputPower => {
                        stats.micro_reverse_output_power = int()?;
                    }
                }
            }
            StatePath::CtInfo(field) => {
                let ct = &mut self.ct_info;
                match (field, value) {
                    (CtField::Connected, _) => ct.connected = flag()?,
                    (CtField::AutomaticPowerSize, _) => ct.automatic_power_size = int()?,
                    (CtField::TransmittedPower, _) => ct.transmitted_power = int()?,
                    (CtField::ConnectedPhase, FieldValue::ConnectedPhase(phase)) => {
                        ct.connected_phase = Some(*phase);
                    }
                    (CtField::Status, FieldValue::CtStatus(status)) => ct.status = Some(*status),
                    (CtField::Phase1, _) => ct.phase1 = int()?,
                    (CtField::Phase2, _) => ct.phase2 = int()?,
                    (CtField::Phase3, _) => ct.phase3 = int()?,
                    (CtField::MicroInverterPower, _) => ct.micro_inverter_power = int()?,
                    (CtField::ConnectedPhase | CtField::Status, _) => return Err(mismatch()),
                }
            }
            StatePath::RatedPower(field) => match field {
                RatedPowerField::Output => self.rated_power.output = int()?,
                RatedPowerField::Input => self.rated_power.input = int()?,
                RatedPowerField::IsLimited => self.rated_power.is_limited = flag()?,
            },
            StatePath::UseFlashCommands => match value {
                FieldValue::Bool(v) => self.use_flash_commands = *v,
                _ => return Err(mismatch()),
            },
        }
        Ok(())
    }
}
