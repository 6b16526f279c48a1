// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Assembly of outbound commands.

use crate::state::{DeviceState, TimePeriods};
use crate::types::{ChargingMode, DischargeDepth, PhaseChannel, SyncTime};

use super::{CommandEncoding, CommandParams, CommandType, OutboundCommand};

/// Builds outbound commands in one wire encoding.
///
/// The encoding is fixed when the builder is created, usually from the
/// device's `useFlashCommands` flag, so handlers never choose it.
///
/// # Examples
///
/// ```
/// use hame_bridge::command::{CommandBuilder, CommandEncoding};
/// use hame_bridge::types::ChargingMode;
///
/// let legacy = CommandBuilder::new(CommandEncoding::Legacy);
/// assert_eq!(
///     legacy.charging_mode(ChargingMode::ChargeThenDischarge).payload(),
///     "cd=17,md=1"
/// );
///
/// let flash = CommandBuilder::new(CommandEncoding::Flash);
/// assert_eq!(
///     flash.charging_mode(ChargingMode::ChargeThenDischarge).payload(),
///     "cd=3,md=1"
/// );
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandBuilder {
    encoding: CommandEncoding,
}

impl CommandBuilder {
    /// Creates a builder for an encoding.
    #[must_use]
    pub const fn new(encoding: CommandEncoding) -> Self {
        Self { encoding }
    }

    /// Creates a builder for the encoding currently selected by a device.
    #[must_use]
    pub fn for_state(state: &DeviceState) -> Self {
        Self::new(CommandEncoding::from_flag(state.use_flash_commands()))
    }

    /// Returns the encoding.
    #[must_use]
    pub const fn encoding(&self) -> CommandEncoding {
        self.encoding
    }

    /// Builds a command from arbitrary parameters.
    #[must_use]
    pub fn build(&self, command: CommandType, params: CommandParams) -> OutboundCommand {
        OutboundCommand {
            command,
            code: command.code_for(self.encoding),
            encoding: self.encoding,
            params,
        }
    }

    /// Requests a full status telegram.
    #[must_use]
    pub fn read_device_info(&self) -> OutboundCommand {
        self.build(CommandType::ReadDeviceInfo, CommandParams::new())
    }

    /// Sets the charging mode.
    #[must_use]
    pub fn charging_mode(&self, mode: ChargingMode) -> OutboundCommand {
        self.build(
            CommandType::ChargingMode,
            CommandParams::new().with("md", mode.code()),
        )
    }

    /// Enables or disables adaptive discharge.
    #[must_use]
    pub fn discharge_mode(&self, adaptive: bool) -> OutboundCommand {
        self.build(
            CommandType::DischargeMode,
            CommandParams::new().with("md", adaptive),
        )
    }

    /// Sets the discharge depth.
    #[must_use]
    pub fn discharge_depth(&self, depth: DischargeDepth) -> OutboundCommand {
        self.build(
            CommandType::DischargeDepth,
            CommandParams::new().with("md", depth.percent()),
        )
    }

    /// Writes the whole discharge schedule.
    #[must_use]
    pub fn time_periods(&self, periods: &TimePeriods) -> OutboundCommand {
        self.build(CommandType::TimedDischarge, time_period_params(periods))
    }

    /// Selects the smart meter channel.
    #[must_use]
    pub fn connected_phase(&self, channel: PhaseChannel) -> OutboundCommand {
        self.build(
            CommandType::SetConnectedPhase,
            CommandParams::new().with("md", channel.code()),
        )
    }

    /// Sets the time zone offset.
    #[must_use]
    pub fn time_zone(&self, offset: i64) -> OutboundCommand {
        self.build(CommandType::TimeZone, CommandParams::new().with("wy", offset))
    }

    /// Sets the appliance clock.
    #[must_use]
    pub fn sync_time(&self, time: &SyncTime) -> OutboundCommand {
        self.build(CommandType::SyncTime, time.params().into_iter().collect())
    }

    /// Restarts the appliance.
    #[must_use]
    pub fn restart(&self) -> OutboundCommand {
        self.build(CommandType::Restart, CommandParams::new())
    }

    /// Resets the appliance to factory settings.
    #[must_use]
    pub fn factory_reset(&self) -> OutboundCommand {
        self.build(CommandType::FactoryReset, CommandParams::new())
    }
}

/// Builds the parameters of a full schedule write.
///
/// Emits the constant discriminator `md=0` followed by `a<n>` (enabled as
/// 0/1), `b<n>` (start), `e<n>` (end) and `v<n>` (output) for every stored
/// period, in period order. The list ends at the first incomplete period.
#[must_use]
pub fn time_period_params(periods: &TimePeriods) -> CommandParams {
    let mut params = CommandParams::new().with("md", 0_i64);
    for (n, period) in (1..).zip(periods) {
        let (Some(enabled), Some(start), Some(end), Some(watts)) = (
            period.enabled,
            period.start_time,
            period.end_time,
            period.output_value,
        ) else {
            break;
        };
        params.insert(format!("a{n}"), enabled);
        params.insert(format!("b{n}"), start);
        params.insert(format!("e{n}"), end);
        params.insert(format!("v{n}"), watts);
    }
    params
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::ParamValue;
    use crate::state::{PERIOD_COUNT, TimePeriod};
    use crate::types::TimeOfDay;

    fn full_schedule() -> TimePeriods {
        TimePeriods::new(full_schedule_array())
    }

    fn full_schedule_array() -> [TimePeriod; PERIOD_COUNT] {
        let mut periods = [TimePeriod::new(
            false,
            TimeOfDay::MIDNIGHT,
            TimeOfDay::END_OF_DAY,
            80,
        ); PERIOD_COUNT];
        periods[0].enabled = Some(true);
        periods[0].start_time = TimeOfDay::new(6, 30).ok();
        periods[4].output_value = Some(800);
        periods
    }

    #[test]
    fn time_period_params_cover_all_slots() {
        let params = time_period_params(&full_schedule());

        assert_eq!(params.len(), 1 + 4 * PERIOD_COUNT);
        assert_eq!(params.iter().next(), Some(("md", &ParamValue::Int(0))));
        assert_eq!(params.get("a1"), Some(&ParamValue::Int(1)));
        assert_eq!(params.get("b1"), Some(&ParamValue::Text("06:30".into())));
        assert_eq!(params.get("e2"), Some(&ParamValue::Text("23:59".into())));
        assert_eq!(params.get("v5"), Some(&ParamValue::Int(800)));
        assert_eq!(params.get("a5"), Some(&ParamValue::Int(0)));
    }

    #[test]
    fn time_period_params_stop_at_reported_periods() {
        let schedule = TimePeriods::default();
        let params = time_period_params(&schedule);
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn time_period_params_stop_at_incomplete_period() {
        let mut periods = full_schedule_array();
        periods[2].output_value = None;
        let params = time_period_params(&TimePeriods::new(periods));

        assert_eq!(params.len(), 1 + 4 * 2);
        assert!(params.get("a3").is_none());
    }

    #[test]
    fn encoding_follows_state_flag() {
        let state = DeviceState::with_flash_commands(true);
        let cmd = CommandBuilder::for_state(&state).time_periods(&full_schedule());
        assert_eq!(cmd.code, 7);
        assert_eq!(cmd.encoding, CommandEncoding::Flash);

        let cmd = CommandBuilder::for_state(&DeviceState::new()).time_periods(&full_schedule());
        assert_eq!(cmd.code, 20);
    }

    #[test]
    fn commands_without_legacy_code_keep_their_code() {
        let legacy = CommandBuilder::new(CommandEncoding::Legacy);
        assert_eq!(legacy.connected_phase(PhaseChannel::AUTO).payload(), "cd=8,md=255");
        assert_eq!(legacy.time_zone(480).payload(), "cd=9,wy=480");
        assert_eq!(legacy.restart().payload(), "cd=11");
        assert_eq!(legacy.read_device_info().payload(), "cd=1");
    }

    #[test]
    fn sync_time_params_in_protocol_order() {
        let time = SyncTime::from_json(
            r#"{"wy":480,"yy":124,"mm":0,"rr":1,"hh":0,"mn":0,"ss":0}"#,
        )
        .unwrap();
        let cmd = CommandBuilder::new(CommandEncoding::Flash).sync_time(&time);
        assert_eq!(cmd.payload(), "cd=10,wy=480,yy=124,mm=0,rr=1,hh=0,mn=0,ss=0");
    }
}
