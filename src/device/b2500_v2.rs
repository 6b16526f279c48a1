// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! B2500 second generation (`HMA`, `HMF`, `HMK`).
//!
//! Adds to the shared B2500 tables:
//!
//! - charging and adaptive discharge modes
//! - five scheduled discharge periods (`d*`, `e*`, `f*`, `h*`)
//! - daily energy counters
//! - smart meter (CT) readings and channel selection
//! - rated power limits
//! - time zone and clock synchronisation

use crate::error::{CommandError, RegistryError};
use crate::registry::{CommandContext, CommandDefinition, ControlDescriptor, FieldDefinition};
use crate::state::{
    CtField, DailyStat, PERIOD_COUNT, PeriodSetting, PeriodUpdate, RatedPowerField, StateChange,
    StatePath,
};
use crate::telemetry::transform;
use crate::types::{
    ChargingMode, OutputPower, PhaseChannel, SmartMeterStatus, SyncTime, parse_integer,
    parse_switch,
};

use super::{DeviceDefinition, DeviceDefinitionBuilder, base};

/// Device type codes of this generation.
pub const DEVICE_TYPES: [&str; 3] = ["HMA", "HMF", "HMK"];

/// Pattern advertised for time-of-day text controls.
const TIME_PATTERN: &str = "^([0-1]?[0-9]|2[0-3]):[0-5][0-9]$";

/// Builds the definition.
///
/// # Errors
///
/// Returns a `RegistryError` if two entries share a key or command name.
pub fn definition() -> Result<DeviceDefinition, RegistryError> {
    let mut builder = DeviceDefinition::builder("B2500 V2").use_flash_commands(false);
    for device_type in DEVICE_TYPES {
        builder = builder.device_type(device_type);
    }

    base::register_fields(&mut builder)?;
    base::register_commands(&mut builder)?;
    register_modes(&mut builder)?;
    register_time_periods(&mut builder)?;
    register_daily_stats(&mut builder)?;
    register_smart_meter(&mut builder)?;
    register_rated_power(&mut builder)?;
    register_clock(&mut builder)?;

    Ok(builder.build())
}

fn register_modes(builder: &mut DeviceDefinitionBuilder) -> Result<(), RegistryError> {
    builder
        .field(
            FieldDefinition::new("lv", StatePath::BatteryOutputThreshold)
                .with_transform(transform::integer)
                .with_descriptor(
                    ControlDescriptor::sensor(
                        "battery_output_threshold",
                        "Battery Output Threshold",
                    )
                    .with_device_class("power")
                    .with_unit("W"),
                ),
        )?
        .field(
            FieldDefinition::new("cs", StatePath::ChargingMode)
                .with_transform(transform::charging_mode)
                .with_descriptor(
                    ControlDescriptor::select("charging_mode", "Charging Mode")
                        .with_command("charging-mode")
                        .with_mapping(
                            ChargingMode::ChargeDischargeSimultaneously.as_str(),
                            "Simultaneous Charging/Discharging",
                        )
                        .with_mapping(
                            ChargingMode::ChargeThenDischarge.as_str(),
                            "Fully Charge Then Discharge",
                        ),
                ),
        )?
        .command(CommandDefinition::new("charging-mode", charging_mode))?
        .field(
            FieldDefinition::new("md", StatePath::AdaptiveMode)
                .with_transform(transform::boolean)
                .with_descriptor(
                    ControlDescriptor::switch("adaptive_mode", "Adaptive Mode")
                        .with_icon("mdi:auto-fix")
                        .with_command("adaptive-mode"),
                ),
        )?
        .command(CommandDefinition::new("adaptive-mode", adaptive_mode))?;
    Ok(())
}

fn charging_mode(ctx: &mut CommandContext<'_>) -> Result<(), CommandError> {
    let mode: ChargingMode = ctx.message().parse()?;
    let command = ctx.builder().charging_mode(mode);
    ctx.publish(command);
    Ok(())
}

fn adaptive_mode(ctx: &mut CommandContext<'_>) -> Result<(), CommandError> {
    let adaptive = parse_switch(ctx.message())?;
    let command = ctx.builder().discharge_mode(adaptive);
    ctx.publish(command);
    Ok(())
}

fn register_time_periods(builder: &mut DeviceDefinitionBuilder) -> Result<(), RegistryError> {
    for (n, index) in (1_u8..).zip(0..PERIOD_COUNT) {
        let path = |setting| StatePath::TimePeriod { index, setting };

        builder
            .field(
                FieldDefinition::new(format!("d{n}"), path(PeriodSetting::Enabled))
                    .with_transform(transform::boolean)
                    .with_descriptor(
                        ControlDescriptor::switch(
                            format!("time_period_{n}_enabled"),
                            format!("Time Period {n} Enabled"),
                        )
                        .with_icon("mdi:clock-time-four-outline")
                        .with_command(format!("time-period/{n}/enabled")),
                    ),
            )?
            .field(
                FieldDefinition::new(format!("e{n}"), path(PeriodSetting::StartTime))
                    .with_transform(transform::time_string)
                    .with_descriptor(
                        ControlDescriptor::text(
                            format!("time_period_{n}_start_time"),
                            format!("Time Period {n} Start Time"),
                        )
                        .with_command(format!("time-period/{n}/start-time"))
                        .with_pattern(TIME_PATTERN),
                    ),
            )?
            .field(
                FieldDefinition::new(format!("f{n}"), path(PeriodSetting::EndTime))
                    .with_transform(transform::time_string)
                    .with_descriptor(
                        ControlDescriptor::text(
                            format!("time_period_{n}_end_time"),
                            format!("Time Period {n} End Time"),
                        )
                        .with_command(format!("time-period/{n}/end-time"))
                        .with_pattern(TIME_PATTERN),
                    ),
            )?
            .field(
                FieldDefinition::new(format!("h{n}"), path(PeriodSetting::OutputValue))
                    .with_transform(transform::output_value)
                    .with_descriptor(
                        ControlDescriptor::number(
                            format!("time_period_{n}_output_value"),
                            format!("Time Period {n} Output Value"),
                        )
                        .with_unit("W")
                        .with_command(format!("time-period/{n}/output-value"))
                        .with_range(
                            i64::from(OutputPower::MIN.watts()),
                            i64::from(OutputPower::MAX.watts()),
                        ),
                    ),
            )?;

        for setting in PeriodSetting::ALL {
            builder.command(time_period_command(n, setting))?;
        }
    }
    Ok(())
}

/// Builds the handler of `time-period/<period>/<setting>`.
///
/// The schedule is only written once the appliance has reported the
/// addressed period and every setting of each known period. The whole
/// schedule is re-sent because the protocol has no single-slot update, and
/// the command is published from the same snapshot that is committed to the
/// state.
fn time_period_command(period: u8, setting: PeriodSetting) -> CommandDefinition {
    CommandDefinition::new(format!("time-period/{period}/{setting}"), move |ctx| {
        let periods = ctx
            .state()
            .time_periods()
            .filter(|periods| periods.len() >= usize::from(period))
            .ok_or(CommandError::PeriodNotReported { period })?;

        let update = PeriodUpdate::parse(setting, ctx.message())?;
        let next = periods.with_update(period, update)?;
        tracing::debug!(
            device_id = %ctx.device_id(),
            period,
            setting = %setting,
            "Updating time period"
        );

        let command = ctx.builder().time_periods(&next);
        ctx.publish_and_update(command, StateChange::TimePeriods(next))?;
        Ok(())
    })
}

fn register_daily_stats(builder: &mut DeviceDefinitionBuilder) -> Result<(), RegistryError> {
    let stats = [
        ("bc", DailyStat::BatteryChargingPower, "battery_charging_power", "Battery Charging Power"),
        (
            "bs",
            DailyStat::BatteryDischargePower,
            "battery_discharge_power",
            "Battery Discharge Power",
        ),
        (
            "pt",
            DailyStat::PhotovoltaicChargingPower,
            "photovoltaic_charging_power",
            "Photovoltaic Charging Power",
        ),
        (
            "it",
            DailyStat::MicroReverseOutputPower,
            "micro_reverse_output_power",
            "Micro Reverse Output Power",
        ),
    ];
    for (key, stat, id, name) in stats {
        builder.field(
            FieldDefinition::new(key, StatePath::DailyStats(stat))
                .with_transform(transform::integer)
                .with_descriptor(
                    ControlDescriptor::sensor(id, name)
                        .with_device_class("energy")
                        .with_unit("Wh")
                        .with_state_class("total_increasing"),
                ),
        )?;
    }
    Ok(())
}

fn power_sensor(key: &str, field: CtField, id: &str, name: &str) -> FieldDefinition {
    FieldDefinition::new(key, StatePath::CtInfo(field))
        .with_transform(transform::integer)
        .with_descriptor(
            ControlDescriptor::sensor(id, name)
                .with_device_class("power")
                .with_unit("W"),
        )
}

fn register_smart_meter(builder: &mut DeviceDefinitionBuilder) -> Result<(), RegistryError> {
    let status = SmartMeterStatus::ALL.into_iter().fold(
        ControlDescriptor::sensor("ct_status", "CT Status"),
        |descriptor, status| descriptor.with_mapping(status.as_str(), status.label()),
    );

    builder
        .field(
            FieldDefinition::new("sg", StatePath::CtInfo(CtField::Connected))
                .with_transform(transform::boolean)
                .with_descriptor(
                    ControlDescriptor::binary_sensor("ct_connected", "CT Connected")
                        .with_device_class("power"),
                ),
        )?
        .field(power_sensor(
            "sp",
            CtField::AutomaticPowerSize,
            "ct_automatic_power_size",
            "CT Automatic Power Size",
        ))?
        .field(power_sensor(
            "st",
            CtField::TransmittedPower,
            "ct_transmitted_power",
            "CT Transmitted Power",
        ))?
        .field(
            FieldDefinition::new("c0", StatePath::CtInfo(CtField::ConnectedPhase))
                .with_transform(transform::connected_phase)
                .with_descriptor(
                    ControlDescriptor::select("ct_connected_phase", "CT Connected Phase")
                        .with_command("connected-phase")
                        .with_mapping("0", "Phase 1")
                        .with_mapping("1", "Phase 2")
                        .with_mapping("2", "Phase 3")
                        .with_mapping("searching", "Searching")
                        .with_mapping("unknown", "None"),
                ),
        )?
        .command(CommandDefinition::new("connected-phase", connected_phase))?
        .field(
            FieldDefinition::new("c1", StatePath::CtInfo(CtField::Status))
                .with_transform(transform::ct_status)
                .with_descriptor(status),
        )?
        .field(power_sensor("m0", CtField::Phase1, "ct_clip_power1", "CT Clip Power 1"))?
        .field(power_sensor("m1", CtField::Phase2, "ct_clip_power2", "CT Clip Power 2"))?
        .field(power_sensor("m2", CtField::Phase3, "ct_clip_power3", "CT Clip Power 3"))?
        .field(power_sensor(
            "m3",
            CtField::MicroInverterPower,
            "micro_inverter_power",
            "Micro Inverter Power",
        ))?;
    Ok(())
}

fn connected_phase(ctx: &mut CommandContext<'_>) -> Result<(), CommandError> {
    let channel: PhaseChannel = ctx.message().parse()?;
    let command = ctx.builder().connected_phase(channel);
    ctx.publish(command);
    Ok(())
}

fn register_rated_power(builder: &mut DeviceDefinitionBuilder) -> Result<(), RegistryError> {
    let rated = |key: &str, field, id: &str, name: &str| {
        FieldDefinition::new(key, StatePath::RatedPower(field))
            .with_transform(transform::integer)
            .with_descriptor(
                ControlDescriptor::sensor(id, name)
                    .with_device_class("power")
                    .with_unit("W"),
            )
    };

    builder
        .field(rated(
            "lmo",
            RatedPowerField::Output,
            "rated_output_power",
            "Rated Output Power",
        ))?
        .field(rated(
            "lmi",
            RatedPowerField::Input,
            "rated_input_power",
            "Rated Input Power",
        ))?
        .field(
            FieldDefinition::new("lmf", StatePath::RatedPower(RatedPowerField::IsLimited))
                .with_transform(transform::boolean)
                .with_descriptor(ControlDescriptor::binary_sensor(
                    "rated_power_limited",
                    "Rated Power Limited",
                )),
        )?;
    Ok(())
}

fn register_clock(builder: &mut DeviceDefinitionBuilder) -> Result<(), RegistryError> {
    builder
        .command(CommandDefinition::new("time-zone", time_zone))?
        .command(
            CommandDefinition::new("sync-time", sync_time).with_descriptor(
                ControlDescriptor::button("sync_time", "Sync Time")
                    .with_icon("mdi:clock-sync")
                    .with_command("sync-time")
                    .with_payload_press("PRESS")
                    .with_enabled_by_default(false),
            ),
        )?;
    Ok(())
}

fn time_zone(ctx: &mut CommandContext<'_>) -> Result<(), CommandError> {
    let offset = parse_integer(ctx.message())?;
    let command = ctx.builder().time_zone(offset);
    ctx.publish(command);
    Ok(())
}

/// A press sends the current local time; anything else must be an explicit
/// JSON payload.
fn sync_time(ctx: &mut CommandContext<'_>) -> Result<(), CommandError> {
    let time = if base::expect_press(ctx.message()).is_ok() {
        SyncTime::now()
    } else {
        SyncTime::from_json(ctx.message())?
    };
    let command = ctx.builder().sync_time(&time);
    ctx.publish(command);
    Ok(())
}
