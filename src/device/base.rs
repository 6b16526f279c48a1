// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Fields and commands shared by every B2500 generation.

use crate::error::{RegistryError, ValueError};
use crate::registry::{CommandDefinition, ControlDescriptor, FieldDefinition};
use crate::state::{Channel, ChannelField, FieldValue, StateChange, StatePath};
use crate::telemetry::transform;
use crate::types::{DischargeDepth, parse_switch};

use super::DeviceDefinitionBuilder;

/// Accepts the messages a button press arrives as.
pub(super) fn expect_press(message: &str) -> Result<(), ValueError> {
    if matches!(message, "PRESS" | "press" | "true" | "1") {
        Ok(())
    } else {
        Err(ValueError::InvalidChoice {
            value: message.to_string(),
            expected: "PRESS",
        })
    }
}

pub(super) fn register_fields(builder: &mut DeviceDefinitionBuilder) -> Result<(), RegistryError> {
    builder
        .field(
            FieldDefinition::new("pe", StatePath::BatteryPercentage)
                .with_transform(transform::integer)
                .with_descriptor(
                    ControlDescriptor::sensor("battery_percentage", "Battery Percentage")
                        .with_device_class("battery")
                        .with_unit("%"),
                ),
        )?
        .field(
            FieldDefinition::new("kn", StatePath::BatteryCapacity)
                .with_transform(transform::integer)
                .with_descriptor(
                    ControlDescriptor::sensor("battery_capacity", "Battery Capacity")
                        .with_device_class("energy_storage")
                        .with_unit("Wh"),
                ),
        )?;

    for (n, channel) in [(1, Channel::First), (2, Channel::Second)] {
        builder
            .field(
                FieldDefinition::new(
                    format!("w{n}"),
                    StatePath::SolarInput(channel, ChannelField::Power),
                )
                .with_transform(transform::integer)
                .with_descriptor(
                    ControlDescriptor::sensor(
                        format!("solar_input_power_{n}"),
                        format!("Solar Input Power {n}"),
                    )
                    .with_device_class("power")
                    .with_unit("W")
                    .with_state_class("measurement"),
                ),
            )?
            .field(
                FieldDefinition::new(
                    format!("p{n}"),
                    StatePath::SolarInput(channel, ChannelField::Active),
                )
                .with_transform(transform::boolean)
                .with_descriptor(ControlDescriptor::binary_sensor(
                    format!("solar_input_{n}_active"),
                    format!("Solar Input {n} Active"),
                )),
            )?
            .field(
                FieldDefinition::new(
                    format!("g{n}"),
                    StatePath::Output(channel, ChannelField::Power),
                )
                .with_transform(transform::integer)
                .with_descriptor(
                    ControlDescriptor::sensor(
                        format!("output_power_{n}"),
                        format!("Output Power {n}"),
                    )
                    .with_device_class("power")
                    .with_unit("W")
                    .with_state_class("measurement"),
                ),
            )?
            .field(
                FieldDefinition::new(
                    format!("o{n}"),
                    StatePath::Output(channel, ChannelField::Active),
                )
                .with_transform(transform::boolean)
                .with_descriptor(ControlDescriptor::binary_sensor(
                    format!("output_{n}_enabled"),
                    format!("Output {n} Enabled"),
                )),
            )?;
    }

    builder
        .field(
            FieldDefinition::new("do", StatePath::DischargeDepth)
                .with_transform(transform::integer)
                .with_descriptor(
                    ControlDescriptor::number("discharge_depth", "Discharge Depth")
                        .with_unit("%")
                        .with_command("discharge-depth")
                        .with_range(0, 100),
                ),
        )?
        .field(
            FieldDefinition::new("vv", StatePath::FirmwareVersion).with_descriptor(
                ControlDescriptor::sensor("firmware_version", "Firmware Version")
                    .with_icon("mdi:chip"),
            ),
        )?
        .field(
            FieldDefinition::new("tl", StatePath::TemperatureLow)
                .with_transform(transform::integer)
                .with_descriptor(
                    ControlDescriptor::sensor("temperature_min", "Minimum Temperature")
                        .with_device_class("temperature")
                        .with_unit("°C"),
                ),
        )?
        .field(
            FieldDefinition::new("th", StatePath::TemperatureHigh)
                .with_transform(transform::integer)
                .with_descriptor(
                    ControlDescriptor::sensor("temperature_max", "Maximum Temperature")
                        .with_device_class("temperature")
                        .with_unit("°C"),
                ),
        )?;
    Ok(())
}

pub(super) fn register_commands(
    builder: &mut DeviceDefinitionBuilder,
) -> Result<(), RegistryError> {
    builder
        .command(CommandDefinition::new("discharge-depth", |ctx| {
            let depth: DischargeDepth = ctx.message().parse()?;
            let command = ctx.builder().discharge_depth(depth);
            ctx.publish(command);
            Ok(())
        }))?
        .command(
            CommandDefinition::new("use-flash-commands", |ctx| {
                let enabled = parse_switch(ctx.message())?;
                tracing::info!(
                    device_id = %ctx.device_id(),
                    enabled,
                    "Switching command encoding"
                );
                ctx.apply(&StateChange::field(
                    StatePath::UseFlashCommands,
                    FieldValue::Bool(enabled),
                ))?;
                Ok(())
            })
            .with_descriptor(
                ControlDescriptor::switch("use_flash_commands", "Use Flash Commands")
                    .with_icon("mdi:memory")
                    .with_command("use-flash-commands")
                    .with_enabled_by_default(false),
            ),
        )?
        .command(
            CommandDefinition::new("refresh", |ctx| {
                expect_press(ctx.message())?;
                let command = ctx.refresh_command();
                ctx.publish(command);
                Ok(())
            })
            .with_descriptor(
                ControlDescriptor::button("refresh", "Refresh")
                    .with_icon("mdi:refresh")
                    .with_command("refresh")
                    .with_payload_press("PRESS"),
            ),
        )?
        .command(
            CommandDefinition::new("restart", |ctx| {
                expect_press(ctx.message())?;
                let command = ctx.builder().restart();
                ctx.publish(command);
                Ok(())
            })
            .with_descriptor(
                ControlDescriptor::button("restart", "Restart")
                    .with_device_class("restart")
                    .with_command("restart")
                    .with_payload_press("PRESS"),
            ),
        )?
        .command(
            CommandDefinition::new("factory-reset", |ctx| {
                expect_press(ctx.message())?;
                let command = ctx.builder().factory_reset();
                ctx.publish(command);
                Ok(())
            })
            .with_descriptor(
                ControlDescriptor::button("factory_reset", "Factory Reset")
                    .with_icon("mdi:restore-alert")
                    .with_command("factory-reset")
                    .with_payload_press("PRESS")
                    .with_enabled_by_default(false),
            ),
        )?;
    Ok(())
}
