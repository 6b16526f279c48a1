// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Declarative field and command tables.
//!
//! Each device type owns one [`FieldRegistry`] (decode path) and one
//! [`CommandRegistry`] (control path). Both are built once and shared
//! read-only by every device of that type.
//!
//! # Examples
//!
//! ```
//! use hame_bridge::registry::{ControlDescriptor, FieldDefinition, FieldRegistry};
//! use hame_bridge::state::StatePath;
//! use hame_bridge::telemetry::transform;
//!
//! let mut fields = FieldRegistry::new();
//! fields
//!     .register(
//!         FieldDefinition::new("pe", StatePath::BatteryPercentage)
//!             .with_transform(transform::integer)
//!             .with_descriptor(ControlDescriptor::sensor(
//!                 "battery_percentage",
//!                 "Battery Percentage",
//!             )),
//!     )
//!     .unwrap();
//!
//! assert!(fields.decode_field("pe", "87").unwrap().is_some());
//! assert!(fields.decode_field("xx", "1").unwrap().is_none());
//! ```

mod command;
mod descriptor;
mod field;

pub use command::{CommandContext, CommandDefinition, CommandHandler, CommandRegistry};
pub use descriptor::{ComponentKind, ControlDescriptor};
pub use field::{FieldDefinition, FieldRegistry};
