// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Type-safe values exchanged with the appliance.
//!
//! Constrained types validate on construction, so a value that exists is
//! always legal to send.

mod datetime;
mod mode;
mod power;
mod time_of_day;

pub use datetime::{DEFAULT_TIMEZONE_OFFSET, SyncTime};
pub use mode::{ChargingMode, ConnectedPhase, PhaseChannel, SmartMeterStatus};
pub use power::{DischargeDepth, OutputPower, parse_integer, parse_switch};
pub use time_of_day::TimeOfDay;
