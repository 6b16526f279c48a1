// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device state management types.
//!
//! [`DeviceState`] is the typed state tree of one appliance. It is changed
//! only by handing a [`StateChange`] to a [`StateUpdater`], which applies it
//! atomically and notifies the registered [`StateObservers`].
//!
//! # Examples
//!
//! ```
//! use hame_bridge::state::{DeviceState, FieldValue, StateChange, StateObservers, StatePath};
//! use hame_bridge::device::{DeviceSession, b2500_v2};
//! use std::sync::Arc;
//!
//! let definition = Arc::new(b2500_v2::definition().unwrap());
//! let mut session = DeviceSession::new("0123456789ab", definition);
//!
//! session.handle_telegram(&"pe=87".parse().unwrap());
//! assert_eq!(session.state().battery_percentage(), Some(87));
//! ```

mod device_state;
mod state_change;
mod time_period;
mod updater;

pub use device_state::{ChannelState, CtInfo, DailyStats, DeviceState, RatedPower, Temperature};
pub use state_change::{
    Channel, ChannelField, CtField, DailyStat, FieldValue, RatedPowerField, StateChange, StatePath,
};
pub use time_period::{PERIOD_COUNT, PeriodSetting, PeriodUpdate, TimePeriod, TimePeriods};
pub use updater::{StateObservers, StateUpdater, SubscriptionId};
