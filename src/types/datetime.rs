// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Clock synchronisation payload.

use chrono::{Datelike, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::ValueError;

/// Timezone offset sent when the user only presses the sync button.
pub const DEFAULT_TIMEZONE_OFFSET: i64 = 480;

/// Date and time pushed to the appliance by the `sync-time` command.
///
/// The wire format counts years from 1900 and months from zero.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use hame_bridge::types::SyncTime;
///
/// let dt = NaiveDate::from_ymd_opt(2024, 1, 15)
///     .unwrap()
///     .and_hms_opt(10, 30, 5)
///     .unwrap();
/// let sync = SyncTime::from_datetime(dt, 480);
///
/// assert_eq!(sync.year, 124);
/// assert_eq!(sync.month, 0);
/// assert_eq!(sync.day, 15);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncTime {
    /// Timezone offset.
    #[serde(rename = "wy")]
    pub timezone_offset: i64,
    /// Years since 1900.
    #[serde(rename = "yy")]
    pub year: i64,
    /// Month, zero-based.
    #[serde(rename = "mm")]
    pub month: i64,
    /// Day of month.
    #[serde(rename = "rr")]
    pub day: i64,
    /// Hour.
    #[serde(rename = "hh")]
    pub hour: i64,
    /// Minute.
    #[serde(rename = "mn")]
    pub minute: i64,
    /// Second.
    #[serde(rename = "ss")]
    pub second: i64,
}

impl SyncTime {
    /// Builds the payload for a local date and time.
    #[must_use]
    pub fn from_datetime(dt: NaiveDateTime, timezone_offset: i64) -> Self {
        Self {
            timezone_offset,
            year: i64::from(dt.year()) - 1900,
            month: i64::from(dt.month0()),
            day: i64::from(dt.day()),
            hour: i64::from(dt.hour()),
            minute: i64::from(dt.minute()),
            second: i64::from(dt.second()),
        }
    }

    /// Builds the payload for the current local time.
    #[must_use]
    pub fn now() -> Self {
        Self::from_datetime(chrono::Local::now().naive_local(), DEFAULT_TIMEZONE_OFFSET)
    }

    /// Parses an explicit JSON payload.
    ///
    /// All seven keys must be present; zero is a legal value for each.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::InvalidSyncTime` when the message is not a JSON
    /// object with integer values for every key.
    pub fn from_json(message: &str) -> Result<Self, ValueError> {
        serde_json::from_str(message).map_err(|e| ValueError::InvalidSyncTime(e.to_string()))
    }

    /// Returns the wire parameters in protocol order.
    #[must_use]
    pub fn params(&self) -> [(&'static str, i64); 7] {
        [
            ("wy", self.timezone_offset),
            ("yy", self.year),
            ("mm", self.month),
            ("rr", self.day),
            ("hh", self.hour),
            ("mn", self.minute),
            ("ss", self.second),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn from_datetime_uses_wire_offsets() {
        let dt = NaiveDate::from_ymd_opt(2025, 12, 31)
            .unwrap()
            .and_hms_opt(23, 59, 58)
            .unwrap();
        let sync = SyncTime::from_datetime(dt, 60);
        assert_eq!(
            sync.params(),
            [
                ("wy", 60),
                ("yy", 125),
                ("mm", 11),
                ("rr", 31),
                ("hh", 23),
                ("mn", 59),
                ("ss", 58)
            ]
        );
    }

    #[test]
    fn json_requires_every_key() {
        let full = r#"{"wy":480,"yy":124,"mm":0,"rr":1,"hh":0,"mn":0,"ss":0}"#;
        let sync = SyncTime::from_json(full).unwrap();
        assert_eq!(sync.month, 0);
        assert_eq!(sync.timezone_offset, 480);

        let missing = r#"{"wy":480,"yy":124,"mm":0,"rr":1,"hh":0,"mn":0}"#;
        assert!(matches!(
            SyncTime::from_json(missing),
            Err(ValueError::InvalidSyncTime(_))
        ));
    }

    #[test]
    fn json_rejects_garbage() {
        assert!(SyncTime::from_json("not json").is_err());
        assert!(SyncTime::from_json(r#"{"wy":"x"}"#).is_err());
    }
}
