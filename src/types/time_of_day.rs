// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Time of day used by the discharge schedule.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ValueError;

/// A wall-clock time with minute resolution.
///
/// Always rendered as zero-padded `HH:MM`.
///
/// Two parsers exist because the two directions disagree on strictness:
/// control messages must match `^([0-1]?[0-9]|2[0-3]):[0-5][0-9]$` exactly
/// ([`FromStr`]), while the appliance reports unpadded values such as `0:0`
/// ([`TimeOfDay::parse_reported`]).
///
/// # Examples
///
/// ```
/// use hame_bridge::types::TimeOfDay;
///
/// let t: TimeOfDay = "7:05".parse().unwrap();
/// assert_eq!(t.to_string(), "07:05");
///
/// assert!("24:00".parse::<TimeOfDay>().is_err());
/// assert!("12:5".parse::<TimeOfDay>().is_err());
///
/// let reported = TimeOfDay::parse_reported("0:0").unwrap();
/// assert_eq!(reported.to_string(), "00:00");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TimeOfDay {
    hour: u8,
    minute: u8,
}

impl TimeOfDay {
    /// Midnight, `00:00`.
    pub const MIDNIGHT: Self = Self { hour: 0, minute: 0 };

    /// Last minute of the day, `23:59`.
    pub const END_OF_DAY: Self = Self {
        hour: 23,
        minute: 59,
    };

    /// Creates a time of day.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::OutOfRange` if the hour exceeds 23 or the minute
    /// exceeds 59.
    pub fn new(hour: u8, minute: u8) -> Result<Self, ValueError> {
        if hour > 23 {
            return Err(ValueError::OutOfRange {
                min: 0,
                max: 23,
                actual: i64::from(hour),
            });
        }
        if minute > 59 {
            return Err(ValueError::OutOfRange {
                min: 0,
                max: 59,
                actual: i64::from(minute),
            });
        }
        Ok(Self { hour, minute })
    }

    /// Parses a time as reported by the appliance.
    ///
    /// Hours and minutes may each be one or two digits.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::InvalidTime` for anything that is not `H:M`
    /// with in-range components.
    pub fn parse_reported(raw: &str) -> Result<Self, ValueError> {
        let invalid = || ValueError::InvalidTime(raw.to_string());
        let (hour, minute) = raw.trim().split_once(':').ok_or_else(invalid)?;
        let hour = parse_component(hour, 1).ok_or_else(invalid)?;
        let minute = parse_component(minute, 1).ok_or_else(invalid)?;
        Self::new(hour, minute).map_err(|_| invalid())
    }

    /// Returns the hour (0-23).
    #[must_use]
    pub const fn hour(&self) -> u8 {
        self.hour
    }

    /// Returns the minute (0-59).
    #[must_use]
    pub const fn minute(&self) -> u8 {
        self.minute
    }
}

/// Parses one or two ASCII digits; `min_len` is the shortest accepted width.
fn parse_component(s: &str, min_len: usize) -> Option<u8> {
    if s.len() < min_len || s.len() > 2 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

impl FromStr for TimeOfDay {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValueError::InvalidTime(s.to_string());
        let (hour, minute) = s.split_once(':').ok_or_else(invalid)?;
        let hour = parse_component(hour, 1).ok_or_else(invalid)?;
        let minute = parse_component(minute, 2).ok_or_else(invalid)?;
        Self::new(hour, minute).map_err(|_| invalid())
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
