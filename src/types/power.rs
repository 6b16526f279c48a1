// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Power-related value types and boolean control tokens.

use std::fmt;
use std::str::FromStr;

use crate::error::ValueError;

/// Parses a decimal integer control message.
///
/// Surrounding whitespace is ignored; anything else that is not an integer
/// is rejected.
///
/// # Errors
///
/// Returns `ValueError::InvalidInteger` when the message is not a decimal
/// integer.
pub fn parse_integer(message: &str) -> Result<i64, ValueError> {
    message
        .trim()
        .parse()
        .map_err(|_| ValueError::InvalidInteger(message.to_string()))
}

/// Parses a boolean-ish control token.
///
/// `true`, `1` and `ON` switch on; `false`, `0` and `OFF` switch off. Case is
/// ignored.
///
/// # Errors
///
/// Returns `ValueError::InvalidBoolean` for any other token.
///
/// # Examples
///
/// ```
/// use hame_bridge::types::parse_switch;
///
/// assert_eq!(parse_switch("ON"), Ok(true));
/// assert_eq!(parse_switch("0"), Ok(false));
/// assert!(parse_switch("maybe").is_err());
/// ```
pub fn parse_switch(message: &str) -> Result<bool, ValueError> {
    match message.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "on" => Ok(true),
        "false" | "0" | "off" => Ok(false),
        _ => Err(ValueError::InvalidBoolean(message.to_string())),
    }
}

/// Output power of a scheduled discharge period, in watts (80-800).
///
/// # Examples
///
/// ```
/// use hame_bridge::types::OutputPower;
///
/// let power: OutputPower = "400".parse().unwrap();
/// assert_eq!(power.watts(), 400);
///
/// assert!(OutputPower::new(79).is_err());
/// assert!(OutputPower::new(801).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OutputPower(u16);

impl OutputPower {
    /// Lowest accepted output.
    pub const MIN: Self = Self(80);

    /// Highest accepted output.
    pub const MAX: Self = Self(800);

    /// Creates an output power value.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::OutOfRange` outside [80, 800].
    pub fn new(watts: i64) -> Result<Self, ValueError> {
        if watts < i64::from(Self::MIN.0) || watts > i64::from(Self::MAX.0) {
            return Err(ValueError::OutOfRange {
                min: i64::from(Self::MIN.0),
                max: i64::from(Self::MAX.0),
                actual: watts,
            });
        }
        // Range checked above.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Ok(Self(watts as u16))
    }

    /// Returns the power in watts.
    #[must_use]
    pub const fn watts(&self) -> u16 {
        self.0
    }
}

impl FromStr for OutputPower {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(parse_integer(s)?)
    }
}

impl fmt::Display for OutputPower {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}W", self.0)
    }
}

/// Battery discharge depth in percent (0-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DischargeDepth(u8);

impl DischargeDepth {
    /// Creates a discharge depth.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::OutOfRange` above 100 or below 0.
    pub fn new(percent: i64) -> Result<Self, ValueError> {
        if !(0..=100).contains(&percent) {
            return Err(ValueError::OutOfRange {
                min: 0,
                max: 100,
                actual: percent,
            });
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Ok(Self(percent as u8))
    }

    /// Returns the depth in percent.
    #[must_use]
    pub const fn percent(&self) -> u8 {
        self.0
    }
}

impl FromStr for DischargeDepth {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(parse_integer(s)?)
    }
}
