// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Enumerated operating modes and smart meter (CT) codes.
//!
//! Every decoder here is total: a numeric code the table does not know maps
//! to an explicit fallback variant instead of an absent value.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::error::ValueError;

/// How the battery combines charging and discharging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ChargingMode {
    /// Charge and discharge at the same time (code 0).
    ChargeDischargeSimultaneously,
    /// Fully charge before discharging (code 1).
    ChargeThenDischarge,
}

impl ChargingMode {
    /// Decodes the `cs` protocol code.
    ///
    /// Unknown codes fall back to [`ChargingMode::ChargeDischargeSimultaneously`],
    /// the firmware default.
    #[must_use]
    pub fn from_code(raw: &str) -> Self {
        match raw.trim() {
            "1" => Self::ChargeThenDischarge,
            "0" => Self::ChargeDischargeSimultaneously,
            other => {
                tracing::debug!(code = %other, "Unmapped charging mode code");
                Self::ChargeDischargeSimultaneously
            }
        }
    }

    /// Returns the protocol code.
    #[must_use]
    pub const fn code(&self) -> i64 {
        match self {
            Self::ChargeDischargeSimultaneously => 0,
            Self::ChargeThenDischarge => 1,
        }
    }

    /// Returns the control token.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ChargeDischargeSimultaneously => "chargeDischargeSimultaneously",
            Self::ChargeThenDischarge => "chargeThenDischarge",
        }
    }
}

impl FromStr for ChargingMode {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chargeDischargeSimultaneously" => Ok(Self::ChargeDischargeSimultaneously),
            "chargeThenDischarge" => Ok(Self::ChargeThenDischarge),
            _ => Err(ValueError::InvalidChoice {
                value: s.to_string(),
                expected: "chargeDischargeSimultaneously, chargeThenDischarge",
            }),
        }
    }
}

impl fmt::Display for ChargingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Grid phase the smart meter clamp is attached to, as reported in `c0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectedPhase {
    /// Phase 1 (code 0).
    Phase1,
    /// Phase 2 (code 1).
    Phase2,
    /// Phase 3 (code 2).
    Phase3,
    /// The appliance is searching for the phase (code 3).
    Searching,
    /// No channel (code 255), also the fallback for unmapped codes.
    Unknown,
}

impl ConnectedPhase {
    /// Decodes the `c0` protocol code.
    #[must_use]
    pub fn from_code(raw: &str) -> Self {
        match raw.trim().parse::<i64>() {
            Ok(0) => Self::Phase1,
            Ok(1) => Self::Phase2,
            Ok(2) => Self::Phase3,
            Ok(3) => Self::Searching,
            Ok(255) => Self::Unknown,
            _ => {
                tracing::debug!(code = %raw, "Unmapped connected phase code");
                Self::Unknown
            }
        }
    }
}

impl Serialize for ConnectedPhase {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Phase1 => serializer.serialize_u8(0),
            Self::Phase2 => serializer.serialize_u8(1),
            Self::Phase3 => serializer.serialize_u8(2),
            Self::Searching => serializer.serialize_str("searching"),
            Self::Unknown => serializer.serialize_str("unknown"),
        }
    }
}

/// Channel selector sent with the `connected-phase` command.
///
/// Accepts 0-4 and 255; `auto`, `none`, `null` and `unknown` select 255.
///
/// # Examples
///
/// ```
/// use hame_bridge::types::PhaseChannel;
///
/// assert_eq!("auto".parse::<PhaseChannel>().unwrap().code(), 255);
/// assert_eq!("2".parse::<PhaseChannel>().unwrap().code(), 2);
/// assert!("7".parse::<PhaseChannel>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PhaseChannel(u8);

impl PhaseChannel {
    /// Automatic channel detection.
    pub const AUTO: Self = Self(255);

    /// Returns the protocol code.
    #[must_use]
    pub const fn code(&self) -> u8 {
        self.0
    }
}

impl FromStr for PhaseChannel {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if matches!(
            s.to_ascii_lowercase().as_str(),
            "auto" | "none" | "null" | "unknown"
        ) {
            return Ok(Self::AUTO);
        }
        let invalid = || ValueError::InvalidChoice {
            value: s.to_string(),
            expected: "0, 1, 2, 3, 4, 255, auto",
        };
        match s.trim().parse::<u8>().map_err(|_| invalid())? {
            channel @ (0..=4 | 255) => Ok(Self(channel)),
            _ => Err(invalid()),
        }
    }
}

/// Diagnosis status of the smart meter clamp, as reported in `c1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SmartMeterStatus {
    /// Preparing to diagnose, step 1 (code 5).
    Preparing1,
    /// Preparing to diagnose, step 2 (code 6).
    Preparing2,
    /// Diagnosing the CT equipment (code 7).
    DiagnosingEquipment,
    /// Diagnosing the CT channel (code 8).
    DiagnosingChannel,
    /// Diagnosis timed out (code 9).
    DiagnosisTimeout,
    /// Charging in progress (code 10).
    ChargingInProgress,
    /// No channel could be found (code 11).
    UnableToFindChannel,
    /// Not in diagnosis; every other code.
    NotInDiagnosis,
}

impl SmartMeterStatus {
    /// All variants, in code order.
    pub const ALL: [Self; 8] = [
        Self::Preparing1,
        Self::Preparing2,
        Self::DiagnosingEquipment,
        Self::DiagnosingChannel,
        Self::DiagnosisTimeout,
        Self::ChargingInProgress,
        Self::UnableToFindChannel,
        Self::NotInDiagnosis,
    ];

    /// Decodes the `c1` protocol code.
    ///
    /// Any code outside 5-11, including negative, huge or non-numeric
    /// values, decodes to [`SmartMeterStatus::NotInDiagnosis`].
    #[must_use]
    pub fn from_code(raw: &str) -> Self {
        match raw.trim().parse::<i64>() {
            Ok(5) => Self::Preparing1,
            Ok(6) => Self::Preparing2,
            Ok(7) => Self::DiagnosingEquipment,
            Ok(8) => Self::DiagnosingChannel,
            Ok(9) => Self::DiagnosisTimeout,
            Ok(10) => Self::ChargingInProgress,
            Ok(11) => Self::UnableToFindChannel,
            Ok(0) => Self::NotInDiagnosis,
            _ => {
                tracing::debug!(code = %raw, "Unmapped CT status code");
                Self::NotInDiagnosis
            }
        }
    }

    /// Returns the state token.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Preparing1 => "preparing1",
            Self::Preparing2 => "preparing2",
            Self::DiagnosingEquipment => "diagnosingEquipment",
            Self::DiagnosingChannel => "diagnosingChannel",
            Self::DiagnosisTimeout => "diagnosisTimeout",
            Self::ChargingInProgress => "chargingInProgress",
            Self::UnableToFindChannel => "unableToFindChannel",
            Self::NotInDiagnosis => "notInDiagnosis",
        }
    }

    /// Returns the display label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Preparing1 => "Preparing to diagnose CT001 (Step 1)",
            Self::Preparing2 => "Preparing to diagnose CT001 (Step 2)",
            Self::DiagnosingEquipment => "Diagnosing CT001 equipment",
            Self::DiagnosingChannel => "Diagnosing CT001 channel",
            Self::DiagnosisTimeout => "Diagnosis timeout",
            Self::ChargingInProgress => "Charging in progress",
            Self::UnableToFindChannel => "Unable to find channel",
            Self::NotInDiagnosis => "Not in diagnosis",
        }
    }
}
