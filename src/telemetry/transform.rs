// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Decode transforms for raw protocol scalars.
//!
//! Every transform is a plain function from the raw string to a
//! [`FieldValue`]. Enumerated codes are total: unmapped codes fold into an
//! explicit fallback instead of failing.

use crate::error::ValueError;
use crate::state::FieldValue;
use crate::types::{ChargingMode, ConnectedPhase, SmartMeterStatus, TimeOfDay, parse_integer};

/// Signature shared by all decode transforms.
pub type Transform = fn(&str) -> Result<FieldValue, ValueError>;

/// Passes the raw string through unchanged.
///
/// # Errors
///
/// Never fails.
pub fn text(raw: &str) -> Result<FieldValue, ValueError> {
    Ok(FieldValue::Text(raw.to_string()))
}

/// Decodes a decimal integer.
///
/// # Errors
///
/// Returns `ValueError::InvalidInteger` for non-numeric input.
pub fn integer(raw: &str) -> Result<FieldValue, ValueError> {
    parse_integer(raw).map(FieldValue::Integer)
}

/// Decodes a protocol boolean.
///
/// Any non-zero integer is `true`; `true`/`false` are accepted as well.
///
/// # Errors
///
/// Returns `ValueError::InvalidBoolean` for anything else.
pub fn boolean(raw: &str) -> Result<FieldValue, ValueError> {
    let raw_trimmed = raw.trim();
    if let Ok(n) = raw_trimmed.parse::<i64>() {
        return Ok(FieldValue::Bool(n != 0));
    }
    match raw_trimmed.to_ascii_lowercase().as_str() {
        "true" => Ok(FieldValue::Bool(true)),
        "false" => Ok(FieldValue::Bool(false)),
        _ => Err(ValueError::InvalidBoolean(raw.to_string())),
    }
}

/// Decodes a reported time of day such as `8:0` or `08:00`.
///
/// # Errors
///
/// Returns `ValueError::InvalidTime` if the value is not `H:M`.
pub fn time_string(raw: &str) -> Result<FieldValue, ValueError> {
    TimeOfDay::parse_reported(raw).map(FieldValue::Time)
}

/// Decodes the charging mode code.
///
/// # Errors
///
/// Never fails; unmapped codes fall back to simultaneous charging.
pub fn charging_mode(raw: &str) -> Result<FieldValue, ValueError> {
    Ok(FieldValue::ChargingMode(ChargingMode::from_code(raw)))
}

/// Decodes the smart meter phase code.
///
/// # Errors
///
/// Never fails; unmapped codes fall back to `unknown`.
pub fn connected_phase(raw: &str) -> Result<FieldValue, ValueError> {
    Ok(FieldValue::ConnectedPhase(ConnectedPhase::from_code(raw)))
}

/// Decodes a reported period output value in watts.
///
/// The schedule stores watts as `u16`; anything outside that is rejected
/// here so it is skipped with the other undecodable fields.
///
/// # Errors
///
/// Returns `ValueError::InvalidInteger` or `ValueError::OutOfRange`.
pub fn output_value(raw: &str) -> Result<FieldValue, ValueError> {
    let watts = parse_integer(raw)?;
    if u16::try_from(watts).is_err() {
        return Err(ValueError::OutOfRange {
            min: 0,
            max: i64::from(u16::MAX),
            actual: watts,
        });
    }
    Ok(FieldValue::Integer(watts))
}

/// Decodes the smart meter diagnosis status.
///
/// # Errors
///
/// Never fails; unmapped codes fall back to `notInDiagnosis`.
pub fn ct_status(raw: &str) -> Result<FieldValue, ValueError> {
    Ok(FieldValue::CtStatus(SmartMeterStatus::from_code(raw)))
}
