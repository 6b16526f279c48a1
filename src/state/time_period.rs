// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Scheduled discharge periods.
//!
//! The appliance holds five discharge windows. They are reported field by
//! field (`d*`, `e*`, `f*`, `h*`) and written back as a whole, because the
//! protocol has no single-slot update.
//!
//! [`TimePeriods`] is never mutated in place by command handlers:
//! [`TimePeriods::with_update`] returns a fresh copy with one setting
//! changed, leaving the snapshot it was called on untouched.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::{CommandError, StateError, ValueError};
use crate::types::{OutputPower, TimeOfDay, parse_switch};

use super::FieldValue;

/// Number of discharge periods the appliance supports.
pub const PERIOD_COUNT: usize = 5;

/// One of the four settings of a discharge period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PeriodSetting {
    /// Whether the period is active.
    Enabled,
    /// Start of the window.
    StartTime,
    /// End of the window.
    EndTime,
    /// Output power during the window.
    OutputValue,
}

impl PeriodSetting {
    /// All settings in wire order.
    pub const ALL: [Self; 4] = [
        Self::Enabled,
        Self::StartTime,
        Self::EndTime,
        Self::OutputValue,
    ];

    /// Returns the command suffix (`time-period/<n>/<suffix>`).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Enabled => "enabled",
            Self::StartTime => "start-time",
            Self::EndTime => "end-time",
            Self::OutputValue => "output-value",
        }
    }

    /// Returns the state field name.
    #[must_use]
    pub const fn field_name(&self) -> &'static str {
        match self {
            Self::Enabled => "enabled",
            Self::StartTime => "startTime",
            Self::EndTime => "endTime",
            Self::OutputValue => "outputValue",
        }
    }
}

impl FromStr for PeriodSetting {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|setting| setting.as_str() == s)
            .ok_or_else(|| ValueError::InvalidChoice {
                value: s.to_string(),
                expected: "enabled, start-time, end-time, output-value",
            })
    }
}

impl fmt::Display for PeriodSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated change to one setting of one period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodUpdate {
    /// Enable or disable the period.
    Enabled(bool),
    /// Move the start of the window.
    StartTime(TimeOfDay),
    /// Move the end of the window.
    EndTime(TimeOfDay),
    /// Change the output power.
    OutputValue(OutputPower),
}

impl PeriodUpdate {
    /// Validates a control message for the given setting.
    ///
    /// # Errors
    ///
    /// Returns the validation error of the setting: a boolean token for
    /// `enabled`, strict `HH:MM` for the times, an integer in [80, 800]
    /// for the output value.
    pub fn parse(setting: PeriodSetting, message: &str) -> Result<Self, ValueError> {
        Ok(match setting {
            PeriodSetting::Enabled => Self::Enabled(parse_switch(message)?),
            PeriodSetting::StartTime => Self::StartTime(message.parse()?),
            PeriodSetting::EndTime => Self::EndTime(message.parse()?),
            PeriodSetting::OutputValue => Self::OutputValue(message.parse()?),
        })
    }
}

/// One discharge window.
///
/// Each setting is `None` until the appliance has reported it. A period is
/// only written back once all four settings are known.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimePeriod {
    /// Whether the period is active.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    /// Start of the window.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<TimeOfDay>,
    /// End of the window.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<TimeOfDay>,
    /// Output power in watts, as last reported or written.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_value: Option<u16>,
}

impl TimePeriod {
    /// Creates a period with every setting known.
    #[must_use]
    pub const fn new(
        enabled: bool,
        start_time: TimeOfDay,
        end_time: TimeOfDay,
        output_value: u16,
    ) -> Self {
        Self {
            enabled: Some(enabled),
            start_time: Some(start_time),
            end_time: Some(end_time),
            output_value: Some(output_value),
        }
    }

    /// Returns `true` once all four settings are known.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.enabled.is_some()
            && self.start_time.is_some()
            && self.end_time.is_some()
            && self.output_value.is_some()
    }

    fn apply(&mut self, update: PeriodUpdate) {
        match update {
            PeriodUpdate::Enabled(enabled) => self.enabled = Some(enabled),
            PeriodUpdate::StartTime(time) => self.start_time = Some(time),
            PeriodUpdate::EndTime(time) => self.end_time = Some(time),
            PeriodUpdate::OutputValue(power) => self.output_value = Some(power.watts()),
        }
    }
}

/// The ordered discharge schedule.
///
/// Periods are created in index order as the appliance reports them and the
/// sequence never grows past [`PERIOD_COUNT`] or shrinks.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct TimePeriods(Vec<TimePeriod>);

impl TimePeriods {
    /// Creates a full schedule.
    #[must_use]
    pub fn new(periods: [TimePeriod; PERIOD_COUNT]) -> Self {
        Self(periods.to_vec())
    }

    /// Returns the number of periods reported so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if no period has been reported.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the period at a zero-based index.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&TimePeriod> {
        self.0.get(index)
    }

    /// Iterates over the periods in order.
    pub fn iter(&self) -> impl Iterator<Item = &TimePeriod> {
        self.0.iter()
    }

    /// Returns a copy with one setting of one period changed.
    ///
    /// `period` is 1-based. Every record is cloned; `self` is unchanged.
    /// The copy is the schedule that gets written back, so every period in
    /// it must be complete after the update.
    ///
    /// # Errors
    ///
    /// Returns `CommandError::PeriodNotReported` when the period is outside
    /// 1-5 or has not been reported yet, or naming the first period that
    /// still lacks a reported setting.
    pub fn with_update(&self, period: u8, update: PeriodUpdate) -> Result<Self, CommandError> {
        let index = usize::from(period)
            .checked_sub(1)
            .filter(|index| *index < self.0.len())
            .ok_or(CommandError::PeriodNotReported { period })?;

        let mut periods = self.0.clone();
        periods[index].apply(update);

        if let Some((incomplete, _)) = (1_u8..).zip(&periods).find(|(_, p)| !p.is_complete()) {
            return Err(CommandError::PeriodNotReported { period: incomplete });
        }
        Ok(Self(periods))
    }

    /// Stores one decoded setting, creating empty periods up to `index`.
    pub(crate) fn set_reported(
        &mut self,
        index: usize,
        setting: PeriodSetting,
        value: &FieldValue,
    ) -> Result<(), StateError> {
        if index >= PERIOD_COUNT {
            return Err(StateError::PeriodIndex(index));
        }
        let mismatch = || StateError::TypeMismatch {
            path: super::StatePath::TimePeriod { index, setting },
            found: value.kind(),
        };

        let assign: Box<dyn FnOnce(&mut TimePeriod)> = match (setting, value) {
            (PeriodSetting::Enabled, FieldValue::Bool(enabled)) => {
                let enabled = *enabled;
                Box::new(move |period| period.enabled = Some(enabled))
            }
            (PeriodSetting::StartTime, FieldValue::Time(time)) => {
                let time = *time;
                Box::new(move |period| period.start_time = Some(time))
            }
            (PeriodSetting::EndTime, FieldValue::Time(time)) => {
                let time = *time;
                Box::new(move |period| period.end_time = Some(time))
            }
            (PeriodSetting::OutputValue, FieldValue::Integer(watts)) => {
                let watts = u16::try_from(*watts).map_err(|_| mismatch())?;
                Box::new(move |period| period.output_value = Some(watts))
            }
            _ => return Err(mismatch()),
        };

        if self.0.len() <= index {
            self.0.resize_with(index + 1, TimePeriod::default);
        }
        assign(&mut self.0[index]);
        Ok(())
    }
}

impl<'a> IntoIterator for &'a TimePeriods {
    type Item = &'a TimePeriod;
    type IntoIter = std::slice::Iter<'a, TimePeriod>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schedule() -> TimePeriods {
        let periods = std::array::from_fn(|i| {
            let hour = u8::try_from(i).unwrap() * 4;
            TimePeriod::new(
                false,
                TimeOfDay::new(hour, 0).unwrap(),
                TimeOfDay::new(hour + 2, 30).unwrap(),
                100 * (u16::try_from(i).unwrap() + 1),
            )
        });
        TimePeriods::new(periods)
    }

    #[test]
    fn setting_tokens_round_trip() {
        for setting in PeriodSetting::ALL {
            assert_eq!(setting.as_str().parse::<PeriodSetting>(), Ok(setting));
        }
        assert!("duration".parse::<PeriodSetting>().is_err());
    }

    #[test]
    fn with_update_leaves_original_untouched() {
        let before = schedule();
        let after = before
            .with_update(3, PeriodUpdate::Enabled(true))
            .unwrap();

        assert_eq!(before.get(2).unwrap().enabled, Some(false));
        assert_eq!(after.get(2).unwrap().enabled, Some(true));
        assert_eq!(after.get(2).unwrap().start_time, before.get(2).unwrap().start_time);
        for i in [0, 1, 3, 4] {
            assert_eq!(after.get(i), before.get(i));
        }
    }

    #[test]
    fn with_update_requires_reported_period() {
        let mut partial = schedule();
        partial.0.truncate(3);

        assert_eq!(
            partial.with_update(4, PeriodUpdate::Enabled(true)),
            Err(CommandError::PeriodNotReported { period: 4 })
        );
        assert!(partial.with_update(3, PeriodUpdate::Enabled(false)).is_ok());
        assert_eq!(
            partial.with_update(0, PeriodUpdate::Enabled(true)),
            Err(CommandError::PeriodNotReported { period: 0 })
        );
    }

    #[test]
    fn with_update_refuses_incomplete_periods() {
        let mut partial = TimePeriods::default();
        partial
            .set_reported(2, PeriodSetting::Enabled, &FieldValue::Bool(true))
            .unwrap();
        assert_eq!(partial.len(), 3);
        assert_eq!(partial.get(0), Some(&TimePeriod::default()));

        assert_eq!(
            partial.with_update(3, PeriodUpdate::Enabled(false)),
            Err(CommandError::PeriodNotReported { period: 1 })
        );
    }

    #[test]
    fn with_update_may_supply_the_last_missing_setting() {
        let mut partial = TimePeriods::default();
        let time = FieldValue::Time(TimeOfDay::new(8, 0).unwrap());
        partial.set_reported(0, PeriodSetting::Enabled, &FieldValue::Bool(true)).unwrap();
        partial.set_reported(0, PeriodSetting::StartTime, &time).unwrap();
        partial.set_reported(0, PeriodSetting::EndTime, &time).unwrap();
        assert!(!partial.get(0).unwrap().is_complete());

        let next = partial
            .with_update(1, PeriodUpdate::OutputValue(OutputPower::MIN))
            .unwrap();
        assert!(next.get(0).unwrap().is_complete());
    }

    #[test]
    fn parse_update_validates_per_setting() {
        assert_eq!(
            PeriodUpdate::parse(PeriodSetting::Enabled, "ON"),
            Ok(PeriodUpdate::Enabled(true))
        );
        assert!(PeriodUpdate::parse(PeriodSetting::StartTime, "24:00").is_err());
        assert!(PeriodUpdate::parse(PeriodSetting::EndTime, "7:5").is_err());
        assert!(PeriodUpdate::parse(PeriodSetting::OutputValue, "79").is_err());
        assert_eq!(
            PeriodUpdate::parse(PeriodSetting::OutputValue, "800"),
            Ok(PeriodUpdate::OutputValue(OutputPower::MAX))
        );
    }

    #[test]
    fn reported_values_never_exceed_five_periods() {
        let mut periods = TimePeriods::default();
        assert_eq!(
            periods.set_reported(5, PeriodSetting::Enabled, &FieldValue::Bool(true)),
            Err(StateError::PeriodIndex(5))
        );
        assert!(periods.is_empty());
    }

    #[test]
    fn reported_value_must_match_setting_type() {
        let mut periods = TimePeriods::default();
        let err = periods
            .set_reported(0, PeriodSetting::StartTime, &FieldValue::Bool(true))
            .unwrap_err();
        assert!(matches!(err, StateError::TypeMismatch { .. }));
        assert!(periods.is_empty());
    }
}
