// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Integration tests for the discharge schedule commands.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use hame_bridge::command::{CommandType, OutboundCommand, ParamValue};
use hame_bridge::device::{DeviceSession, b2500_v2};
use hame_bridge::error::{CommandError, ValueError};
use hame_bridge::protocol::CommandSink;
use hame_bridge::state::DeviceState;
use hame_bridge::telemetry::Telegram;
use parking_lot::Mutex;
use serde_json::json;

/// Records every published command.
#[derive(Default)]
struct RecordingSink {
    commands: Mutex<Vec<OutboundCommand>>,
}

impl RecordingSink {
    fn take(&self) -> Vec<OutboundCommand> {
        std::mem::take(&mut *self.commands.lock())
    }
}

impl CommandSink for RecordingSink {
    fn publish(&self, command: OutboundCommand) {
        self.commands.lock().push(command);
    }
}

/// Five distinct periods as the appliance reports them.
const FULL_SCHEDULE: &str = "d1=1,e1=0:0,f1=5:59,h1=100,\
    d2=0,e2=6:00,f2=9:30,h2=200,\
    d3=0,e3=10:00,f3=13:15,h3=300,\
    d4=1,e4=14:00,f4=17:45,h4=400,\
    d5=0,e5=18:00,f5=23:59,h5=500";

fn session_with(telegram: &str) -> DeviceSession {
    let mut session = DeviceSession::new("0123456789ab", Arc::new(b2500_v2::definition().unwrap()));
    session.handle_telegram(&Telegram::parse(telegram));
    session
}

fn int(value: i64) -> ParamValue {
    ParamValue::Int(value)
}

fn text(value: &str) -> ParamValue {
    ParamValue::Text(value.to_string())
}

// ============================================================================
// Validation
// ============================================================================

mod validation {
    use super::*;

    #[test]
    fn every_valid_time_is_accepted() {
        let mut session = session_with(FULL_SCHEDULE);
        let sink = RecordingSink::default();

        for hour in 0..24 {
            for minute in 0..60 {
                let time = format!("{hour:02}:{minute:02}");
                session
                    .handle_control("time-period/2/start-time", &time, &sink)
                    .unwrap();
                let periods = session.state().time_periods().unwrap();
                assert_eq!(periods.get(1).unwrap().start_time.unwrap().to_string(), time);
            }
        }
        assert_eq!(sink.take().len(), 24 * 60);
    }

    #[test]
    fn single_digit_hour_is_accepted() {
        let mut session = session_with(FULL_SCHEDULE);
        let sink = RecordingSink::default();

        session
            .handle_control("time-period/2/end-time", "7:05", &sink)
            .unwrap();
        let periods = session.state().time_periods().unwrap();
        assert_eq!(periods.get(1).unwrap().end_time.unwrap().to_string(), "07:05");
        assert_eq!(sink.take()[0].params.get("e2"), Some(&text("07:05")));
    }

    #[test]
    fn invalid_times_are_rejected_without_side_effects() {
        let mut session = session_with(FULL_SCHEDULE);
        let sink = RecordingSink::default();
        let before = session.state().clone();

        for time in [
            "24:00", "23:60", "07:5", "0730", "07:30:00", " 07:30", "", "ab:cd", "-1:00", "123:00",
        ] {
            for setting in ["start-time", "end-time"] {
                let err = session
                    .handle_control(&format!("time-period/1/{setting}"), time, &sink)
                    .unwrap_err();
                assert!(
                    matches!(err, CommandError::Value(ValueError::InvalidTime(_))),
                    "{time:?} was not rejected as a time: {err}"
                );
            }
        }

        assert_eq!(*session.state(), before);
        assert!(sink.take().is_empty());
    }

    #[test]
    fn output_value_bounds() {
        let mut session = session_with(FULL_SCHEDULE);
        let sink = RecordingSink::default();

        for watts in [80, 81, 400, 799, 800] {
            session
                .handle_control("time-period/5/output-value", &watts.to_string(), &sink)
                .unwrap();
            let periods = session.state().time_periods().unwrap();
            assert_eq!(periods.get(4).unwrap().output_value.map(i64::from), Some(watts));
        }
        assert_eq!(sink.take().len(), 5);

        let before = session.state().clone();
        for message in ["79", "801", "0", "-80", "abc", "80W", "", "8e2"] {
            assert!(
                session
                    .handle_control("time-period/5/output-value", message, &sink)
                    .is_err(),
                "{message:?} was accepted"
            );
        }
        assert_eq!(*session.state(), before);
        assert!(sink.take().is_empty());
    }

    #[test]
    fn enabled_requires_a_switch_token() {
        let mut session = session_with(FULL_SCHEDULE);
        let sink = RecordingSink::default();

        assert!(session.handle_control("time-period/1/enabled", "maybe", &sink).is_err());
        assert!(sink.take().is_empty());
    }
}

// ============================================================================
// Full-schedule writes
// ============================================================================

mod schedule_writes {
    use super::*;

    #[test]
    fn enabling_period_three_preserves_other_slots() {
        let mut session = session_with(FULL_SCHEDULE);
        let sink = RecordingSink::default();

        session
            .handle_control("time-period/3/enabled", "true", &sink)
            .unwrap();

        let commands = sink.take();
        assert_eq!(commands.len(), 1);
        let cmd = &commands[0];
        assert_eq!(cmd.command, CommandType::TimedDischarge);
        assert_eq!(cmd.code, 20);

        let params = &cmd.params;
        assert_eq!(params.iter().next(), Some(("md", &int(0))));
        assert_eq!(params.get("a3"), Some(&int(1)));
        assert_eq!(params.get("b3"), Some(&text("10:00")));

        let expected = [
            (1, 1, "00:00", "05:59", 100),
            (2, 0, "06:00", "09:30", 200),
            (4, 1, "14:00", "17:45", 400),
            (5, 0, "18:00", "23:59", 500),
        ];
        for (n, enabled, start, end, watts) in expected {
            assert_eq!(params.get(&format!("a{n}")), Some(&int(enabled)));
            assert_eq!(params.get(&format!("b{n}")), Some(&text(start)));
            assert_eq!(params.get(&format!("e{n}")), Some(&text(end)));
            assert_eq!(params.get(&format!("v{n}")), Some(&int(watts)));
        }
    }

    #[test]
    fn payload_lists_periods_in_order() {
        let mut session = session_with(FULL_SCHEDULE);
        let sink = RecordingSink::default();

        session
            .handle_control("time-period/1/output-value", "800", &sink)
            .unwrap();

        assert_eq!(
            sink.take()[0].payload(),
            "cd=20,md=0,\
             a1=1,b1=00:00,e1=05:59,v1=800,\
             a2=0,b2=06:00,e2=09:30,v2=200,\
             a3=0,b3=10:00,e3=13:15,v3=300,\
             a4=1,b4=14:00,e4=17:45,v4=400,\
             a5=0,b5=18:00,e5=23:59,v5=500"
        );
    }

    #[test]
    fn flash_encoding_uses_base_code() {
        let mut session = session_with(FULL_SCHEDULE);
        let sink = RecordingSink::default();

        session
            .handle_control("use-flash-commands", "ON", &sink)
            .unwrap();
        assert!(sink.take().is_empty());

        session
            .handle_control("time-period/2/enabled", "1", &sink)
            .unwrap();
        assert_eq!(sink.take()[0].code, 7);
    }

    #[test]
    fn written_schedule_decodes_to_the_same_schedule() {
        let mut session = session_with(FULL_SCHEDULE);
        let sink = RecordingSink::default();
        session
            .handle_control("time-period/4/end-time", "19:05", &sink)
            .unwrap();
        let first = sink.take().remove(0);

        // Rename the outbound keys to the reported keys and decode them.
        let reported = first.params.iter().filter_map(|(key, value)| {
            let (prefix, n) = key.split_at(1);
            let prefix = match prefix {
                "a" => "d",
                "b" => "e",
                "e" => "f",
                "v" => "h",
                _ => return None,
            };
            Some((format!("{prefix}{n}"), value.to_string()))
        });
        let mut echo = session_with("");
        assert!(echo.handle_telegram(&Telegram::from_pairs(reported)));
        assert_eq!(echo.state().time_periods(), session.state().time_periods());

        // Rebuilding from the decoded schedule yields the same command.
        echo.handle_control("time-period/4/end-time", "19:05", &sink)
            .unwrap();
        assert_eq!(sink.take().remove(0), first);
    }
}

// ============================================================================
// Preconditions and sequencing
// ============================================================================

mod preconditions {
    use super::*;

    #[test]
    fn unreported_period_is_not_written() {
        let mut session = session_with("d1=1,e1=8:00,d2=0,d3=1,e3=9:00");
        assert_eq!(session.state().time_periods().unwrap().len(), 3);

        let notified = Arc::new(AtomicUsize::new(0));
        let n = Arc::clone(&notified);
        session.subscribe(move |_| {
            n.fetch_add(1, Ordering::SeqCst);
        });

        let sink = RecordingSink::default();
        let before = session.state().clone();
        for setting in ["enabled", "start-time", "end-time", "output-value"] {
            let err = session
                .handle_control(&format!("time-period/4/{setting}"), "1", &sink)
                .unwrap_err();
            assert_eq!(err, CommandError::PeriodNotReported { period: 4 });
        }

        assert_eq!(*session.state(), before);
        assert!(sink.take().is_empty());
        assert_eq!(notified.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn schedule_must_be_reported_at_all() {
        let mut session = session_with("pe=50");
        let sink = RecordingSink::default();

        assert_eq!(
            session.handle_control("time-period/1/enabled", "true", &sink),
            Err(CommandError::PeriodNotReported { period: 1 })
        );
        assert!(session.state().time_periods().is_none());
        assert!(sink.take().is_empty());
    }

    #[test]
    fn periods_created_by_a_later_report_are_not_invented() {
        let mut session = session_with("d3=1");
        let sink = RecordingSink::default();
        let before = session.state().clone();

        assert_eq!(
            session.handle_control("time-period/1/enabled", "true", &sink),
            Err(CommandError::PeriodNotReported { period: 1 })
        );
        assert_eq!(*session.state(), before);
        assert!(sink.take().is_empty());

        let document = session.state().to_json().unwrap();
        assert_eq!(document["timePeriods"][0], json!({}));
        assert_eq!(document["timePeriods"][2], json!({"enabled": true}));
    }

    #[test]
    fn missing_setting_elsewhere_blocks_the_write() {
        let partial = FULL_SCHEDULE.replace(",h2=200", "");
        let mut session = session_with(&partial);
        let sink = RecordingSink::default();

        assert_eq!(
            session.handle_control("time-period/1/output-value", "150", &sink),
            Err(CommandError::PeriodNotReported { period: 2 })
        );
        assert!(sink.take().is_empty());

        session.handle_telegram(&Telegram::parse("h2=200"));
        session
            .handle_control("time-period/1/output-value", "150", &sink)
            .unwrap();
        assert_eq!(sink.take()[0].params.get("v1"), Some(&int(150)));
    }

    #[test]
    fn sequential_updates_build_on_each_other() {
        let mut session = session_with(FULL_SCHEDULE);
        let snapshots = Arc::new(Mutex::new(Vec::<DeviceState>::new()));
        let seen = Arc::clone(&snapshots);
        session.subscribe(move |state| seen.lock().push(state.clone()));
        let sink = RecordingSink::default();

        session
            .handle_control("time-period/2/enabled", "true", &sink)
            .unwrap();
        session
            .handle_control("time-period/2/output-value", "650", &sink)
            .unwrap();

        let commands = sink.take();
        assert_eq!(commands.len(), 2);
        assert_eq!(commands[0].params.get("a2"), Some(&int(1)));
        assert_eq!(commands[0].params.get("v2"), Some(&int(200)));
        assert_eq!(commands[1].params.get("a2"), Some(&int(1)));
        assert_eq!(commands[1].params.get("v2"), Some(&int(650)));

        let snapshots = snapshots.lock();
        assert_eq!(snapshots.len(), 2);
        let second = snapshots[1].time_periods().unwrap().get(1).unwrap();
        assert_eq!(second.enabled, Some(true));
        assert_eq!(second.output_value, Some(650));
    }

    #[test]
    fn published_schedule_matches_committed_state() {
        let mut session = session_with(FULL_SCHEDULE);
        let sink = RecordingSink::default();

        session
            .handle_control("time-period/5/start-time", "20:00", &sink)
            .unwrap();

        let cmd = sink.take().remove(0);
        let periods = session.state().time_periods().unwrap();
        for (n, period) in (1..).zip(periods) {
            assert_eq!(
                cmd.params.get(&format!("b{n}")),
                Some(&text(&period.start_time.unwrap().to_string()))
            );
        }
    }
}
