// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Integration tests for telegram decoding and control dispatch.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use hame_bridge::command::{CommandType, OutboundCommand};
use hame_bridge::device::{DeviceDefinition, DeviceRegistry, DeviceSession, b2500_v2};
use hame_bridge::error::CommandError;
use hame_bridge::manager::DeviceConfig;
use hame_bridge::protocol::CommandSink;
use hame_bridge::registry::FieldDefinition;
use hame_bridge::state::{PeriodSetting, StatePath};
use hame_bridge::telemetry::{Telegram, transform};
use hame_bridge::types::{ChargingMode, ConnectedPhase, SmartMeterStatus};
use parking_lot::Mutex;
use serde_json::json;

/// Records every published payload.
#[derive(Default)]
struct RecordingSink {
    payloads: Mutex<Vec<String>>,
}

impl RecordingSink {
    fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.payloads.lock())
    }
}

impl CommandSink for RecordingSink {
    fn publish(&self, command: OutboundCommand) {
        self.payloads.lock().push(command.payload());
    }
}

fn session() -> DeviceSession {
    DeviceSession::new("0123456789ab", Arc::new(b2500_v2::definition().unwrap()))
}

// ============================================================================
// Decode path
// ============================================================================

mod decoding {
    use super::*;

    fn sample(path: StatePath) -> &'static str {
        match path {
            StatePath::TimePeriod {
                setting: PeriodSetting::StartTime | PeriodSetting::EndTime,
                ..
            } => "08:30",
            _ => "1",
        }
    }

    #[test]
    fn every_registered_field_decodes_a_sample() {
        let mut session = session();
        let definition = Arc::clone(session.definition());

        let pairs: Vec<_> = definition
            .fields()
            .iter()
            .map(|field| {
                let raw = sample(field.path());
                assert!(field.decode(raw).is_ok(), "{} rejected {raw:?}", field.key());
                (field.key().to_string(), raw)
            })
            .collect();

        assert!(session.handle_telegram(&Telegram::from_pairs(pairs)));

        let state = session.state();
        assert_eq!(state.battery_percentage(), Some(1));
        assert_eq!(state.firmware_version(), Some("1"));
        assert_eq!(state.time_periods().unwrap().len(), 5);
        assert_eq!(state.rated_power().is_limited, Some(true));
        assert_eq!(state.ct_info().connected_phase, Some(ConnectedPhase::Phase2));
        assert_eq!(state.charging_mode(), Some(ChargingMode::ChargeThenDischarge));
    }

    #[test]
    fn ct_status_codes() {
        let mut session = session();

        session.handle_telegram(&Telegram::parse("c1=9"));
        assert_eq!(
            session.state().ct_info().status,
            Some(SmartMeterStatus::DiagnosisTimeout)
        );

        session.handle_telegram(&Telegram::parse("c1=42"));
        assert_eq!(
            session.state().ct_info().status,
            Some(SmartMeterStatus::NotInDiagnosis)
        );
        assert_eq!(
            session.state().to_json().unwrap()["ctInfo"]["status"],
            json!("notInDiagnosis")
        );
    }

    #[test]
    fn enum_fields_fall_back_on_unmapped_codes() {
        let mut session = session();
        session.handle_telegram(&Telegram::parse("cs=7,c0=99"));

        assert_eq!(
            session.state().charging_mode(),
            Some(ChargingMode::ChargeDischargeSimultaneously)
        );
        assert_eq!(
            session.state().ct_info().connected_phase,
            Some(ConnectedPhase::Unknown)
        );
    }

    #[test]
    fn bad_values_are_skipped_not_fatal() {
        let mut session = session();

        assert!(session.handle_telegram(&Telegram::parse("pe=abc,kn=2240,e1=noon,zz=3")));
        assert_eq!(session.state().battery_percentage(), None);
        assert_eq!(session.state().battery_capacity(), Some(2240));
        assert!(session.state().time_periods().is_none());
    }

    #[test]
    fn out_of_range_period_output_keeps_the_rest() {
        let mut session = session();

        assert!(session.handle_telegram(&Telegram::parse("pe=55,kn=2240,c1=9,h1=-5")));
        assert_eq!(session.state().battery_percentage(), Some(55));
        assert_eq!(session.state().battery_capacity(), Some(2240));
        assert_eq!(
            session.state().ct_info().status,
            Some(SmartMeterStatus::DiagnosisTimeout)
        );
        assert!(session.state().time_periods().is_none());

        assert!(session.handle_telegram(&Telegram::parse("pe=56,h2=70000")));
        assert_eq!(session.state().battery_percentage(), Some(56));
        assert!(session.state().time_periods().is_none());
    }

    #[test]
    fn value_rejected_by_state_keeps_the_rest() {
        // `md` decodes to an integer but targets a boolean.
        let mut builder = DeviceDefinition::builder("Mismatched").device_type("HMX");
        let percentage = FieldDefinition::new("pe", StatePath::BatteryPercentage)
            .with_transform(transform::integer);
        let adaptive =
            FieldDefinition::new("md", StatePath::AdaptiveMode).with_transform(transform::integer);
        builder.field(percentage).unwrap().field(adaptive).unwrap();
        let mut session = DeviceSession::new("abc", Arc::new(builder.build()));

        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        session.subscribe(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        assert!(session.handle_telegram(&Telegram::parse("pe=42,md=1")));
        assert_eq!(session.state().battery_percentage(), Some(42));
        assert_eq!(session.state().adaptive_mode(), None);
        assert_eq!(count.load(Ordering::SeqCst), 1);

        assert!(!session.handle_telegram(&Telegram::parse("md=0")));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn telegram_is_one_notification() {
        let mut session = session();
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        session.subscribe(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        session.handle_telegram(&Telegram::parse(
            "pe=90,kn=2240,w1=120,w2=80,p1=1,p2=1,g1=0,g2=0,o1=0,o2=0,d1=1,e1=7:00",
        ));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn state_document_shape() {
        let mut session = session();
        session.handle_telegram(&Telegram::parse("pe=55,w1=300,p1=1,d1=1,e1=6:5,f1=9:00,h1=250"));

        let document = session.state().to_json().unwrap();
        assert_eq!(document["useFlashCommands"], json!(false));
        assert_eq!(document["batteryPercentage"], json!(55));
        assert_eq!(document["solarInputs"][0], json!({"active": true, "power": 300}));
        assert_eq!(
            document["timePeriods"][0],
            json!({"enabled": true, "startTime": "06:05", "endTime": "09:00", "outputValue": 250})
        );
        assert!(document.get("chargingMode").is_none());
    }
}

// ============================================================================
// Control path
// ============================================================================

mod control {
    use super::*;

    #[test]
    fn connected_phase_tokens() {
        let mut session = session();
        let sink = RecordingSink::default();

        for message in ["auto", "none", "null", "unknown", "255"] {
            session
                .handle_control("connected-phase", message, &sink)
                .unwrap();
        }
        session.handle_control("connected-phase", "2", &sink).unwrap();
        assert_eq!(
            sink.take(),
            ["cd=8,md=255", "cd=8,md=255", "cd=8,md=255", "cd=8,md=255", "cd=8,md=255", "cd=8,md=2"]
        );

        for message in ["7", "5", "256", "-1", "phase1"] {
            assert!(session.handle_control("connected-phase", message, &sink).is_err());
        }
        assert!(sink.take().is_empty());
    }

    #[test]
    fn settings_commands_use_legacy_codes_by_default() {
        let mut session = session();
        let sink = RecordingSink::default();

        session
            .handle_control("charging-mode", "chargeThenDischarge", &sink)
            .unwrap();
        session.handle_control("adaptive-mode", "OFF", &sink).unwrap();
        session.handle_control("discharge-depth", "90", &sink).unwrap();

        assert_eq!(sink.take(), ["cd=17,md=1", "cd=18,md=0", "cd=19,md=90"]);
    }

    #[test]
    fn flash_flag_switches_encoding() {
        let mut session = session();
        let sink = RecordingSink::default();

        session
            .handle_control("use-flash-commands", "true", &sink)
            .unwrap();
        assert!(session.state().use_flash_commands());
        assert!(sink.take().is_empty());

        session
            .handle_control("charging-mode", "chargeDischargeSimultaneously", &sink)
            .unwrap();
        session.handle_control("adaptive-mode", "ON", &sink).unwrap();
        session.handle_control("discharge-depth", "0", &sink).unwrap();
        assert_eq!(sink.take(), ["cd=3,md=0", "cd=4,md=1", "cd=5,md=0"]);
    }

    #[test]
    fn control_commands_do_not_mirror_state() {
        let mut session = session();
        let sink = RecordingSink::default();

        session.handle_control("discharge-depth", "42", &sink).unwrap();
        session
            .handle_control("charging-mode", "chargeThenDischarge", &sink)
            .unwrap();

        assert_eq!(session.state().discharge_depth(), None);
        assert_eq!(session.state().charging_mode(), None);
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let mut session = session();
        let sink = RecordingSink::default();

        assert!(session.handle_control("charging-mode", "2", &sink).is_err());
        assert!(session.handle_control("adaptive-mode", "auto", &sink).is_err());
        assert!(session.handle_control("discharge-depth", "101", &sink).is_err());
        assert!(session.handle_control("use-flash-commands", "yes", &sink).is_err());
        assert!(!session.state().use_flash_commands());
        assert!(sink.take().is_empty());
    }

    #[test]
    fn buttons_require_press() {
        let mut session = session();
        let sink = RecordingSink::default();

        let presses = [("refresh", "cd=1"), ("restart", "cd=11"), ("factory-reset", "cd=12")];
        for (command, payload) in presses {
            session.handle_control(command, "PRESS", &sink).unwrap();
            assert!(session.handle_control(command, "now", &sink).is_err());
            assert_eq!(sink.take(), [payload]);
        }
    }

    #[test]
    fn sync_time_from_json() {
        let mut session = session();
        let sink = RecordingSink::default();

        session
            .handle_control(
                "sync-time",
                r#"{"wy":480,"yy":125,"mm":0,"rr":1,"hh":0,"mn":0,"ss":0}"#,
                &sink,
            )
            .unwrap();
        assert_eq!(sink.take(), ["cd=10,wy=480,yy=125,mm=0,rr=1,hh=0,mn=0,ss=0"]);

        assert!(
            session
                .handle_control("sync-time", r#"{"wy":480,"yy":125}"#, &sink)
                .is_err()
        );
        assert!(session.handle_control("sync-time", "tomorrow", &sink).is_err());
        assert!(sink.take().is_empty());
    }

    #[test]
    fn sync_time_press_sends_current_time() {
        let mut session = session();
        let sink = RecordingSink::default();

        for token in ["PRESS", "press", "true", "1"] {
            session.handle_control("sync-time", token, &sink).unwrap();
        }
        let payloads = sink.take();
        assert_eq!(payloads.len(), 4);
        for payload in payloads {
            assert!(payload.starts_with("cd=10,wy=480,yy="), "{payload}");
            assert_eq!(payload.split(',').count(), 8);
        }
    }

    #[test]
    fn unknown_command_is_reported() {
        let mut session = session();
        let sink = RecordingSink::default();

        assert_eq!(
            session.handle_control("time-period/6/enabled", "true", &sink),
            Err(CommandError::UnknownCommand("time-period/6/enabled".to_string()))
        );
        assert!(sink.take().is_empty());
    }

    #[test]
    fn refresh_command_is_read_device_info() {
        let session = session();
        let command = session.refresh_command();
        assert_eq!(command.command, CommandType::ReadDeviceInfo);
        assert_eq!(command.payload(), "cd=1");
    }
}

// ============================================================================
// Configuration
// ============================================================================

mod configuration {
    use super::*;

    #[test]
    fn session_from_config_applies_flash_override() {
        let registry = DeviceRegistry::builtin().unwrap();
        let config = DeviceConfig::new("HMF", "abc").with_use_flash_commands(true);

        let session = DeviceSession::from_config(&config, &registry).unwrap();
        assert_eq!(session.device_id(), "abc");
        assert!(session.state().use_flash_commands());
    }

    #[test]
    fn session_from_config_rejects_unknown_type() {
        let registry = DeviceRegistry::builtin().unwrap();
        let config = DeviceConfig::new("HMJ", "abc");

        assert!(DeviceSession::from_config(&config, &registry).is_err());
    }

    #[test]
    fn descriptors_serialize_for_discovery() {
        let session = session();
        let descriptors = session.definition().descriptors();
        let phase = descriptors
            .iter()
            .find(|d| d.id == "ct_connected_phase")
            .unwrap();

        let document = serde_json::to_value(phase).unwrap();
        assert_eq!(document["type"], json!("select"));
        assert_eq!(document["command"], json!("connected-phase"));
        assert_eq!(document["value_mappings"]["searching"], json!("Searching"));
        assert!(document.get("min").is_none());
    }
}
