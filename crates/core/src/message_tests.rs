// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn run_message_round_trips() {
    let msg = RunMessage {
        run_id: RunId::from_string("run-1"),
        robot_id: RobotId::from_string("rbt-1"),
        robot_version_id: VersionId::from_string("ver-1"),
        runtime_arguments: vec!["--fast".to_string()],
        runtime_env: HashMap::from([("K".to_string(), "V".to_string())]),
        trigger_type: TriggerType::Retry,
        attempt: 2,
        service_id: None,
        schedule_id: Some(ScheduleId::from_string("sch-1")),
        parameters_json: serde_json::json!({"a": 1}),
        env_name: EnvName::Test,
        not_before_ts: Some(1_700_000_000.5),
        triggered_by: None,
    };
    let json = serde_json::to_string(&msg).unwrap();
    let back: RunMessage = serde_json::from_str(&json).unwrap();
    assert_eq!(back, msg);
}

#[test]
fn run_message_tolerates_missing_optionals() {
    let json = r#"{
        "run_id": "run-1", "robot_id": "rbt-1", "robot_version_id": "ver-1",
        "trigger_type": "MANUAL", "attempt": 1, "env_name": "PROD"
    }"#;
    let msg: RunMessage = serde_json::from_str(json).unwrap();
    assert!(msg.runtime_arguments.is_empty());
    assert!(msg.not_before_ts.is_none());
    assert_eq!(msg.parameters_json, serde_json::Value::Null);
}

#[test]
fn log_frame_uses_rfc3339_timestamps() {
    let entry = RunLog {
        id: 7,
        run_id: RunId::from_string("run-1"),
        timestamp_ms: 1_700_000_000_123,
        level: LogLevel::Error,
        message: "boom".to_string(),
    };
    let frame = LogFrame::from_log(&entry);
    assert_eq!(frame.timestamp, "2023-11-14T22:13:20.123Z");
    let json = serde_json::to_value(&frame).unwrap();
    assert_eq!(json["level"], "ERROR");
    assert_eq!(json["run_id"], "run-1");
}

#[test]
fn rfc3339_millis_handles_zero() {
    assert_eq!(rfc3339_millis(0), "1970-01-01T00:00:00.000Z");
}
