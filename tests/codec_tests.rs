mod common;

use common::{legacy_record, T0};
use eventtally::{codec, legacy, DecodeError, EventState};
use serde_json::{json, Value};

fn sample_state() -> EventState {
    let mut state = EventState::new("app_launch");
    state.update_at(3, T0);
    state.update_at(2, T0 + 3600.0);
    state.set_disabled(true);
    state
}

#[test]
fn test_encode_writes_tagged_record() {
    let bytes = codec::encode(&sample_state()).unwrap();
    let value: Value = serde_json::from_slice(&bytes).unwrap();

    assert_eq!(value["format"], codec::FORMAT);
    assert_eq!(value["version"], codec::VERSION);
    assert_eq!(value["name"], "app_launch");
    assert_eq!(value["first_occurrence"], T0);
    assert_eq!(value["last_occurrence"], T0 + 3600.0);
    assert_eq!(value["raw_count"], 5);
    assert_eq!(value["disabled"], true);
}

#[test]
fn test_decode_preserves_all_fields() {
    let state = sample_state();
    let decoded = codec::decode(&codec::encode(&state).unwrap()).unwrap();
    assert_eq!(decoded, state);
    assert_eq!(decoded.raw_count(), 5);
    assert_eq!(decoded.count(), 0);
}

#[test]
fn test_decode_ignores_unknown_fields() {
    let bytes = serde_json::to_vec(&json!({
        "format": codec::FORMAT,
        "version": 1,
        "name": "x",
        "raw_count": 4,
        "labels": ["a", "b"],
    }))
    .unwrap();
    let state = codec::decode(&bytes).unwrap();
    assert_eq!(state.count(), 4);
    assert_eq!(state.first_occurrence(), 0.0);
    assert!(!state.is_disabled());
}

#[test]
fn test_decode_rejects_legacy_record() {
    let bytes = legacy_record("x", T0, T0, 5, false);
    let err = codec::decode(&bytes).unwrap_err();
    assert!(matches!(err, DecodeError::MissingField("format")), "{err}");
}

#[test]
fn test_decode_rejects_other_format() {
    let bytes = br#"{"format":"something/else","name":"x"}"#;
    let err = codec::decode(bytes).unwrap_err();
    assert!(matches!(err, DecodeError::UnknownFormat(ref f) if f == "something/else"));
}

#[test]
fn test_decode_rejects_newer_version() {
    let bytes = br#"{"format":"eventtally/event-state","version":2,"name":"x"}"#;
    let err = codec::decode(bytes).unwrap_err();
    assert!(matches!(err, DecodeError::UnsupportedVersion(2)));
}

#[test]
fn test_decode_requires_name() {
    let bytes = br#"{"format":"eventtally/event-state","version":1,"raw_count":1}"#;
    let err = codec::decode(bytes).unwrap_err();
    assert!(matches!(err, DecodeError::MissingField("name")));
}

#[test]
fn test_decode_rejects_negative_timestamp() {
    let bytes = br#"{"format":"eventtally/event-state","name":"x","last_occurrence":-5.0}"#;
    let err = codec::decode(bytes).unwrap_err();
    assert!(matches!(
        err,
        DecodeError::InvalidField {
            field: "last_occurrence",
            ..
        }
    ));
}

#[test]
fn test_decode_garbage_is_malformed() {
    let inputs: [&[u8]; 4] = [b"", b"not json", b"[1,2,3]", b"{\"format\":"];
    for bytes in inputs {
        let err = codec::decode(bytes).unwrap_err();
        assert!(matches!(err, DecodeError::Malformed(_)), "{err}");
    }
}

#[test]
fn test_legacy_decode() {
    let bytes = legacy_record("x", T0, T0 + 60.0, 5, false);
    let state = legacy::decode(&bytes).unwrap();
    assert_eq!(state.name(), "x");
    assert_eq!(state.count(), 5);
    assert_eq!(state.first_occurrence(), T0);
    assert_eq!(state.last_occurrence(), T0 + 60.0);
    assert!(!state.is_disabled());
}

#[test]
fn test_legacy_timestamps_move_to_unix_epoch() {
    let bytes = br#"{
        "$class": "EventEngine.EventStateImpl",
        "EventState_NameKey": "x",
        "EventState_FirstOccurenceKey": 721692800.0,
        "EventState_LastOccurrenceKey": 721696400.5,
        "EventState_CountKey": 1
    }"#;
    let state = legacy::decode(bytes).unwrap();
    assert_eq!(state.first_occurrence(), 1_700_000_000.0);
    assert_eq!(state.last_occurrence(), 1_700_003_600.5);
}

#[test]
fn test_legacy_zero_timestamps_stay_never_recorded() {
    let bytes = br#"{
        "$class": "EventEngine.EventStateImpl",
        "EventState_NameKey": "x",
        "EventState_FirstOccurenceKey": 0.0,
        "EventState_LastOccurrenceKey": 0.0,
        "EventState_CountKey": 0
    }"#;
    let state = legacy::decode(bytes).unwrap();
    assert_eq!(state.first_occurrence(), 0.0);
    assert_eq!(state.last_occurrence(), 0.0);
    assert!(!state.occurred_in_last_day_at(T0));
}

#[test]
fn test_legacy_decode_disabled() {
    let bytes = legacy_record("x", T0, T0, 9, true);
    let state = legacy::decode(&bytes).unwrap();
    assert_eq!(state.count(), 0);
    assert_eq!(state.raw_count(), 9);
}

#[test]
fn test_legacy_unqualified_class_name() {
    let bytes = serde_json::to_vec(&json!({
        "$class": "EventStateImpl",
        "EventState_NameKey": "x",
        "EventState_CountKey": 2,
    }))
    .unwrap();
    let state = legacy::decode(&bytes).unwrap();
    assert_eq!(state.count(), 2);
    assert_eq!(state.first_occurrence(), 0.0);
}

#[test]
fn test_legacy_rejects_current_record() {
    let bytes = codec::encode(&sample_state()).unwrap();
    let err = legacy::decode(&bytes).unwrap_err();
    assert!(matches!(err, DecodeError::MissingField("$class")));
}

#[test]
fn test_legacy_rejects_unknown_class() {
    let bytes = br#"{"$class":"SomeOtherClass","EventState_NameKey":"x"}"#;
    let err = legacy::decode(bytes).unwrap_err();
    assert!(matches!(err, DecodeError::UnknownFormat(_)));
}

#[test]
fn test_legacy_requires_name() {
    let bytes = br#"{"$class":"EventEngine.EventStateImpl","EventState_CountKey":3}"#;
    let err = legacy::decode(bytes).unwrap_err();
    assert!(matches!(err, DecodeError::MissingField("EventState_NameKey")));
}
