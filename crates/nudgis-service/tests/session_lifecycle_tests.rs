//! Session lifecycle tests against scripted collaborators.
//!
//! Drive `SessionController` through the prepare/start/stop handshake using
//! `MockTransport`, and check keyframe enforcement and stream key persistence
//! along the way.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use nudgis_service::{
    KeyframeEnforcer, OutputHandle, ProfileStore, SessionController, SessionState, TransportError,
    DEFAULT_KEYINT_SEC,
};
use nudgis_test_utils::*;
use std::collections::HashMap;
use std::sync::Arc;

const BASE_URL: &str = "https://live.test";

fn controller(transport: &Arc<MockTransport>) -> SessionController<Arc<MockTransport>> {
    SessionController::new(
        test_config(BASE_URL),
        Arc::clone(transport),
        KeyframeEnforcer::live_encoder_only(),
    )
}

fn happy_transport() -> Arc<MockTransport> {
    Arc::new(
        MockTransport::new()
            .reply(PREPARE_PATH, prepare_success_body("42", "rtmp://host", "key42"))
            .reply(START_PATH, action_body(true))
            .reply(STOP_PATH, action_body(true)),
    )
}

fn form(body: &str) -> HashMap<String, String> {
    url::form_urlencoded::parse(body.as_bytes())
        .into_owned()
        .collect()
}

#[test]
fn test_initialize_then_deactivate_end_to_end() {
    let transport = happy_transport();
    let mut controller = controller(&transport);
    let mut output = MockOutput::new();

    assert!(controller.initialize(&mut output));
    assert_eq!(controller.state(), SessionState::Active);
    assert_eq!(controller.server_uri(), "rtmp://host");
    assert_eq!(controller.stream_key(), "key42");
    assert_eq!(controller.oid(), Some("42"));

    controller.deactivate();
    assert_eq!(controller.state(), SessionState::Stopped);

    let stops = transport.requests_to(STOP_PATH);
    assert_eq!(stops.len(), 1);
    assert_eq!(stops.first().unwrap().body, "api_key=test-api-key&oid=42");
    assert_eq!(
        stops.first().unwrap().url,
        format!("{BASE_URL}{STOP_PATH}")
    );
}

#[test]
fn test_requests_are_sent_in_handshake_order() {
    let transport = happy_transport();
    let mut controller = controller(&transport);

    assert!(controller.initialize(&mut MockOutput::new()));
    controller.deactivate();

    let paths: Vec<String> = transport
        .calls()
        .iter()
        .map(|request| request.path().to_string())
        .collect();
    assert_eq!(paths, vec![PREPARE_PATH, START_PATH, STOP_PATH]);
    assert!(transport.calls().iter().all(|r| r.method == Method::Post));
}

#[test]
fn test_prepare_body_describes_output() {
    let transport = happy_transport();
    let mut controller = controller(&transport);
    let mut output = MockOutput::new()
        .with_video(hd_output().video)
        .with_bitrates(4500, 128);

    assert!(controller.initialize(&mut output));

    let prepare = transport.requests_to(PREPARE_PATH);
    let fields = form(&prepare.first().unwrap().body);

    assert_eq!(fields.get("api_key").unwrap(), TEST_API_KEY);
    assert_eq!(fields.get("multi_streams").unwrap(), "no");
    assert_eq!(fields.get("title").unwrap(), TEST_STREAM_TITLE);
    assert_eq!(fields.get("channel").unwrap(), TEST_STREAM_CHANNEL);

    let streams: serde_json::Value = serde_json::from_str(fields.get("streams").unwrap()).unwrap();
    assert_eq!(
        streams,
        serde_json::json!([{
            "width": 1920,
            "height": 1080,
            "video_bitrate": 4_500_000,
            "audio_bitrate": 128_000,
            "framerate": 25
        }])
    );
}

#[test]
fn test_prepare_rejected_never_starts() {
    let transport = Arc::new(
        MockTransport::new()
            .reply(PREPARE_PATH, action_body(false))
            .reply(START_PATH, action_body(true)),
    );
    let mut controller = controller(&transport);

    assert!(!controller.initialize(&mut MockOutput::new()));
    assert_eq!(controller.state(), SessionState::Failed);
    assert_eq!(transport.call_count(START_PATH), 0);
    assert_eq!(controller.oid(), None);
    assert_eq!(controller.server_uri(), "rtmp");
    assert_eq!(controller.stream_key(), "stream_id");
}

#[test]
fn test_prepare_transport_failure_never_starts() {
    let transport = Arc::new(
        MockTransport::new()
            .fail(PREPARE_PATH, TransportError::Status(502))
            .reply(START_PATH, action_body(true)),
    );
    let mut controller = controller(&transport);

    assert!(!controller.initialize(&mut MockOutput::new()));
    assert_eq!(transport.call_count(START_PATH), 0);

    // No oid was ever received, so there is nothing to stop.
    controller.deactivate();
    assert_eq!(transport.call_count(STOP_PATH), 0);
}

#[test]
fn test_unparsable_prepare_body_is_failure() {
    let transport = Arc::new(MockTransport::new().reply(PREPARE_PATH, "<html>502</html>"));
    let mut controller = controller(&transport);

    assert!(!controller.initialize(&mut MockOutput::new()));
    assert_eq!(controller.state(), SessionState::Failed);
}

#[test]
fn test_start_failure_keeps_prepared_fields_and_stops_remote_session() {
    let transport = Arc::new(
        MockTransport::new()
            .reply(PREPARE_PATH, prepare_success_body("7", "rtmp://edge", "k7"))
            .reply(START_PATH, action_body(false))
            .reply(STOP_PATH, action_body(true)),
    );
    let mut controller = controller(&transport);

    assert!(!controller.initialize(&mut MockOutput::new()));
    assert_eq!(controller.state(), SessionState::Failed);
    assert_eq!(controller.server_uri(), "rtmp://edge");
    assert_eq!(controller.stream_key(), "k7");

    controller.deactivate();
    assert_eq!(controller.state(), SessionState::Failed);
    assert_eq!(transport.call_count(STOP_PATH), 1);
}

#[test]
fn test_second_deactivate_sends_nothing() {
    let transport = happy_transport();
    let mut controller = controller(&transport);

    assert!(controller.initialize(&mut MockOutput::new()));
    controller.deactivate();
    controller.deactivate();

    assert_eq!(transport.call_count(STOP_PATH), 1);
    assert_eq!(controller.state(), SessionState::Stopped);
}

#[test]
fn test_stop_failure_is_ignored() {
    let transport = Arc::new(
        MockTransport::new()
            .reply(PREPARE_PATH, prepare_success_body("42", "rtmp://host", "key42"))
            .reply(START_PATH, action_body(true))
            .fail(STOP_PATH, TransportError::Request("connection reset".to_string())),
    );
    let mut controller = controller(&transport);

    assert!(controller.initialize(&mut MockOutput::new()));
    controller.deactivate();

    assert_eq!(controller.state(), SessionState::Stopped);
}

#[test]
fn test_initialize_twice_is_rejected_without_requests() {
    let transport = happy_transport();
    let mut controller = controller(&transport);

    assert!(controller.initialize(&mut MockOutput::new()));
    let calls_after_first = transport.calls().len();

    assert!(!controller.initialize(&mut MockOutput::new()));
    assert_eq!(transport.calls().len(), calls_after_first);
    assert_eq!(controller.state(), SessionState::Active);
}

#[test]
fn test_keyframe_interval_enforced_before_prepare() {
    let transport = happy_transport();
    let profile = MemoryProfileStore::with_keyint_sec(0);
    let mut controller = SessionController::new(
        test_config(BASE_URL),
        Arc::clone(&transport),
        KeyframeEnforcer::new(Box::new(profile.clone())),
    );
    let mut output = MockOutput::new().with_keyint_sec(0);

    assert!(controller.initialize(&mut output));

    assert_eq!(output.keyint_writes(), &[DEFAULT_KEYINT_SEC]);
    assert_eq!(output.video_keyint_sec(), DEFAULT_KEYINT_SEC);
    assert_eq!(profile.save_count(), 1);
    assert_eq!(profile.load().unwrap().keyint_sec(), DEFAULT_KEYINT_SEC);
}

#[test]
fn test_keyframe_enforcement_is_idempotent_across_sessions() {
    let profile = MemoryProfileStore::with_keyint_sec(10);
    let mut output = MockOutput::new().with_keyint_sec(10);

    for _ in 0..2 {
        let transport = happy_transport();
        let mut controller = SessionController::new(
            test_config(BASE_URL),
            Arc::clone(&transport),
            KeyframeEnforcer::new(Box::new(profile.clone())),
        );
        assert!(controller.initialize(&mut output));
        controller.deactivate();
    }

    assert_eq!(output.keyint_writes(), &[DEFAULT_KEYINT_SEC]);
    assert_eq!(profile.save_count(), 1);
}

#[test]
fn test_unwritable_profile_does_not_block_session() {
    let transport = happy_transport();
    let profile = MemoryProfileStore::with_keyint_sec(0).failing_saves();
    let mut controller = SessionController::new(
        test_config(BASE_URL),
        Arc::clone(&transport),
        KeyframeEnforcer::new(Box::new(profile.clone())),
    );
    let mut output = MockOutput::new();

    assert!(controller.initialize(&mut output));
    assert_eq!(output.video_keyint_sec(), DEFAULT_KEYINT_SEC);
    assert_eq!(profile.save_count(), 0);
}

#[test]
fn test_custom_keyint_sec() {
    let transport = happy_transport();
    let mut controller = controller(&transport).with_keyint_sec(2);
    let mut output = MockOutput::new();

    assert!(controller.initialize(&mut output));
    assert_eq!(output.keyint_writes(), &[2]);
}

#[test]
fn test_stream_key_persisted_after_prepare() {
    let transport = Arc::new(
        MockTransport::new()
            .reply(PREPARE_PATH, prepare_success_body("42", "rtmp://host", "key42"))
            .reply(START_PATH, action_body(false)),
    );
    let keys = MemoryStreamKeyStore::new();
    let mut controller = controller(&transport).with_stream_key_store(Box::new(keys.clone()));

    // Persisted as soon as prepare succeeds, even though start then fails.
    assert!(!controller.initialize(&mut MockOutput::new()));
    assert_eq!(keys.saved_keys(), vec!["key42".to_string()]);
}

#[test]
fn test_stream_key_store_failure_does_not_block_session() {
    let transport = happy_transport();
    let mut controller =
        controller(&transport).with_stream_key_store(Box::new(MemoryStreamKeyStore::failing()));

    assert!(controller.initialize(&mut MockOutput::new()));
    assert_eq!(controller.state(), SessionState::Active);
}

#[test]
fn test_probe() {
    let transport = Arc::new(MockTransport::new().reply(API_BASE_PATH, action_body(true)));
    let controller = controller(&transport);

    assert!(controller.probe());

    let probes = transport.requests_to(API_BASE_PATH);
    let probe = probes.first().unwrap();
    assert_eq!(probe.method, Method::Get);
    assert_eq!(probe.url, format!("{BASE_URL}/api/v2/?api_key=test-api-key"));
    assert_eq!(controller.state(), SessionState::Idle);
}

#[test]
fn test_probe_rejected_key() {
    let transport = Arc::new(MockTransport::new().reply(API_BASE_PATH, action_body(false)));
    assert!(!controller(&transport).probe());

    let transport = Arc::new(
        MockTransport::new().fail(API_BASE_PATH, TransportError::Status(403)),
    );
    assert!(!controller(&transport).probe());
}
