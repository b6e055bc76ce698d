// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Tests for delivery
//!
//! Drives the retry engine against the scripted mock gateway.

use pushwire_core::codec::{encode, encode_error_frame, ErrorFrame, FrameFormat, StatusCode};
use pushwire_core::delivery::*;
use pushwire_core::network::*;
use pushwire_core::notification::{DeviceToken, Notification, Payload};
use pushwire_core::{PushClient, PushConfig, PushError};

fn test_config() -> PushConfig {
    PushConfig::new(Environment::Sandbox, "cert.pem")
        .with_connect_retries(0, 0)
        .with_read_timeout_ms(1)
        .with_quiet_period_ms(1)
}

fn notification(n: u8) -> Notification {
    Notification::new(DeviceToken::new([n; 32]), Payload::new().alert("Hello"))
}

fn client_with(transport: MockTransport, config: PushConfig) -> PushClient<MockTransport> {
    PushClient::new(transport, &config).unwrap()
}

fn add_many(client: &mut PushClient<MockTransport>, count: u8) -> Vec<u32> {
    (1..=count)
        .map(|n| client.add(notification(n)).unwrap())
        .collect()
}

// === Clean Batches ===

#[test]
fn test_all_delivered_without_errors() {
    let mut client = client_with(MockTransport::new(), test_config());
    let ids = add_many(&mut client, 5);

    let report = client.send().unwrap();

    assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    assert_eq!(report.delivered, ids);
    assert!(report.is_clean());
    assert_eq!(report.frames_written, 5);
    assert_eq!(report.resubmitted, 0);
    assert_eq!(report.connections, 1);
    assert_eq!(client.pending_count(), 0);
    for id in ids {
        assert_eq!(client.outcome(id), Some(Outcome::Delivered));
    }
    assert_eq!(client.transport().accepted_identifiers(), vec![1, 2, 3, 4, 5]);
}

#[test]
fn test_empty_send_does_not_connect() {
    let mut client = client_with(MockTransport::new(), test_config());

    let report = client.send().unwrap();

    assert_eq!(report, BatchReport::default());
    assert_eq!(client.transport().connect_count(), 0);
}

#[test]
fn test_batches_share_connection() {
    let mut client = client_with(MockTransport::new(), test_config());

    add_many(&mut client, 2);
    client.send().unwrap();
    add_many(&mut client, 2);
    let report = client.send().unwrap();

    assert_eq!(report.delivered, vec![3, 4]);
    assert_eq!(report.connections, 0);
    assert_eq!(client.transport().connect_count(), 1);
}

// === Rejections ===

#[test]
fn test_rejection_resolves_prefix_and_resubmits_suffix() {
    let mut transport = MockTransport::new();
    transport.reject_once(3, StatusCode::InvalidToken);
    let mut client = client_with(transport, test_config().with_writes_per_poll(10));
    add_many(&mut client, 5);

    let report = client.send().unwrap();

    assert_eq!(report.delivered, vec![1, 2, 4, 5]);
    assert_eq!(report.rejected, vec![(3, StatusCode::InvalidToken)]);
    assert_eq!(report.frames_written, 7);
    assert_eq!(report.resubmitted, 2);
    assert_eq!(report.connections, 2);
    assert_eq!(client.outcome(3), Some(Outcome::Rejected(StatusCode::InvalidToken)));
    assert_eq!(client.outcome(4), Some(Outcome::Delivered));

    // The suffix goes out again in its original order.
    assert_eq!(
        client.transport().written_identifiers(),
        vec![1, 2, 3, 4, 5, 4, 5]
    );
    assert_eq!(client.transport().accepted_identifiers(), vec![1, 2, 4, 5]);
}

#[test]
fn test_rejection_detected_immediately_with_per_write_polling() {
    let mut transport = MockTransport::new();
    transport.reject_once(3, StatusCode::MissingPayload);
    let mut client = client_with(transport, test_config());
    add_many(&mut client, 5);

    let report = client.send().unwrap();

    assert_eq!(report.delivered, vec![1, 2, 4, 5]);
    assert_eq!(report.rejected, vec![(3, StatusCode::MissingPayload)]);
    assert_eq!(report.resubmitted, 0);
    assert_eq!(client.transport().written_identifiers(), vec![1, 2, 3, 4, 5]);
}

#[test]
fn test_rejection_of_first_and_last() {
    let mut transport = MockTransport::new();
    transport.reject_once(1, StatusCode::InvalidToken);
    transport.reject_once(4, StatusCode::InvalidToken);
    let mut client = client_with(transport, test_config().with_writes_per_poll(10));
    add_many(&mut client, 4);

    let report = client.send().unwrap();

    assert_eq!(report.delivered, vec![2, 3]);
    assert_eq!(
        report.rejected,
        vec![(1, StatusCode::InvalidToken), (4, StatusCode::InvalidToken)]
    );
    assert_eq!(client.pending_count(), 0);
}

#[test]
fn test_shutdown_delivers_named_notification() {
    let mut transport = MockTransport::new();
    transport.shutdown_after(2);
    let mut client = client_with(transport, test_config().with_writes_per_poll(10));
    add_many(&mut client, 4);

    let report = client.send().unwrap();

    assert_eq!(report.delivered, vec![1, 2, 3, 4]);
    assert!(report.is_clean());
    assert_eq!(report.connections, 2);
    assert_eq!(
        client.transport().written_identifiers(),
        vec![1, 2, 3, 4, 3, 4]
    );
}

// === Ignored Frames ===

#[test]
fn test_stale_error_frame_ignored() {
    let mut transport = MockTransport::new();
    let stale = encode_error_frame(&ErrorFrame::new(99, StatusCode::InvalidToken));
    transport.emit_after(1, stale.to_vec());
    let mut client = client_with(transport, test_config());
    add_many(&mut client, 3);

    let report = client.send().unwrap();

    assert_eq!(report.delivered, vec![1, 2, 3]);
    assert_eq!(report.connections, 1);
}

#[test]
fn test_stale_frame_does_not_end_quiet_period() {
    let mut transport = MockTransport::new();
    let stale = encode_error_frame(&ErrorFrame::new(99, StatusCode::InvalidToken));
    transport.emit_after(1, stale.to_vec());
    transport.reject_once(2, StatusCode::InvalidToken);
    let config = test_config()
        .with_writes_per_poll(10)
        .with_quiet_period_ms(1_000);
    let mut client = client_with(transport, config);
    add_many(&mut client, 3);

    let report = client.send().unwrap();

    assert_eq!(report.delivered, vec![1, 3]);
    assert_eq!(report.rejected, vec![(2, StatusCode::InvalidToken)]);
    assert_eq!(client.outcome(2), Some(Outcome::Rejected(StatusCode::InvalidToken)));
    assert_eq!(client.transport().written_identifiers(), vec![1, 2, 3, 3]);
}

#[test]
fn test_no_error_frames_ignored() {
    let mut transport = MockTransport::new();
    transport.emit_after(1, encode_error_frame(&ErrorFrame::new(1, StatusCode::NoErrors)).to_vec());
    transport.emit_after(2, encode_error_frame(&ErrorFrame::new(0, StatusCode::Unknown)).to_vec());
    let mut client = client_with(transport, test_config());
    add_many(&mut client, 3);

    let report = client.send().unwrap();

    assert_eq!(report.delivered, vec![1, 2, 3]);
    assert_eq!(client.transport().connect_count(), 1);
}

#[test]
fn test_error_frame_split_across_reads() {
    let mut transport = MockTransport::new();
    let frame = encode_error_frame(&ErrorFrame::new(2, StatusCode::InvalidToken));
    transport.emit_after(2, frame[..4].to_vec());
    transport.emit_after(2, frame[4..].to_vec());
    let mut client = client_with(transport, test_config());
    add_many(&mut client, 4);

    let report = client.send().unwrap();

    assert_eq!(report.delivered, vec![1, 3, 4]);
    assert_eq!(report.rejected, vec![(2, StatusCode::InvalidToken)]);
}

// === Connection Failures ===

#[test]
fn test_write_failure_resubmits_unconfirmed_once() {
    let mut transport = MockTransport::new();
    transport.inject_write_error(1, NetworkError::ConnectionClosed);
    let mut client = client_with(transport, test_config().with_writes_per_poll(10));
    add_many(&mut client, 3);

    let report = client.send().unwrap();

    assert_eq!(report.delivered, vec![1, 2, 3]);
    assert_eq!(report.resubmitted, 2);
    assert_eq!(report.connections, 2);
    assert_eq!(client.transport().written_identifiers(), vec![1, 1, 2, 3]);
}

#[test]
fn test_rejection_read_after_write_failure() {
    let mut transport = MockTransport::new();
    transport.reject_once(2, StatusCode::InvalidToken);
    // Fourth write, the one carrying notification 4.
    transport.inject_write_error(3, NetworkError::ConnectionClosed);
    let mut client = client_with(transport, test_config().with_writes_per_poll(10));
    add_many(&mut client, 5);

    let report = client.send().unwrap();

    assert_eq!(client.outcome(2), Some(Outcome::Rejected(StatusCode::InvalidToken)));
    assert_eq!(report.delivered, vec![1, 3, 4, 5]);
    assert_eq!(report.rejected, vec![(2, StatusCode::InvalidToken)]);
    assert_eq!(report.connections, 2);
    // Notification 1 is never written again once the error frame is read.
    assert_eq!(
        client.transport().written_identifiers(),
        vec![1, 2, 3, 3, 4, 5]
    );
    assert_eq!(client.transport().accepted_identifiers(), vec![1, 3, 4, 5]);
}

#[test]
fn test_malformed_response_treated_as_lost_connection() {
    let mut transport = MockTransport::new();
    transport.emit_after(1, vec![9, 0, 0, 0, 0, 1]);
    let mut client = client_with(transport, test_config());
    add_many(&mut client, 3);

    let report = client.send().unwrap();

    assert_eq!(report.delivered, vec![1, 2, 3]);
    assert!(report.rejected.is_empty());
    assert_eq!(report.connections, 2);
    assert_eq!(client.transport().written_identifiers(), vec![1, 1, 2, 3]);
}

#[test]
fn test_connect_failure_keeps_queue() {
    let mut transport = MockTransport::new();
    transport.inject_connect_error(NetworkError::ConnectionFailed("refused".into()));
    transport.inject_connect_error(NetworkError::ConnectionFailed("refused".into()));
    let mut client = client_with(transport, test_config().with_connect_retries(1, 0));
    add_many(&mut client, 3);

    let result = client.send();

    assert!(matches!(
        result,
        Err(PushError::Network(NetworkError::MaxRetriesExceeded))
    ));
    assert_eq!(client.pending_count(), 3);
    assert!(client.outcomes().is_empty());

    // The injected errors are used up, so the next attempt goes through.
    let report = client.send().unwrap();
    assert_eq!(report.delivered, vec![1, 2, 3]);
}

// === Retry Ceiling ===

#[test]
fn test_retry_ceiling_marks_rest_undetermined() {
    let mut transport = MockTransport::new();
    transport.reject_once(1, StatusCode::ProcessingError);
    transport.reject_once(2, StatusCode::ProcessingError);
    transport.reject_once(3, StatusCode::ProcessingError);
    let config = test_config().with_retry_limit(2).with_writes_per_poll(10);
    let mut client = client_with(transport, config);
    add_many(&mut client, 4);

    let result = client.send();

    match result {
        Err(PushError::RetryLimitExceeded { undetermined }) => assert_eq!(undetermined, vec![4]),
        other => panic!("Expected RetryLimitExceeded, got {:?}", other),
    }
    assert_eq!(client.outcome(1), Some(Outcome::Rejected(StatusCode::ProcessingError)));
    assert_eq!(client.outcome(3), Some(Outcome::Rejected(StatusCode::ProcessingError)));
    assert_eq!(client.outcome(4), Some(Outcome::Undetermined));
    assert_eq!(client.pending_count(), 0);
    assert!(!client.is_connected());

    // Written at most 1 + retry_limit times.
    let writes_of_4 = client
        .transport()
        .written_identifiers()
        .into_iter()
        .filter(|&id| id == 4)
        .count();
    assert_eq!(writes_of_4, 3);
}

#[test]
fn test_retry_ceiling_on_repeated_write_failures() {
    let mut transport = MockTransport::new();
    for index in 0..3 {
        transport.inject_write_error(index, NetworkError::SendFailed("broken pipe".into()));
    }
    let mut client = client_with(transport, test_config().with_retry_limit(2));
    add_many(&mut client, 2);

    let result = client.send();

    assert!(matches!(
        result,
        Err(PushError::RetryLimitExceeded { ref undetermined }) if undetermined == &vec![1, 2]
    ));
    assert_eq!(client.outcome(1), Some(Outcome::Undetermined));
    assert_eq!(client.outcome(2), Some(Outcome::Undetermined));
    assert!(client.transport().accepted_identifiers().is_empty());
}

#[test]
fn test_zero_retry_limit_gives_up_after_first_rejection() {
    let mut transport = MockTransport::new();
    transport.reject_once(1, StatusCode::InvalidToken);
    let config = test_config().with_retry_limit(0).with_writes_per_poll(10);
    let mut client = client_with(transport, config);
    add_many(&mut client, 2);

    let result = client.send();

    assert!(matches!(result, Err(PushError::RetryLimitExceeded { .. })));
    assert_eq!(client.outcome(1), Some(Outcome::Rejected(StatusCode::InvalidToken)));
    assert_eq!(client.outcome(2), Some(Outcome::Undetermined));
}

// === Engine API ===

struct Collect(Vec<(u32, Outcome)>);

impl DeliveryObserver for Collect {
    fn resolved(&mut self, identifier: u32, outcome: Outcome) {
        self.0.push((identifier, outcome));
    }
}

#[test]
fn test_engine_runs_queue_directly() {
    let mut transport = MockTransport::new();
    transport.reject_once(2, StatusCode::InvalidTopicSize);
    let mut conn = ConnectionManager::new(
        transport,
        TransportConfig::for_endpoint("localhost", 2195),
        ConnectPolicy::default().with_retry_interval_ms(0),
    );

    let mut queue = DeliveryQueue::new();
    for id in 1..=3u32 {
        let n = notification(id as u8).with_identifier(id);
        let frame = encode(&n, FrameFormat::Enhanced, 2048).unwrap();
        queue.push(n, frame);
    }

    let settings = DeliverySettings {
        read_timeout_ms: 1,
        quiet_period_ms: 1,
        ..DeliverySettings::default()
    };
    let mut engine = RetryEngine::new(settings);
    let mut observer = Collect(Vec::new());

    let report = engine.run(&mut conn, &mut queue, &mut observer).unwrap();

    assert_eq!(report.delivered, vec![1, 3]);
    assert!(queue.is_empty());
    assert_eq!(
        observer.0,
        vec![
            (1, Outcome::Delivered),
            (2, Outcome::Rejected(StatusCode::InvalidTopicSize)),
            (3, Outcome::Delivered),
        ]
    );
}
