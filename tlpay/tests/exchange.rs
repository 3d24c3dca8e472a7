//! End-to-end exchanges against a scripted terminal

use std::time::Duration;

use pretty_assertions::assert_eq;
use tokio::time::{Instant, sleep};

use tlpay::{Client, ClientConfig, Error, Frame, JobCode, Requests};
use tlpay_core::constants::{ACK, NAK, STX};
use tlpay_transport::{MemoryTransport, Transport};

const TS: &str = "20251203185306";

fn frame(job: JobCode, payload: &[u8]) -> Vec<u8> {
    tlpay_core::frame::encode("CAT0001", TS, job, 0, payload)
        .unwrap()
        .to_vec()
}

fn ack_then(frames: &[Vec<u8>]) -> Vec<u8> {
    let mut bytes = vec![ACK];
    for f in frames {
        bytes.extend_from_slice(f);
    }
    bytes
}

fn requests() -> Requests {
    Requests::new("CAT0001").with_clock(|| TS.to_string())
}

async fn client(handle: &MemoryTransport) -> Client<MemoryTransport> {
    let mut client = Client::new(handle.clone(), ClientConfig::default());
    client.open().await.unwrap();
    client
}

fn approve_request() -> Frame {
    requests()
        .approve(&tlpay::ApproveRequest::new("1004").as_approval())
        .unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_device_check_after_ack() {
    let handle = MemoryTransport::new();
    handle.reply(ack_then(&[frame(JobCode::DEVICE_CHECK_REPLY, b"OOOO")]));
    let mut client = client(&handle).await;

    let reply = client
        .request_response(&requests().device_check().unwrap())
        .await
        .unwrap();

    assert_eq!(reply.job, JobCode::DEVICE_CHECK_REPLY);
    assert_eq!(&reply.payload[..], b"OOOO");
    assert_eq!(handle.controls_written(), vec![ACK]);
    assert_eq!(handle.frames_written().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_frame_start_without_ack() {
    let handle = MemoryTransport::new();
    handle.reply(frame(JobCode::DEVICE_CHECK_REPLY, b""));
    let mut client = client(&handle).await;

    let reply = client
        .request_response(&requests().device_check().unwrap())
        .await
        .unwrap();

    assert_eq!(reply.job, JobCode::DEVICE_CHECK_REPLY);
    assert_eq!(handle.controls_written(), vec![ACK]);
}

#[tokio::test(start_paused = true)]
async fn test_event_never_returned() {
    let handle = MemoryTransport::new();
    handle.reply(ack_then(&[
        frame(JobCode::EVENT, b"M"),
        frame(JobCode::EVENT, b"I"),
        frame(JobCode::APPROVE_REPLY, b"approved"),
    ]));
    let mut client = client(&handle).await;

    let reply = client.request_response(&approve_request()).await.unwrap();

    assert_eq!(reply.job, JobCode::APPROVE_REPLY);
    assert_eq!(&reply.payload[..], b"approved");
    // events are not acknowledged
    assert_eq!(handle.controls_written(), vec![ACK]);
}

#[tokio::test(start_paused = true)]
async fn test_header_resync_after_noise() {
    let handle = MemoryTransport::new();
    let mut bytes = vec![ACK, STX, 0x7F, 0x10, 0x11];
    bytes.extend(frame(JobCode::DEVICE_CHECK_REPLY, b"OK"));
    handle.reply(bytes);
    let mut client = client(&handle).await;

    let reply = client
        .request_response(&requests().device_check().unwrap())
        .await
        .unwrap();

    assert_eq!(reply.job, JobCode::DEVICE_CHECK_REPLY);
    assert_eq!(&reply.payload[..], b"OK");
    assert_eq!(handle.pending(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_header_resync_with_marker_valued_fields() {
    let handle = MemoryTransport::new();
    let reply = tlpay_core::frame::encode("CAT0001", TS, JobCode::DEVICE_CHECK_REPLY, STX, b"OK")
        .unwrap();
    let mut bytes = vec![ACK, STX, 0x7F];
    bytes.extend_from_slice(&reply);
    handle.reply(bytes);
    let mut client = client(&handle).await;

    let reply = client
        .request_response(&requests().device_check().unwrap())
        .await
        .unwrap();

    assert_eq!(reply.response_code, STX);
    assert_eq!(&reply.payload[..], b"OK");
    assert_eq!(handle.controls_written(), vec![ACK]);
    assert_eq!(handle.pending(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_nak_resends_then_succeeds() {
    let handle = MemoryTransport::new();
    handle
        .reply(vec![NAK])
        .reply(ack_then(&[frame(JobCode::DEVICE_CHECK_REPLY, b"")]));
    let mut client = client(&handle).await;

    let request = requests().device_check().unwrap();
    let reply = client.request_response(&request).await.unwrap();

    assert_eq!(reply.job, JobCode::DEVICE_CHECK_REPLY);

    let sent = handle.frames_written();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0], sent[1]);
    assert_eq!(sent[0], request.encode().unwrap().to_vec());
}

#[tokio::test(start_paused = true)]
async fn test_retries_bounded() {
    let handle = MemoryTransport::new();
    for _ in 0..10 {
        handle.reply(vec![NAK]);
    }
    let mut client = client(&handle).await;

    let err = client
        .request_response(&requests().device_check().unwrap())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::RetryExhausted { retries: 3 }));
    // first send plus three resends
    assert_eq!(handle.frames_written().len(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_zero_retries() {
    let handle = MemoryTransport::new();
    handle.reply(vec![NAK]);
    let mut client = Client::new(handle.clone(), ClientConfig::default().with_max_retries(0));
    client.open().await.unwrap();

    let err = client
        .request_response(&requests().device_check().unwrap())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::RetryExhausted { retries: 0 }));
    assert_eq!(handle.frames_written().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_bad_checksum_salvaged() {
    let handle = MemoryTransport::new();
    let mut reply = frame(JobCode::APPROVE_REPLY, b"0000");
    let last = reply.len() - 1;
    reply[last] ^= 0xFF;
    handle.reply(ack_then(&[reply]));
    let mut client = client(&handle).await;

    let frame = client.request_response(&approve_request()).await.unwrap();

    assert_eq!(frame.job, JobCode::APPROVE_REPLY);
    assert_eq!(&frame.payload[..], b"0000");
    assert_eq!(handle.controls_written(), vec![ACK]);
}

#[tokio::test(start_paused = true)]
async fn test_bad_terminator_salvaged() {
    let handle = MemoryTransport::new();
    let mut reply = frame(JobCode::APPROVE_REPLY, b"0000");
    let etx = reply.len() - 2;
    reply[etx] = 0x00;
    handle.reply(ack_then(&[reply]));
    let mut client = client(&handle).await;

    let frame = client.request_response(&approve_request()).await.unwrap();

    assert_eq!(&frame.payload[..], b"0000");
}

#[tokio::test(start_paused = true)]
async fn test_short_body_naked_then_resent() {
    let handle = MemoryTransport::new();
    let full = frame(JobCode::DEVICE_CHECK_REPLY, b"0123456789");
    // header promises 10 payload bytes, only 3 arrive
    handle.reply(ack_then(&[full[..38].to_vec()]));
    handle.resend_on_nak(full.clone());
    let mut client = client(&handle).await;

    let reply = client
        .request_response(&requests().device_check().unwrap())
        .await
        .unwrap();

    assert_eq!(&reply.payload[..], b"0123456789");
    assert_eq!(handle.controls_written(), vec![NAK, ACK]);
    assert_eq!(handle.frames_written().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_lost_header_waits_for_resend() {
    let handle = MemoryTransport::new();
    let mut bytes = vec![ACK, STX];
    bytes.extend([0xFF; 34]);
    bytes.extend(frame(JobCode::DEVICE_CHECK_REPLY, b""));
    handle.reply(bytes);
    let mut client = client(&handle).await;

    let reply = client
        .request_response(&requests().device_check().unwrap())
        .await
        .unwrap();

    assert_eq!(reply.job, JobCode::DEVICE_CHECK_REPLY);
    assert_eq!(handle.controls_written(), vec![ACK]);
}

#[tokio::test(start_paused = true)]
async fn test_resend_timeout() {
    let handle = MemoryTransport::new();
    let full = frame(JobCode::DEVICE_CHECK_REPLY, b"0123456789");
    handle.reply(ack_then(&[full[..38].to_vec()]));
    let mut client = client(&handle).await;

    let err = client
        .request_response(&requests().device_check().unwrap())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::ResendTimeout { expected } if expected == JobCode::DEVICE_CHECK_REPLY));
    assert!(err.is_timeout());
}

#[tokio::test(start_paused = true)]
async fn test_follow_up_exceeded() {
    let handle = MemoryTransport::new();
    handle.reply(ack_then(&[frame(JobCode::EVENT, b"M")]));
    let mut client = client(&handle).await;

    let started = Instant::now();
    let err = client.request_response(&approve_request()).await.unwrap_err();

    assert!(matches!(
        err,
        Error::FollowUpExceeded { window, expected }
            if window == Duration::from_secs(180) && expected == JobCode::APPROVE_REPLY
    ));
    assert!(started.elapsed() >= Duration::from_secs(180));
    assert!(started.elapsed() < Duration::from_secs(240));
}

#[tokio::test(start_paused = true)]
async fn test_handshake_timeout() {
    let handle = MemoryTransport::new();
    let mut client = client(&handle).await;

    let started = Instant::now();
    let err = client
        .request_response(&requests().device_check().unwrap())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::HandshakeTimeout { waited } if waited == Duration::from_secs(28)));
    assert!(started.elapsed() >= Duration::from_secs(28));
    assert!(started.elapsed() < Duration::from_secs(29));
    assert_eq!(err.reason(), "handshake-timeout");
}

#[tokio::test(start_paused = true)]
async fn test_ack_then_silence_times_out() {
    let handle = MemoryTransport::new();
    handle.reply(vec![ACK]);
    let mut client = client(&handle).await;

    let started = Instant::now();
    let err = client
        .request_response(&requests().device_check().unwrap())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::ResponseTimeout { waited, expected }
            if waited == Duration::from_secs(25) && expected == JobCode::DEVICE_CHECK_REPLY
    ));
    assert!(started.elapsed() >= Duration::from_secs(25));
    assert!(started.elapsed() < Duration::from_secs(26));
    assert!(err.is_timeout());
}

#[tokio::test(start_paused = true)]
async fn test_late_ack() {
    let handle = MemoryTransport::new();
    let mut client = client(&handle).await;

    let terminal = handle.clone();
    let reply = ack_then(&[frame(JobCode::DEVICE_CHECK_REPLY, b"")]);
    tokio::spawn(async move {
        sleep(Duration::from_secs(10)).await;
        terminal.push_incoming(&reply);
    });

    let reply = client
        .request_response(&requests().device_check().unwrap())
        .await
        .unwrap();

    assert_eq!(reply.job, JobCode::DEVICE_CHECK_REPLY);
}

#[tokio::test(start_paused = true)]
async fn test_late_nak_resends() {
    let handle = MemoryTransport::new();
    handle.reply(Vec::new());
    handle.reply(frame(JobCode::DEVICE_CHECK_REPLY, b""));
    let mut client = client(&handle).await;

    let terminal = handle.clone();
    tokio::spawn(async move {
        sleep(Duration::from_secs(5)).await;
        terminal.push_incoming(&[NAK]);
    });

    let reply = client
        .request_response(&requests().device_check().unwrap())
        .await
        .unwrap();

    assert_eq!(reply.job, JobCode::DEVICE_CHECK_REPLY);
    assert_eq!(handle.frames_written().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_reply_case_insensitive() {
    let handle = MemoryTransport::new();
    handle.reply(ack_then(&[frame(JobCode::APPROVE, b"")]));
    let mut client = client(&handle).await;

    let reply = client.request_response(&approve_request()).await.unwrap();

    assert_eq!(reply.job, JobCode::APPROVE);
}

#[tokio::test(start_paused = true)]
async fn test_mismatched_reply_skipped() {
    let handle = MemoryTransport::new();
    handle.reply(ack_then(&[
        frame(JobCode::CANCEL_REPLY, b"stale"),
        frame(JobCode::APPROVE_REPLY, b"fresh"),
    ]));
    let mut client = client(&handle).await;

    let reply = client.request_response(&approve_request()).await.unwrap();

    assert_eq!(&reply.payload[..], b"fresh");
    assert_eq!(handle.controls_written(), vec![ACK, ACK]);
}

#[tokio::test(start_paused = true)]
async fn test_stale_input_drained() {
    let handle = MemoryTransport::new();
    handle.reply(frame(JobCode::DEVICE_CHECK_REPLY, b""));
    let mut client = client(&handle).await;
    // leftovers from an earlier exchange
    handle.push_incoming(&[NAK, NAK, 0x03]);

    let reply = client
        .request_response(&requests().device_check().unwrap())
        .await
        .unwrap();

    assert_eq!(reply.job, JobCode::DEVICE_CHECK_REPLY);
    assert_eq!(handle.frames_written().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_transport_failure_propagates() {
    let handle = MemoryTransport::new();
    let mut client = client(&handle).await;
    handle.fail_writes();

    let err = client
        .request_response(&requests().device_check().unwrap())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Transport(tlpay_transport::Error::ShortWrite { .. })));
    assert!(client.transport().is_open());
}
