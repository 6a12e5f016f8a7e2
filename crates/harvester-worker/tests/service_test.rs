//! Integration tests for the worker service: one live listener, real TCP
//! connections, a stub task dispatcher.

use harvester_common::protocol::{Message, MessageKind};
use harvester_common::transport::FrameTransport;
use harvester_worker::pool::{PoolConfig, WorkerPool};
use harvester_worker::service::WorkerService;
use serde_json::json;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::time::Duration;

/// Starts a service on an ephemeral port with the given dispatcher and
/// leaves it running for the duration of the test process.
fn start_service(
    dispatcher: harvester_worker::pool::TaskDispatcher,
    pool_size: usize,
) -> SocketAddr {
    let pool = Arc::new(WorkerPool::new(PoolConfig { pool_size }, dispatcher));
    let service = WorkerService::bind("127.0.0.1:0", pool).unwrap();
    let addr = service.local_addr().unwrap();
    std::thread::spawn(move || service.run());
    addr
}

fn echo_service() -> SocketAddr {
    start_service(Arc::new(|_kind, input| Ok(json!({"echo": input}))), 2)
}

#[test]
fn one_request_yields_exactly_one_response_frame() {
    let addr = echo_service();
    let mut stream = TcpStream::connect(addr).unwrap();

    let request = Message::screenshot_request("https://example.com", Some("t-1"));
    FrameTransport::write_frame(&mut stream, &request).unwrap();

    let response = FrameTransport::read_frame(&mut stream).unwrap().unwrap();
    assert_eq!(response.kind, MessageKind::Response);
    assert_eq!(response.task_id(), Some("t-1"));

    // The service half-closes after one frame; the next read sees EOF.
    assert_eq!(FrameTransport::read_frame(&mut stream).unwrap(), None);
}

#[test]
fn failing_task_still_yields_exactly_one_frame() {
    let addr = start_service(Arc::new(|_kind, _input| Err("task blew up".to_string())), 1);
    let mut stream = TcpStream::connect(addr).unwrap();

    let request = Message::performance_request("https://example.com", None);
    FrameTransport::write_frame(&mut stream, &request).unwrap();

    let response = FrameTransport::read_frame(&mut stream).unwrap().unwrap();
    assert_eq!(response.kind, MessageKind::ErrorResponse);
    assert!(response.error().unwrap().contains("task blew up"));
    assert_eq!(FrameTransport::read_frame(&mut stream).unwrap(), None);
}

#[test]
fn malformed_frame_is_dropped_without_a_response() {
    let addr = echo_service();
    let mut stream = TcpStream::connect(addr).unwrap();

    // A frame with an unknown kind byte and matching length.
    let mut garbage = 3u32.to_be_bytes().to_vec();
    garbage.push(42);
    garbage.extend_from_slice(b"{}");
    stream.write_all(&garbage).unwrap();
    stream.flush().unwrap();

    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();
    let mut buf = Vec::new();
    let read = stream.read_to_end(&mut buf).unwrap();
    assert_eq!(read, 0, "expected no response bytes, got {:?}", buf);
}

#[test]
fn early_disconnect_is_tolerated() {
    let addr = echo_service();

    // Connect and immediately hang up, then verify the service still works.
    drop(TcpStream::connect(addr).unwrap());

    let mut stream = TcpStream::connect(addr).unwrap();
    let request = Message::screenshot_request("https://example.com", None);
    FrameTransport::write_frame(&mut stream, &request).unwrap();
    let response = FrameTransport::read_frame(&mut stream).unwrap().unwrap();
    assert_eq!(response.kind, MessageKind::Response);
}

#[test]
fn concurrent_connections_are_served_independently() {
    let addr = echo_service();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            std::thread::spawn(move || {
                let mut stream = TcpStream::connect(addr).unwrap();
                let request = Message::image_batch_request(
                    "https://example.com",
                    &[format!("https://example.com/{}.png", i)],
                    None,
                );
                FrameTransport::write_frame(&mut stream, &request).unwrap();
                FrameTransport::read_frame(&mut stream).unwrap().unwrap()
            })
        })
        .collect();

    for handle in handles {
        let response = handle.join().unwrap();
        assert_eq!(response.kind, MessageKind::Response);
    }
}
