mod common;

use std::io::Write;
use std::net::{TcpListener, TcpStream};
use std::thread;

use vcclient::frame::{frame_bytes, read_frame, FrameKind, MAX_PAYLOAD};
use vcclient::{connect, ConnectionConfig, DecodedValue, OutputFormat, ServerAddr};

use common::start_stub;

#[test]
fn getcalls_end_to_end() {
    let addr: ServerAddr = start_stub().parse().unwrap();
    let conn = connect(&addr, "5.0.0.0.0.0", &ConnectionConfig::with_credential("lab")).unwrap();
    assert_eq!(conn.output_format(), OutputFormat::Legacy);

    let body = frame_bytes(FrameKind::Command, Some("1"), b"getcalls@").unwrap();
    let ack = conn.execute("getcalls", &body, true).unwrap();
    let calls = vcclient::decode::decode("getcalls", ack, OutputFormat::Legacy).unwrap();

    let record = |call_ref: &str, state: &str| {
        DecodedValue::Mapping(vec![
            ("call_ref".to_string(), DecodedValue::scalar(call_ref)),
            ("line_ref".to_string(), DecodedValue::scalar("1")),
            ("state".to_string(), DecodedValue::scalar(state)),
        ])
    };
    assert_eq!(
        calls,
        DecodedValue::Sequence(vec![record("0x1", "connected"), record("0x2", "dialtone")])
    );

    conn.close().unwrap();
    assert!(vcclient::lookup(&addr).is_none());
}

#[test]
fn frames_survive_a_loopback_socket() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let payloads: Vec<Vec<u8>> = vec![
        Vec::new(),
        b"getcalls@".to_vec(),
        (0..MAX_PAYLOAD).map(|i| b'a' + (i % 26) as u8).collect(),
    ];
    let sent = payloads.clone();
    let writer = thread::spawn(move || {
        let mut stream = TcpStream::connect(addr).unwrap();
        for payload in &sent {
            let wire = frame_bytes(FrameKind::AttachEndpoint, Some("42"), payload).unwrap();
            stream.write_all(&wire).unwrap();
        }
    });

    let (mut stream, _) = listener.accept().unwrap();
    for payload in &payloads {
        let frame = read_frame(&mut stream).unwrap();
        assert_eq!(frame.header.endpoint_id, "00000042");
        assert_eq!(usize::from(frame.header.length), payload.len());
        assert_eq!(frame.payload.as_ref(), payload.as_slice());
    }
    writer.join().unwrap();
}
