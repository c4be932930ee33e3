mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use vcclient_decode::{DecodedValue, OutputFormat};
use vcclient_frame::{frame_bytes, FrameKind};
use vcclient_session::{
    connect, contains, ClientError, ConnectionConfig, ErrorClass, Event, WILDCARD_ENDPOINT,
};

use common::{
    command_of, config, eventually, StubConfig, StubServer, CREDENTIAL, JSON_VERSION,
    LEGACY_VERSION,
};

const CALLS: &str = "{0x1 1 connected} {0x2 1 dialtone}";

fn command(endpoint: &str, text: &str) -> Vec<u8> {
    frame_bytes(FrameKind::Command, Some(endpoint), format!("{text}@").as_bytes())
        .unwrap()
        .to_vec()
}

fn calls_server() -> StubServer {
    StubServer::start(StubConfig::responding(|frame| match command_of(frame).as_str() {
        "getcalls" => ('A', CALLS.to_string()),
        "getcalls 9" => ('N', "endpoint 9 not registered".to_string()),
        other => ('N', format!("unknown command {other}")),
    }))
}

fn channel_sink() -> (impl Fn(Event) + Send + Sync + 'static, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel();
    let tx = Mutex::new(tx);
    (
        move |event: Event| {
            let _ = tx.lock().unwrap().send(event);
        },
        rx,
    )
}

#[test]
fn addressed_command_round_trip_and_decode() {
    let stub = calls_server();
    let conn = connect(&stub.addr, LEGACY_VERSION, &config()).unwrap();

    assert_eq!(conn.version(), LEGACY_VERSION);
    assert_eq!(conn.output_format(), OutputFormat::Legacy);
    assert_eq!(conn.event_port(), stub.event_port);
    assert_eq!(stub.credentials(), vec![CREDENTIAL.to_string()]);

    let body = command("1", "getcalls");
    let ack = conn.execute("getcalls", &body, true).unwrap();
    assert!(ack.is_accepted());
    assert_eq!(ack.endpoint_id, "00000001");
    assert_eq!(ack.message, CALLS);

    let value = conn.call("getcalls", &body, true).unwrap();
    let records = value.as_sequence().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].get("call_ref").and_then(DecodedValue::as_str), Some("0x1"));
    assert_eq!(records[1].get("state").and_then(DecodedValue::as_str), Some("dialtone"));

    conn.close().unwrap();
}

#[test]
fn rejected_command_surfaces_server_text() {
    let stub = calls_server();
    let conn = connect(&stub.addr, LEGACY_VERSION, &config()).unwrap();
    let body = command("9", "getcalls 9");

    let ack = conn.execute("getcalls", &body, true).unwrap();
    assert!(!ack.is_accepted());
    assert_eq!(ack.message, "endpoint 9 not registered");

    let err = conn.call("getcalls", &body, true).unwrap_err();
    assert_eq!(err.class(), ErrorClass::Command);
    assert_eq!(err.server_message(), Some("endpoint 9 not registered"));

    // The connection stays usable after a command error.
    assert!(conn.execute("getcalls", &command("1", "getcalls"), true).unwrap().is_accepted());
    conn.close().unwrap();
}

#[test]
fn handshake_rejection_fails_connect() {
    let stub = StubServer::start(StubConfig {
        reject: Some("unsupported client version".to_string()),
        ..StubConfig::default()
    });

    let err = connect(&stub.addr, "1.0", &config()).unwrap_err();
    match &err {
        ClientError::HandshakeRejected(reason) => assert_eq!(reason, "unsupported client version"),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(err.class(), ErrorClass::Connection);
    assert!(!contains(&stub.addr));
    assert!(stub.credentials().is_empty());
}

#[test]
fn new_servers_negotiate_json() {
    let stub = StubServer::start(StubConfig::responding(|frame| {
        match command_of(frame).as_str() {
            "setoutputformat json" => ('A', "json".to_string()),
            "getcalls" => ('A', r#"[{"call_ref":"0x1","line_ref":"1","state":"ringing"}]"#.to_string()),
            _ => ('N', "unknown".to_string()),
        }
    }));
    let conn = connect(&stub.addr, JSON_VERSION, &config()).unwrap();
    assert_eq!(conn.output_format(), OutputFormat::Json);

    let value = conn.call("getcalls", &command("1", "getcalls"), true).unwrap();
    assert_eq!(
        value.as_sequence().unwrap()[0].get("state").and_then(DecodedValue::as_str),
        Some("ringing")
    );
    conn.close().unwrap();
}

#[test]
fn connect_reuses_listed_connection() {
    let stub = StubServer::start(StubConfig::default());
    let first = connect(&stub.addr, LEGACY_VERSION, &config()).unwrap();
    let second = connect(&stub.addr, LEGACY_VERSION, &config()).unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(stub.handshakes(), 1);
    first.close().unwrap();
    assert!(second.is_closed());
}

#[test]
fn generic_command_retries_until_answered() {
    let stub = StubServer::start(StubConfig {
        generic: Arc::new(|attempt: usize, request: &str| {
            (attempt >= 3).then(|| format!("pong {request}"))
        }),
        ..StubConfig::default()
    });
    let conn = connect(&stub.addr, LEGACY_VERSION, &config()).unwrap();

    let body = frame_bytes(FrameKind::Generic, None, b"ping@").unwrap();
    let ack = conn.execute("ping", &body, false).unwrap();
    assert!(ack.is_accepted());
    assert_eq!(ack.endpoint_id, "00000000");
    assert_eq!(ack.message, "pong ping");
    assert_eq!(stub.generic_attempts(), 3);
    conn.close().unwrap();
}

#[test]
fn generic_command_gives_up_after_three_attempts() {
    let stub = StubServer::start(StubConfig {
        generic: Arc::new(|_: usize, _: &str| None),
        ..StubConfig::default()
    });
    let conn = connect(&stub.addr, LEGACY_VERSION, &config()).unwrap();

    let body = frame_bytes(FrameKind::Generic, None, b"ping@").unwrap();
    let err = conn.execute("ping", &body, false).unwrap_err();
    assert!(matches!(err, ClientError::RetriesExhausted { attempts: 3, .. }));
    assert_eq!(err.class(), ErrorClass::Connection);
    assert_eq!(stub.generic_attempts(), 3);
    conn.close().unwrap();
}

#[test]
fn concurrent_commands_are_serialized() {
    let delay = Duration::from_millis(150);
    let stub = StubServer::start(StubConfig {
        reply_delay: delay,
        ..StubConfig::default()
    });
    let conn = connect(&stub.addr, LEGACY_VERSION, &config()).unwrap();

    let start = Instant::now();
    let workers: Vec<_> = ["getstate one", "getstate two"]
        .into_iter()
        .map(|text| {
            let conn = Arc::clone(&conn);
            thread::spawn(move || {
                let ack = conn.execute("getstate", &command("1", text), true).unwrap();
                assert_eq!(ack.message, text, "reply matched to the wrong request");
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    assert!(
        start.elapsed() >= delay * 2,
        "two round trips took {:?}",
        start.elapsed()
    );
    conn.close().unwrap();
}

#[test]
fn events_reach_endpoint_and_wildcard_sinks() {
    let stub = StubServer::start(StubConfig::default());
    let conn = connect(&stub.addr, LEGACY_VERSION, &config()).unwrap();

    let (sink, endpoint_rx) = channel_sink();
    conn.register_event_sink("1", sink);
    let (wildcard, wildcard_rx) = channel_sink();
    conn.register_event_sink(WILDCARD_ENDPOINT, wildcard);

    assert!(stub.push_event("00000001", "station ring extra"));
    let event = endpoint_rx.recv_timeout(Duration::from_secs(3)).unwrap();
    assert_eq!(event.server, stub.addr);
    assert_eq!(event.event_type, "station");
    assert_eq!(event.event_subtype.as_deref(), Some("ring"));
    assert_eq!(event.message, "extra");

    assert!(stub.push_event("00000009", "state inservice"));
    let event = wildcard_rx.recv_timeout(Duration::from_secs(3)).unwrap();
    assert_eq!(event.endpoint_id, "00000009");
    assert_eq!(event.event_type, "info");
    assert_eq!(event.event_subtype.as_deref(), Some("state"));

    assert!(conn.unregister_event_sink("1"));
    assert!(stub.push_event("00000001", "callevent idle 0x1"));
    let event = wildcard_rx.recv_timeout(Duration::from_secs(3)).unwrap();
    assert_eq!(event.endpoint_id, "00000001");
    assert!(endpoint_rx.try_recv().is_err());

    conn.close().unwrap();
}

#[test]
fn close_joins_event_reader_and_silences_sinks() {
    let stub = StubServer::start(StubConfig::default());
    let conn = connect(&stub.addr, LEGACY_VERSION, &config()).unwrap();

    let count = Arc::new(AtomicUsize::new(0));
    conn.register_event_sink(WILDCARD_ENDPOINT, {
        let count = Arc::clone(&count);
        move |_| {
            count.fetch_add(1, Ordering::SeqCst);
        }
    });

    assert!(stub.push_event("00000001", "state idle"));
    assert!(eventually(|| count.load(Ordering::SeqCst) == 1));
    assert!(conn.events_running());

    conn.close().unwrap();
    assert!(!conn.events_running());
    assert!(!contains(&stub.addr));

    for _ in 0..3 {
        let _ = stub.push_event("00000001", "state busy");
    }
    thread::sleep(Duration::from_millis(200));
    assert_eq!(count.load(Ordering::SeqCst), 1);

    let err = conn.execute("getstate", &command("1", "getstate"), true).unwrap_err();
    assert!(matches!(err, ClientError::Closed));
    conn.close().unwrap();
}

#[test]
fn losing_the_event_socket_closes_the_connection() {
    let stub = StubServer::start(StubConfig::default());
    let conn = connect(&stub.addr, LEGACY_VERSION, &config()).unwrap();
    assert!(contains(&stub.addr));

    stub.drop_event_socket();
    assert!(eventually(|| conn.is_closed()));
    assert!(eventually(|| !contains(&stub.addr)));
    assert!(eventually(|| !conn.events_running()));
}

#[test]
fn close_unblocks_a_waiting_command() {
    let stub = StubServer::start(StubConfig {
        reply_delay: Duration::from_secs(10),
        ..StubConfig::default()
    });
    let conn = connect(&stub.addr, LEGACY_VERSION, &config()).unwrap();

    let waiter = {
        let conn = Arc::clone(&conn);
        thread::spawn(move || conn.execute("getstate", &command("1", "getstate"), true))
    };
    thread::sleep(Duration::from_millis(100));

    let start = Instant::now();
    conn.close().unwrap();
    let result = waiter.join().unwrap();
    assert!(matches!(result, Err(ClientError::Closed)));
    assert!(start.elapsed() < Duration::from_secs(5));
}

#[test]
fn malformed_reply_header_closes_the_connection() {
    // A bad length field followed by what would look like a valid reply.
    let stub = StubServer::start(StubConfig::replying_raw(|frame| {
        format!("A:{0}:zz:A:{0}:0005:WRONG", frame.header.endpoint_id)
    }));
    let conn = connect(&stub.addr, LEGACY_VERSION, &config()).unwrap();
    let body = command("1", "getstate");

    let err = conn.execute("getstate", &body, true).unwrap_err();
    assert_eq!(err.class(), ErrorClass::Protocol);
    assert!(conn.is_closed());
    assert!(!contains(&stub.addr));

    // Leftover bytes are never read as the next reply.
    let err = conn.execute("getstate", &body, true).unwrap_err();
    assert!(matches!(err, ClientError::Closed));

    let fresh = connect(&stub.addr, LEGACY_VERSION, &config()).unwrap();
    assert!(!Arc::ptr_eq(&conn, &fresh));
    assert_eq!(stub.handshakes(), 2);
    fresh.close().unwrap();
}

#[test]
fn missing_credential_fails_before_connecting() {
    let stub = calls_server();
    let no_credential = ConnectionConfig {
        credential: String::new(),
        ..config()
    };

    let err = connect(&stub.addr, LEGACY_VERSION, &no_credential).unwrap_err();
    assert!(matches!(err, ClientError::MissingCredential));
    assert_eq!(err.class(), ErrorClass::Connection);
    assert!(!contains(&stub.addr));
    assert_eq!(stub.handshakes(), 0);
}
