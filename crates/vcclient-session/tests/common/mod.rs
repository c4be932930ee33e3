//! Scripted in-process server for connection tests.
#![allow(dead_code)]

use std::io::{Read, Write};
use std::net::{Shutdown, TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use vcclient_frame::{frame_bytes, read_exact, read_frame, Frame, FrameKind};
use vcclient_session::ConnectionConfig;
use vcclient_transport::ServerAddr;

pub const LEGACY_VERSION: &str = "5.0.0.0.0.0";
pub const JSON_VERSION: &str = "5.2.0.0.0.0";
pub const CREDENTIAL: &str = "lab-secret";

type Responder = dyn Fn(&Frame) -> (char, String) + Send + Sync;
type GenericResponder = dyn Fn(usize, &str) -> Option<String> + Send + Sync;
type RawResponder = dyn Fn(&Frame) -> String + Send + Sync;

pub struct StubConfig {
    pub reject: Option<String>,
    pub reply_delay: Duration,
    pub respond: Arc<Responder>,
    pub generic: Arc<GenericResponder>,
    /// Written verbatim instead of a framed reply when set.
    pub raw: Option<Arc<RawResponder>>,
}

impl Default for StubConfig {
    fn default() -> Self {
        Self {
            reject: None,
            reply_delay: Duration::ZERO,
            respond: Arc::new(|frame: &Frame| ('A', command_of(frame))),
            generic: Arc::new(|_: usize, request: &str| Some(format!("ok {request}"))),
            raw: None,
        }
    }
}

impl StubConfig {
    pub fn responding(respond: impl Fn(&Frame) -> (char, String) + Send + Sync + 'static) -> Self {
        Self {
            respond: Arc::new(respond),
            ..Self::default()
        }
    }

    pub fn replying_raw(raw: impl Fn(&Frame) -> String + Send + Sync + 'static) -> Self {
        Self {
            raw: Some(Arc::new(raw)),
            ..Self::default()
        }
    }
}

/// Request text without the trailing `@`.
pub fn command_of(frame: &Frame) -> String {
    frame.payload_text().trim_end_matches('@').to_string()
}

pub fn config() -> ConnectionConfig {
    ConnectionConfig {
        event_read_timeout: Duration::from_millis(50),
        generic_backoff: Duration::from_millis(10),
        connect_timeout: Some(Duration::from_secs(2)),
        ..ConnectionConfig::with_credential(CREDENTIAL)
    }
}

pub struct StubServer {
    pub addr: ServerAddr,
    pub event_port: u16,
    handshakes: Arc<AtomicUsize>,
    generic_attempts: Arc<AtomicUsize>,
    credentials: Arc<Mutex<Vec<String>>>,
    events: Arc<Mutex<Option<TcpStream>>>,
}

struct Shared {
    config: StubConfig,
    event_listener: TcpListener,
    handshakes: Arc<AtomicUsize>,
    generic_attempts: Arc<AtomicUsize>,
    credentials: Arc<Mutex<Vec<String>>>,
    events: Arc<Mutex<Option<TcpStream>>>,
}

impl StubServer {
    pub fn start(config: StubConfig) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let event_listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = ServerAddr::from(listener.local_addr().unwrap());
        let event_port = event_listener.local_addr().unwrap().port();

        let shared = Arc::new(Shared {
            config,
            event_listener,
            handshakes: Arc::new(AtomicUsize::new(0)),
            generic_attempts: Arc::new(AtomicUsize::new(0)),
            credentials: Arc::new(Mutex::new(Vec::new())),
            events: Arc::new(Mutex::new(None)),
        });
        let server = Self {
            addr,
            event_port,
            handshakes: Arc::clone(&shared.handshakes),
            generic_attempts: Arc::clone(&shared.generic_attempts),
            credentials: Arc::clone(&shared.credentials),
            events: Arc::clone(&shared.events),
        };

        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { return };
                let shared = Arc::clone(&shared);
                thread::spawn(move || handle(stream, &shared));
            }
        });
        server
    }

    pub fn handshakes(&self) -> usize {
        self.handshakes.load(Ordering::SeqCst)
    }

    pub fn generic_attempts(&self) -> usize {
        self.generic_attempts.load(Ordering::SeqCst)
    }

    pub fn credentials(&self) -> Vec<String> {
        self.credentials.lock().unwrap().clone()
    }

    /// Wait until the client has opened its event socket.
    pub fn wait_for_event_socket(&self) {
        let deadline = Instant::now() + Duration::from_secs(3);
        while self.events.lock().unwrap().is_none() {
            assert!(Instant::now() < deadline, "event socket never opened");
            thread::sleep(Duration::from_millis(5));
        }
    }

    /// Send one event frame; false once the client has gone away.
    pub fn push_event(&self, endpoint_id: &str, payload: &str) -> bool {
        self.wait_for_event_socket();
        let wire = frame_bytes(FrameKind::AttachEndpoint, Some(endpoint_id), payload.as_bytes())
            .unwrap();
        let mut events = self.events.lock().unwrap();
        match events.as_mut() {
            Some(stream) => stream.write_all(&wire).is_ok(),
            None => false,
        }
    }

    /// Close the event socket from the server side.
    pub fn drop_event_socket(&self) {
        self.wait_for_event_socket();
        if let Some(stream) = self.events.lock().unwrap().take() {
            let _ = stream.shutdown(Shutdown::Both);
        }
    }
}

fn handle(mut stream: TcpStream, shared: &Shared) {
    let Some(first) = read_token(&mut stream) else {
        return;
    };
    if first == "vcclientversion" {
        handle_session(stream, shared);
    } else {
        handle_generic(stream, shared);
    }
}

fn handle_session(mut stream: TcpStream, shared: &Shared) {
    let Some(_version) = read_decimal_field(&mut stream) else {
        return;
    };
    shared.handshakes.fetch_add(1, Ordering::SeqCst);

    if let Some(reason) = &shared.config.reject {
        let reply = format!("x{:04}{reason}", reason.len());
        let _ = stream.write_all(reply.as_bytes());
        return;
    }
    if stream.write_all(b"a").is_err() {
        return;
    }

    let Some(credential) = read_decimal_field(&mut stream) else {
        return;
    };
    shared.credentials.lock().unwrap().push(credential);

    let port = shared.event_listener.local_addr().unwrap().port();
    if stream.write_all(format!("{port:04x}").as_bytes()).is_err() {
        return;
    }
    if let Ok((events, _)) = shared.event_listener.accept() {
        *shared.events.lock().unwrap() = Some(events);
    }

    while let Ok(frame) = read_frame(&mut stream) {
        if !shared.config.reply_delay.is_zero() {
            thread::sleep(shared.config.reply_delay);
        }
        let reply = match &shared.config.raw {
            Some(raw) => raw(&frame),
            None => {
                let (ack, payload) = (shared.config.respond)(&frame);
                format!("{ack}:{}:{:04x}:{payload}", frame.header.endpoint_id, payload.len())
            }
        };
        if stream.write_all(reply.as_bytes()).is_err() {
            return;
        }
    }
}

/// Generic commands arrive as a bare frame on a fresh socket; the kind
/// token has already been consumed.
fn handle_generic(mut stream: TcpStream, shared: &Shared) {
    let (Some(_endpoint), Some(len)) = (read_token(&mut stream), read_token(&mut stream)) else {
        return;
    };
    let Ok(len) = usize::from_str_radix(&len, 16) else {
        return;
    };
    let Ok(payload) = read_exact(&mut stream, len) else {
        return;
    };
    let request = String::from_utf8_lossy(&payload)
        .trim_end_matches('@')
        .to_string();

    let attempt = shared.generic_attempts.fetch_add(1, Ordering::SeqCst) + 1;
    if let Some(reply) = (shared.config.generic)(attempt, &request) {
        let _ = stream.write_all(format!("{reply}\r\n").as_bytes());
    }
}

fn read_token(stream: &mut TcpStream) -> Option<String> {
    let mut token = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        match stream.read(&mut byte) {
            Ok(1) if byte[0] == b':' => return String::from_utf8(token).ok(),
            Ok(1) => token.push(byte[0]),
            _ => return None,
        }
    }
}

fn read_decimal_field(stream: &mut TcpStream) -> Option<String> {
    let len: usize = read_token(stream)?.parse().ok()?;
    let value = read_exact(stream, len).ok()?;
    String::from_utf8(value.to_vec()).ok()
}

/// Poll `cond` for up to three seconds.
pub fn eventually(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(3);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    cond()
}
