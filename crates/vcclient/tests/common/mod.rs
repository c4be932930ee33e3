//! Minimal server for end-to-end tests.
#![allow(dead_code)]

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;

use vcclient_frame::{read_exact, read_frame};

pub const CALLS: &str = "{0x1 1 connected} {0x2 1 dialtone}";

/// Accepts sessions forever and answers `getcalls` on endpoint 1.
pub fn start_stub() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind stub");
    let addr = listener.local_addr().expect("stub addr").to_string();
    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(stream) = stream else { return };
            thread::spawn(move || serve(stream));
        }
    });
    addr
}

fn serve(mut stream: TcpStream) {
    let events = TcpListener::bind("127.0.0.1:0").expect("bind events");
    let port = events.local_addr().expect("events addr").port();

    if read_token(&mut stream).as_deref() != Some("vcclientversion") {
        return;
    }
    let Some(_version) = read_field(&mut stream) else {
        return;
    };
    let _ = stream.write_all(b"a");
    let Some(_credential) = read_field(&mut stream) else {
        return;
    };
    let _ = stream.write_all(format!("{port:04x}").as_bytes());
    let Ok((_event_socket, _)) = events.accept() else {
        return;
    };

    while let Ok(frame) = read_frame(&mut stream) {
        let request = frame.payload_text();
        let (ack, payload) = match (frame.header.endpoint_id.as_str(), request.as_str()) {
            ("00000001", "getcalls@") => ('A', CALLS.to_string()),
            (endpoint, _) => ('N', format!("endpoint {endpoint} not registered")),
        };
        let reply = format!(
            "{ack}:{}:{:04x}:{payload}",
            frame.header.endpoint_id,
            payload.len()
        );
        if stream.write_all(reply.as_bytes()).is_err() {
            return;
        }
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

fn read_field(stream: &mut TcpStream) -> Option<String> {
    let len: usize = read_token(stream)?.parse().ok()?;
    let value = read_exact(stream, len).ok()?;
    String::from_utf8(value.to_vec()).ok()
}
