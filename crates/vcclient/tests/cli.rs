#![cfg(feature = "cli")]

mod common;

use std::io::Write;
use std::net::TcpListener;
use std::process::{Command, Output, Stdio};

use common::{start_stub, CALLS};

fn vcclient_command(args: &[&str]) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_vcclient"));
    command
        .args(["--log-level", "error"])
        .args(args)
        .env_remove("VCCLIENT_SERVER")
        .env_remove("VCCLIENT_VERSION")
        .env("VCCLIENT_CREDENTIAL", "lab-secret");
    command
}

fn vcclient(args: &[&str]) -> Output {
    vcclient_command(args).output().expect("vcclient should run")
}

#[test]
fn exec_decodes_call_list() {
    let server = start_stub();
    let output = vcclient(&[
        "--format",
        "json",
        "exec",
        "--server",
        &server,
        "--client-version",
        "5.0.0.0.0.0",
        "--credential",
        "lab-secret",
        "--endpoint",
        "1",
        "getcalls",
    ]);

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    let json: serde_json::Value = serde_json::from_str(stdout.trim()).expect("json output");
    assert_eq!(json["command"], "getcalls");
    assert_eq!(json["result"][0]["call_ref"], "0x1");
    assert_eq!(json["result"][1]["state"], "dialtone");
}

#[test]
fn rejected_command_exits_1_with_server_text() {
    let server = start_stub();
    let output = vcclient(&[
        "exec",
        "--server",
        &server,
        "--client-version",
        "5.0.0.0.0.0",
        "--endpoint",
        "7",
        "getcalls",
    ]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("endpoint 00000007 not registered"), "stderr: {stderr}");
}

#[test]
fn info_reports_negotiated_session() {
    let server = start_stub();
    let output = vcclient(&[
        "--format",
        "json",
        "info",
        "--server",
        &server,
        "--client-version",
        "5.0.0.0.0.0",
    ]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let json: serde_json::Value = serde_json::from_str(stdout.trim()).expect("json output");
    assert_eq!(json["version"], "5.0.0.0.0.0");
    assert_eq!(json["output_format"], "legacy");
    assert_eq!(json["connected"], true);
}

#[test]
fn refused_connection_exits_3() {
    // Bind then drop to find a port nobody listens on.
    let port = TcpListener::bind("127.0.0.1:0")
        .and_then(|listener| listener.local_addr())
        .map(|addr| addr.port())
        .expect("free port");
    let server = format!("127.0.0.1:{port}");

    let output = vcclient(&["exec", "--server", &server, "getcalls"]);
    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn missing_credential_exits_3() {
    let server = start_stub();
    let output = vcclient_command(&["exec", "--server", &server, "getcalls"])
        .env_remove("VCCLIENT_CREDENTIAL")
        .output()
        .expect("vcclient should run");

    assert_eq!(output.status.code(), Some(3));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no credential configured"), "stderr: {stderr}");
}

#[test]
fn decode_reads_stdin() {
    let mut child = Command::new(env!("CARGO_BIN_EXE_vcclient"))
        .args(["--format", "json", "decode", "getcalls"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("decode should start");
    child
        .stdin
        .take()
        .expect("stdin")
        .write_all(format!("{CALLS}\n").as_bytes())
        .expect("write stdin");
    let output = child.wait_with_output().expect("decode should finish");

    assert!(output.status.success());
    let json: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("json output");
    assert_eq!(json["result"][0]["line_ref"], "1");
    assert_eq!(json["result"][1]["call_ref"], "0x2");
}

#[test]
fn decode_parse_failure_exits_60() {
    let dir = std::env::temp_dir().join(format!("vcclient-decode-{}", std::process::id()));
    std::fs::create_dir_all(&dir).expect("temp dir");
    let path = dir.join("reply.txt");
    std::fs::write(&path, "{state idle} 0x1 {nested {x}}").expect("write capture");

    let output = vcclient(&["decode", "getstate", "--file", path.to_str().expect("utf-8 path")]);
    let _ = std::fs::remove_dir_all(&dir);

    assert_eq!(
        output.status.code(),
        Some(60),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}
