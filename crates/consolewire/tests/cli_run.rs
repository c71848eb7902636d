#![cfg(feature = "cli")]

use std::io::{Read, Write};
use std::net::TcpListener;
use std::path::PathBuf;
use std::process::{Command, Output};
use std::thread;
use std::time::Duration;

use consolewire::session::{ConsoleSummary, StubConsole, TEN_KEY_OBJECT};
use consolewire::transport::ConsoleAddr;
use serde_json::Value;

fn consolewire() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_consolewire"));
    for var in [
        "CONSOLEWIRE_HOST",
        "CONSOLEWIRE_PORT",
        "CONSOLEWIRE_SENTINEL",
        "CONSOLEWIRE_READ_TIMEOUT",
    ] {
        cmd.env_remove(var);
    }
    cmd.args(["--log-level", "off", "--format", "json"]);
    cmd
}

fn spawn_console() -> (u16, thread::JoinHandle<ConsoleSummary>) {
    let console =
        StubConsole::bind(&ConsoleAddr::new("127.0.0.1", 0)).expect("console should bind");
    let port = console.local_addr().port();
    let handle = thread::spawn(move || console.serve_next().expect("console should serve"));
    (port, handle)
}

fn json_lines(output: &Output) -> Vec<Value> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|line| serde_json::from_str(line).expect("stdout line should be JSON"))
        .collect()
}

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "consolewire-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

#[test]
fn run_diagnostic_commands_against_stub_console() {
    let (port, console) = spawn_console();

    let output = consolewire()
        .args(["run", "--port", &port.to_string()])
        .args(["-c", "help", "-c", "list", "-c", "version"])
        .args(["-c", TEN_KEY_OBJECT, "-c", "count", "-c", "json"])
        .output()
        .expect("run should start");

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let lines = json_lines(&output);
    assert_eq!(lines.len(), 6);
    assert!(lines.iter().all(|line| line["complete"] == true));

    let expected: Value = serde_json::from_str(TEN_KEY_OBJECT).unwrap();
    assert_eq!(lines[3]["json"], expected);
    assert_eq!(lines[4]["json"]["count"], 10);
    assert_eq!(lines[5]["command"], "json");
    assert_eq!(lines[5]["json"], expected);

    let summary = console.join().expect("console thread should finish");
    assert!(summary.done);
    assert_eq!(summary.commands, 7);
}

#[test]
fn feed_sends_flattened_files_each_round() {
    let dir = unique_temp_dir("feed");
    let payload = dir.join("Input.json");
    std::fs::write(&payload, "{\r\n\t\"a\": 1,\r\n\t\"b\": [1, 2]\r\n}\r\n").unwrap();

    let (port, console) = spawn_console();
    let output = consolewire()
        .args(["feed", payload.to_str().unwrap(), "--rounds", "2"])
        .args(["--port", &port.to_string(), "-c", "count", "-c", "json"])
        .output()
        .expect("feed should start");

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let lines = json_lines(&output);
    assert_eq!(lines.len(), 6);
    assert_eq!(lines[0]["json"], serde_json::json!({"a": 1, "b": [1, 2]}));
    assert_eq!(lines[1]["json"]["count"], 2);
    assert_eq!(lines[5]["json"]["b"][1], 2);

    let summary = console.join().unwrap();
    assert_eq!(summary.json_lines, 2);
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn connect_refused_exits_1() {
    let port = TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let output = consolewire()
        .args(["run", "--port", &port.to_string(), "-c", "help"])
        .output()
        .expect("run should start");

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("connect failed"));
}

#[test]
fn late_reply_stops_the_script_and_exits_124() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let server = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        stream.write_all(format!("\n{port}: ").as_bytes()).unwrap();
        let mut received = vec![0u8; 5];
        stream.read_exact(&mut received).unwrap();
        thread::sleep(Duration::from_millis(500));
        let _ = stream.write_all(format!("help\r\nlate\r\n{port}: ").as_bytes());
        let _ = stream.read_to_end(&mut received);
        received
    });

    let output = consolewire()
        .args(["run", "--port", &port.to_string(), "--read-timeout", "200ms"])
        .args(["-c", "help", "-c", "list"])
        .output()
        .expect("run should start");

    assert_eq!(output.status.code(), Some(124));
    let lines = json_lines(&output);
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["command"], "help");
    assert!(lines[0]["error"].as_str().unwrap().contains("no response"));

    let received = server.join().unwrap();
    assert_eq!(received, b"help\ndone\n");
}

#[test]
fn silent_console_exits_124() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let server = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut sink = Vec::new();
        let _ = stream.read_to_end(&mut sink);
        sink
    });

    let output = consolewire()
        .args(["run", "--port", &port.to_string(), "--read-timeout", "200ms"])
        .args(["-c", "help"])
        .output()
        .expect("run should start");

    assert_eq!(output.status.code(), Some(124));
    let lines = json_lines(&output);
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["command"], "<banner>");
    assert!(lines[0]["error"].as_str().unwrap().contains("no response"));

    // Nothing but the shutdown command goes out after a missed greeting.
    let received = server.join().unwrap();
    assert_eq!(received, b"done\n");
}

#[test]
fn script_file_missing_exits_before_connecting() {
    let output = consolewire()
        .args(["run", "--script", "/nonexistent/consolewire/diag.txt"])
        .output()
        .expect("run should start");
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("diag.txt"));
}
