//! CLI integration tests: argument validation and an end-to-end TCP run

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::process::Command;
use std::thread;
use tempfile::TempDir;

/// Command running in an empty directory with no probe variables set
fn create_test_cmd(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("netprobe").unwrap();
    cmd.current_dir(dir.path());
    for var in [
        "PROBE_COUNT",
        "PROBE_TIMEOUT_SECONDS",
        "PROBE_INTERVAL_MS",
        "PROBE_MTU",
        "PROBE_INTERFACE",
        "ENABLE_COLOR",
        "LOG_FORMAT",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

/// Blocking echo server answering every accepted connection on its own thread
fn spawn_echo_listener() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { break };
            thread::spawn(move || {
                let mut buffer = [0u8; 2048];
                loop {
                    match stream.read(&mut buffer) {
                        Ok(0) | Err(_) => break,
                        Ok(n) => {
                            if stream.write_all(&buffer[..n]).is_err() {
                                break;
                            }
                        }
                    }
                }
            });
        }
    });
    port
}

#[test]
fn test_mtu_out_of_range() {
    let dir = TempDir::new().unwrap();
    create_test_cmd(&dir)
        .args(["--protocol", "tcp", "--server", "127.0.0.1", "--mtu", "20"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("mtu=20"));
}

#[test]
fn test_unsupported_protocol() {
    let dir = TempDir::new().unwrap();
    create_test_cmd(&dir)
        .args(["--protocol", "quic", "--server", "127.0.0.1"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("protocol=quic"));
}

#[test]
fn test_client_requires_server_address() {
    let dir = TempDir::new().unwrap();
    create_test_cmd(&dir)
        .args(["--protocol", "tcp", "--port", "9000"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("server ip"));
}

#[test]
fn test_multicast_requires_group_address() {
    let dir = TempDir::new().unwrap();
    create_test_cmd(&dir)
        .args(["--protocol", "udp", "--multicast", "--server", "192.0.2.1", "--interface", "lo"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("not multicast address"));
}

#[test]
fn test_icmp_server_mode_rejected() {
    let dir = TempDir::new().unwrap();
    create_test_cmd(&dir)
        .args(["--listen", "--protocol", "icmp"])
        .assert()
        .code(1);
}

#[test]
fn test_unknown_flag_is_a_usage_error() {
    let dir = TempDir::new().unwrap();
    create_test_cmd(&dir).arg("--no-such-flag").assert().code(2);
}

#[test]
fn test_invalid_env_file_value() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join(".env"), "PROBE_COUNT=many\n").unwrap();
    create_test_cmd(&dir)
        .args(["--protocol", "tcp", "--server", "127.0.0.1"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("PROBE_COUNT"));
}

#[test]
fn test_tcp_end_to_end() {
    let port = spawn_echo_listener();
    let dir = TempDir::new().unwrap();

    create_test_cmd(&dir)
        .args([
            "--protocol", "tcp",
            "--server", "127.0.0.1",
            "--port", &port.to_string(),
            "--mtu", "100",
            "--count", "5",
            "--interval-ms", "10",
            "--no-color",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("TCP PING 127.0.0.1 100(128) bytes of data."))
        .stdout(predicate::str::contains("5 packets transmitted, 5 received, 0 packet loss"))
        .stdout(predicate::str::contains("TCP test passed"));
}

#[test]
fn test_negative_tcp_end_to_end() {
    let port = spawn_echo_listener();
    let dir = TempDir::new().unwrap();

    create_test_cmd(&dir)
        .args([
            "--protocol", "tcp",
            "--server", "127.0.0.1",
            "--port", &port.to_string(),
            "--mtu", "100",
            "--count", "2",
            "--interval-ms", "10",
            "--negative",
            "--no-color",
        ])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Negative TCP test failed"));
}

#[test]
fn test_tcp_probe_lines_match_format() {
    let port = spawn_echo_listener();
    let dir = TempDir::new().unwrap();

    let output = create_test_cmd(&dir)
        .args([
            "--protocol", "tcp",
            "--server", "127.0.0.1",
            "--port", &port.to_string(),
            "--mtu", "100",
            "--count", "3",
            "--interval-ms", "10",
            "--no-color",
        ])
        .output()
        .unwrap();

    let stdout = String::from_utf8_lossy(&output.stdout);
    let line = regex::Regex::new(r"^100 bytes from 127\.0\.0\.1:\d+: tcp_seq=\d+ time=\d+\.\d{3}ms$").unwrap();
    let probes = stdout.lines().filter(|l| line.is_match(l)).count();
    assert_eq!(probes, 3, "stdout was:\n{}", stdout);
}
