//! CLI options interaction tests
//!
//! Full runs point the binary at missing or fake tools so every method
//! fails fast without sing-box installed.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::net::TcpListener;
use std::process::Command;
use tempfile::TempDir;

const ENV_VARS: &[&str] = &[
    "SINGBOX_PATH",
    "OPENSSL_PATH",
    "CURL_PATH",
    "BENCH_METHODS",
    "BENCH_DURATION_SECONDS",
    "BENCH_HTTP_PORT",
    "BENCH_MAX_BYTES",
    "ENABLE_COLOR",
];

/// Command running inside an empty directory so no stray .env is picked up
fn create_test_cmd(cwd: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("tunnel-bench").unwrap();
    cmd.current_dir(cwd.path());
    for var in ENV_VARS {
        cmd.env_remove(var);
    }
    cmd
}

fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port()
}

/// Arguments for a run in which no tunnel can ever start
fn failing_run_args(http_port: u16) -> Vec<String> {
    [
        "--singbox", "/nonexistent/sing-box",
        "--openssl", "/nonexistent/openssl",
        "--curl", "/nonexistent/curl",
        "--method", "none",
        "--method", "aes-256-gcm",
        "--duration", "1",
        "--no-color",
    ]
    .iter()
    .map(|s| s.to_string())
    .chain(["--http-port".to_string(), http_port.to_string()])
    .collect()
}

#[test]
fn test_help_lists_options() {
    let cwd = TempDir::new().unwrap();
    create_test_cmd(&cwd)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--method"))
        .stdout(predicate::str::contains("--duration"))
        .stdout(predicate::str::contains("--keep-workdir"));
}

#[test]
fn test_env_help() {
    let cwd = TempDir::new().unwrap();
    create_test_cmd(&cwd)
        .arg("--env-help")
        .assert()
        .success()
        .stdout(predicate::str::contains("BENCH_METHODS"))
        .stdout(predicate::str::contains("Configuration Priority"));
}

#[test]
fn test_invalid_arguments_rejected() {
    let cwd = TempDir::new().unwrap();

    create_test_cmd(&cwd).args(["--duration", "0"]).assert().failure();
    create_test_cmd(&cwd).args(["--transfer", "wget"]).assert().failure();
    create_test_cmd(&cwd).args(["--http-port", "70000"]).assert().failure();

    create_test_cmd(&cwd)
        .args(["--color", "--no-color"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("VALIDATION"));
}

#[test]
fn test_duplicate_method_is_config_error() {
    let cwd = TempDir::new().unwrap();
    create_test_cmd(&cwd)
        .args(["--no-color", "-m", "none", "-m", "none"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("CONFIG"))
        .stderr(predicate::str::contains("Method listed twice"));
}

#[test]
fn test_invalid_env_value_is_config_error() {
    let cwd = TempDir::new().unwrap();
    create_test_cmd(&cwd)
        .env("BENCH_DURATION_SECONDS", "soon")
        .arg("--no-color")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("BENCH_DURATION_SECONDS"));
}

#[test]
fn test_failed_methods_still_exit_zero() {
    let cwd = TempDir::new().unwrap();
    create_test_cmd(&cwd)
        .args(failing_run_args(free_port()))
        .assert()
        .success()
        .stdout(predicate::str::contains("=== none ==="))
        .stdout(predicate::str::contains("=== aes-256-gcm ==="))
        .stdout(predicate::str::contains("SUMMARY"))
        .stdout(predicate::str::is_match(r"(?m)^none\s+FAILED$").unwrap())
        .stdout(predicate::str::is_match(r"(?m)^aes-256-gcm\s+FAILED$").unwrap())
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_json_output_keeps_stdout_clean() {
    let cwd = TempDir::new().unwrap();
    let output = create_test_cmd(&cwd)
        .args(failing_run_args(free_port()))
        .arg("--json")
        .output()
        .unwrap();

    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["successful"], 0);
    assert_eq!(report["failed"], 2);
    assert_eq!(report["results"][0]["method"], "none");
    assert_eq!(report["results"][1]["ports"]["server"], 20002);
    assert_eq!(report["results"][1]["ports"]["client"], 15002);
    assert!(String::from_utf8_lossy(&output.stderr).contains("=== none ==="));
}

#[test]
fn test_keep_workdir_prints_path() {
    let cwd = TempDir::new().unwrap();
    let output = create_test_cmd(&cwd)
        .args(failing_run_args(free_port()))
        .arg("--keep-workdir")
        .output()
        .unwrap();

    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    let line = stderr
        .lines()
        .find(|l| l.starts_with("Tunnel configs kept in "))
        .unwrap();
    let path = std::path::PathBuf::from(line.trim_start_matches("Tunnel configs kept in "));
    assert!(path.is_dir());
    std::fs::remove_dir_all(path).unwrap();
}

#[test]
fn test_busy_http_port_is_stream_error() {
    let cwd = TempDir::new().unwrap();
    let busy = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = busy.local_addr().unwrap().port();

    create_test_cmd(&cwd)
        .args(failing_run_args(port))
        .assert()
        .code(4)
        .stderr(predicate::str::contains("STREAM"));
}

/// Executable shell scripts standing in for sing-box, openssl and curl
#[cfg(unix)]
struct FakeTools {
    dir: TempDir,
}

#[cfg(unix)]
impl FakeTools {
    fn new() -> Self {
        let tools = Self { dir: TempDir::new().unwrap() };
        tools.write(
            "openssl",
            r#"if [ "$3" = "16" ]; then echo AAAAAAAAAAAAAAAAAAAAAA==; else echo AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA=; fi"#,
        );
        tools
    }

    fn write(&self, name: &str, body: &str) -> String {
        use std::os::unix::fs::PermissionsExt;

        let path = self.dir.path().join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.to_string_lossy().into_owned()
    }

    fn path(&self, name: &str) -> String {
        self.dir.path().join(name).to_string_lossy().into_owned()
    }

    /// Pids appended to `file` by the scripts
    fn pids(&self, file: &str) -> Vec<i32> {
        std::fs::read_to_string(self.dir.path().join(file))
            .unwrap_or_default()
            .lines()
            .filter_map(|line| line.trim().parse().ok())
            .collect()
    }
}

/// Alive and not a zombie left behind by the exited bench
#[cfg(unix)]
fn is_running(pid: i32) -> bool {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    if kill(Pid::from_raw(pid), None).is_err() {
        return false;
    }
    match std::fs::read_to_string(format!("/proc/{}/stat", pid)) {
        Ok(stat) => !stat
            .rsplit(')')
            .next()
            .map(|rest| rest.trim_start().starts_with('Z'))
            .unwrap_or(false),
        Err(_) => true,
    }
}

#[cfg(unix)]
#[test]
fn test_fake_tunnel_exit_reported_as_failure() {
    let cwd = TempDir::new().unwrap();
    let tools = FakeTools::new();
    let singbox = tools.write("sing-box", "echo 'FATAL[0000] decode config: unknown method' >&2\nexit 1");

    create_test_cmd(&cwd)
        .args(["--singbox", &singbox])
        .args(["--openssl", &tools.path("openssl")])
        .args(["--method", "aes-128-gcm", "--duration", "1", "--no-color", "--verbose"])
        .args(["--http-port", &free_port().to_string()])
        .assert()
        .success()
        .stdout(predicate::str::contains("FAILED"))
        .stdout(predicate::str::contains("unknown method"))
        .stdout(predicate::str::contains("ports: server:20000 client:15000"));
}

#[cfg(unix)]
#[test]
fn test_interrupt_exits_one_and_stops_tunnels() {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;
    use std::io::Read;
    use std::process::Stdio;
    use std::time::{Duration, Instant};

    let cwd = TempDir::new().unwrap();
    let tools = FakeTools::new();
    let tunnel_pids = tools.path("tunnel.pids");
    let curl_pids = tools.path("curl.pids");
    let singbox = tools.write("sing-box", &format!("echo $$ >> '{}'\nexec sleep 300", tunnel_pids));
    let curl = tools.write("curl", &format!("echo $$ >> '{}'\nexec sleep 300", curl_pids));

    let mut child = create_test_cmd(&cwd)
        .args(["--singbox", &singbox])
        .args(["--openssl", &tools.path("openssl")])
        .args(["--curl", &curl])
        .args(["--method", "aes-128-gcm", "--duration", "30", "--no-color"])
        .args(["--http-port", &free_port().to_string()])
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();

    // Both tunnels are up once the transfer has started
    let deadline = Instant::now() + Duration::from_secs(20);
    while tools.pids("curl.pids").is_empty() {
        assert!(Instant::now() < deadline, "transfer never started");
        assert!(child.try_wait().unwrap().is_none(), "bench exited early");
        std::thread::sleep(Duration::from_millis(50));
    }
    assert_eq!(tools.pids("tunnel.pids").len(), 2);

    kill(Pid::from_raw(child.id() as i32), Signal::SIGINT).unwrap();

    let deadline = Instant::now() + Duration::from_secs(20);
    let status = loop {
        if let Some(status) = child.try_wait().unwrap() {
            break status;
        }
        if Instant::now() > deadline {
            let _ = child.kill();
            panic!("bench did not exit after SIGINT");
        }
        std::thread::sleep(Duration::from_millis(50));
    };

    let mut stdout = String::new();
    child.stdout.take().unwrap().read_to_string(&mut stdout).unwrap();
    assert_eq!(status.code(), Some(1));
    assert!(stdout.contains("Interrupted."));

    let spawned: Vec<i32> = tools.pids("tunnel.pids").into_iter().chain(tools.pids("curl.pids")).collect();
    let deadline = Instant::now() + Duration::from_secs(5);
    while spawned.iter().any(|&pid| is_running(pid)) {
        assert!(Instant::now() < deadline, "children still running: {:?}", spawned);
        std::thread::sleep(Duration::from_millis(50));
    }
}
