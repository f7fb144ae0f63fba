//! Integration tests for modsim-cli.
//!
//! Runs the `modsim` binary against bench files written to temporary
//! directories.

use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;

/// Helper to get the path to the `modsim` binary built by cargo.
fn modsim_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_modsim"))
}

const COUNTER: &str = r#"
name = "counter"

[[modules]]
label = "clk"
kind = "clock"

[[modules]]
label = "one"
kind = "switch"
[modules.data]
switch_set = "0001"

[[modules]]
label = "add"
kind = "addsub"

[[modules]]
label = "r1"
kind = "register"

[[modules]]
label = "r2"
kind = "register"

[[links]]
from = "clk.Phase 1"
to = "r1.Control in"

[[links]]
from = "clk.Phase 2"
to = "r2.Control in"

[[links]]
from = "one.Data"
to = "add.Input B"

[[links]]
from = "r2.Data out"
to = "add.Input A"

[[links]]
from = "add.Result"
to = "r1.Data in"

[[links]]
from = "r1.Data out"
to = "r2.Data in"
"#;

fn write_bench(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

// ---------------------------------------------------------------------------
// `modsim modules`
// ---------------------------------------------------------------------------

#[test]
fn cli_modules_lists_all_types() {
    let output = modsim_bin().arg("modules").output().expect("failed to run modsim modules");
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Available Modules"));
    for name in [
        "switch", "clock", "register", "ram", "logic", "addsub", "or", "mux", "demux", "fanout", "lshift",
        "rshift", "splitmerge",
    ] {
        assert!(stdout.contains(name), "listing should contain '{name}'");
    }
}

#[test]
fn cli_modules_shows_ports() {
    let output = modsim_bin()
        .args(["modules", "register"])
        .output()
        .expect("failed to run modsim modules register");
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Control in"));
    assert!(stdout.contains("Data out"));
    assert!(stdout.contains("breaks combinational loops"));
}

#[test]
fn cli_modules_unknown_type_fails() {
    let output = modsim_bin().args(["modules", "flux"]).output().unwrap();
    assert!(!output.status.success());
}

// ---------------------------------------------------------------------------
// `modsim check`
// ---------------------------------------------------------------------------

#[test]
fn cli_check_reports_counts() {
    let dir = TempDir::new().unwrap();
    let bench = write_bench(dir.path(), "counter.toml", COUNTER);
    let saved = dir.path().join("normalized.toml");

    let output = modsim_bin()
        .arg("check")
        .arg(&bench)
        .arg("--save")
        .arg(&saved)
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Modules: 5"));
    assert!(stdout.contains("Links:   6"));
    assert!(stdout.contains("OK"));
    assert!(saved.exists());
}

#[test]
fn cli_check_logs_to_stderr() {
    let dir = TempDir::new().unwrap();
    let bench = write_bench(dir.path(), "counter.toml", COUNTER);

    let output = modsim_bin().arg("check").arg(&bench).env("RUST_LOG", "info").output().unwrap();
    assert!(output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stderr.contains("loaded bench 'counter'"), "got: {stderr}");
    assert!(!stdout.contains("loaded bench"));
}

#[test]
fn cli_check_rejects_bad_link() {
    let dir = TempDir::new().unwrap();
    let bench = write_bench(
        dir.path(),
        "bad.toml",
        r#"
name = "bad"

[[modules]]
label = "a"
kind = "switch"

[[modules]]
label = "b"
kind = "switch"

[[links]]
from = "a.Data"
to = "b.Data"
"#,
    );
    let output = modsim_bin().arg("check").arg(&bench).output().unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("a.Data"), "got: {stderr}");
}

// ---------------------------------------------------------------------------
// `modsim run`
// ---------------------------------------------------------------------------

#[test]
fn cli_run_ticks_prints_watches() {
    let dir = TempDir::new().unwrap();
    let bench = write_bench(dir.path(), "counter.toml", COUNTER);

    let output = modsim_bin()
        .arg("run")
        .arg(&bench)
        .args(["--ticks", "8", "--watch", "r2.Data out"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("tick 0: r2.Data out=0000"));
    assert!(stdout.contains("tick 8: r2.Data out=0010"));
}

#[test]
fn cli_run_unknown_watch_fails() {
    let dir = TempDir::new().unwrap();
    let bench = write_bench(dir.path(), "counter.toml", COUNTER);
    let output = modsim_bin()
        .arg("run")
        .arg(&bench)
        .args(["--ticks", "1", "--watch", "r9.Data out"])
        .output()
        .unwrap();
    assert!(!output.status.success());
}
