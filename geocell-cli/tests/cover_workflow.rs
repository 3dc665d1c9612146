//! Integration tests for the cell pipeline commands.
//!
//! These tests drive the compiled binary end to end: encoding points,
//! covering shapes, and folding cell streams through combine,
//! normalize and optimize. Every invocation gets a throwaway HOME so
//! config and log files never touch the real one.
//!
//! # Running Integration Tests
//!
//! Integration tests are excluded from regular test runs. Build the
//! binary first, then:
//! ```bash
//! cargo test -p geocell-cli --test '*' -- --ignored
//! ```

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tempfile::TempDir;

/// Get the path to the geocell CLI binary.
fn cli_binary() -> PathBuf {
    let debug_path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .join("target/debug/geocell");

    if debug_path.exists() {
        return debug_path;
    }

    let release_path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .join("target/release/geocell");

    if release_path.exists() {
        return release_path;
    }

    panic!("CLI binary not found. Run `cargo build` first.");
}

/// Run a CLI command with HOME pointed at `home` and capture output.
fn run_cli(args: &[&str], home: &Path) -> std::process::Output {
    Command::new(cli_binary())
        .args(args)
        .env("HOME", home)
        .output()
        .expect("Failed to execute CLI command")
}

/// Run a CLI command feeding `input` through stdin.
fn run_cli_with_stdin(args: &[&str], home: &Path, input: &str) -> std::process::Output {
    let mut child = Command::new(cli_binary())
        .args(args)
        .env("HOME", home)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to spawn CLI command");

    child
        .stdin
        .as_mut()
        .expect("stdin not captured")
        .write_all(input.as_bytes())
        .expect("Failed to write stdin");

    child.wait_with_output().expect("Failed to wait for CLI command")
}

/// Assert a command succeeded.
fn assert_success(output: &std::process::Output, context: &str) {
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        panic!(
            "{} failed:\nstdout: {}\nstderr: {}",
            context, stdout, stderr
        );
    }
}

fn stdout_of(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

#[test]
#[ignore = "integration test - requires the built binary"]
fn test_encode_decode_round_trip() {
    let temp = TempDir::new().expect("Failed to create temp dir");

    let output = run_cli(
        &["encode", "--lat", "0.5", "--lon", "0.5", "-r", "8"],
        temp.path(),
    );
    assert_success(&output, "encode");
    assert_eq!(stdout_of(&output).trim(), "c000");

    let output = run_cli(&["decode", "c000"], temp.path());
    assert_success(&output, "decode");

    let report = stdout_of(&output);
    assert!(report.contains("cell:       c000"), "got: {}", report);
    assert!(report.contains("resolution: 8"), "got: {}", report);
}

#[test]
#[ignore = "integration test - requires the built binary"]
fn test_decode_json_reports_center_and_bounds() {
    let temp = TempDir::new().expect("Failed to create temp dir");

    let output = run_cli(&["decode", "c000", "--json"], temp.path());
    assert_success(&output, "decode --json");

    let report: serde_json::Value =
        serde_json::from_str(&stdout_of(&output)).expect("Failed to parse JSON report");

    assert_eq!(report["cell"], "c000");
    assert_eq!(report["resolution"], 8);
    // Cell c000 spans lat 0..0.703125, lon 0..1.40625
    assert_eq!(report["center"]["lat"].as_f64(), Some(0.3515625));
    assert_eq!(report["center"]["lon"].as_f64(), Some(0.703125));
    assert_eq!(report["bounds"]["south"].as_f64(), Some(0.0));
    assert_eq!(report["bounds"]["north"].as_f64(), Some(0.703125));
    assert_eq!(report["bounds"]["east"].as_f64(), Some(1.40625));
}

#[test]
#[ignore = "integration test - requires the built binary"]
fn test_cover_rect_emits_sorted_cells() {
    let temp = TempDir::new().expect("Failed to create temp dir");

    let output = run_cli(&["cover", "rect:0:0,1:1", "-r", "8"], temp.path());
    assert_success(&output, "cover rect");

    // A one degree square north-east of the origin spans two grid rows
    // and one column at resolution 8
    assert_eq!(stdout_of(&output), "c000\nc002\n");
}

#[test]
#[ignore = "integration test - requires the built binary"]
fn test_cover_difference_expression() {
    let temp = TempDir::new().expect("Failed to create temp dir");

    let output = run_cli(
        &["cover", "+rect:0:0,2:2 -rect:0:0,1:1", "-r", "8"],
        temp.path(),
    );
    assert_success(&output, "cover with difference");

    assert_eq!(stdout_of(&output), "c001\nc003\nc008\nc009\n");
}

#[test]
#[ignore = "integration test - requires the built binary"]
fn test_cover_kml_output() {
    let temp = TempDir::new().expect("Failed to create temp dir");

    let output = run_cli(&["cover", "rect:0:0,1:1", "-r", "8", "--kml"], temp.path());
    assert_success(&output, "cover --kml");

    let kml = stdout_of(&output);
    assert!(kml.starts_with("<?xml"), "got: {}", kml);
    assert_eq!(kml.matches("<Placemark>").count(), 2);
    assert!(kml.contains("<name>c000</name>"));
}

#[test]
#[ignore = "integration test - requires the built binary"]
fn test_combine_difference_of_files() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let first = temp.path().join("first.cells");
    let second = temp.path().join("second.cells");
    fs::write(&first, "c000\nc002\n").expect("Failed to write first stream");
    fs::write(&second, "c000\n").expect("Failed to write second stream");

    let output = run_cli(
        &[
            "combine",
            "difference",
            first.to_str().unwrap(),
            second.to_str().unwrap(),
        ],
        temp.path(),
    );
    assert_success(&output, "combine difference");

    assert_eq!(stdout_of(&output), "c002\n");
}

#[test]
#[ignore = "integration test - requires the built binary"]
fn test_normalize_then_optimize_round_trips() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let coarse = temp.path().join("coarse.cells");
    let expanded = temp.path().join("expanded.cells");
    let collapsed = temp.path().join("collapsed.cells");
    fs::write(&coarse, "c0\n").expect("Failed to write input stream");

    let output = run_cli(
        &[
            "normalize",
            coarse.to_str().unwrap(),
            "-r",
            "6",
            "-o",
            expanded.to_str().unwrap(),
        ],
        temp.path(),
    );
    assert_success(&output, "normalize");

    let lines = fs::read_to_string(&expanded).expect("Failed to read expanded stream");
    assert_eq!(lines.lines().count(), 16, "sixteen children at resolution 6");

    let output = run_cli(
        &[
            "optimize",
            expanded.to_str().unwrap(),
            "-o",
            collapsed.to_str().unwrap(),
        ],
        temp.path(),
    );
    assert_success(&output, "optimize");

    assert_eq!(
        fs::read_to_string(&collapsed).expect("Failed to read collapsed stream"),
        "c0\n",
        "a full sibling group collapses back to its parent"
    );
}

#[test]
#[ignore = "integration test - requires the built binary"]
fn test_optimize_reads_stdin() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let children: String = (0..16).map(|d| format!("b5{d:x}\n")).collect();

    let output = run_cli_with_stdin(&["optimize", "-"], temp.path(), &children);
    assert_success(&output, "optimize from stdin");

    assert_eq!(stdout_of(&output), "b5\n");
}

#[test]
#[ignore = "integration test - requires the built binary"]
fn test_usage_errors_exit_with_one() {
    let temp = TempDir::new().expect("Failed to create temp dir");

    let output = run_cli(&["decode", "xyz"], temp.path());
    assert_eq!(output.status.code(), Some(1));
    assert!(
        String::from_utf8_lossy(&output.stderr).contains("Invalid argument"),
        "stderr should name the bad argument"
    );

    let output = run_cli(&["combine", "union", "-", "-"], temp.path());
    assert_eq!(output.status.code(), Some(1), "two stdin inputs are rejected");
}

#[test]
#[ignore = "integration test - requires the built binary"]
fn test_missing_config_file_exits_with_two() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let config = temp.path().join("absent.ini");

    let output = run_cli(
        &[
            "--config",
            config.to_str().unwrap(),
            "encode",
            "--lat",
            "0",
            "--lon",
            "0",
        ],
        temp.path(),
    );

    assert_eq!(output.status.code(), Some(2));
    assert!(
        String::from_utf8_lossy(&output.stderr).contains("config file not found"),
        "stderr should name the missing config"
    );
}

#[test]
#[ignore = "integration test - requires the built binary"]
fn test_config_defaults_apply_to_cover() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let config_dir = temp.path().join(".geocell");
    fs::create_dir_all(&config_dir).expect("Failed to create config dir");
    fs::write(config_dir.join("config.ini"), "[cover]\nresolution = 8\n")
        .expect("Failed to write config");

    // No -r on the command line, the config supplies it
    let output = run_cli(&["cover", "rect:0:0,1:1"], temp.path());
    assert_success(&output, "cover with configured resolution");

    assert_eq!(stdout_of(&output), "c000\nc002\n");
}
