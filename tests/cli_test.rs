//! Command-line behaviour of the shipped binaries

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::tempdir;

fn run_bin(exe: &str, dir: &Path, args: &[&str]) -> Output {
    Command::new(exe)
        .args(args)
        .current_dir(dir)
        .env("RUST_LOG", "off")
        .output()
        .unwrap()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn test_demo_without_data_file_exits_with_error() {
    let dir = tempdir().unwrap();
    let output = run_bin(env!("CARGO_BIN_EXE_demo"), dir.path(), &[]);

    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("ERROR: cctv_data.csv not found!"));
}

#[test]
fn test_train_without_data_file_exits_with_error() {
    let dir = tempdir().unwrap();
    let output = run_bin(env!("CARGO_BIN_EXE_train"), dir.path(), &["--data", "absent.csv"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("ERROR: absent.csv not found!"));
}

#[test]
fn test_generate_then_demo_succeeds() {
    let dir = tempdir().unwrap();

    let generated = run_bin(
        env!("CARGO_BIN_EXE_generate_data"),
        dir.path(),
        &["--rows", "50", "--seed", "3"],
    );
    assert!(generated.status.success(), "{}", stderr(&generated));
    assert!(dir.path().join("cctv_data.csv").exists());

    let demo = run_bin(env!("CARGO_BIN_EXE_demo"), dir.path(), &["--seed", "1"]);
    assert!(demo.status.success(), "{}", stderr(&demo));

    let stdout = String::from_utf8_lossy(&demo.stdout);
    assert!(stdout.contains("Data loaded: 50 CCTV records"));
    assert!(stdout.contains("Test set: 10 samples"));
}

#[test]
fn test_inverted_generator_range_is_reported() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("stampede.toml"),
        "[generator]\npeople_range = [500, 50]\n",
    )
    .unwrap();

    let output = run_bin(env!("CARGO_BIN_EXE_generate_data"), dir.path(), &["--seed", "1"]);

    assert_eq!(output.status.code(), Some(1));
    let err = stderr(&output);
    assert!(err.contains("ERROR:"));
    assert!(err.contains("people_range"));
    assert!(!dir.path().join("cctv_data.csv").exists());
}
