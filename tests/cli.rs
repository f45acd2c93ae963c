//! End-to-end tests for the pxstream binary.

use std::fs;
use std::process::{Command, Output};
use tempfile::TempDir;

fn pxstream(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_pxstream"))
        .args(args)
        .output()
        .expect("failed to run pxstream")
}

fn stdout_of(output: &Output) -> String {
    assert!(
        output.status.success(),
        "pxstream failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout.clone()).unwrap()
}

fn write_px(dir: &TempDir, content: &str) -> String {
    let path = dir.path().join("table.px");
    fs::write(&path, content).unwrap();
    path.to_string_lossy().into_owned()
}

const TABLE: &str = concat!(
    "CHARSET=\"ANSI\";\nMATRIX=\"T1\";\n",
    "DATA=\n1 2 3 4\n5 \"...\" 7 8.25\n9 10 11 12;\n",
);

#[test]
fn test_locate() {
    let dir = TempDir::new().unwrap();
    let path = write_px(&dir, TABLE);

    let out = stdout_of(&pxstream(&["locate", "-i", &path]));
    assert_eq!(out.trim(), "34");

    let out = stdout_of(&pxstream(&["locate", "-i", &path, "--keyword", "MATRIX"]));
    assert_eq!(out.trim(), "23");
}

#[test]
fn test_locate_missing_keyword_fails() {
    let dir = TempDir::new().unwrap();
    let path = write_px(&dir, "TITLE=\"no data\";\n");

    let output = pxstream(&["locate", "-i", &path]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).starts_with("Error:"));
}

#[test]
fn test_read_selection() {
    let dir = TempDir::new().unwrap();
    let path = write_px(&dir, TABLE);

    let out = stdout_of(&pxstream(&[
        "read", "-i", &path, "--rows", "1-2", "--cols", "0,1,3",
    ]));
    assert_eq!(out, "5\t\"...\"\t8.25\n9\t10\t12\n");
}

#[test]
fn test_read_mmap_and_small_buffer_agree() {
    let dir = TempDir::new().unwrap();
    let path = write_px(&dir, TABLE);
    let args = ["read", "-i", &path, "--rows", "0-2", "--cols", "0-3"];

    let plain = stdout_of(&pxstream(&args));
    let mut mmap_args = args.to_vec();
    mmap_args.push("--mmap");
    let mapped = stdout_of(&pxstream(&mmap_args));
    let mut tiny_args = args.to_vec();
    tiny_args.extend(["--buffer-size", "3"]);
    let tiny = stdout_of(&pxstream(&tiny_args));

    assert_eq!(plain, mapped);
    assert_eq!(plain, tiny);
    assert_eq!(plain.lines().count(), 3);
}

#[test]
fn test_read_decimal() {
    let dir = TempDir::new().unwrap();
    let path = write_px(&dir, "DATA=\n0.10 -2.50;\n");

    let out = stdout_of(&pxstream(&[
        "read", "-i", &path, "--rows", "0", "--cols", "0,1", "--decimal",
    ]));
    assert_eq!(out, "0.10\t-2.50\n");
}

#[test]
fn test_read_out_of_range_fails() {
    let dir = TempDir::new().unwrap();
    let path = write_px(&dir, TABLE);

    let output = pxstream(&["read", "-i", &path, "--rows", "7", "--cols", "0"]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_generate_then_read() {
    let dir = TempDir::new().unwrap();
    let generated = stdout_of(&pxstream(&[
        "generate",
        "--rows",
        "6",
        "--cols",
        "4",
        "--missing-rate",
        "0.25",
        "--seed",
        "9",
    ]));
    let path = write_px(&dir, &generated);

    let out = stdout_of(&pxstream(&["read", "-i", &path, "--rows", "0-5", "--cols", "0-3"]));
    assert_eq!(out.lines().count(), 6);
    assert!(out.lines().all(|line| line.split('\t').count() == 4));

    let again = stdout_of(&pxstream(&[
        "generate",
        "--rows",
        "6",
        "--cols",
        "4",
        "--missing-rate",
        "0.25",
        "--seed",
        "9",
    ]));
    assert_eq!(generated, again);
}
