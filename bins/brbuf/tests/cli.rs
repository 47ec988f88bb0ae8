//! End-to-end runs of the brbuf binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

fn brbuf() -> Command {
    let mut cmd = Command::cargo_bin("brbuf").unwrap();
    cmd.env_remove("BROTLI_BUFFER_WORKERS")
        .env_remove("BROTLI_BUFFER_QUALITY")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn compress_then_decompress_restores_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let raw = dir.path().join("data.txt");
    let text = "brotli buffers round trip through the command line. ".repeat(100);
    fs::write(&raw, &text).unwrap();

    brbuf()
        .current_dir(dir.path())
        .args(["compress", "data.txt", "-q", "5"])
        .assert()
        .success();
    assert!(dir.path().join("data.txt.br").exists());

    brbuf()
        .current_dir(dir.path())
        .args(["decompress", "data.txt.br", "-o", "restored.txt"])
        .assert()
        .success();
    assert_eq!(fs::read_to_string(dir.path().join("restored.txt")).unwrap(), text);
}

#[test]
fn verify_accepts_a_matching_fixture() {
    let dir = tempfile::tempdir().unwrap();
    let text: String = (0..400).map(|i| format!("line {i}: value {}\n", i * i % 97)).collect();
    fs::write(dir.path().join("data.txt"), text).unwrap();

    brbuf()
        .current_dir(dir.path())
        .args(["compress", "data.txt", "-q", "3", "-o", "data.txt.compressed.03"])
        .assert()
        .success();

    brbuf()
        .current_dir(dir.path())
        .args(["verify", "data.txt", "data.txt.compressed.03", "-q", "3"])
        .assert()
        .success()
        .stderr(predicate::str::contains("matches"));

    brbuf()
        .current_dir(dir.path())
        .args(["verify", "data.txt", "data.txt.compressed.03", "-q", "9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not match"));
}

#[test]
fn out_of_range_quality_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.bin"), [1u8, 2, 3]).unwrap();

    brbuf()
        .current_dir(dir.path())
        .args(["compress", "a.bin", "-q", "12"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid quality"));
}

#[test]
fn corrupt_input_fails_to_decompress() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("junk.br"), b"definitely not brotli data at all").unwrap();

    brbuf()
        .current_dir(dir.path())
        .args(["decompress", "junk.br"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("decompress failed"));
}

#[test]
fn stats_are_printed_on_request() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("s.txt"), "stats ".repeat(10)).unwrap();

    brbuf()
        .current_dir(dir.path())
        .args(["--stats", "compress", "s.txt", "-q", "1", "-o", "-"])
        .assert()
        .success()
        .stderr(predicate::str::contains("compress.calls"));
}

#[test]
fn trailing_bytes_fail_to_decompress() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("t.txt"), "hello hello hello").unwrap();

    brbuf()
        .current_dir(dir.path())
        .args(["compress", "t.txt", "-q", "5"])
        .assert()
        .success();

    let mut padded = fs::read(dir.path().join("t.txt.br")).unwrap();
    padded.extend_from_slice(b"GARBAGE-TRAILER");
    fs::write(dir.path().join("t.txt.br"), padded).unwrap();

    brbuf()
        .current_dir(dir.path())
        .args(["decompress", "t.txt.br", "-o", "-"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("trailing data"));
}

#[test]
fn missing_br_extension_is_warned_about() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("w.txt"), "warn me ".repeat(20)).unwrap();

    brbuf()
        .current_dir(dir.path())
        .args(["compress", "w.txt", "-q", "2", "-o", "w.packed"])
        .assert()
        .success();

    brbuf()
        .current_dir(dir.path())
        .args(["decompress", "w.packed"])
        .assert()
        .success()
        .stderr(predicate::str::contains("has no .br extension"));
    assert!(dir.path().join("w.packed.out").exists());
}

#[test]
fn json_logs_and_worker_gauge() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("j.txt"), "json ".repeat(20)).unwrap();

    brbuf()
        .current_dir(dir.path())
        .args(["-v", "--log-json", "--stats", "--workers", "2", "compress", "j.txt", "-o", "-"])
        .assert()
        .success()
        .stderr(predicate::str::contains("\"level\":\"DEBUG\""))
        .stderr(predicate::str::contains("engine.worker_threads"))
        .stderr(predicate::str::contains("operations.in_flight"));
}
