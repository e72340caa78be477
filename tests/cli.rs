use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn extsnap(log_dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("extsnap").unwrap();
    cmd.env_remove("EXTSNAP_BACKUP_DIR")
        .env_remove("EXTSNAP_CONFIG")
        .arg("--log-path")
        .arg(log_dir.join("extsnap.log"));
    cmd
}

#[test]
fn test_help() {
    let temp_dir = TempDir::new().unwrap();
    extsnap(temp_dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("prune"));
}

#[test]
fn test_successful_run_exits_zero() {
    let temp_dir = TempDir::new().unwrap();
    let source = temp_dir.path().join("source");
    let backup = temp_dir.path().join("backup");
    fs::create_dir_all(&source).unwrap();
    fs::write(source.join("a.txt"), b"a").unwrap();

    extsnap(temp_dir.path())
        .arg("run")
        .arg("--source-dirs")
        .arg(&source)
        .arg("--backup-dir")
        .arg(&backup)
        .args(["--extensions", "txt", "--execute"])
        .assert()
        .code(0)
        .stdout(predicate::str::contains("=== Backup Run Start ==="))
        .stdout(predicate::str::contains("=== Backup Run End ==="));

    let log = fs::read_to_string(temp_dir.path().join("extsnap.log")).unwrap();
    assert!(log.contains("Copied: 1"));
}

#[cfg(unix)]
#[test]
fn test_failed_copy_exits_with_distinct_code() {
    let temp_dir = TempDir::new().unwrap();
    let source = temp_dir.path().join("source");
    let backup = temp_dir.path().join("backup");
    fs::create_dir_all(&source).unwrap();
    fs::write(source.join("a.txt"), b"a").unwrap();
    fs::write(source.join("b.txt"), b"b").unwrap();

    // Dangling link: discovered like a file, unreadable at copy time
    std::os::unix::fs::symlink(source.join("gone.bin"), source.join("c.txt")).unwrap();

    extsnap(temp_dir.path())
        .arg("run")
        .arg("--source-dirs")
        .arg(&source)
        .arg("--backup-dir")
        .arg(&backup)
        .args(["--extensions", "txt", "--execute"])
        .assert()
        .code(2)
        .stdout(predicate::str::contains("Failed: 1"));
}

#[test]
fn test_dry_run_default_creates_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let source = temp_dir.path().join("source");
    let backup = temp_dir.path().join("backup");
    fs::create_dir_all(&source).unwrap();
    fs::write(source.join("a.txt"), b"a").unwrap();

    extsnap(temp_dir.path())
        .arg("run")
        .arg("--source-dirs")
        .arg(&source)
        .arg("--backup-dir")
        .arg(&backup)
        .args(["--extensions", "txt", "--delete-old"])
        .assert()
        .code(0)
        .stdout(predicate::str::contains("(Dry) Would copy"));

    assert!(!backup.exists());
}

#[test]
fn test_invalid_configuration_is_generic_failure() {
    let temp_dir = TempDir::new().unwrap();
    extsnap(temp_dir.path())
        .args(["run", "--extensions", "txt"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid backup configuration"));
}

#[test]
fn test_list_json() {
    let temp_dir = TempDir::new().unwrap();
    let backup = temp_dir.path().join("backup");
    fs::create_dir_all(backup.join("20200101_000000")).unwrap();
    fs::create_dir_all(backup.join("keep-me")).unwrap();

    extsnap(temp_dir.path())
        .arg("list")
        .arg("--backup-dir")
        .arg(&backup)
        .args(["--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"stamp\": \"20200101_000000\""))
        .stdout(predicate::str::contains("\"expired\": true"))
        .stdout(predicate::str::contains("keep-me").not());
}

#[test]
fn test_prune_requires_execute_and_delete_old() {
    let temp_dir = TempDir::new().unwrap();
    let backup = temp_dir.path().join("backup");
    fs::create_dir_all(backup.join("20200101_000000")).unwrap();

    extsnap(temp_dir.path())
        .arg("prune")
        .arg("--backup-dir")
        .arg(&backup)
        .arg("--delete-old")
        .assert()
        .success();
    assert!(backup.join("20200101_000000").exists());

    extsnap(temp_dir.path())
        .arg("prune")
        .arg("--backup-dir")
        .arg(&backup)
        .args(["--delete-old", "--execute"])
        .assert()
        .success();
    assert!(!backup.join("20200101_000000").exists());
}
