use assert_cmd::prelude::*;
use assert_fs::prelude::*;
use predicates::prelude::*;
use std::process::Command;

/// Binary with a clean environment, rooted at `dir`
fn nativepatch(dir: &assert_fs::TempDir) -> Command {
    let mut cmd = Command::cargo_bin("nativepatch").expect("nativepatch binary");
    cmd.arg("--no-color")
        .arg("--root")
        .arg(dir.path())
        .env_remove("CI")
        .env_remove("NATIVEPATCH_LOG")
        .env_remove("NATIVEPATCH_CI");
    cmd
}

fn project() -> assert_fs::TempDir {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    dir.child("ios/first.txt").write_str("one\ntwo\nthree\n").unwrap();
    dir.child("android/first.txt").write_str("one\ntwo\nthree\n").unwrap();
    dir
}

#[test]
fn init_patch_apply_round() {
    let dir = project();

    nativepatch(&dir).arg("init").assert().success();
    dir.child(".nativepatch/.git").assert(predicate::path::is_dir());

    dir.child("ios/first.txt").write_str("one\nfour\nthree\n").unwrap();
    nativepatch(&dir)
        .arg("patch")
        .assert()
        .success()
        .stderr(predicate::str::contains("Patch created in patch/current.patch"));
    dir.child("patch/current.patch")
        .assert(predicate::str::contains("+four"));

    dir.child("ios/first.txt").write_str("one\ntwo\nthree\n").unwrap();
    nativepatch(&dir)
        .arg("apply")
        .assert()
        .success()
        .stderr(predicate::str::contains("Patch successfully applied"));
    dir.child("ios/first.txt").assert("one\nfour\nthree\n");
}

#[test]
fn status_json_lists_patch_files() {
    let dir = project();
    nativepatch(&dir).arg("init").assert().success();
    dir.child("android/first.txt").write_str("one\nzwei\nthree\n").unwrap();
    nativepatch(&dir).arg("patch").assert().success();

    let output = nativepatch(&dir).args(["status", "--json"]).output().unwrap();
    assert!(output.status.success());
    let v: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid json");
    assert_eq!(v["snapshot"]["initialized"], true);
    assert_eq!(v["patch"]["files"][0]["path"], "android/first.txt");
    assert!(v["rejected"].is_null());
}

#[test]
fn missing_patch_fails_only_when_strict() {
    let dir = project();
    nativepatch(&dir).arg("init").assert().success();

    nativepatch(&dir)
        .arg("apply")
        .assert()
        .success()
        .stderr(predicate::str::contains("No patch found"));

    nativepatch(&dir)
        .args(["apply", "--strict", "--ci"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("current.patch"));
}

#[test]
fn errors_exit_non_zero_in_ci_mode() {
    let dir = assert_fs::TempDir::new().unwrap();

    // No native folders: interactive runs only log
    nativepatch(&dir).arg("init").assert().success();
    nativepatch(&dir).args(["--ci", "init"]).assert().code(1);
    nativepatch(&dir).arg("init").env("CI", "true").assert().code(1);
}

#[test]
fn track_runs_program_in_both_trees() {
    let dir = project();
    nativepatch(&dir).arg("init").assert().success();

    nativepatch(&dir)
        .args(["track", "--", "sh", "-c", "echo plugin > \"$NATIVEPATCH_NATIVE_PATH/ios/plugin.txt\""])
        .assert()
        .success();
    dir.child("ios/plugin.txt").assert("plugin\n");
    dir.child(".nativepatch/ios/plugin.txt").assert("plugin\n");

    nativepatch(&dir)
        .arg("patch")
        .assert()
        .success()
        .stderr(predicate::str::contains("No changes to patch found"));
}

#[test]
fn config_writes_default_file() {
    let dir = assert_fs::TempDir::new().unwrap();
    nativepatch(&dir)
        .arg("config")
        .arg(dir.path())
        .assert()
        .success();
    dir.child("nativepatch.toml")
        .assert(predicate::str::contains("snapshot_dir = \".nativepatch\""));

    nativepatch(&dir)
        .args(["--ci", "config"])
        .arg(dir.path())
        .assert()
        .failure();
}

#[test]
fn completions_print_to_stdout() {
    let dir = assert_fs::TempDir::new().unwrap();
    nativepatch(&dir)
        .args(["completions", "bash", "--stdout"])
        .assert()
        .success()
        .stdout(predicate::str::contains("nativepatch"));
}
