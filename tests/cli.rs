use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn help_lists_subcommands() {
    let mut cmd = Command::cargo_bin("noteship").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicates::str::contains("token"))
        .stdout(predicates::str::contains("info"))
        .stdout(predicates::str::contains("upload"))
        .stdout(predicates::str::contains("process"));
}

#[test]
fn info_without_env_file_fails_with_config_error() {
    let temp_dir = tempfile::tempdir().unwrap();

    let mut cmd = Command::cargo_bin("noteship").unwrap();
    cmd.current_dir(temp_dir.path())
        .arg("info")
        .assert()
        .failure()
        .stderr(predicates::str::contains("Error"));
}

#[test]
fn explicit_env_file_overrides_cwd() {
    let temp_dir = tempfile::tempdir().unwrap();
    // A .env exists in the cwd, but the explicit path does not
    std::fs::write(
        temp_dir.path().join(".env"),
        "TRILIUM_SERVER=http://127.0.0.1:9\nTRILIUM_TOKEN=tok\n",
    )
    .unwrap();

    let mut cmd = Command::cargo_bin("noteship").unwrap();
    cmd.current_dir(temp_dir.path())
        .arg("--env-file")
        .arg("missing.env")
        .arg("info")
        .assert()
        .failure()
        .stderr(predicates::str::contains("missing.env"));
}

#[test]
fn upload_rejects_missing_folder() {
    let temp_dir = tempfile::tempdir().unwrap();
    std::fs::write(
        temp_dir.path().join(".env"),
        "TRILIUM_SERVER=http://127.0.0.1:9\nTRILIUM_TOKEN=tok\n",
    )
    .unwrap();

    let mut cmd = Command::cargo_bin("noteship").unwrap();
    cmd.current_dir(temp_dir.path())
        .arg("upload")
        .arg("no-such-dir")
        .arg("--parent")
        .arg("Inbox")
        .assert()
        .failure()
        .stderr(predicates::str::contains("no-such-dir"));
}

#[test]
fn token_requires_password_when_not_a_terminal() {
    let temp_dir = tempfile::tempdir().unwrap();

    let mut cmd = Command::cargo_bin("noteship").unwrap();
    cmd.current_dir(temp_dir.path())
        .arg("token")
        .arg("--server")
        .arg("http://127.0.0.1:9")
        .assert()
        .failure()
        .stderr(predicates::str::contains("--password"));
}
