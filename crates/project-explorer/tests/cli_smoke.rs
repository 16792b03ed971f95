use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;

const SETTINGS: &str = r#"{
    // test settings
    "context_menu": [
        {"label": "Diff", "command": "diff {0} {1}", "show_if_disabled": true},
        {"label": "Show", "command": "cat {selected}"}
    ],
    "open_with": [["\\.md$", "glow {path}"]]
}"#;

fn explorer(settings: &Path, data: &Path) -> Command {
    let mut cmd = Command::cargo_bin("project-explorer").expect("binary exists");
    cmd.arg("--settings")
        .arg(settings)
        .env("PROJECT_EXPLORER_TRASH_DIRECTORY", data.join("trash"))
        .env("PROJECT_EXPLORER_PROJECTS_DIRECTORY", data.join("projects"));
    cmd
}

fn write_settings(dir: &Path, contents: &str) -> std::path::PathBuf {
    let path = dir.join("settings.json");
    fs::write(&path, contents).expect("write settings");
    path
}

#[test]
fn help_displays_usage() {
    Command::cargo_bin("project-explorer")
        .expect("binary exists")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage"));
}

#[test]
fn menu_prints_visible_entries() {
    let temp = tempfile::tempdir().expect("tempdir");
    let settings = write_settings(temp.path(), SETTINGS);

    explorer(&settings, temp.path())
        .args(["menu", "/a", "/b"])
        .assert()
        .success()
        .stdout(predicate::str::contains("+ Diff  diff /a /b"))
        .stdout(predicate::str::contains("+ Show  cat /a /b"));

    explorer(&settings, temp.path())
        .args(["menu"])
        .assert()
        .success()
        .stdout(predicate::str::contains("- Diff  (disabled)"))
        .stdout(predicate::str::contains("Show").not());
}

#[test]
fn menu_json_lists_entries() {
    let temp = tempfile::tempdir().expect("tempdir");
    let settings = write_settings(temp.path(), SETTINGS);

    let output = explorer(&settings, temp.path())
        .args(["--json", "menu", "--all", "/only"])
        .output()
        .expect("run menu");
    assert!(output.status.success());

    let entries: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("menu output is JSON");
    assert_eq!(entries[0]["label"], "Diff");
    assert_eq!(entries[0]["enabled"], false);
    assert_eq!(entries[1]["command"], "cat /only");
}

#[test]
fn run_and_open_dry_run_print_commands() {
    let temp = tempfile::tempdir().expect("tempdir");
    let settings = write_settings(temp.path(), SETTINGS);

    explorer(&settings, temp.path())
        .args(["run", "--dry-run", "Diff", "/x", "/y z"])
        .assert()
        .success()
        .stdout("diff /x \"/y z\"\n");

    explorer(&settings, temp.path())
        .args(["run", "--dry-run", "Diff", "/x"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("disabled"));

    explorer(&settings, temp.path())
        .args(["open", "--dry-run", "/docs/README.md"])
        .assert()
        .success()
        .stdout("glow /docs/README.md\n");
}

#[test]
fn check_reports_skipped_entries() {
    let temp = tempfile::tempdir().expect("tempdir");
    let good = write_settings(temp.path(), SETTINGS);
    explorer(&good, temp.path())
        .arg("check")
        .assert()
        .success()
        .stdout(predicate::str::contains("menu rules: 2"));

    let bad = write_settings(
        temp.path(),
        r#"{"context_menu": [{"label": "Bad", "command": "x {nope}"}, {"command": "y"}]}"#,
    );
    explorer(&bad, temp.path())
        .arg("check")
        .assert()
        .failure()
        .stdout(predicate::str::contains("unsupported placeholder `{nope}`"))
        .stdout(predicate::str::contains("missing required field `label`"));
}

#[test]
fn file_operations_round_trip() {
    let temp = tempfile::tempdir().expect("tempdir");
    let settings = write_settings(temp.path(), SETTINGS);
    let work = temp.path().join("work");
    fs::create_dir_all(&work).expect("work dir");

    explorer(&settings, temp.path())
        .arg("new-file")
        .arg(&work)
        .assert()
        .success();
    explorer(&settings, temp.path())
        .arg("new-file")
        .arg(&work)
        .assert()
        .success()
        .stdout(predicate::str::contains("new_file (1)"));
    assert!(work.join("new_file").is_file());

    explorer(&settings, temp.path())
        .arg("paste")
        .arg("--into")
        .arg(&work)
        .arg(work.join("new_file"))
        .assert()
        .success()
        .stdout(predicate::str::contains("new_file (2)"));

    explorer(&settings, temp.path())
        .arg("trash")
        .arg(work.join("new_file"))
        .assert()
        .success()
        .stdout(predicate::str::contains("new_file@"));
    assert!(!work.join("new_file").exists());
    assert_eq!(
        fs::read_dir(temp.path().join("trash"))
            .expect("trash dir")
            .count(),
        1
    );
}

#[test]
fn projects_are_saved_and_listed() {
    let temp = tempfile::tempdir().expect("tempdir");
    let settings = write_settings(temp.path(), SETTINGS);

    explorer(&settings, temp.path())
        .args(["project", "next-name"])
        .assert()
        .success()
        .stdout("project_0\n");

    explorer(&settings, temp.path())
        .args(["project", "save", "work", "/srv/app", "/srv/docs", "--sizes", "300,500"])
        .assert()
        .success();

    explorer(&settings, temp.path())
        .args(["project", "list"])
        .assert()
        .success()
        .stdout("work\n");

    explorer(&settings, temp.path())
        .args(["project", "show", "work"])
        .assert()
        .success()
        .stdout(predicate::str::contains("/srv/docs (500)"));
}

#[test]
fn completions_are_generated() {
    let temp = tempfile::tempdir().expect("tempdir");
    let settings = write_settings(temp.path(), SETTINGS);

    explorer(&settings, temp.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("project-explorer"));
}
