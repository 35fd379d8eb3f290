//! End-to-end CLI tests against the real `tracker` binary, each isolated to
//! its own `$HOME`/`$XDG_DATA_HOME` so the plan database and config file
//! never touch the developer's real machine.
//!
//! Grounded on `worktoolai-taskai/tests/cli_integration.rs`'s `TestEnv`
//! helper shape (a `TempDir`-backed project directory plus a thin wrapper
//! over `assert_cmd::Command`), adapted to this CLI's plain-text output
//! instead of `--json`.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

struct TestEnv {
    project_dir: TempDir,
    home_dir: TempDir,
}

impl TestEnv {
    fn new() -> Self {
        let project_dir = TempDir::new().expect("create project tempdir");
        let home_dir = TempDir::new().expect("create home tempdir");
        Self {
            project_dir,
            home_dir,
        }
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("tracker").expect("tracker binary");
        cmd.current_dir(self.project_dir.path());
        cmd.env("HOME", self.home_dir.path());
        cmd.env("XDG_DATA_HOME", self.home_dir.path().join("data"));
        cmd.env("XDG_CONFIG_HOME", self.home_dir.path().join("config"));
        cmd
    }
}

#[test]
fn create_then_list_shows_the_new_plan() {
    let env = TestEnv::new();

    env.cmd()
        .args(["create", "Add retry logic"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created plan #1"));

    env.cmd()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("Add retry logic"))
        .stdout(predicate::str::contains("[open"));
}

#[test]
fn list_with_no_plans_says_so() {
    let env = TestEnv::new();

    env.cmd()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No plans yet"));
}

#[test]
fn status_command_updates_and_is_reflected_in_list() {
    let env = TestEnv::new();

    env.cmd().args(["create", "Ship the thing"]).assert().success();

    env.cmd()
        .args(["status", "1", "in-progress"])
        .assert()
        .success()
        .stdout(predicate::str::contains("status set to in-progress"));

    env.cmd()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("[in-progress"));
}

#[test]
fn status_command_rejects_unknown_status() {
    let env = TestEnv::new();

    env.cmd().args(["create", "Ship the thing"]).assert().success();

    env.cmd()
        .args(["status", "1", "sideways"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown status"));
}

#[test]
fn dependency_chain_round_trips() {
    let env = TestEnv::new();

    env.cmd().args(["create", "Design the schema"]).assert().success();
    env.cmd().args(["create", "Implement the migration"]).assert().success();

    env.cmd()
        .args(["set-dependency", "2", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#2 now depends on #1"));

    env.cmd()
        .args(["show-deps", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Design the schema"));

    env.cmd()
        .args(["clear-dependency", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cleared plan #2's dependency"));

    env.cmd()
        .args(["show-deps", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("has no dependencies"));
}

#[test]
fn cancel_is_rejected_while_a_dependent_exists() {
    let env = TestEnv::new();

    env.cmd().args(["create", "Design the schema"]).assert().success();
    env.cmd().args(["create", "Implement the migration"]).assert().success();
    env.cmd().args(["set-dependency", "2", "1"]).assert().success();

    env.cmd()
        .args(["cancel", "1"])
        .assert()
        .failure();
}

#[test]
fn config_with_no_args_prints_defaults() {
    let env = TestEnv::new();

    env.cmd()
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"maxReviewRounds\": 5"));
}

#[test]
fn config_get_and_set_a_single_key() {
    let env = TestEnv::new();

    env.cmd()
        .args(["config", "maxReviewRounds"])
        .assert()
        .success()
        .stdout(predicate::str::contains("5"));

    env.cmd()
        .args(["config", "maxReviewRounds", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Set maxReviewRounds = 3"));

    env.cmd()
        .args(["config", "maxReviewRounds"])
        .assert()
        .success()
        .stdout(predicate::str::contains("3"));
}

#[test]
fn config_rejects_unknown_key() {
    let env = TestEnv::new();

    env.cmd()
        .args(["config", "doesNotExist"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown config key"));
}

#[test]
fn install_shell_function_prints_a_wrapper() {
    let env = TestEnv::new();

    env.cmd()
        .args(["install-shell-function", "--bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("tracker()"))
        .stdout(predicate::str::contains("cd \"$dir\""));
}
