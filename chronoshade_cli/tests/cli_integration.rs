use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::{TempDir, tempdir};

// Fast covers: full travel in 0.3 s, re-estimated every 20 ms.
fn write_config(dir: &TempDir) -> PathBuf {
    let state = dir.path().join("state.json");
    let toml = format!(
        r#"
[controller]
tick_ms = 20
release_ms = 20

[state]
path = '{}'

[covers.porch]
name = "Porch awning"
opening_time_map = '{{"0": 0, "0.3": 100}}'
closing_time_map = {{ "0" = 100, "0.3" = 0 }}

[covers.garage]
actuator = "momentary"
opening_time = 0.3
closing_time = 0.3
tilting_time_up = 0.2
"#,
        state.display()
    );
    let path = dir.path().join("chronoshade.toml");
    fs::write(&path, toml).unwrap();
    path
}

fn chronoshade(cfg: &Path) -> Command {
    let mut cmd = Command::cargo_bin("chronoshade").unwrap();
    cmd.env_remove("RUST_LOG")
        .env_remove("CHRONOSHADE_SIM_FAIL")
        .arg("--log-level")
        .arg("warn")
        .arg("--config")
        .arg(cfg);
    cmd
}

#[rstest]
#[case(&["set-position", "porch", "150"], 3, "outside 0-100")]
#[case(&["open-tilt", "porch"], 4, "no tilt configured")]
#[case(&["set-tilt", "garage", "101"], 3, "tilt 101")]
#[case(&["open", "attic"], 1, "unknown cover")]
#[case(&["calibrate", "porch"], 2, "required")]
fn rejected_commands_exit_with_stable_codes(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir);
    chronoshade(&cfg)
        .args(args)
        .assert()
        .code(exit_code)
        .stderr(predicate::str::contains(needle));
}

#[test]
fn help_lists_commands() {
    Command::cargo_bin("chronoshade")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::contains("set-position"))
        .stdout(predicate::str::contains("check-config"));
}

#[test]
fn check_config_summarizes_covers() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir);
    chronoshade(&cfg)
        .arg("check-config")
        .assert()
        .success()
        .stdout(predicate::str::contains("porch (Porch awning): level"))
        .stdout(predicate::str::contains("garage (garage): momentary"))
        .stdout(predicate::str::contains("config ok: 2 cover(s)"));
}

#[test]
fn set_position_moves_and_persists() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir);

    chronoshade(&cfg)
        .args(["set-position", "porch", "50"])
        .assert()
        .success()
        .stdout(predicate::str::contains("porch: position 50% (idle)"));

    let state = fs::read_to_string(dir.path().join("state.json")).unwrap();
    let v: serde_json::Value = serde_json::from_str(&state).unwrap();
    assert_eq!(v["porch"]["position"], 50);

    chronoshade(&cfg)
        .args(["status", "Porch"])
        .assert()
        .success()
        .stdout(predicate::str::contains("porch: position 50% (idle)"));
}

#[test]
fn tilt_runs_on_a_momentary_cover() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir);
    chronoshade(&cfg)
        .args(["set-tilt", "garage", "100"])
        .assert()
        .success()
        .stdout(predicate::str::contains("garage: position 0%, tilt 100% (idle)"));
}

#[test]
fn calibrate_overwrites_the_estimate() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir);
    chronoshade(&cfg)
        .args(["calibrate", "porch", "--position", "37"])
        .assert()
        .success();
    chronoshade(&cfg)
        .args(["status", "porch"])
        .assert()
        .success()
        .stdout(predicate::str::contains("position 37%"));
}

#[test]
fn relay_failure_leaves_the_estimate_untouched() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir);
    chronoshade(&cfg)
        .env("CHRONOSHADE_SIM_FAIL", "1")
        .args(["open", "porch"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("did not accept the command"));

    chronoshade(&cfg)
        .args(["status", "porch"])
        .assert()
        .success()
        .stdout(predicate::str::contains("porch: position 0% (idle)"));
}

#[test]
fn structural_map_errors_block_the_cover() {
    let dir = tempdir().unwrap();
    let cfg = dir.path().join("bad.toml");
    fs::write(
        &cfg,
        "[covers.porch]\nopening_time_map = '{\"0\": 0, \"10\": 50}'\n",
    )
    .unwrap();
    chronoshade(&cfg)
        .arg("check-config")
        .assert()
        .code(5)
        .stderr(predicate::str::contains("must run from 0 to 100"));
}

#[test]
fn missing_config_file_is_reported() {
    let dir = tempdir().unwrap();
    chronoshade(&dir.path().join("nope.toml"))
        .args(["status", "porch"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Could not read the config file"));
}

#[cfg(unix)]
#[test]
fn interrupt_stops_the_cover_and_saves_the_estimate() {
    use std::process::Stdio;
    use std::time::Duration;

    let dir = tempdir().unwrap();
    let state = dir.path().join("state.json");
    let cfg = dir.path().join("slow.toml");
    fs::write(
        &cfg,
        format!(
            "[state]\npath = '{}'\n[covers.shed]\nopening_time = 30.0\nclosing_time = 30.0\n",
            state.display()
        ),
    )
    .unwrap();

    let child = chronoshade(&cfg)
        .args(["open", "shed"])
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    std::thread::sleep(Duration::from_millis(500));
    let killed = Command::new("kill")
        .args(["-INT", &child.id().to_string()])
        .status()
        .unwrap();
    assert!(killed.success());

    let out = child.wait_with_output().unwrap();
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert!(String::from_utf8_lossy(&out.stdout).contains("shed: position"));

    let v: serde_json::Value = serde_json::from_str(&fs::read_to_string(&state).unwrap()).unwrap();
    let position = v["shed"]["position"].as_u64().unwrap();
    assert!(position < 100, "{position}");
}
