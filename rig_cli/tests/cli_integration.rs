use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::tempdir;

// Fast sampling and a short re-zero so runs finish in well under a second.
fn write_valid_config(dir: &Path) -> PathBuf {
    let toml = format!(
        r#"
[force]
zero_samples = 5
zero_spacing_ms = 0

[sampling]
interval_ms = 10

[export]
dir = "{}"

[runner]
mode = "cooperative"
"#,
        dir.join("out").display().to_string().replace('\\', "/")
    );
    let path = dir.join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

fn rig() -> Command {
    let mut cmd = Command::cargo_bin("rig").unwrap();
    cmd.env_remove("RIG_SIM_FAIL_READS_AFTER").env_remove("RUST_LOG");
    cmd
}

#[test]
fn help_lists_subcommands() {
    rig()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::contains("self-check"))
        .stdout(predicate::str::contains("calibrate"));
}

#[test]
fn self_check_reports_sim_backend() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(dir.path());
    rig()
        .args(["--config", cfg.to_str().unwrap(), "self-check"])
        .assert()
        .success()
        .stdout(predicate::str::contains("self-check ok (sim)"));
}

#[test]
fn calibrate_prints_factor_snippet() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(dir.path());
    let csv = dir.path().join("cal.csv");
    // 200 lb/V; with 10 V and 1000 lb full scale that is a factor of 2.
    fs::write(&csv, "volts,force\n0.0,0.0\n1.0,200.0\n2.0,400.0\n").unwrap();
    rig()
        .args(["--config", cfg.to_str().unwrap(), "calibrate"])
        .arg(&csv)
        .assert()
        .success()
        .stdout(predicate::str::contains("[calibration]"))
        .stdout(predicate::str::contains("cal_factor = 2"));
}

#[test]
fn calibrate_rejects_wrong_headers() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(dir.path());
    let csv = dir.path().join("cal.csv");
    fs::write(&csv, "v,f\n0.0,0.0\n1.0,200.0\n").unwrap();
    rig()
        .args(["--config", cfg.to_str().unwrap(), "calibrate"])
        .arg(&csv)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Expected 'volts,force'"));
}

#[test]
fn bounded_run_stops_at_tick_limit() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(dir.path());
    rig()
        .args(["--config", cfg.to_str().unwrap(), "run", "--no-keys", "--ticks", "5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("stopped after 5 ticks (tick_limit)"));
}

#[rstest]
#[case::cooperative(&[])]
#[case::threaded(&["--threaded"])]
fn recorded_run_exports_csv_and_chart(#[case] extra: &[&str]) {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(dir.path());
    rig()
        .args(["--config", cfg.to_str().unwrap(), "run", "--no-keys", "--ticks", "20", "--record"])
        .args(extra)
        .assert()
        .success()
        .stdout(predicate::str::contains("saved"));

    let names: Vec<String> = fs::read_dir(dir.path().join("out"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert!(names.iter().any(|n| n.starts_with("test_data_") && n.ends_with(".csv")), "{names:?}");
    assert!(names.iter().any(|n| n.starts_with("test_graph_") && n.ends_with(".png")), "{names:?}");
    assert!(!names.iter().any(|n| n.ends_with(".part")), "{names:?}");
}

#[test]
fn export_dir_flag_overrides_config() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(dir.path());
    let other = dir.path().join("elsewhere");
    rig()
        .args(["--config", cfg.to_str().unwrap(), "run", "--no-keys", "--ticks", "3", "--record"])
        .arg("--export-dir")
        .arg(&other)
        .assert()
        .success();
    assert!(fs::read_dir(&other).unwrap().count() >= 1);
    assert!(!dir.path().join("out").exists());
}

#[rstest]
#[case::unparsable("[sampling\ninterval_ms = 10\n")]
#[case::zero_interval("[sampling]\ninterval_ms = 0\n")]
#[case::keep_exceeds_max("[graph]\nmax_points = 10\nkeep_points = 10\n")]
fn bad_config_exits_with_2(#[case] body: &str) {
    let dir = tempdir().unwrap();
    let cfg = dir.path().join("bad.toml");
    fs::write(&cfg, body).unwrap();
    rig()
        .args(["--config", cfg.to_str().unwrap(), "self-check"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("What happened"));
}

#[test]
fn missing_config_exits_with_2() {
    let dir = tempdir().unwrap();
    rig()
        .args(["--config", dir.path().join("nope.toml").to_str().unwrap(), "self-check"])
        .assert()
        .code(2);
}

#[rstest]
#[case::at_startup("0")]
#[case::mid_run("8")]
fn sensor_failure_exits_with_3(#[case] reads: &str) {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(dir.path());
    rig()
        .env("RIG_SIM_FAIL_READS_AFTER", reads)
        .args(["--config", cfg.to_str().unwrap(), "run", "--no-keys", "--ticks", "50"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("force channel could not be read"));
}
