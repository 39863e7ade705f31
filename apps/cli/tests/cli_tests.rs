//! robin-cli 命令行集成测试

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

const CLIPS: &str = r#"{
    "anim_nod": [
        {"Name": "HeadAngleKeyFrame", "triggerTime_ms": 0, "durationTime_ms": 66, "angle_deg": 12},
        {"Name": "HeadAngleKeyFrame", "triggerTime_ms": 66, "durationTime_ms": 66, "angle_deg": 0}
    ],
    "anim_flash": [
        {"Name": "BackpackLightsKeyFrame", "triggerTime_ms": 0, "durationTime_ms": 99,
         "Left":   [1.0, 0.0, 0.0, 1.0],
         "Front":  [1.0, 0.0, 0.0, 1.0],
         "Middle": [1.0, 0.0, 0.0, 1.0],
         "Back":   [1.0, 0.0, 0.0, 1.0],
         "Right":  [1.0, 0.0, 0.0, 1.0]}
    ]
}"#;

fn write_assets() -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    file.write_all(CLIPS.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_list_prints_clips_with_ids() {
    let assets = write_assets();
    Command::cargo_bin("robin-cli")
        .unwrap()
        .args(["list"])
        .arg(assets.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("anim_flash"))
        .stdout(predicate::str::contains("anim_nod"))
        .stdout(predicate::str::contains("2 clip(s) total"));
}

#[test]
fn test_inspect_dumps_tracks() {
    let assets = write_assets();
    Command::cargo_bin("robin-cli")
        .unwrap()
        .args(["inspect"])
        .arg(assets.path())
        .args(["anim_nod"])
        .assert()
        .success()
        .stdout(predicate::str::contains("clip:      anim_nod"))
        .stdout(predicate::str::contains("duration:  132ms"))
        .stdout(predicate::str::contains("[head - 2 frame(s)]"));
}

#[test]
fn test_inspect_unknown_clip_fails() {
    let assets = write_assets();
    Command::cargo_bin("robin-cli")
        .unwrap()
        .args(["inspect"])
        .arg(assets.path())
        .args(["anim_missing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("anim_missing"));
}

#[test]
fn test_list_rejects_malformed_json() {
    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    file.write_all(b"{ not json").unwrap();
    file.flush().unwrap();

    Command::cargo_bin("robin-cli")
        .unwrap()
        .args(["list"])
        .arg(file.path())
        .assert()
        .failure();
}

#[test]
fn test_play_against_loopback_model() {
    let assets = write_assets();
    Command::cargo_bin("robin-cli")
        .unwrap()
        .args(["play"])
        .arg(assets.path())
        .args(["anim_nod", "--loops", "1"])
        .timeout(std::time::Duration::from_secs(10))
        .assert()
        .success()
        .stdout(predicate::str::contains("流送统计"))
        .stdout(predicate::str::contains("loops completed:   1"));
}
