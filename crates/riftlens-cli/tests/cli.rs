use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::path::PathBuf;
use tempfile::TempDir;

fn fixtures() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn riftlens() -> Command {
    #[allow(deprecated)]
    let cmd = Command::cargo_bin("riftlens").expect("riftlens binary");
    cmd
}

fn stdout_json(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout is JSON")
}

#[test]
fn score_prints_one_participant() {
    let dir = fixtures();
    let output = riftlens()
        .arg("score")
        .arg("--timeline")
        .arg(dir.join("EUW1_100.timeline.json"))
        .arg("--details")
        .arg(dir.join("EUW1_100.details.json"))
        .args(["--participant", "1"])
        .assert()
        .success()
        .get_output()
        .clone();

    let score = stdout_json(&output);
    assert_eq!(score["participant_id"], 1);
    assert_eq!(score["subject_name"], "Ahri");
    let overall = score["overall_score"].as_f64().expect("overall score");
    assert!((0.0..=100.0).contains(&overall));
}

#[test]
fn score_rejects_unknown_participant() {
    riftlens()
        .arg("score")
        .arg("--timeline")
        .arg(fixtures().join("EUW1_100.timeline.json"))
        .args(["--participant", "42"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("does not appear"));
}

#[test]
fn analyze_without_llm_uses_template_narrative() {
    let db = TempDir::new().unwrap();
    let output = riftlens()
        .arg("analyze")
        .args(["--match-id", "EUW1_100", "--participant", "1"])
        .arg("--fixtures")
        .arg(fixtures())
        .arg("--db")
        .arg(db.path().join("results.db"))
        .assert()
        .success()
        .stdout(predicate::str::contains("fallback-template"))
        .get_output()
        .clone();

    let result = stdout_json(&output);
    assert_eq!(result["status"]["state"], "completed");
    let narrative = result["narrative"].as_str().expect("narrative");
    assert!(narrative.starts_with("Ahri"), "{narrative}");
}

#[test]
fn analyze_unknown_match_exits_with_failure_code() {
    let output = riftlens()
        .arg("analyze")
        .args(["--match-id", "EUW1_404", "--participant", "1"])
        .arg("--fixtures")
        .arg(fixtures())
        .assert()
        .code(1)
        .get_output()
        .clone();

    let result = stdout_json(&output);
    assert_eq!(result["status"]["state"], "failed");
    assert_eq!(result["status"]["stage"], "fetching");
}

#[test]
fn guard_reads_score_output() {
    let dir = fixtures();
    let scores = riftlens()
        .arg("score")
        .arg("--timeline")
        .arg(dir.join("EUW1_100.timeline.json"))
        .arg("--details")
        .arg(dir.join("EUW1_100.details.json"))
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let tmp = TempDir::new().unwrap();
    let score_file = tmp.path().join("scores.json");
    std::fs::write(&score_file, scores).unwrap();

    let output = riftlens()
        .arg("guard")
        .args([
            "--text",
            "**Ahri** dealt 98765 damage and outplayed Zed in every skirmish of the game.",
        ])
        .arg("--score")
        .arg(&score_file)
        .args(["--participant", "1"])
        .assert()
        .success()
        .get_output()
        .clone();

    let report = stdout_json(&output);
    let text = report["text"].as_str().expect("guarded text");
    assert!(!text.contains("98765"));
    assert!(!text.contains("**"));
    assert!(!text.contains("Zed"));
    assert!(!report["removed_numbers"].as_array().unwrap().is_empty());
}

#[test]
fn guard_needs_participant_for_match_scores() {
    let tmp = TempDir::new().unwrap();
    let score_file = tmp.path().join("scores.json");
    std::fs::write(&score_file, "{}").unwrap();

    riftlens()
        .arg("guard")
        .args(["--text", "A fine game."])
        .arg("--score")
        .arg(&score_file)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--participant is required"));
}
