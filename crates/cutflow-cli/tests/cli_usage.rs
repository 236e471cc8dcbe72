use std::fs;
use std::path::Path;
use std::process::{Command, Output};

fn cutflow(args: &[&str], cwd: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_cutflow"))
        .args(args)
        .current_dir(cwd)
        .env_remove("RUST_LOG")
        .output()
        .expect("spawn cutflow")
}

#[test]
fn tokens_without_met_or_jet_fail_before_any_output() {
    let temp = tempfile::tempdir().expect("tmp dir");
    let out = temp.path().join("out");
    let output = cutflow(
        &["zjets", "10", "1", "pt", out.to_str().expect("utf8"), "--synthetic", "3"],
        temp.path(),
    );
    assert_eq!(output.status.code(), Some(1));
    assert!(!out.exists());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("vary_token"), "stderr: {stderr}");
}

#[test]
fn malformed_command_lines_exit_with_one() {
    let temp = tempfile::tempdir().expect("tmp dir");
    let missing = cutflow(&["zjets", "10", "1"], temp.path());
    assert_eq!(missing.status.code(), Some(1));

    let bad_flag = cutflow(&["zjets", "10", "2", "met", "out"], temp.path());
    assert_eq!(bad_flag.status.code(), Some(1));
    assert!(!temp.path().join("out").exists());
}

#[test]
fn missing_input_file_is_reported() {
    let temp = tempfile::tempdir().expect("tmp dir");
    let output = cutflow(&["zjets", "-1", "0", "MET", "out"], temp.path());
    assert_eq!(output.status.code(), Some(1));
    assert!(!temp.path().join("out/zjets.log").exists());
}

#[test]
fn synthetic_run_writes_log_report_and_histograms() {
    let temp = tempfile::tempdir().expect("tmp dir");
    let output = cutflow(
        &["zjets", "50", "1", "metjet", "out", "--synthetic", "11"],
        temp.path(),
    );
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let folder = temp.path().join("out");
    let log = fs::read_to_string(folder.join("zjets.log")).expect("log");
    assert!(log.contains("vary cuts: both"));
    assert!(log.contains("events read: 50"));

    let report: serde_json::Value =
        serde_json::from_slice(&fs::read(folder.join("zjets_cutflow.json")).expect("report"))
            .expect("report json");
    assert_eq!(report["events_read"], 50);
    assert_eq!(report["status"], "completed");
    assert_eq!(report["origin"], "simulation");
    assert!(folder.join("zjets_AnaZ_0.json").exists());
    assert!(folder.join("zjets_hWSourceAnalysis.json").exists());
}

#[test]
fn jsonl_input_is_read_from_the_working_directory() {
    let temp = tempfile::tempdir().expect("tmp dir");
    let record = serde_json::json!({
        "id": { "run": 1, "event": 7 },
        "origin": "data",
        "triggers": [1, 1],
        "noise_flags": [1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1]
    });
    fs::write(temp.path().join("single.jsonl"), format!("{record}\n\n")).expect("write input");

    let output = cutflow(&["single", "0", "0", "jet", "out"], temp.path());
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let report: serde_json::Value = serde_json::from_slice(
        &fs::read(temp.path().join("out/single_cutflow.json")).expect("report"),
    )
    .expect("report json");
    assert_eq!(report["events_read"], 1);
    assert_eq!(report["events_passed"], 0);
}
