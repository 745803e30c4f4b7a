use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn killer_bin() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    // test binary is in target/debug/deps/, killer binary is in target/debug/
    path.pop();
    if path.ends_with("deps") {
        path.pop();
    }
    path.push("mutant-killer");
    path
}

fn fixture() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/mutations.xml")
}

fn killer(args: &[&str]) -> Output {
    Command::new(killer_bin())
        .args(args)
        .env_remove("GIT_TOKEN")
        .env_remove("GITHUB_TOKEN")
        .env_remove("ANTHROPIC_API_KEY")
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

// --- analyze ---

#[test]
fn e2e_analyze_json_lists_survivors_in_report_order() {
    let out = killer(&["analyze", fixture().to_str().unwrap(), "--json"]);
    assert_eq!(out.status.code(), Some(0));

    let json: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    let methods: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["method"].as_str().unwrap())
        .collect();
    assert_eq!(methods, ["add", "isPositive", "shout"]);
}

#[test]
fn e2e_analyze_all_includes_killed() {
    let out = killer(&["analyze", fixture().to_str().unwrap(), "--all", "--json"]);
    assert_eq!(out.status.code(), Some(0));
    let json: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    assert_eq!(json.as_array().unwrap().len(), 5);
}

#[test]
fn e2e_analyze_human_output() {
    let out = killer(&["analyze", fixture().to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(0));
    let text = stdout(&out);
    assert!(text.contains("=== Mutation Analysis ==="));
    assert!(text.contains("Calculator"));
    assert!(text.contains("shout"));
}

#[test]
fn e2e_analyze_missing_report() {
    let out = killer(&["analyze", "/nonexistent/mutations.xml"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("report file not found"));
}

// --- kill ---

#[test]
fn e2e_kill_missing_source_dir() {
    let dir = tempfile::TempDir::new().unwrap();
    let out = killer(&[
        "kill",
        fixture().to_str().unwrap(),
        "--source",
        dir.path().join("missing").to_str().unwrap(),
        "--test",
        dir.path().to_str().unwrap(),
        "--api-key",
        "sk-test",
    ]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("Source directory not found"));
}

#[test]
fn e2e_kill_without_api_key() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().to_str().unwrap();
    let out = killer(&["kill", fixture().to_str().unwrap(), "--source", path, "--test", path]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("API key not set"));
}

#[test]
fn e2e_kill_with_no_survivors_exits_cleanly() {
    let dir = tempfile::TempDir::new().unwrap();
    let report = dir.path().join("mutations.xml");
    std::fs::write(
        &report,
        r#"<?xml version="1.0" encoding="UTF-8"?>
<mutations>
<mutation detected='true' status='KILLED' numberOfTestsRun='1'><sourceFile>A.java</sourceFile><mutatedClass>com.example.A</mutatedClass><mutatedMethod>run</mutatedMethod><methodDescription>()V</methodDescription><lineNumber>3</lineNumber><mutator>org.pitest.mutationtest.engine.gregor.mutators.VoidMethodCallMutator</mutator><killingTest>com.example.ATest</killingTest><description>removed call</description></mutation>
</mutations>
"#,
    )
    .unwrap();
    let path = dir.path().to_str().unwrap();
    let out = killer(&[
        "kill",
        report.to_str().unwrap(),
        "--source",
        path,
        "--test",
        path,
        "--api-key",
        "sk-test",
    ]);
    assert_eq!(out.status.code(), Some(0));
    assert!(stdout(&out).contains("No surviving mutants"));
}

// --- run ---

#[test]
fn e2e_run_without_token() {
    let out = killer(&["run", "https://github.com/acme/widgets", "--api-key", "sk-test"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("Git provider token required"));
}

#[test]
fn e2e_run_without_api_key() {
    let out = killer(&["run", "https://github.com/acme/widgets", "--token", "tok"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("API key not set"));
}

#[test]
fn e2e_run_unknown_host() {
    let out = killer(&[
        "run",
        "https://bitbucket.org/acme/widgets",
        "--token",
        "tok",
        "--api-key",
        "sk-test",
    ]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("could not detect git provider"));
}
