use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn ppb_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("ppb");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let data_dir = root.join("data");
    fs::create_dir_all(&data_dir).unwrap();

    let papers_dir = root.join("papers");
    fs::create_dir_all(&papers_dir).unwrap();

    let config_content = format!(
        r#"[db]
path = "{}/data/paperbase.sqlite"

[chunking]
chunk_size = 1000
chunk_overlap = 200

[retrieval]
semantic_weight = 0.7
keyword_weight = 0.3
final_limit = 10
"#,
        root.display()
    );

    let config_path = config_dir.join("paperbase.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_ppb(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = ppb_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run ppb binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_init_creates_database() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_ppb(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
    assert!(tmp.path().join("data/paperbase.sqlite").exists());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_ppb(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_ppb(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_missing_config_fails() {
    let (stdout, stderr, success) = {
        let binary = ppb_binary();
        let output = Command::new(&binary)
            .args(["--config", "/nonexistent/paperbase.toml", "init"])
            .output()
            .unwrap();
        (
            String::from_utf8_lossy(&output.stdout).to_string(),
            String::from_utf8_lossy(&output.stderr).to_string(),
            output.status.success(),
        )
    };
    assert!(!success, "init with missing config should fail: {}", stdout);
    assert!(stderr.contains("config"));
}

#[test]
fn test_unknown_search_mode_rejected() {
    let (_tmp, config_path) = setup_test_env();
    run_ppb(&config_path, &["init"]);

    let (_, stderr, success) = run_ppb(&config_path, &["search", "anything", "--mode", "fuzzy"]);
    assert!(!success);
    assert!(stderr.contains("Unknown search mode"));
}

#[test]
fn test_keyword_search_empty_store_no_results() {
    let (_tmp, config_path) = setup_test_env();
    run_ppb(&config_path, &["init"]);

    let (stdout, stderr, success) =
        run_ppb(&config_path, &["search", "transformers", "--mode", "keyword"]);
    assert!(success, "keyword search failed: {}", stderr);
    assert!(stdout.contains("No results."));
}

#[test]
fn test_semantic_search_requires_embeddings() {
    let (_tmp, config_path) = setup_test_env();
    run_ppb(&config_path, &["init"]);

    let (_, stderr, success) =
        run_ppb(&config_path, &["search", "transformers", "--mode", "semantic"]);
    assert!(!success);
    assert!(stderr.contains("requires embeddings"));
}

#[test]
fn test_show_unknown_paper_fails() {
    let (_tmp, config_path) = setup_test_env();
    run_ppb(&config_path, &["init"]);

    let (_, stderr, success) = run_ppb(&config_path, &["show", "no-such-id"]);
    assert!(!success);
    assert!(stderr.contains("not found"));
}

#[test]
fn test_list_empty_store() {
    let (_tmp, config_path) = setup_test_env();
    run_ppb(&config_path, &["init"]);

    let (stdout, _, success) = run_ppb(&config_path, &["list"]);
    assert!(success);
    assert!(stdout.contains("No papers imported yet."));
}

#[test]
fn test_import_empty_directory_fails() {
    let (tmp, config_path) = setup_test_env();
    run_ppb(&config_path, &["init"]);

    let papers = tmp.path().join("papers");
    let (_, stderr, success) = run_ppb(&config_path, &["import", papers.to_str().unwrap()]);
    assert!(!success);
    assert!(stderr.contains("No PDF files found"));
}

#[test]
fn test_import_missing_path_fails() {
    let (_tmp, config_path) = setup_test_env();
    run_ppb(&config_path, &["init"]);

    let (_, _, success) = run_ppb(&config_path, &["import", "/nonexistent/papers"]);
    assert!(!success);
}

#[test]
fn test_analyze_requires_target_selection() {
    let (_tmp, config_path) = setup_test_env();
    run_ppb(&config_path, &["init"]);

    let (_, stderr, success) = run_ppb(&config_path, &["analyze"]);
    assert!(!success);
    assert!(stderr.contains("--id") || stderr.contains("--all"));
}

#[test]
fn test_analyze_requires_llm_provider() {
    let (_tmp, config_path) = setup_test_env();
    run_ppb(&config_path, &["init"]);

    let (_, stderr, success) = run_ppb(&config_path, &["analyze", "--all"]);
    assert!(!success);
    assert!(stderr.contains("disabled"));
}

#[test]
fn test_review_requires_llm_provider() {
    let (_tmp, config_path) = setup_test_env();
    run_ppb(&config_path, &["init"]);

    let (_, stderr, success) = run_ppb(&config_path, &["review", "transformers"]);
    assert!(!success);
    assert!(stderr.contains("disabled"));
}
