//! Integration tests for svp: runs the built binary against real git repos
//! in temp directories.

use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

/// Helper: run git in a specific directory and return stdout.
fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .env("GIT_AUTHOR_NAME", "Test User")
        .env("GIT_AUTHOR_EMAIL", "test@example.com")
        .env("GIT_COMMITTER_NAME", "Test User")
        .env("GIT_COMMITTER_EMAIL", "test@example.com")
        .output()
        .expect("failed to run git");
    assert!(output.status.success(), "git {args:?} failed");
    String::from_utf8(output.stdout).unwrap()
}

/// Helper: create a temp git repo with an initial commit.
fn init_repo() -> TempDir {
    let dir = TempDir::new().unwrap();
    git(dir.path(), &["init", "-q", "-b", "main"]);
    git(dir.path(), &["config", "commit.gpgsign", "false"]);
    std::fs::write(dir.path().join("README.md"), "# Test\n").unwrap();
    git(dir.path(), &["add", "."]);
    git(dir.path(), &["commit", "-q", "-m", "initial commit"]);
    dir
}

fn commit(dir: &Path, file: &str, contents: &str) {
    std::fs::write(dir.join(file), contents).unwrap();
    git(dir, &["add", file]);
    git(dir, &["commit", "-q", "-m", &format!("update {file}")]);
}

/// Helper: run svp in `dir` with an isolated config file.
fn svp(dir: &Path, config: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_svp"))
        .args(args)
        .current_dir(dir)
        .env("SVP_CONFIG", config)
        .env_remove("SVP_LOG")
        .output()
        .expect("failed to run svp")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

/// A repo on branch `feature` that changed lib.rs relative to `main`.
fn feature_repo() -> TempDir {
    let dir = init_repo();
    commit(dir.path(), "lib.rs", "fn lib() {}\n");
    git(dir.path(), &["checkout", "-q", "-b", "feature"]);
    commit(dir.path(), "lib.rs", "fn lib() { changed() }\n");
    dir
}

// ────────────────────────────────────────────────────────────────────────
// Repository info
// ────────────────────────────────────────────────────────────────────────

#[test]
fn test_help_lists_commands() {
    let dir = TempDir::new().unwrap();
    let out = svp(dir.path(), &dir.path().join("none.toml"), &["--help"]);
    assert!(out.status.success());
    let help = stdout(&out);
    for cmd in ["changed", "diff", "cur-branch", "root-path"] {
        assert!(help.contains(cmd), "missing {cmd} in:\n{help}");
    }
}

#[test]
fn test_cur_branch_and_root_path() {
    let dir = feature_repo();
    let config = dir.path().join("none.toml");
    let sub = dir.path().join("sub");
    std::fs::create_dir(&sub).unwrap();

    let out = svp(&sub, &config, &["cur-branch"]);
    assert!(out.status.success(), "{}", stderr(&out));
    assert_eq!(stdout(&out), "feature\n");

    let out = svp(&sub, &config, &["root-path"]);
    assert!(out.status.success(), "{}", stderr(&out));
    assert_eq!(
        Path::new(stdout(&out).trim()).canonicalize().unwrap(),
        dir.path().canonicalize().unwrap()
    );
}

#[test]
fn test_outside_repo_fails() {
    let dir = TempDir::new().unwrap();
    let out = svp(dir.path(), &dir.path().join("none.toml"), &["cur-branch"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stdout(&out).is_empty());
    assert_eq!(
        stderr(&out).trim(),
        "error: this command must be run from inside a git repo"
    );
}

// ────────────────────────────────────────────────────────────────────────
// changed
// ────────────────────────────────────────────────────────────────────────

#[test]
fn test_changed_lists_committed_files() {
    let dir = feature_repo();
    let out = svp(dir.path(), &dir.path().join("none.toml"), &["changed", "-b", "main"]);
    assert!(out.status.success(), "{}", stderr(&out));
    assert_eq!(stdout(&out), "lib.rs\n");
}

#[test]
fn test_changed_includes_uncommitted_sorted() {
    let dir = feature_repo();
    std::fs::write(dir.path().join("README.md"), "# Edited\n").unwrap();
    std::fs::write(dir.path().join("untracked.txt"), "new\n").unwrap();

    let out = svp(dir.path(), &dir.path().join("none.toml"), &["changed", "-b", "main"]);
    assert!(out.status.success(), "{}", stderr(&out));
    assert_eq!(stdout(&out), "README.md\nlib.rs\n");
}

#[test]
fn test_changed_between_two_refs() {
    let dir = feature_repo();
    std::fs::write(dir.path().join("README.md"), "# Edited\n").unwrap();

    let out = svp(
        dir.path(),
        &dir.path().join("none.toml"),
        &["changed", "--from", "main", "-b", "feature"],
    );
    assert!(out.status.success(), "{}", stderr(&out));
    assert_eq!(stdout(&out), "README.md\nlib.rs\n");

    git(dir.path(), &["branch", "-q", "snapshot"]);
    let out = svp(
        dir.path(),
        &dir.path().join("none.toml"),
        &["changed", "--from", "main", "-b", "snapshot"],
    );
    assert!(out.status.success(), "{}", stderr(&out));
    assert_eq!(stdout(&out), "lib.rs\n");
}

#[test]
fn test_changed_and_diff_agree_on_renamed_file() {
    let dir = feature_repo();
    git(dir.path(), &["mv", "lib.rs", "core.rs"]);
    git(dir.path(), &["commit", "-q", "-m", "rename lib"]);
    let config = dir.path().join("none.toml");

    let out = svp(dir.path(), &config, &["changed", "-b", "main"]);
    assert!(out.status.success(), "{}", stderr(&out));
    assert_eq!(stdout(&out), "core.rs\nlib.rs\n");

    // core.rs is new on this branch; lib.rs only exists in main
    let script = dir.path().join("tool.sh");
    std::fs::write(&script, "cat \"$1\"; echo ---; cat \"$2\"; echo ===\n").unwrap();
    let tool = format!("sh {}", script.display());
    let out = svp(dir.path(), &config, &["diff", "-b", "main", "-t", &tool]);
    assert!(out.status.success(), "{}", stderr(&out));
    assert_eq!(
        stdout(&out),
        "---\nfn lib() { changed() }\n===\nfn lib() {}\n---\n===\n"
    );
}

#[test]
fn test_changed_uses_configured_branch_and_exclusions() {
    let dir = feature_repo();
    commit(dir.path(), "go.sum", "generated\n");
    let config = dir.path().join("svp.toml");
    std::fs::write(
        &config,
        "[diff]\nbranch = \"main\"\nalways_modified = [\"go.sum\"]\n",
    )
    .unwrap();

    let out = svp(dir.path(), &config, &["changed"]);
    assert!(out.status.success(), "{}", stderr(&out));
    assert_eq!(stdout(&out), "lib.rs\n");
}

#[test]
fn test_changed_unknown_branch_reports_git_error() {
    let dir = feature_repo();
    let out = svp(
        dir.path(),
        &dir.path().join("none.toml"),
        &["changed", "-b", "no-such-branch"],
    );
    assert_eq!(out.status.code(), Some(1));
    let err = stderr(&out);
    assert!(err.starts_with("error: could not list files changed since no-such-branch"), "{err}");
    assert!(err.contains("git diff --name-only --no-renames HEAD no-such-branch"), "{err}");
}

// ────────────────────────────────────────────────────────────────────────
// diff
// ────────────────────────────────────────────────────────────────────────

#[test]
fn test_diff_runs_tool_on_reference_and_working_copies() {
    let dir = feature_repo();
    let config = dir.path().join("none.toml");
    let script = dir.path().join("tool.sh");
    std::fs::write(&script, "cat \"$1\"; echo ---; cat \"$2\"\n").unwrap();
    let tool = format!("sh {}", script.display());

    let out = svp(
        dir.path(),
        &config,
        &["diff", "-b", "main", "-t", &tool, "--skip", "^tool\\.sh$"],
    );
    assert!(out.status.success(), "{}", stderr(&out));
    assert_eq!(stdout(&out), "fn lib() {}\n---\nfn lib() { changed() }\n");
}

#[test]
fn test_diff_against_itself_fails() {
    let dir = feature_repo();
    let out = svp(
        dir.path(),
        &dir.path().join("none.toml"),
        &["diff", "-b", "feature", "-t", "true"],
    );
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("against itself"));
}

#[test]
fn test_diff_with_nothing_changed_fails() {
    let dir = init_repo();
    git(dir.path(), &["checkout", "-q", "-b", "feature"]);
    let out = svp(
        dir.path(),
        &dir.path().join("none.toml"),
        &["diff", "-b", "main", "-t", "true"],
    );
    assert_eq!(out.status.code(), Some(1));
    assert!(
        stderr(&out).contains("no differing files found between \"feature\" and \"main\""),
        "{}",
        stderr(&out)
    );
}

#[test]
fn test_diff_missing_explicit_file_fails() {
    let dir = feature_repo();
    let out = svp(
        dir.path(),
        &dir.path().join("none.toml"),
        &["diff", "-b", "main", "-t", "true", "nope.rs"],
    );
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("nope.rs\" does not exist"));
}

#[test]
fn test_diff_invalid_skip_regex_fails() {
    let dir = feature_repo();
    let out = svp(
        dir.path(),
        &dir.path().join("none.toml"),
        &["diff", "-b", "main", "-t", "true", "--skip", "("],
    );
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("could not compile regex"));
}
