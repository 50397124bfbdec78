use crate::op::{Op, OpError};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

fn not_a_repo_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^fatal: not a git repository").unwrap())
}

/// Start an [`Op`] whose commands run in `dir`.
pub fn git_op(dir: &Path) -> Op {
    let mut op = Op::start();
    op.current_dir(dir);
    op
}

/// Execute a git command in `dir` and return its stdout.
/// Fails with the command line and git's stderr if the command exits non-zero.
pub fn run_git(dir: &Path, args: &[&str]) -> Result<String, OpError> {
    let mut op = git_op(dir);
    op.collect_stdout().run(&git_argv(args));
    op.check()?;
    Ok(op.output())
}

/// Prefix `args` with the git binary.
pub fn git_argv<S: AsRef<str>>(args: &[S]) -> Vec<String> {
    std::iter::once("git")
        .chain(args.iter().map(AsRef::as_ref))
        .map(str::to_string)
        .collect()
}

/// Whether git's stderr says the command was run outside a repository.
pub fn is_not_a_repository(stderr: &str) -> bool {
    not_a_repo_regex().is_match(stderr)
}
