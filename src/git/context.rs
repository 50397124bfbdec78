use super::GitError;
use super::runner::{git_argv, git_op, is_not_a_repository};
use std::fmt;
use std::path::{Path, PathBuf};

/// One side of a comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rev {
    /// The checked-out files on disk, including uncommitted edits.
    WorkingTree,
    /// A branch, remote-tracking ref or any other commit-ish.
    Named(String),
}

impl Rev {
    pub fn is_working_tree(&self) -> bool {
        matches!(self, Rev::WorkingTree)
    }

    /// The name git should be given for this side's committed state.
    pub fn commitish(&self) -> &str {
        match self {
            Rev::WorkingTree => "HEAD",
            Rev::Named(name) => name,
        }
    }
}

impl fmt::Display for Rev {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rev::WorkingTree => f.write_str("working tree"),
            Rev::Named(name) => f.write_str(name),
        }
    }
}

/// The repository a command runs against: its root and checked-out branch.
///
/// Computed once at startup and handed to everything that talks to git.
#[derive(Debug, Clone)]
pub struct RepoContext {
    root: PathBuf,
    branch: String,
}

impl RepoContext {
    /// Locate the repository containing `dir`.
    /// Returns `Ok(None)` when `dir` is not inside a git repository.
    pub fn discover(dir: &Path) -> Result<Option<Self>, GitError> {
        let mut op = git_op(dir);
        op.collect_stdout();

        op.run(&git_argv(&["rev-parse", "--show-toplevel"]));
        let root = PathBuf::from(op.output().trim());
        op.run(&git_argv(&["rev-parse", "--abbrev-ref", "HEAD"]));
        let branch = op.output().trim().to_string();

        match op.check() {
            Ok(()) => {}
            Err(err) if is_not_a_repository(err.stderr()) => {
                log::debug!("{} is not inside a git repository", dir.display());
                return Ok(None);
            }
            Err(source) => {
                return Err(GitError::Command {
                    what: "repository root and current branch",
                    source,
                });
            }
        }

        log::debug!("repository at {} on branch {}", root.display(), branch);
        Ok(Some(Self { root, branch }))
    }

    /// Absolute path to the top of the working tree.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Name of the checked-out branch (`HEAD` when detached).
    pub fn branch(&self) -> &str {
        &self.branch
    }

    /// Interpret a user-supplied reference; the checked-out branch means the working tree.
    pub fn resolve(&self, name: &str) -> Rev {
        if name == self.branch {
            Rev::WorkingTree
        } else {
            Rev::Named(name.to_string())
        }
    }

    /// The remote-tracking counterpart of the checked-out branch.
    pub fn upstream(&self) -> String {
        format!("origin/{}", self.branch)
    }
}
