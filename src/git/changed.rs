//! Which files differ between two sides of a comparison.
//!
//! Committed differences come from `git diff` (or `git log`) name listings;
//! when either side is the working tree, the paths reported by
//! `git status --porcelain` are folded in as well.

use super::runner::{git_argv, git_op, run_git};
use super::status::{decode_path, parse_status};
use super::{FileSet, GitError, RepoContext, Rev};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// How committed differences between two refs are computed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommittedMode {
    /// Paths whose content differs between the two trees.
    #[default]
    Tree,
    /// Paths touched by any commit reachable from exactly one side, even if
    /// a later commit undid the change.
    Log,
}

pub struct DiffEngine<'a> {
    ctx: &'a RepoContext,
    mode: CommittedMode,
    always_modified: FileSet,
}

impl<'a> DiffEngine<'a> {
    pub fn new(ctx: &'a RepoContext) -> Self {
        Self {
            ctx,
            mode: CommittedMode::default(),
            always_modified: FileSet::new(),
        }
    }

    pub fn mode(mut self, mode: CommittedMode) -> Self {
        self.mode = mode;
        self
    }

    /// Paths that are never reported, e.g. generated files every client touches.
    pub fn always_modified<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.always_modified = paths.into_iter().map(Into::into).collect();
        self
    }

    /// Every file that differs between `left` and `right`.
    ///
    /// Uncommitted edits are included only if one side is the working tree.
    pub fn modified_files(&self, left: &Rev, right: &Rev) -> Result<FileSet, GitError> {
        let mut files = self.committed_files(left, right)?;
        if left.is_working_tree() || right.is_working_tree() {
            files.extend(self.uncommitted_files()?);
        }
        files.retain(|f| !self.always_modified.contains(f));
        log::debug!("{} file(s) differ between {} and {}", files.len(), left, right);
        Ok(files)
    }

    /// Files changed by commits on one side but not the other.
    ///
    /// Rename detection is off, so a moved file is reported under both its
    /// old and new path whichever side is given first.
    pub fn committed_files(&self, left: &Rev, right: &Rev) -> Result<FileSet, GitError> {
        let (l, r) = (left.commitish(), right.commitish());
        let steps: Vec<Vec<String>> = match self.mode {
            CommittedMode::Tree => vec![git_argv(&[
                "diff",
                "--name-only",
                "--no-renames",
                l,
                r,
                "--",
            ])],
            CommittedMode::Log => [(l, r), (r, l)]
                .into_iter()
                .map(|(from, not)| {
                    let exclude = format!("^{not}");
                    git_argv(&[
                        "log",
                        "--format=",
                        "--name-only",
                        "--no-renames",
                        from,
                        exclude.as_str(),
                        "--",
                    ])
                })
                .collect(),
        };

        let mut op = git_op(self.ctx.root());
        op.collect_stdout();
        let mut listings = Vec::with_capacity(steps.len());
        for step in &steps {
            listings.push(op.run(step).output());
        }
        op.check().map_err(|source| GitError::Command {
            what: "committed changes",
            source,
        })?;

        let mut files = FileSet::new();
        for line in listings.iter().flat_map(|l| l.lines()) {
            if line.is_empty() {
                continue;
            }
            let path = decode_path(line).map_err(|reason| GitError::Listing {
                what: "committed file",
                line: line.to_string(),
                reason,
            })?;
            files.insert(path);
        }
        Ok(files)
    }

    /// Tracked files with uncommitted changes in the working tree or index.
    pub fn uncommitted_files(&self) -> Result<FileSet, GitError> {
        let output =
            run_git(self.ctx.root(), &["status", "--porcelain"]).map_err(|source| {
                GitError::Command {
                    what: "uncommitted changes",
                    source,
                }
            })?;
        Ok(parse_status(&output)?)
    }
}

/// Drop every path matching `skip`.
pub fn filter_skipped(files: FileSet, skip: Option<&Regex>) -> FileSet {
    match skip {
        Some(re) => files.into_iter().filter(|f| !re.is_match(f)).collect(),
        None => files,
    }
}
