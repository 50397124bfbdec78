use super::runner::{git_argv, git_op};
use super::{GitError, RepoContext, Rev};
use regex::Regex;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tempfile::TempDir;

/// Git's complaint when a path has no blob in the requested ref.
fn missing_in_ref_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^fatal: path '.+' (does not exist in|exists on disk, but not in) '")
            .unwrap()
    })
}

/// The two copies of one file handed to a diff viewer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffPair {
    pub path: String,
    pub left: PathBuf,
    pub right: PathBuf,
}

/// Copies of files as they exist in some ref, held in a temporary directory
/// that is removed when the snapshot is dropped.
pub struct Snapshot {
    dir: TempDir,
}

impl Snapshot {
    pub fn new() -> io::Result<Self> {
        let dir = TempDir::with_prefix("svp-diff-")?;
        log::debug!("reference copies go to {}", dir.path().display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Pair up each file's copy in `left` with its copy in `right`.
    pub fn pairs(
        &self,
        ctx: &RepoContext,
        left: &Rev,
        right: &Rev,
        files: &[String],
    ) -> Result<Vec<DiffPair>, GitError> {
        let lefts = self.materialize(ctx, left, files)?;
        let rights = self.materialize(ctx, right, files)?;
        Ok(files
            .iter()
            .zip(lefts.into_iter().zip(rights))
            .map(|(path, (left, right))| DiffPair {
                path: path.clone(),
                left,
                right,
            })
            .collect())
    }

    /// A readable path holding each file's contents as of `rev`.
    ///
    /// Working-tree files are used in place. Files absent from `rev` (or
    /// deleted from the working tree) come back as empty placeholders.
    pub fn materialize(
        &self,
        ctx: &RepoContext,
        rev: &Rev,
        files: &[String],
    ) -> Result<Vec<PathBuf>, GitError> {
        files
            .iter()
            .map(|file| match rev {
                Rev::WorkingTree => {
                    let path = ctx.root().join(file);
                    if path.exists() {
                        Ok(path)
                    } else {
                        self.placeholder(rev, file).map(|(_, path)| path)
                    }
                }
                Rev::Named(name) => self.show(ctx, name, file),
            })
            .collect()
    }

    fn show(&self, ctx: &RepoContext, name: &str, file: &str) -> Result<PathBuf, GitError> {
        let (out, path) = self.placeholder(&Rev::Named(name.to_string()), file)?;

        let object = format!("{name}:{file}");
        let mut op = git_op(ctx.root());
        op.output_to(out).run(&git_argv(&["show", object.as_str()]));
        match op.check() {
            Ok(()) => Ok(path),
            Err(err) if missing_in_ref_regex().is_match(err.stderr()) => {
                log::debug!(
                    "`{}`: {file} does not exist in {name}; comparing against an empty file",
                    err.command().join(" ")
                );
                Ok(path)
            }
            Err(source) => Err(GitError::Command {
                what: "reference copy",
                source,
            }),
        }
    }

    /// Create an empty file in the snapshot named after `rev` and `file`.
    fn placeholder(&self, rev: &Rev, file: &str) -> Result<(File, PathBuf), GitError> {
        let tag = rev.to_string().replace(['/', ' '], "_");
        let name = file.replace('/', "_");
        let temp_err = |source| GitError::TempFile {
            path: file.to_string(),
            source,
        };
        tempfile::Builder::new()
            .prefix(&format!("{tag}."))
            .suffix(&format!("-{name}"))
            .tempfile_in(self.path())
            .map_err(temp_err)?
            .keep()
            .map_err(|e| temp_err(e.error))
    }
}
