pub mod changed;
pub mod context;
pub mod runner;
pub mod show;
pub mod status;

use crate::op::OpError;
use std::collections::BTreeSet;
use thiserror::Error;

pub use changed::{CommittedMode, DiffEngine, filter_skipped};
pub use context::{RepoContext, Rev};
pub use show::{DiffPair, Snapshot};
pub use status::StatusParseError;

/// Repository-relative paths, deduplicated and sorted.
pub type FileSet = BTreeSet<String>;

#[derive(Debug, Error)]
pub enum GitError {
    #[error("could not get {what}")]
    Command {
        what: &'static str,
        #[source]
        source: OpError,
    },
    #[error("could not parse `git status --porcelain` output")]
    Status {
        #[from]
        source: StatusParseError,
    },
    #[error("could not parse {what} output: {reason} in {line:?}")]
    Listing {
        what: &'static str,
        line: String,
        reason: &'static str,
    },
    #[error("could not create temporary copy of \"{path}\"")]
    TempFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
