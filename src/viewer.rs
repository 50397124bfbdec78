//! Launching the external diff viewer.

use crate::git::DiffPair;
use crate::op::{Op, OpError};
use std::io;

/// Show every pair in `tool`, stopping at the first invocation that fails.
pub fn launch(tool: &str, pairs: &[DiffPair]) -> Result<(), OpError> {
    let mut op = Op::start();
    op.output_to(io::stdout());
    for pair in pairs {
        log::debug!("{}: {} vs {}", pair.path, pair.left.display(), pair.right.display());
    }
    for argv in commands(tool, pairs) {
        op.run(argv);
    }
    op.check()
}

/// `meld` opens every pair as a tab of one window; other tools get one
/// `<tool> <left> <right>` invocation per pair.
fn commands(tool: &str, pairs: &[DiffPair]) -> Vec<Vec<String>> {
    let base: Vec<String> = tool.split_whitespace().map(str::to_string).collect();
    if pairs.is_empty() {
        return Vec::new();
    }
    if base.len() == 1 && base[0] == "meld" {
        let mut argv = base;
        for pair in pairs {
            argv.push("--diff".to_string());
            argv.push(pair.left.display().to_string());
            argv.push(pair.right.display().to_string());
        }
        return vec![argv];
    }
    pairs
        .iter()
        .map(|pair| {
            let mut argv = base.clone();
            argv.push(pair.left.display().to_string());
            argv.push(pair.right.display().to_string());
            argv
        })
        .collect()
}
