mod config;
mod git;
mod op;
mod viewer;

#[cfg(test)]
mod testutil;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use config::Config;
use git::{DiffEngine, RepoContext, Rev, Snapshot};
use regex::Regex;
use std::io::{self, Write};
use std::path::Path;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const PKG_NAME: &str = env!("CARGO_PKG_NAME");

#[derive(Parser)]
#[command(name = "svp", version, about)]
struct Cli {
    /// Enable verbose logging (same as SVP_LOG=debug)
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the files that differ between this branch and another
    Changed {
        #[command(flatten)]
        target: Target,
        /// Compare this reference instead of the checked-out branch
        #[arg(long, value_name = "REF")]
        from: Option<String>,
    },
    /// Open the differing files in a diff viewer
    Diff {
        #[command(flatten)]
        target: Target,
        /// Diff viewer to launch (overrides the config file)
        #[arg(short, long)]
        tool: Option<String>,
        /// Hide files matching this regex (overrides the config file)
        #[arg(long, value_name = "REGEX")]
        skip: Option<String>,
        /// Files to diff, relative to the repository root
        files: Vec<String>,
    },
    /// Print the checked-out branch
    CurBranch,
    /// Print the top directory of the repository
    RootPath,
}

#[derive(Args)]
struct Target {
    /// The branch to compare against
    #[arg(short, long, conflicts_with = "upstream")]
    branch: Option<String>,
    /// Compare against origin/<current branch>
    #[arg(long)]
    upstream: bool,
}

impl Target {
    fn reference(&self, ctx: &RepoContext, config: &Config) -> String {
        match &self.branch {
            _ if self.upstream => ctx.upstream(),
            Some(branch) => branch.clone(),
            None => config.diff.branch.clone(),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let mut logger = env_logger::Builder::from_env(env_logger::Env::new().filter("SVP_LOG"));
    logger.format_timestamp(None).format_target(false);
    if cli.verbose {
        logger.filter_level(log::LevelFilter::Debug);
    }
    logger.init();

    log::debug!("Starting {} v{}", PKG_NAME, VERSION);

    if let Err(e) = run(cli.command) {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run(command: Commands) -> Result<()> {
    let config = Config::load()?;
    log::debug!("Config loaded from {:?}", Config::path());

    let ctx = RepoContext::discover(Path::new("."))
        .context("could not inspect the current directory")?
        .context("this command must be run from inside a git repo")?;

    let mut out = io::stdout().lock();
    match command {
        Commands::CurBranch => writeln!(out, "{}", ctx.branch())?,
        Commands::RootPath => writeln!(out, "{}", ctx.root().display())?,
        Commands::Changed { target, from } => {
            let reference = target.reference(&ctx, &config);
            let from = ctx.resolve(from.as_deref().unwrap_or(ctx.branch()));
            let files = changed_files(&ctx, &config, &from, &ctx.resolve(&reference))
                .with_context(|| format!("could not list files changed since {reference}"))?;
            for file in files {
                writeln!(out, "{file}")?;
            }
        }
        Commands::Diff {
            target,
            tool,
            skip,
            files,
        } => {
            drop(out);
            diff(&ctx, &config, &target, tool, skip, files)?;
        }
    }
    Ok(())
}

/// Files that differ between `from` and `reference`, with configured exclusions applied.
fn changed_files(
    ctx: &RepoContext,
    config: &Config,
    from: &Rev,
    reference: &Rev,
) -> Result<git::FileSet, git::GitError> {
    DiffEngine::new(ctx)
        .mode(config.diff.compare)
        .always_modified(config.diff.always_modified.iter().cloned())
        .modified_files(from, reference)
}

fn diff(
    ctx: &RepoContext,
    config: &Config,
    target: &Target,
    tool: Option<String>,
    skip: Option<String>,
    files: Vec<String>,
) -> Result<()> {
    let reference = target.reference(ctx, config);
    let reference_rev = ctx.resolve(&reference);
    if reference_rev.is_working_tree() {
        bail!(
            "current branch is '{}'...cannot diff {} against itself",
            ctx.branch(),
            reference
        );
    }

    let files: Vec<String> = if files.is_empty() {
        let skip = skip.unwrap_or_else(|| config.diff.skip.clone());
        let skip_re = match skip.as_str() {
            "" => None,
            pattern => Some(Regex::new(pattern).with_context(|| {
                format!("could not compile regex \"{pattern}\" for skipping files")
            })?),
        };
        let changed = changed_files(ctx, config, &Rev::WorkingTree, &reference_rev)
            .context("could not get list of changed files to diff")?;
        git::filter_skipped(changed, skip_re.as_ref())
            .into_iter()
            .collect()
    } else {
        for file in &files {
            let full = ctx.root().join(file);
            if !full.exists() {
                bail!("file \"{}\" does not exist", full.display());
            }
        }
        let mut files = files;
        files.sort();
        files.dedup();
        files
    };
    if files.is_empty() {
        bail!(
            "no differing files found between \"{}\" and \"{}\"",
            ctx.branch(),
            reference
        );
    }

    let snapshot = Snapshot::new().context("could not create temporary directory")?;
    let pairs = snapshot.pairs(ctx, &reference_rev, &Rev::WorkingTree, &files)?;
    let tool = tool.unwrap_or_else(|| config.diff.tool.clone());
    log::info!("diffing {} file(s) against {} with {}", pairs.len(), reference, tool);
    viewer::launch(&tool, &pairs).with_context(|| format!("could not run diff tool {tool}"))?;
    Ok(())
}
