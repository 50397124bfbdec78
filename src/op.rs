//! Chained execution of external commands.
//!
//! An [`Op`] runs a sequence of programs and remembers the first failure.
//! Once a step fails every later [`Op::run`] is skipped, so a caller can
//! issue a whole chain and check for an error once at the end:
//!
//! ```ignore
//! let mut op = Op::start();
//! op.current_dir(root).collect_stdout();
//! op.run(&["git", "fetch"]).run(&["git", "rev-parse", "FETCH_HEAD"]);
//! op.check()?;
//! let head = op.output();
//! ```

use std::borrow::Cow;
use std::fmt;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use thiserror::Error;

/// Why a single step of an [`Op`] failed.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("no command given")]
    EmptyCommand,
    #[error("{0}")]
    Spawn(#[source] io::Error),
    #[error("{0}")]
    Exit(ExitStatus),
    #[error("{0}")]
    Io(#[source] io::Error),
}

impl RunError {
    /// Human-readable tag describing what was being attempted.
    fn action(&self) -> &'static str {
        match self {
            RunError::EmptyCommand | RunError::Exit(_) => "could not run command",
            RunError::Spawn(_) => "could not start command",
            RunError::Io(_) => "could not copy command output",
        }
    }
}

/// A failed step, with everything needed to explain it to the user.
#[derive(Debug, Clone)]
pub struct OpError {
    action: &'static str,
    command: Vec<String>,
    stderr: String,
    cause: String,
}

impl OpError {
    /// The argument vector of the command that failed.
    pub fn command(&self) -> &[String] {
        &self.command
    }

    /// Trimmed stderr of the command that failed.
    pub fn stderr(&self) -> &str {
        &self.stderr
    }
}

impl fmt::Display for OpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} (command: \"{}\"):", self.action, self.command.join(" "))?;
        if !self.stderr.is_empty() {
            writeln!(f, "{}", self.stderr)?;
        }
        write!(f, "({})", self.cause)
    }
}

impl std::error::Error for OpError {}

#[derive(Default)]
enum Stdout {
    #[default]
    Discard,
    Collect(Vec<u8>),
    Sink(Box<dyn Write + Send>),
}

/// State of one chain of external commands.
#[derive(Default)]
pub struct Op {
    args: Vec<String>,
    action: &'static str,
    err: Option<RunError>,
    err_msg: Vec<u8>,
    stdout: Stdout,
    input: Option<Box<dyn Read + Send>>,
    dir: Option<PathBuf>,
}

impl Op {
    pub fn start() -> Self {
        Self::default()
    }

    /// Buffer the stdout of subsequent commands; read it back with [`Op::output`].
    pub fn collect_stdout(&mut self) -> &mut Self {
        self.stdout = Stdout::Collect(Vec::new());
        self
    }

    /// Stream the stdout of subsequent commands into `sink`.
    pub fn output_to(&mut self, sink: impl Write + Send + 'static) -> &mut Self {
        self.stdout = Stdout::Sink(Box::new(sink));
        self
    }

    /// Feed `source` to the stdin of subsequent commands.
    #[allow(dead_code)]
    pub fn input_from(&mut self, source: impl Read + Send + 'static) -> &mut Self {
        self.input = Some(Box::new(source));
        self
    }

    /// Run subsequent commands in `dir` instead of the current directory.
    pub fn current_dir(&mut self, dir: impl AsRef<Path>) -> &mut Self {
        self.dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Run `args[0]` with the remaining arguments, unless an earlier step failed.
    ///
    /// Failures are recorded rather than returned; inspect them with
    /// [`Op::last_error`], [`Op::detailed_error`] or [`Op::check`].
    pub fn run<I, S>(&mut self, args: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let args: Vec<String> = args.into_iter().map(|a| a.as_ref().to_string()).collect();
        if self.err.is_some() {
            log::trace!("skipping `{}`: an earlier command failed", args.join(" "));
            return self;
        }

        self.err_msg.clear();
        if let Stdout::Collect(buf) = &mut self.stdout {
            buf.clear();
        }
        self.args = args;

        log::debug!("running `{}`", self.args.join(" "));
        if let Err(e) = self.execute() {
            log::warn!(
                "`{}` failed: {}",
                self.args.join(" "),
                String::from_utf8_lossy(self.err_msg.trim_ascii())
            );
            self.action = e.action();
            self.err = Some(e);
        }
        self
    }

    fn execute(&mut self) -> Result<(), RunError> {
        let (program, rest) = self.args.split_first().ok_or(RunError::EmptyCommand)?;
        let mut cmd = Command::new(program);
        cmd.args(rest)
            .stdin(if self.input.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(match self.stdout {
                Stdout::Discard => Stdio::null(),
                _ => Stdio::piped(),
            })
            .stderr(Stdio::piped());
        if let Some(dir) = &self.dir {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(RunError::Spawn)?;
        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let input = &mut self.input;
        let err_msg = &mut self.err_msg;
        let sink = &mut self.stdout;

        // stdin and stderr are pumped on their own threads while this thread
        // drains stdout, so no pipe can fill up and stall the child
        let copied = thread::scope(|s| {
            let feeder = stdin.zip(input.as_mut()).map(move |(mut pipe, source)| {
                s.spawn(move || match io::copy(source, &mut pipe) {
                    Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
                    other => other.map(drop),
                })
            });
            let drainer =
                stderr.map(move |mut pipe| s.spawn(move || pipe.read_to_end(err_msg).map(drop)));

            let out = match (stdout, sink) {
                (Some(mut pipe), Stdout::Collect(buf)) => pipe.read_to_end(buf).map(drop),
                (Some(mut pipe), Stdout::Sink(w)) => {
                    io::copy(&mut pipe, &mut *w).and_then(|_| w.flush())
                }
                _ => Ok(()),
            };
            let fed = feeder.map_or(Ok(()), join);
            let drained = drainer.map_or(Ok(()), join);
            out.and(drained).and(fed)
        });

        let status = child.wait().map_err(RunError::Io)?;
        if !status.success() {
            return Err(RunError::Exit(status));
        }
        copied.map_err(RunError::Io)
    }

    /// The first error recorded by this chain, if any.
    pub fn last_error(&self) -> Option<&RunError> {
        self.err.as_ref()
    }

    /// Trimmed stderr of the most recently attempted command.
    pub fn last_error_msg(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.err_msg.trim_ascii())
    }

    /// The recorded failure with the failing command and its stderr attached.
    pub fn detailed_error(&self) -> Option<OpError> {
        self.last_error().map(|err| OpError {
            action: self.action,
            command: self.args.clone(),
            stderr: self.last_error_msg().into_owned(),
            cause: err.to_string(),
        })
    }

    /// `Err` with the detailed error if any step of the chain failed.
    pub fn check(&self) -> Result<(), OpError> {
        self.detailed_error().map_or(Ok(()), Err)
    }

    /// Stdout of the last command, or an empty string when not collecting.
    pub fn output(&self) -> String {
        match &self.stdout {
            Stdout::Collect(buf) => String::from_utf8_lossy(buf).into_owned(),
            _ => String::new(),
        }
    }
}

fn join(handle: thread::ScopedJoinHandle<'_, io::Result<()>>) -> io::Result<()> {
    handle
        .join()
        .unwrap_or_else(|_| Err(io::Error::other("stream copy thread panicked")))
}
