//! Git subprocess driver.
//!
//! ferret does not embed a git implementation. History and diff scans
//! drive the `git` binary and consume its textual patch output through
//! [`patch::PatchParser`]; stderr is watched on a side thread so a failing
//! subprocess aborts the run instead of silently truncating it.

mod patch;

use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStderr, ChildStdout, Command, Stdio};
use std::thread::JoinHandle;
use std::time::Duration;

use ferret_core::prelude::*;
use tracing::{debug, error, warn};

use self::patch::PatchParser;

/// Pause between spawning git and draining its stdout. Some platforms
/// drop the first writes if the pipe is read too eagerly; the delay is
/// tunable via [`GitSource::with_start_delay`].
const DEFAULT_START_DELAY: Duration = Duration::from_millis(50);

#[derive(Debug)]
enum Mode {
    History { log_opts: Option<String> },
    WorkingTree,
    Staged,
}

/// A fragment source backed by a `git` subprocess.
#[derive(Debug)]
pub struct GitSource {
    repo: PathBuf,
    mode: Mode,
    start_delay: Duration,
}

impl GitSource {
    /// Scans the full commit history (`git log -p -U0 --full-history
    /// --all`). `log_opts` replaces the default log options when set.
    pub fn history(repo: impl AsRef<Path>, log_opts: Option<String>) -> Self {
        Self::new(repo, Mode::History { log_opts })
    }

    /// Scans uncommitted working-tree changes (`git diff -U0 .`).
    pub fn working_tree(repo: impl AsRef<Path>) -> Self {
        Self::new(repo, Mode::WorkingTree)
    }

    /// Scans the staged index (`git diff -U0 --staged .`).
    pub fn staged(repo: impl AsRef<Path>) -> Self {
        Self::new(repo, Mode::Staged)
    }

    fn new(repo: impl AsRef<Path>, mode: Mode) -> Self {
        Self {
            repo: repo.as_ref().to_path_buf(),
            mode,
            start_delay: DEFAULT_START_DELAY,
        }
    }

    /// Overrides the post-spawn delay before stdout is consumed.
    #[must_use]
    pub fn with_start_delay(mut self, delay: Duration) -> Self {
        self.start_delay = delay;
        self
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new("git");
        cmd.arg("-C").arg(&self.repo);
        match &self.mode {
            Mode::History { log_opts } => {
                cmd.args(["log", "-p", "-U0"]);
                match log_opts {
                    Some(opts) => {
                        cmd.args(opts.split_whitespace());
                    }
                    None => {
                        cmd.args(["--full-history", "--all"]);
                    }
                }
            }
            Mode::WorkingTree => {
                cmd.args(["diff", "-U0", "."]);
            }
            Mode::Staged => {
                cmd.args(["diff", "-U0", "--staged", "."]);
            }
        }
        cmd
    }

    /// Spawns git and returns the stream of fragments parsed from its
    /// patch output. The stream is finite and not restartable.
    pub fn fragments(self) -> Result<GitFragments, SourceError> {
        let mut cmd = self.command();
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        debug!("executing: {cmd:?}");

        let mut child = cmd.spawn().map_err(|source| SourceError::Start { source })?;
        let Some(stdout) = child.stdout.take() else {
            return Err(SourceError::Fatal {
                message: "git stdout was not captured".into(),
            });
        };
        let Some(stderr) = child.stderr.take() else {
            return Err(SourceError::Fatal {
                message: "git stderr was not captured".into(),
            });
        };

        let stderr_thread = std::thread::spawn(move || classify_stderr(stderr));
        std::thread::sleep(self.start_delay);

        Ok(GitFragments {
            parser: PatchParser::new(BufReader::new(stdout)),
            child,
            stderr_thread: Some(stderr_thread),
            finished: false,
        })
    }
}

/// Drains git's stderr, returning the lines that mean the run failed.
///
/// The rename-detection notices are the one class of stderr output git
/// emits while still completing the diff; everything else is fatal.
fn classify_stderr(stderr: ChildStderr) -> Vec<String> {
    use std::io::BufRead as _;

    let mut fatal = Vec::new();
    for line in BufReader::new(stderr).lines().map_while(Result::ok) {
        if line.contains("exhaustive rename detection was skipped")
            || line.contains("you may want to set your diff.renameLimit")
        {
            warn!("{line}");
        } else {
            error!("{line}");
            fatal.push(line);
        }
    }
    fatal
}

/// Iterator over the fragments produced by one git subprocess.
///
/// The child is reaped when the stream ends; dropping the iterator early
/// kills it.
pub struct GitFragments {
    parser: PatchParser<BufReader<ChildStdout>>,
    child: Child,
    stderr_thread: Option<JoinHandle<Vec<String>>>,
    finished: bool,
}

impl GitFragments {
    fn finish(&mut self) -> Option<SourceError> {
        self.finished = true;

        let fatal = self
            .stderr_thread
            .take()
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();
        let status = self.child.wait();

        if !fatal.is_empty() {
            return Some(SourceError::Fatal {
                message: fatal.join("\n"),
            });
        }
        match status {
            Ok(status) if !status.success() => Some(SourceError::Fatal {
                message: format!("git exited with {status}"),
            }),
            Err(source) => Some(SourceError::Read { source }),
            Ok(_) => None,
        }
    }
}

impl Iterator for GitFragments {
    type Item = Result<Fragment, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.parser.next_fragment() {
            Ok(Some(fragment)) => Some(Ok(fragment)),
            Ok(None) => self.finish().map(Err),
            Err(source) => {
                self.finished = true;
                let _ = self.child.kill();
                let _ = self.child.wait();
                Some(Err(SourceError::Read { source }))
            }
        }
    }
}

impl Drop for GitFragments {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}
