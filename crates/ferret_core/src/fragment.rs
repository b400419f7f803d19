//! The unit of text handed to the detector.

use std::sync::OnceLock;

use crate::location::{self, Location};

/// Commit metadata attached to fragments produced from git history.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitInfo {
    /// Full hex SHA of the commit.
    pub sha: String,
    /// Author name from the commit signature.
    pub author: String,
    /// Author email from the commit signature.
    pub email: String,
    /// Commit timestamp as an RFC 3339 string.
    pub date: String,
    /// First line of the commit message.
    pub message: String,
}

/// A bounded unit of text to scan: the content of one file, or one file's
/// added lines from a diff.
///
/// Fragments are short-lived; the detector consumes them and keeps only the
/// findings. The newline index used by location resolution is computed
/// lazily, once, on first use.
#[derive(Debug, Clone, Default)]
pub struct Fragment {
    /// The text to scan.
    pub raw: String,
    /// Logical path of the file this text came from.
    pub file_path: String,
    /// Present only for fragments derived from git history.
    pub commit: Option<CommitInfo>,
    newlines: OnceLock<Vec<usize>>,
}

impl Fragment {
    /// Creates a fragment with no commit context (filesystem scans).
    pub fn new(raw: impl Into<String>, file_path: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            file_path: file_path.into(),
            commit: None,
            newlines: OnceLock::new(),
        }
    }

    /// Attaches commit metadata (git-sourced fragments).
    #[must_use]
    pub fn with_commit(mut self, commit: CommitInfo) -> Self {
        self.commit = Some(commit);
        self
    }

    /// Returns the commit SHA, if this fragment came from git history.
    #[must_use]
    pub fn commit_sha(&self) -> Option<&str> {
        self.commit.as_ref().map(|c| c.sha.as_str())
    }

    /// Byte offsets of every `\n` in `raw`.
    pub fn newline_offsets(&self) -> &[usize] {
        self.newlines.get_or_init(|| {
            self.raw
                .bytes()
                .enumerate()
                .filter_map(|(i, b)| (b == b'\n').then_some(i))
                .collect()
        })
    }

    /// Resolves a `[start, end)` byte span within `raw` to line/column
    /// coordinates.
    #[must_use]
    pub fn locate(&self, start: usize, end: usize) -> Location {
        location::resolve(&self.raw, self.newline_offsets(), start, end)
    }
}
