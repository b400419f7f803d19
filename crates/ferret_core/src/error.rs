use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or compiling a rule configuration.
///
/// All of these are fatal at startup: a config that half-compiles would
/// silently scan with fewer rules than the operator asked for.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A rule's secret regex failed to compile.
    #[error("invalid regex in rule '{id}': {source}")]
    InvalidRegex {
        id: String,
        #[source]
        source: regex::Error,
    },

    /// A rule's path regex failed to compile.
    #[error("invalid path regex in rule '{id}': {source}")]
    InvalidPathRegex {
        id: String,
        #[source]
        source: regex::Error,
    },

    /// An allowlist regex failed to compile. `scope` names the owning rule,
    /// or the global allowlist.
    #[error("invalid allowlist regex in {scope}: {source}")]
    InvalidAllowlistRegex {
        scope: String,
        #[source]
        source: regex::Error,
    },

    /// A rule selects a capture group its regex does not define.
    #[error("{description} invalid regex secret group {group}, max regex secret group {max}")]
    SecretGroup {
        description: String,
        group: usize,
        max: usize,
    },

    /// A rule declares a negative entropy threshold.
    #[error("rule '{id}' has negative entropy threshold {entropy}")]
    NegativeEntropy { id: String, entropy: f32 },

    /// Two rules share the same identifier.
    #[error("duplicate rule id '{id}'")]
    DuplicateRuleId { id: String },

    /// The configuration file could not be read.
    #[error("failed to read config '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML.
    #[error("failed to parse config: {source}")]
    Parse {
        #[source]
        source: toml::de::Error,
    },
}

/// Errors raised by a fragment source while producing fragments.
///
/// Source failures are fatal: a partially consumed history would silently
/// underreport leaks.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The producing subprocess could not be started.
    #[error("failed to start fragment source: {source}")]
    Start {
        #[source]
        source: std::io::Error,
    },

    /// Reading from the source failed mid-stream.
    #[error("fragment source read failed: {source}")]
    Read {
        #[source]
        source: std::io::Error,
    },

    /// The source reported a fatal condition (e.g. git wrote to stderr).
    #[error("fragment source failed: {message}")]
    Fatal { message: String },
}

/// Errors surfaced by a detector run.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The fragment source failed; findings gathered so far are discarded.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// A rule selected a capture group that did not participate in a
    /// match. Only detectable per-match, and fatal for the run:
    /// continuing would silently underreport for that rule.
    #[error("rule '{rule_id}' invalid regex secret group {group}: group absent from match")]
    RuleRuntimeInvalid { rule_id: String, group: usize },
}
