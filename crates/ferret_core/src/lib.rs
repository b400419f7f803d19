//! Core secret detection engine for ferret.
//!
//! This crate turns a stream of text fragments — file contents or the
//! added lines of git diffs — into deduplicated findings, driven by a
//! compiled rule configuration. It is embedded by the `ferret` CLI and is
//! usable standalone by anything that can produce [`Fragment`]s.
//!
//! # Main Types
//!
//! - [`Config`] - validated rule set with keyword pre-filtering
//! - [`Detector`] - evaluates rules against fragments, concurrently
//! - [`Fragment`] - one unit of text to scan, with optional commit context
//! - [`Finding`] - a detected secret with resolved location and metadata
//!
//! # Error Handling
//!
//! Structured errors via [`thiserror`]: [`ConfigError`] for anything wrong
//! with the rule file (fatal at startup), [`SourceError`] for fragment
//! source failures (fatal mid-run), and [`ScanError`] as the detector's
//! error type. Per-file read problems are logged and skipped, never fatal.

/// Rule configuration: raw TOML model, validation, compiled form.
pub mod config;
/// The rule evaluator and the concurrent streaming detector.
pub mod detector;
pub(crate) mod entropy;
/// Error types for configuration, fragment sources, and scans.
pub mod error;
/// The finding record and its run-local fingerprint.
pub mod finding;
/// The unit of text handed to the detector.
pub mod fragment;
/// Byte-span to line/column resolution.
pub mod location;
/// Common re-exports.
pub mod prelude;
/// Compiled rules and allowlists.
pub mod rule;
#[cfg(test)]
pub(crate) mod test_utils;
/// Filesystem fragment source.
pub mod walk;

pub use config::{Config, CONFIG_FILENAME};
pub use detector::{CancelToken, Detector, Scan, ScanStatus, ALLOW_MARKER};
pub use entropy::shannon_entropy;
pub use error::{ConfigError, ScanError, SourceError};
pub use finding::{Finding, Fingerprint};
pub use fragment::{CommitInfo, Fragment};
pub use location::Location;
pub use rule::{Allowlist, RegexTarget, Rule};
pub use walk::FileWalker;
