//! Convenience re-exports of the most commonly used types.

pub use crate::config::{Config, RawAllowlist, RawConfig, RawRule};
pub use crate::detector::{CancelToken, Detector, Scan, ScanStatus};
pub use crate::error::{ConfigError, ScanError, SourceError};
pub use crate::finding::{Finding, Fingerprint};
pub use crate::fragment::{CommitInfo, Fragment};
pub use crate::rule::{Allowlist, RegexTarget, Rule};
