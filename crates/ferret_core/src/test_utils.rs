//! Shared helpers for `ferret_core` tests (compiled only during testing).

use crate::config::Config;
use crate::detector::Detector;

/// A one-rule config matching classic AWS access key IDs.
pub fn simple_aws_config() -> Config {
    Config::from_toml(
        r#"
        [[rules]]
        id = "aws-access-key"
        description = "AWS Access Key"
        regex = '''AKIA[0-9A-Z]{16}'''
        tags = ["key", "AWS"]
        "#,
    )
    .unwrap()
}

/// Builds a detector from inline TOML rule definitions.
pub fn detector_with_rules(toml: &str) -> Detector {
    Detector::new(Config::from_toml(toml).unwrap())
}
