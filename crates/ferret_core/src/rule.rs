//! Compiled detection rules and their suppression allowlists.

use std::collections::HashSet;

use regex::Regex;

/// Which text an allowlist's `regexes` are tested against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RegexTarget {
    /// The extracted secret (default).
    #[default]
    Secret,
    /// The full regex match.
    Match,
}

/// A suppression predicate evaluated against candidate findings.
///
/// A finding is suppressed when any dimension matches. Dimensions are
/// checked in order — commit, path, regex, stopword — and short-circuit.
#[derive(Debug, Clone, Default)]
pub struct Allowlist {
    /// Patterns tested against the secret (or the full match, depending on
    /// [`RegexTarget`]).
    pub regexes: Vec<Regex>,
    /// Patterns tested against the fragment's file path.
    pub paths: Vec<Regex>,
    /// Commit SHAs whose findings are suppressed wholesale.
    pub commits: HashSet<String>,
    /// Lowercase substrings; any occurrence in the secret suppresses.
    pub stopwords: Vec<String>,
    pub regex_target: RegexTarget,
}

impl Allowlist {
    /// Returns `true` if no dimension is populated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.regexes.is_empty() && self.paths.is_empty() && self.commits.is_empty() && self.stopwords.is_empty()
    }

    #[must_use]
    pub fn commit_allowed(&self, sha: Option<&str>) -> bool {
        sha.is_some_and(|sha| self.commits.contains(sha))
    }

    #[must_use]
    pub fn path_allowed(&self, path: &str) -> bool {
        self.paths.iter().any(|re| re.is_match(path))
    }

    #[must_use]
    pub fn regex_allowed(&self, text: &str) -> bool {
        self.regexes.iter().any(|re| re.is_match(text))
    }

    #[must_use]
    pub fn contains_stopword(&self, secret: &str) -> bool {
        if self.stopwords.is_empty() {
            return false;
        }
        let secret = secret.to_lowercase();
        self.stopwords.iter().any(|word| secret.contains(word))
    }

    /// Full suppression check for one candidate finding.
    #[must_use]
    pub fn allows(&self, commit: Option<&str>, path: &str, matched: &str, secret: &str) -> bool {
        let regex_text = match self.regex_target {
            RegexTarget::Secret => secret,
            RegexTarget::Match => matched,
        };
        self.commit_allowed(commit)
            || self.path_allowed(path)
            || self.regex_allowed(regex_text)
            || self.contains_stopword(secret)
    }
}

/// One configured detection pattern, immutable once compiled.
///
/// A rule with a `path` regex and no secret `regex` flags matching files
/// themselves rather than their content.
#[derive(Debug, Clone)]
pub struct Rule {
    /// Stable identifier, unique within the config.
    pub id: String,
    pub description: String,
    pub tags: Vec<String>,
    /// Pattern matched against a fragment's raw text.
    pub regex: Option<Regex>,
    /// Capture group holding the secret; 0 means the whole match.
    pub secret_group: usize,
    /// Minimum Shannon entropy a secret must reach.
    pub entropy: Option<f32>,
    /// Lowercase keywords gating evaluation; empty means always considered.
    pub keywords: Vec<String>,
    /// Pattern matched against the fragment's file path.
    pub path: Option<Regex>,
    pub allowlist: Allowlist,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allowlist() -> Allowlist {
        Allowlist {
            regexes: vec![Regex::new("^sample_").unwrap()],
            paths: vec![Regex::new(r"^vendored/").unwrap()],
            commits: ["deadbeef".to_string()].into_iter().collect(),
            stopwords: vec!["example".into()],
            regex_target: RegexTarget::Secret,
        }
    }

    #[test]
    fn empty_allowlist_allows_nothing() {
        let empty = Allowlist::default();
        assert!(empty.is_empty());
        assert!(!empty.allows(Some("deadbeef"), "vendored/x.go", "m", "s"));
    }

    #[test]
    fn commit_dimension_matches_exact_sha() {
        let list = allowlist();
        assert!(list.commit_allowed(Some("deadbeef")));
        assert!(!list.commit_allowed(Some("deadbee")));
        assert!(!list.commit_allowed(None));
    }

    #[test]
    fn path_dimension_uses_regex_matching() {
        let list = allowlist();
        assert!(list.path_allowed("vendored/lib.rs"));
        assert!(!list.path_allowed("src/lib.rs"));
    }

    #[test]
    fn stopwords_match_case_insensitively() {
        let list = allowlist();
        assert!(list.contains_stopword("ThisIsAnEXAMPLEkey"));
        assert!(!list.contains_stopword("realsecret"));
    }

    #[test]
    fn regex_target_switches_between_secret_and_match() {
        let mut list = allowlist();
        assert!(list.allows(None, "x", "prefix sample_abc", "sample_abc"));
        assert!(!list.allows(None, "x", "sample_abc inside", "abc"));

        list.regex_target = RegexTarget::Match;
        assert!(!list.allows(None, "x", "prefix sample_abc", "sample_abc"));
        assert!(list.allows(None, "x", "sample_abc inside", "abc"));
    }

    #[test]
    fn any_single_dimension_suppresses() {
        let list = allowlist();
        assert!(list.allows(Some("deadbeef"), "src/x.go", "m", "s"));
        assert!(list.allows(None, "vendored/x.go", "m", "s"));
        assert!(list.allows(None, "src/x.go", "m", "sample_key"));
        assert!(list.allows(None, "src/x.go", "m", "my-example-token"));
        assert!(!list.allows(None, "src/x.go", "m", "s"));
    }
}
