//! Rule configuration: the TOML file model, validation, and the compiled
//! form used by the detector.
//!
//! A [`RawConfig`] mirrors the configuration file. [`Config::compile`]
//! validates every rule once, compiles the regexes, and builds the
//! Aho-Corasick keyword index the detector uses to skip rules whose
//! keywords never appear in a fragment.

use std::collections::HashMap;
use std::path::Path;

use aho_corasick::AhoCorasick;
use regex::Regex;
use serde::Deserialize;

use crate::error::ConfigError;
use crate::rule::{Allowlist, RegexTarget, Rule};

/// Default configuration filename, looked up relative to the scan source.
pub const CONFIG_FILENAME: &str = ".ferret.toml";

const BUILTIN_RULES: &str = include_str!("rules.toml");

/// The configuration file as written by the operator, before validation.
#[derive(Debug, Default, Deserialize)]
pub struct RawConfig {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub rules: Vec<RawRule>,
    /// Global allowlist applied after every rule's own allowlist.
    #[serde(default)]
    pub allowlist: Option<RawAllowlist>,
}

/// One rule as written in the configuration file.
#[derive(Debug, Default, Deserialize)]
pub struct RawRule {
    pub id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub regex: Option<String>,
    #[serde(default)]
    pub secret_group: usize,
    #[serde(default)]
    pub entropy: Option<f32>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub allowlist: Option<RawAllowlist>,
}

/// An allowlist as written in the configuration file.
#[derive(Debug, Default, Deserialize)]
pub struct RawAllowlist {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub regexes: Vec<String>,
    #[serde(default)]
    pub paths: Vec<String>,
    #[serde(default)]
    pub commits: Vec<String>,
    #[serde(default)]
    pub stopwords: Vec<String>,
    #[serde(default)]
    pub regex_target: Option<RawRegexTarget>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RawRegexTarget {
    Secret,
    Match,
}

/// Validated, compiled configuration: the ordered rule set, the global
/// allowlist, and the derived keyword index.
///
/// Immutable once compiled; shared freely between scanning threads.
pub struct Config {
    rules: Vec<Rule>,
    pub global_allowlist: Allowlist,
    keyword_automaton: Option<AhoCorasick>,
    keyword_to_rules: Vec<Vec<usize>>,
    rules_without_keywords: Vec<usize>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("rules", &self.rules.len())
            .field("rules_without_keywords", &self.rules_without_keywords.len())
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Compiles and validates a raw configuration.
    ///
    /// Fails on the first malformed regex, out-of-range secret group,
    /// negative entropy threshold, or duplicated rule id. Rule order is
    /// preserved exactly as configured.
    pub fn compile(raw: RawConfig) -> Result<Self, ConfigError> {
        let mut rules = Vec::with_capacity(raw.rules.len());
        let mut seen_ids = HashMap::new();

        for (idx, raw_rule) in raw.rules.into_iter().enumerate() {
            if seen_ids.insert(raw_rule.id.clone(), idx).is_some() {
                return Err(ConfigError::DuplicateRuleId { id: raw_rule.id });
            }
            rules.push(compile_rule(raw_rule)?);
        }

        let global_allowlist = match raw.allowlist {
            Some(raw_list) => compile_allowlist(raw_list, "the global allowlist")?,
            None => Allowlist::default(),
        };

        let index = KeywordIndex::build(&rules);

        Ok(Self {
            rules,
            global_allowlist,
            keyword_automaton: index.automaton,
            keyword_to_rules: index.keyword_to_rules,
            rules_without_keywords: index.rules_without_keywords,
        })
    }

    /// Parses and compiles a configuration from TOML text.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(text).map_err(|source| ConfigError::Parse { source })?;
        Self::compile(raw)
    }

    /// Loads and compiles a configuration file from disk.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Compiles the embedded built-in rule catalog.
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::from_toml(BUILTIN_RULES)
    }

    /// All rules, in configuration order.
    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Looks up a rule by its identifier.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Rule> {
        self.rules.iter().find(|rule| rule.id == id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub(crate) fn keyword_automaton(&self) -> Option<&AhoCorasick> {
        self.keyword_automaton.as_ref()
    }

    pub(crate) fn keyword_to_rules(&self) -> &[Vec<usize>] {
        &self.keyword_to_rules
    }

    pub(crate) fn rules_without_keywords(&self) -> &[usize] {
        &self.rules_without_keywords
    }
}

fn compile_rule(raw: RawRule) -> Result<Rule, ConfigError> {
    let regex = match &raw.regex {
        Some(pattern) => Some(Regex::new(pattern).map_err(|source| ConfigError::InvalidRegex {
            id: raw.id.clone(),
            source,
        })?),
        None => None,
    };

    let path = match &raw.path {
        Some(pattern) => Some(Regex::new(pattern).map_err(|source| ConfigError::InvalidPathRegex {
            id: raw.id.clone(),
            source,
        })?),
        None => None,
    };

    if raw.secret_group > 0 {
        if let Some(regex) = &regex {
            let max = regex.captures_len() - 1;
            if raw.secret_group > max {
                return Err(ConfigError::SecretGroup {
                    description: raw.description,
                    group: raw.secret_group,
                    max,
                });
            }
        }
    }

    if let Some(entropy) = raw.entropy {
        if entropy < 0.0 {
            return Err(ConfigError::NegativeEntropy { id: raw.id, entropy });
        }
    }

    let allowlist = match raw.allowlist {
        Some(raw_list) => {
            let scope = format!("rule '{}'", raw.id);
            compile_allowlist(raw_list, &scope)?
        }
        None => Allowlist::default(),
    };

    Ok(Rule {
        id: raw.id,
        description: raw.description,
        tags: raw.tags,
        regex,
        secret_group: raw.secret_group,
        entropy: raw.entropy,
        keywords: raw.keywords.iter().map(|k| k.to_lowercase()).collect(),
        path,
        allowlist,
    })
}

fn compile_allowlist(raw: RawAllowlist, scope: &str) -> Result<Allowlist, ConfigError> {
    let compile_all = |patterns: &[String]| -> Result<Vec<Regex>, ConfigError> {
        patterns
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|source| ConfigError::InvalidAllowlistRegex {
                    scope: scope.to_string(),
                    source,
                })
            })
            .collect()
    };

    Ok(Allowlist {
        regexes: compile_all(&raw.regexes)?,
        paths: compile_all(&raw.paths)?,
        commits: raw.commits.into_iter().collect(),
        stopwords: raw.stopwords.iter().map(|word| word.to_lowercase()).collect(),
        regex_target: match raw.regex_target {
            Some(RawRegexTarget::Match) => RegexTarget::Match,
            Some(RawRegexTarget::Secret) | None => RegexTarget::Secret,
        },
    })
}

struct KeywordIndex {
    automaton: Option<AhoCorasick>,
    keyword_to_rules: Vec<Vec<usize>>,
    rules_without_keywords: Vec<usize>,
}

impl KeywordIndex {
    /// Builds the shared keyword automaton: each distinct keyword maps to
    /// the rules that declared it, so one automaton pass over a fragment
    /// selects the rule subset worth running.
    fn build(rules: &[Rule]) -> Self {
        let mut keywords: Vec<String> = Vec::new();
        let mut keyword_to_rules: Vec<Vec<usize>> = Vec::new();
        let mut rules_without_keywords = Vec::new();
        let mut positions: HashMap<&str, usize> = HashMap::new();

        for (rule_idx, rule) in rules.iter().enumerate() {
            if rule.keywords.is_empty() {
                rules_without_keywords.push(rule_idx);
                continue;
            }
            for keyword in &rule.keywords {
                if let Some(&existing) = positions.get(keyword.as_str()) {
                    keyword_to_rules[existing].push(rule_idx);
                } else {
                    positions.insert(keyword.as_str(), keywords.len());
                    keywords.push(keyword.clone());
                    keyword_to_rules.push(vec![rule_idx]);
                }
            }
        }

        let automaton = if keywords.is_empty() {
            None
        } else {
            AhoCorasick::builder()
                .ascii_case_insensitive(true)
                .match_kind(aho_corasick::MatchKind::LeftmostLongest)
                .build(&keywords)
                .ok()
        };

        Self {
            automaton,
            keyword_to_rules,
            rules_without_keywords,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_compiles() {
        let config = Config::builtin().unwrap();
        assert!(config.len() >= 10);
        assert!(config.get("aws-access-key").is_some());
        assert!(config.get("duffel-api-token").is_some());
    }

    #[test]
    fn rule_order_is_preserved() {
        let config = Config::from_toml(
            r#"
            [[rules]]
            id = "zeta"
            regex = '''Z'''

            [[rules]]
            id = "alpha"
            regex = '''A'''
            "#,
        )
        .unwrap();
        let ids: Vec<_> = config.rules().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["zeta", "alpha"]);
    }

    #[test]
    fn malformed_regex_is_rejected() {
        let err = Config::from_toml(
            r#"
            [[rules]]
            id = "broken"
            regex = '''[unclosed'''
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidRegex { .. }));
        assert!(err.to_string().contains("broken"));
    }

    #[test]
    fn malformed_path_regex_is_rejected() {
        let err = Config::from_toml(
            r#"
            [[rules]]
            id = "bad-path"
            path = '''*.py'''
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPathRegex { .. }));
    }

    #[test]
    fn secret_group_beyond_captures_is_rejected() {
        let err = Config::from_toml(
            r#"
            [[rules]]
            id = "discord-api-key"
            description = "Discord API key"
            regex = '''(?i)(discord[a-z0-9_ .\-,]{0,25})(=|>|:=|:)['"]([a-f0-9]{64})['"]'''
            secret_group = 5
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::SecretGroup { .. }));
        assert!(err.to_string().contains("max regex secret group 3"));
    }

    #[test]
    fn secret_group_at_capture_count_is_accepted() {
        let config = Config::from_toml(
            r#"
            [[rules]]
            id = "grouped"
            regex = '''(a)(b)(c)'''
            secret_group = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.get("grouped").unwrap().secret_group, 3);
    }

    #[test]
    fn negative_entropy_is_rejected() {
        let err = Config::from_toml(
            r#"
            [[rules]]
            id = "negative"
            regex = '''X'''
            entropy = -1.0
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::NegativeEntropy { .. }));
    }

    #[test]
    fn duplicate_rule_ids_are_rejected() {
        let err = Config::from_toml(
            r#"
            [[rules]]
            id = "twice"
            regex = '''A'''

            [[rules]]
            id = "twice"
            regex = '''B'''
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateRuleId { .. }));
    }

    #[test]
    fn malformed_allowlist_regex_names_its_scope() {
        let err = Config::from_toml(
            r#"
            [[rules]]
            id = "ok"
            regex = '''A'''

            [allowlist]
            regexes = ['''[bad''']
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("global allowlist"));
    }

    #[test]
    fn keywords_and_stopwords_are_lowercased() {
        let config = Config::from_toml(
            r#"
            [[rules]]
            id = "kw"
            regex = '''A'''
            keywords = ["AKIA"]

            [rules.allowlist]
            stopwords = ["EXAMPLE"]
            "#,
        )
        .unwrap();
        let rule = config.get("kw").unwrap();
        assert_eq!(rule.keywords, ["akia"]);
        assert_eq!(rule.allowlist.stopwords, ["example"]);
    }

    #[test]
    fn keyword_index_partitions_rules() {
        let config = Config::from_toml(
            r#"
            [[rules]]
            id = "with-kw"
            regex = '''ghp_[a-z]{4}'''
            keywords = ["ghp_"]

            [[rules]]
            id = "without-kw"
            regex = '''SECRET'''
            "#,
        )
        .unwrap();
        assert!(config.keyword_automaton().is_some());
        assert_eq!(config.rules_without_keywords(), &[1]);
        assert_eq!(config.keyword_to_rules().len(), 1);
    }

    #[test]
    fn shared_keyword_maps_to_both_rules() {
        let config = Config::from_toml(
            r#"
            [[rules]]
            id = "one"
            regex = '''A'''
            keywords = ["token"]

            [[rules]]
            id = "two"
            regex = '''B'''
            keywords = ["token"]
            "#,
        )
        .unwrap();
        assert_eq!(config.keyword_to_rules(), &[vec![0, 1]]);
    }

    #[test]
    fn regex_target_parses_both_variants() {
        let config = Config::from_toml(
            r#"
            [[rules]]
            id = "targeted"
            regex = '''A'''

            [rules.allowlist]
            regexes = ['''ctx''']
            regex_target = "match"
            "#,
        )
        .unwrap();
        assert_eq!(
            config.get("targeted").unwrap().allowlist.regex_target,
            crate::rule::RegexTarget::Match
        );
    }

    #[test]
    fn load_surfaces_missing_file_as_read_error() {
        let err = Config::load(Path::new("/nonexistent/.ferret.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
