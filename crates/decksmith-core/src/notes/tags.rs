//! Tag rules and detection
//!
//! Rules come from a line-oriented text file:
//!
//! ```text
//! # comment
//! [geography]
//! paris
//! france
//!
//! [driving]
//! drives? on the left
//! ```
//!
//! `[name]` opens a section; each following non-blank, non-comment line is a
//! regular expression for that tag. Lines before the first section are
//! ignored. Reopening a section replaces its patterns but keeps its position.
//!
//! Loading and compiling happen once, before any note is looked at: build
//! [`TagRules`], then hand them to [`TagDetector::new`].

use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::cleaner::strip_html;
use crate::config::Config;

/// Errors from reading a tag rules file
#[derive(Error, Debug)]
pub enum TagConfigError {
    #[error("Tag rules file not found: '{path}'")]
    NotFound { path: PathBuf },

    #[error("Failed to read tag rules '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A tag and the patterns that trigger it, in declared order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRule {
    pub tag: String,
    pub patterns: Vec<String>,
}

/// Ordered collection of tag rules
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagRules {
    rules: Vec<TagRule>,
}

impl TagRules {
    /// Parse rules from file contents
    pub fn parse(content: &str) -> Self {
        let mut rules: Vec<TagRule> = Vec::new();
        let mut current: Option<usize> = None;

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if line.starts_with('[') && line.ends_with(']') && line.len() >= 2 {
                let tag = &line[1..line.len() - 1];
                let index = match rules.iter().position(|r| r.tag == tag) {
                    Some(index) => {
                        rules[index].patterns.clear();
                        index
                    }
                    None => {
                        rules.push(TagRule {
                            tag: tag.to_string(),
                            patterns: Vec::new(),
                        });
                        rules.len() - 1
                    }
                };
                current = Some(index);
            } else if let Some(index) = current {
                rules[index].patterns.push(line.to_string());
            }
        }

        Self { rules }
    }

    /// Load rules from a file, degrading to empty rules on any failure
    pub fn load(path: &Path) -> Self {
        match Self::load_strict(path) {
            Ok(rules) => rules,
            Err(e) => {
                warn!("{}; automatic tagging disabled", e);
                Self::default()
            }
        }
    }

    /// Load rules from a file, surfacing read failures
    pub fn load_strict(path: &Path) -> Result<Self, TagConfigError> {
        if !path.exists() {
            return Err(TagConfigError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let content = fs::read_to_string(path).map_err(|source| TagConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let rules = Self::parse(&content);
        info!("Loaded {} tag rule(s) from {:?}", rules.len(), path);
        Ok(rules)
    }

    /// Load rules from the configured or discovered rules file
    ///
    /// No file anywhere means no tagging.
    pub fn load_default(config: &Config) -> Self {
        match config.resolve_tags_file() {
            Some(path) => Self::load(&path),
            None => {
                info!("No tag rules file found; automatic tagging disabled");
                Self::default()
            }
        }
    }

    pub fn rules(&self) -> &[TagRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

struct CompiledRule {
    tag: String,
    patterns: Vec<Regex>,
}

/// Assigns tags to note text from compiled rules
pub struct TagDetector {
    rules: Vec<CompiledRule>,
}

impl TagDetector {
    /// Compile every pattern up front
    ///
    /// Invalid patterns are skipped; the rest of their rule still applies.
    pub fn new(rules: TagRules) -> Self {
        let compiled = rules
            .rules
            .into_iter()
            .map(|rule| {
                let patterns = rule
                    .patterns
                    .iter()
                    .filter_map(|pattern| match Regex::new(pattern) {
                        Ok(regex) => Some(regex),
                        Err(e) => {
                            warn!("Skipping invalid pattern {:?} for tag '{}': {}", pattern, rule.tag, e);
                            None
                        }
                    })
                    .collect();
                CompiledRule {
                    tag: rule.tag,
                    patterns,
                }
            })
            .collect();

        Self { rules: compiled }
    }

    /// A detector that never assigns anything
    pub fn disabled() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn is_enabled(&self) -> bool {
        !self.rules.is_empty()
    }

    /// Tags whose patterns match `text`, in rule order
    ///
    /// Matching runs on the lowercased, tag-stripped text. Within a rule the
    /// first matching pattern decides; later patterns are not tried.
    pub fn detect(&self, text: &str) -> Vec<String> {
        if self.rules.is_empty() {
            return Vec::new();
        }

        let normalized = strip_html(&text.to_lowercase());
        let mut tags = Vec::new();

        for rule in &self.rules {
            if let Some(index) = rule.patterns.iter().position(|p| p.is_match(&normalized)) {
                debug!("Tag '{}' matched by pattern #{}", rule.tag, index + 1);
                tags.push(rule.tag.clone());
            }
        }

        tags
    }
}

/// Merge detected tags into a space-separated tag string
///
/// Existing tokens keep their order (duplicates dropped) and new tags are
/// appended. When nothing new is added the input string comes back verbatim,
/// so callers can tell that the tags did not change. A string padded with a
/// space on each side, as the note table stores tags, stays padded.
pub fn merge_tags(existing: &str, detected: &[String]) -> String {
    let mut tokens = unique_tokens(existing);

    let additions: Vec<&str> = detected
        .iter()
        .map(String::as_str)
        .filter(|tag| !tokens.contains(tag))
        .collect();

    if additions.is_empty() {
        return existing.to_string();
    }

    for tag in additions {
        if !tokens.contains(&tag) {
            tokens.push(tag);
        }
    }

    join_like(existing, &tokens)
}

/// Drop repeated tokens from a tag string, keeping first occurrences
pub fn dedupe_tags(tags: &str) -> String {
    join_like(tags, &unique_tokens(tags))
}

fn unique_tokens(tags: &str) -> Vec<&str> {
    let mut tokens: Vec<&str> = Vec::new();
    for token in tags.split_whitespace() {
        if !tokens.contains(&token) {
            tokens.push(token);
        }
    }
    tokens
}

/// Join tokens, keeping the space padding of `original`
fn join_like(original: &str, tokens: &[&str]) -> String {
    let joined = tokens.join(" ");
    let padded = original.starts_with(' ') && original.ends_with(' ');
    if padded && !original.trim().is_empty() {
        format!(" {} ", joined)
    } else {
        joined
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn detector(content: &str) -> TagDetector {
        TagDetector::new(TagRules::parse(content))
    }

    #[test]
    fn test_parse_sections() {
        let rules = TagRules::parse(
            "# header comment\nstray line\n\n[geography]\n  paris \nfrance\n# inline comment\n[driving]\nleft\n",
        );

        assert_eq!(
            rules.rules(),
            &[
                TagRule {
                    tag: "geography".to_string(),
                    patterns: vec!["paris".to_string(), "france".to_string()],
                },
                TagRule {
                    tag: "driving".to_string(),
                    patterns: vec!["left".to_string()],
                },
            ]
        );
    }

    #[test]
    fn test_reopened_section_replaces_patterns_in_place() {
        let rules = TagRules::parse("[a]\none\n[b]\ntwo\n[a]\nthree\n");

        let tags: Vec<_> = rules.rules().iter().map(|r| r.tag.as_str()).collect();
        assert_eq!(tags, vec!["a", "b"]);
        assert_eq!(rules.rules()[0].patterns, vec!["three".to_string()]);
    }

    #[test]
    fn test_empty_section_kept() {
        let rules = TagRules::parse("[lonely]\n");
        assert_eq!(rules.len(), 1);
        assert!(rules.rules()[0].patterns.is_empty());
        assert!(detector("[lonely]\n").detect("anything").is_empty());
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let rules = TagRules::load(Path::new("/no/such/tags_config.txt"));
        assert!(rules.is_empty());

        assert!(matches!(
            TagRules::load_strict(Path::new("/no/such/tags_config.txt")),
            Err(TagConfigError::NotFound { .. })
        ));
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("tags_config.txt");
        fs::write(&path, "[geography]\nparis\nfrance\n").unwrap();

        let rules = TagRules::load(&path);
        assert_eq!(rules.len(), 1);
        assert_eq!(rules.rules()[0].patterns.len(), 2);
    }

    #[test]
    fn test_load_default_uses_configured_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("rules.txt");
        fs::write(&path, "[x]\ny\n").unwrap();

        let config = Config {
            tags_file: Some(path),
            ..Config::default()
        };
        assert_eq!(TagRules::load_default(&config).len(), 1);

        let config = Config {
            tags_file: Some(temp_dir.path().join("missing.txt")),
            ..Config::default()
        };
        assert!(TagRules::load_default(&config).is_empty());
    }

    #[test]
    fn test_detect_is_case_insensitive_and_ignores_markup() {
        let detector = detector("[geography]\nparis\nfrance\n");

        assert_eq!(detector.detect("Capital of France"), vec!["geography"]);
        assert_eq!(detector.detect("<b>PA</b>RIS"), vec!["geography"]);
        assert!(detector.detect("Berlin").is_empty());
    }

    #[test]
    fn test_detect_multiple_tags_in_rule_order() {
        let detector = detector("[europe]\nfrance\n[capital]\nparis\n[asia]\njapan\n");
        assert_eq!(detector.detect("Paris, France"), vec!["europe", "capital"]);
    }

    #[test]
    fn test_first_matching_pattern_short_circuits() {
        let detector = detector("[geo]\nparis\nfrance\n");
        assert_eq!(detector.detect("paris is nice"), vec!["geo"]);
        // Assigned once even when every pattern matches
        assert_eq!(detector.detect("paris, france"), vec!["geo"]);
    }

    #[test]
    fn test_invalid_pattern_skipped() {
        let detector = detector("[geo]\n(unclosed\nfrance\n[other]\n[bad\n");
        assert_eq!(detector.detect("vive la france"), vec!["geo"]);
    }

    #[test]
    fn test_regex_patterns() {
        let detector = detector("[driving]\ndrives? on the left\n^\\d+ of\n");
        assert_eq!(detector.detect("They DRIVE on the left"), vec!["driving"]);
        assert_eq!(detector.detect("12 of 40"), vec!["driving"]);
    }

    #[test]
    fn test_disabled_detector() {
        let detector = TagDetector::disabled();
        assert!(!detector.is_enabled());
        assert!(detector.detect("paris").is_empty());
        assert!(TagDetector::new(TagRules::parse("[a]\nb\n")).is_enabled());
    }

    #[test]
    fn test_merge_tags() {
        let detected = vec!["geography".to_string()];
        assert_eq!(merge_tags("history", &detected), "history geography");
        assert_eq!(merge_tags("", &detected), "geography");
        assert_eq!(merge_tags("  ", &detected), "geography");
    }

    #[test]
    fn test_merge_tags_keeps_padding() {
        let detected = vec!["geography".to_string()];
        assert_eq!(merge_tags(" history ", &detected), " history geography ");
        assert_eq!(merge_tags("   ", &detected), "geography");
    }

    #[test]
    fn test_merge_tags_dedupes() {
        let detected = vec!["b".to_string(), "c".to_string(), "c".to_string()];
        assert_eq!(merge_tags("a b a", &detected), "a b c");
    }

    #[test]
    fn test_merge_without_additions_is_verbatim() {
        let detected = vec!["history".to_string()];
        assert_eq!(merge_tags(" history  extra ", &detected), " history  extra ");
        assert_eq!(merge_tags(" x ", &[]), " x ");
        assert_eq!(merge_tags("a a", &[]), "a a");
    }

    #[test]
    fn test_dedupe_tags() {
        assert_eq!(dedupe_tags("x x y"), "x y");
        assert_eq!(dedupe_tags(" b a b "), " b a ");
        assert_eq!(dedupe_tags("solo"), "solo");
        assert_eq!(dedupe_tags("  "), "");
    }
}
