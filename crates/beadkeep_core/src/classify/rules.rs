//! Ordered rule tables.

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use std::collections::{BTreeMap, BTreeSet};

static BRACKET_TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    RegexBuilder::new(r"\[([a-z][a-z0-9_-]*)\]")
        .case_insensitive(true)
        .build()
        .expect("valid bracket token regex")
});

/// One (pattern, label) rule. Patterns match case-insensitively.
#[derive(Debug, Clone)]
pub struct Rule {
    pattern: Regex,
    label: String,
}

impl Rule {
    /// Compiles `pattern` case-insensitively.
    pub fn new(pattern: &str, label: impl Into<String>) -> Result<Self, regex::Error> {
        let pattern = RegexBuilder::new(pattern).case_insensitive(true).build()?;
        Ok(Self {
            pattern,
            label: label.into(),
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn matches(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }
}

/// Ordered keyword rules evaluated in full.
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    rules: Vec<Rule>,
}

impl RuleTable {
    /// Compiles `(pattern, label)` entries in order.
    pub fn compile(entries: &[(&str, &str)]) -> Result<Self, regex::Error> {
        let rules = entries
            .iter()
            .map(|(pattern, label)| Rule::new(pattern, *label))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Labels of every rule whose pattern occurs anywhere in `text`.
    pub fn classify(&self, text: &str) -> BTreeSet<String> {
        self.rules
            .iter()
            .filter(|rule| rule.matches(text))
            .map(|rule| rule.label.clone())
            .collect()
    }
}

/// Lookup from `[token]` prefixes to labels.
///
/// A `None` entry marks a token that is known but deliberately unlabeled.
#[derive(Debug, Clone, Default)]
pub struct BracketTable {
    entries: BTreeMap<String, Option<String>>,
}

impl BracketTable {
    pub fn new(entries: &[(&str, Option<&str>)]) -> Self {
        Self {
            entries: entries
                .iter()
                .map(|(token, label)| (token.to_lowercase(), label.map(str::to_string)))
                .collect(),
        }
    }

    /// Label for one bracket token; `None` for skip-listed or unknown tokens.
    pub fn lookup(&self, token: &str) -> Option<&str> {
        self.entries
            .get(token.to_lowercase().as_str())
            .and_then(|label| label.as_deref())
    }

    /// Labels for every bracket token in `title`.
    pub fn classify(&self, title: &str) -> BTreeSet<String> {
        BRACKET_TOKEN_RE
            .captures_iter(title)
            .filter_map(|caps| caps.get(1))
            .filter_map(|token| self.lookup(token.as_str()))
            .map(str::to_string)
            .collect()
    }
}
