#![warn(missing_docs)]
//! `fold-tree-lang` - data-driven folding configuration for `fold-tree`.
//!
//! This crate only describes *what* folds in a language: which patterns open and close a
//! region, where line comments begin, and what a string literal looks like. It does not
//! depend on `fold-tree` or on any regex engine; `fold-tree-highlight-simple` compiles a
//! [`FoldingConfig`] into a lexer.

mod error;

pub use error::ConfigError;

use serde::{Deserialize, Serialize};
use std::path::Path;

/// One kind of foldable region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionRule {
    /// Human-readable name, used in error messages.
    pub name: String,
    /// Pattern (regex syntax) of the opening token.
    pub open: String,
    /// Pattern (regex syntax) of the closing token.
    pub close: String,
    /// Positive region type reported for this rule.
    pub region_type: i32,
    /// Whether the tokens are also recognized inside line comments (marker comments such as
    /// `// BEGIN`).
    #[serde(default)]
    pub in_comment: bool,
}

impl RegionRule {
    /// Create a rule whose tokens are ignored inside comments.
    pub fn new(
        name: impl Into<String>,
        open: impl Into<String>,
        close: impl Into<String>,
        region_type: i32,
    ) -> Self {
        Self {
            name: name.into(),
            open: open.into(),
            close: close.into(),
            region_type,
            in_comment: false,
        }
    }

    /// Also match the tokens inside line comments.
    pub fn in_comment(mut self) -> Self {
        self.in_comment = true;
        self
    }
}

/// Folding rules for one language.
///
/// # Example
///
/// ```rust
/// use fold_tree_lang::FoldingConfig;
///
/// let config = FoldingConfig::from_yaml_str(
///     r#"
/// name: INI-ish
/// line_comment: ";"
/// rules:
///   - name: section
///     open: '^\['
///     close: '^\[/'
///     region_type: 1
/// "#,
/// )
/// .unwrap();
/// assert_eq!(config.rules.len(), 1);
/// assert!(!config.rules[0].in_comment);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoldingConfig {
    /// Language name.
    pub name: String,
    /// Line comment token (e.g. `//`, `#`).
    #[serde(default)]
    pub line_comment: Option<String>,
    /// Pattern (regex syntax) of a single-line string literal.
    #[serde(default)]
    pub string_pattern: Option<String>,
    /// Region rules, in priority order for equally long overlapping matches.
    #[serde(default)]
    pub rules: Vec<RegionRule>,
}

impl FoldingConfig {
    /// Parse and validate a YAML configuration.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: FoldingConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a YAML configuration file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml)
    }

    /// Serialize back to YAML.
    pub fn to_yaml_string(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Check rule patterns and region types.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.line_comment.as_deref().is_some_and(str::is_empty) {
            return Err(ConfigError::EmptyLineComment);
        }
        for rule in &self.rules {
            if rule.open.is_empty() {
                return Err(ConfigError::EmptyPattern {
                    rule: rule.name.clone(),
                    which: "open",
                });
            }
            if rule.close.is_empty() {
                return Err(ConfigError::EmptyPattern {
                    rule: rule.name.clone(),
                    which: "close",
                });
            }
            if rule.region_type <= 0 {
                return Err(ConfigError::InvalidRegionType {
                    rule: rule.name.clone(),
                    region_type: rule.region_type,
                });
            }
        }
        Ok(())
    }

    /// Braces, `//` comments, double-quoted strings and `// BEGIN` / `// END` marker comments.
    pub fn c_like() -> Self {
        Self {
            name: "C-like".to_string(),
            line_comment: Some("//".to_string()),
            string_pattern: Some(r#""(?:\\.|[^"\\])*""#.to_string()),
            rules: vec![
                RegionRule::new("brace", r"\{", r"\}", 1),
                RegionRule::new("region-marker", r"//\s*BEGIN\b", r"//\s*END\b", 2).in_comment(),
            ],
        }
    }

    /// Objects and arrays; JSON has no comments.
    pub fn json() -> Self {
        Self {
            name: "JSON".to_string(),
            line_comment: None,
            string_pattern: Some(r#""(?:\\.|[^"\\])*""#.to_string()),
            rules: vec![
                RegionRule::new("object", r"\{", r"\}", 1),
                RegionRule::new("array", r"\[", r"\]", 2),
            ],
        }
    }

    /// Rule reporting `region_type`, if any.
    pub fn rule_for_type(&self, region_type: i32) -> Option<&RegionRule> {
        self.rules
            .iter()
            .find(|rule| rule.region_type == region_type.abs())
    }
}
