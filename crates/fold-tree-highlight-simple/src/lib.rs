//! `fold-tree-highlight-simple` - Simple (regex-based) region lexing for `fold-tree`.
//!
//! This crate is intended for languages where brace or marker matching is enough to find
//! foldable regions, so no real parser is needed.

use fold_tree::{RegionLexer, RegionType};
use fold_tree_lang::{ConfigError, FoldingConfig};
use regex::Regex;
use std::cmp::Reverse;
use std::ops::Range;
use thiserror::Error;
use tracing::debug;

/// Errors produced while building a [`RegexRegionLexer`].
#[derive(Debug, Error)]
pub enum LexerError {
    #[error("invalid pattern '{pattern}': {source}")]
    /// A configured pattern is not a valid regex.
    Regex {
        /// The pattern as written in the configuration.
        pattern: String,
        /// Compiler error.
        #[source]
        source: regex::Error,
    },

    #[error(transparent)]
    /// The configuration failed validation.
    Config(#[from] ConfigError),
}

fn compile(pattern: &str) -> Result<Regex, LexerError> {
    Regex::new(pattern).map_err(|source| LexerError::Regex {
        pattern: pattern.to_string(),
        source,
    })
}

/// The compiled open/close pair of one region rule.
#[derive(Debug, Clone)]
pub struct RegexRegionRule {
    open: Regex,
    close: Regex,
    region_type: RegionType,
    in_comment: bool,
}

impl RegexRegionRule {
    pub fn new(open: &str, close: &str, region_type: RegionType) -> Result<Self, LexerError> {
        Ok(Self {
            open: compile(open)?,
            close: compile(close)?,
            region_type,
            in_comment: false,
        })
    }

    /// Also match inside line comments.
    pub fn with_in_comment(mut self, in_comment: bool) -> Self {
        self.in_comment = in_comment;
        self
    }

    pub fn region_type(&self) -> RegionType {
        self.region_type
    }
}

/// One regex match that may become a token.
#[derive(Debug, Clone)]
struct Candidate {
    span: Range<usize>,
    token: RegionType,
    rule: usize,
}

/// A regex-driven [`RegionLexer`].
///
/// Per line, matches of every rule are collected; matches starting inside a string literal,
/// or after the line comment token for rules not marked `in_comment`, are dropped. Overlapping
/// matches are resolved by earliest start, then longest match, then rule order.
#[derive(Debug, Clone)]
pub struct RegexRegionLexer {
    rules: Vec<RegexRegionRule>,
    string: Option<Regex>,
    line_comment: Option<String>,
}

impl RegexRegionLexer {
    pub fn new(rules: Vec<RegexRegionRule>) -> Self {
        Self {
            rules,
            string: None,
            line_comment: None,
        }
    }

    /// Ignore matches inside spans of `pattern`.
    pub fn with_string_pattern(mut self, pattern: &str) -> Result<Self, LexerError> {
        self.string = Some(compile(pattern)?);
        Ok(self)
    }

    /// Ignore matches after `token`, except for `in_comment` rules.
    pub fn with_line_comment(mut self, token: impl Into<String>) -> Self {
        self.line_comment = Some(token.into()).filter(|t| !t.is_empty());
        self
    }

    /// Validate and compile a [`FoldingConfig`].
    pub fn from_config(config: &FoldingConfig) -> Result<Self, LexerError> {
        config.validate()?;

        let rules = config
            .rules
            .iter()
            .map(|rule| {
                Ok(RegexRegionRule::new(&rule.open, &rule.close, rule.region_type)?
                    .with_in_comment(rule.in_comment))
            })
            .collect::<Result<Vec<_>, LexerError>>()?;

        let mut lexer = Self::new(rules);
        if let Some(pattern) = &config.string_pattern {
            lexer = lexer.with_string_pattern(pattern)?;
        }
        if let Some(token) = &config.line_comment {
            lexer = lexer.with_line_comment(token.clone());
        }
        debug!(language = %config.name, rules = lexer.rules.len(), "region lexer compiled");
        Ok(lexer)
    }

    /// C-like preset: see [`FoldingConfig::c_like`].
    pub fn c_like() -> Result<Self, LexerError> {
        Self::from_config(&FoldingConfig::c_like())
    }

    /// JSON preset: see [`FoldingConfig::json`].
    pub fn json() -> Result<Self, LexerError> {
        Self::from_config(&FoldingConfig::json())
    }

    pub fn rules(&self) -> &[RegexRegionRule] {
        &self.rules
    }

    /// Tokens of one line of text, left to right.
    pub fn tokens(&self, text: &str) -> Vec<RegionType> {
        let strings: Vec<Range<usize>> = match &self.string {
            Some(regex) => regex.find_iter(text).map(|m| m.range()).collect(),
            None => Vec::new(),
        };
        let in_string = |pos: usize| strings.iter().any(|s| s.contains(&pos));

        let comment_start = self.line_comment.as_deref().and_then(|token| {
            text.match_indices(token)
                .map(|(pos, _)| pos)
                .find(|pos| !in_string(*pos))
        });

        let mut candidates = Vec::new();
        for (index, rule) in self.rules.iter().enumerate() {
            let commented =
                |pos: usize| !rule.in_comment && comment_start.is_some_and(|c| pos >= c);
            let opens = rule.open.find_iter(text).map(|m| (m.range(), rule.region_type));
            let closes = rule.close.find_iter(text).map(|m| (m.range(), -rule.region_type));
            for (span, token) in opens.chain(closes) {
                if span.is_empty() || in_string(span.start) || commented(span.start) {
                    continue;
                }
                candidates.push(Candidate {
                    span,
                    token,
                    rule: index,
                });
            }
        }

        candidates.sort_by_key(|c| (c.span.start, Reverse(c.span.len()), c.rule, c.token < 0));

        let mut tokens = Vec::new();
        let mut cursor = 0;
        for candidate in candidates {
            if candidate.span.start < cursor {
                continue;
            }
            cursor = candidate.span.end;
            tokens.push(candidate.token);
        }
        tokens
    }
}

impl RegionLexer for RegexRegionLexer {
    fn region_tokens(&mut self, _line: usize, text: &str) -> Vec<RegionType> {
        self.tokens(text)
    }
}
