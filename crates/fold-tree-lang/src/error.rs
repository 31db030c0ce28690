use thiserror::Error;

#[derive(Debug, Error)]
/// Errors produced while loading or validating a [`FoldingConfig`](crate::FoldingConfig).
pub enum ConfigError {
    #[error("YAML parse error: {0}")]
    /// YAML parsing failed.
    Yaml(#[from] serde_yaml::Error),

    #[error("I/O error: {0}")]
    /// Filesystem I/O failed.
    Io(#[from] std::io::Error),

    #[error("rule '{rule}' has an empty {which} pattern")]
    /// An open or close pattern is empty.
    EmptyPattern {
        /// Name of the offending rule.
        rule: String,
        /// `"open"` or `"close"`.
        which: &'static str,
    },

    #[error("rule '{rule}' has region type {region_type}; region types must be positive")]
    /// A rule's region type is zero or negative.
    InvalidRegionType {
        /// Name of the offending rule.
        rule: String,
        /// The rejected type.
        region_type: i32,
    },

    #[error("empty line comment token")]
    /// `line_comment` is set but empty.
    EmptyLineComment,
}
