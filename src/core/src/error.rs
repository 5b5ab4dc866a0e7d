//! Error types for the rule and attribute model

use thiserror::Error;

/// Errors produced while loading rules or evaluating configuration values
#[derive(Debug, Error)]
pub enum CoreError {
    /// Malformed rule configuration
    #[error("invalid rule config: {0}")]
    InvalidRuleConfig(String),

    /// A frontend path pattern failed to compile
    #[error("failed to compile route pattern {pattern:?}")]
    PatternCompile {
        /// The offending frontend pattern
        pattern: String,
        /// Underlying regex error
        #[source]
        source: regex::Error,
    },

    /// Comparison operator is not part of the expression DSL
    #[error("unsupported comparison operator {0:?}")]
    UnsupportedOperator(String),

    /// Operands cannot be compared with the requested operator
    #[error("operands are not comparable: {0}")]
    NotComparable(String),

    /// An attribute value had a shape no consumer can normalize
    #[error("unsupported attribute value shape: {0}")]
    UnexpectedShape(String),

    /// Rule source (blob/db) failure
    #[error("rule source error: {0}")]
    Source(#[from] anyhow::Error),
}

/// Result type for rule model operations
pub type Result<T> = std::result::Result<T, CoreError>;
