//! Error taxonomy for rule loading, pattern compilation, and annotation.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RegexNerError>;

/// Errors raised by the annotator.
///
/// Configuration and pattern errors are fatal at construction time; there is
/// no partial initialization and no retry. A match being rejected by a filter
/// or by the overwrite policy is normal control flow and never surfaces here.
#[derive(Debug, Error)]
pub enum RegexNerError {
    /// Malformed mapping source: bad header, wrong column count, invalid
    /// numeric column, unresolvable annotation field, bad source spec.
    #[error("configuration error: {0}")]
    Config(String),

    /// Bad pattern syntax or an out-of-range annotate-group index.
    #[error("invalid pattern '{pattern}' in {file}: {reason}")]
    InvalidPattern {
        pattern: String,
        file: String,
        reason: String,
    },

    /// `annotate` was called on an annotation with neither sentences nor tokens.
    #[error("no tokens or sentences found in the input annotation")]
    MissingInput,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RegexNerError {
    pub fn config(msg: impl Into<String>) -> Self {
        RegexNerError::Config(msg.into())
    }

    pub fn invalid_pattern(
        pattern: impl Into<String>,
        file: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        RegexNerError::InvalidPattern {
            pattern: pattern.into(),
            file: file.into(),
            reason: reason.into(),
        }
    }
}
