//! Error taxonomy for the scraping/normalization pipeline.

use thiserror::Error;

/// Errors local to parsing a page or odds table.
///
/// `MalformedField` is deliberately distinct from field absence: an empty or
/// dash cell means "the source did not publish this window" and parses to
/// `None`, while a non-empty cell that fails to parse is corrupt data that
/// must not be folded into aggregate statistics.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("input document is empty")]
    EmptyInput,

    #[error("page structure mismatch: {0}")]
    StructureMismatch(String),

    #[error("malformed {label} field: {value:?}")]
    MalformedField { label: &'static str, value: String },

    #[error("combination arity mismatch: expected {expected} boats, got {got}")]
    InvalidArity { expected: usize, got: usize },

    #[error("invalid odds value: {0:?}")]
    InvalidOddsValue(String),
}

impl ParseError {
    pub fn structure(msg: impl Into<String>) -> Self {
        ParseError::StructureMismatch(msg.into())
    }

    pub fn malformed(label: &'static str, value: impl Into<String>) -> Self {
        ParseError::MalformedField {
            label,
            value: value.into(),
        }
    }
}

/// Errors from a single fetch+parse unit.
///
/// Network failures are transient and eligible for retry by the transport
/// layer; parse failures are terminal for that unit and never retried.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),

    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        FetchError::Network(e.to_string())
    }
}

/// Store adapter errors. Read failures degrade to a cache miss; write
/// failures are logged and never fail an otherwise successful unit.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("record serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Configuration-level errors that abort a bulk run before any unit is
/// attempted. Everything else is captured per unit.
#[derive(Debug, Error)]
pub enum BulkConfigError {
    #[error("invalid date range: {0}")]
    InvalidDateRange(String),

    #[error("empty {0} selection")]
    EmptySelection(&'static str),

    #[error("{what} {value} out of range")]
    OutOfRange { what: &'static str, value: u8 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display() {
        let err = ParseError::malformed("rate", "12.x%");
        assert!(err.to_string().contains("rate"));
        assert!(err.to_string().contains("12.x%"));

        let err = ParseError::InvalidArity {
            expected: 3,
            got: 2,
        };
        assert!(err.to_string().contains("expected 3"));
    }

    #[test]
    fn test_fetch_error_from_parse() {
        let err: FetchError = ParseError::EmptyInput.into();
        assert!(matches!(err, FetchError::Parse(ParseError::EmptyInput)));
    }
}
