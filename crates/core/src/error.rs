//! Errors raised while reading portal values from untrusted text.

use thiserror::Error;

/// A cookie, token claim or database row carried a value the portal does not
/// recognise.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueError {
    #[error("unknown role '{0}'")]
    UnknownRole(String),

    #[error("malformed {kind}: {reason}")]
    MalformedId { kind: &'static str, reason: String },
}

impl ValueError {
    pub fn malformed_id(kind: &'static str, reason: impl ToString) -> Self {
        Self::MalformedId {
            kind,
            reason: reason.to_string(),
        }
    }
}
