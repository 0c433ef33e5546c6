//! Error taxonomy for the adapter core
//!
//! Every caller-observable failure is one of these kinds. The core performs
//! no silent recovery: idempotent reads are retried at most once on
//! [`AdapterError::Network`], then the error surfaces unchanged.

use thiserror::Error;

/// Caller-observable error kinds
#[derive(Debug, Error)]
pub enum AdapterError {
    /// A caller-supplied argument failed a local check; no network call was issued
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The withdrawal recipient failed the chain's address validation
    #[error("invalid recipient address: {0}")]
    InvalidRecipient(String),

    /// An address string did not parse under its chain's rules
    #[error("{chain} address decode failed: {reason}")]
    AddressDecode {
        chain: &'static str,
        reason: String,
    },

    /// (De)serialization failure for a chain-native transaction format
    #[error("codec error: {0}")]
    Codec(String),

    /// Signature attachment could not find the expected carrier slot
    #[error("envelope malformed: {0}")]
    EnvelopeMalformed(String),

    /// Transport failure talking to an RPC endpoint
    #[error("network error: {0}")]
    Network(String),

    /// The chain accepted the request syntactically but rejected it
    /// semantically; the original chain error code is preserved verbatim
    #[error("chain rejected transaction: {0}")]
    ChainRejected(String),

    /// A lookup returned no record
    #[error("not found: {0}")]
    NotFound(String),

    /// Deadline exceeded
    #[error("timeout: {0}")]
    Timeout(String),

    /// Operation attempted against a chain family that does not implement it
    #[error("unsupported operation: {0}")]
    Unsupported(String),
}

impl AdapterError {
    /// Shorthand for [`AdapterError::AddressDecode`]
    pub fn address(chain: &'static str, reason: impl Into<String>) -> Self {
        AdapterError::AddressDecode {
            chain,
            reason: reason.into(),
        }
    }

    /// Whether a retry of an idempotent read could help
    pub fn is_transient(&self) -> bool {
        matches!(self, AdapterError::Network(_))
    }
}

impl From<reqwest::Error> for AdapterError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AdapterError::Timeout(err.to_string())
        } else {
            AdapterError::Network(err.to_string())
        }
    }
}

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, AdapterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(AdapterError::Network("connection refused".into()).is_transient());
        assert!(!AdapterError::ChainRejected("tefPAST_SEQ".into()).is_transient());
        assert!(!AdapterError::Timeout("deadline".into()).is_transient());
    }

    #[test]
    fn test_chain_rejection_preserves_code() {
        let err = AdapterError::ChainRejected("SEQUENCE_NUMBER_TOO_OLD".into());
        assert!(err.to_string().contains("SEQUENCE_NUMBER_TOO_OLD"));
    }
}
