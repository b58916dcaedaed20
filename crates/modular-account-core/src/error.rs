//! Error types for modular account operations

use starknet_types_core::felt::Felt;
use thiserror::Error;

use crate::types::felt_to_hex;

/// Result type alias for modular account operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while authorizing, signing or submitting
#[derive(Debug, Error)]
pub enum Error {
    // ============ Session Authorization Errors ============
    /// The authorization is already bound to a different grantor module
    #[error(
        "Authorization already bound to grantor {}, cannot bind {} without reset",
        felt_to_hex(.bound),
        felt_to_hex(.requested)
    )]
    GrantorConflict { bound: Felt, requested: Felt },

    /// Prefix call requested before a grantor was bound
    #[error("Not ready: {0}")]
    NotReady(String),

    /// Merkle proof requested for a leaf outside the tree
    #[error("Not found: {0}")]
    NotFound(String),

    /// Signer output could not be normalized into (r, s)
    #[error("Unsupported signature format: {0}")]
    SignatureFormat(String),

    // ============ Configuration Errors ============
    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Value is not a canonical field element
    #[error("Invalid field element: {0}")]
    InvalidFelt(String),

    // ============ Threshold Errors ============
    /// Threshold requirements not met
    #[error("Threshold not met: required {required}, got {actual}")]
    ThresholdNotMet { required: usize, actual: usize },

    // ============ Cryptographic Errors ============
    /// Cryptographic operation failed
    #[error("Cryptographic error: {0}")]
    Crypto(String),

    // ============ Chain Errors ============
    /// Provider/chain operation failed
    #[error("Chain error: {0}")]
    Chain(String),

    /// Timeout waiting for a receipt
    #[error("Timeout waiting for {0}")]
    Timeout(String),

    // ============ Serialization Errors ============
    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    // ============ Internal Errors ============
    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<hex::FromHexError> for Error {
    fn from(e: hex::FromHexError) -> Self {
        Error::InvalidFelt(e.to_string())
    }
}
