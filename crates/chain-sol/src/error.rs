use thiserror::Error;

/// Errors raised while building, signing or decoding Solana data.
#[derive(Debug, Error)]
pub enum SolError {
    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("transaction build error: {0}")]
    TransactionBuildError(String),

    #[error("signing error: {0}")]
    SigningError(String),

    #[error("serialization error: {0}")]
    SerializationError(String),

    #[error("account decode error: {0}")]
    AccountDecodeError(String),

    #[error("invalid metadata field: {0}")]
    InvalidMetadata(String),
}
