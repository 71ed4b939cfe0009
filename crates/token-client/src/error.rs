//! Error types for the token client.
//!
//! - [`RpcError`]: transport and JSON-RPC failures, with the transient
//!   classification the submission pipeline retries on.
//! - [`ClientError`]: everything a pipeline can surface to its caller.
//!
//! `From` conversions let `?` cross from `chain_sol` and the RPC layer.

use chain_sol::SolError;
use thiserror::Error;

/// Failures talking to the ledger RPC endpoint.
#[derive(Debug, Error)]
pub enum RpcError {
    /// The request went out but no structured response came back.
    #[error("no response from RPC endpoint")]
    NoResponse,

    /// The endpoint answered with a non-success HTTP status.
    #[error("HTTP {status} from RPC endpoint")]
    Http { status: u16 },

    /// Connect, timeout or IO failure below HTTP.
    #[error("network error: {0}")]
    Network(String),

    /// A JSON-RPC error object.
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// The response body did not have the expected shape.
    #[error("failed to decode RPC response: {0}")]
    Decode(String),
}

impl RpcError {
    /// Whether a retry may succeed: no response, HTTP 5xx or a network fault.
    pub fn is_transient(&self) -> bool {
        match self {
            RpcError::NoResponse | RpcError::Network(_) => true,
            RpcError::Http { status } => (500..600).contains(status),
            RpcError::Rpc { .. } | RpcError::Decode(_) => false,
        }
    }
}

impl From<reqwest::Error> for RpcError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            RpcError::Http {
                status: status.as_u16(),
            }
        } else if err.is_decode() {
            RpcError::Decode(err.to_string())
        } else {
            RpcError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for RpcError {
    fn from(err: serde_json::Error) -> Self {
        RpcError::Decode(err.to_string())
    }
}

/// Top-level error for client pipelines.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Rpc(#[from] RpcError),

    #[error(transparent)]
    Chain(#[from] SolError),

    /// The wallet signer refused or failed to sign.
    #[error("signer error: {0}")]
    Signer(String),

    #[error("configuration error: {0}")]
    Config(String),

    /// Confirmation did not arrive in time. The transaction may still land.
    #[error("transaction {signature} not confirmed within {timeout_ms} ms (outcome unknown)")]
    ConfirmationTimeout { signature: String, timeout_ms: u64 },

    /// The blockhash expired before confirmation; the transaction can no longer land.
    #[error("blockhash expired before transaction {signature} was confirmed")]
    BlockhashExpired { signature: String },

    /// Confirmed, but execution failed on chain.
    #[error("transaction {signature} failed: {details}")]
    TransactionFailed { signature: String, details: String },

    #[error("account not found: {0}")]
    AccountNotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("pinning service error: {0}")]
    Pinning(String),
}

impl ClientError {
    /// Whether the submission pipeline should try again.
    pub fn is_transient(&self) -> bool {
        matches!(self, ClientError::Rpc(err) if err.is_transient())
    }

    /// An HTTP 5xx answer. Unlike a lost response, the server replied, so
    /// a non-idempotent request is not known to have been applied.
    pub fn is_server_error(&self) -> bool {
        matches!(self, ClientError::Rpc(RpcError::Http { status }) if (500..600).contains(status))
    }
}

pub type RpcResult<T> = Result<T, RpcError>;
pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(RpcError::NoResponse.is_transient());
        assert!(RpcError::Network("connection reset".into()).is_transient());
        assert!(RpcError::Http { status: 503 }.is_transient());
        assert!(RpcError::Http { status: 500 }.is_transient());

        assert!(!RpcError::Http { status: 429 }.is_transient());
        assert!(!RpcError::Http { status: 404 }.is_transient());
        assert!(!RpcError::Decode("eof".into()).is_transient());
        assert!(!RpcError::Rpc {
            code: -32002,
            message: "Transaction simulation failed".into()
        }
        .is_transient());
    }

    #[test]
    fn client_error_defers_to_rpc_classification() {
        assert!(ClientError::from(RpcError::Http { status: 502 }).is_transient());
        assert!(!ClientError::Signer("user rejected".into()).is_transient());
        assert!(!ClientError::from(SolError::SigningError("x".into())).is_transient());
    }

    #[test]
    fn timeout_message_says_outcome_unknown() {
        let err = ClientError::ConfirmationTimeout {
            signature: "5abc".into(),
            timeout_ms: 30_000,
        };
        assert_eq!(
            err.to_string(),
            "transaction 5abc not confirmed within 30000 ms (outcome unknown)"
        );
    }

    #[test]
    fn chain_errors_are_transparent() {
        let err: ClientError = SolError::InvalidAddress("bad".into()).into();
        assert_eq!(err.to_string(), "invalid address: bad");
    }
}
