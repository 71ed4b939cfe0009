//! Async pipelines for the token generator.
//!
//! Two independent pipelines sit on top of `chain-sol`:
//!
//! - **submission**: compile, sign and send transactions with bounded
//!   retries, then confirm them against the ledger under a timeout;
//! - **metadata**: derive the metadata account of a mint, decode it and
//!   merge in the off-chain JSON document it references.
//!
//! Transfers, token creation, wrapped SOL, owner listings, swap quotes and
//! content pinning are built from the same pieces. Every collaborator
//! (ledger RPC, wallet signer, metadata fetcher, pinning client) is passed
//! in explicitly; there is no global state.

pub mod config;
pub mod error;
pub mod metadata;
pub mod offchain;
pub mod pinning;
pub mod portfolio;
pub mod rpc;
pub mod signer;
pub mod submission;
pub mod swap;
pub mod token_factory;
pub mod transfer;

#[cfg(test)]
mod mock;

pub use config::{ClientConfig, Network, PinningCredentials};
pub use error::{ClientError, ClientResult, RpcError, RpcResult};
pub use metadata::{get_token_data, get_token_metadata, is_probable_nft, TokenMetadata, TokenSummary};
pub use offchain::{HttpMetadataFetcher, MetadataFetcher, OffChainMetadata};
pub use pinning::{PinnedContent, PinningClient, TokenMetadataUpload};
pub use portfolio::{list_owner_tokens, nft_holdings};
pub use rpc::{get_mint, HttpRpcClient, LatestBlockhash, LedgerRpc, ParsedTokenAccount};
pub use signer::{KeypairSigner, WalletSigner};
pub use submission::{
    confirm_with_timeout, send_and_confirm, submit_with_retry, submit_with_retry_when,
    Confirmation, SubmitOptions, Submitted, TransactionReceipt,
};
pub use swap::{quote_swap, SwapQuote};
pub use token_factory::{create_token, revoke_authority, CreateTokenParams, CreatedToken};
pub use transfer::{
    request_airdrop, transfer_sol, transfer_tokens, unwrap_sol, wrap_sol, TokenTransferRequest,
    TransferRequest,
};
