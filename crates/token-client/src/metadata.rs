//! Token and NFT metadata aggregation.
//!
//! On-chain state (mint account and Metaplex metadata record) is fetched
//! from the ledger and merged with the off-chain JSON document the record
//! points at. Off-chain failures never hide on-chain data: they are logged
//! and the off-chain fields stay empty.

use std::time::Duration;

use chain_sol::{
    bytes_to_address, derive_metadata_address, MetadataAccount, MintAccount, SolError,
    METADATA_PROGRAM_ID,
};
use serde::Serialize;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

use crate::error::ClientResult;
use crate::offchain::{MetadataFetcher, OffChainMetadata};
use crate::rpc::{get_mint, LedgerRpc};

/// Page size for `getSignaturesForAddress`.
pub const SIGNATURE_PAGE_LIMIT: usize = 1_000;
/// Pages walked when looking for the oldest signature of a mint.
pub const MAX_SIGNATURE_PAGES: usize = 10;
/// Upper bound on one off-chain document fetch, whatever the fetcher does.
pub const OFF_CHAIN_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Merged metadata for a mint.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenMetadata {
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub metadata_off_chain: OffChainLink,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_chain: Option<MetadataRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OffChainLink {
    pub link: Option<String>,
    pub data: OffChainMetadata,
}

/// On-chain metadata record, projected for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataRecord {
    pub metadata_address: String,
    pub update_authority: String,
    pub name: String,
    pub symbol: String,
    pub off_chain_uri: Option<String>,
    pub seller_fee_basis_points: u16,
    pub creators: Option<Vec<CreatorShare>>,
    pub primary_sale_happened: bool,
    pub is_mutable: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreatorShare {
    pub address: String,
    pub verified: bool,
    pub share: u8,
}

impl MetadataRecord {
    fn from_account(metadata_address: &[u8; 32], account: MetadataAccount) -> Self {
        let uri = account.uri.trim();
        Self {
            metadata_address: bytes_to_address(metadata_address),
            update_authority: account.update_authority_address(),
            off_chain_uri: (!uri.is_empty()).then(|| uri.to_string()),
            name: account.name,
            symbol: account.symbol,
            seller_fee_basis_points: account.seller_fee_basis_points,
            creators: account.creators.map(|creators| {
                creators
                    .into_iter()
                    .map(|c| CreatorShare {
                        address: bytes_to_address(&c.address),
                        verified: c.verified,
                        share: c.share,
                    })
                    .collect()
            }),
            primary_sale_happened: account.primary_sale_happened,
            is_mutable: account.is_mutable,
        }
    }
}

/// Fungible token summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenSummary {
    pub mint: String,
    pub token_program: String,
    pub decimals: u8,
    /// Human supply, `supply_raw / 10^decimals`.
    pub supply: f64,
    pub supply_raw: u64,
    pub mint_authority_revoked: bool,
    pub freeze_authority_revoked: bool,
    /// Unix time of the oldest retrievable signature, 0 when unknown.
    pub created_at: i64,
    pub metadata: TokenMetadata,
}

/// NFT heuristic: zero decimals and a supply of exactly one.
///
/// A fungible token minted with supply 1 and 0 decimals is misclassified.
pub fn is_probable_nft(mint: &MintAccount) -> bool {
    mint.decimals == 0 && mint.supply == 1
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

/// Fetch and merge on-chain and off-chain metadata for `mint`.
///
/// A mint without a metadata account yields the empty shell. Off-chain
/// fetch or parse failures are logged and leave the off-chain data empty.
#[instrument(skip(rpc, fetcher, mint), fields(mint = %bytes_to_address(mint)))]
pub async fn get_token_metadata(
    rpc: &dyn LedgerRpc,
    fetcher: &dyn MetadataFetcher,
    mint: &[u8; 32],
) -> ClientResult<TokenMetadata> {
    let metadata_address = derive_metadata_address(mint)?;

    let account = match rpc.get_account_info(&metadata_address).await? {
        Some(account) if !account.data.is_empty() => account,
        _ => {
            debug!("no metadata account");
            return Ok(TokenMetadata::default());
        }
    };

    if account.owner != METADATA_PROGRAM_ID {
        return Err(SolError::AccountDecodeError(format!(
            "metadata account {} is owned by {}",
            bytes_to_address(&metadata_address),
            bytes_to_address(&account.owner)
        ))
        .into());
    }
    let decoded = MetadataAccount::unpack(&account.data)?;
    if decoded.mint != *mint {
        return Err(SolError::AccountDecodeError(format!(
            "metadata account describes mint {}",
            bytes_to_address(&decoded.mint)
        ))
        .into());
    }
    let record = MetadataRecord::from_account(&metadata_address, decoded);

    let data = match &record.off_chain_uri {
        Some(uri) => match timeout(OFF_CHAIN_FETCH_TIMEOUT, fetcher.fetch(uri)).await {
            Ok(Ok(document)) => document,
            Ok(Err(err)) => {
                warn!(%uri, error = %err, "off-chain metadata unavailable");
                OffChainMetadata::default()
            }
            Err(_) => {
                warn!(
                    %uri,
                    timeout_ms = OFF_CHAIN_FETCH_TIMEOUT.as_millis() as u64,
                    "off-chain metadata fetch timed out"
                );
                OffChainMetadata::default()
            }
        },
        None => OffChainMetadata::default(),
    };

    Ok(TokenMetadata {
        name: non_empty(&record.name).or_else(|| data.name.clone()),
        symbol: non_empty(&record.symbol).or_else(|| data.symbol.clone()),
        metadata_off_chain: OffChainLink {
            link: record.off_chain_uri.clone(),
            data,
        },
        on_chain: Some(record),
    })
}

/// Summarise a fungible mint, or `None` when it looks like an NFT.
#[instrument(skip(rpc, fetcher, mint), fields(mint = %bytes_to_address(mint)))]
pub async fn get_token_data(
    rpc: &dyn LedgerRpc,
    fetcher: &dyn MetadataFetcher,
    mint: &[u8; 32],
) -> ClientResult<Option<TokenSummary>> {
    let (state, program) = get_mint(rpc, mint).await?;

    if is_probable_nft(&state) {
        info!("mint looks like an NFT, no token summary");
        return Ok(None);
    }

    let created_at = earliest_signature_time(rpc, mint).await?;
    let metadata = get_token_metadata(rpc, fetcher, mint).await?;

    Ok(Some(TokenSummary {
        mint: bytes_to_address(mint),
        token_program: program.address(),
        decimals: state.decimals,
        supply: state.ui_supply(),
        supply_raw: state.supply,
        mint_authority_revoked: state.mint_authority_revoked(),
        freeze_authority_revoked: state.freeze_authority_revoked(),
        created_at,
        metadata,
    }))
}

/// Block time of the oldest signature reachable within
/// [`MAX_SIGNATURE_PAGES`] pages, or 0.
pub async fn earliest_signature_time(rpc: &dyn LedgerRpc, address: &[u8; 32]) -> ClientResult<i64> {
    let mut before: Option<String> = None;
    let mut oldest = None;

    for _ in 0..MAX_SIGNATURE_PAGES {
        let page = rpc
            .get_signatures_for_address(address, before.as_deref(), SIGNATURE_PAGE_LIMIT)
            .await?;

        if let Some(time) = page.iter().rev().find_map(|s| s.block_time) {
            oldest = Some(time);
        }

        match page.last() {
            Some(last) if page.len() >= SIGNATURE_PAGE_LIMIT => {
                before = Some(last.signature.clone());
            }
            _ => break,
        }
    }

    Ok(oldest.unwrap_or(0))
}
