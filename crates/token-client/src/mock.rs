//! In-memory ledger and fetcher doubles for unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chain_sol::{MintAccount, TokenProgram};

use crate::error::{ClientError, ClientResult, RpcError, RpcResult};
use crate::offchain::{MetadataFetcher, OffChainMetadata};
use crate::rpc::{
    AccountInfo, LatestBlockhash, LedgerRpc, ParsedTokenAccount, SignatureInfo, SignatureStatus,
};

pub const BLOCKHASH: [u8; 32] = [0xB1; 32];
pub const LAST_VALID_HEIGHT: u64 = 1_000;

#[derive(Default)]
pub struct MockLedger {
    pub accounts: Mutex<HashMap<[u8; 32], AccountInfo>>,
    pub token_accounts: Mutex<HashMap<TokenProgram, Vec<ParsedTokenAccount>>>,
    /// Signatures for the single queried address, newest first.
    pub signatures: Mutex<Vec<SignatureInfo>>,
    /// Popped per `get_signature_statuses` call; empty means "not seen yet".
    pub statuses: Mutex<VecDeque<RpcResult<Option<SignatureStatus>>>>,
    /// Popped per `send_transaction` call; empty means success.
    pub send_results: Mutex<VecDeque<RpcResult<String>>>,
    pub sent: Mutex<Vec<Vec<u8>>>,
    /// Popped per `request_airdrop` call; empty means success.
    pub airdrop_results: Mutex<VecDeque<RpcResult<String>>>,
    pub airdrop_calls: AtomicUsize,
    pub block_height: AtomicU64,
    /// Hand out a different blockhash on every `get_latest_blockhash` call.
    pub rotate_blockhash: bool,
    pub blockhash_calls: AtomicUsize,
    pub status_calls: AtomicUsize,
    pub signature_calls: AtomicUsize,
}

impl MockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_account(&self, address: [u8; 32], owner: [u8; 32], data: Vec<u8>) {
        self.accounts.lock().unwrap().insert(
            address,
            AccountInfo {
                lamports: 1_000_000,
                owner,
                data,
                executable: false,
            },
        );
    }

    pub fn insert_mint(&self, address: [u8; 32], decimals: u8, supply: u64) {
        let mint = MintAccount {
            mint_authority: Some([9u8; 32]),
            supply,
            decimals,
            is_initialized: true,
            freeze_authority: None,
        };
        self.insert_account(address, TokenProgram::Token.id(), mint.pack().to_vec());
    }

    pub fn push_status(&self, status: RpcResult<Option<SignatureStatus>>) {
        self.statuses.lock().unwrap().push_back(status);
    }

    pub fn confirmed(slot: u64) -> SignatureStatus {
        SignatureStatus {
            slot,
            confirmations: Some(1),
            err: None,
            confirmation_status: Some("confirmed".into()),
        }
    }
}

#[async_trait]
impl LedgerRpc for MockLedger {
    async fn get_account_info(&self, address: &[u8; 32]) -> RpcResult<Option<AccountInfo>> {
        Ok(self.accounts.lock().unwrap().get(address).cloned())
    }

    async fn get_parsed_token_accounts_by_owner(
        &self,
        _owner: &[u8; 32],
        program: TokenProgram,
    ) -> RpcResult<Vec<ParsedTokenAccount>> {
        Ok(self
            .token_accounts
            .lock()
            .unwrap()
            .get(&program)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_signatures_for_address(
        &self,
        _address: &[u8; 32],
        before: Option<&str>,
        limit: usize,
    ) -> RpcResult<Vec<SignatureInfo>> {
        self.signature_calls.fetch_add(1, Ordering::SeqCst);
        let all = self.signatures.lock().unwrap();
        let start = match before {
            Some(before) => all
                .iter()
                .position(|s| s.signature == before)
                .map(|i| i + 1)
                .unwrap_or(all.len()),
            None => 0,
        };
        Ok(all.iter().skip(start).take(limit).cloned().collect())
    }

    async fn get_latest_blockhash(&self) -> RpcResult<LatestBlockhash> {
        let call = self.blockhash_calls.fetch_add(1, Ordering::SeqCst);
        let mut blockhash = BLOCKHASH;
        if self.rotate_blockhash {
            blockhash[0] = blockhash[0].wrapping_add(call as u8);
        }
        Ok(LatestBlockhash {
            blockhash,
            last_valid_block_height: LAST_VALID_HEIGHT,
        })
    }

    async fn get_block_height(&self) -> RpcResult<u64> {
        Ok(self.block_height.load(Ordering::SeqCst))
    }

    async fn get_signature_statuses(
        &self,
        signatures: &[String],
    ) -> RpcResult<Vec<Option<SignatureStatus>>> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let next = self.statuses.lock().unwrap().pop_front();
        match next {
            Some(Ok(status)) => Ok(vec![status; signatures.len()]),
            Some(Err(err)) => Err(err),
            None => Ok(vec![None; signatures.len()]),
        }
    }

    async fn send_transaction(&self, wire: &[u8]) -> RpcResult<String> {
        self.sent.lock().unwrap().push(wire.to_vec());
        let next = self.send_results.lock().unwrap().pop_front();
        match next {
            Some(result) => result,
            None => chain_sol::transaction_signature(wire)
                .map_err(|e| RpcError::Decode(e.to_string())),
        }
    }

    async fn request_airdrop(&self, _address: &[u8; 32], lamports: u64) -> RpcResult<String> {
        self.airdrop_calls.fetch_add(1, Ordering::SeqCst);
        let next = self.airdrop_results.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(format!("airdrop-{lamports}")))
    }

    async fn get_balance(&self, address: &[u8; 32]) -> RpcResult<u64> {
        Ok(self
            .accounts
            .lock()
            .unwrap()
            .get(address)
            .map(|a| a.lamports)
            .unwrap_or(0))
    }

    async fn get_minimum_balance_for_rent_exemption(&self, data_len: usize) -> RpcResult<u64> {
        Ok((data_len as u64 + 128) * 6_960)
    }
}

/// Fetcher returning canned documents keyed by URI; unknown URIs fail.
#[derive(Default)]
pub struct MockFetcher {
    pub documents: HashMap<String, OffChainMetadata>,
    pub calls: AtomicUsize,
}

#[async_trait]
impl MetadataFetcher for MockFetcher {
    async fn fetch(&self, uri: &str) -> ClientResult<OffChainMetadata> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.documents
            .get(uri)
            .cloned()
            .ok_or_else(|| ClientError::Rpc(RpcError::Network(format!("unreachable: {uri}"))))
    }
}
