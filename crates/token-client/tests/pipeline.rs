//! Cross-crate tests driving both pipelines through the public API with an
//! in-memory ledger: chain-sol encodings -> token-client pipelines.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chain_sol::{
    derive_metadata_address, Creator, MetadataAccount, MintAccount, SolKeypair, TokenProgram,
    METADATA_PROGRAM_ID,
};
use token_client::rpc::{AccountInfo, SignatureInfo, SignatureStatus};
use token_client::*;
use tokio::time::Instant;

// ─── Test doubles ──────────────────────────────────────────────────

#[derive(Default)]
struct Ledger {
    accounts: Mutex<HashMap<[u8; 32], AccountInfo>>,
    confirm_after_polls: Option<u32>,
    polls: AtomicU32,
}

impl Ledger {
    fn with_mint(mint: [u8; 32], decimals: u8, supply: u64) -> Self {
        let ledger = Self::default();
        let state = MintAccount {
            mint_authority: None,
            supply,
            decimals,
            is_initialized: true,
            freeze_authority: None,
        };
        ledger.put(mint, TokenProgram::Token.id(), state.pack().to_vec());
        ledger
    }

    fn put(&self, address: [u8; 32], owner: [u8; 32], data: Vec<u8>) {
        self.accounts.lock().unwrap().insert(
            address,
            AccountInfo {
                lamports: 1,
                owner,
                data,
                executable: false,
            },
        );
    }
}

#[async_trait]
impl LedgerRpc for Ledger {
    async fn get_account_info(&self, address: &[u8; 32]) -> RpcResult<Option<AccountInfo>> {
        Ok(self.accounts.lock().unwrap().get(address).cloned())
    }

    async fn get_parsed_token_accounts_by_owner(
        &self,
        _owner: &[u8; 32],
        _program: TokenProgram,
    ) -> RpcResult<Vec<ParsedTokenAccount>> {
        Ok(Vec::new())
    }

    async fn get_signatures_for_address(
        &self,
        _address: &[u8; 32],
        _before: Option<&str>,
        _limit: usize,
    ) -> RpcResult<Vec<SignatureInfo>> {
        Ok(vec![SignatureInfo {
            signature: "genesis".into(),
            slot: 1,
            block_time: Some(1_690_000_000),
            err: None,
        }])
    }

    async fn get_latest_blockhash(&self) -> RpcResult<LatestBlockhash> {
        Ok(LatestBlockhash {
            blockhash: [7u8; 32],
            last_valid_block_height: u64::MAX,
        })
    }

    async fn get_block_height(&self) -> RpcResult<u64> {
        Ok(0)
    }

    async fn get_signature_statuses(
        &self,
        signatures: &[String],
    ) -> RpcResult<Vec<Option<SignatureStatus>>> {
        let polls = self.polls.fetch_add(1, Ordering::SeqCst) + 1;
        let status = match self.confirm_after_polls {
            Some(n) if polls >= n => Some(SignatureStatus {
                slot: 99,
                confirmations: None,
                err: None,
                confirmation_status: Some("finalized".into()),
            }),
            _ => None,
        };
        Ok(vec![status; signatures.len()])
    }

    async fn send_transaction(&self, wire: &[u8]) -> RpcResult<String> {
        chain_sol::transaction_signature(wire).map_err(|e| RpcError::Decode(e.to_string()))
    }

    async fn request_airdrop(&self, _address: &[u8; 32], _lamports: u64) -> RpcResult<String> {
        Ok("airdrop".into())
    }

    async fn get_balance(&self, _address: &[u8; 32]) -> RpcResult<u64> {
        Ok(0)
    }

    async fn get_minimum_balance_for_rent_exemption(&self, _data_len: usize) -> RpcResult<u64> {
        Ok(1_461_600)
    }
}

/// Never answers within the test's patience.
struct SlowFetcher;

#[async_trait]
impl MetadataFetcher for SlowFetcher {
    async fn fetch(&self, uri: &str) -> ClientResult<OffChainMetadata> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Err(ClientError::Rpc(RpcError::Network(format!("timed out: {uri}"))))
    }
}

struct StaticFetcher(OffChainMetadata);

#[async_trait]
impl MetadataFetcher for StaticFetcher {
    async fn fetch(&self, _uri: &str) -> ClientResult<OffChainMetadata> {
        Ok(self.0.clone())
    }
}

const MINT: [u8; 32] = [0xAB; 32];

fn put_metadata(ledger: &Ledger, uri: &str) {
    let record = MetadataAccount {
        update_authority: [1u8; 32],
        mint: MINT,
        name: "Pipeline Token".into(),
        symbol: "PIPE".into(),
        uri: uri.into(),
        seller_fee_basis_points: 0,
        creators: Some(vec![Creator {
            address: [1u8; 32],
            verified: false,
            share: 100,
        }]),
        primary_sale_happened: false,
        is_mutable: false,
    };
    ledger.put(
        derive_metadata_address(&MINT).unwrap(),
        METADATA_PROGRAM_ID,
        record.pack(),
    );
}

// ─── Metadata aggregation ──────────────────────────────────────────

#[tokio::test]
async fn six_decimal_mint_reports_human_supply() {
    let ledger = Ledger::with_mint(MINT, 6, 5_000_000);
    let summary = get_token_data(&ledger, &SlowFetcher, &MINT)
        .await
        .unwrap()
        .expect("fungible mint");

    assert_eq!(summary.supply, 5.0);
    assert!(summary.mint_authority_revoked);
    assert!(summary.freeze_authority_revoked);
    assert_eq!(summary.created_at, 1_690_000_000);
    assert_eq!(summary.token_program, TokenProgram::Token.address());
}

#[tokio::test]
async fn single_indivisible_mint_is_treated_as_nft() {
    let ledger = Ledger::with_mint(MINT, 0, 1);
    assert!(get_token_data(&ledger, &SlowFetcher, &MINT).await.unwrap().is_none());
}

#[tokio::test]
async fn absent_metadata_returns_null_shell() {
    let ledger = Ledger::with_mint(MINT, 6, 1);
    let metadata = get_token_metadata(&ledger, &SlowFetcher, &MINT).await.unwrap();

    let json = serde_json::to_value(&metadata).unwrap();
    assert!(json["name"].is_null());
    assert!(json["symbol"].is_null());
    assert!(json["metadataOffChain"]["link"].is_null());
    for field in ["name", "symbol", "description", "image", "attributes"] {
        assert!(json["metadataOffChain"]["data"][field].is_null(), "{field}");
    }
}

#[tokio::test(start_paused = true)]
async fn stalled_off_chain_store_never_hides_on_chain_fields() {
    let ledger = Ledger::with_mint(MINT, 6, 1);
    put_metadata(&ledger, "ipfs://bafyslow");
    let start = Instant::now();

    let metadata = get_token_metadata(&ledger, &SlowFetcher, &MINT).await.unwrap();

    assert_eq!(start.elapsed(), token_client::metadata::OFF_CHAIN_FETCH_TIMEOUT);
    assert_eq!(metadata.name.as_deref(), Some("Pipeline Token"));
    assert_eq!(metadata.symbol.as_deref(), Some("PIPE"));
    assert_eq!(metadata.metadata_off_chain.link.as_deref(), Some("ipfs://bafyslow"));
    assert_eq!(metadata.metadata_off_chain.data, OffChainMetadata::default());
    assert!(!metadata.on_chain.unwrap().is_mutable);
}

#[tokio::test]
async fn off_chain_fields_fill_in_blank_on_chain_names() {
    let ledger = Ledger::with_mint(MINT, 6, 1);
    let record = MetadataAccount {
        update_authority: [1u8; 32],
        mint: MINT,
        name: String::new(),
        symbol: String::new(),
        uri: "https://example.com/meta.json".into(),
        seller_fee_basis_points: 0,
        creators: None,
        primary_sale_happened: false,
        is_mutable: true,
    };
    ledger.put(
        derive_metadata_address(&MINT).unwrap(),
        METADATA_PROGRAM_ID,
        record.pack(),
    );

    let fetcher = StaticFetcher(OffChainMetadata {
        name: Some("From JSON".into()),
        symbol: Some("JSN".into()),
        ..Default::default()
    });
    let metadata = get_token_metadata(&ledger, &fetcher, &MINT).await.unwrap();
    assert_eq!(metadata.name.as_deref(), Some("From JSON"));
    assert_eq!(metadata.symbol.as_deref(), Some("JSN"));
}

// ─── Submission ────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn one_503_then_success_waits_one_second() {
    let calls = AtomicU32::new(0);
    let start = Instant::now();

    let submitted = submit_with_retry(
        |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                match attempt {
                    1 => Err(ClientError::Rpc(RpcError::Http { status: 503 })),
                    n => Ok(format!("signature-from-attempt-{n}")),
                }
            }
        },
        3,
    )
    .await
    .unwrap();

    assert_eq!(submitted.sent, "signature-from-attempt-2");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(start.elapsed(), Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn transfer_confirms_end_to_end() {
    let ledger = Ledger {
        confirm_after_polls: Some(3),
        ..Default::default()
    };
    let signer = KeypairSigner::new(SolKeypair::generate());

    let request = TransferRequest {
        sender: signer.pubkey(),
        recipient: SolKeypair::generate().pubkey(),
        amount: 42,
    };
    let receipt = transfer_sol(&ledger, &signer, &request, &SubmitOptions::default())
        .await
        .unwrap();

    assert_eq!(receipt.confirmation.slot, 99);
    assert_eq!(receipt.confirmation.confirmation_status, "finalized");
    assert_eq!(ledger.polls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn unconfirmed_transfer_times_out_with_unknown_outcome() {
    let ledger = Ledger::default();
    let signer = KeypairSigner::new(SolKeypair::generate());
    let options = SubmitOptions {
        max_attempts: 3,
        confirm_timeout: Duration::from_secs(5),
    };

    let request = TransferRequest {
        sender: signer.pubkey(),
        recipient: [9u8; 32],
        amount: 1,
    };
    let err = transfer_sol(&ledger, &signer, &request, &options)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ClientError::ConfirmationTimeout { timeout_ms: 5_000, .. }
    ));
}

#[tokio::test(start_paused = true)]
async fn create_token_reports_derived_addresses() {
    let ledger = Ledger {
        confirm_after_polls: Some(1),
        ..Default::default()
    };
    let signer = KeypairSigner::new(SolKeypair::generate());
    let mint = SolKeypair::generate();

    let params = CreateTokenParams::fungible("Quick", "QTG", "", 9, 1_000_000_000);
    let created = create_token(&ledger, &signer, &mint, &params, &SubmitOptions::default())
        .await
        .unwrap();

    assert_eq!(created.mint, mint.address());
    assert_eq!(
        created.metadata_address,
        chain_sol::bytes_to_address(&derive_metadata_address(&mint.pubkey()).unwrap())
    );
}
