//! Ledger RPC capability and its JSON-RPC 2.0 implementation.
//!
//! Pipelines depend on the [`LedgerRpc`] trait only; [`HttpRpcClient`] is
//! the production implementation. Account data is requested `base64`
//! encoded and transactions are submitted `base64` encoded.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chain_sol::{address_to_bytes, bytes_to_address, MintAccount, TokenProgram};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, instrument};

use crate::error::{ClientError, ClientResult, RpcError, RpcResult};

const DEFAULT_COMMITMENT: &str = "confirmed";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Raw account state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountInfo {
    pub lamports: u64,
    pub owner: [u8; 32],
    pub data: Vec<u8>,
    pub executable: bool,
}

/// A token account as returned by `getParsedTokenAccountsByOwner`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedTokenAccount {
    pub address: String,
    pub mint: String,
    pub owner: String,
    /// Raw amount in base units.
    pub amount: u64,
    pub decimals: u8,
    pub ui_amount: f64,
    pub token_program: String,
}

/// One entry of `getSignaturesForAddress`, newest first.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureInfo {
    pub signature: String,
    pub slot: u64,
    #[serde(default)]
    pub block_time: Option<i64>,
    #[serde(default)]
    pub err: Option<Value>,
}

/// Blockhash plus the last block height at which it is still accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatestBlockhash {
    pub blockhash: [u8; 32],
    pub last_valid_block_height: u64,
}

/// Status of a submitted transaction.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureStatus {
    pub slot: u64,
    #[serde(default)]
    pub confirmations: Option<u64>,
    #[serde(default)]
    pub err: Option<Value>,
    #[serde(default)]
    pub confirmation_status: Option<String>,
}

impl SignatureStatus {
    /// Confirmed or finalized. Nodes that omit `confirmationStatus` report
    /// rooted transactions with `confirmations: null`.
    pub fn is_confirmed(&self) -> bool {
        match self.confirmation_status.as_deref() {
            Some("confirmed") | Some("finalized") => true,
            Some(_) => false,
            None => self.confirmations.is_none(),
        }
    }
}

/// The ledger surface the pipelines call.
#[async_trait]
pub trait LedgerRpc: Send + Sync {
    /// `None` when the account does not exist.
    async fn get_account_info(&self, address: &[u8; 32]) -> RpcResult<Option<AccountInfo>>;

    async fn get_parsed_token_accounts_by_owner(
        &self,
        owner: &[u8; 32],
        program: TokenProgram,
    ) -> RpcResult<Vec<ParsedTokenAccount>>;

    async fn get_signatures_for_address(
        &self,
        address: &[u8; 32],
        before: Option<&str>,
        limit: usize,
    ) -> RpcResult<Vec<SignatureInfo>>;

    async fn get_latest_blockhash(&self) -> RpcResult<LatestBlockhash>;

    async fn get_block_height(&self) -> RpcResult<u64>;

    /// One entry per requested signature, `None` when the node has not seen it.
    async fn get_signature_statuses(
        &self,
        signatures: &[String],
    ) -> RpcResult<Vec<Option<SignatureStatus>>>;

    /// Submit a signed wire transaction, returning its signature.
    async fn send_transaction(&self, wire: &[u8]) -> RpcResult<String>;

    async fn request_airdrop(&self, address: &[u8; 32], lamports: u64) -> RpcResult<String>;

    async fn get_balance(&self, address: &[u8; 32]) -> RpcResult<u64>;

    async fn get_minimum_balance_for_rent_exemption(&self, data_len: usize) -> RpcResult<u64>;
}

/// Fetch and decode a mint, reporting which token program owns it.
pub async fn get_mint(
    rpc: &dyn LedgerRpc,
    mint: &[u8; 32],
) -> ClientResult<(MintAccount, TokenProgram)> {
    let account = rpc
        .get_account_info(mint)
        .await?
        .ok_or_else(|| ClientError::AccountNotFound(bytes_to_address(mint)))?;

    let program = TokenProgram::from_owner(&account.owner).ok_or_else(|| {
        ClientError::InvalidInput(format!(
            "{} is owned by {}, not a token program",
            bytes_to_address(mint),
            bytes_to_address(&account.owner)
        ))
    })?;

    Ok((MintAccount::unpack(&account.data)?, program))
}

// ---------------------------------------------------------------------------
// JSON-RPC wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct WithContext<T> {
    value: T,
}

#[derive(Debug, Deserialize)]
struct UiAccount {
    lamports: u64,
    owner: String,
    /// `[payload, encoding]`
    data: (String, String),
    #[serde(default)]
    executable: bool,
}

impl UiAccount {
    fn decode(self) -> RpcResult<AccountInfo> {
        let (payload, encoding) = self.data;
        if encoding != "base64" {
            return Err(RpcError::Decode(format!(
                "unexpected account encoding {encoding}"
            )));
        }
        let data = BASE64
            .decode(payload.as_bytes())
            .map_err(|e| RpcError::Decode(format!("account data: {e}")))?;
        let owner = address_to_bytes(&self.owner)
            .map_err(|e| RpcError::Decode(format!("account owner: {e}")))?;

        Ok(AccountInfo {
            lamports: self.lamports,
            owner,
            data,
            executable: self.executable,
        })
    }
}

#[derive(Debug, Deserialize)]
struct KeyedParsedAccount {
    pubkey: String,
    account: ParsedAccountEnvelope,
}

#[derive(Debug, Deserialize)]
struct ParsedAccountEnvelope {
    data: ParsedData,
}

#[derive(Debug, Deserialize)]
struct ParsedData {
    parsed: ParsedTokenInfo,
}

#[derive(Debug, Deserialize)]
struct ParsedTokenInfo {
    info: TokenAccountInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenAccountInfo {
    mint: String,
    owner: String,
    token_amount: UiTokenAmount,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UiTokenAmount {
    amount: String,
    decimals: u8,
    #[serde(default)]
    ui_amount: Option<f64>,
}

fn parse_token_accounts(
    accounts: Vec<KeyedParsedAccount>,
    program: TokenProgram,
) -> RpcResult<Vec<ParsedTokenAccount>> {
    accounts
        .into_iter()
        .map(|keyed| {
            let info = keyed.account.data.parsed.info;
            let amount: u64 = info.token_amount.amount.parse().map_err(|_| {
                RpcError::Decode(format!(
                    "token amount '{}' is not an integer",
                    info.token_amount.amount
                ))
            })?;
            let decimals = info.token_amount.decimals;
            Ok(ParsedTokenAccount {
                address: keyed.pubkey,
                mint: info.mint,
                owner: info.owner,
                amount,
                decimals,
                ui_amount: info
                    .token_amount
                    .ui_amount
                    .unwrap_or_else(|| chain_sol::ui_amount(amount, decimals)),
                token_program: program.address(),
            })
        })
        .collect()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UiBlockhash {
    blockhash: String,
    last_valid_block_height: u64,
}

// ---------------------------------------------------------------------------
// HTTP client
// ---------------------------------------------------------------------------

/// JSON-RPC client over HTTP.
pub struct HttpRpcClient {
    http: reqwest::Client,
    url: String,
    commitment: String,
    next_id: AtomicU64,
}

impl HttpRpcClient {
    pub fn new(url: impl Into<String>) -> RpcResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            url: url.into(),
            commitment: DEFAULT_COMMITMENT.to_string(),
            next_id: AtomicU64::new(1),
        })
    }

    /// Override the commitment level used for reads (default `confirmed`).
    pub fn with_commitment(mut self, commitment: impl Into<String>) -> Self {
        self.commitment = commitment.into();
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> RpcResult<T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        debug!(method, id, "rpc request");
        let response = self.http.post(&self.url).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RpcError::Http {
                status: status.as_u16(),
            });
        }

        let envelope: RpcResponse<T> = response.json().await?;
        if let Some(err) = envelope.error {
            return Err(RpcError::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        envelope.result.ok_or(RpcError::NoResponse)
    }

    fn commitment(&self) -> Value {
        json!({ "commitment": self.commitment })
    }
}

fn decode_blockhash(s: &str) -> RpcResult<[u8; 32]> {
    address_to_bytes(s).map_err(|e| RpcError::Decode(format!("blockhash: {e}")))
}

#[async_trait]
impl LedgerRpc for HttpRpcClient {
    #[instrument(skip(self, address), fields(address = %bytes_to_address(address)))]
    async fn get_account_info(&self, address: &[u8; 32]) -> RpcResult<Option<AccountInfo>> {
        let params = json!([
            bytes_to_address(address),
            { "encoding": "base64", "commitment": self.commitment },
        ]);
        let response: WithContext<Option<UiAccount>> =
            self.call("getAccountInfo", params).await?;
        response.value.map(UiAccount::decode).transpose()
    }

    async fn get_parsed_token_accounts_by_owner(
        &self,
        owner: &[u8; 32],
        program: TokenProgram,
    ) -> RpcResult<Vec<ParsedTokenAccount>> {
        let params = json!([
            bytes_to_address(owner),
            { "programId": program.address() },
            { "encoding": "jsonParsed", "commitment": self.commitment },
        ]);
        let response: WithContext<Vec<KeyedParsedAccount>> =
            self.call("getParsedTokenAccountsByOwner", params).await?;
        parse_token_accounts(response.value, program)
    }

    async fn get_signatures_for_address(
        &self,
        address: &[u8; 32],
        before: Option<&str>,
        limit: usize,
    ) -> RpcResult<Vec<SignatureInfo>> {
        let mut config = json!({ "limit": limit, "commitment": self.commitment });
        if let Some(before) = before {
            config["before"] = Value::String(before.to_string());
        }
        self.call(
            "getSignaturesForAddress",
            json!([bytes_to_address(address), config]),
        )
        .await
    }

    async fn get_latest_blockhash(&self) -> RpcResult<LatestBlockhash> {
        let response: WithContext<UiBlockhash> = self
            .call("getLatestBlockhash", json!([self.commitment()]))
            .await?;
        Ok(LatestBlockhash {
            blockhash: decode_blockhash(&response.value.blockhash)?,
            last_valid_block_height: response.value.last_valid_block_height,
        })
    }

    async fn get_block_height(&self) -> RpcResult<u64> {
        self.call("getBlockHeight", json!([self.commitment()])).await
    }

    async fn get_signature_statuses(
        &self,
        signatures: &[String],
    ) -> RpcResult<Vec<Option<SignatureStatus>>> {
        let response: WithContext<Vec<Option<SignatureStatus>>> = self
            .call(
                "getSignatureStatuses",
                json!([signatures, { "searchTransactionHistory": false }]),
            )
            .await?;
        Ok(response.value)
    }

    #[instrument(skip(self, wire), fields(len = wire.len()))]
    async fn send_transaction(&self, wire: &[u8]) -> RpcResult<String> {
        let params = json!([
            BASE64.encode(wire),
            {
                "encoding": "base64",
                "skipPreflight": false,
                "preflightCommitment": self.commitment,
            },
        ]);
        self.call("sendTransaction", params).await
    }

    async fn request_airdrop(&self, address: &[u8; 32], lamports: u64) -> RpcResult<String> {
        self.call(
            "requestAirdrop",
            json!([bytes_to_address(address), lamports, self.commitment()]),
        )
        .await
    }

    async fn get_balance(&self, address: &[u8; 32]) -> RpcResult<u64> {
        let response: WithContext<u64> = self
            .call(
                "getBalance",
                json!([bytes_to_address(address), self.commitment()]),
            )
            .await?;
        Ok(response.value)
    }

    async fn get_minimum_balance_for_rent_exemption(&self, data_len: usize) -> RpcResult<u64> {
        self.call("getMinimumBalanceForRentExemption", json!([data_len]))
            .await
    }
}
