//! SOL and SPL token transfers, wrapped SOL and airdrops.

use chain_sol::spl_token::{create_associated_token_account_idempotent, transfer_checked};
use chain_sol::{bytes_to_address, derive_associated_token_address, system, wsol};
use tracing::{info, instrument};

use crate::error::{ClientError, ClientResult};
use crate::rpc::{get_mint, LedgerRpc};
use crate::signer::WalletSigner;
use crate::submission::{
    confirm_with_timeout, send_and_confirm, submit_with_retry_when, SubmitOptions,
    TransactionReceipt,
};

/// A native transfer. `amount` is in lamports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferRequest {
    pub sender: [u8; 32],
    pub recipient: [u8; 32],
    pub amount: u64,
}

/// An SPL token transfer. `amount` is in the mint's base units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenTransferRequest {
    pub sender: [u8; 32],
    pub recipient: [u8; 32],
    pub mint: [u8; 32],
    pub amount: u64,
}

fn check_sender(signer: &dyn WalletSigner, sender: &[u8; 32]) -> ClientResult<()> {
    if signer.pubkey() != *sender {
        return Err(ClientError::InvalidInput(format!(
            "sender {} is not the connected wallet {}",
            bytes_to_address(sender),
            bytes_to_address(&signer.pubkey())
        )));
    }
    Ok(())
}

fn check_amount(amount: u64) -> ClientResult<()> {
    if amount == 0 {
        return Err(ClientError::InvalidInput("amount must be greater than zero".into()));
    }
    Ok(())
}

#[instrument(skip_all, fields(to = %bytes_to_address(&request.recipient), lamports = request.amount))]
pub async fn transfer_sol(
    rpc: &dyn LedgerRpc,
    signer: &dyn WalletSigner,
    request: &TransferRequest,
    options: &SubmitOptions,
) -> ClientResult<TransactionReceipt> {
    check_sender(signer, &request.sender)?;
    check_amount(request.amount)?;

    let ix = system::transfer(&request.sender, &request.recipient, request.amount);
    send_and_confirm(rpc, signer, &[ix], &[], options).await
}

/// Transfer tokens between associated token accounts, creating the
/// recipient's account when it does not exist.
#[instrument(skip_all, fields(mint = %bytes_to_address(&request.mint), amount = request.amount))]
pub async fn transfer_tokens(
    rpc: &dyn LedgerRpc,
    signer: &dyn WalletSigner,
    request: &TokenTransferRequest,
    options: &SubmitOptions,
) -> ClientResult<TransactionReceipt> {
    check_sender(signer, &request.sender)?;
    check_amount(request.amount)?;

    let (mint, program) = get_mint(rpc, &request.mint).await?;
    let source = derive_associated_token_address(&request.sender, &request.mint, program)?;
    let destination = derive_associated_token_address(&request.recipient, &request.mint, program)?;

    let instructions = vec![
        create_associated_token_account_idempotent(
            &request.sender,
            &request.recipient,
            &request.mint,
            program,
        )?,
        transfer_checked(
            &source,
            &request.mint,
            &destination,
            &request.sender,
            request.amount,
            mint.decimals,
            program,
        )?,
    ];

    send_and_confirm(rpc, signer, &instructions, &[], options).await
}

/// Move `lamports` into the signer's wrapped-SOL account.
#[instrument(skip_all, fields(lamports = lamports))]
pub async fn wrap_sol(
    rpc: &dyn LedgerRpc,
    signer: &dyn WalletSigner,
    lamports: u64,
    options: &SubmitOptions,
) -> ClientResult<TransactionReceipt> {
    check_amount(lamports)?;
    let instructions = wsol::wrap_instructions(&signer.pubkey(), lamports)?;
    send_and_confirm(rpc, signer, &instructions, &[], options).await
}

/// Close the signer's wrapped-SOL account, returning its lamports.
#[instrument(skip_all)]
pub async fn unwrap_sol(
    rpc: &dyn LedgerRpc,
    signer: &dyn WalletSigner,
    options: &SubmitOptions,
) -> ClientResult<TransactionReceipt> {
    let owner = signer.pubkey();
    let account = wsol::native_token_account(&owner)?;
    if rpc.get_account_info(&account).await?.is_none() {
        return Err(ClientError::AccountNotFound(format!(
            "wrapped SOL account {}",
            bytes_to_address(&account)
        )));
    }

    let instructions = wsol::unwrap_instructions(&owner)?;
    send_and_confirm(rpc, signer, &instructions, &[], options).await
}

/// Request devnet/testnet lamports and wait for them to land.
///
/// Airdrop requests are not idempotent: a lost response may still have
/// been honoured. They are therefore retried only on HTTP 5xx answers;
/// network faults and missing responses are returned after one attempt.
#[instrument(skip_all, fields(address = %bytes_to_address(address), lamports = lamports))]
pub async fn request_airdrop(
    rpc: &dyn LedgerRpc,
    address: &[u8; 32],
    lamports: u64,
    options: &SubmitOptions,
) -> ClientResult<TransactionReceipt> {
    check_amount(lamports)?;

    let latest = rpc.get_latest_blockhash().await?;
    let submitted = submit_with_retry_when(
        |_| async move { Ok::<_, ClientError>(rpc.request_airdrop(address, lamports).await?) },
        options.max_attempts,
        ClientError::is_server_error,
    )
    .await?;

    let signature = submitted.sent;
    let confirmation =
        confirm_with_timeout(rpc, &signature, &latest, options.confirm_timeout).await?;
    info!(%signature, "airdrop confirmed");

    Ok(TransactionReceipt {
        signature,
        confirmation,
        attempts: submitted.attempts,
    })
}
