//! Transaction submission with bounded retries, and confirmation with a
//! timeout guard.
//!
//! ```text
//! Pending -> Sent -> Confirmed
//!                 -> Failed
//!                 -> TimedOut
//!         -> RetryExhausted
//! ```
//!
//! A timeout only stops local waiting. The transaction may still land, so
//! callers must treat [`ClientError::ConfirmationTimeout`] as an unknown
//! outcome rather than a failure.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use chain_sol::{
    bytes_to_address, compile_transaction, transaction_signature, SolInstruction, SolKeypair,
};
use serde::Serialize;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, instrument, warn};

use crate::error::{ClientError, ClientResult};
use crate::rpc::{LatestBlockhash, LedgerRpc};
use crate::signer::WalletSigner;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_CONFIRM_TIMEOUT: Duration = Duration::from_secs(30);

/// Interval between signature status polls.
pub const POLL_INTERVAL: Duration = Duration::from_millis(500);

const BASE_RETRY_DELAY_MS: u64 = 1_000;
const MAX_RETRY_DELAY_MS: u64 = 30_000;

/// Wait before the attempt following `attempt`: `min(1000 * 2^(attempt-1), 30000)` ms.
pub fn retry_delay(attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(31);
    let ms = BASE_RETRY_DELAY_MS
        .saturating_mul(1u64 << exponent)
        .min(MAX_RETRY_DELAY_MS);
    Duration::from_millis(ms)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Pending,
    Succeeded,
    Failed(String),
}

/// One delivery attempt.
#[derive(Debug, Clone)]
pub struct SubmissionAttempt {
    pub attempt_number: u32,
    pub started_at: Instant,
    pub outcome: AttemptOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionState {
    Pending,
    Sent,
    Confirmed,
    Failed,
    TimedOut,
    RetryExhausted,
}

impl SubmissionState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SubmissionState::Pending | SubmissionState::Sent)
    }
}

impl fmt::Display for SubmissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SubmissionState::Pending => "pending",
            SubmissionState::Sent => "sent",
            SubmissionState::Confirmed => "confirmed",
            SubmissionState::Failed => "failed",
            SubmissionState::TimedOut => "timed_out",
            SubmissionState::RetryExhausted => "retry_exhausted",
        };
        f.write_str(name)
    }
}

/// Result of a successful [`submit_with_retry`].
#[derive(Debug, Clone)]
pub struct Submitted<T> {
    /// What the successful attempt returned (usually the signature).
    pub sent: T,
    pub attempts: Vec<SubmissionAttempt>,
}

/// Run `send` up to `max_attempts` times, backing off between transient
/// failures.
///
/// `send` receives the 1-based attempt number. Non-transient errors are
/// returned after the attempt that produced them; when every attempt
/// fails transiently the last error is returned. `max_attempts` of 0 is
/// treated as 1.
pub async fn submit_with_retry<T, F, Fut>(
    send: F,
    max_attempts: u32,
) -> ClientResult<Submitted<T>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = ClientResult<T>>,
{
    submit_with_retry_when(send, max_attempts, ClientError::is_transient).await
}

/// [`submit_with_retry`] with a caller-chosen retry classifier.
pub async fn submit_with_retry_when<T, F, Fut, R>(
    mut send: F,
    max_attempts: u32,
    retryable: R,
) -> ClientResult<Submitted<T>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = ClientResult<T>>,
    R: Fn(&ClientError) -> bool,
{
    let max_attempts = max_attempts.max(1);
    let mut attempts = Vec::new();
    let mut attempt_number = 1;

    loop {
        let mut attempt = SubmissionAttempt {
            attempt_number,
            started_at: Instant::now(),
            outcome: AttemptOutcome::Pending,
        };
        info!(attempt = attempt_number, max_attempts, "submitting transaction");

        match send(attempt_number).await {
            Ok(sent) => {
                attempt.outcome = AttemptOutcome::Succeeded;
                attempts.push(attempt);
                info!(attempt = attempt_number, state = %SubmissionState::Sent, "transaction sent");
                return Ok(Submitted { sent, attempts });
            }
            Err(err) => {
                attempt.outcome = AttemptOutcome::Failed(err.to_string());
                attempts.push(attempt);

                if !retryable(&err) {
                    warn!(attempt = attempt_number, error = %err, state = %SubmissionState::Failed, "submission rejected");
                    return Err(err);
                }
                if attempt_number >= max_attempts {
                    warn!(attempt = attempt_number, error = %err, state = %SubmissionState::RetryExhausted, "giving up");
                    return Err(err);
                }

                let delay = retry_delay(attempt_number);
                warn!(
                    attempt = attempt_number,
                    error = %err,
                    delay_ms = delay.as_millis() as u64,
                    "transient submission failure, retrying"
                );
                sleep(delay).await;
                attempt_number += 1;
            }
        }
    }
}

/// Payload of a confirmed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Confirmation {
    pub slot: u64,
    pub confirmation_status: String,
}

/// Poll until `signature` is confirmed, racing `timeout`.
///
/// Transient RPC errors during polling are logged and polling continues.
#[instrument(skip(rpc, block), fields(timeout_ms = timeout.as_millis() as u64))]
pub async fn confirm_with_timeout(
    rpc: &dyn LedgerRpc,
    signature: &str,
    block: &LatestBlockhash,
    timeout: Duration,
) -> ClientResult<Confirmation> {
    match tokio::time::timeout(timeout, poll_confirmation(rpc, signature, block)).await {
        Ok(result) => result,
        Err(_) => {
            warn!(state = %SubmissionState::TimedOut, "confirmation timed out, outcome unknown");
            Err(ClientError::ConfirmationTimeout {
                signature: signature.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            })
        }
    }
}

async fn poll_confirmation(
    rpc: &dyn LedgerRpc,
    signature: &str,
    block: &LatestBlockhash,
) -> ClientResult<Confirmation> {
    let signatures = [signature.to_string()];

    loop {
        match rpc.get_signature_statuses(&signatures).await {
            Ok(statuses) => {
                if let Some(status) = statuses.into_iter().next().flatten() {
                    if let Some(err) = &status.err {
                        warn!(state = %SubmissionState::Failed, error = %err, "transaction failed on chain");
                        return Err(ClientError::TransactionFailed {
                            signature: signature.to_string(),
                            details: err.to_string(),
                        });
                    }
                    if status.is_confirmed() {
                        let confirmation_status = status
                            .confirmation_status
                            .unwrap_or_else(|| "finalized".to_string());
                        info!(slot = status.slot, state = %SubmissionState::Confirmed, "transaction confirmed");
                        return Ok(Confirmation {
                            slot: status.slot,
                            confirmation_status,
                        });
                    }
                }

                match rpc.get_block_height().await {
                    Ok(height) if height > block.last_valid_block_height => {
                        warn!(height, last_valid = block.last_valid_block_height, "blockhash expired");
                        return Err(ClientError::BlockhashExpired {
                            signature: signature.to_string(),
                        });
                    }
                    Ok(_) => {}
                    Err(err) if err.is_transient() => {
                        debug!(error = %err, "block height poll failed");
                    }
                    Err(err) => return Err(err.into()),
                }
            }
            Err(err) if err.is_transient() => {
                warn!(error = %err, "status poll failed, will retry");
            }
            Err(err) => return Err(err.into()),
        }

        sleep(POLL_INTERVAL).await;
    }
}

/// Retry and timeout settings for [`send_and_confirm`].
#[derive(Debug, Clone, Copy)]
pub struct SubmitOptions {
    pub max_attempts: u32,
    pub confirm_timeout: Duration,
}

impl Default for SubmitOptions {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            confirm_timeout: DEFAULT_CONFIRM_TIMEOUT,
        }
    }
}

/// A confirmed transaction and the attempts it took.
#[derive(Debug, Clone)]
pub struct TransactionReceipt {
    pub signature: String,
    pub confirmation: Confirmation,
    pub attempts: Vec<SubmissionAttempt>,
}

/// Compile, sign, send (with retries) and confirm `instructions`.
///
/// The message is compiled against one blockhash and signed once; every
/// attempt re-sends the same wire bytes, so a retry after a lost response
/// can never land a second transaction. The signer pays fees; any
/// `co_signers` (for example a new mint account) sign alongside it.
#[instrument(skip_all, fields(payer = %bytes_to_address(&signer.pubkey()), instructions = instructions.len()))]
pub async fn send_and_confirm(
    rpc: &dyn LedgerRpc,
    signer: &dyn WalletSigner,
    instructions: &[SolInstruction],
    co_signers: &[&SolKeypair],
    options: &SubmitOptions,
) -> ClientResult<TransactionReceipt> {
    let fee_payer = signer.pubkey();
    debug!(state = %SubmissionState::Pending, "preparing transaction");

    let latest = rpc.get_latest_blockhash().await?;
    let tx = compile_transaction(instructions, &fee_payer, &latest.blockhash)?;
    let wire = signer.sign(&tx, co_signers).await?;
    let signature = transaction_signature(&wire)?;
    let wire = wire.as_slice();

    let submitted = submit_with_retry(
        |_attempt| async move { Ok::<_, ClientError>(rpc.send_transaction(wire).await?) },
        options.max_attempts,
    )
    .await?;

    if submitted.sent != signature {
        warn!(expected = %signature, returned = %submitted.sent, "node returned a different signature");
    }

    let confirmation =
        confirm_with_timeout(rpc, &signature, &latest, options.confirm_timeout).await?;

    Ok(TransactionReceipt {
        signature,
        confirmation,
        attempts: submitted.attempts,
    })
}
