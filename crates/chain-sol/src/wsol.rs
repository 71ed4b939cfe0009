//! Wrapped SOL: native lamports held in an SPL token account of the
//! native mint.

use crate::error::SolError;
use crate::spl_token::{
    close_account, create_associated_token_account_idempotent, derive_associated_token_address,
    sync_native, TokenProgram,
};
use crate::system;
use crate::transaction::SolInstruction;

/// The native mint: `So11111111111111111111111111111111111111112`
pub const NATIVE_MINT: [u8; 32] = [
    0x06, 0x9b, 0x88, 0x57, 0xfe, 0xab, 0x81, 0x84, 0xfb, 0x68, 0x7f, 0x63, 0x46, 0x18, 0xc0,
    0x35, 0xda, 0xc4, 0x39, 0xdc, 0x1a, 0xeb, 0x3b, 0x55, 0x98, 0xa0, 0xf0, 0x00, 0x00, 0x00,
    0x00, 0x01,
];

/// The owner's wrapped-SOL associated token account.
pub fn native_token_account(owner: &[u8; 32]) -> Result<[u8; 32], SolError> {
    derive_associated_token_address(owner, &NATIVE_MINT, TokenProgram::Token)
}

/// Instructions that move `lamports` into the owner's wrapped-SOL account.
///
/// Creates the account if needed, funds it and syncs the token balance.
pub fn wrap_instructions(owner: &[u8; 32], lamports: u64) -> Result<Vec<SolInstruction>, SolError> {
    if lamports == 0 {
        return Err(SolError::TransactionBuildError(
            "wrap amount must be > 0".into(),
        ));
    }

    let ata = native_token_account(owner)?;
    Ok(vec![
        create_associated_token_account_idempotent(owner, owner, &NATIVE_MINT, TokenProgram::Token)?,
        system::transfer(owner, &ata, lamports),
        sync_native(&ata, TokenProgram::Token),
    ])
}

/// Close the owner's wrapped-SOL account, returning every lamport to the owner.
pub fn unwrap_instructions(owner: &[u8; 32]) -> Result<Vec<SolInstruction>, SolError> {
    let ata = native_token_account(owner)?;
    Ok(vec![close_account(&ata, owner, owner, TokenProgram::Token)])
}
