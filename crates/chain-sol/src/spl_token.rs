//! SPL Token, Token-2022 and Associated Token Account instructions.
//!
//! Both token programs share the same instruction encoding for everything
//! used here, so builders take a [`TokenProgram`] and only swap the program
//! id. Associated token accounts are PDAs of the ATA program seeded with
//! `[wallet, token_program_id, mint]`.

use crate::address::{bytes_to_address, find_program_address};
use crate::error::SolError;
use crate::system::SYSTEM_PROGRAM_ID;
use crate::transaction::{SolAccountMeta, SolInstruction};

// ---------------------------------------------------------------------------
// Well-known program IDs
// ---------------------------------------------------------------------------

/// SPL Token Program ID: `TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA`
pub const TOKEN_PROGRAM_ID: [u8; 32] = [
    0x06, 0xdd, 0xf6, 0xe1, 0xd7, 0x65, 0xa1, 0x93, 0xd9, 0xcb, 0xe1, 0x46, 0xce, 0xeb, 0x79,
    0xac, 0x1c, 0xb4, 0x85, 0xed, 0x5f, 0x5b, 0x37, 0x91, 0x3a, 0x8c, 0xf5, 0x85, 0x7e, 0xff,
    0x00, 0xa9,
];

/// Token-2022 Program ID: `TokenzQdBNbLqP5VEhdkAS6EPFLC1PHnBqCXEpPxuEb`
pub const TOKEN_2022_PROGRAM_ID: [u8; 32] = [
    0x06, 0xdd, 0xf6, 0xe1, 0xee, 0x75, 0x8f, 0xde, 0x18, 0x42, 0x5d, 0xbc, 0xe4, 0x6c, 0xcd,
    0xda, 0xb6, 0x1a, 0xfc, 0x4d, 0x83, 0xb9, 0x0d, 0x27, 0xfe, 0xbd, 0xf9, 0x28, 0xd8, 0xa1,
    0x8b, 0xfc,
];

/// Associated Token Account Program ID: `ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL`
pub const ASSOCIATED_TOKEN_PROGRAM_ID: [u8; 32] = [
    0x8c, 0x97, 0x25, 0x8f, 0x4e, 0x24, 0x89, 0xf1, 0xbb, 0x3d, 0x10, 0x29, 0x14, 0x8e, 0x0d,
    0x83, 0x0b, 0x5a, 0x13, 0x99, 0xda, 0xff, 0x10, 0x84, 0x04, 0x8e, 0x7b, 0xd8, 0xdb, 0xe9,
    0xf8, 0x59,
];

// Instruction tags shared by Token and Token-2022.
const IX_SET_AUTHORITY: u8 = 6;
const IX_MINT_TO: u8 = 7;
const IX_CLOSE_ACCOUNT: u8 = 9;
const IX_TRANSFER_CHECKED: u8 = 12;
const IX_SYNC_NATIVE: u8 = 17;
const IX_INITIALIZE_MINT2: u8 = 20;

// ATA program: `CreateIdempotent`.
const ATA_IX_CREATE_IDEMPOTENT: u8 = 1;

/// The two token programs a mint can live under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenProgram {
    Token,
    Token2022,
}

impl TokenProgram {
    /// Every variant, in the order owner listings query them.
    pub const ALL: [TokenProgram; 2] = [TokenProgram::Token, TokenProgram::Token2022];

    pub fn id(&self) -> [u8; 32] {
        match self {
            TokenProgram::Token => TOKEN_PROGRAM_ID,
            TokenProgram::Token2022 => TOKEN_2022_PROGRAM_ID,
        }
    }

    /// Identify the program that owns an account.
    pub fn from_owner(owner: &[u8; 32]) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.id() == *owner)
    }

    pub fn address(&self) -> String {
        bytes_to_address(&self.id())
    }
}

/// Which authority of a mint `SetAuthority` targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorityType {
    MintTokens = 0,
    FreezeAccount = 1,
    AccountOwner = 2,
    CloseAccount = 3,
}

// ---------------------------------------------------------------------------
// Associated Token Account derivation
// ---------------------------------------------------------------------------

/// Derive the associated token account for a wallet + mint pair.
pub fn derive_associated_token_address(
    wallet: &[u8; 32],
    mint: &[u8; 32],
    program: TokenProgram,
) -> Result<[u8; 32], SolError> {
    find_program_address(
        &[wallet.as_ref(), &program.id(), mint.as_ref()],
        &ASSOCIATED_TOKEN_PROGRAM_ID,
    )
    .map(|(address, _bump)| address)
}

/// Create the wallet's associated token account unless it already exists.
pub fn create_associated_token_account_idempotent(
    payer: &[u8; 32],
    wallet: &[u8; 32],
    mint: &[u8; 32],
    program: TokenProgram,
) -> Result<SolInstruction, SolError> {
    let ata = derive_associated_token_address(wallet, mint, program)?;

    Ok(SolInstruction {
        program_id: ASSOCIATED_TOKEN_PROGRAM_ID,
        accounts: vec![
            SolAccountMeta::writable(*payer, true),
            SolAccountMeta::writable(ata, false),
            SolAccountMeta::readonly(*wallet, false),
            SolAccountMeta::readonly(*mint, false),
            SolAccountMeta::readonly(SYSTEM_PROGRAM_ID, false),
            SolAccountMeta::readonly(program.id(), false),
        ],
        data: vec![ATA_IX_CREATE_IDEMPOTENT],
    })
}

// ---------------------------------------------------------------------------
// Token instructions
// ---------------------------------------------------------------------------

/// `TransferChecked`: move `amount` base units, asserting the mint decimals.
///
/// Data: `[12] + u64 LE amount + u8 decimals`.
pub fn transfer_checked(
    source: &[u8; 32],
    mint: &[u8; 32],
    destination: &[u8; 32],
    owner: &[u8; 32],
    amount: u64,
    decimals: u8,
    program: TokenProgram,
) -> Result<SolInstruction, SolError> {
    if amount == 0 {
        return Err(SolError::TransactionBuildError(
            "token transfer amount must be > 0".into(),
        ));
    }

    let mut data = Vec::with_capacity(10);
    data.push(IX_TRANSFER_CHECKED);
    data.extend_from_slice(&amount.to_le_bytes());
    data.push(decimals);

    Ok(SolInstruction {
        program_id: program.id(),
        accounts: vec![
            SolAccountMeta::writable(*source, false),
            SolAccountMeta::readonly(*mint, false),
            SolAccountMeta::writable(*destination, false),
            SolAccountMeta::readonly(*owner, true),
        ],
        data,
    })
}

/// `InitializeMint2`: set decimals and authorities of a freshly allocated mint.
pub fn initialize_mint2(
    mint: &[u8; 32],
    decimals: u8,
    mint_authority: &[u8; 32],
    freeze_authority: Option<&[u8; 32]>,
    program: TokenProgram,
) -> SolInstruction {
    let mut data = Vec::with_capacity(67);
    data.push(IX_INITIALIZE_MINT2);
    data.push(decimals);
    data.extend_from_slice(mint_authority);
    push_pubkey_option(&mut data, freeze_authority);

    SolInstruction {
        program_id: program.id(),
        accounts: vec![SolAccountMeta::writable(*mint, false)],
        data,
    }
}

/// `MintTo`: mint `amount` base units into `destination`.
pub fn mint_to(
    mint: &[u8; 32],
    destination: &[u8; 32],
    authority: &[u8; 32],
    amount: u64,
    program: TokenProgram,
) -> SolInstruction {
    let mut data = Vec::with_capacity(9);
    data.push(IX_MINT_TO);
    data.extend_from_slice(&amount.to_le_bytes());

    SolInstruction {
        program_id: program.id(),
        accounts: vec![
            SolAccountMeta::writable(*mint, false),
            SolAccountMeta::writable(*destination, false),
            SolAccountMeta::readonly(*authority, true),
        ],
        data,
    }
}

/// `SetAuthority`: replace or (with `None`) permanently revoke an authority.
pub fn set_authority(
    account: &[u8; 32],
    current_authority: &[u8; 32],
    authority_type: AuthorityType,
    new_authority: Option<&[u8; 32]>,
    program: TokenProgram,
) -> SolInstruction {
    let mut data = Vec::with_capacity(35);
    data.push(IX_SET_AUTHORITY);
    data.push(authority_type as u8);
    push_pubkey_option(&mut data, new_authority);

    SolInstruction {
        program_id: program.id(),
        accounts: vec![
            SolAccountMeta::writable(*account, false),
            SolAccountMeta::readonly(*current_authority, true),
        ],
        data,
    }
}

/// `SyncNative`: bring a wrapped-SOL account's token amount in line with its
/// lamport balance.
pub fn sync_native(account: &[u8; 32], program: TokenProgram) -> SolInstruction {
    SolInstruction {
        program_id: program.id(),
        accounts: vec![SolAccountMeta::writable(*account, false)],
        data: vec![IX_SYNC_NATIVE],
    }
}

/// `CloseAccount`: close a token account, sending its lamports to `destination`.
pub fn close_account(
    account: &[u8; 32],
    destination: &[u8; 32],
    owner: &[u8; 32],
    program: TokenProgram,
) -> SolInstruction {
    SolInstruction {
        program_id: program.id(),
        accounts: vec![
            SolAccountMeta::writable(*account, false),
            SolAccountMeta::writable(*destination, false),
            SolAccountMeta::readonly(*owner, true),
        ],
        data: vec![IX_CLOSE_ACCOUNT],
    }
}

/// Instruction-level `COption<Pubkey>`: one tag byte, key only when present.
fn push_pubkey_option(data: &mut Vec<u8>, key: Option<&[u8; 32]>) {
    match key {
        Some(key) => {
            data.push(1);
            data.extend_from_slice(key);
        }
        None => data.push(0),
    }
}
