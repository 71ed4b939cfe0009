//! Solana transaction wire format and signing.
//!
//! Transactions are compiled and serialized by hand; no `solana-sdk`.
//!
//! ```text
//! Transaction:
//!   num_signatures          compact-u16
//!   signatures              64 bytes * num_signatures
//!   message:
//!     num_required_sigs     u8
//!     num_readonly_signed   u8
//!     num_readonly_unsigned u8
//!     num_accounts          compact-u16
//!     account_keys          32 bytes * num_accounts
//!     recent_blockhash      32 bytes
//!     num_instructions      compact-u16
//!     instructions[]        (see below)
//!
//! Instruction:
//!   program_id_index        u8
//!   num_accounts            compact-u16
//!   account_indices         u8 * num_accounts
//!   data_len                compact-u16
//!   data                    u8 * data_len
//! ```
//!
//! Signing is split from serialization so one message can collect
//! signatures from several keypairs (fee payer plus a fresh mint account).

use crate::address::bytes_to_address;
use crate::error::SolError;
use crate::keypair::SolKeypair;
use crate::system;

/// Maximum serialized size of a transaction packet.
pub const PACKET_DATA_SIZE: usize = 1232;

const SIGNATURE_LEN: usize = 64;

// ---------------------------------------------------------------------------
// Compact-u16 encoding
// ---------------------------------------------------------------------------

/// Encode a `u16` value in Solana's compact-u16 format.
///
/// - Values 0..0x7f       -> 1 byte
/// - Values 0x80..0x3fff  -> 2 bytes
/// - Values 0x4000..      -> 3 bytes
pub fn encode_compact_u16(value: u16) -> Vec<u8> {
    let mut val = value as u32;
    let mut out = Vec::with_capacity(3);

    loop {
        let mut byte = (val & 0x7f) as u8;
        val >>= 7;
        if val > 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if val == 0 {
            break;
        }
    }

    out
}

/// Decode a compact-u16 value, returning `(value, bytes_consumed)`.
pub fn decode_compact_u16(data: &[u8]) -> Result<(u16, usize), SolError> {
    let mut value: u32 = 0;
    let mut consumed = 0usize;

    loop {
        let byte = *data.get(consumed).ok_or_else(|| {
            SolError::SerializationError(
                "unexpected end of data while decoding compact-u16".into(),
            )
        })?;

        value |= ((byte & 0x7f) as u32) << (7 * consumed);
        consumed += 1;

        if byte & 0x80 == 0 || consumed >= 3 {
            break;
        }
    }

    u16::try_from(value)
        .map(|v| (v, consumed))
        .map_err(|_| SolError::SerializationError("compact-u16 value overflow".into()))
}

// ---------------------------------------------------------------------------
// Data structures
// ---------------------------------------------------------------------------

/// A single account reference in a Solana instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolAccountMeta {
    pub pubkey: [u8; 32],
    pub is_signer: bool,
    pub is_writable: bool,
}

impl SolAccountMeta {
    pub fn writable(pubkey: [u8; 32], is_signer: bool) -> Self {
        Self {
            pubkey,
            is_signer,
            is_writable: true,
        }
    }

    pub fn readonly(pubkey: [u8; 32], is_signer: bool) -> Self {
        Self {
            pubkey,
            is_signer,
            is_writable: false,
        }
    }
}

/// A Solana instruction (before it is compiled into a transaction).
#[derive(Debug, Clone)]
pub struct SolInstruction {
    pub program_id: [u8; 32],
    pub accounts: Vec<SolAccountMeta>,
    pub data: Vec<u8>,
}

/// A compiled, unsigned Solana transaction.
#[derive(Debug, Clone)]
pub struct SolTransaction {
    /// All account keys referenced by this transaction, in canonical order:
    ///   1. writable signers (fee payer first)
    ///   2. read-only signers
    ///   3. writable non-signers
    ///   4. read-only non-signers
    pub account_keys: Vec<[u8; 32]>,

    pub num_required_signatures: u8,
    pub num_readonly_signed: u8,
    pub num_readonly_unsigned: u8,

    pub recent_blockhash: [u8; 32],

    pub compiled_instructions: Vec<CompiledInstruction>,
}

impl SolTransaction {
    /// The accounts whose signatures this transaction requires, in slot order.
    pub fn signers(&self) -> &[[u8; 32]] {
        &self.account_keys[..self.num_required_signatures as usize]
    }

    /// The fee payer (always the first account key).
    pub fn fee_payer(&self) -> [u8; 32] {
        self.account_keys[0]
    }
}

/// A compiled instruction where account references are replaced by u8 indices
/// into the transaction's `account_keys` array.
#[derive(Debug, Clone)]
pub struct CompiledInstruction {
    pub program_id_index: u8,
    pub account_indices: Vec<u8>,
    pub data: Vec<u8>,
}

// ---------------------------------------------------------------------------
// Transaction building
// ---------------------------------------------------------------------------

/// Build a native SOL transfer transaction paid for by the sender.
pub fn build_sol_transfer(
    from_pubkey: &[u8; 32],
    to_pubkey: &[u8; 32],
    lamports: u64,
    recent_blockhash: &[u8; 32],
) -> Result<SolTransaction, SolError> {
    if lamports == 0 {
        return Err(SolError::TransactionBuildError(
            "lamports must be > 0".into(),
        ));
    }

    let instruction = system::transfer(from_pubkey, to_pubkey, lamports);
    compile_transaction(&[instruction], from_pubkey, recent_blockhash)
}

/// Compile instructions into a transaction with a single fee payer.
pub fn compile_transaction(
    instructions: &[SolInstruction],
    fee_payer: &[u8; 32],
    recent_blockhash: &[u8; 32],
) -> Result<SolTransaction, SolError> {
    if instructions.is_empty() {
        return Err(SolError::TransactionBuildError(
            "transaction has no instructions".into(),
        ));
    }

    struct AccountEntry {
        pubkey: [u8; 32],
        is_signer: bool,
        is_writable: bool,
    }

    let mut entries: Vec<AccountEntry> = Vec::new();

    let mut upsert = |pubkey: [u8; 32], signer: bool, writable: bool| {
        if let Some(entry) = entries.iter_mut().find(|e| e.pubkey == pubkey) {
            entry.is_signer |= signer;
            entry.is_writable |= writable;
        } else {
            entries.push(AccountEntry {
                pubkey,
                is_signer: signer,
                is_writable: writable,
            });
        }
    };

    upsert(*fee_payer, true, true);

    for ix in instructions {
        for meta in &ix.accounts {
            upsert(meta.pubkey, meta.is_signer, meta.is_writable);
        }
        upsert(ix.program_id, false, false);
    }

    // Stable sort keeps insertion order within a category, so the fee payer
    // stays at index 0 among the writable signers.
    entries.sort_by_key(|e| match (e.is_signer, e.is_writable) {
        (true, true) => 0u8,
        (true, false) => 1,
        (false, true) => 2,
        (false, false) => 3,
    });

    if entries.len() > u8::MAX as usize {
        return Err(SolError::TransactionBuildError(format!(
            "{} accounts exceed the 255 account limit",
            entries.len()
        )));
    }

    let num_signers = entries.iter().filter(|e| e.is_signer).count() as u8;
    let num_readonly_signed = entries
        .iter()
        .filter(|e| e.is_signer && !e.is_writable)
        .count() as u8;
    let num_readonly_unsigned = entries
        .iter()
        .filter(|e| !e.is_signer && !e.is_writable)
        .count() as u8;

    let account_keys: Vec<[u8; 32]> = entries.iter().map(|e| e.pubkey).collect();

    let index_of = |key: &[u8; 32]| -> Result<u8, SolError> {
        account_keys
            .iter()
            .position(|k| k == key)
            .map(|i| i as u8)
            .ok_or_else(|| {
                SolError::TransactionBuildError(format!(
                    "account {} not in account keys",
                    bytes_to_address(key)
                ))
            })
    };

    let mut compiled = Vec::with_capacity(instructions.len());
    for ix in instructions {
        let program_id_index = index_of(&ix.program_id)?;
        let account_indices = ix
            .accounts
            .iter()
            .map(|meta| index_of(&meta.pubkey))
            .collect::<Result<Vec<_>, _>>()?;

        compiled.push(CompiledInstruction {
            program_id_index,
            account_indices,
            data: ix.data.clone(),
        });
    }

    Ok(SolTransaction {
        account_keys,
        num_required_signatures: num_signers,
        num_readonly_signed,
        num_readonly_unsigned,
        recent_blockhash: *recent_blockhash,
        compiled_instructions: compiled,
    })
}

/// Serialize the transaction message (the bytes that get signed).
pub fn serialize_message(tx: &SolTransaction) -> Result<Vec<u8>, SolError> {
    let mut buf = Vec::with_capacity(256);

    buf.push(tx.num_required_signatures);
    buf.push(tx.num_readonly_signed);
    buf.push(tx.num_readonly_unsigned);

    buf.extend_from_slice(&encode_compact_u16(checked_len(tx.account_keys.len())?));
    for key in &tx.account_keys {
        buf.extend_from_slice(key);
    }

    buf.extend_from_slice(&tx.recent_blockhash);

    buf.extend_from_slice(&encode_compact_u16(checked_len(
        tx.compiled_instructions.len(),
    )?));
    for ix in &tx.compiled_instructions {
        buf.push(ix.program_id_index);

        buf.extend_from_slice(&encode_compact_u16(checked_len(ix.account_indices.len())?));
        buf.extend_from_slice(&ix.account_indices);

        buf.extend_from_slice(&encode_compact_u16(checked_len(ix.data.len())?));
        buf.extend_from_slice(&ix.data);
    }

    Ok(buf)
}

/// Serialize with every signature slot zeroed, ready for partial signing.
pub fn serialize_unsigned(tx: &SolTransaction) -> Result<Vec<u8>, SolError> {
    let message = serialize_message(tx)?;
    let num_sigs = tx.num_required_signatures as usize;

    let mut wire = Vec::with_capacity(3 + num_sigs * SIGNATURE_LEN + message.len());
    wire.extend_from_slice(&encode_compact_u16(num_sigs as u16));
    wire.resize(wire.len() + num_sigs * SIGNATURE_LEN, 0);
    wire.extend_from_slice(&message);
    Ok(wire)
}

/// Sign a compiled transaction with every required keypair.
///
/// `signers` may be given in any order; each is placed into the slot that
/// matches its public key. Fails if a required signature is left missing
/// or if the packet exceeds [`PACKET_DATA_SIZE`].
pub fn sign_transaction(
    tx: &SolTransaction,
    signers: &[&SolKeypair],
) -> Result<Vec<u8>, SolError> {
    let mut wire = serialize_unsigned(tx)?;
    for signer in signers {
        partial_sign(&mut wire, signer)?;
    }

    let prefix = encode_compact_u16(tx.num_required_signatures as u16).len();
    for (slot, key) in tx.signers().iter().enumerate() {
        let offset = prefix + slot * SIGNATURE_LEN;
        if wire[offset..offset + SIGNATURE_LEN].iter().all(|b| *b == 0) {
            return Err(SolError::SigningError(format!(
                "missing signature for {}",
                bytes_to_address(key)
            )));
        }
    }

    if wire.len() > PACKET_DATA_SIZE {
        return Err(SolError::TransactionBuildError(format!(
            "transaction is {} bytes, limit is {PACKET_DATA_SIZE}",
            wire.len()
        )));
    }

    Ok(wire)
}

/// Sign a wire-format transaction in place with one keypair.
///
/// The keypair's public key must be among the message's required signers;
/// other signature slots are left untouched, so a transaction can pass
/// through several partial signers.
pub fn partial_sign(raw_tx: &mut [u8], keypair: &SolKeypair) -> Result<(), SolError> {
    let our_pubkey = keypair.pubkey();

    let (num_sigs, compact_len) = decode_compact_u16(raw_tx)?;
    if num_sigs == 0 {
        return Err(SolError::TransactionBuildError(
            "transaction has zero signatures".into(),
        ));
    }

    let sigs_start = compact_len;
    let sigs_end = sigs_start + (num_sigs as usize) * SIGNATURE_LEN;
    if sigs_end > raw_tx.len() {
        return Err(SolError::SerializationError(
            "transaction too short: signature slots exceed length".into(),
        ));
    }

    let message = &raw_tx[sigs_end..];
    if message.len() < 4 {
        return Err(SolError::SerializationError(
            "transaction message too short".into(),
        ));
    }

    let num_required_sigs = message[0] as usize;
    let (num_accounts, accounts_compact_len) = decode_compact_u16(&message[3..])?;
    let accounts_start = 3 + accounts_compact_len;
    let accounts_end = accounts_start + (num_accounts as usize) * 32;
    if accounts_end > message.len() {
        return Err(SolError::SerializationError(
            "transaction message too short for account keys".into(),
        ));
    }

    let signer_idx = (0..num_required_sigs.min(num_accounts as usize))
        .find(|i| {
            let start = accounts_start + i * 32;
            message[start..start + 32] == our_pubkey
        })
        .ok_or_else(|| {
            SolError::SigningError(format!(
                "{} is not a signer of this transaction",
                keypair.address()
            ))
        })?;

    let signature = keypair.sign(message);
    let offset = sigs_start + signer_idx * SIGNATURE_LEN;
    raw_tx[offset..offset + SIGNATURE_LEN].copy_from_slice(&signature);

    Ok(())
}

/// The transaction id: Base58 of the first (fee payer) signature.
pub fn transaction_signature(wire: &[u8]) -> Result<String, SolError> {
    let (num_sigs, compact_len) = decode_compact_u16(wire)?;
    if num_sigs == 0 || wire.len() < compact_len + SIGNATURE_LEN {
        return Err(SolError::SerializationError(
            "transaction carries no signature".into(),
        ));
    }
    Ok(bs58::encode(&wire[compact_len..compact_len + SIGNATURE_LEN]).into_string())
}

fn checked_len(len: usize) -> Result<u16, SolError> {
    u16::try_from(len)
        .map_err(|_| SolError::SerializationError(format!("length {len} exceeds compact-u16")))
}
