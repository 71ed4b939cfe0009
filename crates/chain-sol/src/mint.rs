//! SPL mint account layout.
//!
//! ```text
//! mint_authority    COption<Pubkey>  4-byte tag + 32 bytes
//! supply            u64 LE
//! decimals          u8
//! is_initialized    bool
//! freeze_authority  COption<Pubkey>  4-byte tag + 32 bytes
//! ```
//!
//! 82 bytes in total. Token-2022 mints carry extensions after the base
//! layout; only the first 82 bytes are read.

use crate::error::SolError;

/// Size of the base mint layout in bytes.
pub const MINT_ACCOUNT_LEN: usize = 82;

/// Decoded state of a token mint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintAccount {
    pub mint_authority: Option<[u8; 32]>,
    pub supply: u64,
    pub decimals: u8,
    pub is_initialized: bool,
    pub freeze_authority: Option<[u8; 32]>,
}

impl MintAccount {
    /// Decode a mint from raw account data.
    pub fn unpack(data: &[u8]) -> Result<Self, SolError> {
        if data.len() < MINT_ACCOUNT_LEN {
            return Err(SolError::AccountDecodeError(format!(
                "mint data is {} bytes, expected at least {MINT_ACCOUNT_LEN}",
                data.len()
            )));
        }

        let mint_authority = unpack_coption_key(&data[0..36])?;
        let supply = u64::from_le_bytes(array(&data[36..44]));
        let decimals = data[44];
        let is_initialized = match data[45] {
            0 => false,
            1 => true,
            other => {
                return Err(SolError::AccountDecodeError(format!(
                    "invalid is_initialized flag {other}"
                )))
            }
        };
        let freeze_authority = unpack_coption_key(&data[46..82])?;

        Ok(Self {
            mint_authority,
            supply,
            decimals,
            is_initialized,
            freeze_authority,
        })
    }

    /// Encode into the 82-byte base layout.
    pub fn pack(&self) -> [u8; MINT_ACCOUNT_LEN] {
        let mut out = [0u8; MINT_ACCOUNT_LEN];
        pack_coption_key(&mut out[0..36], self.mint_authority.as_ref());
        out[36..44].copy_from_slice(&self.supply.to_le_bytes());
        out[44] = self.decimals;
        out[45] = self.is_initialized as u8;
        pack_coption_key(&mut out[46..82], self.freeze_authority.as_ref());
        out
    }

    /// Supply in whole tokens (`supply / 10^decimals`).
    pub fn ui_supply(&self) -> f64 {
        ui_amount(self.supply, self.decimals)
    }

    pub fn mint_authority_revoked(&self) -> bool {
        self.mint_authority.is_none()
    }

    pub fn freeze_authority_revoked(&self) -> bool {
        self.freeze_authority.is_none()
    }
}

/// Convert base units to a human amount.
pub fn ui_amount(raw: u64, decimals: u8) -> f64 {
    raw as f64 / 10f64.powi(decimals as i32)
}

/// Convert a human amount to base units, rounding to the nearest unit.
pub fn raw_amount(ui: f64, decimals: u8) -> Result<u64, SolError> {
    let scaled = (ui * 10f64.powi(decimals as i32)).round();
    if !scaled.is_finite() || scaled < 0.0 || scaled >= u64::MAX as f64 {
        return Err(SolError::TransactionBuildError(format!(
            "amount {ui} is out of range for {decimals} decimals"
        )));
    }
    Ok(scaled as u64)
}

// The account-state COption uses a 4-byte LE tag, unlike instruction data.
fn unpack_coption_key(src: &[u8]) -> Result<Option<[u8; 32]>, SolError> {
    let tag = u32::from_le_bytes(array(&src[0..4]));
    match tag {
        0 => Ok(None),
        1 => Ok(Some(array(&src[4..36]))),
        other => Err(SolError::AccountDecodeError(format!(
            "invalid COption tag {other}"
        ))),
    }
}

fn array<const N: usize>(src: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(src);
    out
}

fn pack_coption_key(dst: &mut [u8], key: Option<&[u8; 32]>) {
    match key {
        Some(key) => {
            dst[0..4].copy_from_slice(&1u32.to_le_bytes());
            dst[4..36].copy_from_slice(key);
        }
        None => dst.fill(0),
    }
}
