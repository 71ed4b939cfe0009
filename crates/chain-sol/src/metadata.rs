//! Metaplex Token Metadata: PDA derivation, account decoding and the
//! `CreateMetadataAccountV3` instruction.
//!
//! The metadata account is Borsh-encoded:
//!
//! ```text
//! key                     u8 (4 = MetadataV1)
//! update_authority        32 bytes
//! mint                    32 bytes
//! name                    u32 LE len + bytes (NUL padded to 32)
//! symbol                  u32 LE len + bytes (NUL padded to 10)
//! uri                     u32 LE len + bytes (NUL padded to 200)
//! seller_fee_basis_points u16 LE
//! creators                Option<Vec<Creator>>
//! primary_sale_happened   bool
//! is_mutable              bool
//! ...                     (edition nonce, token standard, collection, uses)
//! ```
//!
//! Only the fields up to `is_mutable` are decoded; newer trailing fields
//! are ignored.

use crate::address::{bytes_to_address, find_program_address};
use crate::error::SolError;
use crate::system::SYSTEM_PROGRAM_ID;
use crate::transaction::{SolAccountMeta, SolInstruction};

/// Token Metadata Program ID: `metaqbxxUerdq28cj1RbAWkYQm3ybzjb6a8bt518x1s`
pub const METADATA_PROGRAM_ID: [u8; 32] = [
    0x0b, 0x70, 0x65, 0xb1, 0xe3, 0xd1, 0x7c, 0x45, 0x38, 0x9d, 0x52, 0x7f, 0x6b, 0x04, 0xc3,
    0xcd, 0x58, 0xb8, 0x6c, 0x73, 0x1a, 0xa0, 0xfd, 0xb5, 0x49, 0xb6, 0xd1, 0xbc, 0x03, 0xf8,
    0x29, 0x46,
];

/// Fixed seed prefix of every metadata PDA.
pub const METADATA_SEED: &[u8] = b"metadata";

pub const MAX_NAME_LENGTH: usize = 32;
pub const MAX_SYMBOL_LENGTH: usize = 10;
pub const MAX_URI_LENGTH: usize = 200;
pub const MAX_CREATORS: usize = 5;

const KEY_METADATA_V1: u8 = 4;
const IX_CREATE_METADATA_V3: u8 = 33;

/// A royalty recipient listed on the metadata record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Creator {
    pub address: [u8; 32],
    pub verified: bool,
    pub share: u8,
}

/// Decoded on-chain metadata record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataAccount {
    pub update_authority: [u8; 32],
    pub mint: [u8; 32],
    pub name: String,
    pub symbol: String,
    pub uri: String,
    pub seller_fee_basis_points: u16,
    pub creators: Option<Vec<Creator>>,
    pub primary_sale_happened: bool,
    pub is_mutable: bool,
}

/// Derive the metadata account address for `mint`.
///
/// Seeds: `["metadata", METADATA_PROGRAM_ID, mint]` under the metadata program.
pub fn derive_metadata_address(mint: &[u8; 32]) -> Result<[u8; 32], SolError> {
    find_program_address(
        &[METADATA_SEED, &METADATA_PROGRAM_ID, mint.as_ref()],
        &METADATA_PROGRAM_ID,
    )
    .map(|(address, _bump)| address)
}

impl MetadataAccount {
    /// Decode a metadata account. String fields have their NUL padding removed.
    pub fn unpack(data: &[u8]) -> Result<Self, SolError> {
        let mut reader = Reader::new(data);

        let key = reader.u8()?;
        if key != KEY_METADATA_V1 {
            return Err(SolError::AccountDecodeError(format!(
                "account key {key} is not MetadataV1"
            )));
        }

        let update_authority = reader.pubkey()?;
        let mint = reader.pubkey()?;
        let name = reader.string()?;
        let symbol = reader.string()?;
        let uri = reader.string()?;
        let seller_fee_basis_points = reader.u16()?;

        let creators = if reader.bool()? {
            let count = reader.u32()? as usize;
            if count > MAX_CREATORS {
                return Err(SolError::AccountDecodeError(format!(
                    "{count} creators exceed the maximum of {MAX_CREATORS}"
                )));
            }
            let mut creators = Vec::with_capacity(count);
            for _ in 0..count {
                creators.push(Creator {
                    address: reader.pubkey()?,
                    verified: reader.bool()?,
                    share: reader.u8()?,
                });
            }
            Some(creators)
        } else {
            None
        };

        let primary_sale_happened = reader.bool()?;
        let is_mutable = reader.bool()?;

        Ok(Self {
            update_authority,
            mint,
            name: trim_padding(&name),
            symbol: trim_padding(&symbol),
            uri: trim_padding(&uri),
            seller_fee_basis_points,
            creators,
            primary_sale_happened,
            is_mutable,
        })
    }

    /// Encode the record, padding strings the way the program stores them.
    pub fn pack(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(1 + 64 + 4 * 3 + 242 + 2 + 4);
        out.push(KEY_METADATA_V1);
        out.extend_from_slice(&self.update_authority);
        out.extend_from_slice(&self.mint);
        write_string(&mut out, &pad(&self.name, MAX_NAME_LENGTH));
        write_string(&mut out, &pad(&self.symbol, MAX_SYMBOL_LENGTH));
        write_string(&mut out, &pad(&self.uri, MAX_URI_LENGTH));
        out.extend_from_slice(&self.seller_fee_basis_points.to_le_bytes());
        write_creators(&mut out, self.creators.as_deref());
        out.push(self.primary_sale_happened as u8);
        out.push(self.is_mutable as u8);
        out
    }

    pub fn update_authority_address(&self) -> String {
        bytes_to_address(&self.update_authority)
    }
}

/// Fields written by `CreateMetadataAccountV3`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataArgs {
    pub name: String,
    pub symbol: String,
    pub uri: String,
    pub seller_fee_basis_points: u16,
    pub creators: Option<Vec<Creator>>,
    pub is_mutable: bool,
}

impl MetadataArgs {
    /// Enforce the program's length and royalty limits.
    pub fn validate(&self) -> Result<(), SolError> {
        check_len("name", &self.name, MAX_NAME_LENGTH)?;
        check_len("symbol", &self.symbol, MAX_SYMBOL_LENGTH)?;
        check_len("uri", &self.uri, MAX_URI_LENGTH)?;

        if self.seller_fee_basis_points > 10_000 {
            return Err(SolError::InvalidMetadata(format!(
                "seller fee of {} bps exceeds 10000",
                self.seller_fee_basis_points
            )));
        }

        if let Some(creators) = &self.creators {
            if creators.len() > MAX_CREATORS {
                return Err(SolError::InvalidMetadata(format!(
                    "{} creators exceed the maximum of {MAX_CREATORS}",
                    creators.len()
                )));
            }
            let total: u32 = creators.iter().map(|c| c.share as u32).sum();
            if !creators.is_empty() && total != 100 {
                return Err(SolError::InvalidMetadata(format!(
                    "creator shares sum to {total}, expected 100"
                )));
            }
        }

        Ok(())
    }
}

/// Build `CreateMetadataAccountV3` for `mint`.
///
/// The mint authority, payer and update authority must sign. Collection,
/// uses and collection details are written as `None`.
pub fn create_metadata_account_v3(
    mint: &[u8; 32],
    mint_authority: &[u8; 32],
    payer: &[u8; 32],
    update_authority: &[u8; 32],
    args: &MetadataArgs,
) -> Result<SolInstruction, SolError> {
    args.validate()?;
    let metadata = derive_metadata_address(mint)?;

    let mut data = Vec::with_capacity(1 + 12 + args.name.len() + args.symbol.len() + args.uri.len() + 8);
    data.push(IX_CREATE_METADATA_V3);
    write_string(&mut data, &args.name);
    write_string(&mut data, &args.symbol);
    write_string(&mut data, &args.uri);
    data.extend_from_slice(&args.seller_fee_basis_points.to_le_bytes());
    write_creators(&mut data, args.creators.as_deref());
    data.push(0); // collection: None
    data.push(0); // uses: None
    data.push(args.is_mutable as u8);
    data.push(0); // collection_details: None

    Ok(SolInstruction {
        program_id: METADATA_PROGRAM_ID,
        accounts: vec![
            SolAccountMeta::writable(metadata, false),
            SolAccountMeta::readonly(*mint, false),
            SolAccountMeta::readonly(*mint_authority, true),
            SolAccountMeta::writable(*payer, true),
            SolAccountMeta::readonly(*update_authority, true),
            SolAccountMeta::readonly(SYSTEM_PROGRAM_ID, false),
        ],
        data,
    })
}

fn check_len(field: &str, value: &str, max: usize) -> Result<(), SolError> {
    if value.len() > max {
        return Err(SolError::InvalidMetadata(format!(
            "{field} is {} bytes, maximum is {max}",
            value.len()
        )));
    }
    Ok(())
}

fn trim_padding(s: &str) -> String {
    s.trim_end_matches('\0').to_string()
}

fn pad(s: &str, width: usize) -> String {
    let mut out = s.to_string();
    while out.len() < width {
        out.push('\0');
    }
    out
}

fn write_string(out: &mut Vec<u8>, s: &str) {
    out.extend_from_slice(&(s.len() as u32).to_le_bytes());
    out.extend_from_slice(s.as_bytes());
}

fn write_creators(out: &mut Vec<u8>, creators: Option<&[Creator]>) {
    match creators {
        Some(creators) => {
            out.push(1);
            out.extend_from_slice(&(creators.len() as u32).to_le_bytes());
            for creator in creators {
                out.extend_from_slice(&creator.address);
                out.push(creator.verified as u8);
                out.push(creator.share);
            }
        }
        None => out.push(0),
    }
}

/// Bounds-checked little-endian cursor over Borsh data.
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], SolError> {
        let end = self.pos.checked_add(len).filter(|end| *end <= self.data.len());
        let end = end.ok_or_else(|| {
            SolError::AccountDecodeError(format!(
                "metadata truncated at byte {} (wanted {len} more)",
                self.pos
            ))
        })?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, SolError> {
        Ok(self.take(1)?[0])
    }

    fn bool(&mut self) -> Result<bool, SolError> {
        match self.u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(SolError::AccountDecodeError(format!(
                "invalid bool byte {other}"
            ))),
        }
    }

    fn u16(&mut self) -> Result<u16, SolError> {
        let bytes = self.take(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    fn u32(&mut self) -> Result<u32, SolError> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn pubkey(&mut self) -> Result<[u8; 32], SolError> {
        let mut key = [0u8; 32];
        key.copy_from_slice(self.take(32)?);
        Ok(key)
    }

    fn string(&mut self) -> Result<String, SolError> {
        let len = self.u32()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| SolError::AccountDecodeError(format!("string is not UTF-8: {e}")))
    }
}
