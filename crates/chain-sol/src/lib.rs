//! Solana primitives for the token generator.
//!
//! Addresses, keypairs, program-derived addresses, the compact binary
//! wire format and the SPL Token, Associated Token Account and Token
//! Metadata instructions are implemented by hand on top of
//! `ed25519-dalek`, `curve25519-dalek`, `sha2` and `bs58`. Nothing here
//! touches the network.

pub mod address;
pub mod error;
pub mod keypair;
pub mod metadata;
pub mod mint;
pub mod spl_token;
pub mod system;
pub mod transaction;
pub mod wsol;

pub use address::{
    address_to_bytes, bytes_to_address, create_program_address, find_program_address,
    is_valid_address,
};
pub use error::SolError;
pub use keypair::SolKeypair;
pub use metadata::{
    create_metadata_account_v3, derive_metadata_address, Creator, MetadataAccount, MetadataArgs,
    METADATA_PROGRAM_ID,
};
pub use mint::{raw_amount, ui_amount, MintAccount, MINT_ACCOUNT_LEN};
pub use spl_token::{
    derive_associated_token_address, AuthorityType, TokenProgram, ASSOCIATED_TOKEN_PROGRAM_ID,
    TOKEN_2022_PROGRAM_ID, TOKEN_PROGRAM_ID,
};
pub use system::SYSTEM_PROGRAM_ID;
pub use transaction::{
    compile_transaction, decode_compact_u16, encode_compact_u16, partial_sign, serialize_message,
    sign_transaction, transaction_signature, CompiledInstruction, SolAccountMeta, SolInstruction,
    SolTransaction, PACKET_DATA_SIZE,
};
pub use wsol::NATIVE_MINT;
