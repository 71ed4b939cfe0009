//! Solana addresses and Program Derived Addresses.
//!
//! An address is the Base58 encoding of 32 raw bytes: either an Ed25519
//! public key or a PDA. A PDA is a SHA-256 hash that deliberately falls OFF
//! the Ed25519 curve, so no private key can ever sign for it; the owning
//! program "signs" by re-deriving it from the same seeds.

use sha2::{Digest, Sha256};

use crate::error::SolError;

/// Suffix appended to every PDA hash preimage.
const PDA_MARKER: &[u8] = b"ProgramDerivedAddress";

/// Maximum length of a single PDA seed.
pub const MAX_SEED_LEN: usize = 32;

/// Encode 32 bytes as a Solana address (Base58 string).
pub fn bytes_to_address(bytes: &[u8; 32]) -> String {
    bs58::encode(bytes).into_string()
}

/// Decode a Solana address string to its 32-byte representation.
///
/// Fails if the string is not Base58 or does not decode to exactly 32 bytes.
pub fn address_to_bytes(address: &str) -> Result<[u8; 32], SolError> {
    let bytes = bs58::decode(address.trim())
        .into_vec()
        .map_err(|e| SolError::InvalidAddress(format!("base58 decode failed: {e}")))?;

    bytes.try_into().map_err(|v: Vec<u8>| {
        SolError::InvalidAddress(format!("expected 32 bytes, got {}", v.len()))
    })
}

/// Returns `true` when `address` decodes to a 32-byte key.
pub fn is_valid_address(address: &str) -> bool {
    address_to_bytes(address).is_ok()
}

/// Find the canonical PDA for `seeds` under `program_id`.
///
/// Bump seeds are tried from 255 down to 0; the first hash that is not a
/// valid curve point wins. The result is a pure function of the inputs, so
/// callers re-derive it on every access instead of storing it.
pub fn find_program_address(
    seeds: &[&[u8]],
    program_id: &[u8; 32],
) -> Result<([u8; 32], u8), SolError> {
    for bump in (0u8..=255).rev() {
        let bump_seed = [bump];
        let mut with_bump: Vec<&[u8]> = seeds.to_vec();
        with_bump.push(&bump_seed);
        if let Ok(address) = create_program_address(&with_bump, program_id) {
            return Ok((address, bump));
        }
    }

    Err(SolError::InvalidAddress(
        "could not find valid PDA bump seed".into(),
    ))
}

/// Hash `seeds` into a PDA, failing if the hash lands on the curve.
///
/// `SHA-256(seed_0 || ... || seed_n || program_id || "ProgramDerivedAddress")`
pub fn create_program_address(
    seeds: &[&[u8]],
    program_id: &[u8; 32],
) -> Result<[u8; 32], SolError> {
    let mut hasher = Sha256::new();

    for seed in seeds {
        if seed.len() > MAX_SEED_LEN {
            return Err(SolError::InvalidAddress(format!(
                "seed of {} bytes exceeds {MAX_SEED_LEN}",
                seed.len()
            )));
        }
        hasher.update(seed);
    }
    hasher.update(program_id);
    hasher.update(PDA_MARKER);

    let hash: [u8; 32] = hasher.finalize().into();

    if is_on_curve(&hash) {
        return Err(SolError::InvalidAddress(
            "derived address is on the Ed25519 curve".into(),
        ));
    }

    Ok(hash)
}

/// Check whether 32 bytes decompress to an Ed25519 curve point.
pub fn is_on_curve(bytes: &[u8; 32]) -> bool {
    curve25519_dalek::edwards::CompressedEdwardsY(*bytes)
        .decompress()
        .is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_program_address() {
        assert_eq!(
            bytes_to_address(&[0u8; 32]),
            "11111111111111111111111111111111"
        );
    }

    #[test]
    fn token_program_address_decodes() {
        let address = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";
        let bytes = address_to_bytes(address).unwrap();
        assert_eq!(bytes_to_address(&bytes), address);
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        let bytes = address_to_bytes("  So11111111111111111111111111111111111111112\n").unwrap();
        assert_eq!(bytes[31], 0x01);
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(address_to_bytes("not-a-valid-address!!!").is_err());
        assert!(!is_valid_address("0OIl"));
    }

    #[test]
    fn short_address_is_rejected() {
        // "1" decodes to a single zero byte.
        let err = address_to_bytes("1").unwrap_err();
        assert!(err.to_string().contains("expected 32 bytes, got 1"));
    }

    #[test]
    fn pda_is_off_curve_and_deterministic() {
        let program = [0x42u8; 32];
        let (a, bump_a) = find_program_address(&[b"seed", &[7u8; 32]], &program).unwrap();
        let (b, bump_b) = find_program_address(&[b"seed", &[7u8; 32]], &program).unwrap();
        assert_eq!(a, b);
        assert_eq!(bump_a, bump_b);
        assert!(!is_on_curve(&a));
    }

    #[test]
    fn pda_recreates_from_bump() {
        let program = [0x11u8; 32];
        let (address, bump) = find_program_address(&[b"vault"], &program).unwrap();
        let recreated = create_program_address(&[b"vault", &[bump]], &program).unwrap();
        assert_eq!(address, recreated);
    }

    #[test]
    fn pda_depends_on_program() {
        let (a, _) = find_program_address(&[b"vault"], &[1u8; 32]).unwrap();
        let (b, _) = find_program_address(&[b"vault"], &[2u8; 32]).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn oversized_seed_is_rejected() {
        let seed = [0u8; 33];
        assert!(create_program_address(&[&seed], &[0u8; 32]).is_err());
    }

    #[test]
    fn basepoint_is_on_curve() {
        let mut basepoint = [0x66u8; 32];
        basepoint[0] = 0x58;
        assert!(is_on_curve(&basepoint));
    }

    #[test]
    fn arbitrary_bytes_off_curve() {
        assert!(!is_on_curve(&[0x02; 32]));
    }
}
