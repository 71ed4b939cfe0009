//! Ed25519 keypairs for fee payers and freshly generated mint accounts.

use ed25519_dalek::{Signer, SigningKey};
use zeroize::Zeroize;

use crate::address::bytes_to_address;
use crate::error::SolError;

/// An Ed25519 keypair. The secret seed is wiped when the value is dropped.
pub struct SolKeypair {
    signing_key: SigningKey,
}

impl SolKeypair {
    /// Generate a new random keypair from the OS RNG.
    pub fn generate() -> Self {
        let mut rng = rand::rngs::OsRng;
        Self {
            signing_key: SigningKey::generate(&mut rng),
        }
    }

    /// Build a keypair from a 32-byte Ed25519 seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let mut copy = *seed;
        let signing_key = SigningKey::from_bytes(&copy);
        copy.zeroize();
        Self { signing_key }
    }

    /// Parse the 64-byte `seed || pubkey` layout used by Solana keypair files.
    ///
    /// The embedded public key must match the one derived from the seed.
    pub fn from_keypair_bytes(bytes: &[u8]) -> Result<Self, SolError> {
        if bytes.len() != 64 {
            return Err(SolError::InvalidPrivateKey(format!(
                "expected 64 keypair bytes, got {}",
                bytes.len()
            )));
        }

        let mut seed = [0u8; 32];
        seed.copy_from_slice(&bytes[..32]);
        let keypair = Self::from_seed(&seed);
        seed.zeroize();

        if keypair.pubkey()[..] != bytes[32..] {
            return Err(SolError::InvalidPrivateKey(
                "public key does not match secret seed".into(),
            ));
        }

        Ok(keypair)
    }

    /// Raw public key bytes.
    pub fn pubkey(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// Base58 address of the public key.
    pub fn address(&self) -> String {
        bytes_to_address(&self.pubkey())
    }

    /// Sign arbitrary bytes, returning the 64-byte signature.
    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }
}

impl std::fmt::Debug for SolKeypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SolKeypair")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}
