//! Wallet signer capability.
//!
//! A [`WalletSigner`] owns the fee payer key and turns compiled
//! transactions into signed wire bytes. [`KeypairSigner`] is backed by a
//! Solana CLI keypair file.

use std::path::Path;

use async_trait::async_trait;
use chain_sol::{sign_transaction, transaction_signature, SolKeypair, SolTransaction};
use tracing::{debug, warn};
use zeroize::Zeroize;

use crate::error::{ClientError, ClientResult};
use crate::rpc::LedgerRpc;

#[async_trait]
pub trait WalletSigner: Send + Sync {
    /// Fee payer public key.
    fn pubkey(&self) -> [u8; 32];

    /// Sign `tx` together with any `co_signers`, returning the wire bytes.
    ///
    /// The same bytes can be re-sent safely: the ledger drops a repeated
    /// signature.
    async fn sign(&self, tx: &SolTransaction, co_signers: &[&SolKeypair]) -> ClientResult<Vec<u8>>;

    /// Sign `tx` and submit it once, returning the transaction signature.
    async fn sign_and_send(
        &self,
        tx: &SolTransaction,
        co_signers: &[&SolKeypair],
        rpc: &dyn LedgerRpc,
    ) -> ClientResult<String> {
        let wire = self.sign(tx, co_signers).await?;
        let expected = transaction_signature(&wire)?;
        let signature = rpc.send_transaction(&wire).await?;
        if signature != expected {
            warn!(%expected, returned = %signature, "node returned a different signature");
        }
        Ok(signature)
    }
}

/// Signs with a local Ed25519 keypair.
#[derive(Debug)]
pub struct KeypairSigner {
    keypair: SolKeypair,
}

impl KeypairSigner {
    pub fn new(keypair: SolKeypair) -> Self {
        Self { keypair }
    }

    /// Load a keypair file: a JSON array of 64 bytes (`seed || pubkey`).
    pub fn from_file(path: impl AsRef<Path>) -> ClientResult<Self> {
        let path = path.as_ref();
        let mut contents = std::fs::read_to_string(path).map_err(|e| {
            ClientError::Config(format!("cannot read keypair {}: {e}", path.display()))
        })?;

        let parsed: Result<Vec<u8>, _> = serde_json::from_str(&contents);
        contents.zeroize();
        let mut bytes = parsed.map_err(|e| {
            ClientError::Config(format!("keypair {} is not a JSON byte array: {e}", path.display()))
        })?;

        let keypair = SolKeypair::from_keypair_bytes(&bytes);
        bytes.zeroize();

        Ok(Self::new(keypair?))
    }

    pub fn keypair(&self) -> &SolKeypair {
        &self.keypair
    }
}

#[async_trait]
impl WalletSigner for KeypairSigner {
    fn pubkey(&self) -> [u8; 32] {
        self.keypair.pubkey()
    }

    async fn sign(&self, tx: &SolTransaction, co_signers: &[&SolKeypair]) -> ClientResult<Vec<u8>> {
        let mut signers = Vec::with_capacity(co_signers.len() + 1);
        signers.push(&self.keypair);
        signers.extend_from_slice(co_signers);

        let wire = sign_transaction(tx, &signers)
            .map_err(|e| ClientError::Signer(e.to_string()))?;
        debug!(bytes = wire.len(), signers = signers.len(), "signed transaction");
        Ok(wire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("qtg-signer-{}-{name}", std::process::id()))
    }

    fn keypair_json(keypair: &SolKeypair, seed: &[u8; 32]) -> String {
        let mut bytes = seed.to_vec();
        bytes.extend_from_slice(&keypair.pubkey());
        serde_json::to_string(&bytes).unwrap()
    }

    #[test]
    fn loads_cli_keypair_file() {
        let seed = [7u8; 32];
        let expected = SolKeypair::from_seed(&seed);
        let path = temp_path("ok.json");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(keypair_json(&expected, &seed).as_bytes())
            .unwrap();

        let signer = KeypairSigner::from_file(&path).unwrap();
        assert_eq!(signer.pubkey(), expected.pubkey());
        std::fs::remove_file(path).ok();
    }

    #[tokio::test]
    async fn signing_twice_yields_identical_wire() {
        let signer = KeypairSigner::new(SolKeypair::from_seed(&[3u8; 32]));
        let ix = chain_sol::system::transfer(&signer.pubkey(), &[4u8; 32], 10);
        let tx = chain_sol::compile_transaction(&[ix], &signer.pubkey(), &[5u8; 32]).unwrap();

        let first = signer.sign(&tx, &[]).await.unwrap();
        let second = signer.sign(&tx, &[]).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first[0], 1);
    }

    #[test]
    fn missing_file_is_config_error() {
        let err = KeypairSigner::from_file(temp_path("missing.json")).unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));
    }

    #[test]
    fn malformed_file_is_config_error() {
        let path = temp_path("bad.json");
        std::fs::write(&path, "not json").unwrap();
        let err = KeypairSigner::from_file(&path).unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn mismatched_pubkey_is_rejected() {
        let path = temp_path("mismatch.json");
        let mut bytes = vec![7u8; 32];
        bytes.extend_from_slice(&[0u8; 32]);
        std::fs::write(&path, serde_json::to_string(&bytes).unwrap()).unwrap();
        let err = KeypairSigner::from_file(&path).unwrap_err();
        assert!(matches!(err, ClientError::Chain(_)));
        std::fs::remove_file(path).ok();
    }
}
