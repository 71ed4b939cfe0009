//! Token and NFT creation, and authority revocation.

use chain_sol::spl_token::{
    create_associated_token_account_idempotent, initialize_mint2, mint_to, set_authority,
};
use chain_sol::{
    bytes_to_address, create_metadata_account_v3, derive_associated_token_address,
    derive_metadata_address, system, AuthorityType, MetadataArgs, SolKeypair, TokenProgram,
    MINT_ACCOUNT_LEN,
};
use serde::Serialize;
use tracing::{info, instrument};

use crate::error::{ClientError, ClientResult};
use crate::rpc::{get_mint, LedgerRpc};
use crate::signer::WalletSigner;
use crate::submission::{send_and_confirm, SubmitOptions, TransactionReceipt};

/// Parameters for a new mint with Metaplex metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTokenParams {
    pub name: String,
    pub symbol: String,
    /// Off-chain metadata URI, usually from a pinning upload.
    pub uri: String,
    pub decimals: u8,
    /// Initial supply in base units, minted to the creator.
    pub initial_supply: u64,
    pub program: TokenProgram,
    pub seller_fee_basis_points: u16,
    pub is_mutable: bool,
    /// Set the creator as freeze authority.
    pub freeze_authority: bool,
    pub revoke_mint_authority: bool,
    pub revoke_freeze_authority: bool,
}

impl CreateTokenParams {
    pub fn fungible(
        name: impl Into<String>,
        symbol: impl Into<String>,
        uri: impl Into<String>,
        decimals: u8,
        initial_supply: u64,
    ) -> Self {
        Self {
            name: name.into(),
            symbol: symbol.into(),
            uri: uri.into(),
            decimals,
            initial_supply,
            program: TokenProgram::Token,
            seller_fee_basis_points: 0,
            is_mutable: true,
            freeze_authority: false,
            revoke_mint_authority: false,
            revoke_freeze_authority: false,
        }
    }

    /// One indivisible token with the mint authority revoked afterwards.
    pub fn nft(
        name: impl Into<String>,
        symbol: impl Into<String>,
        uri: impl Into<String>,
        seller_fee_basis_points: u16,
    ) -> Self {
        Self {
            seller_fee_basis_points,
            revoke_mint_authority: true,
            ..Self::fungible(name, symbol, uri, 0, 1)
        }
    }
}

/// Addresses produced by [`create_token`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedToken {
    pub mint: String,
    pub token_account: String,
    pub metadata_address: String,
    pub signature: String,
}

/// Create a mint, its metadata and the creator's token account, and mint
/// the initial supply, in one transaction.
///
/// `mint_keypair` is the fresh mint account and co-signs with the payer.
#[instrument(skip_all, fields(mint = %mint_keypair.address(), symbol = %params.symbol))]
pub async fn create_token(
    rpc: &dyn LedgerRpc,
    signer: &dyn WalletSigner,
    mint_keypair: &SolKeypair,
    params: &CreateTokenParams,
    options: &SubmitOptions,
) -> ClientResult<CreatedToken> {
    if params.revoke_freeze_authority && !params.freeze_authority {
        return Err(ClientError::InvalidInput(
            "cannot revoke a freeze authority that is not set".into(),
        ));
    }

    let payer = signer.pubkey();
    let mint = mint_keypair.pubkey();
    let program = params.program;

    let args = MetadataArgs {
        name: params.name.clone(),
        symbol: params.symbol.clone(),
        uri: params.uri.clone(),
        seller_fee_basis_points: params.seller_fee_basis_points,
        creators: None,
        is_mutable: params.is_mutable,
    };
    args.validate()?;

    let rent = rpc
        .get_minimum_balance_for_rent_exemption(MINT_ACCOUNT_LEN)
        .await?;
    let token_account = derive_associated_token_address(&payer, &mint, program)?;
    let metadata_address = derive_metadata_address(&mint)?;

    let mut instructions = vec![
        system::create_account(&payer, &mint, rent, MINT_ACCOUNT_LEN as u64, &program.id()),
        initialize_mint2(
            &mint,
            params.decimals,
            &payer,
            params.freeze_authority.then_some(&payer),
            program,
        ),
        create_associated_token_account_idempotent(&payer, &payer, &mint, program)?,
    ];
    if params.initial_supply > 0 {
        instructions.push(mint_to(
            &mint,
            &token_account,
            &payer,
            params.initial_supply,
            program,
        ));
    }
    instructions.push(create_metadata_account_v3(&mint, &payer, &payer, &payer, &args)?);
    if params.revoke_mint_authority {
        instructions.push(set_authority(
            &mint,
            &payer,
            AuthorityType::MintTokens,
            None,
            program,
        ));
    }
    if params.revoke_freeze_authority {
        instructions.push(set_authority(
            &mint,
            &payer,
            AuthorityType::FreezeAccount,
            None,
            program,
        ));
    }

    let receipt = send_and_confirm(rpc, signer, &instructions, &[mint_keypair], options).await?;
    info!(signature = %receipt.signature, "token created");

    Ok(CreatedToken {
        mint: bytes_to_address(&mint),
        token_account: bytes_to_address(&token_account),
        metadata_address: bytes_to_address(&metadata_address),
        signature: receipt.signature,
    })
}

/// Permanently remove the mint or freeze authority of `mint`.
///
/// The signer must hold the authority being revoked.
#[instrument(skip_all, fields(mint = %bytes_to_address(mint), authority = ?authority))]
pub async fn revoke_authority(
    rpc: &dyn LedgerRpc,
    signer: &dyn WalletSigner,
    mint: &[u8; 32],
    authority: AuthorityType,
    options: &SubmitOptions,
) -> ClientResult<TransactionReceipt> {
    let (state, program) = get_mint(rpc, mint).await?;
    let current = match authority {
        AuthorityType::MintTokens => state.mint_authority,
        AuthorityType::FreezeAccount => state.freeze_authority,
        other => {
            return Err(ClientError::InvalidInput(format!(
                "{other:?} is not a mint authority"
            )))
        }
    };

    let payer = signer.pubkey();
    match current {
        None => {
            return Err(ClientError::InvalidInput(format!(
                "{authority:?} authority is already revoked"
            )))
        }
        Some(holder) if holder != payer => {
            return Err(ClientError::InvalidInput(format!(
                "{authority:?} authority is held by {}",
                bytes_to_address(&holder)
            )))
        }
        Some(_) => {}
    }

    let ix = set_authority(mint, &payer, authority, None, program);
    send_and_confirm(rpc, signer, &[ix], &[], options).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockLedger;
    use crate::signer::KeypairSigner;
    use chain_sol::{MintAccount, METADATA_PROGRAM_ID};

    fn signer() -> KeypairSigner {
        KeypairSigner::new(SolKeypair::from_seed(&[0x21; 32]))
    }

    #[test]
    fn nft_params() {
        let params = CreateTokenParams::nft("Ape", "APE", "ipfs://x", 500);
        assert_eq!(params.decimals, 0);
        assert_eq!(params.initial_supply, 1);
        assert!(params.revoke_mint_authority);
        assert_eq!(params.seller_fee_basis_points, 500);
    }

    #[tokio::test(start_paused = true)]
    async fn create_token_signs_with_mint_keypair() {
        let ledger = MockLedger::new();
        ledger.push_status(Ok(Some(MockLedger::confirmed(12))));
        let signer = signer();
        let mint = SolKeypair::from_seed(&[0x31; 32]);

        let params = CreateTokenParams::fungible("Quick", "QTG", "ipfs://meta", 6, 1_000_000);
        let created = create_token(&ledger, &signer, &mint, &params, &SubmitOptions::default())
            .await
            .unwrap();

        assert_eq!(created.mint, mint.address());
        assert_eq!(
            created.metadata_address,
            bytes_to_address(&derive_metadata_address(&mint.pubkey()).unwrap())
        );

        let sent = ledger.sent.lock().unwrap();
        let wire = &sent[0];
        // Two signatures: payer and mint.
        assert_eq!(wire[0], 2);
        assert!(wire[1..65].iter().any(|b| *b != 0));
        assert!(wire[65..129].iter().any(|b| *b != 0));
        assert!(wire.windows(32).any(|w| w == &METADATA_PROGRAM_ID[..]));
    }

    #[tokio::test]
    async fn overlong_symbol_fails_before_sending() {
        let ledger = MockLedger::new();
        let params = CreateTokenParams::fungible("Quick", "WAYTOOLONG1", "", 6, 0);
        let err = create_token(
            &ledger,
            &signer(),
            &SolKeypair::from_seed(&[1; 32]),
            &params,
            &SubmitOptions::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ClientError::Chain(_)));
        assert!(ledger.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn revoking_someone_elses_authority_fails() {
        let ledger = MockLedger::new();
        let mint = [0x66; 32];
        // The mock mint authority is [9; 32], not the signer.
        ledger.insert_mint(mint, 6, 100);

        let err = revoke_authority(
            &ledger,
            &signer(),
            &mint,
            AuthorityType::MintTokens,
            &SubmitOptions::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ClientError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn revoking_absent_freeze_authority_fails() {
        let ledger = MockLedger::new();
        let mint = [0x67; 32];
        ledger.insert_mint(mint, 6, 100);

        let err = revoke_authority(
            &ledger,
            &signer(),
            &mint,
            AuthorityType::FreezeAccount,
            &SubmitOptions::default(),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("already revoked"));
    }

    #[tokio::test(start_paused = true)]
    async fn revoke_mint_authority_held_by_signer() {
        let ledger = MockLedger::new();
        let signer = signer();
        let mint = [0x68; 32];
        let state = MintAccount {
            mint_authority: Some(signer.pubkey()),
            supply: 1,
            decimals: 0,
            is_initialized: true,
            freeze_authority: None,
        };
        ledger.insert_account(mint, TokenProgram::Token.id(), state.pack().to_vec());
        ledger.push_status(Ok(Some(MockLedger::confirmed(2))));

        let receipt = revoke_authority(
            &ledger,
            &signer,
            &mint,
            AuthorityType::MintTokens,
            &SubmitOptions::default(),
        )
        .await
        .unwrap();
        assert_eq!(receipt.confirmation.slot, 2);
    }
}
