//! Token holdings of an owner across both token programs.

use chain_sol::{bytes_to_address, TokenProgram};
use futures::future::try_join_all;
use tracing::{debug, instrument};

use crate::error::ClientResult;
use crate::rpc::{LedgerRpc, ParsedTokenAccount};

/// Every token account of `owner`, Token program accounts first.
///
/// Both programs are queried concurrently.
#[instrument(skip_all, fields(owner = %bytes_to_address(owner)))]
pub async fn list_owner_tokens(
    rpc: &dyn LedgerRpc,
    owner: &[u8; 32],
) -> ClientResult<Vec<ParsedTokenAccount>> {
    let queries = TokenProgram::ALL
        .iter()
        .map(|program| rpc.get_parsed_token_accounts_by_owner(owner, *program));
    let per_program = try_join_all(queries).await?;

    let accounts: Vec<ParsedTokenAccount> = per_program.into_iter().flatten().collect();
    debug!(count = accounts.len(), "token accounts listed");
    Ok(accounts)
}

/// Holdings that look like NFTs: zero decimals and exactly one unit.
pub fn nft_holdings(accounts: &[ParsedTokenAccount]) -> Vec<&ParsedTokenAccount> {
    accounts
        .iter()
        .filter(|a| a.decimals == 0 && a.amount == 1)
        .collect()
}
