//! qtg - Quick Token Generator command line.
//!
//! # Usage
//!
//! ```bash
//! # Inspect a mint on devnet
//! qtg token-info So11111111111111111111111111111111111111112
//!
//! # Create a token, pinning its image and metadata first
//! PINATA_API_KEY=... PINATA_SECRET_API_KEY=... \
//!   qtg create-token --name "Quick" --symbol QTG --supply 1000000 --image logo.png
//! ```

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info};
use tracing_subscriber::{fmt, EnvFilter};

use chain_sol::{
    address_to_bytes, bytes_to_address, raw_amount, ui_amount, AuthorityType, SolKeypair,
    TokenProgram,
};
use token_client::{
    create_token, get_mint, get_token_data, get_token_metadata, list_owner_tokens, nft_holdings,
    quote_swap, request_airdrop, revoke_authority, transfer_sol, transfer_tokens, unwrap_sol,
    wrap_sol, ClientConfig, CreateTokenParams, HttpMetadataFetcher, HttpRpcClient, KeypairSigner,
    LedgerRpc, Network, PinningClient, SubmitOptions, TokenMetadataUpload, TokenTransferRequest,
    TransactionReceipt, TransferRequest, WalletSigner,
};

const SOL_DECIMALS: u8 = 9;

/// Quick Token Generator - create and manage Solana tokens.
#[derive(Parser, Debug)]
#[command(name = "qtg")]
#[command(version)]
struct Cli {
    /// Cluster: mainnet, devnet, testnet or localnet (overrides QTG_NETWORK).
    #[arg(long, global = true)]
    network: Option<Network>,

    /// RPC endpoint (overrides QTG_RPC_URL and the network default).
    #[arg(long, global = true)]
    rpc_url: Option<String>,

    /// Signer keypair file (overrides QTG_KEYPAIR).
    #[arg(long, global = true)]
    keypair: Option<PathBuf>,

    /// Submission attempts for transient failures (1-10).
    #[arg(
        long,
        global = true,
        default_value = "3",
        value_parser = clap::value_parser!(u32).range(1..=10)
    )]
    max_attempts: u32,

    /// Seconds to wait for confirmation.
    #[arg(long, global = true, default_value = "30")]
    confirm_timeout: u64,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Enable JSON log output.
    #[arg(long, env = "JSON_LOGS")]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Supply, authorities, creation time and metadata of a fungible mint.
    TokenInfo { mint: String },

    /// On-chain and off-chain metadata of any mint.
    Metadata { mint: String },

    /// SOL balance (defaults to the signer).
    Balance { address: Option<String> },

    /// Token accounts across both token programs (defaults to the signer).
    Tokens {
        owner: Option<String>,
        /// Only holdings that look like NFTs.
        #[arg(long)]
        nfts: bool,
    },

    /// Request SOL from the cluster faucet.
    Airdrop {
        sol: f64,
        #[arg(long)]
        to: Option<String>,
    },

    /// Send SOL.
    Transfer { to: String, sol: f64 },

    /// Send SPL tokens; `amount` is in whole tokens.
    TransferToken { mint: String, to: String, amount: f64 },

    /// Wrap SOL into the native mint.
    Wrap { sol: f64 },

    /// Close the wrapped SOL account.
    Unwrap,

    /// Create a token (or NFT) with Metaplex metadata.
    CreateToken {
        #[arg(long)]
        name: String,
        #[arg(long)]
        symbol: String,
        #[arg(long, default_value = "9")]
        decimals: u8,
        /// Initial supply in whole tokens.
        #[arg(long, default_value = "0")]
        supply: f64,
        /// Metadata URI. Mutually exclusive with --image.
        #[arg(long, conflicts_with = "image")]
        uri: Option<String>,
        /// Image to pin together with a generated metadata document.
        #[arg(long)]
        image: Option<PathBuf>,
        #[arg(long, default_value = "")]
        description: String,
        /// Royalty in basis points.
        #[arg(long, default_value = "0")]
        seller_fee_bps: u16,
        /// One indivisible token, mint authority revoked.
        #[arg(long)]
        nft: bool,
        #[arg(long)]
        token_2022: bool,
        /// Keep a freeze authority.
        #[arg(long)]
        freeze: bool,
        #[arg(long)]
        revoke_mint: bool,
        #[arg(long)]
        immutable: bool,
    },

    /// Permanently revoke a mint's authority.
    Revoke {
        mint: String,
        #[arg(value_enum)]
        authority: AuthorityArg,
    },

    /// Constant-product swap quote.
    SwapQuote {
        reserve_in: u64,
        reserve_out: u64,
        amount_in: u64,
        #[arg(long, default_value = "30")]
        fee_bps: u16,
        #[arg(long, default_value = "50")]
        slippage_bps: u16,
    },

    /// Pin a file to IPFS.
    PinFile { path: PathBuf },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum AuthorityArg {
    Mint,
    Freeze,
}

impl From<AuthorityArg> for AuthorityType {
    fn from(arg: AuthorityArg) -> Self {
        match arg {
            AuthorityArg::Mint => AuthorityType::MintTokens,
            AuthorityArg::Freeze => AuthorityType::FreezeAccount,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.json_logs);

    let mut config = ClientConfig::from_env().context("Invalid environment configuration")?;
    if let Some(network) = cli.network {
        config.network = network;
        config.rpc_url = network.default_rpc_url().to_string();
    }
    if let Some(url) = &cli.rpc_url {
        config.rpc_url = url.clone();
    }
    if let Some(path) = &cli.keypair {
        config.keypair_path = path.clone();
    }
    debug!(network = %config.network, rpc = %config.rpc_url, "configuration loaded");

    let options = SubmitOptions {
        max_attempts: cli.max_attempts,
        confirm_timeout: Duration::from_secs(cli.confirm_timeout),
    };

    let rpc = HttpRpcClient::new(config.rpc_url.clone()).context("Failed to build RPC client")?;
    let app = App {
        config,
        rpc,
        options,
    };

    run(&app, cli.command).await
}

struct App {
    config: ClientConfig,
    rpc: HttpRpcClient,
    options: SubmitOptions,
}

impl App {
    fn signer(&self) -> Result<KeypairSigner> {
        KeypairSigner::from_file(&self.config.keypair_path).with_context(|| {
            format!(
                "Failed to load keypair {}",
                self.config.keypair_path.display()
            )
        })
    }

    fn fetcher(&self) -> Result<HttpMetadataFetcher> {
        HttpMetadataFetcher::new(self.config.ipfs_gateway.clone())
            .context("Failed to build metadata fetcher")
    }

    fn pinning(&self) -> Result<PinningClient> {
        PinningClient::new(self.config.pinning.as_ref(), self.config.ipfs_gateway.clone())
            .context("Pinning is not configured")
    }

    /// `explicit` when given, the signer's address otherwise.
    fn address_or_signer(&self, explicit: Option<&str>) -> Result<[u8; 32]> {
        match explicit {
            Some(address) => parse_address(address),
            None => Ok(self.signer()?.pubkey()),
        }
    }
}

async fn run(ctx: &App, command: Command) -> Result<()> {
    let rpc: &dyn LedgerRpc = &ctx.rpc;

    match command {
        Command::TokenInfo { mint } => {
            let mint = parse_address(&mint)?;
            let fetcher = ctx.fetcher()?;
            match get_token_data(rpc, &fetcher, &mint).await? {
                Some(summary) => print_json(&summary),
                None => {
                    info!("mint has 0 decimals and supply 1, treating it as an NFT");
                    print_json(&get_token_metadata(rpc, &fetcher, &mint).await?)
                }
            }
        }

        Command::Metadata { mint } => {
            let mint = parse_address(&mint)?;
            let fetcher = ctx.fetcher()?;
            print_json(&get_token_metadata(rpc, &fetcher, &mint).await?)
        }

        Command::Balance { address } => {
            let address = ctx.address_or_signer(address.as_deref())?;
            let lamports = rpc.get_balance(&address).await?;
            print_json(&json!({
                "address": bytes_to_address(&address),
                "lamports": lamports,
                "sol": ui_amount(lamports, SOL_DECIMALS),
            }))
        }

        Command::Tokens { owner, nfts } => {
            let owner = ctx.address_or_signer(owner.as_deref())?;
            let accounts = list_owner_tokens(rpc, &owner).await?;
            if nfts {
                print_json(&nft_holdings(&accounts))
            } else {
                print_json(&accounts)
            }
        }

        Command::Airdrop { sol, to } => {
            if !ctx.config.network.supports_airdrop() {
                bail!("airdrops are not available on {}", ctx.config.network);
            }
            let address = ctx.address_or_signer(to.as_deref())?;
            let lamports = raw_amount(sol, SOL_DECIMALS)?;
            let receipt = request_airdrop(rpc, &address, lamports, &ctx.options).await?;
            print_receipt(&receipt)
        }

        Command::Transfer { to, sol } => {
            let signer = ctx.signer()?;
            let request = TransferRequest {
                sender: signer.pubkey(),
                recipient: parse_address(&to)?,
                amount: raw_amount(sol, SOL_DECIMALS)?,
            };
            let receipt = transfer_sol(rpc, &signer, &request, &ctx.options).await?;
            print_receipt(&receipt)
        }

        Command::TransferToken { mint, to, amount } => {
            let signer = ctx.signer()?;
            let mint = parse_address(&mint)?;
            let (state, _) = get_mint(rpc, &mint).await?;
            let request = TokenTransferRequest {
                sender: signer.pubkey(),
                recipient: parse_address(&to)?,
                mint,
                amount: raw_amount(amount, state.decimals)?,
            };
            let receipt = transfer_tokens(rpc, &signer, &request, &ctx.options).await?;
            print_receipt(&receipt)
        }

        Command::Wrap { sol } => {
            let signer = ctx.signer()?;
            let lamports = raw_amount(sol, SOL_DECIMALS)?;
            print_receipt(&wrap_sol(rpc, &signer, lamports, &ctx.options).await?)
        }

        Command::Unwrap => {
            let signer = ctx.signer()?;
            print_receipt(&unwrap_sol(rpc, &signer, &ctx.options).await?)
        }

        Command::CreateToken {
            name,
            symbol,
            decimals,
            supply,
            uri,
            image,
            description,
            seller_fee_bps,
            nft,
            token_2022,
            freeze,
            revoke_mint,
            immutable,
        } => {
            let signer = ctx.signer()?;

            let uri = match (uri, image) {
                (Some(uri), _) => uri,
                (None, Some(path)) => {
                    let pinning = ctx.pinning()?;
                    let bytes = tokio::fs::read(&path)
                        .await
                        .with_context(|| format!("Failed to read {}", path.display()))?;
                    let image_name = path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| "image".to_string());
                    let pinned = pinning
                        .upload_token_metadata(TokenMetadataUpload {
                            name: name.clone(),
                            symbol: symbol.clone(),
                            description,
                            image_name,
                            image: bytes,
                            attributes: Vec::new(),
                            seller_fee_basis_points: Some(seller_fee_bps),
                        })
                        .await?;
                    info!(uri = %pinned.gateway_url, "metadata pinned");
                    pinned.gateway_url
                }
                (None, None) => String::new(),
            };

            let mut params = if nft {
                CreateTokenParams::nft(name, symbol, uri, seller_fee_bps)
            } else {
                let initial_supply = raw_amount(supply, decimals)?;
                let mut params =
                    CreateTokenParams::fungible(name, symbol, uri, decimals, initial_supply);
                params.seller_fee_basis_points = seller_fee_bps;
                params.revoke_mint_authority = revoke_mint;
                params
            };
            if token_2022 {
                params.program = TokenProgram::Token2022;
            }
            params.freeze_authority = freeze;
            params.is_mutable = !immutable;

            let mint = SolKeypair::generate();
            let created = create_token(rpc, &signer, &mint, &params, &ctx.options).await?;
            print_json(&created)
        }

        Command::Revoke { mint, authority } => {
            let signer = ctx.signer()?;
            let mint = parse_address(&mint)?;
            let receipt =
                revoke_authority(rpc, &signer, &mint, authority.into(), &ctx.options).await?;
            print_receipt(&receipt)
        }

        Command::SwapQuote {
            reserve_in,
            reserve_out,
            amount_in,
            fee_bps,
            slippage_bps,
        } => print_json(&quote_swap(
            reserve_in,
            reserve_out,
            amount_in,
            fee_bps,
            slippage_bps,
        )?),

        Command::PinFile { path } => {
            let pinning = ctx.pinning()?;
            let bytes = tokio::fs::read(&path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "file".to_string());
            print_json(&pinning.pin_file(&name, bytes).await?)
        }
    }
}

fn parse_address(address: &str) -> Result<[u8; 32]> {
    address_to_bytes(address).with_context(|| format!("Invalid address '{address}'"))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_receipt(receipt: &TransactionReceipt) -> Result<()> {
    print_json(&json!({
        "signature": receipt.signature,
        "slot": receipt.confirmation.slot,
        "confirmationStatus": receipt.confirmation.confirmation_status,
        "attempts": receipt.attempts.len(),
    }))
}

/// Initialize tracing subscriber.
fn init_tracing(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json {
        fmt()
            .with_env_filter(filter)
            .json()
            .with_writer(std::io::stderr)
            .init();
    } else {
        fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }
}
