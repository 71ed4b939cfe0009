//! Client configuration read from the environment.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::ClientError;

pub const DEFAULT_IPFS_GATEWAY: &str = "https://gateway.pinata.cloud/ipfs/";
const DEFAULT_KEYPAIR_PATH: &str = ".config/solana/id.json";

/// Solana cluster selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Network {
    Mainnet,
    #[default]
    Devnet,
    Testnet,
    Localnet,
}

impl Network {
    pub fn default_rpc_url(&self) -> &'static str {
        match self {
            Network::Mainnet => "https://api.mainnet-beta.solana.com",
            Network::Devnet => "https://api.devnet.solana.com",
            Network::Testnet => "https://api.testnet.solana.com",
            Network::Localnet => "http://127.0.0.1:8899",
        }
    }

    /// Airdrops are only served off mainnet.
    pub fn supports_airdrop(&self) -> bool {
        !matches!(self, Network::Mainnet)
    }
}

impl FromStr for Network {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mainnet" | "mainnet-beta" => Ok(Network::Mainnet),
            "devnet" => Ok(Network::Devnet),
            "testnet" => Ok(Network::Testnet),
            "localnet" | "localhost" => Ok(Network::Localnet),
            other => Err(ClientError::Config(format!(
                "unknown network '{other}', use mainnet, devnet, testnet or localnet"
            ))),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Network::Mainnet => "mainnet",
            Network::Devnet => "devnet",
            Network::Testnet => "testnet",
            Network::Localnet => "localnet",
        };
        f.write_str(name)
    }
}

/// API key pair for the pinning service.
#[derive(Clone)]
pub struct PinningCredentials {
    pub api_key: String,
    pub secret_api_key: String,
}

impl fmt::Debug for PinningCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PinningCredentials")
            .field("api_key", &"****")
            .field("secret_api_key", &"****")
            .finish()
    }
}

/// Resolved client settings.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub network: Network,
    pub rpc_url: String,
    pub ipfs_gateway: String,
    pub keypair_path: PathBuf,
    pub pinning: Option<PinningCredentials>,
}

impl ClientConfig {
    /// Read `QTG_*` and `PINATA_*` variables from the process environment.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ClientError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let network = match get("QTG_NETWORK") {
            Some(value) => value.parse()?,
            None => Network::default(),
        };

        let rpc_url = get("QTG_RPC_URL").unwrap_or_else(|| network.default_rpc_url().to_string());

        let mut ipfs_gateway =
            get("QTG_IPFS_GATEWAY").unwrap_or_else(|| DEFAULT_IPFS_GATEWAY.to_string());
        if !ipfs_gateway.ends_with('/') {
            ipfs_gateway.push('/');
        }

        let keypair_path = match get("QTG_KEYPAIR") {
            Some(path) => PathBuf::from(path),
            None => get("HOME")
                .map(PathBuf::from)
                .unwrap_or_default()
                .join(DEFAULT_KEYPAIR_PATH),
        };

        let pinning = match (get("PINATA_API_KEY"), get("PINATA_SECRET_API_KEY")) {
            (Some(api_key), Some(secret_api_key)) => Some(PinningCredentials {
                api_key,
                secret_api_key,
            }),
            _ => None,
        };

        Ok(Self {
            network,
            rpc_url,
            ipfs_gateway,
            keypair_path,
            pinning,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<ClientConfig, ClientError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ClientConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_to_devnet() {
        let cfg = config(&[("HOME", "/home/alice")]).unwrap();
        assert_eq!(cfg.network, Network::Devnet);
        assert_eq!(cfg.rpc_url, "https://api.devnet.solana.com");
        assert_eq!(cfg.ipfs_gateway, DEFAULT_IPFS_GATEWAY);
        assert_eq!(
            cfg.keypair_path,
            PathBuf::from("/home/alice/.config/solana/id.json")
        );
        assert!(cfg.pinning.is_none());
    }

    #[test]
    fn rpc_override_wins() {
        let cfg = config(&[
            ("QTG_NETWORK", "mainnet"),
            ("QTG_RPC_URL", "https://rpc.example.com"),
        ])
        .unwrap();
        assert_eq!(cfg.network, Network::Mainnet);
        assert_eq!(cfg.rpc_url, "https://rpc.example.com");
    }

    #[test]
    fn gateway_gets_trailing_slash() {
        let cfg = config(&[("QTG_IPFS_GATEWAY", "https://ipfs.io/ipfs")]).unwrap();
        assert_eq!(cfg.ipfs_gateway, "https://ipfs.io/ipfs/");
    }

    #[test]
    fn pinning_needs_both_keys() {
        assert!(config(&[("PINATA_API_KEY", "k")]).unwrap().pinning.is_none());
        let cfg = config(&[
            ("PINATA_API_KEY", "key123"),
            ("PINATA_SECRET_API_KEY", "topsecret"),
        ])
        .unwrap();
        let creds = cfg.pinning.unwrap();
        assert_eq!(creds.api_key, "key123");
        assert!(!format!("{creds:?}").contains("topsecret"));
    }

    #[test]
    fn unknown_network_is_config_error() {
        let err = config(&[("QTG_NETWORK", "moonnet")]).unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));
    }

    #[test]
    fn network_display_parses_back() {
        for network in [
            Network::Mainnet,
            Network::Devnet,
            Network::Testnet,
            Network::Localnet,
        ] {
            assert_eq!(network.to_string().parse::<Network>().unwrap(), network);
        }
        assert!(!Network::Mainnet.supports_airdrop());
    }
}
