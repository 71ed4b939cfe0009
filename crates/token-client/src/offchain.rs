//! Off-chain metadata documents and the capability that fetches them.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{ClientError, ClientResult, RpcError};

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// JSON document referenced by an on-chain metadata URI.
///
/// Every field is optional; absent fields serialize as `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OffChainMetadata {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub attributes: Option<Vec<Attribute>>,
    #[serde(default)]
    pub seller_fee_basis_points: Option<u16>,
}

/// NFT trait entry. Values may be strings or numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    #[serde(default)]
    pub trait_type: Option<String>,
    #[serde(default)]
    pub value: Value,
}

/// Retrieves off-chain metadata documents.
#[async_trait]
pub trait MetadataFetcher: Send + Sync {
    async fn fetch(&self, uri: &str) -> ClientResult<OffChainMetadata>;
}

/// Plain HTTPS fetcher with `ipfs://` and `ar://` rewriting.
pub struct HttpMetadataFetcher {
    http: reqwest::Client,
    ipfs_gateway: String,
}

impl HttpMetadataFetcher {
    pub fn new(ipfs_gateway: impl Into<String>) -> ClientResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(RpcError::from)?;
        Ok(Self {
            http,
            ipfs_gateway: ipfs_gateway.into(),
        })
    }
}

#[async_trait]
impl MetadataFetcher for HttpMetadataFetcher {
    async fn fetch(&self, uri: &str) -> ClientResult<OffChainMetadata> {
        let url = resolve_uri(uri, &self.ipfs_gateway);
        debug!(%url, "fetching off-chain metadata");

        let response = self.http.get(&url).send().await.map_err(RpcError::from)?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Rpc(RpcError::Http {
                status: status.as_u16(),
            }));
        }
        let document = response.json().await.map_err(RpcError::from)?;
        Ok(document)
    }
}

/// Map content-addressed URIs onto HTTP gateways; other URIs pass through.
pub fn resolve_uri(uri: &str, ipfs_gateway: &str) -> String {
    let uri = uri.trim();
    if let Some(path) = uri.strip_prefix("ipfs://") {
        let path = path.strip_prefix("ipfs/").unwrap_or(path);
        return join_gateway(ipfs_gateway, path);
    }
    if let Some(path) = uri.strip_prefix("ar://") {
        return format!("https://arweave.net/{path}");
    }
    uri.to_string()
}

pub(crate) fn join_gateway(gateway: &str, path: &str) -> String {
    format!("{}/{}", gateway.trim_end_matches('/'), path.trim_start_matches('/'))
}
