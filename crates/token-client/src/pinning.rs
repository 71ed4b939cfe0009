//! Content pinning through a Pinata-style HTTP API.
//!
//! Uploads images and metadata documents and returns their content hash
//! together with a gateway URL. Credentials are checked when the client is
//! built, before any request is made.

use std::time::Duration;

use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, instrument};

use crate::config::PinningCredentials;
use crate::error::{ClientError, ClientResult};
use crate::offchain::{join_gateway, Attribute, OffChainMetadata};

pub const DEFAULT_PINNING_API: &str = "https://api.pinata.cloud";
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(120);

/// A pinned object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PinnedContent {
    pub cid: String,
    pub gateway_url: String,
}

#[derive(Debug, Deserialize)]
struct PinResponse {
    #[serde(rename = "IpfsHash")]
    ipfs_hash: String,
}

/// Image and descriptive fields for [`PinningClient::upload_token_metadata`].
#[derive(Debug, Clone)]
pub struct TokenMetadataUpload {
    pub name: String,
    pub symbol: String,
    pub description: String,
    pub image_name: String,
    pub image: Vec<u8>,
    pub attributes: Vec<Attribute>,
    pub seller_fee_basis_points: Option<u16>,
}

pub struct PinningClient {
    http: reqwest::Client,
    api_base: String,
    gateway: String,
    credentials: PinningCredentials,
}

impl std::fmt::Debug for PinningClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PinningClient")
            .field("api_base", &self.api_base)
            .field("gateway", &self.gateway)
            .finish_non_exhaustive()
    }
}

impl PinningClient {
    /// Fails with [`ClientError::Config`] when credentials are missing.
    pub fn new(credentials: Option<&PinningCredentials>, gateway: impl Into<String>) -> ClientResult<Self> {
        Self::with_api_base(credentials, gateway, DEFAULT_PINNING_API)
    }

    pub fn with_api_base(
        credentials: Option<&PinningCredentials>,
        gateway: impl Into<String>,
        api_base: impl Into<String>,
    ) -> ClientResult<Self> {
        let credentials = credentials.cloned().ok_or_else(|| {
            ClientError::Config(
                "pinning requires PINATA_API_KEY and PINATA_SECRET_API_KEY".into(),
            )
        })?;
        if credentials.api_key.trim().is_empty() || credentials.secret_api_key.trim().is_empty() {
            return Err(ClientError::Config("pinning credentials are empty".into()));
        }

        let http = reqwest::Client::builder()
            .timeout(UPLOAD_TIMEOUT)
            .build()
            .map_err(|e| ClientError::Pinning(e.to_string()))?;

        let api_base: String = api_base.into();
        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            gateway: gateway.into(),
            credentials,
        })
    }

    /// Gateway URL for a content hash.
    pub fn gateway_url(&self, cid: &str) -> String {
        join_gateway(&self.gateway, cid)
    }

    /// Pin raw bytes as a file.
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn pin_file(&self, name: &str, bytes: Vec<u8>) -> ClientResult<PinnedContent> {
        let part = Part::bytes(bytes).file_name(name.to_string());
        let form = Form::new()
            .part("file", part)
            .text("pinataMetadata", json!({ "name": name }).to_string());

        let request = self
            .authorized(&format!("{}/pinning/pinFileToIPFS", self.api_base))
            .multipart(form);
        self.send(request).await
    }

    /// Pin a JSON document.
    #[instrument(skip(self, content))]
    pub async fn pin_json(&self, name: &str, content: &Value) -> ClientResult<PinnedContent> {
        let body = json!({
            "pinataContent": content,
            "pinataMetadata": { "name": name },
        });
        let request = self
            .authorized(&format!("{}/pinning/pinJSONToIPFS", self.api_base))
            .json(&body);
        self.send(request).await
    }

    /// Pin the image, then a metadata document pointing at it. The returned
    /// gateway URL is the metadata URI for the mint.
    pub async fn upload_token_metadata(
        &self,
        upload: TokenMetadataUpload,
    ) -> ClientResult<PinnedContent> {
        let image = self.pin_file(&upload.image_name, upload.image.clone()).await?;
        let document = metadata_document(&upload, &image.gateway_url);
        let value =
            serde_json::to_value(&document).map_err(|e| ClientError::Pinning(e.to_string()))?;
        self.pin_json(&format!("{}-metadata.json", upload.symbol), &value)
            .await
    }

    fn authorized(&self, url: &str) -> reqwest::RequestBuilder {
        self.http
            .post(url)
            .header("pinata_api_key", &self.credentials.api_key)
            .header("pinata_secret_api_key", &self.credentials.secret_api_key)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> ClientResult<PinnedContent> {
        let response = request
            .send()
            .await
            .map_err(|e| ClientError::Pinning(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Pinning(format!("HTTP {status}: {body}")));
        }

        let pinned: PinResponse = response
            .json()
            .await
            .map_err(|e| ClientError::Pinning(format!("unexpected response: {e}")))?;

        let content = PinnedContent {
            gateway_url: self.gateway_url(&pinned.ipfs_hash),
            cid: pinned.ipfs_hash,
        };
        info!(cid = %content.cid, "content pinned");
        Ok(content)
    }
}

/// Off-chain metadata document for a new token.
pub fn metadata_document(upload: &TokenMetadataUpload, image_url: &str) -> OffChainMetadata {
    OffChainMetadata {
        name: Some(upload.name.clone()),
        symbol: Some(upload.symbol.clone()),
        description: Some(upload.description.clone()),
        image: Some(image_url.to_string()),
        attributes: (!upload.attributes.is_empty()).then(|| upload.attributes.clone()),
        seller_fee_basis_points: upload.seller_fee_basis_points,
    }
}
