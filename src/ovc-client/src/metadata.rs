//! Content-addressed storage of payment and rejection metadata.

use std::fmt;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::abi::constants::IPFS_URI_PREFIX;
use crate::errors::UploadError;

/// CIDv0 (`Qm` + base58) or CIDv1 in base32 (`b...`).
static CID: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^(Qm[1-9A-HJ-NP-Za-km-z]{44}|b[a-z2-7]{58,})$"));

/// Identifier of an uploaded document.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ContentId(String);

impl ContentId {
    pub fn parse(raw: &str) -> Result<Self, UploadError> {
        let raw = raw.trim();
        let pattern = CID.as_ref().map_err(|e| UploadError::Pattern(e.clone()))?;
        if pattern.is_match(raw) {
            Ok(Self(raw.to_string()))
        } else {
            Err(UploadError::InvalidContentId(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `ipfs://<cid>`, the form stored on chain.
    pub fn uri(&self) -> String {
        format!("{IPFS_URI_PREFIX}{}", self.0)
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn upload(&self, document: &Value) -> Result<ContentId, UploadError>;
}

#[derive(Deserialize)]
struct AddResponse {
    #[serde(rename = "Hash")]
    hash: String,
}

/// Kubo-compatible IPFS HTTP API client.
#[derive(Clone, Debug)]
pub struct IpfsClient {
    api_url: String,
    http: reqwest::Client,
}

impl IpfsClient {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self::with_client(api_url, reqwest::Client::new())
    }

    pub fn with_client(api_url: impl Into<String>, http: reqwest::Client) -> Self {
        Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            http,
        }
    }
}

#[async_trait]
impl MetadataStore for IpfsClient {
    async fn upload(&self, document: &Value) -> Result<ContentId, UploadError> {
        let body = serde_json::to_vec(document)?;
        let form = Form::new().part("file", Part::bytes(body).file_name("metadata.json"));

        let response = self
            .http
            .post(format!("{}/api/v0/add", self.api_url))
            .query(&[("pin", "true")])
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), %body, "ipfs upload rejected");
            return Err(UploadError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let added: AddResponse = response.json().await?;
        let cid = ContentId::parse(&added.hash)?;
        info!(%cid, "uploaded metadata to ipfs");
        Ok(cid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    const CID_V0: &str = "QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG";

    #[test]
    fn content_id_validation() {
        assert!(CID.is_ok(), "content id pattern must compile");
        assert!(ContentId::parse(CID_V0).is_ok());
        assert!(ContentId::parse(
            "bafybeigdyrzt5sfp7udm7hu76uh7y26nf3efuylqabf3oclgtqy55fbzdi"
        )
        .is_ok());
        assert!(matches!(
            ContentId::parse("not-a-cid"),
            Err(UploadError::InvalidContentId(_))
        ));
        assert_eq!(
            ContentId::parse(CID_V0).unwrap().uri(),
            format!("ipfs://{CID_V0}")
        );
    }

    #[tokio::test]
    async fn upload_posts_and_returns_cid() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v0/add")
            .match_query(Matcher::UrlEncoded("pin".into(), "true".into()))
            .match_body(Matcher::Regex("Payment 1".into()))
            .with_status(200)
            .with_body(format!(r#"{{"Name":"metadata.json","Hash":"{CID_V0}","Size":"64"}}"#))
            .create_async()
            .await;

        let client = IpfsClient::new(server.url());
        let cid = client
            .upload(&json!({"title": "Payment 1", "description": "done"}))
            .await
            .unwrap();
        assert_eq!(cid.as_str(), CID_V0);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn upload_surfaces_storage_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/v0/add")
            .match_query(Matcher::Any)
            .with_status(500)
            .with_body("node offline")
            .create_async()
            .await;

        let err = IpfsClient::new(server.url())
            .upload(&json!({"reason": "x"}))
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::Status { status: 500, .. }));
    }

    #[tokio::test]
    async fn upload_rejects_malformed_hash() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/v0/add")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"Hash":"garbage"}"#)
            .create_async()
            .await;

        let err = IpfsClient::new(server.url())
            .upload(&json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::InvalidContentId(_)));
    }
}
