//! The upstream network as a capability.
//!
//! The simulator never talks to a real node except through [`NetworkClient`]:
//! block info for stamping accepted transactions, transaction verification,
//! and raw request forwarding for the proxy.

use async_trait::async_trait;
use axum::http::{header, HeaderMap, HeaderName, Method, StatusCode};
use bytes::Bytes;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::debug;

use arsim_types::{BlockRef, SignedTransaction};

use crate::error::{ServerError, ServerResult};

/// The subset of `GET /info` the simulator reads.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInfo {
    pub height: u64,
    /// Hash of the current block.
    pub current: String,
}

impl NetworkInfo {
    pub fn block_ref(&self) -> BlockRef {
        BlockRef {
            id: self.current.clone(),
            height: self.height,
        }
    }
}

/// An upstream response, relayed unchanged.
#[derive(Clone, Debug)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

#[async_trait]
pub trait NetworkClient: Send + Sync {
    async fn get_network_info(&self) -> ServerResult<NetworkInfo>;

    /// Whether the transaction is authentic. Only transactions that pass are stored.
    async fn verify_transaction(&self, tx: &SignedTransaction) -> bool;

    /// Forward a request. `path` is relative to the node root and may carry a query.
    async fn request_raw(
        &self,
        method: Method,
        path: &str,
        headers: &HeaderMap,
        body: Bytes,
    ) -> ServerResult<RawResponse>;
}

/// Headers that describe one connection and must not be forwarded.
const HOP_BY_HOP: &[HeaderName] = &[
    header::CONNECTION,
    header::HOST,
    header::CONTENT_LENGTH,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
    header::TE,
    header::TRAILER,
    header::PROXY_AUTHORIZATION,
];

fn end_to_end(headers: &HeaderMap) -> HeaderMap {
    let mut out = headers.clone();
    for name in HOP_BY_HOP {
        out.remove(name);
    }
    out.remove("keep-alive");
    out
}

/// [`NetworkClient`] over HTTP against a real node.
///
/// Verification checks that the id is the digest of the signature, which
/// catches corrupted or hand-edited bodies; signature cryptography is not
/// reimplemented.
#[derive(Clone)]
pub struct HttpNetworkClient {
    client: reqwest::Client,
    base: Url,
}

impl HttpNetworkClient {
    pub fn new(base: &str) -> ServerResult<Self> {
        Self::with_client(reqwest::Client::new(), base)
    }

    pub fn with_client(client: reqwest::Client, base: &str) -> ServerResult<Self> {
        let mut base = Url::parse(base)
            .map_err(|e| ServerError::Config(format!("invalid network url {base}: {e}")))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self { client, base })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Resolve a request path under the base url. The path never names the
    /// host, so the result always stays on the configured node.
    fn url(&self, path: &str) -> ServerResult<Url> {
        let (path_part, query) = match path.split_once('?') {
            Some((p, q)) => (p, Some(q)),
            None => (path, None),
        };
        let mut url = self.base.clone();
        url.set_path(&format!("{}{}", self.base.path(), path_part.trim_start_matches('/')));
        url.set_query(query);
        if url.origin() != self.base.origin() {
            return Err(ServerError::BadRequest(format!("invalid path {path}")));
        }
        Ok(url)
    }
}

#[async_trait]
impl NetworkClient for HttpNetworkClient {
    async fn get_network_info(&self) -> ServerResult<NetworkInfo> {
        let url = self.url("info")?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| ServerError::Upstream(e.to_string()))?;
        response
            .json()
            .await
            .map_err(|e| ServerError::Upstream(e.to_string()))
    }

    async fn verify_transaction(&self, tx: &SignedTransaction) -> bool {
        tx.id_matches_signature()
    }

    async fn request_raw(
        &self,
        method: Method,
        path: &str,
        headers: &HeaderMap,
        body: Bytes,
    ) -> ServerResult<RawResponse> {
        let url = self.url(path)?;
        debug!(%method, %url, "forwarding request upstream");
        let response = self
            .client
            .request(method, url)
            .headers(end_to_end(headers))
            .body(body)
            .send()
            .await
            .map_err(|e| ServerError::Upstream(e.to_string()))?;

        let status = response.status();
        let headers = end_to_end(response.headers());
        let body = response
            .bytes()
            .await
            .map_err(|e| ServerError::Upstream(e.to_string()))?;
        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}
