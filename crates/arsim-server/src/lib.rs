//! Local development server for apps built on the Arweave network.
//!
//! Serves the latest bundle of an HTML entry at `/app` with live reload,
//! emulates the node API for transactions, wallets and ARQL against a local
//! store, and proxies every other request to a real node.

pub mod config;
pub mod error;
pub mod handler;
pub mod livereload;
pub mod network;
pub mod router;
pub mod scheduler;
pub mod server;
pub mod session;
pub mod watcher;

pub use config::{ArqlConfig, ServeConfig, WalletsConfig};
pub use error::{ServerError, ServerResult};
pub use livereload::{ClientMessage, LiveReloadEvent};
pub use network::{HttpNetworkClient, NetworkClient, NetworkInfo, RawResponse};
pub use router::{build_router, Endpoint};
pub use scheduler::{try_start_build, BuildRun};
pub use server::ArsimServer;
pub use session::Session;

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::Arc;

    use arsim_types::encoding::b64url_encode;
    use arsim_types::{sender_address, Address, TxId, Winston};
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use axum::Router;
    use serde_json::{json, Value};
    use sha2::{Digest, Sha256};
    use tower::util::ServiceExt;

    use crate::network::tests::StaticNetwork;
    use crate::session::tests::{build, session_with};

    pub(crate) struct SignedBody {
        pub body: Vec<u8>,
        pub id: TxId,
        pub from: Address,
    }

    /// A body whose id is the digest of its signature, as verification expects.
    pub(crate) fn signed_body(
        seed: u32,
        owner: u32,
        reward: &str,
        quantity: &str,
        tags: &[(&str, &str)],
        data: &[u8],
    ) -> SignedBody {
        transfer_body(seed, owner, reward, quantity, "", tags, data)
    }

    pub(crate) fn transfer_body(
        seed: u32,
        owner: u32,
        reward: &str,
        quantity: &str,
        target: &str,
        tags: &[(&str, &str)],
        data: &[u8],
    ) -> SignedBody {
        let signature = format!("signature-{seed}");
        let id = TxId::parse(b64url_encode(Sha256::digest(signature.as_bytes()))).unwrap();
        let owner = b64url_encode(format!("owner-{owner}"));
        let from = sender_address(&owner).unwrap();
        let tags: Vec<Value> = tags
            .iter()
            .map(|(n, v)| json!({"name": b64url_encode(n), "value": b64url_encode(v)}))
            .collect();
        let body = json!({
            "format": 2,
            "id": id.as_str(),
            "last_tx": "",
            "owner": owner,
            "tags": tags,
            "target": target,
            "quantity": quantity,
            "data": b64url_encode(data),
            "data_size": data.len().to_string(),
            "reward": reward,
            "signature": b64url_encode(signature),
        });
        SignedBody {
            body: serde_json::to_vec(&body).unwrap(),
            id,
            from,
        }
    }

    fn config_with_balance(address: &Address, balance: u64) -> ServeConfig {
        let mut config = ServeConfig::default();
        config.wallets.balances.insert(address.clone(), Winston::from(balance));
        config
    }

    fn harness(config: ServeConfig, network: StaticNetwork) -> (Router, Arc<Session>) {
        let session = Arc::new(session_with(config, network, Path::new("index.html")));
        (build_router(session.clone()), session)
    }

    async fn send(app: &Router, method: Method, uri: &str, body: impl Into<Body>) -> (StatusCode, String) {
        let response = app
            .clone()
            .oneshot(Request::builder().method(method).uri(uri).body(body.into()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8_lossy(&bytes).into_owned())
    }

    async fn get(app: &Router, uri: &str) -> (StatusCode, String) {
        send(app, Method::GET, uri, Body::empty()).await
    }

    #[tokio::test]
    async fn accept_then_query_balance_and_status() {
        let tx = signed_body(1, 1, "1000", "0", &[("App-Name", "demo")], b"hi");
        let (app, _) = harness(config_with_balance(&tx.from, 5000), StaticNetwork::new());

        let (status, body) = send(&app, Method::POST, "/tx", tx.body.clone()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "OK");

        let (status, body) = get(&app, &format!("/wallet/{}/balance", tx.from)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "4000");

        let (_, body) = get(&app, &format!("/wallet/{}/last_tx", tx.from)).await;
        assert_eq!(body, tx.id.as_str());

        let (status, body) = get(&app, &format!("/tx/{}/status", tx.id)).await;
        assert_eq!(status, StatusCode::OK);
        let status: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(
            status,
            json!({"block_indep_hash": "block-100", "block_height": 110, "number_of_confirmations": 0})
        );
    }

    #[tokio::test]
    async fn status_without_block_is_not_found() {
        let tx = signed_body(2, 1, "10", "0", &[], b"");
        let (app, _) = harness(config_with_balance(&tx.from, 100), StaticNetwork::new().offline());

        let (status, _) = send(&app, Method::POST, "/tx", tx.body.clone()).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = get(&app, &format!("/tx/{}/status", tx.id)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn resubmission_is_already_reported() {
        let tx = signed_body(3, 1, "10", "0", &[], b"");
        let (app, session) = harness(config_with_balance(&tx.from, 100), StaticNetwork::new());

        send(&app, Method::POST, "/tx", tx.body.clone()).await;
        let (status, body) = send(&app, Method::POST, "/tx", tx.body.clone()).await;
        assert_eq!(status, StatusCode::ALREADY_REPORTED);
        assert_eq!(body, "Transaction already processed.");
        assert_eq!(session.ledger().wallets().balance(&tx.from), Winston::from(90));
    }

    #[tokio::test]
    async fn rejected_submissions() {
        let tx = signed_body(4, 1, "10", "0", &[], b"");
        let (app, _) = harness(config_with_balance(&tx.from, 100), StaticNetwork::new().rejecting());
        let (status, body) = send(&app, Method::POST, "/tx", tx.body.clone()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "Transaction verification failed.");

        let (app, _) = harness(ServeConfig::default(), StaticNetwork::new());
        let (status, _) = send(&app, Method::POST, "/tx", "{not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        // Unfunded sender.
        let (status, _) = send(&app, Method::POST, "/tx", tx.body.clone()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = get(&app, &format!("/tx/{}", tx.id)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "unknown id is proxied, and the proxy is offline");
    }

    #[tokio::test]
    async fn transfer_credits_target() {
        let target = sender_address(&b64url_encode("owner-9")).unwrap();
        let tx = transfer_body(5, 1, "10", "250", target.as_str(), &[], b"");
        let (app, _) = harness(config_with_balance(&tx.from, 1000), StaticNetwork::new());

        send(&app, Method::POST, "/tx", tx.body.clone()).await;
        assert_eq!(get(&app, &format!("/wallet/{}/balance", tx.from)).await.1, "740");
        assert_eq!(get(&app, &format!("/wallet/{target}/balance")).await.1, "250");
    }

    #[tokio::test]
    async fn unknown_wallets_read_as_empty() {
        let (app, _) = harness(ServeConfig::default(), StaticNetwork::new());
        let addr = "z".repeat(43);
        assert_eq!(get(&app, &format!("/wallet/{addr}/balance")).await, (StatusCode::OK, "0".into()));
        assert_eq!(get(&app, &format!("/wallet/{addr}/last_tx")).await, (StatusCode::OK, String::new()));
    }

    #[tokio::test]
    async fn stored_transaction_reads() {
        let tx = signed_body(6, 1, "0", "0", &[("Content-Type", "text/plain")], b"hello world");
        let (app, _) = harness(ServeConfig::default(), StaticNetwork::new());
        send(&app, Method::POST, "/tx", tx.body.clone()).await;

        let (status, body) = get(&app, &format!("/tx/{}", tx.id)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_bytes(), tx.body.as_slice());

        assert_eq!(get(&app, &format!("/{}", tx.id)).await.1, "hello world");
        assert_eq!(get(&app, &format!("/tx/{}/reward", tx.id)).await.1, "0");
        assert_eq!(get(&app, &format!("/tx/{}/format", tx.id)).await.1, "2");
        assert_eq!(get(&app, &format!("/tx/{}/nope", tx.id)).await.0, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn serve_data_uses_content_type_tag() {
        let typed = signed_body(7, 1, "0", "0", &[("Content-Type", "text/html")], b"<p>");
        let untyped = signed_body(8, 1, "0", "0", &[], b"raw");
        let (app, _) = harness(ServeConfig::default(), StaticNetwork::new());
        send(&app, Method::POST, "/tx", typed.body.clone()).await;
        send(&app, Method::POST, "/tx", untyped.body.clone()).await;

        for (id, expected) in [(&typed.id, "text/html"), (&untyped.id, "application/octet-stream")] {
            let response = app
                .clone()
                .oneshot(Request::builder().uri(format!("/{id}")).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.headers()[header::CONTENT_TYPE], expected);
        }
    }

    #[tokio::test]
    async fn arql_over_local_index() {
        let a = signed_body(10, 1, "0", "0", &[("App-Name", "demo"), ("Type", "post")], b"");
        let b = signed_body(11, 2, "0", "0", &[("App-Name", "demo"), ("Type", "comment")], b"");
        let (app, _) = harness(ServeConfig::default(), StaticNetwork::new());
        send(&app, Method::POST, "/tx", a.body.clone()).await;
        send(&app, Method::POST, "/tx", b.body.clone()).await;

        let query = json!({
            "op": "and",
            "expr1": {"op": "equals", "expr1": "App-Name", "expr2": "demo"},
            "expr2": {"op": "equals", "expr1": "from", "expr2": a.from.as_str()},
        });
        let (status, body) = send(&app, Method::POST, "/arql", query.to_string()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(serde_json::from_str::<Vec<String>>(&body).unwrap(), vec![a.id.to_string()]);

        let (status, body) = send(&app, Method::POST, "/arql", "nope").await;
        assert_eq!((status, body.as_str()), (StatusCode::BAD_REQUEST, "\"Invalid json\""));
        let (status, body) = send(&app, Method::POST, "/arql", r#"{"op":"equals","expr1":1}"#).await;
        assert_eq!((status, body.as_str()), (StatusCode::BAD_REQUEST, "\"Invalid arql query syntax\""));
    }

    #[tokio::test]
    async fn arql_merges_live_results_when_enabled() {
        let a = signed_body(12, 1, "0", "0", &[("App-Name", "demo")], b"");
        let remote_only = "r".repeat(43);
        let upstream = json!([a.id.as_str(), remote_only]).to_string();
        let mut config = ServeConfig::default();
        config.arql.merge_external = true;
        let (app, _) = harness(config, StaticNetwork::new().responding(200, "application/json", &upstream));
        send(&app, Method::POST, "/tx", a.body.clone()).await;

        let query = json!({"op": "equals", "expr1": "App-Name", "expr2": "demo"});
        let (_, body) = send(&app, Method::POST, "/arql", query.to_string()).await;
        assert_eq!(
            serde_json::from_str::<Vec<String>>(&body).unwrap(),
            vec![a.id.to_string(), remote_only]
        );
    }

    #[tokio::test]
    async fn arql_merge_degrades_to_local() {
        let a = signed_body(13, 1, "0", "0", &[("App-Name", "demo")], b"");
        let mut config = ServeConfig::default();
        config.arql.merge_external = true;
        let (app, _) = harness(config, StaticNetwork::new().responding(502, "text/plain", "bad gateway"));
        send(&app, Method::POST, "/tx", a.body.clone()).await;

        let query = json!({"op": "equals", "expr1": "App-Name", "expr2": "demo"});
        let (status, body) = send(&app, Method::POST, "/arql", query.to_string()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(serde_json::from_str::<Vec<String>>(&body).unwrap(), vec![a.id.to_string()]);
    }

    #[tokio::test]
    async fn unmatched_requests_are_proxied_verbatim() {
        let network = Arc::new(StaticNetwork::new().responding(404, "text/plain", "Not Found."));
        let session = Arc::new(Session::new(
            ServeConfig::default(),
            "index.html",
            arsim_store::Ledger::new(
                Arc::new(arsim_store::InMemoryTransactionStore::new()),
                arsim_store::WalletLedger::new(),
            ),
            network.clone(),
            arsim_build::Bundler::new(Arc::new(crate::session::tests::NoFetch)),
        ));
        let app = build_router(session);

        let (status, body) = send(&app, Method::PUT, "/peers?limit=5", "payload").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, "Not Found.");
        let requests = network.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].0, Method::PUT);
        assert_eq!(requests[0].1, "peers?limit=5");
        assert_eq!(requests[0].2, "payload");
    }

    #[tokio::test]
    async fn app_waits_for_first_build() {
        let (app, session) = harness(ServeConfig::default(), StaticNetwork::new());
        let pending = tokio::spawn({
            let app = app.clone();
            async move { get(&app, "/app").await }
        });
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(!pending.is_finished());

        session.install_build(build(7, "<html><body>hi</body></html>"));
        let (status, body) = pending.await.unwrap();
        assert_eq!(status, StatusCode::OK);
        assert!(body.starts_with("<html><body>hi</body></html><script>"));
        assert!(body.contains("ws://localhost:1985"));
    }

    #[tokio::test]
    async fn app_and_favicon_content_types() {
        let (app, session) = harness(ServeConfig::default(), StaticNetwork::new());
        session.install_build(build(1, "<p></p>"));
        for (uri, expected) in [("/app", "text/html"), ("/favicon.ico", "image/x-icon")] {
            let response = app
                .clone()
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(response.headers()[header::CONTENT_TYPE], expected);
        }
    }
}
