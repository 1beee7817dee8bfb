//! Ordered request routing.
//!
//! Routes are tried top to bottom and the first match wins. Several routes
//! only match when the transaction id in the path is already stored; a
//! request that matches nothing is proxied upstream.

use std::sync::{Arc, LazyLock};

use axum::body::{to_bytes, Body};
use axum::extract::State;
use axum::http::{Method, Request};
use axum::response::{IntoResponse, Response};
use axum::Router;
use regex::Regex;
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

use arsim_store::TransactionStore;
use arsim_types::TxId;

use crate::error::ServerError;
use crate::handler;
use crate::session::Session;

/// What a request path resolved to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Endpoint {
    App,
    Favicon,
    PostTransaction,
    GetTransaction,
    ServeData,
    TransactionStatus,
    WalletBalance,
    WalletLastTx,
    TransactionField,
    Arql,
    Proxy,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Gate {
    Always,
    /// The first capture must be the id of a stored transaction.
    Stored,
}

struct Route {
    endpoint: Endpoint,
    method: Method,
    pattern: Regex,
    gate: Gate,
}

/// A resolved route and its path captures.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Matched {
    pub endpoint: Endpoint,
    pub params: Vec<String>,
}

impl Matched {
    pub fn param(&self, index: usize) -> &str {
        self.params.get(index).map_or("", String::as_str)
    }
}

pub struct RouteTable {
    routes: Vec<Route>,
}

static ROUTES: LazyLock<RouteTable> = LazyLock::new(RouteTable::standard);

const ID: &str = "([A-Za-z0-9_-]{43})";

impl RouteTable {
    /// Most specific first.
    pub fn standard() -> Self {
        let table = [
            (Endpoint::App, Method::GET, "^/(?i:app)$".to_string(), Gate::Always),
            (Endpoint::Favicon, Method::GET, r"^/(?i:favicon\.ico)$".into(), Gate::Always),
            (Endpoint::PostTransaction, Method::POST, "^/(?i:tx)$".into(), Gate::Always),
            (Endpoint::GetTransaction, Method::GET, format!("^/(?i:tx)/{ID}$"), Gate::Stored),
            (Endpoint::ServeData, Method::GET, format!("^/{ID}$"), Gate::Stored),
            (Endpoint::TransactionStatus, Method::GET, format!("^/(?i:tx)/{ID}/(?i:status)$"), Gate::Stored),
            (Endpoint::WalletBalance, Method::GET, format!("^/(?i:wallet)/{ID}/(?i:balance)$"), Gate::Always),
            (Endpoint::WalletLastTx, Method::GET, format!("^/(?i:wallet)/{ID}/(?i:last_tx)$"), Gate::Always),
            (Endpoint::TransactionField, Method::GET, format!("^/(?i:tx)/{ID}/([A-Za-z0-9_]+)$"), Gate::Stored),
            (Endpoint::Arql, Method::POST, "^/(?i:arql)$".into(), Gate::Always),
        ];
        let routes = table
            .into_iter()
            .map(|(endpoint, method, pattern, gate)| Route {
                endpoint,
                method,
                pattern: Regex::new(&pattern).expect("valid route pattern"),
                gate,
            })
            .collect();
        Self { routes }
    }

    pub async fn resolve(&self, method: &Method, path: &str, store: &dyn TransactionStore) -> Matched {
        for route in &self.routes {
            if route.method != *method {
                continue;
            }
            let Some(caps) = route.pattern.captures(path) else {
                continue;
            };
            let params: Vec<String> = caps
                .iter()
                .skip(1)
                .flatten()
                .map(|m| m.as_str().to_string())
                .collect();
            if route.gate == Gate::Stored && !is_stored(store, params.first()).await {
                continue;
            }
            return Matched {
                endpoint: route.endpoint,
                params,
            };
        }
        Matched {
            endpoint: Endpoint::Proxy,
            params: Vec::new(),
        }
    }
}

async fn is_stored(store: &dyn TransactionStore, id: Option<&String>) -> bool {
    let Some(id) = id.and_then(|raw| TxId::parse(raw.as_str()).ok()) else {
        return false;
    };
    match store.has_transaction(&id).await {
        Ok(found) => found,
        Err(e) => {
            warn!(%id, error = %e, "store lookup failed, routing to proxy");
            false
        }
    }
}

/// The HTTP router. Every path goes through [`dispatch`].
pub fn build_router(session: Arc<Session>) -> Router {
    Router::new()
        .fallback(dispatch)
        .layer(TraceLayer::new_for_http())
        .with_state(session)
}

async fn dispatch(State(session): State<Arc<Session>>, request: Request<Body>) -> Response {
    let (parts, body) = request.into_parts();
    let body = match to_bytes(body, usize::MAX).await {
        Ok(body) => body,
        Err(e) => return ServerError::BadRequest(format!("unreadable body: {e}")).into_response(),
    };
    let path = parts.uri.path();
    let route = ROUTES.resolve(&parts.method, path, session.store().as_ref()).await;
    debug!(method = %parts.method, %path, endpoint = ?route.endpoint, "routed");

    let result = match route.endpoint {
        Endpoint::App => handler::app::serve(&session).await,
        Endpoint::Favicon => Ok(handler::favicon::serve()),
        Endpoint::PostTransaction => handler::tx::post(&session, &body).await,
        Endpoint::GetTransaction => handler::tx::get(&session, route.param(0)).await,
        Endpoint::ServeData => handler::tx::serve_data(&session, route.param(0)).await,
        Endpoint::TransactionStatus => handler::tx::status(&session, route.param(0)).await,
        Endpoint::WalletBalance => handler::wallet::balance(&session, route.param(0)),
        Endpoint::WalletLastTx => handler::wallet::last_tx(&session, route.param(0)),
        Endpoint::TransactionField => {
            handler::tx::field(&session, route.param(0), route.param(1)).await
        }
        Endpoint::Arql => handler::arql::query(&session, &body).await,
        Endpoint::Proxy => {
            handler::proxy::forward(&session, parts.method.clone(), &parts.uri, &parts.headers, body).await
        }
    };
    result.unwrap_or_else(IntoResponse::into_response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arsim_store::InMemoryTransactionStore;

    use crate::tests::signed_body;

    async fn store_with_one() -> (InMemoryTransactionStore, String) {
        let store = InMemoryTransactionStore::new();
        let tx = signed_body(1, 1, "0", "0", &[("Content-Type", "text/plain")], b"hello");
        store.store_transaction(&tx.body, None).await.unwrap();
        (store, tx.id.to_string())
    }

    async fn endpoint(store: &InMemoryTransactionStore, method: Method, path: &str) -> Endpoint {
        ROUTES.resolve(&method, path, store).await.endpoint
    }

    #[tokio::test]
    async fn stored_ids_gate_transaction_routes() {
        let (store, id) = store_with_one().await;
        let unknown = "u".repeat(43);

        assert_eq!(endpoint(&store, Method::GET, &format!("/tx/{id}")).await, Endpoint::GetTransaction);
        assert_eq!(endpoint(&store, Method::GET, &format!("/tx/{unknown}")).await, Endpoint::Proxy);
        assert_eq!(endpoint(&store, Method::GET, &format!("/{id}")).await, Endpoint::ServeData);
        assert_eq!(endpoint(&store, Method::GET, &format!("/{unknown}")).await, Endpoint::Proxy);
        assert_eq!(
            endpoint(&store, Method::GET, &format!("/tx/{id}/status")).await,
            Endpoint::TransactionStatus
        );
        assert_eq!(endpoint(&store, Method::GET, &format!("/tx/{unknown}/status")).await, Endpoint::Proxy);
        assert_eq!(
            endpoint(&store, Method::GET, &format!("/tx/{id}/last_tx")).await,
            Endpoint::TransactionField
        );
    }

    #[tokio::test]
    async fn fixed_routes_and_methods() {
        let (store, _) = store_with_one().await;
        let addr = "a".repeat(43);

        assert_eq!(endpoint(&store, Method::GET, "/app").await, Endpoint::App);
        assert_eq!(endpoint(&store, Method::GET, "/APP").await, Endpoint::App);
        assert_eq!(endpoint(&store, Method::GET, "/favicon.ico").await, Endpoint::Favicon);
        assert_eq!(endpoint(&store, Method::POST, "/tx").await, Endpoint::PostTransaction);
        assert_eq!(endpoint(&store, Method::GET, "/tx").await, Endpoint::Proxy);
        assert_eq!(endpoint(&store, Method::POST, "/arql").await, Endpoint::Arql);
        assert_eq!(
            endpoint(&store, Method::GET, &format!("/wallet/{addr}/balance")).await,
            Endpoint::WalletBalance
        );
        assert_eq!(
            endpoint(&store, Method::GET, &format!("/wallet/{addr}/last_tx")).await,
            Endpoint::WalletLastTx
        );
        assert_eq!(endpoint(&store, Method::GET, "/info").await, Endpoint::Proxy);
        assert_eq!(endpoint(&store, Method::GET, "/wallet/short/balance").await, Endpoint::Proxy);
    }

    #[tokio::test]
    async fn captures_are_returned_in_order() {
        let (store, id) = store_with_one().await;
        let matched = ROUTES.resolve(&Method::GET, &format!("/tx/{id}/owner"), &store).await;
        assert_eq!(matched.param(0), id);
        assert_eq!(matched.param(1), "owner");
        assert_eq!(matched.param(2), "");
    }
}
