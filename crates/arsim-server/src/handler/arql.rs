use axum::http::{header, HeaderMap, HeaderValue, Method};
use axum::response::{IntoResponse, Json, Response};
use bytes::Bytes;
use tracing::{debug, warn};

use arsim_query::{merge_results, ArqlQuery};

use crate::error::{ServerError, ServerResult};
use crate::session::Session;

/// Evaluate an ARQL query against the local index, optionally merged with
/// the upstream network's answer.
pub async fn query(session: &Session, body: &[u8]) -> ServerResult<Response> {
    let query = ArqlQuery::parse(body).map_err(|e| {
        debug!(detail = e.detail(), "rejected arql query");
        ServerError::from(e)
    })?;

    let index = session.store().index().await?;
    let local: Vec<String> = query.evaluate(&index).into_iter().map(|id| id.to_string()).collect();

    if !session.config().arql.merge_external {
        return Ok(Json(local).into_response());
    }
    let ids = match live_query(session, &query).await {
        Ok(remote) => merge_results(local, remote),
        Err(e) => {
            warn!(error = %e, "live arql query failed, returning local results");
            local
        }
    };
    Ok(Json(ids).into_response())
}

async fn live_query(session: &Session, query: &ArqlQuery) -> ServerResult<Vec<String>> {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    let body = Bytes::from(query.to_value().to_string());
    let response = session
        .network()
        .request_raw(Method::POST, "arql", &headers, body)
        .await?;
    if !response.status.is_success() {
        return Err(ServerError::Upstream(format!("arql answered {}", response.status)));
    }
    // An empty body means no matches.
    if response.body.is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_slice(&response.body)
        .map_err(|e| ServerError::Upstream(format!("arql response is not an id list: {e}")))
}
