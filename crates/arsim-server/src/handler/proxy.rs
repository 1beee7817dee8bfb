use axum::body::Body;
use axum::http::{HeaderMap, Method, Uri};
use axum::response::Response;
use bytes::Bytes;

use crate::error::ServerResult;
use crate::session::Session;

/// Relay a request to the upstream node and its response back, status and
/// headers included. Upstream error statuses are relayed too; only a
/// transport failure becomes an error.
pub async fn forward(
    session: &Session,
    method: Method,
    uri: &Uri,
    headers: &HeaderMap,
    body: Bytes,
) -> ServerResult<Response> {
    let path = uri.path_and_query().map_or("/", |pq| pq.as_str());
    let upstream = session
        .network()
        .request_raw(method, path.trim_start_matches('/'), headers, body)
        .await?;

    let mut response = Response::new(Body::from(upstream.body));
    *response.status_mut() = upstream.status;
    *response.headers_mut() = upstream.headers;
    Ok(response)
}
