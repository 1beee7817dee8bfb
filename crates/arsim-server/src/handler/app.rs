use axum::http::header;
use axum::response::{IntoResponse, Response};

use crate::error::{ServerError, ServerResult};
use crate::livereload::client_script;
use crate::session::Session;

/// The current build with the live-reload client appended. Waits for the
/// first build if none has finished yet.
pub async fn serve(session: &Session) -> ServerResult<Response> {
    let build = session
        .wait_for_build()
        .await
        .ok_or_else(|| ServerError::Internal("build channel closed".into()))?;

    let script = client_script(session.config().live_reload_port, build.report.timestamp);
    let mut body = Vec::with_capacity(build.output.len() + script.len());
    body.extend_from_slice(&build.output);
    body.extend_from_slice(script.as_bytes());
    Ok(([(header::CONTENT_TYPE, "text/html")], body).into_response())
}
