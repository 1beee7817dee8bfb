use axum::http::header;
use axum::response::{IntoResponse, Response};

static ICON: &[u8] = include_bytes!("../../assets/favicon.ico");

pub fn serve() -> Response {
    ([(header::CONTENT_TYPE, "image/x-icon")], ICON).into_response()
}
