use std::path::Path;

const DEFAULT: &str = "application/octet-stream";

/// Content type for a file name, by extension.
pub fn from_path(path: impl AsRef<Path>) -> &'static str {
    path.as_ref()
        .extension()
        .and_then(|e| e.to_str())
        .map(from_extension)
        .unwrap_or(DEFAULT)
}

pub fn from_extension(ext: &str) -> &'static str {
    match ext.to_ascii_lowercase().as_str() {
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" | "mjs" | "cjs" => "application/javascript",
        "json" | "map" => "application/json",
        "txt" => "text/plain",
        "xml" => "application/xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "bmp" => "image/bmp",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        "eot" => "application/vnd.ms-fontobject",
        "wasm" => "application/wasm",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        _ => DEFAULT,
    }
}

/// Top-level media type: `image/png` -> `image`.
pub fn category(content_type: &str) -> &str {
    content_type.split('/').next().unwrap_or(content_type)
}
