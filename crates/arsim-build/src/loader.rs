use std::path::Path;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::Url;
use tracing::debug;

use crate::fetch::Fetcher;
use crate::mime;
use crate::report::SourceError;
use crate::resolve::Reference;

/// Loaded bytes of one reference.
#[derive(Clone, Debug)]
pub struct Asset {
    pub bytes: Vec<u8>,
    pub content_type: String,
    /// File path or URL the bytes came from.
    pub location: String,
    pub is_remote: bool,
}

impl Asset {
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.content_type, STANDARD.encode(&self.bytes))
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Reads local files and fetches remote URLs, turning every failure into a
/// [`SourceError`] tagged with `context`.
#[derive(Clone)]
pub struct Loader {
    fetcher: Arc<dyn Fetcher>,
}

impl Loader {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self { fetcher }
    }

    /// Load a resolved reference. `Passthrough` has nothing to load and yields `None`.
    pub async fn load(&self, reference: &Reference, context: &str) -> Result<Option<Asset>, SourceError> {
        match reference {
            Reference::Passthrough => Ok(None),
            Reference::Local(path) => self.load_local(path, context).await.map(Some),
            Reference::Remote(url) => self.load_remote(url, context).await.map(Some),
        }
    }

    async fn load_local(&self, path: &Path, context: &str) -> Result<Asset, SourceError> {
        let display = path.display().to_string();
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Asset {
                bytes,
                content_type: mime::from_path(path).to_string(),
                location: display,
                is_remote: false,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(SourceError {
                message: format!("File not found: {display}"),
                path: Some(display),
                context: Some(context.to_string()),
            }),
            Err(e) => Err(SourceError {
                message: format!("Failed to read {display}: {e}"),
                path: Some(display),
                context: Some(context.to_string()),
            }),
        }
    }

    async fn load_remote(&self, url: &Url, context: &str) -> Result<Asset, SourceError> {
        debug!(%url, "fetching remote resource");
        match self.fetcher.fetch(url).await {
            Ok(fetched) => Ok(Asset {
                content_type: fetched
                    .content_type
                    .unwrap_or_else(|| mime::from_path(url.path()).to_string()),
                bytes: fetched.bytes,
                location: url.to_string(),
                is_remote: true,
            }),
            Err(e) => Err(SourceError {
                message: format!("Failed to fetch {url}: {e}"),
                path: Some(url.to_string()),
                context: Some(context.to_string()),
            }),
        }
    }
}

/// Shorten a snippet for error context.
pub fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
