//! Second pass over stylesheet text: inline every `url(...)`.

use std::sync::LazyLock;

use regex::Regex;

use crate::loader::{truncate, Loader};
use crate::mime;
use crate::report::{SourceError, SubResource};
use crate::resolve::{resolve, Base};

static URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)url\(\s*(?:"([^"]*)"|'([^']*)'|([^)]*?))\s*\)"#).expect("valid regex")
});

const CONTEXT_LIMIT: usize = 100;

/// Stylesheet text with its references inlined.
#[derive(Clone, Debug, Default)]
pub struct InlinedCss {
    pub css: String,
    pub sub_resources: Vec<SubResource>,
    pub errors: Vec<SourceError>,
}

/// Replace each resolvable `url(...)` in `css` with a data URI.
///
/// Unresolvable references are left as written and reported in `errors`.
pub async fn inline_urls(css: &str, base: &Base, loader: &Loader) -> InlinedCss {
    let mut out = InlinedCss {
        css: String::with_capacity(css.len()),
        ..Default::default()
    };
    let mut cursor = 0;

    for caps in URL.captures_iter(css) {
        let whole = caps.get(0).expect("group 0 always matches");
        let raw = caps
            .get(1)
            .or_else(|| caps.get(2))
            .or_else(|| caps.get(3))
            .map_or("", |m| m.as_str());
        let context = truncate(whole.as_str(), CONTEXT_LIMIT);

        let loaded = match resolve(raw, base) {
            Ok(reference) => loader.load(&reference, &context).await,
            Err(message) => Err(SourceError {
                message,
                path: Some(raw.to_string()),
                context: Some(context.clone()),
            }),
        };

        out.css.push_str(&css[cursor..whole.start()]);
        match loaded {
            Ok(Some(asset)) => {
                out.css.push_str(&format!("url(\"{}\")", asset.data_uri()));
                out.sub_resources.push(SubResource {
                    kind: mime::category(&asset.content_type).to_string(),
                    path: asset.location.clone(),
                    is_remote: asset.is_remote,
                    size_bytes: asset.size(),
                    context,
                });
            }
            Ok(None) => out.css.push_str(whole.as_str()),
            Err(error) => {
                out.css.push_str(whole.as_str());
                out.errors.push(error);
            }
        }
        cursor = whole.end();
    }
    out.css.push_str(&css[cursor..]);
    out
}
