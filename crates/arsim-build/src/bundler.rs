use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use regex::Regex;

use tracing::{debug, info, warn};

use crate::css::inline_urls;
use crate::error::{BuildError, BuildResult};
use crate::fetch::Fetcher;
use crate::html::{render_attrs, scan, Attribute, Element};
use crate::loader::{truncate, Asset, Loader};
use crate::report::{Build, BuildReport, EntryInfo, Source, SourceError, SourceKind};
use crate::resolve::{resolve, Base, Reference};

const CONTEXT_LIMIT: usize = 100;

/// Result of inlining one element. Passthrough references carry no report entry.
struct Inlined {
    replacement: Option<String>,
    source: Option<Source>,
}

/// Bundles an HTML entry document into a single self-contained payload.
#[derive(Clone)]
pub struct Bundler {
    loader: Loader,
}

impl Bundler {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            loader: Loader::new(fetcher),
        }
    }

    /// Run one build of `entry`.
    pub async fn build(&self, entry: &Path) -> BuildResult<Build> {
        let entry_path = tokio::fs::canonicalize(entry)
            .await
            .map_err(|source| BuildError::EntryNotFound {
                path: entry.to_path_buf(),
                source,
            })?;
        let bytes = tokio::fs::read(&entry_path)
            .await
            .map_err(|source| BuildError::EntryRead {
                path: entry_path.clone(),
                source,
            })?;
        let html = String::from_utf8_lossy(&bytes);
        let root = entry_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let base = Base::local(root.clone(), root);

        let mut output = String::with_capacity(html.len());
        let mut sources = Vec::new();
        let mut cursor = 0;
        for element in scan(&html) {
            let inlined = self.inline_element(&element, &html, &base).await;
            output.push_str(&html[cursor..element.range.start]);
            match inlined.replacement {
                Some(markup) => output.push_str(&markup),
                None => output.push_str(element.original(&html)),
            }
            cursor = element.range.end;
            sources.extend(inlined.source);
        }
        output.push_str(&html[cursor..]);

        let report = BuildReport {
            timestamp: chrono::Utc::now().timestamp_millis(),
            entry: EntryInfo {
                name: entry_path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                path: entry_path.display().to_string(),
                size_bytes: bytes.len() as u64,
            },
            total_size_bytes: output.len() as u64,
            sources,
        };

        for source in report.errored_sources() {
            for error in &source.errors {
                warn!(path = %source.path, message = %error.message, "resource not inlined");
            }
        }
        info!(
            entry = %report.entry.path,
            sources = report.sources.len(),
            bytes = report.total_size_bytes,
            valid = report.is_valid(),
            "build complete"
        );

        Ok(Build {
            output: output.into_bytes(),
            report,
        })
    }

    async fn inline_element(&self, element: &Element, html: &str, base: &Base) -> Inlined {
        let context = truncate(element.original(html), CONTEXT_LIMIT);
        let mut source = Source {
            kind: element.kind,
            tag: element.tag.clone(),
            path: element.reference.clone(),
            is_remote: false,
            errored: false,
            errors: Vec::new(),
            sub_resources: Vec::new(),
            size_bytes: 0,
        };

        let reference = match resolve(&element.reference, base) {
            Ok(reference) => reference,
            Err(message) => {
                return failed(source, SourceError {
                    message,
                    path: Some(element.reference.clone()),
                    context: Some(context),
                })
            }
        };
        let asset = match self.loader.load(&reference, &context).await {
            Ok(Some(asset)) => asset,
            Ok(None) => {
                debug!(reference = %element.reference, "passthrough reference left in place");
                return Inlined { replacement: None, source: None };
            }
            Err(error) => {
                source.is_remote = matches!(reference, Reference::Remote(_));
                return failed(source, error);
            }
        };

        source.path = asset.location.clone();
        source.is_remote = asset.is_remote;
        source.size_bytes = asset.size();

        let replacement = match element.kind {
            SourceKind::Script => render_script(element, &asset),
            SourceKind::Image => render_image(element, &asset),
            SourceKind::Css => {
                let css_base = stylesheet_base(&asset, base);
                let inlined = inline_urls(&asset.text(), &css_base, &self.loader).await;
                source.sub_resources = inlined.sub_resources;
                if !inlined.errors.is_empty() {
                    source.errored = true;
                    source.errors = inlined.errors;
                }
                render_style(element, &inlined.css)
            }
        };

        Inlined {
            replacement: Some(replacement),
            source: Some(source),
        }
    }
}

fn failed(mut source: Source, error: SourceError) -> Inlined {
    source.errored = true;
    source.errors.push(error);
    Inlined {
        replacement: None,
        source: Some(source),
    }
}

/// References inside a stylesheet resolve against the stylesheet itself.
fn stylesheet_base(asset: &Asset, entry_base: &Base) -> Base {
    if asset.is_remote {
        if let Ok(url) = reqwest::Url::parse(&asset.location) {
            return Base::Remote(url);
        }
    }
    let root = match entry_base {
        Base::Local { root, .. } => root.clone(),
        Base::Remote(_) => PathBuf::from("."),
    };
    let dir = Path::new(&asset.location)
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| root.clone());
    Base::local(dir, root)
}

static SCRIPT_CLOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</(script)").expect("valid regex"));

fn render_script(element: &Element, asset: &Asset) -> String {
    let text = asset.text();
    let body = SCRIPT_CLOSE.replace_all(&text, r"<\/$1");
    format!(
        "<script{}>{}</script>",
        element.render_attrs_without(&["src", "integrity", "crossorigin"]),
        body
    )
}

fn render_style(element: &Element, css: &str) -> String {
    let media = element
        .attr("media")
        .map(|m| format!(" media=\"{}\"", m.replace('"', "&quot;")))
        .unwrap_or_default();
    format!("<style{media}>\n{css}\n</style>")
}

fn render_image(element: &Element, asset: &Asset) -> String {
    let data_uri = asset.data_uri();
    let attrs: Vec<Attribute> = element
        .attributes
        .iter()
        .map(|a| {
            if a.name.eq_ignore_ascii_case("src") {
                Attribute {
                    name: a.name.clone(),
                    value: Some(data_uri.clone()),
                }
            } else {
                a.clone()
            }
        })
        .collect();
    format!("<{}{}>", element.tag, render_attrs(attrs.iter()))
}
