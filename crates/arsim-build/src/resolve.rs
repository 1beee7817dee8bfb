use std::path::{Component, Path, PathBuf};

use reqwest::Url;

/// Where relative references are resolved from.
#[derive(Clone, Debug)]
pub enum Base {
    /// A local document: `dir` holds it, `root` is the entry document's directory.
    Local { dir: PathBuf, root: PathBuf },
    /// A document fetched from the network.
    Remote(Url),
}

impl Base {
    pub fn local(dir: impl Into<PathBuf>, root: impl Into<PathBuf>) -> Self {
        Self::Local { dir: dir.into(), root: root.into() }
    }
}

/// A resolved reference.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reference {
    /// Nothing to inline: a `data:` URI or a bare fragment.
    Passthrough,
    Remote(Url),
    Local(PathBuf),
}

/// Resolve a raw reference against `base`.
///
/// `http(s)://` and protocol-relative references are always remote. Local
/// references lose any `?query` or `#fragment` suffix; a leading `/` is
/// taken relative to the entry document's directory.
pub fn resolve(raw: &str, base: &Base) -> Result<Reference, String> {
    let raw = raw.trim();
    let lower = raw.to_ascii_lowercase();

    if lower.starts_with("data:") {
        return Ok(Reference::Passthrough);
    }
    if lower.starts_with("http://") || lower.starts_with("https://") {
        return Url::parse(raw)
            .map(Reference::Remote)
            .map_err(|e| format!("Invalid URL {raw}: {e}"));
    }
    if raw.starts_with("//") {
        return Url::parse(&format!("https:{raw}"))
            .map(Reference::Remote)
            .map_err(|e| format!("Invalid URL {raw}: {e}"));
    }

    match base {
        Base::Remote(url) => {
            if raw.is_empty() || raw.starts_with('#') {
                return Ok(Reference::Passthrough);
            }
            url.join(raw)
                .map(Reference::Remote)
                .map_err(|e| format!("Invalid URL {raw} relative to {url}: {e}"))
        }
        Base::Local { dir, root } => {
            let path = strip_suffix(raw);
            if path.is_empty() {
                return Ok(Reference::Passthrough);
            }
            let joined = match path.strip_prefix('/') {
                Some(rooted) => root.join(rooted),
                None => dir.join(path),
            };
            Ok(Reference::Local(normalize(&joined)))
        }
    }
}

fn strip_suffix(raw: &str) -> &str {
    match raw.find(|c: char| c == '?' || c == '#') {
        Some(pos) => &raw[..pos],
        None => raw,
    }
}

/// Lexically collapse `.` and `..` without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
