use serde::{Deserialize, Serialize};

/// Kind of top-level reference in the entry document.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Script,
    Css,
    Image,
}

impl SourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Script => "script",
            Self::Css => "css",
            Self::Image => "image",
        }
    }
}

/// A structured resolution failure.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceError {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

/// A resource inlined from inside a stylesheet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubResource {
    /// Media category of the content, e.g. `image` or `font`.
    #[serde(rename = "type")]
    pub kind: String,
    pub path: String,
    pub is_remote: bool,
    pub size_bytes: u64,
    pub context: String,
}

/// One top-level reference and what happened to it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    #[serde(rename = "type")]
    pub kind: SourceKind,
    /// Element name the reference was found on.
    pub tag: String,
    /// Resolved file path or URL; the raw reference if resolution failed.
    pub path: String,
    pub is_remote: bool,
    pub errored: bool,
    pub errors: Vec<SourceError>,
    pub sub_resources: Vec<SubResource>,
    pub size_bytes: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryInfo {
    pub name: String,
    pub path: String,
    pub size_bytes: u64,
}

/// Diagnostic output of one bundling pass.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildReport {
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub entry: EntryInfo,
    pub total_size_bytes: u64,
    pub sources: Vec<Source>,
}

impl BuildReport {
    /// True when no source errored.
    pub fn is_valid(&self) -> bool {
        self.sources.iter().all(|s| !s.errored)
    }

    pub fn errored_sources(&self) -> impl Iterator<Item = &Source> {
        self.sources.iter().filter(|s| s.errored)
    }
}

/// A finished bundle. Never mutated after construction.
#[derive(Clone, Debug)]
pub struct Build {
    pub output: Vec<u8>,
    pub report: BuildReport,
}
