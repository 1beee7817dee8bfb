use std::path::PathBuf;

/// Failures that prevent a build from producing any output.
///
/// Individual resource failures are not errors at this level; they are
/// recorded on the affected [`Source`](crate::Source).
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("entry document not found: {path}")]
    EntryNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot read entry document {path}: {source}")]
    EntryRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type BuildResult<T> = Result<T, BuildError>;
