//! Asset bundling for the arsim dev server.
//!
//! A build reads one HTML entry document, finds its `<script src>`,
//! `<link rel="stylesheet">` and `<img src>` references, and inlines each
//! one: scripts and stylesheets as literal markup, images as base64 data
//! URIs. Stylesheets get a second pass that inlines every `url(...)` they
//! contain.
//!
//! A reference that cannot be resolved marks only its own [`Source`] as
//! errored and leaves the original tag in place; the rest of the document
//! is still bundled. Only an unreadable entry document fails the build.

pub mod bundler;
pub mod css;
pub mod error;
pub mod fetch;
pub mod html;
pub mod loader;
pub mod mime;
pub mod report;
pub mod resolve;

pub use bundler::Bundler;
pub use error::{BuildError, BuildResult};
pub use fetch::{FetchError, FetchedAsset, Fetcher, HttpFetcher};
pub use report::{Build, BuildReport, EntryInfo, Source, SourceError, SourceKind, SubResource};
pub use resolve::{Base, Reference};
