//! Static site builder for skiff.
//!
//! Compiles page sources into staging, resolves the document shell and the
//! wrapper, renders every route of every page and writes the results as
//! `<route>/index.html`. Passes are driven by [`ChangeSet`]s: an initial set
//! rebuilds everything from scratch, later sets rebuild only what changed.

pub mod assets;
pub mod builder;
pub mod cache;
pub mod changes;
pub mod document;
pub mod routes;

pub use assets::{AssetPipeline, PublicAssets};
pub use builder::{BuildConfig, BuildError, BuildReport, Builder};
pub use cache::{CacheEntry, DependencyCache};
pub use changes::{Change, ChangeKind, ChangeSet};
pub use document::{
    default_document, default_wrapper, resolve_document, resolve_wrapper, DocumentError,
    APP_MODULE, DOCUMENT_MODULE, ENTRY_ID,
};
pub use routes::{resolve_routes, Route, RouteError};
