//! apkscout-core: catalog clients, link verification, and the
//! resolution pipeline.
//!
//! The pipeline in [`resolver`] is the heart of the crate: it consults
//! an optional override store, an optional metadata provider, and a
//! priority-ordered list of [`catalog::Catalog`] clients, and always
//! returns a structured [`apkscout_schema::ResolutionResult`] -- no
//! combination of upstream failures can surface as an error.

pub mod catalog;
pub mod fetch;
pub mod metadata;
pub mod overrides;
pub mod resolver;
pub mod verify;

pub use catalog::{Catalog, KnownVersionsCatalog, ListingCatalog, MirrorCatalog};
pub use metadata::{MetadataProvider, StaticMetadataProvider};
pub use overrides::{MemoryOverrideStore, OverrideStore};
pub use resolver::{Resolver, ResolverBuilder};
pub use verify::{LinkVerifier, VerifyPolicy};

/// Browser User-Agent sent on every upstream request. The catalogs
/// block obvious bot identifiers.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";
