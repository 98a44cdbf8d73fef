//! Subcommand implementations.

pub mod fetch;
pub mod resolve;
pub mod verify;
pub mod versions;

use std::sync::Arc;

use anyhow::{Context, Result};

use apkscout_core::{
    Catalog, KnownVersionsCatalog, ListingCatalog, MirrorCatalog, Resolver, StaticMetadataProvider,
};

use crate::store::SqliteOverrideStore;
use crate::{Cli, paths};

/// Catalogs in pipeline priority order: mirror, listing, then the
/// curated known-versions table when one is configured.
pub fn build_catalogs(cli: &Cli) -> Result<Vec<Arc<dyn Catalog>>> {
    let mut catalogs: Vec<Arc<dyn Catalog>> = vec![
        Arc::new(MirrorCatalog::new(&cli.mirror_url, &cli.mirror_dl_url)),
        Arc::new(ListingCatalog::new(&cli.listing_url, &cli.listing_cdn)),
    ];
    if let Some(path) = &cli.known_versions {
        let known = KnownVersionsCatalog::from_file(path)
            .with_context(|| format!("Failed to load known-versions table {}", path.display()))?;
        catalogs.push(Arc::new(known));
    }
    Ok(catalogs)
}

/// Assemble the full pipeline from CLI configuration.
pub fn build_resolver(cli: &Cli) -> Result<Resolver> {
    let mut builder = Resolver::builder();
    for catalog in build_catalogs(cli)? {
        builder = builder.catalog(catalog);
    }

    if let Some(path) = &cli.metadata_json {
        let provider = StaticMetadataProvider::from_file(path)
            .with_context(|| format!("Failed to load metadata file {}", path.display()))?;
        builder = builder.metadata(Arc::new(provider));
    }

    let db_path = cli
        .overrides_db
        .clone()
        .unwrap_or_else(paths::overrides_db_path);
    let store = SqliteOverrideStore::open(&db_path)
        .with_context(|| format!("Failed to open override store {}", db_path.display()))?;
    builder = builder.overrides(Arc::new(store));

    Ok(builder.build())
}
