//! Metadata provider interface and the map-backed implementation.
//!
//! The storefront lookup itself is an external collaborator; the
//! pipeline only needs `lookup` and treats any miss as "assume
//! compatible".

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

use apkscout_schema::AppMetadata;

/// External app-metadata source.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Best-effort metadata lookup; `None` is an ordinary miss.
    async fn lookup(&self, package_id: &str) -> Option<AppMetadata>;

    /// Search by free text. Consumed by front-end surfaces, not by the
    /// resolution pipeline.
    async fn search(&self, term: &str, limit: usize) -> Vec<AppMetadata>;
}

/// Errors loading a static metadata file.
#[derive(Error, Debug)]
pub enum MetadataError {
    /// An I/O error occurred while reading the file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The JSON content could not be deserialized.
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Map-backed metadata provider, for embedding and tests.
#[derive(Debug, Default)]
pub struct StaticMetadataProvider {
    apps: HashMap<String, AppMetadata>,
}

impl StaticMetadataProvider {
    /// Build from a list of entries.
    pub fn new(entries: Vec<AppMetadata>) -> Self {
        let apps = entries
            .into_iter()
            .map(|m| (m.package_id.clone(), m))
            .collect();
        Self { apps }
    }

    /// Load a JSON array of [`AppMetadata`] from a file.
    pub fn from_file(path: &Path) -> Result<Self, MetadataError> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::new(serde_json::from_str(&content)?))
    }
}

#[async_trait]
impl MetadataProvider for StaticMetadataProvider {
    async fn lookup(&self, package_id: &str) -> Option<AppMetadata> {
        self.apps.get(package_id).cloned()
    }

    async fn search(&self, term: &str, limit: usize) -> Vec<AppMetadata> {
        let term = term.to_lowercase();
        self.apps
            .values()
            .filter(|m| {
                m.package_id.to_lowercase().contains(&term)
                    || m.display_name.to_lowercase().contains(&term)
            })
            .take(limit)
            .cloned()
            .collect()
    }
}
