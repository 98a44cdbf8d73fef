//! Known-versions catalog: a curated TOML table, including
//! guess-and-verify version-code probing.
//!
//! This is the last-resort strategy. Its URLs are constructed, not
//! scraped, so the pipeline must run every pick through the link
//! verifier before trusting it.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use apkscout_schema::{Abi, CandidateVersion, Dpi, Format, SourceCatalog};

use super::{Catalog, LatestAttempt};

/// Errors loading the known-versions table.
#[derive(Error, Debug)]
pub enum KnownTableError {
    /// An I/O error occurred while reading the table file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The TOML content could not be deserialized.
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Deserialize)]
struct KnownTable {
    #[serde(default)]
    package: Vec<KnownPackage>,
}

#[derive(Debug, Deserialize)]
struct KnownPackage {
    id: String,
    #[serde(default)]
    version: Vec<KnownRow>,
    probe: Option<ProbeSpec>,
}

/// An explicit curated row.
#[derive(Debug, Deserialize)]
struct KnownRow {
    label: String,
    url: String,
    min_api: Option<u32>,
    abi: Option<Abi>,
    dpi: Option<Dpi>,
    format: Option<Format>,
}

/// A guess-and-verify block: expand `{package}`/`{code}` in the
/// template for each listed version code and let the verifier decide
/// which guesses are real.
#[derive(Debug, Deserialize)]
struct ProbeSpec {
    url_template: String,
    version_codes: Vec<u64>,
    format: Option<Format>,
}

/// Catalog over a curated known-versions table.
#[derive(Debug)]
pub struct KnownVersionsCatalog {
    packages: HashMap<String, KnownPackage>,
}

impl KnownVersionsCatalog {
    /// Load the table from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, KnownTableError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse the table from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, KnownTableError> {
        let table: KnownTable = toml::from_str(content)?;
        let packages = table
            .package
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect();
        Ok(Self { packages })
    }
}

#[async_trait]
impl Catalog for KnownVersionsCatalog {
    fn key(&self) -> &'static str {
        "known"
    }

    fn source(&self) -> SourceCatalog {
        SourceCatalog::KnownTable
    }

    fn search_url(&self, _package_id: &str) -> Option<String> {
        None
    }

    async fn find_app_page(&self, package_id: &str, _display_hint: Option<&str>) -> Option<String> {
        // No pages to scrape; the package id doubles as the "page".
        self.packages.contains_key(package_id).then(|| package_id.to_string())
    }

    async fn list_versions(&self, app_page_url: &str) -> Vec<CandidateVersion> {
        let Some(pkg) = self.packages.get(app_page_url) else {
            return Vec::new();
        };

        let mut candidates: Vec<CandidateVersion> = pkg
            .version
            .iter()
            .map(|row| CandidateVersion {
                version: row.label.clone(),
                min_api_level: row.min_api,
                download_url: row.url.clone(),
                format: row.format.unwrap_or(Format::Apk),
                source: SourceCatalog::KnownTable,
                abi: row.abi,
                dpi: row.dpi,
                version_code: None,
                direct: true,
            })
            .collect();

        if let Some(probe) = &pkg.probe {
            for &code in &probe.version_codes {
                let url = probe
                    .url_template
                    .replace("{package}", &pkg.id)
                    .replace("{code}", &code.to_string());
                candidates.push(CandidateVersion {
                    version: code.to_string(),
                    min_api_level: None,
                    download_url: url,
                    format: probe.format.unwrap_or(Format::Apk),
                    source: SourceCatalog::KnownTable,
                    abi: None,
                    dpi: None,
                    version_code: Some(code),
                    direct: true,
                });
            }
        }
        candidates
    }

    async fn resolve_download_link(&self, candidate: &CandidateVersion) -> Option<String> {
        Some(candidate.download_url.clone())
    }

    async fn latest_candidates(
        &self,
        _package_id: &str,
        _display_hint: Option<&str>,
    ) -> Vec<LatestAttempt> {
        Vec::new()
    }

    fn needs_verification(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = r#"
        [[package]]
        id = "com.example.app"

        [[package.version]]
        label = "4.1.0"
        url = "https://archive.example.com/com.example.app-4.1.0.apk"
        min_api = 21
        abi = "arm64-v8a"
        format = "apk"

        [package.probe]
        url_template = "https://cdn.example.com/apks/{package}/{code}.apk"
        version_codes = [420, 410]
    "#;

    #[tokio::test]
    async fn test_table_rows_and_probe_expansion() {
        let catalog = KnownVersionsCatalog::from_toml(TABLE).unwrap();
        assert!(catalog.needs_verification());

        let page = catalog.find_app_page("com.example.app", None).await.unwrap();
        let versions = catalog.list_versions(&page).await;
        assert_eq!(versions.len(), 3);

        assert_eq!(versions[0].version, "4.1.0");
        assert_eq!(versions[0].min_api_level, Some(21));
        assert_eq!(versions[0].abi, Some(Abi::Arm64V8a));
        assert!(versions[0].direct);

        assert_eq!(
            versions[1].download_url,
            "https://cdn.example.com/apks/com.example.app/420.apk"
        );
        assert_eq!(versions[1].version_code, Some(420));
    }

    #[tokio::test]
    async fn test_unknown_package_is_a_miss() {
        let catalog = KnownVersionsCatalog::from_toml(TABLE).unwrap();
        assert!(catalog.find_app_page("com.missing.app", None).await.is_none());
        assert!(catalog.list_versions("com.missing.app").await.is_empty());
    }

    #[tokio::test]
    async fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("known-versions.toml");
        std::fs::write(&path, TABLE).unwrap();
        let catalog = KnownVersionsCatalog::from_file(&path).unwrap();
        assert!(catalog.find_app_page("com.example.app", None).await.is_some());
    }

    #[test]
    fn test_bad_toml_is_an_error() {
        assert!(KnownVersionsCatalog::from_toml("not [ valid").is_err());
    }
}
