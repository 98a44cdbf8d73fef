//! Catalog clients: best-effort scrapers over the external APK
//! catalogs.
//!
//! Every method on [`Catalog`] swallows network and parse failures and
//! reports them as `None`/empty -- a blocked or unreachable catalog is
//! a recoverable miss, never an error. The fragile markup patterns are
//! confined per catalog so they can be adjusted without touching the
//! pipeline.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use apkscout_schema::{CandidateVersion, Format, SourceCatalog};

mod known;
mod listing;
mod mirror;

pub use known::{KnownTableError, KnownVersionsCatalog};
pub use listing::ListingCatalog;
pub use mirror::MirrorCatalog;

/// Per-catalog HTML fetch timeout.
pub(crate) const CATALOG_TIMEOUT: Duration = Duration::from_secs(10);

/// How a latest-version attempt should be treated by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptKind {
    /// The URL should serve the file itself; it must verify as a
    /// plausible binary.
    Direct,
    /// The URL is an app page for the user to click through; it only
    /// needs to be reachable.
    AppPage,
}

/// One latest-version attempt produced by a catalog, in the order the
/// pipeline should try them.
#[derive(Debug, Clone)]
pub struct LatestAttempt {
    /// URL to probe.
    pub url: String,
    /// Artifact format, when the attempt implies one.
    pub format: Option<Format>,
    /// Source tag for the result if this attempt wins.
    pub tag: String,
    /// Verification treatment.
    pub kind: AttemptKind,
}

/// A single external APK catalog.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Short stable key ("mirror", "listing", "known").
    fn key(&self) -> &'static str;

    /// Which [`SourceCatalog`] this client feeds.
    fn source(&self) -> SourceCatalog;

    /// Search-results URL for manual fallback, if the catalog has one.
    fn search_url(&self, package_id: &str) -> Option<String>;

    /// Locate the canonical app page for a package. `None` means the
    /// catalog is unreachable, blocked the request, or has no match --
    /// all recoverable misses.
    async fn find_app_page(&self, package_id: &str, display_hint: Option<&str>) -> Option<String>;

    /// Scrape candidate versions from the app's version-history page.
    /// Order is as-encountered; the caller re-ranks.
    async fn list_versions(&self, app_page_url: &str) -> Vec<CandidateVersion>;

    /// Follow a detail-page candidate one more hop to the final file
    /// URL. Candidates with `direct = true` do not need this.
    async fn resolve_download_link(&self, candidate: &CandidateVersion) -> Option<String>;

    /// Latest-version attempts, best first.
    async fn latest_candidates(
        &self,
        package_id: &str,
        display_hint: Option<&str>,
    ) -> Vec<LatestAttempt>;

    /// Whether older-branch picks from this catalog must pass the link
    /// verifier before being trusted. True for guess-and-verify
    /// strategies whose URLs may serve placeholder pages.
    fn needs_verification(&self) -> bool {
        false
    }
}

/// Shared client constructor for catalog scrapers.
///
/// Construction-time: builder failure means the TLS backend could not
/// initialize, which nothing downstream can recover from.
pub(crate) fn catalog_client() -> Client {
    Client::builder()
        .timeout(CATALOG_TIMEOUT)
        .user_agent(crate::BROWSER_USER_AGENT)
        .build()
        .expect("HTTP client construction failed")
}

/// GET a page as text. Any transport error or non-2xx status (403s
/// from bot detection included) is a miss, logged at debug.
pub(crate) async fn fetch_page(client: &Client, url: &str) -> Option<String> {
    let resp = match client.get(url).send().await {
        Ok(resp) => resp,
        Err(e) => {
            tracing::debug!(url, error = %e, "catalog fetch failed");
            return None;
        }
    };
    if !resp.status().is_success() {
        tracing::debug!(url, status = %resp.status(), "catalog returned non-success");
        return None;
    }
    match resp.text().await {
        Ok(text) => Some(text),
        Err(e) => {
            tracing::debug!(url, error = %e, "catalog body read failed");
            None
        }
    }
}

/// Lowercase-and-hyphenate a display name into a URL slug.
pub(crate) fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_dash = true;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    slug.trim_end_matches('-').to_string()
}

/// Resolve a possibly-relative href against a catalog base URL.
pub(crate) fn absolutize(base: &str, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        href.to_string()
    } else {
        format!("{}/{}", base.trim_end_matches('/'), href.trim_start_matches('/'))
    }
}
