//! Listing-style catalog: free-text version history, no variant
//! structure.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;

use apkscout_schema::{CandidateVersion, Format, SourceCatalog, api_for_android_version};

use super::{
    AttemptKind, Catalog, LatestAttempt, absolutize, catalog_client, fetch_page, slugify,
};

static HREF_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"href="([^"]+)""#).unwrap());
/// Old-version entry: a detail link whose text ends in the version
/// label, followed by free text that may carry an Android requirement.
static OLD_VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<div class="old-version">\s*<a href="([^"]+)">[^<]*?([0-9][0-9.]*)\s*</a>(.*?)</div>"#)
        .unwrap()
});
static REQ_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Android\s+([0-9][0-9.]*L?)").unwrap());
/// First search-result link that looks like `/slug/reverse.dns.id/`.
static RESULT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"href="(/[\w-]+/[\w-]+(?:\.[\w-]+){2,}/)""#).unwrap());

/// Client for the listing-style catalog.
#[derive(Debug)]
pub struct ListingCatalog {
    base_url: String,
    client: Client,
    cdn_re: Regex,
}

impl ListingCatalog {
    /// Build a client against the given site base URL and download CDN
    /// prefix.
    pub fn new(base_url: &str, cdn_prefix: &str) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        let cdn_re = Regex::new(&format!(
            r#"({}[^"'\s<>]+)"#,
            regex::escape(cdn_prefix.trim_end_matches('/'))
        ))
        .unwrap();
        Self {
            base_url,
            client: catalog_client(),
            cdn_re,
        }
    }
}

impl Default for ListingCatalog {
    fn default() -> Self {
        Self::new("https://www.apkmonk.com", "https://dl.apkmonk.com")
    }
}

#[async_trait]
impl Catalog for ListingCatalog {
    fn key(&self) -> &'static str {
        "listing"
    }

    fn source(&self) -> SourceCatalog {
        SourceCatalog::ListingSite
    }

    fn search_url(&self, package_id: &str) -> Option<String> {
        Some(format!(
            "{}/search/{}/",
            self.base_url,
            urlencoding::encode(package_id)
        ))
    }

    async fn find_app_page(&self, package_id: &str, display_hint: Option<&str>) -> Option<String> {
        let search = self.search_url(package_id)?;
        let html = fetch_page(&self.client, &search).await?;

        let suffix = format!("/{package_id}/");
        for cap in HREF_RE.captures_iter(&html) {
            let href = &cap[1];
            if href.ends_with(&suffix) {
                return Some(absolutize(&self.base_url, href));
            }
        }

        if let Some(cap) = RESULT_RE.captures(&html) {
            return Some(absolutize(&self.base_url, &cap[1]));
        }

        display_hint
            .map(slugify)
            .filter(|slug| !slug.is_empty())
            .map(|slug| format!("{}/{slug}/{package_id}/", self.base_url))
    }

    async fn list_versions(&self, app_page_url: &str) -> Vec<CandidateVersion> {
        let url = format!("{}/old-versions/", app_page_url.trim_end_matches('/'));
        let Some(html) = fetch_page(&self.client, &url).await else {
            return Vec::new();
        };

        let mut candidates = Vec::new();
        for cap in OLD_VERSION_RE.captures_iter(&html) {
            let min_api = REQ_RE
                .captures(&cap[3])
                .and_then(|c| api_for_android_version(&c[1]));
            candidates.push(CandidateVersion {
                version: cap[2].to_string(),
                min_api_level: min_api,
                download_url: absolutize(&self.base_url, &cap[1]),
                format: Format::Apk,
                source: SourceCatalog::ListingSite,
                abi: None,
                dpi: None,
                version_code: None,
                direct: false,
            });
        }
        candidates
    }

    async fn resolve_download_link(&self, candidate: &CandidateVersion) -> Option<String> {
        let html = fetch_page(&self.client, &candidate.download_url).await?;
        self.cdn_re.captures(&html).map(|cap| cap[1].to_string())
    }

    async fn latest_candidates(
        &self,
        package_id: &str,
        display_hint: Option<&str>,
    ) -> Vec<LatestAttempt> {
        // No direct-file pattern here; the app page itself is the
        // manual-click fallback.
        match self.find_app_page(package_id, display_hint).await {
            Some(page) => vec![LatestAttempt {
                url: page,
                format: None,
                tag: "listing_page".to_string(),
                kind: AttemptKind::AppPage,
            }],
            None => Vec::new(),
        }
    }
}
