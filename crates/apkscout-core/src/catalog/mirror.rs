//! Mirror-style catalog: structured per-variant version tables and a
//! direct "latest file" CDN URL pattern.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;

use apkscout_schema::{CandidateVersion, Format, SourceCatalog, api_for_android_version};

use super::{
    AttemptKind, Catalog, LatestAttempt, absolutize, catalog_client, fetch_page, slugify,
};

static HREF_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"href="([^"]+)""#).unwrap());
static VER_BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?s)<div class="ver-item">(.*?)</div>"#).unwrap());
static VER_HREF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"href="([^"]*/download/(\d+))""#).unwrap());
static VER_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"class="ver-name"[^>]*>\s*([^<]+?)\s*<"#).unwrap());
static VER_REQ_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Android\s+([0-9][0-9.]*L?)").unwrap());
static VER_ABI_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"class="ver-abi"[^>]*>\s*([^<]+?)\s*<"#).unwrap());
static VER_DPI_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"class="ver-dpi"[^>]*>\s*([^<]+?)\s*<"#).unwrap());
static VER_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"class="ver-tag"[^>]*>\s*(XAPK|APK)\s*<"#).unwrap());
/// First search-result link that looks like `/slug/reverse.dns.id`.
static RESULT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"href="(/[\w-]+/[\w-]+(?:\.[\w-]+){2,})""#).unwrap());

/// Client for the mirror-style catalog.
#[derive(Debug)]
pub struct MirrorCatalog {
    base_url: String,
    dl_base_url: String,
    client: Client,
    cdn_re: Regex,
}

impl MirrorCatalog {
    /// Build a client against the given site and CDN base URLs.
    /// Trailing slashes are normalized away once here.
    pub fn new(base_url: &str, dl_base_url: &str) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        let dl_base_url = dl_base_url.trim_end_matches('/').to_string();
        let cdn_re = Regex::new(&format!(
            r#"({}/b/(?:XAPK|APK)/[^"'\s<>]+)"#,
            regex::escape(&dl_base_url)
        ))
        .unwrap();
        Self {
            base_url,
            dl_base_url,
            client: catalog_client(),
            cdn_re,
        }
    }

    fn latest_file_url(&self, package_id: &str, format: Format) -> String {
        format!(
            "{}/b/{}/{}?version=latest",
            self.dl_base_url,
            format.as_str(),
            package_id
        )
    }
}

impl Default for MirrorCatalog {
    fn default() -> Self {
        Self::new("https://apkpure.com", "https://d.apkpure.com")
    }
}

#[async_trait]
impl Catalog for MirrorCatalog {
    fn key(&self) -> &'static str {
        "mirror"
    }

    fn source(&self) -> SourceCatalog {
        SourceCatalog::MirrorSite
    }

    fn search_url(&self, package_id: &str) -> Option<String> {
        Some(format!(
            "{}/search?q={}",
            self.base_url,
            urlencoding::encode(package_id)
        ))
    }

    async fn find_app_page(&self, package_id: &str, display_hint: Option<&str>) -> Option<String> {
        let search = self.search_url(package_id)?;
        let html = fetch_page(&self.client, &search).await?;

        // Exact hit: an anchor whose path ends with the package id.
        let suffix = format!("/{package_id}");
        for cap in HREF_RE.captures_iter(&html) {
            let href = &cap[1];
            if href.ends_with(&suffix) {
                return Some(absolutize(&self.base_url, href));
            }
        }

        // First plausible result link.
        if let Some(cap) = RESULT_RE.captures(&html) {
            return Some(absolutize(&self.base_url, &cap[1]));
        }

        // Synthesize a slug from the display name.
        display_hint
            .map(slugify)
            .filter(|slug| !slug.is_empty())
            .map(|slug| format!("{}/{slug}/{package_id}", self.base_url))
    }

    async fn list_versions(&self, app_page_url: &str) -> Vec<CandidateVersion> {
        let url = format!("{}/versions", app_page_url.trim_end_matches('/'));
        let Some(html) = fetch_page(&self.client, &url).await else {
            return Vec::new();
        };

        let mut candidates = Vec::new();
        for block in VER_BLOCK_RE.captures_iter(&html) {
            let block = &block[1];
            let Some(href) = VER_HREF_RE.captures(block) else {
                continue;
            };
            let Some(name) = VER_NAME_RE.captures(block) else {
                continue;
            };
            let min_api = VER_REQ_RE
                .captures(block)
                .and_then(|c| api_for_android_version(&c[1]));
            let abi = VER_ABI_RE.captures(block).and_then(|c| c[1].parse().ok());
            let dpi = VER_DPI_RE.captures(block).and_then(|c| c[1].parse().ok());
            let format = VER_TAG_RE
                .captures(block)
                .and_then(|c| c[1].parse().ok())
                .unwrap_or(Format::Apk);

            candidates.push(CandidateVersion {
                version: name[1].to_string(),
                min_api_level: min_api,
                download_url: absolutize(&self.base_url, &href[1]),
                format,
                source: SourceCatalog::MirrorSite,
                abi,
                dpi,
                version_code: href[2].parse().ok(),
                direct: false,
            });
        }
        candidates
    }

    async fn resolve_download_link(&self, candidate: &CandidateVersion) -> Option<String> {
        let html = fetch_page(&self.client, &candidate.download_url).await?;
        self.cdn_re
            .captures(&html)
            .map(|cap| cap[1].to_string())
    }

    async fn latest_candidates(
        &self,
        package_id: &str,
        _display_hint: Option<&str>,
    ) -> Vec<LatestAttempt> {
        // Richer format first: an XAPK latest-file URL falls back to
        // plain APK before giving the catalog up.
        vec![
            LatestAttempt {
                url: self.latest_file_url(package_id, Format::Xapk),
                format: Some(Format::Xapk),
                tag: "mirror_xapk".to_string(),
                kind: AttemptKind::Direct,
            },
            LatestAttempt {
                url: self.latest_file_url(package_id, Format::Apk),
                format: Some(Format::Apk),
                tag: "mirror_apk".to_string(),
                kind: AttemptKind::Direct,
            },
        ]
    }
}
