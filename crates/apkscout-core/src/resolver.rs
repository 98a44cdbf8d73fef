//! The resolution pipeline.
//!
//! Ordered, multi-source lookup with compatibility filtering: override
//! store, then metadata-informed branch decision, then either the
//! older-version search or the latest-version attempt chain across the
//! configured catalogs, with a manual-search fallback when nothing can
//! be confirmed.
//!
//! `resolve` returns a [`ResolutionResult`], not a `Result`: every
//! upstream failure is demoted to a source miss at its call site, so no
//! combination of 4xx/5xx/timeouts can propagate out of the pipeline.

use std::sync::Arc;

use chrono::Utc;

use apkscout_schema::{
    AppMetadata, DeviceProfile, FallbackLink, ManualFallback, ResolutionLogEntry,
    ResolutionResult, ScoreWeights, VerifyVerdict, rank_candidates,
};

use crate::catalog::{AttemptKind, Catalog};
use crate::metadata::MetadataProvider;
use crate::overrides::{OverrideStore, select_override};
use crate::verify::{LinkVerifier, VerifyPolicy};

/// Source tag for override-backed results.
pub const TAG_MANUAL_OVERRIDE: &str = "manual_override";
/// Source tag for results where every state came up empty.
pub const TAG_NONE: &str = "none";

/// Builder for [`Resolver`]. Catalogs are tried in the order they are
/// added; absent collaborators are typed absences, never flags.
#[derive(Default)]
pub struct ResolverBuilder {
    catalogs: Vec<Arc<dyn Catalog>>,
    metadata: Option<Arc<dyn MetadataProvider>>,
    overrides: Option<Arc<dyn OverrideStore>>,
    weights: Option<ScoreWeights>,
    verify_policy: Option<VerifyPolicy>,
}

impl std::fmt::Debug for ResolverBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolverBuilder")
            .field("catalogs", &self.catalogs.len())
            .field("metadata", &self.metadata.is_some())
            .field("overrides", &self.overrides.is_some())
            .finish_non_exhaustive()
    }
}

impl ResolverBuilder {
    /// Start an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a catalog at the next-lowest priority.
    pub fn catalog(mut self, catalog: Arc<dyn Catalog>) -> Self {
        self.catalogs.push(catalog);
        self
    }

    /// Attach a metadata provider.
    pub fn metadata(mut self, provider: Arc<dyn MetadataProvider>) -> Self {
        self.metadata = Some(provider);
        self
    }

    /// Attach an override store.
    pub fn overrides(mut self, store: Arc<dyn OverrideStore>) -> Self {
        self.overrides = Some(store);
        self
    }

    /// Replace the default scoring weights.
    pub fn weights(mut self, weights: ScoreWeights) -> Self {
        self.weights = Some(weights);
        self
    }

    /// Replace the default verification policy.
    pub fn verify_policy(mut self, policy: VerifyPolicy) -> Self {
        self.verify_policy = Some(policy);
        self
    }

    /// Finish the resolver.
    pub fn build(self) -> Resolver {
        Resolver {
            catalogs: self.catalogs,
            verifier: LinkVerifier::new(self.verify_policy.unwrap_or_default()),
            metadata: self.metadata,
            overrides: self.overrides,
            weights: self.weights.unwrap_or_default(),
        }
    }
}

/// The configured pipeline. One instance serves arbitrarily many
/// concurrent, independent requests; it holds no per-request state.
pub struct Resolver {
    catalogs: Vec<Arc<dyn Catalog>>,
    verifier: LinkVerifier,
    metadata: Option<Arc<dyn MetadataProvider>>,
    overrides: Option<Arc<dyn OverrideStore>>,
    weights: ScoreWeights,
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("catalogs", &self.catalogs.len())
            .field("metadata", &self.metadata.is_some())
            .field("overrides", &self.overrides.is_some())
            .finish_non_exhaustive()
    }
}

impl Resolver {
    /// Start building a resolver.
    pub fn builder() -> ResolverBuilder {
        ResolverBuilder::new()
    }

    /// Probe a URL with the pipeline's verifier. Dashboard surface.
    pub async fn verify_url(&self, url: &str) -> VerifyVerdict {
        self.verifier.verify(url).await
    }

    /// Resolve a single download URL for the package, best-effort.
    pub async fn resolve(&self, package_id: &str, profile: &DeviceProfile) -> ResolutionResult {
        // State 1: override check, only when a store is configured.
        if let Some(store) = &self.overrides {
            let entries = store.query_by_package(package_id).await;
            if let Some(entry) = select_override(entries, profile, Utc::now()) {
                tracing::debug!(package_id, entry_id = entry.id, "override matched");
                if !store.increment_install_count(entry.id).await {
                    tracing::debug!(entry_id = entry.id, "install counter bump failed");
                }
                let result = ResolutionResult {
                    success: true,
                    download_url: Some(entry.download_url.clone()),
                    package_id: package_id.to_string(),
                    display_name: package_id.to_string(),
                    version: Some(entry.version.clone()),
                    min_api_level: entry.targeting.min_api_level,
                    format: Some(entry.format),
                    source_tag: TAG_MANUAL_OVERRIDE.to_string(),
                    ..ResolutionResult::default()
                };
                self.log_outcome(&result, profile).await;
                return result;
            }
        }

        // State 2: best-effort metadata.
        let metadata = match &self.metadata {
            Some(provider) => provider.lookup(package_id).await,
            None => None,
        };
        let min_api = metadata.as_ref().and_then(AppMetadata::effective_min_api);

        // State 3: branch decision. A package with no metadata at all
        // is still resolvable -- unknown min API biases toward
        // "assume compatible".
        let must_find_older = profile.request_older
            || matches!(
                (min_api, profile.api_level),
                (Some(min), Some(api)) if min > api
            );

        let result = if must_find_older {
            self.resolve_older(package_id, profile, metadata.as_ref()).await
        } else {
            self.resolve_latest(package_id, profile, metadata.as_ref(), min_api)
                .await
        };
        self.log_outcome(&result, profile).await;
        result
    }

    /// State 4: search catalogs in priority order for an older,
    /// compatible version.
    async fn resolve_older(
        &self,
        package_id: &str,
        profile: &DeviceProfile,
        metadata: Option<&AppMetadata>,
    ) -> ResolutionResult {
        let display_hint = display_hint(metadata);
        for catalog in &self.catalogs {
            let Some(page) = catalog.find_app_page(package_id, display_hint).await else {
                tracing::debug!(catalog = catalog.key(), "no app page");
                continue;
            };
            let candidates = catalog.list_versions(&page).await;
            if candidates.is_empty() {
                continue;
            }
            let ranked = rank_candidates(candidates, profile, &self.weights);
            for candidate in ranked.usable() {
                let url = if candidate.direct {
                    Some(candidate.download_url.clone())
                } else {
                    catalog.resolve_download_link(candidate).await
                };
                let Some(url) = url else { continue };
                if catalog.needs_verification() {
                    let verdict = self.verifier.verify(&url).await;
                    if !verdict.plausible_binary(self.verifier.policy().min_apk_bytes) {
                        tracing::debug!(%url, "guessed link failed verification");
                        continue;
                    }
                }
                return ResolutionResult {
                    success: true,
                    download_url: Some(url),
                    package_id: package_id.to_string(),
                    display_name: self.display_name(package_id, metadata),
                    version: Some(candidate.version.clone()),
                    min_api_level: candidate.min_api_level,
                    format: Some(candidate.format),
                    is_older_version: true,
                    compatible: Some(true),
                    source_tag: format!("{}_versions", catalog.key()),
                    ..ResolutionResult::default()
                };
            }
            tracing::debug!(catalog = catalog.key(), "no usable candidate");
        }

        // Every catalog exhausted: definitive incompatibility, with
        // search pages the user can try by hand.
        ResolutionResult {
            success: false,
            package_id: package_id.to_string(),
            display_name: self.display_name(package_id, metadata),
            is_older_version: true,
            compatible: Some(false),
            source_tag: TAG_NONE.to_string(),
            manual_fallback: Some(self.manual_fallback(package_id)),
            ..ResolutionResult::default()
        }
    }

    /// State 5: try each catalog's latest-version attempts.
    async fn resolve_latest(
        &self,
        package_id: &str,
        _profile: &DeviceProfile,
        metadata: Option<&AppMetadata>,
        min_api: Option<u32>,
    ) -> ResolutionResult {
        let display_hint = display_hint(metadata);
        for catalog in &self.catalogs {
            for attempt in catalog.latest_candidates(package_id, display_hint).await {
                let verdict = self.verifier.verify(&attempt.url).await;
                let usable = match attempt.kind {
                    AttemptKind::Direct => {
                        verdict.plausible_binary(self.verifier.policy().min_binary_bytes)
                    }
                    AttemptKind::AppPage => verdict.reachable,
                };
                if !usable {
                    tracing::debug!(url = %attempt.url, tag = %attempt.tag, "latest attempt miss");
                    continue;
                }
                return ResolutionResult {
                    success: true,
                    download_url: Some(attempt.url),
                    package_id: package_id.to_string(),
                    display_name: self.display_name(package_id, metadata),
                    version: metadata.and_then(|m| m.latest_version.clone()),
                    min_api_level: min_api,
                    format: attempt.format,
                    // An install failure on the latest build is the
                    // caller's cue to retry with request_older set.
                    can_retry_with_older: true,
                    source_tag: attempt.tag,
                    ..ResolutionResult::default()
                };
            }
        }

        ResolutionResult {
            success: false,
            package_id: package_id.to_string(),
            display_name: self.display_name(package_id, metadata),
            source_tag: TAG_NONE.to_string(),
            manual_fallback: Some(self.manual_fallback(package_id)),
            ..ResolutionResult::default()
        }
    }

    fn manual_fallback(&self, package_id: &str) -> ManualFallback {
        ManualFallback {
            links: self
                .catalogs
                .iter()
                .filter_map(|c| {
                    c.search_url(package_id).map(|search_url| FallbackLink {
                        catalog: c.key().to_string(),
                        search_url,
                    })
                })
                .collect(),
        }
    }

    fn display_name(&self, package_id: &str, metadata: Option<&AppMetadata>) -> String {
        metadata
            .map(|m| m.display_name.clone())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| package_id.to_string())
    }

    async fn log_outcome(&self, result: &ResolutionResult, profile: &DeviceProfile) {
        let Some(store) = &self.overrides else { return };
        let entry = ResolutionLogEntry {
            package_id: result.package_id.clone(),
            source_tag: result.source_tag.clone(),
            version: result.version.clone(),
            device_api_level: profile.api_level,
            success: result.success,
            resolved_at: Utc::now(),
        };
        if !store.append_log(entry).await {
            tracing::debug!(package_id = %result.package_id, "audit log append failed");
        }
    }
}

fn display_hint(metadata: Option<&AppMetadata>) -> Option<&str> {
    metadata
        .map(|m| m.display_name.as_str())
        .filter(|name| !name.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use apkscout_schema::{Format, OverrideEntry, OverrideTargeting};
    use mockito::{Server, ServerGuard};

    use crate::catalog::{KnownVersionsCatalog, ListingCatalog, MirrorCatalog};
    use crate::metadata::StaticMetadataProvider;
    use crate::overrides::MemoryOverrideStore;

    const PKG: &str = "com.example.app";

    fn profile(api: Option<u32>) -> DeviceProfile {
        DeviceProfile {
            api_level: api,
            ..DeviceProfile::default()
        }
    }

    fn metadata_provider(required: &str) -> Arc<StaticMetadataProvider> {
        Arc::new(StaticMetadataProvider::new(vec![AppMetadata {
            package_id: PKG.into(),
            display_name: "Example App".into(),
            required_android: Some(required.into()),
            latest_version: Some("6.0.0".into()),
            ..AppMetadata::default()
        }]))
    }

    fn override_entry(id: i64, targeting: OverrideTargeting) -> OverrideEntry {
        OverrideEntry {
            id,
            package_id: PKG.into(),
            targeting,
            download_url: format!("https://curated.example.com/{id}.apk"),
            version: "3.1.4".into(),
            format: Format::Apk,
            enabled: true,
            expires_at: None,
            install_count: 0,
            failure_count: 0,
        }
    }

    /// Both catalogs pointed at a connection-refused port.
    fn unreachable_catalogs(builder: ResolverBuilder) -> ResolverBuilder {
        builder
            .catalog(Arc::new(MirrorCatalog::new(
                "http://127.0.0.1:9",
                "http://127.0.0.1:9",
            )))
            .catalog(Arc::new(ListingCatalog::new(
                "http://127.0.0.1:9",
                "http://127.0.0.1:9",
            )))
    }

    #[tokio::test]
    async fn test_override_wins_and_counter_bumps_once() {
        let store = Arc::new(MemoryOverrideStore::new(vec![
            override_entry(1, OverrideTargeting::default()),
            override_entry(
                2,
                OverrideTargeting {
                    max_api_level: Some(29),
                    ..OverrideTargeting::default()
                },
            ),
        ]));
        let resolver = unreachable_catalogs(Resolver::builder())
            .overrides(store.clone())
            .build();

        let result = resolver.resolve(PKG, &profile(Some(25))).await;
        assert!(result.success);
        assert_eq!(result.source_tag, TAG_MANUAL_OVERRIDE);
        // API-range rule is more specific than the untargeted entry.
        assert_eq!(
            result.download_url.as_deref(),
            Some("https://curated.example.com/2.apk")
        );
        assert_eq!(store.install_counts()[&2], 1);
        assert_eq!(store.install_counts()[&1], 0);
        assert_eq!(store.logs().len(), 1);
        assert!(store.logs()[0].success);
    }

    #[tokio::test]
    async fn test_incompatible_device_with_dead_catalogs() {
        let resolver = unreachable_catalogs(Resolver::builder())
            .metadata(metadata_provider("Android 12+"))
            .build();

        // Metadata demands API 31; the device has 30; every catalog is
        // unreachable.
        let result = resolver.resolve(PKG, &profile(Some(30))).await;
        assert!(!result.success);
        assert_eq!(result.compatible, Some(false));
        assert!(result.download_url.is_none());
        let fallback = result.manual_fallback.expect("manual fallback expected");
        assert_eq!(fallback.links.len(), 2);
        assert!(fallback.links.iter().any(|l| l.catalog == "mirror"));
    }

    async fn mirror_latest_server() -> ServerGuard {
        let mut server = Server::new_async().await;
        server
            .mock("HEAD", "/b/XAPK/com.example.app?version=latest")
            .with_status(200)
            .with_header("content-length", "52428800")
            .with_header("content-type", "application/octet-stream")
            .create_async()
            .await;
        server
    }

    #[tokio::test]
    async fn test_latest_xapk_happy_path() {
        let server = mirror_latest_server().await;
        let resolver = Resolver::builder()
            .catalog(Arc::new(MirrorCatalog::new("http://127.0.0.1:9", &server.url())))
            .metadata(metadata_provider("Android 5.0 and up"))
            .build();

        let result = resolver.resolve(PKG, &profile(Some(34))).await;
        assert!(result.success);
        assert_eq!(result.source_tag, "mirror_xapk");
        assert_eq!(result.format, Some(Format::Xapk));
        assert!(result.can_retry_with_older);
        assert!(!result.is_older_version);
        assert_eq!(result.display_name, "Example App");
        assert_eq!(result.version.as_deref(), Some("6.0.0"));
        assert_eq!(
            result.download_url.as_deref(),
            Some(format!("{}/b/XAPK/com.example.app?version=latest", server.url()).as_str())
        );
    }

    #[tokio::test]
    async fn test_latest_falls_back_to_simpler_format() {
        let mut server = Server::new_async().await;
        // XAPK latest serves a 2 KB placeholder; APK latest is real.
        server
            .mock("HEAD", "/b/XAPK/com.example.app?version=latest")
            .with_status(200)
            .with_header("content-length", "2048")
            .create_async()
            .await;
        server
            .mock("HEAD", "/b/APK/com.example.app?version=latest")
            .with_status(200)
            .with_header("content-length", "31457280")
            .with_header("content-type", "application/vnd.android.package-archive")
            .create_async()
            .await;

        let resolver = Resolver::builder()
            .catalog(Arc::new(MirrorCatalog::new("http://127.0.0.1:9", &server.url())))
            .build();

        let result = resolver.resolve(PKG, &profile(Some(34))).await;
        assert!(result.success);
        assert_eq!(result.source_tag, "mirror_apk");
        assert_eq!(result.format, Some(Format::Apk));
    }

    async fn mirror_older_server() -> ServerGuard {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/search?q=com.example.app")
            .with_status(200)
            .with_body(r#"<a href="/example-app/com.example.app">Example App</a>"#)
            .create_async()
            .await;
        server
            .mock("GET", "/example-app/com.example.app/versions")
            .with_status(200)
            .with_body(
                r#"
                <div class="ver-item">
                  <a href="/example-app/com.example.app/download/600000">
                    <span class="ver-name">6.0.0</span>
                    <span class="ver-req">Android 13+</span>
                  </a>
                </div>
                <div class="ver-item">
                  <a href="/example-app/com.example.app/download/510000">
                    <span class="ver-name">5.1.0</span>
                    <span class="ver-req">Android 5.0+</span>
                  </a>
                </div>
                "#,
            )
            .create_async()
            .await;
        server
    }

    #[tokio::test]
    async fn test_older_branch_skips_disqualified_candidate() {
        let mut server = mirror_older_server().await;
        let dl_base = format!("{}/cdn", server.url());
        server
            .mock("GET", "/example-app/com.example.app/download/510000")
            .with_status(200)
            .with_body(format!(
                r#"<script>var u = "{dl_base}/b/APK/com.example.app?versionCode=510000";</script>"#
            ))
            .create_async()
            .await;

        let resolver = Resolver::builder()
            .catalog(Arc::new(MirrorCatalog::new(&server.url(), &dl_base)))
            .build();

        // Device at API 30: 6.0.0 needs 33 and is disqualified; 5.1.0
        // fits and must win despite being older.
        let mut p = profile(Some(30));
        p.request_older = true;
        let result = resolver.resolve(PKG, &p).await;
        assert!(result.success);
        assert!(result.is_older_version);
        assert_eq!(result.version.as_deref(), Some("5.1.0"));
        assert_eq!(result.source_tag, "mirror_versions");
        assert_eq!(
            result.download_url.as_deref(),
            Some(format!("{dl_base}/b/APK/com.example.app?versionCode=510000").as_str())
        );
    }

    #[tokio::test]
    async fn test_known_catalog_probes_and_verifies() {
        let mut server = Server::new_async().await;
        server
            .mock("HEAD", "/apks/com.example.app/420.apk")
            .with_status(404)
            .create_async()
            .await;
        server
            .mock("HEAD", "/apks/com.example.app/410.apk")
            .with_status(200)
            .with_header("content-length", "31457280")
            .with_header("content-type", "application/octet-stream")
            .create_async()
            .await;

        let table = format!(
            r#"
            [[package]]
            id = "com.example.app"

            [package.probe]
            url_template = "{}/apks/{{package}}/{{code}}.apk"
            version_codes = [420, 410]
            "#,
            server.url()
        );
        let resolver = Resolver::builder()
            .catalog(Arc::new(KnownVersionsCatalog::from_toml(&table).unwrap()))
            .build();

        let mut p = profile(Some(30));
        p.request_older = true;
        let result = resolver.resolve(PKG, &p).await;
        assert!(result.success);
        // 420 guessed first (newer), failed verification; 410 won.
        assert_eq!(result.version.as_deref(), Some("410"));
        assert_eq!(result.source_tag, "known_versions");
    }

    #[tokio::test]
    async fn test_upstream_error_matrix_never_propagates() {
        // 403 on one catalog, 500 on the other, dead CDN. Still a
        // structured result.
        let mut server = Server::new_async().await;
        server
            .mock("GET", mockito::Matcher::Any)
            .with_status(403)
            .create_async()
            .await;
        let mut server2 = Server::new_async().await;
        server2
            .mock("GET", mockito::Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let resolver = Resolver::builder()
            .catalog(Arc::new(MirrorCatalog::new(&server.url(), "http://127.0.0.1:9")))
            .catalog(Arc::new(ListingCatalog::new(&server2.url(), "http://127.0.0.1:9")))
            .build();

        for api in [None, Some(1), Some(30)] {
            let mut p = profile(api);
            let latest = resolver.resolve(PKG, &p).await;
            assert!(!latest.success);
            assert!(latest.manual_fallback.is_some());

            p.request_older = true;
            let older = resolver.resolve(PKG, &p).await;
            assert!(!older.success);
            assert_eq!(older.compatible, Some(false));
        }
    }

    #[tokio::test]
    async fn test_repeat_resolution_is_idempotent() {
        let server = mirror_latest_server().await;
        let resolver = Resolver::builder()
            .catalog(Arc::new(MirrorCatalog::new("http://127.0.0.1:9", &server.url())))
            .build();

        let first = resolver.resolve(PKG, &profile(Some(34))).await;
        let second = resolver.resolve(PKG, &profile(Some(34))).await;
        assert_eq!(first.source_tag, second.source_tag);
        assert_eq!(first.download_url, second.download_url);
    }

    #[tokio::test]
    async fn test_no_metadata_assumes_compatible() {
        let server = mirror_latest_server().await;
        // No metadata provider at all: the latest branch is taken and
        // compatibility checks are skipped.
        let resolver = Resolver::builder()
            .catalog(Arc::new(MirrorCatalog::new("http://127.0.0.1:9", &server.url())))
            .build();

        let result = resolver.resolve(PKG, &profile(None)).await;
        assert!(result.success);
        assert_eq!(result.display_name, PKG);
        assert_eq!(result.compatible, None);
    }
}
