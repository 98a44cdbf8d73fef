//! Core wire types: candidates, metadata, overrides, and results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::abi::{Abi, Dpi};
use crate::android::min_api_from_requirement;
use crate::device::DeviceProfile;

/// Packaging format of a downloadable artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Format {
    /// A single APK file.
    #[serde(alias = "apk")]
    Apk,
    /// A split-APK bundle (APKs plus OBB assets in a zip).
    #[serde(alias = "xapk")]
    Xapk,
}

impl Format {
    /// Uppercase name as it appears in catalog URLs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Apk => "APK",
            Self::Xapk => "XAPK",
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "apk" => Ok(Self::Apk),
            "xapk" => Ok(Self::Xapk),
            _ => Err(format!("Unknown format: {s}")),
        }
    }
}

/// Which upstream catalog produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SourceCatalog {
    /// Mirror-style catalog with structured per-variant tables.
    MirrorSite,
    /// Listing-style catalog with free-text version history.
    ListingSite,
    /// Curated known-versions table (last-resort strategy).
    KnownTable,
}

/// One downloadable build of an app version, scraped from a catalog.
///
/// Transient: produced per catalog query, ranked, and dropped. Never
/// persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateVersion {
    /// Dotted version label, possibly partial ("5.2").
    pub version: String,
    /// Minimum API level, when the catalog states one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_api_level: Option<u32>,
    /// Download or detail-page URL.
    pub download_url: String,
    /// Artifact packaging format.
    pub format: Format,
    /// Catalog that produced this candidate.
    pub source: SourceCatalog,
    /// Architecture restriction, when the variant table states one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abi: Option<Abi>,
    /// Density restriction, when the variant table states one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dpi: Option<Dpi>,
    /// Catalog-internal version code, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_code: Option<u64>,
    /// Whether `download_url` serves the file directly, or is a detail
    /// page that still needs one more hop.
    pub direct: bool,
}

/// Best-effort store metadata for a package.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppMetadata {
    /// Reverse-DNS package identifier.
    pub package_id: String,
    /// Human-readable app name.
    pub display_name: String,
    /// Free-text Android requirement ("8.0 and up", "Varies with device").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_android: Option<String>,
    /// Explicit minimum API level, when the provider knows it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_api_level: Option<u32>,
    /// Latest version label, when the provider knows it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_version: Option<String>,
}

impl AppMetadata {
    /// Minimum API level: the explicit field, or one derived from the
    /// free-text requirement. "Varies with device" derives nothing.
    pub fn effective_min_api(&self) -> Option<u32> {
        self.min_api_level.or_else(|| {
            self.required_android
                .as_deref()
                .and_then(min_api_from_requirement)
        })
    }
}

/// Device-targeting rule on a manual override entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OverrideTargeting {
    /// Entry applies only at or above this API level.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_api_level: Option<u32>,
    /// Entry applies only at or below this API level.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_api_level: Option<u32>,
    /// Entry applies only to these device models (substring match).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub device_models: Vec<String>,
    /// Entry applies only to these manufacturers (substring match).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub manufacturers: Vec<String>,
}

impl OverrideTargeting {
    /// Targeting specificity, for ranking competing entries:
    /// device-model rule beats manufacturer rule beats API-range-only
    /// rule beats untargeted.
    pub fn specificity(&self) -> u8 {
        if !self.device_models.is_empty() {
            3
        } else if !self.manufacturers.is_empty() {
            2
        } else if self.min_api_level.is_some() || self.max_api_level.is_some() {
            1
        } else {
            0
        }
    }

    /// Whether this rule matches the given profile.
    ///
    /// An API bound requires a known device API level; model and
    /// manufacturer rules match on case-insensitive substring in either
    /// direction.
    pub fn matches(&self, profile: &DeviceProfile) -> bool {
        if self.min_api_level.is_some() || self.max_api_level.is_some() {
            let Some(api) = profile.api_level else {
                return false;
            };
            if self.min_api_level.is_some_and(|min| api < min) {
                return false;
            }
            if self.max_api_level.is_some_and(|max| api > max) {
                return false;
            }
        }
        if !self.device_models.is_empty()
            && !matches_any(self.device_models.as_slice(), profile.model.as_deref())
        {
            return false;
        }
        if !self.manufacturers.is_empty()
            && !matches_any(self.manufacturers.as_slice(), profile.manufacturer.as_deref())
        {
            return false;
        }
        true
    }
}

fn matches_any(rules: &[String], hint: Option<&str>) -> bool {
    let Some(hint) = hint else {
        return false;
    };
    let hint = hint.to_lowercase();
    rules.iter().any(|rule| {
        let rule = rule.to_lowercase();
        hint.contains(&rule) || rule.contains(&hint)
    })
}

/// A manually curated download entry, owned by the external override
/// store and consumed read-only by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideEntry {
    /// Store-assigned row id.
    pub id: i64,
    /// Package this entry overrides.
    pub package_id: String,
    /// Device-targeting rule.
    #[serde(default)]
    pub targeting: OverrideTargeting,
    /// Verified download URL, returned verbatim on match.
    pub download_url: String,
    /// Version label of the curated artifact.
    pub version: String,
    /// Artifact format.
    pub format: Format,
    /// Disabled entries are never selected.
    pub enabled: bool,
    /// Entry stops matching after this instant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    /// Times this entry was served.
    #[serde(default)]
    pub install_count: i64,
    /// Times a caller reported this entry failed to install.
    #[serde(default)]
    pub failure_count: i64,
}

impl OverrideEntry {
    /// Whether this entry may be considered at all: enabled and not
    /// past its expiry.
    pub fn usable_at(&self, now: DateTime<Utc>) -> bool {
        self.enabled && self.expires_at.is_none_or(|t| t > now)
    }
}

/// Structured verdict from a header-only probe of a candidate URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VerifyVerdict {
    /// The URL answered with a success status.
    pub reachable: bool,
    /// HTTP status, when a response arrived at all.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Declared content length.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    /// Declared content type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// URL after redirects.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_url: Option<String>,
    /// Human-readable notes on anything suspicious.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl VerifyVerdict {
    /// Whether the probe looks like a real binary rather than an error
    /// page: reachable, declared size above `floor_bytes`, and -- when
    /// a content type is present at all -- a package/octet-stream type.
    pub fn plausible_binary(&self, floor_bytes: u64) -> bool {
        if !self.reachable {
            return false;
        }
        let Some(size) = self.size_bytes else {
            return false;
        };
        if size <= floor_bytes {
            return false;
        }
        match self.content_type.as_deref() {
            None => true,
            Some(ct) => {
                let ct = ct.to_lowercase();
                ct.contains("android.package-archive")
                    || ct.contains("octet-stream")
                    || ct.contains("application/zip")
                    || ct.contains("apk")
            }
        }
    }
}

/// Manual-search fallback handed to the caller when no direct file
/// could be confirmed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualFallback {
    /// One search page per catalog that has one.
    pub links: Vec<FallbackLink>,
}

/// A single catalog search page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FallbackLink {
    /// Catalog key ("mirror", "listing").
    pub catalog: String,
    /// Search-results URL for the package.
    pub search_url: String,
}

/// Sole output of the resolution pipeline. Constructed exactly once per
/// request; never mutated afterward.
///
/// Invariants: `success` implies a non-empty `download_url`;
/// `compatible == Some(false)` implies `!success` and a present
/// `manual_fallback`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResolutionResult {
    /// Whether a usable download URL was found.
    pub success: bool,
    /// The resolved URL, present iff `success`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    /// Requested package.
    pub package_id: String,
    /// Display name, from metadata when available, else the package id.
    pub display_name: String,
    /// Version label of the resolved artifact, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Minimum API level of the resolved artifact, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_api_level: Option<u32>,
    /// Artifact format, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<Format>,
    /// The older-version branch produced this result.
    pub is_older_version: bool,
    /// Definitive compatibility determination, when one was made.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compatible: Option<bool>,
    /// Caller may re-invoke with `request_older` after an install
    /// failure.
    pub can_retry_with_older: bool,
    /// Which pipeline state produced the result ("manual_override",
    /// "mirror_xapk", ...).
    pub source_tag: String,
    /// Search pages to try by hand, when nothing could be confirmed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manual_fallback: Option<ManualFallback>,
}

/// One line of the resolution audit log, appended best-effort through
/// the override store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionLogEntry {
    /// Requested package.
    pub package_id: String,
    /// Source tag of the outcome.
    pub source_tag: String,
    /// Resolved version, when any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Device API level of the request, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_api_level: Option<u32>,
    /// Whether the request succeeded.
    pub success: bool,
    /// When the resolution happened.
    pub resolved_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_min_api_prefers_explicit() {
        let meta = AppMetadata {
            min_api_level: Some(24),
            required_android: Some("8.0 and up".into()),
            ..AppMetadata::default()
        };
        assert_eq!(meta.effective_min_api(), Some(24));
    }

    #[test]
    fn test_effective_min_api_from_text() {
        let meta = AppMetadata {
            required_android: Some("Android 8.0+".into()),
            ..AppMetadata::default()
        };
        assert_eq!(meta.effective_min_api(), Some(26));

        let varies = AppMetadata {
            required_android: Some("Varies with device".into()),
            ..AppMetadata::default()
        };
        assert_eq!(varies.effective_min_api(), None);
    }

    #[test]
    fn test_targeting_specificity_order() {
        let model = OverrideTargeting {
            device_models: vec!["Pixel 6".into()],
            ..OverrideTargeting::default()
        };
        let manufacturer = OverrideTargeting {
            manufacturers: vec!["Samsung".into()],
            ..OverrideTargeting::default()
        };
        let api_only = OverrideTargeting {
            max_api_level: Some(29),
            ..OverrideTargeting::default()
        };
        let untargeted = OverrideTargeting::default();
        assert!(model.specificity() > manufacturer.specificity());
        assert!(manufacturer.specificity() > api_only.specificity());
        assert!(api_only.specificity() > untargeted.specificity());
    }

    #[test]
    fn test_targeting_api_range() {
        let rule = OverrideTargeting {
            max_api_level: Some(29),
            ..OverrideTargeting::default()
        };
        let mut profile = DeviceProfile {
            api_level: Some(25),
            ..DeviceProfile::default()
        };
        assert!(rule.matches(&profile));
        profile.api_level = Some(30);
        assert!(!rule.matches(&profile));
        // API bounds need a known device API.
        profile.api_level = None;
        assert!(!rule.matches(&profile));
    }

    #[test]
    fn test_targeting_model_substring_both_directions() {
        let rule = OverrideTargeting {
            device_models: vec!["pixel".into()],
            ..OverrideTargeting::default()
        };
        let profile = DeviceProfile {
            model: Some("Google Pixel 6 Pro".into()),
            ..DeviceProfile::default()
        };
        assert!(rule.matches(&profile));

        let rule_long = OverrideTargeting {
            device_models: vec!["Google Pixel 6 Pro (2021)".into()],
            ..OverrideTargeting::default()
        };
        assert!(rule_long.matches(&profile));

        let no_model = DeviceProfile::default();
        assert!(!rule.matches(&no_model));
    }

    #[test]
    fn test_usable_at_expiry() {
        let now = Utc::now();
        let entry = OverrideEntry {
            id: 1,
            package_id: "com.example.app".into(),
            targeting: OverrideTargeting::default(),
            download_url: "https://cdn.example.com/a.apk".into(),
            version: "1.0".into(),
            format: Format::Apk,
            enabled: true,
            expires_at: Some(now - chrono::Duration::hours(1)),
            install_count: 0,
            failure_count: 0,
        };
        assert!(!entry.usable_at(now));
        let mut live = entry.clone();
        live.expires_at = None;
        assert!(live.usable_at(now));
        live.enabled = false;
        assert!(!live.usable_at(now));
    }

    #[test]
    fn test_plausible_binary() {
        let verdict = VerifyVerdict {
            reachable: true,
            size_bytes: Some(10 * 1024 * 1024),
            content_type: Some("application/vnd.android.package-archive".into()),
            ..VerifyVerdict::default()
        };
        assert!(verdict.plausible_binary(1024 * 1024));

        let tiny = VerifyVerdict {
            reachable: true,
            size_bytes: Some(4096),
            ..VerifyVerdict::default()
        };
        assert!(!tiny.plausible_binary(1024 * 1024));

        let html = VerifyVerdict {
            reachable: true,
            size_bytes: Some(10 * 1024 * 1024),
            content_type: Some("text/html".into()),
            ..VerifyVerdict::default()
        };
        assert!(!html.plausible_binary(1024 * 1024));

        let unreachable = VerifyVerdict::default();
        assert!(!unreachable.plausible_binary(0));
    }

    #[test]
    fn test_result_json_shape() {
        let result = ResolutionResult {
            success: true,
            download_url: Some("https://dl.example.com/b/XAPK/com.example.app".into()),
            package_id: "com.example.app".into(),
            display_name: "Example".into(),
            format: Some(Format::Xapk),
            can_retry_with_older: true,
            source_tag: "mirror_xapk".into(),
            ..ResolutionResult::default()
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["downloadUrl"], "https://dl.example.com/b/XAPK/com.example.app");
        assert_eq!(json["format"], "XAPK");
        assert_eq!(json["canRetryWithOlder"], true);
        assert!(json.get("manualFallback").is_none());
    }
}
