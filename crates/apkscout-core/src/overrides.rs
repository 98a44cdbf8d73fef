//! Override store interface and the in-memory implementation.
//!
//! Overrides are manually curated download entries consulted before any
//! scraping. The store is externally owned; the pipeline reads entries
//! and fires best-effort counter increments, nothing more. An
//! unconfigured store is a typed absence on the resolver, not a flag.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use apkscout_schema::{DeviceProfile, OverrideEntry, ResolutionLogEntry};

/// External store of manual override entries.
#[async_trait]
pub trait OverrideStore: Send + Sync {
    /// All entries for a package, in store order.
    async fn query_by_package(&self, package_id: &str) -> Vec<OverrideEntry>;

    /// Atomically bump the install counter for an entry. Returns
    /// whether the increment took; failures are the caller's to
    /// ignore.
    async fn increment_install_count(&self, id: i64) -> bool;

    /// Append a resolution audit line. Best-effort.
    async fn append_log(&self, entry: ResolutionLogEntry) -> bool;
}

/// Pick the winning override for a profile.
///
/// Disabled and expired entries are dropped, the rest are ranked by
/// targeting specificity (device-model beats manufacturer beats
/// API-range-only beats untargeted), and the first whose rule matches
/// the profile wins.
pub fn select_override(
    entries: Vec<OverrideEntry>,
    profile: &DeviceProfile,
    now: DateTime<Utc>,
) -> Option<OverrideEntry> {
    let mut live: Vec<OverrideEntry> = entries
        .into_iter()
        .filter(|e| e.usable_at(now))
        .collect();
    // Stable sort keeps store order within a specificity tier.
    live.sort_by_key(|e| std::cmp::Reverse(e.targeting.specificity()));
    live.into_iter().find(|e| e.targeting.matches(profile))
}

/// In-memory override store for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryOverrideStore {
    entries: Mutex<Vec<OverrideEntry>>,
    logs: Mutex<Vec<ResolutionLogEntry>>,
}

impl MemoryOverrideStore {
    /// Build a store holding the given entries.
    pub fn new(entries: Vec<OverrideEntry>) -> Self {
        Self {
            entries: Mutex::new(entries),
            logs: Mutex::new(Vec::new()),
        }
    }

    /// Install counts per entry id, for assertions.
    pub fn install_counts(&self) -> HashMap<i64, i64> {
        self.entries
            .lock()
            .map(|entries| entries.iter().map(|e| (e.id, e.install_count)).collect())
            .unwrap_or_default()
    }

    /// Appended log lines, for assertions.
    pub fn logs(&self) -> Vec<ResolutionLogEntry> {
        self.logs.lock().map(|l| l.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl OverrideStore for MemoryOverrideStore {
    async fn query_by_package(&self, package_id: &str) -> Vec<OverrideEntry> {
        self.entries
            .lock()
            .map(|entries| {
                entries
                    .iter()
                    .filter(|e| e.package_id == package_id)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    async fn increment_install_count(&self, id: i64) -> bool {
        let Ok(mut entries) = self.entries.lock() else {
            return false;
        };
        match entries.iter_mut().find(|e| e.id == id) {
            Some(entry) => {
                entry.install_count += 1;
                true
            }
            None => false,
        }
    }

    async fn append_log(&self, entry: ResolutionLogEntry) -> bool {
        match self.logs.lock() {
            Ok(mut logs) => {
                logs.push(entry);
                true
            }
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apkscout_schema::{Format, OverrideTargeting};

    fn entry(id: i64, targeting: OverrideTargeting) -> OverrideEntry {
        OverrideEntry {
            id,
            package_id: "com.example.app".into(),
            targeting,
            download_url: format!("https://cdn.example.com/{id}.apk"),
            version: "2.0".into(),
            format: Format::Apk,
            enabled: true,
            expires_at: None,
            install_count: 0,
            failure_count: 0,
        }
    }

    #[test]
    fn test_model_rule_beats_untargeted() {
        let profile = DeviceProfile {
            api_level: Some(30),
            model: Some("Pixel 6".into()),
            ..DeviceProfile::default()
        };
        let winner = select_override(
            vec![
                entry(1, OverrideTargeting::default()),
                entry(
                    2,
                    OverrideTargeting {
                        device_models: vec!["pixel".into()],
                        ..OverrideTargeting::default()
                    },
                ),
            ],
            &profile,
            Utc::now(),
        )
        .unwrap();
        assert_eq!(winner.id, 2);
    }

    #[test]
    fn test_non_matching_specific_rule_falls_through() {
        let profile = DeviceProfile {
            model: Some("Pixel 6".into()),
            ..DeviceProfile::default()
        };
        let winner = select_override(
            vec![
                entry(
                    1,
                    OverrideTargeting {
                        device_models: vec!["galaxy".into()],
                        ..OverrideTargeting::default()
                    },
                ),
                entry(2, OverrideTargeting::default()),
            ],
            &profile,
            Utc::now(),
        )
        .unwrap();
        assert_eq!(winner.id, 2);
    }

    #[test]
    fn test_disabled_and_expired_are_dropped() {
        let now = Utc::now();
        let mut disabled = entry(1, OverrideTargeting::default());
        disabled.enabled = false;
        let mut expired = entry(2, OverrideTargeting::default());
        expired.expires_at = Some(now - chrono::Duration::minutes(1));
        assert!(select_override(vec![disabled, expired], &DeviceProfile::default(), now).is_none());
    }

    #[tokio::test]
    async fn test_memory_store_counters() {
        let store = MemoryOverrideStore::new(vec![entry(7, OverrideTargeting::default())]);
        assert!(store.increment_install_count(7).await);
        assert!(store.increment_install_count(7).await);
        assert!(!store.increment_install_count(99).await);
        assert_eq!(store.install_counts()[&7], 2);
    }
}
