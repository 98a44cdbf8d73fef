//! Compatibility scoring and candidate ranking.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::abi::{Abi, Dpi};
use crate::device::DeviceProfile;
use crate::types::CandidateVersion;
use crate::version::compare_versions;

/// Tunable scoring constants.
///
/// Defaults preserve the relative ordering that matters: architecture
/// outweighs API compatibility outweighs density, and the
/// disqualification penalty dominates every positive signal combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScoreWeights {
    /// Variant ABI equals device ABI.
    pub abi_exact: i32,
    /// Variant is universal or carries no ABI restriction.
    pub abi_universal: i32,
    /// 64-bit device accepting a 32-bit-only variant.
    pub abi_backward_compat: i32,
    /// Stated minimum API level is satisfied by the device.
    pub api_satisfied: i32,
    /// Stated minimum API level exceeds the device's. Disqualifying.
    pub api_exceeded: i32,
    /// Variant density equals device density.
    pub dpi_exact: i32,
    /// Variant is density-agnostic.
    pub dpi_agnostic: i32,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            abi_exact: 100,
            abi_universal: 50,
            abi_backward_compat: 30,
            api_satisfied: 50,
            api_exceeded: -1000,
            dpi_exact: 20,
            dpi_agnostic: 10,
        }
    }
}

/// Score a candidate against a device profile.
///
/// Unknown fields on either side contribute nothing: a device with no
/// stated ABI neither rewards nor penalizes ABI-restricted variants.
/// Any negative total means the candidate is disqualified.
pub fn compatibility_score(
    candidate: &CandidateVersion,
    profile: &DeviceProfile,
    weights: &ScoreWeights,
) -> i32 {
    let mut score = 0;

    match candidate.abi {
        None | Some(Abi::Universal) => score += weights.abi_universal,
        Some(abi) => {
            if let Some(device_abi) = profile.abi {
                if abi == device_abi {
                    score += weights.abi_exact;
                } else if device_abi.compat_32bit() == Some(abi) {
                    score += weights.abi_backward_compat;
                }
            }
        }
    }

    if let (Some(min_api), Some(device_api)) = (candidate.min_api_level, profile.api_level) {
        if min_api <= device_api {
            score += weights.api_satisfied;
        } else {
            score += weights.api_exceeded;
        }
    }

    match candidate.dpi {
        None | Some(Dpi::NoDpi) => score += weights.dpi_agnostic,
        Some(dpi) => {
            if profile.dpi == Some(dpi) {
                score += weights.dpi_exact;
            }
        }
    }

    score
}

/// Candidates paired with their scores, best first.
#[derive(Debug, Clone)]
pub struct RankedCandidates {
    /// (candidate, score), sorted by score descending then version
    /// newest-first.
    pub entries: Vec<(CandidateVersion, i32)>,
}

impl RankedCandidates {
    /// The best non-disqualified candidate, if any scored >= 0.
    pub fn best_usable(&self) -> Option<&CandidateVersion> {
        self.entries
            .first()
            .filter(|&&(_, score)| score >= 0)
            .map(|(c, _)| c)
    }

    /// Non-disqualified candidates in rank order.
    pub fn usable(&self) -> impl Iterator<Item = &CandidateVersion> {
        self.entries
            .iter()
            .filter(|&&(_, score)| score >= 0)
            .map(|(c, _)| c)
    }

    /// Whether every candidate was disqualified (or the set is empty).
    pub fn none_usable(&self) -> bool {
        !self.entries.iter().any(|&(_, score)| score >= 0)
    }
}

/// Rank candidates by compatibility score descending; ties break toward
/// the newer version.
pub fn rank_candidates(
    candidates: Vec<CandidateVersion>,
    profile: &DeviceProfile,
    weights: &ScoreWeights,
) -> RankedCandidates {
    let mut entries: Vec<(CandidateVersion, i32)> = candidates
        .into_iter()
        .map(|c| {
            let score = compatibility_score(&c, profile, weights);
            (c, score)
        })
        .collect();

    entries.sort_by(|(a, sa), (b, sb)| match sb.cmp(sa) {
        Ordering::Equal => {
            compare_versions(&b.version, &a.version).then_with(|| a.version.cmp(&b.version))
        }
        other => other,
    });

    RankedCandidates { entries }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Format, SourceCatalog};

    fn candidate(version: &str, min_api: Option<u32>, abi: Option<Abi>) -> CandidateVersion {
        CandidateVersion {
            version: version.into(),
            min_api_level: min_api,
            download_url: format!("https://example.com/{version}"),
            format: Format::Apk,
            source: SourceCatalog::MirrorSite,
            abi,
            dpi: None,
            version_code: None,
            direct: true,
        }
    }

    fn profile(api: Option<u32>, abi: Option<Abi>) -> DeviceProfile {
        DeviceProfile {
            api_level: api,
            abi,
            ..DeviceProfile::default()
        }
    }

    #[test]
    fn test_min_api_exceeded_disqualifies() {
        let w = ScoreWeights::default();
        let c = candidate("2.0", Some(31), Some(Abi::Arm64V8a));
        let p = profile(Some(30), Some(Abi::Arm64V8a));
        assert!(compatibility_score(&c, &p, &w) < 0);
    }

    #[test]
    fn test_disqualified_never_beats_usable() {
        let w = ScoreWeights::default();
        let p = profile(Some(30), Some(Abi::Arm64V8a));
        // The newer version needs API 31; the older one fits.
        let ranked = rank_candidates(
            vec![
                candidate("2.0", Some(31), Some(Abi::Arm64V8a)),
                candidate("1.5", Some(28), None),
            ],
            &p,
            &w,
        );
        assert_eq!(ranked.best_usable().unwrap().version, "1.5");
    }

    #[test]
    fn test_exact_abi_beats_universal() {
        let w = ScoreWeights::default();
        let p = profile(Some(33), Some(Abi::Arm64V8a));
        let ranked = rank_candidates(
            vec![
                candidate("1.0", None, None),
                candidate("1.0", None, Some(Abi::Arm64V8a)),
            ],
            &p,
            &w,
        );
        assert_eq!(ranked.entries[0].0.abi, Some(Abi::Arm64V8a));
    }

    #[test]
    fn test_backward_compat_pairing() {
        let w = ScoreWeights::default();
        let c32 = candidate("1.0", None, Some(Abi::ArmeabiV7a));
        let p64 = profile(Some(33), Some(Abi::Arm64V8a));
        assert_eq!(
            compatibility_score(&c32, &p64, &w),
            w.abi_backward_compat + w.dpi_agnostic
        );
        // The reverse pairing earns nothing for the ABI.
        let c64 = candidate("1.0", None, Some(Abi::Arm64V8a));
        let p32 = profile(Some(33), Some(Abi::ArmeabiV7a));
        assert_eq!(compatibility_score(&c64, &p32, &w), w.dpi_agnostic);
    }

    #[test]
    fn test_unknown_api_is_not_api_zero() {
        let w = ScoreWeights::default();
        let c = candidate("1.0", Some(31), None);
        // Unknown device API: neither reward nor disqualification.
        let p = profile(None, None);
        assert_eq!(
            compatibility_score(&c, &p, &w),
            w.abi_universal + w.dpi_agnostic
        );
    }

    #[test]
    fn test_tie_breaks_toward_newer_version() {
        let w = ScoreWeights::default();
        let p = profile(Some(33), None);
        let ranked = rank_candidates(
            vec![
                candidate("1.9", Some(21), None),
                candidate("1.10", Some(21), None),
            ],
            &p,
            &w,
        );
        assert_eq!(ranked.entries[0].0.version, "1.10");
    }

    #[test]
    fn test_all_negative_set() {
        let w = ScoreWeights::default();
        let p = profile(Some(23), None);
        let ranked = rank_candidates(vec![candidate("3.0", Some(30), None)], &p, &w);
        assert!(ranked.none_usable());
        assert!(ranked.best_usable().is_none());
    }
}
