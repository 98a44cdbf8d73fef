//! Shared data model for apkscout: device profiles, candidate versions,
//! scoring, and the resolution result wire format.
//!
//! Everything in this crate is pure data and pure functions -- no IO, no
//! async. The `apkscout-core` crate layers catalogs and the resolution
//! pipeline on top of these types.

pub mod abi;
pub mod android;
pub mod device;
pub mod score;
pub mod types;
pub mod version;

// Re-exports
pub use abi::{Abi, Dpi};
pub use android::{android_version_for_api, api_for_android_version, min_api_from_requirement};
pub use device::{DeviceProfile, RawProfile};
pub use score::{ScoreWeights, compatibility_score, rank_candidates};
pub use types::*;
pub use version::compare_versions;
