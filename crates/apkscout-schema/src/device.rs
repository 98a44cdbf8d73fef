//! Device capability profiles and their request-side parsing.

use serde::{Deserialize, Serialize};

use crate::abi::{Abi, Dpi};
use crate::android::api_for_android_version;

/// Canonical device capability profile for one resolution call.
///
/// Every field is an optional hint; a missing field means "unknown" and
/// biases the pipeline toward assuming compatibility. Immutable once
/// parsed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeviceProfile {
    /// Device API level, if known. Never zero or negative.
    pub api_level: Option<u32>,
    /// Device CPU architecture, if known.
    pub abi: Option<Abi>,
    /// Device screen density bucket, if known.
    pub dpi: Option<Dpi>,
    /// Free-text device model hint, consumed by override targeting.
    pub model: Option<String>,
    /// Free-text manufacturer hint, consumed by override targeting.
    pub manufacturer: Option<String>,
    /// Caller explicitly asked for an older, more compatible version.
    pub request_older: bool,
}

/// Raw string-typed capability hints as they arrive on a request.
///
/// [`RawProfile::parse`] never fails: every unusable field normalizes to
/// `None` in the resulting [`DeviceProfile`].
#[derive(Debug, Clone, Default)]
pub struct RawProfile {
    /// Numeric API level, as text ("30").
    pub api_level: Option<String>,
    /// Android version label ("11", "8.0", "12L").
    pub android_version: Option<String>,
    /// ABI token ("arm64-v8a", "aarch64", ...).
    pub abi: Option<String>,
    /// Density token ("xxhdpi", ...).
    pub dpi: Option<String>,
    /// Device model.
    pub model: Option<String>,
    /// Device manufacturer.
    pub manufacturer: Option<String>,
    /// Older-version request flag.
    pub older: bool,
}

impl RawProfile {
    /// Normalize the raw hints into a [`DeviceProfile`].
    ///
    /// An explicit numeric API level wins over a mapped Android version
    /// string. Non-positive, out-of-range, or non-numeric API input yields `None` --
    /// an API level of zero does not exist and must never be treated as
    /// one.
    pub fn parse(&self) -> DeviceProfile {
        let explicit_api = self
            .api_level
            .as_deref()
            .and_then(|s| s.trim().parse::<i64>().ok())
            .filter(|&n| n > 0)
            .and_then(|n| u32::try_from(n).ok());

        let mapped_api = self
            .android_version
            .as_deref()
            .and_then(api_for_android_version);

        DeviceProfile {
            api_level: explicit_api.or(mapped_api),
            abi: self.abi.as_deref().and_then(|s| s.parse().ok()),
            dpi: self.dpi.as_deref().and_then(|s| s.parse().ok()),
            model: none_if_blank(self.model.as_deref()),
            manufacturer: none_if_blank(self.manufacturer.as_deref()),
            request_older: self.older,
        }
    }
}

fn none_if_blank(s: Option<&str>) -> Option<String> {
    s.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}
