//! Android version-label to API-level translation.
//!
//! Catalogs and store metadata describe compatibility as free text
//! ("Requires Android 8.0+"); devices report an integer API level. This
//! module owns the fixed bidirectional table between the two, covering
//! API 19 through 35.

/// Known (version label, API level) pairs, oldest first.
///
/// Labels are the marketing major.minor; everything from Android 9 up
/// drops the minor. "12L" is the one non-numeric label Android ever
/// shipped.
const VERSION_TABLE: &[(&str, u32)] = &[
    ("4.4", 19),
    ("5.0", 21),
    ("5.1", 22),
    ("6.0", 23),
    ("7.0", 24),
    ("7.1", 25),
    ("8.0", 26),
    ("8.1", 27),
    ("9", 28),
    ("10", 29),
    ("11", 30),
    ("12", 31),
    ("12L", 32),
    ("13", 33),
    ("14", 34),
    ("15", 35),
];

/// Newest major version in the table; anything at or above rounds up to
/// the newest mapped API.
const NEWEST_MAJOR: u32 = 15;
const NEWEST_API: u32 = 35;
const OLDEST_MAJOR: u32 = 4;

/// Map an Android version label ("11", "8.0", "12L") to its API level.
///
/// Inputs outside the exact table are bucketed: the highest known API
/// whose version does not exceed the input's major version wins
/// ("9.2" maps to 28), and majors at or above the newest mapped major
/// round up to the newest API ("16" maps to 35). Unmappable strings
/// yield `None`, never an error.
pub fn api_for_android_version(label: &str) -> Option<u32> {
    let label = label.trim();
    if label.is_empty() {
        return None;
    }

    // Exact table hit first (case-insensitive for "12l").
    let normalized = label.to_uppercase();
    if let Some(&(_, api)) = VERSION_TABLE
        .iter()
        .find(|(v, _)| v.eq_ignore_ascii_case(&normalized))
    {
        return Some(api);
    }

    // Numeric-range bucketing on the major version.
    let major: u32 = label.split('.').next()?.parse().ok()?;
    if major >= NEWEST_MAJOR {
        return Some(NEWEST_API);
    }
    if major < OLDEST_MAJOR {
        return None;
    }
    VERSION_TABLE
        .iter()
        .filter(|(v, _)| {
            v.split('.')
                .next()
                .and_then(|m| m.parse::<u32>().ok())
                .is_some_and(|m| m <= major)
        })
        .map(|&(_, api)| api)
        .max()
}

/// Map an API level back to its Android version label, for display.
pub fn android_version_for_api(api: u32) -> Option<&'static str> {
    VERSION_TABLE
        .iter()
        .find(|&&(_, a)| a == api)
        .map(|&(v, _)| v)
}

/// Extract a minimum API level from a free-text requirement phrase
/// ("Android 8.0+", "Requires Android 5.0 and up").
///
/// A phrase that signals device-dependent requirements ("Varies with
/// device") yields `None` -- the caller must not infer compatibility
/// from it.
pub fn min_api_from_requirement(text: &str) -> Option<u32> {
    let text = text.trim();
    if text.is_empty() || text.to_lowercase().contains("varies") {
        return None;
    }

    // First run of [0-9.] in the phrase, with a trailing 'L' for "12L".
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let rest = &text[start..];
    let mut end = rest
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(rest.len());
    if rest[end..].starts_with(['L', 'l']) {
        end += 1;
    }
    api_for_android_version(rest[..end].trim_end_matches('.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_table() {
        assert_eq!(api_for_android_version("4.4"), Some(19));
        assert_eq!(api_for_android_version("8.1"), Some(27));
        assert_eq!(api_for_android_version("11"), Some(30));
        assert_eq!(api_for_android_version("12L"), Some(32));
        assert_eq!(api_for_android_version("12l"), Some(32));
        assert_eq!(api_for_android_version("15"), Some(35));
    }

    #[test]
    fn test_bucketing() {
        // Off-table minors bucket down to the highest API at that major.
        assert_eq!(api_for_android_version("9.2"), Some(28));
        assert_eq!(api_for_android_version("7.1.2"), Some(25));
        assert_eq!(api_for_android_version("4.2"), Some(19));
        // Beyond the table rounds up to the newest mapped API.
        assert_eq!(api_for_android_version("16"), Some(35));
        assert_eq!(api_for_android_version("99.1"), Some(35));
    }

    #[test]
    fn test_unmappable() {
        assert_eq!(api_for_android_version(""), None);
        assert_eq!(api_for_android_version("KitKat"), None);
        assert_eq!(api_for_android_version("3.0"), None);
    }

    #[test]
    fn test_reverse_lookup() {
        assert_eq!(android_version_for_api(30), Some("11"));
        assert_eq!(android_version_for_api(32), Some("12L"));
        assert_eq!(android_version_for_api(20), None);
    }

    #[test]
    fn test_requirement_phrases() {
        assert_eq!(min_api_from_requirement("Android 8.0+"), Some(26));
        assert_eq!(min_api_from_requirement("Requires Android 5.0 and up"), Some(21));
        assert_eq!(min_api_from_requirement("Android 12L+"), Some(32));
        assert_eq!(min_api_from_requirement("Android 12l+"), Some(32));
        assert_eq!(min_api_from_requirement("Varies with device"), None);
        assert_eq!(min_api_from_requirement(""), None);
        assert_eq!(min_api_from_requirement("no digits here"), None);
    }
}
