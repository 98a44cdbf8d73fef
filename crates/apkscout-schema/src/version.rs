//! Dotted version-label comparison.
//!
//! Catalog version labels are not semver: they are arbitrary dotted
//! numeric tuples ("1.2024.31", "5.2"), sometimes with junk suffixes.
//! Comparison is component-wise on the leading digits of each dot
//! component, right-padding the shorter tuple with zeros.

use std::cmp::Ordering;

/// Compare two version labels; `Ordering::Greater` means `a` is newer.
///
/// "1.2024.31" is newer than "1.2024.3.1": the tuples are
/// `[1, 2024, 31]` vs `[1, 2024, 3, 1]`, and 31 beats 3 at the third
/// component. A fully non-numeric component counts as zero.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let a_parts = parse_components(a);
    let b_parts = parse_components(b);

    for i in 0..a_parts.len().max(b_parts.len()) {
        let av = a_parts.get(i).copied().unwrap_or(0);
        let bv = b_parts.get(i).copied().unwrap_or(0);
        match av.cmp(&bv) {
            Ordering::Equal => {}
            other => return other,
        }
    }
    Ordering::Equal
}

fn parse_components(v: &str) -> Vec<u64> {
    v.split('.')
        .map(|part| {
            let digits: String = part.chars().take_while(char::is_ascii_digit).collect();
            digits.parse().unwrap_or(0)
        })
        .collect()
}
