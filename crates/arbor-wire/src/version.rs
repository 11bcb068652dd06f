//! Dotted version comparison.
//!
//! Server versions look like `9.0.1.12` with an optional build suffix such
//! as `9.0.1.12_b2317`. Comparison is numeric per dot-separated component,
//! with missing components treated as zero, so `1`, `1.0` and `1.0.0`
//! compare equal and `4.08` orders below `4.08.01`.

use std::cmp::Ordering;

/// Compares two dotted version strings numerically.
pub fn compare(left: &str, right: &str) -> Ordering {
    let a = components(left);
    let b = components(right);
    let len = a.len().max(b.len());
    for i in 0..len {
        let x = a.get(i).copied().unwrap_or(0);
        let y = b.get(i).copied().unwrap_or(0);
        match x.cmp(&y) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

/// True when `actual` is the same as or newer than `required`.
pub fn at_least(actual: &str, required: &str) -> bool {
    compare(actual, required) != Ordering::Less
}

fn components(version: &str) -> Vec<u64> {
    strip_build_suffix(version.trim())
        .split('.')
        .map(|part| part.parse::<u64>().unwrap_or(0))
        .collect()
}

/// Drops a trailing `_b<digits>` build marker.
fn strip_build_suffix(version: &str) -> &str {
    if let Some(idx) = version.rfind("_b") {
        let tail = &version[idx + 2..];
        if !tail.is_empty() && tail.bytes().all(|b| b.is_ascii_digit()) {
            return &version[..idx];
        }
    }
    version
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orders_versions_numerically() {
        let cases = [
            ("1", "1", Ordering::Equal),
            ("2.1", "2.2", Ordering::Less),
            ("3.0.4.10", "3.0.4.2", Ordering::Greater),
            ("4.08", "4.08.01", Ordering::Less),
            ("3.2.1.9.8144", "3.2", Ordering::Greater),
            ("3.2", "3.2.1.9.8144", Ordering::Less),
            ("1.2", "2.1", Ordering::Less),
            ("2.1", "1.2", Ordering::Greater),
            ("5.6.7", "5.6.7", Ordering::Equal),
            ("1.01.1", "1.1.1", Ordering::Equal),
            ("1.1.1", "1.01.1", Ordering::Equal),
            ("1", "1.0", Ordering::Equal),
            ("1.0", "1", Ordering::Equal),
            ("1.0.2.0", "1.0.2", Ordering::Equal),
            ("10.0", "9.0.3", Ordering::Greater),
            ("9.0.3", "10.0", Ordering::Less),
        ];
        for (left, right, expected) in cases {
            assert_eq!(
                compare(left, right),
                expected,
                "compare({left:?}, {right:?})"
            );
        }
    }

    #[test]
    fn ignores_build_suffixes() {
        assert_eq!(compare("6.0.0.3_b2317", "6.0.0.3"), Ordering::Equal);
        assert_eq!(compare("6.0.0.4_b1", "6.0.0.3_b9999"), Ordering::Greater);
    }

    #[test]
    fn keeps_non_build_underscores() {
        // An underscore without the b<digits> shape is not a build marker;
        // the component parses as zero.
        assert_eq!(compare("1_x", "0"), Ordering::Equal);
    }

    #[test]
    fn at_least_gates_inclusively() {
        assert!(at_least("9.0.1.12", "9.0"));
        assert!(at_least("9.0", "9.0"));
        assert!(!at_least("8.5.1", "9.0"));
    }
}
