//! Fuzz target for dotted version comparison.
//!
//! Version strings come from the remote server, so comparison must be
//! total and panic-free on arbitrary input.
//!
//! Run with:
//! cargo +nightly fuzz run fuzz_version_compare -- -max_total_time=600

#![no_main]

use std::cmp::Ordering;

use arbor_wire::version;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let mid = s.len() / 2;
        if !s.is_char_boundary(mid) {
            return;
        }
        let (left, right) = s.split_at(mid);

        // Comparison must be reflexive and antisymmetric.
        assert_eq!(version::compare(left, left), Ordering::Equal);
        assert_eq!(
            version::compare(left, right),
            version::compare(right, left).reverse()
        );
        assert_eq!(
            version::at_least(left, right) && version::at_least(right, left),
            version::compare(left, right) == Ordering::Equal
        );
    }
});
