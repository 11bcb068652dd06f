//! Fuzz target for container path parsing.
//!
//! Paths come from user-written task files, so the parser must reject
//! arbitrary input gracefully without panicking.
//!
//! Run with:
//! cargo +nightly fuzz run fuzz_path_parsing -- -max_total_time=600

#![no_main]

use arbor_client::ContainerPath;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(path) = ContainerPath::parse(s) {
            // A parsed path must render back to something that parses to
            // the same path.
            let rendered = path.to_string();
            let reparsed = ContainerPath::parse(&rendered).unwrap();
            assert_eq!(path, reparsed);
        }
    }
});
