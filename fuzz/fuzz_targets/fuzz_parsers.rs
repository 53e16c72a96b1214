//! Fuzz testing for the gate's input parsers.
//!
//! Every parser here sees attacker- or operator-controlled text. None of them
//! may panic, whatever the input.
//!
//! # Running the Fuzz Tests
//!
//! ```bash
//! # Install cargo-fuzz (requires nightly)
//! cargo +nightly install cargo-fuzz
//!
//! # Run the parser fuzz target
//! cargo +nightly fuzz run fuzz_parsers
//!
//! # Run with a time limit (e.g., 60 seconds)
//! cargo +nightly fuzz run fuzz_parsers -- -max_total_time=60
//! ```
//!
//! # What This Tests
//!
//! - `parse_address_list`: `ipList` entries (addresses and CIDR blocks)
//! - `parse_remote_addr`: peer `host:port` strings
//! - `parse_duration`: `hostUpdateInterval` / `authExtraTime`
//! - `parse_user_line`: `name:secret` credential lines
//! - `extract_basic_credentials`: `Authorization` header values

#![no_main]

use libfuzzer_sys::fuzz_target;
use auth_gate::credentials::parse_user_line;
use auth_gate::duration::parse_duration;
use auth_gate::exceptions::address::parse_address_list;
use auth_gate::exceptions::parse_remote_addr;
use auth_gate::gate::extract_basic_credentials;

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };

    // Every accepted entry must match its own network address
    let parsed = parse_address_list(s.lines());
    for range in parsed.list.ranges() {
        assert!(range.contains(range.network()));
    }
    for ip in parsed.list.exact() {
        assert!(parsed.list.matches(*ip));
    }

    let _ = parse_remote_addr(s);
    let _ = parse_duration(s);
    let _ = parse_user_line(1, s);

    if let Some(creds) = extract_basic_credentials(s) {
        assert!(!creds.user.contains(':'));
    }
});
