//! Fuzz testing for config parsing and input validation.
//!
//! This fuzz target feeds arbitrary input to the rate limit rule parser and
//! the text validators. Both sit on untrusted or operator-controlled input
//! paths and must never panic:
//!
//! - `parse_rules`: parses the `RATE_LIMIT_*` environment variables
//! - `validate_text` / `validate_model_id`: validate user-submitted fields
//!
//! # Running the Fuzz Tests
//!
//! ```bash
//! # Install cargo-fuzz (requires nightly)
//! cargo +nightly install cargo-fuzz
//!
//! # Run the parsing fuzz target
//! cargo +nightly fuzz run fuzz_parsing
//!
//! # Run with a time limit (e.g., 60 seconds)
//! cargo +nightly fuzz run fuzz_parsing -- -max_total_time=60
//! ```

#![no_main]

use libfuzzer_sys::fuzz_target;
use mirrorview_backend::limiter::parse_rules;
use mirrorview_backend::validation::{validate_model_id, validate_text};

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        // Rule parsing must reject garbage without panicking, and accepted
        // rules must honor the parser's own invariants.
        if let Ok(rules) = parse_rules(s) {
            assert!(!rules.is_empty());
            assert!(rules.iter().all(|r| r.count > 0 && !r.window.is_zero()));
            assert!(rules.windows(2).all(|w| w[0].window <= w[1].window));
        }

        // Validators must return a Result for any input, multi-byte
        // boundaries included.
        let _ = validate_text(s, "text");
        let _ = validate_model_id(s);
    }
});
