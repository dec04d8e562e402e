//! Fuzz test for annotator configuration parsing
//!
//! Arbitrary text fed to the TOML loader must come back as a validated
//! configuration or an error, never a panic.
//!
//! Run with: cargo +nightly fuzz run config_fuzz -- -max_total_time=60

#![no_main]

use libfuzzer_sys::fuzz_target;
use semtab_core::AnnotatorConfig;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        if let Ok(config) = AnnotatorConfig::from_toml_str(input) {
            // Loading validates, so a loaded config must stay valid.
            assert!(config.validate().is_ok(), "Loaded config failed validation");
            assert!(config.confidence_threshold >= 0.0 && config.confidence_threshold <= 1.0);
            assert!(config.retry.max_backoff >= config.retry.initial_backoff);
        }
    }
});
