#![no_main]

use libfuzzer_sys::fuzz_target;

use toolscout::normalizer::{self, FormatHint};
use toolscout::sanitizer::{Roster, SanitizeOptions, Sanitizer};

fuzz_target!(|data: &[u8]| {
    // Convert raw bytes to string, handling invalid UTF-8 gracefully
    let raw = String::from_utf8_lossy(data).to_string();

    // Parsing may fail with a FormatError but must never panic, for any
    // hint.
    for hint in [
        FormatHint::Auto,
        FormatHint::SlackJson,
        FormatHint::SlackText,
        FormatHint::Whatsapp,
    ] {
        if let Ok(log) = normalizer::normalize(&raw, hint) {
            let roster = Roster::from_messages(&log.messages, &[]);
            let sanitizer = Sanitizer::new(SanitizeOptions::default(), &roster);
            for msg in &log.messages {
                // Sanitization must be total and idempotent.
                let once = sanitizer.sanitize(msg);
                assert_eq!(sanitizer.clean_text(&once.clean_text), once.clean_text);
            }
        }
    }
});
