//! PII redaction for message text.
//!
//! Redaction is roster-first, heuristic-second: names known from the
//! export's participant list are replaced with initials, and a
//! capitalized-name heuristic catches a best-effort subset of unlisted
//! third-party names. The heuristic can both over-redact (product names
//! after a possessive) and under-redact (names it has no pattern for);
//! that residual risk is accepted and documented rather than papered over.
//!
//! Every replacement token (`[email]`-style markers are not used; matches
//! are removed or reduced to initials/`[name]`/`@[user]`) is chosen so no
//! redaction rule matches its own output, which makes sanitization
//! idempotent.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::entities::{Message, SanitizedMessage};

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").unwrap());

static PHONE_US_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{3}[-. ]?\d{3}[-. ]?\d{4}\b").unwrap());

static PHONE_INTL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\+\d{1,3}[-. ]?\d{1,14}(?:[-. ]\d{1,10})*").unwrap());

static SLACK_ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<@[UW][A-Z0-9]+>").unwrap());

static MENTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"@[A-Za-z0-9_][A-Za-z0-9._-]*").unwrap());

// "my Alice" / "their Jane Doe" -- capitalized words right after a
// possessive pronoun are treated as a third-party name.
static POSSESSIVE_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(my|our|their)\s+([A-Z][a-z]+(?:\s+[A-Z][a-z]+)?)\b").unwrap());

static STREET_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b\d{1,5}\s+(?:[A-Z][A-Za-z]+\s+){1,3}(?:St|Street|Ave|Avenue|Rd|Road|Blvd|Boulevard|Ln|Lane|Dr|Drive|Ct|Court|Way)\b\.?",
    )
    .unwrap()
});

static LONG_DIGITS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{7,}\b").unwrap());

static MULTI_SPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]{2,}").unwrap());

// A sender that is really a phone number gets fully redacted.
static PHONE_SENDER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+?[\d\s().-]{7,}$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SanitizeOptions {
    pub redact_emails: bool,
    pub redact_phones: bool,
    pub redact_names: bool,
    pub redact_addresses: bool,
}

impl Default for SanitizeOptions {
    fn default() -> Self {
        Self {
            redact_emails: true,
            redact_phones: true,
            redact_names: true,
            redact_addresses: true,
        }
    }
}

impl SanitizeOptions {
    /// All rules off; text and sender pass through untouched.
    pub fn disabled() -> Self {
        Self {
            redact_emails: false,
            redact_phones: false,
            redact_names: false,
            redact_addresses: false,
        }
    }
}

/// Participant full names known for this export. Single-word names are
/// kept for attribution tokens but never substituted inside text (a bare
/// first name is too likely to collide with URLs and product names).
#[derive(Debug, Clone, Default)]
pub struct Roster {
    names: Vec<String>,
}

impl Roster {
    pub fn new(names: impl IntoIterator<Item = String>) -> Self {
        let mut names: Vec<String> = names
            .into_iter()
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .collect();
        names.sort();
        names.dedup();
        Self { names }
    }

    /// Build a roster from the senders of a normalized export, plus any
    /// extra names supplied by the caller.
    pub fn from_messages(messages: &[Message], extra: &[String]) -> Self {
        Self::new(
            messages
                .iter()
                .map(|m| m.sender.clone())
                .chain(extra.iter().cloned()),
        )
    }

    pub fn initials(name: &str) -> String {
        let token: String = name
            .split_whitespace()
            .take(3)
            .filter_map(|w| w.chars().next())
            .flat_map(|c| c.to_uppercase())
            .map(|c| format!("{c}."))
            .collect();
        if token.is_empty() { "[user]".to_string() } else { token }
    }
}

/// Pure text sanitizer. Holds no state beyond its options and the roster
/// it was constructed with, so behavior is reproducible per call.
pub struct Sanitizer {
    opts: SanitizeOptions,
    // (pattern, initials) per multi-word roster name
    name_patterns: Vec<(Regex, String)>,
}

impl Sanitizer {
    pub fn new(opts: SanitizeOptions, roster: &Roster) -> Self {
        let name_patterns = roster
            .names
            .iter()
            .filter(|n| n.split_whitespace().count() >= 2)
            .filter_map(|n| {
                let pattern = format!(r"(?i)\b{}\b", regex::escape(n));
                Regex::new(&pattern).ok().map(|re| (re, Roster::initials(n)))
            })
            .collect();
        Self { opts, name_patterns }
    }

    /// Narrow a message's text; the message itself is never dropped, and
    /// timestamp/order are preserved for downstream stages.
    pub fn sanitize(&self, msg: &Message) -> SanitizedMessage {
        SanitizedMessage {
            sender_token: self.sender_token(&msg.sender),
            timestamp: msg.timestamp,
            clean_text: self.clean_text(&msg.raw_text),
            source_format: msg.source_format,
        }
    }

    pub fn sender_token(&self, sender: &str) -> String {
        let sender = sender.trim();
        if !self.opts.redact_names {
            return sender.to_string();
        }
        if sender.is_empty() || PHONE_SENDER_RE.is_match(sender) {
            return "[user]".to_string();
        }
        Roster::initials(sender)
    }

    pub fn clean_text(&self, text: &str) -> String {
        let mut out = text.to_string();

        if self.opts.redact_emails {
            out = EMAIL_RE.replace_all(&out, "").into_owned();
        }
        if self.opts.redact_phones {
            out = PHONE_INTL_RE.replace_all(&out, "").into_owned();
            out = PHONE_US_RE.replace_all(&out, "").into_owned();
        }
        if self.opts.redact_names {
            out = SLACK_ID_RE.replace_all(&out, "@[user]").into_owned();
            out = MENTION_RE.replace_all(&out, "@[user]").into_owned();
            for (re, initials) in &self.name_patterns {
                out = re.replace_all(&out, initials.as_str()).into_owned();
            }
            out = POSSESSIVE_NAME_RE.replace_all(&out, "$1 [name]").into_owned();
        }
        if self.opts.redact_addresses {
            out = STREET_RE.replace_all(&out, "").into_owned();
            out = LONG_DIGITS_RE.replace_all(&out, "").into_owned();
        }

        let out = MULTI_SPACE_RE.replace_all(&out, " ");
        out.trim().to_string()
    }
}
