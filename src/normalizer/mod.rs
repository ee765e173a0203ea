//! Export parsing: turns a raw chat export into an ordered sequence of
//! uniform [`Message`] records.
//!
//! Two families of input are supported: Slack (workspace JSON exports and
//! copy-pasted channel text) and WhatsApp (the `[date, time] Name: text`
//! export family). Parsing is the only batch-fatal stage: corrupt input
//! yields a [`FormatError`] and no partial output is trusted.

pub mod slack;
pub mod whatsapp;

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tracing::instrument;

use crate::entities::{Message, SourceFormat};

/// Timestamps may jitter backwards slightly (clock skew between clients);
/// regressions beyond this window raise a batch warning.
const MONOTONIC_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatHint {
    Auto,
    SlackJson,
    SlackText,
    Whatsapp,
}

impl FormatHint {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "auto" => Some(Self::Auto),
            "slack-json" => Some(Self::SlackJson),
            "slack-text" => Some(Self::SlackText),
            "whatsapp" => Some(Self::Whatsapp),
            _ => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum FormatError {
    #[error("invalid json export at line {line}, column {column}: {message}")]
    Json {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("json export is neither a message array nor an object with a `messages` field")]
    JsonShape,

    #[error("no {format} message header recognized (line {line}: {snippet:?})")]
    NoHeader {
        format: &'static str,
        line: usize,
        snippet: String,
    },
}

/// Parsed export plus batch-level warnings (non-monotonic timestamps,
/// skipped system lines). Messages are in source order.
#[derive(Debug, Default)]
pub struct NormalizedLog {
    pub messages: Vec<Message>,
    pub warnings: Vec<String>,
    pub format: Option<SourceFormat>,
}

#[instrument(skip(raw), fields(bytes = raw.len()))]
pub fn normalize(raw: &str, hint: FormatHint) -> Result<NormalizedLog, FormatError> {
    if raw.trim().is_empty() {
        return Ok(NormalizedLog::default());
    }

    let mut log = match resolve_hint(raw, hint) {
        FormatHint::SlackJson => slack::parse_json(raw)?,
        FormatHint::SlackText => slack::parse_text(raw)?,
        FormatHint::Whatsapp => whatsapp::parse(raw)?,
        FormatHint::Auto => unreachable!("resolve_hint returns a concrete format"),
    };

    fill_missing_timestamps(&mut log.messages);
    check_monotonic(&mut log);
    Ok(log)
}

fn resolve_hint(raw: &str, hint: FormatHint) -> FormatHint {
    if hint != FormatHint::Auto {
        return hint;
    }
    let trimmed = raw.trim_start();
    if trimmed.starts_with('{') {
        return FormatHint::SlackJson;
    }
    if trimmed.starts_with('[') {
        // "[{" opens a JSON array; "[1/15/26," opens a WhatsApp header.
        if whatsapp::looks_like(raw) {
            return FormatHint::Whatsapp;
        }
        return FormatHint::SlackJson;
    }
    if whatsapp::looks_like(raw) {
        return FormatHint::Whatsapp;
    }
    FormatHint::SlackText
}

/// Messages without a timestamp inherit the last known one, bumped by one
/// second per consecutive gap so relative order survives cursor math.
fn fill_missing_timestamps(messages: &mut [Message]) {
    let mut last: Option<DateTime<Utc>> = None;
    let mut gap = 0i64;
    for msg in messages.iter_mut() {
        match msg.timestamp {
            Some(ts) => {
                last = Some(ts);
                gap = 0;
            }
            None => {
                if let Some(base) = last {
                    gap += 1;
                    msg.timestamp = Some(base + Duration::seconds(gap));
                }
            }
        }
    }
}

fn check_monotonic(log: &mut NormalizedLog) {
    let mut regressions = 0usize;
    let mut prev: Option<DateTime<Utc>> = None;
    for msg in &log.messages {
        if let (Some(p), Some(ts)) = (prev, msg.timestamp)
            && ts < p - Duration::seconds(MONOTONIC_TOLERANCE_SECS)
        {
            regressions += 1;
        }
        if msg.timestamp.is_some() {
            prev = msg.timestamp;
        }
    }
    if regressions > 0 {
        log.warnings.push(format!(
            "timestamps decrease non-monotonically at {regressions} point(s); source order preserved, no reordering applied"
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_is_empty_sequence() {
        let log = normalize("", FormatHint::Auto).unwrap();
        assert!(log.messages.is_empty());
        assert!(log.warnings.is_empty());

        let log = normalize("  \n\n  ", FormatHint::Auto).unwrap();
        assert!(log.messages.is_empty());
    }

    #[test]
    fn test_auto_detects_whatsapp_over_json() {
        let raw = "[1/15/26, 2:30:45 PM] John: hello there";
        let log = normalize(raw, FormatHint::Auto).unwrap();
        assert_eq!(log.format, Some(SourceFormat::Whatsapp));
        assert_eq!(log.messages.len(), 1);
    }

    #[test]
    fn test_auto_detects_json_array() {
        let raw = r#"[{"user": "alice", "ts": "1705329000.000200", "text": "hi"}]"#;
        let log = normalize(raw, FormatHint::Auto).unwrap();
        assert_eq!(log.format, Some(SourceFormat::SlackJson));
        assert_eq!(log.messages.len(), 1);
    }

    #[test]
    fn test_missing_timestamps_filled_from_last_known() {
        let raw = r#"[
            {"user": "alice", "ts": "1705329000.0", "text": "first"},
            {"user": "bob", "text": "second"},
            {"user": "carol", "text": "third"}
        ]"#;
        let log = normalize(raw, FormatHint::SlackJson).unwrap();
        let base = log.messages[0].timestamp.unwrap();
        assert_eq!(
            log.messages[1].timestamp.unwrap(),
            base + Duration::seconds(1)
        );
        assert_eq!(
            log.messages[2].timestamp.unwrap(),
            base + Duration::seconds(2)
        );
    }

    #[test]
    fn test_non_monotonic_warning() {
        let raw = concat!(
            "[1/15/26, 2:30:00 PM] John: first\n",
            "[1/15/26, 1:00:00 PM] Jane: way earlier\n",
        );
        let log = normalize(raw, FormatHint::Whatsapp).unwrap();
        assert_eq!(log.messages.len(), 2);
        assert_eq!(log.warnings.len(), 1);
        assert!(log.warnings[0].contains("non-monotonically"));
    }

    #[test]
    fn test_small_regression_tolerated() {
        let raw = concat!(
            "[1/15/26, 2:30:00 PM] John: first\n",
            "[1/15/26, 2:28:00 PM] Jane: two minutes of skew\n",
        );
        let log = normalize(raw, FormatHint::Whatsapp).unwrap();
        assert!(log.warnings.is_empty());
    }
}
