//! WhatsApp chat export parsing.
//!
//! Covers the export header shapes seen in the wild:
//! `[M/D/YY, H:MM:SS AM/PM] Name: text`, `M/D/YY, H:MM - Name: text`
//! (and its D/M/YYYY sibling), and `[YYYY/MM/DD, H:MM:SS] Name: text`.
//! Bodies may span multiple lines until the next header.

use chrono::{DateTime, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::entities::{Message, SourceFormat};
use crate::normalizer::{FormatError, NormalizedLog, slack::first_content_line};

// [M/D/YY, H:MM(:SS) AM/PM] Name: text  (AM/PM optional)
static HEADER_BRACKET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^\[(\d{1,2}/\d{1,2}/\d{2,4}),?\s+(\d{1,2}:\d{2}(?::\d{2})?\s*[AP]?M?)\]\s*([^:]+):\s*(.*)$",
    )
    .unwrap()
});

// M/D/YY, H:MM - Name: text  (also D/M/YYYY)
static HEADER_DASH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,2}/\d{1,2}/\d{2,4}),?\s+(\d{1,2}:\d{2})\s*-\s*([^:]+):\s*(.*)$").unwrap()
});

// [YYYY/MM/DD, H:MM(:SS)] Name: text
static HEADER_ISO: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\[(\d{4}/\d{1,2}/\d{1,2}),?\s+(\d{1,2}:\d{2}(?::\d{2})?)\]\s*([^:]+):\s*(.*)$")
        .unwrap()
});

// Export timestamps carry no zone; dates are taken as written. D/M vs M/D
// ambiguity is resolved by trying US ordering first, like the source apps.
const DATETIME_FORMATS: &[&str] = &[
    "%m/%d/%y %I:%M:%S %p",
    "%m/%d/%y %I:%M %p",
    "%m/%d/%y %H:%M:%S",
    "%m/%d/%y %H:%M",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %I:%M %p",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%d/%m/%y %H:%M",
    "%d/%m/%Y %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];

const SYSTEM_PHRASES: &[&str] = &[
    "joined using",
    "was added",
    "created this group",
    "changed the subject",
    "changed this group",
    "changed their phone number",
    "left the group",
    "end-to-end encrypted",
];

/// Quick probe used by format auto-detection.
pub fn looks_like(raw: &str) -> bool {
    raw.lines()
        .filter(|l| !l.trim().is_empty())
        .take(10)
        .any(|line| parse_header(&normalize_spaces(line)).is_some())
}

pub fn parse(raw: &str) -> Result<NormalizedLog, FormatError> {
    let mut messages: Vec<Message> = Vec::new();
    let mut current: Option<Message> = None;
    let mut system_skipped = 0usize;
    let mut leading_noise = 0usize;

    for line in raw.lines() {
        let line = normalize_spaces(line);
        if let Some((timestamp, sender, body)) = parse_header(&line) {
            if let Some(msg) = current.take() {
                messages.push(msg);
            }
            if is_system_message(&body) {
                system_skipped += 1;
                continue;
            }
            current = Some(Message {
                sender,
                timestamp,
                raw_text: body,
                source_format: SourceFormat::Whatsapp,
            });
        } else if let Some(msg) = current.as_mut() {
            msg.raw_text.push('\n');
            msg.raw_text.push_str(&line);
        } else if !line.trim().is_empty() {
            leading_noise += 1;
        }
    }
    if let Some(msg) = current {
        messages.push(msg);
    }

    if messages.is_empty() && system_skipped == 0 {
        let (line, snippet) = first_content_line(raw);
        return Err(FormatError::NoHeader {
            format: "whatsapp",
            line,
            snippet,
        });
    }

    for msg in &mut messages {
        msg.raw_text = msg.raw_text.trim().to_string();
    }

    let mut warnings = Vec::new();
    if system_skipped > 0 {
        warnings.push(format!("{system_skipped} system message(s) skipped"));
    }
    if leading_noise > 0 {
        warnings.push(format!(
            "{leading_noise} line(s) before the first message header were ignored"
        ));
    }

    Ok(NormalizedLog {
        messages,
        warnings,
        format: Some(SourceFormat::Whatsapp),
    })
}

// Exports use narrow no-break spaces around the AM/PM marker.
fn normalize_spaces(line: &str) -> String {
    line.replace(['\u{202f}', '\u{00a0}'], " ")
}

fn parse_header(line: &str) -> Option<(Option<DateTime<Utc>>, String, String)> {
    for pattern in [&*HEADER_BRACKET, &*HEADER_DASH, &*HEADER_ISO] {
        if let Some(caps) = pattern.captures(line) {
            let timestamp = parse_datetime(&caps[1], &caps[2]);
            let sender = clean_sender(&caps[3]);
            return Some((timestamp, sender, caps[4].trim().to_string()));
        }
    }
    None
}

fn parse_datetime(date: &str, time: &str) -> Option<DateTime<Utc>> {
    let combined = format!("{} {}", date, time.trim().to_uppercase());
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(&combined, fmt).ok())
        .map(|naive| naive.and_utc())
}

// Group exports decorate non-contact senders with "~ ".
fn clean_sender(sender: &str) -> String {
    sender.trim().trim_start_matches(['~', ' ']).trim().to_string()
}

fn is_system_message(text: &str) -> bool {
    let lower = text.to_lowercase();
    SYSTEM_PHRASES.iter().any(|p| lower.contains(p))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_parse_bracket_12h() {
        let raw = "[1/15/26, 2:30:45 PM] John: Check out https://github.com/langchain-ai/langchain";
        let log = parse(raw).unwrap();
        assert_eq!(log.messages.len(), 1);
        let msg = &log.messages[0];
        assert_eq!(msg.sender, "John");
        assert_eq!(msg.timestamp.unwrap().hour(), 14);
        assert!(msg.raw_text.contains("langchain"));
    }

    #[test]
    fn test_parse_dash_24h() {
        let raw = "1/15/26, 14:30 - John: Try this\n1/15/26, 14:31 - Alice: Will do!";
        let log = parse(raw).unwrap();
        assert_eq!(log.messages.len(), 2);
        assert_eq!(log.messages[1].sender, "Alice");
    }

    #[test]
    fn test_parse_iso_bracket() {
        let raw = "[2026/01/15, 14:30:00] Jane: hello";
        let log = parse(raw).unwrap();
        assert_eq!(log.messages.len(), 1);
        assert_eq!(log.messages[0].timestamp.unwrap().hour(), 14);
    }

    #[test]
    fn test_multiline_body() {
        let raw = "[1/15/26, 2:30:00 PM] John: first\nsecond line\nthird line";
        let log = parse(raw).unwrap();
        assert_eq!(log.messages.len(), 1);
        assert_eq!(log.messages[0].raw_text, "first\nsecond line\nthird line");
    }

    #[test]
    fn test_narrow_nbsp_in_time() {
        let raw = "[1/15/26, 2:30:45\u{202f}PM] John: hello";
        let log = parse(raw).unwrap();
        assert_eq!(log.messages[0].timestamp.unwrap().hour(), 14);
    }

    #[test]
    fn test_tilde_sender_decoration_stripped() {
        let raw = "[1/15/26, 2:30:00 PM] ~ Maria Lopez: hola";
        let log = parse(raw).unwrap();
        assert_eq!(log.messages[0].sender, "Maria Lopez");
    }

    #[test]
    fn test_system_messages_skipped_with_warning() {
        let raw = concat!(
            "[1/15/26, 2:00:00 PM] Group: Messages and calls are end-to-end encrypted.\n",
            "[1/15/26, 2:30:00 PM] John: real message\n",
        );
        let log = parse(raw).unwrap();
        assert_eq!(log.messages.len(), 1);
        assert_eq!(log.messages[0].sender, "John");
        assert!(log.warnings.iter().any(|w| w.contains("system message")));
    }

    #[test]
    fn test_unparseable_input_fails() {
        match parse("not a whatsapp export") {
            Err(FormatError::NoHeader { format, .. }) => assert_eq!(format, "whatsapp"),
            other => panic!("expected FormatError::NoHeader, got {other:?}"),
        }
    }

    #[test]
    fn test_non_ascii_sender() {
        let raw = "[1/15/26, 2:30:00 PM] José García: buenas";
        let log = parse(raw).unwrap();
        assert_eq!(log.messages[0].sender, "José García");
    }
}
