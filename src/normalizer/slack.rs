//! Slack export parsing: workspace JSON exports and copy-pasted channel
//! text.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::entities::{Message, SourceFormat};
use crate::normalizer::{FormatError, NormalizedLog};

// "alice  2:30 PM"
static HEADER_NAME_TIME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(\S+)\s+(\d{1,2}:\d{2})\s*([AP]M)\s*$").unwrap());

// "[2:30] alice: message"
static HEADER_BRACKET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[(\d{1,2}:\d{2})\]\s*(\w+):\s*(.*)$").unwrap());

// "alice (2:30): message"
static HEADER_PAREN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\w+)\s*\((\d{1,2}:\d{2})\):\s*(.*)$").unwrap());

/// Parse a Slack workspace export: either a JSON array of message objects
/// or an object with a `messages` array. Message objects carry
/// `user`/`sender`/`username`, `ts` (epoch seconds) or `timestamp`
/// (RFC 3339), and `text`.
pub fn parse_json(raw: &str) -> Result<NormalizedLog, FormatError> {
    let value: Value = serde_json::from_str(raw).map_err(|e| FormatError::Json {
        line: e.line(),
        column: e.column(),
        message: e.to_string(),
    })?;

    let items = match &value {
        Value::Array(items) => items.as_slice(),
        Value::Object(obj) => obj
            .get("messages")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .ok_or(FormatError::JsonShape)?,
        _ => return Err(FormatError::JsonShape),
    };

    let messages = items
        .iter()
        .map(|item| Message {
            sender: sender_field(item),
            timestamp: timestamp_field(item),
            raw_text: item
                .get("text")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .trim()
                .to_string(),
            source_format: SourceFormat::SlackJson,
        })
        .collect();

    Ok(NormalizedLog {
        messages,
        warnings: Vec::new(),
        format: Some(SourceFormat::SlackJson),
    })
}

fn sender_field(item: &Value) -> String {
    ["user", "sender", "username"]
        .iter()
        .find_map(|key| item.get(key).and_then(Value::as_str))
        .unwrap_or("unknown")
        .trim()
        .to_string()
}

fn timestamp_field(item: &Value) -> Option<DateTime<Utc>> {
    // Slack's `ts` is epoch seconds with a fractional part, serialized as
    // a string in exports and occasionally as a number.
    if let Some(ts) = item.get("ts") {
        let epoch = match ts {
            Value::String(s) => s.parse::<f64>().ok(),
            Value::Number(n) => n.as_f64(),
            _ => None,
        };
        if let Some(epoch) = epoch {
            return DateTime::from_timestamp(epoch.trunc() as i64, (epoch.fract() * 1e9) as u32);
        }
    }
    item.get("timestamp")
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parse copy-pasted Slack channel text. Each message opens with a header
/// line (`sender  HH:MM AM/PM`, `[HH:MM] sender:`, or `sender (HH:MM):`)
/// and runs until the next header. Pasted logs carry a time of day but no
/// date, so timestamps stay unresolved.
pub fn parse_text(raw: &str) -> Result<NormalizedLog, FormatError> {
    let mut messages: Vec<Message> = Vec::new();
    let mut current: Option<(String, Vec<String>)> = None;
    let mut leading_noise = 0usize;

    for line in raw.lines() {
        if let Some((sender, inline_body)) = parse_header(line) {
            if let Some((sender, body)) = current.take() {
                messages.push(text_message(sender, body));
            }
            let mut body = Vec::new();
            if let Some(inline) = inline_body {
                body.push(inline);
            }
            current = Some((sender, body));
        } else if let Some((_, body)) = current.as_mut() {
            body.push(line.to_string());
        } else if !line.trim().is_empty() {
            leading_noise += 1;
        }
    }
    if let Some((sender, body)) = current {
        messages.push(text_message(sender, body));
    }

    if messages.is_empty() {
        let (line, snippet) = first_content_line(raw);
        return Err(FormatError::NoHeader {
            format: "slack text",
            line,
            snippet,
        });
    }

    let mut warnings = Vec::new();
    if leading_noise > 0 {
        warnings.push(format!(
            "{leading_noise} line(s) before the first message header were ignored"
        ));
    }

    Ok(NormalizedLog {
        messages,
        warnings,
        format: Some(SourceFormat::SlackText),
    })
}

fn parse_header(line: &str) -> Option<(String, Option<String>)> {
    if let Some(caps) = HEADER_NAME_TIME.captures(line) {
        return Some((caps[1].to_string(), None));
    }
    if let Some(caps) = HEADER_BRACKET.captures(line) {
        return Some((caps[2].to_string(), Some(caps[3].to_string())));
    }
    if let Some(caps) = HEADER_PAREN.captures(line) {
        return Some((caps[1].to_string(), Some(caps[3].to_string())));
    }
    None
}

fn text_message(sender: String, body: Vec<String>) -> Message {
    Message {
        sender,
        timestamp: None,
        raw_text: body.join("\n").trim().to_string(),
        source_format: SourceFormat::SlackText,
    }
}

pub(crate) fn first_content_line(raw: &str) -> (usize, String) {
    for (idx, line) in raw.lines().enumerate() {
        if !line.trim().is_empty() {
            let snippet: String = line.chars().take(80).collect();
            return (idx + 1, snippet);
        }
    }
    (1, String::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json_array() {
        let raw = r#"[
            {"user": "alice", "ts": "1705329000.000200", "text": "check this out"},
            {"user": "bob", "ts": "1705329060.000000", "text": "nice"}
        ]"#;
        let log = parse_json(raw).unwrap();
        assert_eq!(log.messages.len(), 2);
        assert_eq!(log.messages[0].sender, "alice");
        assert!(log.messages[0].timestamp.unwrap() < log.messages[1].timestamp.unwrap());
    }

    #[test]
    fn test_parse_json_wrapped_object() {
        let raw = r#"{"messages": [{"sender": "carol", "timestamp": "2026-01-15T14:30:00Z", "text": "hi"}]}"#;
        let log = parse_json(raw).unwrap();
        assert_eq!(log.messages.len(), 1);
        assert_eq!(log.messages[0].sender, "carol");
        assert!(log.messages[0].timestamp.is_some());
    }

    #[test]
    fn test_parse_json_truncated_fails_with_position() {
        let raw = r#"[{"user": "alice", "ts": "1705329000.0", "te"#;
        match parse_json(raw) {
            Err(FormatError::Json { line, .. }) => assert!(line >= 1),
            other => panic!("expected FormatError::Json, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_json_wrong_shape() {
        assert!(matches!(parse_json("42"), Err(FormatError::JsonShape)));
        assert!(matches!(
            parse_json(r#"{"channel": "general"}"#),
            Err(FormatError::JsonShape)
        ));
    }

    #[test]
    fn test_parse_text_multiline_bodies() {
        let raw = concat!(
            "alice  2:30 PM\n",
            "first line\n",
            "second line\n",
            "\n",
            "bob  2:35 PM\n",
            "reply\n",
        );
        let log = parse_text(raw).unwrap();
        assert_eq!(log.messages.len(), 2);
        assert_eq!(log.messages[0].raw_text, "first line\nsecond line");
        assert_eq!(log.messages[1].sender, "bob");
        // Pasted logs have no date; timestamps stay unresolved.
        assert!(log.messages[0].timestamp.is_none());
    }

    #[test]
    fn test_parse_text_bracket_and_paren_headers() {
        let raw = concat!("[2:30] alice: inline body\n", "carol (2:35): another\n");
        let log = parse_text(raw).unwrap();
        assert_eq!(log.messages.len(), 2);
        assert_eq!(log.messages[0].raw_text, "inline body");
        assert_eq!(log.messages[1].sender, "carol");
    }

    #[test]
    fn test_parse_text_no_header_is_error() {
        let raw = "just some prose\nwith no headers at all\n";
        match parse_text(raw) {
            Err(FormatError::NoHeader { format, line, .. }) => {
                assert_eq!(format, "slack text");
                assert_eq!(line, 1);
            }
            other => panic!("expected FormatError::NoHeader, got {other:?}"),
        }
    }
}
