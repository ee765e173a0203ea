//! URL discovery and classification over sanitized messages.
//!
//! The extractor is stateless per message: one [`ExtractedEntity`] per
//! distinct URL found, classified by the ordered rule list in [`rules`].
//! Merging repeated mentions across messages is deduplication's job.

pub mod rules;
pub mod slug;

use std::collections::HashSet;
use std::ops::Range;

use linkify::{LinkFinder, LinkKind};
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::entities::{EntityKind, ExtractedEntity, SanitizedMessage, Sentiment};

/// Upper bound on stored context so a snippet can never re-leak a long
/// excerpt.
pub const MAX_SNIPPET_CHARS: usize = 300;

const TRAILING_PUNCT: &[char] = &['.', ',', ';', ':', '!', '?', '\'', '"', '>'];

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

#[derive(Debug, Clone)]
struct UrlSpan {
    range: Range<usize>,
    url: Url,
}

/// Extract zero or more entities from one sanitized message.
/// `message_index` points back into the batch's sanitized sequence.
pub fn extract(msg: &SanitizedMessage, message_index: usize) -> Vec<ExtractedEntity> {
    let spans = find_urls(&msg.clean_text);
    if spans.is_empty() {
        return Vec::new();
    }
    let snippet = context_snippet(&msg.clean_text, &spans);

    let mut seen = HashSet::new();
    spans
        .into_iter()
        .filter(|span| seen.insert(span.url.as_str().to_string()))
        .map(|span| {
            let kind = rules::classify(&span.url, &msg.clean_text);
            ExtractedEntity {
                url: span.url,
                kind,
                message_index,
                context_snippet: snippet.clone(),
                // Filled in by the sentiment stage.
                sentiment: Sentiment::Neutral,
                mentioned_at: msg.timestamp,
            }
        })
        .collect()
}

/// Find URL-shaped substrings: scheme optional, trailing punctuation
/// trimmed, unbalanced closing brackets dropped so markdown-style
/// `[text](url)` links survive.
fn find_urls(text: &str) -> Vec<UrlSpan> {
    let mut finder = LinkFinder::new();
    finder.kinds(&[LinkKind::Url]);
    finder.url_must_have_scheme(false);

    let mut spans = Vec::new();
    for link in finder.links(text) {
        // A domain directly after '@' is an email remnant, not a link.
        if text[..link.start()].ends_with('@') {
            continue;
        }
        let raw = trim_url(link.as_str());
        if raw.is_empty() {
            continue;
        }
        let with_scheme = if raw.contains("://") {
            raw.to_string()
        } else {
            format!("https://{raw}")
        };
        let Ok(url) = Url::parse(&with_scheme) else {
            continue;
        };
        if url.scheme() != "http" && url.scheme() != "https" {
            continue;
        }
        if url.host_str().is_none() {
            continue;
        }
        spans.push(UrlSpan {
            range: link.start()..link.start() + raw.len(),
            url,
        });
    }
    spans
}

fn trim_url(raw: &str) -> &str {
    let mut s = raw.trim_end_matches(TRAILING_PUNCT);
    // Drop closing brackets that have no opening partner inside the match.
    loop {
        let trimmed = s.trim_end_matches(TRAILING_PUNCT);
        if trimmed.ends_with(')') && trimmed.matches('(').count() < trimmed.matches(')').count() {
            s = &trimmed[..trimmed.len() - 1];
        } else if trimmed.ends_with(']')
            && trimmed.matches('[').count() < trimmed.matches(']').count()
        {
            s = &trimmed[..trimmed.len() - 1];
        } else {
            return trimmed;
        }
    }
}

/// The sanitized text with URL spans removed, whitespace collapsed, and
/// length bounded.
fn context_snippet(text: &str, spans: &[UrlSpan]) -> String {
    let mut kept = String::with_capacity(text.len());
    let mut cursor = 0usize;
    for span in spans {
        if span.range.start > cursor {
            kept.push_str(&text[cursor..span.range.start]);
        }
        cursor = cursor.max(span.range.end.min(text.len()));
    }
    if cursor < text.len() {
        kept.push_str(&text[cursor..]);
    }

    let collapsed = WHITESPACE_RE.replace_all(kept.trim(), " ").into_owned();
    truncate_chars(&collapsed, MAX_SNIPPET_CHARS)
}

fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let cut: String = s.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", cut.trim_end())
}

/// Promotable entity kinds carry URLs worth fetching metadata for.
pub fn is_promotable(kind: EntityKind) -> bool {
    matches!(kind, EntityKind::Tool | EntityKind::Article)
}
