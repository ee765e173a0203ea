//! Keyword/emoji/punctuation sentiment heuristic.
//!
//! Deliberately not a statistical classifier: deterministic, total, and
//! biased toward `Neutral` when nothing matches.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::entities::Sentiment;

const QUESTION_MARKERS: &[&str] = &["anyone", "has anyone", "what do you think", "opinions on"];

const POSITIVE_MARKERS: &[&str] = &[
    "love",
    "great",
    "amazing",
    "awesome",
    "excellent",
    "recommend",
    "essential",
    "daily driver",
    "best",
    "solid",
    "works well",
    "impressed",
    "\u{1f44d}",
    "\u{1f525}",
    "\u{2764}",
];

const NEGATIVE_MARKERS: &[&str] = &[
    "broken",
    "buggy",
    "avoid",
    "terrible",
    "doesn't work",
    "doesnt work",
    "issues",
    "problems",
    "abandoned",
    "frustrat",
    "\u{1f44e}",
];

// Negation immediately before a positive adjective flips it negative.
static NEGATED_POSITIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?:not|don't|dont|doesn't|doesnt|isn't|isnt|wasn't|wasnt|never)\s+(?:really\s+|that\s+)?(?:love|great|amazing|awesome|excellent|good|solid|impressed)\b",
    )
    .unwrap()
});

/// Classify the sentiment of a sanitized message. Never fails; text that
/// matches no marker is `Neutral`.
pub fn classify(text: &str) -> Sentiment {
    let lower = text.to_lowercase();

    if lower.contains('?') || QUESTION_MARKERS.iter().any(|m| lower.contains(m)) {
        return Sentiment::Question;
    }
    if NEGATED_POSITIVE.is_match(&lower) {
        return Sentiment::Negative;
    }
    if NEGATIVE_MARKERS.iter().any(|m| lower.contains(m)) {
        return Sentiment::Negative;
    }
    if POSITIVE_MARKERS.iter().any(|m| lower.contains(m)) {
        return Sentiment::Positive;
    }
    Sentiment::Neutral
}
