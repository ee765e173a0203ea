use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

/// --- Enums ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    SlackJson,
    SlackText,
    Whatsapp,
}

impl SourceFormat {
    /// Source type string recorded on the batch report.
    pub fn source_type(&self) -> &'static str {
        match self {
            Self::SlackJson | Self::SlackText => "slack",
            Self::Whatsapp => "whatsapp",
        }
    }

    /// Provenance string recorded on candidates.
    pub fn import_source(&self) -> &'static str {
        match self {
            Self::SlackJson | Self::SlackText => "slack-import",
            Self::Whatsapp => "whatsapp-import",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Tool,
    Article,
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
    Question,
}

/// --- Pipeline records ---

/// A single chat message as produced by the normalizer. Immutable once
/// built. The sender identity is consumed by the sanitizer and never
/// appears in any candidate or report.
#[derive(Debug, Clone)]
pub struct Message {
    pub sender: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub raw_text: String,
    pub source_format: SourceFormat,
}

/// A message after PII redaction. `sender_token` is an attribution token
/// (initials such as "A.S.", or "[user]" for phone-number senders) that
/// carries no disclosure risk.
#[derive(Debug, Clone)]
pub struct SanitizedMessage {
    pub sender_token: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub clean_text: String,
    pub source_format: SourceFormat,
}

/// A URL found in a sanitized message, classified by the extractor rules.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractedEntity {
    pub url: Url,
    pub kind: EntityKind,
    /// Index of the source message within the batch's sanitized sequence.
    pub message_index: usize,
    /// Sanitized context with the URL stripped, bounded length.
    pub context_snippet: String,
    pub sentiment: Sentiment,
    pub mentioned_at: Option<DateTime<Utc>>,
}

/// --- Candidates ---

#[derive(Debug, Clone, Serialize)]
pub struct ToolCandidate {
    pub slug: String,
    pub name: String,
    pub url: String,
    pub repo_url: Option<String>,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub categories: Vec<String>,
    pub context_snippet: String,
    pub sentiment: Sentiment,
    pub mention_count: u32,
    pub first_seen: Option<DateTime<Utc>>,
    pub last_seen: Option<DateTime<Utc>>,
    pub source: String,
    pub source_name: Option<String>,
    pub community: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArticleCandidate {
    pub slug: String,
    pub url: String,
    pub title: String,
    pub summary: Option<String>,
    pub context_snippet: String,
    pub sentiment: Sentiment,
    pub mention_count: u32,
    pub first_seen: Option<DateTime<Utc>>,
    pub last_seen: Option<DateTime<Utc>>,
    pub source: String,
    pub source_name: Option<String>,
    pub community: String,
}

/// --- Batch report ---

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BatchError {
    /// A page-metadata fetch failed; the candidate was still produced with
    /// a synthesized title.
    Fetch { url: String, message: String },
    /// A candidate failed shape validation and was dropped.
    Validation { url: String, message: String },
}

/// A candidate that matched an existing catalog key and was not proposed
/// again.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedRecord {
    pub key: String,
    pub entity: EntityKind,
    pub reason: String,
}

/// The assembled result of one pipeline run. Immutable after assembly;
/// the external catalog store consumes it to persist rows and advance the
/// community's import cursor.
#[derive(Debug, Clone, Serialize)]
pub struct ImportBatch {
    pub id: Uuid,
    pub source_type: String,
    pub source_name: Option<String>,
    pub community: String,
    pub cursor_since: Option<DateTime<Utc>>,
    pub dry_run: bool,
    pub message_count: usize,
    pub skipped_before_cursor: usize,
    pub skipped_unknown_timestamp: usize,
    pub entities_found: usize,
    /// URLs classified as noise, kept for observability only.
    pub ignored_urls: Vec<String>,
    pub new_tools: Vec<ToolCandidate>,
    pub updated_tools: Vec<ToolCandidate>,
    pub new_articles: Vec<ArticleCandidate>,
    pub skipped: Vec<SkippedRecord>,
    pub errors: Vec<BatchError>,
    pub warnings: Vec<String>,
    /// Highest timestamp observed in the export; the caller advances the
    /// community's cursor to this value after a successful commit.
    pub max_timestamp_seen: Option<DateTime<Utc>>,
}
