//! Pipeline orchestration.
//!
//! One run walks RAW → NORMALIZED → SANITIZED → EXTRACTED → ENRICHED →
//! DEDUPED → ASSEMBLED over immutable stage outputs. Only the normalizer
//! can fail the batch; metadata fetches fail per URL and are absorbed.
//! The run is abortable between stages via a [`CancellationToken`], and a
//! cancelled run returns nothing rather than a partial batch.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};
use url::Url;
use uuid::Uuid;

use crate::dedup::{self, CatalogSnapshot};
use crate::entities::{
    ArticleCandidate, BatchError, EntityKind, ExtractedEntity, ImportBatch, Message,
    SanitizedMessage, SourceFormat, ToolCandidate,
};
use crate::extractor::{self, slug};
use crate::fetcher::{self, PageMetadata, pool::DEFAULT_CONCURRENCY};
use crate::normalizer::{self, FormatError, FormatHint};
use crate::sanitizer::{Roster, SanitizeOptions, Sanitizer};
use crate::sentiment;

#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub community: String,
    pub source_name: Option<String>,
    pub format: FormatHint,
    pub sanitize: bool,
    pub fetch_metadata: bool,
    pub since: Option<DateTime<Utc>>,
    pub dry_run: bool,
    /// Extra roster names beyond the export's own senders.
    pub roster: Vec<String>,
    pub fetch_concurrency: usize,
}

impl IngestOptions {
    pub fn new(community: impl Into<String>) -> Self {
        Self {
            community: community.into(),
            source_name: None,
            format: FormatHint::Auto,
            sanitize: true,
            fetch_metadata: true,
            since: None,
            dry_run: false,
            roster: Vec::new(),
            fetch_concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

#[derive(Error, Debug)]
pub enum IngestError {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("ingest cancelled")]
    Cancelled,
}

pub struct Pipeline {
    opts: IngestOptions,
}

impl Pipeline {
    pub fn new(opts: IngestOptions) -> Self {
        Self { opts }
    }

    pub async fn run(
        &self,
        raw: &str,
        snapshot: &CatalogSnapshot,
    ) -> Result<ImportBatch, IngestError> {
        self.run_with_cancel(raw, snapshot, &CancellationToken::new())
            .await
    }

    #[instrument(skip_all, fields(community = %self.opts.community))]
    pub async fn run_with_cancel(
        &self,
        raw: &str,
        snapshot: &CatalogSnapshot,
        cancel: &CancellationToken,
    ) -> Result<ImportBatch, IngestError> {
        let log = normalizer::normalize(raw, self.opts.format)?;
        let mut warnings = log.warnings;
        let message_count = log.messages.len();
        let source_type = log
            .format
            .map(|f| f.source_type().to_string())
            .unwrap_or_else(|| "unknown".to_string());
        info!(message_count, source_type = %source_type, "normalized export");
        ensure_live(cancel)?;

        // Reported even when the cursor filters everything, so the caller
        // can always advance.
        let max_timestamp_seen = log.messages.iter().filter_map(|m| m.timestamp).max();

        let mut skipped_before_cursor = 0usize;
        let mut skipped_unknown_timestamp = 0usize;
        let messages: Vec<Message> = match self.opts.since {
            Some(since) => log
                .messages
                .into_iter()
                .filter(|m| match m.timestamp {
                    Some(ts) if ts > since => true,
                    Some(_) => {
                        skipped_before_cursor += 1;
                        false
                    }
                    // Unordered against the cursor; excluded rather than
                    // risking duplicate mentions.
                    None => {
                        skipped_unknown_timestamp += 1;
                        false
                    }
                })
                .collect(),
            None => log.messages,
        };
        if skipped_before_cursor > 0 {
            warnings.push(format!(
                "{skipped_before_cursor} message(s) at or before the cursor were skipped"
            ));
        }
        if skipped_unknown_timestamp > 0 {
            warnings.push(format!(
                "{skipped_unknown_timestamp} message(s) without a resolvable timestamp were skipped because a cursor was supplied"
            ));
        }

        let roster = Roster::from_messages(&messages, &self.opts.roster);
        let sanitize_opts = if self.opts.sanitize {
            SanitizeOptions::default()
        } else {
            SanitizeOptions::disabled()
        };
        let sanitizer = Sanitizer::new(sanitize_opts, &roster);
        let sanitized: Vec<SanitizedMessage> =
            messages.iter().map(|m| sanitizer.sanitize(m)).collect();
        // Sender identities are consumed here and never persist.
        drop(messages);
        ensure_live(cancel)?;

        let mut entities: Vec<ExtractedEntity> = Vec::new();
        for (idx, msg) in sanitized.iter().enumerate() {
            let mut found = extractor::extract(msg, idx);
            if found.is_empty() {
                continue;
            }
            let label = sentiment::classify(&msg.clean_text);
            for entity in &mut found {
                entity.sentiment = label;
            }
            entities.extend(found);
        }
        let entities_found = entities.len();
        let ignored_urls: Vec<String> = entities
            .iter()
            .filter(|e| e.kind == EntityKind::Ignored)
            .map(|e| e.url.to_string())
            .collect();
        info!(entities_found, ignored = ignored_urls.len(), "extracted entities");
        ensure_live(cancel)?;

        let mut errors: Vec<BatchError> = Vec::new();
        let metadata = if self.opts.fetch_metadata {
            let urls: Vec<Url> = entities
                .iter()
                .filter(|e| extractor::is_promotable(e.kind))
                .map(|e| e.url.clone())
                .collect();
            // Join point: dedup waits for every fetch to resolve or time
            // out. Dropping the future on cancel aborts in-flight tasks.
            let results = tokio::select! {
                _ = cancel.cancelled() => return Err(IngestError::Cancelled),
                results = fetcher::fetch_all(&urls, self.opts.fetch_concurrency) => results,
            };
            let mut map = HashMap::new();
            for (url, result) in results {
                match result {
                    Ok(meta) => {
                        map.insert(url, meta);
                    }
                    Err(err) => errors.push(BatchError::Fetch {
                        url: url.to_string(),
                        message: err.to_string(),
                    }),
                }
            }
            map
        } else {
            HashMap::new()
        };

        let (tools, articles) = self.build_candidates(&entities, &metadata, log.format, &mut errors);
        ensure_live(cancel)?;

        let outcome = dedup::dedup(tools, articles, snapshot);
        info!(
            new_tools = outcome.new_tools.len(),
            updated_tools = outcome.updated_tools.len(),
            new_articles = outcome.new_articles.len(),
            skipped = outcome.skipped.len(),
            errors = errors.len(),
            "batch assembled"
        );

        Ok(ImportBatch {
            id: Uuid::new_v4(),
            source_type,
            source_name: self.opts.source_name.clone(),
            community: self.opts.community.clone(),
            cursor_since: self.opts.since,
            dry_run: self.opts.dry_run,
            message_count,
            skipped_before_cursor,
            skipped_unknown_timestamp,
            entities_found,
            ignored_urls,
            new_tools: outcome.new_tools,
            updated_tools: outcome.updated_tools,
            new_articles: outcome.new_articles,
            skipped: outcome.skipped,
            errors,
            warnings,
            max_timestamp_seen,
        })
    }

    fn build_candidates(
        &self,
        entities: &[ExtractedEntity],
        metadata: &HashMap<Url, PageMetadata>,
        format: Option<SourceFormat>,
        errors: &mut Vec<BatchError>,
    ) -> (Vec<ToolCandidate>, Vec<ArticleCandidate>) {
        let source = format
            .map(|f| f.import_source().to_string())
            .unwrap_or_else(|| "import".to_string());
        let mut tools = Vec::new();
        let mut articles = Vec::new();

        for entity in entities {
            let fetched = metadata.get(&entity.url);
            match entity.kind {
                EntityKind::Tool => {
                    let Some(identity) = slug::tool_identity(&entity.url) else {
                        errors.push(BatchError::Validation {
                            url: entity.url.to_string(),
                            message: "no tool name derivable from url".to_string(),
                        });
                        continue;
                    };
                    let slug_value = slug::slugify(&identity.name);
                    if slug_value.is_empty() {
                        errors.push(BatchError::Validation {
                            url: entity.url.to_string(),
                            message: "empty slug after normalization".to_string(),
                        });
                        continue;
                    }
                    tools.push(ToolCandidate {
                        slug: slug_value,
                        categories: slug::categorize(
                            &identity.name,
                            entity.url.as_str(),
                            &entity.context_snippet,
                        ),
                        name: identity.name,
                        url: entity.url.to_string(),
                        repo_url: identity.repo_url,
                        title: fetched.and_then(|m| m.title.clone()),
                        summary: fetched.and_then(|m| m.description.clone()),
                        context_snippet: entity.context_snippet.clone(),
                        sentiment: entity.sentiment,
                        mention_count: 1,
                        first_seen: entity.mentioned_at,
                        last_seen: entity.mentioned_at,
                        source: source.clone(),
                        source_name: self.opts.source_name.clone(),
                        community: self.opts.community.clone(),
                    });
                }
                EntityKind::Article => {
                    let slug_value = slug::article_slug(&entity.url);
                    if slug_value.is_empty() {
                        errors.push(BatchError::Validation {
                            url: entity.url.to_string(),
                            message: "empty slug after normalization".to_string(),
                        });
                        continue;
                    }
                    let title = fetched
                        .and_then(|m| m.title.clone())
                        .unwrap_or_else(|| fetcher::synthesize_title(&entity.url));
                    let summary = fetched.and_then(|m| m.description.clone()).or_else(|| {
                        (!entity.context_snippet.is_empty())
                            .then(|| entity.context_snippet.clone())
                    });
                    articles.push(ArticleCandidate {
                        slug: slug_value,
                        url: entity.url.to_string(),
                        title,
                        summary,
                        context_snippet: entity.context_snippet.clone(),
                        sentiment: entity.sentiment,
                        mention_count: 1,
                        first_seen: entity.mentioned_at,
                        last_seen: entity.mentioned_at,
                        source: source.clone(),
                        source_name: self.opts.source_name.clone(),
                        community: self.opts.community.clone(),
                    });
                }
                EntityKind::Ignored => {}
            }
        }

        (tools, articles)
    }
}

fn ensure_live(cancel: &CancellationToken) -> Result<(), IngestError> {
    if cancel.is_cancelled() {
        Err(IngestError::Cancelled)
    } else {
        Ok(())
    }
}
