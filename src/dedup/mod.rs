//! Candidate deduplication and incremental-sync bookkeeping.
//!
//! Every candidate gets a canonical comparison key. Keys collapse
//! equivalent URLs (scheme, `www.`, trailing slash, tracking parameters)
//! to one identity; tools key on their repository URL when one is known.
//! Intra-batch duplicates merge into a single candidate with an
//! accumulated mention count, then candidates matching the external
//! catalog snapshot become updates (tools) or skips (articles) instead of
//! new records. Curated catalog fields are never touched from here; an
//! update only proposes a mention-count increment and fresh context.

use std::collections::{HashMap, HashSet};

use percent_encoding::percent_decode_str;
use strsim::jaro_winkler;
use url::Url;

use crate::entities::{ArticleCandidate, EntityKind, Sentiment, SkippedRecord, ToolCandidate};

/// Tool names this similar (after normalization) are treated as the same
/// tool even when their URLs differ.
pub const FUZZY_NAME_THRESHOLD: f64 = 0.95;

const TRACKING_PARAMS: &[&str] = &[
    "fbclid", "gclid", "igshid", "mc_cid", "mc_eid", "ref", "ref_src", "si",
];

/// Canonical comparison key for a URL.
pub fn canonical_key(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);
    let path = percent_decode_str(url.path()).decode_utf8_lossy();
    let path = path.trim_end_matches('/');

    let kept: Vec<String> = url
        .query_pairs()
        .filter(|(k, _)| !is_tracking_param(k))
        .map(|(k, v)| {
            if v.is_empty() {
                k.into_owned()
            } else {
                format!("{k}={v}")
            }
        })
        .collect();

    let mut key = format!("https://{host}{path}");
    if !kept.is_empty() {
        key.push('?');
        key.push_str(&kept.join("&"));
    }
    key
}

pub fn canonical_key_str(url: &str) -> Option<String> {
    Url::parse(url).ok().map(|u| canonical_key(&u))
}

fn is_tracking_param(name: &str) -> bool {
    name.starts_with("utm_") || TRACKING_PARAMS.contains(&name)
}

/// Read-only view of the external catalog's existing keys, taken at batch
/// start. The pipeline never writes back; committing is the store's job.
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    pub tool_keys: HashSet<String>,
    pub article_keys: HashSet<String>,
}

impl CatalogSnapshot {
    /// Build a snapshot from raw catalog URLs, canonicalizing each.
    pub fn from_urls<'a>(
        tool_urls: impl IntoIterator<Item = &'a str>,
        article_urls: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        Self {
            tool_keys: tool_urls.into_iter().filter_map(canonical_key_str).collect(),
            article_keys: article_urls.into_iter().filter_map(canonical_key_str).collect(),
        }
    }
}

#[derive(Debug, Default)]
pub struct DedupOutcome {
    pub new_tools: Vec<ToolCandidate>,
    pub updated_tools: Vec<ToolCandidate>,
    pub new_articles: Vec<ArticleCandidate>,
    pub skipped: Vec<SkippedRecord>,
}

pub fn dedup(
    tools: Vec<ToolCandidate>,
    articles: Vec<ArticleCandidate>,
    snapshot: &CatalogSnapshot,
) -> DedupOutcome {
    let mut outcome = DedupOutcome::default();

    for acc in merge_tools(tools) {
        let (key, cand) = acc.finalize();
        if snapshot.tool_keys.contains(&key) {
            outcome.updated_tools.push(cand);
        } else {
            outcome.new_tools.push(cand);
        }
    }

    for acc in merge_articles(articles) {
        let (key, cand) = acc.finalize();
        if snapshot.article_keys.contains(&key) {
            outcome.skipped.push(SkippedRecord {
                key,
                entity: EntityKind::Article,
                reason: "url already in catalog".to_string(),
            });
        } else {
            outcome.new_articles.push(cand);
        }
    }

    outcome
}

struct ToolAcc {
    key: String,
    cand: ToolCandidate,
    sentiments: Vec<Sentiment>,
}

struct ArticleAcc {
    key: String,
    cand: ArticleCandidate,
    sentiments: Vec<Sentiment>,
}

impl ToolAcc {
    fn finalize(mut self) -> (String, ToolCandidate) {
        self.cand.sentiment = dominant_sentiment(&self.sentiments);
        (self.key, self.cand)
    }
}

impl ArticleAcc {
    fn finalize(mut self) -> (String, ArticleCandidate) {
        self.cand.sentiment = dominant_sentiment(&self.sentiments);
        (self.key, self.cand)
    }
}

fn tool_key(cand: &ToolCandidate) -> String {
    let url = cand.repo_url.as_deref().unwrap_or(&cand.url);
    canonical_key_str(url).unwrap_or_else(|| cand.slug.clone())
}

fn merge_tools(cands: Vec<ToolCandidate>) -> Vec<ToolAcc> {
    let mut order: Vec<ToolAcc> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for cand in cands {
        let key = tool_key(&cand);
        match index.get(&key) {
            Some(&i) => merge_tool_into(&mut order[i], cand),
            None => {
                index.insert(key.clone(), order.len());
                let sentiments = vec![cand.sentiment];
                order.push(ToolAcc { key, cand, sentiments });
            }
        }
    }

    // Fuzzy pass: distinct keys, near-identical names. O(n^2) over the
    // already key-merged set, which is small per batch.
    let mut i = 0;
    while i < order.len() {
        let mut j = i + 1;
        while j < order.len() {
            if similar_names(&order[i].cand.name, &order[j].cand.name) {
                let late = order.remove(j);
                let early = &mut order[i];
                early.cand.mention_count += late.cand.mention_count;
                early.cand.first_seen = min_opt(early.cand.first_seen, late.cand.first_seen);
                early.cand.last_seen = max_opt(early.cand.last_seen, late.cand.last_seen);
                early.sentiments.extend(late.sentiments);
                for category in late.cand.categories {
                    if !early.cand.categories.contains(&category) {
                        early.cand.categories.push(category);
                    }
                }
                if early.cand.repo_url.is_none() {
                    early.cand.repo_url = late.cand.repo_url;
                }
                if early.cand.title.is_none() {
                    early.cand.title = late.cand.title;
                }
                if early.cand.summary.is_none() {
                    early.cand.summary = late.cand.summary;
                }
            } else {
                j += 1;
            }
        }
        i += 1;
    }

    order
}

fn merge_tool_into(acc: &mut ToolAcc, cand: ToolCandidate) {
    acc.cand.mention_count += cand.mention_count;
    acc.cand.first_seen = min_opt(acc.cand.first_seen, cand.first_seen);
    acc.cand.last_seen = max_opt(acc.cand.last_seen, cand.last_seen);
    acc.sentiments.push(cand.sentiment);
    for category in cand.categories {
        if !acc.cand.categories.contains(&category) {
            acc.cand.categories.push(category);
        }
    }
    if acc.cand.repo_url.is_none() {
        acc.cand.repo_url = cand.repo_url;
    }
    if acc.cand.title.is_none() {
        acc.cand.title = cand.title;
    }
    if acc.cand.summary.is_none() {
        acc.cand.summary = cand.summary;
    }
}

fn merge_articles(cands: Vec<ArticleCandidate>) -> Vec<ArticleAcc> {
    let mut order: Vec<ArticleAcc> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for cand in cands {
        let key = canonical_key_str(&cand.url).unwrap_or_else(|| cand.slug.clone());
        match index.get(&key) {
            Some(&i) => {
                let acc = &mut order[i];
                acc.cand.mention_count += cand.mention_count;
                acc.cand.first_seen = min_opt(acc.cand.first_seen, cand.first_seen);
                acc.cand.last_seen = max_opt(acc.cand.last_seen, cand.last_seen);
                acc.sentiments.push(cand.sentiment);
                if acc.cand.summary.is_none() {
                    acc.cand.summary = cand.summary;
                }
            }
            None => {
                index.insert(key.clone(), order.len());
                let sentiments = vec![cand.sentiment];
                order.push(ArticleAcc { key, cand, sentiments });
            }
        }
    }

    order
}

fn similar_names(a: &str, b: &str) -> bool {
    let na = normalize_name(a);
    let nb = normalize_name(b);
    if na.is_empty() || nb.is_empty() {
        return false;
    }
    na == nb || jaro_winkler(&na, &nb) >= FUZZY_NAME_THRESHOLD
}

fn normalize_name(name: &str) -> String {
    name.to_ascii_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Most frequent label wins; any tie resolves to `Neutral` rather than
/// overclaiming sentiment.
fn dominant_sentiment(sentiments: &[Sentiment]) -> Sentiment {
    let mut counts: HashMap<Sentiment, usize> = HashMap::new();
    for s in sentiments {
        *counts.entry(*s).or_default() += 1;
    }
    let Some(max) = counts.values().copied().max() else {
        return Sentiment::Neutral;
    };
    let top: Vec<Sentiment> = counts
        .into_iter()
        .filter(|(_, c)| *c == max)
        .map(|(s, _)| s)
        .collect();
    match top.as_slice() {
        [single] => *single,
        _ => Sentiment::Neutral,
    }
}

fn min_opt<T: Ord>(a: Option<T>, b: Option<T>) -> Option<T> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

fn max_opt<T: Ord>(a: Option<T>, b: Option<T>) -> Option<T> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    }
}
