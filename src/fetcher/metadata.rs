//! Title/description extraction from fetched pages, plus the URL-derived
//! fallback used when fetching is disabled or fails.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

const MAX_TITLE_CHARS: usize = 500;
const MAX_DESCRIPTION_CHARS: usize = 2000;

static FILE_EXT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.(html?|php|aspx?)$").unwrap());

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
}

/// Pull a human-readable title and description out of page HTML.
/// Both fields are optional; pages without usable metadata yield an empty
/// result rather than an error.
pub fn extract_metadata(html: &str) -> PageMetadata {
    let document = Html::parse_document(html);
    PageMetadata {
        title: extract_title(&document),
        description: extract_description(&document),
    }
}

fn extract_title(document: &Html) -> Option<String> {
    if let Some(content) = meta_content(document, "meta[property='og:title']") {
        return Some(limit(&content, MAX_TITLE_CHARS));
    }
    for selector in ["title", "h1"] {
        if let Ok(sel) = Selector::parse(selector) {
            for element in document.select(&sel) {
                let text = element.text().collect::<String>().trim().to_string();
                if !text.is_empty() {
                    return Some(limit(&text, MAX_TITLE_CHARS));
                }
            }
        }
    }
    None
}

fn extract_description(document: &Html) -> Option<String> {
    for selector in [
        "meta[property='og:description']",
        "meta[name='twitter:description']",
        "meta[name='description']",
    ] {
        if let Some(content) = meta_content(document, selector) {
            return Some(limit(&content, MAX_DESCRIPTION_CHARS));
        }
    }
    None
}

fn meta_content(document: &Html, selector: &str) -> Option<String> {
    let sel = Selector::parse(selector).ok()?;
    document
        .select(&sel)
        .find_map(|el| el.value().attr("content"))
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
}

fn limit(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    s.chars().take(max).collect()
}

/// Readable title derived from the URL alone, used whenever the page
/// itself yields nothing.
pub fn synthesize_title(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default().trim_start_matches("www.");
    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.filter(|p| !p.is_empty()).collect())
        .unwrap_or_default();

    if host == "github.com" && segments.len() >= 2 {
        return format!("{}/{} on GitHub", segments[0], segments[1]);
    }
    if host == "arxiv.org" {
        if let Some(id) = segments.last() {
            return format!("arXiv Paper {}", id.trim_end_matches(".pdf"));
        }
    }

    let Some(last) = segments.last() else {
        return host.to_string();
    };
    let base = FILE_EXT_RE.replace(last, "");
    let words = base.replace(['-', '_'], " ");
    let titled = title_case(words.trim());
    if titled.is_empty() { host.to_string() } else { titled }
}

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
