use std::time::Duration;

use bytes::Bytes;
use encoding_rs::Encoding;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{Client, ClientBuilder};
use tracing::instrument;
use url::Url;

use crate::fetcher::errors::FetchError;

/// Response bodies are capped so a pathological page cannot balloon the
/// batch's memory use.
const MAX_BODY_SIZE: u64 = 2 * 1024 * 1024; // 2MB
const USER_AGENT: &str = "ToolscoutBot/0.1 (+https://toolscout.example.com)";

// Matches both the Content-Type header parameter and the <meta charset>
// forms within the probe window.
static CHARSET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)charset\s*=\s*["']?([A-Za-z0-9_-]+)"#).unwrap());

static HTTP_CLIENT: Lazy<Client> = Lazy::new(|| {
    ClientBuilder::new()
        .connect_timeout(Duration::from_secs(10))
        .timeout(Duration::from_secs(15))
        .user_agent(USER_AGENT)
        .redirect(reqwest::redirect::Policy::limited(5))
        .default_headers({
            let mut headers = reqwest::header::HeaderMap::new();
            headers.insert(
                reqwest::header::ACCEPT,
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"
                    .parse()
                    .expect("static accept header"),
            );
            headers
        })
        .build()
        .expect("Failed to build HTTP client")
});

/// A fetched, decoded HTML page.
#[derive(Debug)]
pub struct PageDocument {
    pub url_final: Url,
    pub body: String,
}

/// One bounded-timeout request, no credentials attached, no retries.
#[instrument(skip_all, fields(url = %url))]
pub async fn fetch_page(url: &Url) -> Result<PageDocument, FetchError> {
    let response = HTTP_CLIENT
        .get(url.clone())
        .send()
        .await
        .map_err(FetchError::from_reqwest_error)?;

    if let Some(content_length) = response.content_length()
        && content_length > MAX_BODY_SIZE
    {
        return Err(FetchError::BodyTooLarge(content_length));
    }

    let url_final = response.url().clone();
    let status = response.status();

    if !status.is_success() {
        return Err(FetchError::Http { status });
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|ct| ct.to_str().ok())
        .unwrap_or("text/html")
        .to_string();

    if !content_type.contains("text/html") && !content_type.contains("application/xhtml") {
        return Err(FetchError::UnsupportedContentType(content_type));
    }

    let body_bytes = response
        .bytes()
        .await
        .map_err(|e| FetchError::Io(e.to_string()))?;

    // Content-Length can be absent; re-check after download.
    if body_bytes.len() as u64 > MAX_BODY_SIZE {
        return Err(FetchError::BodyTooLarge(body_bytes.len() as u64));
    }

    let body = decode_body(&body_bytes, &content_type)?;
    Ok(PageDocument { url_final, body })
}

/// Decode response bytes to UTF-8: charset from the Content-Type header
/// when present, else from a `<meta charset>` in the first 4KB, else a
/// byte-frequency guess.
fn decode_body(body_bytes: &Bytes, content_type: &str) -> Result<String, FetchError> {
    let encoding = declared_encoding(content_type)
        .or_else(|| {
            let probe = &body_bytes[..body_bytes.len().min(4096)];
            declared_encoding(&String::from_utf8_lossy(probe))
        })
        .unwrap_or_else(|| {
            let probe = &body_bytes[..body_bytes.len().min(4096)];
            let mut detector = chardetng::EncodingDetector::new();
            detector.feed(probe, false);
            detector.guess(None, true)
        });

    let (decoded, _, had_errors) = encoding.decode(body_bytes);
    if had_errors {
        return Err(FetchError::Charset(format!(
            "failed to decode content as {}",
            encoding.name()
        )));
    }
    Ok(decoded.into_owned())
}

fn declared_encoding(haystack: &str) -> Option<&'static Encoding> {
    let label = CHARSET_RE.captures(haystack)?.get(1)?.as_str().to_lowercase();
    Encoding::for_label(label.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_charset_from_content_type() {
        let body = Bytes::from_static(b"<html><title>ok</title></html>");
        let decoded = decode_body(&body, "text/html; charset=utf-8").unwrap();
        assert!(decoded.contains("ok"));
    }

    #[test]
    fn test_charset_from_meta_tag() {
        let body = Bytes::from(
            b"<html><head><meta charset=\"windows-1252\"></head><body>caf\xe9</body></html>"
                .to_vec(),
        );
        let decoded = decode_body(&body, "text/html").unwrap();
        assert!(decoded.contains("café"));
    }

    #[test]
    fn test_utf8_multibyte() {
        let body = Bytes::from("<html><body>Hello, 世界!</body></html>".as_bytes().to_vec());
        let decoded = decode_body(&body, "text/html; charset=utf-8").unwrap();
        assert!(decoded.contains("世界"));
    }
}
