//! Ordered classification rules for extracted URLs.
//!
//! Each rule is a `(predicate, kind)` pair; the first match wins. New
//! platforms are added by appending a rule, never by touching the
//! evaluation loop. Code-hosting is checked before the article
//! heuristics, so a repository link inside link-sharing phrasing still
//! classifies as a tool.

use url::Url;

use crate::entities::EntityKind;

pub struct ClassifyRule {
    pub name: &'static str,
    pub kind: EntityKind,
    matches: fn(&Url, &str) -> bool,
}

pub static RULES: &[ClassifyRule] = &[
    ClassifyRule {
        name: "code-hosting",
        kind: EntityKind::Tool,
        matches: is_code_host,
    },
    ClassifyRule {
        name: "noise-host",
        kind: EntityKind::Ignored,
        matches: is_noise_host,
    },
    ClassifyRule {
        name: "article-platform",
        kind: EntityKind::Article,
        matches: is_article_host,
    },
    ClassifyRule {
        name: "link-sharing-phrasing",
        kind: EntityKind::Article,
        matches: has_sharing_phrasing,
    },
];

/// Classify a URL given the sanitized message text it appeared in.
/// Anything no rule claims is noise, kept only for observability.
pub fn classify(url: &Url, context: &str) -> EntityKind {
    for rule in RULES {
        if (rule.matches)(url, context) {
            return rule.kind;
        }
    }
    EntityKind::Ignored
}

const CODE_HOSTS: &[&str] = &[
    "github.com",
    "gitlab.com",
    "bitbucket.org",
    "npmjs.com",
    "pypi.org",
    "crates.io",
];

// Social posts, chat invites, and meeting links; never catalog material.
const NOISE_HOSTS: &[&str] = &[
    "twitter.com",
    "x.com",
    "instagram.com",
    "facebook.com",
    "tiktok.com",
    "discord.gg",
    "t.me",
    "whatsapp.com",
    "chat.whatsapp.com",
    "meet.google.com",
    "zoom.us",
];

const ARTICLE_HOSTS: &[&str] = &[
    "medium.com",
    "substack.com",
    "dev.to",
    "hashnode.dev",
    "github.io",
    "arxiv.org",
    "news.ycombinator.com",
    "youtube.com",
    "youtu.be",
    "vimeo.com",
];

const SHARING_PHRASES: &[&str] = &[
    "check out this post",
    "great read",
    "good read",
    "worth reading",
    "worth a read",
    "wrote up",
    "write-up",
    "writeup",
    "blog post",
    "article",
];

fn host_matches(host: &str, domain: &str) -> bool {
    host == domain || host.ends_with(&format!(".{domain}"))
}

fn host(url: &Url) -> &str {
    url.host_str().unwrap_or("")
}

fn is_code_host(url: &Url, _context: &str) -> bool {
    CODE_HOSTS.iter().any(|d| host_matches(host(url), d))
}

fn is_noise_host(url: &Url, _context: &str) -> bool {
    let h = host(url);
    if NOISE_HOSTS.iter().any(|d| host_matches(h, d)) {
        return true;
    }
    // Individual LinkedIn posts are noise; company pages fall through.
    host_matches(h, "linkedin.com") && url.path().starts_with("/posts")
}

fn is_article_host(url: &Url, _context: &str) -> bool {
    let h = host(url);
    if ARTICLE_HOSTS.iter().any(|d| host_matches(h, d)) {
        return true;
    }
    if h.starts_with("blog.") || h.starts_with("docs.") {
        return true;
    }
    let path = url.path();
    path.contains("/blog/") || path.contains("/posts/") || path.starts_with("/post/")
}

fn has_sharing_phrasing(_url: &Url, context: &str) -> bool {
    let lower = context.to_lowercase();
    SHARING_PHRASES.iter().any(|p| lower.contains(p))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_code_hosts_are_tools() {
        for u in [
            "https://github.com/anthropics/claude-code",
            "https://gitlab.com/group/project",
            "https://www.npmjs.com/package/langchain",
            "https://pypi.org/project/anthropic",
            "https://crates.io/crates/tokio",
        ] {
            assert_eq!(classify(&url(u), ""), EntityKind::Tool, "{u}");
        }
    }

    #[test]
    fn test_article_platforms() {
        for u in [
            "https://medium.com/@someone/a-post",
            "https://someone.substack.com/p/issue-42",
            "https://dev.to/user/post",
            "https://arxiv.org/abs/2501.01234",
            "https://www.youtube.com/watch?v=abc123",
            "https://blog.example.com/entry",
            "https://example.com/blog/entry",
        ] {
            assert_eq!(classify(&url(u), ""), EntityKind::Article, "{u}");
        }
    }

    #[test]
    fn test_noise_hosts_ignored() {
        for u in [
            "https://twitter.com/user/status/1",
            "https://x.com/user/status/1",
            "https://discord.gg/invite",
            "https://chat.whatsapp.com/ABC",
            "https://zoom.us/j/123",
            "https://www.linkedin.com/posts/someone_update",
        ] {
            assert_eq!(classify(&url(u), ""), EntityKind::Ignored, "{u}");
        }
    }

    #[test]
    fn test_sharing_phrasing_promotes_unknown_host() {
        let u = url("https://example.com/2026/ai-agents");
        assert_eq!(classify(&u, "great read on agent design"), EntityKind::Article);
        assert_eq!(classify(&u, "random link"), EntityKind::Ignored);
    }

    #[test]
    fn test_code_host_precedence_over_article_phrasing() {
        // Precedence regression: a repository link stays a tool even when
        // the message reads like an article share.
        let u = url("https://github.com/owner/repo");
        assert_eq!(classify(&u, "great read, check out this post"), EntityKind::Tool);
    }

    #[test]
    fn test_github_pages_is_article() {
        // github.io is the Pages blog platform, distinct from github.com.
        let u = url("https://someone.github.io/writing/agents");
        assert_eq!(classify(&u, ""), EntityKind::Article);
    }

    #[test]
    fn test_unknown_host_defaults_to_ignored() {
        let u = url("https://example.com/pricing");
        assert_eq!(classify(&u, "take a look"), EntityKind::Ignored);
    }
}
