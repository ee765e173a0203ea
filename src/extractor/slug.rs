//! Names, slugs, and category guessing for candidates.

use url::Url;

/// Tool name and canonical repository URL recovered from a code-hosting
/// or package-registry URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolIdentity {
    pub name: String,
    pub repo_url: Option<String>,
}

pub fn tool_identity(url: &Url) -> Option<ToolIdentity> {
    let host = url.host_str()?.trim_start_matches("www.");
    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.filter(|p| !p.is_empty()).collect())
        .unwrap_or_default();

    match host {
        "github.com" | "gitlab.com" | "bitbucket.org" => {
            let (owner, repo) = (segments.first()?, segments.get(1)?);
            let repo = repo.trim_end_matches(".git");
            Some(ToolIdentity {
                name: repo.to_string(),
                repo_url: Some(format!("https://{host}/{owner}/{repo}")),
            })
        }
        "npmjs.com" => {
            // /package/name or /package/@scope/name
            if segments.first() != Some(&"package") {
                return None;
            }
            let name = segments.get(1..)?.join("/");
            (!name.is_empty()).then_some(ToolIdentity {
                name,
                repo_url: None,
            })
        }
        "pypi.org" => {
            if segments.first() != Some(&"project") {
                return None;
            }
            segments.get(1).map(|name| ToolIdentity {
                name: name.to_string(),
                repo_url: None,
            })
        }
        "crates.io" => {
            if segments.first() != Some(&"crates") {
                return None;
            }
            segments.get(1).map(|name| ToolIdentity {
                name: name.to_string(),
                repo_url: None,
            })
        }
        _ => None,
    }
}

/// Deterministic slug: lowercase, runs of anything non-alphanumeric
/// collapse to single dashes.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;
    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

/// Slug for an article URL: last path segment when there is one, else the
/// host.
pub fn article_slug(url: &Url) -> String {
    let last = url
        .path_segments()
        .and_then(|s| s.filter(|p| !p.is_empty()).next_back());
    match last {
        Some(segment) => slugify(segment),
        None => slugify(url.host_str().unwrap_or_default()),
    }
}

const CATEGORY_KEYWORDS: &[(&str, &[&str])] = &[
    ("agent-framework", &["agent", "agentic", "langchain", "langgraph", "autogen", "crew"]),
    ("editor", &["editor", "ide", "vscode", "cursor", "vim", "neovim", "emacs"]),
    ("cli", &["cli", "command line", "terminal", "shell"]),
    ("mcp-server", &["mcp", "model context protocol"]),
    ("coding-assistant", &["copilot", "assistant", "pair program", "code completion"]),
    ("code-review", &["review", "pr review", "pull request"]),
    ("testing", &["test", "pytest", "jest", "testing"]),
    ("documentation", &["docs", "documentation", "readme", "docstring"]),
    ("orchestration", &["orchestrat", "workflow", "pipeline"]),
];

/// Keyword guess at tool categories from name, URL, and message context.
/// Falls back to "library" when nothing matches.
pub fn categorize(name: &str, url: &str, context: &str) -> Vec<String> {
    let haystack = format!("{name} {url} {context}").to_lowercase();
    let matched: Vec<String> = CATEGORY_KEYWORDS
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|k| haystack.contains(k)))
        .map(|(category, _)| category.to_string())
        .collect();
    if matched.is_empty() {
        vec!["library".to_string()]
    } else {
        matched
    }
}
