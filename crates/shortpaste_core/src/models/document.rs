//! Stored documents and the request/response shapes built around them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::{Host, Url};

/// An immutable stored document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub key: String,
    pub content: Vec<u8>,
    pub created_at: DateTime<Utc>,
}

impl Document {
    /// Create a document stamped with the current time.
    pub fn new(key: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            key: key.into(),
            content,
            created_at: Utc::now(),
        }
    }

    /// Whether this document is a URL alias.
    pub fn is_url(&self) -> bool {
        std::str::from_utf8(&self.content).is_ok_and(is_url)
    }

    /// The redirect target when this document is a URL alias.
    pub fn url(&self) -> Option<Url> {
        std::str::from_utf8(&self.content).ok().and_then(parse_url)
    }

    /// Content as text, replacing invalid UTF-8 sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.content).into_owned()
    }
}

/// JSON payload for `POST /documents`.
#[derive(Debug, Deserialize)]
pub struct SaveRequest {
    pub content: String,
    pub slug: Option<String>,
}

/// Result of a successful save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveOutcome {
    pub key: String,
    pub is_url: bool,
}

/// JSON view of a stored document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentView {
    pub key: String,
    pub data: String,
    pub is_url: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&Document> for DocumentView {
    fn from(value: &Document) -> Self {
        Self {
            key: value.key.clone(),
            data: value.text(),
            is_url: value.is_url(),
            created_at: value.created_at,
        }
    }
}

/// Whether `content` is a single absolute `http`, `https` or `ftp` URL.
///
/// Surrounding whitespace is ignored; any inner whitespace disqualifies.
pub fn is_url(content: &str) -> bool {
    parse_url(content).is_some()
}

/// Parse `content` as a redirect target.
///
/// Domain hosts must be `localhost` or have at least two labels ending in an
/// alphabetic top-level label, so `https://example` is not a URL.
pub fn parse_url(content: &str) -> Option<Url> {
    let candidate = content.trim();
    if candidate.is_empty() || candidate.chars().any(char::is_whitespace) {
        return None;
    }
    let url = Url::parse(candidate).ok()?;
    if !matches!(url.scheme(), "http" | "https" | "ftp") {
        return None;
    }
    let host_ok = match url.host()? {
        Host::Ipv4(_) | Host::Ipv6(_) => true,
        Host::Domain(domain) => is_public_domain(domain),
    };
    host_ok.then_some(url)
}

/// `domain` is already lowercased and punycode-encoded by the parser.
fn is_public_domain(domain: &str) -> bool {
    if domain == "localhost" {
        return true;
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return false;
    }
    let labels_ok = labels.iter().all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
    });
    let tld_ok = labels.last().is_some_and(|tld| {
        tld.starts_with("xn--")
            || (tld.len() >= 2 && tld.bytes().all(|b| b.is_ascii_alphabetic()))
    });
    labels_ok && tld_ok
}
