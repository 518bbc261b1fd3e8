use std::sync::{Arc, LazyLock};
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::fallback;
use super::types::{Document, SourceType};
use crate::error::{AcquisitionError, ConfigError};

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const BROWSER_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,image/apng,*/*;q=0.8";

/// Render width for html2text. Wide enough that paragraphs stay on one line.
const RENDER_WIDTH: usize = 10_000;

/// Text lines outside (MIN, MAX) chars are dropped.
const MIN_NODE_CHARS: usize = 10;
const MAX_NODE_CHARS: usize = 500;

/// Elements hidden from the rendered body together with their subtree.
const HIDDEN_ELEMENTS: &[&str] = &[
    "head", "script", "style", "noscript", "nav", "footer", "header", "iframe", "svg", "img",
];

static HIDDEN_ELEMENTS_CSS: LazyLock<String> = LazyLock::new(|| {
    HIDDEN_ELEMENTS
        .iter()
        .map(|tag| format!("{tag} {{ display: none; }}\n"))
        .collect()
});
static COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());
static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title\b[^>]*>(.*?)</title\s*>").unwrap());
static META_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<meta\b[^>]*>").unwrap());
static META_NAME_DESCRIPTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)\bname\s*=\s*["']description["']"#).unwrap());
static META_CONTENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?is)\bcontent\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap());
static LINK_REF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]*)\]\[\d+\]").unwrap());
static FOOTNOTE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\[\d+\]:").unwrap());
static LIST_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:#+|[*\->]|\d+\.)\s+").unwrap());
static BLANK_RUN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n\s*\n").unwrap());

/// One configured external source and how to normalize it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    pub url: String,
    pub source_type: SourceType,
    /// Banner line placed above the extracted text.
    pub heading: String,
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
    /// Static text used when the live fetch fails.
    pub fallback: String,
    /// When none of these occur in the page, `missing_terms_note` is appended.
    #[serde(default)]
    pub expected_terms: Vec<String>,
    #[serde(default)]
    pub missing_terms_note: Option<String>,
}

fn default_max_chars() -> usize {
    6000
}

impl SourceConfig {
    /// The two university sites the assistant ships with.
    pub fn defaults() -> Vec<SourceConfig> {
        vec![
            SourceConfig {
                name: "RV University Main Website".to_string(),
                url: "https://rvu.edu.in".to_string(),
                source_type: SourceType::GeneralInfo,
                heading: "RV UNIVERSITY - OFFICIAL WEBSITE INFORMATION".to_string(),
                max_chars: 6000,
                fallback: fallback::UNIVERSITY_SITE.to_string(),
                expected_terms: vec![],
                missing_terms_note: None,
            },
            SourceConfig {
                name: "RV University Question Papers Portal".to_string(),
                url: "https://univault-portal.vercel.app".to_string(),
                source_type: SourceType::QuestionPapers,
                heading: "UNIVAULT - QUESTION PAPERS PORTAL".to_string(),
                max_chars: 4000,
                fallback: fallback::QUESTION_PAPER_PORTAL.to_string(),
                expected_terms: [
                    "question", "paper", "exam", "subject", "semester", "course", "download",
                    "pdf", "previous", "year", "midterm", "final",
                ]
                .iter()
                .map(|s| s.to_string())
                .collect(),
                missing_terms_note: Some(
                    "Note: This portal appears to be a question paper repository for RV University students."
                        .to_string(),
                ),
            },
        ]
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.trim().is_empty() {
            return Err(ConfigError::Invalid(format!("source '{}' has no url", self.name)));
        }
        if self.fallback.trim().is_empty() {
            return Err(ConfigError::Invalid(format!(
                "source '{}' has no fallback text",
                self.name
            )));
        }
        if self.max_chars == 0 {
            return Err(ConfigError::Invalid(format!(
                "source '{}' has max_chars = 0",
                self.name
            )));
        }
        Ok(())
    }
}

/// Retrieves the raw HTML of a page.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, AcquisitionError>;
}

/// Plain HTTP GET with a browser identity and a bounded timeout.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(BROWSER_ACCEPT));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(BROWSER_USER_AGENT)
            .default_headers(headers)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, AcquisitionError> {
        let resp = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                AcquisitionError::Timeout { url: url.to_string() }
            } else {
                AcquisitionError::Http {
                    url: url.to_string(),
                    source: e,
                }
            }
        })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(AcquisitionError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        resp.text().await.map_err(|e| AcquisitionError::Body {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Fetches every configured source, one at a time.
pub struct Acquirer {
    fetcher: Arc<dyn PageFetcher>,
    sources: Vec<SourceConfig>,
    /// Minimum spacing between the starts of two consecutive fetches.
    min_interval: Duration,
}

impl Acquirer {
    pub fn new(fetcher: Arc<dyn PageFetcher>, sources: Vec<SourceConfig>, min_interval: Duration) -> Self {
        Self {
            fetcher,
            sources,
            min_interval,
        }
    }

    /// One document per source, in configuration order. A failing source
    /// yields its fallback document and never aborts the others.
    pub async fn fetch_all(&self) -> Vec<Document> {
        info!(sources = self.sources.len(), "Acquiring all sources");
        let mut documents = Vec::with_capacity(self.sources.len());
        let mut last_start: Option<Instant> = None;

        for source in &self.sources {
            if let Some(prev) = last_start {
                tokio::time::sleep_until(prev + self.min_interval).await;
            }
            last_start = Some(Instant::now());
            documents.push(self.acquire(source).await);
        }

        let fallbacks = documents.iter().filter(|d| d.is_fallback).count();
        info!(
            live = documents.len() - fallbacks,
            fallback = fallbacks,
            "Acquisition finished"
        );
        documents
    }

    async fn acquire(&self, source: &SourceConfig) -> Document {
        let result = match self.fetcher.fetch(&source.url).await {
            Ok(html) => normalize_html(&html, source),
            Err(e) => Err(e),
        };

        match result {
            Ok(content) => {
                info!(source = %source.url, size = content.len(), "Source acquired");
                Document {
                    source_url: source.url.clone(),
                    source_type: source.source_type,
                    content,
                    fetched_at: Utc::now(),
                    is_fallback: false,
                }
            }
            Err(e) => {
                warn!(source = %source.url, error = %e, "Acquisition failed, using fallback content");
                fallback_document(source)
            }
        }
    }
}

pub fn fallback_document(source: &SourceConfig) -> Document {
    let content = if source.fallback.trim().is_empty() {
        format!(
            "{}\n\nNo stored information is available for {}. Visit {} directly.",
            source.heading, source.name, source.url
        )
    } else {
        truncate_chars(&source.fallback, source.max_chars)
    };
    Document {
        source_url: source.url.clone(),
        source_type: source.source_type,
        content,
        fetched_at: Utc::now(),
        is_fallback: true,
    }
}

/// Turn a raw HTML page into the bounded plain-text body of a document.
pub fn normalize_html(html: &str, source: &SourceConfig) -> Result<String, AcquisitionError> {
    let uncommented = COMMENT_RE.replace_all(html, "");
    let title = TITLE_RE
        .captures(&uncommented)
        .map(|c| fragment_text(&c[1], &source.url))
        .transpose()?
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| source.name.clone());
    let description = meta_description(&uncommented)
        .map(|d| fragment_text(&d, &source.url))
        .transpose()?
        .filter(|d| !d.is_empty());

    let rendered = body_text(html, &source.url)?;

    let mut content = format!("{}\n\nPAGE TITLE: {}\n\n", source.heading, title);
    if let Some(description) = description {
        content.push_str(&format!("DESCRIPTION: {}\n\n", description));
    }

    let nodes: Vec<String> = rendered
        .lines()
        .filter_map(clean_line)
        .filter(|node| is_meaningful(node))
        .collect();
    debug!(source = %source.url, kept = nodes.len(), "Text nodes extracted");
    for node in &nodes {
        content.push_str(node);
        content.push('\n');
    }

    if let Some(note) = &source.missing_terms_note {
        let lower = nodes.join("\n").to_lowercase();
        let found = source
            .expected_terms
            .iter()
            .any(|t| lower.contains(&t.to_lowercase()));
        if !found {
            content.push('\n');
            content.push_str(note);
            content.push('\n');
        }
    }

    let content = truncate_chars(&content, source.max_chars);
    Ok(BLANK_RUN_RE.replace_all(&content, "\n\n").into_owned())
}

/// A text node qualifies when its length sits inside the window, it is not
/// purely numeric and it has more than two words.
pub fn is_meaningful(text: &str) -> bool {
    let len = text.chars().count();
    if len <= MIN_NODE_CHARS || len >= MAX_NODE_CHARS {
        return false;
    }
    if text.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    text.split_whitespace().count() > 2
}

/// Render the page body from the parsed DOM, skipping non-content elements.
fn body_text(html: &str, url: &str) -> Result<String, AcquisitionError> {
    let parse_error = |e: html2text::Error| AcquisitionError::Parse {
        url: url.to_string(),
        reason: e.to_string(),
    };
    html2text::config::plain()
        .add_css(&HIDDEN_ELEMENTS_CSS)
        .map_err(parse_error)?
        .string_from_read(html.as_bytes(), RENDER_WIDTH)
        .map_err(parse_error)
}

fn meta_description(html: &str) -> Option<String> {
    META_RE
        .find_iter(html)
        .map(|m| m.as_str())
        .find(|tag| META_NAME_DESCRIPTION_RE.is_match(tag))
        .and_then(|tag| META_CONTENT_RE.captures(tag))
        .and_then(|c| c.get(1).or_else(|| c.get(2)))
        .map(|m| m.as_str().to_string())
}

/// Render an HTML fragment to plain text (entities decoded).
fn fragment_text(fragment: &str, url: &str) -> Result<String, AcquisitionError> {
    html2text::from_read(fragment.as_bytes(), RENDER_WIDTH)
        .map(|s| s.trim().to_string())
        .map_err(|e| AcquisitionError::Parse {
            url: url.to_string(),
            reason: e.to_string(),
        })
}

/// Strip html2text decoration from a rendered line. Footnote lines are dropped.
fn clean_line(line: &str) -> Option<String> {
    let line = line.trim();
    if line.is_empty() || FOOTNOTE_RE.is_match(line) {
        return None;
    }
    let line = LIST_MARKER_RE.replace(line, "");
    let line = LINK_REF_RE.replace_all(&line, "$1");
    let line = line.replace("**", "");
    let line = line.split_whitespace().collect::<Vec<_>>().join(" ");
    if line.is_empty() {
        None
    } else {
        Some(line)
    }
}

pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
