use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Archive key: blake3 hex hash of the source URL.
pub type PageId = String;

/// What kind of site a document was acquired from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceType {
    #[serde(alias = "college-info")]
    GeneralInfo,
    QuestionPapers,
}

impl SourceType {
    /// Human-readable label shown to the model and in status output.
    pub fn label(self) -> &'static str {
        match self {
            SourceType::GeneralInfo => "University Website",
            SourceType::QuestionPapers => "Question Papers Portal",
        }
    }
}

/// Normalized text extract of one configured source.
#[derive(Debug, Clone)]
pub struct Document {
    pub source_url: String,
    pub source_type: SourceType,
    pub content: String,
    pub fetched_at: DateTime<Utc>,
    /// Content is the static backup, not a live fetch.
    pub is_fallback: bool,
}

/// A document that scored above zero for a query.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub document: Arc<Document>,
    pub score: f64,
    pub label: &'static str,
    /// Leading slice of the document content, bounded for the prompt.
    pub excerpt: String,
    pub is_fallback: bool,
}

#[derive(Debug, Clone)]
pub struct SourceStatus {
    pub label: &'static str,
    pub url: String,
    pub is_fallback: bool,
    pub content_length: usize,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CacheStatus {
    pub last_refreshed: Option<DateTime<Utc>>,
    pub sources: Vec<SourceStatus>,
}

/// Metadata stored alongside an archived page in cnidarium.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchivedPage {
    pub id: PageId,
    pub source_url: String,
    pub source_type: SourceType,
    /// blake3 hex hash of the archived content.
    pub content_hash: String,
    pub size: usize,
    pub fetched_at: i64,
}

/// A lookup hit inside an archived page.
#[derive(Debug, Clone)]
pub struct PageExcerpt {
    pub source_url: String,
    pub offset: usize,
    pub content: String,
    pub match_count: usize,
}
