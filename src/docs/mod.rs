pub mod cache;
pub mod fallback;
pub mod ingest;
pub mod types;

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use cnidarium::{StateDelta, StateRead, StateWrite, Storage};
use futures::StreamExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use types::{ArchivedPage, Document, PageExcerpt, PageId};

// Key prefixes, without trailing slashes
const CONTENT_PREFIX: &str = "page/content";
const META_PREFIX: &str = "page/meta";

/// Chars of context kept on each side of a lookup hit.
const CONTEXT_WINDOW: usize = 300;

fn content_key(id: &str) -> String {
    format!("{}/{}", CONTENT_PREFIX, id)
}
fn meta_key(id: &str) -> String {
    format!("{}/{}", META_PREFIX, id)
}

pub fn page_id(source_url: &str) -> PageId {
    blake3::hash(source_url.as_bytes()).to_hex().to_string()
}

/// Persistent copy of the last live document of every source.
pub struct PageArchive {
    storage: Storage,
    /// Held from snapshot to commit so concurrent archive calls never build
    /// deltas on the same base version.
    write_lock: Mutex<()>,
}

impl PageArchive {
    pub async fn new(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let prefixes = vec![CONTENT_PREFIX.to_string(), META_PREFIX.to_string()];
        let storage = Storage::load(data_dir.to_path_buf(), prefixes)
            .await
            .context("Failed to init cnidarium storage")?;
        Ok(Self {
            storage,
            write_lock: Mutex::new(()),
        })
    }

    /// Store live documents, one record per source URL. Fallback documents
    /// and unchanged pages are skipped. Returns how many pages were written.
    pub async fn archive(&self, documents: &[std::sync::Arc<Document>]) -> Result<usize> {
        let _guard = self.write_lock.lock().await;
        let snapshot = self.storage.latest_snapshot();
        let mut delta = StateDelta::new(snapshot.clone());
        let mut written = 0usize;

        for doc in documents.iter().filter(|d| !d.is_fallback) {
            let id = page_id(&doc.source_url);
            let content_hash = blake3::hash(doc.content.as_bytes()).to_hex().to_string();

            if let Some(bytes) = snapshot.get_raw(&meta_key(&id)).await? {
                if let Ok(prev) = serde_json::from_slice::<ArchivedPage>(&bytes) {
                    if prev.content_hash == content_hash {
                        debug!(page_id = %id, "page unchanged, not rewriting");
                        continue;
                    }
                }
            }

            let meta = ArchivedPage {
                id: id.clone(),
                source_url: doc.source_url.clone(),
                source_type: doc.source_type,
                content_hash,
                size: doc.content.len(),
                fetched_at: doc.fetched_at.timestamp(),
            };
            delta.put_raw(content_key(&id), doc.content.as_bytes().to_vec());
            delta.put_raw(
                meta_key(&id),
                serde_json::to_vec(&meta).context("serialize page meta")?,
            );
            written += 1;
        }

        if written > 0 {
            self.storage.commit(delta).await?;
        }
        debug!(written, "pages archived");
        Ok(written)
    }

    pub async fn get_content(&self, id: &str) -> Result<String> {
        let snapshot = self.storage.latest_snapshot();
        let content = snapshot
            .get_raw(&content_key(id))
            .await?
            .ok_or_else(|| anyhow::anyhow!("page not found: {}", id))?;
        Ok(String::from_utf8_lossy(&content).into_owned())
    }

    /// All archived pages, most recently fetched first.
    pub async fn list(&self) -> Result<Vec<ArchivedPage>> {
        let snapshot = self.storage.latest_snapshot();
        let mut stream = snapshot.prefix_raw(META_PREFIX);
        let mut results = Vec::new();

        while let Some(entry) = stream.next().await {
            match entry {
                Ok((_key, value)) => {
                    if let Ok(meta) = serde_json::from_slice::<ArchivedPage>(&value) {
                        results.push(meta);
                    }
                }
                Err(e) => {
                    warn!("Error reading page meta stream: {}", e);
                }
            }
        }

        results.sort_by(|a, b| b.fetched_at.cmp(&a.fetched_at));
        Ok(results)
    }

    /// Keyword lookup across archived pages. Any query word matches (OR);
    /// excerpts covering more distinct words rank first.
    pub async fn search(&self, query: &str, max_results: usize) -> Result<Vec<PageExcerpt>> {
        let keywords: Vec<String> = query
            .split_whitespace()
            .map(|w| w.to_lowercase())
            .filter(|w| w.chars().count() > 2)
            .collect();
        if keywords.is_empty() {
            return Ok(vec![]);
        }

        let mut results = Vec::new();
        for page in self.list().await? {
            let content = match self.get_content(&page.id).await {
                Ok(c) => c,
                Err(e) => {
                    warn!(page_id = %page.id, "Failed to read archived page: {}", e);
                    continue;
                }
            };
            results.extend(excerpts(&page, &content, &keywords, max_results));
        }

        results.sort_by(|a, b| b.match_count.cmp(&a.match_count));
        results.truncate(max_results);
        Ok(results)
    }
}

/// Context windows around keyword hits in one page, skipping hits that fall
/// inside an already collected window.
fn excerpts(
    page: &ArchivedPage,
    content: &str,
    keywords: &[String],
    max_results: usize,
) -> Vec<PageExcerpt> {
    // Lower-case per char so positions line up with `chars`.
    let chars: Vec<char> = content.chars().collect();
    let lower: Vec<char> = chars
        .iter()
        .map(|c| c.to_lowercase().next().unwrap_or(*c))
        .collect();

    let mut seen: HashSet<usize> = HashSet::new();
    let mut results = Vec::new();

    for keyword in keywords {
        let needle: Vec<char> = keyword.chars().collect();
        let mut from = 0;
        while results.len() < max_results * 2 {
            let Some(pos) = find_chars(&lower, &needle, from) else {
                break;
            };
            from = pos + needle.len().max(1);

            if seen.iter().any(|&o| pos.abs_diff(o) < CONTEXT_WINDOW) {
                continue;
            }
            seen.insert(pos);

            let start = pos.saturating_sub(CONTEXT_WINDOW);
            let end = (pos + needle.len() + CONTEXT_WINDOW).min(chars.len());
            let excerpt: String = chars[start..end].iter().collect();
            let excerpt_lower = excerpt.to_lowercase();
            let match_count = keywords
                .iter()
                .filter(|k| excerpt_lower.contains(k.as_str()))
                .count();

            results.push(PageExcerpt {
                source_url: page.source_url.clone(),
                offset: pos,
                content: excerpt,
                match_count,
            });
        }
    }
    results
}

fn find_chars(haystack: &[char], needle: &[char], from: usize) -> Option<usize> {
    if needle.is_empty() || from >= haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docs::types::SourceType;
    use chrono::Utc;
    use std::sync::Arc;

    fn doc(url: &str, content: &str, is_fallback: bool) -> Arc<Document> {
        Arc::new(Document {
            source_url: url.to_string(),
            source_type: SourceType::GeneralInfo,
            content: content.to_string(),
            fetched_at: Utc::now(),
            is_fallback,
        })
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn archives_live_pages_once_and_skips_fallbacks() {
        let dir = tempfile::tempdir().unwrap();
        let archive = PageArchive::new(dir.path()).await.unwrap();

        let docs = vec![
            doc("https://a.test", "Hostel rooms are allotted every semester.", false),
            doc("https://b.test", "backup text", true),
        ];
        assert_eq!(archive.archive(&docs).await.unwrap(), 1);
        // Same content again: nothing to write.
        assert_eq!(archive.archive(&docs).await.unwrap(), 0);

        let pages = archive.list().await.unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].source_url, "https://a.test");
        assert_eq!(pages[0].id, page_id("https://a.test"));
        assert_eq!(pages[0].size, "Hostel rooms are allotted every semester.".len());

        let updated = vec![doc("https://a.test", "Hostel fees were revised this year.", false)];
        assert_eq!(archive.archive(&updated).await.unwrap(), 1);
        assert_eq!(archive.list().await.unwrap().len(), 1);
        assert_eq!(
            archive.get_content(&page_id("https://a.test")).await.unwrap(),
            "Hostel fees were revised this year."
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn concurrent_archive_calls_all_commit() {
        let dir = tempfile::tempdir().unwrap();
        let archive = Arc::new(PageArchive::new(dir.path()).await.unwrap());

        let writers: Vec<_> = (0..4)
            .map(|i| {
                let archive = archive.clone();
                tokio::spawn(async move {
                    let url = format!("https://page{}.test", i);
                    archive
                        .archive(&[doc(&url, &format!("Notice number {} for students.", i), false)])
                        .await
                })
            })
            .collect();
        for writer in writers {
            assert_eq!(writer.await.unwrap().unwrap(), 1);
        }

        assert_eq!(archive.list().await.unwrap().len(), 4);
        assert_eq!(
            archive.get_content(&page_id("https://page2.test")).await.unwrap(),
            "Notice number 2 for students."
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn search_returns_ranked_excerpts() {
        let dir = tempfile::tempdir().unwrap();
        let archive = PageArchive::new(dir.path()).await.unwrap();
        archive
            .archive(&[
                doc("https://a.test", "The library opens at nine. Hostel curfew is ten.", false),
                doc("https://b.test", "Library membership is free for students.", false),
            ])
            .await
            .unwrap();

        let hits = archive.search("library hostel", 5).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].source_url, "https://a.test");
        assert_eq!(hits[0].match_count, 2);
        assert_eq!(hits[1].match_count, 1);

        assert!(archive.search("at", 5).await.unwrap().is_empty());
    }

    #[test]
    fn excerpt_offsets_are_char_based() {
        let page = ArchivedPage {
            id: "x".to_string(),
            source_url: "https://x.test".to_string(),
            source_type: SourceType::GeneralInfo,
            content_hash: String::new(),
            size: 0,
            fetched_at: 0,
        };
        let hits = excerpts(&page, "Café — library", &["library".to_string()], 5);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].offset, 7);
    }
}
