pub mod prompts;
pub mod rank;
pub mod synth;

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::docs::cache::{FreshnessCache, Snapshot};
use crate::docs::types::CacheStatus;
use crate::docs::PageArchive;
use crate::error::QueryError;

use rank::KeywordWeights;
use synth::{Outcome, Synthesizer};

pub struct RagResponse {
    pub answer: String,
    /// "no_candidates", "generated" or "rule_based".
    pub outcome: &'static str,
    /// Source URLs of the candidates the answer was built from.
    pub sources: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct RefreshSummary {
    pub live: usize,
    pub fallback: usize,
}

/// Query pipeline: freshness check → ranking → synthesis.
pub struct RagEngine {
    cache: Arc<FreshnessCache>,
    synthesizer: Arc<Synthesizer>,
    weights: KeywordWeights,
    archive: Option<Arc<PageArchive>>,
}

impl RagEngine {
    pub fn new(
        cache: Arc<FreshnessCache>,
        synthesizer: Arc<Synthesizer>,
        weights: KeywordWeights,
    ) -> Self {
        Self {
            cache,
            synthesizer,
            weights,
            archive: None,
        }
    }

    /// Persist live documents after every refresh.
    pub fn with_archive(mut self, archive: Arc<PageArchive>) -> Self {
        self.archive = Some(archive);
        self
    }

    pub fn cache(&self) -> &FreshnessCache {
        &self.cache
    }

    pub fn synthesizer(&self) -> &Synthesizer {
        &self.synthesizer
    }

    pub async fn process_query(&self, text: &str) -> Result<RagResponse, QueryError> {
        let query = text.trim();
        if query.is_empty() {
            return Err(QueryError::EmptyQuery);
        }

        let refreshes_before = self.cache.refresh_count();
        let snapshot = self.cache.ensure_fresh(false).await;
        if self.cache.refresh_count() != refreshes_before {
            self.archive_snapshot(&snapshot).await;
        }

        let candidates = rank::rank(query, &snapshot.documents, &self.weights);
        debug!(
            documents = snapshot.documents.len(),
            candidates = candidates.len(),
            top_score = candidates.first().map(|c| c.score).unwrap_or(0.0),
            "Documents ranked"
        );

        let outcome = self.synthesizer.synthesize(query, &candidates).await?;
        if let Outcome::RuleBased { cause, .. } = &outcome {
            debug!(cause = %cause, "Answered without the model");
        }
        info!(
            outcome = outcome.kind(),
            candidates = candidates.len(),
            "Query answered"
        );

        let mut sources: Vec<String> = Vec::new();
        for c in &candidates {
            if !sources.contains(&c.document.source_url) {
                sources.push(c.document.source_url.clone());
            }
        }

        Ok(RagResponse {
            answer: outcome.answer().to_string(),
            outcome: outcome.kind(),
            sources,
        })
    }

    pub async fn status(&self) -> CacheStatus {
        self.cache.status().await
    }

    /// Re-acquire every source now. Concurrent queries keep reading the
    /// previous set until the new one is swapped in.
    pub async fn force_refresh(&self) -> RefreshSummary {
        let snapshot = self.cache.ensure_fresh(true).await;
        self.archive_snapshot(&snapshot).await;
        let fallback = snapshot.documents.iter().filter(|d| d.is_fallback).count();
        RefreshSummary {
            live: snapshot.documents.len() - fallback,
            fallback,
        }
    }

    async fn archive_snapshot(&self, snapshot: &Snapshot) {
        let Some(archive) = &self.archive else {
            return;
        };
        match archive.archive(&snapshot.documents).await {
            Ok(written) => debug!(written, "Snapshot archived"),
            Err(e) => warn!(error = %e, "Failed to archive snapshot"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docs::cache::DEFAULT_TTL;
    use crate::docs::ingest::{Acquirer, PageFetcher, SourceConfig};
    use crate::error::{AcquisitionError, ModelError};
    use crate::llm::GenerativeModel;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct PortalFetcher {
        fail: bool,
    }

    #[async_trait]
    impl PageFetcher for PortalFetcher {
        async fn fetch(&self, url: &str) -> Result<String, AcquisitionError> {
            if self.fail {
                return Err(AcquisitionError::Timeout { url: url.to_string() });
            }
            Ok("<html><body>\
                <p>The placement cell hosts recruitment drives for final year students.</p>\
                <p>Question papers for every semester are available to download.</p>\
                </body></html>"
                .to_string())
        }
    }

    struct CountingModel {
        fail: bool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl GenerativeModel for CountingModel {
        async fn generate(&self, prompt: &str) -> Result<String, ModelError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ModelError::Request("unreachable".to_string()));
            }
            Ok(format!("answer built from {} chars of prompt", prompt.len()))
        }
    }

    fn engine(fetch_fails: bool, model_fails: bool) -> (RagEngine, Arc<CountingModel>) {
        let acquirer = Acquirer::new(
            Arc::new(PortalFetcher { fail: fetch_fails }),
            SourceConfig::defaults(),
            Duration::ZERO,
        );
        let cache = Arc::new(FreshnessCache::new(acquirer, DEFAULT_TTL));
        let model = Arc::new(CountingModel {
            fail: model_fails,
            calls: AtomicUsize::new(0),
        });
        let synthesizer = Arc::new(Synthesizer::new(model.clone(), Duration::from_secs(5)));
        (
            RagEngine::new(cache, synthesizer, KeywordWeights::default()),
            model,
        )
    }

    #[tokio::test]
    async fn blank_query_is_rejected_before_the_pipeline() {
        let (engine, model) = engine(false, false);
        assert!(matches!(
            engine.process_query("   ").await,
            Err(QueryError::EmptyQuery)
        ));
        assert_eq!(engine.cache().refresh_count(), 0);
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn relevant_query_goes_through_the_model() {
        let (engine, model) = engine(false, false);

        let response = engine
            .process_query("When are the semester question papers out?")
            .await
            .unwrap();

        assert_eq!(response.outcome, "generated");
        assert!(response.answer.starts_with("answer built from"));
        assert_eq!(response.sources.len(), 2);
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
        assert_eq!(engine.cache().refresh_count(), 1);
    }

    #[tokio::test]
    async fn unmatched_query_returns_fixed_message_without_model_call() {
        let (engine, model) = engine(false, false);

        let response = engine.process_query("xylophone zebra").await.unwrap();

        assert_eq!(response.outcome, "no_candidates");
        assert_eq!(response.answer, prompts::NO_INFORMATION);
        assert!(response.sources.is_empty());
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn model_outage_falls_back_to_canned_answer() {
        let (engine, _model) = engine(false, true);

        let response = engine.process_query("placement statistics").await.unwrap();

        assert_eq!(response.outcome, "rule_based");
        assert!(response.answer.contains("dedicated placement cell"));
    }

    #[tokio::test]
    async fn offline_sources_still_answer_from_fallback_content() {
        let (engine, _model) = engine(true, false);

        let response = engine.process_query("hostel facilities").await.unwrap();
        assert_eq!(response.outcome, "generated");

        let status = engine.status().await;
        assert_eq!(status.sources.len(), 2);
        assert!(status.sources.iter().all(|s| s.is_fallback));
    }

    #[tokio::test]
    async fn forced_refresh_reports_live_and_fallback_counts() {
        let (engine, _model) = engine(false, false);
        engine.process_query("placement").await.unwrap();

        let summary = engine.force_refresh().await;
        assert_eq!(summary.live, 2);
        assert_eq!(summary.fallback, 0);
        assert_eq!(engine.cache().refresh_count(), 2);
    }
}
