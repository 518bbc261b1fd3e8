use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::prompts;
use crate::docs::types::Candidate;
use crate::error::{ModelError, SynthesisError};
use crate::llm::GenerativeModel;

/// How a query was answered.
#[derive(Debug)]
pub enum Outcome {
    /// Nothing relevant was found; the model was not called.
    NoCandidates,
    Generated(String),
    /// The model failed; a canned topic answer was used instead.
    RuleBased {
        answer: &'static str,
        cause: ModelError,
    },
}

impl Outcome {
    pub fn answer(&self) -> &str {
        match self {
            Outcome::NoCandidates => prompts::NO_INFORMATION,
            Outcome::Generated(text) => text,
            Outcome::RuleBased { answer, .. } => answer,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Outcome::NoCandidates => "no_candidates",
            Outcome::Generated(_) => "generated",
            Outcome::RuleBased { .. } => "rule_based",
        }
    }
}

pub struct Synthesizer {
    model: Arc<dyn GenerativeModel>,
    timeout_ms: AtomicU64,
}

impl Synthesizer {
    pub fn new(model: Arc<dyn GenerativeModel>, timeout: Duration) -> Self {
        Self {
            model,
            timeout_ms: AtomicU64::new(whole_millis(timeout)),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.load(Ordering::Relaxed))
    }

    /// Sub-millisecond values are raised to 1ms.
    pub fn set_timeout(&self, timeout: Duration) {
        let millis = whole_millis(timeout);
        self.timeout_ms.store(millis, Ordering::Relaxed);
        info!(timeout_ms = millis, "Model timeout updated");
    }

    /// Answer `query` from `candidates`. An empty candidate list short-circuits
    /// to the fixed no-information answer without touching the model.
    pub async fn synthesize(
        &self,
        query: &str,
        candidates: &[Candidate],
    ) -> Result<Outcome, SynthesisError> {
        if candidates.is_empty() {
            debug!("No candidates, skipping model call");
            return Ok(Outcome::NoCandidates);
        }
        self.generate(query, candidates).await
    }

    /// Call the model unconditionally. Model failure degrades to a canned
    /// answer when there is content, and is an error when there is none.
    pub async fn generate(
        &self,
        query: &str,
        candidates: &[Candidate],
    ) -> Result<Outcome, SynthesisError> {
        let prompt = prompts::build_prompt(query, candidates);
        debug!(
            prompt_len = prompt.len(),
            candidates = candidates.len(),
            "Sending prompt to model"
        );

        match self.call_model(&prompt).await {
            Ok(text) => Ok(Outcome::Generated(text)),
            Err(cause) if !candidates.is_empty() => {
                warn!(error = %cause, "Model call failed, answering from canned topics");
                Ok(Outcome::RuleBased {
                    answer: prompts::canned_answer(query),
                    cause,
                })
            }
            Err(cause) => Err(SynthesisError::ModelUnavailable { source: cause }),
        }
    }

    async fn call_model(&self, prompt: &str) -> Result<String, ModelError> {
        let timeout = self.timeout();
        match tokio::time::timeout(timeout, self.model.generate(prompt)).await {
            Ok(result) => result,
            Err(_) => Err(ModelError::Timeout(timeout)),
        }
    }
}

fn whole_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docs::types::{Document, SourceType};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::atomic::AtomicUsize;

    enum Behaviour {
        Answer(&'static str),
        Fail,
        Hang,
    }

    struct FakeModel {
        behaviour: Behaviour,
        calls: AtomicUsize,
    }

    impl FakeModel {
        fn new(behaviour: Behaviour) -> Arc<Self> {
            Arc::new(Self {
                behaviour,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl GenerativeModel for FakeModel {
        async fn generate(&self, _prompt: &str) -> Result<String, ModelError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.behaviour {
                Behaviour::Answer(text) => Ok(text.to_string()),
                Behaviour::Fail => Err(ModelError::Request("connection refused".to_string())),
                Behaviour::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok("too late".to_string())
                }
            }
        }
    }

    fn placement_candidate() -> Candidate {
        let document = Arc::new(Document {
            source_url: "https://rvu.test".to_string(),
            source_type: SourceType::GeneralInfo,
            content: "The placement cell runs recruitment drives.".to_string(),
            fetched_at: Utc::now(),
            is_fallback: false,
        });
        Candidate {
            label: document.source_type.label(),
            excerpt: document.content.clone(),
            score: 5.0,
            is_fallback: false,
            document,
        }
    }

    #[tokio::test]
    async fn empty_candidates_never_call_the_model() {
        let model = FakeModel::new(Behaviour::Answer("unused"));
        let synth = Synthesizer::new(model.clone(), Duration::from_secs(5));

        let outcome = synth.synthesize("anything", &[]).await.unwrap();

        assert!(matches!(outcome, Outcome::NoCandidates));
        assert_eq!(outcome.answer(), prompts::NO_INFORMATION);
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn model_answer_is_returned() {
        let model = FakeModel::new(Behaviour::Answer("According to RV University's website..."));
        let synth = Synthesizer::new(model.clone(), Duration::from_secs(5));

        let outcome = synth
            .synthesize("placement stats", &[placement_candidate()])
            .await
            .unwrap();

        assert_eq!(outcome.kind(), "generated");
        assert_eq!(outcome.answer(), "According to RV University's website...");
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn model_failure_with_candidates_uses_canned_placement_answer() {
        let model = FakeModel::new(Behaviour::Fail);
        let synth = Synthesizer::new(model, Duration::from_secs(5));

        let outcome = synth
            .synthesize("How are placements here?", &[placement_candidate()])
            .await
            .unwrap();

        assert!(matches!(outcome, Outcome::RuleBased { .. }));
        assert!(outcome.answer().contains("dedicated placement cell"));
    }

    #[tokio::test]
    async fn model_failure_without_candidates_is_an_error() {
        let model = FakeModel::new(Behaviour::Fail);
        let synth = Synthesizer::new(model, Duration::from_secs(5));

        let err = synth.generate("placements", &[]).await.unwrap_err();
        assert!(matches!(
            err,
            SynthesisError::ModelUnavailable {
                source: ModelError::Request(_)
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn hung_model_times_out_into_fallback() {
        let model = FakeModel::new(Behaviour::Hang);
        let synth = Synthesizer::new(model, Duration::from_secs(30));

        let outcome = synth
            .synthesize("weather today", &[placement_candidate()])
            .await
            .unwrap();

        match outcome {
            Outcome::RuleBased { answer, cause } => {
                assert_eq!(answer, prompts::GENERIC_REDIRECT);
                assert!(matches!(cause, ModelError::Timeout(d) if d == Duration::from_secs(30)));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn sub_second_timeout_is_kept_in_millis() {
        let model = FakeModel::new(Behaviour::Answer("Placement drives run every semester."));
        let synth = Synthesizer::new(model.clone(), Duration::from_millis(500));
        assert_eq!(synth.timeout(), Duration::from_millis(500));

        let outcome = synth
            .synthesize("placement stats", &[placement_candidate()])
            .await
            .unwrap();
        assert_eq!(outcome.kind(), "generated");

        synth.set_timeout(Duration::from_micros(10));
        assert_eq!(synth.timeout(), Duration::from_millis(1));
    }
}
