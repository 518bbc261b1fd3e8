//! Weighted keyword scoring of cached documents against a query.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use regex::Regex;
use serde::Deserialize;

use crate::docs::ingest::truncate_chars;
use crate::docs::types::{Candidate, Document};
use crate::error::ConfigError;

pub const MAX_CANDIDATES: usize = 5;
/// Candidate excerpts are cut to this many chars before prompting.
pub const EXCERPT_CHARS: usize = 3000;

/// Query tokens must be longer than this.
const MIN_TOKEN_CHARS: usize = 2;
/// Tokens longer than this earn the whole-word bonus.
const BONUS_TOKEN_CHARS: usize = 4;
const WHOLE_WORD_BONUS: f64 = 0.5;

/// Token → weight lookup. Tokens not in the table score `default_weight`.
#[derive(Debug, Clone, Deserialize)]
pub struct KeywordWeights {
    #[serde(default = "default_weight")]
    pub default_weight: f64,
    pub weights: HashMap<String, f64>,
}

fn default_weight() -> f64 {
    1.0
}

impl Default for KeywordWeights {
    fn default() -> Self {
        let table: &[(&str, f64)] = &[
            // programs
            ("course", 3.0),
            ("program", 3.0),
            ("degree", 2.0),
            ("b.tech", 4.0),
            ("bba", 4.0),
            ("llb", 4.0),
            ("mba", 4.0),
            ("computer", 3.0),
            ("engineering", 3.0),
            ("business", 3.0),
            ("law", 3.0),
            ("science", 2.0),
            // question papers
            ("question", 4.0),
            ("paper", 4.0),
            ("exam", 3.0),
            ("previous", 3.0),
            ("year", 2.0),
            ("semester", 3.0),
            ("subject", 3.0),
            ("midterm", 3.0),
            ("final", 2.0),
            ("assessment", 2.0),
            // campus
            ("admission", 3.0),
            ("fee", 2.0),
            ("scholarship", 3.0),
            ("faculty", 3.0),
            ("professor", 2.0),
            ("campus", 2.0),
            ("hostel", 2.0),
            ("library", 2.0),
            ("placement", 4.0),
            ("recruitment", 3.0),
            // contact
            ("contact", 2.0),
            ("email", 2.0),
            ("phone", 2.0),
            ("address", 2.0),
            ("location", 2.0),
        ];
        Self {
            default_weight: default_weight(),
            weights: table.iter().map(|(k, w)| (k.to_string(), *w)).collect(),
        }
    }
}

impl KeywordWeights {
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: display.clone(),
            source,
        })?;
        let mut parsed: KeywordWeights =
            serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
                path: display.clone(),
                source,
            })?;

        if parsed.default_weight < 0.0 || parsed.weights.values().any(|w| *w < 0.0) {
            return Err(ConfigError::Invalid(format!(
                "{}: keyword weights must be non-negative",
                display
            )));
        }
        // Query tokens are lower-cased before lookup.
        parsed.weights = parsed
            .weights
            .into_iter()
            .map(|(k, w)| (k.to_lowercase(), w))
            .collect();
        Ok(parsed)
    }

    pub fn weight(&self, token: &str) -> f64 {
        self.weights
            .get(token)
            .copied()
            .unwrap_or(self.default_weight)
    }
}

struct QueryToken {
    text: String,
    whole_word: Option<Regex>,
}

fn tokenize(query: &str) -> Vec<QueryToken> {
    query
        .to_lowercase()
        .split_whitespace()
        .filter(|t| t.chars().count() > MIN_TOKEN_CHARS)
        .map(|t| QueryToken {
            text: t.to_string(),
            whole_word: (t.chars().count() > BONUS_TOKEN_CHARS)
                .then(|| Regex::new(&format!(r"(?i)\b{}\b", regex::escape(t))).ok())
                .flatten(),
        })
        .collect()
}

fn score_content(tokens: &[QueryToken], content: &str, weights: &KeywordWeights) -> f64 {
    let content = content.to_lowercase();
    tokens
        .iter()
        .map(|token| {
            let mut score = 0.0;
            if content.contains(&token.text) {
                score += weights.weight(&token.text);
            }
            if let Some(re) = &token.whole_word {
                score += WHOLE_WORD_BONUS * re.find_iter(&content).count() as f64;
            }
            score
        })
        .sum()
}

/// Score every document and return at most five candidates, best first.
/// Equal scores keep document order.
pub fn rank(query: &str, documents: &[Arc<Document>], weights: &KeywordWeights) -> Vec<Candidate> {
    let tokens = tokenize(query);
    if tokens.is_empty() {
        return vec![];
    }

    let mut candidates: Vec<Candidate> = documents
        .iter()
        .filter_map(|doc| {
            let score = score_content(&tokens, &doc.content, weights);
            (score > 0.0).then(|| Candidate {
                document: doc.clone(),
                score,
                label: doc.source_type.label(),
                excerpt: truncate_chars(&doc.content, EXCERPT_CHARS),
                is_fallback: doc.is_fallback,
            })
        })
        .collect();

    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
    candidates.truncate(MAX_CANDIDATES);
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docs::types::SourceType;
    use chrono::Utc;
    use std::io::Write;

    fn score(query: &str, content: &str, weights: &KeywordWeights) -> f64 {
        score_content(&tokenize(query), content, weights)
    }

    fn doc(url: &str, source_type: SourceType, content: &str) -> Arc<Document> {
        Arc::new(Document {
            source_url: url.to_string(),
            source_type,
            content: content.to_string(),
            fetched_at: Utc::now(),
            is_fallback: false,
        })
    }

    #[test]
    fn question_paper_document_outranks_unrelated_one() {
        let docs = vec![
            doc("https://a.test", SourceType::GeneralInfo, "Sports day and cultural fest schedule."),
            doc(
                "https://b.test",
                SourceType::QuestionPapers,
                "Browse each semester and download every question listed.",
            ),
        ];

        let ranked = rank(
            "What are the question papers for semester 3?",
            &docs,
            &KeywordWeights::default(),
        );

        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].document.source_url, "https://b.test");
        assert_eq!(ranked[0].label, "Question Papers Portal");
        // question 4 + semester 3, plus a whole-word bonus for each
        assert!(ranked[0].score >= 8.0, "score was {}", ranked[0].score);
    }

    #[test]
    fn scoring_follows_weights_and_bonus() {
        let weights = KeywordWeights::default();
        // "placement" substring: 4, whole word twice: +1.0
        assert_eq!(score("placement", "Placement cell. placement drives", &weights), 5.0);
        // unlisted token: default weight 1, too short for the bonus
        assert_eq!(score("gym", "the gym is open", &weights), 1.0);
        // substring without whole-word match gets no bonus
        assert_eq!(score("course", "coursework", &weights), 3.0);
        // tokens of two chars or fewer are ignored
        assert_eq!(score("is a", "this is a test", &weights), 0.0);
    }

    #[test]
    fn no_match_yields_no_candidates() {
        let docs = vec![doc("https://a.test", SourceType::GeneralInfo, "Library timings")];
        assert!(rank("xylophone quantum", &docs, &KeywordWeights::default()).is_empty());
        assert!(rank("anything at all", &[], &KeywordWeights::default()).is_empty());
    }

    #[test]
    fn at_most_five_sorted_with_stable_ties() {
        let docs: Vec<_> = (0..8)
            .map(|i| {
                let body = if i % 2 == 0 { "hostel hostel" } else { "hostel" };
                doc(&format!("https://{}.test", i), SourceType::GeneralInfo, body)
            })
            .collect();

        let ranked = rank("hostel", &docs, &KeywordWeights::default());

        assert_eq!(ranked.len(), MAX_CANDIDATES);
        assert!(ranked.windows(2).all(|w| w[0].score >= w[1].score));
        let urls: Vec<_> = ranked.iter().map(|c| c.document.source_url.as_str()).collect();
        assert_eq!(
            urls,
            ["https://0.test", "https://2.test", "https://4.test", "https://6.test", "https://1.test"]
        );
    }

    #[test]
    fn excerpt_is_bounded_and_fallback_flag_inherited() {
        let mut long = Document {
            source_url: "https://a.test".to_string(),
            source_type: SourceType::GeneralInfo,
            content: format!("admission {}", "x".repeat(5000)),
            fetched_at: Utc::now(),
            is_fallback: true,
        };
        long.content.push_str(" tail");
        let ranked = rank("admission", &[Arc::new(long)], &KeywordWeights::default());
        assert_eq!(ranked[0].excerpt.chars().count(), EXCERPT_CHARS);
        assert!(ranked[0].is_fallback);
    }

    #[test]
    fn regex_metacharacters_in_query_are_literal() {
        let weights = KeywordWeights::default();
        assert_eq!(score("b.tech", "btech only", &weights), 0.0);
        assert!(score("b.tech", "our b.tech program", &weights) >= 4.0);
        assert_eq!(score("(hello", "say hello", &weights), 0.0);
    }

    #[test]
    fn weights_load_from_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"default_weight": 0.5, "weights": {{"Hostel": 6}}}}"#).unwrap();

        let weights = KeywordWeights::from_json_file(file.path()).unwrap();
        assert_eq!(weights.weight("hostel"), 6.0);
        assert_eq!(weights.weight("unknown"), 0.5);

        let mut bad = tempfile::NamedTempFile::new().unwrap();
        write!(bad, r#"{{"weights": {{"hostel": -1}}}}"#).unwrap();
        assert!(KeywordWeights::from_json_file(bad.path()).is_err());
    }
}
