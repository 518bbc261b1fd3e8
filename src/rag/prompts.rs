use crate::docs::types::{Candidate, SourceType};

pub const NO_INFORMATION: &str = "I apologize, but I couldn't find relevant information about your query \
in the RV University resources. Please try rephrasing your question or contact the university \
administration for more specific information.";

/// Shown to the user when the model is down and nothing relevant was found.
pub const TECHNICAL_DIFFICULTIES: &str = "I'm experiencing technical difficulties while processing \
your request. Please try again in a few moments.";

const INSTRUCTIONS: &str = r#"You are an expert RV University assistant. Your role is to provide accurate, helpful information about RV University based ONLY on the scraped content provided.

CRITICAL INSTRUCTIONS:
1. Answer the user's question using ONLY the information from the scraped content below
2. Be concise, professional, and factual
3. If information comes from the question-paper portal, say "According to the question papers portal..."
4. If information comes from the university website, say "According to RV University's website..."
5. If the scraped content doesn't contain the answer, say: "I couldn't find specific information about this in the current RV University resources. Please visit https://rvu.edu.in for the most up-to-date information."
6. NEVER make up or assume information not present in the scraped content
7. Keep responses focused and under 300 words
8. If multiple sources have relevant information, synthesize them clearly"#;

/// Topic keyword sets and their canned answers, checked in order.
const TOPICS: &[(&[&str], &str)] = &[
    (
        &["course", "program"],
        "Based on RV University information, the university offers programs in Computer Science, \
Business Administration, Law, and Liberal Arts. For detailed course information, please visit https://rvu.edu.in",
    ),
    (
        &["question", "paper", "exam"],
        "Question papers are available through the Univault portal. You can find previous year papers \
for various semesters and subjects there.",
    ),
    (
        &["contact", "address", "email"],
        "RV University is located at 8th Mile, Mysore Road, Bengaluru - 560059. \
Contact: +91-80-6819-9100, admissions@rvu.edu.in",
    ),
    (
        &["placement", "job"],
        "RV University has a dedicated placement cell with connections to various companies. \
For current placement statistics and opportunities, please check the official website.",
    ),
];

pub const GENERIC_REDIRECT: &str = "I apologize, but I'm currently having trouble accessing the detailed \
information. Please visit https://rvu.edu.in for the most accurate and up-to-date information about RV University.";

/// Rule-based answer used when the model is unavailable. Never fails.
pub fn canned_answer(query: &str) -> &'static str {
    let query = query.to_lowercase();
    TOPICS
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| query.contains(k)))
        .map(|(_, answer)| *answer)
        .unwrap_or(GENERIC_REDIRECT)
}

fn source_kind(source_type: SourceType) -> &'static str {
    match source_type {
        SourceType::QuestionPapers => "question-paper portal",
        SourceType::GeneralInfo => "university website",
    }
}

pub fn build_prompt(query: &str, candidates: &[Candidate]) -> String {
    let mut context = String::from("LIVE SCRAPED INFORMATION FROM RV UNIVERSITY WEBSITES:\n\n");
    for (i, candidate) in candidates.iter().enumerate() {
        context.push_str(&format!(
            "=== SOURCE {}: {} ({}) ===\n",
            i + 1,
            candidate.label,
            source_kind(candidate.document.source_type)
        ));
        if candidate.is_fallback {
            context.push_str(
                "NOTE: This is backup data (website might be temporarily unavailable)\n",
            );
        }
        context.push_str(&format!("URL: {}\n", candidate.document.source_url));
        context.push_str(&format!("CONTENT:\n{}\n\n---\n\n", candidate.excerpt));
    }

    format!(
        "{}\n\nUSER'S QUESTION: \"{}\"\n\nSCRAPED CONTEXT:\n{}\nYOUR RESPONSE (based only on the scraped content above):",
        INSTRUCTIONS, query, context
    )
}
