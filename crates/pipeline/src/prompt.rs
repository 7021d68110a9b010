//! Prompt assembly and answer classification.
//!
//! Builds the numbered context block and the final generation prompt, and
//! classifies generated answers as declines when the model states it
//! cannot answer from the provided context.

use crate::types::Candidate;

/// System prompt sent with every generation request.
pub const SYSTEM_PROMPT: &str = "You are a helpful assistant that answers questions based \
on provided context. Always cite your sources using the bracketed numbers from the context. \
If the context does not contain the information needed, say that you don't have enough \
information to answer the question.";

/// Phrases that mark a generated answer as a decline. Matched
/// case-insensitively as substrings.
const DECLINE_PHRASES: &[&str] = &[
    "i don't have enough information",
    "i do not have enough information",
    "i cannot answer",
    "not enough information",
    "unable to answer",
    "cannot determine",
    "don't know",
    "insufficient information",
];

/// Format selected candidates as a numbered context block:
///
/// ```text
/// [1] Title - (source): chunk text
///
/// [2] Untitled: chunk text
/// ```
///
/// Numbering is 1-based and matches the citation markers the model is
/// instructed to emit.
pub fn build_context(candidates: &[Candidate]) -> String {
    candidates
        .iter()
        .enumerate()
        .map(|(i, candidate)| {
            let title = candidate.payload.title.as_deref().unwrap_or("Untitled");
            match candidate.payload.source.as_deref() {
                Some(source) => {
                    format!("[{}] {} - ({}): {}", i + 1, title, source, candidate.payload.text)
                }
                None => format!("[{}] {}: {}", i + 1, title, candidate.payload.text),
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Build the user prompt for generation.
///
/// `context` may be empty (nothing retrieved) and `low_confidence` marks a
/// retrieval whose best score fell below the configured threshold; both
/// cases steer the model toward an explicit decline instead of a guess.
pub fn build_prompt(query: &str, context: &str, low_confidence: bool) -> String {
    if context.is_empty() {
        return format!(
            "No relevant context was found for this question.\n\n\
             Question: {query}\n\n\
             State that you don't have enough information to answer this question."
        );
    }

    let caution = if low_confidence {
        "\nThe retrieved context may not be relevant to the question. If it does not \
         contain the answer, say that you don't have enough information.\n"
    } else {
        ""
    };

    format!(
        "Answer the question using only the context below. Cite the sources you use \
         with their bracketed numbers, e.g. [1] or [2].\n{caution}\n\
         Context:\n{context}\n\n\
         Question: {query}\n\n\
         Answer:"
    )
}

/// True when the answer is a decline rather than a substantive response.
pub fn is_no_answer(answer: &str) -> bool {
    let lowered = answer.to_lowercase();
    answer.trim().is_empty() || DECLINE_PHRASES.iter().any(|p| lowered.contains(p))
}

#[cfg(test)]
mod tests {
    use super::*;
    use minirag_clients::ChunkPayload;

    fn candidate(title: Option<&str>, source: Option<&str>, text: &str) -> Candidate {
        Candidate {
            id: "c".to_string(),
            payload: ChunkPayload {
                text: text.to_string(),
                document_id: "d".to_string(),
                chunk_index: 0,
                title: title.map(str::to_string),
                source: source.map(str::to_string),
                token_count: 1,
            },
            score: 0.5,
            embedding: vec![],
        }
    }

    #[test]
    fn test_context_numbering_and_metadata() {
        let pool = vec![
            candidate(Some("Intro"), Some("handbook.md"), "First chunk."),
            candidate(None, None, "Second chunk."),
        ];

        let context = build_context(&pool);
        assert!(context.contains("[1] Intro - (handbook.md): First chunk."));
        assert!(context.contains("[2] Untitled: Second chunk."));
        assert!(context.contains("\n\n"));
    }

    #[test]
    fn test_prompt_contains_query_and_context() {
        let prompt = build_prompt("What is X?", "[1] Doc: X is a thing.", false);
        assert!(prompt.contains("What is X?"));
        assert!(prompt.contains("[1] Doc: X is a thing."));
        assert!(!prompt.contains("may not be relevant"));
    }

    #[test]
    fn test_low_confidence_adds_caution() {
        let prompt = build_prompt("What is X?", "[1] Doc: unrelated.", true);
        assert!(prompt.contains("may not be relevant"));
    }

    #[test]
    fn test_empty_context_directs_decline() {
        let prompt = build_prompt("What is X?", "", false);
        assert!(prompt.contains("No relevant context"));
        assert!(prompt.contains("What is X?"));
    }

    #[test]
    fn test_decline_detection() {
        assert!(is_no_answer("I don't have enough information to answer this question."));
        assert!(is_no_answer("Unfortunately I cannot answer that."));
        assert!(is_no_answer("  "));
        assert!(!is_no_answer("X is a distributed key-value store [1]."));
    }
}
