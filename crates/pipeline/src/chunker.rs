//! Text chunking with a token-count range and fractional overlap.
//!
//! Tokens are whitespace-delimited words; the same unit is used for the
//! chunk size budget, overlap, and cost approximation. Splitting is
//! separator-priority: paragraph breaks first, then sentence breaks, then
//! single words for any sentence that still exceeds the budget. Adjacent
//! chunks are stitched with an overlap so context spanning a boundary is
//! never lost to retrieval.

use crate::types::Document;
use minirag_core::config::ChunkingConfig;
use minirag_core::{RagError, RagResult};

/// A chunk before embedding: ordered text span with its token count.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkDraft {
    /// 0-based position within the document
    pub position: u32,

    /// Chunk text (tokens joined by single spaces)
    pub text: String,

    /// Number of tokens, overlap included
    pub token_count: u32,
}

/// Splits raw text into overlapping token-bounded chunks.
///
/// Deterministic: identical input and configuration always produce
/// identical output.
#[derive(Debug, Clone)]
pub struct ChunkingEngine {
    min_tokens: usize,
    max_tokens: usize,
    overlap_fraction: f64,
}

impl ChunkingEngine {
    pub fn new(min_tokens: usize, max_tokens: usize, overlap_fraction: f64) -> Self {
        Self {
            min_tokens,
            max_tokens,
            overlap_fraction,
        }
    }

    pub fn from_config(config: &ChunkingConfig) -> Self {
        Self::new(
            config.min_tokens,
            config.max_tokens,
            config.overlap_fraction,
        )
    }

    /// Overlap carried into the next chunk: ⌈f × token_count⌉.
    pub fn overlap_len(&self, token_count: usize) -> usize {
        if self.overlap_fraction <= 0.0 {
            0
        } else {
            (self.overlap_fraction * token_count as f64).ceil() as usize
        }
    }

    /// Tokens available to fresh content per chunk. The overlap prefix is
    /// budgeted out of `max_tokens` so the hard bound holds after
    /// stitching.
    fn base_budget(&self) -> usize {
        self.max_tokens
            .saturating_sub(self.overlap_len(self.max_tokens))
            .max(1)
    }

    /// Overlap actually carried into the next chunk. Capped at
    /// `max_tokens - base_budget()` so a stitched chunk never exceeds
    /// `max_tokens`, even at overlap fractions where ⌈f × max⌉ reaches
    /// `max` and the fresh-token budget is clamped to 1.
    fn capped_overlap(&self, token_count: usize) -> usize {
        self.overlap_len(token_count)
            .min(self.max_tokens.saturating_sub(self.base_budget()))
    }

    /// Split text into an ordered, non-empty chunk sequence.
    ///
    /// Inputs shorter than `min_tokens` still yield a single chunk. Fails
    /// only on empty or whitespace-only input.
    pub fn split(&self, text: &str) -> RagResult<Vec<ChunkDraft>> {
        if text.trim().is_empty() {
            return Err(RagError::Chunking(
                "Input text is empty or whitespace-only".to_string(),
            ));
        }

        let budget = self.base_budget();
        let segments = segment_tokens(text, budget);
        let windows = pack_windows(segments, budget);

        let mut drafts = Vec::with_capacity(windows.len());
        let mut prev_tokens: Vec<String> = Vec::new();

        for (position, window) in windows.into_iter().enumerate() {
            let mut tokens: Vec<String> = Vec::new();
            if position > 0 {
                let overlap = self.capped_overlap(prev_tokens.len());
                let start = prev_tokens.len().saturating_sub(overlap);
                tokens.extend_from_slice(&prev_tokens[start..]);
            }
            tokens.extend(window);

            drafts.push(ChunkDraft {
                position: position as u32,
                text: tokens.join(" "),
                token_count: tokens.len() as u32,
            });
            prev_tokens = tokens;
        }

        tracing::debug!(
            "Chunked {} tokens into {} chunks (range [{}, {}], overlap {})",
            count_tokens(text),
            drafts.len(),
            self.min_tokens,
            self.max_tokens,
            self.overlap_fraction
        );

        Ok(drafts)
    }

    /// Split a document's raw text.
    pub fn split_document(&self, document: &Document) -> RagResult<Vec<ChunkDraft>> {
        self.split(&document.raw_text)
    }
}

/// Whitespace token count; the tokenizer used throughout the pipeline.
pub fn count_tokens(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Token-count summary over a chunk sequence, for ingest logging.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkingStats {
    pub chunks: usize,
    pub total_tokens: usize,
    pub min_tokens: usize,
    pub max_tokens: usize,
    pub avg_tokens: f64,
}

pub fn chunking_stats(chunks: &[ChunkDraft]) -> ChunkingStats {
    let counts: Vec<usize> = chunks.iter().map(|c| c.token_count as usize).collect();
    let total: usize = counts.iter().sum();
    ChunkingStats {
        chunks: chunks.len(),
        total_tokens: total,
        min_tokens: counts.iter().copied().min().unwrap_or(0),
        max_tokens: counts.iter().copied().max().unwrap_or(0),
        avg_tokens: if counts.is_empty() {
            0.0
        } else {
            total as f64 / counts.len() as f64
        },
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_string).collect()
}

/// Break text into token segments no longer than `budget`, preferring the
/// coarsest separator that fits: paragraphs, then sentences, then words.
fn segment_tokens(text: &str, budget: usize) -> Vec<Vec<String>> {
    let mut segments = Vec::new();

    for paragraph in text.split("\n\n") {
        let tokens = tokenize(paragraph);
        if tokens.is_empty() {
            continue;
        }
        if tokens.len() <= budget {
            segments.push(tokens);
            continue;
        }

        for sentence in split_sentences(paragraph) {
            let tokens = tokenize(&sentence);
            if tokens.is_empty() {
                continue;
            }
            if tokens.len() <= budget {
                segments.push(tokens);
            } else {
                for window in tokens.chunks(budget) {
                    segments.push(window.to_vec());
                }
            }
        }
    }

    segments
}

/// Split on sentence-final punctuation followed by whitespace (or end of
/// text). Keeps every character, so token order survives re-tokenization.
fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);
        if matches!(c, '.' | '!' | '?') && chars.peek().map_or(true, |n| n.is_whitespace()) {
            sentences.push(std::mem::take(&mut current));
        }
    }

    if !current.trim().is_empty() {
        sentences.push(current);
    }
    sentences
}

/// Greedily pack consecutive segments into windows of at most `budget`
/// tokens, flushing whenever the next segment no longer fits.
fn pack_windows(segments: Vec<Vec<String>>, budget: usize) -> Vec<Vec<String>> {
    let mut windows = Vec::new();
    let mut current: Vec<String> = Vec::new();

    for segment in segments {
        if !current.is_empty() && current.len() + segment.len() > budget {
            windows.push(std::mem::take(&mut current));
        }
        current.extend(segment);
    }

    if !current.is_empty() {
        windows.push(current);
    }
    windows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_text(sentences: usize) -> String {
        (0..sentences)
            .map(|i| format!("Sentence number {} talks about topic {}.", i, i % 7))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn test_empty_input_fails() {
        let engine = ChunkingEngine::new(40, 50, 0.1);
        assert!(matches!(engine.split(""), Err(RagError::Chunking(_))));
        assert!(matches!(engine.split("  \n\t "), Err(RagError::Chunking(_))));
    }

    #[test]
    fn test_short_input_yields_single_chunk() {
        let engine = ChunkingEngine::new(40, 50, 0.1);
        let text = "Machine learning is a subset of AI that enables systems to learn from data.";

        let chunks = engine.split(text).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].position, 0);
        assert_eq!(chunks[0].token_count as usize, count_tokens(text));
    }

    #[test]
    fn test_no_chunk_exceeds_max() {
        let engine = ChunkingEngine::new(40, 50, 0.1);
        let chunks = engine.split(&sample_text(200)).unwrap();

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(
                chunk.token_count <= 50,
                "chunk {} has {} tokens",
                chunk.position,
                chunk.token_count
            );
        }
    }

    #[test]
    fn test_positions_are_contiguous() {
        let engine = ChunkingEngine::new(40, 50, 0.1);
        let chunks = engine.split(&sample_text(100)).unwrap();

        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.position, i as u32);
        }
    }

    #[test]
    fn test_overlap_matches_configured_fraction() {
        let engine = ChunkingEngine::new(40, 50, 0.1);
        let chunks = engine.split(&sample_text(200)).unwrap();

        for pair in chunks.windows(2) {
            let prev_tokens = tokenize(&pair[0].text);
            let next_tokens = tokenize(&pair[1].text);
            let overlap = engine.capped_overlap(prev_tokens.len());

            assert_eq!(
                &prev_tokens[prev_tokens.len() - overlap..],
                &next_tokens[..overlap],
                "overlap prefix must repeat the previous chunk's suffix"
            );
        }
    }

    #[test]
    fn test_removing_overlap_reconstructs_token_sequence() {
        let engine = ChunkingEngine::new(40, 50, 0.1);
        let text = sample_text(150);
        let chunks = engine.split(&text).unwrap();

        let mut rebuilt: Vec<String> = Vec::new();
        let mut prev_len = 0usize;
        for chunk in &chunks {
            let tokens = tokenize(&chunk.text);
            let skip = if prev_len == 0 {
                0
            } else {
                engine.capped_overlap(prev_len)
            };
            rebuilt.extend_from_slice(&tokens[skip..]);
            prev_len = tokens.len();
        }

        assert_eq!(rebuilt, tokenize(&text));
    }

    #[test]
    fn test_zero_overlap_concatenates_exactly() {
        let engine = ChunkingEngine::new(40, 50, 0.0);
        let text = sample_text(120);
        let chunks = engine.split(&text).unwrap();

        let rebuilt: Vec<String> = chunks.iter().flat_map(|c| tokenize(&c.text)).collect();
        assert_eq!(rebuilt, tokenize(&text));
    }

    #[test]
    fn test_paragraph_boundaries_preferred() {
        let engine = ChunkingEngine::new(4, 10, 0.0);
        let text = "First paragraph has five tokens here.\n\nSecond paragraph also has some tokens.";

        let chunks = engine.split(text).unwrap();
        // Each paragraph fits the budget, so neither is split mid-sentence
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].text.starts_with("First"));
        assert!(chunks[1].text.starts_with("Second"));
    }

    #[test]
    fn test_oversized_sentence_falls_back_to_words() {
        let engine = ChunkingEngine::new(4, 8, 0.0);
        // One sentence far above the budget with no internal punctuation
        let text = (0..40).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ");

        let chunks = engine.split(&text).unwrap();
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.token_count <= 8);
        }
    }

    #[test]
    fn test_extreme_overlap_respects_max_bound() {
        // f=0.95 with max=10 drives ⌈f × max⌉ to max itself; the carried
        // overlap must shrink so stitched chunks stay within the bound
        let engine = ChunkingEngine::new(4, 10, 0.95);
        let text = (0..60).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ");

        let chunks = engine.split(&text).unwrap();
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(
                chunk.token_count <= 10,
                "chunk {} has {} tokens",
                chunk.position,
                chunk.token_count
            );
        }

        // The full token sequence still survives after removing the overlap
        let mut rebuilt: Vec<String> = Vec::new();
        let mut prev_len = 0usize;
        for chunk in &chunks {
            let tokens = tokenize(&chunk.text);
            let skip = if prev_len == 0 {
                0
            } else {
                engine.capped_overlap(prev_len)
            };
            rebuilt.extend_from_slice(&tokens[skip..]);
            prev_len = tokens.len();
        }
        assert_eq!(rebuilt, tokenize(&text));
    }

    #[test]
    fn test_deterministic() {
        let engine = ChunkingEngine::new(40, 50, 0.15);
        let text = sample_text(90);
        assert_eq!(engine.split(&text).unwrap(), engine.split(&text).unwrap());
    }

    #[test]
    fn test_chunking_stats() {
        let engine = ChunkingEngine::new(40, 50, 0.1);
        let chunks = engine.split(&sample_text(100)).unwrap();
        let stats = chunking_stats(&chunks);

        assert_eq!(stats.chunks, chunks.len());
        assert!(stats.min_tokens <= stats.max_tokens);
        assert!(stats.max_tokens <= 50);
        assert!(stats.avg_tokens >= stats.min_tokens as f64);
        assert!(stats.avg_tokens <= stats.max_tokens as f64);
        assert_eq!(
            stats.total_tokens,
            chunks.iter().map(|c| c.token_count as usize).sum::<usize>()
        );

        assert_eq!(chunking_stats(&[]).chunks, 0);
    }

    #[test]
    fn test_split_sentences_keeps_all_tokens() {
        let text = "One two. Three four! Five? Six seven";
        let sentences = split_sentences(text);
        assert_eq!(sentences.len(), 4);

        let rebuilt: Vec<String> = sentences.iter().flat_map(|s| tokenize(s)).collect();
        assert_eq!(rebuilt, tokenize(text));
    }
}
