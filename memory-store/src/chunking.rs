//! Document chunking strategies for RAG ingestion.
//!
//! Splits long text into bounded-size overlapping pieces before storage.
//! Sizes are counted in characters. Deployments that count sub-word tokens
//! will produce different chunk boundaries for the same text, so chunking
//! is not a bit-exact operation across environments.

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Chunking strategies for document splitting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkStrategy {
    /// Paragraph-first splitting, falling through to sentences when a
    /// paragraph alone exceeds the chunk budget.
    Semantic,
    /// Sentence-boundary splitting only.
    Sentence,
    /// Fixed-size character windows.
    Fixed,
}

/// Splits text into chunks using the configured strategy.
pub struct DocumentChunker {
    strategy: ChunkStrategy,
    max_chunk_size: usize,
    chunk_overlap: usize,
    paragraph_re: Regex,
}

impl DocumentChunker {
    pub fn new(strategy: ChunkStrategy, max_chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            strategy,
            max_chunk_size: max_chunk_size.max(1),
            chunk_overlap,
            paragraph_re: Regex::new(r"\n\s*\n").expect("static regex"),
        }
    }

    /// Splits `text` into ordered chunks. Empty or whitespace-only input
    /// yields no chunks.
    pub fn chunk_text(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let chunks = match self.strategy {
            ChunkStrategy::Semantic => self.semantic_chunking(text),
            ChunkStrategy::Sentence => self.sentence_chunking(text),
            ChunkStrategy::Fixed => self.fixed_chunking(text),
        };
        trace!(
            "chunk_text: {} chunks (strategy={:?}, max={}, overlap={})",
            chunks.len(),
            self.strategy,
            self.max_chunk_size,
            self.chunk_overlap
        );
        chunks
    }

    fn count(&self, text: &str) -> usize {
        text.chars().count()
    }

    /// Paragraph-first splitting: sentences inside each blank-line-delimited
    /// paragraph are greedily packed, so paragraph grouping survives where
    /// it fits inside the budget.
    fn semantic_chunking(&self, text: &str) -> Vec<String> {
        let mut sentences = Vec::new();
        for para in self.paragraph_re.split(text) {
            let para = para.trim();
            if para.is_empty() {
                continue;
            }
            sentences.extend(split_sentences(para));
        }
        self.pack_sentences(sentences)
    }

    fn sentence_chunking(&self, text: &str) -> Vec<String> {
        self.pack_sentences(split_sentences(text))
    }

    /// Greedily packs sentences until adding the next one would exceed the
    /// budget; a closed chunk seeds the next one with a trailing-sentence
    /// overlap window.
    fn pack_sentences(&self, sentences: Vec<String>) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current = String::new();
        let mut current_size = 0usize;

        for sentence in sentences {
            let sentence_size = self.count(&sentence);

            if current_size + sentence_size > self.max_chunk_size && !current.is_empty() {
                chunks.push(current.trim().to_string());
                let overlap = self.overlap_text(&current);
                current = if overlap.is_empty() {
                    sentence
                } else {
                    format!("{overlap} {sentence}")
                };
                current_size = self.count(&current);
            } else {
                if !current.is_empty() {
                    current.push(' ');
                }
                current.push_str(&sentence);
                current_size += sentence_size;
            }
        }

        if !current.trim().is_empty() {
            chunks.push(current.trim().to_string());
        }
        chunks
    }

    /// Consecutive character windows of `max_chunk_size`, advancing by
    /// `max_chunk_size - chunk_overlap`; the last window may be shorter.
    fn fixed_chunking(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        let step = self.max_chunk_size.saturating_sub(self.chunk_overlap).max(1);

        let mut chunks = Vec::new();
        let mut start = 0usize;
        while start < chars.len() {
            let end = (start + self.max_chunk_size).min(chars.len());
            chunks.push(chars[start..end].iter().collect());
            if end == chars.len() {
                break;
            }
            start += step;
        }
        chunks
    }

    /// Accumulates sentences from the end of a just-closed chunk until the
    /// overlap budget is exhausted.
    fn overlap_text(&self, text: &str) -> String {
        if self.chunk_overlap == 0 {
            return String::new();
        }

        let sentences = split_sentences(text);
        let mut overlap = String::new();
        let mut overlap_size = 0usize;

        for sentence in sentences.into_iter().rev() {
            let sentence_size = self.count(&sentence);
            if overlap_size + sentence_size > self.chunk_overlap {
                break;
            }
            overlap = if overlap.is_empty() {
                sentence
            } else {
                format!("{sentence} {overlap}")
            };
            overlap_size += sentence_size;
        }
        overlap.trim().to_string()
    }
}

/// Splits text at sentence-terminal punctuation followed by whitespace.
/// Trailing text without terminal punctuation forms the last sentence.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);
        if matches!(c, '.' | '!' | '?') {
            if chars.peek().is_none_or(|n| n.is_whitespace()) {
                let s = current.trim();
                if !s.is_empty() {
                    sentences.push(s.to_string());
                }
                current.clear();
                // Swallow the separating whitespace.
                while chars.peek().is_some_and(|n| n.is_whitespace()) {
                    chars.next();
                }
            }
        }
    }

    let s = current.trim();
    if !s.is_empty() {
        sentences.push(s.to_string());
    }
    sentences
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_yields_no_chunks() {
        let chunker = DocumentChunker::new(ChunkStrategy::Fixed, 100, 10);
        assert!(chunker.chunk_text("").is_empty());
        assert!(chunker.chunk_text("   \n\t ").is_empty());
    }

    #[test]
    fn short_text_is_one_chunk() {
        for strategy in [
            ChunkStrategy::Fixed,
            ChunkStrategy::Sentence,
            ChunkStrategy::Semantic,
        ] {
            let chunker = DocumentChunker::new(strategy, 200, 20);
            let chunks = chunker.chunk_text("A single short sentence.");
            assert_eq!(chunks.len(), 1, "strategy {strategy:?}");
            assert_eq!(chunks[0], "A single short sentence.");
        }
    }

    #[test]
    fn fixed_windows_advance_by_size_minus_overlap() {
        let chunker = DocumentChunker::new(ChunkStrategy::Fixed, 10, 4);
        let text = "abcdefghijklmnopqrstuvwxyz";
        let chunks = chunker.chunk_text(text);

        assert_eq!(chunks[0], "abcdefghij");
        assert_eq!(chunks[1], "ghijklmnop");
        // Last window may be shorter.
        assert!(chunks.last().unwrap().len() <= 10);
    }

    #[test]
    fn fixed_chunks_reconstruct_original_ignoring_overlap() {
        let chunker = DocumentChunker::new(ChunkStrategy::Fixed, 10, 4);
        let text = "abcdefghijklmnopqrstuvwxyz0123456789";
        let chunks = chunker.chunk_text(text);

        let mut rebuilt = chunks[0].clone();
        for chunk in &chunks[1..] {
            rebuilt.push_str(&chunk[4..]);
        }
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn sentence_packing_respects_budget() {
        let chunker = DocumentChunker::new(ChunkStrategy::Sentence, 40, 0);
        let text = "One short sentence here. Another short sentence. And a third one arrives.";
        let chunks = chunker.chunk_text(text);

        assert!(chunks.len() > 1);
        for c in &chunks {
            // One oversized sentence may stand alone, but packed chunks stay near budget.
            assert!(c.chars().count() <= 40 || !c.contains(". "));
        }
    }

    #[test]
    fn sentence_overlap_seeds_next_chunk() {
        let chunker = DocumentChunker::new(ChunkStrategy::Sentence, 60, 30);
        let text = "First sentence is here. Second sentence follows on. Third sentence closes it.";
        let chunks = chunker.chunk_text(text);

        assert!(chunks.len() >= 2);
        // The second chunk starts with a trailing sentence of the first.
        assert!(chunks[1].starts_with("Second sentence follows on."));
    }

    #[test]
    fn semantic_keeps_paragraph_grouping_when_it_fits() {
        let chunker = DocumentChunker::new(ChunkStrategy::Semantic, 200, 0);
        let text = "Paragraph one sentence A. Paragraph one sentence B.\n\nParagraph two here.";
        let chunks = chunker.chunk_text(text);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].contains("Paragraph two here."));
    }

    #[test]
    fn splits_on_terminal_punctuation() {
        let s = split_sentences("Alpha beta. Gamma delta! Epsilon? Trailing tail");
        assert_eq!(
            s,
            vec!["Alpha beta.", "Gamma delta!", "Epsilon?", "Trailing tail"]
        );
    }

    #[test]
    fn abbreviation_dots_inside_words_do_not_split() {
        // A dot not followed by whitespace stays inside the sentence.
        let s = split_sentences("See v1.2 of the doc. Done.");
        assert_eq!(s, vec!["See v1.2 of the doc.", "Done."]);
    }
}
