//! Sentence-to-chunk assembly.
//!
//! Chunks are contiguous spans of sentences bounded by a word budget. A
//! single sentence longer than the budget becomes its own oversized chunk
//! rather than being dropped.

use crate::core::config::ChunkSettings;

/// Greedy accumulation: sentences join the current chunk while the running
/// word count stays within the budget; the first sentence that would
/// overflow it starts a new chunk.
pub fn chunk_sentences(sentences: &[String], settings: &ChunkSettings) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_words = 0usize;

    for sentence in sentences {
        let sentence = sentence.trim();
        if sentence.is_empty() {
            continue;
        }
        let sentence_words = sentence.split_whitespace().count();

        if current_words + sentence_words > settings.chunk_size {
            if !current.is_empty() {
                chunks.push(current.join(" "));
            }
            current = vec![sentence];
            current_words = sentence_words;
        } else {
            current.push(sentence);
            current_words += sentence_words;
        }
    }

    if !current.is_empty() {
        chunks.push(current.join(" "));
    }

    chunks
}

/// Drops chunks under the word threshold and merges consecutive short
/// chunks until the merged text reaches the minimum character length. The
/// trailing merge may stay shorter.
pub fn preprocess_chunks(chunks: &[String], settings: &ChunkSettings) -> Vec<String> {
    let mut processed = Vec::new();
    let mut current = String::new();

    for chunk in chunks {
        if chunk.split_whitespace().count() < settings.min_chunk_threshold {
            tracing::debug!("Discarding short chunk ({} chars)", chunk.len());
            continue;
        }

        if current.len() + chunk.len() < settings.min_chunk_length {
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(chunk);
        } else {
            if !current.is_empty() {
                processed.push(std::mem::take(&mut current));
            }
            current = chunk.clone();
        }
    }

    if !current.is_empty() {
        processed.push(current);
    }

    processed
}
