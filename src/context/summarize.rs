//! Extractive per-chunk summarization.
//!
//! Long chunks are compressed by keyword frequency: term frequencies are
//! computed over non-stop-words and normalized by the most frequent term,
//! each sentence is scored as the sum of its word frequencies, and the top
//! three sentences are emitted in their original order. Anything that goes
//! wrong degrades to plain truncation, never an error.

use std::collections::HashMap;

use crate::core::config::ChunkSettings;

use super::{split_sentences, truncate_words};

const TOP_SENTENCES: usize = 3;

const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "from", "has", "have", "he",
    "her", "his", "i", "if", "in", "is", "it", "its", "not", "of", "on", "or", "our", "she",
    "so", "that", "the", "their", "them", "there", "they", "this", "to", "was", "we", "were",
    "what", "when", "which", "who", "will", "with", "you", "your",
];

/// Summarizes every chunk in the list. Chunks under the word floor pass
/// through unchanged.
pub fn summarize_chunks(chunks: &[String], settings: &ChunkSettings) -> Vec<String> {
    chunks
        .iter()
        .filter(|chunk| !chunk.trim().is_empty())
        .map(|chunk| {
            if chunk.split_whitespace().count() < settings.summarize_word_floor {
                chunk.clone()
            } else {
                summarize_chunk(chunk, settings)
            }
        })
        .collect()
}

fn summarize_chunk(chunk: &str, settings: &ChunkSettings) -> String {
    match extractive_summary(chunk) {
        Some(summary) if !summary.is_empty() => summary,
        _ => {
            tracing::debug!("Extractive summary unavailable, truncating chunk");
            truncate_words(chunk, settings.summary_budget)
        }
    }
}

fn extractive_summary(chunk: &str) -> Option<String> {
    let sentences = split_sentences(chunk);
    if sentences.is_empty() {
        return None;
    }

    let frequencies = term_frequencies(chunk)?;

    if sentences.len() <= TOP_SENTENCES {
        return Some(sentences.join(" "));
    }

    let mut scored: Vec<(usize, f64)> = sentences
        .iter()
        .enumerate()
        .map(|(idx, sentence)| (idx, sentence_score(sentence, &frequencies)))
        .collect();

    scored.sort_by(|left, right| {
        right
            .1
            .partial_cmp(&left.1)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut selected: Vec<usize> = scored.iter().take(TOP_SENTENCES).map(|(idx, _)| *idx).collect();
    selected.sort_unstable();

    Some(
        selected
            .into_iter()
            .map(|idx| sentences[idx].as_str())
            .collect::<Vec<_>>()
            .join(" "),
    )
}

/// Term frequencies over lowercased non-stop-words, normalized so the most
/// frequent term scores 1.0.
fn term_frequencies(text: &str) -> Option<HashMap<String, f64>> {
    let mut counts: HashMap<String, f64> = HashMap::new();
    for word in text.split_whitespace() {
        let token = normalize_token(word);
        if token.is_empty() || STOP_WORDS.contains(&token.as_str()) {
            continue;
        }
        *counts.entry(token).or_insert(0.0) += 1.0;
    }

    let max = counts.values().cloned().fold(0.0_f64, f64::max);
    if max <= 0.0 {
        return None;
    }

    for value in counts.values_mut() {
        *value /= max;
    }
    Some(counts)
}

fn sentence_score(sentence: &str, frequencies: &HashMap<String, f64>) -> f64 {
    sentence
        .split_whitespace()
        .map(normalize_token)
        .filter_map(|token| frequencies.get(&token))
        .sum()
}

fn normalize_token(word: &str) -> String {
    word.trim_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_chunks_pass_through_unchanged() {
        let chunks = vec!["A short chunk about nothing much.".to_string()];
        let summaries = summarize_chunks(&chunks, &ChunkSettings::default());
        assert_eq!(summaries, chunks);
    }

    #[test]
    fn long_chunks_keep_the_highest_frequency_sentences_in_order() {
        // "rust" dominates the frequency table, so the sentences carrying
        // it should survive, in their original order.
        let filler = "Unrelated filler content mentions gardens and weather patterns today.";
        let chunk = format!(
            "Rust compilers check rust ownership in rust code. {filler} \
             Rust programs avoid rust data races with rust checks. {filler} \
             More filler about something else entirely follows here once again. \
             Closing filler mentions gardens and weather one more time."
        );

        let summaries = summarize_chunks(&[chunk], &ChunkSettings::default());
        assert_eq!(summaries.len(), 1);
        let summary = &summaries[0];

        let first = summary.find("ownership").expect("first rust sentence kept");
        let second = summary.find("data races").expect("second rust sentence kept");
        assert!(first < second);
    }

    #[test]
    fn empty_chunks_are_skipped() {
        let chunks = vec!["".to_string(), "   ".to_string()];
        let summaries = summarize_chunks(&chunks, &ChunkSettings::default());
        assert!(summaries.is_empty());
    }

    #[test]
    fn degenerate_text_degrades_to_truncation() {
        // All stop words: no frequency table, so the summary falls back to
        // truncation of the original text.
        let words = vec!["the"; 60].join(" ");
        let settings = ChunkSettings {
            summary_budget: 10,
            ..ChunkSettings::default()
        };
        let summaries = summarize_chunks(&[words], &settings);
        assert_eq!(summaries.len(), 1);
        assert!(summaries[0].split_whitespace().count() <= 10);
    }
}
