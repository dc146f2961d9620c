//! Follow-up question generation.
//!
//! Always returns exactly three questions: parsed from the model's
//! numbered list when possible, padded with generic questions built around
//! the query's first keyword otherwise.

use std::sync::Arc;
use std::sync::OnceLock;

use regex::Regex;

use crate::core::errors::ApiError;
use crate::models::{GenerateParams, ModelProfile, ModelRegistry};

use super::generate_text;

const QUESTION_COUNT: usize = 3;

pub async fn generate(
    registry: &Arc<ModelRegistry>,
    profile: ModelProfile,
    query: &str,
    answer: &str,
) -> Vec<String> {
    let parsed = match run(registry, profile, query, answer).await {
        Ok(questions) => questions,
        Err(err) => {
            tracing::warn!("Follow-up generation failed, padding with generics: {}", err);
            Vec::new()
        }
    };
    ensure_three(query, parsed)
}

async fn run(
    registry: &Arc<ModelRegistry>,
    profile: ModelProfile,
    query: &str,
    answer: &str,
) -> Result<Vec<String>, ApiError> {
    let prompt = format!(
        "Human: You are an expert in generating follow-up questions based on a question and its \
         answer. The original question is: \"{}\" and the answer provided is: \"{}\".\n\n\
         Please generate exactly 3 unique, thought-provoking follow-up questions that:\n\
         1. Address different dimensions of the topic that were not directly covered in the \
         original question or the provided answer.\n\
         2. Explore specific details, nuances, or implications from the answer provided.\n\
         3. Ask the user to think critically about broader implications or real-world \
         applications related to the answer.\n\n\
         Make sure each question:\n\
         - Is relevant to the given topic.\n\
         - Is open-ended and fosters deeper discussion.\n\
         - Is concise and well-structured.\n\n\
         AI: Here are 3 follow-up questions:\n\n\
         Human: Now, give me only the questions without any extra information.\n\nAI:",
        query, answer
    );

    let response = generate_text(registry, profile, &prompt, &GenerateParams::follow_up()).await?;
    Ok(parse_numbered(&response))
}

static NUMBERED_ITEM_RE: OnceLock<Regex> = OnceLock::new();

fn parse_numbered(response: &str) -> Vec<String> {
    let re = NUMBERED_ITEM_RE
        .get_or_init(|| Regex::new(r"(?m)^\s*\d+[.)]\s*(.+)$").expect("valid regex"));
    re.captures_iter(response)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|q| !q.is_empty())
        .take(QUESTION_COUNT)
        .collect()
}

/// Pads or trims the parsed list to exactly three entries.
fn ensure_three(query: &str, mut questions: Vec<String>) -> Vec<String> {
    questions.truncate(QUESTION_COUNT);

    let keyword = first_keyword(query);
    let generics = [
        format!("What are the broader implications of {}?", keyword),
        format!("How does {} apply to real-world situations?", keyword),
        format!("What should someone explore next about {}?", keyword),
    ];

    for generic in generics {
        if questions.len() >= QUESTION_COUNT {
            break;
        }
        if !questions.contains(&generic) {
            questions.push(generic);
        }
    }

    questions
}

/// First meaningful word of the query, used to anchor generic questions.
fn first_keyword(query: &str) -> String {
    const SKIP: &[&str] = &[
        "a", "an", "are", "can", "do", "does", "how", "is", "the", "what", "when", "where",
        "which", "who", "why",
    ];

    let words: Vec<String> = query
        .split_whitespace()
        .map(|word| {
            word.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|word| !word.is_empty())
        .collect();

    words
        .iter()
        .find(|word| word.len() > 3 && !SKIP.contains(&word.as_str()))
        .or_else(|| words.first())
        .cloned()
        .unwrap_or_else(|| "this topic".to_string())
}
