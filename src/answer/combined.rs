//! Runs Enhanced and Fallback concurrently and synthesizes a third answer
//! from both candidates.

use std::sync::Arc;

use crate::core::config::PipelineSettings;
use crate::core::errors::PipelineError;
use crate::models::{GenerateParams, ModelProfile, ModelRegistry};

use super::{
    enhanced_with_fallback, fallback, generate_text, AnswerDraft, GenerationInput,
};

pub async fn generate(
    registry: &Arc<ModelRegistry>,
    profile: ModelProfile,
    input: GenerationInput<'_>,
    settings: &PipelineSettings,
) -> Result<AnswerDraft, PipelineError> {
    tracing::info!("Generating combined answer");

    let (enhanced_result, fallback_result) = tokio::join!(
        enhanced_with_fallback(registry, profile, input, settings),
        fallback::generate(registry, profile, input.query),
    );

    // A degraded or even dead sub-branch is tolerated; synthesis proceeds
    // with whatever each branch produced.
    let (main, alt) = match (enhanced_result, fallback_result) {
        (Ok(main), Ok(alt)) => (Some(main), Some(alt)),
        (Ok(main), Err(err)) => {
            tracing::warn!("Combined fallback branch failed: {}", err);
            (Some(main), None)
        }
        (Err(err), Ok(alt)) => {
            tracing::warn!("Combined enhanced branch failed: {}", err);
            (None, Some(alt))
        }
        (Err(primary), Err(fallback)) => {
            return Err(PipelineError::GenerationFailed {
                primary: primary.to_string(),
                fallback: fallback.to_string(),
            })
        }
    };

    let main_answer = main
        .as_ref()
        .map(|draft| draft.abstractive_answer.as_str())
        .unwrap_or_default();
    let alt_answer = alt
        .as_ref()
        .map(|draft| draft.abstractive_answer.as_str())
        .unwrap_or_default();

    let prompt = format!(
        "Question: {}\nMain Answer: {}\nFallback Answer: {}\n\n\
         Provide a comprehensive and coherent answer that combines the information from both \
         answers above:",
        input.query, main_answer, alt_answer
    );
    let abstractive_answer =
        generate_text(registry, profile, &prompt, &GenerateParams::abstractive())
            .await
            .map_err(|err| {
                PipelineError::StrategyFailed(format!("combined synthesis failed: {}", err))
            })?;

    let drafts: Vec<&AnswerDraft> = main.iter().chain(alt.iter()).collect();
    let sentiment_score = mean(drafts.iter().map(|d| d.sentiment_score));
    let confidence_score = mean(drafts.iter().map(|d| d.confidence_score));

    let mut follow_up_questions = Vec::new();
    for draft in &drafts {
        for question in &draft.follow_up_questions {
            if !follow_up_questions.contains(question) {
                follow_up_questions.push(question.clone());
            }
        }
    }
    follow_up_questions.truncate(3);

    Ok(AnswerDraft {
        extractive_answer: first_non_empty(&drafts, |d| d.extractive_answer.as_str()),
        abstractive_answer,
        summary: first_non_empty(&drafts, |d| d.summary.as_str()),
        context_summary: first_non_empty(&drafts, |d| d.context_summary.as_str()),
        sentiment_score,
        confidence_score,
        follow_up_questions,
    })
}

fn first_non_empty<'a>(
    drafts: &[&'a AnswerDraft],
    pick: impl Fn(&'a AnswerDraft) -> &'a str,
) -> String {
    drafts
        .iter()
        .copied()
        .map(pick)
        .find(|value| !value.is_empty())
        .unwrap_or_default()
        .to_string()
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let collected: Vec<f64> = values.collect();
    if collected.is_empty() {
        return 0.0;
    }
    collected.iter().sum::<f64>() / collected.len() as f64
}
