use serde::{Deserialize, Serialize};

/// Cost/quality tradeoff for model selection.
///
/// The mapping from profile to a concrete model id is configuration; the
/// pipeline only ever names the profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelProfile {
    Power,
    Performance,
}

impl ModelProfile {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelProfile::Power => "power",
            ModelProfile::Performance => "performance",
        }
    }
}

impl Default for ModelProfile {
    fn default() -> Self {
        ModelProfile::Power
    }
}

/// The capabilities the pipeline consumes from the model runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelRole {
    QaExtractive,
    Seq2Seq,
    Embedding,
    Classification,
    Sentiment,
}

impl ModelRole {
    pub fn key(&self) -> &'static str {
        match self {
            ModelRole::QaExtractive => "qa-extractive",
            ModelRole::Seq2Seq => "seq2seq-generation",
            ModelRole::Embedding => "embedding",
            ModelRole::Classification => "classification",
            ModelRole::Sentiment => "sentiment",
        }
    }
}

/// Decoding knobs passed to a generation call.
///
/// These are carried as data; how a given model family honors them is that
/// family's concern, not a pipeline invariant.
#[derive(Debug, Clone)]
pub struct GenerateParams {
    pub max_tokens: usize,
    pub min_tokens: Option<usize>,
    pub num_beams: usize,
    pub no_repeat_ngram: usize,
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
}

impl GenerateParams {
    /// Enhanced-mode abstractive answer decoding.
    pub fn abstractive() -> Self {
        Self {
            max_tokens: 300,
            min_tokens: None,
            num_beams: 5,
            no_repeat_ngram: 3,
            temperature: 0.7,
            top_k: 50,
            top_p: 0.95,
        }
    }

    /// Cheaper decoding for the query-only fallback answer.
    pub fn fallback() -> Self {
        Self {
            max_tokens: 200,
            min_tokens: None,
            num_beams: 4,
            no_repeat_ngram: 3,
            temperature: 0.6,
            top_k: 50,
            top_p: 0.95,
        }
    }

    pub fn summary() -> Self {
        Self {
            max_tokens: 100,
            min_tokens: Some(30),
            num_beams: 4,
            no_repeat_ngram: 3,
            temperature: 0.7,
            top_k: 50,
            top_p: 0.95,
        }
    }

    pub fn follow_up() -> Self {
        Self {
            max_tokens: 150,
            min_tokens: None,
            num_beams: 5,
            no_repeat_ngram: 3,
            temperature: 0.7,
            top_k: 50,
            top_p: 0.95,
        }
    }
}

/// An extractive answer located by the span-prediction capability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpanAnswer {
    pub text: String,
    pub start: usize,
    pub end: usize,
}
