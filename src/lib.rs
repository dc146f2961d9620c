pub mod answer;
pub mod cache;
pub mod context;
pub mod core;
pub mod models;
pub mod pipeline;
pub mod retrieval;
pub mod safety;
pub mod server;
pub mod state;
pub mod vector_math;

pub use pipeline::{AnswerPipeline, PipelineResult};
pub use state::AppState;
