mod paths;
mod service;
mod settings;

pub use paths::AppPaths;
pub use service::ConfigService;
pub use settings::{
    ChunkSettings, PipelineSettings, RetrievalSettings, SafetySettings, SearchCredentials,
};
