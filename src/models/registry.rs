use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::core::errors::ApiError;

use super::provider::{Classifier, Embedder, Generator, ModelFactory, SpanExtractor};
use super::types::{ModelProfile, ModelRole};

/// Process-wide registry of model handles.
///
/// Handles are lazily created singletons keyed by (role, profile). The map
/// mutex is held across construction, so concurrent first-access requests
/// for the same key are serialized and the handle is built exactly once.
pub struct ModelRegistry {
    factory: Arc<dyn ModelFactory>,
    generators: Mutex<HashMap<(ModelRole, ModelProfile), Arc<dyn Generator>>>,
    embedders: Mutex<HashMap<ModelProfile, Arc<dyn Embedder>>>,
    classifiers: Mutex<HashMap<(ModelRole, ModelProfile), Arc<dyn Classifier>>>,
    extractors: Mutex<HashMap<ModelProfile, Arc<dyn SpanExtractor>>>,
}

impl ModelRegistry {
    pub fn new(factory: Arc<dyn ModelFactory>) -> Self {
        Self {
            factory,
            generators: Mutex::new(HashMap::new()),
            embedders: Mutex::new(HashMap::new()),
            classifiers: Mutex::new(HashMap::new()),
            extractors: Mutex::new(HashMap::new()),
        }
    }

    pub async fn generator(
        &self,
        role: ModelRole,
        profile: ModelProfile,
    ) -> Result<Arc<dyn Generator>, ApiError> {
        let mut handles = self.generators.lock().await;
        if let Some(handle) = handles.get(&(role, profile)) {
            return Ok(handle.clone());
        }

        tracing::info!("Loading {} model ({})", role.key(), profile.as_str());
        let handle = self.factory.generator(role, profile).await?;
        handles.insert((role, profile), handle.clone());
        Ok(handle)
    }

    pub async fn embedder(&self, profile: ModelProfile) -> Result<Arc<dyn Embedder>, ApiError> {
        let mut handles = self.embedders.lock().await;
        if let Some(handle) = handles.get(&profile) {
            return Ok(handle.clone());
        }

        tracing::info!("Loading embedding model ({})", profile.as_str());
        let handle = self.factory.embedder(profile).await?;
        handles.insert(profile, handle.clone());
        Ok(handle)
    }

    pub async fn classifier(
        &self,
        role: ModelRole,
        profile: ModelProfile,
    ) -> Result<Arc<dyn Classifier>, ApiError> {
        let mut handles = self.classifiers.lock().await;
        if let Some(handle) = handles.get(&(role, profile)) {
            return Ok(handle.clone());
        }

        tracing::info!("Loading {} model ({})", role.key(), profile.as_str());
        let handle = self.factory.classifier(role, profile).await?;
        handles.insert((role, profile), handle.clone());
        Ok(handle)
    }

    pub async fn span_extractor(
        &self,
        profile: ModelProfile,
    ) -> Result<Arc<dyn SpanExtractor>, ApiError> {
        let mut handles = self.extractors.lock().await;
        if let Some(handle) = handles.get(&profile) {
            return Ok(handle.clone());
        }

        tracing::info!("Loading qa-extractive model ({})", profile.as_str());
        let handle = self.factory.span_extractor(profile).await?;
        handles.insert(profile, handle.clone());
        Ok(handle)
    }
}
