//! File-backed persistence: the query-result cache, the query history and
//! the user-feedback log.
//!
//! Each file is a single compact JSON document rewritten wholesale on every
//! update. Writers share an async mutex and take an exclusive OS lock on
//! the file for the duration of the read-modify-write, so concurrent
//! updates cannot interleave. I/O failures are logged and degrade to a
//! cache miss or a dropped write; they are never fatal to the answering
//! flow.

use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::core::errors::ApiError;
use crate::pipeline::PipelineResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub hash: String,
    pub result: PipelineResult,
}

/// Hash of the serialized result, used to skip redundant cache rewrites.
pub fn content_hash(result: &PipelineResult) -> Result<String, ApiError> {
    let serialized = serde_json::to_string(result).map_err(ApiError::internal)?;
    let mut hasher = Sha256::new();
    hasher.update(serialized.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Whole-file JSON map keyed by literal query text.
pub struct QueryCache {
    path: PathBuf,
    writer: Mutex<()>,
}

impl QueryCache {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            writer: Mutex::new(()),
        }
    }

    pub async fn get(&self, query: &str) -> Option<PipelineResult> {
        let entries = self.read_entries();
        entries.get(query).map(|entry| entry.result.clone())
    }

    /// Inserts or overwrites the entry for this query. A write with an
    /// unchanged content hash is skipped entirely.
    pub async fn put(&self, query: &str, result: &PipelineResult) {
        let hash = match content_hash(result) {
            Ok(hash) => hash,
            Err(err) => {
                tracing::warn!("Skipping cache write, result not serializable: {}", err);
                return;
            }
        };

        let _guard = self.writer.lock().await;

        let mut entries = self.read_entries();
        if entries.get(query).map(|entry| entry.hash.as_str()) == Some(hash.as_str()) {
            tracing::debug!("Cache entry unchanged, skipping write");
            return;
        }

        entries.insert(
            query.to_string(),
            CacheEntry {
                hash,
                result: result.clone(),
            },
        );

        if let Err(err) = write_json_file(&self.path, &entries) {
            tracing::warn!("Failed to write query cache: {}", err);
        }
    }

    fn read_entries(&self) -> BTreeMap<String, CacheEntry> {
        read_json_file(&self.path).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    pub query: String,
    pub asked_at: DateTime<Utc>,
}

/// Query history plus the feedback map, sharing one writer section.
pub struct UsageLog {
    history_path: PathBuf,
    feedback_path: PathBuf,
    writer: Mutex<()>,
}

impl UsageLog {
    pub fn new(history_path: PathBuf, feedback_path: PathBuf) -> Self {
        Self {
            history_path,
            feedback_path,
            writer: Mutex::new(()),
        }
    }

    pub async fn append_query(&self, query: &str) {
        let _guard = self.writer.lock().await;

        let mut history: Vec<HistoryEntry> =
            read_json_file(&self.history_path).unwrap_or_default();
        history.push(HistoryEntry {
            id: Uuid::new_v4().to_string(),
            query: query.to_string(),
            asked_at: Utc::now(),
        });

        if let Err(err) = write_json_file(&self.history_path, &history) {
            tracing::warn!("Failed to write query history: {}", err);
        }
    }

    pub async fn history(&self) -> Vec<HistoryEntry> {
        read_json_file(&self.history_path).unwrap_or_default()
    }

    pub async fn record_feedback(&self, query: &str, feedback: &str) {
        let _guard = self.writer.lock().await;

        let mut entries: BTreeMap<String, String> =
            read_json_file(&self.feedback_path).unwrap_or_default();
        entries.insert(query.to_string(), feedback.to_string());

        if let Err(err) = write_json_file(&self.feedback_path, &entries) {
            tracing::warn!("Failed to write feedback log: {}", err);
        }
    }
}

fn read_json_file<T: for<'de> Deserialize<'de>>(path: &PathBuf) -> Option<T> {
    if !path.exists() {
        return None;
    }

    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) => {
            tracing::warn!("Failed to read {}: {}", path.display(), err);
            return None;
        }
    };
    if contents.trim().is_empty() {
        return None;
    }

    match serde_json::from_str(&contents) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!("Failed to parse {}: {}", path.display(), err);
            None
        }
    }
}

fn write_json_file<T: Serialize>(path: &PathBuf, value: &T) -> Result<(), ApiError> {
    let serialized = serde_json::to_string(value).map_err(ApiError::internal)?;

    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .map_err(ApiError::internal)?;
    file.lock_exclusive().map_err(ApiError::internal)?;
    let outcome = file.write_all(serialized.as_bytes()).map_err(ApiError::internal);
    let _ = fs2::FileExt::unlock(&file);
    outcome
}
