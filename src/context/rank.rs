use std::sync::Arc;

use serde::Serialize;

use crate::core::errors::ApiError;
use crate::models::Embedder;
use crate::vector_math;

#[derive(Debug, Clone, Serialize)]
pub struct RankedChunk {
    pub text: String,
    pub score: f32,
}

/// Ranks chunks against the query by embedding similarity.
///
/// The query and the chunk list are embedded in two calls total, one per
/// list, to bound the request count. Chunk embeddings are expected
/// L2-normalized by the embedding capability, so the dot product is the
/// similarity. An empty chunk list ranks to an empty result.
pub async fn rank_chunks(
    embedder: &Arc<dyn Embedder>,
    query: &str,
    chunks: &[String],
) -> Result<Vec<RankedChunk>, ApiError> {
    if chunks.is_empty() {
        tracing::debug!("No chunks to rank");
        return Ok(Vec::new());
    }

    let query_embeddings = embedder.embed(&[query.to_string()]).await?;
    let query_embedding = query_embeddings
        .first()
        .ok_or_else(|| ApiError::Internal("Query embedding missing".to_string()))?;

    let chunk_embeddings = embedder.embed(chunks).await?;
    if chunk_embeddings.len() != chunks.len() {
        return Err(ApiError::Internal(format!(
            "Embedding count mismatch: {} != {}",
            chunk_embeddings.len(),
            chunks.len()
        )));
    }

    let ranking = vector_math::rank_descending_by_dot(query_embedding, &chunk_embeddings)?;

    Ok(ranking
        .into_iter()
        .map(|(idx, score)| RankedChunk {
            text: chunks[idx].clone(),
            score,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;

    /// Embeds each text as a fixed vector looked up by its first word.
    struct TableEmbedder;

    #[async_trait]
    impl Embedder for TableEmbedder {
        async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
            Ok(inputs
                .iter()
                .map(|text| match text.split_whitespace().next() {
                    Some("query") => vec![1.0, 0.0],
                    Some("near") => vec![0.9, 0.1],
                    Some("far") => vec![0.1, 0.9],
                    _ => vec![0.5, 0.5],
                })
                .collect())
        }
    }

    #[tokio::test]
    async fn empty_chunk_list_ranks_to_empty() {
        let embedder: Arc<dyn Embedder> = Arc::new(TableEmbedder);
        let ranked = rank_chunks(&embedder, "query text", &[])
            .await
            .expect("empty list is not an error");
        assert!(ranked.is_empty());
    }

    #[tokio::test]
    async fn chunks_are_sorted_by_similarity() {
        let embedder: Arc<dyn Embedder> = Arc::new(TableEmbedder);
        let chunks = vec![
            "far away content".to_string(),
            "near content".to_string(),
        ];
        let ranked = rank_chunks(&embedder, "query text", &chunks)
            .await
            .expect("ranking should work");

        assert_eq!(ranked.len(), 2);
        assert!(ranked[0].text.starts_with("near"));
        assert!(ranked[0].score > ranked[1].score);
    }
}
