//! Similarity math over embedding vectors.

use std::cmp::Ordering;

use ndarray::ArrayView1;

use crate::core::errors::ApiError;

pub fn dot(a: &[f32], b: &[f32]) -> Result<f32, ApiError> {
    ensure_comparable(a, b)?;
    Ok(ArrayView1::from(a).dot(&ArrayView1::from(b)))
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32, ApiError> {
    ensure_comparable(a, b)?;
    let left = ArrayView1::from(a);
    let right = ArrayView1::from(b);

    let norms = left.dot(&left).sqrt() * right.dot(&right).sqrt();
    if norms <= f32::EPSILON {
        return Ok(0.0);
    }
    Ok(left.dot(&right) / norms)
}

/// Scores every candidate against the query with a plain dot product and
/// sorts descending. Candidates are expected L2-normalized by the embedding
/// capability. The sort is stable: equal scores keep their original order.
pub fn rank_descending_by_dot(
    query: &[f32],
    candidates: &[Vec<f32>],
) -> Result<Vec<(usize, f32)>, ApiError> {
    rank_descending(query, candidates, dot)
}

/// As `rank_descending_by_dot`, but normalizing per pair; for vectors the
/// embedding capability does not guarantee unit length for.
pub fn rank_descending_by_cosine(
    query: &[f32],
    candidates: &[Vec<f32>],
) -> Result<Vec<(usize, f32)>, ApiError> {
    rank_descending(query, candidates, cosine_similarity)
}

fn rank_descending(
    query: &[f32],
    candidates: &[Vec<f32>],
    metric: impl Fn(&[f32], &[f32]) -> Result<f32, ApiError>,
) -> Result<Vec<(usize, f32)>, ApiError> {
    let mut ranking = candidates
        .iter()
        .enumerate()
        .map(|(idx, candidate)| Ok((idx, metric(query, candidate)?)))
        .collect::<Result<Vec<_>, ApiError>>()?;

    ranking.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    Ok(ranking)
}

/// Temperature-scaled softmax over raw logits.
pub fn softmax(logits: &[f32], temperature: f32) -> Vec<f32> {
    if logits.is_empty() {
        return Vec::new();
    }

    let temperature = if temperature <= 0.0 { 1.0 } else { temperature };
    let scaled: Vec<f32> = logits.iter().map(|v| v / temperature).collect();
    let max = scaled.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = scaled.iter().map(|v| (v - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.iter().map(|v| v / sum).collect()
}

fn ensure_comparable(a: &[f32], b: &[f32]) -> Result<(), ApiError> {
    if a.is_empty() || b.is_empty() {
        return Err(ApiError::BadRequest(
            "Cannot compare empty embedding vectors".to_string(),
        ));
    }
    if a.len() != b.len() {
        return Err(ApiError::BadRequest(format!(
            "Embedding dimensions differ: {} vs {}",
            a.len(),
            b.len()
        )));
    }
    Ok(())
}
