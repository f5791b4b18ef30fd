use serde::Serialize;

use crate::models::MacroVector;

/// Closeness of two macro profiles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SimilarityResult {
    /// Cosine similarity clamped to [0, 1].
    pub similarity: f64,
    /// `similarity * 100`.
    pub normalized_similarity: f64,
}

impl SimilarityResult {
    fn from_raw(raw: f64) -> Self {
        let similarity = raw.clamp(0.0, 1.0);
        Self {
            similarity,
            normalized_similarity: similarity * 100.0,
        }
    }
}

/// Cosine similarity between a recipe profile and a target.
///
/// Zero-magnitude vectors score 0: an empty recipe is never similar to anything.
pub fn cosine_similarity(recipe: &MacroVector, target: &MacroVector) -> SimilarityResult {
    let norm_a = recipe.magnitude();
    let norm_b = target.magnitude();
    if norm_a == 0.0 || norm_b == 0.0 {
        return SimilarityResult::default();
    }
    SimilarityResult::from_raw(recipe.dot(target) / (norm_a * norm_b))
}

/// Scale a vector to unit length. The zero vector stays zero.
pub fn normalize_vector(v: &MacroVector) -> MacroVector {
    let norm = v.magnitude();
    if norm == 0.0 {
        return MacroVector::zero();
    }
    *v * (1.0 / norm)
}

/// Cosine similarity on unit-normalized inputs, for profiles whose absolute
/// size differs greatly from the target (a single portion vs. a daily goal).
pub fn normalized_cosine_similarity(recipe: &MacroVector, target: &MacroVector) -> SimilarityResult {
    let a = normalize_vector(recipe);
    let b = normalize_vector(target);
    if a.is_zero() || b.is_zero() {
        return SimilarityResult::default();
    }
    SimilarityResult::from_raw(a.dot(&b))
}
