//! Vector math kernel
//!
//! Pure functions over dense fixed-dimension vectors. Inputs are `f32`;
//! every computation accumulates in `f64` and runs sequentially, so results
//! are deterministic given identical inputs. Dimension agreement and
//! NaN/Inf rejection happen at component boundaries via [`validate_vector`].

use crate::error::{Result, VectorDbError};

/// Dot product with f64 accumulation
pub fn dot(a: &[f32], b: &[f32]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| *x as f64 * *y as f64)
        .sum()
}

/// L2 norm
pub fn norm(a: &[f32]) -> f64 {
    a.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt()
}

/// Euclidean distance between two vectors
pub fn l2(a: &[f32], b: &[f32]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = *x as f64 - *y as f64;
            d * d
        })
        .sum::<f64>()
        .sqrt()
}

/// Cosine similarity; returns 0.0 if either vector has zero norm
pub fn cosine(a: &[f32], b: &[f32]) -> f64 {
    let na = norm(a);
    let nb = norm(b);
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    dot(a, b) / (na * nb)
}

/// Scale a vector to unit length; the zero vector maps to itself
pub fn normalize(a: &[f32]) -> Vec<f32> {
    let n = norm(a);
    if n == 0.0 {
        return a.to_vec();
    }
    a.iter().map(|x| (*x as f64 / n) as f32).collect()
}

/// Element-wise mean of a set of equal-length vectors (centroid)
///
/// Returns None for an empty set.
pub fn mean(vectors: &[Vec<f32>]) -> Option<Vec<f32>> {
    let first = vectors.first()?;
    let dim = first.len();
    let mut acc = vec![0.0f64; dim];
    for v in vectors {
        debug_assert_eq!(v.len(), dim);
        for (slot, x) in acc.iter_mut().zip(v.iter()) {
            *slot += *x as f64;
        }
    }
    let n = vectors.len() as f64;
    Some(acc.into_iter().map(|x| (x / n) as f32).collect())
}

/// Validate a vector at a component boundary
///
/// Rejects empty vectors, non-finite components, and (when `expected_dim`
/// is given) dimension disagreement.
pub fn validate_vector(v: &[f32], expected_dim: Option<usize>) -> Result<()> {
    if v.is_empty() {
        return Err(VectorDbError::validation("embedding must not be empty"));
    }
    if let Some(expected) = expected_dim {
        if v.len() != expected {
            return Err(VectorDbError::DimensionMismatch {
                expected,
                got: v.len(),
            });
        }
    }
    if v.iter().any(|x| !x.is_finite()) {
        return Err(VectorDbError::validation(
            "embedding contains NaN or infinite components",
        ));
    }
    Ok(())
}
