//! Vector utilities and the deterministic offline embedding generator.
//!
//! Concrete embedding backends (OpenAI, offline) live in the `ius-civile`
//! application crate; this module holds the pure helpers they share with the
//! vector index.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Encode a float vector as little-endian `f32` bytes.
///
/// # Example
///
/// ```rust
/// use ius_civile_core::embedding::{vec_to_blob, blob_to_vec};
///
/// let v = vec![1.0f32, -2.5, 3.125];
/// let blob = vec_to_blob(&v);
/// assert_eq!(blob.len(), 12);
/// assert_eq!(blob_to_vec(&blob), v);
/// ```
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode little-endian `f32` bytes back into a float vector.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Scale `v` in place to unit L2 norm.
///
/// Vectors with (near) zero norm are left untouched, so they score `0.0`
/// against everything.
pub fn l2_normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm < f32::EPSILON {
        return;
    }
    for x in v.iter_mut() {
        *x /= norm;
    }
}

/// Dot product of two equal-length vectors; `0.0` on length mismatch.
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Generate `count` pseudo-random vectors of width `dims` from a fixed seed.
///
/// The generator is re-seeded on every call, so the same `(seed, count, dims)`
/// always yields the same vectors. The values carry no semantics; they only
/// exercise the index structurally when no embedding backend is configured.
pub fn offline_vectors(seed: u64, count: usize, dims: usize) -> Vec<Vec<f32>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| (0..dims).map(|_| rng.gen_range(-1.0f32..1.0)).collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec_blob_roundtrip() {
        let vec = vec![1.0f32, -2.5, 3.125, 0.0, -0.001];
        assert_eq!(blob_to_vec(&vec_to_blob(&vec)), vec);
    }

    #[test]
    fn test_normalize_unit_length() {
        let mut v = vec![3.0, 4.0];
        l2_normalize(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_zero_vector_unchanged() {
        let mut v = vec![0.0, 0.0, 0.0];
        l2_normalize(&mut v);
        assert_eq!(v, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_offline_vectors_deterministic() {
        let first = offline_vectors(42, 3, 16);
        let second = offline_vectors(42, 3, 16);
        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
        assert!(first.iter().all(|v| v.len() == 16));
        assert_ne!(first[0], first[1]);
    }

    #[test]
    fn test_offline_vectors_depend_on_seed() {
        assert_ne!(offline_vectors(0, 1, 8), offline_vectors(42, 1, 8));
    }
}
