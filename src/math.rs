//! Distance functions and RNG helpers
//!
//! Scalar implementations that LLVM auto-vectorizes with
//! `-C target-cpu=native`. All ranking inside the crate uses
//! [`squared_euclidean`]; the square root is only taken when a true metric
//! is demanded at the API edge.

use rand::rngs::StdRng;
use rand::SeedableRng;

/// Squared L2 distance: `Σ (aᵢ − bᵢ)²`.
///
/// Monotonic with the Euclidean distance, so it is safe for argmin and
/// sorting while skipping the `sqrt` on the hot path.
#[inline(always)]
pub fn squared_euclidean(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "Vector length mismatch");
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// L2 distance: `√(Σ (aᵢ − bᵢ)²)`.
#[inline(always)]
pub fn euclidean(a: &[f32], b: &[f32]) -> f32 {
    squared_euclidean(a, b).sqrt()
}

/// Dot product: `Σ aᵢ·bᵢ`. Used by the hyperplane margin in the Annoy index.
#[inline(always)]
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "Vector length mismatch");
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Return a fresh RNG engine owned by the caller.
///
/// `None` seeds from OS entropy, so independent builds diverge; pass a seed
/// for reproducible index construction.
pub fn random_engine(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    }
}
