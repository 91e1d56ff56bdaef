//! K-Means clustering (Lloyd's algorithm)
//!
//! Trains the coarse quantizer backing the IVF index. The loop runs a fixed
//! number of iterations with no convergence test:
//!
//! 1. Initialize K centroids from a shuffled sample of the data
//! 2. Assign every vector to its nearest centroid (squared L2, first wins)
//! 3. Move each centroid to the mean of its bucket
//!
//! Training with fewer vectors than clusters returns an empty result rather
//! than failing; callers check [`KMeansResult::is_trained`] afterward.

use rand::seq::SliceRandom;

use crate::math;

/// Output of a training run.
///
/// `buckets[j]` holds the IDs assigned to `centroids[j]` in the final
/// assignment pass. The buckets partition `0..N`; empty buckets are allowed
/// and keep their centroid where the previous iteration left it.
#[derive(Debug, Clone, Default)]
pub struct KMeansResult {
    pub centroids: Vec<Vec<f32>>,
    pub buckets: Vec<Vec<usize>>,
}

impl KMeansResult {
    pub fn is_trained(&self) -> bool {
        !self.centroids.is_empty() && !self.buckets.is_empty()
    }
}

/// Lloyd's algorithm trainer.
#[derive(Debug, Clone)]
pub struct KMeans {
    k: usize,
    max_iters: usize,
    dimension: usize,
    seed: Option<u64>,
}

impl KMeans {
    pub fn new(k: usize, max_iters: usize, dimension: usize) -> Self {
        Self {
            k,
            max_iters,
            dimension,
            seed: None,
        }
    }

    /// Fix the RNG seed so centroid initialization is reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Run the clustering loop over the full dataset.
    pub fn train(&self, data: &[Vec<f32>]) -> KMeansResult {
        let mut result = KMeansResult::default();

        // Cannot find K clusters in fewer than K points.
        if data.len() < self.k {
            tracing::debug!(
                n = data.len(),
                k = self.k,
                "insufficient data, returning untrained result"
            );
            return result;
        }

        result.centroids = self.init_centroids(data);
        result.buckets = vec![Vec::new(); self.k];

        for _ in 0..self.max_iters {
            for bucket in &mut result.buckets {
                bucket.clear();
            }
            self.assign(data, &result.centroids, &mut result.buckets);
            self.update(data, &mut result.centroids, &result.buckets);
        }

        tracing::debug!(
            k = self.k,
            iters = self.max_iters,
            n = data.len(),
            "kmeans training complete"
        );
        result
    }

    /// Pick K distinct vectors as starting centroids (shuffle, take first K).
    fn init_centroids(&self, data: &[Vec<f32>]) -> Vec<Vec<f32>> {
        let mut rng = math::random_engine(self.seed);

        let mut ids: Vec<usize> = (0..data.len()).collect();
        ids.shuffle(&mut rng);

        ids.iter().take(self.k).map(|&id| data[id].clone()).collect()
    }

    /// Assignment step: each vector joins the bucket of its nearest centroid.
    /// Ties break toward the lowest centroid index.
    fn assign(&self, data: &[Vec<f32>], centroids: &[Vec<f32>], buckets: &mut [Vec<usize>]) {
        for (id, vector) in data.iter().enumerate() {
            let mut best = 0;
            let mut best_dist = f32::MAX;

            for (j, centroid) in centroids.iter().enumerate() {
                let d = math::squared_euclidean(vector, centroid);
                if d < best_dist {
                    best_dist = d;
                    best = j;
                }
            }

            buckets[best].push(id);
        }
    }

    /// Update step: move each centroid to the mean of its bucket.
    /// Empty buckets keep their centroid in place.
    fn update(&self, data: &[Vec<f32>], centroids: &mut [Vec<f32>], buckets: &[Vec<usize>]) {
        for (centroid, bucket) in centroids.iter_mut().zip(buckets) {
            if bucket.is_empty() {
                continue;
            }

            let mut mean = vec![0.0f32; self.dimension];

            // Members outer, dimensions inner: reads stay contiguous per row.
            for &id in bucket {
                for (acc, &x) in mean.iter_mut().zip(&data[id]) {
                    *acc += x;
                }
            }

            let count = bucket.len() as f32;
            for acc in &mut mean {
                *acc /= count;
            }

            *centroid = mean;
        }
    }
}
