//! Inverted File (IVF) index
//!
//! K-Means partitions the dataset into `n_clusters` buckets keyed by their
//! centroid. A query first ranks the centroids (coarse step), then scans only
//! the vectors in the `n_probe` closest buckets (fine step). With
//! `n_probe >= n_clusters` every bucket is scanned and results are exact.
//!
//! # Binary section
//!
//! ```text
//! n_clusters : i32
//! dimension  : i32
//! centroids  : n_clusters · dimension f32
//! buckets    : n_clusters × (bucket_size i32, bucket_size i32 IDs)
//! ```

use std::cmp::Ordering;
use std::io::{self, Read, Write};

use super::{rank_by_distance, Index, IndexError, SearchParams, SearchResults};
use crate::kmeans::KMeans;
use crate::math;
use crate::wire;

pub(crate) const NAME: &str = "IVFIndex";

const DEFAULT_MAX_ITERS: usize = 50;
const DEFAULT_N_PROBE: usize = 1;

#[derive(Debug, Clone)]
pub struct IvfIndex {
    centroids: Vec<Vec<f32>>,
    /// `inverted_index[j]` holds the IDs assigned to `centroids[j]`.
    inverted_index: Vec<Vec<usize>>,
    dimension: usize,
    n_clusters: usize,
    max_iters: usize,
    n_probe: usize,
    seed: Option<u64>,
}

impl IvfIndex {
    pub fn new(n_clusters: usize, dimension: usize) -> Self {
        Self {
            centroids: Vec::new(),
            inverted_index: Vec::new(),
            dimension,
            n_clusters,
            max_iters: DEFAULT_MAX_ITERS,
            n_probe: DEFAULT_N_PROBE,
            seed: None,
        }
    }

    /// Training iterations for the K-Means run (default 50).
    pub fn with_max_iters(mut self, max_iters: usize) -> Self {
        self.max_iters = max_iters;
        self
    }

    /// Default number of buckets scanned per query (default 1).
    pub fn with_n_probe(mut self, n_probe: usize) -> Self {
        self.n_probe = n_probe;
        self
    }

    /// Fix the K-Means RNG seed for reproducible training.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn centroids(&self) -> &[Vec<f32>] {
        &self.centroids
    }
}

impl Index for IvfIndex {
    fn build(&mut self, data: &[Vec<f32>]) {
        let mut trainer = KMeans::new(self.n_clusters, self.max_iters, self.dimension);
        if let Some(seed) = self.seed {
            trainer = trainer.with_seed(seed);
        }

        let result = trainer.train(data);
        self.centroids = result.centroids;
        self.inverted_index = result.buckets;

        tracing::debug!(
            clusters = self.centroids.len(),
            vectors = data.len(),
            "ivf index built"
        );
    }

    fn search(
        &self,
        data: &[Vec<f32>],
        query: &[f32],
        k: usize,
        params: Option<&SearchParams>,
    ) -> Result<SearchResults, IndexError> {
        if !self.is_trained() {
            return Ok(SearchResults::default());
        }

        let n_probe = match params {
            None => self.n_probe,
            Some(SearchParams::Ivf { n_probe }) => *n_probe,
            Some(_) => return Err(IndexError::ParamKindMismatch { index: NAME }),
        };

        // Coarse step: rank every centroid by distance to the query.
        let mut centroid_scores: Vec<(usize, f32)> = self
            .centroids
            .iter()
            .enumerate()
            .map(|(j, centroid)| (j, math::squared_euclidean(query, centroid)))
            .collect();
        centroid_scores.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));

        // Fine step: pool the IDs of the closest buckets, then re-rank exactly.
        let probes = n_probe.min(self.centroids.len());
        let candidates = centroid_scores[..probes]
            .iter()
            .flat_map(|&(j, _)| self.inverted_index[j].iter().copied());

        Ok(rank_by_distance(data, query, candidates, k))
    }

    fn is_trained(&self) -> bool {
        !self.centroids.is_empty() && !self.inverted_index.is_empty()
    }

    fn save<W: Write>(&self, out: &mut W) -> io::Result<()> {
        // The serialized count is the actual state, so an untrained index
        // round-trips as zero clusters instead of desynchronizing the stream.
        wire::write_i32(out, self.centroids.len() as i32)?;
        wire::write_i32(out, self.dimension as i32)?;

        for centroid in &self.centroids {
            wire::write_f32_slice(out, centroid)?;
        }

        for bucket in &self.inverted_index {
            wire::write_id_list(out, bucket)?;
        }
        Ok(())
    }

    fn load<R: Read>(input: &mut R) -> io::Result<Self> {
        let n_clusters = wire::read_i32(input)?;
        let dimension = wire::read_i32(input)?;
        if n_clusters < 0 || dimension < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Invalid IVF header: n_clusters={n_clusters}, dimension={dimension}"),
            ));
        }

        let n_clusters = n_clusters as usize;
        let dimension = dimension as usize;

        let mut centroids = Vec::with_capacity(n_clusters);
        for _ in 0..n_clusters {
            centroids.push(wire::read_f32_vec(input, dimension)?);
        }

        let mut inverted_index = Vec::with_capacity(n_clusters);
        for _ in 0..n_clusters {
            inverted_index.push(wire::read_id_list(input)?);
        }

        Ok(Self {
            centroids,
            inverted_index,
            dimension,
            n_clusters,
            max_iters: DEFAULT_MAX_ITERS,
            n_probe: DEFAULT_N_PROBE,
            seed: None,
        })
    }

    fn name(&self) -> &'static str {
        NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::FlatIndex;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::io::Cursor;

    fn random_vectors(n: usize, dim: usize, seed: u64) -> Vec<Vec<f32>> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n)
            .map(|_| (0..dim).map(|_| rng.gen::<f32>() - 0.5).collect())
            .collect()
    }

    #[test]
    fn test_untrained_search_is_empty() {
        let index = IvfIndex::new(4, 2);
        let data = vec![vec![0.0, 0.0]];

        assert!(!index.is_trained());
        let results = index.search(&data, &[0.0, 0.0], 3, None).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_full_probe_equals_flat() {
        let data = vec![
            vec![0.0, 0.0],
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![10.0, 10.0],
        ];
        let mut ivf = IvfIndex::new(2, 2).with_max_iters(10).with_seed(42);
        ivf.build(&data);

        let params = SearchParams::Ivf { n_probe: 2 };
        let ivf_results = ivf.search(&data, &[0.1, 0.1], 4, Some(&params)).unwrap();
        let flat_results = FlatIndex::new().search(&data, &[0.1, 0.1], 4, None).unwrap();

        assert_eq!(ivf_results, flat_results);
    }

    #[test]
    fn test_insufficient_data_stays_untrained() {
        let data = random_vectors(3, 4, 1);
        let mut index = IvfIndex::new(5, 4);
        index.build(&data);

        assert!(!index.is_trained());
    }

    #[test]
    fn test_save_load_roundtrip_preserves_results() {
        let data = random_vectors(60, 8, 7);
        let mut index = IvfIndex::new(4, 8).with_max_iters(20).with_seed(3);
        index.build(&data);

        let mut buf = Vec::new();
        index.save(&mut buf).unwrap();
        let loaded = IvfIndex::load(&mut Cursor::new(buf)).unwrap();

        assert!(loaded.is_trained());
        let params = SearchParams::Ivf { n_probe: 4 };
        for query in random_vectors(10, 8, 8) {
            let before = index.search(&data, &query, 5, Some(&params)).unwrap();
            let after = loaded.search(&data, &query, 5, Some(&params)).unwrap();
            assert_eq!(before, after);
        }
    }

    #[test]
    fn test_untrained_roundtrip() {
        let index = IvfIndex::new(4, 8);
        let mut buf = Vec::new();
        index.save(&mut buf).unwrap();

        let loaded = IvfIndex::load(&mut Cursor::new(buf)).unwrap();
        assert!(!loaded.is_trained());
    }

    #[test]
    fn test_rejects_foreign_params() {
        let data = random_vectors(10, 4, 2);
        let mut index = IvfIndex::new(2, 4).with_seed(1);
        index.build(&data);

        let params = SearchParams::Annoy {
            search_k: 10,
            use_priority_queue: false,
        };
        let result = index.search(&data, &data[0], 1, Some(&params));
        assert!(matches!(result, Err(IndexError::ParamKindMismatch { .. })));
    }
}
