//! Brute-force exact index
//!
//! Scans every stored vector per query. No state, nothing to train or
//! persist; it doubles as the lazy default when no index was installed and
//! as the ground truth the approximate indexes are measured against.

use std::io::{self, Read, Write};

use super::{rank_by_distance, Index, IndexError, SearchParams, SearchResults};

pub(crate) const NAME: &str = "FlatIndex";

#[derive(Debug, Clone, Copy, Default)]
pub struct FlatIndex;

impl FlatIndex {
    pub fn new() -> Self {
        Self
    }
}

impl Index for FlatIndex {
    fn build(&mut self, _data: &[Vec<f32>]) {}

    fn search(
        &self,
        data: &[Vec<f32>],
        query: &[f32],
        k: usize,
        params: Option<&SearchParams>,
    ) -> Result<SearchResults, IndexError> {
        if params.is_some() {
            return Err(IndexError::ParamKindMismatch { index: NAME });
        }

        Ok(rank_by_distance(data, query, 0..data.len(), k))
    }

    fn is_trained(&self) -> bool {
        true
    }

    fn save<W: Write>(&self, _out: &mut W) -> io::Result<()> {
        Ok(())
    }

    fn load<R: Read>(_input: &mut R) -> io::Result<Self> {
        Ok(Self)
    }

    fn name(&self) -> &'static str {
        NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_nearest_neighbors() {
        let data = vec![
            vec![0.0, 0.0],
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![10.0, 10.0],
        ];
        let index = FlatIndex::new();

        let results = index.search(&data, &[0.1, 0.1], 2, None).unwrap();

        // ID 0 is nearest at 0.02; IDs 1 and 2 tie at 0.82 and the stable
        // sort keeps insertion order, so ID 1 takes the second slot.
        assert_eq!(results.ids, vec![0, 1]);
        assert!((results.distances[0] - 0.02).abs() < 1e-6);
        assert!((results.distances[1] - 0.82).abs() < 1e-6);
    }

    #[test]
    fn test_k_larger_than_dataset() {
        let data = vec![vec![1.0], vec![2.0]];
        let index = FlatIndex::new();

        let results = index.search(&data, &[0.0], 10, None).unwrap();
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_distances_are_squared_and_nondecreasing() {
        let data = vec![vec![3.0, 0.0], vec![1.0, 0.0], vec![2.0, 0.0]];
        let index = FlatIndex::new();

        let results = index.search(&data, &[0.0, 0.0], 3, None).unwrap();
        assert_eq!(results.distances, vec![1.0, 4.0, 9.0]);
        assert!(results.distances.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_rejects_foreign_params() {
        let index = FlatIndex::new();
        let params = SearchParams::Ivf { n_probe: 2 };

        let result = index.search(&[], &[0.0], 1, Some(&params));
        assert!(matches!(
            result,
            Err(IndexError::ParamKindMismatch { index: NAME })
        ));
    }

    #[test]
    fn test_empty_dataset_returns_empty() {
        let index = FlatIndex::new();
        let results = index.search(&[], &[1.0, 2.0], 5, None).unwrap();
        assert!(results.is_empty());
    }
}
