//! Index abstraction
//!
//! Every index variant implements the same contract: build from a borrowed
//! view of the store, answer k-NN queries in squared Euclidean distance, and
//! read/write its private state as a binary section. The variant set is
//! closed: [`AnyIndex`] is a tagged enum, not a trait object, so the
//! persistence tag is the discriminant and search-parameter matching is a
//! plain `match`.

use std::cmp::Ordering;
use std::io::{self, Read, Write};

use thiserror::Error;

use crate::math;

pub mod annoy;
pub mod flat;
pub mod ivf;

pub use annoy::AnnoyIndex;
pub use flat::FlatIndex;
pub use ivf::IvfIndex;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Search params do not match installed index {index}")]
    ParamKindMismatch { index: &'static str },

    #[error("Index is not trained")]
    NotTrained,
}

/// IDs and squared Euclidean distances, ascending by distance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResults {
    pub ids: Vec<usize>,
    pub distances: Vec<f32>,
}

impl SearchResults {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Per-query overrides for an index's stored defaults.
///
/// The variant must match the installed index; a mismatch is rejected with
/// [`IndexError::ParamKindMismatch`]. `None` at the call site means "use the
/// index's own defaults".
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SearchParams {
    Ivf {
        n_probe: usize,
    },
    Annoy {
        search_k: usize,
        use_priority_queue: bool,
    },
}

/// Contract every index variant implements.
///
/// `build` and `search` borrow the store's vectors for the duration of the
/// call only; no variant retains the reference, so the caller is free to
/// append between calls (at the cost of a stale index).
pub trait Index {
    /// Construct internal state from the full dataset.
    fn build(&mut self, data: &[Vec<f32>]);

    /// k-NN query. An untrained index returns empty results, not an error.
    fn search(
        &self,
        data: &[Vec<f32>],
        query: &[f32],
        k: usize,
        params: Option<&SearchParams>,
    ) -> Result<SearchResults, IndexError>;

    fn is_trained(&self) -> bool;

    /// Write the variant-private binary section.
    fn save<W: Write>(&self, out: &mut W) -> io::Result<()>;

    /// Read a variant back from its binary section.
    fn load<R: Read>(input: &mut R) -> io::Result<Self>
    where
        Self: Sized;

    /// Stable discriminator used as the on-disk type tag.
    fn name(&self) -> &'static str;
}

/// Closed set of index variants owned by the database.
#[derive(Debug, Clone)]
pub enum AnyIndex {
    Flat(FlatIndex),
    Ivf(IvfIndex),
    Annoy(AnnoyIndex),
}

impl AnyIndex {
    pub fn build(&mut self, data: &[Vec<f32>]) {
        match self {
            AnyIndex::Flat(index) => index.build(data),
            AnyIndex::Ivf(index) => index.build(data),
            AnyIndex::Annoy(index) => index.build(data),
        }
    }

    pub fn search(
        &self,
        data: &[Vec<f32>],
        query: &[f32],
        k: usize,
        params: Option<&SearchParams>,
    ) -> Result<SearchResults, IndexError> {
        match self {
            AnyIndex::Flat(index) => index.search(data, query, k, params),
            AnyIndex::Ivf(index) => index.search(data, query, k, params),
            AnyIndex::Annoy(index) => index.search(data, query, k, params),
        }
    }

    pub fn is_trained(&self) -> bool {
        match self {
            AnyIndex::Flat(index) => index.is_trained(),
            AnyIndex::Ivf(index) => index.is_trained(),
            AnyIndex::Annoy(index) => index.is_trained(),
        }
    }

    pub fn save<W: Write>(&self, out: &mut W) -> io::Result<()> {
        match self {
            AnyIndex::Flat(index) => index.save(out),
            AnyIndex::Ivf(index) => index.save(out),
            AnyIndex::Annoy(index) => index.save(out),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AnyIndex::Flat(index) => index.name(),
            AnyIndex::Ivf(index) => index.name(),
            AnyIndex::Annoy(index) => index.name(),
        }
    }
}

impl From<FlatIndex> for AnyIndex {
    fn from(index: FlatIndex) -> Self {
        AnyIndex::Flat(index)
    }
}

impl From<IvfIndex> for AnyIndex {
    fn from(index: IvfIndex) -> Self {
        AnyIndex::Ivf(index)
    }
}

impl From<AnnoyIndex> for AnyIndex {
    fn from(index: AnnoyIndex) -> Self {
        AnyIndex::Annoy(index)
    }
}

/// Score candidates against the query, stable-sort ascending, keep the top
/// `min(k, |candidates|)`. Stable sort keeps insertion order on exact ties.
pub(crate) fn rank_by_distance(
    data: &[Vec<f32>],
    query: &[f32],
    candidates: impl IntoIterator<Item = usize>,
    k: usize,
) -> SearchResults {
    let mut scores: Vec<(usize, f32)> = candidates
        .into_iter()
        .map(|id| (id, math::squared_euclidean(query, &data[id])))
        .collect();

    scores.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));

    let limit = k.min(scores.len());
    let mut results = SearchResults {
        ids: Vec::with_capacity(limit),
        distances: Vec::with_capacity(limit),
    };
    for &(id, distance) in &scores[..limit] {
        results.ids.push(id);
        results.distances.push(distance);
    }
    results
}
