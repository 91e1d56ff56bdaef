//! Annoy-style random-projection forest
//!
//! Each tree recursively splits the dataset with a hyperplane through the
//! midpoint of two randomly chosen vectors, perpendicular to their
//! difference. Recursion stops once a subset fits in a leaf of `k_leaf` IDs,
//! or earlier when a split leaves one side empty: all-duplicate or colinear
//! data collapses into an oversized leaf instead of recursing forever.
//!
//! Queries collect candidate IDs from the forest in one of two modes, then
//! re-rank them exactly:
//!
//! - **Greedy**: descend each tree by margin sign, one leaf per tree.
//! - **Best-first**: a max-heap over `(score, node)` pairs across all trees,
//!   where a node's score is the tightest half-space margin seen on its path.
//!   Popping stops once `search_k` candidates are pooled.
//!
//! # Binary section
//!
//! ```text
//! use_priority_queue : bool (1 byte)
//! num_trees          : i32
//! dimension          : i32
//! k_leaf             : i32
//! search_k           : i32
//! trees              : num_trees × node (pre-order)
//!
//! node: leaf bool, then either
//!   bucket_size i32, bucket_size i32 IDs          (leaf)
//!   dimension f32 (w), bias f32, left, right      (inner)
//! ```

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::io::{self, Read, Write};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use super::{rank_by_distance, Index, IndexError, SearchParams, SearchResults};
use crate::math;
use crate::wire;

pub(crate) const NAME: &str = "AnnoyIndex";

/// Splitting plane with signed margin `m(x) = ⟨w, x⟩ + bias`.
#[derive(Debug, Clone, PartialEq)]
pub struct Hyperplane {
    pub w: Vec<f32>,
    pub bias: f32,
}

impl Hyperplane {
    /// Plane perpendicular to `a − b` through the midpoint `(a + b) / 2`.
    fn between(a: &[f32], b: &[f32]) -> Self {
        let mut w = Vec::with_capacity(a.len());
        let mut bias = 0.0f32;
        for (&x, &y) in a.iter().zip(b) {
            let diff = x - y;
            w.push(diff);
            bias += diff * (x + y) / 2.0;
        }
        Self { w, bias: -bias }
    }

    #[inline]
    fn margin(&self, x: &[f32]) -> f32 {
        math::dot(&self.w, x) + self.bias
    }
}

/// Node in a projection tree. Inner nodes exclusively own their children,
/// so dropping a root tears down the whole subtree.
#[derive(Debug, Clone, PartialEq)]
pub enum AnnoyNode {
    Leaf {
        bucket: Vec<usize>,
    },
    Inner {
        plane: Hyperplane,
        left: Box<AnnoyNode>,
        right: Box<AnnoyNode>,
    },
}

/// Heap entry for best-first traversal: max-heap keyed on the path score.
struct ScoredNode<'a> {
    score: f32,
    node: &'a AnnoyNode,
}

impl PartialEq for ScoredNode<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.score == other.score
    }
}

impl Eq for ScoredNode<'_> {}

impl Ord for ScoredNode<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .partial_cmp(&other.score)
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for ScoredNode<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Clone)]
pub struct AnnoyIndex {
    roots: Vec<AnnoyNode>,
    dimension: usize,
    num_trees: usize,
    k_leaf: usize,
    /// Candidate target for best-first search, `num_trees * k_leaf` unless
    /// overridden.
    search_k: usize,
    use_priority_queue: bool,
    seed: Option<u64>,
}

impl AnnoyIndex {
    pub fn new(dimension: usize, num_trees: usize, k_leaf: usize) -> Self {
        Self {
            roots: Vec::new(),
            dimension,
            num_trees,
            k_leaf,
            search_k: num_trees * k_leaf,
            use_priority_queue: false,
            seed: None,
        }
    }

    /// Override the default candidate target (`num_trees * k_leaf`).
    pub fn with_search_k(mut self, search_k: usize) -> Self {
        self.search_k = search_k;
        self
    }

    /// Use best-first heap traversal by default instead of greedy descent.
    pub fn with_priority_queue(mut self, enabled: bool) -> Self {
        self.use_priority_queue = enabled;
        self
    }

    /// Fix the build RNG; tree `i` derives its own engine from `seed + i`.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn num_trees(&self) -> usize {
        self.num_trees
    }

    pub fn roots(&self) -> &[AnnoyNode] {
        &self.roots
    }

    fn build_tree(data: &[Vec<f32>], mut ids: Vec<usize>, k_leaf: usize, rng: &mut StdRng) -> AnnoyNode {
        if ids.len() <= k_leaf || ids.len() < 2 {
            return AnnoyNode::Leaf { bucket: ids };
        }

        ids.shuffle(rng);
        let plane = Hyperplane::between(&data[ids[0]], &data[ids[1]]);

        let mut left_ids = Vec::new();
        let mut right_ids = Vec::new();
        for &id in &ids {
            if plane.margin(&data[id]) > 0.0 {
                left_ids.push(id);
            } else {
                right_ids.push(id);
            }
        }

        // One-sided split: colinear or duplicated points. Stop here with an
        // oversized leaf rather than recursing on the same subset forever.
        if left_ids.is_empty() {
            return AnnoyNode::Leaf { bucket: right_ids };
        }
        if right_ids.is_empty() {
            return AnnoyNode::Leaf { bucket: left_ids };
        }

        AnnoyNode::Inner {
            plane,
            left: Box::new(Self::build_tree(data, left_ids, k_leaf, rng)),
            right: Box::new(Self::build_tree(data, right_ids, k_leaf, rng)),
        }
    }

    /// One leaf per tree, following the margin sign from the root.
    fn collect_greedy(&self, query: &[f32], candidates: &mut Vec<usize>) {
        for root in &self.roots {
            let mut current = root;
            loop {
                match current {
                    AnnoyNode::Leaf { bucket } => {
                        candidates.extend_from_slice(bucket);
                        break;
                    }
                    AnnoyNode::Inner { plane, left, right } => {
                        current = if plane.margin(query) >= 0.0 {
                            left
                        } else {
                            right
                        };
                    }
                }
            }
        }
    }

    /// Best-first traversal across all trees at once. A child inherits
    /// `min(parent score, its own side's margin)`, so subtrees whose splits
    /// kept the query deep inside a half-space are expanded first.
    fn collect_best_first(&self, query: &[f32], search_k: usize, candidates: &mut Vec<usize>) {
        let mut heap = BinaryHeap::with_capacity(self.roots.len() * 2);
        for root in &self.roots {
            heap.push(ScoredNode {
                score: f32::MAX,
                node: root,
            });
        }

        while candidates.len() < search_k {
            let Some(ScoredNode { score, node }) = heap.pop() else {
                break;
            };

            match node {
                AnnoyNode::Leaf { bucket } => candidates.extend_from_slice(bucket),
                AnnoyNode::Inner { plane, left, right } => {
                    let margin = plane.margin(query);
                    heap.push(ScoredNode {
                        score: score.min(margin),
                        node: left,
                    });
                    heap.push(ScoredNode {
                        score: score.min(-margin),
                        node: right,
                    });
                }
            }
        }
    }

    fn save_node<W: Write>(out: &mut W, node: &AnnoyNode) -> io::Result<()> {
        match node {
            AnnoyNode::Leaf { bucket } => {
                wire::write_bool(out, true)?;
                wire::write_id_list(out, bucket)?;
            }
            AnnoyNode::Inner { plane, left, right } => {
                wire::write_bool(out, false)?;
                wire::write_f32_slice(out, &plane.w)?;
                wire::write_f32(out, plane.bias)?;
                // Pre-order: left subtree is fully written before right.
                Self::save_node(out, left)?;
                Self::save_node(out, right)?;
            }
        }
        Ok(())
    }

    fn load_node<R: Read>(input: &mut R, dimension: usize) -> io::Result<AnnoyNode> {
        let leaf = wire::read_bool(input)?;

        if leaf {
            let bucket = wire::read_id_list(input)?;
            Ok(AnnoyNode::Leaf { bucket })
        } else {
            let w = wire::read_f32_vec(input, dimension)?;
            let bias = wire::read_f32(input)?;
            let left = Self::load_node(input, dimension)?;
            let right = Self::load_node(input, dimension)?;
            Ok(AnnoyNode::Inner {
                plane: Hyperplane { w, bias },
                left: Box::new(left),
                right: Box::new(right),
            })
        }
    }
}

impl Index for AnnoyIndex {
    fn build(&mut self, data: &[Vec<f32>]) {
        self.roots.clear();
        self.roots.reserve(self.num_trees);

        for tree in 0..self.num_trees {
            let mut rng = math::random_engine(self.seed.map(|s| s + tree as u64));
            let ids: Vec<usize> = (0..data.len()).collect();
            self.roots
                .push(Self::build_tree(data, ids, self.k_leaf, &mut rng));
        }

        tracing::debug!(
            trees = self.roots.len(),
            vectors = data.len(),
            k_leaf = self.k_leaf,
            "annoy forest built"
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

        let (search_k, use_priority_queue) = match params {
            None => (self.search_k, self.use_priority_queue),
            Some(SearchParams::Annoy {
                search_k,
                use_priority_queue,
            }) => (*search_k, *use_priority_queue),
            Some(_) => return Err(IndexError::ParamKindMismatch { index: NAME }),
        };

        let mut candidates = Vec::new();
        if use_priority_queue {
            self.collect_best_first(query, search_k, &mut candidates);
        } else {
            self.collect_greedy(query, &mut candidates);
        }

        // The same ID can surface from several trees.
        candidates.sort_unstable();
        candidates.dedup();

        Ok(rank_by_distance(data, query, candidates, k))
    }

    fn is_trained(&self) -> bool {
        !self.roots.is_empty()
    }

    fn save<W: Write>(&self, out: &mut W) -> io::Result<()> {
        wire::write_bool(out, self.use_priority_queue)?;
        wire::write_i32(out, self.roots.len() as i32)?;
        wire::write_i32(out, self.dimension as i32)?;
        wire::write_i32(out, self.k_leaf as i32)?;
        wire::write_i32(out, self.search_k as i32)?;

        for root in &self.roots {
            Self::save_node(out, root)?;
        }
        Ok(())
    }

    fn load<R: Read>(input: &mut R) -> io::Result<Self> {
        let use_priority_queue = wire::read_bool(input)?;
        let num_trees = wire::read_i32(input)?;
        let dimension = wire::read_i32(input)?;
        let k_leaf = wire::read_i32(input)?;
        let search_k = wire::read_i32(input)?;
        if num_trees < 0 || dimension < 0 || k_leaf < 0 || search_k < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Invalid Annoy header: num_trees={num_trees}, dimension={dimension}"),
            ));
        }

        let dimension = dimension as usize;
        let mut roots = Vec::with_capacity(num_trees as usize);
        for _ in 0..num_trees {
            roots.push(Self::load_node(input, dimension)?);
        }

        Ok(Self {
            roots,
            dimension,
            num_trees: num_trees as usize,
            k_leaf: k_leaf as usize,
            search_k: search_k as usize,
            use_priority_queue,
            seed: None,
        })
    }

    fn name(&self) -> &'static str {
        NAME
    }
}
