//! Vegam – In-memory vector database with pluggable index strategies
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      VegamDb Orchestrator                   │
//! │      search routing · lazy Flat fallback · tagged I/O       │
//! ├───────────────────┬──────────────────┬──────────────────────┤
//! │     FlatIndex     │     IvfIndex     │      AnnoyIndex      │
//! │   exact scan      │  KMeans buckets  │  projection forest   │
//! ├───────────────────┴──────────────────┴──────────────────────┤
//! │          VectorStore (append-only, dense IDs)               │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Vectors are fixed-dimension `f32` rows with dense insertion-order IDs.
//! All ranking uses squared Euclidean distance. The store plus the currently
//! installed index persist to a single binary file; a length-prefixed type
//! tag after the store section selects the variant on load.

pub mod db;
pub mod index;
pub mod kmeans;
pub mod math;
pub mod store;
mod wire;

pub use db::{DbError, VegamDb};
pub use index::{
    AnnoyIndex, AnyIndex, FlatIndex, Index, IndexError, IvfIndex, SearchParams, SearchResults,
};
pub use kmeans::{KMeans, KMeansResult};
pub use store::{StoreError, VectorStore};
