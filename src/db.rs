//! VegamDb orchestrator
//!
//! Owns the vector store and at most one installed index, routes every query
//! through the index (installing a brute-force [`FlatIndex`] on demand), and
//! persists both to a single binary file.
//!
//! # File layout
//!
//! ```text
//! Offset   Size        Description
//! ─────────────────────────────────────────────
//! 0        8 + N·D·4   VectorStore section (rows, cols, data)
//! …        4           name_len: i32 (omitted when no index is installed)
//! …        name_len    index type tag, UTF-8 ("FlatIndex" | "IVFIndex" | "AnnoyIndex")
//! …        …           index section (variant-specific, empty for Flat)
//! ```
//!
//! A file that ends after the store section loads as a database with no
//! index installed.
//!
//! Appending vectors after an index was built leaves the index stale; the
//! orchestrator does not rebuild on its own. Callers either rebuild
//! explicitly or accept results over the old snapshot.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use thiserror::Error;

use crate::index::{annoy, flat, ivf};
use crate::index::{
    AnnoyIndex, AnyIndex, FlatIndex, Index, IndexError, IvfIndex, SearchParams, SearchResults,
};
use crate::store::{StoreError, VectorStore};
use crate::wire;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("No index installed")]
    NoIndexInstalled,

    #[error("Unknown index kind in file: {name:?}")]
    UnknownIndexKind { name: String },
}

/// In-memory vector database with one pluggable index.
#[derive(Debug, Default)]
pub struct VegamDb {
    store: VectorStore,
    index: Option<AnyIndex>,
}

impl VegamDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one vector. Any previously built index becomes stale.
    pub fn add(&mut self, vec: Vec<f32>) -> Result<(), DbError> {
        self.store.add(vec)?;
        Ok(())
    }

    /// Bulk-load from a flat row-major buffer of `n_vectors · dim` floats.
    pub fn add_batch(&mut self, flat: &[f32], n_vectors: usize, dim: usize) -> Result<(), DbError> {
        self.store.add_batch(flat, n_vectors, dim)?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.store.dimension()
    }

    pub fn store(&self) -> &VectorStore {
        &self.store
    }

    pub fn index(&self) -> Option<&AnyIndex> {
        self.index.as_ref()
    }

    /// Install an index, dropping any previous one and its derived state.
    pub fn set_index(&mut self, index: impl Into<AnyIndex>) {
        self.index = Some(index.into());
    }

    /// Build the installed index over the current store contents.
    pub fn build_index(&mut self) -> Result<(), DbError> {
        let index = self.index.as_mut().ok_or(DbError::NoIndexInstalled)?;
        index.build(self.store.vectors());
        Ok(())
    }

    /// k-NN query routed through the installed index.
    ///
    /// Routing: a trained index answers directly; an installed-but-untrained
    /// index is built first; with no index installed a [`FlatIndex`] is
    /// installed lazily. Distances in the result are squared Euclidean.
    pub fn search(
        &mut self,
        query: &[f32],
        k: usize,
        params: Option<&SearchParams>,
    ) -> Result<SearchResults, DbError> {
        if !self.store.is_empty() && query.len() != self.store.dimension() {
            return Err(StoreError::DimensionMismatch {
                expected: self.store.dimension(),
                actual: query.len(),
            }
            .into());
        }

        let index = self
            .index
            .get_or_insert_with(|| AnyIndex::Flat(FlatIndex::new()));
        if !index.is_trained() {
            index.build(self.store.vectors());
        }

        Ok(index.search(self.store.vectors(), query, k, params)?)
    }

    /// Write the store and the installed index to a single file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), DbError> {
        let file = File::create(path.as_ref())?;
        let mut out = BufWriter::new(file);

        self.store.save(&mut out)?;

        if let Some(index) = &self.index {
            let name = index.name();
            wire::write_i32(&mut out, name.len() as i32)?;
            out.write_all(name.as_bytes())?;
            index.save(&mut out)?;
        }

        out.flush()?;
        tracing::info!(
            path = %path.as_ref().display(),
            vectors = self.store.len(),
            index = self.index.as_ref().map(|i| i.name()).unwrap_or("none"),
            "database saved"
        );
        Ok(())
    }

    /// Read a database back from [`save`](Self::save) output. The index tag
    /// selects the variant to reconstruct; a file without a tag section
    /// yields a database with no index.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DbError> {
        let file = File::open(path.as_ref())?;
        let mut input = BufReader::new(file);

        let store = VectorStore::load(&mut input)?;

        let index = match wire::read_i32(&mut input) {
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => None,
            Err(e) => return Err(e.into()),
            Ok(name_len) if name_len > 0 => {
                let mut name_buf = vec![0u8; name_len as usize];
                input.read_exact(&mut name_buf)?;
                let name = String::from_utf8_lossy(&name_buf);

                let index = match name.as_ref() {
                    flat::NAME => AnyIndex::Flat(FlatIndex::load(&mut input)?),
                    ivf::NAME => AnyIndex::Ivf(IvfIndex::load(&mut input)?),
                    annoy::NAME => AnyIndex::Annoy(AnnoyIndex::load(&mut input)?),
                    _ => {
                        return Err(DbError::UnknownIndexKind {
                            name: name.into_owned(),
                        })
                    }
                };
                Some(index)
            }
            Ok(_) => None,
        };

        tracing::info!(
            path = %path.as_ref().display(),
            vectors = store.len(),
            index = index.as_ref().map(|i| i.name()).unwrap_or("none"),
            "database loaded"
        );
        Ok(Self { store, index })
    }
}
