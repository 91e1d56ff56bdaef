//! Append-only vector storage
//!
//! The store owns every vector in the database as an ordered sequence of
//! equal-length `f32` rows. IDs are dense insertion indices starting at 0.
//! The dimension is inferred from the first insertion; every later vector
//! must match it.
//!
//! # Binary section
//!
//! ```text
//! rows : i32          number of vectors
//! cols : i32          dimension D
//! data : rows·cols f32, row-major, little endian
//! ```

use std::io::{self, Read, Write};

use thiserror::Error;

use crate::wire;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Flat buffer length mismatch: expected {expected} floats, got {actual}")]
    BufferSizeMismatch { expected: usize, actual: usize },
}

/// Append-only, exclusively owned vector storage.
///
/// Indexes never hold onto the store; they borrow `vectors()` for the
/// duration of a `build` or `search` call only.
#[derive(Debug, Clone, Default)]
pub struct VectorStore {
    data: Vec<Vec<f32>>,
    dimension: usize,
}

impl VectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one vector. The first insertion fixes the store dimension.
    pub fn add(&mut self, vec: Vec<f32>) -> Result<(), StoreError> {
        if self.data.is_empty() {
            self.dimension = vec.len();
        } else if vec.len() != self.dimension {
            return Err(StoreError::DimensionMismatch {
                expected: self.dimension,
                actual: vec.len(),
            });
        }

        self.data.push(vec);
        Ok(())
    }

    /// Bulk-load `n_vectors` rows of `dim` floats from a flat row-major buffer.
    pub fn add_batch(
        &mut self,
        flat: &[f32],
        n_vectors: usize,
        dim: usize,
    ) -> Result<(), StoreError> {
        let expected = n_vectors * dim;
        if flat.len() != expected {
            return Err(StoreError::BufferSizeMismatch {
                expected,
                actual: flat.len(),
            });
        }

        if self.data.is_empty() {
            self.dimension = dim;
        } else if dim != self.dimension {
            return Err(StoreError::DimensionMismatch {
                expected: self.dimension,
                actual: dim,
            });
        }

        self.data.reserve(n_vectors);
        for i in 0..n_vectors {
            self.data.push(flat[i * dim..(i + 1) * dim].to_vec());
        }
        Ok(())
    }

    /// Vector by ID, `None` past the end.
    pub fn get(&self, id: usize) -> Option<&[f32]> {
        self.data.get(id).map(|v| v.as_slice())
    }

    /// All vectors in insertion order. Borrowed by index build/search.
    pub fn vectors(&self) -> &[Vec<f32>] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Store dimension D, 0 while empty.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Iterate vectors in insertion order.
    pub fn iter(&self) -> VectorIter<'_> {
        VectorIter {
            store: self,
            id: 0,
        }
    }

    pub fn save<W: Write>(&self, out: &mut W) -> io::Result<()> {
        wire::write_i32(out, self.data.len() as i32)?;
        wire::write_i32(out, self.dimension as i32)?;

        for vector in &self.data {
            wire::write_f32_slice(out, vector)?;
        }
        Ok(())
    }

    pub fn load<R: Read>(input: &mut R) -> io::Result<Self> {
        let rows = wire::read_i32(input)?;
        let cols = wire::read_i32(input)?;
        if rows < 0 || cols < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Invalid store header: rows={rows}, cols={cols}"),
            ));
        }

        let dimension = cols as usize;
        let mut data = Vec::with_capacity(rows as usize);
        for _ in 0..rows {
            data.push(wire::read_f32_vec(input, dimension)?);
        }

        Ok(Self { data, dimension })
    }
}

/// Iterator over the vectors in a store.
pub struct VectorIter<'a> {
    store: &'a VectorStore,
    id: usize,
}

impl<'a> Iterator for VectorIter<'a> {
    type Item = &'a [f32];

    fn next(&mut self) -> Option<Self::Item> {
        let vec = self.store.get(self.id)?;
        self.id += 1;
        Some(vec)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.store.len() - self.id;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for VectorIter<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_dimension_inferred_from_first_add() {
        let mut store = VectorStore::new();
        assert_eq!(store.dimension(), 0);

        store.add(vec![1.0, 2.0, 3.0]).unwrap();
        assert_eq!(store.dimension(), 3);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(0), Some([1.0, 2.0, 3.0].as_slice()));
    }

    #[test]
    fn test_add_rejects_wrong_dimension() {
        let mut store = VectorStore::new();
        store.add(vec![1.0, 2.0]).unwrap();

        let result = store.add(vec![1.0, 2.0, 3.0]);
        assert!(matches!(
            result,
            Err(StoreError::DimensionMismatch {
                expected: 2,
                actual: 3
            })
        ));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_add_batch() {
        let mut store = VectorStore::new();
        let flat = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        store.add_batch(&flat, 3, 2).unwrap();

        assert_eq!(store.len(), 3);
        assert_eq!(store.dimension(), 2);
        assert_eq!(store.get(1), Some([3.0, 4.0].as_slice()));
    }

    #[test]
    fn test_add_batch_rejects_short_buffer() {
        let mut store = VectorStore::new();
        let result = store.add_batch(&[1.0, 2.0, 3.0], 2, 2);
        assert!(matches!(
            result,
            Err(StoreError::BufferSizeMismatch {
                expected: 4,
                actual: 3
            })
        ));
    }

    #[test]
    fn test_add_batch_rejects_wrong_dimension() {
        let mut store = VectorStore::new();
        store.add(vec![0.0, 0.0]).unwrap();

        let result = store.add_batch(&[1.0, 2.0, 3.0], 1, 3);
        assert!(matches!(result, Err(StoreError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_save_load_roundtrip() {
        let mut store = VectorStore::new();
        store.add(vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        store.add(vec![5.0, 6.0, 7.0, 8.0]).unwrap();

        let mut buf = Vec::new();
        store.save(&mut buf).unwrap();

        let loaded = VectorStore::load(&mut Cursor::new(buf)).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.dimension(), 4);
        assert_eq!(loaded.vectors(), store.vectors());
    }

    #[test]
    fn test_iterator() {
        let mut store = VectorStore::new();
        store.add(vec![1.0, 2.0]).unwrap();
        store.add(vec![3.0, 4.0]).unwrap();
        store.add(vec![5.0, 6.0]).unwrap();

        let collected: Vec<_> = store.iter().collect();
        assert_eq!(collected.len(), 3);
        assert_eq!(collected[0], &[1.0, 2.0]);
        assert_eq!(collected[2], &[5.0, 6.0]);
        assert_eq!(store.iter().len(), 3);
    }

    #[test]
    fn test_empty_store_roundtrip() {
        let store = VectorStore::new();
        let mut buf = Vec::new();
        store.save(&mut buf).unwrap();
        assert_eq!(buf.len(), 8); // rows + cols only

        let loaded = VectorStore::load(&mut Cursor::new(buf)).unwrap();
        assert!(loaded.is_empty());
        assert_eq!(loaded.dimension(), 0);
    }
}
