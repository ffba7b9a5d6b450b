//! Exact nearest-neighbor index over fragment vectors.
//!
//! Vectors live in one flat row-major buffer; search is brute force by
//! Euclidean distance. Every row remembers the fragment position it belongs
//! to, so lookups stay correct after a dimension rebuild leaves older
//! fragments without a vector.

use compass_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// One search result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchHit {
    /// Fragment position the vector belongs to
    pub id: usize,

    /// Euclidean distance to the query
    pub distance: f32,
}

/// What `insert` did to the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// Rows appended to the existing index
    Appended { count: usize },

    /// The batch width differed; previous rows were discarded
    Rebuilt {
        previous_dimension: usize,
        discarded: usize,
        count: usize,
    },
}

/// Flat L2 vector index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VectorIndex {
    dimension: Option<usize>,
    ids: Vec<usize>,
    data: Vec<f32>,
}

impl VectorIndex {
    /// Create an empty index with no dimensionality yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of vectors held.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Width shared by every vector, once the first batch is in.
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    /// Fragment positions in insertion order.
    pub fn ids(&self) -> &[usize] {
        &self.ids
    }

    /// Append a batch whose vectors belong to fragments `first_id..`.
    ///
    /// The first batch fixes the dimensionality. A batch of a different width
    /// discards every existing row and starts over from the new width. The
    /// batch is validated before anything changes, so an error leaves the
    /// index untouched.
    pub fn insert(&mut self, first_id: usize, vectors: Vec<Vec<f32>>) -> AppResult<InsertOutcome> {
        let Some(width) = batch_width(&vectors)? else {
            return Ok(InsertOutcome::Appended { count: 0 });
        };

        match self.check_dimension(width) {
            Ok(()) => {
                self.dimension = Some(width);
                let count = self.push_rows(first_id, vectors);
                Ok(InsertOutcome::Appended { count })
            }
            Err(AppError::IndexDimensionMismatch { expected, actual }) => {
                let discarded = self.len();
                tracing::warn!(
                    "Index dimension changed ({} -> {}); rebuilding index and discarding {} vectors",
                    expected,
                    actual,
                    discarded
                );
                self.clear();
                self.dimension = Some(actual);
                let count = self.push_rows(first_id, vectors);
                Ok(InsertOutcome::Rebuilt {
                    previous_dimension: expected,
                    discarded,
                    count,
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Replace the whole index with vectors for fragments `first_id..`.
    pub fn rebuild(&mut self, first_id: usize, vectors: Vec<Vec<f32>>) -> AppResult<()> {
        let width = batch_width(&vectors)?;
        self.clear();
        if let Some(width) = width {
            self.dimension = Some(width);
            self.push_rows(first_id, vectors);
        }
        Ok(())
    }

    /// Drop every vector and forget the dimensionality.
    pub fn clear(&mut self) {
        self.dimension = None;
        self.ids.clear();
        self.data.clear();
    }

    /// Up to `k` nearest vectors by ascending Euclidean distance.
    ///
    /// `k` is clamped to the index size; ties keep insertion order.
    ///
    /// # Errors
    /// `AppError::IndexDimensionMismatch` if the query width differs from the
    /// index width.
    pub fn search(&self, query: &[f32], k: usize) -> AppResult<Vec<SearchHit>> {
        let Some(dimension) = self.dimension else {
            return Ok(Vec::new());
        };

        let k = k.min(self.len());
        if k == 0 {
            return Ok(Vec::new());
        }

        if query.len() != dimension {
            return Err(AppError::IndexDimensionMismatch {
                expected: dimension,
                actual: query.len(),
            });
        }

        let mut scored: Vec<(f32, usize)> = self
            .data
            .chunks_exact(dimension)
            .enumerate()
            .map(|(row, vector)| (squared_l2(query, vector), row))
            .collect();

        // Stable sort: equal distances stay in insertion order
        scored.sort_by(|a, b| a.0.total_cmp(&b.0));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(distance, row)| SearchHit {
                id: self.ids[row],
                distance: distance.sqrt(),
            })
            .collect())
    }

    /// Whether the layout is internally consistent and only refers to
    /// fragments below `fragment_count`.
    pub(crate) fn is_consistent_with(&self, fragment_count: usize) -> bool {
        let rows_match = match self.dimension {
            Some(d) => d > 0 && self.data.len() == d * self.ids.len(),
            None => self.ids.is_empty() && self.data.is_empty(),
        };
        rows_match && self.ids.iter().all(|&id| id < fragment_count)
    }

    fn check_dimension(&self, width: usize) -> AppResult<()> {
        match self.dimension {
            Some(expected) if expected != width => Err(AppError::IndexDimensionMismatch {
                expected,
                actual: width,
            }),
            _ => Ok(()),
        }
    }

    fn push_rows(&mut self, first_id: usize, vectors: Vec<Vec<f32>>) -> usize {
        let count = vectors.len();
        for (offset, vector) in vectors.into_iter().enumerate() {
            self.ids.push(first_id + offset);
            self.data.extend(vector);
        }
        count
    }
}

/// Shared width of a batch, `None` for an empty batch.
fn batch_width(vectors: &[Vec<f32>]) -> AppResult<Option<usize>> {
    let Some(first) = vectors.first() else {
        return Ok(None);
    };

    let width = first.len();
    if width == 0 {
        return Err(AppError::Knowledge(
            "Cannot index zero-width vectors".to_string(),
        ));
    }

    if let Some(bad) = vectors.iter().find(|v| v.len() != width) {
        return Err(AppError::IndexDimensionMismatch {
            expected: width,
            actual: bad.len(),
        });
    }

    Ok(Some(width))
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_with(vectors: Vec<Vec<f32>>) -> VectorIndex {
        let mut index = VectorIndex::new();
        index.insert(0, vectors).unwrap();
        index
    }

    #[test]
    fn test_empty_index_search() {
        let index = VectorIndex::new();
        assert!(index.search(&[1.0, 2.0], 3).unwrap().is_empty());
        assert_eq!(index.dimension(), None);
    }

    #[test]
    fn test_first_batch_sets_dimension() {
        let index = index_with(vec![vec![0.0, 1.0, 2.0]; 4]);
        assert_eq!(index.dimension(), Some(3));
        assert_eq!(index.len(), 4);
        assert_eq!(index.ids(), &[0, 1, 2, 3]);
    }

    #[test]
    fn test_search_orders_by_distance() {
        let index = index_with(vec![vec![10.0, 0.0], vec![1.0, 0.0], vec![5.0, 0.0]]);
        let hits = index.search(&[0.0, 0.0], 3).unwrap();

        let ids: Vec<usize> = hits.iter().map(|h| h.id).collect();
        assert_eq!(ids, vec![1, 2, 0]);
        assert!((hits[0].distance - 1.0).abs() < 1e-6);
        assert!((hits[2].distance - 10.0).abs() < 1e-6);
    }

    #[test]
    fn test_k_clamped_to_size() {
        let index = index_with(vec![vec![1.0], vec![2.0]]);
        assert_eq!(index.search(&[0.0], 10).unwrap().len(), 2);
        assert!(index.search(&[0.0], 0).unwrap().is_empty());
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let index = index_with(vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![-1.0, 0.0]]);
        let hits = index.search(&[0.0, 0.0], 3).unwrap();
        let ids: Vec<usize> = hits.iter().map(|h| h.id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn test_appends_continue_ids() {
        let mut index = index_with(vec![vec![0.0, 0.0]]);
        let outcome = index.insert(1, vec![vec![1.0, 1.0], vec![2.0, 2.0]]).unwrap();

        assert_eq!(outcome, InsertOutcome::Appended { count: 2 });
        assert_eq!(index.ids(), &[0, 1, 2]);
    }

    #[test]
    fn test_width_change_rebuilds() {
        let mut index = index_with(vec![vec![0.0; 4]; 3]);
        let outcome = index.insert(3, vec![vec![1.0; 8]; 2]).unwrap();

        assert_eq!(
            outcome,
            InsertOutcome::Rebuilt {
                previous_dimension: 4,
                discarded: 3,
                count: 2
            }
        );
        assert_eq!(index.dimension(), Some(8));
        assert_eq!(index.ids(), &[3, 4]);
    }

    #[test]
    fn test_ragged_batch_rejected_without_change() {
        let mut index = index_with(vec![vec![0.0, 0.0]]);
        let before = index.clone();

        let result = index.insert(1, vec![vec![1.0, 1.0], vec![1.0]]);
        assert!(matches!(
            result,
            Err(AppError::IndexDimensionMismatch {
                expected: 2,
                actual: 1
            })
        ));
        assert_eq!(index, before);
    }

    #[test]
    fn test_query_width_mismatch() {
        let index = index_with(vec![vec![0.0, 0.0]]);
        assert!(matches!(
            index.search(&[0.0, 0.0, 0.0], 1),
            Err(AppError::IndexDimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_rebuild_replaces_everything() {
        let mut index = index_with(vec![vec![0.0, 0.0]; 2]);
        index.rebuild(0, vec![vec![1.0, 2.0, 3.0]; 3]).unwrap();

        assert_eq!(index.dimension(), Some(3));
        assert_eq!(index.ids(), &[0, 1, 2]);
        assert!(index.is_consistent_with(3));
        assert!(!index.is_consistent_with(2));
    }

    #[test]
    fn test_search_is_deterministic() {
        let index = index_with(vec![vec![0.3, 0.1], vec![0.2, 0.2], vec![0.1, 0.3]]);
        let first = index.search(&[0.2, 0.1], 2).unwrap();
        let second = index.search(&[0.2, 0.1], 2).unwrap();
        assert_eq!(first, second);
    }
}
