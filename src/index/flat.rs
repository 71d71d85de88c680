//! Exact linear-scan index
//!
//! Stores the full N × D matrix and the parallel id list. Search computes
//! cosine against every row and keeps the best k in a bounded min-heap,
//! O(N·D) time and O(k) extra space. This is the correctness baseline the
//! approximate indexes are measured against.

use rayon::prelude::*;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

use super::{ChunkFilter, IndexItem, IndexParams, Scored, SearchHit};
use crate::math;
use crate::model::ChunkId;

/// Scoring runs in parallel only when a scan is large enough to amortize
/// the fork/join overhead
const PARALLEL_SCAN_THRESHOLD: usize = 2_048;

#[derive(Debug)]
pub struct FlatIndex {
    ids: Vec<ChunkId>,
    vectors: Vec<Vec<f32>>,
    params: IndexParams,
}

impl FlatIndex {
    pub fn build(items: Vec<IndexItem>, params: IndexParams) -> Self {
        let mut ids = Vec::with_capacity(items.len());
        let mut vectors = Vec::with_capacity(items.len());
        for item in items {
            ids.push(item.id);
            vectors.push(item.vector);
        }
        Self {
            ids,
            vectors,
            params,
        }
    }

    pub fn search(&self, query: &[f32], k: usize, filter: Option<ChunkFilter>) -> Vec<SearchHit> {
        if k == 0 || self.ids.is_empty() {
            return Vec::new();
        }

        // Per-row scores: the parallel pass is a pure element-wise map
        // collected in row order, so results are identical to the
        // sequential path.
        let scores: Vec<f64> = if self.vectors.len() >= PARALLEL_SCAN_THRESHOLD {
            self.vectors
                .par_iter()
                .map(|v| math::cosine(query, v))
                .collect()
        } else {
            self.vectors.iter().map(|v| math::cosine(query, v)).collect()
        };

        // Bounded min-heap of the k best candidates
        let mut heap: BinaryHeap<Reverse<Scored>> = BinaryHeap::with_capacity(k + 1);
        for (i, score) in scores.into_iter().enumerate() {
            let id = self.ids[i];
            if let Some(accept) = filter {
                if !accept(id) {
                    continue;
                }
            }
            heap.push(Reverse(Scored { score, id }));
            if heap.len() > k {
                heap.pop();
            }
        }

        let mut ranked: Vec<Scored> = heap.into_iter().map(|Reverse(s)| s).collect();
        ranked.sort_unstable_by(|a, b| b.cmp(a));
        ranked
            .into_iter()
            .map(|s| SearchHit {
                id: s.id,
                score: s.score as f32,
            })
            .collect()
    }

    pub fn params(&self) -> &IndexParams {
        &self.params
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }
}
