//! Sign-random-projection LSH index
//!
//! Cosine-oriented SimHash: L hash tables, each keyed by an H-bit signature
//! of the item against H standard-normal hyperplanes. A query gathers the
//! union of its matching buckets, widens to Hamming-distance-1 buckets while
//! the candidate pool is short of min(k·P, N), then re-ranks candidates by
//! exact cosine. All planes are drawn from a seeded StdRng recorded in the
//! build parameters, so builds are reproducible.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use super::{ChunkFilter, IndexItem, IndexParams, Scored, SearchHit};
use crate::math;
use crate::model::ChunkId;

#[derive(Debug)]
pub struct RpLshIndex {
    ids: Vec<ChunkId>,
    vectors: Vec<Vec<f32>>,
    /// One H × D plane matrix per table, row-major
    planes: Vec<Vec<f32>>,
    /// signature → item handles, per table
    tables: Vec<HashMap<u64, Vec<u32>>>,
    dim: usize,
    params: IndexParams,
}

impl RpLshIndex {
    pub fn build(items: Vec<IndexItem>, params: IndexParams) -> Self {
        let dim = items.first().map(|it| it.vector.len()).unwrap_or(0);
        let mut rng = StdRng::seed_from_u64(params.seed);

        let planes: Vec<Vec<f32>> = (0..params.lsh_tables)
            .map(|_| {
                (0..params.lsh_bits * dim)
                    .map(|_| StandardNormal.sample(&mut rng))
                    .collect()
            })
            .collect();

        let mut ids = Vec::with_capacity(items.len());
        let mut vectors = Vec::with_capacity(items.len());
        let mut tables: Vec<HashMap<u64, Vec<u32>>> = vec![HashMap::new(); params.lsh_tables];

        for (handle, item) in items.into_iter().enumerate() {
            for (t, plane) in planes.iter().enumerate() {
                let sig = signature(plane, params.lsh_bits, dim, &item.vector);
                tables[t].entry(sig).or_default().push(handle as u32);
            }
            ids.push(item.id);
            vectors.push(item.vector);
        }

        Self {
            ids,
            vectors,
            planes,
            tables,
            dim,
            params,
        }
    }

    pub fn search(&self, query: &[f32], k: usize, filter: Option<ChunkFilter>) -> Vec<SearchHit> {
        if k == 0 || self.ids.is_empty() {
            return Vec::new();
        }

        let n = self.ids.len();
        let target = (k * self.params.lsh_pool_factor).min(n);
        let sigs: Vec<u64> = self
            .planes
            .iter()
            .map(|plane| signature(plane, self.params.lsh_bits, self.dim, query))
            .collect();

        let mut seen = vec![false; n];
        let mut pool: Vec<u32> = Vec::with_capacity(target);

        // Exact buckets first
        for (t, sig) in sigs.iter().enumerate() {
            self.drain_bucket(t, *sig, &mut seen, &mut pool);
        }

        // Widen to Hamming-distance-1 buckets while the pool is short
        if pool.len() < target {
            'probe: for bit in 0..self.params.lsh_bits {
                for (t, sig) in sigs.iter().enumerate() {
                    self.drain_bucket(t, sig ^ (1u64 << bit), &mut seen, &mut pool);
                    if pool.len() >= target {
                        break 'probe;
                    }
                }
            }
        }

        // Exact cosine re-ranking of the candidate pool
        let mut heap: BinaryHeap<Reverse<Scored>> = BinaryHeap::with_capacity(k + 1);
        for handle in pool {
            let id = self.ids[handle as usize];
            if let Some(accept) = filter {
                if !accept(id) {
                    continue;
                }
            }
            let score = math::cosine(query, &self.vectors[handle as usize]);
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

    fn drain_bucket(&self, table: usize, sig: u64, seen: &mut [bool], pool: &mut Vec<u32>) {
        if let Some(bucket) = self.tables[table].get(&sig) {
            for &handle in bucket {
                if !seen[handle as usize] {
                    seen[handle as usize] = true;
                    pool.push(handle);
                }
            }
        }
    }

    pub fn params(&self) -> &IndexParams {
        &self.params
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }
}

/// H-bit signature of `v` against a row-major H × D plane matrix:
/// bit h is set iff the projection onto plane row h is non-negative
fn signature(plane: &[f32], bits: usize, dim: usize, v: &[f32]) -> u64 {
    let mut sig = 0u64;
    for h in 0..bits {
        let row = &plane[h * dim..(h + 1) * dim];
        if math::dot(row, v) >= 0.0 {
            sig |= 1u64 << h;
        }
    }
    sig
}
