//! ANN index family
//!
//! Three interchangeable index structures over a snapshot of
//! `(chunk_id, vector)` pairs: an exact linear scan, a sign-random-projection
//! LSH, and a hierarchical small-world graph. An index is built one-shot and
//! immutable afterwards; reindexing replaces the instance. Each library owns
//! at most one [`AnnIndex`] at a time.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::str::FromStr;

use crate::constants::{
    DEFAULT_EF_CONSTRUCTION, DEFAULT_EF_SEARCH, DEFAULT_HNSW_M, DEFAULT_LSH_BITS,
    DEFAULT_LSH_POOL_FACTOR, DEFAULT_LSH_TABLES, MAX_EF, MAX_LSH_TABLES,
};
use crate::error::VectorDbError;
use crate::model::ChunkId;

mod flat;
mod hnsw;
mod lsh;

pub use flat::FlatIndex;
pub use hnsw::HierarchicalIndex;
pub use lsh::RpLshIndex;

/// Index structure selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexType {
    Flat,
    RpLsh,
    Hierarchical,
}

impl IndexType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexType::Flat => "flat",
            IndexType::RpLsh => "rp_lsh",
            IndexType::Hierarchical => "hierarchical",
        }
    }
}

impl std::fmt::Display for IndexType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IndexType {
    type Err = VectorDbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "flat" => Ok(IndexType::Flat),
            "rp_lsh" => Ok(IndexType::RpLsh),
            "hierarchical" => Ok(IndexType::Hierarchical),
            other => Err(VectorDbError::unsupported_index_type(other)),
        }
    }
}

/// Build-time parameters; defaults come from [`crate::constants`]
///
/// The seed drives every random decision during a build (LSH planes, HNSW
/// level sampling), so rebuilding an identical snapshot with the same
/// parameters produces an identical index.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct IndexParams {
    pub seed: u64,
    /// Number of LSH hash tables (L)
    pub lsh_tables: usize,
    /// Bits per LSH signature (H)
    pub lsh_bits: usize,
    /// Candidate pool inflation factor for LSH probing (P)
    pub lsh_pool_factor: usize,
    /// Max neighbors per HNSW node on upper layers (M); base layer gets 2M
    pub m: usize,
    /// Beam width during HNSW construction
    pub ef_construction: usize,
    /// Beam width during HNSW search
    pub ef_search: usize,
}

impl Default for IndexParams {
    fn default() -> Self {
        Self {
            seed: 0,
            lsh_tables: DEFAULT_LSH_TABLES,
            lsh_bits: DEFAULT_LSH_BITS,
            lsh_pool_factor: DEFAULT_LSH_POOL_FACTOR,
            m: DEFAULT_HNSW_M,
            ef_construction: DEFAULT_EF_CONSTRUCTION,
            ef_search: DEFAULT_EF_SEARCH,
        }
    }
}

impl IndexParams {
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            ..Default::default()
        }
    }

    /// Clamp caller-supplied values so a misconfigured build cannot exhaust
    /// memory. Signature bits are capped at 64 because bucket keys are u64.
    pub fn clamped(mut self) -> Self {
        self.lsh_tables = self.lsh_tables.clamp(1, MAX_LSH_TABLES);
        self.lsh_bits = self.lsh_bits.clamp(1, 64);
        self.lsh_pool_factor = self.lsh_pool_factor.max(1);
        self.m = self.m.clamp(2, 128);
        self.ef_construction = self.ef_construction.clamp(self.m, MAX_EF);
        self.ef_search = self.ef_search.clamp(1, MAX_EF);
        self
    }
}

/// One snapshot entry handed to a build
#[derive(Debug, Clone)]
pub struct IndexItem {
    pub id: ChunkId,
    pub vector: Vec<f32>,
}

/// One ranked search result emitted by an index
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub id: ChunkId,
    pub score: f32,
}

/// Opaque candidate predicate over chunk ids; candidates failing it are
/// dropped before emission
pub type ChunkFilter<'a> = &'a (dyn Fn(ChunkId) -> bool + Sync);

/// Ranking key shared by the index implementations: descending score with
/// ties broken by ascending chunk id, under f64 total order
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Scored {
    pub score: f64,
    pub id: ChunkId,
}

impl Eq for Scored {}

impl Ord for Scored {
    fn cmp(&self, other: &Self) -> Ordering {
        // Greater = better: higher score, then smaller id
        self.score
            .total_cmp(&other.score)
            .then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for Scored {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A library's owned index instance: a sealed variant over exactly three
/// implementations, replaced atomically on rebuild
#[derive(Debug)]
pub enum AnnIndex {
    Flat(FlatIndex),
    RpLsh(RpLshIndex),
    Hierarchical(HierarchicalIndex),
}

impl AnnIndex {
    /// One-shot construction from a snapshot; the instance is immutable
    /// thereafter
    pub fn build(index_type: IndexType, items: Vec<IndexItem>, params: IndexParams) -> Self {
        let params = params.clamped();
        match index_type {
            IndexType::Flat => AnnIndex::Flat(FlatIndex::build(items, params)),
            IndexType::RpLsh => AnnIndex::RpLsh(RpLshIndex::build(items, params)),
            IndexType::Hierarchical => {
                AnnIndex::Hierarchical(HierarchicalIndex::build(items, params))
            }
        }
    }

    /// Top-k by descending cosine similarity, ties by ascending chunk id.
    /// Scores are the index's native cosine values, untruncated; the
    /// orchestrator applies metadata filters and the similarity floor.
    pub fn search(&self, query: &[f32], k: usize, filter: Option<ChunkFilter>) -> Vec<SearchHit> {
        match self {
            AnnIndex::Flat(idx) => idx.search(query, k, filter),
            AnnIndex::RpLsh(idx) => idx.search(query, k, filter),
            AnnIndex::Hierarchical(idx) => idx.search(query, k, filter),
        }
    }

    pub fn index_type(&self) -> IndexType {
        match self {
            AnnIndex::Flat(_) => IndexType::Flat,
            AnnIndex::RpLsh(_) => IndexType::RpLsh,
            AnnIndex::Hierarchical(_) => IndexType::Hierarchical,
        }
    }

    /// Build metadata: the effective (clamped) parameters, seed included
    pub fn params(&self) -> &IndexParams {
        match self {
            AnnIndex::Flat(idx) => idx.params(),
            AnnIndex::RpLsh(idx) => idx.params(),
            AnnIndex::Hierarchical(idx) => idx.params(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            AnnIndex::Flat(idx) => idx.len(),
            AnnIndex::RpLsh(idx) => idx.len(),
            AnnIndex::Hierarchical(idx) => idx.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
