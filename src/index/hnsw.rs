//! Hierarchical small-world graph index
//!
//! A multi-layer proximity graph in the HNSW style. Nodes live in an arena
//! addressed by dense u32 handles; neighbor lists are per-node per-layer
//! vectors bounded by M (2M on the base layer). Construction inserts nodes
//! one at a time — greedy descent through the upper layers, then a bounded
//! beam search per layer with a diversity heuristic choosing which
//! candidates become edges. The level sampler and all tie-breaking are
//! driven by the build seed, so identical snapshots build identical graphs.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cmp::Reverse;
use std::collections::BinaryHeap;

use super::{ChunkFilter, IndexItem, IndexParams, Scored, SearchHit};
use crate::math;
use crate::model::ChunkId;

/// Hard cap on sampled levels; with mL = 1/ln(16) the geometric sampler
/// stays far below this for any realistic N
const MAX_LEVEL: usize = 16;

/// Internal ranking key: descending similarity, ties by ascending handle.
/// Handles follow snapshot order, which is deterministic.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Cand {
    sim: f64,
    handle: u32,
}

impl Eq for Cand {}

impl Ord for Cand {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.sim
            .total_cmp(&other.sim)
            .then_with(|| other.handle.cmp(&self.handle))
    }
}

impl PartialOrd for Cand {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug)]
pub struct HierarchicalIndex {
    ids: Vec<ChunkId>,
    vectors: Vec<Vec<f32>>,
    /// neighbors[handle][layer] -> neighbor handles; a node owns lists for
    /// layers 0..=its sampled level
    neighbors: Vec<Vec<Vec<u32>>>,
    entry_point: Option<u32>,
    top_level: usize,
    params: IndexParams,
}

impl HierarchicalIndex {
    pub fn build(items: Vec<IndexItem>, params: IndexParams) -> Self {
        let mut index = Self {
            ids: Vec::with_capacity(items.len()),
            vectors: Vec::with_capacity(items.len()),
            neighbors: Vec::with_capacity(items.len()),
            entry_point: None,
            top_level: 0,
            params,
        };

        let mut rng = StdRng::seed_from_u64(params.seed);
        let level_mult = 1.0 / (params.m as f64).ln();

        for item in items {
            let level = sample_level(&mut rng, level_mult);
            index.ids.push(item.id);
            index.vectors.push(item.vector);
            index.neighbors.push(vec![Vec::new(); level + 1]);
            let handle = (index.ids.len() - 1) as u32;
            index.insert(handle, level);
        }

        index
    }

    /// Wire a new node into the graph at its sampled level
    fn insert(&mut self, new: u32, level: usize) {
        let Some(mut ep) = self.entry_point else {
            self.entry_point = Some(new);
            self.top_level = level;
            return;
        };

        let query = self.vectors[new as usize].clone();

        // Greedy descent through layers above the new node's level
        for layer in ((level + 1)..=self.top_level).rev() {
            ep = self.greedy_closest(&query, ep, layer);
        }

        // Connect on each layer from min(level, top) down to 0
        for layer in (0..=level.min(self.top_level)).rev() {
            let found = self.search_layer(&query, ep, self.params.ef_construction, layer);
            let budget = self.max_neighbors(layer);
            let selected = self.select_diverse(&found, budget);

            for &nb in &selected {
                self.neighbors[new as usize][layer].push(nb);
                self.neighbors[nb as usize][layer].push(new);
                if self.neighbors[nb as usize][layer].len() > budget {
                    self.prune(nb, layer);
                }
            }

            if let Some(best) = found.first() {
                ep = best.handle;
            }
        }

        if level > self.top_level {
            self.entry_point = Some(new);
            self.top_level = level;
        }
    }

    /// Beam-width-1 descent: move to the most similar neighbor until no
    /// strict improvement remains
    fn greedy_closest(&self, query: &[f32], start: u32, layer: usize) -> u32 {
        let mut best = start;
        let mut best_sim = math::cosine(query, &self.vectors[best as usize]);
        loop {
            let mut improved = false;
            for &nb in &self.neighbors[best as usize][layer] {
                let sim = math::cosine(query, &self.vectors[nb as usize]);
                if sim > best_sim {
                    best = nb;
                    best_sim = sim;
                    improved = true;
                }
            }
            if !improved {
                return best;
            }
        }
    }

    /// Bounded beam search on one layer: returns up to `ef` candidates,
    /// best-first. Stops when the best unexplored frontier entry cannot
    /// beat the worst member of a full beam.
    fn search_layer(&self, query: &[f32], entry: u32, ef: usize, layer: usize) -> Vec<Cand> {
        let mut visited = vec![false; self.ids.len()];
        visited[entry as usize] = true;

        let entry_cand = Cand {
            sim: math::cosine(query, &self.vectors[entry as usize]),
            handle: entry,
        };
        let mut frontier: BinaryHeap<Cand> = BinaryHeap::new();
        let mut beam: BinaryHeap<Reverse<Cand>> = BinaryHeap::new();
        frontier.push(entry_cand);
        beam.push(Reverse(entry_cand));

        while let Some(current) = frontier.pop() {
            let worst = beam.peek().map(|Reverse(c)| c.sim).unwrap_or(f64::MIN);
            if beam.len() >= ef && current.sim < worst {
                break;
            }

            for &nb in &self.neighbors[current.handle as usize][layer] {
                if visited[nb as usize] {
                    continue;
                }
                visited[nb as usize] = true;
                let cand = Cand {
                    sim: math::cosine(query, &self.vectors[nb as usize]),
                    handle: nb,
                };
                let worst = beam.peek().map(|Reverse(c)| c.sim).unwrap_or(f64::MIN);
                if beam.len() < ef || cand.sim > worst {
                    frontier.push(cand);
                    beam.push(Reverse(cand));
                    if beam.len() > ef {
                        beam.pop();
                    }
                }
            }
        }

        let mut result: Vec<Cand> = beam.into_iter().map(|Reverse(c)| c).collect();
        result.sort_unstable_by(|a, b| b.cmp(a));
        result
    }

    /// Diversity heuristic: walk candidates best-first (each `sim` is the
    /// candidate's similarity to the base point) and keep one only if it is
    /// more similar to the base than to any already-kept neighbor;
    /// remaining slots are filled with the skipped candidates so sparse
    /// regions stay connected.
    fn select_diverse(&self, candidates: &[Cand], budget: usize) -> Vec<u32> {
        let mut selected: Vec<Cand> = Vec::with_capacity(budget);
        let mut skipped: Vec<Cand> = Vec::new();

        for &cand in candidates {
            if selected.len() >= budget {
                break;
            }
            let diverse = selected.iter().all(|kept| {
                let sim_to_kept = math::cosine(
                    &self.vectors[cand.handle as usize],
                    &self.vectors[kept.handle as usize],
                );
                cand.sim > sim_to_kept
            });
            if diverse {
                selected.push(cand);
            } else {
                skipped.push(cand);
            }
        }

        for cand in skipped {
            if selected.len() >= budget {
                break;
            }
            selected.push(cand);
        }

        selected.into_iter().map(|c| c.handle).collect()
    }

    /// Re-apply the diversity heuristic to an overflowing neighbor list
    fn prune(&mut self, node: u32, layer: usize) {
        let base = self.vectors[node as usize].clone();
        let mut candidates: Vec<Cand> = self.neighbors[node as usize][layer]
            .iter()
            .map(|&nb| Cand {
                sim: math::cosine(&base, &self.vectors[nb as usize]),
                handle: nb,
            })
            .collect();
        candidates.sort_unstable_by(|a, b| b.cmp(a));

        let budget = self.max_neighbors(layer);
        self.neighbors[node as usize][layer] = self.select_diverse(&candidates, budget);
    }

    fn max_neighbors(&self, layer: usize) -> usize {
        if layer == 0 {
            self.params.m * 2
        } else {
            self.params.m
        }
    }

    pub fn search(&self, query: &[f32], k: usize, filter: Option<ChunkFilter>) -> Vec<SearchHit> {
        if k == 0 || self.ids.is_empty() {
            return Vec::new();
        }
        let Some(mut ep) = self.entry_point else {
            return Vec::new();
        };

        for layer in (1..=self.top_level).rev() {
            ep = self.greedy_closest(query, ep, layer);
        }

        let ef = k.max(self.params.ef_search);
        let beam = self.search_layer(query, ep, ef, 0);

        let mut ranked: Vec<Scored> = beam
            .into_iter()
            .map(|c| Scored {
                score: c.sim,
                id: self.ids[c.handle as usize],
            })
            .filter(|s| filter.map(|accept| accept(s.id)).unwrap_or(true))
            .collect();
        ranked.sort_unstable_by(|a, b| b.cmp(a));
        ranked.truncate(k);
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

/// Geometric level sampler: floor(-ln(U) · mL), capped at [`MAX_LEVEL`]
fn sample_level(rng: &mut StdRng, level_mult: f64) -> usize {
    let u: f64 = rng.gen::<f64>().max(f64::MIN_POSITIVE);
    ((-u.ln() * level_mult).floor() as usize).min(MAX_LEVEL)
}
