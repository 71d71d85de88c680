//! Search orchestrator
//!
//! Runs a read-locked top-k query against a library's index, applies
//! metadata filters and the optional similarity floor, and hydrates the
//! surviving hits with their chunk and owning document. The index reports
//! native cosine scores; everything above the index contract — filter
//! construction, the floor, truncation to k — happens here.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::constants::{K_MAX, LSH_OVERSAMPLE};
use crate::error::{Result, VectorDbError};
use crate::index::IndexType;
use crate::math;
use crate::model::{Chunk, Document, LibraryId};
use crate::store::Database;

/// One search request against a library
#[derive(Debug, Clone, Deserialize)]
pub struct SearchRequest {
    pub embedding: Vec<f32>,
    pub k: usize,
    /// Equality filters over chunk metadata (typed fields, tags, extra)
    #[serde(default)]
    pub metadata_filters: HashMap<String, String>,
    /// Drop results scoring below this floor; must lie in [0, 1]
    #[serde(default)]
    pub similarity_threshold: Option<f32>,
}

/// One hydrated search result
#[derive(Debug, Clone, Serialize)]
pub struct SearchMatch {
    pub chunk: Chunk,
    pub document: Document,
    pub similarity_score: f32,
}

impl Database {
    /// Top-k cosine search over an indexed library
    pub async fn search(
        &self,
        library_id: LibraryId,
        request: SearchRequest,
    ) -> Result<Vec<SearchMatch>> {
        if request.k < 1 || request.k > K_MAX {
            return Err(VectorDbError::validation(format!(
                "k must be between 1 and {K_MAX}, got {}",
                request.k
            )));
        }
        if let Some(threshold) = request.similarity_threshold {
            if !(0.0..=1.0).contains(&threshold) || threshold.is_nan() {
                return Err(VectorDbError::validation(format!(
                    "similarity_threshold must lie in [0, 1], got {threshold}"
                )));
            }
        }
        math::validate_vector(&request.embedding, None)?;

        let cell = self.cell(library_id).await?;
        let state = cell.lock.read().await;

        // is_indexed may have flipped between validation and locking; the
        // check under the read lock is authoritative
        let index = match (&state.index, state.library.is_indexed) {
            (Some(index), true) => index,
            _ => return Err(VectorDbError::not_indexed(library_id)),
        };
        if let Some(expected) = state.library.embedding_dimension {
            math::validate_vector(&request.embedding, Some(expected))?;
        }

        let filters = &request.metadata_filters;
        let predicate = |id: crate::model::ChunkId| {
            state
                .chunks
                .get(&id)
                .map(|chunk| {
                    filters
                        .iter()
                        .all(|(key, value)| chunk.metadata.matches_filter(key, value))
                })
                .unwrap_or(false)
        };
        let filter: Option<crate::index::ChunkFilter> = if filters.is_empty() {
            None
        } else {
            Some(&predicate)
        };

        // LSH loses candidates to bucketing; oversample before the floor
        let oversample = match index.index_type() {
            IndexType::RpLsh => LSH_OVERSAMPLE,
            IndexType::Flat | IndexType::Hierarchical => 1,
        };
        let hits = index.search(&request.embedding, request.k * oversample, filter);

        let floor = request.similarity_threshold.unwrap_or(f32::MIN);
        let mut matches = Vec::with_capacity(request.k.min(hits.len()));
        for hit in hits {
            if hit.score < floor {
                continue;
            }
            let chunk = state.chunks.get(&hit.id).ok_or_else(|| {
                VectorDbError::internal("index returned a chunk id missing from the store")
            })?;
            let document = state.documents.get(&chunk.document_id).ok_or_else(|| {
                VectorDbError::internal("chunk references a document missing from the store")
            })?;
            matches.push(SearchMatch {
                chunk: chunk.clone(),
                document: document.clone(),
                similarity_score: hit.score,
            });
            if matches.len() == request.k {
                break;
            }
        }
        Ok(matches)
    }
}
