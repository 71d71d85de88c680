//! Entity store: authoritative CRUD over libraries, documents, and chunks
//!
//! Concurrency follows a two-level discipline. A store-level mutex guards
//! the registry — the set of libraries plus the cross-library routing maps
//! (document id → library id, chunk id → library id) used to route
//! requests. Each library then owns a FIFO-fair reader-writer lock guarding
//! its documents, its chunks, and its index instance, so a search observes
//! a consistent snapshot: the index it queries matches the chunks it
//! hydrates. Lock order is always registry first, then library, so
//! cross-library operations cannot deadlock.
//!
//! Any mutation to a chunk or to a library's chunk-set drops the library's
//! index and clears `is_indexed` under the same write lock, atomically with
//! the mutation.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

use crate::constants::{MAX_CHUNKS_PER_LIBRARY, MAX_EMBEDDING_DIM, MAX_TEXT_LEN};
use crate::error::{Result, VectorDbError};
use crate::index::{AnnIndex, IndexItem, IndexParams, IndexType};
use crate::math;
use crate::model::{
    Chunk, ChunkId, ChunkMetadata, ChunkUpdate, Document, DocumentId, DocumentMetadata,
    DocumentUpdate, Library, LibraryId, LibraryMetadata, LibraryStats, LibraryUpdate, NewChunk,
    NewDocument, NewLibrary,
};

/// In-memory vector database: three entity levels plus one optional ANN
/// index per library
#[derive(Default)]
pub struct Database {
    registry: Mutex<Registry>,
}

#[derive(Default)]
struct Registry {
    libraries: HashMap<LibraryId, Arc<LibraryCell>>,
    document_routes: HashMap<DocumentId, LibraryId>,
    chunk_routes: HashMap<ChunkId, LibraryId>,
}

/// One library under its fair reader-writer lock
pub(crate) struct LibraryCell {
    pub(crate) lock: RwLock<LibraryState>,
}

/// Everything the library lock guards: the record, its entities, and the
/// owned index instance
pub(crate) struct LibraryState {
    pub(crate) library: Library,
    pub(crate) documents: HashMap<DocumentId, Document>,
    pub(crate) chunks: HashMap<ChunkId, Chunk>,
    pub(crate) index: Option<AnnIndex>,
}

impl LibraryState {
    /// Drop the index instance; called under the write lock together with
    /// every chunk-set mutation
    fn invalidate_index(&mut self) {
        if self.index.take().is_some() {
            debug!(library_id = %self.library.id, "index invalidated by mutation");
        }
        self.library.is_indexed = false;
    }
}

impl Database {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a library cell by id; the registry mutex is released before
    /// the caller touches the library lock
    pub(crate) async fn cell(&self, library_id: LibraryId) -> Result<Arc<LibraryCell>> {
        let registry = self.registry.lock().await;
        registry
            .libraries
            .get(&library_id)
            .cloned()
            .ok_or_else(|| VectorDbError::library_not_found(library_id))
    }

    /// Resolve the cell owning a document
    async fn cell_for_document(&self, document_id: DocumentId) -> Result<Arc<LibraryCell>> {
        let registry = self.registry.lock().await;
        let library_id = registry
            .document_routes
            .get(&document_id)
            .copied()
            .ok_or_else(|| VectorDbError::document_not_found(document_id))?;
        registry
            .libraries
            .get(&library_id)
            .cloned()
            .ok_or_else(|| VectorDbError::library_not_found(library_id))
    }

    /// Resolve the cell owning a chunk
    async fn cell_for_chunk(&self, chunk_id: ChunkId) -> Result<Arc<LibraryCell>> {
        let registry = self.registry.lock().await;
        let library_id = registry
            .chunk_routes
            .get(&chunk_id)
            .copied()
            .ok_or_else(|| VectorDbError::chunk_not_found(chunk_id))?;
        registry
            .libraries
            .get(&library_id)
            .cloned()
            .ok_or_else(|| VectorDbError::library_not_found(library_id))
    }

    // ---- Libraries ----

    pub async fn create_library(&self, new: NewLibrary) -> Library {
        let now = Utc::now();
        let library = Library {
            id: Uuid::new_v4(),
            metadata: LibraryMetadata {
                name: new.name,
                description: new.description,
                owner: new.owner,
                tags: new.tags,
                is_public: new.is_public,
                created_at: now,
                updated_at: now,
                extra: new.extra,
            },
            document_ids: Vec::new(),
            is_indexed: false,
            embedding_dimension: None,
            index_type: None,
            last_indexed: None,
        };

        let cell = Arc::new(LibraryCell {
            lock: RwLock::new(LibraryState {
                library: library.clone(),
                documents: HashMap::new(),
                chunks: HashMap::new(),
                index: None,
            }),
        });

        let mut registry = self.registry.lock().await;
        registry.libraries.insert(library.id, cell);
        info!(library_id = %library.id, name = %library.metadata.name, "library created");
        library
    }

    pub async fn get_library(&self, id: LibraryId) -> Result<Library> {
        let cell = self.cell(id).await?;
        let state = cell.lock.read().await;
        Ok(state.library.clone())
    }

    /// Update library metadata; does not touch the chunk-set, so the index
    /// survives
    pub async fn update_library(&self, id: LibraryId, patch: LibraryUpdate) -> Result<Library> {
        let cell = self.cell(id).await?;
        let mut state = cell.lock.write().await;
        let meta = &mut state.library.metadata;
        if let Some(name) = patch.name {
            meta.name = name;
        }
        if let Some(description) = patch.description {
            meta.description = Some(description);
        }
        if let Some(owner) = patch.owner {
            meta.owner = Some(owner);
        }
        if let Some(tags) = patch.tags {
            meta.tags = tags;
        }
        if let Some(is_public) = patch.is_public {
            meta.is_public = is_public;
        }
        if let Some(extra) = patch.extra {
            meta.extra = extra;
        }
        meta.updated_at = Utc::now();
        Ok(state.library.clone())
    }

    /// Delete a library and cascade through its documents and chunks.
    /// The registry mutex is held across the whole cascade, so routing
    /// entries vanish atomically with the library itself.
    pub async fn delete_library(&self, id: LibraryId) -> Result<()> {
        let mut registry = self.registry.lock().await;
        let cell = registry
            .libraries
            .remove(&id)
            .ok_or_else(|| VectorDbError::library_not_found(id))?;

        // Drain in-flight readers and writers before unlinking the routes
        let state = cell.lock.write().await;
        for document_id in state.documents.keys() {
            registry.document_routes.remove(document_id);
        }
        for chunk_id in state.chunks.keys() {
            registry.chunk_routes.remove(chunk_id);
        }
        info!(
            library_id = %id,
            documents = state.documents.len(),
            chunks = state.chunks.len(),
            "library deleted"
        );
        Ok(())
    }

    /// All libraries, sorted by creation time ascending with id as tiebreak
    pub async fn list_libraries(&self) -> Vec<Library> {
        let registry = self.registry.lock().await;
        let mut libraries = Vec::with_capacity(registry.libraries.len());
        for cell in registry.libraries.values() {
            let state = cell.lock.read().await;
            libraries.push(state.library.clone());
        }
        libraries.sort_by(|a, b| {
            a.metadata
                .created_at
                .cmp(&b.metadata.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        libraries
    }

    pub async fn library_stats(&self, id: LibraryId) -> Result<LibraryStats> {
        let cell = self.cell(id).await?;
        let state = cell.lock.read().await;
        Ok(LibraryStats {
            total_documents: state.documents.len(),
            total_chunks: state.chunks.len(),
            is_indexed: state.library.is_indexed,
            embedding_dimension: state.library.embedding_dimension,
            index_type: state.library.index_type,
            last_indexed: state.library.last_indexed,
        })
    }

    // ---- Documents ----

    pub async fn create_document(
        &self,
        library_id: LibraryId,
        new: NewDocument,
    ) -> Result<Document> {
        let mut registry = self.registry.lock().await;
        let cell = registry
            .libraries
            .get(&library_id)
            .cloned()
            .ok_or_else(|| VectorDbError::library_not_found(library_id))?;

        let now = Utc::now();
        let document = Document {
            id: Uuid::new_v4(),
            library_id,
            metadata: DocumentMetadata {
                title: new.title,
                description: new.description,
                author: new.author,
                tags: new.tags,
                category: new.category,
                file_type: new.file_type,
                created_at: now,
                updated_at: now,
                extra: new.extra,
            },
            chunk_ids: Vec::new(),
        };

        let mut state = cell.lock.write().await;
        state.library.document_ids.push(document.id);
        state.library.metadata.updated_at = now;
        state.documents.insert(document.id, document.clone());
        registry.document_routes.insert(document.id, library_id);
        debug!(document_id = %document.id, library_id = %library_id, "document created");
        Ok(document)
    }

    pub async fn get_document(&self, id: DocumentId) -> Result<Document> {
        let cell = self.cell_for_document(id).await?;
        let state = cell.lock.read().await;
        state
            .documents
            .get(&id)
            .cloned()
            .ok_or_else(|| VectorDbError::document_not_found(id))
    }

    pub async fn update_document(&self, id: DocumentId, patch: DocumentUpdate) -> Result<Document> {
        let cell = self.cell_for_document(id).await?;
        let mut state = cell.lock.write().await;
        let document = state
            .documents
            .get_mut(&id)
            .ok_or_else(|| VectorDbError::document_not_found(id))?;
        let meta = &mut document.metadata;
        if let Some(title) = patch.title {
            meta.title = title;
        }
        if let Some(description) = patch.description {
            meta.description = Some(description);
        }
        if let Some(author) = patch.author {
            meta.author = Some(author);
        }
        if let Some(tags) = patch.tags {
            meta.tags = tags;
        }
        if let Some(category) = patch.category {
            meta.category = Some(category);
        }
        if let Some(file_type) = patch.file_type {
            meta.file_type = file_type;
        }
        if let Some(extra) = patch.extra {
            meta.extra = extra;
        }
        meta.updated_at = Utc::now();
        Ok(document.clone())
    }

    /// Delete a document and cascade through its chunks
    pub async fn delete_document(&self, id: DocumentId) -> Result<()> {
        let mut registry = self.registry.lock().await;
        let library_id = registry
            .document_routes
            .get(&id)
            .copied()
            .ok_or_else(|| VectorDbError::document_not_found(id))?;
        let cell = registry
            .libraries
            .get(&library_id)
            .cloned()
            .ok_or_else(|| VectorDbError::library_not_found(library_id))?;

        let mut state = cell.lock.write().await;
        let document = state
            .documents
            .remove(&id)
            .ok_or_else(|| VectorDbError::document_not_found(id))?;
        let removed_chunks = document.chunk_ids.len();
        for chunk_id in &document.chunk_ids {
            state.chunks.remove(chunk_id);
            registry.chunk_routes.remove(chunk_id);
        }
        registry.document_routes.remove(&id);
        state.library.document_ids.retain(|d| *d != id);
        state.library.metadata.updated_at = Utc::now();
        if removed_chunks > 0 {
            state.invalidate_index();
        }
        debug!(document_id = %id, chunks = removed_chunks, "document deleted");
        Ok(())
    }

    /// Documents of one library in creation order, or of every library in
    /// library order
    pub async fn list_documents(&self, library_id: Option<LibraryId>) -> Result<Vec<Document>> {
        match library_id {
            Some(id) => {
                let cell = self.cell(id).await?;
                let state = cell.lock.read().await;
                Ok(documents_in_order(&state))
            }
            None => {
                let mut documents = Vec::new();
                for library in self.list_libraries().await {
                    // A library may vanish between the listing and the
                    // lookup; skip it rather than failing the whole scan
                    if let Ok(cell) = self.cell(library.id).await {
                        let state = cell.lock.read().await;
                        documents.extend(documents_in_order(&state));
                    }
                }
                Ok(documents)
            }
        }
    }

    // ---- Chunks ----

    pub async fn create_chunk(&self, document_id: DocumentId, new: NewChunk) -> Result<Chunk> {
        if new.text.chars().count() > MAX_TEXT_LEN {
            return Err(VectorDbError::validation(format!(
                "chunk text exceeds {MAX_TEXT_LEN} chars"
            )));
        }
        if new.source.trim().is_empty() {
            return Err(VectorDbError::validation("chunk source must not be empty"));
        }
        math::validate_vector(&new.embedding, None)?;
        if new.embedding.len() > MAX_EMBEDDING_DIM {
            return Err(VectorDbError::validation(format!(
                "embedding dimension exceeds {MAX_EMBEDDING_DIM}"
            )));
        }

        let mut registry = self.registry.lock().await;
        let library_id = registry
            .document_routes
            .get(&document_id)
            .copied()
            .ok_or_else(|| VectorDbError::document_not_found(document_id))?;
        let cell = registry
            .libraries
            .get(&library_id)
            .cloned()
            .ok_or_else(|| VectorDbError::library_not_found(library_id))?;

        let mut state = cell.lock.write().await;
        if let Some(expected) = state.library.embedding_dimension {
            if new.embedding.len() != expected {
                return Err(VectorDbError::DimensionMismatch {
                    expected,
                    got: new.embedding.len(),
                });
            }
        }
        if state.chunks.len() >= MAX_CHUNKS_PER_LIBRARY {
            return Err(VectorDbError::validation(format!(
                "library holds the maximum of {MAX_CHUNKS_PER_LIBRARY} chunks"
            )));
        }

        let now = Utc::now();
        let chunk = Chunk {
            id: Uuid::new_v4(),
            document_id,
            metadata: ChunkMetadata {
                source: new.source,
                created_at: now,
                updated_at: now,
                author: new.author,
                tags: new.tags,
                language: new.language,
                char_count: new.text.chars().count(),
                extra: new.extra,
            },
            text: new.text,
            embedding: new.embedding,
        };

        // The first chunk ever added fixes the library's dimension
        if state.library.embedding_dimension.is_none() {
            state.library.embedding_dimension = Some(chunk.embedding.len());
        }

        let document = state
            .documents
            .get_mut(&document_id)
            .ok_or_else(|| VectorDbError::internal("document missing for routed chunk"))?;
        document.chunk_ids.push(chunk.id);
        document.metadata.updated_at = now;
        state.library.metadata.updated_at = now;
        state.chunks.insert(chunk.id, chunk.clone());
        state.invalidate_index();
        registry.chunk_routes.insert(chunk.id, library_id);
        debug!(chunk_id = %chunk.id, document_id = %document_id, "chunk created");
        Ok(chunk)
    }

    pub async fn get_chunk(&self, id: ChunkId) -> Result<Chunk> {
        let cell = self.cell_for_chunk(id).await?;
        let state = cell.lock.read().await;
        state
            .chunks
            .get(&id)
            .cloned()
            .ok_or_else(|| VectorDbError::chunk_not_found(id))
    }

    /// Patch a chunk; the same dimension rule as creation applies and the
    /// library's index is always invalidated
    pub async fn update_chunk(&self, id: ChunkId, patch: ChunkUpdate) -> Result<Chunk> {
        if let Some(text) = &patch.text {
            if text.chars().count() > MAX_TEXT_LEN {
                return Err(VectorDbError::validation(format!(
                    "chunk text exceeds {MAX_TEXT_LEN} chars"
                )));
            }
        }
        if let Some(embedding) = &patch.embedding {
            math::validate_vector(embedding, None)?;
        }
        if let Some(source) = &patch.source {
            if source.trim().is_empty() {
                return Err(VectorDbError::validation("chunk source must not be empty"));
            }
        }

        let cell = self.cell_for_chunk(id).await?;
        let mut state = cell.lock.write().await;

        if let Some(embedding) = &patch.embedding {
            if let Some(expected) = state.library.embedding_dimension {
                if embedding.len() != expected {
                    return Err(VectorDbError::DimensionMismatch {
                        expected,
                        got: embedding.len(),
                    });
                }
            }
        }

        let now = Utc::now();
        let chunk = state
            .chunks
            .get_mut(&id)
            .ok_or_else(|| VectorDbError::chunk_not_found(id))?;
        if let Some(text) = patch.text {
            chunk.metadata.char_count = text.chars().count();
            chunk.text = text;
        }
        if let Some(embedding) = patch.embedding {
            chunk.embedding = embedding;
        }
        if let Some(source) = patch.source {
            chunk.metadata.source = source;
        }
        if let Some(author) = patch.author {
            chunk.metadata.author = Some(author);
        }
        if let Some(tags) = patch.tags {
            chunk.metadata.tags = tags;
        }
        if let Some(language) = patch.language {
            chunk.metadata.language = language;
        }
        if let Some(extra) = patch.extra {
            chunk.metadata.extra = extra;
        }
        chunk.metadata.updated_at = now;
        let updated = chunk.clone();
        state.library.metadata.updated_at = now;
        state.invalidate_index();
        Ok(updated)
    }

    pub async fn delete_chunk(&self, id: ChunkId) -> Result<()> {
        let mut registry = self.registry.lock().await;
        let library_id = registry
            .chunk_routes
            .get(&id)
            .copied()
            .ok_or_else(|| VectorDbError::chunk_not_found(id))?;
        let cell = registry
            .libraries
            .get(&library_id)
            .cloned()
            .ok_or_else(|| VectorDbError::library_not_found(library_id))?;

        let mut state = cell.lock.write().await;
        let chunk = state
            .chunks
            .remove(&id)
            .ok_or_else(|| VectorDbError::chunk_not_found(id))?;
        if let Some(document) = state.documents.get_mut(&chunk.document_id) {
            document.chunk_ids.retain(|c| *c != id);
            document.metadata.updated_at = Utc::now();
        }
        registry.chunk_routes.remove(&id);
        state.library.metadata.updated_at = Utc::now();
        state.invalidate_index();
        debug!(chunk_id = %id, "chunk deleted");
        Ok(())
    }

    /// Chunks of one document in creation order
    pub async fn list_chunks(&self, document_id: DocumentId) -> Result<Vec<Chunk>> {
        let cell = self.cell_for_document(document_id).await?;
        let state = cell.lock.read().await;
        let document = state
            .documents
            .get(&document_id)
            .ok_or_else(|| VectorDbError::document_not_found(document_id))?;
        Ok(document
            .chunk_ids
            .iter()
            .filter_map(|id| state.chunks.get(id).cloned())
            .collect())
    }

    // ---- Indexing ----

    /// Build (or rebuild) the library's index under its write lock.
    ///
    /// The snapshot iterates documents in library order and chunks in
    /// document order, so an identical chunk-set with an identical seed
    /// builds an identical index.
    pub async fn index_library(
        &self,
        library_id: LibraryId,
        index_type: IndexType,
        params: Option<IndexParams>,
    ) -> Result<Library> {
        let cell = self.cell(library_id).await?;
        let mut state = cell.lock.write().await;

        let mut items = Vec::with_capacity(state.chunks.len());
        for document_id in &state.library.document_ids {
            let document = state
                .documents
                .get(document_id)
                .ok_or_else(|| VectorDbError::internal("library references missing document"))?;
            for chunk_id in &document.chunk_ids {
                let chunk = state
                    .chunks
                    .get(chunk_id)
                    .ok_or_else(|| VectorDbError::internal("document references missing chunk"))?;
                items.push(IndexItem {
                    id: chunk.id,
                    vector: chunk.embedding.clone(),
                });
            }
        }

        let params = params.unwrap_or_default();
        let total = items.len();
        let index = AnnIndex::build(index_type, items, params);

        state.library.is_indexed = true;
        state.library.index_type = Some(index_type);
        state.library.last_indexed = Some(Utc::now());
        state.index = Some(index);
        info!(
            library_id = %library_id,
            index_type = %index_type,
            chunks = total,
            seed = params.seed,
            "index built"
        );
        Ok(state.library.clone())
    }
}

/// Documents in the library's creation order
fn documents_in_order(state: &LibraryState) -> Vec<Document> {
    state
        .library
        .document_ids
        .iter()
        .filter_map(|id| state.documents.get(id).cloned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn new_library(name: &str) -> NewLibrary {
        NewLibrary {
            name: name.to_string(),
            ..Default::default()
        }
    }

    fn new_document(title: &str) -> NewDocument {
        NewDocument {
            title: title.to_string(),
            file_type: "text".to_string(),
            ..Default::default()
        }
    }

    fn new_chunk(text: &str, embedding: Vec<f32>) -> NewChunk {
        NewChunk {
            text: text.to_string(),
            embedding,
            source: "test".to_string(),
            language: "en".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_and_get_hierarchy() {
        let db = Database::new();
        let library = db.create_library(new_library("docs")).await;
        let document = db
            .create_document(library.id, new_document("intro"))
            .await
            .unwrap();
        let chunk = db
            .create_chunk(document.id, new_chunk("hello", vec![1.0, 0.0]))
            .await
            .unwrap();

        assert_eq!(db.get_library(library.id).await.unwrap().id, library.id);
        let fetched_doc = db.get_document(document.id).await.unwrap();
        assert_eq!(fetched_doc.library_id, library.id);
        assert_eq!(fetched_doc.chunk_ids, vec![chunk.id]);
        let fetched_chunk = db.get_chunk(chunk.id).await.unwrap();
        assert_eq!(fetched_chunk.document_id, document.id);
        assert_eq!(fetched_chunk.metadata.char_count, 5);
    }

    #[tokio::test]
    async fn test_create_document_in_missing_library() {
        let db = Database::new();
        let err = db
            .create_document(Uuid::new_v4(), new_document("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, VectorDbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_first_chunk_fixes_dimension() {
        let db = Database::new();
        let library = db.create_library(new_library("docs")).await;
        let document = db
            .create_document(library.id, new_document("d"))
            .await
            .unwrap();

        db.create_chunk(document.id, new_chunk("a", vec![1.0, 0.0, 0.0]))
            .await
            .unwrap();
        let library = db.get_library(library.id).await.unwrap();
        assert_eq!(library.embedding_dimension, Some(3));

        // A two-dimensional embedding is now rejected
        let err = db
            .create_chunk(document.id, new_chunk("b", vec![1.0, 0.0]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            VectorDbError::DimensionMismatch {
                expected: 3,
                got: 2
            }
        ));
    }

    #[tokio::test]
    async fn test_chunk_validation() {
        let db = Database::new();
        let library = db.create_library(new_library("docs")).await;
        let document = db
            .create_document(library.id, new_document("d"))
            .await
            .unwrap();

        let err = db
            .create_chunk(document.id, new_chunk("t", vec![f32::NAN]))
            .await
            .unwrap_err();
        assert!(matches!(err, VectorDbError::Validation { .. }));

        let mut chunk = new_chunk("t", vec![1.0]);
        chunk.source = "  ".to_string();
        let err = db.create_chunk(document.id, chunk).await.unwrap_err();
        assert!(matches!(err, VectorDbError::Validation { .. }));

        let long_text = "x".repeat(MAX_TEXT_LEN + 1);
        let err = db
            .create_chunk(document.id, new_chunk(&long_text, vec![1.0]))
            .await
            .unwrap_err();
        assert!(matches!(err, VectorDbError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_mutation_invalidates_index() {
        let db = Database::new();
        let library = db.create_library(new_library("docs")).await;
        let document = db
            .create_document(library.id, new_document("d"))
            .await
            .unwrap();
        let chunk = db
            .create_chunk(document.id, new_chunk("a", vec![1.0, 0.0]))
            .await
            .unwrap();

        db.index_library(library.id, IndexType::Flat, None)
            .await
            .unwrap();
        assert!(db.library_stats(library.id).await.unwrap().is_indexed);

        // Adding a chunk flips is_indexed off
        db.create_chunk(document.id, new_chunk("b", vec![0.0, 1.0]))
            .await
            .unwrap();
        assert!(!db.library_stats(library.id).await.unwrap().is_indexed);

        // Rebuilding and then updating a chunk flips it off again
        db.index_library(library.id, IndexType::Flat, None)
            .await
            .unwrap();
        db.update_chunk(
            chunk.id,
            ChunkUpdate {
                text: Some("changed".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert!(!db.library_stats(library.id).await.unwrap().is_indexed);

        // And deleting one as well
        db.index_library(library.id, IndexType::Flat, None)
            .await
            .unwrap();
        db.delete_chunk(chunk.id).await.unwrap();
        assert!(!db.library_stats(library.id).await.unwrap().is_indexed);
    }

    #[tokio::test]
    async fn test_cascade_delete_library() {
        let db = Database::new();
        let library = db.create_library(new_library("docs")).await;
        let d1 = db
            .create_document(library.id, new_document("d1"))
            .await
            .unwrap();
        let d2 = db
            .create_document(library.id, new_document("d2"))
            .await
            .unwrap();
        let mut chunk_ids = Vec::new();
        for (doc, n) in [(&d1, 3), (&d2, 2)] {
            for i in 0..n {
                let c = db
                    .create_chunk(doc.id, new_chunk(&format!("c{i}"), vec![i as f32, 1.0]))
                    .await
                    .unwrap();
                chunk_ids.push(c.id);
            }
        }

        db.delete_library(library.id).await.unwrap();

        assert!(db.list_libraries().await.is_empty());
        assert!(matches!(
            db.get_library(library.id).await.unwrap_err(),
            VectorDbError::NotFound { .. }
        ));
        for doc_id in [d1.id, d2.id] {
            assert!(matches!(
                db.get_document(doc_id).await.unwrap_err(),
                VectorDbError::NotFound { .. }
            ));
        }
        for chunk_id in chunk_ids {
            assert!(matches!(
                db.get_chunk(chunk_id).await.unwrap_err(),
                VectorDbError::NotFound { .. }
            ));
        }
    }

    #[tokio::test]
    async fn test_cascade_delete_document() {
        let db = Database::new();
        let library = db.create_library(new_library("docs")).await;
        let document = db
            .create_document(library.id, new_document("d"))
            .await
            .unwrap();
        let chunk = db
            .create_chunk(document.id, new_chunk("a", vec![1.0]))
            .await
            .unwrap();

        db.delete_document(document.id).await.unwrap();

        assert!(db.get_document(document.id).await.is_err());
        assert!(db.get_chunk(chunk.id).await.is_err());
        let library = db.get_library(library.id).await.unwrap();
        assert!(library.document_ids.is_empty());
        assert!(!library.is_indexed);
    }

    #[tokio::test]
    async fn test_listing_order() {
        let db = Database::new();
        let l1 = db.create_library(new_library("a")).await;
        let _l2 = db.create_library(new_library("b")).await;

        let libraries = db.list_libraries().await;
        assert_eq!(libraries.len(), 2);
        assert!(
            libraries[0].metadata.created_at <= libraries[1].metadata.created_at,
            "libraries must come back in creation order"
        );

        let d1 = db.create_document(l1.id, new_document("d1")).await.unwrap();
        let d2 = db.create_document(l1.id, new_document("d2")).await.unwrap();
        let docs = db.list_documents(Some(l1.id)).await.unwrap();
        assert_eq!(
            docs.iter().map(|d| d.id).collect::<Vec<_>>(),
            vec![d1.id, d2.id]
        );

        let c1 = db.create_chunk(d1.id, new_chunk("x", vec![1.0])).await.unwrap();
        let c2 = db.create_chunk(d1.id, new_chunk("y", vec![2.0])).await.unwrap();
        let chunks = db.list_chunks(d1.id).await.unwrap();
        assert_eq!(
            chunks.iter().map(|c| c.id).collect::<Vec<_>>(),
            vec![c1.id, c2.id]
        );

        let all_docs = db.list_documents(None).await.unwrap();
        assert_eq!(all_docs.len(), 2);
    }

    #[tokio::test]
    async fn test_stats() {
        let db = Database::new();
        let library = db.create_library(new_library("docs")).await;
        let document = db
            .create_document(library.id, new_document("d"))
            .await
            .unwrap();
        db.create_chunk(document.id, new_chunk("a", vec![1.0, 0.0]))
            .await
            .unwrap();

        let stats = db.library_stats(library.id).await.unwrap();
        assert_eq!(stats.total_documents, 1);
        assert_eq!(stats.total_chunks, 1);
        assert_eq!(stats.embedding_dimension, Some(2));
        assert!(!stats.is_indexed);
        assert_eq!(stats.index_type, None);

        db.index_library(library.id, IndexType::Flat, None)
            .await
            .unwrap();
        let stats = db.library_stats(library.id).await.unwrap();
        assert!(stats.is_indexed);
        assert_eq!(stats.index_type, Some(IndexType::Flat));
        assert!(stats.last_indexed.is_some());
    }

    #[tokio::test]
    async fn test_update_library_keeps_index() {
        let db = Database::new();
        let library = db.create_library(new_library("docs")).await;
        let document = db
            .create_document(library.id, new_document("d"))
            .await
            .unwrap();
        db.create_chunk(document.id, new_chunk("a", vec![1.0]))
            .await
            .unwrap();
        db.index_library(library.id, IndexType::Flat, None)
            .await
            .unwrap();

        let updated = db
            .update_library(
                library.id,
                LibraryUpdate {
                    name: Some("renamed".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.metadata.name, "renamed");
        assert!(updated.is_indexed, "metadata edits must not drop the index");
    }
}
