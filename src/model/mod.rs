//! Entity records: libraries, documents, chunks
//!
//! The store is the exclusive owner of these records; indexes only hold
//! chunk ids and vector snapshots. Known metadata fields are typed; the
//! `extra` side mapping carries free-form extension tags and is what
//! metadata equality filters match against alongside the typed fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

pub type LibraryId = Uuid;
pub type DocumentId = Uuid;
pub type ChunkId = Uuid;

fn default_language() -> String {
    "en".to_string()
}

/// Chunk metadata stored alongside the text and embedding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Where the text came from (required, non-empty)
    pub source: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_language")]
    pub language: String,
    /// Always equal to the chunk text length in chars
    pub char_count: usize,
    /// Free-form extension tags, matched by metadata equality filters
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub extra: HashMap<String, String>,
}

impl ChunkMetadata {
    /// Equality-filter semantics: a (key, value) pair matches a typed
    /// string field of the same name, membership in `tags`, or an entry
    /// of the `extra` side mapping.
    pub fn matches_filter(&self, key: &str, value: &str) -> bool {
        match key {
            "source" => self.source == value,
            "author" => self.author.as_deref() == Some(value),
            "language" => self.language == value,
            "tags" => self.tags.iter().any(|t| t == value),
            _ => self.extra.get(key).map(String::as_str) == Some(value),
        }
    }
}

/// The unit indexed and returned by searches
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub document_id: DocumentId,
    pub text: String,
    pub embedding: Vec<f32>,
    pub metadata: ChunkMetadata,
}

/// Document metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub file_type: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub extra: HashMap<String, String>,
}

/// A logical grouping of chunks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub library_id: LibraryId,
    pub metadata: DocumentMetadata,
    /// Chunk ids in creation order
    pub chunk_ids: Vec<ChunkId>,
}

/// Library metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryMetadata {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub extra: HashMap<String, String>,
}

/// The scope of a single ANN index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Library {
    pub id: LibraryId,
    pub metadata: LibraryMetadata,
    /// Document ids in creation order
    pub document_ids: Vec<DocumentId>,
    /// True iff an index instance exists and no chunk mutation happened
    /// since its construction
    pub is_indexed: bool,
    /// Fixed by the first chunk ever added to the library
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding_dimension: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_type: Option<crate::index::IndexType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_indexed: Option<DateTime<Utc>>,
}

/// Input for creating a library
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewLibrary {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub extra: HashMap<String, String>,
}

/// Input for creating a document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewDocument {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub file_type: String,
    #[serde(default)]
    pub extra: HashMap<String, String>,
}

/// Input for creating a chunk
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewChunk {
    pub text: String,
    pub embedding: Vec<f32>,
    pub source: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub extra: HashMap<String, String>,
}

/// All-optional patch for a library's metadata
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LibraryUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub owner: Option<String>,
    pub tags: Option<Vec<String>>,
    pub is_public: Option<bool>,
    pub extra: Option<HashMap<String, String>>,
}

/// All-optional patch for a document's metadata
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocumentUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub author: Option<String>,
    pub tags: Option<Vec<String>>,
    pub category: Option<String>,
    pub file_type: Option<String>,
    pub extra: Option<HashMap<String, String>>,
}

/// All-optional patch for a chunk; changing text or embedding invalidates
/// the owning library's index
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChunkUpdate {
    pub text: Option<String>,
    pub embedding: Option<Vec<f32>>,
    pub source: Option<String>,
    pub author: Option<String>,
    pub tags: Option<Vec<String>>,
    pub language: Option<String>,
    pub extra: Option<HashMap<String, String>>,
}

/// Per-library statistics
#[derive(Debug, Clone, Serialize)]
pub struct LibraryStats {
    pub total_documents: usize,
    pub total_chunks: usize,
    pub is_indexed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding_dimension: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_type: Option<crate::index::IndexType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_indexed: Option<DateTime<Utc>>,
}
