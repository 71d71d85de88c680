//! Central constants for vectordb configuration
//!
//! All limits, index defaults, and environment variable names are defined here
//! to avoid duplication and ensure consistency across the codebase.

use std::sync::atomic::AtomicBool;

/// Maximum number of neighbors a single search may request
pub const K_MAX: usize = 100;

/// Maximum embedding dimension accepted by a library
pub const MAX_EMBEDDING_DIM: usize = 4096;

/// Maximum chunk text length in characters
pub const MAX_TEXT_LEN: usize = 10_000;

/// Maximum number of chunks a single library may hold
pub const MAX_CHUNKS_PER_LIBRARY: usize = 1_000_000;

/// Number of LSH hash tables (L)
pub const DEFAULT_LSH_TABLES: usize = 16;

/// Bits per LSH signature (H); bucket keys are u64 so this is capped at 64.
/// Short signatures keep buckets dense enough that the exact-bucket union
/// already meets the recall floor on isotropic data.
pub const DEFAULT_LSH_BITS: usize = 4;

/// Candidate pool inflation factor for LSH probing (P)
pub const DEFAULT_LSH_POOL_FACTOR: usize = 4;

/// Oversampling factor the orchestrator applies to LSH searches
/// to absorb candidate dropout before the similarity floor
pub const LSH_OVERSAMPLE: usize = 4;

/// Max neighbors per node on upper HNSW layers (M); the base layer gets 2M
pub const DEFAULT_HNSW_M: usize = 16;

/// Beam width during HNSW construction
pub const DEFAULT_EF_CONSTRUCTION: usize = 200;

/// Beam width during HNSW search (effective ef = max(k, efSearch))
pub const DEFAULT_EF_SEARCH: usize = 50;

/// Upper bound for caller-supplied ef values
pub const MAX_EF: usize = 2_000;

/// Upper bound for caller-supplied LSH table counts
pub const MAX_LSH_TABLES: usize = 64;

/// Default listen port for the HTTP server
pub const DEFAULT_PORT: u16 = 4500;

/// Default listen host for the HTTP server
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Environment variable overriding the listen host
pub const ENV_HOST: &str = "VECTORDB_HOST";

/// Environment variable overriding the listen port
pub const ENV_PORT: &str = "VECTORDB_PORT";

/// Environment variable with the embedding provider endpoint
pub const ENV_EMBEDDINGS_URL: &str = "VECTORDB_EMBEDDINGS_URL";

/// Environment variable with the embedding provider API key
pub const ENV_EMBEDDINGS_API_KEY: &str = "VECTORDB_EMBEDDINGS_API_KEY";

/// Environment variable with the embedding model name
pub const ENV_EMBEDDINGS_MODEL: &str = "VECTORDB_EMBEDDINGS_MODEL";

/// Set by the CTRL-C handler; checked to distinguish a second forced exit
pub static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);
