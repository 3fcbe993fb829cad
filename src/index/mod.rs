//! Read-only vector index over the ingested policy corpus.
//!
//! The index is a `SQLite` file written by the offline ingestion step.
//! It is loaded fully into memory when a session starts, so queries are
//! lock-free and any number of sessions can search it concurrently.
//!
//! # On-disk layout
//!
//! See [`SCHEMA`]. `chunks.embedding` holds `dimensions` little-endian
//! `f32` values.

pub mod embedding;

use std::path::{Path, PathBuf};

use rusqlite::{Connection, OpenFlags, OptionalExtension, params};

pub use embedding::{Embedder, HashEmbedder, create_embedder};

use crate::error::IndexError;

/// File name of the index database inside the index directory.
pub const INDEX_FILE: &str = "index.db";

/// Schema of the index database.
pub const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS meta (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS chunks (
    id         INTEGER PRIMARY KEY,
    collection TEXT NOT NULL,
    source     TEXT,
    content    TEXT NOT NULL,
    embedding  BLOB NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_chunks_collection ON chunks(collection);
";

/// Resolves the index database for a configured path.
///
/// A directory resolves to `<dir>/index.db`; a file is used as-is.
/// Returns `None` when nothing exists at the resolved location, which
/// callers treat as "no index" rather than an error.
#[must_use]
pub fn locate(path: &Path) -> Option<PathBuf> {
    let candidate = if path.is_dir() {
        path.join(INDEX_FILE)
    } else {
        path.to_path_buf()
    };
    candidate.is_file().then_some(candidate)
}

/// Encodes a vector as the index's BLOB format.
#[must_use]
pub fn encode_embedding(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Decodes an index BLOB into a vector.
fn decode_embedding(blob: &[u8]) -> Result<Vec<f32>, IndexError> {
    if blob.len() % 4 != 0 {
        return Err(IndexError::Corrupt {
            message: format!("embedding blob length {} is not a multiple of 4", blob.len()),
        });
    }
    Ok(blob
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

/// Cosine similarity of two equal-length vectors; 0.0 if either is zero.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let (mut dot, mut norm_a, mut norm_b) = (0.0_f32, 0.0_f32, 0.0_f32);
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// A chunk held in memory.
#[derive(Debug, Clone)]
struct IndexedChunk {
    id: i64,
    source: Option<String>,
    content: String,
    embedding: Vec<f32>,
}

/// A chunk returned by a similarity query.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    /// Row ID in the index.
    pub id: i64,
    /// Source document, if recorded.
    pub source: Option<String>,
    /// Chunk text.
    pub content: String,
    /// Cosine similarity to the query vector.
    pub score: f32,
}

/// In-memory copy of one index collection.
#[derive(Debug)]
pub struct VectorIndex {
    path: PathBuf,
    collection: String,
    embedding_model: Option<String>,
    dimensions: usize,
    chunks: Vec<IndexedChunk>,
}

impl VectorIndex {
    /// Opens the index database read-only and loads `collection`.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::NotFound`] if `path` does not exist,
    /// [`IndexError::Sqlite`] on database errors, and
    /// [`IndexError::Corrupt`] if stored vectors are malformed or
    /// disagree on dimension.
    pub fn open(path: &Path, collection: &str) -> Result<Self, IndexError> {
        if !path.is_file() {
            return Err(IndexError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        let meta = |key: &str| -> Result<Option<String>, IndexError> {
            Ok(conn
                .query_row("SELECT value FROM meta WHERE key = ?1", params![key], |row| {
                    row.get::<_, String>(0)
                })
                .optional()?)
        };

        let embedding_model = meta("embedding_model")?;
        let declared_dims = meta("dimensions")?
            .map(|v| {
                v.parse::<usize>().map_err(|_| IndexError::Corrupt {
                    message: format!("meta.dimensions is not a number: {v}"),
                })
            })
            .transpose()?;

        let mut stmt = conn.prepare(
            "SELECT id, source, content, embedding FROM chunks WHERE collection = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![collection], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Vec<u8>>(3)?,
            ))
        })?;

        let mut chunks = Vec::new();
        let mut dimensions = declared_dims;
        for row in rows {
            let (id, source, content, blob) = row?;
            let embedding = decode_embedding(&blob)?;
            match dimensions {
                Some(d) if d != embedding.len() => {
                    return Err(IndexError::Corrupt {
                        message: format!(
                            "chunk {id} has {} dimensions, expected {d}",
                            embedding.len()
                        ),
                    });
                }
                Some(_) => {}
                None => dimensions = Some(embedding.len()),
            }
            chunks.push(IndexedChunk {
                id,
                source,
                content,
                embedding,
            });
        }

        Ok(Self {
            path: path.to_path_buf(),
            collection: collection.to_string(),
            embedding_model,
            dimensions: dimensions.unwrap_or(0),
            chunks,
        })
    }

    /// Returns the `k` chunks most similar to `vector`, best first.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::DimensionMismatch`] if `vector` does not have
    /// the index's dimension.
    pub fn similarity_query(&self, vector: &[f32], k: usize) -> Result<Vec<ScoredChunk>, IndexError> {
        if self.chunks.is_empty() {
            return Ok(Vec::new());
        }
        if vector.len() != self.dimensions {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimensions,
                actual: vector.len(),
            });
        }

        let mut scored: Vec<(f32, &IndexedChunk)> = self
            .chunks
            .iter()
            .map(|c| (cosine_similarity(vector, &c.embedding), c))
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.id.cmp(&b.1.id)));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(score, c)| ScoredChunk {
                id: c.id,
                source: c.source.clone(),
                content: c.content.clone(),
                score,
            })
            .collect())
    }

    /// Path of the opened database.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loaded collection name.
    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Embedding model recorded at ingestion, if any.
    #[must_use]
    pub fn embedding_model(&self) -> Option<&str> {
        self.embedding_model.as_deref()
    }

    /// Vector dimension (0 for an empty collection without metadata).
    #[must_use]
    pub const fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Number of chunks in the collection.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Returns `true` if the collection has no chunks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}
