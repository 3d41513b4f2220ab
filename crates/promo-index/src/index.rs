//! Offer vector index.
//!
//! HNSW parameters follow the usual quality-over-speed defaults:
//! - M = 16 (connections per layer)
//! - ef_construction = 200 (build-time quality)
//! - ef_search = 100 (search-time quality)
//!
//! Layout under the index directory:
//! - `offers.usearch`: the HNSW vector file
//! - `docs/`: RocksDB with two column families:
//!   `docs` maps offer link -> stored document, `vectors` maps the internal
//!   u64 vector id back to the link for search-result resolution.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use chrono::Utc;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, Options, DB};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use usearch::{Index, IndexOptions, MetricKind, ScalarKind};

use promo_embeddings::Embedding;
use promo_types::OfferMetadata;

use crate::error::IndexError;

/// Column family holding link -> stored document entries.
const CF_DOCS: &str = "docs";

/// Column family holding vector id -> link entries.
const CF_VECTORS: &str = "vectors";

/// Index configuration.
#[derive(Debug, Clone)]
pub struct IndexConfig {
    /// Embedding dimension (must match the embedder)
    pub dimension: usize,
    /// Number of connections per layer (M parameter)
    pub connectivity: usize,
    /// Build-time search depth (ef_construction)
    pub expansion_add: usize,
    /// Query-time search depth (ef_search)
    pub expansion_search: usize,
    /// Index directory
    pub path: PathBuf,
    /// Vector capacity to pre-allocate
    pub capacity: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            dimension: 384, // all-MiniLM-L6-v2
            connectivity: 16,
            expansion_add: 200,
            expansion_search: 100,
            path: PathBuf::from("./offer-index"),
            capacity: 100_000,
        }
    }
}

impl IndexConfig {
    pub fn new(dimension: usize, path: impl Into<PathBuf>) -> Self {
        Self {
            dimension,
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }
}

/// A document stored for one offer link.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredOffer {
    /// Internal vector id (key in the HNSW index)
    vector_id: u64,
    /// Embedded document text ("<title>. <description>")
    document: String,
    /// Structured offer metadata
    metadata: OfferMetadata,
    /// When the offer was indexed (ms since epoch)
    indexed_at: i64,
}

/// One retrieval hit: document text, metadata, and similarity score.
#[derive(Debug, Clone)]
pub struct RetrievedOffer {
    pub document: String,
    pub metadata: OfferMetadata,
    /// Cosine similarity to the query (higher = more similar)
    pub score: f32,
}

/// Index statistics.
#[derive(Debug, Clone, Default)]
pub struct IndexStats {
    /// Number of indexed offers
    pub offer_count: usize,
    /// Embedding dimension
    pub dimension: usize,
    /// HNSW file size in bytes
    pub size_bytes: u64,
}

/// Persistent offer index: HNSW vectors plus a RocksDB document store.
///
/// At most one document exists per distinct link; `upsert` replaces any
/// previous entry under the same link. The document store is authoritative
/// for `exists`, so identity checks survive restarts even if the HNSW file
/// was not yet saved.
pub struct OfferIndex {
    hnsw: RwLock<Index>,
    docs: DB,
    next_id: AtomicU64,
    config: IndexConfig,
}

impl OfferIndex {
    /// Open an existing index or create a new one at the configured path.
    pub fn open_or_create(config: IndexConfig) -> Result<Self, IndexError> {
        std::fs::create_dir_all(&config.path)?;

        let docs = Self::open_store(&config)?;
        let hnsw = Self::open_hnsw(&config)?;
        let next_id = Self::last_vector_id(&docs)? + 1;

        info!(
            path = ?config.path,
            offers = hnsw.size(),
            dim = config.dimension,
            "Offer index ready"
        );

        Ok(Self {
            hnsw: RwLock::new(hnsw),
            docs,
            next_id: AtomicU64::new(next_id),
            config,
        })
    }

    fn open_store(config: &IndexConfig) -> Result<DB, IndexError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cfs = vec![
            ColumnFamilyDescriptor::new(CF_DOCS, Options::default()),
            ColumnFamilyDescriptor::new(CF_VECTORS, Options::default()),
        ];

        Ok(DB::open_cf_descriptors(
            &opts,
            config.path.join("docs"),
            cfs,
        )?)
    }

    fn open_hnsw(config: &IndexConfig) -> Result<Index, IndexError> {
        let options = IndexOptions {
            dimensions: config.dimension,
            metric: MetricKind::Cos,
            quantization: ScalarKind::F32,
            connectivity: config.connectivity,
            expansion_add: config.expansion_add,
            expansion_search: config.expansion_search,
            multi: false, // one vector per key
        };

        let file = config.path.join("offers.usearch");
        let index = Index::new(&options).map_err(|e| IndexError::Index(e.to_string()))?;

        if file.exists() {
            info!(path = ?file, "Opening existing vector index");
            index
                .load(
                    file.to_str()
                        .ok_or_else(|| IndexError::Index("Invalid path encoding".to_string()))?,
                )
                .map_err(|e| IndexError::Index(format!("Failed to load: {}", e)))?;
        } else {
            info!(path = ?file, dim = config.dimension, "Creating new vector index");
        }

        index
            .reserve(config.capacity.max(index.size() * 2))
            .map_err(|e| IndexError::Index(e.to_string()))?;

        Ok(index)
    }

    /// Highest vector id present in the store, or 0 when empty.
    fn last_vector_id(docs: &DB) -> Result<u64, IndexError> {
        let cf = docs
            .cf_handle(CF_VECTORS)
            .ok_or_else(|| IndexError::Index("vectors column family missing".to_string()))?;
        let mut iter = docs.iterator_cf(cf, rocksdb::IteratorMode::End);

        match iter.next() {
            Some(Ok((key, _))) => {
                let bytes: [u8; 8] = key[..8]
                    .try_into()
                    .map_err(|_| IndexError::Serialization("bad vector id key".to_string()))?;
                Ok(u64::from_be_bytes(bytes))
            }
            Some(Err(e)) => Err(e.into()),
            None => Ok(0),
        }
    }

    fn cf_docs(&self) -> Result<&ColumnFamily, IndexError> {
        self.docs
            .cf_handle(CF_DOCS)
            .ok_or_else(|| IndexError::Index("docs column family missing".to_string()))
    }

    fn cf_vectors(&self) -> Result<&ColumnFamily, IndexError> {
        self.docs
            .cf_handle(CF_VECTORS)
            .ok_or_else(|| IndexError::Index("vectors column family missing".to_string()))
    }

    /// Whether an offer with this link has been indexed.
    ///
    /// Reads the persistent document store, never an in-memory set, so the
    /// answer reflects every committed upsert across process lifetimes.
    pub fn exists(&self, link: &str) -> Result<bool, IndexError> {
        Ok(self.docs.get_pinned_cf(self.cf_docs()?, link)?.is_some())
    }

    /// Insert or replace the entry for `link`.
    ///
    /// Replacing removes the previous vector before adding the new one, so
    /// one link never maps to two vectors.
    #[allow(clippy::readonly_write_lock)] // usearch::Index uses interior mutability
    pub fn upsert(
        &self,
        link: &str,
        embedding: &Embedding,
        document: &str,
        metadata: &OfferMetadata,
    ) -> Result<(), IndexError> {
        if embedding.dimension() != self.config.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.config.dimension,
                actual: embedding.dimension(),
            });
        }

        // Drop any previous vector under this link.
        if let Some(bytes) = self.docs.get_pinned_cf(self.cf_docs()?, link)? {
            let previous: StoredOffer = serde_json::from_slice(&bytes)
                .map_err(|e| IndexError::Serialization(e.to_string()))?;
            let hnsw = self.hnsw.write().unwrap();
            hnsw.remove(previous.vector_id)
                .map_err(|e| IndexError::Index(e.to_string()))?;
            self.docs
                .delete_cf(self.cf_vectors()?, previous.vector_id.to_be_bytes())?;
            debug!(link = %link, vector_id = previous.vector_id, "Replacing indexed offer");
        }

        let vector_id = self.next_id.fetch_add(1, Ordering::SeqCst);

        {
            let hnsw = self.hnsw.write().unwrap();
            hnsw.add(vector_id, &embedding.values)
                .map_err(|e| IndexError::Index(e.to_string()))?;
        }

        self.docs
            .put_cf(self.cf_vectors()?, vector_id.to_be_bytes(), link)?;

        let stored = StoredOffer {
            vector_id,
            document: document.to_string(),
            metadata: metadata.clone(),
            indexed_at: Utc::now().timestamp_millis(),
        };
        let value =
            serde_json::to_vec(&stored).map_err(|e| IndexError::Serialization(e.to_string()))?;
        // The docs write is the commit point for `exists`.
        self.docs.put_cf(self.cf_docs()?, link, value)?;

        debug!(link = %link, vector_id = vector_id, "Indexed offer");
        Ok(())
    }

    /// K-nearest-neighbor query, best match first.
    ///
    /// Returns `min(k, len)` results ranked by cosine similarity.
    pub fn query(
        &self,
        embedding: &Embedding,
        k: usize,
    ) -> Result<Vec<RetrievedOffer>, IndexError> {
        if embedding.dimension() != self.config.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.config.dimension,
                actual: embedding.dimension(),
            });
        }

        let matches = {
            let hnsw = self.hnsw.read().unwrap();
            hnsw.search(&embedding.values, k)
                .map_err(|e| IndexError::Index(e.to_string()))?
        };

        let mut results = Vec::with_capacity(matches.keys.len());
        for (&vector_id, &distance) in matches.keys.iter().zip(matches.distances.iter()) {
            let Some(link) = self
                .docs
                .get_cf(self.cf_vectors()?, vector_id.to_be_bytes())?
            else {
                warn!(vector_id = vector_id, "Vector without link entry, skipping");
                continue;
            };
            let Some(bytes) = self.docs.get_pinned_cf(self.cf_docs()?, &link)? else {
                warn!(vector_id = vector_id, "Vector without document, skipping");
                continue;
            };
            let stored: StoredOffer = serde_json::from_slice(&bytes)
                .map_err(|e| IndexError::Serialization(e.to_string()))?;

            results.push(RetrievedOffer {
                document: stored.document,
                metadata: stored.metadata,
                // usearch reports cosine distance; flip to similarity.
                score: 1.0 - distance,
            });
        }

        debug!(k = k, found = results.len(), "Query complete");
        Ok(results)
    }

    /// Number of indexed offers.
    pub fn len(&self) -> usize {
        self.hnsw.read().unwrap().size()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Persist the HNSW file. The document store is durable on write.
    pub fn save(&self) -> Result<(), IndexError> {
        let hnsw = self.hnsw.read().unwrap();
        let file = self.config.path.join("offers.usearch");
        let path_str = file
            .to_str()
            .ok_or_else(|| IndexError::Index("Invalid path encoding".to_string()))?;
        hnsw.save(path_str)
            .map_err(|e| IndexError::Index(format!("Failed to save: {}", e)))?;

        info!(path = ?file, offers = hnsw.size(), "Saved vector index");
        Ok(())
    }

    /// Current index statistics.
    pub fn stats(&self) -> IndexStats {
        let size_bytes = std::fs::metadata(self.config.path.join("offers.usearch"))
            .map(|m| m.len())
            .unwrap_or(0);

        IndexStats {
            offer_count: self.len(),
            dimension: self.config.dimension,
            size_bytes,
        }
    }
}
