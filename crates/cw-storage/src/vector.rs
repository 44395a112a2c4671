use std::collections::HashMap;
use std::path::{Path, PathBuf};

use cw_core::{ChunkId, ChunkRecord, Language, ProcessedChunk};
use rusqlite::{params, Connection};
use usearch::{Index, IndexOptions, MetricKind, ScalarKind};

use crate::error::StorageError;

/// Sub-batch limits bounding native memory during bulk upserts.
const MAX_FILES_PER_SUBBATCH: usize = 50;
const MAX_RECORDS_PER_SUBBATCH: usize = 5000;

/// A chunk as read back from the store (without its vector).
#[derive(Debug, Clone)]
pub struct StoredChunk {
    pub chunk_id: ChunkId,
    pub file_path: String,
    pub file_hash: String,
    pub chunk: ProcessedChunk,
}

/// A single k-NN search hit.
#[derive(Debug, Clone)]
pub struct VectorHit {
    pub record: StoredChunk,
    pub distance: f32,
}

/// Chunk-record vector store: a SQLite record table plus a usearch HNSW
/// index over the embeddings, both living in the project's `vectors/`
/// directory.
///
/// The monotonic-update contract is enforced on the record table: new
/// records are inserted before stale ones (`file_hash ≠ new`) are deleted,
/// so a crash in between leaves old and new coexisting rather than a gap.
/// The ANN index mirrors the table and is rebuilt from it when the two
/// disagree on startup.
pub struct VectorStore {
    conn: Connection,
    index: Index,
    dimension: usize,
    dir: PathBuf,
}

impl VectorStore {
    /// Open or create the vector store backing directory.
    ///
    /// A persisted ANN index with a different dimension is discarded along
    /// with the records; the scanner forces a reindex in that situation
    /// anyway.
    pub fn open(dir: &Path, dimension: usize) -> Result<Self, StorageError> {
        std::fs::create_dir_all(dir)?;
        let conn = Connection::open(dir.join("records.db"))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        create_schema(&conn)?;

        let index_path = dir.join("index.usearch");
        let mut index = create_index(dimension)?;
        if index_path.exists() {
            let loadable = index.load(index_path.to_str().unwrap_or("")).is_ok();
            if !loadable || index.dimensions() != dimension {
                tracing::warn!(dir = %dir.display(), "ANN index unusable, starting fresh");
                index = create_index(dimension)?;
                let _ = std::fs::remove_file(&index_path);
            }
        }

        let mut store = Self {
            conn,
            index,
            dimension,
            dir: dir.to_path_buf(),
        };
        store.rebuild_ann_if_diverged()?;
        Ok(store)
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of chunk records currently stored.
    pub fn count(&self) -> Result<usize, StorageError> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM chunks", [], |r| r.get(0))?;
        Ok(n as usize)
    }

    /// Monotonic upsert for one file: insert the new records first, then
    /// delete rows whose `file_hash` differs from the new one.
    pub fn upsert_file(
        &mut self,
        path: &str,
        new_hash: &str,
        records: &[ChunkRecord],
    ) -> Result<(), StorageError> {
        self.insert_records(records)?;
        self.delete_stale(&[(path.to_string(), new_hash.to_string())])?;
        self.persist_ann()?;
        Ok(())
    }

    /// Batched upsert across files, grouped into sub-batches of at most 50
    /// files and 5000 records: one insert transaction and one grouped stale
    /// delete per sub-batch.
    pub fn batch_upsert_files(
        &mut self,
        files: &[(String, String, Vec<ChunkRecord>)],
    ) -> Result<(), StorageError> {
        let mut batch_start = 0usize;
        while batch_start < files.len() {
            let mut batch_end = batch_start;
            let mut records = 0usize;
            while batch_end < files.len()
                && batch_end - batch_start < MAX_FILES_PER_SUBBATCH
                && (records == 0 || records + files[batch_end].2.len() <= MAX_RECORDS_PER_SUBBATCH)
            {
                records += files[batch_end].2.len();
                batch_end += 1;
            }

            let sub = &files[batch_start..batch_end];
            let all_records: Vec<&ChunkRecord> = sub.iter().flat_map(|(_, _, r)| r.iter()).collect();
            self.insert_record_refs(&all_records)?;
            let keys: Vec<(String, String)> = sub
                .iter()
                .map(|(p, h, _)| (p.clone(), h.clone()))
                .collect();
            self.delete_stale(&keys)?;

            batch_start = batch_end;
        }
        self.persist_ann()?;
        Ok(())
    }

    /// Remove every record for the given files.
    pub fn delete_files(&mut self, paths: &[String]) -> Result<(), StorageError> {
        if paths.is_empty() {
            return Ok(());
        }
        let placeholders = vec!["?"; paths.len()].join(", ");
        let sql = format!("SELECT ann_key FROM chunks WHERE file_path IN ({placeholders})");
        let keys: Vec<u64> = {
            let mut stmt = self.conn.prepare(&sql)?;
            let mut rows = stmt.query(rusqlite::params_from_iter(paths.iter()))?;
            let mut keys = Vec::new();
            while let Some(row) = rows.next()? {
                let key: i64 = row.get(0)?;
                keys.push(key as u64);
            }
            keys
        };

        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached("DELETE FROM chunks WHERE file_path = ?1")?;
            for path in paths {
                stmt.execute(params![path])?;
            }
        }
        tx.commit()?;

        for key in keys {
            if self.index.contains(key) {
                let _ = self.index.remove(key);
            }
        }
        self.persist_ann()?;
        Ok(())
    }

    /// k-NN search; `path_prefix` optionally restricts hits to one subtree.
    /// Hits are deduplicated by chunk id, keeping the smallest distance.
    pub fn search(
        &self,
        query: &[f32],
        k: usize,
        path_prefix: Option<&str>,
    ) -> Result<Vec<VectorHit>, StorageError> {
        if query.len() != self.dimension {
            return Err(StorageError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }
        if self.index.size() == 0 || k == 0 {
            return Ok(Vec::new());
        }

        // Over-fetch when filtering so the caller still gets k hits.
        let fetch = if path_prefix.is_some() { k.saturating_mul(4) } else { k };
        let matches = self
            .index
            .search(query, fetch)
            .map_err(|e| StorageError::VectorIndexUnavailable {
                reason: format!("search failed: {e}"),
            })?;

        let mut hits: Vec<VectorHit> = Vec::new();
        let mut seen: std::collections::HashSet<ChunkId> = std::collections::HashSet::new();
        for (&key, &distance) in matches.keys.iter().zip(matches.distances.iter()) {
            for record in self.records_by_ann_key(key)? {
                if let Some(prefix) = path_prefix {
                    if !record.file_path.starts_with(prefix) {
                        continue;
                    }
                }
                if seen.insert(record.chunk_id) {
                    hits.push(VectorHit { record, distance });
                }
            }
            if hits.len() >= k {
                break;
            }
        }
        hits.truncate(k);
        Ok(hits)
    }

    /// All chunks of one file, ordered by chunk index.
    pub fn get_file_chunks(&self, path: &str) -> Result<Vec<StoredChunk>, StorageError> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "SELECT {SELECT_COLUMNS} FROM chunks WHERE file_path = ?1 ORDER BY chunk_index"
        ))?;
        let mut rows = stmt.query(params![path])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(row_to_stored(row)?);
        }
        Ok(out)
    }

    /// Chunks for several files in one query, grouped by path.
    pub fn get_files_chunks(
        &self,
        paths: &[String],
    ) -> Result<HashMap<String, Vec<StoredChunk>>, StorageError> {
        let mut out: HashMap<String, Vec<StoredChunk>> = HashMap::new();
        if paths.is_empty() {
            return Ok(out);
        }
        let placeholders = vec!["?"; paths.len()].join(", ");
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM chunks WHERE file_path IN ({placeholders}) \
             ORDER BY file_path, chunk_index"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(rusqlite::params_from_iter(paths.iter()))?;
        while let Some(row) = rows.next()? {
            let stored = row_to_stored(row)?;
            out.entry(stored.file_path.clone()).or_default().push(stored);
        }
        Ok(out)
    }

    /// Drop every record and start a fresh ANN index (forced reindex).
    pub fn clear(&mut self) -> Result<(), StorageError> {
        self.conn.execute("DELETE FROM chunks", [])?;
        self.index = create_index(self.dimension)?;
        let _ = std::fs::remove_file(self.dir.join("index.usearch"));
        Ok(())
    }

    // -- internals --

    fn insert_records(&mut self, records: &[ChunkRecord]) -> Result<(), StorageError> {
        let refs: Vec<&ChunkRecord> = records.iter().collect();
        self.insert_record_refs(&refs)
    }

    fn insert_record_refs(&mut self, records: &[&ChunkRecord]) -> Result<(), StorageError> {
        if records.is_empty() {
            return Ok(());
        }

        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT OR REPLACE INTO chunks \
                 (chunk_id, ann_key, file_path, file_hash, chunk_index, language, breadcrumb, \
                  display_code, vector_text, start_index, end_index, raw_start, raw_end, \
                  vec_start, vec_end, vector) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
            )?;
            for rec in records {
                stmt.execute(params![
                    rec.chunk_id.to_hex(),
                    rec.chunk_id.ann_key() as i64,
                    rec.file_path,
                    rec.file_hash,
                    rec.chunk.chunk_index,
                    rec.chunk.language.tag(),
                    rec.chunk.breadcrumb,
                    rec.chunk.display_code,
                    rec.chunk.vector_text,
                    rec.chunk.start_index,
                    rec.chunk.end_index,
                    rec.chunk.raw_start,
                    rec.chunk.raw_end,
                    rec.chunk.vec_start,
                    rec.chunk.vec_end,
                    encode_vector(&rec.vector),
                ])?;
            }
        }
        tx.commit()?;

        self.ensure_capacity(records.len())?;
        for rec in records {
            let key = rec.chunk_id.ann_key();
            if self.index.contains(key) {
                let _ = self.index.remove(key);
            }
            self.index
                .add(key, &rec.vector)
                .map_err(|e| StorageError::VectorIndexUnavailable {
                    reason: format!("add failed: {e}"),
                })?;
        }
        Ok(())
    }

    /// Delete rows whose hash is stale for their file, ANN entries included.
    fn delete_stale(&mut self, files: &[(String, String)]) -> Result<(), StorageError> {
        if files.is_empty() {
            return Ok(());
        }

        let condition = vec!["(file_path = ? AND file_hash <> ?)"; files.len()].join(" OR ");
        let bind: Vec<&str> = files
            .iter()
            .flat_map(|(p, h)| [p.as_str(), h.as_str()])
            .collect();

        let select = format!("SELECT ann_key FROM chunks WHERE {condition}");
        let keys: Vec<u64> = {
            let mut stmt = self.conn.prepare(&select)?;
            let mut rows = stmt.query(rusqlite::params_from_iter(bind.iter()))?;
            let mut keys = Vec::new();
            while let Some(row) = rows.next()? {
                let key: i64 = row.get(0)?;
                keys.push(key as u64);
            }
            keys
        };

        let delete = format!("DELETE FROM chunks WHERE {condition}");
        self.conn
            .execute(&delete, rusqlite::params_from_iter(bind.iter()))?;

        for key in keys {
            if self.index.contains(key) {
                let _ = self.index.remove(key);
            }
        }
        Ok(())
    }

    fn records_by_ann_key(&self, key: u64) -> Result<Vec<StoredChunk>, StorageError> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "SELECT {SELECT_COLUMNS} FROM chunks WHERE ann_key = ?1"
        ))?;
        let mut rows = stmt.query(params![key as i64])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(row_to_stored(row)?);
        }
        Ok(out)
    }

    fn ensure_capacity(&mut self, additional: usize) -> Result<(), StorageError> {
        let needed = self.index.size() + additional;
        if needed > self.index.capacity() {
            let new_cap = needed.max(64) * 2;
            self.index
                .reserve(new_cap)
                .map_err(|e| StorageError::VectorIndexUnavailable {
                    reason: format!("reserve failed: {e}"),
                })?;
        }
        Ok(())
    }

    fn persist_ann(&self) -> Result<(), StorageError> {
        let path = self.dir.join("index.usearch");
        self.index
            .save(path.to_str().unwrap_or(""))
            .map_err(|e| StorageError::VectorIndexUnavailable {
                reason: format!("save failed: {e}"),
            })
    }

    /// After a crash the persisted ANN index can lag the record table.
    /// Rebuild it from the stored vectors when the sizes disagree.
    fn rebuild_ann_if_diverged(&mut self) -> Result<(), StorageError> {
        let record_count = self.count()?;
        if self.index.size() == record_count {
            return Ok(());
        }
        tracing::info!(
            records = record_count,
            ann = self.index.size(),
            "rebuilding ANN index from record table"
        );

        self.index = create_index(self.dimension)?;
        self.ensure_capacity(record_count)?;

        let mut stmt = self
            .conn
            .prepare("SELECT ann_key, vector FROM chunks")?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let key: i64 = row.get(0)?;
            let blob: Vec<u8> = row.get(1)?;
            let vector = decode_vector(&blob);
            if vector.len() == self.dimension {
                let key = key as u64;
                if self.index.contains(key) {
                    let _ = self.index.remove(key);
                }
                self.index
                    .add(key, &vector)
                    .map_err(|e| StorageError::VectorIndexUnavailable {
                        reason: format!("rebuild add failed: {e}"),
                    })?;
            }
        }
        drop(rows);
        drop(stmt);
        self.persist_ann()?;
        Ok(())
    }
}

const SELECT_COLUMNS: &str = "chunk_id, file_path, file_hash, chunk_index, language, breadcrumb, \
     display_code, vector_text, start_index, end_index, raw_start, raw_end, vec_start, vec_end";

fn row_to_stored(row: &rusqlite::Row<'_>) -> Result<StoredChunk, StorageError> {
    let chunk_id_hex: String = row.get(0)?;
    let chunk_id = ChunkId::from_hex(&chunk_id_hex).ok_or(StorageError::TransactionFailed {
        reason: format!("invalid chunk id: {chunk_id_hex}"),
    })?;
    let language_tag: String = row.get(4)?;
    let language = Language::from_tag(&language_tag).ok_or(StorageError::TransactionFailed {
        reason: format!("invalid language tag: {language_tag}"),
    })?;
    let chunk_index: i64 = row.get(3)?;

    Ok(StoredChunk {
        chunk_id,
        file_path: row.get(1)?,
        file_hash: row.get(2)?,
        chunk: ProcessedChunk {
            display_code: row.get(6)?,
            vector_text: row.get(7)?,
            breadcrumb: row.get(5)?,
            language,
            chunk_index: chunk_index as u32,
            start_index: row.get::<_, i64>(8)? as u32,
            end_index: row.get::<_, i64>(9)? as u32,
            raw_start: row.get::<_, i64>(10)? as u32,
            raw_end: row.get::<_, i64>(11)? as u32,
            vec_start: row.get::<_, i64>(12)? as u32,
            vec_end: row.get::<_, i64>(13)? as u32,
        },
    })
}

fn encode_vector(vector: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(vector.len() * 4);
    for v in vector {
        out.extend_from_slice(&v.to_le_bytes());
    }
    out
}

fn decode_vector(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

fn create_index(dimension: usize) -> Result<Index, StorageError> {
    let mut options = IndexOptions::default();
    options.dimensions = dimension;
    options.metric = MetricKind::Cos;
    options.quantization = ScalarKind::F32;
    options.connectivity = 32;
    options.expansion_add = 200;
    options.expansion_search = 100;

    Index::new(&options).map_err(|e| StorageError::VectorIndexUnavailable {
        reason: format!("failed to create index: {e}"),
    })
}

fn create_schema(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS chunks (
            chunk_id TEXT PRIMARY KEY,
            ann_key INTEGER NOT NULL,
            file_path TEXT NOT NULL,
            file_hash TEXT NOT NULL,
            chunk_index INTEGER NOT NULL,
            language TEXT NOT NULL,
            breadcrumb TEXT NOT NULL,
            display_code TEXT NOT NULL,
            vector_text TEXT NOT NULL,
            start_index INTEGER NOT NULL,
            end_index INTEGER NOT NULL,
            raw_start INTEGER NOT NULL,
            raw_end INTEGER NOT NULL,
            vec_start INTEGER NOT NULL,
            vec_end INTEGER NOT NULL,
            vector BLOB NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_chunks_file ON chunks(file_path);
        CREATE INDEX IF NOT EXISTS idx_chunks_ann ON chunks(ann_key);",
    )?;
    Ok(())
}
