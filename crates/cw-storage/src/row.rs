use std::collections::HashMap;
use std::path::Path;

use cw_core::ProcessedChunk;
use rusqlite::{params, Connection};

use crate::error::StorageError;

/// Extra rows requested in the relaxed OR pass beyond the strict-pass
/// shortfall.
const RELAXED_PASS_BUFFER: usize = 10;

/// A row in the `files` table. `content` is null for files whose text was
/// not persisted (skipped/binary); `vector_index_hash` names the file version
/// whose vectors are known durably written.
#[derive(Debug, Clone)]
pub struct FileRecord {
    pub path: String,
    pub hash: String,
    pub mtime: i64,
    pub size: i64,
    pub content: Option<String>,
    pub language: String,
    pub vector_index_hash: Option<String>,
}

/// Hash/stat snapshot loaded at scan start for change detection.
#[derive(Debug, Clone)]
pub struct KnownFile {
    pub path: String,
    pub hash: String,
    pub mtime: i64,
    pub size: i64,
    pub vector_index_hash: Option<String>,
    /// Rows without content (skipped files) never need vectors.
    pub has_content: bool,
}

/// A BM25 hit from `files_fts`.
#[derive(Debug, Clone)]
pub struct FtsHit {
    pub path: String,
    pub score: f64,
}

/// A BM25 hit from `chunks_fts`.
#[derive(Debug, Clone)]
pub struct ChunkFtsHit {
    pub chunk_id: String,
    pub file_path: String,
    pub chunk_index: u32,
    pub breadcrumb: String,
    pub content: String,
    pub score: f64,
}

/// SQLite row store: file metadata plus the two full-text mirrors.
///
/// Every batch operation runs in one transaction, FTS mirror writes
/// included, so a crash never leaves the mirrors ahead of the rows.
pub struct RowStore {
    conn: Connection,
    trigram: bool,
}

impl RowStore {
    /// Open or create the row store at the given path.
    pub fn open(db_path: &Path) -> Result<Self, StorageError> {
        let conn = Connection::open(db_path)?;
        Self::init(conn)
    }

    /// In-memory store for tests.
    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StorageError> {
        configure_pragmas(&conn)?;
        let trigram = probe_trigram(&conn);
        create_schema(&conn, trigram)?;
        Ok(Self { conn, trigram })
    }

    /// Whether this connection's FTS tables use the trigram tokenizer.
    pub fn trigram_tokenizer(&self) -> bool {
        self.trigram
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    // -- metadata KV --

    pub fn get_meta(&self, key: &str) -> Result<Option<String>, StorageError> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT value FROM metadata WHERE key = ?1")?;
        let mut rows = stmt.query(params![key])?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    pub fn set_meta(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    // -- files --

    /// Upsert file rows and mirror `files_fts` in the same transaction.
    /// New and modified rows arrive with `vector_index_hash = NULL`; the
    /// indexer promotes it once vectors are durably written.
    pub fn upsert_files(&mut self, records: &[FileRecord]) -> Result<(), StorageError> {
        let tx = self.conn.transaction()?;
        {
            let mut upsert = tx.prepare_cached(
                "INSERT OR REPLACE INTO files \
                 (path, hash, mtime, size, content, language, vector_index_hash) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            let mut fts_delete = tx.prepare_cached("DELETE FROM files_fts WHERE path = ?1")?;
            let mut fts_insert =
                tx.prepare_cached("INSERT INTO files_fts (path, content) VALUES (?1, ?2)")?;

            for rec in records {
                upsert.execute(params![
                    rec.path,
                    rec.hash,
                    rec.mtime,
                    rec.size,
                    rec.content.as_deref(),
                    rec.language,
                    rec.vector_index_hash.as_deref(),
                ])?;
                fts_delete.execute(params![rec.path])?;
                if let Some(content) = rec.content.as_deref() {
                    fts_insert.execute(params![rec.path, content])?;
                }
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Refresh mtimes for unchanged files in one transaction.
    pub fn update_mtimes(&mut self, updates: &[(String, i64)]) -> Result<(), StorageError> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached("UPDATE files SET mtime = ?2 WHERE path = ?1")?;
            for (path, mtime) in updates {
                stmt.execute(params![path, mtime])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Delete file rows together with their FTS mirrors (both tables).
    pub fn delete_files(&mut self, paths: &[String]) -> Result<(), StorageError> {
        let tx = self.conn.transaction()?;
        {
            let mut del_file = tx.prepare_cached("DELETE FROM files WHERE path = ?1")?;
            let mut del_fts = tx.prepare_cached("DELETE FROM files_fts WHERE path = ?1")?;
            let mut del_chunks = tx.prepare_cached("DELETE FROM chunks_fts WHERE file_path = ?1")?;
            for path in paths {
                del_file.execute(params![path])?;
                del_fts.execute(params![path])?;
                del_chunks.execute(params![path])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Load the change-detection snapshot for every known file.
    pub fn load_known(&self) -> Result<Vec<KnownFile>, StorageError> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT path, hash, mtime, size, vector_index_hash, content IS NOT NULL FROM files",
        )?;
        let mut rows = stmt.query([])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(KnownFile {
                path: row.get(0)?,
                hash: row.get(1)?,
                mtime: row.get(2)?,
                size: row.get(3)?,
                vector_index_hash: row.get(4)?,
                has_content: row.get(5)?,
            });
        }
        Ok(out)
    }

    pub fn get_file(&self, path: &str) -> Result<Option<FileRecord>, StorageError> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT path, hash, mtime, size, content, language, vector_index_hash \
             FROM files WHERE path = ?1",
        )?;
        let mut rows = stmt.query(params![path])?;
        match rows.next()? {
            Some(row) => Ok(Some(FileRecord {
                path: row.get(0)?,
                hash: row.get(1)?,
                mtime: row.get(2)?,
                size: row.get(3)?,
                content: row.get(4)?,
                language: row.get(5)?,
                vector_index_hash: row.get(6)?,
            })),
            None => Ok(None),
        }
    }

    /// Batch-load contents for the packer in one query.
    pub fn get_contents(&self, paths: &[String]) -> Result<HashMap<String, String>, StorageError> {
        let mut out = HashMap::with_capacity(paths.len());
        if paths.is_empty() {
            return Ok(out);
        }
        let placeholders = vec!["?"; paths.len()].join(", ");
        let sql = format!(
            "SELECT path, content FROM files WHERE content IS NOT NULL AND path IN ({placeholders})"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(rusqlite::params_from_iter(paths.iter()))?;
        while let Some(row) = rows.next()? {
            out.insert(row.get(0)?, row.get(1)?);
        }
        Ok(out)
    }

    /// All known paths, for the import-graph resolver set.
    pub fn list_paths(&self) -> Result<Vec<String>, StorageError> {
        let mut stmt = self.conn.prepare_cached("SELECT path FROM files ORDER BY path")?;
        let mut rows = stmt.query([])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(row.get(0)?);
        }
        Ok(out)
    }

    pub fn count_files(&self) -> Result<usize, StorageError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM files", [], |r| r.get(0))?;
        Ok(count as usize)
    }

    /// Full truncation for a forced reindex: files plus both FTS mirrors.
    pub fn truncate_files(&mut self) -> Result<(), StorageError> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM files", [])?;
        tx.execute("DELETE FROM files_fts", [])?;
        tx.execute("DELETE FROM chunks_fts", [])?;
        tx.commit()?;
        Ok(())
    }

    // -- chunk FTS + vector bookkeeping --

    /// Commit a file's vector-indexing result: replace its chunk FTS rows and
    /// promote `vector_index_hash`, atomically. Called only after the vector
    /// store reported a durable upsert.
    pub fn commit_file_index(
        &mut self,
        path: &str,
        hash: &str,
        chunks: &[ProcessedChunk],
    ) -> Result<(), StorageError> {
        let tx = self.conn.transaction()?;
        {
            tx.execute("DELETE FROM chunks_fts WHERE file_path = ?1", params![path])?;
            let mut insert = tx.prepare_cached(
                "INSERT INTO chunks_fts (chunk_id, file_path, chunk_index, breadcrumb, content) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for chunk in chunks {
                let chunk_id = cw_core::ChunkId::generate(path, hash, chunk.chunk_index).to_hex();
                insert.execute(params![
                    chunk_id,
                    path,
                    chunk.chunk_index,
                    chunk.breadcrumb,
                    chunk.display_code,
                ])?;
            }
            tx.execute(
                "UPDATE files SET vector_index_hash = ?2 WHERE path = ?1",
                params![path, hash],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Drop chunk FTS rows for deleted files.
    pub fn purge_chunk_fts(&mut self, paths: &[String]) -> Result<(), StorageError> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached("DELETE FROM chunks_fts WHERE file_path = ?1")?;
            for path in paths {
                stmt.execute(params![path])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    // -- BM25 search --

    /// Two-pass BM25 over `files_fts`: strict AND first, relaxed OR top-up.
    pub fn search_files_bm25(
        &self,
        tokens: &[String],
        limit: usize,
    ) -> Result<Vec<FtsHit>, StorageError> {
        if tokens.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let mut hits: Vec<FtsHit> = Vec::new();
        let mut seen: std::collections::HashSet<String> = std::collections::HashSet::new();

        let strict = build_match_expr(tokens, "AND");
        self.query_files_fts(&strict, limit, &mut hits, &mut seen)?;

        if hits.len() < limit && tokens.len() > 1 {
            let relaxed = build_match_expr(tokens, "OR");
            let remaining = limit - hits.len() + RELAXED_PASS_BUFFER;
            self.query_files_fts(&relaxed, remaining, &mut hits, &mut seen)?;
        }

        hits.truncate(limit);
        Ok(hits)
    }

    fn query_files_fts(
        &self,
        match_expr: &str,
        limit: usize,
        hits: &mut Vec<FtsHit>,
        seen: &mut std::collections::HashSet<String>,
    ) -> Result<(), StorageError> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT path, bm25(files_fts) FROM files_fts \
             WHERE files_fts MATCH ?1 ORDER BY bm25(files_fts), path LIMIT ?2",
        )?;
        let mut rows = match stmt.query(params![match_expr, limit as i64]) {
            Ok(rows) => rows,
            // A query that survived sanitization can still be an empty or
            // malformed MATCH expression; treat as no hits.
            Err(e) => {
                tracing::debug!(error = %e, "files_fts match failed");
                return Ok(());
            }
        };
        while let Some(row) = rows.next()? {
            let path: String = row.get(0)?;
            let rank: f64 = row.get(1)?;
            if seen.insert(path.clone()) {
                hits.push(FtsHit { path, score: -rank });
            }
        }
        Ok(())
    }

    /// Two-pass BM25 over `chunks_fts`.
    pub fn search_chunks_bm25(
        &self,
        tokens: &[String],
        limit: usize,
    ) -> Result<Vec<ChunkFtsHit>, StorageError> {
        if tokens.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let mut hits: Vec<ChunkFtsHit> = Vec::new();
        let mut seen: std::collections::HashSet<String> = std::collections::HashSet::new();

        let strict = build_match_expr(tokens, "AND");
        self.query_chunks_fts(&strict, limit, &mut hits, &mut seen)?;

        if hits.len() < limit && tokens.len() > 1 {
            let relaxed = build_match_expr(tokens, "OR");
            let remaining = limit - hits.len() + RELAXED_PASS_BUFFER;
            self.query_chunks_fts(&relaxed, remaining, &mut hits, &mut seen)?;
        }

        hits.truncate(limit);
        Ok(hits)
    }

    fn query_chunks_fts(
        &self,
        match_expr: &str,
        limit: usize,
        hits: &mut Vec<ChunkFtsHit>,
        seen: &mut std::collections::HashSet<String>,
    ) -> Result<(), StorageError> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT chunk_id, file_path, chunk_index, breadcrumb, content, bm25(chunks_fts) \
             FROM chunks_fts WHERE chunks_fts MATCH ?1 \
             ORDER BY bm25(chunks_fts), file_path, chunk_index LIMIT ?2",
        )?;
        let mut rows = match stmt.query(params![match_expr, limit as i64]) {
            Ok(rows) => rows,
            Err(e) => {
                tracing::debug!(error = %e, "chunks_fts match failed");
                return Ok(());
            }
        };
        while let Some(row) = rows.next()? {
            let chunk_id: String = row.get(0)?;
            if seen.insert(chunk_id.clone()) {
                let chunk_index: i64 = row.get(2)?;
                let rank: f64 = row.get(5)?;
                hits.push(ChunkFtsHit {
                    chunk_id,
                    file_path: row.get(1)?,
                    chunk_index: chunk_index as u32,
                    breadcrumb: row.get(3)?,
                    content: row.get(4)?,
                    score: -rank,
                });
            }
        }
        Ok(())
    }
}

/// Each token is double-quoted (embedded quotes doubled) and joined with the
/// given operator.
fn build_match_expr(tokens: &[String], op: &str) -> String {
    tokens
        .iter()
        .map(|t| format!("\"{}\"", t.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(&format!(" {op} "))
}

fn configure_pragmas(conn: &Connection) -> Result<(), StorageError> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    Ok(())
}

/// Probe trigram tokenizer support with a throwaway virtual table; the
/// result is cached per connection.
fn probe_trigram(conn: &Connection) -> bool {
    let created = conn
        .execute_batch(
            "CREATE VIRTUAL TABLE temp.__trigram_probe USING fts5(x, tokenize='trigram'); \
             DROP TABLE temp.__trigram_probe;",
        )
        .is_ok();
    created
}

fn create_schema(conn: &Connection, trigram: bool) -> Result<(), StorageError> {
    let tokenizer = if trigram { "trigram" } else { "unicode61" };
    conn.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS files (
            path TEXT PRIMARY KEY,
            hash TEXT NOT NULL,
            mtime INTEGER NOT NULL,
            size INTEGER NOT NULL,
            content TEXT,
            language TEXT NOT NULL,
            vector_index_hash TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_files_hash ON files(hash);
        CREATE INDEX IF NOT EXISTS idx_files_mtime ON files(mtime);
        CREATE TABLE IF NOT EXISTS metadata (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );
        CREATE VIRTUAL TABLE IF NOT EXISTS files_fts USING fts5(
            path, content, tokenize='{tokenizer}'
        );
        CREATE VIRTUAL TABLE IF NOT EXISTS chunks_fts USING fts5(
            chunk_id UNINDEXED, file_path UNINDEXED, chunk_index UNINDEXED,
            breadcrumb, content, tokenize='{tokenizer}'
        );"
    ))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cw_core::Language;

    fn make_record(path: &str, hash: &str, content: &str) -> FileRecord {
        FileRecord {
            path: path.to_string(),
            hash: hash.to_string(),
            mtime: 1000,
            size: content.len() as i64,
            content: Some(content.to_string()),
            language: "typescript".to_string(),
            vector_index_hash: None,
        }
    }

    fn make_chunk(index: u32, breadcrumb: &str, code: &str) -> ProcessedChunk {
        ProcessedChunk {
            display_code: code.to_string(),
            vector_text: format!("// Context: {breadcrumb}\n{code}"),
            breadcrumb: breadcrumb.to_string(),
            language: Language::TypeScript,
            chunk_index: index,
            start_index: 0,
            end_index: code.len() as u32,
            raw_start: 0,
            raw_end: code.len() as u32,
            vec_start: 0,
            vec_end: code.len() as u32,
        }
    }

    #[test]
    fn file_round_trip() {
        let mut store = RowStore::open_in_memory().unwrap();
        let rec = make_record("src/a.ts", "hash1", "export function a() {}");
        store.upsert_files(&[rec.clone()]).unwrap();

        let loaded = store.get_file("src/a.ts").unwrap().unwrap();
        assert_eq!(loaded.path, rec.path);
        assert_eq!(loaded.hash, rec.hash);
        assert_eq!(loaded.content, rec.content);
        assert_eq!(loaded.vector_index_hash, None);
        assert_eq!(store.count_files().unwrap(), 1);
    }

    #[test]
    fn upsert_replaces_existing() {
        let mut store = RowStore::open_in_memory().unwrap();
        store.upsert_files(&[make_record("a.ts", "h1", "old body")]).unwrap();
        store.upsert_files(&[make_record("a.ts", "h2", "new body")]).unwrap();

        assert_eq!(store.count_files().unwrap(), 1);
        let loaded = store.get_file("a.ts").unwrap().unwrap();
        assert_eq!(loaded.hash, "h2");

        // FTS mirror also replaced: old text no longer matches.
        let hits = store
            .search_files_bm25(&["old".to_string()], 10)
            .unwrap();
        assert!(hits.is_empty());
        let hits = store
            .search_files_bm25(&["new".to_string()], 10)
            .unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn delete_purges_all_mirrors() {
        let mut store = RowStore::open_in_memory().unwrap();
        store.upsert_files(&[make_record("a.ts", "h1", "searchable body")]).unwrap();
        store
            .commit_file_index("a.ts", "h1", &[make_chunk(0, "a.ts", "searchable body")])
            .unwrap();

        store.delete_files(&["a.ts".to_string()]).unwrap();

        assert_eq!(store.count_files().unwrap(), 0);
        assert!(store.search_files_bm25(&["searchable".to_string()], 10).unwrap().is_empty());
        assert!(store.search_chunks_bm25(&["searchable".to_string()], 10).unwrap().is_empty());
    }

    #[test]
    fn commit_file_index_sets_vector_hash() {
        let mut store = RowStore::open_in_memory().unwrap();
        store.upsert_files(&[make_record("a.ts", "h1", "function greet() {}")]).unwrap();

        assert_eq!(store.get_file("a.ts").unwrap().unwrap().vector_index_hash, None);

        store
            .commit_file_index("a.ts", "h1", &[make_chunk(0, "a.ts > function greet", "function greet() {}")])
            .unwrap();

        let loaded = store.get_file("a.ts").unwrap().unwrap();
        assert_eq!(loaded.vector_index_hash.as_deref(), Some("h1"));

        let hits = store.search_chunks_bm25(&["greet".to_string()], 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].file_path, "a.ts");
        assert_eq!(hits[0].chunk_index, 0);
        assert!(hits[0].score.is_finite());
    }

    #[test]
    fn chunk_fts_rows_replaced_per_file() {
        let mut store = RowStore::open_in_memory().unwrap();
        store.upsert_files(&[make_record("a.ts", "h1", "alpha")]).unwrap();
        store
            .commit_file_index("a.ts", "h1", &[make_chunk(0, "a.ts", "alpha alpha")])
            .unwrap();
        store
            .commit_file_index("a.ts", "h2", &[make_chunk(0, "a.ts", "beta beta")])
            .unwrap();

        assert!(store.search_chunks_bm25(&["alpha".to_string()], 10).unwrap().is_empty());
        assert_eq!(store.search_chunks_bm25(&["beta".to_string()], 10).unwrap().len(), 1);
    }

    #[test]
    fn strict_pass_requires_all_tokens() {
        let mut store = RowStore::open_in_memory().unwrap();
        store.upsert_files(&[
            make_record("both.ts", "h1", "alpha beta gamma"),
            make_record("one.ts", "h2", "alpha delta epsilon"),
        ]).unwrap();

        // Both tokens → only both.ts in the strict pass, but the relaxed
        // pass tops up with one.ts.
        let hits = store
            .search_files_bm25(&["alpha".to_string(), "beta".to_string()], 10)
            .unwrap();
        assert_eq!(hits[0].path, "both.ts");
        assert!(hits.iter().any(|h| h.path == "one.ts"));
    }

    #[test]
    fn bm25_scores_are_negated_positive() {
        let mut store = RowStore::open_in_memory().unwrap();
        store.upsert_files(&[make_record("a.ts", "h1", "token token token")]).unwrap();

        let hits = store.search_files_bm25(&["token".to_string()], 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].score > 0.0, "negated bm25 should be positive, got {}", hits[0].score);
    }

    #[test]
    fn empty_tokens_no_hits() {
        let store = RowStore::open_in_memory().unwrap();
        assert!(store.search_files_bm25(&[], 10).unwrap().is_empty());
        assert!(store.search_chunks_bm25(&[], 10).unwrap().is_empty());
    }

    #[test]
    fn load_known_and_mtime_update() {
        let mut store = RowStore::open_in_memory().unwrap();
        store.upsert_files(&[make_record("a.ts", "h1", "body")]).unwrap();

        store.update_mtimes(&[("a.ts".to_string(), 2000)]).unwrap();
        let known = store.load_known().unwrap();
        assert_eq!(known.len(), 1);
        assert_eq!(known[0].mtime, 2000);
        assert_eq!(known[0].hash, "h1");
    }

    #[test]
    fn metadata_round_trip() {
        let mut store = RowStore::open_in_memory().unwrap();
        assert_eq!(store.get_meta("embedding_dimensions").unwrap(), None);
        store.set_meta("embedding_dimensions", "768").unwrap();
        assert_eq!(
            store.get_meta("embedding_dimensions").unwrap().as_deref(),
            Some("768")
        );
        store.set_meta("embedding_dimensions", "1024").unwrap();
        assert_eq!(
            store.get_meta("embedding_dimensions").unwrap().as_deref(),
            Some("1024")
        );
    }

    #[test]
    fn truncate_clears_everything() {
        let mut store = RowStore::open_in_memory().unwrap();
        store.upsert_files(&[make_record("a.ts", "h1", "body text")]).unwrap();
        store
            .commit_file_index("a.ts", "h1", &[make_chunk(0, "a.ts", "body text")])
            .unwrap();

        store.truncate_files().unwrap();

        assert_eq!(store.count_files().unwrap(), 0);
        assert!(store.search_files_bm25(&["body".to_string()], 10).unwrap().is_empty());
        assert!(store.search_chunks_bm25(&["body".to_string()], 10).unwrap().is_empty());
    }

    #[test]
    fn get_contents_batch() {
        let mut store = RowStore::open_in_memory().unwrap();
        store.upsert_files(&[
            make_record("a.ts", "h1", "content a"),
            make_record("b.ts", "h2", "content b"),
        ]).unwrap();

        let contents = store
            .get_contents(&["a.ts".to_string(), "b.ts".to_string(), "missing.ts".to_string()])
            .unwrap();
        assert_eq!(contents.len(), 2);
        assert_eq!(contents["a.ts"], "content a");
    }

    #[test]
    fn match_expr_quoting() {
        assert_eq!(
            build_match_expr(&["foo".to_string(), "bar".to_string()], "AND"),
            "\"foo\" AND \"bar\""
        );
        assert_eq!(build_match_expr(&["a\"b".to_string()], "OR"), "\"a\"\"b\"");
    }
}
