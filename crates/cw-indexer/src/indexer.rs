use cw_core::{ChunkRecord, ProcessedChunk};
use cw_remote::Embedder;
use cw_storage::{RowStore, VectorStore};

use crate::error::IndexerError;
use crate::report::VectorIndexStats;

/// Files handed to `batch_upsert_files` per group, matching the vector
/// store's own sub-batch ceiling.
const UPSERT_GROUP_FILES: usize = 50;

/// One file due for (re)embedding.
#[derive(Debug)]
pub struct FileToIndex {
    pub path: String,
    pub hash: String,
    pub chunks: Vec<ProcessedChunk>,
}

/// Vector-indexing phase: embed chunk texts, upsert vector records, then
/// commit the chunk FTS rows and `vector_index_hash` per file.
///
/// The write ordering is deliberate: vectors land durably before the row
/// store admits to them. A crash in between leaves `vector_index_hash ≠
/// hash`, which the next scan repairs by re-embedding (the monotonic upsert
/// keeps the old vectors queryable until then).
pub fn index_files(
    row: &mut RowStore,
    vector: &mut VectorStore,
    embedder: &dyn Embedder,
    files: Vec<FileToIndex>,
    deleted: &[String],
) -> Result<VectorIndexStats, IndexerError> {
    let mut stats = VectorIndexStats::default();

    if !deleted.is_empty() {
        vector.delete_files(deleted)?;
        stats.deleted = deleted.len();
    }

    for group in files.chunks(UPSERT_GROUP_FILES) {
        let mut upserts: Vec<(String, String, Vec<ChunkRecord>)> = Vec::with_capacity(group.len());

        for file in group {
            let texts: Vec<String> = file.chunks.iter().map(|c| c.vector_text.clone()).collect();
            let vectors = if texts.is_empty() {
                Vec::new()
            } else {
                embedder.embed(&texts)?
            };

            let records: Vec<ChunkRecord> = vectors
                .into_iter()
                .zip(file.chunks.iter())
                .map(|(v, chunk)| ChunkRecord::new(&file.path, &file.hash, v, chunk.clone()))
                .collect();
            stats.embedded_chunks += records.len();
            upserts.push((file.path.clone(), file.hash.clone(), records));
        }

        vector.batch_upsert_files(&upserts)?;

        for file in group {
            row.commit_file_index(&file.path, &file.hash, &file.chunks)?;
            stats.indexed += 1;
        }
    }

    tracing::info!(
        indexed = stats.indexed,
        deleted = stats.deleted,
        chunks = stats.embedded_chunks,
        "vector indexing done"
    );
    Ok(stats)
}
