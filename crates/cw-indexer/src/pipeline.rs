use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::time::Instant;

use cw_core::{Language, ProjectId};
use cw_remote::Embedder;
use cw_storage::row::{FileRecord, KnownFile};
use cw_storage::{ProcessLock, ProjectPaths, RowStore, VectorStore};
use rayon::prelude::*;

use crate::error::IndexerError;
use crate::indexer::{index_files, FileToIndex};
use crate::process::{process_file, reload_for_vectors, FileOutcome};
use crate::report::{ScanOptions, ScanReport, VectorIndexStats};
use crate::scanner::crawl_files;

/// Files processed per parallel batch.
const PROCESS_BATCH_SIZE: usize = 100;

/// Metadata key recording the embedding dimension the index was built with.
const META_EMBEDDING_DIMENSIONS: &str = "embedding_dimensions";

/// Worker pool size: `clamp(cpu_count - 1, 4, 32)`.
fn adaptive_concurrency() -> usize {
    num_cpus::get().saturating_sub(1).clamp(4, 32)
}

/// Run a full incremental scan of `project_root` under the project lock.
///
/// Crawl → change-detect → parallel per-file processing → row-store
/// reconcile → vector indexing (with self-healing). `embedder` may be `None`
/// only when `opts.vector_index` is false.
#[tracing::instrument(skip_all, fields(root = %project_root.display()))]
pub fn scan(
    project_root: &Path,
    opts: &ScanOptions,
    embedder: Option<&dyn Embedder>,
) -> Result<ScanReport, IndexerError> {
    let start = Instant::now();

    let project_id = ProjectId::derive(project_root);
    let paths = match &opts.base_dir {
        Some(base) => ProjectPaths::at_base(base, &project_id)?,
        None => ProjectPaths::for_project(&project_id)?,
    };
    let _lock = ProcessLock::acquire(&paths.lock_file(), "scan")?;

    let mut row = RowStore::open(&paths.index_db())?;

    let vector_enabled = opts.vector_index && embedder.is_some();
    let mut forced_reindex = false;
    let mut vector: Option<VectorStore> = None;

    if vector_enabled {
        let dims = embedder.unwrap().dimensions();
        let stored = row
            .get_meta(META_EMBEDDING_DIMENSIONS)?
            .and_then(|v| v.parse::<usize>().ok());
        if let Some(stored) = stored {
            if stored != dims {
                tracing::info!(stored, new = dims, "embedding dimension changed, forcing reindex");
                forced_reindex = true;
            }
        }
        row.set_meta(META_EMBEDDING_DIMENSIONS, &dims.to_string())?;

        let mut store = VectorStore::open(&paths.vectors_dir(), dims)?;
        if forced_reindex {
            row.truncate_files()?;
            store.clear()?;
        }
        vector = Some(store);
    }

    let known: HashMap<String, KnownFile> = row
        .load_known()?
        .into_iter()
        .map(|k| (k.path.clone(), k))
        .collect();

    let crawled = crawl_files(project_root);
    let language_of: HashMap<&str, Language> =
        crawled.iter().map(|(p, l)| (p.as_str(), *l)).collect();
    tracing::info!(files = crawled.len(), known = known.len(), "crawl complete");

    // Parallel per-file processing, batched to bound peak memory.
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(adaptive_concurrency())
        .build()
        .map_err(|e| IndexerError::PipelineFailed {
            stage: "thread_pool".to_string(),
            reason: e.to_string(),
        })?;

    let mut outcomes: Vec<FileOutcome> = Vec::with_capacity(crawled.len());
    for batch in crawled.chunks(PROCESS_BATCH_SIZE) {
        let batch_outcomes: Vec<FileOutcome> = pool.install(|| {
            batch
                .par_iter()
                .map(|(path, language)| {
                    process_file(project_root, path, *language, known.get(path), &opts.splitter)
                })
                .collect()
        });
        outcomes.extend(batch_outcomes);
    }

    // Reconcile.
    let mut report = ScanReport {
        added: 0,
        modified: 0,
        unchanged: 0,
        deleted: 0,
        skipped: HashMap::new(),
        errors: 0,
        failed_details: Vec::new(),
        vector_stats: VectorIndexStats::default(),
        forced_reindex,
        duration: start.elapsed(),
    };

    let mut upserts: Vec<FileRecord> = Vec::new();
    let mut mtime_updates: Vec<(String, i64)> = Vec::new();
    let mut unchanged_paths: HashSet<String> = HashSet::new();
    let mut newly_skipped: Vec<String> = Vec::new();
    let mut to_index: Vec<FileToIndex> = Vec::new();

    for outcome in outcomes {
        match outcome {
            FileOutcome::Added(p) => {
                report.added += 1;
                if vector_enabled {
                    to_index.push(FileToIndex {
                        path: p.record.path.clone(),
                        hash: p.record.hash.clone(),
                        chunks: p.chunks,
                    });
                }
                upserts.push(p.record);
            }
            FileOutcome::Modified(p) => {
                report.modified += 1;
                if vector_enabled {
                    to_index.push(FileToIndex {
                        path: p.record.path.clone(),
                        hash: p.record.hash.clone(),
                        chunks: p.chunks,
                    });
                }
                upserts.push(p.record);
            }
            FileOutcome::Unchanged { path, mtime } => {
                report.unchanged += 1;
                mtime_updates.push((path.clone(), mtime));
                unchanged_paths.insert(path);
            }
            FileOutcome::Skipped { path, reason, record } => {
                *report.skipped.entry(reason).or_insert(0) += 1;
                // Skipped files keep a contentless row so later scans can
                // classify them from the stat alone. A file that used to be
                // indexed with content loses its chunks too.
                if known.get(&path).map(|k| k.has_content).unwrap_or(false) {
                    newly_skipped.push(path);
                }
                upserts.push(record);
            }
            FileOutcome::Failed { path, reason } => {
                report.errors += 1;
                tracing::warn!(path = %path, reason = %reason, "file processing failed");
                report.failed_details.push((path, reason));
            }
        }
    }

    row.upsert_files(&upserts)?;
    row.update_mtimes(&mtime_updates)?;

    let crawled_set: HashSet<&str> = crawled.iter().map(|(p, _)| p.as_str()).collect();
    let deleted: Vec<String> = known
        .keys()
        .filter(|p| !crawled_set.contains(p.as_str()))
        .cloned()
        .collect();
    report.deleted = deleted.len();
    row.delete_files(&deleted)?;
    row.purge_chunk_fts(&newly_skipped)?;

    // Vector phase: changed files, plus unchanged rows whose durable vector
    // hash disagrees with the content hash (crash recovery).
    if let Some(vector) = vector.as_mut() {
        let embedder = embedder.unwrap();
        for path in &unchanged_paths {
            let Some(k) = known.get(path) else { continue };
            if !k.has_content || k.vector_index_hash.as_deref() == Some(k.hash.as_str()) {
                continue;
            }
            let Some(language) = language_of.get(path.as_str()) else { continue };
            tracing::info!(path = %path, "self-healing vector index");
            if let Some((hash, chunks)) =
                reload_for_vectors(project_root, path, *language, &k.hash, &opts.splitter)
            {
                to_index.push(FileToIndex {
                    path: path.clone(),
                    hash,
                    chunks,
                });
            }
        }

        let mut tombstones = deleted.clone();
        tombstones.extend(newly_skipped.iter().cloned());
        report.vector_stats = index_files(&mut row, vector, embedder, to_index, &tombstones)?;
    }

    report.duration = start.elapsed();
    tracing::info!(
        added = report.added,
        modified = report.modified,
        unchanged = report.unchanged,
        deleted = report.deleted,
        skipped = report.total_skipped(),
        errors = report.errors,
        duration_secs = %format!("{:.2}", report.duration.as_secs_f64()),
        "scan completed"
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concurrency_clamped() {
        let n = adaptive_concurrency();
        assert!((4..=32).contains(&n));
    }
}
