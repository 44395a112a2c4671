use std::path::Path;
use std::time::UNIX_EPOCH;

use cw_core::{Language, ProcessedChunk};
use cw_splitter::{decode_to_utf8, split_file, split_plain_text, SplitterConfig};
use cw_storage::row::{FileRecord, KnownFile};
use sha2::{Digest, Sha256};

use crate::report::SkipReason;

/// Files above this size are recorded but never read.
const MAX_FILE_SIZE: u64 = 100 * 1024;

/// Classification of one crawled file after processing.
#[derive(Debug)]
pub enum FileOutcome {
    /// First time this path is seen.
    Added(ProcessedFile),
    /// Known path whose content hash changed.
    Modified(ProcessedFile),
    /// Stat or hash matched; `mtime` is refreshed.
    Unchanged { path: String, mtime: i64 },
    /// Recorded with null content; not chunked or embedded.
    Skipped {
        path: String,
        reason: SkipReason,
        record: FileRecord,
    },
    Failed { path: String, reason: String },
}

/// A fully processed (read, decoded, hashed, chunked) file.
#[derive(Debug)]
pub struct ProcessedFile {
    pub record: FileRecord,
    pub chunks: Vec<ProcessedChunk>,
}

/// Run the per-file pipeline: stat, change detection, decode, hash,
/// lock-file filtering, chunking.
pub fn process_file(
    project_root: &Path,
    rel_path: &str,
    language: Language,
    known: Option<&KnownFile>,
    splitter: &SplitterConfig,
) -> FileOutcome {
    let abs = project_root.join(rel_path);

    let meta = match std::fs::metadata(&abs) {
        Ok(m) => m,
        Err(e) => {
            return FileOutcome::Failed {
                path: rel_path.to_string(),
                reason: e.to_string(),
            }
        }
    };
    let size = meta.len();
    let mtime = meta
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0);

    if size > MAX_FILE_SIZE {
        return skipped(rel_path, language, SkipReason::TooLarge, mtime, size, String::new());
    }

    // Cheap path: stat matches what we already know.
    if let Some(known) = known {
        if known.mtime == mtime && known.size == size as i64 {
            return FileOutcome::Unchanged {
                path: rel_path.to_string(),
                mtime,
            };
        }
    }

    let bytes = match std::fs::read(&abs) {
        Ok(b) => b,
        Err(e) => {
            return FileOutcome::Failed {
                path: rel_path.to_string(),
                reason: e.to_string(),
            }
        }
    };

    let content = decode_to_utf8(&bytes);
    if content.contains('\0') {
        return skipped(rel_path, language, SkipReason::Binary, mtime, size, String::new());
    }

    let hash = sha256_hex(content.as_bytes());

    // Hash matches: content identical, only the stat changed.
    if let Some(known) = known {
        if known.hash == hash {
            return FileOutcome::Unchanged {
                path: rel_path.to_string(),
                mtime,
            };
        }
    }

    if language == Language::Json && is_lock_file(rel_path) {
        return skipped(rel_path, language, SkipReason::LockFile, mtime, size, hash);
    }

    let chunks = chunk_content(rel_path, &content, language, splitter);

    let processed = ProcessedFile {
        record: FileRecord {
            path: rel_path.to_string(),
            hash,
            mtime,
            size: size as i64,
            content: Some(content),
            language: language.tag().to_string(),
            vector_index_hash: None,
        },
        chunks,
    };

    if known.is_some() {
        FileOutcome::Modified(processed)
    } else {
        FileOutcome::Added(processed)
    }
}

/// Chunk decoded content: AST split where a grammar exists, with plain-text
/// fallback on parse failure or (for the fallback language set) empty output.
pub fn chunk_content(
    rel_path: &str,
    content: &str,
    language: Language,
    splitter: &SplitterConfig,
) -> Vec<ProcessedChunk> {
    let ext = Path::new(rel_path)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    let chunks = if language.has_ast_grammar() {
        match split_file(rel_path, content, language, &ext, splitter) {
            Ok(chunks) => chunks,
            Err(e) => {
                tracing::warn!(path = %rel_path, error = %e, "AST chunking failed, falling back");
                split_plain_text(rel_path, content, language, splitter)
            }
        }
    } else {
        Vec::new()
    };

    if chunks.is_empty() && language.plain_text_fallback() {
        return split_plain_text(rel_path, content, language, splitter);
    }
    chunks
}

/// Re-read and re-chunk a known file for vector self-healing. Returns `None`
/// when the file is unreadable or no longer hashes to the expected value.
pub fn reload_for_vectors(
    project_root: &Path,
    rel_path: &str,
    language: Language,
    expected_hash: &str,
    splitter: &SplitterConfig,
) -> Option<(String, Vec<ProcessedChunk>)> {
    let bytes = std::fs::read(project_root.join(rel_path)).ok()?;
    let content = decode_to_utf8(&bytes);
    if content.contains('\0') {
        return None;
    }
    let hash = sha256_hex(content.as_bytes());
    if hash != expected_hash {
        // The file changed under us; the next scan will pick it up.
        return None;
    }
    Some((hash, chunk_content(rel_path, &content, language, splitter)))
}

/// `*-lock.json`, `package-lock.json`, or anything inside `node_modules`.
fn is_lock_file(rel_path: &str) -> bool {
    rel_path.ends_with("-lock.json")
        || rel_path.ends_with("package-lock.json")
        || rel_path.split('/').any(|seg| seg == "node_modules")
}

fn skipped(
    rel_path: &str,
    language: Language,
    reason: SkipReason,
    mtime: i64,
    size: u64,
    hash: String,
) -> FileOutcome {
    FileOutcome::Skipped {
        path: rel_path.to_string(),
        reason,
        record: FileRecord {
            path: rel_path.to_string(),
            hash,
            mtime,
            size: size as i64,
            content: None,
            language: language.tag().to_string(),
            vector_index_hash: None,
        },
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
