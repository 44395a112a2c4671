use std::fmt;

use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::xxh3_128;

use crate::language::Language;

/// Deterministic chunk identifier, computed as XXH3-128 of
/// `file_path|file_hash|chunk_index`.
///
/// The file hash is part of the input so that records for an old and a new
/// version of the same file never collide while both exist during a
/// monotonic upsert.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChunkId(pub u128);

impl ChunkId {
    /// Generate a deterministic chunk ID from its identifying fields.
    pub fn generate(file_path: &str, file_hash: &str, chunk_index: u32) -> Self {
        let input = format!("{}|{}|{}", file_path, file_hash, chunk_index);
        Self(xxh3_128(input.as_bytes()))
    }

    pub fn as_bytes(&self) -> [u8; 16] {
        self.0.to_le_bytes()
    }

    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(u128::from_le_bytes(bytes))
    }

    /// Hex form stored in `chunks_fts.chunk_id`.
    pub fn to_hex(&self) -> String {
        format!("{:032x}", self.0)
    }

    pub fn from_hex(s: &str) -> Option<Self> {
        u128::from_str_radix(s, 16).ok().map(Self)
    }

    /// Lower 64 bits, used as the ANN index key.
    pub fn ann_key(&self) -> u64 {
        self.0 as u64
    }
}

impl fmt::Debug for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChunkId({:032x})", self.0)
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

/// A chunk produced by the splitter, before embedding.
///
/// Offsets live in two domains: `start_index`/`end_index` are UTF-16 code
/// unit offsets (stable across retrieval), while the raw and vector spans are
/// byte offsets into the UTF-8 source. Concatenating all raw spans of a file
/// reproduces the file exactly; the vector span may extend backwards past
/// `start_index` to give the embedding overlap context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedChunk {
    /// Text shown to the user.
    pub display_code: String,
    /// Text sent to the embedding service (breadcrumb header + overlap window).
    pub vector_text: String,
    /// `"<path> > <type-prefix><name> > …"`.
    pub breadcrumb: String,
    pub language: Language,
    /// 0-based index of this chunk within the file.
    pub chunk_index: u32,
    /// Semantic node start, UTF-16 code units.
    pub start_index: u32,
    /// Semantic node end, UTF-16 code units.
    pub end_index: u32,
    /// Gap-owning coverage start, bytes.
    pub raw_start: u32,
    /// Gap-owning coverage end, bytes.
    pub raw_end: u32,
    /// Embedding window start, bytes.
    pub vec_start: u32,
    /// Embedding window end, bytes.
    pub vec_end: u32,
}

/// A chunk as stored in the vector store: a `ProcessedChunk` bound to a file
/// version plus its embedding.
#[derive(Debug, Clone)]
pub struct ChunkRecord {
    pub chunk_id: ChunkId,
    pub file_path: String,
    /// SHA-256 hex of the file version these vectors were computed from.
    pub file_hash: String,
    pub vector: Vec<f32>,
    pub chunk: ProcessedChunk,
}

impl ChunkRecord {
    pub fn new(file_path: &str, file_hash: &str, vector: Vec<f32>, chunk: ProcessedChunk) -> Self {
        Self {
            chunk_id: ChunkId::generate(file_path, file_hash, chunk.chunk_index),
            file_path: file_path.to_string(),
            file_hash: file_hash.to_string(),
            vector,
            chunk,
        }
    }

    /// Key used for dedup across recall branches and expansions.
    pub fn dedup_key(&self) -> (String, u32) {
        (self.file_path.clone(), self.chunk.chunk_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_id_deterministic() {
        let a = ChunkId::generate("src/main.ts", "abc123", 0);
        let b = ChunkId::generate("src/main.ts", "abc123", 0);
        assert_eq!(a, b);
    }

    #[test]
    fn chunk_id_changes_on_hash_change() {
        let a = ChunkId::generate("src/main.ts", "abc123", 0);
        let b = ChunkId::generate("src/main.ts", "def456", 0);
        assert_ne!(a, b);
    }

    #[test]
    fn chunk_id_changes_on_index_change() {
        let a = ChunkId::generate("src/main.ts", "abc123", 0);
        let b = ChunkId::generate("src/main.ts", "abc123", 1);
        assert_ne!(a, b);
    }

    #[test]
    fn chunk_id_hex_round_trip() {
        let id = ChunkId::generate("a.py", "ff00", 7);
        let hex = id.to_hex();
        assert_eq!(hex.len(), 32);
        assert_eq!(ChunkId::from_hex(&hex), Some(id));
    }

    #[test]
    fn chunk_id_bytes_round_trip() {
        let id = ChunkId::generate("a.py", "ff00", 7);
        assert_eq!(ChunkId::from_bytes(id.as_bytes()), id);
    }

    #[test]
    fn record_key_matches_generate() {
        let chunk = ProcessedChunk {
            display_code: "fn x() {}".into(),
            vector_text: "// Context: a.rs\nfn x() {}".into(),
            breadcrumb: "a.rs".into(),
            language: Language::Rust,
            chunk_index: 2,
            start_index: 0,
            end_index: 9,
            raw_start: 0,
            raw_end: 9,
            vec_start: 0,
            vec_end: 9,
        };
        let rec = ChunkRecord::new("a.rs", "deadbeef", vec![0.0; 4], chunk);
        assert_eq!(rec.chunk_id, ChunkId::generate("a.rs", "deadbeef", 2));
        assert_eq!(rec.dedup_key(), ("a.rs".to_string(), 2));
    }
}
