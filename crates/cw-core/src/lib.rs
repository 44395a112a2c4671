mod chunk;
mod error;
mod language;
mod project;
mod query;
mod text;

pub use chunk::{ChunkId, ChunkRecord, ProcessedChunk};
pub use error::CoreError;
pub use language::Language;
pub use project::ProjectId;
pub use query::segment_query;
pub use text::{extract_around_hit, truncate_middle, truncate_utf8_bytes};
