pub mod error;
pub mod expand;
pub mod packer;
pub mod resolver;
mod score;
pub mod service;

pub use error::RetrievalError;
pub use expand::{ExpandConfig, GraphExpander};
pub use packer::{pack_context, PackConfig, PackedFile, Segment};
pub use score::TokenMatcher;
pub use service::{ContextPack, ScoredChunk, SearchConfig, SearchDebug, SearchService};
