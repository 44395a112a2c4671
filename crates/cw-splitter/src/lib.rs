mod adapter;
mod encoding;
pub mod error;
mod profile;
mod registry;
mod splitter;

pub use adapter::{IndexDomain, SourceAdapter};
pub use encoding::{decode_to_utf8, is_binary};
pub use error::SplitterError;
pub use profile::LanguageProfile;
pub use registry::ParserRegistry;
pub use splitter::{split_file, split_plain_text, SemanticSplitter, SplitterConfig};
