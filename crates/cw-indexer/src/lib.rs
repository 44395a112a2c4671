pub mod error;
pub mod indexer;
pub mod pipeline;
pub mod process;
pub mod report;
pub mod scanner;

pub use error::IndexerError;
pub use pipeline::scan;
pub use report::{ScanOptions, ScanReport, SkipReason, VectorIndexStats};
pub use scanner::crawl_files;
