pub mod error;
pub mod lock;
pub mod paths;
pub mod row;
pub mod stores;
pub mod vector;

pub use error::StorageError;
pub use lock::ProcessLock;
pub use paths::ProjectPaths;
pub use row::{FileRecord, FtsHit, RowStore};
pub use stores::ProjectStores;
pub use vector::{VectorHit, VectorStore};
