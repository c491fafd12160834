//! Storage backend capability set and the chunked array facade.
//!
//! Everything storage-specific lives behind [`ArrayStore`]: a named, typed,
//! chunk-buffered 1-D dataset namespace with grouped metadata. The rest of
//! the crate only sees [`ChunkedArray`], so a second backend (mmap, remote
//! object store) slots in without touching the iterator algebra.

mod backend;
mod chunked;
mod file;

pub use backend::{ArrayProps, ArraySpec, ArrayStore, MemoryStore};
pub use chunked::ChunkedArray;
pub use file::FileStore;
