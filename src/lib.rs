//! # Hierarchical multi-genome alignment store
//!
//! This library persists a phylogenetic tree of genomes in a chunked,
//! columnar container and exposes cursor-based traversal over it. Each
//! non-root genome carries a per-position alignment to its parent (top
//! segments); each non-leaf genome carries a per-position alignment to
//! every child (bottom segments). Homologous runs are linked across tree
//! edges with orientation flags, and across layers of the same genome with
//! parse indices.
//!
//! ## Layers
//!
//! 1. **Storage** ([`storage`]): a backend capability trait with in-memory
//!    and file-backed implementations, and a chunk-buffered typed array
//!    facade on top.
//! 2. **Records** ([`codec`]): fixed-offset little-endian layouts for
//!    segment, sequence, and nibble-packed DNA records.
//! 3. **Genomes** ([`Genome`], [`Alignment`]): per-genome array ownership,
//!    dimension management, and the sequence coordinate index.
//! 4. **Cursors** ([`iter`]): segment, DNA, and gapped iterators
//!    implementing the slice/orientation algebra used by every traversal.
//!
//! ## Usage example
//!
//! ```ignore
//! use std::rc::Rc;
//!
//! use halign::{Alignment, MemoryStore, SequenceInfo};
//!
//! let alignment = Alignment::create(Rc::new(MemoryStore::new()))?;
//! let genome = alignment.add_root_genome("root")?;
//! genome.set_dimensions(&[SequenceInfo::new("chr1", 1000, 10, 10)], true)?;
//! let mut top = genome.top_iter(0)?;
//! top.to_site(500, true)?;
//! ```

#![warn(missing_docs, missing_debug_implementations)]
#![allow(clippy::new_without_default)]

pub mod alignment; // Tree registry: topology, open-genome cache
pub mod codec;     // Packed record layouts
pub mod genome;    // Per-genome array store
pub mod iter;      // Segment / DNA / gapped cursors
pub mod segment;   // Top and bottom segment handles
pub mod sequence;  // Sequence records and coordinate index
pub mod storage;   // Backend capability set + chunked arrays

// Re-exports for convenience
pub use alignment::Alignment;
pub use genome::{Genome, SequenceInfo, SequenceUpdate};
pub use iter::{BottomSegmentIter, DnaIter, GappedBottomIter, GappedTopIter, TopSegmentIter};
pub use segment::{BottomSegment, TopSegment};
pub use sequence::{Sequence, SequenceIter};
pub use storage::{ArrayProps, ArrayStore, ChunkedArray, FileStore, MemoryStore};

use thiserror::Error;

/// Signed index into a segment or DNA array.
///
/// Cross-references between records use [`NULL_INDEX`] for "no target";
/// every other negative value is invalid.
pub type HalIndex = i64;

/// Sentinel index marking an absent cross-reference.
pub const NULL_INDEX: HalIndex = -1;

/// Errors raised by the alignment store.
///
/// All failures at this layer are hard: no silent recovery, no defaults
/// substituted for missing fields. Callers decide whether to abort a
/// traversal or report upward; they are not expected to branch on the
/// variant beyond that.
#[derive(Error, Debug)]
pub enum HalignError {
    /// A coordinate or array index fell outside the declared extents.
    #[error("out of range: {0}")]
    OutOfRange(String),

    /// A sequence or genome was named but is not present.
    #[error("missing name: {0}")]
    MissingName(String),

    /// An internal invariant was violated on load.
    #[error("corrupt file: {0}")]
    CorruptFile(String),

    /// The operation is not supported in the current state, e.g. a DNA
    /// write on a genome with no DNA array or a cross-edge move against a
    /// null target.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// The storage backend failed.
    #[error("storage error: {0}")]
    Io(#[from] std::io::Error),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, HalignError>;
