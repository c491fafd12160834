//! Cursors over segments, DNA bases, and gap-coalesced segment runs.
//!
//! The slice/orientation algebra lives in one generic [`SegmentCursor`];
//! top- and bottom-specific moves (parse crossing, edge crossing) are
//! inherent methods on the two aliases.

mod dna;
mod gapped;
mod segment;

pub use dna::DnaIter;
pub use gapped::{GappedBottomIter, GappedTopIter};
pub use segment::{BottomSegmentIter, SegmentCursor, TopSegmentIter};
