//! Sequence records and the per-genome coordinate index.
//!
//! A sequence is a named contiguous slice of its genome's coordinate
//! space. The genome keeps two associative views over the same records:
//! one by name, one ordered by end position so that position→sequence
//! lookup is an upper-bound query.

use std::collections::BTreeMap;
use std::ops::Bound::{Excluded, Unbounded};
use std::rc::Rc;

use crate::codec::SequenceRecord;
use crate::genome::Genome;
use crate::{HalIndex, Result};

/// A sequence record together with its array position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequence {
    index: u64,
    record: SequenceRecord,
}

impl Sequence {
    pub(crate) fn new(index: u64, record: SequenceRecord) -> Self {
        Self { index, record }
    }

    /// Index of this record in the genome's sequence array.
    pub fn array_index(&self) -> u64 {
        self.index
    }

    /// Sequence name, unique within the genome.
    pub fn name(&self) -> &str {
        &self.record.name
    }

    /// Start position within the genome.
    pub fn start(&self) -> HalIndex {
        self.record.start
    }

    /// Length in bases.
    pub fn length(&self) -> u64 {
        self.record.length
    }

    /// One past the last position covered by the sequence.
    pub fn end(&self) -> u64 {
        self.record.start as u64 + self.record.length
    }

    /// Number of top segments covering the sequence.
    pub fn num_top_segments(&self) -> u64 {
        self.record.num_top
    }

    /// Number of bottom segments covering the sequence.
    pub fn num_bottom_segments(&self) -> u64 {
        self.record.num_bottom
    }

    /// Array index of the sequence's first top segment.
    pub fn top_first_index(&self) -> HalIndex {
        self.record.top_first_index
    }

    /// Array index of the sequence's first bottom segment.
    pub fn bottom_first_index(&self) -> HalIndex {
        self.record.bottom_first_index
    }
}

/// Dual index over a genome's sequences.
///
/// Both maps share ownership of the `Sequence` values; clearing the index
/// is the single destruction path for both.
#[derive(Debug, Default)]
pub struct SequenceIndex {
    by_name: BTreeMap<String, Rc<Sequence>>,
    by_end: BTreeMap<u64, Rc<Sequence>>,
}

impl SequenceIndex {
    /// An empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a sequence into both views.
    pub fn insert(&mut self, sequence: Sequence) -> Rc<Sequence> {
        let shared = Rc::new(sequence);
        self.by_name
            .insert(shared.name().to_string(), Rc::clone(&shared));
        self.by_end.insert(shared.end(), Rc::clone(&shared));
        shared
    }

    /// Drop every entry from both views.
    pub fn clear(&mut self) {
        self.by_name.clear();
        self.by_end.clear();
    }

    /// Number of indexed sequences.
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Look a sequence up by name.
    pub fn by_name(&self, name: &str) -> Option<Rc<Sequence>> {
        self.by_name.get(name).cloned()
    }

    /// The sequence containing genome position `position`, if any.
    ///
    /// Keying by end position makes this an upper-bound query: the first
    /// entry whose key exceeds `position` is the only candidate.
    pub fn sequence_by_site(&self, position: u64) -> Option<Rc<Sequence>> {
        let (_, candidate) = self.by_end.range((Excluded(position), Unbounded)).next()?;
        if position >= candidate.start() as u64 {
            Some(Rc::clone(candidate))
        } else {
            None
        }
    }

    /// Sequences in ascending start order.
    pub fn iter(&self) -> impl Iterator<Item = &Rc<Sequence>> {
        self.by_end.values()
    }
}

/// Cursor over a genome's sequence records.
#[derive(Debug, Clone)]
pub struct SequenceIter {
    genome: Rc<Genome>,
    index: u64,
}

impl SequenceIter {
    pub(crate) fn new(genome: Rc<Genome>, index: u64) -> Self {
        Self { genome, index }
    }

    /// Array index the cursor sits on; equal to the sequence count for an
    /// end cursor.
    pub fn array_index(&self) -> u64 {
        self.index
    }

    /// Whether the cursor sits past the last sequence.
    pub fn at_end(&self) -> bool {
        self.index >= self.genome.num_sequences()
    }

    /// Move to the next sequence in storage order.
    pub fn to_next(&mut self) {
        self.index = self.index.saturating_add(1);
    }

    /// Move to the previous sequence in storage order.
    pub fn to_prev(&mut self) {
        self.index = self.index.saturating_sub(1);
    }

    /// Decode the record under the cursor.
    pub fn sequence(&self) -> Result<Sequence> {
        self.genome.sequence_record(self.index)
    }

    /// Whether two cursors address the same record of the same genome.
    pub fn equals(&self, other: &SequenceIter) -> bool {
        Rc::ptr_eq(&self.genome, &other.genome) && self.index == other.index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, start: i64, length: u64) -> Sequence {
        Sequence::new(
            0,
            SequenceRecord {
                start,
                length,
                num_top: 0,
                num_bottom: 0,
                top_first_index: 0,
                bottom_first_index: 0,
                name: name.to_string(),
            },
        )
    }

    #[test]
    fn site_lookup_hits_boundaries() {
        let mut index = SequenceIndex::new();
        index.insert(record("a", 0, 10));
        index.insert(record("b", 10, 5));
        index.insert(record("c", 15, 1));

        assert_eq!(index.sequence_by_site(0).unwrap().name(), "a");
        assert_eq!(index.sequence_by_site(9).unwrap().name(), "a");
        assert_eq!(index.sequence_by_site(10).unwrap().name(), "b");
        assert_eq!(index.sequence_by_site(14).unwrap().name(), "b");
        assert_eq!(index.sequence_by_site(15).unwrap().name(), "c");
        assert!(index.sequence_by_site(16).is_none());
    }

    #[test]
    fn both_views_share_records() {
        let mut index = SequenceIndex::new();
        let shared = index.insert(record("a", 0, 10));
        assert!(Rc::ptr_eq(&shared, &index.by_name("a").unwrap()));
        assert!(Rc::ptr_eq(&shared, &index.sequence_by_site(3).unwrap()));
        index.clear();
        assert!(index.by_name("a").is_none());
        assert!(index.is_empty());
    }
}
