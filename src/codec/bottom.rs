use crate::{HalIndex, NULL_INDEX};

use super::{read_bool_at, read_i64_at, read_u64_at, write_bool_at, write_i64_at, write_u64_at};

/// Byte offset of the genome start position inside a bottom-segment slot.
pub const BOTTOM_GENOME_INDEX_OFFSET: usize = 0;
/// Byte offset of the (redundant) stored length field.
pub const BOTTOM_LENGTH_OFFSET: usize = 8;
/// Byte offset of the top-parse index.
pub const BOTTOM_TOP_PARSE_OFFSET: usize = 16;
/// Width of the fixed header preceding the per-child fields.
pub const BOTTOM_RECORD_HEADER_WIDTH: usize = 24;
/// Width of one child edge: an 8-byte index plus a 1-byte reversed flag.
pub const PER_CHILD_WIDTH: usize = 9;

/// Width of a bottom-segment slot for a genome with `num_children` children.
pub fn bottom_record_width(num_children: usize) -> usize {
    BOTTOM_RECORD_HEADER_WIDTH + num_children * PER_CHILD_WIDTH
}

/// Recover the child count from a stored record width.
///
/// Returns `None` when the width cannot have been produced by
/// [`bottom_record_width`], which callers treat as file corruption.
pub fn children_from_width(record_width: usize) -> Option<usize> {
    if record_width < BOTTOM_RECORD_HEADER_WIDTH {
        return None;
    }
    let child_bytes = record_width - BOTTOM_RECORD_HEADER_WIDTH;
    if child_bytes % PER_CHILD_WIDTH != 0 {
        return None;
    }
    Some(child_bytes / PER_CHILD_WIDTH)
}

/// Byte offset of child `k`'s top-segment index.
#[inline]
pub fn child_index_offset(child: usize) -> usize {
    BOTTOM_RECORD_HEADER_WIDTH + child * PER_CHILD_WIDTH
}

/// Byte offset of child `k`'s reversed flag.
#[inline]
pub fn child_reversed_offset(child: usize) -> usize {
    child_index_offset(child) + 8
}

/// One edge from a bottom segment to a child genome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildEdge {
    /// Index of the homologous top segment in the child, or [`NULL_INDEX`].
    pub index: HalIndex,
    /// Whether the edge inverts strand.
    pub reversed: bool,
}

impl ChildEdge {
    /// An unaligned edge.
    pub fn null() -> Self {
        Self {
            index: NULL_INDEX,
            reversed: false,
        }
    }
}

/// In-memory image of one bottom-segment record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BottomRecord {
    /// Start position in the genome coordinate space.
    pub start: HalIndex,
    /// Stored length field (kept for layout compatibility).
    pub length: u64,
    /// Index of the top segment containing `start`, or [`NULL_INDEX`] in a
    /// root genome.
    pub top_parse_index: HalIndex,
    /// One edge per child genome, in child order.
    pub children: Vec<ChildEdge>,
}

impl BottomRecord {
    /// A record with `num_children` null edges.
    pub fn empty(num_children: usize) -> Self {
        Self {
            start: 0,
            length: 0,
            top_parse_index: NULL_INDEX,
            children: vec![ChildEdge::null(); num_children],
        }
    }

    /// Decode a record from a slot of width `bottom_record_width(K)`;
    /// K is inferred from the slot length.
    pub fn decode(slot: &[u8]) -> Self {
        let num_children = children_from_width(slot.len()).unwrap_or(0);
        let mut children = Vec::with_capacity(num_children);
        for k in 0..num_children {
            children.push(ChildEdge {
                index: read_i64_at(slot, child_index_offset(k)),
                reversed: read_bool_at(slot, child_reversed_offset(k)),
            });
        }
        Self {
            start: read_i64_at(slot, BOTTOM_GENOME_INDEX_OFFSET),
            length: read_u64_at(slot, BOTTOM_LENGTH_OFFSET),
            top_parse_index: read_i64_at(slot, BOTTOM_TOP_PARSE_OFFSET),
            children,
        }
    }

    /// Encode the record into a slot of matching width.
    pub fn encode(&self, slot: &mut [u8]) {
        debug_assert!(slot.len() >= bottom_record_width(self.children.len()));
        write_i64_at(slot, BOTTOM_GENOME_INDEX_OFFSET, self.start);
        write_u64_at(slot, BOTTOM_LENGTH_OFFSET, self.length);
        write_i64_at(slot, BOTTOM_TOP_PARSE_OFFSET, self.top_parse_index);
        for (k, edge) in self.children.iter().enumerate() {
            write_i64_at(slot, child_index_offset(k), edge.index);
            write_bool_at(slot, child_reversed_offset(k), edge.reversed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn width_round_trips_child_count() {
        for k in 0..12 {
            assert_eq!(children_from_width(bottom_record_width(k)), Some(k));
        }
        assert_eq!(children_from_width(BOTTOM_RECORD_HEADER_WIDTH + 5), None);
        assert_eq!(children_from_width(3), None);
    }

    #[test]
    fn round_trip_is_byte_exact() {
        let record = BottomRecord {
            start: 500,
            length: 10,
            top_parse_index: 3,
            children: vec![
                ChildEdge {
                    index: 17,
                    reversed: true,
                },
                ChildEdge::null(),
                ChildEdge {
                    index: 0,
                    reversed: false,
                },
            ],
        };
        let mut slot = vec![0u8; bottom_record_width(3)];
        record.encode(&mut slot);
        assert_eq!(BottomRecord::decode(&slot), record);

        let mut second = vec![0u8; bottom_record_width(3)];
        BottomRecord::decode(&slot).encode(&mut second);
        assert_eq!(slot, second);
    }
}
