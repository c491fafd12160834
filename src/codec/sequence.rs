use crate::{HalIndex, HalignError, Result};

use super::{read_i64_at, read_u64_at, write_i64_at, write_u64_at};

/// Byte offset of the sequence start position.
pub const SEQUENCE_START_OFFSET: usize = 0;
/// Byte offset of the sequence length.
pub const SEQUENCE_LENGTH_OFFSET: usize = 8;
/// Byte offset of the top-segment count.
pub const SEQUENCE_NUM_TOP_OFFSET: usize = 16;
/// Byte offset of the bottom-segment count.
pub const SEQUENCE_NUM_BOTTOM_OFFSET: usize = 24;
/// Byte offset of the first top-segment index.
pub const SEQUENCE_TOP_FIRST_OFFSET: usize = 32;
/// Byte offset of the first bottom-segment index.
pub const SEQUENCE_BOTTOM_FIRST_OFFSET: usize = 40;
/// Byte offset of the zero-padded name field.
pub const SEQUENCE_NAME_OFFSET: usize = 48;

/// Width of a sequence slot whose name field holds `name_capacity` bytes.
pub fn sequence_record_width(name_capacity: usize) -> usize {
    SEQUENCE_NAME_OFFSET + name_capacity
}

/// In-memory image of one sequence record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceRecord {
    /// Start position within the genome, cumulative over prior sequences.
    pub start: HalIndex,
    /// Length of the sequence in bases.
    pub length: u64,
    /// Number of top segments covering the sequence.
    pub num_top: u64,
    /// Number of bottom segments covering the sequence.
    pub num_bottom: u64,
    /// Array index of the sequence's first top segment.
    pub top_first_index: HalIndex,
    /// Array index of the sequence's first bottom segment.
    pub bottom_first_index: HalIndex,
    /// Sequence name, unique within its genome.
    pub name: String,
}

impl SequenceRecord {
    /// Decode a record from a slot; the name capacity is the slot width
    /// minus the fixed header.
    pub fn decode(slot: &[u8]) -> Result<Self> {
        let name_field = &slot[SEQUENCE_NAME_OFFSET..];
        let name_len = name_field
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(name_field.len());
        let name = std::str::from_utf8(&name_field[..name_len])
            .map_err(|_| {
                HalignError::CorruptFile("sequence record holds a non-ASCII name".to_string())
            })?
            .to_string();
        Ok(Self {
            start: read_i64_at(slot, SEQUENCE_START_OFFSET),
            length: read_u64_at(slot, SEQUENCE_LENGTH_OFFSET),
            num_top: read_u64_at(slot, SEQUENCE_NUM_TOP_OFFSET),
            num_bottom: read_u64_at(slot, SEQUENCE_NUM_BOTTOM_OFFSET),
            top_first_index: read_i64_at(slot, SEQUENCE_TOP_FIRST_OFFSET),
            bottom_first_index: read_i64_at(slot, SEQUENCE_BOTTOM_FIRST_OFFSET),
            name,
        })
    }

    /// Encode the record into a slot, zero-padding the name field.
    ///
    /// Fails when the name does not fit the slot's declared capacity.
    pub fn encode(&self, slot: &mut [u8]) -> Result<()> {
        let capacity = slot.len() - SEQUENCE_NAME_OFFSET;
        if self.name.len() > capacity {
            return Err(HalignError::OutOfRange(format!(
                "sequence name \"{}\" exceeds the record capacity of {} bytes",
                self.name, capacity
            )));
        }
        write_i64_at(slot, SEQUENCE_START_OFFSET, self.start);
        write_u64_at(slot, SEQUENCE_LENGTH_OFFSET, self.length);
        write_u64_at(slot, SEQUENCE_NUM_TOP_OFFSET, self.num_top);
        write_u64_at(slot, SEQUENCE_NUM_BOTTOM_OFFSET, self.num_bottom);
        write_i64_at(slot, SEQUENCE_TOP_FIRST_OFFSET, self.top_first_index);
        write_i64_at(slot, SEQUENCE_BOTTOM_FIRST_OFFSET, self.bottom_first_index);
        let name_field = &mut slot[SEQUENCE_NAME_OFFSET..];
        name_field.fill(0);
        name_field[..self.name.len()].copy_from_slice(self.name.as_bytes());
        Ok(())
    }
}
