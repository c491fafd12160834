//! Packed record layouts.
//!
//! Every array element in the container is a fixed-width byte slot; the
//! codecs here define the little-endian field offsets inside those slots
//! and the 4-bit DNA base alphabet. Records must round-trip byte-for-byte
//! through decode → encode → decode.

mod bottom;
mod dna;
mod sequence;
mod top;

pub use bottom::{BottomRecord, ChildEdge};
pub use dna::{complement_base, decode_base, encode_base, pack_base, unpack_base};
pub use sequence::SequenceRecord;
pub use top::TopRecord;

pub use bottom::{
    bottom_record_width, children_from_width, child_index_offset, child_reversed_offset,
    BOTTOM_GENOME_INDEX_OFFSET, BOTTOM_LENGTH_OFFSET, BOTTOM_RECORD_HEADER_WIDTH,
    BOTTOM_TOP_PARSE_OFFSET, PER_CHILD_WIDTH,
};
pub use sequence::{
    sequence_record_width, SEQUENCE_BOTTOM_FIRST_OFFSET, SEQUENCE_LENGTH_OFFSET,
    SEQUENCE_NAME_OFFSET, SEQUENCE_NUM_BOTTOM_OFFSET, SEQUENCE_NUM_TOP_OFFSET,
    SEQUENCE_START_OFFSET, SEQUENCE_TOP_FIRST_OFFSET,
};
pub use top::{
    TOP_BOTTOM_PARSE_OFFSET, TOP_GENOME_INDEX_OFFSET, TOP_LENGTH_OFFSET,
    TOP_PARALOGY_OFFSET, TOP_PARENT_OFFSET, TOP_PARENT_REVERSED_OFFSET, TOP_RECORD_WIDTH,
};

/// Read an `i64` from `slot` at `offset` (little-endian).
#[inline]
pub fn read_i64_at(slot: &[u8], offset: usize) -> i64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&slot[offset..offset + 8]);
    i64::from_le_bytes(raw)
}

/// Write an `i64` into `slot` at `offset` (little-endian).
#[inline]
pub fn write_i64_at(slot: &mut [u8], offset: usize, value: i64) {
    slot[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
}

/// Read a `u64` from `slot` at `offset` (little-endian).
#[inline]
pub fn read_u64_at(slot: &[u8], offset: usize) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&slot[offset..offset + 8]);
    u64::from_le_bytes(raw)
}

/// Write a `u64` into `slot` at `offset` (little-endian).
#[inline]
pub fn write_u64_at(slot: &mut [u8], offset: usize, value: u64) {
    slot[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
}

/// Read a one-byte boolean flag from `slot` at `offset`.
#[inline]
pub fn read_bool_at(slot: &[u8], offset: usize) -> bool {
    slot[offset] != 0
}

/// Write a one-byte boolean flag into `slot` at `offset`.
#[inline]
pub fn write_bool_at(slot: &mut [u8], offset: usize, value: bool) {
    slot[offset] = value as u8;
}
