use std::rc::Rc;

use crate::codec::{
    TOP_BOTTOM_PARSE_OFFSET, TOP_GENOME_INDEX_OFFSET, TOP_PARALOGY_OFFSET, TOP_PARENT_OFFSET,
    TOP_PARENT_REVERSED_OFFSET,
};
use crate::genome::Genome;
use crate::{HalIndex, HalignError, Result, NULL_INDEX};

use super::Segment;

/// Handle on one top-segment record: a maximal aligned run between a
/// genome and its parent.
#[derive(Debug, Clone)]
pub struct TopSegment {
    genome: Rc<Genome>,
    index: HalIndex,
}

impl TopSegment {
    /// Address record `index` of `genome`'s top array.
    pub fn new(genome: Rc<Genome>, index: HalIndex) -> Self {
        Self { genome, index }
    }

    fn check_range(&self) -> Result<()> {
        if !self.in_range() {
            return Err(HalignError::OutOfRange(format!(
                "top segment index {} outside [0, {}) in genome {}",
                self.index,
                self.num_segments(),
                self.genome.name()
            )));
        }
        Ok(())
    }

    /// Index of the homologous bottom segment in the parent genome, or
    /// [`NULL_INDEX`] when this run is unaligned.
    pub fn parent_index(&self) -> Result<HalIndex> {
        self.check_range()?;
        self.genome
            .top_array()?
            .get_i64(self.index as u64, TOP_PARENT_OFFSET)
    }

    /// Set the parent bottom-segment index.
    pub fn set_parent_index(&self, value: HalIndex) -> Result<()> {
        self.check_range()?;
        self.genome
            .top_array()?
            .set_i64(self.index as u64, TOP_PARENT_OFFSET, value)
    }

    /// Whether the parent edge inverts strand.
    pub fn parent_reversed(&self) -> Result<bool> {
        self.check_range()?;
        Ok(self
            .genome
            .top_array()?
            .get_u8(self.index as u64, TOP_PARENT_REVERSED_OFFSET)?
            != 0)
    }

    /// Set the parent-reversed flag.
    pub fn set_parent_reversed(&self, value: bool) -> Result<()> {
        self.check_range()?;
        self.genome
            .top_array()?
            .set_u8(self.index as u64, TOP_PARENT_REVERSED_OFFSET, value as u8)
    }

    /// Index of the bottom segment of the same genome containing this
    /// segment's start, or [`NULL_INDEX`] in a leaf.
    pub fn bottom_parse_index(&self) -> Result<HalIndex> {
        self.check_range()?;
        self.genome
            .top_array()?
            .get_i64(self.index as u64, TOP_BOTTOM_PARSE_OFFSET)
    }

    /// Set the bottom-parse index.
    pub fn set_bottom_parse_index(&self, value: HalIndex) -> Result<()> {
        self.check_range()?;
        self.genome
            .top_array()?
            .set_i64(self.index as u64, TOP_BOTTOM_PARSE_OFFSET, value)
    }

    /// Next member of the paralogy cycle, or [`NULL_INDEX`].
    pub fn paralogy_index(&self) -> Result<HalIndex> {
        self.check_range()?;
        self.genome
            .top_array()?
            .get_i64(self.index as u64, TOP_PARALOGY_OFFSET)
    }

    /// Link this segment into a paralogy cycle.
    pub fn set_paralogy_index(&self, value: HalIndex) -> Result<()> {
        self.check_range()?;
        self.genome
            .top_array()?
            .set_i64(self.index as u64, TOP_PARALOGY_OFFSET, value)
    }

    /// Whether the segment is aligned to its parent.
    pub fn has_parent(&self) -> Result<bool> {
        Ok(self.parent_index()? != NULL_INDEX)
    }

    /// Whether the segment carries a parse link to the bottom layer.
    pub fn has_parse_down(&self) -> Result<bool> {
        Ok(self.bottom_parse_index()? != NULL_INDEX)
    }

    /// Whether the segment belongs to a paralogy cycle.
    pub fn has_next_paralogy(&self) -> Result<bool> {
        Ok(self.paralogy_index()? != NULL_INDEX)
    }
}

impl Segment for TopSegment {
    fn genome(&self) -> &Rc<Genome> {
        &self.genome
    }

    fn array_index(&self) -> HalIndex {
        self.index
    }

    fn set_array_index(&mut self, index: HalIndex) {
        self.index = index;
    }

    fn num_segments(&self) -> u64 {
        self.genome.num_top_segments()
    }

    fn start_position(&self) -> Result<HalIndex> {
        self.check_range()?;
        self.genome
            .top_array()?
            .get_i64(self.index as u64, TOP_GENOME_INDEX_OFFSET)
    }

    fn length(&self) -> Result<u64> {
        self.check_range()?;
        let array = self.genome.top_array()?;
        let start = array.get_i64(self.index as u64, TOP_GENOME_INDEX_OFFSET)?;
        let next = array.get_i64(self.index as u64 + 1, TOP_GENOME_INDEX_OFFSET)?;
        if next < start {
            return Err(HalignError::CorruptFile(format!(
                "top segment {} of genome {} has start {start} past its successor {next}",
                self.index,
                self.genome.name()
            )));
        }
        Ok((next - start) as u64)
    }

    fn set_coordinates(&self, start: HalIndex, length: u64) -> Result<()> {
        self.check_range()?;
        let total = self.genome.length();
        if start < 0 || start as u64 >= total || start as u64 + length > total {
            return Err(HalignError::OutOfRange(format!(
                "top segment coordinates [{start}, {}) exceed genome length {total}",
                start as u64 + length
            )));
        }
        let array = self.genome.top_array()?;
        array.set_i64(self.index as u64, TOP_GENOME_INDEX_OFFSET, start)?;
        array.set_i64(
            self.index as u64 + 1,
            TOP_GENOME_INDEX_OFFSET,
            start + length as HalIndex,
        )
    }
}
