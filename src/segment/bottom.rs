use std::rc::Rc;

use crate::codec::{
    child_index_offset, child_reversed_offset, BOTTOM_GENOME_INDEX_OFFSET,
    BOTTOM_TOP_PARSE_OFFSET,
};
use crate::genome::Genome;
use crate::{HalIndex, HalignError, Result, NULL_INDEX};

use super::Segment;

/// Handle on one bottom-segment record: a maximal aligned run between a
/// genome and all of its children, one edge per child.
#[derive(Debug, Clone)]
pub struct BottomSegment {
    genome: Rc<Genome>,
    index: HalIndex,
}

impl BottomSegment {
    /// Address record `index` of `genome`'s bottom array.
    pub fn new(genome: Rc<Genome>, index: HalIndex) -> Self {
        Self { genome, index }
    }

    fn check_range(&self) -> Result<()> {
        if !self.in_range() {
            return Err(HalignError::OutOfRange(format!(
                "bottom segment index {} outside [0, {}) in genome {}",
                self.index,
                self.num_segments(),
                self.genome.name()
            )));
        }
        Ok(())
    }

    fn check_child(&self, child: usize) -> Result<()> {
        if child >= self.genome.num_children() {
            return Err(HalignError::OutOfRange(format!(
                "child {child} exceeds fan-out {} of genome {}",
                self.genome.num_children(),
                self.genome.name()
            )));
        }
        Ok(())
    }

    /// Number of child edges carried by each record.
    pub fn num_children(&self) -> usize {
        self.genome.num_children()
    }

    /// Index of the top segment of the same genome containing this
    /// segment's start, or [`NULL_INDEX`] in a root.
    pub fn top_parse_index(&self) -> Result<HalIndex> {
        self.check_range()?;
        self.genome
            .bottom_array()?
            .get_i64(self.index as u64, BOTTOM_TOP_PARSE_OFFSET)
    }

    /// Set the top-parse index.
    pub fn set_top_parse_index(&self, value: HalIndex) -> Result<()> {
        self.check_range()?;
        self.genome
            .bottom_array()?
            .set_i64(self.index as u64, BOTTOM_TOP_PARSE_OFFSET, value)
    }

    /// Index of the homologous top segment in child `child`, or
    /// [`NULL_INDEX`] when unaligned there.
    pub fn child_index(&self, child: usize) -> Result<HalIndex> {
        self.check_range()?;
        self.check_child(child)?;
        self.genome
            .bottom_array()?
            .get_i64(self.index as u64, child_index_offset(child))
    }

    /// Set the child-edge target for `child`.
    pub fn set_child_index(&self, child: usize, value: HalIndex) -> Result<()> {
        self.check_range()?;
        self.check_child(child)?;
        self.genome
            .bottom_array()?
            .set_i64(self.index as u64, child_index_offset(child), value)
    }

    /// Whether the edge to child `child` inverts strand.
    pub fn child_reversed(&self, child: usize) -> Result<bool> {
        self.check_range()?;
        self.check_child(child)?;
        Ok(self
            .genome
            .bottom_array()?
            .get_u8(self.index as u64, child_reversed_offset(child))?
            != 0)
    }

    /// Set the reversed flag on the edge to child `child`.
    pub fn set_child_reversed(&self, child: usize, value: bool) -> Result<()> {
        self.check_range()?;
        self.check_child(child)?;
        self.genome
            .bottom_array()?
            .set_u8(self.index as u64, child_reversed_offset(child), value as u8)
    }

    /// Whether the segment is aligned to child `child`.
    pub fn has_child(&self, child: usize) -> Result<bool> {
        Ok(self.child_index(child)? != NULL_INDEX)
    }

    /// Whether the segment carries a parse link to the top layer.
    pub fn has_parse_up(&self) -> Result<bool> {
        Ok(self.top_parse_index()? != NULL_INDEX)
    }
}

impl Segment for BottomSegment {
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
        self.genome.num_bottom_segments()
    }

    fn start_position(&self) -> Result<HalIndex> {
        self.check_range()?;
        self.genome
            .bottom_array()?
            .get_i64(self.index as u64, BOTTOM_GENOME_INDEX_OFFSET)
    }

    fn length(&self) -> Result<u64> {
        self.check_range()?;
        let array = self.genome.bottom_array()?;
        let start = array.get_i64(self.index as u64, BOTTOM_GENOME_INDEX_OFFSET)?;
        let next = array.get_i64(self.index as u64 + 1, BOTTOM_GENOME_INDEX_OFFSET)?;
        if next < start {
            return Err(HalignError::CorruptFile(format!(
                "bottom segment {} of genome {} has start {start} past its successor {next}",
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
                "bottom segment coordinates [{start}, {}) exceed genome length {total}",
                start as u64 + length
            )));
        }
        let array = self.genome.bottom_array()?;
        array.set_i64(self.index as u64, BOTTOM_GENOME_INDEX_OFFSET, start)?;
        array.set_i64(
            self.index as u64 + 1,
            BOTTOM_GENOME_INDEX_OFFSET,
            start + length as HalIndex,
        )
    }
}
