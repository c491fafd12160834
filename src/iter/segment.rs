use std::rc::Rc;

use crate::segment::{BottomSegment, Segment, TopSegment};
use crate::{HalIndex, HalignError, Result, NULL_INDEX};

use super::DnaIter;

/// Cursor over top segments.
pub type TopSegmentIter = SegmentCursor<TopSegment>;

/// Cursor over bottom segments.
pub type BottomSegmentIter = SegmentCursor<BottomSegment>;

/// A mutable cursor over one segment array.
///
/// The cursor trims its segment with two offsets applied in traversal
/// orientation: `start_offset` from the side traversal enters, `end_offset`
/// from the side it leaves. Effective length is the raw segment length
/// minus both offsets; the effective start position is the first base in
/// traversal order:
///
/// - unreversed: `raw_start + start_offset`
/// - reversed: `raw_start + raw_length − 1 − start_offset`
#[derive(Debug, Clone)]
pub struct SegmentCursor<S: Segment> {
    segment: S,
    start_offset: u64,
    end_offset: u64,
    reversed: bool,
}

impl<S: Segment> PartialEq for SegmentCursor<S> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(self.segment.genome(), other.segment.genome())
            && self.segment.array_index() == other.segment.array_index()
            && self.start_offset == other.start_offset
            && self.end_offset == other.end_offset
            && self.reversed == other.reversed
    }
}

impl<S: Segment> SegmentCursor<S> {
    pub(crate) fn new(segment: S) -> Self {
        Self {
            segment,
            start_offset: 0,
            end_offset: 0,
            reversed: false,
        }
    }

    /// The segment record the cursor sits on.
    pub fn segment(&self) -> &S {
        &self.segment
    }

    /// Array index of the current record.
    pub fn array_index(&self) -> HalIndex {
        self.segment.array_index()
    }

    /// Whether traversal runs against the genome coordinate order.
    pub fn reversed(&self) -> bool {
        self.reversed
    }

    /// Bases trimmed from the traversal-entry side.
    pub fn start_offset(&self) -> u64 {
        self.start_offset
    }

    /// Bases trimmed from the traversal-exit side.
    pub fn end_offset(&self) -> u64 {
        self.end_offset
    }

    /// Whether the cursor has moved outside the valid record range.
    pub fn at_end(&self) -> bool {
        !self.segment.in_range()
    }

    pub(crate) fn reset_slice(&mut self) {
        self.start_offset = 0;
        self.end_offset = 0;
    }

    /// Effective length after slicing.
    pub fn length(&self) -> Result<u64> {
        Ok(self.segment.length()? - self.start_offset - self.end_offset)
    }

    /// First base of the effective range in traversal order.
    pub fn start_position(&self) -> Result<HalIndex> {
        let raw_start = self.segment.start_position()?;
        if self.reversed {
            Ok(raw_start + self.segment.length()? as HalIndex - 1 - self.start_offset as HalIndex)
        } else {
            Ok(raw_start + self.start_offset as HalIndex)
        }
    }

    /// Last base of the effective range in traversal order.
    pub fn end_position(&self) -> Result<HalIndex> {
        let span = self.length()? as HalIndex - 1;
        if self.reversed {
            Ok(self.start_position()? - span)
        } else {
            Ok(self.start_position()? + span)
        }
    }

    /// Move one step left in traversal order.
    ///
    /// A cursor trimmed on its entry side first exposes the remainder of
    /// its own segment; an untrimmed one steps to the neighboring record.
    /// Orientation is preserved and the slice resets.
    pub fn to_left(&mut self) -> Result<()> {
        self.check_in_range()?;
        if self.start_offset == 0 {
            let delta = if self.reversed { 1 } else { -1 };
            self.segment.set_array_index(self.segment.array_index() + delta);
            self.end_offset = 0;
        } else {
            self.end_offset = self.segment.length()? - self.start_offset;
            self.start_offset = 0;
        }
        Ok(())
    }

    /// Move one step right in traversal order; see [`Self::to_left`].
    pub fn to_right(&mut self) -> Result<()> {
        self.check_in_range()?;
        if self.end_offset == 0 {
            let delta = if self.reversed { -1 } else { 1 };
            self.segment.set_array_index(self.segment.array_index() + delta);
            self.start_offset = 0;
        } else {
            self.start_offset = self.segment.length()? - self.end_offset;
            self.end_offset = 0;
        }
        Ok(())
    }

    /// Move left, then trim the entry side so traversal starts exactly at
    /// `position`.
    pub fn to_left_until(&mut self, position: HalIndex) -> Result<()> {
        self.to_left()?;
        let raw_start = self.segment.start_position()?;
        let raw_len = self.segment.length()? as HalIndex;
        if self.reversed {
            let low = raw_start + self.end_offset as HalIndex;
            if position < low || position > raw_start + raw_len - 1 {
                return Err(self.cutoff_error(position));
            }
            self.start_offset = (raw_start + raw_len - 1 - position) as u64;
        } else {
            let high = raw_start + raw_len - 1 - self.end_offset as HalIndex;
            if position < raw_start || position > high {
                return Err(self.cutoff_error(position));
            }
            self.start_offset = (position - raw_start) as u64;
        }
        Ok(())
    }

    /// Move right, then trim the exit side so traversal ends exactly at
    /// `position`.
    pub fn to_right_until(&mut self, position: HalIndex) -> Result<()> {
        self.to_right()?;
        let raw_start = self.segment.start_position()?;
        let raw_len = self.segment.length()? as HalIndex;
        if self.reversed {
            let high = raw_start + raw_len - 1 - self.start_offset as HalIndex;
            if position < raw_start || position > high {
                return Err(self.cutoff_error(position));
            }
            self.end_offset = (position - raw_start) as u64;
        } else {
            if position < raw_start + self.start_offset as HalIndex
                || position > raw_start + raw_len - 1
            {
                return Err(self.cutoff_error(position));
            }
            self.end_offset = (raw_start + raw_len - 1 - position) as u64;
        }
        Ok(())
    }

    /// Flip traversal orientation, exchanging the two trim offsets.
    pub fn to_reverse(&mut self) {
        self.reversed = !self.reversed;
        std::mem::swap(&mut self.start_offset, &mut self.end_offset);
    }

    /// Trim the effective range; at least one base must remain.
    pub fn slice(&mut self, start_offset: u64, end_offset: u64) -> Result<()> {
        let raw_len = self.segment.length()?;
        if start_offset + end_offset >= raw_len {
            return Err(HalignError::OutOfRange(format!(
                "slice offsets {start_offset}+{end_offset} consume a segment of length {raw_len}"
            )));
        }
        self.start_offset = start_offset;
        self.end_offset = end_offset;
        Ok(())
    }

    /// Position the cursor on the segment containing `position`.
    ///
    /// Resets orientation and slicing; with `expand_to_segment == false`
    /// the cursor is additionally sliced down to the single base at
    /// `position`.
    pub fn to_site(&mut self, position: HalIndex, expand_to_segment: bool) -> Result<()> {
        let total = self.segment.genome().length() as HalIndex;
        let count = self.segment.num_segments();
        if position < 0 || position >= total {
            return Err(HalignError::OutOfRange(format!(
                "site {position} outside genome of length {total}"
            )));
        }
        if count == 0 {
            return Err(HalignError::OutOfRange(
                "genome stores no segments on this layer".to_string(),
            ));
        }
        self.reversed = false;
        self.reset_slice();
        // stored starts increase strictly, so the greatest start <=
        // position identifies the covering segment
        let (mut lo, mut hi) = (0u64, count - 1);
        while lo < hi {
            let mid = (lo + hi + 1) / 2;
            self.segment.set_array_index(mid as HalIndex);
            if self.segment.start_position()? <= position {
                lo = mid;
            } else {
                hi = mid - 1;
            }
        }
        self.segment.set_array_index(lo as HalIndex);
        let raw_start = self.segment.start_position()?;
        let raw_len = self.segment.length()?;
        if position < raw_start || position >= raw_start + raw_len as HalIndex {
            return Err(HalignError::CorruptFile(format!(
                "segments do not cover position {position}"
            )));
        }
        if !expand_to_segment {
            self.start_offset = (position - raw_start) as u64;
            self.end_offset = raw_len - self.start_offset - 1;
        }
        Ok(())
    }

    /// Materialize the DNA of the effective range, complemented when the
    /// cursor is reversed.
    pub fn string(&self) -> Result<String> {
        let mut dna = DnaIter::new(Rc::clone(self.segment.genome()), self.start_position()?)?;
        if self.reversed {
            dna.to_reverse();
        }
        dna.read_string(self.length()?)
    }

    fn check_in_range(&self) -> Result<()> {
        if self.at_end() {
            return Err(HalignError::OutOfRange(format!(
                "cursor at index {} has left the segment array",
                self.segment.array_index()
            )));
        }
        Ok(())
    }

    fn cutoff_error(&self, position: HalIndex) -> HalignError {
        HalignError::OutOfRange(format!(
            "cutoff {position} falls outside segment {} after the move",
            self.segment.array_index()
        ))
    }

    /// Walk right from the current record to the one containing
    /// `other_start`, then slice to the intersection with the other
    /// layer's effective range. Shared by both parse directions.
    fn adopt_parse(
        &mut self,
        other_start: HalIndex,
        other_length: u64,
        reversed: bool,
    ) -> Result<()> {
        self.reversed = reversed;
        self.reset_slice();
        loop {
            let start = self.segment.start_position()?;
            let len = self.segment.length()? as HalIndex;
            if other_start < start + len {
                break;
            }
            self.segment.set_array_index(self.segment.array_index() + 1);
        }
        let raw_start = self.segment.start_position()?;
        let raw_len = self.segment.length()? as HalIndex;
        if reversed {
            // other_start is the high end of the other layer's range
            self.start_offset = (raw_start + raw_len - 1 - other_start) as u64;
            let other_low = other_start - other_length as HalIndex + 1;
            self.end_offset = (other_low - raw_start).max(0) as u64;
        } else {
            self.start_offset = (other_start - raw_start) as u64;
            let other_end = other_start + other_length as HalIndex;
            self.end_offset = (raw_start + raw_len - other_end).max(0) as u64;
        }
        Ok(())
    }
}

impl SegmentCursor<TopSegment> {
    /// The top-segment record under the cursor.
    pub fn top(&self) -> &TopSegment {
        &self.segment
    }

    /// Move to the top segment containing the bottom cursor's effective
    /// start, sliced to the intersection of the two ranges and sharing the
    /// bottom cursor's orientation.
    pub fn to_parse_up(&mut self, bottom: &BottomSegmentIter) -> Result<()> {
        let index = bottom.bottom().top_parse_index()?;
        if index == NULL_INDEX {
            return Err(HalignError::UnsupportedOperation(format!(
                "bottom segment {} of genome {} has no parse link to the top layer",
                bottom.array_index(),
                bottom.bottom().genome().name()
            )));
        }
        self.segment = TopSegment::new(Rc::clone(bottom.bottom().genome()), index);
        self.adopt_parse(
            bottom.start_position()?,
            bottom.length()?,
            bottom.reversed(),
        )
    }

    /// Follow the bottom cursor's edge to child `child`, propagating the
    /// slice and composing orientation with the edge's reversed flag.
    pub fn to_child(&mut self, bottom: &BottomSegmentIter, child: usize) -> Result<()> {
        let index = bottom.bottom().child_index(child)?;
        if index == NULL_INDEX {
            return Err(HalignError::UnsupportedOperation(format!(
                "bottom segment {} of genome {} is not aligned to child {child}",
                bottom.array_index(),
                bottom.bottom().genome().name()
            )));
        }
        let child_genome = bottom.bottom().genome().child(child)?;
        self.segment = TopSegment::new(child_genome, index);
        self.start_offset = bottom.start_offset();
        self.end_offset = bottom.end_offset();
        self.reversed = bottom.reversed();
        if bottom.bottom().child_reversed(child)? {
            self.to_reverse();
        }
        Ok(())
    }

    /// Step to the next member of the paralogy cycle, adjusting
    /// orientation when the two paralogs map to the parent with opposite
    /// strands.
    pub fn to_next_paralogy(&mut self) -> Result<()> {
        let next = self.segment.paralogy_index()?;
        if next == NULL_INDEX {
            return Err(HalignError::UnsupportedOperation(format!(
                "top segment {} of genome {} belongs to no paralogy cycle",
                self.array_index(),
                self.segment.genome().name()
            )));
        }
        let was_reversed = self.segment.parent_reversed()?;
        self.segment.set_array_index(next);
        if self.segment.parent_reversed()? != was_reversed {
            self.to_reverse();
        }
        Ok(())
    }
}

impl SegmentCursor<BottomSegment> {
    /// The bottom-segment record under the cursor.
    pub fn bottom(&self) -> &BottomSegment {
        &self.segment
    }

    /// Move to the bottom segment containing the top cursor's effective
    /// start; the mirror image of
    /// [`SegmentCursor::<TopSegment>::to_parse_up`].
    pub fn to_parse_down(&mut self, top: &TopSegmentIter) -> Result<()> {
        let index = top.top().bottom_parse_index()?;
        if index == NULL_INDEX {
            return Err(HalignError::UnsupportedOperation(format!(
                "top segment {} of genome {} has no parse link to the bottom layer",
                top.array_index(),
                top.top().genome().name()
            )));
        }
        self.segment = BottomSegment::new(Rc::clone(top.top().genome()), index);
        self.adopt_parse(top.start_position()?, top.length()?, top.reversed())
    }

    /// Follow the top cursor's edge to its parent genome, propagating the
    /// slice and composing orientation with the edge's reversed flag.
    pub fn to_parent(&mut self, top: &TopSegmentIter) -> Result<()> {
        let index = top.top().parent_index()?;
        if index == NULL_INDEX {
            return Err(HalignError::UnsupportedOperation(format!(
                "top segment {} of genome {} is not aligned to its parent",
                top.array_index(),
                top.top().genome().name()
            )));
        }
        let parent = top.top().genome().parent()?.ok_or_else(|| {
            HalignError::UnsupportedOperation(format!(
                "genome {} has no parent",
                top.top().genome().name()
            ))
        })?;
        self.segment = BottomSegment::new(parent, index);
        self.start_offset = top.start_offset();
        self.end_offset = top.end_offset();
        self.reversed = top.reversed();
        if top.top().parent_reversed()? {
            self.to_reverse();
        }
        Ok(())
    }
}
