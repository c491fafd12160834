use crate::segment::Segment;
use crate::{HalIndex, Result, NULL_INDEX};

use super::{BottomSegmentIter, TopSegmentIter};

/// Top-segment cursor that coalesces runs of aligned segments across small
/// unaligned gaps.
///
/// A neighbor joins the run when the unaligned segments between it and the
/// run total at most `gap_threshold` bases and its parent edge continues
/// the run's strand and adjacency (anything else is a rearrangement
/// boundary). With `atomic` set the iterator degenerates to one segment
/// per step.
#[derive(Debug, Clone)]
pub struct GappedTopIter {
    left: TopSegmentIter,
    right: TopSegmentIter,
    gap_threshold: u64,
    atomic: bool,
}

impl GappedTopIter {
    /// Build a gapped cursor anchored on `base`'s segment.
    pub fn new(base: &TopSegmentIter, gap_threshold: u64, atomic: bool) -> Result<Self> {
        let mut left = base.clone();
        left.reset_slice();
        let mut right = base.clone();
        right.reset_slice();
        let mut iter = Self {
            left,
            right,
            gap_threshold,
            atomic,
        };
        iter.extend_left()?;
        iter.extend_right()?;
        Ok(iter)
    }

    fn edge(cursor: &TopSegmentIter) -> Result<Option<(HalIndex, bool)>> {
        let segment = cursor.top();
        let parent = segment.parent_index()?;
        if parent == NULL_INDEX {
            Ok(None)
        } else {
            Ok(Some((parent, segment.parent_reversed()?)))
        }
    }

    fn extend_right(&mut self) -> Result<()> {
        if self.atomic {
            return Ok(());
        }
        loop {
            let Some((anchor_index, anchor_reversed)) = Self::edge(&self.right)? else {
                break;
            };
            let mut probe = self.right.clone();
            let mut gap_run: u64 = 0;
            loop {
                probe.to_right()?;
                if probe.at_end() {
                    return Ok(());
                }
                match Self::edge(&probe)? {
                    None => gap_run += probe.length()?,
                    Some(_) => break,
                }
            }
            if gap_run > self.gap_threshold {
                break;
            }
            let Some((next_index, next_reversed)) = Self::edge(&probe)? else {
                break;
            };
            if next_reversed != anchor_reversed {
                break;
            }
            let delta: HalIndex = if anchor_reversed != self.right.reversed() {
                -1
            } else {
                1
            };
            if next_index != anchor_index + delta {
                break;
            }
            self.right = probe;
        }
        Ok(())
    }

    fn extend_left(&mut self) -> Result<()> {
        if self.atomic {
            return Ok(());
        }
        loop {
            let Some((anchor_index, anchor_reversed)) = Self::edge(&self.left)? else {
                break;
            };
            let mut probe = self.left.clone();
            let mut gap_run: u64 = 0;
            loop {
                probe.to_left()?;
                if probe.at_end() {
                    return Ok(());
                }
                match Self::edge(&probe)? {
                    None => gap_run += probe.length()?,
                    Some(_) => break,
                }
            }
            if gap_run > self.gap_threshold {
                break;
            }
            let Some((next_index, next_reversed)) = Self::edge(&probe)? else {
                break;
            };
            if next_reversed != anchor_reversed {
                break;
            }
            let delta: HalIndex = if anchor_reversed != self.left.reversed() {
                1
            } else {
                -1
            };
            if next_index != anchor_index + delta {
                break;
            }
            self.left = probe;
        }
        Ok(())
    }

    /// Genome-coordinate extent of the coalesced run: `(low, length)`.
    pub fn range(&self) -> Result<(HalIndex, u64)> {
        let left_start = self.left.top().start_position()?;
        let left_len = self.left.top().length()? as HalIndex;
        let right_start = self.right.top().start_position()?;
        let right_len = self.right.top().length()? as HalIndex;
        let low = left_start.min(right_start);
        let high = (left_start + left_len).max(right_start + right_len);
        Ok((low, (high - low) as u64))
    }

    /// First base of the run in traversal order.
    pub fn start_position(&self) -> Result<HalIndex> {
        let (low, length) = self.range()?;
        if self.left.reversed() {
            Ok(low + length as HalIndex - 1)
        } else {
            Ok(low)
        }
    }

    /// Total bases spanned by the run, gaps included.
    pub fn length(&self) -> Result<u64> {
        Ok(self.range()?.1)
    }

    /// Move to the run starting after the current one.
    pub fn to_right(&mut self) -> Result<()> {
        let mut base = self.right.clone();
        base.to_right()?;
        self.left = base.clone();
        self.right = base;
        self.extend_right()
    }

    /// Move to the run ending before the current one.
    pub fn to_left(&mut self) -> Result<()> {
        let mut base = self.left.clone();
        base.to_left()?;
        self.right = base.clone();
        self.left = base;
        self.extend_left()
    }

    /// Traversal-leftmost segment cursor of the run.
    pub fn left_cursor(&self) -> &TopSegmentIter {
        &self.left
    }

    /// Traversal-rightmost segment cursor of the run.
    pub fn right_cursor(&self) -> &TopSegmentIter {
        &self.right
    }

    /// Whether either extremity has left the array.
    pub fn at_end(&self) -> bool {
        self.left.at_end() || self.right.at_end()
    }
}

/// Bottom-segment counterpart of [`GappedTopIter`], coalescing along the
/// edge to one fixed child genome.
#[derive(Debug, Clone)]
pub struct GappedBottomIter {
    left: BottomSegmentIter,
    right: BottomSegmentIter,
    child: usize,
    gap_threshold: u64,
    atomic: bool,
}

impl GappedBottomIter {
    /// Build a gapped cursor anchored on `base`'s segment, following the
    /// edge to child `child`.
    pub fn new(
        base: &BottomSegmentIter,
        child: usize,
        gap_threshold: u64,
        atomic: bool,
    ) -> Result<Self> {
        let mut left = base.clone();
        left.reset_slice();
        let mut right = base.clone();
        right.reset_slice();
        let mut iter = Self {
            left,
            right,
            child,
            gap_threshold,
            atomic,
        };
        iter.extend_left()?;
        iter.extend_right()?;
        Ok(iter)
    }

    fn edge(cursor: &BottomSegmentIter, child: usize) -> Result<Option<(HalIndex, bool)>> {
        let segment = cursor.bottom();
        let index = segment.child_index(child)?;
        if index == NULL_INDEX {
            Ok(None)
        } else {
            Ok(Some((index, segment.child_reversed(child)?)))
        }
    }

    fn extend_right(&mut self) -> Result<()> {
        if self.atomic {
            return Ok(());
        }
        loop {
            let Some((anchor_index, anchor_reversed)) = Self::edge(&self.right, self.child)?
            else {
                break;
            };
            let mut probe = self.right.clone();
            let mut gap_run: u64 = 0;
            loop {
                probe.to_right()?;
                if probe.at_end() {
                    return Ok(());
                }
                match Self::edge(&probe, self.child)? {
                    None => gap_run += probe.length()?,
                    Some(_) => break,
                }
            }
            if gap_run > self.gap_threshold {
                break;
            }
            let Some((next_index, next_reversed)) = Self::edge(&probe, self.child)? else {
                break;
            };
            if next_reversed != anchor_reversed {
                break;
            }
            let delta: HalIndex = if anchor_reversed != self.right.reversed() {
                -1
            } else {
                1
            };
            if next_index != anchor_index + delta {
                break;
            }
            self.right = probe;
        }
        Ok(())
    }

    fn extend_left(&mut self) -> Result<()> {
        if self.atomic {
            return Ok(());
        }
        loop {
            let Some((anchor_index, anchor_reversed)) = Self::edge(&self.left, self.child)? else {
                break;
            };
            let mut probe = self.left.clone();
            let mut gap_run: u64 = 0;
            loop {
                probe.to_left()?;
                if probe.at_end() {
                    return Ok(());
                }
                match Self::edge(&probe, self.child)? {
                    None => gap_run += probe.length()?,
                    Some(_) => break,
                }
            }
            if gap_run > self.gap_threshold {
                break;
            }
            let Some((next_index, next_reversed)) = Self::edge(&probe, self.child)? else {
                break;
            };
            if next_reversed != anchor_reversed {
                break;
            }
            let delta: HalIndex = if anchor_reversed != self.left.reversed() {
                1
            } else {
                -1
            };
            if next_index != anchor_index + delta {
                break;
            }
            self.left = probe;
        }
        Ok(())
    }

    /// Genome-coordinate extent of the coalesced run: `(low, length)`.
    pub fn range(&self) -> Result<(HalIndex, u64)> {
        let left_start = self.left.bottom().start_position()?;
        let left_len = self.left.bottom().length()? as HalIndex;
        let right_start = self.right.bottom().start_position()?;
        let right_len = self.right.bottom().length()? as HalIndex;
        let low = left_start.min(right_start);
        let high = (left_start + left_len).max(right_start + right_len);
        Ok((low, (high - low) as u64))
    }

    /// First base of the run in traversal order.
    pub fn start_position(&self) -> Result<HalIndex> {
        let (low, length) = self.range()?;
        if self.left.reversed() {
            Ok(low + length as HalIndex - 1)
        } else {
            Ok(low)
        }
    }

    /// Total bases spanned by the run, gaps included.
    pub fn length(&self) -> Result<u64> {
        Ok(self.range()?.1)
    }

    /// Move to the run starting after the current one.
    pub fn to_right(&mut self) -> Result<()> {
        let mut base = self.right.clone();
        base.to_right()?;
        self.left = base.clone();
        self.right = base;
        self.extend_right()
    }

    /// Move to the run ending before the current one.
    pub fn to_left(&mut self) -> Result<()> {
        let mut base = self.left.clone();
        base.to_left()?;
        self.right = base.clone();
        self.left = base;
        self.extend_left()
    }

    /// Traversal-leftmost segment cursor of the run.
    pub fn left_cursor(&self) -> &BottomSegmentIter {
        &self.left
    }

    /// Traversal-rightmost segment cursor of the run.
    pub fn right_cursor(&self) -> &BottomSegmentIter {
        &self.right
    }

    /// The child edge this cursor follows.
    pub fn child(&self) -> usize {
        self.child
    }

    /// Whether either extremity has left the array.
    pub fn at_end(&self) -> bool {
        self.left.at_end() || self.right.at_end()
    }
}
