//! Per-genome segmented-sequence store.
//!
//! A genome owns four chunked arrays — DNA, top segments, bottom segments,
//! sequences — plus its metadata groups, and hands out the cursors every
//! higher-level traversal is built from. Parent and child genomes are
//! resolved through the alignment registry and cached weakly; any
//! dimensional change invalidates those caches.

use std::cell::{Cell, Ref, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use tracing::debug;

use crate::alignment::Alignment;
use crate::codec::{
    bottom_record_width, children_from_width, sequence_record_width, SequenceRecord,
    TOP_RECORD_WIDTH,
};
use crate::iter::{BottomSegmentIter, DnaIter, SegmentCursor, TopSegmentIter};
use crate::segment::{BottomSegment, Segment, TopSegment};
use crate::sequence::{Sequence, SequenceIndex, SequenceIter};
use crate::storage::{ArrayProps, ArrayStore, ChunkedArray};
use crate::{HalIndex, HalignError, Result};

const DNA_ARRAY: &str = "DNA_ARRAY";
const TOP_ARRAY: &str = "TOP_ARRAY";
const BOTTOM_ARRAY: &str = "BOTTOM_ARRAY";
const SEQUENCE_ARRAY: &str = "SEQUENCE_ARRAY";
const META_GROUP: &str = "Meta";
const RUP_GROUP: &str = "Rup";
const RUP_KEY: &str = "Rup";

// DNA bases are ~30x smaller than segment records and compress ~3x worse,
// so their chunks are inflated to keep decompression amortized.
const DNA_CHUNK_SCALE: u64 = 10;

/// Name padding added to the sequence-record name capacity so sequences
/// can be renamed in place.
const NAME_PAD: usize = 32;

/// Per-sequence dimensions handed to [`Genome::set_dimensions`].
#[derive(Debug, Clone)]
pub struct SequenceInfo {
    /// Sequence name, unique within the genome.
    pub name: String,
    /// Length in bases.
    pub length: u64,
    /// Number of top segments covering the sequence.
    pub num_top: u64,
    /// Number of bottom segments covering the sequence.
    pub num_bottom: u64,
}

impl SequenceInfo {
    /// Convenience constructor.
    pub fn new(name: impl Into<String>, length: u64, num_top: u64, num_bottom: u64) -> Self {
        Self {
            name: name.into(),
            length,
            num_top,
            num_bottom,
        }
    }
}

/// A segment-count update for one existing sequence.
#[derive(Debug, Clone)]
pub struct SequenceUpdate {
    /// Name of a sequence already present in the genome.
    pub name: String,
    /// New segment count for the updated layer.
    pub num_segments: u64,
}

impl SequenceUpdate {
    /// Convenience constructor.
    pub fn new(name: impl Into<String>, num_segments: u64) -> Self {
        Self {
            name: name.into(),
            num_segments,
        }
    }
}

/// One genome of the alignment: a named coordinate space with segmented
/// per-position alignments to its parent and children.
#[derive(Debug)]
pub struct Genome {
    name: String,
    alignment: Weak<Alignment>,
    store: Rc<dyn ArrayStore>,
    props: ArrayProps,
    buffered_chunks: usize,
    total_length: Cell<u64>,
    num_children: Cell<usize>,
    dna: RefCell<Option<ChunkedArray>>,
    top: RefCell<Option<ChunkedArray>>,
    bottom: RefCell<Option<ChunkedArray>>,
    sequences: RefCell<Option<ChunkedArray>>,
    index: RefCell<SequenceIndex>,
    parent_cache: RefCell<Option<Weak<Genome>>>,
    child_cache: RefCell<Vec<Weak<Genome>>>,
}

impl Genome {
    /// Attach to (or create) the genome group named `name`, loading any
    /// arrays already present.
    pub(crate) fn attach(alignment: &Rc<Alignment>, name: &str) -> Result<Rc<Self>> {
        let store = alignment.store();
        let genome = Rc::new(Self {
            name: name.to_string(),
            alignment: Rc::downgrade(alignment),
            store: Rc::clone(&store),
            // creation properties are copied per genome, never shared
            props: alignment.props(),
            buffered_chunks: alignment.buffered_chunks(),
            total_length: Cell::new(0),
            num_children: Cell::new(0),
            dna: RefCell::new(None),
            top: RefCell::new(None),
            bottom: RefCell::new(None),
            sequences: RefCell::new(None),
            index: RefCell::new(SequenceIndex::new()),
            parent_cache: RefCell::new(None),
            child_cache: RefCell::new(Vec::new()),
        });
        if store.group_exists(name) {
            genome.read()?;
        } else {
            store.group_create(name)?;
            store.group_create(&genome.subgroup(META_GROUP))?;
            store.group_create(&genome.subgroup(RUP_GROUP))?;
            debug!(genome = name, "created genome group");
        }
        Ok(genome)
    }

    fn subgroup(&self, child: &str) -> String {
        format!("{}/{}", self.name, child)
    }

    /// Genome name, unique within the alignment.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Total sequence length L: the sum of all sequence lengths.
    pub fn length(&self) -> u64 {
        self.total_length.get()
    }

    /// Number of child genomes (the bottom-record fan-out K).
    pub fn num_children(&self) -> usize {
        self.num_children.get()
    }

    /// Number of sequences.
    pub fn num_sequences(&self) -> u64 {
        self.sequences.borrow().as_ref().map_or(0, |a| a.len())
    }

    /// Number of top segments, excluding the sentinel record.
    pub fn num_top_segments(&self) -> u64 {
        self.top
            .borrow()
            .as_ref()
            .map_or(0, |a| a.len().saturating_sub(1))
    }

    /// Number of bottom segments, excluding the sentinel record.
    pub fn num_bottom_segments(&self) -> u64 {
        self.bottom
            .borrow()
            .as_ref()
            .map_or(0, |a| a.len().saturating_sub(1))
    }

    /// Whether this genome stores DNA bases.
    pub fn contains_dna(&self) -> bool {
        self.dna.borrow().as_ref().map_or(0, |a| a.len()) > 0
    }

    /// Whether the final DNA nibble is padding (odd genome length).
    pub fn dna_pad(&self) -> Result<bool> {
        Ok(self
            .store
            .get_attr(&self.subgroup(RUP_GROUP), RUP_KEY)?
            .as_deref()
            == Some("1"))
    }

    // ------------------------------------------------------------------
    // dimension management

    /// Atomically (re)initialize the genome from per-sequence dimensions.
    ///
    /// Existing DNA, sequence, and segment arrays are unlinked; new ones
    /// are allocated, sequence records written with cumulative start
    /// positions and first-segment indices, and the branch caches
    /// invalidated.
    pub fn set_dimensions(&self, sequences: &[SequenceInfo], store_dna: bool) -> Result<()> {
        let total: u64 = sequences.iter().map(|s| s.length).sum();
        let max_name = sequences.iter().map(|s| s.name.len()).max().unwrap_or(0);
        debug!(
            genome = %self.name,
            sequences = sequences.len(),
            total,
            "set dimensions"
        );

        if let Some(dna) = self.dna.borrow_mut().take() {
            dna.unlink()?;
        } else if self.store.exists(&self.name, DNA_ARRAY) {
            self.store.unlink_array(&self.name, DNA_ARRAY)?;
        }
        if let Some(seqs) = self.sequences.borrow_mut().take() {
            seqs.unlink()?;
        } else if self.store.exists(&self.name, SEQUENCE_ARRAY) {
            self.store.unlink_array(&self.name, SEQUENCE_ARRAY)?;
        }
        self.index.borrow_mut().clear();
        self.total_length.set(total);

        if store_dna && total > 0 {
            let mut dna_len = total / 2;
            if total % 2 == 1 {
                dna_len += 1;
                self.store.set_attr(&self.subgroup(RUP_GROUP), RUP_KEY, "1")?;
            } else {
                self.store.set_attr(&self.subgroup(RUP_GROUP), RUP_KEY, "0")?;
            }
            let array = ChunkedArray::create(
                Rc::clone(&self.store),
                &self.name,
                DNA_ARRAY,
                1,
                dna_len,
                self.props.chunk_elems * DNA_CHUNK_SCALE,
                self.buffered_chunks,
            )?;
            *self.dna.borrow_mut() = Some(array);
        }

        if !sequences.is_empty() {
            let array = ChunkedArray::create(
                Rc::clone(&self.store),
                &self.name,
                SEQUENCE_ARRAY,
                sequence_record_width(max_name + NAME_PAD),
                sequences.len() as u64,
                self.props.chunk_elems,
                self.buffered_chunks,
            )?;
            *self.sequences.borrow_mut() = Some(array);
            self.write_sequences(sequences)?;
        }

        let num_top: u64 = sequences.iter().map(|s| s.num_top).sum();
        let num_bottom: u64 = sequences.iter().map(|s| s.num_bottom).sum();
        self.set_genome_top_dimensions(num_top)?;
        self.set_genome_bottom_dimensions(num_bottom)?;

        *self.parent_cache.borrow_mut() = None;
        self.child_cache.borrow_mut().clear();
        Ok(())
    }

    /// Rewrite top-segment counts for a subset of existing sequences.
    ///
    /// Every named sequence must already be present. Counts of unnamed
    /// sequences are preserved; each sequence's first-top index is
    /// recomputed cumulatively and written back.
    pub fn update_top_dimensions(&self, updates: &[SequenceUpdate]) -> Result<()> {
        let by_name = self.check_updates(updates)?;
        let mut running: u64 = 0;
        let order: Vec<Rc<Sequence>> = self.index.borrow().iter().cloned().collect();
        {
            let array = self.sequence_array()?;
            for sequence in &order {
                let i = sequence.array_index();
                let count = by_name
                    .get(sequence.name())
                    .copied()
                    .unwrap_or_else(|| sequence.num_top_segments());
                array.set_i64(
                    i,
                    crate::codec::SEQUENCE_TOP_FIRST_OFFSET,
                    running as HalIndex,
                )?;
                array.set_u64(i, crate::codec::SEQUENCE_NUM_TOP_OFFSET, count)?;
                running += count;
            }
        }
        self.set_genome_top_dimensions(running)?;
        self.read_sequences()
    }

    /// Rewrite bottom-segment counts for a subset of existing sequences.
    ///
    /// Symmetric to [`Genome::update_top_dimensions`].
    pub fn update_bottom_dimensions(&self, updates: &[SequenceUpdate]) -> Result<()> {
        let by_name = self.check_updates(updates)?;
        let mut running: u64 = 0;
        let order: Vec<Rc<Sequence>> = self.index.borrow().iter().cloned().collect();
        {
            let array = self.sequence_array()?;
            for sequence in &order {
                let i = sequence.array_index();
                let count = by_name
                    .get(sequence.name())
                    .copied()
                    .unwrap_or_else(|| sequence.num_bottom_segments());
                array.set_i64(
                    i,
                    crate::codec::SEQUENCE_BOTTOM_FIRST_OFFSET,
                    running as HalIndex,
                )?;
                array.set_u64(i, crate::codec::SEQUENCE_NUM_BOTTOM_OFFSET, count)?;
                running += count;
            }
        }
        self.set_genome_bottom_dimensions(running)?;
        self.read_sequences()
    }

    fn check_updates(&self, updates: &[SequenceUpdate]) -> Result<HashMap<String, u64>> {
        let index = self.index.borrow();
        let mut by_name = HashMap::with_capacity(updates.len());
        for update in updates {
            if index.by_name(&update.name).is_none() {
                return Err(HalignError::MissingName(format!(
                    "cannot update sequence {} because it is not present in genome {}",
                    update.name, self.name
                )));
            }
            by_name.insert(update.name.clone(), update.num_segments);
        }
        Ok(by_name)
    }

    fn set_genome_top_dimensions(&self, num_segments: u64) -> Result<()> {
        if let Some(top) = self.top.borrow_mut().take() {
            top.unlink()?;
        } else if self.store.exists(&self.name, TOP_ARRAY) {
            self.store.unlink_array(&self.name, TOP_ARRAY)?;
        }
        let array = ChunkedArray::create(
            Rc::clone(&self.store),
            &self.name,
            TOP_ARRAY,
            TOP_RECORD_WIDTH,
            num_segments + 1,
            self.props.chunk_elems,
            self.buffered_chunks,
        )?;
        *self.top.borrow_mut() = Some(array);
        *self.parent_cache.borrow_mut() = None;
        Ok(())
    }

    fn set_genome_bottom_dimensions(&self, num_segments: u64) -> Result<()> {
        if let Some(bottom) = self.bottom.borrow_mut().take() {
            bottom.unlink()?;
        } else if self.store.exists(&self.name, BOTTOM_ARRAY) {
            self.store.unlink_array(&self.name, BOTTOM_ARRAY)?;
        }
        let alignment = self.registry()?;
        let num_children = alignment.child_names(&self.name)?.len();
        // keep chunk byte size comparable across fan-outs
        let chunk = if num_children >= 10 {
            (self.props.chunk_elems * 10 / num_children as u64).max(1)
        } else {
            self.props.chunk_elems
        };
        let array = ChunkedArray::create(
            Rc::clone(&self.store),
            &self.name,
            BOTTOM_ARRAY,
            bottom_record_width(num_children),
            num_segments + 1,
            chunk,
            self.buffered_chunks,
        )?;
        *self.bottom.borrow_mut() = Some(array);
        self.num_children.set(num_children);
        self.child_cache.borrow_mut().clear();
        Ok(())
    }

    fn write_sequences(&self, sequences: &[SequenceInfo]) -> Result<()> {
        let mut index = self.index.borrow_mut();
        index.clear();
        let array = self.sequence_array()?;
        let mut start: u64 = 0;
        let mut top_first: u64 = 0;
        let mut bottom_first: u64 = 0;
        for (i, info) in sequences.iter().enumerate() {
            let record = SequenceRecord {
                start: start as HalIndex,
                length: info.length,
                num_top: info.num_top,
                num_bottom: info.num_bottom,
                top_first_index: top_first as HalIndex,
                bottom_first_index: bottom_first as HalIndex,
                name: info.name.clone(),
            };
            let mut slot = vec![0u8; array.element_width()];
            record.encode(&mut slot)?;
            array.write_slot(i as u64, &slot)?;
            index.insert(Sequence::new(i as u64, record));
            start += info.length;
            top_first += info.num_top;
            bottom_first += info.num_bottom;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // loading

    /// Open whichever arrays exist, recover the child fan-out from the
    /// bottom record width, and rebuild the sequence index.
    pub fn read(&self) -> Result<()> {
        for (name, cell) in [
            (DNA_ARRAY, &self.dna),
            (TOP_ARRAY, &self.top),
            (SEQUENCE_ARRAY, &self.sequences),
        ] {
            *cell.borrow_mut() = if self.store.exists(&self.name, name) {
                Some(ChunkedArray::load(
                    Rc::clone(&self.store),
                    &self.name,
                    name,
                    self.buffered_chunks,
                )?)
            } else {
                None
            };
        }
        *self.bottom.borrow_mut() = if self.store.exists(&self.name, BOTTOM_ARRAY) {
            let array = ChunkedArray::load(
                Rc::clone(&self.store),
                &self.name,
                BOTTOM_ARRAY,
                self.buffered_chunks,
            )?;
            let num_children =
                children_from_width(array.element_width()).ok_or_else(|| {
                    HalignError::CorruptFile(format!(
                        "bottom array of genome {} has record width {}, which fits no child count",
                        self.name,
                        array.element_width()
                    ))
                })?;
            self.num_children.set(num_children);
            Some(array)
        } else {
            None
        };
        self.read_sequences()
    }

    fn read_sequences(&self) -> Result<()> {
        {
            let mut index = self.index.borrow_mut();
            index.clear();
            let mut total: u64 = 0;
            if let Some(array) = self.sequences.borrow().as_ref() {
                for i in 0..array.len() {
                    let record = SequenceRecord::decode(&array.read_slot(i)?)?;
                    total += record.length;
                    index.insert(Sequence::new(i, record));
                }
            }
            self.total_length.set(total);
        }
        let dna_bases = self.dna.borrow().as_ref().map_or(0, |a| a.len()) * 2;
        let total = self.total_length.get();
        if dna_bases > 0 && dna_bases != total && dna_bases - 1 != total {
            return Err(HalignError::CorruptFile(format!(
                "sequences of genome {} have total length {total} but the DNA array holds \
                 {dna_bases} bases",
                self.name
            )));
        }
        Ok(())
    }

    /// Write every dirty chunk of every array back to the backend.
    pub fn flush(&self) -> Result<()> {
        for cell in [&self.dna, &self.top, &self.bottom, &self.sequences] {
            if let Some(array) = cell.borrow().as_ref() {
                array.flush()?;
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // sequences

    /// Decode the sequence record at `index`.
    pub fn sequence_record(&self, index: u64) -> Result<Sequence> {
        let array = self.sequence_array()?;
        let record = SequenceRecord::decode(&array.read_slot(index)?)?;
        Ok(Sequence::new(index, record))
    }

    /// Look a sequence up by name.
    pub fn sequence_by_name(&self, name: &str) -> Option<Rc<Sequence>> {
        self.index.borrow().by_name(name)
    }

    /// The sequence containing genome position `position`, if any.
    pub fn sequence_by_site(&self, position: u64) -> Option<Rc<Sequence>> {
        self.index.borrow().sequence_by_site(position)
    }

    // ------------------------------------------------------------------
    // iterator factories

    /// Cursor over sequence records, positioned at `index`.
    pub fn sequence_iter(self: &Rc<Self>, index: u64) -> Result<SequenceIter> {
        if index > self.num_sequences() {
            return Err(HalignError::OutOfRange(format!(
                "sequence index {index} exceeds count {}",
                self.num_sequences()
            )));
        }
        Ok(SequenceIter::new(Rc::clone(self), index))
    }

    /// Top-segment cursor positioned at `index`; the count itself yields
    /// the end cursor.
    pub fn top_iter(self: &Rc<Self>, index: HalIndex) -> Result<TopSegmentIter> {
        if index < 0 || index as u64 > self.num_top_segments() {
            return Err(HalignError::OutOfRange(format!(
                "top segment index {index} exceeds count {}",
                self.num_top_segments()
            )));
        }
        Ok(SegmentCursor::new(TopSegment::new(Rc::clone(self), index)))
    }

    /// End cursor one past the last top segment.
    pub fn top_end_iter(self: &Rc<Self>) -> Result<TopSegmentIter> {
        self.top_iter(self.num_top_segments() as HalIndex)
    }

    /// Bottom-segment cursor positioned at `index`.
    pub fn bottom_iter(self: &Rc<Self>, index: HalIndex) -> Result<BottomSegmentIter> {
        if index < 0 || index as u64 > self.num_bottom_segments() {
            return Err(HalignError::OutOfRange(format!(
                "bottom segment index {index} exceeds count {}",
                self.num_bottom_segments()
            )));
        }
        Ok(SegmentCursor::new(BottomSegment::new(
            Rc::clone(self),
            index,
        )))
    }

    /// End cursor one past the last bottom segment.
    pub fn bottom_end_iter(self: &Rc<Self>) -> Result<BottomSegmentIter> {
        self.bottom_iter(self.num_bottom_segments() as HalIndex)
    }

    /// DNA cursor at `position`; the genome length itself is the valid end
    /// position.
    pub fn dna_iter(self: &Rc<Self>, position: HalIndex) -> Result<DnaIter> {
        DnaIter::new(Rc::clone(self), position)
    }

    /// DNA end cursor.
    pub fn dna_end_iter(self: &Rc<Self>) -> Result<DnaIter> {
        self.dna_iter(self.length() as HalIndex)
    }

    // ------------------------------------------------------------------
    // tree resolution

    fn registry(&self) -> Result<Rc<Alignment>> {
        self.alignment.upgrade().ok_or_else(|| {
            HalignError::UnsupportedOperation(format!(
                "genome {} outlived its alignment registry",
                self.name
            ))
        })
    }

    /// The parent genome, or `None` for the root. Resolved through the
    /// registry and cached weakly.
    pub fn parent(&self) -> Result<Option<Rc<Genome>>> {
        if let Some(cached) = self.parent_cache.borrow().as_ref().and_then(Weak::upgrade) {
            return Ok(Some(cached));
        }
        let alignment = self.registry()?;
        match alignment.parent_name(&self.name)? {
            None => Ok(None),
            Some(parent_name) => {
                let parent = alignment.open_genome(&parent_name)?;
                *self.parent_cache.borrow_mut() = Some(Rc::downgrade(&parent));
                Ok(Some(parent))
            }
        }
    }

    /// The child genome at position `child`.
    pub fn child(&self, child: usize) -> Result<Rc<Genome>> {
        if child >= self.num_children.get() {
            return Err(HalignError::OutOfRange(format!(
                "child {child} exceeds fan-out {} of genome {}",
                self.num_children.get(),
                self.name
            )));
        }
        if let Some(cached) = self.child_cache.borrow().get(child).and_then(Weak::upgrade) {
            return Ok(cached);
        }
        let alignment = self.registry()?;
        let names = alignment.child_names(&self.name)?;
        let resolved = alignment.open_genome(&names[child])?;
        let mut cache = self.child_cache.borrow_mut();
        cache.resize(names.len(), Weak::new());
        cache[child] = Rc::downgrade(&resolved);
        Ok(resolved)
    }

    /// Position of `child` among this genome's children, if it is one.
    pub fn child_index(&self, child: &Genome) -> Result<Option<usize>> {
        let alignment = self.registry()?;
        let names = alignment.child_names(&self.name)?;
        Ok(names.iter().position(|n| n == child.name()))
    }

    // ------------------------------------------------------------------
    // DNA strings

    /// The genome's entire DNA string.
    pub fn string(self: &Rc<Self>) -> Result<String> {
        self.sub_string(0, self.length())
    }

    /// Overwrite the genome's entire DNA string.
    pub fn set_string(self: &Rc<Self>, input: &str) -> Result<()> {
        if input.len() as u64 != self.length() {
            return Err(HalignError::OutOfRange(format!(
                "input string of {} bases does not cover genome {} of length {}",
                input.len(),
                self.name,
                self.length()
            )));
        }
        self.set_sub_string(input, 0)
    }

    /// Read `length` bases starting at `start`.
    pub fn sub_string(self: &Rc<Self>, start: u64, length: u64) -> Result<String> {
        if start + length > self.length() {
            return Err(HalignError::OutOfRange(format!(
                "substring {start}..{} exceeds genome length {}",
                start + length,
                self.length()
            )));
        }
        let mut cursor = self.dna_iter(start as HalIndex)?;
        cursor.read_string(length)
    }

    /// Write `input` starting at genome position `start`.
    pub fn set_sub_string(self: &Rc<Self>, input: &str, start: u64) -> Result<()> {
        if start + input.len() as u64 > self.length() {
            return Err(HalignError::OutOfRange(format!(
                "substring {start}..{} exceeds genome length {}",
                start + input.len() as u64,
                self.length()
            )));
        }
        let mut cursor = self.dna_iter(start as HalIndex)?;
        cursor.write_string(input)
    }

    // ------------------------------------------------------------------
    // metadata

    /// Read a user metadata value.
    pub fn metadata(&self, key: &str) -> Result<Option<String>> {
        self.store.get_attr(&self.subgroup(META_GROUP), key)
    }

    /// Set a user metadata value.
    pub fn set_metadata(&self, key: &str, value: &str) -> Result<()> {
        self.store.set_attr(&self.subgroup(META_GROUP), key, value)
    }

    // ------------------------------------------------------------------
    // array access (crate internal)

    pub(crate) fn top_array(&self) -> Result<Ref<'_, ChunkedArray>> {
        Ref::filter_map(self.top.borrow(), Option::as_ref).map_err(|_| {
            HalignError::UnsupportedOperation(format!(
                "genome {} has no top segment array",
                self.name
            ))
        })
    }

    pub(crate) fn bottom_array(&self) -> Result<Ref<'_, ChunkedArray>> {
        Ref::filter_map(self.bottom.borrow(), Option::as_ref).map_err(|_| {
            HalignError::UnsupportedOperation(format!(
                "genome {} has no bottom segment array",
                self.name
            ))
        })
    }

    pub(crate) fn dna_array(&self) -> Result<Ref<'_, ChunkedArray>> {
        Ref::filter_map(self.dna.borrow(), Option::as_ref).map_err(|_| {
            HalignError::UnsupportedOperation(format!("genome {} has no DNA array", self.name))
        })
    }

    fn sequence_array(&self) -> Result<Ref<'_, ChunkedArray>> {
        Ref::filter_map(self.sequences.borrow(), Option::as_ref).map_err(|_| {
            HalignError::UnsupportedOperation(format!(
                "genome {} has no sequence array",
                self.name
            ))
        })
    }

    // ------------------------------------------------------------------
    // validation

    /// Check the stored invariants: sequence partition, segment coverage
    /// with end sentinels, parse consistency, paralogy closure, and DNA
    /// length parity.
    pub fn validate(self: &Rc<Self>) -> Result<()> {
        let total = self.length();

        // sequences partition [0, L)
        let mut running: u64 = 0;
        for sequence in self.index.borrow().iter() {
            if sequence.start() as u64 != running {
                return Err(HalignError::CorruptFile(format!(
                    "sequence {} starts at {} instead of {running}",
                    sequence.name(),
                    sequence.start()
                )));
            }
            running += sequence.length();
        }
        if running != total {
            return Err(HalignError::CorruptFile(format!(
                "sequences cover {running} of {total} bases in genome {}",
                self.name
            )));
        }

        self.validate_layer(true)?;
        self.validate_layer(false)?;

        // paralogy cycles close within the segment count
        let num_top = self.num_top_segments();
        for i in 0..num_top as HalIndex {
            let segment = TopSegment::new(Rc::clone(self), i);
            let first = segment.paralogy_index()?;
            if first == crate::NULL_INDEX {
                continue;
            }
            let mut walker = TopSegment::new(Rc::clone(self), first);
            let mut steps: u64 = 1;
            while walker.array_index() != i {
                let next = walker.paralogy_index()?;
                if next == crate::NULL_INDEX || steps > num_top {
                    return Err(HalignError::CorruptFile(format!(
                        "paralogy chain from top segment {i} of genome {} does not close",
                        self.name
                    )));
                }
                walker.set_array_index(next);
                steps += 1;
            }
        }

        // DNA length parity
        let dna_bases = self.dna.borrow().as_ref().map_or(0, |a| a.len()) * 2;
        if dna_bases > 0 {
            if dna_bases != total && dna_bases - 1 != total {
                return Err(HalignError::CorruptFile(format!(
                    "DNA array of genome {} holds {dna_bases} bases for length {total}",
                    self.name
                )));
            }
            if (dna_bases == total + 1) != self.dna_pad()? {
                return Err(HalignError::CorruptFile(format!(
                    "DNA parity flag of genome {} disagrees with its array size",
                    self.name
                )));
            }
        }
        Ok(())
    }

    fn validate_layer(&self, top_layer: bool) -> Result<()> {
        let (count, layer) = if top_layer {
            (self.num_top_segments(), "top")
        } else {
            (self.num_bottom_segments(), "bottom")
        };
        if count == 0 {
            return Ok(());
        }
        let total = self.length() as HalIndex;
        let array = if top_layer {
            self.top_array()?
        } else {
            self.bottom_array()?
        };
        let mut prev: HalIndex = 0;
        for i in 0..=count {
            let start = array.get_i64(i, 0)?;
            if i == 0 && start != 0 {
                return Err(HalignError::CorruptFile(format!(
                    "first {layer} segment of genome {} starts at {start}",
                    self.name
                )));
            }
            if i > 0 && start <= prev {
                return Err(HalignError::CorruptFile(format!(
                    "{layer} segment {i} of genome {} starts at {start}, not after {prev}",
                    self.name
                )));
            }
            prev = start;
        }
        if prev != total {
            return Err(HalignError::CorruptFile(format!(
                "{layer} sentinel of genome {} is {prev}, expected {total}",
                self.name
            )));
        }

        // parse links must contain the referring segment's start
        let other = if top_layer {
            self.bottom_array()
        } else {
            self.top_array()
        };
        let Ok(other) = other else {
            return Ok(());
        };
        let parse_offset = if top_layer {
            crate::codec::TOP_BOTTOM_PARSE_OFFSET
        } else {
            crate::codec::BOTTOM_TOP_PARSE_OFFSET
        };
        for i in 0..count {
            let start = array.get_i64(i, 0)?;
            let parse = array.get_i64(i, parse_offset)?;
            if parse == crate::NULL_INDEX {
                continue;
            }
            if parse < 0 || parse as u64 + 1 >= other.len() {
                return Err(HalignError::CorruptFile(format!(
                    "{layer} segment {i} of genome {} parses to invalid index {parse}",
                    self.name
                )));
            }
            let target_start = other.get_i64(parse as u64, 0)?;
            let target_end = other.get_i64(parse as u64 + 1, 0)?;
            if start < target_start || start >= target_end {
                return Err(HalignError::CorruptFile(format!(
                    "{layer} segment {i} of genome {} starts at {start}, outside its parse \
                     target [{target_start}, {target_end})",
                    self.name
                )));
            }
        }
        Ok(())
    }
}
