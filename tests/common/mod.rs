#![allow(dead_code)]

use std::rc::Rc;

use halign::segment::Segment;
use halign::{Alignment, Genome, MemoryStore, NULL_INDEX};

pub fn logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

pub fn memory_alignment() -> Rc<Alignment> {
    Alignment::create(Rc::new(MemoryStore::new())).expect("create alignment")
}

/// Flush and drop an alignment, then open a fresh one over the same store.
pub fn reopen(alignment: Rc<Alignment>) -> Rc<Alignment> {
    let store = alignment.store();
    alignment.close().expect("close alignment");
    drop(alignment);
    Alignment::open(store).expect("reopen alignment")
}

/// Tile the top array with segments of the given lengths and null out
/// every cross-reference.
pub fn tile_tops(genome: &Rc<Genome>, lengths: &[u64]) {
    let mut iter = genome.top_iter(0).expect("top iterator");
    let mut start: i64 = 0;
    for &length in lengths {
        let segment = iter.top();
        segment.set_coordinates(start, length).expect("coordinates");
        segment.set_parent_index(NULL_INDEX).expect("parent");
        segment.set_parent_reversed(false).expect("parent reversed");
        segment.set_bottom_parse_index(NULL_INDEX).expect("parse");
        segment.set_paralogy_index(NULL_INDEX).expect("paralogy");
        start += length as i64;
        iter.to_right().expect("move right");
    }
}

/// Tile the bottom array with segments of the given lengths and null out
/// every cross-reference.
pub fn tile_bottoms(genome: &Rc<Genome>, lengths: &[u64]) {
    let mut iter = genome.bottom_iter(0).expect("bottom iterator");
    let mut start: i64 = 0;
    for &length in lengths {
        let segment = iter.bottom();
        segment.set_coordinates(start, length).expect("coordinates");
        segment.set_top_parse_index(NULL_INDEX).expect("parse");
        for child in 0..segment.num_children() {
            segment.set_child_index(child, NULL_INDEX).expect("child");
            segment.set_child_reversed(child, false).expect("child reversed");
        }
        start += length as i64;
        iter.to_right().expect("move right");
    }
}

/// Point every top segment's parse index at the bottom segment containing
/// its start, and symmetrically for bottoms.
pub fn link_parse_indices(genome: &Rc<Genome>) {
    let num_top = genome.num_top_segments();
    let num_bottom = genome.num_bottom_segments();
    if num_top == 0 || num_bottom == 0 {
        return;
    }
    for i in 0..num_top as i64 {
        let top = genome.top_iter(i).expect("top iterator");
        let start = top.top().start_position().expect("start");
        let mut bottom = genome.bottom_iter(0).expect("bottom iterator");
        bottom.to_site(start, true).expect("site");
        top.top()
            .set_bottom_parse_index(bottom.array_index())
            .expect("parse");
    }
    for i in 0..num_bottom as i64 {
        let bottom = genome.bottom_iter(i).expect("bottom iterator");
        let start = bottom.bottom().start_position().expect("start");
        let mut top = genome.top_iter(0).expect("top iterator");
        top.to_site(start, true).expect("site");
        bottom
            .bottom()
            .set_top_parse_index(top.array_index())
            .expect("parse");
    }
}
