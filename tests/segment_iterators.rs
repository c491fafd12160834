//! Segment round-trip and cursor movement tests: records written through
//! iterators must survive a close/reopen cycle and read back identically
//! in both walk directions, and `to_site` must land on the covering
//! segment for every position.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use halign::segment::Segment;
use halign::{HalIndex, SequenceInfo, NULL_INDEX};

mod common;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TopFields {
    parent: HalIndex,
    parent_reversed: bool,
    parse: HalIndex,
    paralogy: HalIndex,
}

#[test]
fn top_records_survive_reopen_in_both_directions() {
    common::logging();
    let alignment = common::memory_alignment();
    let ancestor = alignment.add_root_genome("Anc0").unwrap();
    for i in 0..9 {
        alignment
            .add_leaf_genome(&format!("Leaf{i}"), "Anc0")
            .unwrap();
    }
    ancestor
        .set_dimensions(
            &[SequenceInfo::new("Sequence", 1_000_000, 5_000, 10_000)],
            true,
        )
        .unwrap();
    assert_eq!(ancestor.num_children(), 9);
    assert_eq!(ancestor.num_top_segments(), 5_000);

    let mut rng = StdRng::seed_from_u64(0x5e6);
    let seg_len = 1_000_000 / 5_000;
    let mut expected = Vec::with_capacity(5_000);
    let mut iter = ancestor.top_iter(0).unwrap();
    for i in 0..5_000i64 {
        let fields = TopFields {
            parent: rng.gen_range(0..10_000),
            parent_reversed: rng.gen_bool(0.5),
            parse: rng.gen_range(0..10_000),
            paralogy: rng.gen_range(0..5_000),
        };
        let segment = iter.top();
        segment.set_coordinates(i * seg_len, seg_len as u64).unwrap();
        segment.set_parent_index(fields.parent).unwrap();
        segment.set_parent_reversed(fields.parent_reversed).unwrap();
        segment.set_bottom_parse_index(fields.parse).unwrap();
        segment.set_paralogy_index(fields.paralogy).unwrap();
        expected.push(fields);
        iter.to_right().unwrap();
    }
    assert!(iter.at_end());

    let alignment = common::reopen(alignment);
    let ancestor = alignment.open_genome("Anc0").unwrap();
    assert_eq!(ancestor.num_top_segments(), 5_000);
    assert_eq!(ancestor.num_children(), 9);

    let mut iter = ancestor.top_iter(0).unwrap();
    for (i, fields) in expected.iter().enumerate() {
        assert_eq!(iter.array_index(), i as HalIndex);
        let segment = iter.top();
        assert_eq!(segment.start_position().unwrap(), i as i64 * seg_len);
        assert_eq!(segment.length().unwrap(), seg_len as u64);
        assert_eq!(segment.parent_index().unwrap(), fields.parent);
        assert_eq!(segment.parent_reversed().unwrap(), fields.parent_reversed);
        assert_eq!(segment.bottom_parse_index().unwrap(), fields.parse);
        assert_eq!(segment.paralogy_index().unwrap(), fields.paralogy);
        iter.to_right().unwrap();
    }

    let mut iter = ancestor.top_iter(4_999).unwrap();
    for i in (0..5_000).rev() {
        assert_eq!(iter.array_index(), i as HalIndex);
        let segment = iter.top();
        assert_eq!(segment.parent_index().unwrap(), expected[i].parent);
        assert_eq!(segment.paralogy_index().unwrap(), expected[i].paralogy);
        iter.to_left().unwrap();
    }
    assert!(iter.at_end());
}

#[test]
fn sliced_walk_visits_every_base_forward_and_back() {
    let alignment = common::memory_alignment();
    let genome = alignment.add_root_genome("root").unwrap();
    genome
        .set_dimensions(&[SequenceInfo::new("chr", 2_000, 10, 0)], false)
        .unwrap();
    common::tile_tops(&genome, &[200; 10]);
    let total = genome.length() as HalIndex;

    let mut iter = genome.top_iter(0).unwrap();
    let first_len = iter.length().unwrap();
    iter.slice(0, first_len - 1).unwrap();
    for position in 0..total {
        assert_eq!(iter.length().unwrap(), 1);
        assert_eq!(iter.start_position().unwrap(), position);
        if position + 1 < total {
            iter.to_right_until(position + 1).unwrap();
        }
    }

    let mut iter = genome.top_iter(9).unwrap();
    let last_len = iter.length().unwrap();
    iter.slice(last_len - 1, 0).unwrap();
    for position in (0..total).rev() {
        assert_eq!(iter.length().unwrap(), 1);
        assert_eq!(iter.start_position().unwrap(), position);
        if position > 0 {
            iter.to_left_until(position - 1).unwrap();
        }
    }
}

#[test]
fn reversed_sliced_walk_visits_every_base() {
    let alignment = common::memory_alignment();
    let genome = alignment.add_root_genome("root").unwrap();
    genome
        .set_dimensions(&[SequenceInfo::new("chr", 1_200, 6, 0)], false)
        .unwrap();
    common::tile_tops(&genome, &[200; 6]);
    let total = genome.length() as HalIndex;

    // a reversed cursor walks up the genome when moved traversal-left
    let mut iter = genome.top_iter(0).unwrap();
    iter.to_reverse();
    assert!(iter.reversed());
    let len = iter.length().unwrap();
    iter.slice(len - 1, 0).unwrap();
    for position in 0..total {
        assert_eq!(iter.length().unwrap(), 1);
        assert_eq!(iter.start_position().unwrap(), position);
        if position + 1 < total {
            iter.to_left_until(position + 1).unwrap();
        }
    }

    // and down the genome when moved traversal-right
    let mut iter = genome.top_iter(5).unwrap();
    iter.to_reverse();
    let len = iter.length().unwrap();
    iter.slice(0, len - 1).unwrap();
    for position in (0..total).rev() {
        assert_eq!(iter.length().unwrap(), 1);
        assert_eq!(iter.start_position().unwrap(), position);
        if position > 0 {
            iter.to_right_until(position - 1).unwrap();
        }
    }
}

#[test]
fn to_site_lands_on_covering_segment_everywhere() {
    let alignment = common::memory_alignment();
    let genome = alignment.add_root_genome("root").unwrap();

    let mut rng = StdRng::seed_from_u64(1_133);
    let lengths: Vec<u64> = (0..1_133).map(|_| rng.gen_range(1..78)).collect();
    let total: u64 = lengths.iter().sum();
    genome
        .set_dimensions(
            &[SequenceInfo::new("chr", total, lengths.len() as u64, 0)],
            false,
        )
        .unwrap();
    common::tile_tops(&genome, &lengths);

    let mut iter = genome.top_iter(0).unwrap();
    for position in 0..total as HalIndex {
        iter.to_site(position, false).unwrap();
        assert_eq!(iter.length().unwrap(), 1);
        assert_eq!(iter.start_position().unwrap(), position);

        iter.to_site(position, true).unwrap();
        let start = iter.start_position().unwrap();
        let length = iter.length().unwrap();
        assert!(start <= position && position < start + length as HalIndex);
        assert_eq!(length, iter.top().length().unwrap());
        assert!(!iter.reversed());
    }
}

#[test]
fn out_of_range_operations_are_hard_errors() {
    let alignment = common::memory_alignment();
    let genome = alignment.add_root_genome("root").unwrap();
    genome
        .set_dimensions(&[SequenceInfo::new("chr", 100, 2, 0)], false)
        .unwrap();
    common::tile_tops(&genome, &[50, 50]);

    assert!(genome.top_iter(3).is_err());
    assert!(genome.top_iter(-1).is_err());

    let mut iter = genome.top_iter(0).unwrap();
    assert!(iter.to_site(100, true).is_err());
    assert!(iter.to_site(-1, true).is_err());
    assert!(iter.slice(30, 20).is_err());
    assert!(iter.slice(51, 0).is_err());

    // moving off the array leaves the cursor at its end state; moving
    // further is the error
    let mut iter = genome.top_iter(1).unwrap();
    iter.to_right().unwrap();
    assert!(iter.at_end());
    assert!(iter.to_right().is_err());

    // a paralogy-free segment has no next paralog to move to
    let mut iter = genome.top_iter(0).unwrap();
    assert_eq!(iter.top().paralogy_index().unwrap(), NULL_INDEX);
    assert!(iter.to_next_paralogy().is_err());
}

#[test]
fn paralogy_cycle_returns_to_origin() {
    let alignment = common::memory_alignment();
    let genome = alignment.add_root_genome("root").unwrap();
    genome
        .set_dimensions(&[SequenceInfo::new("chr", 400, 4, 0)], false)
        .unwrap();
    common::tile_tops(&genome, &[100; 4]);

    // 0 -> 2 -> 3 -> 0 is a closed cycle; 1 stays solo
    for (from, to) in [(0i64, 2i64), (2, 3), (3, 0)] {
        genome
            .top_iter(from)
            .unwrap()
            .top()
            .set_paralogy_index(to)
            .unwrap();
    }

    let mut iter = genome.top_iter(0).unwrap();
    let mut visited = vec![iter.array_index()];
    for _ in 0..3 {
        iter.to_next_paralogy().unwrap();
        visited.push(iter.array_index());
    }
    assert_eq!(visited, vec![0, 2, 3, 0]);
    genome.validate().unwrap();
}
