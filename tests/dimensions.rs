//! Dimension lifecycle tests: `set_dimensions` lays sequences out
//! cumulatively, `update_top_dimensions` / `update_bottom_dimensions`
//! shift only the sequences that follow an updated one, and the sequence
//! index answers name and position queries after every change.

use halign::{HalignError, SequenceInfo, SequenceUpdate};

mod common;

fn three_sequences() -> Vec<SequenceInfo> {
    vec![
        SequenceInfo::new("chrA", 100, 4, 2),
        SequenceInfo::new("chrB", 200, 6, 3),
        SequenceInfo::new("chrC", 300, 8, 4),
    ]
}

#[test]
fn set_dimensions_lays_out_cumulative_records() {
    common::logging();
    let alignment = common::memory_alignment();
    let genome = alignment.add_root_genome("root").unwrap();
    genome.set_dimensions(&three_sequences(), true).unwrap();

    assert_eq!(genome.length(), 600);
    assert_eq!(genome.num_sequences(), 3);
    assert_eq!(genome.num_top_segments(), 18);
    assert_eq!(genome.num_bottom_segments(), 9);

    let b = genome.sequence_by_name("chrB").unwrap();
    assert_eq!(b.start(), 100);
    assert_eq!(b.length(), 200);
    assert_eq!(b.top_first_index(), 4);
    assert_eq!(b.bottom_first_index(), 2);

    let c = genome.sequence_by_name("chrC").unwrap();
    assert_eq!(c.start(), 300);
    assert_eq!(c.top_first_index(), 10);
    assert_eq!(c.bottom_first_index(), 5);

    assert_eq!(genome.sequence_by_site(99).unwrap().name(), "chrA");
    assert_eq!(genome.sequence_by_site(100).unwrap().name(), "chrB");
    assert_eq!(genome.sequence_by_site(599).unwrap().name(), "chrC");
    assert!(genome.sequence_by_site(600).is_none());
}

#[test]
fn update_top_dimensions_shifts_only_following_sequences() {
    let alignment = common::memory_alignment();
    let genome = alignment.add_root_genome("root").unwrap();
    genome.set_dimensions(&three_sequences(), false).unwrap();

    genome
        .update_top_dimensions(&[SequenceUpdate::new("chrB", 10)])
        .unwrap();

    // preceding sequence: untouched
    let a = genome.sequence_by_name("chrA").unwrap();
    assert_eq!(a.top_first_index(), 0);
    assert_eq!(a.num_top_segments(), 4);
    // updated sequence: new count, same first index
    let b = genome.sequence_by_name("chrB").unwrap();
    assert_eq!(b.top_first_index(), 4);
    assert_eq!(b.num_top_segments(), 10);
    // following sequence: shifted by exactly the delta (+4)
    let c = genome.sequence_by_name("chrC").unwrap();
    assert_eq!(c.top_first_index(), 14);
    assert_eq!(c.num_top_segments(), 8);

    assert_eq!(genome.num_top_segments(), 22);
    // the bottom layer is untouched
    assert_eq!(genome.num_bottom_segments(), 9);
    assert_eq!(c.bottom_first_index(), 5);
}

#[test]
fn update_bottom_dimensions_is_symmetric() {
    let alignment = common::memory_alignment();
    let genome = alignment.add_root_genome("root").unwrap();
    genome.set_dimensions(&three_sequences(), false).unwrap();

    genome
        .update_bottom_dimensions(&[SequenceUpdate::new("chrA", 1)])
        .unwrap();

    let a = genome.sequence_by_name("chrA").unwrap();
    assert_eq!(a.num_bottom_segments(), 1);
    assert_eq!(a.bottom_first_index(), 0);
    let b = genome.sequence_by_name("chrB").unwrap();
    assert_eq!(b.bottom_first_index(), 1);
    let c = genome.sequence_by_name("chrC").unwrap();
    assert_eq!(c.bottom_first_index(), 4);
    assert_eq!(genome.num_bottom_segments(), 8);
    assert_eq!(genome.num_top_segments(), 18);
}

#[test]
fn updating_an_unknown_sequence_is_a_hard_error() {
    let alignment = common::memory_alignment();
    let genome = alignment.add_root_genome("root").unwrap();
    genome.set_dimensions(&three_sequences(), false).unwrap();

    let result = genome.update_top_dimensions(&[SequenceUpdate::new("chrX", 5)]);
    assert!(matches!(result, Err(HalignError::MissingName(_))));
    // nothing changed
    assert_eq!(genome.num_top_segments(), 18);
}

#[test]
fn set_dimensions_replaces_previous_layout() {
    let alignment = common::memory_alignment();
    let genome = alignment.add_root_genome("root").unwrap();
    genome.set_dimensions(&three_sequences(), true).unwrap();

    genome
        .set_dimensions(&[SequenceInfo::new("only", 50, 5, 5)], true)
        .unwrap();
    assert_eq!(genome.length(), 50);
    assert_eq!(genome.num_sequences(), 1);
    assert_eq!(genome.num_top_segments(), 5);
    assert!(genome.sequence_by_name("chrA").is_none());
    assert_eq!(genome.sequence_by_site(10).unwrap().name(), "only");
}

#[test]
fn sequence_iter_walks_records_in_order() {
    let alignment = common::memory_alignment();
    let genome = alignment.add_root_genome("root").unwrap();
    genome.set_dimensions(&three_sequences(), false).unwrap();

    let mut iter = genome.sequence_iter(0).unwrap();
    let mut names = Vec::new();
    while !iter.at_end() {
        names.push(iter.sequence().unwrap().name().to_string());
        iter.to_next();
    }
    assert_eq!(names, vec!["chrA", "chrB", "chrC"]);

    let end = genome.sequence_iter(genome.num_sequences()).unwrap();
    assert!(end.at_end());
    assert!(genome.sequence_iter(genome.num_sequences() + 1).is_err());
}

#[test]
fn dimensions_survive_reopen() {
    let alignment = common::memory_alignment();
    let genome = alignment.add_root_genome("root").unwrap();
    genome.set_dimensions(&three_sequences(), true).unwrap();
    genome
        .update_top_dimensions(&[SequenceUpdate::new("chrB", 10)])
        .unwrap();

    let alignment = common::reopen(alignment);
    let genome = alignment.open_genome("root").unwrap();
    assert_eq!(genome.length(), 600);
    assert_eq!(genome.num_top_segments(), 22);
    let c = genome.sequence_by_name("chrC").unwrap();
    assert_eq!(c.top_first_index(), 14);
}

#[test]
fn metadata_round_trips() {
    let alignment = common::memory_alignment();
    let genome = alignment.add_root_genome("root").unwrap();
    genome.set_metadata("assembly", "hg38").unwrap();
    genome.set_metadata("source", "unit-test").unwrap();

    let alignment = common::reopen(alignment);
    let genome = alignment.open_genome("root").unwrap();
    assert_eq!(genome.metadata("assembly").unwrap().as_deref(), Some("hg38"));
    assert_eq!(genome.metadata("missing").unwrap(), None);
}

#[test]
fn validation_passes_on_consistent_layout_and_flags_corruption() {
    let alignment = common::memory_alignment();
    let genome = alignment.add_root_genome("root").unwrap();
    genome
        .set_dimensions(&[SequenceInfo::new("chr", 100, 4, 2)], false)
        .unwrap();
    common::tile_tops(&genome, &[25; 4]);
    common::tile_bottoms(&genome, &[50; 2]);
    common::link_parse_indices(&genome);
    genome.validate().unwrap();

    // break a parse link and expect the sweep to notice
    genome
        .top_iter(0)
        .unwrap()
        .top()
        .set_bottom_parse_index(1)
        .unwrap();
    assert!(matches!(
        genome.validate(),
        Err(HalignError::CorruptFile(_))
    ));
}
