//! Property tests for the packed-record codecs: decode(encode(r)) == r
//! for arbitrary field values, including the null sentinel.

use proptest::prelude::*;

use halign::codec::{
    bottom_record_width, sequence_record_width, BottomRecord, ChildEdge, SequenceRecord,
    TopRecord, TOP_RECORD_WIDTH,
};

fn index_strategy() -> impl Strategy<Value = i64> {
    prop_oneof![Just(-1i64), any::<i64>()]
}

proptest! {
    #[test]
    fn top_record_round_trips(
        start in any::<i64>(),
        length in any::<u64>(),
        bottom_parse_index in index_strategy(),
        parent_index in index_strategy(),
        parent_reversed in any::<bool>(),
        paralogy_index in index_strategy(),
    ) {
        let record = TopRecord {
            start,
            length,
            bottom_parse_index,
            parent_index,
            parent_reversed,
            paralogy_index,
        };
        let mut slot = [0u8; TOP_RECORD_WIDTH];
        record.encode(&mut slot);
        prop_assert_eq!(TopRecord::decode(&slot), record);

        // byte-exactness: re-encoding the decoded record changes nothing
        let mut second = [0u8; TOP_RECORD_WIDTH];
        TopRecord::decode(&slot).encode(&mut second);
        prop_assert_eq!(slot, second);
    }

    #[test]
    fn bottom_record_round_trips(
        start in any::<i64>(),
        length in any::<u64>(),
        top_parse_index in index_strategy(),
        children in prop::collection::vec((index_strategy(), any::<bool>()), 0..12),
    ) {
        let record = BottomRecord {
            start,
            length,
            top_parse_index,
            children: children
                .into_iter()
                .map(|(index, reversed)| ChildEdge { index, reversed })
                .collect(),
        };
        let mut slot = vec![0u8; bottom_record_width(record.children.len())];
        record.encode(&mut slot);
        prop_assert_eq!(BottomRecord::decode(&slot), record);
    }

    #[test]
    fn sequence_record_round_trips(
        start in 0i64..1 << 40,
        length in 0u64..1 << 40,
        num_top in any::<u64>(),
        num_bottom in any::<u64>(),
        top_first_index in index_strategy(),
        bottom_first_index in index_strategy(),
        name in "[A-Za-z0-9_.]{0,24}",
    ) {
        let record = SequenceRecord {
            start,
            length,
            num_top,
            num_bottom,
            top_first_index,
            bottom_first_index,
            name,
        };
        let mut slot = vec![0u8; sequence_record_width(record.name.len() + 32)];
        record.encode(&mut slot).unwrap();
        prop_assert_eq!(SequenceRecord::decode(&slot).unwrap(), record);
    }
}
