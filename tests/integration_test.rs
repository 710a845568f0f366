use std::io::Cursor;

use vibescol::{
    aggregate, AggregateOptions, BlockBuilder, EncodingType, FileReader, FileWriter, GlobalIdBitmap,
    MultiReaderStack, WriterOptions,
};

fn write_file(ids: &[u64], values: &[i64], encoding: EncodingType) -> Vec<u8> {
    let mut buf = Vec::new();
    let mut writer =
        FileWriter::new(&mut buf, WriterOptions { block_size_target: 10_000, encoding_type: encoding }).unwrap();
    writer.write_block(ids, values).unwrap();
    writer.finalize_and_close().unwrap();
    buf
}

/// Scenario 1 — single block, raw encoding.
#[test]
fn scenario_1_single_block_raw_encoding() {
    let ids: Vec<u64> = vec![1, 5, 10, 15, 20, 25, 30, 35, 40, 45];
    let values: Vec<i64> = (100..=1000).step_by(100).collect();
    let buf = write_file(&ids, &values, EncodingType::Raw);

    let mut reader = FileReader::new(Cursor::new(buf)).unwrap();
    assert_eq!(reader.block_count(), 1);
    let entry = &reader.footer_entries()[0];
    assert_eq!(entry.count, 10);
    assert_eq!(entry.sum, 5500);
    assert_eq!(entry.min_value, 100);
    assert_eq!(entry.max_value, 1000);
    assert_eq!(entry.min_id, 1);
    assert_eq!(entry.max_id, 45);

    let result = aggregate(&mut reader, &AggregateOptions::default()).unwrap();
    assert_eq!(result.count, 10);
    assert_eq!(result.min(), 100);
    assert_eq!(result.max(), 1000);
    assert_eq!(result.sum, 5500);
    assert_eq!(result.avg(), 550.0);
}

/// Scenario 2 — varint encoding decodes identically and is strictly smaller.
#[test]
fn scenario_2_varint_encoding_is_smaller_and_lossless() {
    let ids: Vec<u64> = vec![1, 5, 10, 15, 20, 25, 30, 35, 40, 45];
    let values: Vec<i64> = (100..=1000).step_by(100).collect();

    let raw_buf = write_file(&ids, &values, EncodingType::Raw);
    let varint_buf = write_file(&ids, &values, EncodingType::VarintBoth);
    assert!(varint_buf.len() < raw_buf.len());

    let mut raw_reader = FileReader::new(Cursor::new(raw_buf)).unwrap();
    let mut varint_reader = FileReader::new(Cursor::new(varint_buf)).unwrap();

    let (raw_ids, raw_values) = raw_reader.get_pairs(0).unwrap();
    let (varint_ids, varint_values) = varint_reader.get_pairs(0).unwrap();
    assert_eq!(raw_ids, varint_ids);
    assert_eq!(raw_values, varint_values);
    assert_eq!(raw_ids, ids);
    assert_eq!(raw_values, values);
}

/// Scenario 3 — multi-file shadowing across three generations.
#[test]
fn scenario_3_multi_file_shadowing() {
    // F0 (oldest): ids 1..=10, values 10..=100 step 10.
    let f0_ids: Vec<u64> = (1..=10).collect();
    let f0_values: Vec<i64> = (1..=10).map(|n| n * 10).collect();
    let f0 = write_file(&f0_ids, &f0_values, EncodingType::Raw);

    // F1: ids 5,6,7 values 500,600,700; ids 11..=15 values 110..=150 step 10.
    let f1_ids: Vec<u64> = vec![5, 6, 7, 11, 12, 13, 14, 15];
    let f1_values: Vec<i64> = vec![500, 600, 700, 110, 120, 130, 140, 150];
    let f1 = write_file(&f1_ids, &f1_values, EncodingType::Raw);

    // F2 (newest): ids 3,4,11,12 values 300,400,1100,1200; ids 16..=20 values 160..=200 step 10.
    let f2_ids: Vec<u64> = vec![3, 4, 11, 12, 16, 17, 18, 19, 20];
    let f2_values: Vec<i64> = vec![300, 400, 1100, 1200, 160, 170, 180, 190, 200];
    let f2 = write_file(&f2_ids, &f2_values, EncodingType::Raw);

    let mut stack = MultiReaderStack::new();
    stack.push(FileReader::new(Cursor::new(f0)).unwrap());
    stack.push(FileReader::new(Cursor::new(f1)).unwrap());
    stack.push(FileReader::new(Cursor::new(f2)).unwrap());

    let result = stack.aggregate(&AggregateOptions::default()).unwrap();
    assert_eq!(result.count, 20);
    assert_eq!(result.min(), 10);
    assert_eq!(result.max(), 1200);
    assert_eq!(result.sum, 6420);
    assert_eq!(result.avg(), 321.0);
}

/// Scenario 4 — bitmap-filtered multi-reader.
#[test]
fn scenario_4_bitmap_filtered_multi_reader() {
    let f0_ids: Vec<u64> = (1..=10).collect();
    let f0_values: Vec<i64> = (1..=10).map(|n| n * 10).collect();
    let f0 = write_file(&f0_ids, &f0_values, EncodingType::Raw);

    let f1_ids: Vec<u64> = vec![5, 6, 7, 11, 12, 13, 14, 15];
    let f1_values: Vec<i64> = vec![500, 600, 700, 110, 120, 130, 140, 150];
    let f1 = write_file(&f1_ids, &f1_values, EncodingType::Raw);

    let f2_ids: Vec<u64> = vec![3, 4, 11, 12, 16, 17, 18, 19, 20];
    let f2_values: Vec<i64> = vec![300, 400, 1100, 1200, 160, 170, 180, 190, 200];
    let f2 = write_file(&f2_ids, &f2_values, EncodingType::Raw);

    let mut stack = MultiReaderStack::new();
    stack.push(FileReader::new(Cursor::new(f0)).unwrap());
    stack.push(FileReader::new(Cursor::new(f1)).unwrap());
    stack.push(FileReader::new(Cursor::new(f2)).unwrap());

    let allow = GlobalIdBitmap::from_ids(1u64..=10);
    let opts = AggregateOptions { allow_filter: Some(allow), ..Default::default() };
    let result = stack.aggregate(&opts).unwrap();
    assert_eq!(result.count, 10);
    assert_eq!(result.sum, 2800);
}

/// Scenario 5 — empty multi-reader.
#[test]
fn scenario_5_empty_multi_reader() {
    let mut stack: MultiReaderStack<Cursor<Vec<u8>>> = MultiReaderStack::new();
    let result = stack.aggregate(&AggregateOptions::default()).unwrap();
    assert_eq!(result.count, 0);
    assert_eq!(result.sum, 0);
    assert_eq!(result.avg(), 0.0);
}

/// Scenario 6 — corruption: get_pairs fails but metadata aggregate survives.
#[test]
fn scenario_6_corruption_blocks_scan_not_metadata() {
    let ids: Vec<u64> = vec![1, 2, 3];
    let values: Vec<i64> = vec![10, 20, 30];
    let mut buf = write_file(&ids, &values, EncodingType::Raw);

    // Flip a byte inside the block payload: file header (64) + block header
    // (80) + data layout (16) = 160, landing just past the framing, inside
    // the id/value section.
    let corrupt_at = 64 + 80 + 16 + 4;
    buf[corrupt_at] ^= 0xff;

    let mut reader = FileReader::new(Cursor::new(buf)).unwrap();
    assert!(reader.get_pairs(0).is_err());

    let result = aggregate(&mut reader, &AggregateOptions::default()).unwrap();
    assert_eq!(result.count, 3);
    assert_eq!(result.sum, 60);
}

/// Testable property — filter monotonicity: A subseteq B implies
/// aggregate(A).count <= aggregate(B).count.
#[test]
fn property_filter_monotonicity() {
    let ids: Vec<u64> = (1..=20).collect();
    let values: Vec<i64> = (1..=20).collect();
    let buf = write_file(&ids, &values, EncodingType::Raw);

    let small = GlobalIdBitmap::from_ids(1u64..=5);
    let big = GlobalIdBitmap::from_ids(1u64..=15);

    let mut reader_small = FileReader::new(Cursor::new(buf.clone())).unwrap();
    let mut reader_big = FileReader::new(Cursor::new(buf)).unwrap();

    let small_result =
        aggregate(&mut reader_small, &AggregateOptions { allow_filter: Some(small), ..Default::default() }).unwrap();
    let big_result =
        aggregate(&mut reader_big, &AggregateOptions { allow_filter: Some(big), ..Default::default() }).unwrap();

    assert!(small_result.count <= big_result.count);
}

/// Testable property — deny is the complement of allow.
#[test]
fn property_deny_is_complement_of_allow() {
    let ids: Vec<u64> = (1..=10).collect();
    let values: Vec<i64> = (1..=10).map(|n| n * 7).collect();
    let buf = write_file(&ids, &values, EncodingType::Raw);

    let filter = GlobalIdBitmap::from_ids([1u64, 3, 5, 7, 9]);

    let mut reader_allow = FileReader::new(Cursor::new(buf.clone())).unwrap();
    let mut reader_deny = FileReader::new(Cursor::new(buf.clone())).unwrap();
    let mut reader_full = FileReader::new(Cursor::new(buf)).unwrap();

    let allow_result = aggregate(
        &mut reader_allow,
        &AggregateOptions { allow_filter: Some(filter.clone()), ..Default::default() },
    )
    .unwrap();
    let deny_result =
        aggregate(&mut reader_deny, &AggregateOptions { deny_filter: Some(filter), ..Default::default() }).unwrap();
    let full_result = aggregate(&mut reader_full, &AggregateOptions::default()).unwrap();

    let merged = allow_result.merge(&deny_result);
    assert_eq!(merged.count, full_result.count);
    assert_eq!(merged.sum, full_result.sum);
}

/// Testable property — parallel determinism across several worker counts.
#[test]
fn property_parallel_determinism() {
    let ids: Vec<u64> = (1..=500).collect();
    let values: Vec<i64> = (1..=500).map(|n| n * 3 - 17).collect();
    let buf = write_file(&ids, &values, EncodingType::VarintBoth);

    let mut baseline_reader = FileReader::new(Cursor::new(buf.clone())).unwrap();
    let baseline = aggregate(
        &mut baseline_reader,
        &AggregateOptions { skip_precalculated: true, parallel: 0, ..Default::default() },
    )
    .unwrap();

    for parallel in [-1, 1, 2, 8] {
        let mut reader = FileReader::new(Cursor::new(buf.clone())).unwrap();
        let result = aggregate(
            &mut reader,
            &AggregateOptions { skip_precalculated: true, parallel, ..Default::default() },
        )
        .unwrap();
        assert_eq!(result, baseline, "mismatch at parallel={parallel}");
    }
}

/// Round-trip via the streaming `BlockBuilder`, spanning several flushed
/// blocks plus a short remainder.
#[test]
fn builder_round_trip_across_multiple_blocks() {
    let mut buf = Vec::new();
    let writer = FileWriter::new(
        &mut buf,
        WriterOptions { block_size_target: 4, encoding_type: EncodingType::VarintIds },
    )
    .unwrap();
    let mut builder = BlockBuilder::new(writer);

    let ids: Vec<u64> = (1..=10).collect();
    let values: Vec<i64> = (1..=10).map(|n| n * n).collect();
    builder.write(&ids, &values).unwrap();
    assert_eq!(builder.total_items(), 10);
    builder.close().unwrap();

    let mut reader = FileReader::new(Cursor::new(buf)).unwrap();
    // 10 pairs at block_size_target=4 -> 3 blocks (4, 4, 2).
    assert_eq!(reader.block_count(), 3);

    let mut all_ids = Vec::new();
    let mut all_values = Vec::new();
    for i in 0..reader.block_count() {
        let (block_ids, block_values) = reader.get_pairs(i).unwrap();
        all_ids.extend(block_ids);
        all_values.extend(block_values);
    }
    assert_eq!(all_ids, ids);
    assert_eq!(all_values, values);
}
