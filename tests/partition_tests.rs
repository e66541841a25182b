mod common;

use std::ops::Range;
use std::path::Path;

use anyhow::Result;
use hrv_multiscale::config::AnalysisConfig;
use hrv_multiscale::partition::{partition, Block, BlockTable, PartitionRequest};

fn partition_resource(name: &str, dest: &Path, request: &PartitionRequest) -> Result<BlockTable> {
    partition(common::resource(name), dest, request, &AnalysisConfig::default())
}

fn ranges(blocks: &[Block]) -> Vec<Range<usize>> {
    blocks.iter().map(|b| b.range.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::common::{capture_logs, captured};
    use log::Level;
    use std::fs;

    #[test]
    fn test_cumulative_record_in_time_blocks() {
        let dest = tempfile::tempdir().unwrap();
        let request = PartitionRequest::new(10.0).with_gap(10.0).full_file(true);
        let table = partition_resource("cumulative.txt", dest.path(), &request).unwrap();

        let blocks = table.get("cumulative.txt").expect("Record should be in the table");
        assert_eq!(ranges(blocks), vec![0..10, 10..20, 20..30]);
        assert_eq!(
            table.spans("cumulative.txt"),
            vec![(0.0, 9.0), (10.0, 19.0), (20.0, 29.0)]
        );
        let block_dir = dest.path().join("cumulative_blocks");
        let first = fs::read_to_string(block_dir.join("cumulative_1")).unwrap();
        let expected: String = (60..70).map(|v| format!("{v}\n")).collect();
        assert_eq!(first, expected, "Blocks hold only the value column.");
        assert!(block_dir.join("cumulative_3").is_file());
        assert!(!table.is_effectively_empty());
    }

    #[test]
    fn test_overrun_warns_and_keeps_trailing_block() {
        capture_logs();
        let dest = tempfile::tempdir().unwrap();
        let request = PartitionRequest::new(10.0).with_gap(10.0).full_file(true);
        let table = partition_resource("cumulative.txt", dest.path(), &request).unwrap();

        let warnings = captured(Level::Warn);
        assert_eq!(warnings.len(), 1, "Only the overrun is reported: {warnings:?}");
        assert!(warnings[0].contains("Ignoring further partitions"));
        assert_eq!(table.get("cumulative.txt").unwrap().len(), 3);
    }

    #[test]
    fn test_end_anchored_time_blocks() {
        let dest = tempfile::tempdir().unwrap();
        let request = PartitionRequest::new(10.0)
            .with_gap(10.0)
            .end_anchored(true)
            .full_file(true);
        let table = partition_resource("cumulative.txt", dest.path(), &request).unwrap();

        let blocks = table.get("cumulative.txt").unwrap();
        assert_eq!(ranges(blocks), vec![20..30, 10..20, 0..10]);
        assert_eq!(blocks[0].span, (20.0, 29.0));
    }

    #[test]
    fn test_periodic_spans_include_signal_loss() {
        let dest = tempfile::tempdir().unwrap();
        let request = PartitionRequest::new(5.0).full_file(true);
        let table = partition_resource("periodic.txt", dest.path(), &request).unwrap();

        let blocks = table.get("periodic.txt").unwrap();
        assert_eq!(blocks.len(), 4, "Windows advance by the modal interval.");
        assert_eq!(blocks[0].range, 0..5);
        assert_eq!(blocks[0].span, (1.0, 6.0));
        // the 2.5 s interval at line 7 stretches the real span of the second block
        assert_eq!(blocks[1].span, (6.0, 12.5));
    }

    #[test]
    fn test_line_tiling_with_overlap() {
        let dest = tempfile::tempdir().unwrap();
        let request = PartitionRequest::new(4.0)
            .with_gap(2.0)
            .use_lines(true)
            .full_file(true);
        let table = partition_resource("values.txt", dest.path(), &request).unwrap();

        let blocks = table.get("values.txt").unwrap();
        assert_eq!(ranges(blocks), vec![0..4, 2..6, 4..8, 6..10, 8..10]);
        let trailing = fs::read_to_string(&blocks[4].path).unwrap();
        assert_eq!(trailing, "108\n109\n");
    }

    #[test]
    fn test_end_anchored_single_window() {
        let dest = tempfile::tempdir().unwrap();
        let request = PartitionRequest::new(3.0)
            .with_start(1.0)
            .use_lines(true)
            .end_anchored(true);
        let table = partition_resource("values.txt", dest.path(), &request).unwrap();

        let blocks = table.get("values.txt").unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].range, 6..9);
        assert_eq!(
            fs::read_to_string(dest.path().join("values")).unwrap(),
            "106\n107\n108\n"
        );
        assert!(table.is_effectively_empty());
    }

    #[test]
    fn test_degenerate_window_writes_nothing_and_warns_once() {
        capture_logs();
        let dest = tempfile::tempdir().unwrap();
        let request = PartitionRequest::new(0.0).with_start(3.0).use_lines(true);
        let table = partition_resource("values.txt", dest.path(), &request).unwrap();

        assert!(table.get("values.txt").unwrap().is_empty());
        assert!(!dest.path().join("values").exists());
        assert_eq!(captured(Level::Warn).len(), 1);
    }

    #[test]
    fn test_directory_partition_covers_every_record() {
        let dest = tempfile::tempdir().unwrap();
        let request = PartitionRequest::new(4.0).use_lines(true).full_file(true);
        let table = partition_resource("dataset", dest.path(), &request).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.get("patient_a.txt").unwrap().len(), 3);
        assert_eq!(table.get("patient_b.txt").unwrap().len(), 3);
        assert!(dest.path().join("patient_b_blocks").join("patient_b_3").is_file());
    }

    #[test]
    fn test_missing_input_yields_no_blocks() {
        let dest = tempfile::tempdir().unwrap();
        let table =
            partition_resource("does_not_exist.txt", dest.path(), &PartitionRequest::default())
                .unwrap();
        assert!(table.get("does_not_exist.txt").unwrap().is_empty());
    }
}
