//! Partitioning of heart rate records into blocks.
//!
//! A record is cut either into a single window or, in full-file mode, into a
//! sequence of possibly overlapping blocks whose starts are `gap` apart. Windows
//! are measured in seconds (default) or in lines, from the start of the record or
//! anchored at its end.
//!
//! Every written block holds only the value column, one value per line, and is
//! reported in the [`BlockTable`] together with the real time it spans.
//!
//! # Example
//!
//! ```no_run
//! use hrv_multiscale::config::AnalysisConfig;
//! use hrv_multiscale::partition::{partition, PartitionRequest};
//!
//! let request = PartitionRequest::new(300.0).with_gap(60.0).full_file(true);
//! let table = partition("dataset", "dataset_parts", &request, &AnalysisConfig::default()).unwrap();
//! for (name, blocks) in table.iter() {
//!     println!("{name}: {} blocks", blocks.len());
//! }
//! ```

pub mod blocks;
pub mod window;

use std::collections::BTreeMap;
use std::ops::Range;
use std::path::{Path, PathBuf};

use anyhow::Result;
use log::{debug, error, warn};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::config::AnalysisConfig;
use crate::record::{file_name, list_records, Record};
use blocks::{write_window, BlockSequencer, BlockWriter};
use window::{Measure, WindowCalculator};

/// Parameters of a partition.
///
/// `start`, `section` and `gap` are seconds, or line counts when `use_lines` is set.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionRequest {
    /// Offset of the first window from the start (or the end) of the record.
    pub start: f64,
    /// Length of every window.
    pub section: f64,
    /// Distance between the starts of consecutive blocks. Not positive means `section`.
    pub gap: f64,
    pub end_anchored: bool,
    /// Tile the whole record instead of cutting a single window.
    pub full_file: bool,
    pub use_lines: bool,
}

impl Default for PartitionRequest {
    fn default() -> Self {
        Self {
            start: 0.0,
            section: 60.0,
            gap: 0.0,
            end_anchored: false,
            full_file: false,
            use_lines: false,
        }
    }
}

impl PartitionRequest {
    pub fn new(section: f64) -> Self {
        Self {
            section,
            ..Self::default()
        }
    }

    pub fn with_start(mut self, start: f64) -> Self {
        self.start = start;
        self
    }

    pub fn with_gap(mut self, gap: f64) -> Self {
        self.gap = gap;
        self
    }

    pub fn end_anchored(mut self, end_anchored: bool) -> Self {
        self.end_anchored = end_anchored;
        self
    }

    pub fn full_file(mut self, full_file: bool) -> Self {
        self.full_file = full_file;
        self
    }

    pub fn use_lines(mut self, use_lines: bool) -> Self {
        self.use_lines = use_lines;
        self
    }

    pub fn measure(&self) -> Measure {
        if self.use_lines {
            Measure::Lines
        } else {
            Measure::Seconds
        }
    }
}

/// A written block.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    /// 1-based position of the block within its record.
    pub number: usize,
    pub path: PathBuf,
    /// Line interval of the record held by the block.
    pub range: Range<usize>,
    /// Real time, in seconds, at the first and at the last sample of the block.
    pub span: (f64, f64),
}

/// Blocks produced for every partitioned record, keyed by file name.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockTable {
    entries: BTreeMap<String, Vec<Block>>,
}

impl BlockTable {
    pub fn insert(&mut self, name: String, blocks: Vec<Block>) {
        self.entries.insert(name, blocks);
    }

    pub fn get(&self, name: &str) -> Option<&[Block]> {
        self.entries.get(name).map(|blocks| blocks.as_slice())
    }

    /// Time spans of the blocks of `name`, in block order.
    pub fn spans(&self, name: &str) -> Vec<(f64, f64)> {
        self.get(name)
            .map(|blocks| blocks.iter().map(|b| b.span).collect())
            .unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<Block>)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when no record was cut into more than one block, in which case a
    /// block-wise analysis has nothing to compare.
    pub fn is_effectively_empty(&self) -> bool {
        self.entries.values().all(|blocks| blocks.len() <= 1)
    }
}

/// Partitions the record at `input`, or every record of the directory `input`.
///
/// Records that cannot be read are logged and reported with no blocks.
///
/// # Errors
///
/// Returns an error if the input directory cannot be listed or an output file or
/// directory cannot be written.
pub fn partition(
    input: impl AsRef<Path>,
    dest_dir: impl AsRef<Path>,
    request: &PartitionRequest,
    config: &AnalysisConfig,
) -> Result<BlockTable> {
    config.validate()?;
    let mut table = BlockTable::default();
    for path in list_records(input.as_ref())? {
        let name = file_name(&path);
        let blocks = partition_file(&path, dest_dir.as_ref(), request, config)?;
        table.insert(name, blocks);
    }
    Ok(table)
}

/// Partitions a single record file.
///
/// # Errors
///
/// Returns an error if an output file or directory cannot be written. Unreadable or
/// empty inputs are logged and yield no blocks.
pub fn partition_file(
    path: &Path,
    dest_dir: &Path,
    request: &PartitionRequest,
    config: &AnalysisConfig,
) -> Result<Vec<Block>> {
    let record = match Record::read(path, config) {
        Ok(record) => record,
        Err(e) => {
            error!("{e}. Skipping blocks creation...");
            return Ok(Vec::new());
        }
    };
    partition_record(&record, dest_dir, request, config)
}

/// Partitions a record that is already in memory.
///
/// # Errors
///
/// Returns an error if an output file or directory cannot be written.
pub fn partition_record(
    record: &Record,
    dest_dir: &Path,
    request: &PartitionRequest,
    config: &AnalysisConfig,
) -> Result<Vec<Block>> {
    if record.is_empty() {
        warn!("File '{}' is empty. Skipping blocks creation...", record.name());
        return Ok(Vec::new());
    }
    let timing = record.timing(config.sample_size, request.end_anchored);
    debug!("Record '{}' timing: {:?}", record.name(), timing);
    let calculator = WindowCalculator::new(
        record,
        timing,
        config.time_units,
        request.measure(),
        request.end_anchored,
    );
    let first = calculator.initial(request.start, request.section);

    if !request.full_file {
        if !first.complete {
            warn!(
                "Record '{}' ends before the requested window. Keeping lines {}..{}",
                record.name(),
                first.p_init(),
                first.p_end()
            );
        }
        let path = dest_dir.join(record.stem());
        if !write_window(record.samples(), &first.range, &path)? {
            return Ok(Vec::new());
        }
        let span = calculator.real_span(&first.range);
        return Ok(vec![Block {
            number: 1,
            path,
            range: first.range,
            span,
        }]);
    }

    let writer = BlockWriter::new(dest_dir, record.stem());
    let mut blocks = Vec::new();
    for window in BlockSequencer::new(&calculator, first, request.gap, request.section) {
        let number = blocks.len() + 1;
        if let Some(path) = writer.write(record.samples(), &window.range, number)? {
            let span = calculator.real_span(&window.range);
            blocks.push(Block {
                number,
                path,
                range: window.range,
                span,
            });
        }
    }
    Ok(blocks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_single_window_is_written_under_the_record_stem() {
        let dir = tempfile::tempdir().unwrap();
        let record = Record::from_values("rec.txt", &[1.0, 2.0, 3.0, 4.0, 5.0]);
        let request = PartitionRequest::new(3.0).with_start(1.0).use_lines(true);
        let blocks =
            partition_record(&record, dir.path(), &request, &AnalysisConfig::default()).unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].path, dir.path().join("rec"));
        assert_eq!(blocks[0].range, 1..4);
        assert_eq!(fs::read_to_string(&blocks[0].path).unwrap(), "2\n3\n4\n");
    }

    #[test]
    fn test_full_file_numbers_blocks_from_one() {
        let dir = tempfile::tempdir().unwrap();
        let record = Record::from_values("rec.txt", &[1.0; 10]);
        let request = PartitionRequest::new(4.0)
            .with_gap(2.0)
            .use_lines(true)
            .full_file(true);
        let blocks =
            partition_record(&record, dir.path(), &request, &AnalysisConfig::default()).unwrap();
        let numbers: Vec<_> = blocks.iter().map(|b| b.number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4, 5]);
        assert_eq!(blocks[4].path, dir.path().join("rec_blocks").join("rec_5"));
    }

    #[test]
    fn test_fractional_line_gap_terminates() {
        let dir = tempfile::tempdir().unwrap();
        let record = Record::from_values("rec.txt", &[1.0; 10]);
        let request = PartitionRequest::new(4.0)
            .with_gap(0.5)
            .use_lines(true)
            .full_file(true);
        let blocks =
            partition_record(&record, dir.path(), &request, &AnalysisConfig::default()).unwrap();
        let ranges: Vec<_> = blocks.iter().map(|b| b.range.clone()).collect();
        assert_eq!(ranges, vec![0..4, 4..8, 8..10]);
    }

    #[test]
    fn test_huge_gap_and_section_do_not_overflow() {
        let dir = tempfile::tempdir().unwrap();
        let record = Record::from_values("rec.txt", &[1.0; 10]);
        let request = PartitionRequest::new(4.0)
            .with_gap(1e30)
            .use_lines(true)
            .full_file(true);
        let blocks =
            partition_record(&record, dir.path(), &request, &AnalysisConfig::default()).unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].range, 0..4);

        let request = PartitionRequest::new(1e30).use_lines(true).full_file(true);
        let blocks =
            partition_record(&record, dir.path(), &request, &AnalysisConfig::default()).unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].range, 0..10);

        let request = PartitionRequest::new(1e30)
            .with_start(1.0)
            .use_lines(true)
            .end_anchored(true);
        let blocks =
            partition_record(&record, dir.path(), &request, &AnalysisConfig::default()).unwrap();
        assert_eq!(blocks[0].range, 0..9);
    }

    #[test]
    fn test_empty_record_yields_no_blocks() {
        let dir = tempfile::tempdir().unwrap();
        let record = Record::from_values("rec.txt", &[]);
        let request = PartitionRequest::new(4.0).full_file(true);
        let blocks =
            partition_record(&record, dir.path(), &request, &AnalysisConfig::default()).unwrap();
        assert!(blocks.is_empty());
        assert!(!dir.path().join("rec_blocks").exists());
    }

    #[test]
    fn test_block_table_emptiness() {
        let mut table = BlockTable::default();
        let block = Block {
            number: 1,
            path: PathBuf::from("a_1"),
            range: 0..1,
            span: (0.0, 1.0),
        };
        table.insert("a".to_string(), vec![block.clone()]);
        assert!(table.is_effectively_empty());
        table.insert("b".to_string(), vec![block.clone(), block]);
        assert!(!table.is_effectively_empty());
        assert_eq!(table.spans("b"), vec![(0.0, 1.0), (0.0, 1.0)]);
        assert!(table.spans("missing").is_empty());
    }
}
