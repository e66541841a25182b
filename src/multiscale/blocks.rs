//! Metric tables over the blocks of partitioned records.
//!
//! Every block file of a [`BlockTable`] is measured on its own. A block whose
//! metric fails is logged and left out of its record's rows; the other blocks of
//! the record are still measured.

use std::collections::BTreeMap;

use log::{error, info};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::config::AnalysisConfig;
use crate::multiscale::metrics::{
    file_std, CompressionBackend, CompressionRequest, EntropyBackend, EntropyRequest,
};
use crate::multiscale::table::{measure_file, CompressionMetric, EntropyMetric, ScaleMetric};
use crate::partition::BlockTable;
use crate::record::file_name;

/// Metric values of one block.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct BlockMetricRow {
    pub number: usize,
    /// Real time span of the block, as reported by the partition.
    pub span: (f64, f64),
    pub values: Vec<f64>,
}

/// Metric values of every block of every record, keyed by record file name.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockMetricTable {
    fields: Vec<String>,
    rows: BTreeMap<String, Vec<BlockMetricRow>>,
}

impl BlockMetricTable {
    pub fn new(fields: Vec<String>) -> Self {
        Self {
            fields,
            rows: BTreeMap::new(),
        }
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Column names of a row: `Block` followed by the metric fields.
    pub fn header(&self) -> Vec<String> {
        std::iter::once("Block".to_string())
            .chain(self.fields.iter().cloned())
            .collect()
    }

    pub fn rows(&self, name: &str) -> Option<&[BlockMetricRow]> {
        self.rows.get(name).map(|rows| rows.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<BlockMetricRow>)> {
        self.rows.iter()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Measures every block of `blocks` with `metric`.
///
/// The metric sees the block file name (`<stem>_<n>`) as the record name.
pub fn block_metrics(blocks: &BlockTable, metric: &dyn ScaleMetric) -> BlockMetricTable {
    let fields = metric.field_names();
    let mut table = BlockMetricTable::new(fields.clone());
    for (name, record_blocks) in blocks.iter() {
        let mut rows = Vec::with_capacity(record_blocks.len());
        for block in record_blocks {
            let block_name = file_name(&block.path);
            match measure_file(metric, &block_name, &block.path, fields.len()) {
                Ok(values) => rows.push(BlockMetricRow {
                    number: block.number,
                    span: block.span,
                    values,
                }),
                Err(e) => error!("{e}. Ignoring block {} of '{name}'...", block.number),
            }
        }
        table.rows.insert(name.clone(), rows);
    }
    table
}

/// Compresses every block of `blocks`.
pub fn block_compression(
    blocks: &BlockTable,
    backend: &dyn CompressionBackend,
    request: &CompressionRequest,
) -> BlockMetricTable {
    block_metrics(blocks, &CompressionMetric::new(backend, request))
}

/// Computes the entropy of every block of `blocks`.
///
/// When `use_std_tolerance` is set, the tolerance of `request` is multiplied by the
/// standard deviation of each block file. A block whose standard deviation cannot
/// be computed is left out.
pub fn block_entropy(
    blocks: &BlockTable,
    backend: &dyn EntropyBackend,
    request: &EntropyRequest,
    use_std_tolerance: bool,
    config: &AnalysisConfig,
) -> BlockMetricTable {
    let mut metric = EntropyMetric::new(backend, request);
    if use_std_tolerance {
        let mut stds = BTreeMap::new();
        for (name, record_blocks) in blocks.iter() {
            info!("Computing block tolerances of '{name}'");
            for block in record_blocks {
                match file_std(&block.path, config) {
                    Ok(std) => {
                        stds.insert(file_name(&block.path), std);
                    }
                    Err(e) => error!("{e}. Cannot derive the tolerance of block {}", block.number),
                }
            }
        }
        metric = metric.with_stds(stds);
    }
    block_metrics(blocks, &metric)
}
