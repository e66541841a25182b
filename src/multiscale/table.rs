//! Per-file tables of metric values across scales.
//!
//! A [`ScaleTable`] row holds, for one record, the fields of a [`ScaleMetric`] for
//! every scale in increasing order. Building a table is best effort: when a metric
//! fails for one scale, the failure is logged and the remaining scales of that record
//! are abandoned, leaving a truncated row that [`ScaleTable::is_complete`] reports.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use log::{debug, error};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::config::AnalysisConfig;
use crate::multiscale::metrics::{
    file_std, CompressionBackend, CompressionRequest, EntropyBackend, EntropyRequest,
};
use crate::multiscale::scales::{scale_dir_name, ScaleRange};
use crate::record::{file_name, list_records};
use crate::Error;

/// A metric that yields a fixed list of fields for one scale file.
#[cfg_attr(test, mockall::automock)]
pub trait ScaleMetric {
    /// Names of the fields produced by [`ScaleMetric::measure`], in order.
    fn field_names(&self) -> Vec<String>;

    /// Measures the scale file at `path`, which belongs to the record `record_name`.
    fn measure(&self, record_name: &str, path: &Path) -> Result<Vec<f64>>;
}

/// Compression figures of a scale file: sizes, then the optional ratio and
/// decompression time.
pub struct CompressionMetric<'a> {
    backend: &'a dyn CompressionBackend,
    request: &'a CompressionRequest,
}

impl<'a> CompressionMetric<'a> {
    pub fn new(backend: &'a dyn CompressionBackend, request: &'a CompressionRequest) -> Self {
        Self { backend, request }
    }
}

impl ScaleMetric for CompressionMetric<'_> {
    fn field_names(&self) -> Vec<String> {
        let mut fields = vec!["Original".to_string(), "Compressed".to_string()];
        if self.request.want_ratio {
            fields.push("CRx100".to_string());
        }
        if self.request.want_decompress_time {
            fields.push("Decompression".to_string());
        }
        fields
    }

    fn measure(&self, _record_name: &str, path: &Path) -> Result<Vec<f64>> {
        let data = self.backend.compress(path, self.request)?;
        let mut values = vec![data.original as f64, data.compressed as f64];
        if self.request.want_ratio {
            let ratio = data
                .ratio
                .ok_or_else(|| anyhow!("{} reported no compression ratio", self.request.compressor))?;
            values.push(ratio);
        }
        if self.request.want_decompress_time {
            let time = data
                .time
                .ok_or_else(|| anyhow!("{} reported no decompression time", self.request.compressor))?;
            values.push(time);
        }
        Ok(values)
    }
}

/// Entropy of a scale file, optionally with a tolerance scaled per record.
pub struct EntropyMetric<'a> {
    backend: &'a dyn EntropyBackend,
    request: &'a EntropyRequest,
    /// Per-record standard deviation the tolerance is multiplied by.
    stds: Option<BTreeMap<String, f64>>,
}

impl<'a> EntropyMetric<'a> {
    /// Uses the tolerance of `request` as given for every record.
    pub fn new(backend: &'a dyn EntropyBackend, request: &'a EntropyRequest) -> Self {
        Self {
            backend,
            request,
            stds: None,
        }
    }

    /// Multiplies the tolerance of `request` by the standard deviation of each record.
    pub fn with_stds(mut self, stds: BTreeMap<String, f64>) -> Self {
        self.stds = Some(stds);
        self
    }

    fn tolerance(&self, record_name: &str) -> Result<f64> {
        match &self.stds {
            None => Ok(self.request.tolerance),
            Some(stds) => stds
                .get(record_name)
                .map(|std| std * self.request.tolerance)
                .ok_or_else(|| anyhow!("No standard deviation known for '{record_name}'")),
        }
    }
}

impl ScaleMetric for EntropyMetric<'_> {
    fn field_names(&self) -> Vec<String> {
        vec!["Entropy".to_string()]
    }

    fn measure(&self, record_name: &str, path: &Path) -> Result<Vec<f64>> {
        let request = self.request.with_tolerance(self.tolerance(record_name)?);
        let data = self.backend.entropy(path, &request)?;
        debug!(
            "{} of '{}' over {} points: {}",
            request.algorithm,
            path.display(),
            data.points,
            data.value
        );
        Ok(vec![data.value])
    }
}

/// Metric values of every record across scales.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScaleTable {
    scales: Vec<usize>,
    fields: Vec<String>,
    rows: BTreeMap<String, Vec<f64>>,
}

impl ScaleTable {
    pub fn new(scales: Vec<usize>, fields: Vec<String>) -> Self {
        Self {
            scales,
            fields,
            rows: BTreeMap::new(),
        }
    }

    pub fn scales(&self) -> &[usize] {
        &self.scales
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Column names of a full row: `Scale_<s>_<field>` for every scale and field.
    pub fn header(&self) -> Vec<String> {
        self.scales
            .iter()
            .flat_map(|s| self.fields.iter().map(move |f| format!("Scale_{s}_{f}")))
            .collect()
    }

    pub fn row(&self, name: &str) -> Option<&[f64]> {
        self.rows.get(name).map(|row| row.as_slice())
    }

    pub fn rows(&self) -> impl Iterator<Item = (&String, &Vec<f64>)> {
        self.rows.iter()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Whether the row of `name` holds the fields of every scale.
    pub fn is_complete(&self, name: &str) -> bool {
        self.row(name)
            .map(|row| row.len() == self.scales.len() * self.fields.len())
            .unwrap_or(false)
    }

    fn insert(&mut self, name: String, row: Vec<f64>) {
        self.rows.insert(name, row);
    }
}

/// Path of the scale file of `name` at `scale`.
pub fn scale_file(scales_dir: &Path, scale: usize, name: &str) -> PathBuf {
    scales_dir.join(scale_dir_name(scale)).join(name)
}

/// Measures every record of `input` at every scale of `range` with `metric`.
///
/// # Errors
///
/// Returns an error if the input cannot be listed. Failures on single scale files
/// are logged and truncate the row of their record.
pub fn build_scale_table(
    input: &Path,
    scales_dir: &Path,
    range: ScaleRange,
    metric: &dyn ScaleMetric,
) -> Result<ScaleTable> {
    let fields = metric.field_names();
    let mut table = ScaleTable::new(range.iter().collect(), fields.clone());
    for path in list_records(input)? {
        let name = file_name(&path);
        let mut row = Vec::with_capacity(table.scales.len() * fields.len());
        for scale in range.iter() {
            match measure_file(metric, &name, &scale_file(scales_dir, scale, &name), fields.len()) {
                Ok(values) => row.extend(values),
                Err(e) => {
                    error!("{e}. Ignoring remaining scales of '{name}'...");
                    break;
                }
            }
        }
        table.insert(name, row);
    }
    Ok(table)
}

/// Runs `metric` on `path` and checks that it returned `expected` values.
pub(crate) fn measure_file(
    metric: &dyn ScaleMetric,
    name: &str,
    path: &Path,
    expected: usize,
) -> Result<Vec<f64>> {
    if !path.is_file() {
        return Err(Error::MissingScaleFile(path.to_path_buf()).into());
    }
    let values = metric.measure(name, path)?;
    if values.len() != expected {
        return Err(anyhow!(
            "Metric returned {} values for '{}', expected {}",
            values.len(),
            path.display(),
            expected
        ));
    }
    Ok(values)
}

/// Compresses every record of `input` at every scale of `range`.
///
/// # Errors
///
/// Returns an error if the input cannot be listed.
pub fn multiscale_compression(
    input: impl AsRef<Path>,
    scales_dir: impl AsRef<Path>,
    range: ScaleRange,
    backend: &dyn CompressionBackend,
    request: &CompressionRequest,
) -> Result<ScaleTable> {
    let metric = CompressionMetric::new(backend, request);
    build_scale_table(input.as_ref(), scales_dir.as_ref(), range, &metric)
}

/// Computes the entropy of every record of `input` at every scale of `range`.
///
/// When `use_std_tolerance` is set, the tolerance of `request` is multiplied by the
/// standard deviation of each record at the first scale of `range`. A record whose
/// standard deviation cannot be computed gets an empty row.
///
/// # Errors
///
/// Returns an error if the input cannot be listed.
pub fn multiscale_entropy(
    input: impl AsRef<Path>,
    scales_dir: impl AsRef<Path>,
    range: ScaleRange,
    backend: &dyn EntropyBackend,
    request: &EntropyRequest,
    use_std_tolerance: bool,
    config: &AnalysisConfig,
) -> Result<ScaleTable> {
    let input = input.as_ref();
    let scales_dir = scales_dir.as_ref();
    let mut metric = EntropyMetric::new(backend, request);
    if use_std_tolerance {
        let mut stds = BTreeMap::new();
        for path in list_records(input)? {
            let name = file_name(&path);
            match file_std(&scale_file(scales_dir, range.start, &name), config) {
                Ok(std) => {
                    stds.insert(name, std);
                }
                Err(e) => error!("{e}. Cannot derive the tolerance of '{name}'"),
            }
        }
        metric = metric.with_stds(stds);
    }
    build_scale_table(input, scales_dir, range, &metric)
}
