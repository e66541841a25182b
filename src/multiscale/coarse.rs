//! Coarse-graining of a series at one scale.
//!
//! At scale `s` the series is cut into consecutive, non-overlapping runs of `s`
//! values and every run is replaced by its mean. A trailing run shorter than `s` is
//! dropped, never padded, so the result always holds `N / s` points.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{anyhow, Result};
use nalgebra::DVectorView;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::config::AnalysisConfig;
use crate::record::Record;
use crate::Error;

/// Value of the multiply order that disables multiplication.
pub const MULTIPLY_DISABLED: i64 = -1;

/// How coarse-grained points are post-processed and printed.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScaleOptions {
    /// Factor applied to every point after averaging.
    pub multiply_order: Option<i64>,
    /// Round every point to the nearest integer (ties to even) and print it as one.
    pub round_to_int: bool,
}

impl ScaleOptions {
    pub fn new(multiply_order: Option<i64>, round_to_int: bool) -> Self {
        Self {
            multiply_order,
            round_to_int,
        }
    }

    /// Builds the options from a multiply order where [`MULTIPLY_DISABLED`] means none.
    pub fn from_sentinel(multiply_order: i64, round_to_int: bool) -> Self {
        let multiply_order = (multiply_order != MULTIPLY_DISABLED).then_some(multiply_order);
        Self::new(multiply_order, round_to_int)
    }

    fn apply(&self, mean: f64) -> f64 {
        let scaled = match self.multiply_order {
            Some(order) => mean * order as f64,
            None => mean,
        };
        if self.round_to_int {
            scaled.round_ties_even()
        } else {
            scaled
        }
    }

    /// Text of a point as it is written to a scale file.
    pub fn format(&self, point: f64) -> String {
        if self.round_to_int {
            format!("{}", point as i64)
        } else {
            format!("{point:.3}")
        }
    }
}

/// Coarse-grains `values` at `scale`.
///
/// # Errors
///
/// Returns an error if `scale` is zero.
///
/// # Example
///
/// ```
/// use hrv_multiscale::multiscale::coarse::{coarse_grain, ScaleOptions};
///
/// let data = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
/// let scaled = coarse_grain(&data, 4, &ScaleOptions::default()).unwrap();
/// // the last two values do not fill a run of 4 and are dropped
/// assert_eq!(scaled, vec![2.5]);
/// ```
pub fn coarse_grain(values: &[f64], scale: usize, options: &ScaleOptions) -> Result<Vec<f64>> {
    if scale == 0 {
        return Err(anyhow!("Scale must be at least 1"));
    }
    Ok(values
        .chunks_exact(scale)
        .map(|run| options.apply(DVectorView::from(run).mean()))
        .collect())
}

/// Coarse-grains the record at `input` and writes it to `output_dir` under the
/// same file name. Returns the number of points written.
///
/// # Errors
///
/// Returns an error if the record cannot be read or the scale file cannot be written.
pub fn create_scale(
    input: &Path,
    output_dir: &Path,
    scale: usize,
    options: &ScaleOptions,
    config: &AnalysisConfig,
) -> Result<usize> {
    let record = Record::read(input, config)?;
    let points = coarse_grain(&record.values(), scale, options)?;
    let path = output_dir.join(record.name());
    let file = File::create(&path).map_err(|e| Error::io(&path, e))?;
    let mut out = BufWriter::new(file);
    for point in &points {
        writeln!(out, "{}", options.format(*point)).map_err(|e| Error::io(&path, e))?;
    }
    out.flush().map_err(|e| Error::io(&path, e))?;
    Ok(points.len())
}
