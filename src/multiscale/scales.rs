//! Materialization of scale directories.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::Result;
use log::{debug, error, info, warn};
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::config::AnalysisConfig;
use crate::multiscale::coarse::{create_scale, ScaleOptions};
use crate::record::list_records;
use crate::Error;

/// The scales `start, start + step, ...` below `stop`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScaleRange {
    pub start: usize,
    pub stop: usize,
    pub step: usize,
}

impl ScaleRange {
    /// Creates a range of scales.
    ///
    /// # Errors
    ///
    /// Returns an error if `start` or `step` is zero.
    pub fn new(start: usize, stop: usize, step: usize) -> Result<Self> {
        if start == 0 {
            return Err(Error::InvalidScaleRange("scales start at 1".to_string()).into());
        }
        if step == 0 {
            return Err(Error::InvalidScaleRange("step must be at least 1".to_string()).into());
        }
        Ok(Self { start, stop, step })
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> {
        (self.start..self.stop).step_by(self.step)
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.stop
    }
}

/// Name of the directory holding scale `scale`.
pub fn scale_dir_name(scale: usize) -> String {
    format!("Scale {scale}")
}

/// Conventional scales root of an input: `<input>_Scales`, with `_int` appended
/// for rounded scales and `_<order>` for multiplied ones.
pub fn scales_dir_name(input: &Path, options: &ScaleOptions) -> PathBuf {
    let mut name = input.as_os_str().to_os_string();
    name.push("_Scales");
    if options.round_to_int {
        name.push("_int");
    }
    if let Some(order) = options.multiply_order {
        name.push(format!("_{order}"));
    }
    PathBuf::from(name)
}

/// What a call to [`create_scales`] did.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScaleSetReport {
    pub built: Vec<usize>,
    /// Scales whose directory already existed and were left untouched.
    pub skipped: Vec<usize>,
}

/// Creates one `Scale <s>` directory under `dest_dir` for every scale of `range`
/// and fills it with the coarse-grained version of every record of `input`.
///
/// Scale directories that already exist are assumed valid and skipped, which makes
/// repeated calls with the same parameters cheap. Directories are created
/// exclusively, so two builders racing on the same scale never both fill it.
/// Records that cannot be coarse-grained are logged and left out.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, the input cannot be listed or
/// a scale directory cannot be created.
pub fn create_scales(
    input: impl AsRef<Path>,
    dest_dir: impl AsRef<Path>,
    range: ScaleRange,
    options: &ScaleOptions,
    config: &AnalysisConfig,
) -> Result<ScaleSetReport> {
    config.validate()?;
    let dest_dir = dest_dir.as_ref();
    let files = list_records(input.as_ref())?;
    fs::create_dir_all(dest_dir).map_err(|e| Error::io(dest_dir, e))?;

    let mut report = ScaleSetReport::default();
    for scale in range.iter() {
        let output_dir = dest_dir.join(scale_dir_name(scale));
        match fs::create_dir(&output_dir) {
            Ok(()) => info!("Creating Scale {scale}..."),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                warn!("Scale {scale} exists, skipping...");
                report.skipped.push(scale);
                continue;
            }
            Err(e) => return Err(Error::io(&output_dir, e).into()),
        }
        files.par_iter().for_each(|file| {
            match create_scale(file, &output_dir, scale, options, config) {
                Ok(points) => debug!(
                    "Scale {scale} of '{}' holds {points} points",
                    file.display()
                ),
                Err(e) => error!("Could not create scale {scale} of '{}': {e}", file.display()),
            }
        });
        report.built.push(scale);
    }
    Ok(report)
}
