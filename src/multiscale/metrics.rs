//! Metrics computed on every scale of a record.
//!
//! Compression and entropy are computed by external collaborators behind the
//! [`CompressionBackend`] and [`EntropyBackend`] traits; this module only defines
//! what they are asked for and what they return, plus the standard deviation
//! helper used to derive entropy tolerances.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use log::info;
use nalgebra::DVectorView;
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::config::AnalysisConfig;
use crate::record::{file_name, list_records, Record};
use crate::Error;

/// Compressors a [`CompressionBackend`] may be asked to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Compressor {
    Gzip,
    Bzip2,
    Brotli,
    Lzma,
    Paq8l,
    Ppmd,
    Spbio,
}

impl Compressor {
    pub const ALL: [Compressor; 7] = [
        Compressor::Gzip,
        Compressor::Bzip2,
        Compressor::Brotli,
        Compressor::Lzma,
        Compressor::Paq8l,
        Compressor::Ppmd,
        Compressor::Spbio,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Compressor::Gzip => "gzip",
            Compressor::Bzip2 => "bzip2",
            Compressor::Brotli => "brotli",
            Compressor::Lzma => "lzma",
            Compressor::Paq8l => "paq8l",
            Compressor::Ppmd => "ppmd",
            Compressor::Spbio => "spbio",
        }
    }

    /// Lowest and highest compression level accepted by the compressor.
    /// `spbio` has no levels and reports `(-1, -1)`.
    pub fn level_range(&self) -> (i32, i32) {
        match self {
            Compressor::Gzip | Compressor::Bzip2 => (1, 9),
            Compressor::Brotli => (1, 11),
            Compressor::Lzma => (6, 6),
            Compressor::Paq8l => (1, 8),
            Compressor::Ppmd => (2, 16),
            Compressor::Spbio => (-1, -1),
        }
    }

    /// Brings `level` into the accepted range of the compressor.
    pub fn clamp_level(&self, level: i32) -> i32 {
        let (min, max) = self.level_range();
        level.clamp(min, max)
    }
}

impl fmt::Display for Compressor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Compressor {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        Compressor::ALL
            .into_iter()
            .find(|c| c.name() == name)
            .ok_or_else(|| Error::UnknownCompressor(s.to_string()))
    }
}

/// Entropy algorithms an [`EntropyBackend`] may be asked to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum EntropyAlgorithm {
    /// Sample entropy.
    SampEn,
    /// Approximate entropy.
    ApEn,
    /// Approximate entropy, second formulation.
    ApEnV2,
}

impl EntropyAlgorithm {
    pub fn name(&self) -> &'static str {
        match self {
            EntropyAlgorithm::SampEn => "sampen",
            EntropyAlgorithm::ApEn => "apen",
            EntropyAlgorithm::ApEnV2 => "apenv2",
        }
    }
}

impl fmt::Display for EntropyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EntropyAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sampen" => Ok(EntropyAlgorithm::SampEn),
            "apen" => Ok(EntropyAlgorithm::ApEn),
            "apenv2" => Ok(EntropyAlgorithm::ApEnV2),
            _ => Err(Error::UnknownEntropyAlgorithm(s.to_string())),
        }
    }
}

/// What a [`CompressionBackend`] is asked to compute for one file.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CompressionRequest {
    pub compressor: Compressor,
    pub level: i32,
    /// Also measure the time needed to decompress the file.
    pub want_decompress_time: bool,
    /// Also report the compression ratio, times 100.
    pub want_ratio: bool,
    pub round_digits: Option<u32>,
}

impl CompressionRequest {
    /// Builds a request, bringing `level` into the compressor's range.
    pub fn new(compressor: Compressor, level: i32) -> Self {
        Self {
            compressor,
            level: compressor.clamp_level(level),
            want_decompress_time: false,
            want_ratio: false,
            round_digits: None,
        }
    }

    pub fn with_decompress_time(mut self, want: bool) -> Self {
        self.want_decompress_time = want;
        self
    }

    pub fn with_ratio(mut self, want: bool) -> Self {
        self.want_ratio = want;
        self
    }

    pub fn with_round_digits(mut self, digits: Option<u32>) -> Self {
        self.round_digits = digits;
        self
    }
}

/// Result of compressing one file.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CompressionData {
    /// Size of the file in bytes.
    pub original: u64,
    /// Size of the compressed file in bytes.
    pub compressed: u64,
    pub ratio: Option<f64>,
    /// Decompression time in seconds.
    pub time: Option<f64>,
}

/// What an [`EntropyBackend`] is asked to compute for one file.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EntropyRequest {
    pub algorithm: EntropyAlgorithm,
    /// Embedding dimension.
    pub dimension: usize,
    pub tolerance: f64,
    pub round_digits: Option<u32>,
}

impl EntropyRequest {
    pub fn new(algorithm: EntropyAlgorithm, dimension: usize, tolerance: f64) -> Self {
        Self {
            algorithm,
            dimension,
            tolerance,
            round_digits: None,
        }
    }

    pub fn with_tolerance(&self, tolerance: f64) -> Self {
        Self {
            tolerance,
            ..self.clone()
        }
    }

    pub fn with_round_digits(mut self, digits: Option<u32>) -> Self {
        self.round_digits = digits;
        self
    }
}

/// Result of an entropy computation on one file.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EntropyData {
    /// Number of points the entropy was computed on.
    pub points: usize,
    pub value: f64,
}

/// Computes compression figures for a file.
#[cfg_attr(test, mockall::automock)]
pub trait CompressionBackend {
    /// Compresses the file at `file` as described by `request`.
    fn compress(&self, file: &Path, request: &CompressionRequest) -> Result<CompressionData>;
}

/// Computes the entropy of a file.
#[cfg_attr(test, mockall::automock)]
pub trait EntropyBackend {
    /// Computes the entropy of the series stored at `file` as described by `request`.
    fn entropy(&self, file: &Path, request: &EntropyRequest) -> Result<EntropyData>;
}

/// Population standard deviation of the values of the record at `path`.
///
/// # Errors
///
/// Returns an error if the record cannot be read or holds no values.
pub fn file_std(path: &Path, config: &AnalysisConfig) -> Result<f64> {
    let record = Record::read(path, config)?;
    if record.is_empty() {
        return Err(anyhow!(
            "Cannot compute the standard deviation of empty file '{}'",
            path.display()
        ));
    }
    info!("Computing std for file '{}'", path.display());
    let values = record.values();
    Ok(DVectorView::from(values.as_slice()).variance().sqrt())
}

/// Population standard deviation of every record of a file or directory, keyed by
/// file name.
///
/// # Errors
///
/// Returns an error if the input cannot be listed or any record fails in
/// [`file_std`].
pub fn calculate_std(
    input: impl AsRef<Path>,
    config: &AnalysisConfig,
) -> Result<BTreeMap<String, f64>> {
    let files = list_records(input.as_ref())?;
    files
        .par_iter()
        .map(|path| {
            let name = file_name(path);
            file_std(path, config).map(|std| (name, std))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_compressor_from_str() {
        assert_eq!("gzip".parse::<Compressor>().unwrap(), Compressor::Gzip);
        assert_eq!("PAQ8L".parse::<Compressor>().unwrap(), Compressor::Paq8l);
        for compressor in Compressor::ALL {
            assert_eq!(compressor.name().parse::<Compressor>().unwrap(), compressor);
        }
        let err = "zip".parse::<Compressor>().unwrap_err();
        assert!(matches!(err, Error::UnknownCompressor(ref name) if name == "zip"));
    }

    #[test]
    fn test_clamp_level() {
        assert_eq!(Compressor::Gzip.clamp_level(0), 1);
        assert_eq!(Compressor::Gzip.clamp_level(12), 9);
        assert_eq!(Compressor::Brotli.clamp_level(11), 11);
        assert_eq!(Compressor::Lzma.clamp_level(1), 6);
        assert_eq!(Compressor::Ppmd.clamp_level(1), 2);
        assert_eq!(Compressor::Spbio.clamp_level(5), -1);
        assert_eq!(CompressionRequest::new(Compressor::Paq8l, 20).level, 8);
    }

    #[test]
    fn test_entropy_algorithm_from_str() {
        assert_eq!(
            "sampen".parse::<EntropyAlgorithm>().unwrap(),
            EntropyAlgorithm::SampEn
        );
        assert_eq!(
            "ApEnV2".parse::<EntropyAlgorithm>().unwrap(),
            EntropyAlgorithm::ApEnV2
        );
        assert!(matches!(
            "fuzzyen".parse::<EntropyAlgorithm>(),
            Err(Error::UnknownEntropyAlgorithm(_))
        ));
        assert_eq!(EntropyAlgorithm::ApEn.to_string(), "apen");
    }

    #[test]
    fn test_file_std_is_population_std() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rec.txt");
        fs::write(&path, "2\n4\n4\n4\n5\n5\n7\n9\n").unwrap();
        let std = file_std(&path, &AnalysisConfig::default()).unwrap();
        assert!((std - 2.0).abs() < 1e-12, "Expected a population std of 2.");
    }

    #[test]
    fn test_file_std_of_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.txt");
        fs::write(&path, "").unwrap();
        assert!(file_std(&path, &AnalysisConfig::default()).is_err());
    }

    #[test]
    fn test_calculate_std_for_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "1\n1\n1\n").unwrap();
        fs::write(dir.path().join("b.txt"), "0\n2\n").unwrap();
        let stds = calculate_std(dir.path(), &AnalysisConfig::default()).unwrap();
        assert_eq!(stds.len(), 2);
        assert_eq!(stds["a.txt"], 0.0);
        assert!((stds["b.txt"] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_calculate_std_for_file_is_keyed_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rec.txt");
        fs::write(&path, "0\n2\n").unwrap();
        let stds = calculate_std(&path, &AnalysisConfig::default()).unwrap();
        assert_eq!(stds.keys().collect::<Vec<_>>(), vec!["rec.txt"]);
    }
}
