//! Reading heart rate records from disk.
//!
//! A record file holds whitespace-delimited columns, one sample per line. The first
//! column is the time column when the record has more than one column; the value
//! column is selected by [`AnalysisConfig::value_column`]. Records that only carry
//! values have no timing information and all their timestamps read as `0`.
//!
//! Two input policies are applied explicitly:
//! - header sniffing: if the first token of the first non-blank line does not parse
//!   as a number, that line is a header and is skipped;
//! - malformed lines (too few columns, non-numeric time or value) are logged with
//!   their line number and skipped.
//!
//! The submodule [`timing`] classifies the time column of a record.

pub mod timing;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use log::warn;

use crate::config::AnalysisConfig;
use crate::Error;
pub use timing::TimingClass;

/// One line of a record.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Raw time column value, `0.0` for value-only records.
    pub time: f64,
    pub value: f64,
    /// The value token as it was found in the file.
    pub value_text: String,
}

/// An immutable, ordered sequence of samples read from one file.
#[derive(Debug, Clone)]
pub struct Record {
    name: String,
    samples: Vec<Sample>,
    timed: bool,
}

impl Record {
    /// Reads the record stored at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read. Malformed lines are not errors:
    /// they are reported through the log and left out of the record.
    pub fn read(path: impl AsRef<Path>, config: &AnalysisConfig) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let name = file_name(path);
        let (record, rejected) = Self::parse(&name, &text, config);
        for failure in rejected {
            warn!("{failure}. Skipping line...");
        }
        Ok(record)
    }

    /// Parses record text. Returns the record together with the lines that were
    /// rejected as malformed.
    pub fn parse(name: &str, text: &str, config: &AnalysisConfig) -> (Self, Vec<Error>) {
        let mut samples = Vec::new();
        let mut rejected = Vec::new();
        let mut layout: Option<bool> = None;

        let data_lines = text
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty());

        for (idx, line) in data_lines {
            let columns: Vec<&str> = line.split_whitespace().collect();
            let timed = match layout {
                Some(timed) => timed,
                None => {
                    if is_header(&columns) {
                        continue;
                    }
                    let timed = columns.len() > 1;
                    layout = Some(timed);
                    timed
                }
            };
            match parse_sample(&columns, timed, config.value_column) {
                Ok(sample) => samples.push(sample),
                Err(reason) => rejected.push(Error::MalformedLine {
                    path: PathBuf::from(name),
                    line: idx + 1,
                    reason,
                }),
            }
        }

        (
            Self {
                name: name.to_string(),
                samples,
                timed: layout.unwrap_or(false),
            },
            rejected,
        )
    }

    /// Builds a value-only record, mostly useful for in-memory processing.
    pub fn from_values(name: &str, values: &[f64]) -> Self {
        Self {
            name: name.to_string(),
            samples: values
                .iter()
                .map(|&value| Sample {
                    time: 0.0,
                    value,
                    value_text: value.to_string(),
                })
                .collect(),
            timed: false,
        }
    }

    /// File name of the record, including its extension.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// File name of the record without its extension.
    pub fn stem(&self) -> &str {
        Path::new(&self.name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&self.name)
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Whether the record has a time column.
    pub fn is_timed(&self) -> bool {
        self.timed
    }

    pub fn values(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.value).collect()
    }

    /// The first `size` samples, or the last `size` samples when `from_end` is set.
    pub fn sample_window(&self, size: usize, from_end: bool) -> &[Sample] {
        let size = size.min(self.samples.len());
        if from_end {
            &self.samples[self.samples.len() - size..]
        } else {
            &self.samples[..size]
        }
    }

    /// Classifies the record's time column from a sample of `sample_size` lines
    /// taken at its start, or at its end when `from_end` is set.
    pub fn timing(&self, sample_size: usize, from_end: bool) -> TimingClass {
        timing::sniff(self.sample_window(sample_size, from_end), self.timed, from_end)
    }
}

fn is_header(columns: &[&str]) -> bool {
    columns
        .first()
        .map(|token| token.parse::<f64>().is_err())
        .unwrap_or(false)
}

fn parse_sample(
    columns: &[&str],
    timed: bool,
    value_column: usize,
) -> std::result::Result<Sample, String> {
    let (time, value_idx) = if timed {
        if columns.len() < 2 {
            return Err(format!("expected a time and a value column, found {}", columns.len()));
        }
        let time = columns[0]
            .parse::<f64>()
            .map_err(|_| format!("time '{}' is not a number", columns[0]))?;
        (time, value_column)
    } else {
        (0.0, 0)
    };
    let token = columns
        .get(value_idx)
        .ok_or_else(|| format!("missing value column {value_idx}"))?;
    let value = token
        .parse::<f64>()
        .map_err(|_| format!("value '{token}' is not a number"))?;
    Ok(Sample {
        time,
        value,
        value_text: token.to_string(),
    })
}

/// File name of `path` as a string, empty when the path has none.
pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Lists the record files of `path`.
///
/// A directory yields its regular, non-hidden files sorted by name; any other path
/// yields itself.
///
/// # Errors
///
/// Returns an error if the directory cannot be listed.
pub fn list_records(path: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let path = path.as_ref();
    if !path.is_dir() {
        return Ok(vec![path.to_path_buf()]);
    }
    let mut files = Vec::new();
    for entry in fs::read_dir(path).map_err(|e| Error::io(path, e))? {
        let entry = entry.map_err(|e| Error::io(path, e))?;
        let hidden = entry.file_name().to_string_lossy().starts_with('.');
        if !hidden && entry.path().is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> (Record, Vec<Error>) {
        Record::parse("rec.txt", text, &AnalysisConfig::default())
    }

    #[test]
    fn test_parse_two_columns() {
        let (record, rejected) = parse("0 120\n1 121.5\n2 119\n");
        assert!(rejected.is_empty());
        assert!(record.is_timed());
        assert_eq!(record.len(), 3);
        assert_eq!(record.values(), vec![120.0, 121.5, 119.0]);
        assert_eq!(record.samples()[2].time, 2.0);
        assert_eq!(record.samples()[1].value_text, "121.5");
    }

    #[test]
    fn test_parse_value_only() {
        let (record, _) = parse("120\n121\n");
        assert!(!record.is_timed());
        assert_eq!(record.values(), vec![120.0, 121.0]);
        assert!(record.samples().iter().all(|s| s.time == 0.0));
    }

    #[test]
    fn test_header_is_skipped() {
        let (record, rejected) = parse("time hrf\n0 120\n1 121\n");
        assert!(rejected.is_empty(), "A header is not a malformed line.");
        assert_eq!(record.len(), 2);
    }

    #[test]
    fn test_only_first_line_can_be_a_header() {
        let (record, rejected) = parse("0 120\nfoo bar\n1 121\n");
        assert_eq!(record.len(), 2);
        assert_eq!(rejected.len(), 1);
        match &rejected[0] {
            Error::MalformedLine { line, .. } => assert_eq!(*line, 2),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_blank_lines_are_ignored() {
        let (record, rejected) = parse("\n0 120\n\n   \n1 121\n");
        assert!(rejected.is_empty());
        assert_eq!(record.len(), 2);
    }

    #[test]
    fn test_short_line_is_malformed() {
        let (record, rejected) = parse("0 120\n121\n2 122\n");
        assert_eq!(record.len(), 2);
        assert_eq!(rejected.len(), 1);
    }

    #[test]
    fn test_configured_value_column() {
        let config = AnalysisConfig::default().with_value_column(2);
        let (record, rejected) = Record::parse("rec", "0 1 120\n1 1 121\n", &config);
        assert!(rejected.is_empty());
        assert_eq!(record.values(), vec![120.0, 121.0]);
    }

    #[test]
    fn test_sample_window() {
        let record = Record::from_values("r", &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(record.sample_window(2, false)[0].value, 1.0);
        assert_eq!(record.sample_window(2, true)[0].value, 3.0);
        assert_eq!(record.sample_window(10, true).len(), 4);
    }

    #[test]
    fn test_stem() {
        let record = Record::from_values("patient.1.txt", &[1.0]);
        assert_eq!(record.stem(), "patient.1");
    }

    #[test]
    fn test_list_records_skips_hidden_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.txt"), "1\n").unwrap();
        fs::write(dir.path().join("a.txt"), "1\n").unwrap();
        fs::write(dir.path().join(".hidden"), "1\n").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        let files = list_records(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.txt", "b.txt"]);
    }
}
