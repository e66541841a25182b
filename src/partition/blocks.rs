//! Tiling a record into blocks and writing them to disk.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::ops::Range;
use std::path::{Path, PathBuf};

use anyhow::Result;
use log::{debug, info, warn};

use crate::partition::window::{Window, WindowCalculator};
use crate::record::Sample;
use crate::Error;

/// Iterates over the windows that tile a record.
///
/// Complete windows are yielded while they fit inside the record. The first window
/// that runs past the record is yielded as the trailing block, clamped to the
/// record bounds, and ends the iteration. A degenerate window also ends it.
pub struct BlockSequencer<'a> {
    calculator: &'a WindowCalculator<'a>,
    gap: f64,
    section: f64,
    pending: Option<Window>,
}

impl<'a> BlockSequencer<'a> {
    /// Starts tiling at `first`. A `gap` too small to move the window means blocks
    /// do not overlap, i.e. the gap equals the section.
    pub fn new(calculator: &'a WindowCalculator<'a>, first: Window, gap: f64, section: f64) -> Self {
        let gap = calculator.effective_gap(gap, section);
        Self {
            calculator,
            gap,
            section,
            pending: Some(first),
        }
    }
}

impl Iterator for BlockSequencer<'_> {
    type Item = Window;

    fn next(&mut self) -> Option<Window> {
        let current = self.pending.take()?;
        // without a positive gap the next window would never move
        if current.complete && !current.is_degenerate() && self.gap > 0.0 {
            let next = self.calculator.next(&current, self.gap, self.section);
            if !next.complete {
                warn!(
                    "Block after lines {}..{} runs past the end of the record. Ignoring further partitions.",
                    current.p_init(),
                    current.p_end()
                );
            }
            self.pending = Some(next);
        }
        Some(current)
    }
}

/// Writes the numbered blocks of one record into `<dest>/<stem>_blocks/`.
pub struct BlockWriter {
    dir: PathBuf,
    stem: String,
}

impl BlockWriter {
    pub fn new(dest_dir: impl AsRef<Path>, stem: &str) -> Self {
        Self {
            dir: dest_dir.as_ref().join(format!("{stem}_blocks")),
            stem: stem.to_string(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn block_path(&self, number: usize) -> PathBuf {
        self.dir.join(format!("{}_{}", self.stem, number))
    }

    /// Writes block `number`. Returns the path of the written file, or `None` when
    /// the range is degenerate and nothing was written.
    ///
    /// # Errors
    ///
    /// Returns an error if the block directory or the block file cannot be written.
    pub fn write(
        &self,
        samples: &[Sample],
        range: &Range<usize>,
        number: usize,
    ) -> Result<Option<PathBuf>> {
        if range.start >= range.end {
            warn!(
                "Initial index {} is not below final index {}. Will not write block {}",
                range.start, range.end, number
            );
            return Ok(None);
        }
        if !self.dir.is_dir() {
            info!("Creating {}...", self.dir.display());
            fs::create_dir_all(&self.dir).map_err(|e| Error::io(&self.dir, e))?;
        }
        let path = self.block_path(number);
        write_values(samples, range, &path)?;
        debug!("Writing partition {}_{} to file {}", self.stem, number, path.display());
        Ok(Some(path))
    }
}

/// Writes the value column of `samples[range]` to `path`, one value per line.
///
/// Degenerate ranges are reported with a warning and produce no file; the return
/// value tells whether the file was written.
pub fn write_window(samples: &[Sample], range: &Range<usize>, path: &Path) -> Result<bool> {
    if range.start >= range.end {
        warn!(
            "Initial index {} is not below final index {}. Will not write {}",
            range.start,
            range.end,
            path.display()
        );
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    write_values(samples, range, path)?;
    Ok(true)
}

fn write_values(samples: &[Sample], range: &Range<usize>, path: &Path) -> Result<()> {
    let file = File::create(path).map_err(|e| Error::io(path, e))?;
    let mut out = BufWriter::new(file);
    for sample in &samples[range.clone()] {
        writeln!(out, "{}", sample.value_text).map_err(|e| Error::io(path, e))?;
    }
    out.flush().map_err(|e| Error::io(path, e))?;
    Ok(())
}
