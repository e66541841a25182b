//! Window index arithmetic.
//!
//! A window is the half-open line interval `[p_init, p_end)` of a record. Windows
//! are measured either in lines or in seconds, and either from the start of the
//! record or anchored at its end.
//!
//! Time windows are found by walking the record one line at a time and accumulating
//! elapsed time according to the record's [`TimingClass`]:
//! - cumulative records: the elapsed time at line `k` is `|t_k - reference|`;
//! - periodic records: every line advanced adds one modal interval.
//!
//! Because periodic records advance by the modal interval, a window asked for as
//! 60 seconds holds 60 seconds worth of acquired signal. The real time it covers is
//! reported separately by [`WindowCalculator::real_span`], which replays the actual
//! time column and therefore includes any signal loss.

use std::ops::Range;

use crate::config::TimeUnits;
use crate::record::{Record, Sample, TimingClass};

/// What the start, section and gap of a partition request are measured in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Measure {
    Lines,
    Seconds,
}

/// A line interval of a record.
///
/// `complete` is false when the record ended before the requested extent was
/// reached; the range is then clamped to the record bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    pub range: Range<usize>,
    pub complete: bool,
}

impl Window {
    fn complete(range: Range<usize>) -> Self {
        Self {
            range,
            complete: true,
        }
    }

    fn truncated(range: Range<usize>) -> Self {
        Self {
            range,
            complete: false,
        }
    }

    pub fn p_init(&self) -> usize {
        self.range.start
    }

    pub fn p_end(&self) -> usize {
        self.range.end
    }

    /// A window that selects no line at all.
    pub fn is_degenerate(&self) -> bool {
        self.range.start >= self.range.end
    }
}

/// Computes windows over one record.
pub struct WindowCalculator<'a> {
    samples: &'a [Sample],
    timing: TimingClass,
    units: TimeUnits,
    measure: Measure,
    end_anchored: bool,
}

impl<'a> WindowCalculator<'a> {
    pub fn new(
        record: &'a Record,
        timing: TimingClass,
        units: TimeUnits,
        measure: Measure,
        end_anchored: bool,
    ) -> Self {
        Self {
            samples: record.samples(),
            timing,
            units,
            measure,
            end_anchored,
        }
    }

    pub fn timing(&self) -> TimingClass {
        self.timing
    }

    pub fn measure(&self) -> Measure {
        self.measure
    }

    pub fn is_end_anchored(&self) -> bool {
        self.end_anchored
    }

    /// The first window: `section` long, starting `start` after the beginning of the
    /// record (or ending `start` before its end when end-anchored).
    pub fn initial(&self, start: f64, section: f64) -> Window {
        let n = self.samples.len();
        if n == 0 {
            return Window::truncated(0..0);
        }
        match (self.measure, self.end_anchored) {
            (Measure::Lines, false) => {
                let (start, section) = (to_lines(start), to_lines(section));
                forward_lines(start, start.saturating_add(section), n)
            }
            (Measure::Lines, true) => {
                let (start, section) = (to_lines(start), to_lines(section));
                match start.checked_add(section).and_then(|len| n.checked_sub(len)) {
                    Some(p_init) => Window::complete(p_init..n - start),
                    None => Window::truncated(0..n.saturating_sub(start)),
                }
            }
            (Measure::Seconds, false) => {
                self.walk_forward(0, self.timing.stamp(), start, section)
            }
            (Measure::Seconds, true) => {
                self.walk_backward(n - 1, self.timing.stamp(), start, section)
            }
        }
    }

    /// The window following `previous`, whose start lies `gap` further into the
    /// record (further towards its beginning when end-anchored).
    pub fn next(&self, previous: &Window, gap: f64, section: f64) -> Window {
        let n = self.samples.len();
        let Range { start, end } = previous.range.clone();
        match (self.measure, self.end_anchored) {
            (Measure::Lines, false) => {
                let gap = to_lines(gap);
                forward_lines(start.saturating_add(gap), end.saturating_add(gap), n)
            }
            (Measure::Lines, true) => {
                let gap = to_lines(gap);
                match start.checked_sub(gap) {
                    Some(p_init) => Window::complete(p_init..end - gap),
                    None => Window::truncated(0..end.saturating_sub(gap)),
                }
            }
            (Measure::Seconds, false) => {
                if start >= n {
                    return Window::truncated(n..n);
                }
                self.walk_forward(start, self.samples[start].time, gap, section)
            }
            (Measure::Seconds, true) => {
                if end == 0 || end > n {
                    return Window::truncated(0..0);
                }
                let anchor = end - 1;
                self.walk_backward(anchor, self.samples[anchor].time, gap, section)
            }
        }
    }

    /// Distance between the starts of consecutive blocks for a requested `gap`.
    ///
    /// In line mode the gap is the whole number of lines it holds. A gap that does
    /// not move the window forward falls back to `section`; the result is zero only
    /// when neither can move it.
    pub fn effective_gap(&self, gap: f64, section: f64) -> f64 {
        match self.measure {
            Measure::Lines => match to_lines(gap) {
                0 => to_lines(section) as f64,
                lines => lines as f64,
            },
            Measure::Seconds => {
                if gap > 0.0 {
                    gap
                } else if section > 0.0 {
                    section
                } else {
                    0.0
                }
            }
        }
    }

    /// Real time at the start and at the end of `range`, in seconds.
    ///
    /// Replays the time column over `[0, p_init]` and then over `[p_init, p_end)`:
    /// cumulative records report the timestamp of the sample, periodic records the
    /// running sum of the intervals.
    pub fn real_span(&self, range: &Range<usize>) -> (f64, f64) {
        let n = self.samples.len();
        if n == 0 {
            return (0.0, 0.0);
        }
        let first = range.start.min(n - 1);
        let last = range.end.clamp(first + 1, n);
        let r_start = self.replay(0..first + 1, 0.0);
        let r_end = self.replay(first..last, r_start);
        (r_start, r_end)
    }

    fn replay(&self, range: Range<usize>, base: f64) -> f64 {
        self.samples[range].iter().fold(base, |real, sample| match self.timing {
            TimingClass::Cumulative(_) => sample.time / self.units.cumulative_ticks_per_second,
            TimingClass::Periodic(_) => real + sample.time / self.units.periodic_ticks_per_second,
        })
    }

    /// Seconds elapsed between `anchor` and `idx`.
    fn elapsed(&self, anchor: usize, reference: f64, idx: usize) -> f64 {
        match self.timing {
            TimingClass::Cumulative(_) => {
                (self.samples[idx].time - reference).abs() / self.units.cumulative_ticks_per_second
            }
            TimingClass::Periodic(delta) => {
                idx.abs_diff(anchor) as f64 * delta / self.units.periodic_ticks_per_second
            }
        }
    }

    /// First index, walking from `from` in the given direction, at which `target`
    /// seconds have elapsed since `anchor`. `None` when the record ends first.
    fn seek(
        &self,
        anchor: usize,
        reference: f64,
        from: usize,
        target: f64,
        backward: bool,
    ) -> Option<usize> {
        let n = self.samples.len();
        let mut idx = from;
        loop {
            if self.elapsed(anchor, reference, idx) >= target {
                return Some(idx);
            }
            idx = if backward {
                idx.checked_sub(1)?
            } else {
                Some(idx + 1).filter(|&next| next < n)?
            };
        }
    }

    fn walk_forward(&self, anchor: usize, reference: f64, offset: f64, duration: f64) -> Window {
        let n = self.samples.len();
        let Some(p_init) = self.seek(anchor, reference, anchor, offset, false) else {
            return Window::truncated(n..n);
        };
        match self.seek(anchor, reference, p_init, offset + duration, false) {
            Some(p_end) => Window::complete(p_init..p_end),
            None => Window::truncated(p_init..n),
        }
    }

    fn walk_backward(&self, anchor: usize, reference: f64, offset: f64, duration: f64) -> Window {
        let Some(last) = self.seek(anchor, reference, anchor, offset, true) else {
            return Window::truncated(0..0);
        };
        match self.seek(anchor, reference, last, offset + duration, true) {
            Some(boundary) => Window::complete(boundary + 1..last + 1),
            None => Window::truncated(0..last + 1),
        }
    }
}

fn forward_lines(p_init: usize, p_end: usize, n: usize) -> Window {
    if p_end <= n {
        Window::complete(p_init..p_end)
    } else {
        Window::truncated(p_init.min(n)..n)
    }
}

/// Converts a line count given as a number into an index offset. Negative and
/// non-finite counts select no line.
fn to_lines(count: f64) -> usize {
    if count.is_finite() && count > 0.0 {
        count as usize
    } else {
        0
    }
}
