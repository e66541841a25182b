//! Timing classification of a record's time column.
//!
//! Recording devices write the time column in one of two ways:
//! - cumulative: every line carries the absolute time since the start of the
//!   recording, so the column strictly increases;
//! - periodic: every line carries the interval since the previous sample. Apart from
//!   signal loss the interval is constant.
//!
//! The detector looks at a small sample from the head (or the tail) of the record.
//! For periodic records it returns the statistical mode of the sampled intervals
//! rather than their mean, so that gaps caused by signal loss do not distort the
//! nominal sampling interval.

use crate::record::Sample;

/// How the time column of a record is to be interpreted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimingClass {
    /// Absolute timestamps. Carries the first sampled timestamp (the last one when
    /// the sample was taken from the end of the record).
    Cumulative(f64),
    /// Inter-sample intervals. Carries the modal interval.
    Periodic(f64),
}

impl TimingClass {
    pub fn is_cumulative(&self) -> bool {
        matches!(self, TimingClass::Cumulative(_))
    }

    /// The reference timestamp or the modal interval, depending on the class.
    pub fn stamp(&self) -> f64 {
        match self {
            TimingClass::Cumulative(stamp) | TimingClass::Periodic(stamp) => *stamp,
        }
    }
}

/// Classifies the timing of a record sample.
///
/// `timed` tells whether the record carries a time column at all. A value-only
/// record can still be partitioned by lines; it is reported as `Periodic(0.0)`.
pub fn sniff(sample: &[Sample], timed: bool, from_end: bool) -> TimingClass {
    if !timed || sample.is_empty() {
        return TimingClass::Periodic(0.0);
    }
    let increasing = sample.windows(2).all(|pair| pair[1].time > pair[0].time);
    if increasing {
        let reference = if from_end {
            sample[sample.len() - 1].time
        } else {
            sample[0].time
        };
        TimingClass::Cumulative(reference)
    } else {
        let times: Vec<f64> = sample.iter().map(|s| s.time).collect();
        TimingClass::Periodic(mode(&times))
    }
}

/// Most frequent value of `values`. Ties resolve to the smallest value.
fn mode(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mut best = (f64::NAN, 0usize);
    let mut idx = 0;
    while idx < sorted.len() {
        let run = sorted[idx..]
            .iter()
            .take_while(|v| v.total_cmp(&sorted[idx]).is_eq())
            .count();
        // strict comparison keeps the smallest value on ties
        if run > best.1 {
            best = (sorted[idx], run);
        }
        idx += run;
    }
    best.0
}
