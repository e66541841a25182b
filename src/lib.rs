//! Heart rate time series segmentation and multiscale decomposition.
//!
//! This crate cuts heart rate records into time or line windows, coarse-grains them
//! into multiple scales and tabulates per-scale compression and entropy figures
//! computed by pluggable backends.

pub mod config;
pub mod error;
pub mod multiscale;
pub mod partition;
pub mod record;

pub use error::Error;
