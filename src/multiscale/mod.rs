//! Multiscale decomposition of heart rate records.
//!
//! [`create_scales`] coarse-grains every record into one `Scale <s>` directory per
//! scale. The metric tables are then built over those directories with
//! [`multiscale_compression`] and [`multiscale_entropy`], which delegate the actual
//! computation to a [`CompressionBackend`] or an [`EntropyBackend`]. The same
//! backends measure the blocks of a partition through [`block_compression`] and
//! [`block_entropy`].
//!
//! # Example
//!
//! ```no_run
//! use hrv_multiscale::config::AnalysisConfig;
//! use hrv_multiscale::multiscale::{create_scales, scales_dir_name, ScaleOptions, ScaleRange};
//! use std::path::Path;
//!
//! let options = ScaleOptions::default();
//! let input = Path::new("dataset");
//! let range = ScaleRange::new(1, 21, 1).unwrap();
//! let report = create_scales(
//!     input,
//!     scales_dir_name(input, &options),
//!     range,
//!     &options,
//!     &AnalysisConfig::default(),
//! )
//! .unwrap();
//! println!("built {:?}, kept {:?}", report.built, report.skipped);
//! ```

pub mod blocks;
pub mod coarse;
pub mod metrics;
pub mod scales;
pub mod table;

pub use blocks::{
    block_compression, block_entropy, block_metrics, BlockMetricRow, BlockMetricTable,
};
pub use coarse::{coarse_grain, create_scale, ScaleOptions, MULTIPLY_DISABLED};
pub use metrics::{
    calculate_std, CompressionBackend, CompressionData, CompressionRequest, Compressor,
    EntropyAlgorithm, EntropyBackend, EntropyData, EntropyRequest,
};
pub use scales::{create_scales, scale_dir_name, scales_dir_name, ScaleRange, ScaleSetReport};
pub use table::{multiscale_compression, multiscale_entropy, ScaleMetric, ScaleTable};
