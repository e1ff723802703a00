pub mod averaged;
pub mod binning;
pub mod error;
pub mod histogram;
pub mod params;
pub mod pretty;

pub use averaged::AveragedHistogram;
pub use binning::{BinningAnalysis, BinningAnalysisParams, BinningAnalysisResult, ConvergenceStatus};
pub use error::{HistogramError, OutOfRange};
pub use histogram::{Histogram, HistogramLike, HistogramWithErrorBars};
pub use params::HistogramParams;
