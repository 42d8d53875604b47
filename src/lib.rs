// Library interface for BodyRS: the metrics and progress engines plus the
// import, config and logging layers the CLI and integration tests share

pub mod config;
pub mod error;
pub mod import;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod progress;

// Re-export commonly used types for convenience
pub use models::*;
pub use metrics::MetricsCalculator;
pub use progress::{
    MetricComparison, Polarity, PolarityTable, ProgressAnalyzer, ProgressConfig, SeriesSummary,
    TrendDirection, TrendLine, VariationClass,
};
pub use config::AppConfig;
pub use error::{BodyRsError, CalculationError, Result};
pub use logging::{LogConfig, LogFormat, LogLevel};
