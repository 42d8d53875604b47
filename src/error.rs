//! Unified error hierarchy for BodyRS
//!
//! The analytics engine reports failure as absence of a result, but every
//! null has a reason. Those reasons are modelled here so the `try_*`
//! calculator functions can say *why* a metric is unavailable, and so the
//! CLI can surface configuration and import problems with context.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for all BodyRS operations
#[derive(Debug, Error)]
pub enum BodyRsError {
    /// Metric calculation errors
    #[error("Calculation error: {0}")]
    Calculation(#[from] CalculationError),

    /// Assessment import errors
    #[error("Import error: {0}")]
    Import(#[from] ImportError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Why a derived metric, variation or trend could not be produced
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CalculationError {
    /// A required field is absent
    #[error("Missing input for {calculation}: {field}")]
    MissingInput {
        calculation: &'static str,
        field: &'static str,
    },

    /// A value would make the formula mathematically undefined
    #[error("Invalid domain for {calculation}: {reason}")]
    InvalidDomain {
        calculation: &'static str,
        reason: String,
    },

    /// Fewer data points than the operation needs
    #[error("Incomplete series for {calculation}: need {required} points, got {available}")]
    IncompleteSeries {
        calculation: &'static str,
        required: usize,
        available: usize,
    },
}

impl CalculationError {
    pub(crate) fn missing(calculation: &'static str, field: &'static str) -> Self {
        CalculationError::MissingInput { calculation, field }
    }

    pub(crate) fn domain(calculation: &'static str, reason: impl Into<String>) -> Self {
        CalculationError::InvalidDomain {
            calculation,
            reason: reason.into(),
        }
    }

    /// Name of the calculation that failed
    pub fn calculation(&self) -> &'static str {
        match self {
            CalculationError::MissingInput { calculation, .. }
            | CalculationError::InvalidDomain { calculation, .. }
            | CalculationError::IncompleteSeries { calculation, .. } => calculation,
        }
    }
}

/// Assessment import errors
#[derive(Debug, Error)]
pub enum ImportError {
    /// Unsupported file format
    #[error("Unsupported format: {format}")]
    UnsupportedFormat { format: String },

    /// Format-specific parsing error
    #[error("Parse error in {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    /// A column or field could not be interpreted
    #[error("Invalid value for {field} in row {row}: {value}")]
    InvalidValue {
        field: String,
        row: usize,
        value: String,
    },
}

/// Result type alias for BodyRS operations
pub type Result<T> = std::result::Result<T, BodyRsError>;

impl BodyRsError {
    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            BodyRsError::Calculation(_) => ErrorSeverity::Info,
            BodyRsError::Import(ImportError::InvalidValue { .. }) => ErrorSeverity::Warning,
            BodyRsError::Import(_) => ErrorSeverity::Error,
            BodyRsError::Io(_) => ErrorSeverity::Error,
            BodyRsError::Configuration(_) => ErrorSeverity::Critical,
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            BodyRsError::Calculation(CalculationError::MissingInput { calculation, field }) => {
                format!("{} is not available: {} was not measured", calculation, field)
            }
            BodyRsError::Calculation(CalculationError::IncompleteSeries {
                calculation, ..
            }) => {
                format!(
                    "Not enough assessments to calculate {}. Record at least two assessments.",
                    calculation
                )
            }
            BodyRsError::Import(ImportError::UnsupportedFormat { format }) => {
                format!("Cannot read assessments from '{}' files (use json or csv)", format)
            }
            _ => self.to_string(),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Critical error requiring immediate attention
    Critical,
    /// Error that prevents the operation
    Error,
    /// Warning that doesn't prevent operation
    Warning,
    /// Informational message (a metric is simply unavailable)
    Info,
}

impl ErrorSeverity {
    /// Convert to tracing level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            ErrorSeverity::Critical => tracing::Level::ERROR,
            ErrorSeverity::Error => tracing::Level::ERROR,
            ErrorSeverity::Warning => tracing::Level::WARN,
            ErrorSeverity::Info => tracing::Level::INFO,
        }
    }
}
