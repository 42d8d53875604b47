//! Loading assessment series from files
//!
//! The engine itself never touches storage; these importers exist so the CLI
//! can feed it recorded assessments from JSON or CSV exports.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::error::{ImportError, Result};
use crate::models::{AssessmentSeries, AssessmentSnapshot, BodyFatMethod, Measurements};

pub mod csv;
pub mod json;

/// One recorded assessment before metrics are derived
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentRecord {
    pub timestamp: DateTime<Utc>,

    #[serde(default)]
    pub measurements: Measurements,

    /// Estimator for this record, overriding the file and config defaults
    #[serde(default)]
    pub body_fat_method: Option<BodyFatMethod>,
}

/// Records read from one file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportedSeries {
    pub subject: Option<String>,
    pub body_fat_method: Option<BodyFatMethod>,
    pub records: Vec<AssessmentRecord>,
}

impl ImportedSeries {
    /// Derive every snapshot and assemble the time-ordered series
    ///
    /// Method precedence: record, then file, then `default_method`.
    pub fn into_series(self, default_method: BodyFatMethod) -> AssessmentSeries {
        let file_method = self.body_fat_method.unwrap_or(default_method);
        let snapshots = self
            .records
            .into_iter()
            .map(|record| {
                let method = record.body_fat_method.unwrap_or(file_method);
                AssessmentSnapshot::new(record.timestamp, record.measurements, method)
            })
            .collect();

        let series = AssessmentSeries::new(snapshots);
        match self.subject {
            Some(subject) => series.with_subject(subject),
            None => series,
        }
    }
}

/// Trait for reading assessments from different file formats
pub trait ImportFormat {
    /// Check if this importer can handle the given file
    fn can_import(&self, file_path: &Path) -> bool;

    /// Read the assessments in the file
    fn import_file(&self, file_path: &Path) -> Result<ImportedSeries>;

    /// Get the format name for this importer
    fn get_format_name(&self) -> &'static str;
}

/// Manager for coordinating different import formats
pub struct ImportManager {
    importers: Vec<Box<dyn ImportFormat>>,
}

impl Default for ImportManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ImportManager {
    /// Create a new import manager with all available importers
    pub fn new() -> Self {
        let importers: Vec<Box<dyn ImportFormat>> = vec![
            Box::new(json::JsonImporter::new()),
            Box::new(csv::CsvImporter::new()),
        ];

        Self { importers }
    }

    /// Import a single file, auto-detecting the format
    pub fn import_file(&self, file_path: &Path) -> Result<ImportedSeries> {
        let importer = self
            .importers
            .iter()
            .find(|importer| importer.can_import(file_path))
            .ok_or_else(|| ImportError::UnsupportedFormat {
                format: file_path
                    .extension()
                    .map(|ext| ext.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            })?;

        let imported = importer.import_file(file_path)?;
        info!(
            path = %file_path.display(),
            format = importer.get_format_name(),
            records = imported.records.len(),
            "Imported assessments"
        );
        Ok(imported)
    }

    /// Import a file and derive its series in one step
    pub fn load_series(&self, file_path: &Path, default_method: BodyFatMethod) -> Result<AssessmentSeries> {
        Ok(self.import_file(file_path)?.into_series(default_method))
    }
}

pub(crate) fn has_extension(file_path: &Path, extensions: &[&str]) -> bool {
    file_path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| extensions.iter().any(|e| ext.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}

/// Parse RFC 3339 timestamps or plain `YYYY-MM-DD` dates (midnight UTC)
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()?;
    Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Metric;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_timestamp() {
        let dt = parse_timestamp("2024-02-10").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 2, 10, 0, 0, 0).unwrap());

        let dt = parse_timestamp("2024-02-10T08:30:00-03:00").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 2, 10, 11, 30, 0).unwrap());

        assert!(parse_timestamp("10/02/2024").is_none());
    }

    #[test]
    fn test_unsupported_format() {
        let manager = ImportManager::new();
        let err = manager.import_file(Path::new("assessments.xlsx")).unwrap_err();
        assert!(err.user_message().contains("xlsx"));
    }

    #[test]
    fn test_method_precedence() {
        let record = |day: u32, method: Option<BodyFatMethod>| AssessmentRecord {
            timestamp: Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap(),
            measurements: Measurements {
                weight: Some(dec!(70)),
                body_fat_percentage: Some(dec!(20)),
                ..Measurements::default()
            },
            body_fat_method: method,
        };

        let imported = ImportedSeries {
            subject: Some("joao".to_string()),
            body_fat_method: Some(BodyFatMethod::Manual),
            records: vec![record(2, Some(BodyFatMethod::Navy)), record(1, None)],
        };
        let series = imported.into_series(BodyFatMethod::JacksonPollock7);

        assert_eq!(series.subject(), Some("joao"));
        assert_eq!(
            series.values(&Metric::BodyFatPercentage),
            vec![Some(dec!(20)), None]
        );
        assert_eq!(series.snapshots()[1].derived().body_fat_method, BodyFatMethod::Navy);
    }
}
