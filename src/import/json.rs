use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::{ImportError, Result};
use crate::import::{has_extension, AssessmentRecord, ImportFormat, ImportedSeries};
use crate::models::BodyFatMethod;

/// JSON document: either a bare array of records or an object with metadata
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum JsonDocument {
    Series {
        #[serde(default)]
        subject: Option<String>,
        #[serde(default)]
        body_fat_method: Option<BodyFatMethod>,
        assessments: Vec<AssessmentRecord>,
    },
    Records(Vec<AssessmentRecord>),
}

/// JSON importer for exported assessment histories
pub struct JsonImporter;

impl Default for JsonImporter {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonImporter {
    pub fn new() -> Self {
        JsonImporter
    }

    pub fn parse_str(&self, content: &str, file_path: &Path) -> Result<ImportedSeries> {
        let document: JsonDocument =
            serde_json::from_str(content).map_err(|e| ImportError::ParseError {
                path: file_path.to_path_buf(),
                reason: e.to_string(),
            })?;

        Ok(match document {
            JsonDocument::Series {
                subject,
                body_fat_method,
                assessments,
            } => ImportedSeries {
                subject,
                body_fat_method,
                records: assessments,
            },
            JsonDocument::Records(records) => ImportedSeries {
                records,
                ..ImportedSeries::default()
            },
        })
    }
}

impl ImportFormat for JsonImporter {
    fn can_import(&self, file_path: &Path) -> bool {
        has_extension(file_path, &["json"])
    }

    fn import_file(&self, file_path: &Path) -> Result<ImportedSeries> {
        let content = fs::read_to_string(file_path)?;
        self.parse_str(&content, file_path)
    }

    fn get_format_name(&self) -> &'static str {
        "JSON"
    }
}
