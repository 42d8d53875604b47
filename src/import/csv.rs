use csv::{ReaderBuilder, StringRecord, Trim};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use crate::error::{ImportError, Result};
use crate::import::{has_extension, parse_timestamp, AssessmentRecord, ImportFormat, ImportedSeries};
use crate::models::{BodyFatMethod, Measurements, Sex};

/// CSV importer, one assessment per row
///
/// Columns are `timestamp`, the basic fields (`weight`, `height`, `age`,
/// `sex`, `body_fat_percentage`, `body_fat_method`) and grouped fields
/// prefixed with `skinfold.`, `circumference.` or `test.`. Empty cells are
/// unmeasured.
pub struct CsvImporter {
    column_mapping: HashMap<String, String>,
}

impl Default for CsvImporter {
    fn default() -> Self {
        Self::new()
    }
}

impl CsvImporter {
    pub fn new() -> Self {
        let mut column_mapping = HashMap::new();

        // Common column name variations
        Self::add_mapping(&mut column_mapping, "timestamp", &["timestamp", "date", "data"]);
        Self::add_mapping(&mut column_mapping, "weight", &["weight", "weight_kg", "peso"]);
        Self::add_mapping(&mut column_mapping, "height", &["height", "height_cm", "altura"]);
        Self::add_mapping(&mut column_mapping, "age", &["age", "idade"]);
        Self::add_mapping(&mut column_mapping, "sex", &["sex", "gender", "sexo"]);
        Self::add_mapping(
            &mut column_mapping,
            "body_fat_percentage",
            &["body_fat_percentage", "body_fat", "bf"],
        );
        Self::add_mapping(&mut column_mapping, "body_fat_method", &["body_fat_method", "method"]);

        Self { column_mapping }
    }

    fn add_mapping(mapping: &mut HashMap<String, String>, canonical: &str, variations: &[&str]) {
        for variation in variations {
            mapping.insert(variation.to_string(), canonical.to_string());
        }
    }

    fn canonical_column(&self, header: &str) -> String {
        let header = header.trim().to_lowercase();
        self.column_mapping.get(&header).cloned().unwrap_or(header)
    }

    /// Parse CSV content from any reader
    pub fn parse_reader<R: Read>(&self, reader: R, file_path: &Path) -> Result<ImportedSeries> {
        let mut csv_reader = ReaderBuilder::new()
            .has_headers(true)
            .trim(Trim::All)
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = csv_reader
            .headers()
            .map_err(|e| parse_error(file_path, e))?
            .iter()
            .map(|h| self.canonical_column(h))
            .collect();

        if !headers.iter().any(|h| h == "timestamp") {
            return Err(ImportError::ParseError {
                path: file_path.to_path_buf(),
                reason: "missing timestamp column".to_string(),
            }
            .into());
        }

        let mut records = Vec::new();
        for (index, row) in csv_reader.records().enumerate() {
            let row = row.map_err(|e| parse_error(file_path, e))?;
            // Header is line 1
            records.push(Self::parse_row(&headers, &row, index + 2)?);
        }

        Ok(ImportedSeries {
            records,
            ..ImportedSeries::default()
        })
    }

    fn parse_row(headers: &[String], row: &StringRecord, line: usize) -> Result<AssessmentRecord> {
        let mut timestamp = None;
        let mut body_fat_method = None;
        let mut m = Measurements::default();

        for (column, cell) in headers.iter().zip(row.iter()) {
            if cell.is_empty() {
                continue;
            }
            let invalid = || ImportError::InvalidValue {
                field: column.clone(),
                row: line,
                value: cell.to_string(),
            };

            match column.as_str() {
                "timestamp" => timestamp = Some(parse_timestamp(cell).ok_or_else(invalid)?),
                "sex" => m.sex = Some(Sex::from_str(cell).map_err(|_| invalid())?),
                "body_fat_method" => {
                    body_fat_method = Some(BodyFatMethod::from_str(cell).map_err(|_| invalid())?)
                }
                _ => {
                    let value = Decimal::from_str(cell).map_err(|_| invalid())?;
                    Self::assign(&mut m, column, value).ok_or_else(invalid)?;
                }
            }
        }

        let timestamp = timestamp.ok_or_else(|| ImportError::InvalidValue {
            field: "timestamp".to_string(),
            row: line,
            value: String::new(),
        })?;

        Ok(AssessmentRecord {
            timestamp,
            measurements: m,
            body_fat_method,
        })
    }

    /// Store a numeric cell; `None` for columns that are not measurements
    fn assign(m: &mut Measurements, column: &str, value: Decimal) -> Option<()> {
        match column {
            "weight" => m.weight = Some(value),
            "height" => m.height = Some(value),
            "age" => m.age = Some(value),
            "body_fat_percentage" => m.body_fat_percentage = Some(value),
            _ => {
                let (group, name) = column.split_once('.')?;
                match group {
                    "skinfold" => {
                        if !m.skinfolds.set(name, value) {
                            return None;
                        }
                    }
                    "circumference" => m.circumferences.set(name, value),
                    "test" => m.set_physical_test(name, value),
                    _ => return None,
                }
            }
        }
        Some(())
    }
}

fn parse_error(file_path: &Path, error: csv::Error) -> ImportError {
    ImportError::ParseError {
        path: file_path.to_path_buf(),
        reason: error.to_string(),
    }
}

impl ImportFormat for CsvImporter {
    fn can_import(&self, file_path: &Path) -> bool {
        has_extension(file_path, &["csv"])
    }

    fn import_file(&self, file_path: &Path) -> Result<ImportedSeries> {
        let file = File::open(file_path)?;
        self.parse_reader(file, file_path)
    }

    fn get_format_name(&self) -> &'static str {
        "CSV"
    }
}
