use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::BodyRsError;
use crate::logging::{LogConfig, LogFormat, LogLevel};
use crate::models::{BodyFatMethod, Metric};
use crate::progress::{Polarity, ProgressConfig};

/// Main application configuration
///
/// Every section is optional in the file; missing sections take defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Configuration metadata
    #[serde(default)]
    pub metadata: ConfigMetadata,

    /// Assessment calculation preferences
    #[serde(default)]
    pub assessment: AssessmentSettings,

    /// Progress comparison settings
    #[serde(default)]
    pub progress: ProgressConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LogConfig,
}

/// Configuration metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigMetadata {
    /// Configuration format version
    pub version: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,
}

/// Assessment calculation preferences
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentSettings {
    /// Estimator used when a command does not name one
    pub default_body_fat_method: BodyFatMethod,
}

impl Default for ConfigMetadata {
    fn default() -> Self {
        let now = Utc::now();

        ConfigMetadata {
            version: "1.0".to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            metadata: ConfigMetadata::default(),
            assessment: AssessmentSettings::default(),
            progress: ProgressConfig::default(),
            logging: LogConfig::default(),
        }
    }
}

impl Default for AssessmentSettings {
    fn default() -> Self {
        AssessmentSettings {
            default_body_fat_method: BodyFatMethod::JacksonPollock7,
        }
    }
}

/// Configuration management implementation
impl AppConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: AppConfig = toml::from_str(&content)
            .with_context(|| "Failed to parse TOML configuration")?;

        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.metadata.updated_at = Utc::now();

        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }

        let toml_content = toml::to_string_pretty(self)
            .with_context(|| "Failed to serialize configuration to TOML")?;

        fs::write(&path, toml_content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    /// Get default configuration file path
    pub fn default_config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".bodyrs")
            .join("config.toml")
    }

    /// Load configuration from `path`, falling back to defaults when it cannot be read
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let config_path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(Self::default_config_path);

        if !config_path.exists() {
            tracing::debug!(path = %config_path.display(), "No config file, using defaults");
            return Self::default();
        }

        match Self::load_from_file(&config_path) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(path = %config_path.display(), error = format!("{:#}", err), "Ignoring invalid config file");
                Self::default()
            }
        }
    }

    /// Flat `key = value` view used by `bodyrs config --list`
    pub fn entries(&self) -> Vec<(String, String)> {
        let mut entries = vec![
            (
                "assessment.default_body_fat_method".to_string(),
                method_key(self.assessment.default_body_fat_method).to_string(),
            ),
            (
                "progress.neutral_threshold".to_string(),
                self.progress.neutral_threshold.to_string(),
            ),
            ("logging.level".to_string(), self.logging.level.to_filter()),
            ("logging.format".to_string(), format!("{:?}", self.logging.format).to_lowercase()),
        ];

        for (metric, polarity) in &self.progress.polarity_overrides {
            entries.push((format!("progress.polarity.{}", metric), polarity_key(*polarity).to_string()));
        }

        entries
    }

    /// Read a single setting by key
    pub fn get_value(&self, key: &str) -> Option<String> {
        self.entries()
            .into_iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Update a single setting by key
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "assessment.default_body_fat_method" => {
                self.assessment.default_body_fat_method =
                    value.parse::<BodyFatMethod>().map_err(invalid)?;
            }
            "progress.neutral_threshold" => {
                let threshold: Decimal = value
                    .parse()
                    .map_err(|_| invalid(format!("Invalid threshold: {}", value)))?;
                if threshold.is_sign_negative() {
                    return Err(invalid(format!("Threshold must not be negative: {}", value)));
                }
                self.progress.neutral_threshold = threshold;
            }
            "logging.level" => {
                self.logging.level = value.parse::<LogLevel>().map_err(invalid)?;
            }
            "logging.format" => {
                self.logging.format = value.parse::<LogFormat>().map_err(invalid)?;
            }
            _ => {
                let metric = key
                    .strip_prefix("progress.polarity.")
                    .ok_or_else(|| invalid(format!("Unknown configuration key: {}", key)))?;
                let metric: Metric = metric.parse().map_err(invalid)?;
                let polarity = match value.to_lowercase().as_str() {
                    "higher_is_better" | "higher" => Polarity::HigherIsBetter,
                    "lower_is_better" | "lower" => Polarity::LowerIsBetter,
                    "neutral" => Polarity::Neutral,
                    _ => return Err(invalid(format!("Invalid polarity: {}", value))),
                };
                self.progress.polarity_overrides.insert(metric.key(), polarity);
            }
        }

        self.metadata.updated_at = Utc::now();
        Ok(())
    }
}

fn invalid(message: String) -> anyhow::Error {
    BodyRsError::Configuration(message).into()
}

fn method_key(method: BodyFatMethod) -> &'static str {
    match method {
        BodyFatMethod::JacksonPollock7 => "jackson_pollock7",
        BodyFatMethod::JacksonPollock3 => "jackson_pollock3",
        BodyFatMethod::Navy => "navy",
        BodyFatMethod::Manual => "manual",
    }
}

fn polarity_key(polarity: Polarity) -> &'static str {
    match polarity {
        Polarity::HigherIsBetter => "higher_is_better",
        Polarity::LowerIsBetter => "lower_is_better",
        Polarity::Neutral => "neutral",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tempfile::tempdir;

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let deserialized: AppConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.metadata.version, deserialized.metadata.version);
        assert_eq!(
            config.assessment.default_body_fat_method,
            deserialized.assessment.default_body_fat_method
        );
        assert_eq!(deserialized.progress.neutral_threshold, dec!(0.1));
    }

    #[test]
    fn test_set_and_get_values() {
        let mut config = AppConfig::default();

        config.set_value("assessment.default_body_fat_method", "navy").unwrap();
        assert_eq!(config.assessment.default_body_fat_method, BodyFatMethod::Navy);

        config.set_value("progress.neutral_threshold", "0.5").unwrap();
        assert_eq!(config.get_value("progress.neutral_threshold").as_deref(), Some("0.5"));

        config.set_value("progress.polarity.bmi", "higher").unwrap();
        assert_eq!(
            config.progress.polarity_overrides.get("bmi"),
            Some(&Polarity::HigherIsBetter)
        );

        assert_eq!(
            config.get_value("progress.polarity.bmi").as_deref(),
            Some("higher_is_better")
        );
        assert_eq!(
            config.get_value("assessment.default_body_fat_method").as_deref(),
            Some("navy")
        );

        assert!(config.set_value("progress.neutral_threshold", "-1").is_err());
        assert!(config.set_value("progress.polarity.unknown_metric", "higher").is_err());
        assert!(config.set_value("nonsense", "1").is_err());
    }

    #[test]
    fn test_config_file_io() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.toml");

        let mut original = AppConfig::default();
        original.set_value("progress.polarity.circumference.thigh_left", "higher").unwrap();
        original.save_to_file(&config_path).unwrap();

        let loaded = AppConfig::load_from_file(&config_path).unwrap();
        assert_eq!(
            loaded.progress.polarity_overrides.get("circumference.thigh_left"),
            Some(&Polarity::HigherIsBetter)
        );
    }

    #[test]
    fn test_invalid_value_is_configuration_error() {
        let mut config = AppConfig::default();
        let err = config.set_value("logging.level", "loud").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BodyRsError>(),
            Some(BodyRsError::Configuration(_))
        ));
        assert_eq!(config.logging.level, LogLevel::Warn);
    }

    #[test]
    fn test_partial_file_keeps_user_settings() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(
            &config_path,
            "[progress]\nneutral_threshold = \"0.5\"\n\n[progress.polarity_overrides]\nbmi = \"higher_is_better\"\n",
        )
        .unwrap();

        let loaded = AppConfig::load_from_file(&config_path).unwrap();
        assert_eq!(loaded.progress.neutral_threshold, dec!(0.5));
        assert_eq!(loaded.assessment.default_body_fat_method, BodyFatMethod::JacksonPollock7);
        assert_eq!(loaded.metadata.version, "1.0");

        let config = AppConfig::load_or_default(Some(&config_path));
        assert_eq!(config.progress.neutral_threshold, dec!(0.5));
        assert_eq!(
            config.progress.polarity_overrides.get("bmi"),
            Some(&Polarity::HigherIsBetter)
        );
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let temp_dir = tempdir().unwrap();
        let config = AppConfig::load_or_default(Some(&temp_dir.path().join("absent.toml")));
        assert_eq!(config.progress.neutral_threshold, dec!(0.1));
    }
}
