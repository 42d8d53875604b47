use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use rust_decimal::Decimal;
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};

use bodyrs::import::ImportManager;
use bodyrs::logging::init_logging;
use bodyrs::{
    AppConfig, AssessmentSeries, BodyFatMethod, Measurements, Metric, MetricsCalculator,
    ProgressAnalyzer, Sex, VariationClass,
};

/// BodyRS - Body Composition & Progress Analytics CLI
///
/// Derives body composition metrics from anthropometric measurements and
/// tracks how they change across assessments.
#[derive(Parser)]
#[command(name = "bodyrs")]
#[command(author = "BodyRS Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Body composition and progress analytics", long_about = None)]
struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase verbosity of output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Derive metrics from a single set of measurements
    Metrics {
        /// Weight in kg
        #[arg(long)]
        weight: Option<Decimal>,

        /// Height in cm
        #[arg(long)]
        height: Option<Decimal>,

        /// Age in years
        #[arg(long)]
        age: Option<Decimal>,

        /// Sex (male/female)
        #[arg(long)]
        sex: Option<Sex>,

        /// Skinfold in mm as SITE=VALUE (repeatable)
        #[arg(long = "skinfold", value_parser = parse_site_value)]
        skinfolds: Vec<(String, Decimal)>,

        /// Circumference in cm as SITE=VALUE (repeatable)
        #[arg(long = "circumference", value_parser = parse_site_value)]
        circumferences: Vec<(String, Decimal)>,

        /// Measured body fat percentage (for the manual method)
        #[arg(long)]
        body_fat: Option<Decimal>,

        /// Body fat method (jp7, jp3, navy, manual)
        #[arg(short, long)]
        method: Option<BodyFatMethod>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Compare the two most recent assessments in a file
    Compare {
        /// Assessment file (JSON or CSV)
        #[arg(short, long)]
        file: PathBuf,

        /// Body fat method when the file does not name one
        #[arg(short, long)]
        method: Option<BodyFatMethod>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Fit a linear trend to one metric across all assessments
    Trend {
        /// Assessment file (JSON or CSV)
        #[arg(short, long)]
        file: PathBuf,

        /// Metric key, e.g. weight, body_fat_percentage, circumference.waist
        #[arg(long, default_value = "weight")]
        metric: Metric,

        /// Body fat method when the file does not name one
        #[arg(short, long)]
        method: Option<BodyFatMethod>,
    },

    /// Summarize one metric across all assessments
    Summary {
        /// Assessment file (JSON or CSV)
        #[arg(short, long)]
        file: PathBuf,

        /// Metric key, e.g. weight, body_fat_percentage, circumference.waist
        #[arg(long, default_value = "weight")]
        metric: Metric,

        /// Body fat method when the file does not name one
        #[arg(short, long)]
        method: Option<BodyFatMethod>,
    },

    /// Configure application settings
    Config {
        /// List all configuration options
        #[arg(short, long)]
        list: bool,

        /// Set a configuration value (KEY=VALUE)
        #[arg(short, long)]
        set: Option<String>,

        /// Get a configuration value
        #[arg(short, long)]
        get: Option<String>,
    },
}

fn parse_site_value(s: &str) -> Result<(String, Decimal), String> {
    let (site, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected SITE=VALUE, got '{}'", s))?;
    let value = value
        .trim()
        .parse::<Decimal>()
        .map_err(|e| format!("invalid value '{}': {}", value, e))?;
    Ok((site.trim().to_lowercase(), value))
}

#[derive(Tabled)]
struct MetricRow {
    #[tabled(rename = "Metric")]
    metric: String,
    #[tabled(rename = "Value")]
    value: String,
}

#[derive(Tabled)]
struct TrendRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Measured")]
    measured: String,
    #[tabled(rename = "Trend")]
    fitted: String,
}

fn show(value: Option<Decimal>, unit: &str) -> String {
    match value {
        Some(v) if unit.is_empty() => v.to_string(),
        Some(v) => format!("{} {}", v, unit),
        None => "-".to_string(),
    }
}

fn paint(text: String, class: VariationClass) -> ColoredString {
    match class {
        VariationClass::Favorable => text.green(),
        VariationClass::Unfavorable => text.red(),
        VariationClass::Neutral => text.dimmed(),
    }
}

fn load_series(file: &Path, method: Option<BodyFatMethod>, config: &AppConfig) -> Result<AssessmentSeries> {
    let method = method.unwrap_or(config.assessment.default_body_fat_method);
    ImportManager::new()
        .load_series(file, method)
        .map_err(|e| anyhow!(e.user_message()))
        .with_context(|| format!("Failed to load assessments from {}", file.display()))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(AppConfig::default_config_path);
    // Logging is configured from this file, so problems are reported directly
    let mut config = match AppConfig::load_from_file(&config_path) {
        Ok(config) => config,
        Err(e) if config_path.exists() => {
            eprintln!(
                "{}",
                format!("⚠️  Ignoring invalid config {}: {:#}", config_path.display(), e).yellow()
            );
            AppConfig::default()
        }
        Err(_) => AppConfig::default(),
    };
    init_logging(&config.logging.clone().with_verbosity(cli.verbose))?;

    match cli.command {
        Commands::Metrics {
            weight,
            height,
            age,
            sex,
            skinfolds,
            circumferences,
            body_fat,
            method,
            json,
        } => {
            let mut m = Measurements {
                weight,
                height,
                age,
                sex,
                body_fat_percentage: body_fat,
                ..Measurements::default()
            };
            for (site, value) in skinfolds {
                if !m.skinfolds.set(&site, value) {
                    return Err(anyhow!("Unknown skinfold site: {}", site));
                }
            }
            for (site, value) in circumferences {
                m.circumferences.set(&site, value);
            }

            let method = method.unwrap_or(config.assessment.default_body_fat_method);
            let derived = MetricsCalculator::derive(&m, method);

            if json {
                println!("{}", serde_json::to_string_pretty(&derived)?);
                return Ok(());
            }

            let rows = vec![
                MetricRow {
                    metric: "BMI".to_string(),
                    value: show(derived.bmi, "kg/m²"),
                },
                MetricRow {
                    metric: "BMI category".to_string(),
                    value: MetricsCalculator::bmi_label(derived.bmi).to_string(),
                },
                MetricRow {
                    metric: format!("Body fat ({})", method),
                    value: show(derived.body_fat_percentage, "%"),
                },
                MetricRow {
                    metric: "Body fat category".to_string(),
                    value: derived.body_fat_category.map(|c| c.label()).unwrap_or("").to_string(),
                },
                MetricRow {
                    metric: "Fat mass".to_string(),
                    value: show(derived.fat_mass, "kg"),
                },
                MetricRow {
                    metric: "Lean mass".to_string(),
                    value: show(derived.lean_mass, "kg"),
                },
                MetricRow {
                    metric: "BMR".to_string(),
                    value: show(derived.bmr.map(Decimal::from), "kcal/day"),
                },
                MetricRow {
                    metric: "Sum of skinfolds".to_string(),
                    value: show(derived.sum_of_skinfolds, "mm"),
                },
                MetricRow {
                    metric: "Waist-to-hip ratio".to_string(),
                    value: show(derived.waist_hip_ratio, ""),
                },
                MetricRow {
                    metric: "Cardiovascular risk".to_string(),
                    value: derived.cardiovascular_risk.map(|r| r.label()).unwrap_or("").to_string(),
                },
            ];

            println!("{}", Table::new(rows).with(Style::rounded()));
        }

        Commands::Compare { file, method, json } => {
            let series = load_series(&file, method, &config)?;
            let analyzer = ProgressAnalyzer::with_config(config.progress.clone());

            let (current, previous) = series
                .latest_pair()
                .ok_or_else(|| anyhow!("Need at least two assessments to compare, found {}", series.len()))?;
            let comparisons = analyzer.compare(current, previous);

            if json {
                println!("{}", serde_json::to_string_pretty(&comparisons)?);
                return Ok(());
            }

            println!(
                "{}",
                format!(
                    "Comparing {} with {}",
                    current.timestamp().format("%Y-%m-%d"),
                    previous.timestamp().format("%Y-%m-%d")
                )
                .bold()
            );
            for comparison in comparisons {
                let unit = comparison
                    .metric
                    .parse::<Metric>()
                    .map(|m| m.unit())
                    .unwrap_or("");
                let variation = comparison
                    .variation
                    .map(|v| format!("{:+}%", v))
                    .unwrap_or_else(|| "n/a".to_string());
                println!(
                    "  {:<28} {:>14} -> {:<14} {}",
                    comparison.metric,
                    show(comparison.previous, unit),
                    show(comparison.current, unit),
                    paint(variation, comparison.class)
                );
            }
        }

        Commands::Trend { file, metric, method } => {
            let series = load_series(&file, method, &config)?;
            let values = series.values(&metric);
            let line = ProgressAnalyzer::try_fit_line(&values).map_err(|e| anyhow!(e))?;

            let rows: Vec<TrendRow> = series
                .snapshots()
                .iter()
                .zip(values.iter())
                .enumerate()
                .map(|(index, (snapshot, value))| TrendRow {
                    index,
                    date: snapshot.timestamp().format("%Y-%m-%d").to_string(),
                    measured: show(*value, metric.unit()),
                    fitted: show(line.value_at(index).map(|v| v.round_dp(2)), ""),
                })
                .collect();

            println!("{}", Table::new(rows).with(Style::rounded()));
            println!(
                "Slope: {} {} per assessment ({:?})",
                line.slope.round_dp(3),
                metric.unit(),
                line.direction()
            );
        }

        Commands::Summary { file, metric, method } => {
            let series = load_series(&file, method, &config)?;
            let summary = ProgressAnalyzer::summary_for(&series, &metric);
            let analyzer = ProgressAnalyzer::with_config(config.progress.clone());
            let class = analyzer.classify_variation(&metric, Some(summary.change_from_previous));

            println!("{}", metric.key().bold());
            println!("  Assessments: {}", summary.count);
            println!("  Min:         {}", show(summary.min, metric.unit()));
            println!("  Max:         {}", show(summary.max, metric.unit()));
            println!("  Mean:        {}", show(summary.mean, metric.unit()));
            println!("  Latest:      {}", show(summary.latest, metric.unit()));
            println!(
                "  Change:      {}",
                paint(format!("{:+}%", summary.change_from_previous), class)
            );
        }

        Commands::Config { list, set, get } => {
            if list {
                for (key, value) in config.entries() {
                    println!("{} = {}", key.cyan(), value);
                }
            } else if let Some(key_value) = set {
                let (key, value) = key_value
                    .split_once('=')
                    .ok_or_else(|| anyhow!("Expected KEY=VALUE, got '{}'", key_value))?;
                config.set_value(key.trim(), value.trim())?;
                config.save_to_file(&config_path)?;
                println!("{}", format!("✓ {} updated", key.trim()).green());
            } else if let Some(key) = get {
                match config.get_value(&key) {
                    Some(value) => println!("{}", value),
                    None => return Err(anyhow!("Unknown configuration key: {}", key)),
                }
            }
        }
    }

    Ok(())
}
