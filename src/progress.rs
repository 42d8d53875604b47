//! Progress analysis across assessments
//!
//! Compares assessments of one subject over time:
//! - pairwise percent variation with metric-aware polarity, so a falling
//!   waist and a growing arm are both reported as favourable
//! - least-squares trend lines over a whole series
//! - min/max/mean/latest summaries of a metric column

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::error::CalculationError;
use crate::metrics::round_dp;
use crate::models::{AssessmentSeries, AssessmentSnapshot, Metric};

const VARIATION: &str = "variation";
const TREND: &str = "trend";

/// Circumference names that denote arm-type sites, where growth is desirable
const ARM_SITES: [&str; 5] = ["arm", "biceps", "forearm", "braco", "antebraco"];

/// What an increase in a metric means for the subject
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    /// An increase is favourable (lean mass, test scores, arm girth)
    HigherIsBetter,
    /// An increase is unfavourable (weight, fat, most girths)
    LowerIsBetter,
    /// Changes carry no judgement (height)
    Neutral,
}

/// Judgement of a variation for display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariationClass {
    Favorable,
    Unfavorable,
    Neutral,
}

impl VariationClass {
    /// Colour name the presentation layer paints the delta with
    pub fn color(&self) -> &'static str {
        match self {
            VariationClass::Favorable => "green",
            VariationClass::Unfavorable => "red",
            VariationClass::Neutral => "gray",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrendDirection {
    Increasing,
    Stable,
    Decreasing,
}

/// Metric-to-polarity lookup
///
/// Defaults follow the usual gym assessment reading of each metric; any
/// metric key can be overridden. BMI is treated as lower-is-better for
/// every subject, including underweight ones.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolarityTable {
    overrides: BTreeMap<String, Polarity>,
}

impl PolarityTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides keyed by metric key, matched case-insensitively
    pub fn with_overrides(overrides: BTreeMap<String, Polarity>) -> Self {
        let overrides = overrides
            .into_iter()
            .map(|(key, polarity)| (key.trim().to_lowercase(), polarity))
            .collect();
        PolarityTable { overrides }
    }

    pub fn set(&mut self, metric: &Metric, polarity: Polarity) {
        self.overrides.insert(metric.key(), polarity);
    }

    /// Built-in polarity, ignoring overrides
    pub fn default_polarity(metric: &Metric) -> Polarity {
        match metric {
            Metric::Weight
            | Metric::Bmi
            | Metric::BodyFatPercentage
            | Metric::FatMass
            | Metric::SumOfSkinfolds
            | Metric::WaistHipRatio
            | Metric::Skinfold(_) => Polarity::LowerIsBetter,
            Metric::LeanMass | Metric::Bmr | Metric::PhysicalTest(_) => Polarity::HigherIsBetter,
            Metric::Height => Polarity::Neutral,
            Metric::Circumference(site) => {
                if is_arm_site(site) {
                    Polarity::HigherIsBetter
                } else {
                    Polarity::LowerIsBetter
                }
            }
        }
    }

    pub fn polarity(&self, metric: &Metric) -> Polarity {
        self.overrides
            .get(&metric.key())
            .copied()
            .unwrap_or_else(|| Self::default_polarity(metric))
    }
}

fn is_arm_site(site: &str) -> bool {
    let site = site.to_lowercase();
    ARM_SITES.iter().any(|arm| site.contains(arm))
}

/// Progress analysis configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressConfig {
    /// Variations with a smaller magnitude (percentage points) are neutral
    pub neutral_threshold: Decimal,

    /// Polarity overrides keyed by metric key
    pub polarity_overrides: BTreeMap<String, Polarity>,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        ProgressConfig {
            neutral_threshold: dec!(0.1),
            polarity_overrides: BTreeMap::new(),
        }
    }
}

/// Least-squares line over series indices 0, 1, 2, ...
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendLine {
    pub slope: Decimal,
    pub intercept: Decimal,
}

impl TrendLine {
    /// Fitted value at `index`, `None` if it overflows
    pub fn value_at(&self, index: usize) -> Option<Decimal> {
        self.slope
            .checked_mul(Decimal::from(index))
            .and_then(|rise| rise.checked_add(self.intercept))
    }

    pub fn direction(&self) -> TrendDirection {
        if self.slope > Decimal::ZERO {
            TrendDirection::Increasing
        } else if self.slope < Decimal::ZERO {
            TrendDirection::Decreasing
        } else {
            TrendDirection::Stable
        }
    }
}

/// Statistics of one metric column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesSummary {
    pub min: Option<Decimal>,
    pub max: Option<Decimal>,
    /// Mean of the measured values, 2 decimals
    pub mean: Option<Decimal>,
    pub latest: Option<Decimal>,
    /// Percent variation between the last two measured values
    pub change_from_previous: Decimal,
    /// Number of measured values
    pub count: usize,
}

/// One metric compared between two assessments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricComparison {
    pub metric: String,
    pub current: Option<Decimal>,
    pub previous: Option<Decimal>,
    pub variation: Option<Decimal>,
    pub class: VariationClass,
}

/// Progress analysis engine
pub struct ProgressAnalyzer {
    config: ProgressConfig,
    polarity: PolarityTable,
}

impl Default for ProgressAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressAnalyzer {
    /// Create analyzer with default configuration
    pub fn new() -> Self {
        Self::with_config(ProgressConfig::default())
    }

    /// Create analyzer with custom configuration
    pub fn with_config(config: ProgressConfig) -> Self {
        let polarity = PolarityTable::with_overrides(config.polarity_overrides.clone());
        ProgressAnalyzer { config, polarity }
    }

    pub fn config(&self) -> &ProgressConfig {
        &self.config
    }

    /// Percent variation ((current − previous) / previous) × 100, 1 decimal
    pub fn try_variation(
        current: Option<Decimal>,
        previous: Option<Decimal>,
    ) -> Result<Decimal, CalculationError> {
        let current = current.ok_or_else(|| CalculationError::missing(VARIATION, "current value"))?;
        let previous = previous.ok_or_else(|| CalculationError::missing(VARIATION, "previous value"))?;
        if previous.is_zero() {
            return Err(CalculationError::domain(VARIATION, "previous value is zero"));
        }

        current
            .checked_sub(previous)
            .and_then(|delta| delta.checked_div(previous))
            .and_then(|ratio| ratio.checked_mul(dec!(100)))
            .map(|pct| round_dp(pct, 1))
            .ok_or_else(|| CalculationError::domain(VARIATION, "result out of range"))
    }

    pub fn variation(current: Option<Decimal>, previous: Option<Decimal>) -> Option<Decimal> {
        match Self::try_variation(current, previous) {
            Ok(value) => Some(value),
            Err(err) => {
                debug!(reason = %err, "Variation unavailable");
                None
            }
        }
    }

    pub fn polarity(&self, metric: &Metric) -> Polarity {
        self.polarity.polarity(metric)
    }

    /// Judge a variation of `metric`; small or unknown variations are neutral
    pub fn classify_variation(&self, metric: &Metric, variation: Option<Decimal>) -> VariationClass {
        let Some(variation) = variation else {
            return VariationClass::Neutral;
        };
        if variation.abs() < self.config.neutral_threshold {
            return VariationClass::Neutral;
        }

        let increased = variation > Decimal::ZERO;
        match (self.polarity(metric), increased) {
            (Polarity::Neutral, _) => VariationClass::Neutral,
            (Polarity::HigherIsBetter, true) | (Polarity::LowerIsBetter, false) => VariationClass::Favorable,
            (Polarity::HigherIsBetter, false) | (Polarity::LowerIsBetter, true) => VariationClass::Unfavorable,
        }
    }

    /// Compare one metric between two snapshots
    pub fn compare_metric(
        &self,
        metric: &Metric,
        current: &AssessmentSnapshot,
        previous: &AssessmentSnapshot,
    ) -> MetricComparison {
        let current_value = current.value(metric);
        let previous_value = previous.value(metric);
        let variation = Self::variation(current_value, previous_value);

        MetricComparison {
            metric: metric.key(),
            current: current_value,
            previous: previous_value,
            variation,
            class: self.classify_variation(metric, variation),
        }
    }

    /// Compare every metric present in either snapshot
    pub fn compare(&self, current: &AssessmentSnapshot, previous: &AssessmentSnapshot) -> Vec<MetricComparison> {
        let mut metrics = current.metrics();
        metrics.extend(previous.metrics());
        metrics.sort();
        metrics.dedup();

        metrics
            .iter()
            .map(|metric| self.compare_metric(metric, current, previous))
            .collect()
    }

    /// Ordinary least squares with the index as the independent variable
    ///
    /// Needs at least two measured points. Unmeasured entries count as zero
    /// in the sums, which drags the line towards zero around gaps.
    pub fn try_fit_line(values: &[Option<Decimal>]) -> Result<TrendLine, CalculationError> {
        let measured = values.iter().filter(|v| v.is_some()).count();
        if measured < 2 {
            return Err(CalculationError::IncompleteSeries {
                calculation: TREND,
                required: 2,
                available: measured,
            });
        }

        let overflow = || CalculationError::domain(TREND, "sums out of range");

        let n = Decimal::from(values.len());
        let (mut sum_x, mut sum_y, mut sum_xy, mut sum_xx) =
            (Decimal::ZERO, Decimal::ZERO, Decimal::ZERO, Decimal::ZERO);
        for (index, value) in values.iter().enumerate() {
            let x = Decimal::from(index);
            let y = value.unwrap_or(Decimal::ZERO);
            sum_x = sum_x.checked_add(x).ok_or_else(overflow)?;
            sum_y = sum_y.checked_add(y).ok_or_else(overflow)?;
            sum_xy = x
                .checked_mul(y)
                .and_then(|xy| sum_xy.checked_add(xy))
                .ok_or_else(overflow)?;
            sum_xx = x
                .checked_mul(x)
                .and_then(|xx| sum_xx.checked_add(xx))
                .ok_or_else(overflow)?;
        }

        let denominator = n
            .checked_mul(sum_xx)
            .zip(sum_x.checked_mul(sum_x))
            .and_then(|(a, b)| a.checked_sub(b))
            .ok_or_else(overflow)?;
        if denominator.is_zero() {
            return Err(CalculationError::domain(TREND, "index variance is zero"));
        }

        let slope = n
            .checked_mul(sum_xy)
            .zip(sum_x.checked_mul(sum_y))
            .and_then(|(a, b)| a.checked_sub(b))
            .and_then(|numerator| numerator.checked_div(denominator))
            .ok_or_else(overflow)?;
        let intercept = slope
            .checked_mul(sum_x)
            .and_then(|rise| sum_y.checked_sub(rise))
            .and_then(|offset| offset.checked_div(n))
            .ok_or_else(overflow)?;
        Ok(TrendLine { slope, intercept })
    }

    /// Fitted value for every index of `values`, empty when no line fits
    pub fn fit_trend(values: &[Option<Decimal>]) -> Vec<Decimal> {
        let line = match Self::try_fit_line(values) {
            Ok(line) => line,
            Err(err) => {
                debug!(reason = %err, "Trend unavailable");
                return Vec::new();
            }
        };

        (0..values.len())
            .map(|i| line.value_at(i))
            .collect::<Option<Vec<_>>>()
            .unwrap_or_else(|| {
                debug!("Trend values out of range");
                Vec::new()
            })
    }

    /// Min, max, mean and latest of the measured values
    ///
    /// `change_from_previous` is the variation between the last two measured
    /// values, or zero when it cannot be computed.
    pub fn summarize(values: &[Option<Decimal>]) -> SeriesSummary {
        let measured: Vec<Decimal> = values.iter().flatten().copied().collect();

        let mean = if measured.is_empty() {
            None
        } else {
            measured
                .iter()
                .try_fold(Decimal::ZERO, |total, value| total.checked_add(*value))
                .and_then(|total| total.checked_div(Decimal::from(measured.len())))
                .map(|mean| round_dp(mean, 2))
        };
        if mean.is_none() && !measured.is_empty() {
            debug!("Mean out of range");
        }

        let change_from_previous = match measured.as_slice() {
            [.., previous, latest] => Self::variation(Some(*latest), Some(*previous)).unwrap_or(Decimal::ZERO),
            _ => Decimal::ZERO,
        };

        SeriesSummary {
            min: measured.iter().min().copied(),
            max: measured.iter().max().copied(),
            mean,
            latest: measured.last().copied(),
            change_from_previous,
            count: measured.len(),
        }
    }

    /// Trend line values for one metric of a series
    pub fn trend_for(series: &AssessmentSeries, metric: &Metric) -> Vec<Decimal> {
        Self::fit_trend(&series.values(metric))
    }

    /// Summary of one metric of a series
    pub fn summary_for(series: &AssessmentSeries, metric: &Metric) -> SeriesSummary {
        Self::summarize(&series.values(metric))
    }

    /// Compare the two most recent assessments of a series
    pub fn compare_latest(&self, series: &AssessmentSeries) -> Option<Vec<MetricComparison>> {
        series
            .latest_pair()
            .map(|(current, previous)| self.compare(current, previous))
    }
}
