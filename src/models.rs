use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::metrics::MetricsCalculator;

/// Biological sex, selects the branch of every sex-specific equation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Male,
    Female,
}

impl FromStr for Sex {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "male" | "m" | "masculino" => Ok(Sex::Male),
            "female" | "f" | "feminino" => Ok(Sex::Female),
            _ => Err(format!("Invalid sex: {}", s)),
        }
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sex::Male => write!(f, "male"),
            Sex::Female => write!(f, "female"),
        }
    }
}

/// Caliper skinfold thicknesses in millimetres
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Skinfolds {
    pub triceps: Option<Decimal>,
    pub subscapular: Option<Decimal>,
    pub chest: Option<Decimal>,
    #[serde(alias = "mid_axillary")]
    pub midaxillary: Option<Decimal>,
    pub suprailiac: Option<Decimal>,
    pub abdominal: Option<Decimal>,
    pub thigh: Option<Decimal>,
}

impl Skinfolds {
    /// Site names in the order used by the seven-site protocol
    pub const SITES: [&'static str; 7] = [
        "triceps",
        "subscapular",
        "chest",
        "midaxillary",
        "suprailiac",
        "abdominal",
        "thigh",
    ];

    /// Look up a fold by site name
    pub fn get(&self, site: &str) -> Option<Decimal> {
        match site {
            "triceps" => self.triceps,
            "subscapular" => self.subscapular,
            "chest" => self.chest,
            "midaxillary" | "mid_axillary" => self.midaxillary,
            "suprailiac" => self.suprailiac,
            "abdominal" => self.abdominal,
            "thigh" => self.thigh,
            _ => None,
        }
    }

    /// Set a fold by site name, returning false for unknown sites
    pub fn set(&mut self, site: &str, value: Decimal) -> bool {
        let slot = match site {
            "triceps" => &mut self.triceps,
            "subscapular" => &mut self.subscapular,
            "chest" => &mut self.chest,
            "midaxillary" | "mid_axillary" => &mut self.midaxillary,
            "suprailiac" => &mut self.suprailiac,
            "abdominal" => &mut self.abdominal,
            "thigh" => &mut self.thigh,
            _ => return false,
        };
        *slot = Some(value);
        true
    }

    /// Measured folds as (site, value) pairs
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, Decimal)> + '_ {
        Self::SITES
            .into_iter()
            .filter_map(move |site| self.get(site).map(|value| (site, value)))
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }
}

/// Lowercased, trimmed form under which site and test names are stored
pub fn site_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Body girths in centimetres
///
/// Waist, neck and hip feed the circumference estimators and get dedicated
/// fields; every other site (arms, thighs, calves, ...) lives in `other`.
/// Serialized as one flat mapping of site name to girth; a nested `other`
/// group is also accepted on input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, GirthEntry>")]
pub struct Circumferences {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub waist: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub neck: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hip: Option<Decimal>,
    #[serde(flatten)]
    pub other: BTreeMap<String, Decimal>,
}

/// One input entry of a circumference mapping: a girth, or a named group
/// of girths
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum GirthEntry {
    Girth(Decimal),
    Group(BTreeMap<String, Decimal>),
}

impl From<BTreeMap<String, GirthEntry>> for Circumferences {
    fn from(entries: BTreeMap<String, GirthEntry>) -> Self {
        let mut circumferences = Circumferences::default();
        for (site, entry) in entries {
            match entry {
                GirthEntry::Girth(value) => circumferences.set(&site, value),
                GirthEntry::Group(group) => {
                    for (site, value) in group {
                        circumferences.set(&site, value);
                    }
                }
            }
        }
        circumferences
    }
}

impl Circumferences {
    pub fn get(&self, site: &str) -> Option<Decimal> {
        match site_key(site).as_str() {
            "waist" => self.waist,
            "neck" => self.neck,
            "hip" => self.hip,
            other => self.other.get(other).copied(),
        }
    }

    /// Store a girth; names are case-insensitive
    pub fn set(&mut self, site: &str, value: Decimal) {
        match site_key(site).as_str() {
            "waist" => self.waist = Some(value),
            "neck" => self.neck = Some(value),
            "hip" => self.hip = Some(value),
            other => {
                self.other.insert(other.to_string(), value);
            }
        }
    }

    /// Measured girths as (site, value) pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, Decimal)> + '_ {
        [("waist", self.waist), ("neck", self.neck), ("hip", self.hip)]
            .into_iter()
            .filter_map(|(site, value)| value.map(|v| (site, v)))
            .chain(self.other.iter().map(|(site, value)| (site.as_str(), *value)))
    }
}

/// Raw anthropometric inputs for one assessment
///
/// Every field is optional; a missing input only removes the derived
/// metrics that depend on it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Measurements {
    /// Body weight in kilograms
    pub weight: Option<Decimal>,

    /// Height in centimetres
    pub height: Option<Decimal>,

    /// Age in years
    pub age: Option<Decimal>,

    pub sex: Option<Sex>,

    pub skinfolds: Skinfolds,

    pub circumferences: Circumferences,

    /// Directly measured body fat percentage (bioimpedance, DEXA)
    pub body_fat_percentage: Option<Decimal>,

    /// Physical test scores (push-ups, sit-and-reach, ...), higher is better
    #[serde(deserialize_with = "lowercase_keys")]
    pub physical_tests: BTreeMap<String, Decimal>,
}

impl Measurements {
    /// Record a physical test score; names are case-insensitive
    pub fn set_physical_test(&mut self, name: &str, value: Decimal) {
        self.physical_tests.insert(site_key(name), value);
    }
}

fn lowercase_keys<'de, D>(deserializer: D) -> Result<BTreeMap<String, Decimal>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let scores = BTreeMap::<String, Decimal>::deserialize(deserializer)?;
    Ok(scores
        .into_iter()
        .map(|(name, value)| (site_key(&name), value))
        .collect())
}

/// Estimator used to obtain body fat percentage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyFatMethod {
    /// Jackson-Pollock seven-site skinfolds + Siri
    #[default]
    JacksonPollock7,
    /// Jackson-Pollock three-site skinfolds + Siri
    JacksonPollock3,
    /// US Navy circumference method
    Navy,
    /// Use the directly measured percentage
    Manual,
}

impl FromStr for BodyFatMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "jackson_pollock7" | "jp7" | "seven_fold" | "7" => Ok(BodyFatMethod::JacksonPollock7),
            "jackson_pollock3" | "jp3" | "three_fold" | "3" => Ok(BodyFatMethod::JacksonPollock3),
            "navy" => Ok(BodyFatMethod::Navy),
            "manual" | "bioimpedance" => Ok(BodyFatMethod::Manual),
            _ => Err(format!("Invalid body fat method: {}", s)),
        }
    }
}

impl fmt::Display for BodyFatMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BodyFatMethod::JacksonPollock7 => write!(f, "Jackson-Pollock 7 sites"),
            BodyFatMethod::JacksonPollock3 => write!(f, "Jackson-Pollock 3 sites"),
            BodyFatMethod::Navy => write!(f, "US Navy"),
            BodyFatMethod::Manual => write!(f, "Manual"),
        }
    }
}

/// BMI reference bands (WHO)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BmiCategory {
    Underweight,    // < 18.5
    Normal,         // 18.5 to < 25
    Overweight,     // 25 to < 30
    ObesityGradeI,  // 30 to < 35
    ObesityGradeII, // 35 to < 40
    ObesityGradeIII,
}

impl BmiCategory {
    /// Clinical label shown to the user
    pub fn label(&self) -> &'static str {
        match self {
            BmiCategory::Underweight => "Abaixo do Peso",
            BmiCategory::Normal => "Peso Normal",
            BmiCategory::Overweight => "Sobrepeso",
            BmiCategory::ObesityGradeI => "Obesidade Grau I",
            BmiCategory::ObesityGradeII => "Obesidade Grau II",
            BmiCategory::ObesityGradeIII => "Obesidade Grau III",
        }
    }
}

impl fmt::Display for BmiCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Body fat percentage bands (American Council on Exercise)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BodyFatCategory {
    Essential,
    Athlete,
    Fitness,
    Average,
    Obese,
}

impl BodyFatCategory {
    pub fn label(&self) -> &'static str {
        match self {
            BodyFatCategory::Essential => "Gordura Essencial",
            BodyFatCategory::Athlete => "Atleta",
            BodyFatCategory::Fitness => "Boa Forma",
            BodyFatCategory::Average => "Média",
            BodyFatCategory::Obese => "Obesidade",
        }
    }
}

/// Cardiovascular risk from waist-to-hip ratio
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CardiovascularRisk {
    Low,
    Moderate,
    High,
}

impl CardiovascularRisk {
    pub fn label(&self) -> &'static str {
        match self {
            CardiovascularRisk::Low => "Risco Baixo",
            CardiovascularRisk::Moderate => "Risco Moderado",
            CardiovascularRisk::High => "Risco Alto",
        }
    }
}

/// Metrics derived from one set of measurements
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DerivedMetrics {
    /// Body Mass Index (kg/m²)
    pub bmi: Option<Decimal>,

    pub bmi_category: Option<BmiCategory>,

    /// Estimator that produced `body_fat_percentage`
    pub body_fat_method: BodyFatMethod,

    pub body_fat_percentage: Option<Decimal>,

    pub body_fat_category: Option<BodyFatCategory>,

    /// Fat mass in kilograms
    pub fat_mass: Option<Decimal>,

    /// Fat-free mass in kilograms
    pub lean_mass: Option<Decimal>,

    /// Basal metabolic rate (kcal/day)
    pub bmr: Option<u32>,

    pub sum_of_skinfolds: Option<Decimal>,

    pub waist_hip_ratio: Option<Decimal>,

    pub cardiovascular_risk: Option<CardiovascularRisk>,
}

/// A quantity that can be compared across assessments
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Metric {
    Weight,
    Height,
    Bmi,
    BodyFatPercentage,
    FatMass,
    LeanMass,
    Bmr,
    SumOfSkinfolds,
    WaistHipRatio,
    Skinfold(String),
    Circumference(String),
    PhysicalTest(String),
}

impl Metric {
    /// Stable string key, e.g. `weight`, `circumference.waist`, `test.push_ups`
    pub fn key(&self) -> String {
        match self {
            Metric::Weight => "weight".to_string(),
            Metric::Height => "height".to_string(),
            Metric::Bmi => "bmi".to_string(),
            Metric::BodyFatPercentage => "body_fat_percentage".to_string(),
            Metric::FatMass => "fat_mass".to_string(),
            Metric::LeanMass => "lean_mass".to_string(),
            Metric::Bmr => "bmr".to_string(),
            Metric::SumOfSkinfolds => "sum_of_skinfolds".to_string(),
            Metric::WaistHipRatio => "waist_hip_ratio".to_string(),
            Metric::Skinfold(site) => format!("skinfold.{}", site),
            Metric::Circumference(site) => format!("circumference.{}", site),
            Metric::PhysicalTest(name) => format!("test.{}", name),
        }
    }

    /// Unit suffix for display
    pub fn unit(&self) -> &'static str {
        match self {
            Metric::Weight | Metric::FatMass | Metric::LeanMass => "kg",
            Metric::Height | Metric::Circumference(_) => "cm",
            Metric::Bmi => "kg/m²",
            Metric::BodyFatPercentage => "%",
            Metric::Bmr => "kcal",
            Metric::SumOfSkinfolds | Metric::Skinfold(_) => "mm",
            Metric::WaistHipRatio | Metric::PhysicalTest(_) => "",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase();
        if let Some((group, name)) = key.split_once('.') {
            if name.is_empty() {
                return Err(format!("Missing metric name in: {}", s));
            }
            return match group {
                "skinfold" => Ok(Metric::Skinfold(name.to_string())),
                "circumference" => Ok(Metric::Circumference(name.to_string())),
                "test" => Ok(Metric::PhysicalTest(name.to_string())),
                _ => Err(format!("Unknown metric group: {}", group)),
            };
        }

        match key.as_str() {
            "weight" => Ok(Metric::Weight),
            "height" => Ok(Metric::Height),
            "bmi" => Ok(Metric::Bmi),
            "body_fat_percentage" | "body_fat" => Ok(Metric::BodyFatPercentage),
            "fat_mass" => Ok(Metric::FatMass),
            "lean_mass" => Ok(Metric::LeanMass),
            "bmr" => Ok(Metric::Bmr),
            "sum_of_skinfolds" => Ok(Metric::SumOfSkinfolds),
            "waist_hip_ratio" => Ok(Metric::WaistHipRatio),
            _ => Err(format!("Unknown metric: {}", s)),
        }
    }
}

/// One assessment: when it happened, what was measured and what was derived
///
/// Derived metrics are computed once at construction and never change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentSnapshot {
    id: Uuid,
    timestamp: DateTime<Utc>,
    measurements: Measurements,
    derived: DerivedMetrics,
}

impl AssessmentSnapshot {
    pub fn new(timestamp: DateTime<Utc>, measurements: Measurements, method: BodyFatMethod) -> Self {
        let derived = MetricsCalculator::derive(&measurements, method);
        AssessmentSnapshot {
            id: Uuid::new_v4(),
            timestamp,
            measurements,
            derived,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn measurements(&self) -> &Measurements {
        &self.measurements
    }

    pub fn derived(&self) -> &DerivedMetrics {
        &self.derived
    }

    /// Value of a metric in this snapshot, raw or derived
    pub fn value(&self, metric: &Metric) -> Option<Decimal> {
        let m = &self.measurements;
        let d = &self.derived;
        match metric {
            Metric::Weight => m.weight,
            Metric::Height => m.height,
            Metric::Bmi => d.bmi,
            Metric::BodyFatPercentage => d.body_fat_percentage,
            Metric::FatMass => d.fat_mass,
            Metric::LeanMass => d.lean_mass,
            Metric::Bmr => d.bmr.map(Decimal::from),
            Metric::SumOfSkinfolds => d.sum_of_skinfolds,
            Metric::WaistHipRatio => d.waist_hip_ratio,
            Metric::Skinfold(site) => m.skinfolds.get(site),
            Metric::Circumference(site) => m.circumferences.get(site),
            Metric::PhysicalTest(name) => m.physical_tests.get(&site_key(name)).copied(),
        }
    }

    /// Every metric with a value in this snapshot
    pub fn metrics(&self) -> Vec<Metric> {
        let fixed = [
            Metric::Weight,
            Metric::Height,
            Metric::Bmi,
            Metric::BodyFatPercentage,
            Metric::FatMass,
            Metric::LeanMass,
            Metric::Bmr,
            Metric::SumOfSkinfolds,
            Metric::WaistHipRatio,
        ];

        let skinfolds = self
            .measurements
            .skinfolds
            .iter()
            .map(|(site, _)| Metric::Skinfold(site.to_string()));
        let circumferences = self
            .measurements
            .circumferences
            .iter()
            .map(|(site, _)| Metric::Circumference(site.to_string()));
        let tests = self
            .measurements
            .physical_tests
            .keys()
            .map(|name| Metric::PhysicalTest(name.clone()));

        fixed
            .into_iter()
            .filter(|metric| self.value(metric).is_some())
            .chain(skinfolds)
            .chain(circumferences)
            .chain(tests)
            .collect()
    }
}

/// Time-ordered assessments of one subject
///
/// A read-only view assembled per analysis request; snapshots are kept in
/// ascending timestamp order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssessmentSeries {
    subject: Option<String>,
    snapshots: Vec<AssessmentSnapshot>,
}

impl AssessmentSeries {
    pub fn new(mut snapshots: Vec<AssessmentSnapshot>) -> Self {
        snapshots.sort_by_key(|s| s.timestamp);
        AssessmentSeries {
            subject: None,
            snapshots,
        }
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    pub fn snapshots(&self) -> &[AssessmentSnapshot] {
        &self.snapshots
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn latest(&self) -> Option<&AssessmentSnapshot> {
        self.snapshots.last()
    }

    /// The two most recent snapshots as (current, previous)
    pub fn latest_pair(&self) -> Option<(&AssessmentSnapshot, &AssessmentSnapshot)> {
        match self.snapshots.as_slice() {
            [.., previous, current] => Some((current, previous)),
            _ => None,
        }
    }

    /// One value per snapshot for the given metric, `None` where unmeasured
    pub fn values(&self, metric: &Metric) -> Vec<Option<Decimal>> {
        self.snapshots.iter().map(|s| s.value(metric)).collect()
    }

    /// Union of metrics present anywhere in the series, in key order
    pub fn metrics(&self) -> Vec<Metric> {
        self.snapshots
            .iter()
            .flat_map(|s| s.metrics())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, 9, 0, 0).unwrap()
    }

    fn measurements(weight: Decimal) -> Measurements {
        let mut m = Measurements {
            weight: Some(weight),
            height: Some(dec!(180)),
            age: Some(dec!(30)),
            sex: Some(Sex::Male),
            ..Measurements::default()
        };
        m.circumferences.set("waist", dec!(85));
        m.circumferences.set("neck", dec!(38));
        m.circumferences.set("arm_right", dec!(34));
        m
    }

    #[test]
    fn test_metric_keys_parse_back() {
        let metrics = vec![
            Metric::Weight,
            Metric::BodyFatPercentage,
            Metric::Skinfold("triceps".to_string()),
            Metric::Circumference("arm_right".to_string()),
            Metric::PhysicalTest("push_ups".to_string()),
        ];
        for metric in metrics {
            assert_eq!(metric.key().parse::<Metric>().unwrap(), metric);
        }
        assert!("unknown".parse::<Metric>().is_err());
        assert!("circumference.".parse::<Metric>().is_err());
    }

    #[test]
    fn test_sex_parsing() {
        assert_eq!("M".parse::<Sex>().unwrap(), Sex::Male);
        assert_eq!("feminino".parse::<Sex>().unwrap(), Sex::Female);
        assert!("x".parse::<Sex>().is_err());
    }

    #[test]
    fn test_snapshot_derives_on_construction() {
        let snapshot = AssessmentSnapshot::new(at(1), measurements(dec!(80)), BodyFatMethod::Navy);
        assert_eq!(snapshot.derived().bmi, Some(dec!(24.69)));
        assert_eq!(snapshot.value(&Metric::Bmi), Some(dec!(24.69)));
        assert!(snapshot.derived().body_fat_percentage.is_some());
        assert_eq!(
            snapshot.value(&Metric::Circumference("arm_right".to_string())),
            Some(dec!(34))
        );

        let metrics = snapshot.metrics();
        assert!(metrics.contains(&Metric::LeanMass));
        assert!(metrics.contains(&Metric::Circumference("waist".to_string())));
        assert!(!metrics.contains(&Metric::SumOfSkinfolds));
    }

    #[test]
    fn test_series_is_time_ordered() {
        let later = AssessmentSnapshot::new(at(20), measurements(dec!(78)), BodyFatMethod::Navy);
        let earlier = AssessmentSnapshot::new(at(1), measurements(dec!(80)), BodyFatMethod::Navy);
        let series = AssessmentSeries::new(vec![later, earlier]).with_subject("ana");

        assert_eq!(series.subject(), Some("ana"));
        assert_eq!(
            series.values(&Metric::Weight),
            vec![Some(dec!(80)), Some(dec!(78))]
        );

        let (current, previous) = series.latest_pair().unwrap();
        assert_eq!(current.measurements().weight, Some(dec!(78)));
        assert_eq!(previous.measurements().weight, Some(dec!(80)));
    }

    #[test]
    fn test_single_snapshot_has_no_pair() {
        let only = AssessmentSnapshot::new(at(1), measurements(dec!(80)), BodyFatMethod::Navy);
        let series = AssessmentSeries::new(vec![only]);
        assert!(series.latest_pair().is_none());
        assert_eq!(series.len(), 1);
    }

    #[test]
    fn test_measurements_deserialize_with_defaults() {
        let json = r#"{
            "weight": 72.5,
            "sex": "female",
            "skinfolds": { "triceps": 18 },
            "circumferences": { "waist": 70, "other": { "arm_left": 27 } }
        }"#;
        let m: Measurements = serde_json::from_str(json).unwrap();
        assert_eq!(m.weight, Some(dec!(72.5)));
        assert_eq!(m.sex, Some(Sex::Female));
        assert_eq!(m.skinfolds.triceps, Some(dec!(18)));
        assert_eq!(m.circumferences.get("arm_left"), Some(dec!(27)));
        assert!(m.height.is_none());
    }

    #[test]
    fn test_flat_girths_and_site_aliases() {
        let json = r#"{
            "skinfolds": { "mid_axillary": 11, "chest": 12 },
            "circumferences": { "Waist": 80, "arm_right": 34, "Braco_Direito": 35 },
            "physical_tests": { "Push_Ups": 20 }
        }"#;
        let m: Measurements = serde_json::from_str(json).unwrap();

        assert_eq!(m.skinfolds.midaxillary, Some(dec!(11)));
        assert_eq!(m.circumferences.waist, Some(dec!(80)));
        assert_eq!(m.circumferences.get("arm_right"), Some(dec!(34)));
        assert_eq!(m.circumferences.other.get("braco_direito"), Some(&dec!(35)));
        assert_eq!(m.physical_tests.get("push_ups"), Some(&dec!(20)));

        let flat = serde_json::to_value(&m.circumferences).unwrap();
        assert_eq!(flat["arm_right"], serde_json::json!("34"));
        assert!(flat.get("other").is_none());
        let back: Circumferences = serde_json::from_value(flat).unwrap();
        assert_eq!(back, m.circumferences);
    }

    #[test]
    fn test_mixed_case_sites_are_reachable() {
        let mut m = measurements(dec!(80));
        m.circumferences.set("Braco_Direito", dec!(35));
        m.set_physical_test("Push_Ups", dec!(20));
        let snapshot = AssessmentSnapshot::new(at(1), m, BodyFatMethod::Navy);

        let arm: Metric = "circumference.Braco_Direito".parse().unwrap();
        let test: Metric = "test.Push_Ups".parse().unwrap();
        assert_eq!(snapshot.value(&arm), Some(dec!(35)));
        assert_eq!(snapshot.value(&test), Some(dec!(20)));
        assert!(snapshot.metrics().contains(&arm));
        assert!(snapshot.metrics().contains(&test));
    }
}
