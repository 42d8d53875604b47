use bodyrs::import::ImportManager;
use bodyrs::{
    AppConfig, AssessmentSeries, AssessmentSnapshot, BodyFatMethod, Measurements, Metric,
    MetricsCalculator, Polarity, ProgressAnalyzer, Sex, TrendDirection, VariationClass,
};
use chrono::{TimeZone, Utc};
use rust_decimal_macros::dec;
use std::fs;

/// Integration tests that exercise complete assessment workflows

#[cfg(test)]
mod integration_tests {
    use super::*;
    use rust_decimal::Decimal;

    fn create_measurements(weight: Decimal, waist: Decimal) -> Measurements {
        let mut m = Measurements {
            weight: Some(weight),
            height: Some(dec!(180)),
            age: Some(dec!(30)),
            sex: Some(Sex::Male),
            ..Measurements::default()
        };
        m.circumferences.waist = Some(waist);
        m.circumferences.neck = Some(dec!(38));
        m.circumferences.hip = Some(dec!(100));
        m.circumferences.set("arm_right", dec!(34));
        m
    }

    fn create_series() -> AssessmentSeries {
        let snapshots = [(1, dec!(82), dec!(88)), (2, dec!(80), dec!(86)), (3, dec!(78), dec!(85))]
            .into_iter()
            .map(|(month, weight, waist)| {
                AssessmentSnapshot::new(
                    Utc.with_ymd_and_hms(2024, month, 1, 8, 0, 0).unwrap(),
                    create_measurements(weight, waist),
                    BodyFatMethod::Navy,
                )
            })
            .collect();
        AssessmentSeries::new(snapshots)
    }

    /// Single assessment from raw inputs to every derived metric
    #[test]
    fn test_complete_metrics_workflow() {
        let m = create_measurements(dec!(80), dec!(85));
        let derived = MetricsCalculator::derive(&m, BodyFatMethod::Navy);

        assert_eq!(derived.bmi, Some(dec!(24.69)));
        assert_eq!(MetricsCalculator::bmi_label(derived.bmi), "Peso Normal");
        assert_eq!(derived.bmr, Some(1854));

        let bf = derived.body_fat_percentage.unwrap();
        assert!(bf > dec!(15) && bf < dec!(17));
        assert_eq!(derived.fat_mass.unwrap() + derived.lean_mass.unwrap(), dec!(80));
        assert_eq!(derived.waist_hip_ratio, Some(dec!(0.85)));
    }

    /// Comparing the two latest assessments classifies each change by polarity
    #[test]
    fn test_progress_comparison_workflow() {
        let series = create_series();
        let analyzer = ProgressAnalyzer::new();

        let comparisons = analyzer.compare_latest(&series).unwrap();
        let weight = comparisons.iter().find(|c| c.metric == "weight").unwrap();
        assert_eq!(weight.previous, Some(dec!(80)));
        assert_eq!(weight.current, Some(dec!(78)));
        assert_eq!(weight.variation, Some(dec!(-2.5)));
        assert_eq!(weight.class, VariationClass::Favorable);

        // Unchanged arm circumference is neutral
        let arm = comparisons
            .iter()
            .find(|c| c.metric == "circumference.arm_right")
            .unwrap();
        assert_eq!(arm.variation, Some(dec!(0.0)));
        assert_eq!(arm.class, VariationClass::Neutral);

        // Lean mass drops as weight drops
        let lean = comparisons.iter().find(|c| c.metric == "lean_mass").unwrap();
        assert_eq!(lean.class, VariationClass::Unfavorable);
    }

    /// Trend and summary across the full series
    #[test]
    fn test_trend_and_summary_workflow() {
        let series = create_series();

        let trend = ProgressAnalyzer::trend_for(&series, &Metric::Weight);
        assert_eq!(trend, vec![dec!(82), dec!(80), dec!(78)]);

        let line = ProgressAnalyzer::try_fit_line(&series.values(&Metric::Weight)).unwrap();
        assert_eq!(line.direction(), TrendDirection::Decreasing);

        let summary = ProgressAnalyzer::summary_for(&series, &Metric::Weight);
        assert_eq!(summary.count, 3);
        assert_eq!(summary.min, Some(dec!(78)));
        assert_eq!(summary.max, Some(dec!(82)));
        assert_eq!(summary.mean, Some(dec!(80)));
        assert_eq!(summary.latest, Some(dec!(78)));
        assert_eq!(summary.change_from_previous, dec!(-2.5));
    }

    /// Polarity overrides from configuration flip the classification
    #[test]
    fn test_configured_polarity_override() {
        let mut config = AppConfig::default();
        config.set_value("progress.polarity.weight", "higher").unwrap();

        let analyzer = ProgressAnalyzer::with_config(config.progress.clone());
        assert_eq!(analyzer.polarity(&Metric::Weight), Polarity::HigherIsBetter);
        assert_eq!(
            analyzer.classify_variation(&Metric::Weight, Some(dec!(-2.5))),
            VariationClass::Unfavorable
        );
    }

    /// JSON history file loaded, derived and compared
    #[test]
    fn test_json_import_workflow() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("history.json");
        fs::write(
            &path,
            r#"{
                "subject": "Ana",
                "body_fat_method": "manual",
                "assessments": [
                    {
                        "timestamp": "2024-03-01T09:00:00Z",
                        "measurements": { "weight": 62, "height": 165, "body_fat_percentage": 24 }
                    },
                    {
                        "timestamp": "2024-01-01T09:00:00Z",
                        "measurements": { "weight": 64, "height": 165, "body_fat_percentage": 26 }
                    }
                ]
            }"#,
        )
        .unwrap();

        let series = ImportManager::new()
            .load_series(&path, BodyFatMethod::JacksonPollock7)
            .unwrap();

        assert_eq!(series.subject(), Some("Ana"));
        assert_eq!(series.len(), 2);
        assert_eq!(
            series.values(&Metric::BodyFatPercentage),
            vec![Some(dec!(26)), Some(dec!(24))]
        );

        let (current, previous) = series.latest_pair().unwrap();
        let comparison = ProgressAnalyzer::new().compare_metric(&Metric::FatMass, current, previous);
        assert_eq!(comparison.previous, Some(dec!(16.64)));
        assert_eq!(comparison.current, Some(dec!(14.88)));
        assert_eq!(comparison.class, VariationClass::Favorable);
    }

    /// CSV history file with localized headers
    #[test]
    fn test_csv_import_workflow() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("history.csv");
        fs::write(
            &path,
            "data,peso,altura,idade,sexo,circumference.waist,circumference.neck\n\
             2024-01-15,90,175,40,M,100,40\n\
             2024-02-15,87,175,40,M,97,40\n",
        )
        .unwrap();

        let series = ImportManager::new()
            .load_series(&path, BodyFatMethod::Navy)
            .unwrap();
        assert_eq!(series.len(), 2);

        let body_fat = series.values(&Metric::BodyFatPercentage);
        assert!(body_fat.iter().all(Option::is_some));
        assert!(body_fat[1] < body_fat[0]);

        let comparisons = ProgressAnalyzer::new().compare_latest(&series).unwrap();
        let waist = comparisons
            .iter()
            .find(|c| c.metric == "circumference.waist")
            .unwrap();
        assert_eq!(waist.variation, Some(dec!(-3.0)));
        assert_eq!(waist.class, VariationClass::Favorable);
    }

    #[test]
    fn test_single_assessment_has_nothing_to_compare() {
        let series = AssessmentSeries::new(vec![AssessmentSnapshot::new(
            Utc::now(),
            create_measurements(dec!(80), dec!(85)),
            BodyFatMethod::Navy,
        )]);

        assert!(series.latest_pair().is_none());
        assert!(ProgressAnalyzer::new().compare_latest(&series).is_none());
        assert!(ProgressAnalyzer::trend_for(&series, &Metric::Weight).is_empty());
    }
}
