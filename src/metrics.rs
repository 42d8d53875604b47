//! Body composition metrics module
//!
//! Derives physiological metrics from raw anthropometric measurements and
//! classifies them against clinical reference bands:
//!
//! - BMI and its WHO category
//! - Body fat percentage (Jackson-Pollock 7 and 3 sites with the Siri
//!   equation, US Navy circumference method, or a measured value)
//! - Fat mass and lean mass
//! - Basal metabolic rate (revised Harris-Benedict)
//! - Waist-to-hip ratio and cardiovascular risk
//!
//! Every calculation has a `try_*` form that explains why a metric is
//! unavailable, and a plain form that returns `None` instead. Nothing here
//! panics or propagates NaN: numeric domains are checked before evaluating
//! a formula.

use rust_decimal::prelude::*;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use tracing::debug;

use crate::error::CalculationError;
use crate::models::{
    BmiCategory, BodyFatCategory, BodyFatMethod, CardiovascularRisk, Circumferences,
    DerivedMetrics, Measurements, Sex, Skinfolds,
};

const BMI: &str = "BMI";
const FAT_MASS: &str = "fat mass";
const LEAN_MASS: &str = "lean mass";
const BMR: &str = "BMR";
const SEVEN_FOLD: &str = "Jackson-Pollock 7-site body fat";
const THREE_FOLD: &str = "Jackson-Pollock 3-site body fat";
const NAVY: &str = "Navy body fat";
const MANUAL: &str = "measured body fat";
const WAIST_HIP: &str = "waist-to-hip ratio";

/// Round half away from zero to `dp` decimal places
pub fn round_dp(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

fn round2(value: Decimal) -> Decimal {
    round_dp(value, 2)
}

fn require_positive(
    value: Option<Decimal>,
    calculation: &'static str,
    field: &'static str,
) -> Result<Decimal, CalculationError> {
    let value = value.ok_or_else(|| CalculationError::missing(calculation, field))?;
    if value <= Decimal::ZERO {
        return Err(CalculationError::domain(
            calculation,
            format!("{} must be positive, got {}", field, value),
        ));
    }
    Ok(value)
}

fn require_percentage(
    value: Option<Decimal>,
    calculation: &'static str,
) -> Result<Decimal, CalculationError> {
    let value = value.ok_or_else(|| CalculationError::missing(calculation, "body fat percentage"))?;
    if value < Decimal::ZERO || value > dec!(100) {
        return Err(CalculationError::domain(
            calculation,
            format!("body fat percentage must be within 0-100, got {}", value),
        ));
    }
    Ok(value)
}

fn require_sex(sex: Option<Sex>, calculation: &'static str) -> Result<Sex, CalculationError> {
    sex.ok_or_else(|| CalculationError::missing(calculation, "sex"))
}

fn to_f64(value: Decimal, calculation: &'static str) -> Result<f64, CalculationError> {
    value
        .to_f64()
        .ok_or_else(|| CalculationError::domain(calculation, "value not representable"))
}

fn from_f64(value: f64, calculation: &'static str) -> Result<Decimal, CalculationError> {
    if !value.is_finite() {
        return Err(CalculationError::domain(calculation, "result is not finite"));
    }
    Decimal::from_f64(value)
        .ok_or_else(|| CalculationError::domain(calculation, "result out of range"))
}

fn out_of_range(calculation: &'static str) -> CalculationError {
    CalculationError::domain(calculation, "result out of range")
}

/// Turn a failed calculation into an absent metric
fn available<T>(result: Result<T, CalculationError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            debug!(calculation = err.calculation(), reason = %err, "Metric unavailable");
            None
        }
    }
}

/// Sum the folds at `sites`; unmeasured sites count as zero
fn sum_sites(
    folds: &Skinfolds,
    sites: &[&'static str],
    calculation: &'static str,
) -> Result<Decimal, CalculationError> {
    let mut sum = Decimal::ZERO;
    let mut unmeasured = Vec::new();

    for &site in sites {
        match folds.get(site) {
            Some(value) if value < Decimal::ZERO => {
                return Err(CalculationError::domain(
                    calculation,
                    format!("{} skinfold must not be negative, got {}", site, value),
                ));
            }
            Some(value) => {
                sum = sum.checked_add(value).ok_or_else(|| out_of_range(calculation))?;
            }
            None => unmeasured.push(site),
        }
    }

    if unmeasured.len() == sites.len() {
        return Err(CalculationError::missing(calculation, "skinfolds"));
    }
    if !unmeasured.is_empty() {
        debug!(calculation, missing = ?unmeasured, "Unmeasured skinfolds counted as zero");
    }

    Ok(sum)
}

/// Siri equation: body density (g/cm³) to body fat percentage
fn siri(density: f64, calculation: &'static str) -> Result<Decimal, CalculationError> {
    if !(density > 0.0) {
        return Err(CalculationError::domain(
            calculation,
            format!("body density must be positive, got {}", density),
        ));
    }
    let body_fat = (4.95 / density - 4.5) * 100.0;
    Ok(round2(from_f64(body_fat, calculation)?))
}

/// Stateless calculator for derived body composition metrics
pub struct MetricsCalculator;

impl MetricsCalculator {
    /// Body Mass Index: weight / (height/100)², rounded to 2 decimals
    ///
    /// # Arguments
    /// * `weight` - Body weight in kilograms
    /// * `height` - Height in centimetres
    pub fn try_compute_bmi(
        weight: Option<Decimal>,
        height: Option<Decimal>,
    ) -> Result<Decimal, CalculationError> {
        let weight = require_positive(weight, BMI, "weight")?;
        let height = require_positive(height, BMI, "height")?;

        let height_m = height / dec!(100);
        height_m
            .checked_mul(height_m)
            .and_then(|h2| weight.checked_div(h2))
            .map(round2)
            .ok_or_else(|| out_of_range(BMI))
    }

    pub fn compute_bmi(weight: Option<Decimal>, height: Option<Decimal>) -> Option<Decimal> {
        available(Self::try_compute_bmi(weight, height))
    }

    /// WHO BMI category; lower bounds are inclusive (18.5 is normal weight)
    pub fn classify_bmi(bmi: Option<Decimal>) -> Option<BmiCategory> {
        let bmi = bmi?;
        let category = if bmi < dec!(18.5) {
            BmiCategory::Underweight
        } else if bmi < dec!(25) {
            BmiCategory::Normal
        } else if bmi < dec!(30) {
            BmiCategory::Overweight
        } else if bmi < dec!(35) {
            BmiCategory::ObesityGradeI
        } else if bmi < dec!(40) {
            BmiCategory::ObesityGradeII
        } else {
            BmiCategory::ObesityGradeIII
        };
        Some(category)
    }

    /// Label for a BMI value, empty when the BMI is unknown
    pub fn bmi_label(bmi: Option<Decimal>) -> &'static str {
        Self::classify_bmi(bmi).map_or("", |c| c.label())
    }

    /// Fat mass: weight × body fat / 100, rounded to 2 decimals
    pub fn try_compute_fat_mass(
        weight: Option<Decimal>,
        body_fat_pct: Option<Decimal>,
    ) -> Result<Decimal, CalculationError> {
        let weight = require_positive(weight, FAT_MASS, "weight")?;
        let body_fat_pct = require_percentage(body_fat_pct, FAT_MASS)?;
        weight
            .checked_mul(body_fat_pct)
            .and_then(|product| product.checked_div(dec!(100)))
            .map(round2)
            .ok_or_else(|| out_of_range(FAT_MASS))
    }

    pub fn compute_fat_mass(weight: Option<Decimal>, body_fat_pct: Option<Decimal>) -> Option<Decimal> {
        available(Self::try_compute_fat_mass(weight, body_fat_pct))
    }

    /// Lean mass: weight × (1 − body fat / 100)
    ///
    /// Taken as the remainder of the rounded weight after fat mass, so lean
    /// mass and fat mass always add back up to the weight.
    pub fn try_compute_lean_mass(
        weight: Option<Decimal>,
        body_fat_pct: Option<Decimal>,
    ) -> Result<Decimal, CalculationError> {
        let fat_mass = Self::try_compute_fat_mass(weight, body_fat_pct)
            .map_err(|err| match err {
                CalculationError::MissingInput { field, .. } => {
                    CalculationError::missing(LEAN_MASS, field)
                }
                CalculationError::InvalidDomain { reason, .. } => {
                    CalculationError::domain(LEAN_MASS, reason)
                }
                other => other,
            })?;
        let weight = require_positive(weight, LEAN_MASS, "weight")?;
        Ok(round2(weight) - fat_mass)
    }

    pub fn compute_lean_mass(weight: Option<Decimal>, body_fat_pct: Option<Decimal>) -> Option<Decimal> {
        available(Self::try_compute_lean_mass(weight, body_fat_pct))
    }

    /// Basal metabolic rate, revised Harris-Benedict (Roza & Shizgal 1984)
    ///
    /// - Male: 88.362 + 13.397×W + 4.799×H − 5.677×A
    /// - Female: 447.593 + 9.247×W + 3.098×H − 4.330×A
    ///
    /// W in kg, H in cm, A in years; result in kcal/day rounded to an integer.
    pub fn try_compute_bmr(
        weight: Option<Decimal>,
        height: Option<Decimal>,
        age: Option<Decimal>,
        sex: Option<Sex>,
    ) -> Result<u32, CalculationError> {
        let weight = require_positive(weight, BMR, "weight")?;
        let height = require_positive(height, BMR, "height")?;
        let age = require_positive(age, BMR, "age")?;
        let sex = require_sex(sex, BMR)?;

        let (base, w, h, a) = match sex {
            Sex::Male => (dec!(88.362), dec!(13.397), dec!(4.799), dec!(5.677)),
            Sex::Female => (dec!(447.593), dec!(9.247), dec!(3.098), dec!(4.330)),
        };

        let bmr = [weight.checked_mul(w), height.checked_mul(h), age.checked_mul(a)];
        let [Some(w_term), Some(h_term), Some(a_term)] = bmr else {
            return Err(CalculationError::domain(BMR, "input out of range"));
        };

        let bmr = base
            .checked_add(w_term)
            .and_then(|sum| sum.checked_add(h_term))
            .and_then(|sum| sum.checked_sub(a_term))
            .map(|sum| round_dp(sum, 0))
            .ok_or_else(|| out_of_range(BMR))?;
        if bmr <= Decimal::ZERO {
            return Err(CalculationError::domain(
                BMR,
                format!("estimate is not positive ({})", bmr),
            ));
        }
        bmr.to_u32().ok_or_else(|| out_of_range(BMR))
    }

    pub fn compute_bmr(
        weight: Option<Decimal>,
        height: Option<Decimal>,
        age: Option<Decimal>,
        sex: Option<Sex>,
    ) -> Option<u32> {
        available(Self::try_compute_bmr(weight, height, age, sex))
    }

    /// Body fat from seven skinfolds (Jackson-Pollock) and the Siri equation
    ///
    /// Density, with S the sum of the seven folds in mm and A the age:
    /// - Male: 1.112 − 0.00043499×S + 0.00000055×S² − 0.00028826×A
    /// - Female: 1.097 − 0.00046971×S + 0.00000056×S² − 0.00012828×A
    ///
    /// Unmeasured folds count as zero, which underestimates body fat; supply
    /// all seven sites for a valid estimate.
    pub fn try_compute_body_fat_seven_fold(
        folds: &Skinfolds,
        age: Option<Decimal>,
        sex: Option<Sex>,
    ) -> Result<Decimal, CalculationError> {
        let sex = require_sex(sex, SEVEN_FOLD)?;
        let age = to_f64(require_positive(age, SEVEN_FOLD, "age")?, SEVEN_FOLD)?;
        let s = to_f64(sum_sites(folds, &Skinfolds::SITES, SEVEN_FOLD)?, SEVEN_FOLD)?;

        let density = match sex {
            Sex::Male => 1.112 - 0.00043499 * s + 0.00000055 * s * s - 0.00028826 * age,
            Sex::Female => 1.097 - 0.00046971 * s + 0.00000056 * s * s - 0.00012828 * age,
        };
        siri(density, SEVEN_FOLD)
    }

    pub fn compute_body_fat_seven_fold(
        folds: &Skinfolds,
        age: Option<Decimal>,
        sex: Option<Sex>,
    ) -> Option<Decimal> {
        available(Self::try_compute_body_fat_seven_fold(folds, age, sex))
    }

    /// Skinfold sites of the three-site protocol for each sex
    pub fn three_fold_sites(sex: Sex) -> [&'static str; 3] {
        match sex {
            Sex::Male => ["chest", "abdominal", "thigh"],
            Sex::Female => ["triceps", "suprailiac", "thigh"],
        }
    }

    /// Body fat from three skinfolds (Jackson-Pollock) and the Siri equation
    ///
    /// - Male (chest, abdominal, thigh): 1.10938 − 0.0008267×S + 0.0000016×S² − 0.0002574×A
    /// - Female (triceps, suprailiac, thigh): 1.099421 − 0.0009929×S + 0.0000023×S² − 0.0001392×A
    pub fn try_compute_body_fat_three_fold(
        folds: &Skinfolds,
        age: Option<Decimal>,
        sex: Option<Sex>,
    ) -> Result<Decimal, CalculationError> {
        let sex = require_sex(sex, THREE_FOLD)?;
        let age = to_f64(require_positive(age, THREE_FOLD, "age")?, THREE_FOLD)?;
        let sites = Self::three_fold_sites(sex);
        let s = to_f64(sum_sites(folds, &sites, THREE_FOLD)?, THREE_FOLD)?;

        let density = match sex {
            Sex::Male => 1.10938 - 0.0008267 * s + 0.0000016 * s * s - 0.0002574 * age,
            Sex::Female => 1.099421 - 0.0009929 * s + 0.0000023 * s * s - 0.0001392 * age,
        };
        siri(density, THREE_FOLD)
    }

    pub fn compute_body_fat_three_fold(
        folds: &Skinfolds,
        age: Option<Decimal>,
        sex: Option<Sex>,
    ) -> Option<Decimal> {
        available(Self::try_compute_body_fat_three_fold(folds, age, sex))
    }

    /// Body fat from circumferences (US Navy), all girths and height in cm
    ///
    /// ```text
    /// Male:   495 / (1.0324 − 0.19077×log10(waist − neck) + 0.15456×log10(height)) − 450
    /// Female: 495 / (1.29579 − 0.35004×log10(waist + hip − neck) + 0.22100×log10(height)) − 450
    /// ```
    ///
    /// Fails when the logarithm argument is not positive (e.g. waist ≤ neck).
    pub fn try_compute_body_fat_navy(
        circumferences: &Circumferences,
        height: Option<Decimal>,
        sex: Option<Sex>,
    ) -> Result<Decimal, CalculationError> {
        let sex = require_sex(sex, NAVY)?;
        let height = require_positive(height, NAVY, "height")?;
        let waist = require_positive(circumferences.waist, NAVY, "waist")?;
        let neck = require_positive(circumferences.neck, NAVY, "neck")?;

        let girth = match sex {
            Sex::Male => waist.checked_sub(neck),
            Sex::Female => {
                let hip = require_positive(circumferences.hip, NAVY, "hip")?;
                waist.checked_add(hip).and_then(|sum| sum.checked_sub(neck))
            }
        }
        .ok_or_else(|| out_of_range(NAVY))?;
        if girth <= Decimal::ZERO {
            return Err(CalculationError::domain(
                NAVY,
                format!("girth difference must be positive, got {}", girth),
            ));
        }

        let girth = to_f64(girth, NAVY)?;
        let height = to_f64(height, NAVY)?;
        let denominator = match sex {
            Sex::Male => 1.0324 - 0.19077 * girth.log10() + 0.15456 * height.log10(),
            Sex::Female => 1.29579 - 0.35004 * girth.log10() + 0.22100 * height.log10(),
        };
        if !(denominator > 0.0) {
            return Err(CalculationError::domain(
                NAVY,
                format!("density term must be positive, got {}", denominator),
            ));
        }

        Ok(round2(from_f64(495.0 / denominator - 450.0, NAVY)?))
    }

    pub fn compute_body_fat_navy(
        circumferences: &Circumferences,
        height: Option<Decimal>,
        sex: Option<Sex>,
    ) -> Option<Decimal> {
        available(Self::try_compute_body_fat_navy(circumferences, height, sex))
    }

    /// Body fat percentage using the chosen estimator
    pub fn try_compute_body_fat(
        measurements: &Measurements,
        method: BodyFatMethod,
    ) -> Result<Decimal, CalculationError> {
        let m = measurements;
        match method {
            BodyFatMethod::JacksonPollock7 => {
                Self::try_compute_body_fat_seven_fold(&m.skinfolds, m.age, m.sex)
            }
            BodyFatMethod::JacksonPollock3 => {
                Self::try_compute_body_fat_three_fold(&m.skinfolds, m.age, m.sex)
            }
            BodyFatMethod::Navy => Self::try_compute_body_fat_navy(&m.circumferences, m.height, m.sex),
            BodyFatMethod::Manual => require_percentage(m.body_fat_percentage, MANUAL).map(round2),
        }
    }

    pub fn compute_body_fat(measurements: &Measurements, method: BodyFatMethod) -> Option<Decimal> {
        available(Self::try_compute_body_fat(measurements, method))
    }

    /// ACE body fat category; lower bounds are inclusive
    ///
    /// | category | male | female |
    /// |---|---|---|
    /// | Essential | < 6 | < 14 |
    /// | Athlete | 6–13 | 14–20 |
    /// | Fitness | 14–17 | 21–24 |
    /// | Average | 18–24 | 25–31 |
    /// | Obese | 25+ | 32+ |
    pub fn classify_body_fat(body_fat_pct: Option<Decimal>, sex: Option<Sex>) -> Option<BodyFatCategory> {
        let pct = body_fat_pct?;
        let [athlete, fitness, average, obese] = match sex? {
            Sex::Male => [dec!(6), dec!(14), dec!(18), dec!(25)],
            Sex::Female => [dec!(14), dec!(21), dec!(25), dec!(32)],
        };

        let category = if pct < athlete {
            BodyFatCategory::Essential
        } else if pct < fitness {
            BodyFatCategory::Athlete
        } else if pct < average {
            BodyFatCategory::Fitness
        } else if pct < obese {
            BodyFatCategory::Average
        } else {
            BodyFatCategory::Obese
        };
        Some(category)
    }

    /// Sum of all measured skinfolds in mm
    pub fn sum_of_skinfolds(folds: &Skinfolds) -> Option<Decimal> {
        if folds.is_empty() {
            return None;
        }
        let sum = folds
            .iter()
            .try_fold(Decimal::ZERO, |sum, (_, value)| sum.checked_add(value));
        if sum.is_none() {
            debug!("Sum of skinfolds out of range");
        }
        sum.map(round2)
    }

    /// Waist circumference divided by hip circumference, 2 decimals
    pub fn try_compute_waist_hip_ratio(
        waist: Option<Decimal>,
        hip: Option<Decimal>,
    ) -> Result<Decimal, CalculationError> {
        let waist = require_positive(waist, WAIST_HIP, "waist")?;
        let hip = require_positive(hip, WAIST_HIP, "hip")?;
        waist
            .checked_div(hip)
            .map(round2)
            .ok_or_else(|| out_of_range(WAIST_HIP))
    }

    pub fn compute_waist_hip_ratio(waist: Option<Decimal>, hip: Option<Decimal>) -> Option<Decimal> {
        available(Self::try_compute_waist_hip_ratio(waist, hip))
    }

    /// WHO waist-to-hip cardiovascular risk bands
    ///
    /// Male: < 0.90 low, < 1.00 moderate, else high.
    /// Female: < 0.80 low, < 0.85 moderate, else high.
    pub fn classify_waist_hip_ratio(ratio: Option<Decimal>, sex: Option<Sex>) -> Option<CardiovascularRisk> {
        let ratio = ratio?;
        let (low, moderate) = match sex? {
            Sex::Male => (dec!(0.90), dec!(1.00)),
            Sex::Female => (dec!(0.80), dec!(0.85)),
        };

        let risk = if ratio < low {
            CardiovascularRisk::Low
        } else if ratio < moderate {
            CardiovascularRisk::Moderate
        } else {
            CardiovascularRisk::High
        };
        Some(risk)
    }

    /// Compute every derived metric available from `measurements`
    pub fn derive(measurements: &Measurements, method: BodyFatMethod) -> DerivedMetrics {
        let m = measurements;

        let bmi = Self::compute_bmi(m.weight, m.height);
        let body_fat_percentage = Self::compute_body_fat(m, method);
        let waist_hip_ratio = Self::compute_waist_hip_ratio(m.circumferences.waist, m.circumferences.hip);

        DerivedMetrics {
            bmi,
            bmi_category: Self::classify_bmi(bmi),
            body_fat_method: method,
            body_fat_percentage,
            body_fat_category: Self::classify_body_fat(body_fat_percentage, m.sex),
            fat_mass: Self::compute_fat_mass(m.weight, body_fat_percentage),
            lean_mass: Self::compute_lean_mass(m.weight, body_fat_percentage),
            bmr: Self::compute_bmr(m.weight, m.height, m.age, m.sex),
            sum_of_skinfolds: Self::sum_of_skinfolds(&m.skinfolds),
            waist_hip_ratio,
            cardiovascular_risk: Self::classify_waist_hip_ratio(waist_hip_ratio, m.sex),
        }
    }
}
