//! Feature engineering
//!
//! Derived columns computed from raw records before preprocessing, plus
//! the degree-2 polynomial expansion used by the numeric branch.

mod polynomial;

pub use polynomial::PolynomialFeatures;

use crate::dataset::{CellValue, Dataset, RawRecord};
use serde::{Deserialize, Serialize};

/// Body-mass index column
pub const BMI: &str = "BMI";
/// Frequent high-caloric food with regular vegetable intake
pub const HIGH_CALORIC: &str = "high_caloric";
/// Frequent physical activity with little screen time
pub const ACTIVE_LIFESTYLE: &str = "active_lifestyle";

/// Adds `BMI`, `high_caloric` and `active_lifestyle` to records.
///
/// Pure function of each record with no validation: missing or non-numeric
/// inputs make `BMI` NaN and the comparisons false.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureEngineer {
    enabled: bool,
}

impl Default for FeatureEngineer {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl FeatureEngineer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pass records through untouched
    pub fn disabled() -> Self {
        Self { enabled: false }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Names of the columns this step appends
    pub fn derived_columns(&self) -> Vec<&'static str> {
        if self.enabled {
            vec![BMI, HIGH_CALORIC, ACTIVE_LIFESTYLE]
        } else {
            Vec::new()
        }
    }

    /// Augment one record in place
    pub fn apply(&self, record: &mut RawRecord) {
        if !self.enabled {
            return;
        }
        let bmi = body_mass_index(record.get("Weight"), record.get("Height"));
        let high_caloric = record.get("FAVC") == &CellValue::Text("yes".to_string())
            && record.get("FCVC").as_f64_or_nan() > 2.0;
        let active = record.get("FAF").as_f64_or_nan() > 2.0 && record.get("TUE").as_f64_or_nan() < 2.0;

        record.insert(BMI, CellValue::Number(bmi));
        record.insert(HIGH_CALORIC, CellValue::Flag(high_caloric));
        record.insert(ACTIVE_LIFESTYLE, CellValue::Flag(active));
    }

    /// Augmented copy of one record
    pub fn transform_record(&self, record: &RawRecord) -> RawRecord {
        let mut out = record.clone();
        self.apply(&mut out);
        out
    }

    /// Augment every record and register the derived columns
    pub fn transform_dataset(&self, dataset: &Dataset) -> Dataset {
        let mut out = dataset.clone();
        for record in out.records_mut() {
            self.apply(record);
        }
        for name in self.derived_columns() {
            out.push_column(name);
        }
        out
    }
}

/// `Weight / Height²`; non-finite results collapse to NaN so they are imputed
fn body_mass_index(weight: &CellValue, height: &CellValue) -> f64 {
    let bmi = weight.as_f64_or_nan() / height.as_f64_or_nan().powi(2);
    if bmi.is_finite() {
        bmi
    } else {
        f64::NAN
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(favc: &str, fcvc: f64, faf: f64, tue: f64) -> RawRecord {
        RawRecord::new()
            .with("Weight", 70.0)
            .with("Height", 1.75)
            .with("FAVC", favc)
            .with("FCVC", fcvc)
            .with("FAF", faf)
            .with("TUE", tue)
    }

    #[test]
    fn test_bmi() {
        let out = FeatureEngineer::new().transform_record(&record("no", 2.0, 0.0, 1.0));
        let bmi = out.get(BMI).as_number().unwrap();
        assert!((bmi - 22.857).abs() < 1e-3);
    }

    #[test]
    fn test_high_caloric() {
        let fe = FeatureEngineer::new();
        assert_eq!(
            fe.transform_record(&record("yes", 3.0, 0.0, 1.0)).get(HIGH_CALORIC),
            &CellValue::Flag(true)
        );
        assert_eq!(
            fe.transform_record(&record("yes", 2.0, 0.0, 1.0)).get(HIGH_CALORIC),
            &CellValue::Flag(false)
        );
        assert_eq!(
            fe.transform_record(&record("no", 3.0, 0.0, 1.0)).get(HIGH_CALORIC),
            &CellValue::Flag(false)
        );
    }

    #[test]
    fn test_active_lifestyle() {
        let fe = FeatureEngineer::new();
        assert_eq!(
            fe.transform_record(&record("no", 2.0, 2.5, 1.0)).get(ACTIVE_LIFESTYLE),
            &CellValue::Flag(true)
        );
        assert_eq!(
            fe.transform_record(&record("no", 2.0, 2.5, 2.0)).get(ACTIVE_LIFESTYLE),
            &CellValue::Flag(false)
        );
    }

    #[test]
    fn test_missing_inputs_propagate() {
        let out = FeatureEngineer::new().transform_record(&RawRecord::new().with("FAVC", "yes"));
        assert!(out.get(BMI).is_missing());
        assert_eq!(out.get(HIGH_CALORIC), &CellValue::Flag(false));
        assert_eq!(out.get(ACTIVE_LIFESTYLE), &CellValue::Flag(false));
    }

    #[test]
    fn test_zero_height_is_missing() {
        let rec = RawRecord::new().with("Weight", 70.0).with("Height", 0.0);
        let out = FeatureEngineer::new().transform_record(&rec);
        assert!(out.get(BMI).is_missing());
    }

    #[test]
    fn test_disabled_is_identity() {
        let rec = record("yes", 3.0, 3.0, 0.0);
        assert_eq!(FeatureEngineer::disabled().transform_record(&rec), rec);
    }
}
