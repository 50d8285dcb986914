//! Column transformer turning raw records into a dense feature matrix

use super::{
    config::PreprocessingConfig,
    encoder::OneHotEncoder,
    imputer::{CategoricalImputer, Imputer},
    scaler::Scaler,
    ColumnType,
};
use crate::dataset::{CellValue, Dataset, RawRecord};
use crate::error::{ObesityError, Result};
use crate::feature_engineering::PolynomialFeatures;
use ndarray::{concatenate, Array2, Axis};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Main data preprocessing pipeline.
///
/// Numeric branch: impute, polynomial expand, scale. Categorical branch:
/// impute, one-hot. Output columns are `[numeric expanded, one-hot]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPreprocessor {
    config: PreprocessingConfig,
    numeric_columns: Vec<String>,
    categorical_columns: Vec<String>,
    numeric_imputer: Option<Imputer>,
    polynomial: Option<PolynomialFeatures>,
    scaler: Option<Scaler>,
    categorical_imputer: Option<CategoricalImputer>,
    encoder: Option<OneHotEncoder>,
    feature_names: Vec<String>,
    is_fitted: bool,
}

impl Default for DataPreprocessor {
    fn default() -> Self {
        Self::new()
    }
}

impl DataPreprocessor {
    /// Create a new preprocessor with default configuration
    pub fn new() -> Self {
        Self::with_config(PreprocessingConfig::default())
    }

    /// Create a new preprocessor with custom configuration
    pub fn with_config(config: PreprocessingConfig) -> Self {
        Self {
            config,
            numeric_columns: Vec::new(),
            categorical_columns: Vec::new(),
            numeric_imputer: None,
            polynomial: None,
            scaler: None,
            categorical_imputer: None,
            encoder: None,
            feature_names: Vec::new(),
            is_fitted: false,
        }
    }

    /// Decide whether a column is numeric: every non-missing value is a number
    pub fn detect_column_type(records: &[RawRecord], column: &str) -> ColumnType {
        let numeric = records.iter().all(|r| match r.get(column) {
            CellValue::Number(_) | CellValue::Missing => true,
            _ => false,
        });
        if numeric {
            ColumnType::Numeric
        } else {
            ColumnType::Categorical
        }
    }

    /// Fit every step on the dataset's columns
    pub fn fit(&mut self, dataset: &Dataset) -> Result<&mut Self> {
        let start = Instant::now();
        if dataset.is_empty() {
            return Err(ObesityError::PreprocessingError("Cannot fit on an empty dataset".to_string()));
        }

        let records = dataset.records();
        self.numeric_columns.clear();
        self.categorical_columns.clear();
        for column in dataset.columns() {
            match Self::detect_column_type(records, column) {
                ColumnType::Numeric => self.numeric_columns.push(column.clone()),
                ColumnType::Categorical => self.categorical_columns.push(column.clone()),
            }
        }

        let raw_numeric = self.extract_numeric(records)?;
        let mut imputer = Imputer::new(self.config.numeric_impute_strategy.clone());
        let imputed = imputer.fit_transform(raw_numeric.view())?;

        let mut numeric_names = self.numeric_columns.clone();
        let expanded = if self.config.polynomial_features {
            let mut poly = PolynomialFeatures::new();
            poly.fit(imputed.ncols());
            numeric_names = poly.feature_names(&numeric_names);
            let out = poly.transform(imputed.view())?;
            self.polynomial = Some(poly);
            out
        } else {
            self.polynomial = None;
            imputed
        };

        let mut scaler = Scaler::new(self.config.scaler_type.clone());
        scaler.fit(expanded.view())?;

        let raw_categorical = self.extract_categorical(records);
        let mut cat_imputer = CategoricalImputer::new();
        cat_imputer.fit(&raw_categorical)?;
        let filled = cat_imputer.transform(&raw_categorical)?;
        let mut encoder = OneHotEncoder::new();
        encoder.fit(&filled)?;

        self.feature_names = numeric_names;
        self.feature_names
            .extend(encoder.feature_names(&self.categorical_columns));

        self.numeric_imputer = Some(imputer);
        self.scaler = Some(scaler);
        self.categorical_imputer = Some(cat_imputer);
        self.encoder = Some(encoder);
        self.is_fitted = true;

        tracing::debug!(
            numeric = self.numeric_columns.len(),
            categorical = self.categorical_columns.len(),
            n_features_out = self.feature_names.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Fitted preprocessor"
        );
        Ok(self)
    }

    /// Transform records with the frozen statistics
    pub fn transform(&self, records: &[RawRecord]) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(ObesityError::ModelNotFitted);
        }
        let (Some(imputer), Some(scaler), Some(cat_imputer), Some(encoder)) = (
            &self.numeric_imputer,
            &self.scaler,
            &self.categorical_imputer,
            &self.encoder,
        ) else {
            return Err(ObesityError::ModelNotFitted);
        };

        let numeric = imputer.transform(self.extract_numeric(records)?.view())?;
        let numeric = match &self.polynomial {
            Some(poly) => poly.transform(numeric.view())?,
            None => numeric,
        };
        let numeric = scaler.transform(numeric.view())?;

        let categorical = cat_imputer.transform(&self.extract_categorical(records))?;
        let mut one_hot = encoder.transform(&categorical)?;
        if self.categorical_columns.is_empty() {
            one_hot = Array2::zeros((records.len(), 0));
        }

        Ok(concatenate(Axis(1), &[numeric.view(), one_hot.view()])?)
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, dataset: &Dataset) -> Result<Array2<f64>> {
        self.fit(dataset)?;
        self.transform(dataset.records())
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    pub fn numeric_columns(&self) -> &[String] {
        &self.numeric_columns
    }

    pub fn categorical_columns(&self) -> &[String] {
        &self.categorical_columns
    }

    /// Generated output feature names, in matrix column order
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn n_features_out(&self) -> usize {
        self.feature_names.len()
    }

    fn extract_numeric(&self, records: &[RawRecord]) -> Result<Array2<f64>> {
        let mut out = Array2::from_elem((records.len(), self.numeric_columns.len()), f64::NAN);
        for (i, record) in records.iter().enumerate() {
            for (j, column) in self.numeric_columns.iter().enumerate() {
                out[[i, j]] = numeric_cell(column, record.get(column))?;
            }
        }
        Ok(out)
    }

    fn extract_categorical(&self, records: &[RawRecord]) -> Vec<Vec<Option<String>>> {
        self.categorical_columns
            .iter()
            .map(|column| records.iter().map(|r| r.get(column).category_key()).collect())
            .collect()
    }
}

fn numeric_cell(column: &str, cell: &CellValue) -> Result<f64> {
    match cell {
        CellValue::Number(v) => Ok(*v),
        CellValue::Missing => Ok(f64::NAN),
        CellValue::Text(s) => s.trim().parse::<f64>().map_err(|_| ObesityError::InputTypeError {
            column: column.to_string(),
            value: s.clone(),
        }),
        CellValue::Flag(b) => Err(ObesityError::InputTypeError {
            column: column.to_string(),
            value: b.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset() -> Dataset {
        let columns = vec!["Age".to_string(), "Gender".to_string(), "SMOKE".to_string()];
        let records = vec![
            RawRecord::new().with("Age", 20.0).with("Gender", "Male").with("SMOKE", false),
            RawRecord::new().with("Age", 30.0).with("Gender", "Female").with("SMOKE", true),
            RawRecord::new().with("Gender", "Female").with("SMOKE", false),
            RawRecord::new().with("Age", 40.0).with("SMOKE", false),
        ];
        let labels = vec!["a", "b", "a", "b"].into_iter().map(String::from).collect();
        Dataset::new(columns, records, labels).unwrap()
    }

    #[test]
    fn test_column_typing() {
        let mut pre = DataPreprocessor::new();
        pre.fit(&dataset()).unwrap();
        assert_eq!(pre.numeric_columns(), &["Age"]);
        assert_eq!(pre.categorical_columns(), &["Gender", "SMOKE"]);
    }

    #[test]
    fn test_output_layout() {
        let mut pre = DataPreprocessor::new();
        let x = pre.fit_transform(&dataset()).unwrap();
        // Age, Age^2, Gender_{Female,Male}, SMOKE_{False,True}
        assert_eq!(x.ncols(), 6);
        assert_eq!(
            pre.feature_names(),
            &["Age", "Age^2", "Gender_Female", "Gender_Male", "SMOKE_False", "SMOKE_True"]
        );
        // missing Gender imputed to most frequent "Female"
        assert_eq!(x[[3, 2]], 1.0);
    }

    #[test]
    fn test_transform_is_idempotent() {
        let ds = dataset();
        let mut pre = DataPreprocessor::new();
        pre.fit(&ds).unwrap();
        let a = pre.transform(ds.records()).unwrap();
        let b = pre.transform(ds.records()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_absent_column_imputed_and_extra_ignored() {
        let mut pre = DataPreprocessor::new();
        pre.fit(&dataset()).unwrap();
        let record = RawRecord::new().with("Gender", "Male").with("Unrelated", 1.0);
        let x = pre.transform(&[record]).unwrap();
        assert_eq!(x.ncols(), 6);
        assert!(x.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_missing_category_filled_with_most_frequent() {
        let mut pre = DataPreprocessor::new();
        pre.fit(&dataset()).unwrap();
        let record = RawRecord::new().with("Age", 25.0).with("SMOKE", true);
        let x = pre.transform(&[record]).unwrap();
        // Gender_Female, Gender_Male
        assert_eq!(x[[0, 2]], 1.0);
        assert_eq!(x[[0, 3]], 0.0);
    }

    #[test]
    fn test_non_numeric_value_is_input_type_error() {
        let mut pre = DataPreprocessor::new();
        pre.fit(&dataset()).unwrap();
        let record = RawRecord::new().with("Age", "abc");
        assert!(matches!(
            pre.transform(&[record]),
            Err(ObesityError::InputTypeError { .. })
        ));
        let record = RawRecord::new().with("Age", "25");
        assert!(pre.transform(&[record]).is_ok());
    }

    #[test]
    fn test_unfitted_transform() {
        let pre = DataPreprocessor::new();
        assert!(matches!(pre.transform(&[]), Err(ObesityError::ModelNotFitted)));
    }
}
