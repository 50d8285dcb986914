//! Raw record schema and in-memory datasets
//!
//! A record maps column names to loosely typed cells, mirroring what a CSV
//! row or a JSON request body carries before any preprocessing. Column
//! order is tracked on the [`Dataset`] so downstream transformers produce
//! features in a stable order.

use crate::error::{ObesityError, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

mod sample;

pub use sample::generate_sample_dataset;

/// Name of the label column in the training data
pub const LABEL_COLUMN: &str = "NObeyesdad";

/// The 16 raw input fields, in canonical order
pub const RAW_FEATURES: [&str; 16] = [
    "Gender",
    "Age",
    "Height",
    "Weight",
    "family_history_with_overweight",
    "FAVC",
    "FCVC",
    "NCP",
    "CAEC",
    "SMOKE",
    "CH2O",
    "SCC",
    "FAF",
    "TUE",
    "CALC",
    "MTRANS",
];

/// Raw fields that must parse as numbers
pub const NUMERIC_FIELDS: [&str; 8] = ["Age", "Height", "Weight", "FCVC", "NCP", "CH2O", "FAF", "TUE"];

/// Obesity categories present in the reference dataset
pub const KNOWN_LABELS: [&str; 7] = [
    "Insufficient_Weight",
    "Normal_Weight",
    "Overweight_Level_I",
    "Overweight_Level_II",
    "Obesity_Type_I",
    "Obesity_Type_II",
    "Obesity_Type_III",
];

/// A single cell of a raw record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    Number(f64),
    Text(String),
    Flag(bool),
    Missing,
}

static MISSING: CellValue = CellValue::Missing;

impl CellValue {
    /// Numeric view of the cell; NaN and non-numbers yield `None`
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(v) if !v.is_nan() => Some(*v),
            _ => None,
        }
    }

    /// Numeric view used by arithmetic derivations: anything that is not a
    /// number becomes NaN
    pub fn as_f64_or_nan(&self) -> f64 {
        match self {
            CellValue::Number(v) => *v,
            _ => f64::NAN,
        }
    }

    /// True for `Missing` and for `Number(NaN)`
    pub fn is_missing(&self) -> bool {
        match self {
            CellValue::Missing => true,
            CellValue::Number(v) => v.is_nan(),
            _ => false,
        }
    }

    /// Key used for categorical encoding
    pub fn category_key(&self) -> Option<String> {
        match self {
            CellValue::Text(s) => Some(s.clone()),
            CellValue::Flag(b) => Some(if *b { "True".to_string() } else { "False".to_string() }),
            CellValue::Number(v) if !v.is_nan() => Some(v.to_string()),
            _ => None,
        }
    }
}

impl From<f64> for CellValue {
    fn from(v: f64) -> Self {
        CellValue::Number(v)
    }
}

impl From<bool> for CellValue {
    fn from(v: bool) -> Self {
        CellValue::Flag(v)
    }
}

impl From<&str> for CellValue {
    fn from(v: &str) -> Self {
        CellValue::Text(v.to_string())
    }
}

impl From<String> for CellValue {
    fn from(v: String) -> Self {
        CellValue::Text(v)
    }
}

/// One subject: column name -> cell
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    fields: BTreeMap<String, CellValue>,
}

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, name: impl Into<String>, value: impl Into<CellValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<CellValue>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<CellValue> {
        self.fields.remove(name)
    }

    /// Cell for `name`; absent columns read as `Missing`
    pub fn get(&self, name: &str) -> &CellValue {
        self.fields.get(name).unwrap_or(&MISSING)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Records plus string labels, with a stable column order
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    columns: Vec<String>,
    records: Vec<RawRecord>,
    labels: Vec<String>,
}

impl Dataset {
    /// Create a dataset; `columns` fixes the feature order
    pub fn new(columns: Vec<String>, records: Vec<RawRecord>, labels: Vec<String>) -> Result<Self> {
        if records.len() != labels.len() {
            return Err(ObesityError::ShapeError {
                expected: format!("{} labels", records.len()),
                actual: format!("{} labels", labels.len()),
            });
        }
        Ok(Self { columns, records, labels })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn records(&self) -> &[RawRecord] {
        &self.records
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Append a column name if it is not already known
    pub fn push_column(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !self.columns.contains(&name) {
            self.columns.push(name);
        }
    }

    pub(crate) fn records_mut(&mut self) -> &mut [RawRecord] {
        &mut self.records
    }

    /// Rows at `indices`, in that order
    pub fn subset(&self, indices: &[usize]) -> Dataset {
        Dataset {
            columns: self.columns.clone(),
            records: indices.iter().map(|&i| self.records[i].clone()).collect(),
            labels: indices.iter().map(|&i| self.labels[i].clone()).collect(),
        }
    }

    /// Count of samples per label, sorted by label
    pub fn class_distribution(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for label in &self.labels {
            *counts.entry(label.clone()).or_insert(0) += 1;
        }
        counts
    }
}

/// Maps string labels to contiguous class indices (sorted order)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    /// Learn the sorted label vocabulary
    pub fn fit(labels: &[String]) -> Result<Self> {
        let mut classes: Vec<String> = labels.to_vec();
        classes.sort();
        classes.dedup();
        if classes.len() < 2 {
            return Err(ObesityError::ValidationError(format!(
                "Need at least 2 classes, found {}",
                classes.len()
            )));
        }
        Ok(Self { classes })
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }

    pub fn encode(&self, labels: &[String]) -> Result<Array1<usize>> {
        labels
            .iter()
            .map(|label| {
                self.classes
                    .binary_search(label)
                    .map_err(|_| ObesityError::ValidationError(format!("Unknown label: {}", label)))
            })
            .collect::<Result<Vec<_>>>()
            .map(Array1::from_vec)
    }

    pub fn decode(&self, index: usize) -> Result<&str> {
        self.classes
            .get(index)
            .map(|s| s.as_str())
            .ok_or_else(|| ObesityError::InferenceError(format!("Class index {} out of range", index)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_column_reads_missing() {
        let record = RawRecord::new().with("Age", 21.0);
        assert_eq!(record.get("Age"), &CellValue::Number(21.0));
        assert!(record.get("Height").is_missing());
    }

    #[test]
    fn test_nan_counts_as_missing() {
        assert!(CellValue::Number(f64::NAN).is_missing());
        assert_eq!(CellValue::Number(f64::NAN).as_number(), None);
        assert!(!CellValue::Text("yes".into()).is_missing());
    }

    #[test]
    fn test_flag_category_key() {
        assert_eq!(CellValue::Flag(true).category_key().as_deref(), Some("True"));
        assert_eq!(CellValue::Missing.category_key(), None);
    }

    #[test]
    fn test_dataset_length_mismatch() {
        let result = Dataset::new(vec!["Age".into()], vec![RawRecord::new()], vec![]);
        assert!(result.is_err());
    }

    #[test]
    fn test_label_encoder_sorted() {
        let labels: Vec<String> = ["b", "a", "c", "a"].iter().map(|s| s.to_string()).collect();
        let encoder = LabelEncoder::fit(&labels).unwrap();
        assert_eq!(encoder.classes(), &["a", "b", "c"]);
        assert_eq!(encoder.encode(&labels).unwrap().to_vec(), vec![1, 0, 2, 0]);
        assert_eq!(encoder.decode(2).unwrap(), "c");
        assert!(encoder.encode(&["z".to_string()]).is_err());
    }
}
