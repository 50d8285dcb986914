//! Data loading utilities

use polars::prelude::*;
use std::path::Path;
use std::time::Instant;

use crate::dataset::{CellValue, Dataset, RawRecord, LABEL_COLUMN, RAW_FEATURES};
use crate::error::{ObesityError, Result};

/// Default training file name
pub const DEFAULT_DATA_FILE: &str = "ObesityDataSet_raw_and_data_sinthetic.csv";

/// CSV loader producing typed [`Dataset`]s
#[derive(Debug, Clone)]
pub struct DataLoader {
    /// Rows scanned for schema inference
    infer_schema_length: usize,
    label_column: String,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    pub fn new() -> Self {
        Self {
            infer_schema_length: 1000,
            label_column: LABEL_COLUMN.to_string(),
        }
    }

    pub fn with_infer_schema_length(mut self, n: usize) -> Self {
        self.infer_schema_length = n.max(1);
        self
    }

    pub fn with_label_column(mut self, name: impl Into<String>) -> Self {
        self.label_column = name.into();
        self
    }

    /// Read a CSV file into a polars frame
    pub fn load_frame(&self, path: impl AsRef<Path>) -> Result<DataFrame> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ObesityError::DataError(format!("Data file not found: {}", path.display())));
        }

        let start = Instant::now();
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(self.infer_schema_length))
            .try_into_reader_with_file_path(Some(path.to_path_buf()))?
            .finish()?;

        tracing::info!(
            path = %path.display(),
            rows = df.height(),
            cols = df.width(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Loaded CSV"
        );
        Ok(df)
    }

    /// Load a labelled CSV file
    pub fn load_csv(&self, path: impl AsRef<Path>) -> Result<Dataset> {
        let df = self.load_frame(path)?;
        self.to_dataset(&df)
    }

    /// Convert a frame with the raw feature columns and a label column
    pub fn to_dataset(&self, df: &DataFrame) -> Result<Dataset> {
        let names: Vec<String> = df.get_column_names().iter().map(|n| n.to_string()).collect();
        let missing: Vec<&str> = RAW_FEATURES
            .iter()
            .copied()
            .chain(std::iter::once(self.label_column.as_str()))
            .filter(|c| !names.iter().any(|n| n == c))
            .collect();
        if !missing.is_empty() {
            return Err(ObesityError::DataError(format!("Missing columns: {}", missing.join(", "))));
        }

        let n_rows = df.height();
        let mut records = vec![RawRecord::new(); n_rows];
        for &name in RAW_FEATURES.iter() {
            let series = df.column(name)?.as_materialized_series();
            for (row, record) in records.iter_mut().enumerate() {
                record.insert(name, cell_from_any(series.get(row)?));
            }
        }

        let label_series = df.column(&self.label_column)?.as_materialized_series();
        let mut labels = Vec::with_capacity(n_rows);
        for row in 0..n_rows {
            match cell_from_any(label_series.get(row)?) {
                CellValue::Text(s) if !s.trim().is_empty() => labels.push(s.trim().to_string()),
                other => {
                    return Err(ObesityError::DataError(format!(
                        "Invalid label at row {}: {:?}",
                        row, other
                    )))
                }
            }
        }

        let columns = RAW_FEATURES.iter().map(|c| c.to_string()).collect();
        Dataset::new(columns, records, labels)
    }
}

/// Map one polars value to a cell
fn cell_from_any(value: AnyValue<'_>) -> CellValue {
    match value {
        AnyValue::Null => CellValue::Missing,
        AnyValue::Boolean(b) => CellValue::Flag(b),
        AnyValue::String(s) => CellValue::Text(s.to_string()),
        AnyValue::StringOwned(s) => CellValue::Text(s.to_string()),
        other => match other.extract::<f64>() {
            Some(v) => CellValue::Number(v),
            None => CellValue::Text(other.to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const HEADER: &str = "Gender,Age,Height,Weight,family_history_with_overweight,FAVC,FCVC,NCP,CAEC,SMOKE,CH2O,SCC,FAF,TUE,CALC,MTRANS,NObeyesdad";

    fn write_csv(rows: &[&str]) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "{}", HEADER).unwrap();
        for row in rows {
            writeln!(file, "{}", row).unwrap();
        }
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_csv_types() {
        let file = write_csv(&[
            "Female,21,1.62,64,yes,no,2,3,Sometimes,no,2,no,0,1,no,Public_Transportation,Normal_Weight",
            "Male,23,1.8,77,yes,no,2,3,Sometimes,no,2,no,2,1,Frequently,Walking,Normal_Weight",
            "Male,27,1.8,87,no,no,3,3,Sometimes,no,2,no,2,0,Frequently,Walking,Overweight_Level_I",
        ]);

        let dataset = DataLoader::new().load_csv(file.path()).unwrap();
        assert_eq!(dataset.len(), 3);
        assert_eq!(dataset.columns().len(), RAW_FEATURES.len());
        assert_eq!(dataset.labels()[2], "Overweight_Level_I");

        let first = &dataset.records()[0];
        assert_eq!(first.get("Age").as_number(), Some(21.0));
        assert_eq!(first.get("Height").as_number(), Some(1.62));
        assert_eq!(first.get("MTRANS"), &CellValue::Text("Public_Transportation".to_string()));
    }

    #[test]
    fn test_missing_cell_becomes_missing() {
        let file = write_csv(&[
            "Female,,1.62,64,yes,no,2,3,Sometimes,no,2,no,0,1,no,Walking,Normal_Weight",
            "Male,23,1.8,77,yes,no,2,3,Sometimes,no,2,no,2,1,no,Walking,Normal_Weight",
        ]);

        let dataset = DataLoader::new().load_csv(file.path()).unwrap();
        assert!(dataset.records()[0].get("Age").is_missing());
        assert_eq!(dataset.records()[1].get("Age").as_number(), Some(23.0));
    }

    #[test]
    fn test_missing_column_rejected() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "Gender,Age,NObeyesdad").unwrap();
        writeln!(file, "Female,21,Normal_Weight").unwrap();
        file.flush().unwrap();

        let err = DataLoader::new().load_csv(file.path()).unwrap_err();
        assert!(err.to_string().contains("Height"));
    }

    #[test]
    fn test_missing_file() {
        assert!(DataLoader::new().load_csv("/nonexistent/obesity.csv").is_err());
    }
}
