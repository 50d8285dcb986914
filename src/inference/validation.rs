//! Request payload validation
//!
//! Turns a JSON request body into a [`RawRecord`] or a [`RequestError`]
//! before any model computation happens.

use crate::dataset::{CellValue, RawRecord, NUMERIC_FIELDS, RAW_FEATURES};
use serde_json::Value;
use thiserror::Error;

/// Client-side problems with a prediction request
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error("No input data provided")]
    MissingBody,

    #[error("Invalid JSON body: {0}")]
    MalformedBody(String),

    #[error("Missing features: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    #[error("Invalid input types for numeric fields: {}", .0.join(", "))]
    InvalidNumericType(Vec<String>),
}

/// Parse and validate a raw request body
pub fn parse_body(body: &[u8]) -> Result<RawRecord, RequestError> {
    if body.iter().all(|b| b.is_ascii_whitespace()) {
        return Err(RequestError::MissingBody);
    }
    let value: Value = serde_json::from_slice(body).map_err(|e| RequestError::MalformedBody(e.to_string()))?;
    validate_payload(&value)
}

/// Validate a decoded JSON payload.
///
/// All 16 raw fields must be present (extra keys are ignored). Numeric
/// fields accept JSON numbers and numeric strings; `null`, booleans and
/// non-finite values are rejected. Other fields keep their JSON type.
pub fn validate_payload(value: &Value) -> Result<RawRecord, RequestError> {
    let object = match value {
        Value::Null => return Err(RequestError::MissingBody),
        Value::Object(map) if map.is_empty() => return Err(RequestError::MissingBody),
        Value::Object(map) => map,
        other => {
            return Err(RequestError::MalformedBody(format!(
                "expected a JSON object, got {}",
                json_type(other)
            )))
        }
    };

    let missing: Vec<String> = RAW_FEATURES
        .iter()
        .filter(|f| !object.contains_key(**f))
        .map(|f| f.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(RequestError::MissingFields(missing));
    }

    let mut record = RawRecord::new();
    let mut invalid = Vec::new();
    for field in RAW_FEATURES {
        let raw = &object[field];
        if NUMERIC_FIELDS.contains(&field) {
            match numeric_value(raw) {
                Some(v) => record.insert(field, CellValue::Number(v)),
                None => invalid.push(field.to_string()),
            }
        } else {
            record.insert(field, cell_from_json(raw));
        }
    }
    if !invalid.is_empty() {
        return Err(RequestError::InvalidNumericType(invalid));
    }
    Ok(record)
}

fn numeric_value(value: &Value) -> Option<f64> {
    let v = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    v.is_finite().then_some(v)
}

fn cell_from_json(value: &Value) -> CellValue {
    match value {
        Value::Null => CellValue::Missing,
        Value::Bool(b) => CellValue::Flag(*b),
        Value::Number(n) => n.as_f64().map(CellValue::Number).unwrap_or(CellValue::Missing),
        Value::String(s) => CellValue::Text(s.clone()),
        other => CellValue::Text(other.to_string()),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_payload() -> Value {
        json!({
            "Gender": "Male",
            "Age": 23,
            "Height": 1.75,
            "Weight": 70.0,
            "family_history_with_overweight": "yes",
            "FAVC": "yes",
            "FCVC": 2.0,
            "NCP": 3.0,
            "CAEC": "Sometimes",
            "SMOKE": "no",
            "CH2O": 2.0,
            "SCC": "no",
            "FAF": 1.0,
            "TUE": 1.0,
            "CALC": "no",
            "MTRANS": "Public_Transportation"
        })
    }

    #[test]
    fn test_valid_payload() {
        let record = validate_payload(&valid_payload()).unwrap();
        assert_eq!(record.len(), 16);
        assert_eq!(record.get("Age"), &CellValue::Number(23.0));
        assert_eq!(record.get("Gender"), &CellValue::Text("Male".to_string()));
    }

    #[test]
    fn test_extra_fields_ignored() {
        let mut payload = valid_payload();
        payload["extra"] = json!("ignored");
        let record = validate_payload(&payload).unwrap();
        assert!(!record.contains("extra"));
    }

    #[test]
    fn test_missing_fields_in_canonical_order() {
        let mut payload = valid_payload();
        let map = payload.as_object_mut().unwrap();
        map.remove("MTRANS");
        map.remove("Age");
        let err = validate_payload(&payload).unwrap_err();
        assert_eq!(err, RequestError::MissingFields(vec!["Age".to_string(), "MTRANS".to_string()]));
        assert_eq!(err.to_string(), "Missing features: Age, MTRANS");
    }

    #[test]
    fn test_numeric_string_accepted() {
        let mut payload = valid_payload();
        payload["Age"] = json!(" 31.5 ");
        assert_eq!(validate_payload(&payload).unwrap().get("Age"), &CellValue::Number(31.5));
    }

    #[test]
    fn test_invalid_numeric_types() {
        for bad in [json!("abc"), json!(null), json!(true), json!("NaN"), json!([1])] {
            let mut payload = valid_payload();
            payload["Age"] = bad;
            let err = validate_payload(&payload).unwrap_err();
            assert_eq!(err.to_string(), "Invalid input types for numeric fields: Age");
        }
    }

    #[test]
    fn test_empty_and_malformed_bodies() {
        assert_eq!(parse_body(b"").unwrap_err(), RequestError::MissingBody);
        assert_eq!(parse_body(b"  \n").unwrap_err(), RequestError::MissingBody);
        assert_eq!(parse_body(b"{}").unwrap_err(), RequestError::MissingBody);
        assert_eq!(parse_body(b"null").unwrap_err(), RequestError::MissingBody);
        assert!(matches!(parse_body(b"{not json"), Err(RequestError::MalformedBody(_))));
        assert!(matches!(parse_body(b"[1, 2]"), Err(RequestError::MalformedBody(_))));
    }

    #[test]
    fn test_categorical_null_is_missing() {
        let mut payload = valid_payload();
        payload["CAEC"] = json!(null);
        assert_eq!(validate_payload(&payload).unwrap().get("CAEC"), &CellValue::Missing);
    }
}
