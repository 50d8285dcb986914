//! Seeded sample data shaped like the obesity survey

use super::{Dataset, RawRecord, KNOWN_LABELS, LABEL_COLUMN, RAW_FEATURES};
use crate::error::{ObesityError, Result};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;

/// Relative class frequencies, mildly imbalanced
const CLASS_WEIGHTS: [f64; 7] = [0.9, 1.0, 0.8, 0.8, 1.2, 1.0, 0.7];

/// BMI interval per class, aligned with `KNOWN_LABELS`
const BMI_RANGES: [(f64, f64); 7] = [
    (15.0, 18.4),
    (18.5, 24.9),
    (25.0, 27.4),
    (27.5, 29.9),
    (30.0, 34.9),
    (35.0, 39.9),
    (40.0, 50.0),
];

const FREQUENCY: [&str; 4] = ["no", "Sometimes", "Frequently", "Always"];
const TRANSPORT: [&str; 5] = ["Public_Transportation", "Walking", "Automobile", "Motorbike", "Bike"];

/// Generate roughly `n_samples` labelled records (every class gets at least
/// two rows). Identical seeds give identical datasets.
pub fn generate_sample_dataset(n_samples: usize, seed: u64) -> Result<Dataset> {
    if n_samples < 2 * KNOWN_LABELS.len() {
        return Err(ObesityError::InvalidParameter {
            name: "n_samples".to_string(),
            value: n_samples.to_string(),
            reason: format!("need at least {} rows", 2 * KNOWN_LABELS.len()),
        });
    }
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let total_weight: f64 = CLASS_WEIGHTS.iter().sum();

    let mut classes: Vec<usize> = CLASS_WEIGHTS
        .iter()
        .enumerate()
        .flat_map(|(k, w)| {
            let count = ((n_samples as f64 * w / total_weight).round() as usize).max(2);
            std::iter::repeat(k).take(count)
        })
        .collect();
    classes.shuffle(&mut rng);

    let mut records = Vec::with_capacity(classes.len());
    let mut labels = Vec::with_capacity(classes.len());
    for class in classes {
        records.push(sample_record(class, &mut rng));
        labels.push(KNOWN_LABELS[class].to_string());
    }

    let columns = RAW_FEATURES.iter().map(|c| c.to_string()).collect();
    tracing::debug!(rows = records.len(), label = LABEL_COLUMN, "Generated sample dataset");
    Dataset::new(columns, records, labels)
}

fn sample_record(class: usize, rng: &mut impl Rng) -> RawRecord {
    let severity = class as f64 / (KNOWN_LABELS.len() - 1) as f64;
    let (lo, hi) = BMI_RANGES[class];
    let bmi = rng.gen_range(lo..hi);
    let height: f64 = rng.gen_range(1.50..1.95);
    let weight = bmi * height * height;

    RawRecord::new()
        .with("Gender", if rng.gen_bool(0.5) { "Male" } else { "Female" })
        .with("Age", rng.gen_range(16.0..55.0_f64).round())
        .with("Height", (height * 100.0).round() / 100.0)
        .with("Weight", (weight * 10.0).round() / 10.0)
        .with("family_history_with_overweight", yes_no(rng, 0.2 + 0.7 * severity))
        .with("FAVC", yes_no(rng, 0.4 + 0.5 * severity))
        .with("FCVC", rng.gen_range(1.0..3.0_f64))
        .with("NCP", rng.gen_range(1.0..4.0_f64))
        .with("CAEC", FREQUENCY[rng.gen_range(0..FREQUENCY.len())])
        .with("SMOKE", yes_no(rng, 0.05))
        .with("CH2O", rng.gen_range(1.0..3.0_f64))
        .with("SCC", yes_no(rng, 0.3 - 0.25 * severity))
        .with("FAF", rng.gen_range(0.0..(3.0 - 2.0 * severity)))
        .with("TUE", rng.gen_range(0.0..2.0_f64))
        .with("CALC", FREQUENCY[rng.gen_range(0..3)])
        .with("MTRANS", TRANSPORT[rng.gen_range(0..TRANSPORT.len())])
}

fn yes_no(rng: &mut impl Rng, p: f64) -> &'static str {
    if rng.gen_bool(p.clamp(0.0, 1.0)) {
        "yes"
    } else {
        "no"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::CellValue;

    #[test]
    fn test_sample_dataset_shape() {
        let ds = generate_sample_dataset(140, 7).unwrap();
        assert!(ds.len() >= 130);
        assert_eq!(ds.columns().len(), 16);
        assert_eq!(ds.class_distribution().len(), 7);
        assert!(ds.class_distribution().values().all(|&c| c >= 2));
        assert!(matches!(ds.records()[0].get("Age"), CellValue::Number(_)));
        assert!(matches!(ds.records()[0].get("MTRANS"), CellValue::Text(_)));
    }

    #[test]
    fn test_sample_dataset_is_seeded() {
        let a = generate_sample_dataset(70, 1).unwrap();
        let b = generate_sample_dataset(70, 1).unwrap();
        assert_eq!(a.records(), b.records());
        assert_eq!(a.labels(), b.labels());
    }

    #[test]
    fn test_too_small() {
        assert!(generate_sample_dataset(5, 1).is_err());
    }
}
