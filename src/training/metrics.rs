//! Classification metrics and hold-out report

use crate::error::{ObesityError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fraction of matching predictions
pub fn accuracy(y_true: &Array1<usize>, y_pred: &Array1<usize>) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let correct = y_true.iter().zip(y_pred.iter()).filter(|(t, p)| t == p).count();
    correct as f64 / y_true.len() as f64
}

/// Confusion matrix; rows are true classes, columns predicted classes
pub fn confusion_matrix(y_true: &Array1<usize>, y_pred: &Array1<usize>, n_classes: usize) -> Array2<usize> {
    let mut cm = Array2::zeros((n_classes, n_classes));
    for (&t, &p) in y_true.iter().zip(y_pred.iter()) {
        if t < n_classes && p < n_classes {
            cm[[t, p]] += 1;
        }
    }
    cm
}

/// Precision, recall and F1 of one class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub label: String,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: usize,
}

/// Averaged precision, recall and F1
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AverageMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
}

/// Per-class metrics, averages and the confusion matrix
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub accuracy: f64,
    pub per_class: Vec<ClassMetrics>,
    pub macro_avg: AverageMetrics,
    pub weighted_avg: AverageMetrics,
    pub confusion_matrix: Vec<Vec<usize>>,
    pub n_samples: usize,
}

impl ClassificationReport {
    /// Build the report; `labels[i]` names class index `i`
    pub fn compute(y_true: &Array1<usize>, y_pred: &Array1<usize>, labels: &[String]) -> Result<Self> {
        if y_true.len() != y_pred.len() {
            return Err(ObesityError::ShapeError {
                expected: format!("{} predictions", y_true.len()),
                actual: format!("{} predictions", y_pred.len()),
            });
        }
        let n_classes = labels.len();
        let cm = confusion_matrix(y_true, y_pred, n_classes);

        let per_class: Vec<ClassMetrics> = (0..n_classes)
            .map(|c| {
                let tp = cm[[c, c]] as f64;
                let predicted: usize = cm.column(c).sum();
                let support: usize = cm.row(c).sum();
                let precision = if predicted > 0 { tp / predicted as f64 } else { 0.0 };
                let recall = if support > 0 { tp / support as f64 } else { 0.0 };
                let f1_score = if precision + recall > 0.0 {
                    2.0 * precision * recall / (precision + recall)
                } else {
                    0.0
                };
                ClassMetrics {
                    label: labels[c].clone(),
                    precision,
                    recall,
                    f1_score,
                    support,
                }
            })
            .collect();

        let k = n_classes.max(1) as f64;
        let macro_avg = AverageMetrics {
            precision: per_class.iter().map(|m| m.precision).sum::<f64>() / k,
            recall: per_class.iter().map(|m| m.recall).sum::<f64>() / k,
            f1_score: per_class.iter().map(|m| m.f1_score).sum::<f64>() / k,
        };

        let total: usize = per_class.iter().map(|m| m.support).sum();
        let w = |f: fn(&ClassMetrics) -> f64| {
            if total == 0 {
                0.0
            } else {
                per_class.iter().map(|m| f(m) * m.support as f64).sum::<f64>() / total as f64
            }
        };
        let weighted_avg = AverageMetrics {
            precision: w(|m| m.precision),
            recall: w(|m| m.recall),
            f1_score: w(|m| m.f1_score),
        };

        Ok(Self {
            accuracy: accuracy(y_true, y_pred),
            per_class,
            macro_avg,
            weighted_avg,
            confusion_matrix: cm.outer_iter().map(|r| r.to_vec()).collect(),
            n_samples: y_true.len(),
        })
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self.per_class.iter().map(|m| m.label.len()).max().unwrap_or(0).max(12);
        writeln!(
            f,
            "{:>width$}  {:>9}  {:>9}  {:>9}  {:>7}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        writeln!(f)?;
        for m in &self.per_class {
            writeln!(
                f,
                "{:>width$}  {:>9.4}  {:>9.4}  {:>9.4}  {:>7}",
                m.label, m.precision, m.recall, m.f1_score, m.support
            )?;
        }
        writeln!(f)?;
        writeln!(f, "{:>width$}  {:>9}  {:>9}  {:>9.4}  {:>7}", "accuracy", "", "", self.accuracy, self.n_samples)?;
        for (name, avg) in [("macro avg", &self.macro_avg), ("weighted avg", &self.weighted_avg)] {
            writeln!(
                f,
                "{:>width$}  {:>9.4}  {:>9.4}  {:>9.4}  {:>7}",
                name, avg.precision, avg.recall, avg.f1_score, self.n_samples
            )?;
        }
        writeln!(f)?;
        writeln!(f, "Confusion matrix (rows = true label):")?;
        for row in &self.confusion_matrix {
            let cells: Vec<String> = row.iter().map(|c| format!("{:>5}", c)).collect();
            writeln!(f, "{}", cells.join(""))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn labels() -> Vec<String> {
        vec!["a".to_string(), "b".to_string(), "c".to_string()]
    }

    #[test]
    fn test_accuracy() {
        assert_eq!(accuracy(&array![0, 1, 2, 2], &array![0, 1, 1, 2]), 0.75);
    }

    #[test]
    fn test_confusion_matrix_rows_are_truth() {
        let cm = confusion_matrix(&array![0, 0, 1], &array![0, 1, 1], 2);
        assert_eq!(cm, array![[1, 1], [0, 1]]);
    }

    #[test]
    fn test_report() {
        let y_true = array![0, 0, 1, 1, 2, 2];
        let y_pred = array![0, 1, 1, 1, 2, 0];
        let report = ClassificationReport::compute(&y_true, &y_pred, &labels()).unwrap();

        assert!((report.accuracy - 4.0 / 6.0).abs() < 1e-12);
        let b = &report.per_class[1];
        assert!((b.precision - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(b.recall, 1.0);
        assert_eq!(b.support, 2);
        assert_eq!(report.confusion_matrix[2], vec![1, 0, 1]);
        // equal supports make macro and weighted recall agree
        assert!((report.macro_avg.recall - report.weighted_avg.recall).abs() < 1e-12);

        let text = report.to_string();
        assert!(text.contains("weighted avg"));
    }

    #[test]
    fn test_report_length_mismatch() {
        assert!(ClassificationReport::compute(&array![0], &array![0, 1], &labels()).is_err());
    }
}
