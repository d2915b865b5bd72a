use std::collections::HashSet;

/// Per-entity precision/recall aggregation for a resolved partition
/// against the generated ground truth.
pub struct Metrics {
    precisions: Vec<f64>,
    recalls: Vec<f64>,
}

#[derive(Debug)]
pub struct MetricResult {
    pub precision: f64,
    pub recall: f64,
    pub fscore: f64,
}

fn mean(values: &[f64]) -> f64 {
    let sum: f64 = values.iter().sum();
    sum / (values.len() as f64)
}

impl Metrics {
    pub fn new() -> Self {
        Metrics {
            precisions: Vec::new(),
            recalls: Vec::new(),
        }
    }

    /// Scores one ground-truth entity against the resolved cluster that
    /// was matched to it.
    pub fn update(&mut self, found: &HashSet<u64>, expected: &HashSet<u64>) {
        if found.is_empty() && expected.is_empty() {
            return;
        }
        let overlap = expected.intersection(found).count() as f64;
        let precision = if found.is_empty() {
            0.0
        } else {
            overlap / found.len() as f64
        };
        let recall = if expected.is_empty() {
            1.0
        } else {
            overlap / expected.len() as f64
        };
        self.precisions.push(precision);
        self.recalls.push(recall);
    }

    pub fn result(&self) -> MetricResult {
        let precision = mean(&self.precisions);
        let recall = mean(&self.recalls);
        MetricResult {
            precision,
            recall,
            fscore: 2.0 / (1.0 / precision + 1.0 / recall),
        }
    }
}
