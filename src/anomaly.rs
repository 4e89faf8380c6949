//! Per-category outlier detection over time-bucketed values.
//!
//! A bucket is anomalous when it exceeds `mean + sigma * stddev` of its
//! category's nonzero buckets. Zero buckets (months before a category
//! existed) never enter the baseline.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::models::{FinancialRecord, TransactionType};

pub const DEFAULT_SIGMA: f64 = 3.0;

/// Which buckets form the baseline a bucket is compared against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Baseline {
    /// Every other nonzero bucket of the category.
    #[default]
    LeaveOneOut,
    /// All nonzero buckets of the category, including the one tested.
    Pooled,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySeries {
    pub category: String,
    /// Ordered (bucket label, value) pairs.
    pub buckets: Vec<(String, f64)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomalyFlag {
    pub category: String,
    pub bucket: String,
    pub value: f64,
    pub threshold: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnomalyDetector {
    pub sigma: f64,
    pub baseline: Baseline,
}

impl Default for AnomalyDetector {
    fn default() -> Self {
        Self {
            sigma: DEFAULT_SIGMA,
            baseline: Baseline::default(),
        }
    }
}

impl AnomalyDetector {
    /// `sigma` must be finite and non-negative.
    pub fn validate(&self) -> EngineResult<()> {
        if self.sigma.is_finite() && self.sigma >= 0.0 {
            Ok(())
        } else {
            Err(EngineError::InvalidParameter {
                name: "anomaly.sigma".to_string(),
                reason: format!("must be a non-negative number, got {}", self.sigma),
            })
        }
    }

    pub fn with_sigma(self, sigma: f64) -> EngineResult<Self> {
        let detector = Self { sigma, ..self };
        detector.validate()?;
        Ok(detector)
    }

    pub fn detect(&self, series: &[CategorySeries]) -> Vec<AnomalyFlag> {
        series
            .iter()
            .flat_map(|category| self.detect_category(category))
            .collect()
    }

    pub fn detect_category(&self, series: &CategorySeries) -> Vec<AnomalyFlag> {
        let nonzero: Vec<(usize, f64)> = series
            .buckets
            .iter()
            .enumerate()
            .filter(|(_, (_, value))| *value != 0.0)
            .map(|(index, (_, value))| (index, *value))
            .collect();

        if nonzero.len() < 2 {
            return Vec::new();
        }

        let pooled = match self.baseline {
            Baseline::Pooled => {
                let values: Vec<f64> = nonzero.iter().map(|(_, value)| *value).collect();
                self.threshold(&values)
            }
            Baseline::LeaveOneOut => None,
        };

        let mut flags = Vec::new();
        for &(index, value) in &nonzero {
            let threshold = match self.baseline {
                Baseline::Pooled => pooled,
                Baseline::LeaveOneOut => {
                    let others: Vec<f64> = nonzero
                        .iter()
                        .filter(|(other, _)| *other != index)
                        .map(|(_, value)| *value)
                        .collect();
                    self.threshold(&others)
                }
            };

            if let Some(threshold) = threshold {
                if value > threshold {
                    flags.push(AnomalyFlag {
                        category: series.category.clone(),
                        bucket: series.buckets[index].0.clone(),
                        value,
                        threshold,
                    });
                }
            }
        }
        flags
    }

    fn threshold(&self, samples: &[f64]) -> Option<f64> {
        let (mean, stddev) = mean_and_sample_stddev(samples)?;
        Some(mean + self.sigma * stddev)
    }
}

/// Mean and sample (n - 1) standard deviation; `None` below two samples.
pub fn mean_and_sample_stddev(samples: &[f64]) -> Option<(f64, f64)> {
    if samples.len() < 2 {
        return None;
    }
    let n = samples.len() as f64;
    let mean = samples.iter().sum::<f64>() / n;
    let variance = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some((mean, variance.sqrt()))
}

/// Monthly expense totals per category, zero-filled over every month that
/// has any expense.
pub fn monthly_expense_series(records: &[FinancialRecord]) -> Vec<CategorySeries> {
    let mut months: BTreeSet<String> = BTreeSet::new();
    let mut sums: BTreeMap<String, BTreeMap<String, f64>> = BTreeMap::new();

    for record in records.iter().filter(|r| r.kind == TransactionType::Expense) {
        let month = record.date.format("%Y-%m").to_string();
        months.insert(month.clone());
        *sums
            .entry(record.category.clone())
            .or_default()
            .entry(month)
            .or_insert(0.0) += record.amount;
    }

    sums.into_iter()
        .map(|(category, by_month)| CategorySeries {
            category,
            buckets: months
                .iter()
                .map(|month| (month.clone(), by_month.get(month).copied().unwrap_or(0.0)))
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn sigma_override_is_validated() {
        let detector = AnomalyDetector::default();
        assert_eq!(detector.with_sigma(2.0).unwrap().sigma, 2.0);
        assert_eq!(detector.with_sigma(0.0).unwrap().baseline, Baseline::LeaveOneOut);
        for bad in [-3.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                detector.with_sigma(bad),
                Err(EngineError::InvalidParameter { .. })
            ));
        }
    }

    fn series(values: &[f64]) -> CategorySeries {
        CategorySeries {
            category: "Marketing".to_string(),
            buckets: values
                .iter()
                .enumerate()
                .map(|(i, v)| (format!("2024-{:02}", i + 1), *v))
                .collect(),
        }
    }

    #[test]
    fn single_outlier_is_flagged() {
        let flags = AnomalyDetector::default().detect_category(&series(&[100.0, 100.0, 100.0, 100.0, 500.0]));
        assert_eq!(flags.len(), 1);
        assert_eq!(flags[0].bucket, "2024-05");
        assert_eq!(flags[0].value, 500.0);
        assert_eq!(flags[0].threshold, 100.0);
    }

    #[test]
    fn short_series_flag_nothing() {
        let detector = AnomalyDetector::default();
        assert!(detector.detect_category(&series(&[100.0])).is_empty());
        assert!(detector.detect_category(&series(&[100.0, 100.0])).is_empty());
        assert!(detector.detect_category(&series(&[])).is_empty());
    }

    #[test]
    fn zero_buckets_are_left_out_of_the_baseline() {
        let flags = AnomalyDetector::default()
            .detect_category(&series(&[0.0, 0.0, 0.0, 100.0, 102.0, 98.0, 101.0]));
        assert!(flags.is_empty());
    }

    #[test]
    fn pooled_baseline_absorbs_a_lone_outlier_in_short_series() {
        let detector = AnomalyDetector {
            baseline: Baseline::Pooled,
            ..AnomalyDetector::default()
        };
        assert!(detector
            .detect_category(&series(&[100.0, 100.0, 100.0, 100.0, 500.0]))
            .is_empty());
    }

    #[test]
    fn pooled_baseline_flags_outlier_in_long_series() {
        let detector = AnomalyDetector {
            baseline: Baseline::Pooled,
            ..AnomalyDetector::default()
        };
        let mut values = vec![3500.0; 23];
        values.push(12250.0);
        let flags = detector.detect_category(&series(&values));
        assert_eq!(flags.len(), 1);
        assert_eq!(flags[0].value, 12250.0);
    }

    #[test]
    fn sample_stddev_uses_n_minus_one() {
        let (mean, stddev) = mean_and_sample_stddev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert_eq!(mean, 5.0);
        assert!((stddev - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);
        assert!(mean_and_sample_stddev(&[1.0]).is_none());
    }

    #[test]
    fn expense_pivot_zero_fills_missing_months() {
        let record = |date: (i32, u32, u32), kind, category: &str, amount| FinancialRecord {
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            kind,
            category: category.to_string(),
            amount,
        };
        let records = vec![
            record((2023, 1, 1), TransactionType::Expense, "Rent", 5000.0),
            record((2023, 2, 1), TransactionType::Expense, "Rent", 5100.0),
            record((2023, 2, 15), TransactionType::Expense, "Marketing", 300.0),
            record((2023, 2, 20), TransactionType::Expense, "Marketing", 200.0),
            record((2023, 3, 1), TransactionType::Income, "Consulting Services", 9000.0),
        ];
        let pivot = monthly_expense_series(&records);
        assert_eq!(pivot.len(), 2);
        assert_eq!(pivot[0].category, "Marketing");
        assert_eq!(
            pivot[0].buckets,
            vec![("2023-01".to_string(), 0.0), ("2023-02".to_string(), 500.0)]
        );
        assert_eq!(pivot[1].buckets.len(), 2);
    }
}
