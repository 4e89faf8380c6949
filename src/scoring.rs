use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::aggregate::AggregateRow;
use crate::error::{EngineError, EngineResult};
use crate::metrics::{CONVERSION_RATE, CPC, CTR, ROAS};
use crate::normalize::NormalizedTable;

/// Non-negative weight per metric name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, f64>", into = "BTreeMap<String, f64>")]
pub struct WeightVector {
    weights: BTreeMap<String, f64>,
}

impl WeightVector {
    pub fn new<I, S>(entries: I) -> EngineResult<Self>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let mut weights = BTreeMap::new();
        for (name, weight) in entries {
            let name = name.into();
            if !weight.is_finite() || weight < 0.0 {
                return Err(EngineError::InvalidParameter {
                    name: format!("weight.{name}"),
                    reason: format!("must be a non-negative number, got {weight}"),
                });
            }
            weights.insert(name, weight);
        }
        Ok(Self { weights })
    }

    /// Slider defaults of the ad performance grade tuner.
    pub fn ad_defaults() -> Self {
        Self {
            weights: BTreeMap::from([
                (ROAS.to_string(), 50.0),
                (CTR.to_string(), 15.0),
                (CPC.to_string(), 20.0),
                (CONVERSION_RATE.to_string(), 15.0),
            ]),
        }
    }

    pub fn total(&self) -> f64 {
        self.weights.values().sum()
    }

    /// Weights divided by their sum. A zero sum is treated as one, so an
    /// all-zero vector stays all zero.
    pub fn renormalized(&self) -> BTreeMap<String, f64> {
        let total = match self.total() {
            total if total == 0.0 => 1.0,
            total => total,
        };
        self.weights
            .iter()
            .map(|(name, weight)| (name.clone(), weight / total))
            .collect()
    }

    pub fn get(&self, name: &str) -> f64 {
        self.weights.get(name).copied().unwrap_or(0.0)
    }
}

impl TryFrom<BTreeMap<String, f64>> for WeightVector {
    type Error = EngineError;

    fn try_from(weights: BTreeMap<String, f64>) -> Result<Self, Self::Error> {
        WeightVector::new(weights)
    }
}

impl From<WeightVector> for BTreeMap<String, f64> {
    fn from(vector: WeightVector) -> Self {
        vector.weights
    }
}

/// Weighted grade in [0, 100] for each row of a normalized table.
pub fn grade(table: &NormalizedTable, weights: &WeightVector) -> Vec<f64> {
    let renormalized = weights.renormalized();
    table
        .rows
        .iter()
        .map(|scores| {
            let weighted: f64 = renormalized
                .iter()
                .map(|(metric, weight)| scores.get(metric).copied().unwrap_or(0.0) * weight)
                .sum();
            (weighted * 100.0).clamp(0.0, 100.0)
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradedRow {
    pub row: AggregateRow,
    pub normalized: BTreeMap<String, f64>,
    pub grade: f64,
}

/// Attach grades to rows and sort by grade descending. Ties keep their
/// incoming order.
pub fn rank(rows: Vec<AggregateRow>, table: &NormalizedTable, weights: &WeightVector) -> Vec<GradedRow> {
    let grades = grade(table, weights);
    let mut graded: Vec<GradedRow> = rows
        .into_iter()
        .zip(table.rows.iter().cloned())
        .zip(grades)
        .map(|((row, normalized), grade)| GradedRow {
            row,
            normalized,
            grade,
        })
        .collect();

    graded.sort_by(|a, b| b.grade.partial_cmp(&a.grade).unwrap_or(std::cmp::Ordering::Equal));
    graded
}
