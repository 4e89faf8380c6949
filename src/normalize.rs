use std::collections::BTreeMap;

use serde::Serialize;

use crate::aggregate::AggregateRow;
use crate::metrics::MetricDefinition;

/// Score assigned to every row when a metric does not vary.
pub const NEUTRAL_SCORE: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Direction {
    HigherIsBetter,
    LowerIsBetter,
}

impl Direction {
    pub fn from_higher_is_better(higher_is_better: bool) -> Self {
        if higher_is_better {
            Direction::HigherIsBetter
        } else {
            Direction::LowerIsBetter
        }
    }
}

/// Min-max scale `values` into [0, 1].
pub fn min_max(values: &[f64], direction: Direction) -> Vec<f64> {
    let Some(min) = values.iter().copied().reduce(f64::min) else {
        return Vec::new();
    };
    let max = values.iter().copied().fold(min, f64::max);

    if max == min {
        return vec![NEUTRAL_SCORE; values.len()];
    }

    let span = max - min;
    values
        .iter()
        .map(|value| {
            let scaled = ((value - min) / span).clamp(0.0, 1.0);
            match direction {
                Direction::HigherIsBetter => scaled,
                Direction::LowerIsBetter => 1.0 - scaled,
            }
        })
        .collect()
}

/// Normalize one metric across aggregate rows, in row order.
pub fn normalize_metric(rows: &[AggregateRow], metric: &str, direction: Direction) -> Vec<f64> {
    let values: Vec<f64> = rows.iter().map(|row| row.metric(metric)).collect();
    min_max(&values, direction)
}

/// Normalized scores per row, keyed by metric name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedTable {
    pub rows: Vec<BTreeMap<String, f64>>,
}

impl NormalizedTable {
    pub fn build(rows: &[AggregateRow], definitions: &[MetricDefinition]) -> Self {
        let mut table = vec![BTreeMap::new(); rows.len()];
        for definition in definitions {
            let direction = Direction::from_higher_is_better(definition.higher_is_better);
            let scores = normalize_metric(rows, &definition.name, direction);
            for (entry, score) in table.iter_mut().zip(scores) {
                entry.insert(definition.name.clone(), score);
            }
        }
        Self { rows: table }
    }

    pub fn score(&self, row: usize, metric: &str) -> f64 {
        self.rows
            .get(row)
            .and_then(|scores| scores.get(metric))
            .copied()
            .unwrap_or(0.0)
    }
}
