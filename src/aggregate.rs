use std::collections::BTreeMap;

use serde::Serialize;

use crate::metrics::MetricDefinition;
use crate::models::Measurable;

/// Categorical columns used to partition records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupKey {
    columns: Vec<String>,
}

impl GroupKey {
    pub fn new(column: &str) -> Self {
        Self {
            columns: vec![column.to_string()],
        }
    }

    pub fn composite(columns: &[&str]) -> Self {
        Self {
            columns: columns.iter().map(|column| column.to_string()).collect(),
        }
    }

    fn value_of<R: Measurable>(&self, record: &R) -> Vec<String> {
        self.columns
            .iter()
            .map(|column| record.dimension(column).unwrap_or_default().to_string())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateRow {
    pub key: Vec<String>,
    pub count: usize,
    pub totals: BTreeMap<String, f64>,
    pub metrics: BTreeMap<String, f64>,
}

impl AggregateRow {
    pub fn label(&self) -> String {
        self.key.join(" / ")
    }

    pub fn total(&self, column: &str) -> f64 {
        self.totals.get(column).copied().unwrap_or(0.0)
    }

    pub fn metric(&self, name: &str) -> f64 {
        self.metrics.get(name).copied().unwrap_or(0.0)
    }
}

/// Sum every measure per distinct key value and derive ratio metrics from
/// the summed totals.
pub fn aggregate<R: Measurable>(
    records: &[R],
    group_key: &GroupKey,
    definitions: &[MetricDefinition],
) -> Vec<AggregateRow> {
    let mut groups: BTreeMap<Vec<String>, (usize, BTreeMap<String, f64>)> = BTreeMap::new();

    for record in records {
        let entry = groups
            .entry(group_key.value_of(record))
            .or_insert_with(|| (0, BTreeMap::new()));
        entry.0 += 1;
        for column in R::MEASURES {
            let value = record.measure(column).unwrap_or(0.0);
            *entry.1.entry(column.to_string()).or_insert(0.0) += value;
        }
    }

    groups
        .into_iter()
        .map(|(key, (count, totals))| {
            let metrics = definitions
                .iter()
                .map(|definition| {
                    let value = definition.evaluate(|column| totals.get(column).copied());
                    (definition.name.clone(), value)
                })
                .collect();
            AggregateRow {
                key,
                count,
                totals,
                metrics,
            }
        })
        .collect()
}

/// Sum a single measure per value of one categorical column.
pub fn sum_by<R: Measurable>(records: &[R], column: &str, measure: &str) -> Vec<(String, f64)> {
    let mut sums: BTreeMap<String, f64> = BTreeMap::new();
    for record in records {
        let key = record.dimension(column).unwrap_or_default().to_string();
        *sums.entry(key).or_insert(0.0) += record.measure(measure).unwrap_or(0.0);
    }
    sums.into_iter().collect()
}
