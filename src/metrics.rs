use serde::Serialize;

use crate::models::AdRecord;

pub const ROAS: &str = "ROAS";
pub const CTR: &str = "CTR";
pub const CPC: &str = "CPC";
pub const CONVERSION_RATE: &str = "ConversionRate";

/// Divide two values, mapping every undefined result to zero.
///
/// A zero, missing or non-finite denominator yields `0.0`, as does any
/// quotient that overflows to infinity or comes out NaN.
pub fn safe_ratio(numerator: f64, denominator: Option<f64>) -> f64 {
    let denominator = match denominator {
        Some(value) if value != 0.0 && value.is_finite() => value,
        _ => return 0.0,
    };

    let ratio = numerator / denominator;
    if ratio.is_finite() {
        ratio
    } else {
        0.0
    }
}

/// A ratio metric derived from two summed columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricDefinition {
    pub name: String,
    pub numerator: String,
    pub denominator: String,
    pub higher_is_better: bool,
}

impl MetricDefinition {
    pub fn new(name: &str, numerator: &str, denominator: &str, higher_is_better: bool) -> Self {
        Self {
            name: name.to_string(),
            numerator: numerator.to_string(),
            denominator: denominator.to_string(),
            higher_is_better,
        }
    }

    /// Evaluate against a column lookup, usually an aggregate's totals.
    pub fn evaluate<F>(&self, lookup: F) -> f64
    where
        F: Fn(&str) -> Option<f64>,
    {
        let numerator = lookup(&self.numerator).unwrap_or(0.0);
        safe_ratio(numerator, lookup(&self.denominator))
    }
}

/// ROAS, CTR, CPC and conversion rate over the ad performance columns.
pub fn ad_metric_definitions() -> Vec<MetricDefinition> {
    vec![
        MetricDefinition::new(ROAS, "Revenue", "Spend", true),
        MetricDefinition::new(CTR, "Clicks", "Impressions", true),
        MetricDefinition::new(CPC, "Spend", "Clicks", false),
        MetricDefinition::new(CONVERSION_RATE, "Conversions", "Clicks", true),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AdMetrics {
    pub roas: f64,
    pub ctr: f64,
    pub cpc: f64,
    pub conversion_rate: f64,
}

impl AdMetrics {
    pub fn from_record(record: &AdRecord) -> Self {
        Self {
            roas: safe_ratio(record.revenue, Some(record.spend)),
            ctr: safe_ratio(record.clicks, Some(record.impressions)),
            cpc: safe_ratio(record.spend, Some(record.clicks)),
            conversion_rate: safe_ratio(record.conversions, Some(record.clicks)),
        }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        match name {
            ROAS => Some(self.roas),
            CTR => Some(self.ctr),
            CPC => Some(self.cpc),
            CONVERSION_RATE => Some(self.conversion_rate),
            _ => None,
        }
    }
}
