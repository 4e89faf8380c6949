use std::collections::BTreeMap;

use serde::Serialize;

use crate::aggregate::sum_by;
use crate::models::{ChurnRisk, CustomerRecord, SENTIMENT_MONTHS};

impl ChurnRisk {
    /// Tier boundaries: below 45 is High, 45 up to (not including) 75 is
    /// Medium, 75 and above is Low.
    pub fn from_health_score(score: f64) -> Self {
        if score < 45.0 {
            ChurnRisk::High
        } else if score < 75.0 {
            ChurnRisk::Medium
        } else {
            ChurnRisk::Low
        }
    }

    pub fn recommended_actions(&self) -> [&'static str; 2] {
        match self {
            ChurnRisk::High => ["Immediate Personal Outreach", "Offer Loyalty Discount"],
            ChurnRisk::Medium => [
                "Personalized Email Check-in",
                "Offer Early Access to New Products",
            ],
            ChurnRisk::Low => [
                "Nurture Relationship (Thank you note)",
                "Request a Testimonial",
            ],
        }
    }
}

/// Fixed linear health heuristic: half recency, 0.3 frequency, 0.2 support.
pub fn health_score(days_since_purchase: i64, purchase_frequency: u32, support_tickets: u32) -> u32 {
    let recency = (100.0 - days_since_purchase as f64 / 3.65).max(0.0);
    let frequency = (f64::from(purchase_frequency) * 10.0).min(100.0);
    let support = (100.0 - f64::from(support_tickets) * 20.0).max(0.0);
    (0.5 * recency + 0.3 * frequency + 0.2 * support) as u32
}

/// Customers in the given tier, or every customer when `tier` is `None`.
pub fn filter_by_risk(records: &[CustomerRecord], tier: Option<ChurnRisk>) -> Vec<CustomerRecord> {
    records
        .iter()
        .filter(|record| tier.map_or(true, |tier| record.churn_risk == tier))
        .cloned()
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScorecardEntry {
    pub customer_name: String,
    pub health_score: u32,
    pub churn_risk: ChurnRisk,
    pub predicted_ltv: f64,
}

pub fn scorecard(records: &[CustomerRecord]) -> Vec<ScorecardEntry> {
    let mut entries: Vec<ScorecardEntry> = records
        .iter()
        .map(|record| ScorecardEntry {
            customer_name: record.customer_name.clone(),
            health_score: record.health_score,
            churn_risk: record.churn_risk,
            predicted_ltv: record.predicted_ltv,
        })
        .collect();
    entries.sort_by(|a, b| b.health_score.cmp(&a.health_score));
    entries
}

pub fn risk_counts(records: &[CustomerRecord]) -> BTreeMap<ChurnRisk, usize> {
    let mut counts = BTreeMap::new();
    for record in records {
        *counts.entry(record.churn_risk).or_insert(0) += 1;
    }
    counts
}

/// Predicted lifetime value per tier, largest first.
pub fn ltv_by_risk(records: &[CustomerRecord]) -> Vec<(String, f64)> {
    let mut sums = sum_by(records, "ChurnRisk", "PredictedLTV");
    sums.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    sums
}

/// Mean sentiment per month position, oldest (`Month -11`) first.
pub fn average_sentiment(records: &[CustomerRecord]) -> Vec<(String, f64)> {
    (0..SENTIMENT_MONTHS)
        .map(|position| {
            let label = format!("Month -{}", SENTIMENT_MONTHS - 1 - position);
            let values: Vec<f64> = records
                .iter()
                .filter_map(|record| record.sentiment_history.get(position).copied())
                .collect();
            let mean = if values.is_empty() {
                0.0
            } else {
                values.iter().sum::<f64>() / values.len() as f64
            };
            (label, mean)
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerDashboard {
    pub tier_filter: Option<ChurnRisk>,
    pub scorecard: Vec<ScorecardEntry>,
    pub risk_counts: BTreeMap<ChurnRisk, usize>,
    pub ltv_by_risk: Vec<(String, f64)>,
    pub average_sentiment: Vec<(String, f64)>,
}

pub fn build_dashboard(records: &[CustomerRecord], tier: Option<ChurnRisk>) -> CustomerDashboard {
    let filtered = filter_by_risk(records, tier);
    CustomerDashboard {
        tier_filter: tier,
        scorecard: scorecard(&filtered),
        risk_counts: risk_counts(&filtered),
        ltv_by_risk: ltv_by_risk(&filtered),
        average_sentiment: average_sentiment(&filtered),
    }
}
