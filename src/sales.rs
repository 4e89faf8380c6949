use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::aggregate::sum_by;
use crate::models::SalesRecord;

/// Sidebar filters of the operations hub. `None` means "all values".
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SalesFilter {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub categories: Option<BTreeSet<String>>,
    pub marketing_sources: Option<BTreeSet<String>>,
}

impl SalesFilter {
    pub fn matches(&self, record: &SalesRecord) -> bool {
        self.start.map_or(true, |start| record.order_date >= start)
            && self.end.map_or(true, |end| record.order_date <= end)
            && self
                .categories
                .as_ref()
                .map_or(true, |set| set.contains(&record.category))
            && self
                .marketing_sources
                .as_ref()
                .map_or(true, |set| set.contains(&record.marketing_source))
    }

    pub fn apply(&self, records: &[SalesRecord]) -> Vec<SalesRecord> {
        records.iter().filter(|r| self.matches(r)).cloned().collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SalesKpis {
    pub total_revenue: f64,
    pub items_sold: u64,
    pub avg_satisfaction: f64,
    pub unique_customers: usize,
}

pub fn kpis(records: &[SalesRecord]) -> SalesKpis {
    let total_revenue = records.iter().map(SalesRecord::total_revenue).sum();
    let items_sold = records.iter().map(|r| u64::from(r.quantity)).sum();
    let avg_satisfaction = if records.is_empty() {
        0.0
    } else {
        records
            .iter()
            .map(|r| f64::from(r.satisfaction_score))
            .sum::<f64>()
            / records.len() as f64
    };
    let unique_customers = records
        .iter()
        .map(|r| r.customer_name.as_str())
        .collect::<BTreeSet<_>>()
        .len();

    SalesKpis {
        total_revenue,
        items_sold,
        avg_satisfaction,
        unique_customers,
    }
}

/// Revenue per calendar month, keyed by the first day of the month.
pub fn revenue_by_month(records: &[SalesRecord]) -> Vec<(NaiveDate, f64)> {
    let mut months: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for record in records {
        let month = record.order_date.with_day(1).unwrap_or(record.order_date);
        *months.entry(month).or_insert(0.0) += record.total_revenue();
    }
    months.into_iter().collect()
}

/// Revenue per category, smallest first.
pub fn revenue_by_category(records: &[SalesRecord]) -> Vec<(String, f64)> {
    let mut sums = sum_by(records, "Category", "TotalRevenue");
    sums.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
    sums
}

pub fn revenue_by_state(records: &[SalesRecord]) -> Vec<(String, f64)> {
    sum_by(records, "State", "TotalRevenue")
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalesDashboard {
    pub filter: SalesFilter,
    pub rows: usize,
    pub kpis: SalesKpis,
    pub revenue_by_month: Vec<(NaiveDate, f64)>,
    pub revenue_by_category: Vec<(String, f64)>,
    pub revenue_by_state: Vec<(String, f64)>,
    /// Filtered order rows for drill-down.
    pub orders: Vec<SalesRecord>,
}

pub fn build_dashboard(records: &[SalesRecord], filter: &SalesFilter) -> SalesDashboard {
    let filtered = filter.apply(records);
    SalesDashboard {
        filter: filter.clone(),
        rows: filtered.len(),
        kpis: kpis(&filtered),
        revenue_by_month: revenue_by_month(&filtered),
        revenue_by_category: revenue_by_category(&filtered),
        revenue_by_state: revenue_by_state(&filtered),
        orders: filtered,
    }
}
