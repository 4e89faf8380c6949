use std::collections::BTreeMap;

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::aggregate::sum_by;
use crate::anomaly::{monthly_expense_series, AnomalyDetector, AnomalyFlag};
use crate::error::{EngineError, EngineResult};
use crate::models::{FinancialRecord, TransactionType};

pub const FORECAST_MONTHS: u32 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MonthlyCashFlow {
    pub month: NaiveDate,
    pub income: f64,
    pub expense: f64,
    pub cash_flow: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForecastPoint {
    pub month: NaiveDate,
    pub cash_flow: f64,
}

/// What-if knobs for the cash-flow projection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    /// Monthly income growth as a fraction, e.g. `0.03` for 3%.
    pub sales_growth_rate: f64,
    /// Recurring expense added to every projected month.
    pub new_monthly_expense: f64,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            sales_growth_rate: 0.03,
            new_monthly_expense: 1500.0,
        }
    }
}

impl Scenario {
    pub fn validate(&self) -> EngineResult<()> {
        if !(-0.10..=0.20).contains(&self.sales_growth_rate) {
            return Err(EngineError::InvalidParameter {
                name: "sales_growth_rate".to_string(),
                reason: format!("{} is outside -0.10..=0.20", self.sales_growth_rate),
            });
        }
        if !(0.0..=10_000.0).contains(&self.new_monthly_expense) {
            return Err(EngineError::InvalidParameter {
                name: "new_monthly_expense".to_string(),
                reason: format!("{} is outside 0..=10000", self.new_monthly_expense),
            });
        }
        Ok(())
    }
}

fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Income, expense and net cash flow per calendar month, oldest first.
pub fn monthly_summary(records: &[FinancialRecord]) -> Vec<MonthlyCashFlow> {
    let mut months: BTreeMap<NaiveDate, (f64, f64)> = BTreeMap::new();
    for record in records {
        let entry = months.entry(month_start(record.date)).or_insert((0.0, 0.0));
        match record.kind {
            TransactionType::Income => entry.0 += record.amount,
            TransactionType::Expense => entry.1 += record.amount,
        }
    }

    months
        .into_iter()
        .map(|(month, (income, expense))| MonthlyCashFlow {
            month,
            income,
            expense,
            cash_flow: income - expense,
        })
        .collect()
}

/// Project cash flow for the months after the last known one. Income
/// compounds from the last month; expenses stay flat plus the new recurring
/// cost.
pub fn forecast(summary: &[MonthlyCashFlow], scenario: &Scenario) -> EngineResult<Vec<ForecastPoint>> {
    scenario.validate()?;
    let Some(last) = summary.last() else {
        return Ok(Vec::new());
    };

    let mut points = Vec::with_capacity(FORECAST_MONTHS as usize);
    for step in 1..=FORECAST_MONTHS {
        let Some(month) = last.month.checked_add_months(Months::new(step)) else {
            break;
        };
        let income = last.income * (1.0 + scenario.sales_growth_rate).powi(step as i32);
        let expense = last.expense + scenario.new_monthly_expense;
        points.push(ForecastPoint {
            month,
            cash_flow: income - expense,
        });
    }
    Ok(points)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Improving,
    Declining,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ForecastDirection {
    Upwards,
    Downwards,
}

/// Improving when the latest month's cash flow beats the month before.
pub fn cash_flow_trend(summary: &[MonthlyCashFlow]) -> Option<Trend> {
    match summary {
        [.., previous, last] if last.cash_flow > previous.cash_flow => Some(Trend::Improving),
        [.., _, _] => Some(Trend::Declining),
        _ => None,
    }
}

pub fn forecast_direction(points: &[ForecastPoint]) -> Option<ForecastDirection> {
    let (first, last) = (points.first()?, points.last()?);
    if last.cash_flow > first.cash_flow {
        Some(ForecastDirection::Upwards)
    } else {
        Some(ForecastDirection::Downwards)
    }
}

/// Income totals per category, largest first.
pub fn income_by_category(records: &[FinancialRecord]) -> Vec<(String, f64)> {
    let income: Vec<FinancialRecord> = records
        .iter()
        .filter(|record| record.kind == TransactionType::Income)
        .cloned()
        .collect();
    let mut sums = sum_by(&income, "Category", "Amount");
    sums.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    sums
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinancialDashboard {
    pub scenario: Scenario,
    pub monthly: Vec<MonthlyCashFlow>,
    pub forecast: Vec<ForecastPoint>,
    pub income_by_category: Vec<(String, f64)>,
    pub anomalies: Vec<AnomalyFlag>,
    pub total_income: f64,
    pub total_expense: f64,
    pub net_profit: f64,
    pub top_income_stream: Option<String>,
    pub trend: Option<Trend>,
    pub forecast_direction: Option<ForecastDirection>,
}

pub fn build_dashboard(
    records: &[FinancialRecord],
    scenario: &Scenario,
    detector: &AnomalyDetector,
) -> EngineResult<FinancialDashboard> {
    let monthly = monthly_summary(records);
    let forecast = forecast(&monthly, scenario)?;
    let income_by_category = income_by_category(records);
    let anomalies = detector.detect(&monthly_expense_series(records));
    debug!(months = monthly.len(), anomalies = anomalies.len(), "financial dashboard computed");

    let total_income: f64 = monthly.iter().map(|m| m.income).sum();
    let total_expense: f64 = monthly.iter().map(|m| m.expense).sum();

    Ok(FinancialDashboard {
        scenario: *scenario,
        trend: cash_flow_trend(&monthly),
        forecast_direction: forecast_direction(&forecast),
        top_income_stream: income_by_category.first().map(|(category, _)| category.clone()),
        total_income,
        total_expense,
        net_profit: total_income - total_expense,
        monthly,
        forecast,
        income_by_category,
        anomalies,
    })
}
