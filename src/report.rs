use std::fmt::Write;

use serde::{Deserialize, Serialize};

use crate::ads::AdDashboard;
use crate::customers::CustomerDashboard;
use crate::finance::{FinancialDashboard, ForecastDirection, Trend};
use crate::metrics::{CONVERSION_RATE, CPC, CTR, ROAS};
use crate::sales::SalesDashboard;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Markdown,
    Json,
}

/// Order rows shown in the markdown drill-down table.
pub const ORDER_PREVIEW_ROWS: usize = 10;

pub fn to_json<T: Serialize>(dashboard: &T) -> serde_json::Result<String> {
    serde_json::to_string_pretty(dashboard)
}

/// `1234567.891` -> `$1,234,567.89`
pub fn money(value: f64) -> String {
    let sign = if value < 0.0 { "-" } else { "" };
    let cents = (value.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();
    let mut grouped = String::new();
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    format!("{sign}${grouped}.{:02}", cents % 100)
}

pub fn build_sales_report(dashboard: &SalesDashboard) -> String {
    let mut output = String::new();
    let kpis = &dashboard.kpis;

    let _ = writeln!(output, "# Operations Hub");
    let _ = writeln!(output, "{} orders match the current filters.", dashboard.rows);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Key Metrics");
    let _ = writeln!(output, "- Total Revenue: {}", money(kpis.total_revenue));
    let _ = writeln!(output, "- Total Items Sold: {}", kpis.items_sold);
    let _ = writeln!(output, "- Avg. Satisfaction Score: {:.2} / 5", kpis.avg_satisfaction);
    let _ = writeln!(output, "- Unique Customers: {}", kpis.unique_customers);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Revenue Over Time");
    if dashboard.revenue_by_month.is_empty() {
        let _ = writeln!(output, "No orders in this window.");
    } else {
        for (month, revenue) in &dashboard.revenue_by_month {
            let _ = writeln!(output, "- {}: {}", month.format("%Y-%m"), money(*revenue));
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Sales by Product Category");
    for (category, revenue) in &dashboard.revenue_by_category {
        let _ = writeln!(output, "- {category}: {}", money(*revenue));
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Sales by State");
    for (state, revenue) in &dashboard.revenue_by_state {
        let _ = writeln!(output, "- {state}: {}", money(*revenue));
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Raw Data Explorer");
    if dashboard.orders.is_empty() {
        let _ = writeln!(output, "No orders to show.");
    } else {
        let _ = writeln!(output, "| Order | Date | Customer | State | Product | Category | Qty | Price | Source |");
        let _ = writeln!(output, "|---|---|---|---|---|---|---:|---:|---|");
        for order in dashboard.orders.iter().take(ORDER_PREVIEW_ROWS) {
            let _ = writeln!(
                output,
                "| {} | {} | {} | {} | {} | {} | {} | {} | {} |",
                order.order_id.as_deref().unwrap_or("-"),
                order.order_date,
                order.customer_name,
                order.state,
                order.product.as_deref().unwrap_or("-"),
                order.category,
                order.quantity,
                money(order.price),
                order.marketing_source
            );
        }
        if dashboard.orders.len() > ORDER_PREVIEW_ROWS {
            let _ = writeln!(
                output,
                "Showing {ORDER_PREVIEW_ROWS} of {} orders.",
                dashboard.orders.len()
            );
        }
    }

    output
}

pub fn build_customer_report(dashboard: &CustomerDashboard) -> String {
    let mut output = String::new();
    let scope = dashboard
        .tier_filter
        .map_or_else(|| "all customers".to_string(), |tier| format!("{tier} risk customers"));

    let _ = writeln!(output, "# Customer Intelligence");
    let _ = writeln!(output, "Generated for {scope}");
    let _ = writeln!(output);
    let _ = writeln!(output, "## Customer Health Scorecard");

    if dashboard.scorecard.is_empty() {
        let _ = writeln!(output, "No customers match this filter.");
    } else {
        let _ = writeln!(output, "| Customer | Health | Churn Risk | Predicted LTV |");
        let _ = writeln!(output, "|---|---:|---|---:|");
        for entry in &dashboard.scorecard {
            let _ = writeln!(
                output,
                "| {} | {} | {} | {} |",
                entry.customer_name,
                entry.health_score,
                entry.churn_risk,
                money(entry.predicted_ltv)
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Churn Risk Segmentation");
    for (tier, count) in &dashboard.risk_counts {
        let [first, second] = tier.recommended_actions();
        let _ = writeln!(output, "- {tier}: {count} customers (actions: {first}; {second})");
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Predicted LTV by Risk");
    for (tier, ltv) in &dashboard.ltv_by_risk {
        let _ = writeln!(output, "- {tier}: {}", money(*ltv));
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Sentiment Trendline");
    for (label, sentiment) in &dashboard.average_sentiment {
        let _ = writeln!(output, "- {label}: {sentiment:.2}");
    }

    output
}

pub fn build_financial_report(dashboard: &FinancialDashboard) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Financial Forecaster");
    let _ = writeln!(
        output,
        "Scenario: {:.1}% monthly sales growth, {} new monthly expense",
        dashboard.scenario.sales_growth_rate * 100.0,
        money(dashboard.scenario.new_monthly_expense)
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Cash Flow");
    for month in &dashboard.monthly {
        let _ = writeln!(output, "- {}: {}", month.month.format("%Y-%m"), money(month.cash_flow));
    }
    for point in &dashboard.forecast {
        let _ = writeln!(
            output,
            "- {} (forecast): {}",
            point.month.format("%Y-%m"),
            money(point.cash_flow)
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Expense Anomalies");
    if dashboard.anomalies.is_empty() {
        let _ = writeln!(output, "No expense category exceeded its baseline.");
    } else {
        for flag in &dashboard.anomalies {
            let _ = writeln!(
                output,
                "- {} in {}: {} (threshold {})",
                flag.category,
                flag.bucket,
                money(flag.value),
                money(flag.threshold)
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Income by Category");
    for (category, amount) in &dashboard.income_by_category {
        let _ = writeln!(output, "- {category}: {}", money(*amount));
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Summary");
    let _ = write!(
        output,
        "Over {} months the business generated {} in income against {} in expenses, a net profit of {}.",
        dashboard.monthly.len(),
        money(dashboard.total_income),
        money(dashboard.total_expense),
        money(dashboard.net_profit)
    );
    if let Some(stream) = &dashboard.top_income_stream {
        let _ = write!(output, " The primary income driver is {stream}.");
    }
    if let Some(trend) = dashboard.trend {
        let label = match trend {
            Trend::Improving => "improving",
            Trend::Declining => "declining",
        };
        let _ = write!(output, " The recent cash flow trend is {label}.");
    }
    if let Some(direction) = dashboard.forecast_direction {
        let label = match direction {
            ForecastDirection::Upwards => "upwards",
            ForecastDirection::Downwards => "downwards",
        };
        let _ = write!(output, " Under this scenario cash flow trends {label} over the next year.");
    }
    let _ = writeln!(output);

    output
}

pub fn build_ad_report(dashboard: &AdDashboard) -> String {
    let mut output = String::new();
    let weights = &dashboard.weights;

    let _ = writeln!(output, "# Ad Performance Command Center");
    let _ = writeln!(
        output,
        "Weights: ROAS {}, CTR {}, CPC {}, Conversion Rate {}",
        weights.get(ROAS),
        weights.get(CTR),
        weights.get(CPC),
        weights.get(CONVERSION_RATE)
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Performance Ranking");

    if dashboard.platforms.is_empty() {
        let _ = writeln!(output, "No ad data loaded.");
    } else {
        let _ = writeln!(output, "| Platform | Grade | ROAS | CPC | Spend | Revenue |");
        let _ = writeln!(output, "|---|---:|---:|---:|---:|---:|");
        for graded in &dashboard.platforms {
            let row = &graded.row;
            let _ = writeln!(
                output,
                "| {} | {:.1} | {:.2}x | {} | {} | {} |",
                row.label(),
                graded.grade,
                row.metric(ROAS),
                money(row.metric(CPC)),
                money(row.total("Spend")),
                money(row.total("Revenue"))
            );
        }
    }

    let _ = writeln!(output);
    match &dashboard.creative_platform {
        Some(platform) => {
            let _ = writeln!(
                output,
                "## Top Creatives on {platform} by {}",
                dashboard.creative_kpi.metric_name()
            );
            for row in &dashboard.creatives {
                let _ = writeln!(
                    output,
                    "- {}: {:.4}",
                    row.label(),
                    row.metric(dashboard.creative_kpi.metric_name())
                );
            }

            if !dashboard.placements.is_empty() {
                let _ = writeln!(output);
                let _ = writeln!(output, "## Best Single Placements on {platform}");
                let _ = writeln!(output, "| Date | Campaign | Creative | ROAS | CTR | CPC | Conv. Rate |");
                let _ = writeln!(output, "|---|---|---|---:|---:|---:|---:|");
                for placement in &dashboard.placements {
                    let (record, metrics) = (&placement.record, &placement.metrics);
                    let _ = writeln!(
                        output,
                        "| {} | {} | {} | {:.2}x | {:.2}% | {} | {:.2}% |",
                        record.date,
                        record.campaign,
                        record.creative_name,
                        metrics.roas,
                        metrics.ctr * 100.0,
                        money(metrics.cpc),
                        metrics.conversion_rate * 100.0
                    );
                }
            }
        }
        None => {
            let _ = writeln!(output, "## Top Creatives");
            let _ = writeln!(output, "No platform selected.");
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anomaly::AnomalyFlag;
    use crate::finance::Scenario;
    use crate::models::SalesRecord;
    use crate::sales::{self, SalesFilter, SalesKpis};
    use chrono::NaiveDate;
    use std::collections::BTreeSet;

    #[test]
    fn money_groups_thousands() {
        assert_eq!(money(0.0), "$0.00");
        assert_eq!(money(999.999), "$1,000.00");
        assert_eq!(money(1234567.891), "$1,234,567.89");
        assert_eq!(money(-42.5), "-$42.50");
    }

    #[test]
    fn empty_sales_report_says_so() {
        let dashboard = SalesDashboard {
            filter: SalesFilter::default(),
            rows: 0,
            kpis: SalesKpis {
                total_revenue: 0.0,
                items_sold: 0,
                avg_satisfaction: 0.0,
                unique_customers: 0,
            },
            revenue_by_month: Vec::new(),
            revenue_by_category: Vec::new(),
            revenue_by_state: Vec::new(),
            orders: Vec::new(),
        };
        let report = build_sales_report(&dashboard);
        assert!(report.starts_with("# Operations Hub"));
        assert!(report.contains("No orders in this window."));
        assert!(report.contains("No orders to show."));
    }

    fn order(i: usize, category: &str) -> SalesRecord {
        SalesRecord {
            order_id: Some(format!("ORD-{}", 1001 + i)),
            order_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            customer_name: "Alpha Corp".to_string(),
            state: "NY".to_string(),
            product: Some("Smartwatch".to_string()),
            category: category.to_string(),
            quantity: 2,
            price: 199.99,
            marketing_source: "Referral".to_string(),
            satisfaction_score: 5,
        }
    }

    #[test]
    fn sales_report_lists_filtered_orders() {
        let mut records: Vec<SalesRecord> = (0..12).map(|i| order(i, "Wearables")).collect();
        records.push(order(99, "Smart Home"));
        let filter = SalesFilter {
            categories: Some(BTreeSet::from(["Wearables".to_string()])),
            ..SalesFilter::default()
        };
        let dashboard = sales::build_dashboard(&records, &filter);

        let report = build_sales_report(&dashboard);
        assert!(report.contains("## Raw Data Explorer"));
        assert!(report.contains("| ORD-1001 | 2024-03-01 | Alpha Corp | NY | Smartwatch | Wearables | 2 | $199.99 | Referral |"));
        assert!(report.contains("| ORD-1010 |"));
        assert!(!report.contains("| ORD-1011 |"));
        assert!(!report.contains("ORD-1100"));
        assert!(report.contains("Showing 10 of 12 orders."));

        let json = to_json(&dashboard).unwrap();
        assert!(json.contains("\"OrderID\": \"ORD-1012\""));
        assert!(!json.contains("ORD-1100"));
    }

    #[test]
    fn financial_report_lists_anomalies() {
        let dashboard = FinancialDashboard {
            scenario: Scenario::default(),
            monthly: Vec::new(),
            forecast: Vec::new(),
            income_by_category: Vec::new(),
            anomalies: vec![AnomalyFlag {
                category: "Marketing".to_string(),
                bucket: "2024-07".to_string(),
                value: 12250.0,
                threshold: 3700.0,
            }],
            total_income: 0.0,
            total_expense: 0.0,
            net_profit: 0.0,
            top_income_stream: None,
            trend: None,
            forecast_direction: None,
        };
        let report = build_financial_report(&dashboard);
        assert!(report.contains("- Marketing in 2024-07: $12,250.00 (threshold $3,700.00)"));
        assert!(report.contains("3.0% monthly sales growth"));
    }
}
