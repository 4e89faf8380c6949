//! Synthetic demo datasets.
//!
//! Every generator takes the RNG from the caller so a fixed seed reproduces
//! the same files.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Duration, Months, NaiveDate};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use tracing::info;

use crate::customers::health_score;
use crate::error::{EngineError, EngineResult};
use crate::models::{
    AdRecord, ChurnRisk, CustomerRecord, FinancialRecord, SalesRecord, TransactionType, SENTIMENT_MONTHS,
};
use crate::schema::DatasetKind;

const CUSTOMERS: [&str; 15] = [
    "Alpha Corp",
    "Beta Industries",
    "Gamma Solutions",
    "Delta Tech",
    "Epsilon Global",
    "Zeta Services",
    "Omega Holdings",
    "Theta Digital",
    "Iota Innovations",
    "Kappa Logistics",
    "Meridian Inc.",
    "Nexus Enterprises",
    "Orion Group",
    "Pinnacle Corp",
    "Quantum Ltd.",
];

const PRODUCTS: [(&str, [&str; 3]); 3] = [
    ("Smart Home", ["AI Voice Assistant", "Smart Thermostat", "Robotic Vacuum"]),
    ("Wearables", ["Fitness Tracker", "Smartwatch", "AR Glasses"]),
    (
        "Accessories",
        ["Wireless Charger", "Portable Power Bank", "Noise-Cancelling Earbuds"],
    ),
];

const STATES: [&str; 8] = ["NY", "CA", "TX", "FL", "IL", "PA", "OH", "GA"];

const MARKETING_SOURCES: [&str; 5] = [
    "Google Ads",
    "Organic Search",
    "Social Media",
    "Referral",
    "Email Campaign",
];

/// (platform, cost-per-click range, conversion-rate range)
const PLATFORMS: [(&str, (f64, f64), (f64, f64)); 3] = [
    ("Google Ads", (1.5, 4.0), (0.02, 0.05)),
    ("Meta Ads", (0.8, 2.5), (0.01, 0.04)),
    ("LinkedIn Ads", (4.0, 7.5), (0.005, 0.02)),
];

const CAMPAIGNS: [&str; 4] = [
    "Brand Awareness",
    "Lead Generation",
    "Website Traffic",
    "Sales Conversion",
];

const CREATIVES: [(&str, [&str; 3]); 3] = [
    (
        "Image",
        ["Product Showcase A.jpg", "Lifestyle B.png", "Infographic C.jpg"],
    ),
    (
        "Video",
        ["Testimonial Reel.mp4", "Explainer Animation.mov", "Behind the Scenes.mp4"],
    ),
    (
        "Text",
        ["\"Limited Time Offer\" Ad", "\"Free Demo\" Ad", "\"Case Study\" Ad"],
    ),
];

const INCOME_CATEGORIES: [(&str, f64); 4] = [
    ("Product A Sales", 25_000.0),
    ("Product B Sales", 15_000.0),
    ("Consulting Services", 10_000.0),
    ("Maintenance Contracts", 5_000.0),
];

const EXPENSE_CATEGORIES: [(&str, f64); 6] = [
    ("Salaries", 18_000.0),
    ("Rent", 5_000.0),
    ("Marketing", 3_500.0),
    ("Software & Subscriptions", 1_500.0),
    ("Utilities", 800.0),
    ("Office Supplies", 300.0),
];

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(NaiveDate::MIN)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn pick<'a, R: Rng>(rng: &mut R, values: &[&'a str]) -> &'a str {
    values.choose(rng).copied().unwrap_or_default()
}

pub fn sales_records<R: Rng>(rng: &mut R, count: usize) -> Vec<SalesRecord> {
    let start = date(2023, 1, 1);
    let span = (date(2024, 12, 31) - start).num_days();

    (0..count)
        .map(|i| {
            let (category, products) = PRODUCTS[rng.gen_range(0..PRODUCTS.len())];
            SalesRecord {
                order_id: Some(format!("ORD-{}", 1001 + i)),
                order_date: start + Duration::days(rng.gen_range(0..span)),
                customer_name: pick(rng, &CUSTOMERS[..10]).to_string(),
                state: pick(rng, &STATES).to_string(),
                product: Some(pick(rng, &products).to_string()),
                category: category.to_string(),
                quantity: rng.gen_range(1..10),
                price: round2(rng.gen_range(29.99..499.99)),
                marketing_source: pick(rng, &MARKETING_SOURCES).to_string(),
                satisfaction_score: rng.gen_range(3..6),
            }
        })
        .collect()
}

pub fn ad_records<R: Rng>(rng: &mut R, days: i64) -> Vec<AdRecord> {
    let start = date(2024, 1, 1);
    let mut records = Vec::new();

    for day in 0..days {
        for (platform, cpc, conversion) in PLATFORMS {
            for campaign in CAMPAIGNS {
                let (creative_type, names) = CREATIVES[rng.gen_range(0..CREATIVES.len())];
                let impressions: u32 = rng.gen_range(5_000..=20_000);
                let clicks = (f64::from(impressions) * rng.gen_range(0.01..0.06)).floor();
                let spend = clicks * rng.gen_range(cpc.0..cpc.1);
                let conversions = (clicks * rng.gen_range(conversion.0..conversion.1)).floor();
                let revenue = conversions * rng.gen_range(50.0..300.0);

                records.push(AdRecord {
                    date: start + Duration::days(day),
                    platform: platform.to_string(),
                    campaign: campaign.to_string(),
                    creative_type: creative_type.to_string(),
                    creative_name: pick(rng, &names).to_string(),
                    impressions: f64::from(impressions),
                    clicks,
                    spend: round2(spend),
                    conversions,
                    revenue: round2(revenue),
                });
            }
        }
    }
    records
}

/// Monthly ledger with two injected expense spikes: Marketing ×3.5 in
/// month 18 and Software ×4 in month 13.
pub fn financial_records<R: Rng>(rng: &mut R, months: u32) -> Vec<FinancialRecord> {
    let start = date(2023, 1, 1);
    let mut records = Vec::new();

    for i in 0..months {
        let Some(month) = start.checked_add_months(Months::new(i)) else {
            break;
        };
        let growth = 1.0 + f64::from(i) * 0.01;

        for (category, base) in INCOME_CATEGORIES {
            let amount = base * (1.0 + rng.gen_range(-0.1..0.1)) * growth;
            records.push(FinancialRecord {
                date: month,
                kind: TransactionType::Income,
                category: category.to_string(),
                amount: round2(amount),
            });
        }

        for (category, base) in EXPENSE_CATEGORIES {
            let mut amount = base * (1.0 + rng.gen_range(-0.05..0.05));
            if category == "Marketing" && i == 18 {
                amount *= 3.5;
            }
            if category == "Software & Subscriptions" && i == 13 {
                amount *= 4.0;
            }
            records.push(FinancialRecord {
                date: month,
                kind: TransactionType::Expense,
                category: category.to_string(),
                amount: round2(amount),
            });
        }
    }
    records
}

/// Box-Muller draw from N(mean, sd).
fn normal<R: Rng>(rng: &mut R, mean: f64, sd: f64) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen();
    mean + sd * (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}

pub fn customer_records<R: Rng>(rng: &mut R, today: NaiveDate) -> Vec<CustomerRecord> {
    let mut names = CUSTOMERS.to_vec();
    names.shuffle(rng);

    names
        .into_iter()
        .enumerate()
        .map(|(i, name)| {
            let purchase_frequency: u32 = rng.gen_range(1..=20);
            let days_ago: i64 = rng.gen_range(1..=365);
            let avg_order_value = round2(rng.gen_range(50.0..1000.0));
            let support_tickets: u32 = rng.gen_range(0..=5);
            let health = health_score(days_ago, purchase_frequency, support_tickets);
            let predicted_ltv = avg_order_value * f64::from(purchase_frequency) * rng.gen_range(1.5..3.0);
            let sentiment_history = (0..SENTIMENT_MONTHS)
                .map(|_| normal(rng, f64::from(health) / 100.0, 0.15).clamp(0.1, 1.0))
                .collect();

            CustomerRecord {
                customer_id: format!("CUST-{}", 101 + i),
                customer_name: name.to_string(),
                last_purchase_date: today - Duration::days(days_ago),
                purchase_frequency,
                avg_order_value,
                support_tickets,
                engagement_score: rng.gen_range(20..=99),
                health_score: health,
                churn_risk: ChurnRisk::from_health_score(f64::from(health)),
                predicted_ltv: round2(predicted_ltv),
                sentiment_history,
            }
        })
        .collect()
}

pub fn write_csv<T: Serialize>(path: &Path, records: &[T]) -> EngineResult<()> {
    let io_error = |source| EngineError::DataUnavailable {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_error)?;
    }
    let mut writer = csv::Writer::from_path(path).map_err(|err| io_error(err.into()))?;
    for record in records {
        writer.serialize(record).map_err(|err| io_error(err.into()))?;
    }
    writer.flush().map_err(io_error)?;
    info!(path = %path.display(), rows = records.len(), "wrote dataset");
    Ok(())
}

/// Write all four demo datasets into `out_dir`, returning their paths.
pub fn write_all<R: Rng>(rng: &mut R, out_dir: &Path, today: NaiveDate) -> EngineResult<Vec<PathBuf>> {
    let mut written = Vec::new();
    for kind in DatasetKind::ALL {
        let path = out_dir.join(kind.default_file_name());
        match kind {
            DatasetKind::Sales => write_csv(&path, &sales_records(rng, 500))?,
            DatasetKind::AdPerformance => write_csv(&path, &ad_records(rng, 90))?,
            DatasetKind::Financial => write_csv(&path, &financial_records(rng, 24))?,
            DatasetKind::Customer => write_csv(&path, &customer_records(rng, today))?,
        }
        written.push(path);
    }
    Ok(written)
}
