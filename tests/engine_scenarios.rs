use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::SeedableRng;

use dashboard_metrics::ads::rank_platforms;
use dashboard_metrics::anomaly::AnomalyDetector;
use dashboard_metrics::finance::{self, Scenario};
use dashboard_metrics::generate;
use dashboard_metrics::loader::{load_path, DatasetCache};
use dashboard_metrics::metrics::{CONVERSION_RATE, CPC, CTR, ROAS};
use dashboard_metrics::models::{AdRecord, CustomerRecord, FinancialRecord, SalesRecord, SENTIMENT_MONTHS};
use dashboard_metrics::schema::DatasetKind;
use dashboard_metrics::scoring::WeightVector;
use dashboard_metrics::EngineError;
use tempfile::TempDir;

const AD_HEADER: &str =
    "Date,Platform,Campaign,CreativeType,CreativeName,Impressions,Clicks,Spend,Conversions,Revenue";

fn write_csv(path: &Path, header: &str, rows: &[String]) {
    let mut out = String::new();
    out.push_str(header);
    out.push('\n');
    for row in rows {
        out.push_str(row);
        out.push('\n');
    }
    fs::write(path, out).unwrap();
}

fn ad_row(platform: &str, spend: f64, revenue: f64, impressions: u32, clicks: u32, conversions: u32) -> String {
    format!("2024-01-01,{platform},Lead Generation,Image,Lifestyle B.png,{impressions},{clicks},{spend},{conversions},{revenue}")
}

fn two_platforms(dir: &TempDir) -> Vec<AdRecord> {
    let path = dir.path().join("ads.csv");
    write_csv(
        &path,
        AD_HEADER,
        &[
            ad_row("Platform A", 100.0, 400.0, 1000, 50, 5),
            ad_row("Platform B", 200.0, 300.0, 2000, 80, 4),
        ],
    );
    load_path(&path).unwrap()
}

#[test]
fn roas_only_weights_rank_higher_roas_first() {
    let dir = TempDir::new().unwrap();
    let records = two_platforms(&dir);
    let weights = WeightVector::new([(ROAS, 100.0), (CTR, 0.0), (CPC, 0.0), (CONVERSION_RATE, 0.0)]).unwrap();

    let ranked = rank_platforms(&records, &weights);
    assert_eq!(ranked.len(), 2);
    assert_eq!(ranked[0].row.label(), "Platform A");
    assert_eq!(ranked[0].row.metric(ROAS), 4.0);
    assert_eq!(ranked[0].grade, 100.0);
    assert_eq!(ranked[1].row.label(), "Platform B");
    assert_eq!(ranked[1].row.metric(ROAS), 1.5);
    assert_eq!(ranked[1].grade, 0.0);
}

#[test]
fn zero_weights_grade_every_platform_zero() {
    let dir = TempDir::new().unwrap();
    let records = two_platforms(&dir);
    let weights = WeightVector::new([(ROAS, 0.0), (CTR, 0.0), (CPC, 0.0), (CONVERSION_RATE, 0.0)]).unwrap();
    assert!(rank_platforms(&records, &weights).iter().all(|graded| graded.grade == 0.0));
}

#[test]
fn identical_platforms_normalize_to_neutral() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ads.csv");
    write_csv(
        &path,
        AD_HEADER,
        &[
            ad_row("Platform A", 100.0, 400.0, 1000, 50, 5),
            ad_row("Platform B", 100.0, 400.0, 1000, 50, 5),
        ],
    );
    let records: Vec<AdRecord> = load_path(&path).unwrap();
    let ranked = rank_platforms(&records, &WeightVector::ad_defaults());
    for graded in &ranked {
        assert!(graded.normalized.values().all(|score| *score == 0.5));
        assert!((graded.grade - 50.0).abs() < 1e-9);
    }
}

#[test]
fn pipeline_is_bit_identical_across_runs() {
    let dir = TempDir::new().unwrap();
    let records = two_platforms(&dir);
    let weights = WeightVector::ad_defaults();
    let first = rank_platforms(&records, &weights);
    let second = rank_platforms(&records, &weights);
    assert_eq!(first, second);
    for (a, b) in first.iter().zip(&second) {
        assert_eq!(a.grade.to_bits(), b.grade.to_bits());
    }
}

#[test]
fn more_revenue_never_lowers_a_grade() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ads.csv");
    let weights = WeightVector::ad_defaults();
    let mut previous = f64::MIN;

    for revenue in [100.0, 250.0, 400.0, 900.0, 5000.0] {
        write_csv(
            &path,
            AD_HEADER,
            &[
                ad_row("Platform A", 100.0, revenue, 1000, 50, 5),
                ad_row("Platform B", 200.0, 300.0, 2000, 80, 4),
                ad_row("Platform C", 150.0, 450.0, 1500, 30, 2),
            ],
        );
        let records: Vec<AdRecord> = load_path(&path).unwrap();
        let ranked = rank_platforms(&records, &weights);
        let grade = ranked
            .iter()
            .find(|graded| graded.row.label() == "Platform A")
            .map(|graded| graded.grade)
            .unwrap();
        assert!(grade >= previous, "revenue {revenue}: {grade} < {previous}");
        previous = grade;
    }
}

#[test]
fn marketing_spike_is_the_only_anomaly() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("financial.csv");
    let marketing = [
        3480.0, 3510.0, 3495.0, 3520.0, 3505.0, 3490.0, 3515.0, 3500.0, 3485.0, 3500.0, 12250.0,
    ];
    let mut rows = Vec::new();
    for (i, amount) in marketing.iter().enumerate() {
        let month = i + 1;
        rows.push(format!("2024-{month:02}-01,Expense,Marketing,{amount}"));
        rows.push(format!("2024-{month:02}-01,Expense,Rent,5000"));
        rows.push(format!("2024-{month:02}-01,Income,Product A Sales,25000"));
    }
    write_csv(&path, "Date,Type,Category,Amount", &rows);

    let records: Vec<FinancialRecord> = load_path(&path).unwrap();
    let dashboard = finance::build_dashboard(&records, &Scenario::default(), &AnomalyDetector::default()).unwrap();

    assert_eq!(dashboard.anomalies.len(), 1);
    let flag = &dashboard.anomalies[0];
    assert_eq!(flag.category, "Marketing");
    assert_eq!(flag.bucket, "2024-11");
    assert_eq!(flag.value, 12250.0);
    assert!(flag.threshold < 4000.0);
    assert_eq!(dashboard.forecast.len(), 12);
}

#[test]
fn missing_file_is_data_unavailable() {
    let dir = TempDir::new().unwrap();
    let result: Result<Vec<AdRecord>, EngineError> = load_path(&dir.path().join("absent.csv"));
    assert!(matches!(result, Err(EngineError::DataUnavailable { .. })));
}

#[test]
fn missing_column_is_schema_mismatch() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ads.csv");
    write_csv(&path, "Date,Platform,Spend,Revenue", &["2024-01-01,Meta Ads,10,20".to_string()]);
    let result: Result<Vec<AdRecord>, EngineError> = load_path(&path);
    match result {
        Err(EngineError::SchemaMismatch { dataset, missing }) => {
            assert_eq!(dataset, "ad performance");
            assert!(missing.contains(&"Clicks".to_string()));
        }
        other => panic!("expected schema mismatch, got {other:?}"),
    }
}

#[test]
fn cache_loads_each_path_once() {
    let dir = TempDir::new().unwrap();
    two_platforms(&dir);
    let path = dir.path().join("ads.csv");

    let mut cache: DatasetCache<AdRecord> = DatasetCache::default();
    let first = cache.get_or_load(&path).unwrap();
    fs::remove_file(&path).unwrap();
    let second = cache.get_or_load(&path).unwrap();

    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn generated_datasets_load_back() {
    let dir = TempDir::new().unwrap();
    let today = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
    let written = generate::write_all(&mut StdRng::seed_from_u64(7), dir.path(), today).unwrap();
    assert_eq!(written.len(), DatasetKind::ALL.len());

    let path = |kind: DatasetKind| dir.path().join(kind.default_file_name());

    let sales: Vec<SalesRecord> = load_path(&path(DatasetKind::Sales)).unwrap();
    assert_eq!(sales.len(), 500);
    assert!(sales.iter().all(|r| r.order_id.is_some() && r.product.is_some()));

    let ads: Vec<AdRecord> = load_path(&path(DatasetKind::AdPerformance)).unwrap();
    assert_eq!(ads.len(), 90 * 3 * 4);

    let customers: Vec<CustomerRecord> = load_path(&path(DatasetKind::Customer)).unwrap();
    assert_eq!(customers.len(), 15);
    assert!(customers.iter().all(|r| r.sentiment_history.len() == SENTIMENT_MONTHS));

    let financial: Vec<FinancialRecord> = load_path(&path(DatasetKind::Financial)).unwrap();
    assert_eq!(financial.len(), 24 * 10);

    let dashboard = finance::build_dashboard(&financial, &Scenario::default(), &AnomalyDetector::default()).unwrap();
    let flagged: BTreeSet<(&str, &str)> = dashboard
        .anomalies
        .iter()
        .map(|flag| (flag.category.as_str(), flag.bucket.as_str()))
        .collect();
    assert_eq!(dashboard.anomalies.len(), 2);
    assert_eq!(
        flagged,
        BTreeSet::from([("Marketing", "2024-07"), ("Software & Subscriptions", "2024-02")])
    );
}
