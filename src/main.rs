use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;
use tracing_subscriber::EnvFilter;

use dashboard_metrics::ads::{self, CreativeKpi};
use dashboard_metrics::anomaly::Baseline;
use dashboard_metrics::config::Settings;
use dashboard_metrics::customers;
use dashboard_metrics::finance::{self, Scenario};
use dashboard_metrics::generate;
use dashboard_metrics::loader::DataStore;
use dashboard_metrics::metrics::{CONVERSION_RATE, CPC, CTR, ROAS};
use dashboard_metrics::models::ChurnRisk;
use dashboard_metrics::report::{self, OutputFormat};
use dashboard_metrics::sales::{self, SalesFilter};
use dashboard_metrics::schema::DatasetKind;
use dashboard_metrics::scoring::WeightVector;

#[derive(Parser)]
#[command(name = "dashboard-metrics")]
#[command(about = "Metrics and scoring engine for the business dashboards", long_about = None)]
struct Cli {
    /// JSON settings file (also read from DASHBOARD_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Directory holding the dataset CSV files (also read from DASHBOARD_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct Output {
    #[arg(long, value_enum, default_value_t = OutputFormat::Markdown)]
    format: OutputFormat,
    /// Write to this file instead of stdout
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write synthetic demo datasets
    Generate {
        #[arg(long, default_value = "data")]
        out_dir: PathBuf,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Sales KPIs and revenue breakdowns
    Sales {
        #[arg(long)]
        start: Option<NaiveDate>,
        #[arg(long)]
        end: Option<NaiveDate>,
        /// Include only these categories (repeatable)
        #[arg(long = "category")]
        categories: Vec<String>,
        /// Include only these marketing sources (repeatable)
        #[arg(long = "source")]
        sources: Vec<String>,
        #[command(flatten)]
        output: Output,
    },
    /// Customer health scorecard and churn segmentation
    Customers {
        #[arg(long, value_parser = parse_risk)]
        risk: Option<ChurnRisk>,
        #[command(flatten)]
        output: Output,
    },
    /// Cash-flow forecast and expense anomalies
    Finance {
        /// Monthly sales growth in percent, -10 to 20
        #[arg(long, allow_hyphen_values = true)]
        growth_pct: Option<f64>,
        /// New recurring monthly expense, 0 to 10000
        #[arg(long)]
        new_expense: Option<f64>,
        #[arg(long)]
        sigma: Option<f64>,
        #[arg(long)]
        pooled_baseline: bool,
        #[command(flatten)]
        output: Output,
    },
    /// Weighted platform ranking and creative analysis
    Ads {
        #[arg(long)]
        roas_weight: Option<f64>,
        #[arg(long)]
        ctr_weight: Option<f64>,
        #[arg(long)]
        cpc_weight: Option<f64>,
        #[arg(long)]
        conversion_weight: Option<f64>,
        /// Platform whose creatives are analysed (defaults to the top-ranked one)
        #[arg(long)]
        platform: Option<String>,
        #[arg(long, default_value = "roas")]
        kpi: CreativeKpi,
        #[command(flatten)]
        output: Output,
    },
    /// Render every dashboard into a directory
    All {
        #[arg(long, default_value = "reports")]
        out_dir: PathBuf,
        #[arg(long, value_enum, default_value_t = OutputFormat::Markdown)]
        format: OutputFormat,
    },
}

fn parse_risk(value: &str) -> Result<ChurnRisk, String> {
    match value.to_ascii_lowercase().as_str() {
        "high" => Ok(ChurnRisk::High),
        "medium" => Ok(ChurnRisk::Medium),
        "low" => Ok(ChurnRisk::Low),
        other => Err(format!("unknown churn risk tier {other:?}")),
    }
}

fn emit(
    output: &Output,
    markdown: impl FnOnce() -> String,
    json: impl FnOnce() -> serde_json::Result<String>,
) -> anyhow::Result<()> {
    let rendered = match output.format {
        OutputFormat::Markdown => markdown(),
        OutputFormat::Json => json().context("failed to serialize dashboard")?,
    };
    match &output.out {
        Some(path) => {
            std::fs::write(path, rendered).with_context(|| format!("failed to write {}", path.display()))?;
            println!("Report written to {}.", path.display());
        }
        None => print!("{rendered}"),
    }
    Ok(())
}

fn selection(values: Vec<String>) -> Option<BTreeSet<String>> {
    if values.is_empty() {
        None
    } else {
        Some(values.into_iter().collect())
    }
}

fn ad_weights(
    defaults: &WeightVector,
    roas: Option<f64>,
    ctr: Option<f64>,
    cpc: Option<f64>,
    conversion: Option<f64>,
) -> anyhow::Result<WeightVector> {
    let weights = WeightVector::new([
        (ROAS, roas.unwrap_or_else(|| defaults.get(ROAS))),
        (CTR, ctr.unwrap_or_else(|| defaults.get(CTR))),
        (CPC, cpc.unwrap_or_else(|| defaults.get(CPC))),
        (CONVERSION_RATE, conversion.unwrap_or_else(|| defaults.get(CONVERSION_RATE))),
    ])?;
    Ok(weights)
}

fn render_all(
    store: &mut DataStore,
    settings: &Settings,
    out_dir: &Path,
    format: OutputFormat,
) -> anyhow::Result<()> {
    std::fs::create_dir_all(out_dir).with_context(|| format!("failed to create {}", out_dir.display()))?;
    let extension = match format {
        OutputFormat::Markdown => "md",
        OutputFormat::Json => "json",
    };
    let write = |name: &str, markdown: String, json: serde_json::Result<String>| -> anyhow::Result<()> {
        let path = out_dir.join(format!("{name}.{extension}"));
        let rendered = match format {
            OutputFormat::Markdown => markdown,
            OutputFormat::Json => json?,
        };
        std::fs::write(&path, rendered).with_context(|| format!("failed to write {}", path.display()))?;
        info!(path = %path.display(), "dashboard written");
        Ok(())
    };

    let records = store.sales.get_or_load(&settings.dataset_path(DatasetKind::Sales))?;
    let dashboard = sales::build_dashboard(&records, &SalesFilter::default());
    write("sales", report::build_sales_report(&dashboard), report::to_json(&dashboard))?;

    let records = store.customers.get_or_load(&settings.dataset_path(DatasetKind::Customer))?;
    let dashboard = customers::build_dashboard(&records, None);
    write("customers", report::build_customer_report(&dashboard), report::to_json(&dashboard))?;

    let records = store.financial.get_or_load(&settings.dataset_path(DatasetKind::Financial))?;
    let dashboard = finance::build_dashboard(&records, &settings.scenario, &settings.anomaly)?;
    write("finance", report::build_financial_report(&dashboard), report::to_json(&dashboard))?;

    let records = store.ads.get_or_load(&settings.dataset_path(DatasetKind::AdPerformance))?;
    let dashboard = ads::build_dashboard(&records, &settings.ad_weights, None, CreativeKpi::Roas);
    write("ads", report::build_ad_report(&dashboard), report::to_json(&dashboard))?;

    println!("Dashboards written to {}.", out_dir.display());
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut settings = Settings::load(cli.config.as_deref()).context("failed to load settings")?;
    if let Some(dir) = cli.data_dir {
        settings.data_dir = dir;
    }
    let mut store = DataStore::default();

    match cli.command {
        Commands::Generate { out_dir, seed } => {
            let mut rng = match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            let written = generate::write_all(&mut rng, &out_dir, Utc::now().date_naive())
                .context("failed to write demo datasets")?;
            println!("Wrote {} datasets to {}.", written.len(), out_dir.display());
        }
        Commands::Sales {
            start,
            end,
            categories,
            sources,
            output,
        } => {
            let path = settings.dataset_path(DatasetKind::Sales);
            let records = store.sales.get_or_load(&path).context("failed to load sales data")?;
            let filter = SalesFilter {
                start,
                end,
                categories: selection(categories),
                marketing_sources: selection(sources),
            };
            let dashboard = sales::build_dashboard(&records, &filter);
            emit(
                &output,
                || report::build_sales_report(&dashboard),
                || report::to_json(&dashboard),
            )?;
        }
        Commands::Customers { risk, output } => {
            let path = settings.dataset_path(DatasetKind::Customer);
            let records = store
                .customers
                .get_or_load(&path)
                .context("failed to load customer data")?;
            let dashboard = customers::build_dashboard(&records, risk);
            emit(
                &output,
                || report::build_customer_report(&dashboard),
                || report::to_json(&dashboard),
            )?;
        }
        Commands::Finance {
            growth_pct,
            new_expense,
            sigma,
            pooled_baseline,
            output,
        } => {
            let scenario = Scenario {
                sales_growth_rate: growth_pct.map_or(settings.scenario.sales_growth_rate, |pct| pct / 100.0),
                new_monthly_expense: new_expense.unwrap_or(settings.scenario.new_monthly_expense),
            };
            let mut detector = settings.anomaly;
            if let Some(sigma) = sigma {
                detector = detector.with_sigma(sigma).context("invalid --sigma")?;
            }
            if pooled_baseline {
                detector.baseline = Baseline::Pooled;
            }

            let path = settings.dataset_path(DatasetKind::Financial);
            let records = store
                .financial
                .get_or_load(&path)
                .context("failed to load financial data")?;
            let dashboard = finance::build_dashboard(&records, &scenario, &detector)?;
            emit(
                &output,
                || report::build_financial_report(&dashboard),
                || report::to_json(&dashboard),
            )?;
        }
        Commands::Ads {
            roas_weight,
            ctr_weight,
            cpc_weight,
            conversion_weight,
            platform,
            kpi,
            output,
        } => {
            let weights = ad_weights(
                &settings.ad_weights,
                roas_weight,
                ctr_weight,
                cpc_weight,
                conversion_weight,
            )?;
            let path = settings.dataset_path(DatasetKind::AdPerformance);
            let records = store.ads.get_or_load(&path).context("failed to load ad data")?;
            let dashboard = ads::build_dashboard(&records, &weights, platform.as_deref(), kpi);
            emit(
                &output,
                || report::build_ad_report(&dashboard),
                || report::to_json(&dashboard),
            )?;
        }
        Commands::All { out_dir, format } => {
            render_all(&mut store, &settings, &out_dir, format)?;
        }
    }

    Ok(())
}
